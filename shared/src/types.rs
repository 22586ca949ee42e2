use std::{
    fmt::{Display, Formatter},
    ops::Range,
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Position of a worker inside the process group.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// The rank that collects completions and produces the report.
    pub const COORDINATOR: Rank = Rank(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rank {}", self.0)
    }
}

/// Half-open nonce interval `[start, end)` owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    pub start: u64,
    pub end: u64,
}

impl SearchRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, nonce: u64) -> bool {
        self.start <= nonce && nonce < self.end
    }

    pub fn nonces(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl Display for SearchRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub nonce: u64,
    pub digest: Vec<u8>,
    pub found_by: Rank,
}

impl Solution {
    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Lowest nonce wins. Picks between an optional incumbent and a challenger.
    pub fn lowest(current: Option<Solution>, candidate: Solution) -> Solution {
        match current {
            Some(current) if current.nonce <= candidate.nonce => current,
            _ => candidate,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub hashes_tried: u64,
    pub elapsed: Duration,
}

/// How a single worker's search ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Found(Solution),
    Exhausted,
    Cancelled,
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Found(solution) => Some(solution),
            _ => None,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Found(solution) => write!(f, "found nonce {}", solution.nonce),
            Outcome::Exhausted => write!(f, "exhausted"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalReport {
    pub solution: Option<Solution>,
    pub workers: u32,
    pub total_hashes: u64,
    pub elapsed: Duration,
    /// final stats of every rank that reported
    pub ranks: Vec<(Rank, WorkerStats)>,
    /// ranks that never acknowledged before the completion wait expired
    pub missing: Vec<Rank>,
}

impl GlobalReport {
    pub fn hashes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_hashes as f64 / secs
        } else {
            0.0
        }
    }
}

use std::time::Duration;

use shared::{
    interaction::Completion,
    types::{GlobalReport, Rank, Solution, WorkerStats},
};
use tracing::*;

/// Completions collected by the coordinator, one slot per rank.
pub struct Container {
    slots: Vec<Option<Completion>>,
}

impl Container {
    pub fn new(size: u32) -> Self {
        Self { slots: vec![None; size as usize] }
    }

    /// Store a rank's completion. Returns false for unknown ranks and for
    /// ranks that already reported, so each rank is counted once.
    pub fn push(&mut self, completion: Completion) -> bool {
        match self.slots.get_mut(completion.rank.index()) {
            Some(slot) if slot.is_none() => {
                trace!("{} reported: {}", completion.rank, completion.outcome);
                *slot = Some(completion);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn missing(&self) -> Vec<Rank> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(rank, _)| Rank(rank as u32))
            .collect()
    }

    pub fn aggregate(self, solution: Option<Solution>) -> GlobalReport {
        let missing = self.missing();
        let workers = self.slots.len() as u32;
        let (total_hashes, elapsed) = aggregate(self.slots.iter().flatten().map(|c| &c.stats));
        let ranks = self.slots.iter().flatten().map(|c| (c.rank, c.stats)).collect();

        let hashrate = if elapsed.is_zero() {
            0.0
        } else {
            total_hashes as f64 / elapsed.as_secs_f64()
        };
        info!("mining power: {:.2} H/s", hashrate);

        GlobalReport { solution, workers, total_hashes, elapsed, ranks, missing }
    }
}

/// Sum of hashes and the longest elapsed time over per-rank stats.
pub fn aggregate<'a, I>(reports: I) -> (u64, Duration)
where
    I: IntoIterator<Item = &'a WorkerStats>, {
    reports.into_iter().fold((0, Duration::ZERO), |(hashes, elapsed), stats| {
        (hashes + stats.hashes_tried, elapsed.max(stats.elapsed))
    })
}

use std::time::Instant;

use shared::{
    digest::{Algorithm, CandidateBuf, Digest, Md5, Sha256},
    errors::{MineError, MineResult},
    puzzle::Puzzle,
    types::{Outcome, Rank, SearchRange, Solution, WorkerStats},
};
use tracing::*;

/// Hashes between two looks at the inbox.
pub const DEFAULT_POLL_INTERVAL: u64 = 1024;

/// Walk `range` until a nonce satisfies the puzzle, the range runs out, or
/// `cancelled` reports that the search should stop.
///
/// `cancelled` is called once every `poll_interval` hashes and must not
/// block. The returned `hashes_tried` counts every digest computed, the
/// winning one included.
pub fn search<F>(
    rank: Rank,
    range: SearchRange,
    puzzle: &Puzzle,
    poll_interval: u64,
    cancelled: F,
) -> MineResult<(Outcome, WorkerStats)>
where
    F: FnMut() -> MineResult<bool>, {
    if poll_interval == 0 {
        return Err(MineError::InvalidPollInterval);
    }

    match puzzle.algorithm {
        Algorithm::Md5 => scan::<Md5, F>(rank, range, puzzle, poll_interval, cancelled),
        Algorithm::Sha256 => scan::<Sha256, F>(rank, range, puzzle, poll_interval, cancelled),
    }
}

fn scan<D, F>(
    rank: Rank,
    range: SearchRange,
    puzzle: &Puzzle,
    poll_interval: u64,
    mut cancelled: F,
) -> MineResult<(Outcome, WorkerStats)>
where
    D: Digest,
    F: FnMut() -> MineResult<bool>, {
    let timer = Instant::now();
    let mut candidate = CandidateBuf::new(&puzzle.block);
    let mut hashes = 0u64;
    let mut until_poll = poll_interval;

    let stats = |hashes| {
        WorkerStats {
            hashes_tried: hashes,
            elapsed: timer.elapsed(),
        }
    };

    for nonce in range.nonces() {
        if until_poll == 0 {
            until_poll = poll_interval;
            if cancelled()? {
                debug!("{rank}: cancelled at nonce {nonce} after {hashes} hashes");
                return Ok((Outcome::Cancelled, stats(hashes)));
            }
        }
        until_poll -= 1;

        let digest = D::digest(candidate.with_nonce(nonce));
        hashes += 1;

        if puzzle.difficulty.accepts(&digest) {
            info!("{rank}: nonce {nonce} satisfies the difficulty after {hashes} hashes");
            let solution = Solution {
                nonce,
                digest: digest.to_vec(),
                found_by: rank,
            };
            return Ok((Outcome::Found(solution), stats(hashes)));
        }
    }

    debug!("{rank}: range {range} exhausted after {hashes} hashes");
    Ok((Outcome::Exhausted, stats(hashes)))
}

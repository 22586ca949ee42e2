use crate::{
    errors::{MineError, MineResult},
    types::SearchRange,
};

/// Whole nonce domain `[0, u64::MAX)`.
pub const DOMAIN_MAX: u64 = u64::MAX;

/// Range of nonces assigned to `rank` when `[0, domain_size)` is split over
/// `worker_count` workers.
///
/// Every rank gets `domain_size / worker_count` nonces and the first
/// `domain_size % worker_count` ranks get one more. Ranges are contiguous in
/// rank order, so concatenating them rebuilds the domain. When there are more
/// workers than nonces the trailing ranks get an empty range.
pub fn partition(domain_size: u64, worker_count: u32, rank: u32) -> MineResult<SearchRange> {
    if worker_count == 0 {
        return Err(MineError::InvalidWorkerCount);
    }
    if rank >= worker_count {
        return Err(MineError::InvalidRank { rank, size: worker_count });
    }

    let workers = worker_count as u64;
    let rank = rank as u64;
    let base = domain_size / workers;
    let remainder = domain_size % workers;

    let start = rank * base + rank.min(remainder);
    let len = base + u64::from(rank < remainder);

    Ok(SearchRange { start, end: start + len })
}

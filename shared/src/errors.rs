use thiserror::Error;

use crate::types::Rank;

#[derive(Error, Debug)]
pub enum MineError {
    #[error("difficulty must be between 1 and 32 leading zero bits, got {0}")]
    InvalidDifficulty(u32),
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,
    #[error("rank {rank} is outside a group of {size}")]
    InvalidRank { rank: u32, size: u32 },
    #[error("poll interval must be at least 1")]
    InvalidPollInterval,
    #[error("messaging failure: {0}")]
    MessagingFailure(String),
    #[error("digest mismatch for nonce {nonce} announced by {found_by}")]
    DigestMismatch { nonce: u64, found_by: Rank },
    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),
    #[error("failed to start {0}: {1}")]
    Spawn(Rank, std::io::Error),
    #[error("{0} stopped unexpectedly")]
    WorkerPanicked(Rank),
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] bincode::Error),
}

pub type MineResult<T> = Result<T, MineError>;

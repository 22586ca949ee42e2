use serde::{Deserialize, Serialize};

use crate::types::{Outcome, Rank, Solution, WorkerStats};

/// Upper bound of an encoded frame. A solution carries at most a 32-byte
/// digest, so real frames stay far below it.
pub const MAX_FRAME_SIZE: usize = 1024;

#[macro_export]
macro_rules! impl_frame_codec {
    ($t:ty) => {
        impl $t {
            pub fn encode(&self) -> $crate::errors::MineResult<bytes::Bytes> {
                let data = bincode::serialize(self)?;
                if data.len() > $crate::interaction::MAX_FRAME_SIZE {
                    return Err($crate::errors::MineError::FrameTooLarge(data.len()));
                }
                Ok(bytes::Bytes::from(data))
            }

            pub fn decode(frame: &[u8]) -> $crate::errors::MineResult<Self> {
                if frame.len() > $crate::interaction::MAX_FRAME_SIZE {
                    return Err($crate::errors::MineError::FrameTooLarge(frame.len()));
                }
                Ok(bincode::deserialize::<Self>(frame)?)
            }
        }

        impl TryFrom<bytes::Bytes> for $t {
            type Error = $crate::errors::MineError;

            fn try_from(value: bytes::Bytes) -> Result<Self, Self::Error> {
                Self::decode(&value)
            }
        }
    };
}

/// Acknowledgment a rank sends the coordinator once its search is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub rank: Rank,
    pub outcome: Outcome,
    pub stats: WorkerStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// worker -> all: a qualifying nonce was found
    Announce(Solution),
    /// worker -> coordinator
    Complete(Completion),
    /// coordinator -> all: the group is done, with the accepted solution
    Terminate(Option<Solution>),
    /// launcher -> all: stop searching and wind down
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: Rank,
    pub message: Message,
}

impl_frame_codec!(Envelope);

impl Envelope {
    pub fn new(from: Rank, message: Message) -> Self {
        Self { from, message }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::MineError;

    #[test]
    fn completion_frame_decodes() {
        let envelope = Envelope::new(Rank(3), Message::Complete(Completion {
            rank: Rank(3),
            outcome: Outcome::Found(Solution {
                nonce: 9_223_372_036_876_236_423,
                digest: vec![0, 0, 0, 0x7f, 0x63],
                found_by: Rank(3),
            }),
            stats: WorkerStats { hashes_tried: 83_087_328, elapsed: Duration::from_millis(8460) },
        }));

        let frame = envelope.encode().unwrap();
        assert!(frame.len() <= MAX_FRAME_SIZE);
        assert_eq!(Envelope::try_from(frame).unwrap(), envelope);
    }

    #[test]
    fn rejects_oversize_and_garbage_frames() {
        let big = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(Envelope::decode(&big), Err(MineError::FrameTooLarge(_))));
        assert!(matches!(Envelope::decode(&[0xff; 3]), Err(MineError::MalformedFrame(_))));

        let envelope = Envelope::new(Rank(0), Message::Announce(Solution {
            nonce: 1,
            digest: vec![0; MAX_FRAME_SIZE],
            found_by: Rank(0),
        }));
        assert!(matches!(envelope.encode(), Err(MineError::FrameTooLarge(_))));
    }
}

//! In-process process group.
//!
//! Every rank owns an [`Endpoint`] with its own inbox and a sender to every
//! member (itself included). Messages travel as encoded frames, so ranks
//! share no state besides the channels.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    time::Duration,
};

use bytes::Bytes;
use tracing::*;

use crate::{
    errors::{MineError, MineResult},
    interaction::{Envelope, Message},
    types::Rank,
};

pub struct Endpoint {
    rank: Rank,
    inbox: Receiver<Bytes>,
    peers: Vec<Sender<Bytes>>,
}

/// Handle held outside the group, used to inject control messages.
#[derive(Clone)]
pub struct Launcher {
    peers: Vec<Sender<Bytes>>,
}

/// Wire up a fully connected group of `size` ranks.
pub fn group(size: u32) -> MineResult<(Vec<Endpoint>, Launcher)> {
    if size == 0 {
        return Err(MineError::InvalidWorkerCount);
    }

    let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();

    let endpoints = receivers
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| {
            Endpoint {
                rank: Rank(rank as u32),
                inbox,
                peers: senders.clone(),
            }
        })
        .collect();

    Ok((endpoints, Launcher { peers: senders }))
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.peers.len() as u32
    }

    pub fn send(&self, to: Rank, message: Message) -> MineResult<()> {
        let frame = Envelope::new(self.rank, message).encode()?;
        self.deliver(to, frame)
    }

    /// Send to every other rank. Fails on the first peer that is gone.
    pub fn broadcast(&self, message: Message) -> MineResult<()> {
        let frame = Envelope::new(self.rank, message).encode()?;
        for to in self.others() {
            self.deliver(to, frame.clone())?;
        }
        Ok(())
    }

    /// Send to every other rank still listening. Returns how many were reached.
    pub fn broadcast_lossy(&self, message: Message) -> MineResult<usize> {
        let frame = Envelope::new(self.rank, message).encode()?;
        let mut reached = 0;
        for to in self.others() {
            match self.deliver(to, frame.clone()) {
                Ok(()) => reached += 1,
                Err(err) => debug!("{}: skip {to}: {err}", self.rank),
            }
        }
        Ok(reached)
    }

    /// Non-blocking probe. `Ok(None)` means the inbox is empty right now.
    pub fn try_recv(&self) -> MineResult<Option<Envelope>> {
        loop {
            match self.inbox.try_recv() {
                Ok(frame) => {
                    if let Some(envelope) = self.open(frame) {
                        return Ok(Some(envelope));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(self.disconnected()),
            }
        }
    }

    pub fn recv(&self) -> MineResult<Envelope> {
        loop {
            let frame = self.inbox.recv().map_err(|_| self.disconnected())?;
            if let Some(envelope) = self.open(frame) {
                return Ok(envelope);
            }
        }
    }

    /// Blocking receive bounded by `timeout`. `Ok(None)` when it expires or
    /// the frame that arrived was dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> MineResult<Option<Envelope>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(frame) => Ok(self.open(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
        }
    }

    fn others(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.size()).map(Rank).filter(move |rank| *rank != self.rank)
    }

    fn deliver(&self, to: Rank, frame: Bytes) -> MineResult<()> {
        let peer = self
            .peers
            .get(to.index())
            .ok_or(MineError::InvalidRank { rank: to.0, size: self.size() })?;
        peer.send(frame)
            .map_err(|_| MineError::MessagingFailure(format!("{to} is no longer reachable")))
    }

    fn open(&self, frame: Bytes) -> Option<Envelope> {
        match Envelope::try_from(frame) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!("{}: drop frame: {err}", self.rank);
                None
            }
        }
    }

    fn disconnected(&self) -> MineError {
        MineError::MessagingFailure(format!("{} inbox disconnected", self.rank))
    }
}

impl Launcher {
    pub fn size(&self) -> u32 {
        self.peers.len() as u32
    }

    /// Ask every rank to stop. Ranks that already left are skipped.
    pub fn abort(&self) -> MineResult<usize> {
        self.inject(Message::Abort)
    }

    /// Terminate the group without a verdict, releasing ranks that wait on a
    /// coordinator that is gone.
    pub fn release(&self) -> MineResult<usize> {
        self.inject(Message::Terminate(None))
    }

    fn inject(&self, message: Message) -> MineResult<usize> {
        // the launcher speaks as the coordinator
        let frame = Envelope::new(Rank::COORDINATOR, message).encode()?;
        Ok(self.peers.iter().filter(|peer| peer.send(frame.clone()).is_ok()).count())
    }
}

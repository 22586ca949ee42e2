//! Group-wide stop protocol run by every rank.
//!
//! A rank that finds a qualifying nonce broadcasts it. Peers re-verify the
//! announcement, stop at their next poll, and acknowledge the coordinator
//! with a [`Completion`]. The coordinator picks the lowest verified nonce
//! once every rank has reported and broadcasts the verdict.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    errors::{MineError, MineResult},
    group::Endpoint,
    interaction::{Completion, Envelope, Message},
    puzzle::Puzzle,
    types::{GlobalReport, Outcome, Rank, Solution, WorkerStats},
};
use tracing::*;

use crate::container::Container;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Searching,
    WinAnnounced,
    Terminated,
}

/// What a rank knows once the protocol is over.
#[derive(Debug)]
pub enum Finish {
    Worker { solution: Option<Solution> },
    Coordinator(GlobalReport),
}

impl Finish {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Finish::Worker { solution } => solution.as_ref(),
            Finish::Coordinator(report) => report.solution.as_ref(),
        }
    }
}

pub struct Termination {
    endpoint: Endpoint,
    puzzle: Arc<Puzzle>,
    state: State,
    /// lowest verified solution seen so far, own or announced
    accepted: Option<Solution>,
    local: Option<Solution>,
    reannounced: bool,
    aborted: bool,
    verdict: Option<Solution>,
    container: Container,
    ack_timeout: Option<Duration>,
}

impl Termination {
    pub fn new(endpoint: Endpoint, puzzle: Arc<Puzzle>, ack_timeout: Option<Duration>) -> Self {
        let size = endpoint.size();
        Self {
            endpoint,
            puzzle,
            state: State::Searching,
            accepted: None,
            local: None,
            reannounced: false,
            aborted: false,
            verdict: None,
            container: Container::new(size),
            ack_timeout,
        }
    }

    pub fn rank(&self) -> Rank {
        self.endpoint.rank()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Drain whatever is already in the inbox without waiting. Returns true
    /// when the search loop should stop.
    pub fn poll(&mut self) -> MineResult<bool> {
        while let Some(envelope) = self.endpoint.try_recv()? {
            self.handle(envelope)?;
        }
        Ok(self.should_stop())
    }

    fn should_stop(&self) -> bool {
        self.aborted || self.state != State::Searching
    }

    /// Record a nonce this rank found and announce it unless a lower one is
    /// already known.
    pub fn found(&mut self, solution: Solution) -> MineResult<()> {
        self.local = Some(solution.clone());

        if let Some(accepted) = &self.accepted {
            if accepted.nonce < solution.nonce {
                debug!(
                    "{}: keep quiet about nonce {}, nonce {} is lower",
                    self.rank(),
                    solution.nonce,
                    accepted.nonce
                );
                return Ok(());
            }
        }

        info!("{}: announce nonce {}", self.rank(), solution.nonce);
        if let Err(err) = self.endpoint.broadcast(Message::Announce(solution.clone())) {
            return self.settle(err);
        }
        self.accept(solution);
        Ok(())
    }

    /// Acknowledge the coordinator and wait for the group to terminate.
    pub fn complete(mut self, outcome: Outcome, stats: WorkerStats) -> MineResult<Finish> {
        let completion = Completion { rank: self.rank(), outcome, stats };
        debug!("{}: {} after {} hashes", self.rank(), completion.outcome, stats.hashes_tried);

        if self.rank().is_coordinator() {
            self.record(completion);
            return self.conclude().map(Finish::Coordinator);
        }

        // a verdict may already be waiting in the inbox
        self.poll()?;
        if self.state != State::Terminated {
            if let Err(err) = self.endpoint.send(Rank::COORDINATOR, Message::Complete(completion)) {
                self.settle(err)?;
            }
        }
        while self.state != State::Terminated {
            let envelope = self.endpoint.recv()?;
            self.handle(envelope)?;
        }
        Ok(Finish::Worker { solution: self.verdict })
    }

    /// A peer that left is only a failure while the group is still running.
    /// Peers leave after the coordinator's verdict, which is then already
    /// queued in this rank's inbox.
    fn settle(&mut self, err: MineError) -> MineResult<()> {
        self.poll()?;
        if self.state != State::Terminated {
            return Err(err);
        }
        debug!("{}: group already terminated: {err}", self.rank());
        Ok(())
    }

    fn handle(&mut self, envelope: Envelope) -> MineResult<()> {
        let Envelope { from, message } = envelope;
        match message {
            Message::Announce(solution) => self.observe(solution)?,
            Message::Complete(completion) => {
                if self.rank().is_coordinator() {
                    self.record(completion);
                } else {
                    warn!("{}: unexpected completion from {from}", self.rank());
                }
            }
            Message::Terminate(solution) => {
                if from.is_coordinator() {
                    self.terminate(solution);
                } else {
                    warn!("{}: ignore termination sent by {from}", self.rank());
                }
            }
            Message::Abort => {
                if !self.aborted {
                    info!("{}: abort requested", self.rank());
                }
                self.aborted = true;
            }
        }
        Ok(())
    }

    fn observe(&mut self, solution: Solution) -> MineResult<()> {
        if let Err(err) = self.puzzle.verify(&solution) {
            warn!("{}: discard announcement: {err}", self.rank());
            return Ok(());
        }

        if let Some(local) = &self.local {
            if local.nonce < solution.nonce && !self.reannounced {
                info!(
                    "{}: nonce {} beats announced nonce {}, announce again",
                    self.rank(),
                    local.nonce,
                    solution.nonce
                );
                self.reannounced = true;
                // peers that already terminated do not need it
                self.endpoint.broadcast_lossy(Message::Announce(local.clone()))?;
            }
        }

        self.accept(solution);
        Ok(())
    }

    fn accept(&mut self, solution: Solution) {
        self.accepted = Some(Solution::lowest(self.accepted.take(), solution));
        if self.state == State::Searching {
            trace!("{}: searching -> win announced", self.rank());
            self.state = State::WinAnnounced;
        }
    }

    fn terminate(&mut self, solution: Option<Solution>) {
        self.verdict = match solution {
            Some(solution) => {
                match self.puzzle.verify(&solution) {
                    Ok(()) => Some(solution),
                    Err(err) => {
                        warn!("{}: discard verdict: {err}", self.rank());
                        None
                    }
                }
            }
            None => None,
        };
        trace!("{}: {:?} -> terminated", self.rank(), self.state);
        self.state = State::Terminated;
    }

    fn record(&mut self, completion: Completion) {
        if let Outcome::Found(solution) = &completion.outcome {
            match self.puzzle.verify(solution) {
                Ok(()) => self.accept(solution.clone()),
                Err(err) => warn!("{}: discard solution of {}: {err}", self.rank(), completion.rank),
            }
        }
        if !self.container.push(completion) {
            debug!("{}: ignore repeated or foreign completion", self.rank());
        }
    }

    /// Coordinator side: wait for every completion, then broadcast the verdict.
    fn conclude(mut self) -> MineResult<GlobalReport> {
        let deadline = self.ack_timeout.map(|timeout| Instant::now() + timeout);

        // a release from outside ends the wait early
        while !self.container.is_full() && self.state != State::Terminated {
            let envelope = match deadline {
                None => Some(self.endpoint.recv()?),
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        error!(
                            "{}: completion wait expired, missing: {:?}",
                            self.rank(),
                            self.container.missing()
                        );
                        break;
                    }
                    self.endpoint.recv_timeout(left)?
                }
            };
            if let Some(envelope) = envelope {
                self.handle(envelope)?;
            }
        }

        let released = self.state == State::Terminated;
        if released {
            warn!("{}: released, missing: {:?}", self.rank(), self.container.missing());
        }

        let solution = self.accepted.clone();
        let message = Message::Terminate(solution.clone());
        // released peers may already be gone
        if self.container.is_full() && !released {
            self.endpoint.broadcast(message)?;
        } else {
            self.endpoint.broadcast_lossy(message)?;
        }
        self.terminate(solution.clone());
        info!(
            "{}: group terminated, {}/{} ranks reported",
            self.rank(),
            self.container.len(),
            self.endpoint.size()
        );

        Ok(self.container.aggregate(solution))
    }
}

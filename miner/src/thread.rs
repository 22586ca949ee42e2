use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver},
        Arc,
    },
    thread::{Builder, JoinHandle},
    time::Duration,
};

use core_affinity::CoreId;
use shared::{
    errors::{MineError, MineResult},
    group::{group, Endpoint, Launcher},
    partition::partition,
    puzzle::Puzzle,
    types::{GlobalReport, Outcome, Rank},
};
use tracing::*;

use crate::{
    search::{search, DEFAULT_POLL_INTERVAL},
    termination::{Finish, Termination},
};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: u32,
    pub poll_interval: u64,
    pub ack_timeout: Option<Duration>,
    pub pin_cores: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ack_timeout: None,
            pin_cores: false,
        }
    }
}

/// Final result of one rank thread.
pub type RankResult = (Rank, MineResult<Finish>);

/// Running group of rank threads.
pub struct RankGroup {
    launcher: Launcher,
    handles: Vec<JoinHandle<()>>,
    results: Receiver<RankResult>,
}

impl RankGroup {
    pub fn spawn(puzzle: Puzzle, options: RunOptions) -> MineResult<Self> {
        if options.poll_interval == 0 {
            return Err(MineError::InvalidPollInterval);
        }

        let (endpoints, launcher) = group(options.workers)?;
        let puzzle = Arc::new(puzzle);
        let core_ids = if options.pin_cores {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            vec![]
        };

        let (result_tx, results) = mpsc::channel();
        let mut handles = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let rank = endpoint.rank();
            let puzzle = puzzle.clone();
            let options = options.clone();
            let result_tx = result_tx.clone();
            let core = (!core_ids.is_empty()).then(|| core_ids[rank.index() % core_ids.len()]);

            let handle = Builder::new()
                .name(format!("rank-{}", rank.0))
                .spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        run_rank(endpoint, puzzle, &options, core)
                    }))
                    .unwrap_or_else(|_| Err(MineError::WorkerPanicked(rank)));
                    if result_tx.send((rank, result)).is_err() {
                        debug!("{rank}: nobody waits for the result");
                    }
                })
                .map_err(|err| MineError::Spawn(rank, err))?;
            handles.push(handle);
        }

        drop(result_tx);

        Ok(Self { launcher, handles, results })
    }

    pub fn launcher(&self) -> Launcher {
        self.launcher.clone()
    }

    /// Block until every rank is done and return the coordinator's report.
    pub fn join(self) -> MineResult<GlobalReport> {
        let report = gather(&self.launcher, &self.results, self.handles.len());
        for handle in self.handles {
            if handle.join().is_err() {
                error!("rank thread did not exit cleanly");
            }
        }
        report
    }
}

/// Collect rank results in the order ranks finish. The first failure
/// releases the survivors, since a rank waiting on a failed peer would
/// otherwise never terminate. The coordinator's report wins over failures of
/// other ranks, which show up in it as missing.
pub fn gather(
    launcher: &Launcher,
    results: &Receiver<RankResult>,
    size: usize,
) -> MineResult<GlobalReport> {
    let mut report = None;
    let mut failure = None;

    for _ in 0..size {
        let Ok((rank, result)) = results.recv() else {
            break;
        };
        match result {
            Ok(finish) => {
                trace!("{rank} done, accepted nonce: {:?}", finish.solution().map(|s| s.nonce));
                if let Finish::Coordinator(global) = finish {
                    report = Some(global);
                }
            }
            Err(err) => {
                error!("{rank} failed: {err}");
                if failure.is_none() {
                    if let Err(err) = launcher.release() {
                        error!("fail to release ranks: {err}");
                    }
                }
                failure.get_or_insert(err);
            }
        }
    }

    match (report, failure) {
        (Some(report), _) => Ok(report),
        (None, Some(err)) => Err(err),
        (None, None) => Err(MineError::WorkerPanicked(Rank::COORDINATOR)),
    }
}

fn run_rank(
    endpoint: Endpoint,
    puzzle: Arc<Puzzle>,
    options: &RunOptions,
    core: Option<CoreId>,
) -> MineResult<Finish> {
    if let Some(core) = core {
        // bound thread to core
        if !core_affinity::set_for_current(core) {
            debug!("{}: could not pin to core {}", endpoint.rank(), core.id);
        }
    }

    let rank = endpoint.rank();
    let range = partition(puzzle.domain, endpoint.size(), rank.0)?;
    debug!("{rank}: task range {range} ({} nonces)", range.len());

    let mut termination = Termination::new(endpoint, puzzle.clone(), options.ack_timeout);
    let (outcome, stats) =
        search(rank, range, &puzzle, options.poll_interval, || termination.poll())?;
    debug!("{rank}: search over in state {:?}", termination.state());

    if let Outcome::Found(solution) = &outcome {
        termination.found(solution.clone())?;
    }
    termination.complete(outcome, stats)
}

//! Repeating, single-flight driver for the dispatcher.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::dispatcher::Dispatcher;

/// Errors that keep a session from starting. The scheduler stays idle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("no private keys")]
    NoAccounts,

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("previous session is still finishing its last cycle")]
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// State owned by one start..stop session.
struct Session {
    running: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    /// Cleared once `wait` has joined it
    task: Option<JoinHandle<u64>>,
}

/// Runs a cycle, waits `interval`, and repeats until stopped.
///
/// The wait starts after the previous cycle has fully completed, so cycles never
/// overlap. Stopping lets an in-flight cycle finish but starts no new one.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    session: Option<Session>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            session: None,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts a session; the first cycle is scheduled immediately.
    ///
    /// Must be called from within a tokio runtime. `max_cycles` stops the session on its
    /// own after that many cycles.
    pub fn start(&mut self, interval: Duration, max_cycles: Option<u64>) -> Result<(), StartError> {
        if let Some(session) = &self.session {
            if session.running.load(Ordering::SeqCst) {
                return Err(StartError::AlreadyRunning);
            }
            if session.task.as_ref().is_some_and(|task| !task.is_finished()) {
                return Err(StartError::Draining);
            }
        }

        if self.dispatcher.accounts().is_empty() {
            self.dispatcher.log().error("no private keys");
            return Err(StartError::NoAccounts);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        let cycles = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_loop(
            self.dispatcher.clone(),
            interval,
            max_cycles,
            stop_rx,
            running.clone(),
            cycles.clone(),
        ));

        log::info!(
            "scheduler started: {} account(s), interval {:?}",
            self.dispatcher.accounts().len(),
            interval
        );

        self.session = Some(Session {
            running,
            cycles,
            stop_tx,
            task: Some(task),
        });
        Ok(())
    }

    /// Requests a stop. Idempotent; returns at once without waiting for the in-flight cycle.
    pub fn stop(&self) {
        if let Some(session) = &self.session {
            if session.running.swap(false, Ordering::SeqCst) {
                log::info!("scheduler stopping");
            }
            session.stop_tx.send_replace(true);
        }
    }

    pub fn state(&self) -> SchedulerState {
        match &self.session {
            Some(session) if session.running.load(Ordering::SeqCst) => SchedulerState::Running,
            _ => SchedulerState::Idle,
        }
    }

    /// Cycles completed in the current (or last) session.
    pub fn cycles(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| s.cycles.load(Ordering::SeqCst))
    }

    /// Waits for the session to end (by `stop` or the cycle limit) and returns its cycle count.
    ///
    /// Cancel safe: dropping the future leaves the session joinable.
    pub async fn wait(&mut self) -> u64 {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let Some(task) = session.task.as_mut() else {
            return session.cycles.load(Ordering::SeqCst);
        };

        let joined = task.await;
        session.task = None;
        match joined {
            Ok(cycles) => cycles,
            Err(e) => {
                log::error!("scheduler task failed: {}", e);
                session.running.store(false, Ordering::SeqCst);
                session.cycles.load(Ordering::SeqCst)
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    max_cycles: Option<u64>,
    mut stop_rx: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
) -> u64 {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let outcomes = dispatcher.run_cycle().await;
        let done = cycles.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "cycle {} finished: {}/{} sent",
            done,
            outcomes.iter().filter(|o| o.is_success()).count(),
            outcomes.len()
        );

        if max_cycles.is_some_and(|max| done >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    cycles.load(Ordering::SeqCst)
}

use anyhow::{Result, bail};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

struct Inner {
    state: SchedulerState,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

/// Runs a tick function on a fixed period in one supervised background task.
///
/// The period is measured from the end of one tick to the start of the next,
/// so ticks never overlap. A tick that errors or panics is logged and the loop
/// carries on; only [`Scheduler::stop`] ends it.
pub struct Scheduler {
    period: Duration,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            inner: Mutex::new(Inner {
                state: SchedulerState::Idle,
                stop_tx: None,
                handle: None,
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current state. Waits while a `stop` is draining the in-flight tick.
    pub async fn state(&self) -> SchedulerState {
        self.inner.lock().await.state
    }

    /// Spawns the loop. The first tick starts immediately.
    pub async fn start<F, Fut>(&self, tick: F) -> Result<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut inner = self.inner.lock().await;
        if inner.state != SchedulerState::Idle {
            bail!("Scheduler cannot start from state {:?}", inner.state);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        inner.handle = Some(tokio::spawn(run_loop(self.period, tick, stop_rx)));
        inner.stop_tx = Some(stop_tx);
        inner.state = SchedulerState::Running;
        info!(period_secs = self.period.as_secs_f64(), "Scheduler started");
        Ok(())
    }

    /// Stops the loop and waits for the in-flight tick, if any, to finish.
    /// Safe to call any number of times.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SchedulerState::Stopped => return,
            SchedulerState::Idle => {
                inner.state = SchedulerState::Stopped;
                return;
            }
            SchedulerState::Running => {}
        }

        if let Some(stop_tx) = inner.stop_tx.take() {
            // The loop may already be gone if its task was aborted.
            let _ = stop_tx.send(true);
        }
        if let Some(handle) = inner.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }
        inner.state = SchedulerState::Stopped;
        info!("Scheduler stopped");
    }
}

async fn run_loop<F, Fut>(period: Duration, mut tick: F, mut stop_rx: watch::Receiver<bool>)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut tick_number: u64 = 0;
    loop {
        if *stop_rx.borrow() {
            break;
        }
        tick_number += 1;

        // Each tick gets its own task so a panic ends the tick, not the loop.
        match tokio::spawn(tick()).await {
            Ok(Ok(())) => debug!(tick = tick_number, "Tick completed"),
            Ok(Err(e)) => error!(tick = tick_number, error = %e, "Tick failed"),
            Err(e) if e.is_panic() => error!(tick = tick_number, "Tick panicked"),
            Err(e) => error!(tick = tick_number, error = %e, "Tick task cancelled"),
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            // Fires on stop, and also if the scheduler was dropped without stopping.
            _ = stop_rx.changed() => break,
        }
    }
    debug!(ticks = tick_number, "Scheduler loop exited");
}

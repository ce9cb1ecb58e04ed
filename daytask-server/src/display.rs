//! Console progress bar for the Day Context.
//!
//! One background task redraws the completion bar for a fixed day label on
//! a fixed interval. The label is captured once at startup and never
//! refreshed, so after midnight the bar keeps reporting the startup day
//! while `GET /tasks` moves on to the new one.
//!
//! A failed tick is logged and skipped; the loop only stops when
//! [`ProgressDisplay::shutdown`] is called or the handle is dropped. The
//! store query and the console write both run on the blocking pool, and a
//! slow tick pushes the next one back instead of causing a burst of redraws.

use std::io::Write;
use std::time::Duration;

use daytask_store::progress::Progress;
use daytask_store::{StoreError, TaskStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Settings captured when the display loop starts.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Day bucket the bar reports on for the life of the loop.
    pub day: String,
    /// Time between redraws.
    pub interval: Duration,
}

/// Errors from a single redraw.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    /// Counting tasks failed.
    #[error("failed to read progress: {0}")]
    Store(#[from] StoreError),

    /// Writing to the console failed.
    #[error("failed to write progress bar: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the running display loop.
pub struct ProgressDisplay {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Spawns the loop. The first frame is drawn immediately, then one per
    /// `config.interval`.
    pub fn spawn<W>(store: TaskStore, config: DisplayConfig, out: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(store, config, out, shutdown_rx));
        Self { shutdown, handle }
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "progress display task ended abnormally");
        }
    }
}

/// Redraw timer for `period`. The first tick fires immediately; a late
/// tick delays the schedule rather than firing the missed ticks back to back.
fn redraw_interval(period: Duration) -> Interval {
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

async fn run<W: Write + Send + 'static>(
    store: TaskStore,
    config: DisplayConfig,
    mut out: W,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(day = %config.day, interval = ?config.interval, "progress display started");
    let mut tick = redraw_interval(config.interval);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = tick.tick() => {}
        }

        let store = store.clone();
        let day = config.day.clone();
        let drawn = tokio::task::spawn_blocking(move || {
            let result = draw(&store, &day, &mut out);
            (out, result)
        })
        .await;

        match drawn {
            Ok((writer, result)) => {
                out = writer;
                match result {
                    Ok(progress) => {
                        tracing::trace!(done = progress.done, total = progress.total, "progress drawn");
                    }
                    Err(e) => tracing::warn!(day = %config.day, error = %e, "progress tick failed"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "progress draw panicked, console writer lost");
                break;
            }
        }
    }

    tracing::info!("progress display stopped");
}

/// Reads progress for `day` and writes one frame to `out`. Blocks on both
/// the database and the writer.
///
/// # Errors
///
/// Returns [`DrawError`] if the counts cannot be read or the frame cannot be
/// written. Nothing is written when the read fails.
pub fn draw<W: Write>(store: &TaskStore, day: &str, out: &mut W) -> Result<Progress, DrawError> {
    let progress = store.progress_for_day(day)?;
    out.write_all(progress.frame(day).as_bytes())?;
    out.flush()?;
    Ok(progress)
}

//! Background loops driving the live sessions: a one-second timer tick and
//! a periodic autosave sweep. Both stop on the shutdown signal.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::session::SessionController;

pub(crate) fn spawn(
    sessions: SessionController,
    auto_save_interval_seconds: u64,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(tick_loop(sessions.clone(), shutdown.clone())),
        tokio::spawn(autosave_loop(sessions, auto_save_interval_seconds, shutdown)),
    ]
}

async fn tick_loop(sessions: SessionController, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(Duration::from_secs(1));
    // A stalled scorer must not be repaid with a burst of catch-up ticks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => sessions.tick_all().await,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn autosave_loop(
    sessions: SessionController,
    auto_save_interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_secs(auto_save_interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => sessions.autosave_all().await,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    // Final sweep so a clean shutdown loses nothing.
                    sessions.autosave_all().await;
                    break;
                }
            }
        }
    }
}

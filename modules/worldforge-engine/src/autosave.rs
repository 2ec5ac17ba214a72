//! Periodic flush loop for a shared session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::mirror::KvStore;
use crate::session::WorldSession;

/// Tick the session's auto-save on a fixed period until the task is
/// aborted. The first (immediate) tick is skipped so a freshly created
/// world is not flushed before the user has touched it.
pub async fn run_autosave<S>(session: Arc<Mutex<WorldSession<S>>>, period: Duration)
where
    S: KvStore + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;
        session.lock().await.autosave_tick().await;
    }
}

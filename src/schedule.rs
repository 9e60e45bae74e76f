use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, Local, TimeZone};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::actions::Actions;

const PRUNE_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

/// First Monday 08:00 (local to `now`'s zone) strictly after `now`.
pub fn next_monday_8am<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let days_ahead = u64::from((7 - today.weekday().num_days_from_monday()) % 7);

    [days_ahead, days_ahead + 7]
        .into_iter()
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|date| date.and_hms_opt(8, 0, 0))
        .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
        .find(|candidate| candidate > now)
        // Only reachable if 08:00 doesn't exist locally two weeks running.
        .unwrap_or_else(|| now.clone() + chrono::Duration::days(7))
}

/// Background jobs: the weekly digest and the daily cache prune.
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(actions: Arc<Actions>) -> Self {
        let weekly = {
            let actions = actions.clone();
            tokio::spawn(async move {
                loop {
                    let now = Local::now();
                    let next = next_monday_8am(&now);
                    info!(at = %next, "next weekly changelog digest scheduled");
                    let wait = (next - now).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;

                    let outcome = actions.send_weekly_digest().await;
                    info!(?outcome, "weekly changelog digest finished");
                }
            })
        };

        let prune = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_EVERY);
            loop {
                interval.tick().await;
                match actions.prune_cache().await {
                    Ok(removed) => info!(removed, "summary cache pruned"),
                    Err(e) => warn!(error = %e, "summary cache prune failed"),
                }
            }
        });

        Self {
            handles: vec![weekly, prune],
        }
    }

    /// Cancel every recurring job.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
        info!("scheduler stopped");
    }
}

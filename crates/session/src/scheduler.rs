//! Background refresh scheduler
//!
//! One task per session. It sleeps until the token enters the refresh window
//! and re-plans whenever the session state changes (new token, teardown).
//! After a refresh attempt it waits at least `check_interval` before the next
//! check.

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::session::{ExpiryCheck, WeakSession};

pub(crate) fn spawn(session: WeakSession, shutdown: CancellationToken) {
    tokio::spawn(run(session, shutdown));
}

async fn run(session: WeakSession, shutdown: CancellationToken) {
    let Some(mut updates) = session.upgrade().map(|s| s.subscribe()) else {
        return;
    };
    debug!("Refresh scheduler started");

    // Checks are held back until this instant after a refresh attempt, so a
    // server handing out tokens shorter than the refresh lead cannot spin us.
    let mut earliest = Instant::now();
    loop {
        let Some(current) = session.upgrade() else {
            break;
        };
        let interval = current.config().check_interval;

        let outcome = if Instant::now() >= earliest {
            let outcome = current.check_expiry().await;
            trace!(?outcome, "Expiry check");
            if matches!(
                outcome,
                ExpiryCheck::Refreshed | ExpiryCheck::RefreshFailed(_)
            ) {
                earliest = Instant::now() + interval;
            }
            Some(outcome)
        } else {
            None
        };
        drop(current);

        let wake = match outcome {
            Some(ExpiryCheck::Fresh {
                refresh_in: Some(delay),
            }) => Some((Instant::now() + delay).max(earliest)),
            Some(ExpiryCheck::Refreshed) | None => Some(earliest),
            // Nothing to do until the state changes
            Some(
                ExpiryCheck::NoToken
                | ExpiryCheck::Fresh { refresh_in: None }
                | ExpiryCheck::Expired
                | ExpiryCheck::Invalid
                | ExpiryCheck::RefreshFailed(_),
            ) => None,
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = sleep_until(wake.unwrap_or(earliest)), if wake.is_some() => {}
        }
    }

    debug!("Refresh scheduler stopped");
}

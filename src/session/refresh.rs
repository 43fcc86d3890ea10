//! Background periodic token refresh. While a session is live, a spawned
//! task rotates the pair every period and refetches the profile, reducing
//! the chance a user-initiated request hits a 401. The task exits as soon
//! as the session generation moves (logout, new login) or a refresh fails;
//! establishing a new session spawns a fresh task.

use super::SessionManager;
use tokio::time::sleep;
use tracing::debug;

pub(crate) fn spawn(manager: SessionManager, generation: u64) {
    let period = manager.refresh_period();

    tokio::spawn(async move {
        loop {
            sleep(period).await;

            if !manager.refresh_cycle(generation).await {
                debug!("Stopping periodic session refresh");
                break;
            }

            debug!(
                "Will refresh session tokens in {} seconds",
                period.as_secs()
            );
        }
    });
}

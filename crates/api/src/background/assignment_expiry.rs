//! Periodic sweep of abandoned task assignments.
//!
//! Open assignments whose `expires_at` has passed are deleted, which puts
//! their task slots back into circulation.

use std::time::Duration;

use hitlist_db::repositories::AssignmentRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run the expiry loop until `cancel` is triggered.
///
/// The first sweep runs immediately on start.
pub async fn run(pool: PgPool, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Assignment expiry job started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Assignment expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                match AssignmentRepo::expire_abandoned(&pool).await {
                    Ok(0) => tracing::debug!("Assignment expiry: nothing to expire"),
                    Ok(expired) => {
                        tracing::info!(expired, "Assignment expiry: deleted abandoned assignments");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Assignment expiry: sweep failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn stops_when_cancelled(pool: PgPool) {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(pool, Duration::from_secs(3600), cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("expiry job did not stop")
            .expect("expiry job panicked");
    }
}

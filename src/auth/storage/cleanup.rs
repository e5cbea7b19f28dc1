//! 定期清理任务

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::r#trait::TransientStore;

/// 启动定期清理任务
///
/// Purges expired entries every `interval` until `shutdown` fires.
pub fn spawn_cleanup(
    store: Arc<dyn TransientStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("transient store cleanup stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(removed) => info!("Store cleanup: removed {} expired entries", removed),
                        Err(e) => warn!("Store cleanup failed: {}", e),
                    }
                }
            }
        }
    })
}

use crate::bot::features::Tickable;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Runs every timer hook, then sleeps for `interval`, forever.
pub async fn run(tickables: Vec<Arc<dyn Tickable>>, interval: Duration, hook_timeout: Duration) {
    info!(
        "Refresh loop started with {} hook(s), every {:?}",
        tickables.len(),
        interval
    );

    loop {
        tick_all(&tickables, hook_timeout).await;
        tokio::time::sleep(interval).await;
    }
}

/// Invokes each hook in turn, waiting for one to finish before starting the
/// next. A failing or stuck hook is logged and skipped. Returns the number of
/// hooks that completed successfully.
pub async fn tick_all(tickables: &[Arc<dyn Tickable>], hook_timeout: Duration) -> usize {
    let mut succeeded = 0;

    for tickable in tickables {
        match tokio::time::timeout(hook_timeout, tickable.tick()).await {
            Ok(Ok(())) => succeeded += 1,
            Ok(Err(e)) => error!("Timer hook {} failed: {:?}", tickable.name(), e),
            Err(_) => warn!(
                "Timer hook {} did not finish within {:?}",
                tickable.name(),
                hook_timeout
            ),
        }
    }

    succeeded
}

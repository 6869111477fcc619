//! Builders to construct rate-limited queues from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{LimiterConfig, QueueConfig, QueueSetConfig};
use crate::core::{AlwaysAccept, NeverAccept, QueueError, RateLimitedTimedQueue, RateLimiter, TokenBucket};
use crate::util::clock::Clock;

/// Build the limiter described by `cfg`.
pub fn build_limiter(cfg: &LimiterConfig) -> Result<Arc<dyn RateLimiter>, QueueError> {
    cfg.validate().map_err(QueueError::InvalidConfig)?;
    let limiter: Arc<dyn RateLimiter> = match cfg {
        LimiterConfig::TokenBucket { qps, burst } => Arc::new(TokenBucket::new(*qps, *burst)?),
        LimiterConfig::Unlimited => Arc::new(AlwaysAccept),
        LimiterConfig::Never => Arc::new(NeverAccept::new()),
    };
    Ok(limiter)
}

/// Build a single queue reading time from `clock`.
pub fn build_queue(
    cfg: &QueueConfig,
    clock: Arc<dyn Clock>,
) -> Result<RateLimitedTimedQueue, QueueError> {
    cfg.validate()
        .map_err(|e| QueueError::InvalidConfig(format!("config invalid: {e}")))?;
    let limiter = build_limiter(&cfg.limiter)?;
    tracing::debug!(leak = cfg.leak, limiter = ?cfg.limiter, "building timed queue");
    Ok(RateLimitedTimedQueue::new(limiter, cfg.leak, clock))
}

/// Build every queue in `cfg`, all sharing `clock`.
pub fn build_queues(
    cfg: &QueueSetConfig,
    clock: &Arc<dyn Clock>,
) -> Result<HashMap<String, RateLimitedTimedQueue>, QueueError> {
    cfg.validate()
        .map_err(|e| QueueError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut queues = HashMap::with_capacity(cfg.queues.len());
    for (name, queue_cfg) in &cfg.queues {
        let queue = build_queue(queue_cfg, Arc::clone(clock))?;
        queues.insert(name.clone(), queue);
    }
    Ok(queues)
}

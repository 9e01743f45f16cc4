//! Bounded exponential backoff and the process-wide ceiling on provider calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use study_core::config::RetryConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::warn;

use crate::error::AiError;
use crate::provider::{CompletionRequest, LlmError, LlmProvider};

/// Backoff schedule for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    base_delay: Duration,
    factor: f64,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            factor: config.backoff_factor.max(1.0),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            jitter: config.jitter,
        }
    }

    /// Delay before retry number `attempt` (1-based): base * factor^(attempt-1),
    /// capped, plus up to 25% random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt.saturating_sub(1) as i32);
        let ms = (self.base_delay.as_millis() as f64 * exp).min(self.max_delay.as_millis() as f64);
        let jitter = if self.jitter && ms >= 4.0 {
            rand::thread_rng().gen_range(0.0..ms / 4.0)
        } else {
            0.0
        };
        Duration::from_millis((ms + jitter) as u64)
    }
}

/// Shared by every orchestrator call: at most `max_concurrent` requests are in
/// flight, and a rate-limit response pauses all new requests until the
/// cooldown passes.
#[derive(Clone)]
pub struct RateGate {
    permits: Arc<Semaphore>,
    cooldown_until: Arc<Mutex<Option<Instant>>>,
}

impl RateGate {
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1) as usize)),
            cooldown_until: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait out any cooldown, then take a slot.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        loop {
            let until = *self
                .cooldown_until
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match until {
                Some(t) if t > Instant::now() => tokio::time::sleep_until(t).await,
                _ => break,
            }
        }
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }

    /// Hold back every caller for at least `delay`.
    pub fn cool_down(&self, delay: Duration) {
        let until = Instant::now() + delay;
        let mut slot = self
            .cooldown_until
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.map_or(true, |current| current < until) {
            *slot = Some(until);
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Call the provider through `gate`, retrying transient failures per `policy`.
///
/// The gate slot is released before sleeping so waiting retries do not
/// hold capacity other requests could use.
pub async fn complete_with_retry(
    client: &dyn LlmProvider,
    gate: &RateGate,
    policy: &RetryPolicy,
    request: &CompletionRequest,
) -> Result<String, AiError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let permit = gate.acquire().await;
        let outcome = client.complete(request).await;
        drop(permit);

        match outcome {
            Ok(raw) => return Ok(raw),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                if matches!(e, LlmError::RateLimited { .. }) {
                    gate.cool_down(delay);
                }
                warn!(
                    provider = client.name(),
                    model = %request.model,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient AI failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(
                    provider = client.name(),
                    model = %request.model,
                    attempt,
                    error = %e,
                    "AI call failed"
                );
                return Err(AiError::from_provider(e, attempt));
            }
        }
    }
}

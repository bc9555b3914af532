use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::SourceError;

/// Exponential backoff with ±25% jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            base: Duration::from_millis(250),
            max: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base.saturating_mul(factor).min(self.max)
    }

    fn jittered(&self, retry: u32) -> Duration {
        let d = self.backoff(retry).as_millis() as f64;
        let j = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((d * j).round() as u64)
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = String::new();

    for attempt in 0..attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last = e.to_string();
                if attempt + 1 < attempts {
                    let delay = policy.jittered(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {} (retrying in {}ms)",
                        label,
                        attempt + 1,
                        attempts,
                        last,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(SourceError::RetriesExhausted {
        label: label.to_string(),
        attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(0), Duration::from_millis(250));
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(10), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let p = RetryPolicy::default();
        for _ in 0..50 {
            let d = p.jittered(1).as_millis();
            assert!((375..=625).contains(&d), "jittered delay {} out of range", d);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out = with_retry(RetryPolicy::default(), "gamelog", move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("503")
                }
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = with_retry(RetryPolicy::default(), "gamelog", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow::anyhow!("timeout"))
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            SourceError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "timeout");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

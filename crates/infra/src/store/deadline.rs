//! Per-operation deadline policy.

use std::future::Future;
use std::time::Duration;

use super::StoreError;

/// Upper bound for a single store operation.
///
/// Passed explicitly to every store call; the policy lives with the caller
/// (the API builds it from configuration). A hung query fails its own request
/// with `StoreError::Timeout` and the dropped future releases whatever it held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDeadline(Duration);

impl QueryDeadline {
    pub const DEFAULT: Self = Self(Duration::from_secs(3));

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn duration(self) -> Duration {
        self.0
    }

    /// Run `fut` under this deadline.
    pub async fn run<T, F>(self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.0, fut).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(operation, deadline_ms = self.0.as_millis() as u64, "store operation timed out");
                Err(StoreError::Timeout {
                    operation,
                    deadline: self.0,
                })
            }
        }
    }
}

impl Default for QueryDeadline {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out() {
        let deadline = QueryDeadline::new(Duration::from_secs(3));
        let result: Result<(), StoreError> = deadline
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert_eq!(
            result,
            Err(StoreError::Timeout {
                operation: "slow",
                deadline: Duration::from_secs(3)
            })
        );
    }

    #[tokio::test]
    async fn fast_operation_passes_result_through() {
        let ok = QueryDeadline::DEFAULT.run("fast", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<(), _> = QueryDeadline::DEFAULT
            .run("fast", async { Err(StoreError::not_found("event")) })
            .await;
        assert_eq!(err, Err(StoreError::not_found("event")));
    }
}

//! Timeout enforcement.
//!
//! # Responsibilities
//! - Turn the configured budgets into durations
//! - Wrap dials and handshake reads with a deadline
//! - Track relay activity across both directions of a session
//! - Report which stage ran out of time
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A timed-out session is closed like any other failed session

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::TimeoutConfig;

/// The part of a session a deadline applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dial,
    Handshake,
    Status,
    Idle,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Dial => "dial",
            Stage::Handshake => "handshake",
            Stage::Status => "status",
            Stage::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// A stage did not complete in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stage} timed out after {after:?}")]
pub struct TimeoutError {
    pub stage: Stage,
    pub after: Duration,
}

impl From<TimeoutError> for io::Error {
    fn from(err: TimeoutError) -> Self {
        io::Error::new(io::ErrorKind::TimedOut, err)
    }
}

/// Per-stage time budgets for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub handshake: Duration,
    pub idle: Duration,
    pub shutdown: Duration,
}

impl Timeouts {
    /// Budget for `stage`. Status steps share the handshake budget.
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Dial => self.connect,
            Stage::Handshake | Stage::Status => self.handshake,
            Stage::Idle => self.idle,
        }
    }
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect_secs),
            handshake: Duration::from_secs(config.handshake_secs),
            idle: Duration::from_secs(config.idle_secs),
            shutdown: Duration::from_secs(config.shutdown_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Run `fut` with a deadline, tagging an expiry with `stage`.
pub async fn within<F>(stage: Stage, limit: Duration, fut: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimeoutError { stage, after: limit })
}

/// Last time any direction of a relay moved bytes.
///
/// Shared by both pumps of a session; a wait only expires once the whole
/// session has been silent for the idle budget.
#[derive(Debug)]
pub struct IdleClock {
    started: Instant,
    last_ms: AtomicU64,
}

impl IdleClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> Instant {
        self.started + Duration::from_millis(self.last_ms.load(Ordering::Relaxed))
    }

    /// Drive `fut` until it completes or the session has been idle for `idle`.
    pub async fn run<F>(&self, idle: Duration, fut: F) -> Result<F::Output, TimeoutError>
    where
        F: Future,
    {
        tokio::pin!(fut);
        loop {
            let deadline = self.last_activity() + idle;
            tokio::select! {
                output = &mut fut => return Ok(output),
                _ = tokio::time::sleep_until(deadline) => {
                    if self.last_activity() + idle <= Instant::now() {
                        return Err(TimeoutError { stage: Stage::Idle, after: idle });
                    }
                }
            }
        }
    }
}

impl Default for IdleClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_budget() {
        let value = within(Stage::Handshake, Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn reports_expired_stage() {
        let limit = Duration::from_millis(50);
        let err = within(Stage::Idle, limit, tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err, TimeoutError { stage: Stage::Idle, after: limit });
        assert_eq!(err.to_string(), "idle timed out after 50ms");

        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn stages_map_to_budgets() {
        let timeouts = Timeouts::from(&TimeoutConfig {
            connect_secs: 1,
            handshake_secs: 2,
            idle_secs: 3,
            shutdown_secs: 4,
        });
        assert_eq!(timeouts.for_stage(Stage::Dial), Duration::from_secs(1));
        assert_eq!(timeouts.for_stage(Stage::Status), Duration::from_secs(2));
        assert_eq!(timeouts.for_stage(Stage::Idle), Duration::from_secs(3));
        assert_eq!(timeouts.shutdown, Duration::from_secs(4));
    }

    #[tokio::test]
    async fn idle_clock_expires_without_activity() {
        let clock = IdleClock::new();
        let idle = Duration::from_millis(50);
        let err = clock
            .run(idle, tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err, TimeoutError { stage: Stage::Idle, after: idle });
    }

    #[tokio::test]
    async fn idle_clock_extends_while_touched_elsewhere() {
        let clock = std::sync::Arc::new(IdleClock::new());
        let idle = Duration::from_millis(200);

        let toucher = {
            let clock = clock.clone();
            tokio::spawn(async move {
                for _ in 0..12 {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    clock.touch();
                }
            })
        };

        // Outlives the idle budget several times over, but activity elsewhere keeps it alive.
        let waited = clock.run(idle, tokio::time::sleep(Duration::from_millis(400))).await;
        assert!(waited.is_ok());
        toucher.await.unwrap();

        let err = clock.run(idle, std::future::pending::<()>()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Idle);
    }
}

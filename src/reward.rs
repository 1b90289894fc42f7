use crate::error::LedgerError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

/// Opaque reference to a recorded ledger transaction.
pub type TxRef = String;

/// Boundary to the external reward ledger. The core only ever hands over a
/// `(winner, loser)` account pair; transport and confirmation mechanics
/// live behind this trait.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    async fn record_outcome(&self, winner: &str, loser: &str) -> Result<TxRef, LedgerError>;
}

/// Ledger used when no external backend is wired up: outcomes are logged
/// and acknowledged locally.
pub struct LogLedger;

#[async_trait]
impl RewardLedger for LogLedger {
    async fn record_outcome(&self, winner: &str, loser: &str) -> Result<TxRef, LedgerError> {
        info!(winner, loser, "recording outcome on log-only ledger");
        Ok(format!("log:{}>{}", winner, loser))
    }
}

const MAX_ATTEMPTS: u32 = 4;
const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);
const TOTAL_DEADLINE: Duration = Duration::from_secs(60);

/// Fire a reward transfer off the tick path. The caller never awaits the
/// result; failure is logged and gameplay state stays as committed.
pub fn spawn_record_outcome(ledger: Arc<dyn RewardLedger>, winner: String, loser: String) {
    tokio::spawn(async move {
        match record_with_retry(ledger.as_ref(), &winner, &loser).await {
            Ok(tx) => info!(%winner, %loser, %tx, "reward transfer recorded"),
            Err(err) => error!(%winner, %loser, %err, "reward transfer abandoned"),
        }
    });
}

/// Call the ledger with exponential backoff, a bounded attempt count and a
/// terminal deadline.
pub async fn record_with_retry(
    ledger: &dyn RewardLedger,
    winner: &str,
    loser: &str,
) -> Result<TxRef, LedgerError> {
    let attempts = async {
        let mut delay = INITIAL_DELAY;
        let mut attempt = 1;
        loop {
            match ledger.record_outcome(winner, loser).await {
                Ok(tx) => return Ok(tx),
                Err(err) if attempt < MAX_ATTEMPTS => {
                    debug!(attempt, %err, "ledger call failed, backing off");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, %err, "ledger call failed, out of attempts");
                    return Err(LedgerError::Exhausted(attempt));
                }
            }
        }
    };
    timeout(TOTAL_DEADLINE, attempts)
        .await
        .map_err(|_| LedgerError::Deadline)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, succeeds afterwards.
    struct FlakyLedger {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyLedger {
        fn new(failures: u32) -> Self {
            FlakyLedger {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl RewardLedger for FlakyLedger {
        async fn record_outcome(&self, winner: &str, _loser: &str) -> Result<TxRef, LedgerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(LedgerError::Transport("connection reset".into()))
            } else {
                Ok(format!("0xTX{}{}", winner, n))
            }
        }
    }

    struct StuckLedger;

    #[async_trait]
    impl RewardLedger for StuckLedger {
        async fn record_outcome(&self, _: &str, _: &str) -> Result<TxRef, LedgerError> {
            sleep(Duration::from_secs(3600)).await;
            unreachable!("the deadline fires first")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_ledger_recovers() {
        let ledger = FlakyLedger::new(2);
        let tx = record_with_retry(&ledger, "0xW", "0xL").await.unwrap();
        assert!(tx.starts_with("0xTX"));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_bounded_attempts() {
        let ledger = FlakyLedger::new(u32::MAX);
        let err = record_with_retry(&ledger, "0xW", "0xL").await.unwrap_err();
        assert!(matches!(err, LedgerError::Exhausted(n) if n == MAX_ATTEMPTS));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn a_hung_ledger_hits_the_deadline() {
        let err = record_with_retry(&StuckLedger, "0xW", "0xL").await.unwrap_err();
        assert!(matches!(err, LedgerError::Deadline));
    }

    #[tokio::test]
    async fn log_ledger_always_acknowledges() {
        let tx = LogLedger.record_outcome("0xW", "0xL").await.unwrap();
        assert_eq!(tx, "log:0xW>0xL");
    }
}

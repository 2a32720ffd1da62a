//! # Per-listener deadline and cancellation
//!
//! [`with_timeout`] races a pending listener outcome against an optional
//! deadline and an optional [`CancellationToken`]:
//!
//! ```text
//! pending settles first  → its own Ok / Err
//! token fires first      → Err(DispatchError::Aborted)
//! deadline elapses first → Err(DispatchError::TimedOut)
//! ```
//!
//! ## Rules
//! - No deadline and no token: the pending future is awaited as-is.
//! - A token that is already cancelled settles immediately; `pending` is never polled.
//! - Ties go to `pending`, then the token, then the deadline.
//! - The losing `Sleep` and cancellation waiter are dropped when the race ends,
//!   which deregisters them from the runtime. Nothing is spawned.
//! - Only the wrapped invocation is affected; the token is observed, never cancelled here.

use crate::error::DispatchError;
use std::future::{Future, pending};
use std::time::Duration;
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Wraps `pending` with an optional deadline and cancellation token.
///
/// A zero `timeout` is treated as no deadline.
///
/// # Errors
/// Returns the error of `pending`, [`DispatchError::TimedOut`] if the deadline
/// elapsed first, or [`DispatchError::Aborted`] if `token` fired first.
///
/// # Examples
/// ```rust
/// use herald_events::with_timeout;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let never = std::future::pending::<Result<(), herald_events::DispatchError>>();
/// let err = with_timeout(never, Some(Duration::from_millis(5)), None).await.unwrap_err();
/// assert!(err.is_timeout());
/// # }
/// ```
pub async fn with_timeout<F, R>(
    pending_outcome: F,
    timeout: Option<Duration>,
    token: Option<&CancellationToken>,
) -> Result<R, DispatchError>
where
    F: Future<Output = Result<R, DispatchError>>,
{
    let timeout = timeout.filter(|d| !d.is_zero());

    if timeout.is_none() && token.is_none() {
        return pending_outcome.await;
    }

    if token.is_some_and(CancellationToken::is_cancelled) {
        return Err(DispatchError::Aborted { context: Some("token already cancelled".into()) });
    }

    let deadline = async {
        match timeout {
            Some(dur) => time::sleep(dur).await,
            None => pending::<()>().await,
        }
    };

    let cancelled = async {
        match token {
            Some(token) => token.cancelled().await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        outcome = pending_outcome => outcome,
        () = cancelled => Err(DispatchError::Aborted { context: None }),
        () = deadline => Err(DispatchError::TimedOut {
            timeout: timeout.unwrap_or_default(),
            context: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_passthrough_without_deadline_or_token() {
        let ok = with_timeout(async { Ok::<_, DispatchError>(7) }, None, None).await.unwrap();
        assert_eq!(ok, 7);

        let err = with_timeout(
            async { Err::<(), _>(DispatchError::listener("boom")) },
            Some(Duration::ZERO),
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_listener_failure(), "zero timeout must not wrap");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wins_against_never_settling() {
        let started = time::Instant::now();
        let err = with_timeout(pending::<Result<(), DispatchError>>(), Some(Duration::from_millis(100)), None)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(
            matches!(err, DispatchError::TimedOut { timeout, .. } if timeout == Duration::from_millis(100))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_wins_over_distant_deadline_and_idle_token() {
        let token = CancellationToken::new();
        let outcome = with_timeout(
            async {
                time::sleep(Duration::from_millis(10)).await;
                Ok::<_, DispatchError>("done")
            },
            Some(Duration::from_secs(60)),
            Some(&token),
        )
        .await;
        assert_eq!(outcome.unwrap(), "done");
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loser_pending_is_dropped_on_timeout() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        let never = async move {
            let _flag = flag;
            pending::<Result<(), DispatchError>>().await
        };

        let err = with_timeout(never, Some(Duration::from_millis(5)), None).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(dropped.load(Ordering::SeqCst), "pending future must be dropped after losing");
    }

    #[tokio::test]
    async fn test_already_cancelled_token_aborts_without_polling() {
        let token = CancellationToken::new();
        token.cancel();
        let polled = Arc::new(AtomicBool::new(false));
        let polled_flag = Arc::clone(&polled);

        let err = with_timeout(
            async move {
                polled_flag.store(true, Ordering::SeqCst);
                Ok::<(), DispatchError>(())
            },
            None,
            Some(&token),
        )
        .await
        .unwrap_err();

        assert!(err.is_aborted());
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_fired_mid_flight_aborts() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = with_timeout(
            pending::<Result<(), DispatchError>>(),
            Some(Duration::from_secs(5)),
            Some(&token),
        )
        .await
        .unwrap_err();
        assert!(err.is_aborted());
    }
}

//! Cancellation and deadlines for a build.
//!
//! A [`BuildContext`] travels with every `build` call. It carries an
//! optional deadline and an optional cancellation signal, the latter being a
//! `tokio::sync::watch` channel like the one long-running loops use for
//! shutdown. Contexts are cheap to clone; every clone observes the same
//! signal.

use std::future::{pending, Future};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Why a build stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelCause {
    #[error("cancelled by caller")]
    Signalled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Sending half of a context's cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fires the signal. Idempotent, and works with no context left alive.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cancellation scope for one build request.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl BuildContext {
    /// A context that never cancels and never expires.
    pub fn background() -> Self {
        Self::default()
    }

    /// A fresh context plus the handle that cancels it.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Observes an existing shutdown channel: `true` means stop.
    pub fn from_signal(rx: watch::Receiver<bool>) -> Self {
        Self {
            deadline: None,
            cancel: Some(rx),
        }
    }

    /// Adds a deadline `timeout` from now. An earlier deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Adds an absolute deadline. An earlier deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, or `None` while it is still live.
    ///
    /// An explicit signal takes precedence over an expired deadline.
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(CancelCause::Signalled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fails fast when the context is already done.
    pub fn check(&self) -> Result<(), CancelCause> {
        match self.cancel_cause() {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    /// Drives `fut` to completion unless the context finishes first.
    ///
    /// `fut` is not polled at all when the context is already done. On
    /// cancellation `fut` is dropped mid-flight; callers must not rely on it
    /// having run to any particular point.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, CancelCause> {
        self.check()?;

        let mut cancel = self.cancel.clone();
        let signalled = async move {
            if let Some(rx) = cancel.as_mut() {
                // A dropped handle can no longer fire; treat it as never.
                let fired = rx.wait_for(|fired| *fired).await.is_ok();
                if fired {
                    return;
                }
            }
            pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = signalled => Err(CancelCause::Signalled),
            _ = expired => Err(CancelCause::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

//! Caller context: deadline and cancellation for blocking database calls.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{ModelError, Result};

/// Deadline and cancellation state propagated into every statement.
///
/// A context that is already done when an operation starts prevents the
/// statement from being issued; one that becomes done mid-flight interrupts it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Context {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a copy of this context that expires at `deadline`.
    ///
    /// An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns a copy of this context that expires `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy of this context tied to `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has been cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.state().is_err()
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` once the context is done.
    pub fn check(&self) -> Result<()> {
        self.state()
    }

    fn state(&self) -> Result<()> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ModelError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ModelError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Whether anything can ever end this context.
    pub(crate) fn is_bounded(&self) -> bool {
        self.deadline.is_some() || self.token.is_some()
    }

    pub(crate) fn interrupt(&self) -> Interrupt {
        Interrupt {
            deadline: self.deadline,
            token: AssertUnwindSafe(self.token.clone()),
        }
    }
}

/// Owned snapshot of a context, polled by the SQLite progress handler.
pub(crate) struct Interrupt {
    deadline: Option<Instant>,
    token: AssertUnwindSafe<Option<CancellationToken>>,
}

impl Interrupt {
    pub(crate) fn fired(&self) -> bool {
        (*self.token)
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

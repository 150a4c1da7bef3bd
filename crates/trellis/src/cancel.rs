//! Coarse cancellation for tracker operations.
//!
//! Operations run to completion synchronously under the tracker lock, so
//! cancellation is cooperative: the signal is checked when an operation starts
//! and periodically inside long loops (cycle-guard traversal, ready-work and
//! search scans). A canceled operation fails with [`Error::Canceled`] before
//! committing anything.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Number of loop iterations between cancellation checks.
pub(crate) const CHECK_INTERVAL: usize = 1024;

/// A caller-supplied cancellation signal: a token, a deadline, both or neither.
#[derive(Debug, Clone, Default)]
pub struct Cancel {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Cancel {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Cancel when `token` is canceled.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Also cancel once `deadline` has passed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Also cancel once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns true if the token fired or the deadline passed.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`Error::Canceled`] if the signal has fired.
    ///
    /// # Errors
    ///
    /// Returns `Error::Canceled` when [`Cancel::is_canceled`] is true.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(Error::Canceled);
        }
        Ok(())
    }

    /// Check the signal only every [`CHECK_INTERVAL`] iterations of a loop.
    pub(crate) fn check_every(&self, iteration: usize) -> Result<()> {
        if iteration % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

//! Cancellable, deadline-bearing execution context.
//!
//! One context is created per invocation and handed down to every component
//! that talks to the collaborator. Cancelling it aborts in-flight calls and
//! prevents new ones from being issued.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a guarded future did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// A context without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now. A timeout too large
    /// to represent as an instant leaves the context without a deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails fast if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Interruption> {
        if self.token.is_cancelled() {
            return Err(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interruption::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Runs `fut` until it completes, the token is cancelled, or the deadline passes.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, Interruption>
    where
        F: Future,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interruption::Cancelled),
            _ = deadline => Err(Interruption::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }

    /// Cancellable sleep, used between retry attempts.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interruption> {
        self.guard(tokio::time::sleep(duration)).await
    }
}

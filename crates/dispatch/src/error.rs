//! Error types for dispatch sessions.

use thiserror::Error;

/// Type-erased error raised by an interceptor body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that end a dispatch session.
///
/// There is no partial result: a session either returns its stabilized call or
/// fails with one of these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError<E> {
	/// A send was attempted after the session used its whole send budget.
	#[error("max send count {max_sends} exceeded")]
	BudgetExceeded {
		/// The configured maximum number of sends per session.
		max_sends: u32,
	},
	/// The transport failed; the error is passed through untouched.
	#[error("transport failed: {0}")]
	Transport(#[source] E),
	/// An interceptor failed the session.
	#[error("interceptor failed: {0}")]
	Interceptor(#[source] BoxError),
	/// The call context was cancelled.
	#[error("call cancelled")]
	Cancelled,
}

impl<E> DispatchError<E> {
	/// Wraps an interceptor failure.
	pub fn interceptor(err: impl Into<BoxError>) -> Self {
		Self::Interceptor(err.into())
	}

	/// Returns true for [`DispatchError::BudgetExceeded`].
	pub fn is_budget_exceeded(&self) -> bool {
		matches!(self, Self::BudgetExceeded { .. })
	}

	/// Returns true for [`DispatchError::Cancelled`].
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Returns the transport error, if this is one.
	pub fn transport_error(&self) -> Option<&E> {
		match self {
			Self::Transport(err) => Some(err),
			_ => None,
		}
	}
}

/// Result type for dispatch operations.
pub type Result<T, E> = std::result::Result<T, DispatchError<E>>;

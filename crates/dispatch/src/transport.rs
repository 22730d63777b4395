//! Transport seam and the budgeted per-session sender.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::CallContext;
use crate::dispatcher::DispatchPhase;
use crate::error::{self, DispatchError};

/// Performs one send of a request descriptor.
///
/// Implemented by the host's wire-level client. The dispatcher never inspects
/// requests, calls, or errors; it only counts sends and forwards failures.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	/// Mutable request descriptor shared with interceptors for one session.
	type Request: Send + Sync;
	/// One completed send outcome.
	type Call: Send + Sync;
	/// Transport-level failure.
	type Error: std::error::Error + Send + Sync + 'static;

	/// Sends `request` once.
	async fn send(&self, request: &Self::Request) -> Result<Self::Call, Self::Error>;
}

/// Budgeted send handle for one dispatch session.
///
/// Every transport send goes through [`Sender::send`], which owns the session's
/// attempt counter. Interceptors can trigger sends but cannot touch the count.
pub struct Sender<'a, T: Transport> {
	transport: &'a T,
	ctx: &'a CallContext,
	sends: u32,
	max_sends: u32,
}

impl<'a, T: Transport> Sender<'a, T> {
	pub(crate) fn new(transport: &'a T, ctx: &'a CallContext, max_sends: u32) -> Self {
		Self {
			transport,
			ctx,
			sends: 0,
			max_sends,
		}
	}

	/// Returns the number of sends performed so far in this session.
	pub const fn sends(&self) -> u32 {
		self.sends
	}

	/// Returns the session's send budget.
	pub const fn max_sends(&self) -> u32 {
		self.max_sends
	}

	/// Returns how many sends are left before the budget is exhausted.
	pub const fn remaining(&self) -> u32 {
		self.max_sends.saturating_sub(self.sends)
	}

	/// Sends `request` through the transport, consuming one unit of budget.
	///
	/// Cancellation is checked before the budget, so a cancelled session
	/// reports [`DispatchError::Cancelled`] even when its budget is also spent.
	pub async fn send(&mut self, request: &T::Request) -> error::Result<Arc<T::Call>, T::Error> {
		if self.ctx.is_cancelled() {
			tracing::debug!(sends = self.sends, "dispatch.cancelled");
			return Err(DispatchError::Cancelled);
		}
		if self.sends >= self.max_sends {
			tracing::warn!(
				phase = DispatchPhase::Exhausted.as_str(),
				max_sends = self.max_sends,
				"dispatch.budget_exceeded"
			);
			return Err(DispatchError::BudgetExceeded { max_sends: self.max_sends });
		}

		self.sends += 1;
		tracing::trace!(
			phase = DispatchPhase::Sending.as_str(),
			attempt = self.sends,
			max_sends = self.max_sends,
			"dispatch.send"
		);
		match self.ctx.guard(self.transport.send(request)).await {
			Some(Ok(call)) => Ok(Arc::new(call)),
			Some(Err(err)) => Err(DispatchError::Transport(err)),
			None => {
				tracing::debug!(sends = self.sends, "dispatch.cancelled");
				Err(DispatchError::Cancelled)
			}
		}
	}
}

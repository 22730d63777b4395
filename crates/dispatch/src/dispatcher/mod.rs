//! Bounded reconciliation loop over an interceptor chain.
//!
//! # Data flow
//!
//! 1. Sending: the initial send goes through the session [`Sender`].
//! 2. Reconciling: interceptors run in registration order against the current call.
//! 3. The first interceptor returning a different `Arc` wins the pass; the scan
//!    restarts at interceptor zero with the new call.
//! 4. Stable: a full scan with no replacement marks the [`CallContext`]
//!    complete, then returns the call.
//!
//! # Invariants
//!
//! * Every transport send spends exactly one unit of the session budget.
//! * A send past the budget fails the whole session with `BudgetExceeded`.
//! * Registration order is fixed once [`DispatcherBuilder::build`] runs.
//! * Completion is signalled before the stable call is handed back, and never
//!   for failed sessions.

use std::sync::Arc;

use tracing::Instrument;

use crate::config::DispatchConfig;
use crate::context::CallContext;
use crate::error::{self, DispatchError};
use crate::interceptor::Interceptor;
use crate::transport::{Sender, Transport};


/// Phase of one dispatch session, as reported in trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchPhase {
	Sending,
	Reconciling,
	Stable,
	Exhausted,
}

impl DispatchPhase {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Sending => "sending",
			Self::Reconciling => "reconciling",
			Self::Stable => "stable",
			Self::Exhausted => "exhausted",
		}
	}
}

/// Setup-time builder collecting the interceptor chain.
pub struct DispatcherBuilder<T: Transport> {
	transport: Arc<T>,
	interceptors: Vec<Arc<dyn Interceptor<T>>>,
	config: DispatchConfig,
}

impl<T: Transport> DispatcherBuilder<T> {
	/// Starts a builder around `transport` with default config.
	pub fn new(transport: T) -> Self {
		Self::from_arc(Arc::new(transport))
	}

	/// Starts a builder around a shared transport.
	pub fn from_arc(transport: Arc<T>) -> Self {
		Self {
			transport,
			interceptors: Vec::new(),
			config: DispatchConfig::default(),
		}
	}

	/// Replaces the whole config.
	#[must_use]
	pub fn config(mut self, config: DispatchConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the per-session send budget.
	///
	/// # Panics
	///
	/// Panics if `max_sends` is zero.
	#[must_use]
	pub fn max_sends(mut self, max_sends: u32) -> Self {
		assert!(max_sends > 0, "max_sends must be > 0");
		self.config.max_sends = max_sends;
		self
	}

	/// Appends an interceptor; order of calls is evaluation order.
	#[must_use]
	pub fn intercept(self, interceptor: impl Interceptor<T> + 'static) -> Self {
		self.intercept_arc(Arc::new(interceptor))
	}

	/// Appends a shared interceptor.
	#[must_use]
	pub fn intercept_arc(mut self, interceptor: Arc<dyn Interceptor<T>>) -> Self {
		self.interceptors.push(interceptor);
		self
	}

	/// Freezes the chain.
	pub fn build(self) -> Dispatcher<T> {
		Dispatcher {
			transport: self.transport,
			interceptors: Arc::from(self.interceptors),
			config: self.config,
		}
	}
}

/// Immutable dispatch configuration: transport, ordered interceptors, budget.
///
/// Cheap to clone and safe to share; each [`Dispatcher::dispatch`] call runs
/// its own session with its own send counter.
pub struct Dispatcher<T: Transport> {
	transport: Arc<T>,
	interceptors: Arc<[Arc<dyn Interceptor<T>>]>,
	config: DispatchConfig,
}

impl<T: Transport> Clone for Dispatcher<T> {
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			interceptors: Arc::clone(&self.interceptors),
			config: self.config,
		}
	}
}

impl<T: Transport> std::fmt::Debug for Dispatcher<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dispatcher")
			.field("interceptors", &self.interceptors.len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl<T: Transport> Dispatcher<T> {
	/// Shorthand for [`DispatcherBuilder::new`].
	pub fn builder(transport: T) -> DispatcherBuilder<T> {
		DispatcherBuilder::new(transport)
	}

	/// Returns the config shared by all sessions.
	pub fn config(&self) -> &DispatchConfig {
		&self.config
	}

	/// Returns the number of registered interceptors.
	pub fn interceptor_count(&self) -> usize {
		self.interceptors.len()
	}

	/// Runs one dispatch session for `request` and returns the stable call.
	pub async fn dispatch(&self, request: &mut T::Request, ctx: &CallContext) -> error::Result<Arc<T::Call>, T::Error> {
		let span = tracing::debug_span!("dispatch", max_sends = self.config.max_sends);
		self.run_session(request, ctx).instrument(span).await
	}

	async fn run_session(&self, request: &mut T::Request, ctx: &CallContext) -> error::Result<Arc<T::Call>, T::Error> {
		let mut sender = Sender::new(&*self.transport, ctx, self.config.max_sends);
		let mut current = sender.send(request).await?;
		let mut passes = 0u32;

		'reconcile: loop {
			for (index, interceptor) in self.interceptors.iter().enumerate() {
				let candidate = ctx
					.guard(interceptor.intercept(&mut sender, &mut *request, Arc::clone(&current)))
					.await
					.ok_or(DispatchError::Cancelled)??;

				if !Arc::ptr_eq(&candidate, &current) {
					passes = passes.saturating_add(1);
					tracing::trace!(
						phase = DispatchPhase::Reconciling.as_str(),
						interceptor = index,
						pass = passes,
						sends = sender.sends(),
						"dispatch.replaced"
					);
					current = candidate;
					continue 'reconcile;
				}
			}
			break;
		}

		// An interceptor may have swallowed a cancelled send.
		if ctx.is_cancelled() {
			tracing::debug!(sends = sender.sends(), "dispatch.cancelled");
			return Err(DispatchError::Cancelled);
		}
		ctx.mark_complete();
		tracing::debug!(
			phase = DispatchPhase::Stable.as_str(),
			sends = sender.sends(),
			passes,
			"dispatch.stable"
		);
		Ok(current)
	}
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::error;
use crate::transport::{Sender, Transport};

/// One policy in the reconciliation chain (redirect, retry, auth refresh, ...).
///
/// Returning `call` itself (the same `Arc`) means "no change". Any other `Arc`,
/// even one holding an equal value, replaces the current result and restarts
/// the pass from the first interceptor.
#[async_trait]
pub trait Interceptor<T: Transport>: Send + Sync {
	/// Inspects the current result and optionally replaces it.
	///
	/// `sender` may be used to resend `request`; each send spends session budget.
	async fn intercept(
		&self,
		sender: &mut Sender<'_, T>,
		request: &mut T::Request,
		call: Arc<T::Call>,
	) -> error::Result<Arc<T::Call>, T::Error>;
}

/// Interceptor built from a synchronous closure.
///
/// The closure returns `Some(call)` to replace the current result without
/// sending, or `None` to keep it.
pub struct FnInterceptor<F> {
	f: F,
}

/// Wraps a synchronous closure as an [`Interceptor`].
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F> {
	FnInterceptor { f }
}

#[async_trait]
impl<T, F> Interceptor<T> for FnInterceptor<F>
where
	T: Transport,
	F: Fn(&mut T::Request, &T::Call) -> Option<T::Call> + Send + Sync,
{
	async fn intercept(
		&self,
		_sender: &mut Sender<'_, T>,
		request: &mut T::Request,
		call: Arc<T::Call>,
	) -> error::Result<Arc<T::Call>, T::Error> {
		Ok(match (self.f)(request, &call) {
			Some(replacement) => Arc::new(replacement),
			None => call,
		})
	}
}

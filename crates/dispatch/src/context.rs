use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle handle for one logical client call.
///
/// The host pipeline owns the call; the dispatcher only observes cancellation
/// and flips completion once the call has a stable result.
#[derive(Debug, Clone)]
pub struct CallContext {
	cancel: CancellationToken,
	completed: Arc<watch::Sender<bool>>,
}

impl Default for CallContext {
	fn default() -> Self {
		Self::new()
	}
}

impl CallContext {
	/// Creates a context with a fresh cancellation token.
	pub fn new() -> Self {
		Self::with_cancellation(CancellationToken::new())
	}

	/// Creates a context driven by a host-owned cancellation token.
	pub fn with_cancellation(cancel: CancellationToken) -> Self {
		let (completed, _) = watch::channel(false);
		Self {
			cancel,
			completed: Arc::new(completed),
		}
	}

	/// Creates a context cancelled whenever `parent` is.
	pub fn child_of(parent: &CancellationToken) -> Self {
		Self::with_cancellation(parent.child_token())
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns the underlying cancellation token.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Marks the call complete. Returns true only for the first call.
	pub fn mark_complete(&self) -> bool {
		self.completed.send_if_modified(|done| !std::mem::replace(done, true))
	}

	/// Returns true once the call has been marked complete.
	pub fn is_complete(&self) -> bool {
		*self.completed.borrow()
	}

	/// Future resolving once the call is marked complete.
	pub async fn completed(&self) {
		let mut rx = self.completed.subscribe();
		// The sender lives as long as `self`, so this cannot observe a closed channel.
		let _ = rx.wait_for(|done| *done).await;
	}

	/// Runs `fut` unless cancellation wins first.
	pub(crate) async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => None,
			out = fut => Some(out),
		}
	}
}

//! Bounded, interceptor-driven request dispatch.
//!
//! A [`Dispatcher`] performs one initial send through a host-supplied
//! [`Transport`] and then offers the result to an ordered chain of
//! [`Interceptor`]s (redirect, retry, auth refresh, ...) until a full pass
//! leaves it unchanged. Every send, including the ones interceptors trigger
//! through the session [`Sender`], spends one unit of a per-session budget;
//! running out fails the session with [`DispatchError::BudgetExceeded`].
//!
//! * [`CallContext`]: cancellation and completion for one logical call.
//! * [`DispatchConfig`]: send budget, loadable from TOML.
//! * [`interceptor_fn`]: adapter for synchronous closure interceptors.

#![warn(missing_docs)]

pub mod config;
mod context;
mod dispatcher;
pub mod error;
mod interceptor;
mod transport;

pub use config::{ConfigError, DEFAULT_MAX_SENDS, DispatchConfig};
pub use context::CallContext;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{BoxError, DispatchError, Result};
pub use interceptor::{FnInterceptor, Interceptor, interceptor_fn};
pub use transport::{Sender, Transport};

//! Keep API credentials fresh: lazy refresh-ahead-of-expiry, single-flight issuer calls, and a
//! client decorator that never sends with a stale token.
//!
//! A [`CredentialStore`](store::CredentialStore) owns the current credential and the only
//! handle on the [`Issuer`](issuer::Issuer). An [`InterceptingClient`](client::InterceptingClient)
//! wraps any [`Transport`](client::Transport) so that every outbound call first runs
//! [`CredentialStore::ensure_valid`](store::CredentialStore::ensure_valid).

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod expiry;
#[cfg(feature = "reqwest")] pub mod http;
pub mod issuer;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		clock::{Clock, ManualClock},
		config::StoreConfig,
		credential::Credential,
		error::IssueError,
		issuer::{IssueFuture, Issuer},
		store::CredentialStore,
	};

	/// Scripted outcome replayed by [`ScriptedIssuer`].
	#[derive(Clone, Debug)]
	pub enum Scripted {
		/// Issue a credential with the given token, expiring after the given offset from the
		/// issuer's clock (or never).
		Issue(&'static str, Option<Duration>),
		/// Fail with the given message.
		Fail(&'static str),
	}

	/// Issuer that replays a fixed script and counts every call.
	///
	/// Once the script is exhausted the last entry repeats.
	#[derive(Debug)]
	pub struct ScriptedIssuer {
		script: Vec<Scripted>,
		clock: Arc<ManualClock>,
		calls: Arc<AtomicUsize>,
	}
	impl ScriptedIssuer {
		/// Creates an issuer replaying `script` against `clock`.
		pub fn new(script: impl IntoIterator<Item = Scripted>, clock: Arc<ManualClock>) -> Self {
			Self { script: script.into_iter().collect(), clock, calls: Default::default() }
		}

		/// Shared counter of issuer invocations.
		pub fn calls(&self) -> Arc<AtomicUsize> {
			self.calls.clone()
		}
	}
	impl Issuer for ScriptedIssuer {
		type Config = ();

		fn issue(&self) -> IssueFuture<'_, ()> {
			let idx = self.calls.fetch_add(1, Ordering::SeqCst);
			let step = self
				.script
				.get(idx)
				.or_else(|| self.script.last())
				.cloned()
				.unwrap_or(Scripted::Fail("empty script"));
			let now = self.clock.now();

			Box::pin(async move {
				match step {
					Scripted::Issue(token, ttl) => {
						let builder = Credential::builder(()).token(token);
						let builder = match ttl {
							Some(ttl) => builder.expires_at(now + ttl),
							None => builder,
						};

						builder.build().map_err(IssueError::new)
					},
					Scripted::Fail(message) => Err(IssueError::msg(message)),
				}
			})
		}
	}

	/// Fixed instant used as "now" across tests.
	pub fn test_epoch() -> OffsetDateTime {
		time::macros::datetime!(2025-06-01 12:00 UTC)
	}

	/// Builds a store backed by a [`ScriptedIssuer`], a manual clock pinned at [`test_epoch`],
	/// and the given config.
	pub fn build_test_store(
		script: impl IntoIterator<Item = Scripted>,
		config: StoreConfig,
	) -> (CredentialStore<ScriptedIssuer>, Arc<ManualClock>, Arc<AtomicUsize>) {
		let clock = Arc::new(ManualClock::new(test_epoch()));
		let issuer = ScriptedIssuer::new(script, clock.clone());
		let calls = issuer.calls();
		let store = CredentialStore::with_clock(issuer, config, clock.clone());

		(store, clock, calls)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use time;
#[cfg(test)] use {color_eyre as _, httpmock as _};

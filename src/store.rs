//! Credential store: the single source of truth for the current credential.
//!
//! [`CredentialStore`] owns the [`Issuer`] and is the only place that calls it. Reads go
//! through a lock-protected cell, so a reader always sees a whole credential from one issuer
//! response. Refreshes are lazy: [`CredentialStore::ensure_valid`] checks the expiry against
//! the refresh buffer and only calls the issuer once the buffer has been crossed. Concurrent
//! callers that find the credential expiring queue on a single-flight guard; whoever gets
//! there first performs the issuer call and the rest adopt its outcome.

mod metrics;
mod state;

pub use metrics::StoreMetrics;
pub use state::{StoreSnapshot, StoreStatus};

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::{FailedInitPolicy, StoreConfig},
	credential::{Credential, TokenSecret},
	error::IssueError,
	expiry::{self, ExpirySource, RefreshPolicy},
	issuer::Issuer,
	obs::{self, Operation, OperationSpan, Outcome},
};
use state::State;

type CredentialOf<I> = Arc<Credential<<I as Issuer>::Config>>;

/// Owns the current credential, its expiry, and the issuer that mints it.
///
/// Clones share the same state. `initialize` must complete, successfully or not, before
/// `ensure_valid` or any intercepted call is meaningful.
pub struct CredentialStore<I>
where
	I: Issuer,
{
	shared: Arc<Shared<I>>,
}
impl<I> CredentialStore<I>
where
	I: Issuer,
{
	/// Creates a store with the default configuration and the system clock.
	pub fn new(issuer: I) -> Self {
		Self::with_config(issuer, StoreConfig::default())
	}

	/// Creates a store with the provided configuration and the system clock.
	pub fn with_config(issuer: I, config: StoreConfig) -> Self {
		Self::with_clock(issuer, config, Arc::new(SystemClock))
	}

	/// Creates a store that reads "now" from `clock`.
	pub fn with_clock(issuer: I, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
		let policy = config.refresh_policy();

		Self {
			shared: Arc::new(Shared {
				issuer,
				config,
				policy,
				clock,
				state: RwLock::new(State::default()),
				flight: AsyncMutex::new(()),
				metrics: StoreMetrics::default(),
			}),
		}
	}

	/// Performs the first issuer call.
	///
	/// Allowed while uninitialized or failed; a store that already holds a credential answers
	/// [`Error::AlreadyInitialized`] without calling the issuer. On failure the store moves to
	/// [`StoreStatus::Failed`] and the error is returned; nothing is retried here.
	pub async fn initialize(&self) -> Result<CredentialOf<I>> {
		const OPERATION: Operation = Operation::Initialize;

		let span = OperationSpan::new(OPERATION, "initialize");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.shared.flight.lock().await;

				{
					let state = self.shared.state.read();

					if state.closed {
						return Err(Error::Closed);
					}
					if state.status.has_credential() {
						return Err(Error::AlreadyInitialized);
					}
				}

				self.shared.issue_and_commit(OPERATION).await
			})
			.await;

		record_result(OPERATION, &result);

		result
	}

	/// Makes sure the current credential is not inside the refresh buffer.
	///
	/// Returns immediately when the expiry is unknown or still far enough away. Otherwise the
	/// issuer is called once (shared with any concurrent callers). A failed refresh keeps the
	/// previous credential in place and returns [`Error::Refresh`].
	pub async fn ensure_valid(&self) -> Result<()> {
		match self.shared.check(self.shared.clock.now())? {
			Check::Fresh => Ok(()),
			Check::Expiring { attempts, expires_in } => {
				obs::refresh_triggered(expires_in, false);

				self.refresh_after(attempts, Operation::Refresh, "ensure_valid").await.map(|_| ())
			},
			Check::Reinitialize { attempts } =>
				self.refresh_after(attempts, Operation::Initialize, "ensure_valid").await.map(|_| ()),
		}
	}

	/// Runs [`ensure_valid`](Self::ensure_valid) and returns the credential that passed it.
	pub async fn valid_credential(&self) -> Result<CredentialOf<I>> {
		self.ensure_valid().await?;

		let state = self.shared.state.read();

		if state.closed {
			return Err(Error::Closed);
		}

		state.credential.clone().ok_or(Error::NotInitialized)
	}

	/// Refreshes regardless of expiry, with the same single-flight and failure semantics as
	/// [`ensure_valid`](Self::ensure_valid).
	pub async fn force_refresh(&self) -> Result<CredentialOf<I>> {
		let attempts = {
			let state = self.shared.state.read();

			if state.closed {
				return Err(Error::Closed);
			}

			match state.status {
				StoreStatus::Uninitialized => return Err(Error::NotInitialized),
				StoreStatus::Failed => return Err(self.shared.initialization_error(&state)),
				StoreStatus::Ready | StoreStatus::ReadyWithError => state.attempts,
			}
		};
		let now = self.shared.clock.now();

		obs::refresh_triggered(self.current().and_then(|c| c.remaining_at(now)), true);

		self.refresh_after(attempts, Operation::Refresh, "force_refresh").await
	}

	/// Token of the current credential, or `None` before initialization and after close.
	pub fn current_token(&self) -> Option<TokenSecret> {
		self.current().map(|credential| credential.token.clone())
	}

	/// Current credential, stale or not.
	pub fn current(&self) -> Option<CredentialOf<I>> {
		let state = self.shared.state.read();

		if state.closed { None } else { state.credential.clone() }
	}

	/// Lifecycle status.
	pub fn status(&self) -> StoreStatus {
		self.shared.state.read().status
	}

	/// Error from the most recent failed issuer call, cleared by the next success.
	pub fn last_error(&self) -> Option<IssueError> {
		self.shared.state.read().last_error.clone()
	}

	/// Expiry of the current credential, if known.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.current().and_then(|credential| credential.expires_at)
	}

	/// `now >= expires_at - refresh_buffer`; `false` without a known expiry.
	pub fn is_expiring(&self) -> bool {
		self.shared.policy.is_expiring(self.expires_at(), self.shared.clock.now())
	}

	/// Consistent view of status, credential, error, and loading flag.
	pub fn snapshot(&self) -> StoreSnapshot<I::Config> {
		self.shared.state.read().snapshot()
	}

	/// Returns `true` once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.shared.state.read().closed
	}

	/// Configuration the store was built with.
	pub fn config(&self) -> &StoreConfig {
		&self.shared.config
	}

	/// In-process issuer counters.
	pub fn metrics(&self) -> &StoreMetrics {
		&self.shared.metrics
	}

	/// Tears the store down: the credential is dropped and any issuer call still in flight
	/// will have its result discarded.
	pub fn close(&self) {
		self.shared.state.write().close();
	}

	async fn refresh_after(
		&self,
		observed_attempts: u64,
		operation: Operation,
		stage: &'static str,
	) -> Result<CredentialOf<I>> {
		let span = OperationSpan::new(operation, stage);

		obs::record_outcome(operation, Outcome::Attempt);

		let result = span
			.instrument(async {
				let _singleflight = self.shared.flight.lock().await;

				if let Some(joined) = self.shared.join_completed(observed_attempts) {
					self.shared.metrics.record_joined();
					obs::record_outcome(operation, Outcome::Joined);

					return joined;
				}

				self.shared.issue_and_commit(operation).await
			})
			.await;

		record_result(operation, &result);

		result
	}
}
impl<I> Clone for CredentialStore<I>
where
	I: Issuer,
{
	fn clone(&self) -> Self {
		Self { shared: self.shared.clone() }
	}
}
impl<I> Debug for CredentialStore<I>
where
	I: Issuer,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.shared.state.read();

		f.debug_struct("CredentialStore")
			.field("status", &state.status)
			.field("credential_set", &state.credential.is_some())
			.field("closed", &state.closed)
			.field("config", &self.shared.config)
			.finish()
	}
}

enum Check {
	Fresh,
	Expiring { attempts: u64, expires_in: Option<Duration> },
	Reinitialize { attempts: u64 },
}

struct Shared<I>
where
	I: Issuer,
{
	issuer: I,
	config: StoreConfig,
	policy: RefreshPolicy,
	clock: Arc<dyn Clock>,
	state: RwLock<State<I::Config>>,
	flight: AsyncMutex<()>,
	metrics: StoreMetrics,
}
impl<I> Shared<I>
where
	I: Issuer,
{
	fn check(&self, now: OffsetDateTime) -> Result<Check> {
		let state = self.state.read();

		if state.closed {
			return Err(Error::Closed);
		}

		match state.status {
			StoreStatus::Uninitialized => Err(Error::NotInitialized),
			StoreStatus::Failed => match self.config.failed_init {
				FailedInitPolicy::Terminal => Err(self.initialization_error(&state)),
				FailedInitPolicy::RetryOnDemand => Ok(Check::Reinitialize { attempts: state.attempts }),
			},
			StoreStatus::Ready | StoreStatus::ReadyWithError => {
				let expires_at = state.credential.as_ref().and_then(|c| c.expires_at);

				if self.policy.is_expiring(expires_at, now) {
					Ok(Check::Expiring {
						attempts: state.attempts,
						expires_in: expires_at.map(|at| at - now),
					})
				} else {
					Ok(Check::Fresh)
				}
			},
		}
	}

	/// Outcome of an attempt that completed while the caller waited for the guard.
	fn join_completed(&self, observed_attempts: u64) -> Option<Result<CredentialOf<I>>> {
		let state = self.state.read();

		if state.closed {
			return Some(Err(Error::Closed));
		}
		if state.attempts == observed_attempts {
			return None;
		}

		Some(match (&state.last_error, &state.credential) {
			(None, Some(credential)) => Ok(credential.clone()),
			(Some(err), Some(_)) => Err(Error::Refresh(err.clone())),
			(_, None) => Err(self.initialization_error(&state)),
		})
	}

	fn initialization_error(&self, state: &State<I::Config>) -> Error {
		Error::Initialization(
			state.last_error.clone().unwrap_or_else(|| IssueError::msg("Initial issue failed.")),
		)
	}

	async fn issue_and_commit(&self, operation: Operation) -> Result<CredentialOf<I>> {
		self.metrics.record_issuer_call();

		let issued =
			self.issuer.issue().await.map(|credential| Arc::new(self.resolve_expiry(credential)));
		let now = self.clock.now();
		let mut state = self.state.write();

		if state.closed {
			drop(state);
			obs::result_discarded(operation);

			return Err(Error::Closed);
		}

		match issued {
			Ok(credential) => {
				state.commit(credential.clone());
				drop(state);
				self.metrics.record_success();
				obs::credential_committed(operation, &credential.token, credential.remaining_at(now));

				Ok(credential)
			},
			Err(err) => {
				let had_credential = state.credential.is_some();

				state.record_failure(err.clone());
				drop(state);
				self.metrics.record_failure();
				obs::issue_failed(operation, &err);

				Err(if had_credential { Error::Refresh(err) } else { Error::Initialization(err) })
			},
		}
	}

	fn resolve_expiry(&self, credential: Credential<I::Config>) -> Credential<I::Config> {
		match self.config.expiry_source {
			ExpirySource::Issuer => credential,
			ExpirySource::TokenClaim => match expiry::decode_token_expiry(credential.token.expose()) {
				Ok(at) => credential.with_expires_at(Some(at)),
				Err(err) => {
					self.metrics.record_decode_anomaly();
					obs::decode_anomaly(&credential.token, &err);

					credential.with_expires_at(None)
				},
			},
		}
	}
}

fn record_result<T>(operation: Operation, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_outcome(operation, Outcome::Success),
		Err(_) => obs::record_outcome(operation, Outcome::Failure),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::Ordering;
	// self
	use super::*;
	use crate::_preludet::{Scripted, build_test_store};

	#[tokio::test]
	async fn fast_path_skips_issuer_until_buffer_is_crossed() {
		let (store, clock, calls) = build_test_store(
			[Scripted::Issue("t1", Some(Duration::hours(1))), Scripted::Issue("t2", Some(Duration::hours(1)))],
			StoreConfig::default(),
		);

		store.initialize().await.expect("Initial issue should succeed.");
		clock.advance(Duration::seconds(3500));

		for _ in 0..3 {
			store.ensure_valid().await.expect("Fresh credential should pass the check.");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);

		clock.advance(Duration::seconds(45));
		store.ensure_valid().await.expect("Expiring credential should refresh.");

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(store.current_token().map(|t| t.expose().to_owned()), Some("t2".into()));
	}

	#[tokio::test]
	async fn initialize_twice_is_rejected() {
		let (store, _, calls) =
			build_test_store([Scripted::Issue("t1", None)], StoreConfig::default());

		store.initialize().await.expect("Initial issue should succeed.");

		assert!(matches!(store.initialize().await, Err(Error::AlreadyInitialized)));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn ensure_valid_before_initialize_fails() {
		let (store, _, calls) =
			build_test_store([Scripted::Issue("t1", None)], StoreConfig::default());

		assert!(matches!(store.ensure_valid().await, Err(Error::NotInitialized)));
		assert!(store.snapshot().loading);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn close_discards_state_and_blocks_calls() {
		let (store, _, _) =
			build_test_store([Scripted::Issue("t1", None)], StoreConfig::default());

		store.initialize().await.expect("Initial issue should succeed.");
		store.close();

		assert!(store.is_closed());
		assert!(store.snapshot().closed);
		assert!(store.current_token().is_none());
		assert!(matches!(store.ensure_valid().await, Err(Error::Closed)));
		assert!(matches!(store.force_refresh().await, Err(Error::Closed)));
		assert!(matches!(store.initialize().await, Err(Error::Closed)));
	}

	#[tokio::test]
	async fn token_claim_expiry_overrides_issuer_value() {
		// {"exp":1748782800} == 2025-06-01 13:00 UTC
		let (store, _, _) = build_test_store(
			[Scripted::Issue("h.eyJleHAiOjE3NDg3ODI4MDB9.s", Some(Duration::minutes(1)))],
			StoreConfig::default().with_expiry_source(ExpirySource::TokenClaim),
		);

		store.initialize().await.expect("Initial issue should succeed.");

		assert_eq!(store.expires_at(), Some(time::macros::datetime!(2025-06-01 13:00 UTC)));
		assert!(!store.is_expiring());
		assert_eq!(store.metrics().decode_anomalies(), 0);
	}
}

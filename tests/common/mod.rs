#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use token_keeper::{
	client::{Transport, TransportFuture},
	clock::{Clock, ManualClock},
	config::StoreConfig,
	credential::Credential,
	error::{IssueError, TransportError},
	issuer::{IssueFuture, Issuer},
	store::CredentialStore,
};

/// Fixed instant used as "now" across tests.
pub fn epoch() -> OffsetDateTime {
	macros::datetime!(2025-06-01 12:00 UTC)
}

/// Issuer minting `t1`, `t2`, ... with the sequence number as config.
///
/// Every credential expires `ttl` after the clock reading taken when the call started.
#[derive(Clone, Debug)]
pub struct SequenceIssuer {
	pub clock: Arc<ManualClock>,
	pub ttl: Option<Duration>,
	pub delay: Option<std::time::Duration>,
	pub failing: Arc<AtomicBool>,
	pub calls: Arc<AtomicUsize>,
}
impl SequenceIssuer {
	pub fn new(clock: Arc<ManualClock>, ttl: Option<Duration>) -> Self {
		Self { clock, ttl, delay: None, failing: Default::default(), calls: Default::default() }
	}

	pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Issuer for SequenceIssuer {
	type Config = usize;

	fn issue(&self) -> IssueFuture<'_, usize> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let now = self.clock.now();
		let ttl = self.ttl;
		let delay = self.delay;
		let failing = self.failing.clone();

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}
			if failing.load(Ordering::SeqCst) {
				return Err(IssueError::msg(format!("issuer unavailable (call {n})")));
			}

			Credential::builder(n)
				.token(format!("t{n}"))
				.issued_at(now)
				.maybe_expires_at(ttl.map(|ttl| now + ttl))
				.build()
				.map_err(IssueError::from)
		})
	}
}

/// Builds a store over a fresh [`SequenceIssuer`] and a manual clock pinned at [`epoch`].
pub fn sequence_store(
	ttl: Option<Duration>,
	delay: Option<std::time::Duration>,
	config: StoreConfig,
) -> (CredentialStore<Arc<SequenceIssuer>>, Arc<SequenceIssuer>, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::new(epoch()));
	let mut issuer = SequenceIssuer::new(clock.clone(), ttl);

	if let Some(delay) = delay {
		issuer = issuer.with_delay(delay);
	}

	let issuer = Arc::new(issuer);
	let store = CredentialStore::with_clock(issuer.clone(), config, clock.clone());

	(store, issuer, clock)
}

/// Transport echoing `<request>:<token>` and counting dispatched requests.
#[derive(Debug, Default)]
pub struct EchoTransport {
	pub sent: AtomicUsize,
}
impl<C> Transport<C> for EchoTransport {
	type Error = TransportError;
	type Request = String;
	type Response = String;

	fn send(
		&self,
		request: String,
		credential: Arc<Credential<C>>,
	) -> TransportFuture<'_, String, TransportError> {
		let token = credential.token.expose().to_owned();

		self.sent.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(format!("{request}:{token}")) })
	}
}

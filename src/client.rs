//! Client decorator that checks credential freshness before every outbound call.
//!
//! [`Transport`] is the only network capability the keeper knows about. An
//! [`InterceptingClient`] exposes the same call surface, but each call first runs
//! [`CredentialStore::ensure_valid`] and then hands the transport the credential that passed
//! the check. Calls never reach the transport while a freshness failure is pending.

// self
use crate::{
	_prelude::*,
	credential::Credential,
	error::SendError,
	issuer::Issuer,
	obs::{self, Operation, OperationSpan, Outcome},
	store::CredentialStore,
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Underlying "send a request" capability wrapped by [`InterceptingClient`].
///
/// Implementations attach the credential however their protocol expects (header, query
/// parameter, signed envelope, ...) and must leave request and response payloads untouched.
pub trait Transport<C>
where
	Self: Send + Sync,
{
	/// Outbound request type.
	type Request: Send;
	/// Response type.
	type Response: Send;
	/// Transport-specific failure, surfaced verbatim by [`InterceptingClient::send`].
	type Error: 'static + Send + Sync + StdError;

	/// Performs the network call using `credential`.
	fn send(
		&self,
		request: Self::Request,
		credential: Arc<Credential<C>>,
	) -> TransportFuture<'_, Self::Response, Self::Error>;
}
impl<C, T> Transport<C> for Arc<T>
where
	T: ?Sized + Transport<C>,
{
	type Error = T::Error;
	type Request = T::Request;
	type Response = T::Response;

	fn send(
		&self,
		request: Self::Request,
		credential: Arc<Credential<C>>,
	) -> TransportFuture<'_, Self::Response, Self::Error> {
		(**self).send(request, credential)
	}
}

/// Decorator that enforces credential freshness on every network call of a [`Transport`].
pub struct InterceptingClient<T, I>
where
	I: Issuer,
{
	transport: Arc<T>,
	store: CredentialStore<I>,
}
impl<T, I> InterceptingClient<T, I>
where
	T: Transport<I::Config>,
	I: Issuer,
{
	/// Binds `transport` to `store`.
	pub fn new(transport: impl Into<Arc<T>>, store: CredentialStore<I>) -> Self {
		Self { transport: transport.into(), store }
	}

	/// Sends `request` after making sure the credential is fresh.
	///
	/// A failed freshness check is returned as [`SendError::Credential`] and the transport is
	/// never called. Transport results are returned as-is.
	pub async fn send(&self, request: T::Request) -> Result<T::Response, SendError<T::Error>> {
		const OPERATION: Operation = Operation::Send;

		let span = OperationSpan::new(OPERATION, "send");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async {
				let credential = self.store.valid_credential().await?;

				self.transport.send(request, credential).await.map_err(SendError::Transport)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	/// Runs any other network-bound call of the transport behind the same freshness check.
	///
	/// `f` receives the transport and the credential that passed the check.
	pub async fn call<'a, F, Fut, R, E>(&'a self, f: F) -> Result<R, SendError<E>>
	where
		F: FnOnce(&'a T, Arc<Credential<I::Config>>) -> Fut,
		Fut: 'a + Future<Output = Result<R, E>>,
		E: 'static + StdError,
	{
		let credential = self.store.valid_credential().await?;

		f(&self.transport, credential).await.map_err(SendError::Transport)
	}

	/// Underlying transport, for accessors that perform no network I/O.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Store backing the freshness checks.
	pub fn store(&self) -> &CredentialStore<I> {
		&self.store
	}
}
impl<T, I> Clone for InterceptingClient<T, I>
where
	I: Issuer,
{
	fn clone(&self) -> Self {
		Self { transport: self.transport.clone(), store: self.store.clone() }
	}
}
impl<T, I> Debug for InterceptingClient<T, I>
where
	I: Issuer,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InterceptingClient").field("store", &self.store).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::Ordering;
	// self
	use super::*;
	use crate::{
		_preludet::{Scripted, ScriptedIssuer, build_test_store},
		config::StoreConfig,
		error::TransportError,
	};

	#[derive(Debug, Default)]
	struct EchoTransport {
		sent: Mutex<Vec<(String, String)>>,
	}
	impl Transport<()> for EchoTransport {
		type Error = TransportError;
		type Request = String;
		type Response = String;

		fn send(
			&self,
			request: String,
			credential: Arc<Credential>,
		) -> TransportFuture<'_, String, TransportError> {
			let token = credential.token.expose().to_owned();

			self.sent.lock().push((request.clone(), token.clone()));

			Box::pin(async move {
				if request == "fail" {
					Err(TransportError::InvalidHeader)
				} else {
					Ok(format!("{request}:{token}"))
				}
			})
		}
	}

	fn client(
		script: impl IntoIterator<Item = Scripted>,
	) -> (InterceptingClient<EchoTransport, ScriptedIssuer>, Arc<crate::clock::ManualClock>) {
		let (store, clock, _) = build_test_store(script, StoreConfig::default());

		(InterceptingClient::new(EchoTransport::default(), store), clock)
	}

	#[tokio::test]
	async fn send_uses_refreshed_token_once_expiring() {
		let (client, clock) = client([
			Scripted::Issue("t1", Some(Duration::minutes(10))),
			Scripted::Issue("t2", Some(Duration::minutes(10))),
		]);

		client.store().initialize().await.expect("Initial issue should succeed.");

		assert_eq!(client.send("a".into()).await.expect("First send should succeed."), "a:t1");

		clock.advance(Duration::minutes(9) + Duration::seconds(30));

		assert_eq!(client.send("b".into()).await.expect("Second send should succeed."), "b:t2");
		assert_eq!(client.store().metrics().issuer_calls(), 2);
	}

	#[tokio::test]
	async fn failed_refresh_blocks_the_call() {
		let (client, clock) =
			client([Scripted::Issue("t1", Some(Duration::minutes(10))), Scripted::Fail("issuer down")]);

		client.store().initialize().await.expect("Initial issue should succeed.");
		clock.advance(Duration::minutes(10));

		let err = client.send("a".into()).await.expect_err("Pending refresh error should block.");

		assert!(matches!(err, SendError::Credential(Error::Refresh(_))));
		assert!(client.transport().sent.lock().is_empty());
		assert_eq!(client.store().current_token().map(|t| t.expose().to_owned()), Some("t1".into()));
	}

	#[tokio::test]
	async fn transport_errors_pass_through() {
		let (client, _) = client([Scripted::Issue("t1", None)]);

		client.store().initialize().await.expect("Initial issue should succeed.");

		let err = client.send("fail".into()).await.expect_err("Transport failure should surface.");

		assert!(matches!(err.into_transport(), Some(TransportError::InvalidHeader)));
	}

	#[tokio::test]
	async fn call_guards_custom_surfaces() {
		let (client, _) = client([Scripted::Issue("t1", None)]);

		assert!(matches!(
			client.call(|_, _| async { Ok::<_, TransportError>(()) }).await,
			Err(SendError::Credential(Error::NotInitialized))
		));

		client.store().initialize().await.expect("Initial issue should succeed.");

		let token = client
			.call(|_, credential| async move {
				Ok::<_, TransportError>(credential.token.expose().to_owned())
			})
			.await
			.expect("Guarded call should succeed.");

		assert_eq!(token, "t1");
	}

	#[tokio::test]
	async fn accessors_do_not_touch_the_issuer() {
		let (store, _, calls) = build_test_store([Scripted::Issue("t1", None)], StoreConfig::default());
		let client: InterceptingClient<EchoTransport, _> =
			InterceptingClient::new(EchoTransport::default(), store);
		let _ = client.transport();
		let _ = client.store().status();

		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}
}

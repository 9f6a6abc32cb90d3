//! Reqwest-backed [`Transport`] that presents the credential as a bearer token.
//!
//! Requests are built by the caller with the wrapped [`ReqwestClient`] and passed through
//! [`InterceptingClient::send`](crate::client::InterceptingClient::send); the transport only
//! adds the `Authorization` header and executes them. Bodies and responses are not touched.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	Request, Response,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	client::{Transport, TransportFuture},
	credential::{Credential, TokenSecret},
	error::TransportError,
};

/// Thin wrapper around [`ReqwestClient`] that attaches `Authorization: Bearer <token>`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl<C> Transport<C> for ReqwestTransport {
	type Error = TransportError;
	type Request = Request;
	type Response = Response;

	fn send(
		&self,
		mut request: Request,
		credential: Arc<Credential<C>>,
	) -> TransportFuture<'_, Response, TransportError> {
		let client = self.0.clone();
		let header = bearer_header(&credential.token);

		Box::pin(async move {
			request.headers_mut().insert(AUTHORIZATION, header?);

			Ok(client.execute(request).await?)
		})
	}
}

fn bearer_header(token: &TokenSecret) -> Result<HeaderValue, TransportError> {
	let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
		.map_err(|_| TransportError::InvalidHeader)?;

	value.set_sensitive(true);

	Ok(value)
}

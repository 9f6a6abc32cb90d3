//! Keeper-level error types shared across the store, issuers, and transports.

// self
use crate::_prelude::*;

/// Keeper-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;
type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by [`CredentialStore`](crate::store::CredentialStore) operations.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The initial issuer call failed; no credential is available.
	#[error("Initial credential issue failed: {0}")]
	Initialization(#[source] IssueError),
	/// A refresh issuer call failed; the previous credential is still held.
	#[error("Credential refresh failed: {0}")]
	Refresh(#[source] IssueError),

	/// `initialize` has not completed yet.
	#[error("Credential store has not been initialized.")]
	NotInitialized,
	/// `initialize` was called on a store that already holds a credential.
	#[error("Credential store is already initialized.")]
	AlreadyInitialized,
	/// The store was torn down.
	#[error("Credential store has been closed.")]
	Closed,
}

/// Failure reported by an [`Issuer`](crate::issuer::Issuer).
///
/// The source is reference counted so the same failure can be recorded as store state and
/// handed to every caller that joined the failed attempt.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct IssueError {
	message: String,
	#[source]
	source: Option<SharedError>,
}
impl IssueError {
	/// Creates an error carrying only a message.
	pub fn msg(message: impl Into<String>) -> Self {
		Self { message: message.into(), source: None }
	}

	/// Wraps an issuer-specific failure, reusing its display text as the message.
	pub fn new(src: impl 'static + Send + Sync + StdError) -> Self {
		Self { message: src.to_string(), source: Some(Arc::new(src)) }
	}

	/// Returns the human-readable failure message.
	pub fn message(&self) -> &str {
		&self.message
	}
}
impl From<TransportError> for IssueError {
	fn from(e: TransportError) -> Self {
		Self::new(e)
	}
}
impl From<crate::credential::CredentialBuilderError> for IssueError {
	fn from(e: crate::credential::CredentialBuilderError) -> Self {
		Self::new(e)
	}
}

/// Soft failure raised while deriving an expiry from a token payload.
///
/// The store never propagates it; the credential is treated as non-expiring instead.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Token is not made of dot-separated segments.
	#[error("Token is not a dot-separated JWT.")]
	Malformed,
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// Payload is not a JSON object with a numeric `exp` claim.
	#[error("Token payload could not be parsed.")]
	Json(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Payload has no `exp` claim.
	#[error("Token payload has no exp claim.")]
	MissingExp,
	/// The `exp` claim does not fit a valid timestamp.
	#[error("The exp claim exceeds the supported range.")]
	ExpOutOfRange,
}

/// Transport-level failures (network, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Credential could not be encoded as a header value.
	#[error("Credential cannot be encoded into the authorization header.")]
	InvalidHeader,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Error returned by [`InterceptingClient`](crate::client::InterceptingClient).
#[derive(Debug, ThisError)]
pub enum SendError<E>
where
	E: 'static + StdError,
{
	/// Freshness check failed; the request was never dispatched.
	#[error(transparent)]
	Credential(#[from] Error),
	/// Underlying transport failed; the error is passed through untouched.
	#[error(transparent)]
	Transport(E),
}
impl<E> SendError<E>
where
	E: 'static + StdError,
{
	/// Returns the transport error if the request reached the transport.
	pub fn into_transport(self) -> Option<E> {
		match self {
			Self::Transport(e) => Some(e),
			Self::Credential(_) => None,
		}
	}
}

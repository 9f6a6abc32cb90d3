//! Immutable credential snapshots and their builder.

pub mod secret;

pub use secret::TokenSecret;

// self
use crate::_prelude::*;

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no token (or an empty one) was provided.
	#[error("Credential token is required.")]
	MissingToken,
	/// Issued when `issued_at + expires_in` falls outside the supported time range.
	#[error("Credential expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Opaque client configuration paired with the bearer token it was issued with.
///
/// A credential is never mutated once built; the store swaps whole values.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential<C = ()> {
	/// Embedder-defined configuration carried alongside the token.
	pub config: C,
	/// Bearer token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant the credential was produced.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant; `None` means the credential never goes stale.
	pub expires_at: Option<OffsetDateTime>,
}
impl<C> Credential<C> {
	/// Returns a builder seeded with the provided configuration.
	pub fn builder(config: C) -> CredentialBuilder<C> {
		CredentialBuilder::new(config)
	}

	/// Remaining lifetime relative to `now`, if the credential expires at all.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|at| at - now)
	}

	/// Returns `true` once `now` has reached the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|at| now >= at)
	}

	/// Returns a copy with the expiry replaced.
	pub(crate) fn with_expires_at(self, expires_at: Option<OffsetDateTime>) -> Self {
		Self { expires_at, ..self }
	}
}
impl<C> Debug for Credential<C>
where
	C: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("config", &self.config)
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug)]
pub struct CredentialBuilder<C> {
	config: C,
	token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl<C> CredentialBuilder<C> {
	fn new(config: C) -> Self {
		Self { config, token: None, issued_at: None, expires_at: None, expires_in: None }
	}

	/// Provides the bearer token value.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets an optional absolute expiry instant, mirroring issuer responses where the field
	/// may be absent.
	pub fn maybe_expires_at(mut self, instant: Option<OffsetDateTime>) -> Self {
		self.expires_at = instant;

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	///
	/// An absolute expiry wins over a relative one. With neither set the credential never
	/// expires.
	pub fn build(self) -> Result<Credential<C>, CredentialBuilderError> {
		let token = self
			.token
			.filter(|token| !token.is_empty())
			.ok_or(CredentialBuilderError::MissingToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(issued_at.checked_add(delta).ok_or(CredentialBuilderError::ExpiryOutOfRange)?),
			(None, None) => None,
		};

		Ok(Credential { config: self.config, token, issued_at, expires_at })
	}
}

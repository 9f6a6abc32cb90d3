//! Expiry derivation and the refresh-ahead policy.
//!
//! A credential's expiry comes from one of two places, chosen once per store through
//! [`ExpirySource`]: the issuer response itself, or the `exp` claim inside a JWT-shaped token.
//! [`RefreshPolicy`] then decides how early a refresh is triggered.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Number;
use time::Date;
// self
use crate::{_prelude::*, error::DecodeError};

/// Where a store reads a credential's expiry from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySource {
	/// Use the `expires_at` the issuer put on the credential.
	#[default]
	Issuer,
	/// Decode the token's `exp` claim (seconds since the Unix epoch).
	TokenClaim,
}
impl ExpirySource {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExpirySource::Issuer => "issuer",
			ExpirySource::TokenClaim => "token_claim",
		}
	}
}
impl Display for ExpirySource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

const EARLIEST: OffsetDateTime = Date::MIN.midnight().assume_utc();

/// How far ahead of the real expiry a refresh is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	buffer: Duration,
}
impl RefreshPolicy {
	/// Default buffer applied when none is configured.
	pub const DEFAULT_BUFFER: Duration = Duration::seconds(60);

	/// Creates a policy with the given buffer; negative buffers clamp to zero.
	pub fn new(buffer: Duration) -> Self {
		Self { buffer: if buffer.is_negative() { Duration::ZERO } else { buffer } }
	}

	/// Returns the configured buffer.
	pub fn buffer(&self) -> Duration {
		self.buffer
	}

	/// Instant from which the credential counts as expiring, if it expires at all.
	///
	/// Saturates at the earliest representable instant when the buffer reaches past it.
	pub fn refresh_at(&self, expires_at: Option<OffsetDateTime>) -> Option<OffsetDateTime> {
		expires_at.map(|at| at.checked_sub(self.buffer).unwrap_or(EARLIEST))
	}

	/// `now >= expires_at - buffer`; always `false` without a known expiry.
	pub fn is_expiring(&self, expires_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
		self.refresh_at(expires_at).is_some_and(|at| now >= at)
	}
}
impl Default for RefreshPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_BUFFER)
	}
}

#[derive(Deserialize)]
struct ExpClaim {
	exp: Option<Number>,
}

/// Decodes the `exp` claim from a JWT-shaped token without verifying its signature.
///
/// Only the payload segment is read. Integer and fractional claims are accepted; fractions
/// are truncated toward the past.
pub fn decode_token_expiry(token: &str) -> Result<OffsetDateTime, DecodeError> {
	let mut segments = token.split('.');
	let payload = match (segments.next(), segments.next()) {
		(Some(_), Some(payload)) if !payload.is_empty() => payload,
		_ => return Err(DecodeError::Malformed),
	};
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
	let claims: ExpClaim =
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&bytes))?;
	let exp = claims.exp.ok_or(DecodeError::MissingExp)?;
	let secs = match exp.as_i64() {
		Some(secs) => secs,
		None => {
			let value = exp.as_f64().ok_or(DecodeError::ExpOutOfRange)?.floor();

			if !value.is_finite() || value < i64::MIN as f64 || value > i64::MAX as f64 {
				return Err(DecodeError::ExpOutOfRange);
			}

			value as i64
		},
	};

	OffsetDateTime::from_unix_timestamp(secs).map_err(|_| DecodeError::ExpOutOfRange)
}

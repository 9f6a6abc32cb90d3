//! Embedder-facing configuration for [`CredentialStore`](crate::store::CredentialStore).
//!
//! Values can be built in code through the `with_*` setters or deserialized from any serde
//! format:
//!
//! ```
//! let config: token_keeper::config::StoreConfig =
//! 	serde_json::from_str(r#"{"refresh_buffer":120,"expiry_source":"token_claim"}"#).unwrap();
//!
//! assert_eq!(config.refresh_buffer.whole_seconds(), 120);
//! ```

// self
use crate::{
	_prelude::*,
	expiry::{ExpirySource, RefreshPolicy},
};

/// What happens to a store whose initial issue failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedInitPolicy {
	/// Stay failed until `initialize` is called again.
	#[default]
	Terminal,
	/// Let the next `ensure_valid` (and therefore the next `send`) attempt initialization again,
	/// once per call.
	RetryOnDemand,
}

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
	/// How long before expiry a refresh is triggered; serialized as whole seconds.
	#[serde(with = "seconds")]
	pub refresh_buffer: Duration,
	/// Where expiry instants come from.
	pub expiry_source: ExpirySource,
	/// Behaviour after a failed initial issue.
	pub failed_init: FailedInitPolicy,
}
impl StoreConfig {
	/// Overrides the refresh buffer (defaults to 60 seconds); negative values clamp to zero.
	pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = RefreshPolicy::new(buffer).buffer();

		self
	}

	/// Selects the expiry source.
	pub fn with_expiry_source(mut self, source: ExpirySource) -> Self {
		self.expiry_source = source;

		self
	}

	/// Selects the failed-initialization policy.
	pub fn with_failed_init(mut self, policy: FailedInitPolicy) -> Self {
		self.failed_init = policy;

		self
	}

	/// Refresh policy derived from the configured buffer.
	pub fn refresh_policy(&self) -> RefreshPolicy {
		RefreshPolicy::new(self.refresh_buffer)
	}
}
impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			refresh_buffer: RefreshPolicy::DEFAULT_BUFFER,
			expiry_source: ExpirySource::default(),
			failed_init: FailedInitPolicy::default(),
		}
	}
}

mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = u32::deserialize(deserializer)?;

		Ok(Duration::seconds(i64::from(secs)))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = StoreConfig::default();

		assert_eq!(config.refresh_buffer, Duration::seconds(60));
		assert_eq!(config.expiry_source, ExpirySource::Issuer);
		assert_eq!(config.failed_init, FailedInitPolicy::Terminal);
	}

	#[test]
	fn partial_json_falls_back_to_defaults() {
		let config: StoreConfig = serde_json::from_str(r#"{"failed_init":"retry_on_demand"}"#)
			.expect("Partial config should deserialize.");

		assert_eq!(config.refresh_buffer, Duration::seconds(60));
		assert_eq!(config.failed_init, FailedInitPolicy::RetryOnDemand);
	}

	#[test]
	fn refresh_buffer_serializes_as_seconds() {
		let config = StoreConfig::default().with_refresh_buffer(Duration::minutes(2));
		let payload = serde_json::to_value(&config).expect("Config should serialize to JSON.");

		assert_eq!(payload["refresh_buffer"], 120);
		assert_eq!(payload["expiry_source"], "issuer");
	}

	#[test]
	fn negative_buffers_are_rejected_or_clamped() {
		assert!(serde_json::from_str::<StoreConfig>(r#"{"refresh_buffer":-1}"#).is_err());
		assert_eq!(
			StoreConfig::default().with_refresh_buffer(Duration::seconds(-30)).refresh_buffer,
			Duration::ZERO
		);
	}
}

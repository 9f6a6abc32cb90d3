//! Optional observability helpers for store and client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_keeper.operation` with the
//!   `operation` and `stage` (call site) fields, plus lifecycle events keyed by token
//!   fingerprints.
//! - Enable `metrics` to increment the `token_keeper_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the keeper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// First issuer call for a store.
	Initialize,
	/// Issuer call replacing an existing credential.
	Refresh,
	/// Request forwarded through an intercepting client.
	Send,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Initialize => "initialize",
			Operation::Refresh => "refresh",
			Operation::Send => "send",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a keeper helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Caller reused the result of a refresh another caller performed.
	Joined,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Joined => "joined",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for issuer activity.
#[derive(Debug, Default)]
pub struct StoreMetrics {
	issuer_calls: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	joined: AtomicU64,
	decode_anomalies: AtomicU64,
}
impl StoreMetrics {
	/// Returns the total number of issuer invocations (initial and refresh).
	pub fn issuer_calls(&self) -> u64 {
		self.issuer_calls.load(Ordering::Relaxed)
	}

	/// Returns the number of issuer calls that produced a committed credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failed issuer calls.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many callers reused a refresh performed by a concurrent caller.
	pub fn joined(&self) -> u64 {
		self.joined.load(Ordering::Relaxed)
	}

	/// Returns how many tokens had an expiry claim that could not be decoded.
	pub fn decode_anomalies(&self) -> u64 {
		self.decode_anomalies.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issuer_call(&self) {
		self.issuer_calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_joined(&self) {
		self.joined.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_decode_anomaly(&self) {
		self.decode_anomalies.fetch_add(1, Ordering::Relaxed);
	}
}

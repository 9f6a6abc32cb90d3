// self
use crate::{
	_prelude::*,
	credential::TokenSecret,
	error::{DecodeError, IssueError},
	obs::Operation,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by keeper operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("token_keeper.operation", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn credential_committed(
	operation: Operation,
	token: &TokenSecret,
	expires_in: Option<Duration>,
) {
	#[cfg(feature = "tracing")]
	{
		let fingerprint = token.fingerprint();

		match expires_in {
			Some(delta) => tracing::debug!(
				operation = operation.as_str(),
				token = %fingerprint,
				expires_in_secs = delta.whole_seconds(),
				"credential committed"
			),
			None => tracing::debug!(
				operation = operation.as_str(),
				token = %fingerprint,
				"credential committed without expiry"
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, token, expires_in);
	}
}

pub(crate) fn refresh_triggered(expires_in: Option<Duration>, forced: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			expires_in_secs = expires_in.map(|delta| delta.whole_seconds()),
			forced,
			"credential expiring, refreshing"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (expires_in, forced);
	}
}

pub(crate) fn issue_failed(operation: Operation, err: &IssueError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = operation.as_str(), error = %err, "issuer call failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, err);
	}
}

pub(crate) fn decode_anomaly(token: &TokenSecret, err: &DecodeError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			token = %token.fingerprint(),
			error = %err,
			"token expiry could not be decoded; treating credential as non-expiring"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (token, err);
	}
}

pub(crate) fn result_discarded(operation: Operation) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(operation = operation.as_str(), "store closed; discarding issuer result");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = operation;
	}
}

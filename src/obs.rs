//! Optional observability helpers for the credential lifecycle.
//!
//! Enable the `metrics` feature to increment the `stream_sidecar_op_total` counter
//! for every attempt/success/failure, labeled by `op` + `outcome`. Structured logs
//! are emitted through `tracing` unconditionally at the call sites themselves.

// self
use crate::_prelude::*;

/// Credential-lifecycle operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Authorization-code exchange at the token endpoint.
	Exchange,
	/// Refresh-token rotation at the token endpoint.
	Refresh,
	/// Bearer-authenticated resource request.
	Request,
	/// Now-playing polling tick.
	Poll,
}
impl OpKind {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Exchange => "exchange",
			OpKind::Refresh => "refresh",
			OpKind::Request => "request",
			OpKind::Poll => "poll",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller (or swallowed by the polling loop).
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"stream_sidecar_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

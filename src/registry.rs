//! One-time correlation tokens for the authorization redirect flow.
//!
//! [`StateRegistry::issue`] mints an unpredictable state value for an outbound
//! authorize redirect; the matching inbound callback hands it back to
//! [`StateRegistry::consume`], which accepts each value at most once and rejects
//! anything older than [`STATE_TTL`]. A background sweeper bounds memory for the
//! flows that are started and then abandoned.

// std
use std::time::Duration as StdDuration;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng as _;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, cache::TtlCache};

/// Window during which an issued state token may be consumed.
pub const STATE_TTL: Duration = Duration::minutes(5);
/// Interval between proactive sweeps of expired, never-consumed tokens.
pub const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(300);

const STATE_ENTROPY_BYTES: usize = 32;

/// One-time state token tying an outbound redirect to its inbound callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateToken {
	value: String,
	issued_at: OffsetDateTime,
}
impl StateToken {
	/// Opaque value to embed in the redirect URL's `state` parameter.
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Instant the token was issued.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}
}
impl Display for StateToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}

/// Registry of outstanding authorization state tokens.
///
/// Shared across the web-callback handler and the sweeper; all synchronization
/// lives inside the backing [`TtlCache`].
#[derive(Debug)]
pub struct StateRegistry {
	tokens: TtlCache<String, OffsetDateTime>,
}
impl StateRegistry {
	/// Creates an empty registry using the standard [`STATE_TTL`] window.
	pub fn new() -> Self {
		Self { tokens: TtlCache::new(STATE_TTL) }
	}

	/// Issues a fresh one-time token and records it for later consumption.
	pub fn issue(&self) -> StateToken {
		let bytes: [u8; STATE_ENTROPY_BYTES] = rand::rng().random();
		let value = URL_SAFE_NO_PAD.encode(bytes);
		let issued_at = OffsetDateTime::now_utc();

		// State values are unique with overwhelming probability and the registry is
		// unbounded, so the insert cannot fail.
		let _ = self.tokens.insert_at(value.clone(), issued_at, issued_at);

		StateToken { value, issued_at }
	}

	/// Consumes a returned state value, deleting it in the same step.
	///
	/// Returns `false` for unknown, expired, or already-consumed values, so a
	/// replayed callback is rejected deterministically.
	pub fn consume(&self, value: &str) -> bool {
		self.tokens.take(value).is_some()
	}

	/// Number of outstanding (unexpired, unconsumed) tokens.
	pub fn outstanding(&self) -> usize {
		self.tokens.len()
	}

	/// Runs the proactive sweep loop until `shutdown` is cancelled.
	///
	/// Wakes every [`SWEEP_INTERVAL`] and drops expired tokens so worst-case memory
	/// stays bounded even when `consume` is never called for abandoned flows. An
	/// in-progress sleep is interrupted by cancellation and the loop exits without
	/// error.
	pub async fn run_sweeper(&self, shutdown: CancellationToken) {
		loop {
			if shutdown.is_cancelled() {
				tracing::debug!("State sweeper stopping: shutdown requested.");

				return;
			}

			tokio::select! {
				_ = shutdown.cancelled() => {
					tracing::debug!("State sweeper stopping: shutdown requested.");

					return;
				},
				_ = tokio::time::sleep(SWEEP_INTERVAL) => {
					let removed = self.tokens.purge_expired();

					if removed > 0 {
						tracing::debug!(removed, "Swept expired authorization state tokens.");
					}
				},
			}
		}
	}

	#[cfg(test)]
	pub(crate) fn issue_backdated(&self, age: Duration) -> StateToken {
		let issued_at = OffsetDateTime::now_utc() - age;
		let bytes: [u8; STATE_ENTROPY_BYTES] = rand::rng().random();
		let value = URL_SAFE_NO_PAD.encode(bytes);
		let _ = self.tokens.insert_at(value.clone(), issued_at, issued_at);

		StateToken { value, issued_at }
	}
}
impl Default for StateRegistry {
	fn default() -> Self {
		Self::new()
	}
}

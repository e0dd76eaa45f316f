//! Storage contract and built-in stores for the sealed credential pair.
//!
//! Exactly one logical [`CredentialPair`] exists per integration target: it is
//! created by the first successful authorization and replaced wholesale by every
//! successful refresh. Stores treat both halves as opaque ciphertext; sealing and
//! opening is the caller's job via [`Cipher`](crate::cipher::Cipher). Concurrent
//! saves are resolved last-writer-wins, which is sufficient because the refresher
//! never interleaves a refresh and a retry for a single request.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract the credential lifecycle depends on.
///
/// Implementations must be safe to call from concurrent refresh attempts; no
/// stronger guarantee than last-writer-wins is required.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the stored pair, if any authorization has ever completed.
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>>;

	/// Persists or replaces the stored pair.
	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;
}

/// Sealed access/refresh token pair as handed to and from a [`CredentialStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Sealed access token ciphertext.
	pub access: SealedSecret,
	/// Sealed refresh token ciphertext.
	pub refresh: SealedSecret,
}
impl CredentialPair {
	/// Builds a pair from two sealed blobs.
	pub fn new(access: SealedSecret, refresh: SealedSecret) -> Self {
		Self { access, refresh }
	}
}

/// Redacted ciphertext wrapper keeping sealed material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSecret(String);
impl SealedSecret {
	/// Wraps a new ciphertext string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner ciphertext. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for SealedSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for SealedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SealedSecret").field(&"<redacted>").finish()
	}
}
impl Display for SealedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

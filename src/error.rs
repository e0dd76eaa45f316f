//! Crate-level error types shared by the cache, stores, cipher, and refresh paths.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Cache-level failure (capacity or read-side condition).
	#[error(transparent)]
	Cache(#[from] CacheError),
	/// Cipher capability rejected a sealed payload.
	#[error(transparent)]
	Cipher(#[from] crate::cipher::CipherError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(#[from] crate::store::StoreError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// No authorization has ever been completed; a human must run the flow first.
	#[error("No credentials are stored; complete the authorization flow first.")]
	NoCredentials,
	/// The refresh grant was rejected; automatic recovery is impossible.
	#[error("Credential refresh failed and re-authorization is required: {reason}.")]
	ReauthorizationRequired {
		/// Upstream- or crate-supplied reason string.
		reason: String,
	},
	/// The token endpoint answered the exchange without a refresh token.
	#[error("Token endpoint response is missing a refresh token.")]
	MissingRefreshToken,
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Resource server answered with a status the caller must handle itself.
	#[error("Resource server returned an unexpected status: {status}.")]
	UnexpectedStatus {
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Cache conditions surfaced by [`TtlCache`](crate::cache::TtlCache).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Insert rejected because the cache reached its configured bound.
	#[error("The cache has reached its maximum size of {max_size} entries.")]
	Full {
		/// Configured capacity bound.
		max_size: usize,
	},
	/// The key exists but its entry has outlived the TTL.
	#[error("The key has expired.")]
	KeyExpired,
	/// The key has never been inserted or was already removed.
	#[error("The key is not present.")]
	KeyAbsent,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "snapshot unwritable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("snapshot unwritable"));

		let source = StdError::source(&error)
			.expect("Storage errors should expose the original store error as their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn cache_conditions_are_distinct() {
		assert_ne!(CacheError::KeyExpired, CacheError::KeyAbsent);
		assert_eq!(
			CacheError::Full { max_size: 2 }.to_string(),
			"The cache has reached its maximum size of 2 entries."
		);
	}
}

//! Injected symmetric-cipher capability used to seal credentials at rest.
//!
//! The crate never chooses an algorithm or holds key material; the embedding
//! service supplies a [`Cipher`] and the stores only ever see the resulting
//! [`SealedSecret`] blobs. Decryption happens at the point of use and plaintext is
//! never persisted or logged.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, store::SealedSecret};

/// Symmetric seal/open capability supplied by the embedding service.
pub trait Cipher
where
	Self: Send + Sync,
{
	/// Seals plaintext bytes into an opaque ciphertext blob.
	fn seal(&self, plaintext: &[u8]) -> SealedSecret;

	/// Opens a sealed blob back into plaintext bytes.
	fn open(&self, sealed: &SealedSecret) -> Result<Vec<u8>, CipherError>;

	/// Opens a sealed blob and decodes it as UTF-8, the common case for tokens.
	fn open_string(&self, sealed: &SealedSecret) -> Result<String, CipherError> {
		String::from_utf8(self.open(sealed)?)
			.map_err(|_| CipherError::Malformed { message: "plaintext is not valid UTF-8".into() })
	}
}

/// Failures raised while opening a sealed payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CipherError {
	/// The ciphertext is structurally invalid for the configured cipher.
	#[error("Sealed payload is malformed: {message}.")]
	Malformed {
		/// Human-readable error payload.
		message: String,
	},
}

/// Base64 passthrough that satisfies the [`Cipher`] contract without providing any
/// confidentiality. Strictly for local development and tests; production embeds a
/// real symmetric cipher (the reference deployment uses Fernet).
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainCipher;
impl Cipher for PlainCipher {
	fn seal(&self, plaintext: &[u8]) -> SealedSecret {
		SealedSecret::new(STANDARD.encode(plaintext))
	}

	fn open(&self, sealed: &SealedSecret) -> Result<Vec<u8>, CipherError> {
		STANDARD
			.decode(sealed.expose())
			.map_err(|e| CipherError::Malformed { message: e.to_string() })
	}
}

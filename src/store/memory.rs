//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialPair, CredentialStore, StoreFuture},
};

type Slot = Arc<RwLock<Option<CredentialPair>>>;

/// In-process store holding the single credential pair behind a lock.
///
/// Saves overwrite unconditionally, so whichever concurrent refresh finishes last
/// owns the persisted pair.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(pair);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::SealedSecret;

	fn pair(tag: &str) -> CredentialPair {
		CredentialPair::new(
			SealedSecret::new(format!("at-{tag}")),
			SealedSecret::new(format!("rt-{tag}")),
		)
	}

	#[tokio::test]
	async fn load_is_empty_until_first_save() {
		let store = MemoryStore::default();

		assert_eq!(store.load().await.expect("Load should succeed."), None);
	}

	#[tokio::test]
	async fn last_writer_wins() {
		let store = MemoryStore::default();

		store.save(pair("first")).await.expect("First save should succeed.");
		store.save(pair("second")).await.expect("Second save should succeed.");

		let stored = store
			.load()
			.await
			.expect("Load should succeed.")
			.expect("Pair should be present after saves.");

		assert_eq!(stored, pair("second"));
	}
}

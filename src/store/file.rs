//! Simple file-backed [`CredentialStore`] for lightweight bot deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{CredentialPair, CredentialStore, StoreError, StoreFuture},
};

/// Persists the sealed pair to a JSON file after each save.
///
/// Writes go through a temporary file followed by a rename so a crash mid-save
/// never leaves a truncated snapshot behind.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<CredentialPair>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { None };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Option<CredentialPair>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let pair: CredentialPair =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(Some(pair))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, pair: &CredentialPair) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(pair).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist_locked(&pair)?;
			*guard = Some(pair);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::store::SealedSecret;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"stream_sidecar_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let pair =
			CredentialPair::new(SealedSecret::new("sealed-at"), SealedSecret::new("sealed-rt"));

		store.save(pair.clone()).await.expect("Failed to save pair to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.load()
			.await
			.expect("Failed to load pair from reopened store.")
			.expect("File store lost the pair after reopen.");

		assert_eq!(fetched, pair);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn empty_snapshot_loads_as_absent() {
		let path = temp_path();

		File::create(&path).expect("Failed to create empty snapshot file.");

		let store = FileStore::open(&path).expect("Failed to open empty snapshot.");

		assert_eq!(store.load().await.expect("Load should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary store snapshot {}: {e}", path.display())
		});
	}
}

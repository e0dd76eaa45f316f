//! Ephemeral-state and credential-lifecycle core for live-stream chat bots: TTL caches,
//! one-time OAuth state, self-healing bearer tokens, and now-playing polling in one crate.
//!
//! The crate is the piece of a chat-bot service that everything else leans on but nobody
//! wants to rewrite: a generic [`cache::TtlCache`] for transient correlation data, a
//! [`registry::StateRegistry`] for one-time authorization state, a [`store::CredentialStore`]
//! contract over an encrypted token pair, a [`refresh::TokenRefresher`] that survives 401s
//! by rotating the pair exactly once per request, and a [`observer::PollingObserver`] that
//! keeps the shared [`state::StreamState`] blackboard fresh.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod cipher;
pub mod error;
pub mod obs;
pub mod observer;
pub mod refresh;
pub mod registry;
pub mod service;
pub mod state;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;

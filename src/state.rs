//! Process-wide stream blackboard read by chat commands and overlays.
//!
//! One [`StreamState`] exists per process. Each field has exactly one producer:
//! the polling observer owns `playing`, the stream online/offline event handlers
//! own `online`, and the follow/subscription/redeem handlers own the remaining
//! name fields. Every reader gets a clone; nothing here hands out references into
//! the locked interior.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{_prelude::*, cache::TtlCache};

/// TTL applied to the recently-seen-chatter cache.
pub const CHATTER_TTL: Duration = Duration::seconds(600);

/// Derived now-playing snapshot published by the polling observer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
	/// Display title, `"{track} - {artist}"`.
	pub title: String,
	/// Canonical track URL.
	pub url: String,
	/// Album art URL, when the payload carried one.
	pub image: Option<String>,
}

/// Shared mutable bulletin board for the stream's ambient state.
///
/// Readers must treat every value as a snapshot that may be stale by up to one
/// polling interval.
#[derive(Debug)]
pub struct StreamState {
	playing: RwLock<Option<NowPlaying>>,
	online: AtomicBool,
	follower: RwLock<Option<String>>,
	subscriber: RwLock<Option<String>>,
	first: RwLock<Option<String>>,
	chatters: TtlCache<String, OffsetDateTime>,
}
impl StreamState {
	/// Creates an empty board; everything starts unknown/offline.
	pub fn new() -> Self {
		Self {
			playing: RwLock::new(None),
			online: AtomicBool::new(false),
			follower: RwLock::new(None),
			subscriber: RwLock::new(None),
			first: RwLock::new(None),
			chatters: TtlCache::new(CHATTER_TTL),
		}
	}

	/// Publishes the current now-playing snapshot; `None` means nothing is playing.
	///
	/// Written only by the polling observer.
	pub fn set_now_playing(&self, playing: Option<NowPlaying>) {
		*self.playing.write() = playing;
	}

	/// Latest now-playing snapshot, if any.
	pub fn now_playing(&self) -> Option<NowPlaying> {
		self.playing.read().clone()
	}

	/// Flips the live flag. Written only by the stream online/offline handlers.
	pub fn set_online(&self, online: bool) {
		self.online.store(online, Ordering::Relaxed);
	}

	/// Whether the stream is currently live.
	pub fn is_online(&self) -> bool {
		self.online.load(Ordering::Relaxed)
	}

	/// Records the latest follower's display name.
	pub fn set_follower(&self, name: impl Into<String>) {
		*self.follower.write() = Some(name.into());
	}

	/// Latest follower's display name, if one has been seen.
	pub fn follower(&self) -> Option<String> {
		self.follower.read().clone()
	}

	/// Records the latest subscriber's display name.
	pub fn set_subscriber(&self, name: impl Into<String>) {
		*self.subscriber.write() = Some(name.into());
	}

	/// Latest subscriber's display name, if one has been seen.
	pub fn subscriber(&self) -> Option<String> {
		self.subscriber.read().clone()
	}

	/// Records today's first channel-point redeemer.
	pub fn set_first_redeemer(&self, name: impl Into<String>) {
		*self.first.write() = Some(name.into());
	}

	/// Today's first channel-point redeemer, if any.
	pub fn first_redeemer(&self) -> Option<String> {
		self.first.read().clone()
	}

	/// Marks a chatter as recently seen, refreshing their TTL window.
	pub fn note_chatter(&self, login: impl Into<String>) {
		// The chatter cache is unbounded, so the insert cannot fail.
		let _ = self.chatters.insert(login.into(), OffsetDateTime::now_utc());
	}

	/// Returns `true` if the chatter spoke within the last [`CHATTER_TTL`].
	pub fn seen_recently(&self, login: &str) -> bool {
		self.chatters.contains(login)
	}

	/// Snapshot of every recently-seen chatter login.
	pub fn recent_chatters(&self) -> Vec<String> {
		self.chatters.entries().into_iter().map(|(login, _)| login).collect()
	}
}
impl Default for StreamState {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn board_starts_empty_and_offline() {
		let state = StreamState::new();

		assert_eq!(state.now_playing(), None);
		assert!(!state.is_online());
		assert_eq!(state.follower(), None);
		assert!(state.recent_chatters().is_empty());
	}

	#[test]
	fn now_playing_is_last_writer_wins() {
		let state = StreamState::new();
		let first = NowPlaying {
			title: "Song A - Artist".into(),
			url: "https://music.example.com/a".into(),
			image: None,
		};
		let second = NowPlaying {
			title: "Song B - Artist".into(),
			url: "https://music.example.com/b".into(),
			image: Some("https://img.example.com/b.jpg".into()),
		};

		state.set_now_playing(Some(first));
		state.set_now_playing(Some(second.clone()));

		assert_eq!(state.now_playing(), Some(second));

		state.set_now_playing(None);

		assert_eq!(state.now_playing(), None);
	}

	#[test]
	fn chatters_are_tracked_with_a_ttl() {
		let state = StreamState::new();

		state.note_chatter("mysty");

		assert!(state.seen_recently("mysty"));
		assert!(!state.seen_recently("lurker"));
		assert_eq!(state.recent_chatters(), vec!["mysty".to_string()]);
	}

	#[test]
	fn name_fields_hold_the_latest_value() {
		let state = StreamState::new();

		state.set_follower("new-follower");
		state.set_subscriber("new-sub");
		state.set_first_redeemer("early-bird");
		state.set_online(true);

		assert_eq!(state.follower().as_deref(), Some("new-follower"));
		assert_eq!(state.subscriber().as_deref(), Some("new-sub"));
		assert_eq!(state.first_redeemer().as_deref(), Some("early-bird"));
		assert!(state.is_online());
	}
}

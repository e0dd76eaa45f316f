//! Now-playing polling loop publishing into the shared stream blackboard.
//!
//! The observer is a plain `Idle -> Polling -> Idle` cycle with no terminal state
//! short of shutdown. Each tick asks the refresher for the currently-playing
//! payload, derives the public snapshot plus the next sleep from the embedded
//! progress/duration fields, and publishes it. A tick that fails in transport or
//! decoding degrades to "nothing playing" for that tick; the loop itself never
//! dies to an upstream hiccup.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::Method;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome},
	refresh::TokenRefresher,
	state::{NowPlaying, StreamState},
};

/// Sleep applied when nothing is playing or a tick failed.
pub const IDLE_DELAY: StdDuration = StdDuration::from_secs(10);

// Ceiling on any tick's sleep, so published state never goes stale for longer.
const DELAY_CEILING_SECS: f64 = 10.0;
// Remaining playtime substituted when the payload omits `progress_ms`.
const DEFAULT_REMAINING_MS: u64 = 10_000;

/// Currently-playing payload as returned by the resource server.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackPayload {
	/// Active track, absent when playback is stopped.
	pub item: Option<PlaybackItem>,
	/// Progress through the active track in milliseconds.
	pub progress_ms: Option<u64>,
}

/// Track metadata embedded in a playback payload.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackItem {
	/// Track name.
	pub name: String,
	/// Canonical track URL.
	pub href: String,
	/// Track length in milliseconds.
	pub duration_ms: u64,
	/// Credited artists, first one leads the display title.
	#[serde(default)]
	pub artists: Vec<ArtistRef>,
	/// Album metadata carrying the artwork.
	#[serde(default)]
	pub album: AlbumRef,
}

/// Artist reference embedded in a playback item.
#[derive(Clone, Debug, Deserialize)]
pub struct ArtistRef {
	/// Artist display name.
	pub name: String,
}

/// Album reference embedded in a playback item.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AlbumRef {
	/// Artwork renditions, largest first.
	#[serde(default)]
	pub images: Vec<ImageRef>,
}

/// Artwork reference embedded in an album.
#[derive(Clone, Debug, Deserialize)]
pub struct ImageRef {
	/// Artwork URL.
	pub url: String,
}

/// Long-lived poller that keeps [`StreamState::now_playing`] fresh.
#[derive(Debug)]
pub struct PollingObserver {
	refresher: Arc<TokenRefresher>,
	state: Arc<StreamState>,
	endpoint: Url,
}
impl PollingObserver {
	/// Creates an observer polling `endpoint` for the currently-playing payload.
	pub fn new(refresher: Arc<TokenRefresher>, state: Arc<StreamState>, endpoint: Url) -> Self {
		Self { refresher, state, endpoint }
	}

	/// Runs the polling loop until `shutdown` is cancelled.
	///
	/// An in-progress sleep is interrupted by cancellation and the loop exits
	/// without error; no further ticks run afterwards.
	pub async fn run(&self, shutdown: CancellationToken) {
		loop {
			if shutdown.is_cancelled() {
				tracing::debug!("Polling observer stopping: shutdown requested.");

				return;
			}

			let delay = self.tick().await;

			tokio::select! {
				_ = shutdown.cancelled() => {
					tracing::debug!("Polling observer stopping: shutdown requested.");

					return;
				},
				_ = tokio::time::sleep(delay) => {},
			}
		}
	}

	/// Performs one poll, publishes the outcome, and returns the next sleep.
	pub async fn tick(&self) -> StdDuration {
		obs::record_op_outcome(OpKind::Poll, OpOutcome::Attempt);

		let payload = match self
			.refresher
			.request::<PlaybackPayload>(Method::GET, self.endpoint.clone())
			.await
		{
			Ok(payload) => {
				obs::record_op_outcome(OpKind::Poll, OpOutcome::Success);

				payload
			},
			Err(e) => {
				obs::record_op_outcome(OpKind::Poll, OpOutcome::Failure);
				tracing::warn!(error = %e, "Now-playing poll failed; treating as nothing playing.");

				None
			},
		};

		self.publish(payload)
	}

	/// Publishes the derived snapshot and computes the next sleep,
	/// `min(remaining + 1s, 10s)`.
	fn publish(&self, payload: Option<PlaybackPayload>) -> StdDuration {
		tracing::debug!("Updating now-playing snapshot.");

		let Some(payload) = payload else {
			self.state.set_now_playing(None);

			return IDLE_DELAY;
		};
		let Some(item) = payload.item else {
			self.state.set_now_playing(None);

			return IDLE_DELAY;
		};
		let remaining_ms = match payload.progress_ms {
			Some(progress) => item.duration_ms.saturating_sub(progress),
			None => DEFAULT_REMAINING_MS,
		};
		let title = match item.artists.first() {
			Some(artist) => format!("{} - {}", item.name, artist.name),
			None => item.name.clone(),
		};
		let snapshot = NowPlaying {
			title,
			url: item.href,
			image: item.album.images.first().map(|image| image.url.clone()),
		};

		self.state.set_now_playing(Some(snapshot));

		let delay_secs = (remaining_ms as f64 / 1_000.0 + 1.0).min(DELAY_CEILING_SECS);

		StdDuration::from_secs_f64(delay_secs)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		cipher::PlainCipher,
		service::{ServiceEndpoints, ServiceProfile},
		store::MemoryStore,
	};

	fn observer() -> (PollingObserver, Arc<StreamState>) {
		let profile = ServiceProfile::new(
			ServiceEndpoints {
				authorization: Url::parse("https://accounts.example.com/authorize")
					.expect("Authorization fixture URL should parse."),
				token: Url::parse("https://accounts.example.com/api/token")
					.expect("Token fixture URL should parse."),
			},
			"client",
			"secret",
			Url::parse("https://bot.example.com/callback")
				.expect("Redirect fixture URL should parse."),
			"user-read-currently-playing",
		);
		let refresher = Arc::new(TokenRefresher::new(
			profile,
			Arc::new(MemoryStore::default()),
			Arc::new(PlainCipher),
		));
		let state = Arc::new(StreamState::new());
		let endpoint = Url::parse("https://api.example.com/v1/me/player/currently-playing")
			.expect("Endpoint fixture URL should parse.");
		let observer = PollingObserver::new(refresher, state.clone(), endpoint);

		(observer, state)
	}

	fn payload(duration_ms: u64, progress_ms: Option<u64>) -> PlaybackPayload {
		PlaybackPayload {
			item: Some(PlaybackItem {
				name: "Resonance".into(),
				href: "https://music.example.com/track/1".into(),
				duration_ms,
				artists: vec![ArtistRef { name: "Home".into() }],
				album: AlbumRef {
					images: vec![ImageRef { url: "https://img.example.com/1.jpg".into() }],
				},
			}),
			progress_ms,
		}
	}

	#[test]
	fn active_track_publishes_snapshot_and_caps_the_delay() {
		let (observer, state) = observer();
		let delay = observer.publish(Some(payload(200_000, Some(150_000))));

		// 50s remaining clamps to the 10s ceiling.
		assert_eq!(delay, StdDuration::from_secs(10));

		let playing = state.now_playing().expect("An active track should be published.");

		assert_eq!(playing.title, "Resonance - Home");
		assert_eq!(playing.url, "https://music.example.com/track/1");
		assert_eq!(playing.image.as_deref(), Some("https://img.example.com/1.jpg"));
	}

	#[test]
	fn short_remainder_polls_sooner_than_the_ceiling() {
		let (observer, _) = observer();
		let delay = observer.publish(Some(payload(200_000, Some(197_000))));

		// 3s remaining plus the 1s cushion.
		assert_eq!(delay, StdDuration::from_secs(4));
	}

	#[test]
	fn missing_progress_substitutes_the_default_remainder() {
		let (observer, _) = observer();
		let delay = observer.publish(Some(payload(200_000, None)));

		// 10_000ms default remaining plus 1s cushion clamps to the ceiling.
		assert_eq!(delay, StdDuration::from_secs(10));
	}

	#[test]
	fn no_payload_clears_state_and_idles() {
		let (observer, state) = observer();

		state.set_now_playing(Some(NowPlaying {
			title: "stale".into(),
			url: "https://music.example.com/stale".into(),
			image: None,
		}));

		let delay = observer.publish(None);

		assert_eq!(delay, IDLE_DELAY);
		assert_eq!(state.now_playing(), None);
	}

	#[test]
	fn stopped_playback_clears_state_and_idles() {
		let (observer, state) = observer();
		let delay =
			observer.publish(Some(PlaybackPayload { item: None, progress_ms: Some(1_000) }));

		assert_eq!(delay, IDLE_DELAY);
		assert_eq!(state.now_playing(), None);
	}

	#[test]
	fn titles_without_artists_fall_back_to_the_track_name() {
		let (observer, state) = observer();
		let mut payload = payload(1_000, Some(0));

		payload.item.as_mut().expect("Fixture has an item.").artists.clear();
		observer.publish(Some(payload));

		let playing = state.now_playing().expect("An active track should be published.");

		assert_eq!(playing.title, "Resonance");
	}
}

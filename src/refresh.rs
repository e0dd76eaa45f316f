//! Self-healing bearer requests against the remote resource server.
//!
//! [`TokenRefresher::request`] loads the sealed pair, opens it at the point of use,
//! and attempts the call. A 401 triggers exactly one `grant_type=refresh_token`
//! exchange followed by exactly one retry; a second 401 (or a rejected refresh)
//! surfaces to the caller instead of looping against a revoked credential.
//!
//! Concurrent callers that both observe a 401 may each perform a refresh. The
//! token endpoint issues a valid pair per call and the store is last-writer-wins,
//! so the final persisted pair is whichever rotation finished last. Callers that
//! want a single physical refresh can add a per-credential async mutex in front of
//! this type; the crate deliberately does not impose one.

// crates.io
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	cipher::Cipher,
	error::TransportError,
	obs::{self, OpKind, OpOutcome},
	service::ServiceProfile,
	store::{CredentialPair, CredentialStore},
};

/// Token endpoint response for both the exchange and the refresh grants.
#[derive(Debug, Deserialize)]
struct TokenGrant {
	access_token: String,
	refresh_token: Option<String>,
}

/// Executes authenticated calls to the remote resource server, transparently
/// rotating the credential pair when the access token has expired.
pub struct TokenRefresher {
	http: ReqwestClient,
	profile: ServiceProfile,
	store: Arc<dyn CredentialStore>,
	cipher: Arc<dyn Cipher>,
}
impl TokenRefresher {
	/// Creates a refresher with a default HTTP client.
	pub fn new(
		profile: ServiceProfile,
		store: Arc<dyn CredentialStore>,
		cipher: Arc<dyn Cipher>,
	) -> Self {
		Self::with_http_client(profile, store, cipher, ReqwestClient::default())
	}

	/// Creates a refresher that reuses the caller-provided HTTP client.
	pub fn with_http_client(
		profile: ServiceProfile,
		store: Arc<dyn CredentialStore>,
		cipher: Arc<dyn Cipher>,
		http: ReqwestClient,
	) -> Self {
		Self { http, profile, store, cipher }
	}

	/// Service profile this refresher talks to.
	pub fn profile(&self) -> &ServiceProfile {
		&self.profile
	}

	/// Performs a bearer-authenticated request, refreshing the pair at most once.
	///
	/// Returns `Ok(None)` for a 204 response and for a success response whose body
	/// does not decode as `T`; both are valid empty results for this protocol. Any
	/// non-success, non-401 status is surfaced as [`Error::UnexpectedStatus`]
	/// without a retry.
	pub async fn request<T>(&self, method: Method, url: Url) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		obs::record_op_outcome(OpKind::Request, OpOutcome::Attempt);

		let result = self.request_inner(method, url).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Request, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Request, OpOutcome::Failure),
		}

		result
	}

	async fn request_inner<T>(&self, method: Method, url: Url) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		let pair = self.store.load().await?.ok_or(Error::NoCredentials)?;
		let access = self.cipher.open_string(&pair.access)?;
		let refresh = self.cipher.open_string(&pair.refresh)?;
		let mut response = self.bearer_send(method.clone(), url.clone(), &access).await?;

		if response.status() == StatusCode::UNAUTHORIZED {
			let access = self.refresh_credentials(&refresh).await?;

			response = self.bearer_send(method, url, &access).await?;
		}

		let status = response.status();

		if status == StatusCode::NO_CONTENT {
			return Ok(None);
		}
		if !status.is_success() {
			return Err(Error::UnexpectedStatus { status: status.as_u16() });
		}

		let bytes = response.bytes().await.map_err(TransportError::from)?;

		match serde_json::from_slice(&bytes) {
			Ok(value) => Ok(Some(value)),
			Err(e) => {
				tracing::debug!(error = %e, "Treating undecodable success response as empty.");

				Ok(None)
			},
		}
	}

	/// Exchanges an authorization code for a fresh pair and persists it sealed.
	///
	/// The response must carry a refresh token; a pair that cannot self-heal is
	/// rejected with [`Error::MissingRefreshToken`] rather than stored.
	pub async fn exchange_code(&self, code: &str) -> Result<()> {
		obs::record_op_outcome(OpKind::Exchange, OpOutcome::Attempt);

		let result = self.exchange_code_inner(code).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Exchange, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Exchange, OpOutcome::Failure),
		}

		result
	}

	async fn exchange_code_inner(&self, code: &str) -> Result<()> {
		let response = self
			.token_endpoint_post(&[
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.profile.redirect_uri.as_str()),
			])
			.await
			.map_err(Error::Transport)?;
		let status = response.status();

		if !status.is_success() {
			tracing::warn!(status = status.as_u16(), "Unexpected status during code exchange.");

			return Err(Error::UnexpectedStatus { status: status.as_u16() });
		}

		let grant = Self::parse_grant(
			&response.bytes().await.map_err(TransportError::from)?,
		)?;
		let refresh = grant.refresh_token.ok_or(Error::MissingRefreshToken)?;

		self.persist_pair(&grant.access_token, &refresh).await?;

		Ok(())
	}

	/// Rotates the pair via the refresh grant, persists it, and returns the new
	/// plaintext access token.
	///
	/// A rejected or unreachable token endpoint means the refresh token itself is
	/// no longer trusted, so the failure escalates to
	/// [`Error::ReauthorizationRequired`]; only a human can recover from that.
	async fn refresh_credentials(&self, refresh_token: &str) -> Result<String> {
		obs::record_op_outcome(OpKind::Refresh, OpOutcome::Attempt);

		let result = self.refresh_credentials_inner(refresh_token).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Refresh, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Refresh, OpOutcome::Failure),
		}

		result
	}

	async fn refresh_credentials_inner(&self, refresh_token: &str) -> Result<String> {
		let response = self
			.token_endpoint_post(&[
				("grant_type", "refresh_token"),
				("refresh_token", refresh_token),
			])
			.await
			.map_err(|e| {
				tracing::error!(error = %e, "Token endpoint unreachable; re-authorization required.");

				Error::ReauthorizationRequired { reason: "token endpoint unreachable".into() }
			})?;
		let status = response.status();

		if !status.is_success() {
			tracing::error!(
				status = status.as_u16(),
				"Unable to refresh access token. Consider re-authenticating.",
			);

			return Err(Error::ReauthorizationRequired {
				reason: format!("token endpoint returned {status}"),
			});
		}

		let grant = Self::parse_grant(
			&response.bytes().await.map_err(TransportError::from)?,
		)?;
		// The service may omit the refresh token on rotation; the old one stays valid.
		let refresh = grant.refresh_token.as_deref().unwrap_or(refresh_token);

		self.persist_pair(&grant.access_token, refresh).await?;

		Ok(grant.access_token)
	}

	async fn token_endpoint_post(
		&self,
		form: &[(&str, &str)],
	) -> Result<Response, TransportError> {
		Ok(self
			.http
			.post(self.profile.endpoints.token.clone())
			.basic_auth(&self.profile.client_id, Some(&self.profile.client_secret))
			.form(form)
			.send()
			.await?)
	}

	async fn bearer_send(&self, method: Method, url: Url, access: &str) -> Result<Response> {
		Ok(self
			.http
			.request(method, url)
			.bearer_auth(access)
			.send()
			.await
			.map_err(TransportError::from)?)
	}

	async fn persist_pair(&self, access: &str, refresh: &str) -> Result<()> {
		let pair = CredentialPair::new(
			self.cipher.seal(access.as_bytes()),
			self.cipher.seal(refresh.as_bytes()),
		);

		self.store.save(pair).await?;

		Ok(())
	}

	fn parse_grant(bytes: &[u8]) -> Result<TokenGrant> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::TokenResponseParse { source })
	}
}
impl Debug for TokenRefresher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher").field("profile", &self.profile).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn grant_parses_with_and_without_refresh_token() {
		let full = TokenRefresher::parse_grant(
			br#"{"access_token":"at","refresh_token":"rt","expires_in":3600,"token_type":"Bearer"}"#,
		)
		.expect("Full grant should parse.");

		assert_eq!(full.access_token, "at");
		assert_eq!(full.refresh_token.as_deref(), Some("rt"));

		let partial = TokenRefresher::parse_grant(br#"{"access_token":"at"}"#)
			.expect("Grant without a refresh token should parse.");

		assert_eq!(partial.refresh_token, None);
	}

	#[test]
	fn malformed_grant_reports_the_failing_path() {
		let err = TokenRefresher::parse_grant(br#"{"access_token":42}"#)
			.expect_err("Non-string access token should fail to parse.");

		assert!(matches!(err, Error::TokenResponseParse { .. }));
	}
}

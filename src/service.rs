//! Immutable per-integration profile describing the remote service.
//!
//! The profile is the single-account counterpart of a multi-tenant provider
//! descriptor: one authorization endpoint, one token endpoint, one confidential
//! client. Built once at startup by the embedding service and shared read-only.

// self
use crate::{_prelude::*, registry::StateToken};

/// Endpoint set declared by a service profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
}

/// Immutable integration profile consumed by the refresher and the web handlers.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceProfile {
	/// Endpoint definitions exposed by the service.
	pub endpoints: ServiceEndpoints,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Confidential client secret used for HTTP Basic auth at the token endpoint.
	pub client_secret: String,
	/// Redirect URI registered with the service.
	pub redirect_uri: Url,
	/// Space-delimited scope string requested during authorization.
	pub scope: String,
}
impl ServiceProfile {
	/// Creates a profile for a confidential client.
	pub fn new(
		endpoints: ServiceEndpoints,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: Url,
		scope: impl Into<String>,
	) -> Self {
		Self {
			endpoints,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			redirect_uri,
			scope: scope.into(),
		}
	}

	/// Builds the outbound authorize URL embedding a freshly issued state token.
	pub fn authorize_url(&self, state: &StateToken) -> Url {
		let mut url = self.endpoints.authorization.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.client_id);

			if !self.scope.is_empty() {
				pairs.append_pair("scope", &self.scope);
			}

			pairs.append_pair("redirect_uri", self.redirect_uri.as_str());
			pairs.append_pair("state", state.value());
		}

		url
	}
}
impl Debug for ServiceProfile {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceProfile")
			.field("endpoints", &self.endpoints)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.field("redirect_uri", &self.redirect_uri)
			.field("scope", &self.scope)
			.finish()
	}
}

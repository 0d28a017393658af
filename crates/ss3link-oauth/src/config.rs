//! Client identity and endpoints.

/// OAuth client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
    pub audience: String,
    /// Value of the `auth0Client` query parameter and `Auth0-Client` header.
    pub auth0_client: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::simplisafe()
    }
}

impl OAuthConfig {
    /// The identity of the vendor's mobile app.
    pub fn simplisafe() -> Self {
        Self {
            client_id: "42aBZ5lYrVW12jfOuu3CQROitwxg9sN5".to_string(),
            authorize_url: "https://auth.simplisafe.com/authorize".to_string(),
            token_url: "https://auth.simplisafe.com/oauth/token".to_string(),
            redirect_uri:
                "com.simplisafe.mobile://auth.simplisafe.com/ios/com.simplisafe.mobile/callback"
                    .to_string(),
            scope: "offline_access email openid https://api.simplisafe.com/scopes/user:platform"
                .to_string(),
            audience: "https://api.simplisafe.com/".to_string(),
            auth0_client: "eyJuYW1lIjoiQXV0aDAuc3dpZnQiLCJlbnYiOnsiaU9TIjoiMTUuMCIsInN3aWZ0IjoiNS54In0sInZlcnNpb24iOiIxLjMzLjAifQ".to_string(),
        }
    }

    /// Build the browser authorization URL for a PKCE challenge.
    pub fn authorization_url(&self, challenge: &str) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
            ("audience", self.audience.as_str()),
            ("auth0Client", self.auth0_client.as_str()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.authorize_url, query)
    }
}

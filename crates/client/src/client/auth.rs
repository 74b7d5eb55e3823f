//! Authentication API client methods

use super::ApiClient;
use crate::dispatcher::RequestDescriptor;
use crate::error::Result;
use crate::types::{
    LoginRequest, RefreshRequest, RegisterRequest, TokenResponse, UpdateProfileRequest,
    UserProfile,
};
use tracing::{info, instrument, warn};

impl ApiClient {
    /// Log in, store the issued token pair and load the user's profile
    ///
    /// # Errors
    ///
    /// Returns the login failure (401 for bad credentials, 403 for a disabled
    /// account) or the profile lookup failure. In the latter case the tokens
    /// remain stored.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let descriptor = RequestDescriptor::post("/auth/login")
            .unauthenticated()
            .json(&LoginRequest { email, password })?;
        let tokens: TokenResponse = self.dispatcher.request_json(&descriptor).await?;
        self.tokens().set_pair(tokens.into());
        // Cached projects carry the previous user's role
        self.projects.clear();
        info!("Logged in");

        self.me().await
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns 409 if the email is already registered
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<UserProfile> {
        let descriptor = RequestDescriptor::post("/auth/register")
            .unauthenticated()
            .json(&RegisterRequest {
                email,
                name,
                password,
            })?;
        self.dispatcher.request_json(&descriptor).await
    }

    /// Refresh the token pair now and reload the user's profile
    ///
    /// Joins an implicit refresh if one is already running.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure (the session is cleared) or the profile
    /// lookup failure
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<UserProfile> {
        self.dispatcher.refresh_tokens().await?;
        self.me().await
    }

    /// End the session
    ///
    /// The server-side revocation is best effort: its failure is logged and
    /// the local tokens and the project cache are cleared regardless.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.tokens().refresh_token() {
            let revoke = async {
                let descriptor = RequestDescriptor::post("/auth/logout")
                    .without_retry()
                    .json(&RefreshRequest { refresh_token })?;
                self.dispatcher.request(&descriptor).await
            };
            if let Err(err) = revoke.await {
                warn!(error = %err, "Logout request failed, clearing local session anyway");
            }
        }

        self.tokens().clear();
        self.projects.clear();
        info!("Logged out");
    }

    /// Profile of the logged-in user
    ///
    /// # Errors
    ///
    /// Returns an auth-expired error if the session cannot be recovered
    pub async fn me(&self) -> Result<UserProfile> {
        self.dispatcher
            .request_json(&RequestDescriptor::get("/auth/me"))
            .await
    }

    /// Change the logged-in user's name and/or password
    ///
    /// # Errors
    ///
    /// Returns the normalized failure
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> Result<UserProfile> {
        let descriptor = RequestDescriptor::patch("/auth/me").json(update)?;
        self.dispatcher.request_json(&descriptor).await
    }
}

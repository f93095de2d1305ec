use serde::Serialize;

use crate::error::Error;
use crate::gateway::{ApiRequest, Gateway, ensure_success};
use crate::session::SessionStore;
use crate::types::UserProfile;

/// The authenticated user's profile.
pub struct UsersApi<'a> {
    gateway: &'a Gateway,
    session: &'a SessionStore,
}

/// Sparse profile update; only the set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl<'a> UsersApi<'a> {
    pub(super) fn new(gateway: &'a Gateway, session: &'a SessionStore) -> Self {
        Self { gateway, session }
    }

    /// Fetch the current profile and refresh the session's cached copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on rejection, [`Error::Http`] on transport
    /// failure.
    pub async fn me(&self) -> Result<UserProfile, Error> {
        let response = self.gateway.execute(&ApiRequest::get("/users/me")).await?;
        let response = ensure_success(response, "profile fetch").await?;
        let profile: UserProfile = response.json().await?;
        self.session.store_user(profile.clone());
        Ok(profile)
    }

    /// Update profile fields; the returned (and cached) profile reflects
    /// the change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if validation fails server-side.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, Error> {
        let request = ApiRequest::patch("/users/me").with_json(update)?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "profile update").await?;
        let profile: UserProfile = response.json().await?;
        self.session.store_user(profile.clone());
        Ok(profile)
    }

    /// Change the account password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the current password is wrong or the new
    /// one is rejected.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), Error> {
        let request = ApiRequest::post("/users/change-password").with_json(&serde_json::json!({
            "current_password": current_password,
            "new_password": new_password,
        }))?;
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "password change").await?;
        Ok(())
    }

    /// Deactivate the account.
    ///
    /// The session is cleared in every outcome; once deactivation has been
    /// requested the client must not keep acting on the old credentials.
    ///
    /// # Errors
    ///
    /// Returns the server-side failure, if any, after the local clear.
    pub async fn deactivate(&self) -> Result<(), Error> {
        let result = async {
            let response = self.gateway.execute(&ApiRequest::delete("/users/me")).await?;
            ensure_success(response, "account deactivation").await?;
            Ok(())
        }
        .await;
        self.session.clear();
        result
    }
}

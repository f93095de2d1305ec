use serde::Serialize;

use crate::error::Error;
use crate::gateway::{ApiRequest, Gateway, ensure_success};
use crate::session::{SessionStore, TokenPair};
use crate::types::UserProfile;

/// Registration, login, logout, and credential recovery.
pub struct AuthApi<'a> {
    gateway: &'a Gateway,
    session: &'a SessionStore,
}

/// New-account registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub timezone: String,
    pub password: String,
}

/// Password-reset confirmation payload (token arrives by email).
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirmation {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(gateway: &'a Gateway, session: &'a SessionStore) -> Self {
        Self { gateway, session }
    }

    /// Authenticate with email and password.
    ///
    /// On success the credential pair is stored (in memory and persisted),
    /// the profile is fetched with the new access credential and cached,
    /// and the profile is returned. A 401 here means bad credentials and is
    /// surfaced directly; login is exempt from the refresh protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on rejected credentials, [`Error::Http`] on
    /// transport failure. If the follow-up profile fetch fails, the error is
    /// returned but the stored credentials are kept.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, Error> {
        let request = ApiRequest::post("/auth/login").with_form([
            ("username".to_owned(), email.to_owned()),
            ("password".to_owned(), password.to_owned()),
        ]);

        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "login").await?;
        let tokens: TokenPair = response.json().await?;

        // Store first: the profile fetch below must carry the new credential.
        self.session.rotate(&tokens);
        self.fetch_profile().await
    }

    /// Register a new account. The account must verify its email before it
    /// can log in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if registration is rejected (e.g. duplicate
    /// email or username).
    pub async fn signup(&self, new_user: &NewUser) -> Result<UserProfile, Error> {
        let request = ApiRequest::post("/auth/signup")
            .unauthenticated()
            .with_json(new_user)?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "signup").await?;
        response.json().await.map_err(Into::into)
    }

    /// Sign out: revoke the refresh credential server-side and clear the
    /// session.
    ///
    /// The local session is cleared even when the server call fails, so the
    /// caller is signed out in every outcome.
    ///
    /// # Errors
    ///
    /// Returns the server-side failure, if any, after the local clear.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.request_logout().await;
        self.session.clear();
        result
    }

    async fn request_logout(&self) -> Result<(), Error> {
        let body =
            serde_json::json!({ "refresh_token": self.session.persisted_refresh_token() });
        let request = ApiRequest::post("/auth/logout").with_json(&body)?;
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "logout").await?;
        Ok(())
    }

    /// Restore a session from the persisted refresh credential, if any.
    ///
    /// Intended for application start: mints a fresh credential pair,
    /// fetches the profile, and returns it. Returns `Ok(None)` when no
    /// refresh credential is stored or the backend rejects it (the session
    /// is cleared in the latter case).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`]/[`Error::Api`] only for the profile fetch
    /// after a successful refresh; refresh failures resolve to `Ok(None)`.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>, Error> {
        let Some(refresh_token) = self.session.persisted_refresh_token() else {
            return Ok(None);
        };

        match self.gateway.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.session.rotate(&tokens);
                self.fetch_profile().await.map(Some)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed, signing out");
                self.session.clear();
                Ok(None)
            }
        }
    }

    /// Request a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the backend rejects the request.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), Error> {
        let request = ApiRequest::post("/auth/password-reset-request")
            .unauthenticated()
            .with_json(&serde_json::json!({ "email": email }))?;
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "password reset request").await?;
        Ok(())
    }

    /// Complete a password reset with the emailed token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on an invalid or expired token.
    pub async fn confirm_password_reset(
        &self,
        confirmation: &PasswordResetConfirmation,
    ) -> Result<(), Error> {
        let request = ApiRequest::post("/auth/password-reset-confirm")
            .unauthenticated()
            .with_json(confirmation)?;
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "password reset confirm").await?;
        Ok(())
    }

    /// Request a fresh email-verification link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the backend rejects the request.
    pub async fn request_verification_email(&self, email: &str) -> Result<(), Error> {
        let request = ApiRequest::post("/auth/email/request-verification-email")
            .unauthenticated()
            .with_json(&serde_json::json!({ "email": email }))?;
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "verification email request").await?;
        Ok(())
    }

    /// Verify an email address with the emailed token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on an invalid or expired token.
    pub async fn verify_email(&self, token: &str) -> Result<(), Error> {
        let request = ApiRequest::post("/auth/email/verify-email")
            .unauthenticated()
            .with_query("token", token);
        let response = self.gateway.execute(&request).await?;
        ensure_success(response, "email verification").await?;
        Ok(())
    }

    /// Fetch `/users/me` and cache the profile in the session.
    async fn fetch_profile(&self) -> Result<UserProfile, Error> {
        let response = self.gateway.execute(&ApiRequest::get("/users/me")).await?;
        let response = ensure_success(response, "profile fetch").await?;
        let profile: UserProfile = response.json().await?;
        self.session.store_user(profile.clone());
        Ok(profile)
    }
}

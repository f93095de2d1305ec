//! Typed endpoint groups over the authenticated-request gateway.
//!
//! [`ApiClient`] owns the session store and the gateway; each accessor
//! returns a lightweight endpoint group borrowing both.
//!
//! ```rust,ignore
//! let client = ApiClient::new(ApiConfig::from_env()?, FileStorage::open_default()?);
//! client.auth().login("user@example.com", "secret").await?;
//! let bills = client.bills().list(Default::default()).await?;
//! ```

mod appliances;
mod auth;
mod bills;
mod insights;
mod users;

use std::sync::Arc;

pub use appliances::{
    ApplianceEstimate, ApplianceUpdate, AppliancesApi, CatalogAppliance, NewAppliance,
    UserAppliance,
};
pub use auth::{AuthApi, NewUser, PasswordResetConfirmation};
pub use bills::{Bill, BillDetails, BillListParams, BillsApi, UploadTicket};
pub use insights::{
    ApplianceBreakdown, CarbonFootprint, ConsumptionTrend, InsightReport, InsightStatusInfo,
    InsightsApi, Recommendation,
};
pub use users::{ProfileUpdate, UsersApi};

use crate::config::ApiConfig;
use crate::gateway::Gateway;
use crate::session::SessionStore;
use crate::storage::CredentialStorage;

/// Client for the Enerlytics API.
pub struct ApiClient {
    gateway: Arc<Gateway>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client over the given configuration and credential storage.
    ///
    /// Any session persisted in `storage` is restored immediately, so a
    /// client built from a previous run's storage starts out authenticated.
    #[must_use]
    pub fn new(config: ApiConfig, storage: impl CredentialStorage) -> Self {
        Self::with_http_client(config, storage, reqwest::Client::new())
    }

    /// Like [`ApiClient::new`], with a caller-supplied HTTP client (for
    /// connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(
        config: ApiConfig,
        storage: impl CredentialStorage,
        http: reqwest::Client,
    ) -> Self {
        let session = Arc::new(SessionStore::new(storage));
        let gateway = Arc::new(Gateway::new(config, session.clone()).with_http_client(http));
        Self { gateway, session }
    }

    /// Session store shared by every endpoint group.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The underlying gateway, for requests outside the typed surface.
    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Registration, login, logout, and credential recovery.
    #[must_use]
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(&self.gateway, &self.session)
    }

    /// The authenticated user's profile.
    #[must_use]
    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(&self.gateway, &self.session)
    }

    /// Bill upload, listing, and parsing lifecycle.
    #[must_use]
    pub fn bills(&self) -> BillsApi<'_> {
        BillsApi::new(&self.gateway)
    }

    /// Appliance catalog and per-bill appliance survey.
    #[must_use]
    pub fn appliances(&self) -> AppliancesApi<'_> {
        AppliancesApi::new(&self.gateway)
    }

    /// AI-generated consumption insight reports.
    #[must_use]
    pub fn insights(&self) -> InsightsApi<'_> {
        InsightsApi::new(&self.gateway)
    }
}

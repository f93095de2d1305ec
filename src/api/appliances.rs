use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::gateway::{ApiRequest, Gateway, ensure_success};
use crate::types::{ApplianceId, BillId, EstimateId, UserId};

/// Appliance catalog and per-bill appliance survey.
pub struct AppliancesApi<'a> {
    gateway: &'a Gateway,
}

/// Catalog entry describing a common household appliance type.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct CatalogAppliance {
    pub category_id: String,
    pub label: String,
    pub icon_emoji: String,
    /// Typical rated wattage for this appliance type.
    pub typical_wattage: u32,
}

/// An appliance the user reported owning, tied to a bill's survey.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct UserAppliance {
    pub id: ApplianceId,
    pub user_id: UserId,
    pub custom_name: String,
    #[serde(default)]
    pub appliance_catalog_id: Option<String>,
    pub count: u32,
    /// Overrides the catalog wattage when the user knows better.
    #[serde(default)]
    pub custom_wattage: Option<u32>,
    pub hours_per_day: f64,
    pub days_per_week: u8,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub star_rating: Option<String>,
    #[serde(default)]
    pub purchase_year: Option<u16>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

/// Estimated share of a bill attributed to one appliance.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ApplianceEstimate {
    pub id: EstimateId,
    pub bill_id: BillId,
    pub user_appliance_id: ApplianceId,
    pub estimated_kwh: f64,
    pub estimated_cost: f64,
    #[serde(default)]
    pub appliance_name: Option<String>,
    #[serde(default)]
    pub percentage_of_bill: f64,
}

/// Payload for reporting a new appliance.
///
/// Required fields are constructor parameters; everything else chains:
///
/// ```rust,ignore
/// let appliance = NewAppliance::new("Living Room AC", 8.0, 7)
///     .with_catalog_id("ac_split_1_5ton")
///     .with_brand("LG")
///     .with_star_rating("5");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct NewAppliance {
    custom_name: String,
    hours_per_day: f64,
    days_per_week: u8,
    count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    appliance_catalog_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_wattage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    star_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purchase_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl NewAppliance {
    /// A new appliance entry. Either [`with_catalog_id`](Self::with_catalog_id)
    /// or [`with_wattage`](Self::with_wattage) must be chained for the
    /// backend to accept it.
    #[must_use]
    pub fn new(custom_name: impl Into<String>, hours_per_day: f64, days_per_week: u8) -> Self {
        Self {
            custom_name: custom_name.into(),
            hours_per_day,
            days_per_week,
            count: 1,
            appliance_catalog_id: None,
            custom_wattage: None,
            brand: None,
            model: None,
            star_rating: None,
            purchase_year: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_catalog_id(mut self, catalog_id: impl Into<String>) -> Self {
        self.appliance_catalog_id = Some(catalog_id.into());
        self
    }

    #[must_use]
    pub fn with_wattage(mut self, wattage: u32) -> Self {
        self.custom_wattage = Some(wattage);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_star_rating(mut self, rating: impl Into<String>) -> Self {
        self.star_rating = Some(rating.into());
        self
    }

    #[must_use]
    pub fn with_purchase_year(mut self, year: u16) -> Self {
        self.purchase_year = Some(year);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Sparse appliance update; only the set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplianceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_wattage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_per_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ApplianceUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_wattage(mut self, wattage: u32) -> Self {
        self.custom_wattage = Some(wattage);
        self
    }

    #[must_use]
    pub fn with_hours_per_day(mut self, hours: f64) -> Self {
        self.hours_per_day = Some(hours);
        self
    }

    #[must_use]
    pub fn with_days_per_week(mut self, days: u8) -> Self {
        self.days_per_week = Some(days);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl<'a> AppliancesApi<'a> {
    pub(super) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// The global appliance catalog used to seed survey forms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on rejection, [`Error::Http`] on transport
    /// failure.
    pub async fn catalog(&self) -> Result<Vec<CatalogAppliance>, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get("/appliances/catalog"))
            .await?;
        let response = ensure_success(response, "catalog fetch").await?;
        response.json().await.map_err(Into::into)
    }

    /// Appliances surveyed for a bill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist.
    pub async fn for_bill(&self, bill_id: BillId) -> Result<Vec<UserAppliance>, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/appliances/{bill_id}/appliances")))
            .await?;
        let response = ensure_success(response, "appliance listing").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch a single surveyed appliance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the appliance does not exist.
    pub async fn get(&self, appliance_id: ApplianceId) -> Result<UserAppliance, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/appliances/{appliance_id}")))
            .await?;
        let response = ensure_success(response, "appliance fetch").await?;
        response.json().await.map_err(Into::into)
    }

    /// Per-appliance consumption estimates for a bill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if estimation has not been run for the bill.
    pub async fn estimates(&self, bill_id: BillId) -> Result<Vec<ApplianceEstimate>, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/appliances/estimates/{bill_id}")))
            .await?;
        let response = ensure_success(response, "estimate listing").await?;
        response.json().await.map_err(Into::into)
    }

    /// Report an appliance for a bill's survey.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if validation fails server-side.
    pub async fn create(
        &self,
        bill_id: BillId,
        appliance: &NewAppliance,
    ) -> Result<UserAppliance, Error> {
        let request =
            ApiRequest::post(format!("/appliances/{bill_id}/create")).with_json(appliance)?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "appliance create").await?;
        response.json().await.map_err(Into::into)
    }

    /// Update a surveyed appliance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the appliance does not exist or validation
    /// fails.
    pub async fn update(
        &self,
        bill_id: BillId,
        appliance_id: ApplianceId,
        update: &ApplianceUpdate,
    ) -> Result<UserAppliance, Error> {
        let request = ApiRequest::patch(format!("/appliances/{bill_id}/{appliance_id}"))
            .with_json(update)?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "appliance update").await?;
        response.json().await.map_err(Into::into)
    }

    /// Remove an appliance from a bill's survey.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the appliance does not exist.
    pub async fn delete(&self, bill_id: BillId, appliance_id: ApplianceId) -> Result<(), Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::delete(format!(
                "/appliances/{bill_id}/{appliance_id}"
            )))
            .await?;
        ensure_success(response, "appliance deletion").await?;
        Ok(())
    }
}

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::gateway::{ApiRequest, Gateway, ensure_success};
use crate::types::{BillId, InsightStatus};

/// AI-generated consumption insight reports.
pub struct InsightsApi<'a> {
    gateway: &'a Gateway,
}

/// Generation state of a bill's insight report.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct InsightStatusInfo {
    pub bill_id: BillId,
    pub status: InsightStatus,
}

/// Month-over-month consumption data point.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ConsumptionTrend {
    pub month: String,
    pub kwh: f64,
    pub cost: f64,
    #[serde(default)]
    pub percentage_change: Option<f64>,
}

/// Share of the bill attributed to one appliance category.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct ApplianceBreakdown {
    pub appliance_name: String,
    pub category: String,
    pub kwh: f64,
    pub cost: f64,
    pub percentage_of_total: f64,
    #[serde(default)]
    pub icon_emoji: Option<String>,
}

/// Actionable energy-saving recommendation.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub potential_savings_kwh: Option<f64>,
    #[serde(default)]
    pub potential_savings_cost: Option<f64>,
    /// `high`, `medium`, or `low`.
    pub priority: String,
    /// `easy`, `medium`, or `hard`.
    pub difficulty: String,
    #[serde(default)]
    pub action_type: Option<String>,
}

/// Carbon-footprint analysis for the billing period.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct CarbonFootprint {
    pub total_co2_kg: f64,
    #[serde(default)]
    pub equivalent_trees_needed: Option<i64>,
    #[serde(default)]
    pub comparison_to_avg: Option<f64>,
    #[serde(default)]
    pub reduction_potential_kg: Option<f64>,
}

/// Completed insight report for a bill.
///
/// The backend evolves this payload faster than the client; unrecognized
/// sections land in nothing, missing ones default to empty.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct InsightReport {
    #[serde(default)]
    pub summary: Option<JsonValue>,
    #[serde(default)]
    pub consumption_trends: Vec<ConsumptionTrend>,
    #[serde(default)]
    pub appliance_breakdown: Vec<ApplianceBreakdown>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub carbon_footprint: Option<CarbonFootprint>,
}

impl<'a> InsightsApi<'a> {
    pub(super) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Generation status for a bill's report. Bills with no report yet
    /// answer `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist.
    pub async fn status(&self, bill_id: BillId) -> Result<InsightStatusInfo, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/insights/status/{bill_id}")))
            .await?;
        let response = ensure_success(response, "insight status").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch the report for a bill.
    ///
    /// Returns `Ok(None)` while generation is still in progress (the
    /// backend answers 202); poll [`status`](Self::status) and retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist or generation
    /// failed.
    pub async fn report(&self, bill_id: BillId) -> Result<Option<InsightReport>, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/insights/report/{bill_id}")))
            .await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(None);
        }
        let response = ensure_success(response, "insight report").await?;
        response.json().await.map(Some).map_err(Into::into)
    }

    /// Discard the current report and queue regeneration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist.
    pub async fn refresh_report(&self, bill_id: BillId) -> Result<(), Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::post(format!(
                "/insights/report/{bill_id}/refresh"
            )))
            .await?;
        ensure_success(response, "insight regeneration").await?;
        Ok(())
    }
}

use serde::Deserialize;
use serde_json::Value as JsonValue;
use time::Date;

use crate::error::Error;
use crate::gateway::{ApiRequest, Gateway, ensure_success};
use crate::types::{BillId, BillSource, BillStatus, Page, UserId};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Bill upload, listing, and parsing lifecycle.
pub struct BillsApi<'a> {
    gateway: &'a Gateway,
}

/// A parsed (or still-parsing) electricity bill.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct Bill {
    pub id: BillId,
    pub user_id: UserId,
    #[serde(with = "iso_date")]
    pub billing_period_start: Date,
    #[serde(with = "iso_date")]
    pub billing_period_end: Date,
    /// Total consumption over the billing period, in kWh.
    pub kwh_total: f64,
    /// Total cost over the billing period, in the account currency.
    pub cost_total: f64,
    pub provider: String,
    pub source_type: BillSource,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub parse_status: BillStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    /// Parsing errors, when `parse_status` is `failed`.
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// A bill plus its normalized parse payload.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct BillDetails {
    #[serde(flatten)]
    pub bill: Bill,
    /// Normalized "golden record" produced by the parser. Schema is owned
    /// by the backend and versioned independently, so it stays untyped.
    #[serde(default)]
    pub details: Option<JsonValue>,
}

/// Presigned upload ticket for a bill file.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct UploadTicket {
    /// Secure, one-time URL to PUT the file to.
    pub upload_url: String,
    /// Permanent URI of the file, passed back to [`BillsApi::confirm_upload`].
    pub file_uri: String,
}

/// Pagination parameters for [`BillsApi::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BillListParams {
    /// Page number, 1-based. Backend default when unset.
    pub page: Option<u32>,
    /// Items per page (1–100). Backend default when unset.
    pub size: Option<u32>,
}

impl<'a> BillsApi<'a> {
    pub(super) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// List the authenticated user's bills, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] on rejection, [`Error::Http`] on transport
    /// failure.
    pub async fn list(&self, params: BillListParams) -> Result<Page<Bill>, Error> {
        let mut request = ApiRequest::get("/users/me/bills");
        if let Some(page) = params.page {
            request = request.with_query("page", page.to_string());
        }
        if let Some(size) = params.size {
            request = request.with_query("size", size.to_string());
        }
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "bill listing").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch a single bill with its normalized parse payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist or belongs to
    /// another user.
    pub async fn get(&self, id: BillId) -> Result<BillDetails, Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::get(format!("/bills/{id}")))
            .await?;
        let response = ensure_success(response, "bill fetch").await?;
        response.json().await.map_err(Into::into)
    }

    /// Step 1 of an upload: obtain a presigned URL for the bill file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the file type is rejected.
    pub async fn request_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadTicket, Error> {
        let request = ApiRequest::post("/bills/upload").with_json(&serde_json::json!({
            "filename": filename,
            "content_type": content_type,
        }))?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "upload request").await?;
        response.json().await.map_err(Into::into)
    }

    /// Step 2 of an upload: confirm the file landed and queue parsing.
    /// Returns the new bill record with `parse_status` = `processing`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if `file_uri` is unknown.
    pub async fn confirm_upload(&self, file_uri: &str) -> Result<Bill, Error> {
        let request = ApiRequest::post("/bills/confirm")
            .with_json(&serde_json::json!({ "file_uri": file_uri }))?;
        let response = self.gateway.execute(&request).await?;
        let response = ensure_success(response, "upload confirm").await?;
        response.json().await.map_err(Into::into)
    }

    /// Delete a bill and everything derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill does not exist.
    pub async fn delete(&self, id: BillId) -> Result<(), Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::delete(format!("/bills/{id}")))
            .await?;
        ensure_success(response, "bill deletion").await?;
        Ok(())
    }

    /// Queue appliance-level consumption estimation for a parsed bill.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the bill is not in a parsable state.
    pub async fn request_estimation(&self, id: BillId) -> Result<(), Error> {
        let response = self
            .gateway
            .execute(&ApiRequest::post(format!("/bills/{id}/estimate")))
            .await?;
        ensure_success(response, "estimation request").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bill_deserializes_wire_format() {
        let json = serde_json::json!({
            "id": "6b7e1b62-0000-0000-0000-000000000001",
            "user_id": "6b7e1b62-0000-0000-0000-000000000002",
            "billing_period_start": "2025-03-01",
            "billing_period_end": "2025-03-31",
            "kwh_total": 412.5,
            "cost_total": 3187.0,
            "provider": "BESCOM",
            "source_type": "pdf",
            "confidence_score": 0.93,
            "parse_status": "success",
            "created_at": "2025-04-02T09:15:00Z",
        });
        let bill: Bill = serde_json::from_value(json).unwrap();
        assert_eq!(bill.parse_status, BillStatus::Success);
        assert_eq!(bill.billing_period_start.to_string(), "2025-03-01");
        assert_eq!(bill.errors, None);
    }

    #[test]
    fn bill_details_flattens_record() {
        let json = serde_json::json!({
            "id": "6b7e1b62-0000-0000-0000-000000000001",
            "user_id": "6b7e1b62-0000-0000-0000-000000000002",
            "billing_period_start": "2025-03-01",
            "billing_period_end": "2025-03-31",
            "kwh_total": 412.5,
            "cost_total": 3187.0,
            "provider": "BESCOM",
            "source_type": "manual",
            "parse_status": "processing",
            "created_at": "2025-04-02T09:15:00Z",
            "details": { "discom": "BESCOM", "totals": { "cost": 3187.0 } },
        });
        let details: BillDetails = serde_json::from_value(json).unwrap();
        assert_eq!(details.bill.source_type, BillSource::Manual);
        assert_eq!(details.details.unwrap()["discom"], "BESCOM");
    }

    #[test]
    fn list_params_default_is_empty() {
        let params = BillListParams::default();
        assert_eq!(params.page, None);
        assert_eq!(params.size, None);
    }
}

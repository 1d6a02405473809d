//! ManageIQ REST API client for the request queue.
//!
//! Reads `approval_state` from `/api/requests` and posts `approve`/`deny`
//! actions to a request resource. Migration plans are followed through the
//! transformation plan request the appliance creates when a plan runs.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use gatewatch_domain::{
    ApprovalDecision, ApprovalState, DescriptionMatch, MigrationPlanState, ObservedState,
    RequestDescription,
};

use crate::infrastructure::ports::{
    ActuatorError, ApprovalActuator, MigrationPlanSource, RequestStatusSource, StatusSourceError,
};
use crate::infrastructure::settings::WatchSettings;

/// Client for the ManageIQ requests collection.
#[derive(Clone)]
pub struct ManageIqClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    matching: DescriptionMatch,
}

impl ManageIqClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self::with_timeout(base_url, username, password, 30)
    }

    /// Create client with custom timeout.
    pub fn with_timeout(base_url: &str, username: &str, password: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            matching: DescriptionMatch::default(),
        }
    }

    pub fn from_settings(settings: &WatchSettings) -> Self {
        Self::with_timeout(
            &settings.manageiq_url,
            &settings.manageiq_user,
            &settings.manageiq_password,
            settings.http_timeout_secs,
        )
        .with_matching(settings.description_match())
    }

    pub fn with_matching(mut self, matching: DescriptionMatch) -> Self {
        self.matching = matching;
        self
    }

    /// Request rows matching `filters`, newest first.
    async fn list_requests<R>(
        &self,
        operation: &'static str,
        attributes: &str,
        filters: &[String],
    ) -> Result<Vec<R>, StatusSourceError>
    where
        R: DeserializeOwned + Send,
    {
        let mut query = vec![
            ("expand", "resources"),
            ("attributes", attributes),
            ("sort_by", "created_on"),
            ("sort_order", "desc"),
        ];
        query.extend(filters.iter().map(|filter| ("filter[]", filter.as_str())));

        let response = self
            .client
            .get(format!("{}/api/requests", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&query)
            .send()
            .await
            .map_err(|e| StatusSourceError::request_failed(operation, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StatusSourceError::request_failed(
                operation,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let collection: RequestCollection<R> = response
            .json()
            .await
            .map_err(StatusSourceError::invalid_response)?;

        Ok(collection.resources)
    }

    /// Most recently created request matching `description`.
    async fn find_request(
        &self,
        description: &RequestDescription,
    ) -> Result<Option<RequestRow>, StatusSourceError> {
        let rows = self
            .list_requests(
                "list_requests",
                "id,description,approval_state",
                &[filter_expression(description.as_str(), self.matching)],
            )
            .await?;

        Ok(latest_match(rows, description, self.matching))
    }
}

/// API filter selecting request rows by description.
fn filter_expression(description: &str, matching: DescriptionMatch) -> String {
    let escaped = description.replace('\'', "\\'");
    match matching {
        DescriptionMatch::Exact => format!("description='{}'", escaped),
        DescriptionMatch::Partial => format!("description='%{}%'", escaped),
    }
}

/// The listing is sorted newest first; the filter is re-applied locally in
/// case the server's wildcard handling is looser than ours.
fn latest_match(
    rows: Vec<RequestRow>,
    description: &RequestDescription,
    matching: DescriptionMatch,
) -> Option<RequestRow> {
    rows.into_iter()
        .find(|row| description.matches(&row.description, matching))
}

fn row_state(row: &RequestRow) -> Result<ApprovalState, StatusSourceError> {
    ApprovalState::from_str(&row.approval_state).map_err(StatusSourceError::invalid_response)
}

/// Plan milestone for a transformation plan request row.
///
/// The request only tracks `pending -> active -> finished` plus an outcome
/// status, so `Completed` is reported only for a finished request whose
/// status is neither `Ok` nor `Error`. Appliances that report the plan
/// state names directly are parsed as-is.
fn plan_row_state(row: &PlanRequestRow) -> Result<MigrationPlanState, StatusSourceError> {
    let request_state = row.request_state.trim().to_lowercase();
    let status = row.status.trim().to_lowercase();

    if status == "error" {
        return Ok(MigrationPlanState::Failed);
    }
    match request_state.as_str() {
        "pending" | "queued" => Ok(MigrationPlanState::Started),
        "active" => Ok(MigrationPlanState::InProgress),
        "finished" if status == "ok" => Ok(MigrationPlanState::Successful),
        "finished" => Ok(MigrationPlanState::Completed),
        other => MigrationPlanState::from_str(other).map_err(StatusSourceError::invalid_response),
    }
}

#[async_trait]
impl RequestStatusSource for ManageIqClient {
    async fn current_state(
        &self,
        description: &RequestDescription,
    ) -> Result<ObservedState, StatusSourceError> {
        match self.find_request(description).await? {
            Some(row) => Ok(ObservedState::Known(row_state(&row)?)),
            None => Ok(ObservedState::Unknown),
        }
    }
}

#[async_trait]
impl ApprovalActuator for ManageIqClient {
    async fn submit_decision(
        &self,
        description: &RequestDescription,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<(), ActuatorError> {
        // The API would accept a decision on a resolved request and report
        // it in the body; check the row first so nothing is sent for it.
        let row = self
            .find_request(description)
            .await
            .map_err(|e| ActuatorError::RequestFailed(e.to_string()))?
            .ok_or_else(|| ActuatorError::not_approvable(description, ObservedState::Unknown))?;

        let current = row_state(&row).map_err(|e| ActuatorError::InvalidResponse(e.to_string()))?;
        if !current.accepts_decision() {
            return Err(ActuatorError::not_approvable(description, current.into()));
        }

        let response = self
            .client
            .post(format!("{}/api/requests/{}", self.base_url, row.id))
            .basic_auth(&self.username, Some(&self.password))
            .json(&ActionRequest {
                action: decision.verb(),
                reason,
            })
            .send()
            .await
            .map_err(|e| ActuatorError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ActuatorError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let result: ActionResponse = response
            .json()
            .await
            .map_err(|e| ActuatorError::InvalidResponse(e.to_string()))?;

        if result.success {
            Ok(())
        } else {
            Err(ActuatorError::RequestFailed(
                result
                    .message
                    .unwrap_or_else(|| format!("{} was not accepted", decision)),
            ))
        }
    }
}

#[async_trait]
impl MigrationPlanSource for ManageIqClient {
    async fn plan_state(
        &self,
        plan_name: &str,
    ) -> Result<Option<MigrationPlanState>, StatusSourceError> {
        let rows: Vec<PlanRequestRow> = self
            .list_requests(
                "list_plan_requests",
                "id,description,request_state,status",
                &[
                    format!("type={}", PLAN_REQUEST_TYPE),
                    filter_expression(plan_name, DescriptionMatch::Partial),
                ],
            )
            .await?;

        rows.iter()
            .find(|row| row.description.contains(plan_name))
            .map(plan_row_state)
            .transpose()
    }
}

// =============================================================================
// API Types
// =============================================================================

/// Request class the appliance creates when a migration plan is run.
const PLAN_REQUEST_TYPE: &str = "ServiceTemplateTransformationPlanRequest";

#[derive(Debug, Deserialize)]
struct RequestCollection<R> {
    #[serde(default = "Vec::new")]
    resources: Vec<R>,
}

#[derive(Debug, Clone, Deserialize)]
struct RequestRow {
    #[serde(deserialize_with = "id_as_string")]
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    approval_state: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlanRequestRow {
    #[serde(default)]
    description: String,
    #[serde(default)]
    request_state: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
}

/// Older appliances send numeric ids, newer ones strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected request id: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(s: &str) -> RequestDescription {
        RequestDescription::new(s).unwrap()
    }

    fn rows<R: DeserializeOwned>(json: &str) -> Vec<R> {
        serde_json::from_str::<RequestCollection<R>>(json)
            .unwrap()
            .resources
    }

    fn plan_row(request_state: &str, status: &str) -> PlanRequestRow {
        PlanRequestRow {
            description: "Transformation Plan plan_a".to_string(),
            request_state: request_state.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn filter_uses_wildcards_for_partial_match() {
        assert_eq!(
            filter_expression("svc-42", DescriptionMatch::Partial),
            "description='%svc-42%'"
        );
        assert_eq!(
            filter_expression("svc-42", DescriptionMatch::Exact),
            "description='svc-42'"
        );
    }

    #[test]
    fn filter_escapes_quotes() {
        assert_eq!(
            filter_expression("bob's vm", DescriptionMatch::Exact),
            "description='bob\\'s vm'"
        );
    }

    #[test]
    fn parses_string_and_numeric_ids() {
        let parsed: Vec<RequestRow> = rows(
            r#"{"resources": [
                {"id": "10000000000123", "description": "a", "approval_state": "approved"},
                {"id": 7, "description": "b", "approval_state": "denied"}
            ]}"#,
        );
        assert_eq!(parsed[0].id, "10000000000123");
        assert_eq!(parsed[1].id, "7");
    }

    #[test]
    fn empty_listing_has_no_match() {
        let parsed: Vec<RequestRow> = rows(r#"{"name": "requests", "count": 0, "subcount": 0}"#);
        assert!(latest_match(parsed, &desc("svc-42"), DescriptionMatch::Partial).is_none());
    }

    #[test]
    fn first_matching_row_is_newest() {
        let parsed: Vec<RequestRow> = rows(
            r#"{"resources": [
                {"id": "3", "description": "Provisioning Service [other]", "approval_state": "approved"},
                {"id": "2", "description": "Provisioning Service [svc-42]", "approval_state": "pending_approval"},
                {"id": "1", "description": "Provisioning Service [svc-42]", "approval_state": "approved"}
            ]}"#,
        );
        let row = latest_match(parsed, &desc("svc-42"), DescriptionMatch::Partial).unwrap();
        assert_eq!(row.id, "2");
        assert_eq!(row_state(&row).unwrap(), ApprovalState::PendingApproval);
    }

    #[test]
    fn unknown_approval_state_is_invalid_response() {
        let row = RequestRow {
            id: "1".to_string(),
            description: "svc".to_string(),
            approval_state: "frozen".to_string(),
        };
        assert!(matches!(
            row_state(&row),
            Err(StatusSourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn plan_request_rows_map_to_milestones() {
        let parsed: Vec<PlanRequestRow> = rows(
            r#"{"resources": [
                {"id": "9", "description": "Transformation Plan plan_a", "request_state": "active", "status": "Ok"}
            ]}"#,
        );
        assert_eq!(
            plan_row_state(&parsed[0]).unwrap(),
            MigrationPlanState::InProgress
        );

        assert_eq!(
            plan_row_state(&plan_row("pending", "Ok")).unwrap(),
            MigrationPlanState::Started
        );
        assert_eq!(
            plan_row_state(&plan_row("finished", "Warn")).unwrap(),
            MigrationPlanState::Completed
        );
        assert_eq!(
            plan_row_state(&plan_row("finished", "Ok")).unwrap(),
            MigrationPlanState::Successful
        );
    }

    #[test]
    fn plan_error_status_is_failure() {
        assert_eq!(
            plan_row_state(&plan_row("active", "Error")).unwrap(),
            MigrationPlanState::Failed
        );
        assert_eq!(
            plan_row_state(&plan_row("finished", "Error")).unwrap(),
            MigrationPlanState::Failed
        );
    }

    #[test]
    fn plan_state_names_are_accepted_verbatim() {
        assert_eq!(
            plan_row_state(&plan_row("In_Progress", "")).unwrap(),
            MigrationPlanState::InProgress
        );
        assert!(matches!(
            plan_row_state(&plan_row("paused", "")),
            Err(StatusSourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn action_request_shape() {
        let body = serde_json::to_value(ActionRequest {
            action: ApprovalDecision::Approve.verb(),
            reason: "Approved",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"action": "approve", "reason": "Approved"})
        );
    }

    #[test]
    fn action_response_defaults_to_failure() {
        let parsed: ActionResponse = serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("nope"));
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ManageIqClient::new("https://cfme.example.com/", "admin", "smartvm");
        assert_eq!(client.base_url, "https://cfme.example.com");
        assert_eq!(client.matching, DescriptionMatch::Partial);
    }
}

//! HTTP clients for analyzer and auditor services running as separate roles.

use async_trait::async_trait;
use chainaudit_application::{AnalysisStage, RecordStage};
use chainaudit_core::{AppError, AppResult};
use chainaudit_domain::{AuditRecord, Event, EventId, EventInput, RiskAnalysis};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// `error` value that auditor services send while the chain is halted.
pub const CHAIN_INTEGRITY_ERROR: &str = "Chain integrity violation";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Calls `POST {base}/analyze` on an analyzer service.
#[derive(Clone)]
pub struct HttpAnalysisStage {
    http_client: reqwest::Client,
    analyze_url: String,
}

impl HttpAnalysisStage {
    /// Creates a stage for the analyzer at `base_url`.
    ///
    /// The client should carry the downstream timeout.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: &str) -> Self {
        Self {
            http_client,
            analyze_url: endpoint(base_url, "analyze"),
        }
    }
}

/// Calls the recorder endpoints of an auditor service.
#[derive(Clone)]
pub struct HttpRecordStage {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRecordStage {
    /// Creates a stage for the auditor at `base_url`.
    #[must_use]
    pub fn new(http_client: reqwest::Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponseBody {
    analysis: RiskAnalysis,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditRequestBody<'a> {
    event_id: &'a str,
    analysis: &'a RiskAnalysis,
    original_event: EventInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditRecordBody {
    audit_record: AuditRecord,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn describe(&self) -> String {
        match (self.error.as_deref(), self.message.as_deref()) {
            (Some(error), Some(message)) => format!("{error}: {message}"),
            (Some(text), None) | (None, Some(text)) => text.to_owned(),
            (None, None) => "no error detail".to_owned(),
        }
    }
}

#[async_trait]
impl AnalysisStage for HttpAnalysisStage {
    async fn analyze(&self, event: &Event) -> AppResult<RiskAnalysis> {
        let response = self
            .http_client
            .post(self.analyze_url.as_str())
            .header(REQUEST_ID_HEADER, request_id())
            .json(&EventInput::from(event.clone()))
            .send()
            .await
            .map_err(|error| transport_error("analyzer", &error))?;

        let body: AnalyzeResponseBody =
            read_success(response, "analyzer", event.event_id()).await?;
        Ok(body.analysis)
    }
}

#[async_trait]
impl RecordStage for HttpRecordStage {
    async fn record(&self, event: &Event, analysis: &RiskAnalysis) -> AppResult<AuditRecord> {
        let request = AuditRequestBody {
            event_id: event.event_id().as_str(),
            analysis,
            original_event: EventInput::from(event.clone()),
        };

        let response = self
            .http_client
            .post(endpoint(self.base_url.as_str(), "audit"))
            .header(REQUEST_ID_HEADER, request_id())
            .json(&request)
            .send()
            .await
            .map_err(|error| transport_error("auditor", &error))?;

        let body: AuditRecordBody = read_success(response, "auditor", event.event_id()).await?;
        Ok(body.audit_record)
    }

    async fn find_recorded(&self, event_id: &EventId) -> AppResult<Option<AuditRecord>> {
        let response = self
            .http_client
            .get(recorded_event_url(self.base_url.as_str(), event_id)?)
            .header(REQUEST_ID_HEADER, request_id())
            .send()
            .await
            .map_err(|error| transport_error("auditor", &error))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: AuditRecordBody = read_success(response, "auditor", event_id).await?;
        Ok(Some(body.audit_record))
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

fn recorded_event_url(base_url: &str, event_id: &EventId) -> AppResult<url::Url> {
    let mut url = url::Url::parse(base_url).map_err(|error| {
        AppError::Validation(format!("invalid auditor url '{base_url}': {error}"))
    })?;
    url.path_segments_mut()
        .map_err(|()| AppError::Validation(format!("auditor url '{base_url}' cannot be a base")))?
        .pop_if_empty()
        .extend(["audit", "events", event_id.as_str()]);

    Ok(url)
}

fn request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

async fn read_success<T: DeserializeOwned>(
    response: reqwest::Response,
    service: &str,
    event_id: &EventId,
) -> AppResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!("{service} returned an unreadable body: {error}"))
        });
    }

    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    Err(error_for_status(service, status, event_id, &body))
}

fn error_for_status(
    service: &str,
    status: StatusCode,
    event_id: &EventId,
    body: &ErrorBody,
) -> AppError {
    let detail = body.describe();
    match status {
        StatusCode::BAD_REQUEST => {
            AppError::Validation(format!("{service} rejected the event: {detail}"))
        }
        StatusCode::CONFLICT => AppError::DuplicateEvent(event_id.to_string()),
        StatusCode::SERVICE_UNAVAILABLE
            if body.error.as_deref() == Some(CHAIN_INTEGRITY_ERROR) =>
        {
            AppError::ChainIntegrity(detail)
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            AppError::DownstreamUnavailable(format!("{service} returned {status}: {detail}"))
        }
        status if status.is_server_error() => {
            AppError::DownstreamUnavailable(format!("{service} returned {status}: {detail}"))
        }
        status => AppError::Internal(format!("{service} returned {status}: {detail}")),
    }
}

fn transport_error(service: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::DownstreamUnavailable(format!("{service} request timed out: {error}"))
    } else {
        AppError::DownstreamUnavailable(format!("{service} unreachable: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use chainaudit_core::AppError;
    use chainaudit_domain::EventId;
    use reqwest::StatusCode;

    use super::{
        AnalyzeResponseBody, CHAIN_INTEGRITY_ERROR, ErrorBody, endpoint, error_for_status,
        recorded_event_url,
    };

    fn event_id() -> EventId {
        EventId::new("evt-http").unwrap_or_else(|error| panic!("invalid id: {error}"))
    }

    fn body(error: &str, message: &str) -> ErrorBody {
        ErrorBody {
            error: Some(error.to_owned()),
            message: Some(message.to_owned()),
        }
    }

    #[test]
    fn endpoints_join_without_double_slashes() {
        assert_eq!(
            endpoint("http://127.0.0.1:3003/", "audit"),
            "http://127.0.0.1:3003/audit"
        );
        assert_eq!(
            endpoint("http://auditor.internal", "audit/events/evt-1"),
            "http://auditor.internal/audit/events/evt-1"
        );
    }

    #[test]
    fn event_lookup_url_escapes_the_identifier() {
        let event_id = EventId::new("evt 1/2").unwrap_or_else(|error| panic!("{error}"));
        let url = recorded_event_url("http://auditor.internal:3003/", &event_id);

        assert_eq!(
            url.map(|url| url.to_string()),
            Ok("http://auditor.internal:3003/audit/events/evt%201%2F2".to_owned())
        );
    }

    #[test]
    fn analyzer_response_with_inconsistent_level_is_unreadable() {
        let body = serde_json::json!({
            "success": true,
            "analysis": {
                "riskScore": 80,
                "riskLevel": "LOW",
                "riskFactors": [],
                "confidence": 0.9,
                "recommendations": ["Continue standard monitoring"]
            }
        });

        assert!(serde_json::from_value::<AnalyzeResponseBody>(body).is_err());
    }

    #[test]
    fn conflict_maps_to_duplicate_event() {
        let error = error_for_status(
            "auditor",
            StatusCode::CONFLICT,
            &event_id(),
            &ErrorBody::default(),
        );

        assert_eq!(error, AppError::DuplicateEvent("evt-http".to_owned()));
    }

    #[test]
    fn server_errors_are_retryable() {
        let error = error_for_status(
            "analyzer",
            StatusCode::BAD_GATEWAY,
            &event_id(),
            &body("Internal server error", "boom"),
        );

        assert!(error.is_retryable());
        assert!(matches!(error, AppError::DownstreamUnavailable(_)));
    }

    #[test]
    fn halted_auditor_is_an_integrity_failure() {
        let halted = error_for_status(
            "auditor",
            StatusCode::SERVICE_UNAVAILABLE,
            &event_id(),
            &body(CHAIN_INTEGRITY_ERROR, "seq 4 hash mismatch"),
        );
        let overloaded = error_for_status(
            "auditor",
            StatusCode::SERVICE_UNAVAILABLE,
            &event_id(),
            &ErrorBody::default(),
        );

        assert!(matches!(halted, AppError::ChainIntegrity(_)));
        assert!(!halted.is_retryable());
        assert!(matches!(overloaded, AppError::DownstreamUnavailable(_)));
    }

    #[test]
    fn client_errors_are_not_retried() {
        let rejected = error_for_status(
            "analyzer",
            StatusCode::BAD_REQUEST,
            &event_id(),
            &body("Missing required fields", "eventId"),
        );
        let missing_route = error_for_status(
            "analyzer",
            StatusCode::NOT_FOUND,
            &event_id(),
            &ErrorBody::default(),
        );

        assert!(matches!(rejected, AppError::Validation(_)));
        assert!(matches!(missing_route, AppError::Internal(_)));
        assert!(!missing_route.is_retryable());
    }
}

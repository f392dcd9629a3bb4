use axum::Extension;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chainaudit_application::RateLimitRule;

use crate::error::ApiResult;
use crate::state::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

/// Rules checked, in order, for every request of a route group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRules(pub Vec<RateLimitRule>);

/// Counts the request against every rule of its route group.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(rules): Extension<RateLimitRules>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let client = client_key(request.headers());
    enforce_rules(&state, &rules, client.as_str()).await?;

    Ok(next.run(request).await)
}

async fn enforce_rules(state: &AppState, rules: &RateLimitRules, client: &str) -> ApiResult<()> {
    for rule in &rules.0 {
        state
            .rate_limit_service
            .check_rate_limit(rule, client)
            .await?;
    }

    Ok(())
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use chainaudit_application::RateLimitRule;
    use chainaudit_core::AppError;

    use super::{RateLimitRules, client_key, enforce_rules};
    use crate::handlers::test_support::in_memory_state;

    #[test]
    fn first_forwarded_address_identifies_the_client() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );

        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn missing_header_falls_back_to_unknown() {
        assert_eq!(client_key(&HeaderMap::new()), "unknown");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" ,10.0.0.1"));
        assert_eq!(client_key(&headers), "unknown");
    }

    #[tokio::test]
    async fn tightest_rule_of_a_group_wins() {
        let state = in_memory_state();
        let rules = RateLimitRules(vec![RateLimitRule::general(), RateLimitRule::ledger()]);

        for _ in 0..30 {
            assert!(enforce_rules(&state, &rules, "198.51.100.4").await.is_ok());
        }
        let blocked = enforce_rules(&state, &rules, "198.51.100.4").await;
        let other_client = enforce_rules(&state, &rules, "198.51.100.5").await;

        assert!(matches!(
            blocked.map_err(|error| error.0),
            Err(AppError::RateLimited(_))
        ));
        assert!(other_client.is_ok());
    }
}

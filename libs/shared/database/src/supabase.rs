use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::{DatabaseError, UNIQUE_VIOLATION};

/// Thin PostgREST client. Every call is a single HTTP round trip; retries
/// are left to the caller.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        let service_key = Some(config.supabase_service_key.clone()).filter(|key| !key.is_empty());

        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_key,
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token.or(self.service_key.as_deref()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    /// Headers asking PostgREST to echo the written rows back.
    pub fn return_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(classify_error(status, error_text));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

fn classify_error(status: StatusCode, error_text: String) -> DatabaseError {
    let code = serde_json::from_str::<Value>(&error_text)
        .ok()
        .and_then(|body| body["code"].as_str().map(str::to_string));

    // PostgREST also answers 409 for foreign key violations (23503)
    if code.as_deref() == Some(UNIQUE_VIOLATION) {
        warn!("Write rejected by unique constraint ({}): {}", status, error_text);
        return DatabaseError::UniqueViolation(error_text);
    }

    error!("API error ({}): {}", status, error_text);
    match status.as_u16() {
        401 | 403 => DatabaseError::Auth(error_text),
        404 => DatabaseError::NotFound(error_text),
        other => DatabaseError::Api {
            status: other,
            message: error_text,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_conflict_is_a_unique_violation() {
        let body = r#"{"code":"23505","message":"duplicate key value"}"#.to_string();
        assert!(classify_error(StatusCode::CONFLICT, body).is_unique_violation());
    }

    #[test]
    fn other_conflicts_are_not_unique_violations() {
        let body = r#"{"code":"23503","message":"violates foreign key constraint"}"#.to_string();
        match classify_error(StatusCode::CONFLICT, body) {
            DatabaseError::Api { status, .. } => assert_eq!(status, 409),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!classify_error(StatusCode::CONFLICT, "{}".to_string()).is_unique_violation());
    }

    #[test]
    fn sqlstate_23505_is_a_unique_violation_regardless_of_status() {
        let body = r#"{"code":"23505","message":"duplicate key value"}"#.to_string();
        assert!(classify_error(StatusCode::BAD_REQUEST, body).is_unique_violation());
    }

    #[test]
    fn auth_failures_are_classified() {
        assert!(matches!(
            classify_error(StatusCode::FORBIDDEN, "denied".to_string()),
            DatabaseError::Auth(_)
        ));
    }

    #[test]
    fn other_failures_keep_their_status() {
        match classify_error(StatusCode::SERVICE_UNAVAILABLE, "down".to_string()) {
            DatabaseError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

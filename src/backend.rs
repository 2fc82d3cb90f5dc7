//! Client for the MarketBrief backend REST API.
//!
//! Every endpoint answers with an `{ success, data, message }` envelope.
//! Auth failures have side effects on the shared session: 401 ends it,
//! 403 only drops the token.

use crate::error::ApiError;
use crate::models::{AuthResponse, Envelope, HistoryEntry, NewsArticle, StockOverview};
use crate::session::{Session, SessionContext};
use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Most articles sent to the summarizer in one request.
pub const MAX_SUMMARY_ARTICLES: usize = 5;

/// MarketBrief backend client.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_secs: u64, session: SessionContext) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build a request, attaching the bearer token when logged in.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(%status, what, "backend response");

        if !status.is_success() {
            self.check_auth(status)?;
            let body = response.text().await.unwrap_or_default();
            return Err(rejection(status, &body));
        }

        let envelope: Envelope<T> = response.json().await?;
        unwrap_envelope(envelope, what)
    }

    /// Apply the session side effects of an auth failure.
    fn check_auth(&self, status: StatusCode) -> Result<(), ApiError> {
        match status {
            StatusCode::UNAUTHORIZED => {
                error!("Unauthorized - please login again");
                self.session.clear();
                Err(ApiError::AuthExpired)
            }
            StatusCode::FORBIDDEN => {
                warn!("Access forbidden - authentication may have expired");
                self.session.drop_token();
                Err(ApiError::AuthAmbiguous)
            }
            _ => Ok(()),
        }
    }

    /// Log in and start a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }));
        let auth: AuthResponse = self.send(builder, "login").await?;

        self.session.begin(Session {
            token: Some(auth.token.clone()),
            email: auth.email.clone(),
            name: auth.name.clone(),
        });
        Ok(auth)
    }

    /// Create an account, then log in with it.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }));
        let _: AuthResponse = self.send(builder, "register").await?;
        self.login(email, password).await
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn overview(&self, symbol: &str) -> Result<StockOverview, ApiError> {
        let path = format!("/stocks/{}/overview", urlencoding::encode(symbol));
        self.send(self.request(Method::GET, &path), symbol).await
    }

    pub async fn news(&self, symbol: &str) -> Result<Vec<NewsArticle>, ApiError> {
        let path = format!("/news/{}", urlencoding::encode(symbol));
        self.send(self.request(Method::GET, &path), symbol).await
    }

    /// Ask the backend for an AI summary of `articles` (at most five are sent).
    pub async fn summarize(&self, symbol: &str, articles: &[NewsArticle]) -> Result<String, ApiError> {
        let texts = summary_request(articles);
        let path = format!("/news/{}/summarize", urlencoding::encode(symbol));
        self.send(self.request(Method::POST, &path).json(&texts), symbol)
            .await
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        self.send(self.request(Method::GET, "/history"), "history").await
    }

    /// Record a search, optionally attaching the summary generated for it.
    pub async fn add_history(&self, symbol: &str, summary: Option<&str>) -> Result<(), ApiError> {
        let body = match summary {
            Some(summary) => json!({ "aiSummary": summary }),
            None => json!({}),
        };
        let path = format!("/history/{}", urlencoding::encode(symbol));
        let _: Value = self
            .send(self.request(Method::POST, &path).json(&body), symbol)
            .await?;
        Ok(())
    }

    pub async fn delete_history(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/history/{}", id);
        let _: Value = self
            .send(self.request(Method::DELETE, &path), "history entry")
            .await?;
        Ok(())
    }
}

/// Texts sent to the summarizer: `"title. description"` for the first five articles.
pub fn summary_request(articles: &[NewsArticle]) -> Vec<String> {
    articles
        .iter()
        .take(MAX_SUMMARY_ARTICLES)
        .map(NewsArticle::summary_text)
        .collect()
}

/// Turn an envelope into its payload.
pub fn unwrap_envelope<T>(envelope: Envelope<T>, what: &str) -> Result<T, ApiError> {
    if !envelope.success {
        return Err(ApiError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| format!("request for {} was rejected", what)),
        ));
    }
    envelope.data.ok_or_else(|| ApiError::Empty(what.to_string()))
}

/// Error for a non-auth failure status, using the envelope message when present.
fn rejection(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<Envelope<Value>>(body) {
        Ok(Envelope {
            message: Some(message),
            ..
        }) => ApiError::Rejected(message),
        _ => ApiError::Network(format!("backend returned {}", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    fn session() -> Session {
        Session {
            token: Some("abc123".to_string()),
            email: "asha@example.com".to_string(),
            name: None,
        }
    }

    fn client(session: Option<Session>) -> BackendClient {
        BackendClient::new("http://localhost:8080/api/", 5, SessionContext::new(session)).unwrap()
    }

    fn article(n: usize) -> NewsArticle {
        NewsArticle {
            title: format!("Headline {}", n),
            description: Some(format!("Body {}", n)),
            source: "Wire".to_string(),
            url: String::new(),
            published_at: None,
        }
    }

    #[test]
    fn test_url_join() {
        let client = client(None);
        assert_eq!(client.url("/history"), "http://localhost:8080/api/history");
        assert_eq!(client.url("news/TCS"), "http://localhost:8080/api/news/TCS");
    }

    #[test]
    fn test_bearer_attached_when_logged_in() {
        let request = client(Some(session()))
            .request(Method::GET, "/history")
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc123"
        );

        let anonymous = client(None).request(Method::GET, "/history").build().unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_unauthorized_clears_session() {
        let client = client(Some(session()));
        assert_eq!(client.check_auth(StatusCode::UNAUTHORIZED), Err(ApiError::AuthExpired));
        assert!(client.session().snapshot().is_none());
    }

    #[test]
    fn test_forbidden_drops_token_only() {
        let client = client(Some(session()));
        assert_eq!(client.check_auth(StatusCode::FORBIDDEN), Err(ApiError::AuthAmbiguous));
        assert!(!client.session().is_authenticated());
        assert_eq!(client.session().email().as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn test_other_status_leaves_session() {
        let client = client(Some(session()));
        assert_eq!(client.check_auth(StatusCode::INTERNAL_SERVER_ERROR), Ok(()));
        assert!(client.session().is_authenticated());
    }

    #[test]
    fn test_unwrap_envelope() {
        let ok = Envelope {
            success: true,
            data: Some(3),
            message: None,
        };
        assert_eq!(unwrap_envelope(ok, "x"), Ok(3));

        let rejected: Envelope<i32> = Envelope {
            success: false,
            data: None,
            message: Some("Invalid credentials".to_string()),
        };
        assert_eq!(
            unwrap_envelope(rejected, "login"),
            Err(ApiError::Rejected("Invalid credentials".to_string()))
        );

        let empty: Envelope<i32> = Envelope {
            success: true,
            data: None,
            message: None,
        };
        assert_eq!(unwrap_envelope(empty, "TCS"), Err(ApiError::Empty("TCS".to_string())));
    }

    #[test]
    fn test_rejection_uses_envelope_message() {
        let body = r#"{"success":false,"message":"Stock not found","data":null}"#;
        assert_eq!(
            rejection(StatusCode::NOT_FOUND, body),
            ApiError::Rejected("Stock not found".to_string())
        );
        assert!(matches!(
            rejection(StatusCode::BAD_GATEWAY, "<html>"),
            ApiError::Network(_)
        ));
    }

    #[test]
    fn test_summary_request_takes_five() {
        let articles: Vec<NewsArticle> = (1..=8).map(article).collect();
        let texts = summary_request(&articles);
        assert_eq!(texts.len(), MAX_SUMMARY_ARTICLES);
        assert_eq!(texts[0], "Headline 1. Body 1");
        assert_eq!(texts[4], "Headline 5. Body 5");
    }
}

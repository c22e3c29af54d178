use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, REFERER};
use tracing::debug;

use crate::config::{PortalConfig, BASE_HEADERS};
use crate::error::{AppError, Result};

/// A response reduced to what the fetcher inspects.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Stateful HTTP access to the portal. Cookies picked up by one request are
/// sent with the next.
pub trait PortalSession {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// reqwest-backed session with a cookie store and browser-like headers.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    pub fn new(portal: &PortalConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for &(name, value) in BASE_HEADERS {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Config(format!("bad header name {name}: {e}")))?;
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert(
            REFERER,
            HeaderValue::from_str(&portal.home_url)
                .map_err(|e| AppError::Config(format!("home URL is not a valid header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }
}

impl PortalSession for HttpSession {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp.text().await?;
        Ok(RawResponse { status, content_type, body })
    }
}

/// Visit the portal's landing pages so the session holds whatever cookies the
/// API expects. Fire-and-forget: any failure is acceptable and only logged,
/// and the second page is skipped once the first fails.
pub async fn warm_up<S: PortalSession>(session: &S, portal: &PortalConfig, timeout: Duration) {
    for url in [&portal.home_url, &portal.announcements_page_url] {
        if let Err(e) = session.get(url, &[], timeout).await {
            debug!("[WARMUP] {url} failed, continuing without it: {e}");
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub url: String,
        pub query: Vec<(String, String)>,
    }

    impl RecordedCall {
        pub fn param(&self, key: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    type Responder = Box<dyn Fn(&RecordedCall) -> Result<RawResponse> + Send + Sync>;

    /// Records every request and answers from a closure.
    pub struct StubSession {
        calls: Mutex<Vec<RecordedCall>>,
        responder: Responder,
    }

    impl StubSession {
        pub fn new(responder: impl Fn(&RecordedCall) -> Result<RawResponse> + Send + Sync + 'static) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            }
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
            self.calls().into_iter().filter(|c| c.url == url).collect()
        }
    }

    impl PortalSession for StubSession {
        async fn get(
            &self,
            url: &str,
            query: &[(String, String)],
            _timeout: Duration,
        ) -> Result<RawResponse> {
            let call = RecordedCall {
                url: url.to_string(),
                query: query.to_vec(),
            };
            self.calls.lock().unwrap().push(call.clone());
            (self.responder)(&call)
        }
    }

    pub fn json(body: serde_json::Value) -> Result<RawResponse> {
        Ok(RawResponse {
            status: 200,
            content_type: "application/json; charset=utf-8".to_string(),
            body: body.to_string(),
        })
    }

    pub fn html(status: u16) -> Result<RawResponse> {
        Ok(RawResponse {
            status,
            content_type: "text/html".to_string(),
            body: "<html>Access Denied</html>".to_string(),
        })
    }

    /// A portal whose URLs all point at the stub.
    pub fn portal(endpoints: &[&str]) -> PortalConfig {
        PortalConfig {
            home_url: "http://stub/home".to_string(),
            announcements_page_url: "http://stub/ann.html".to_string(),
            endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
            ..PortalConfig::default()
        }
    }
}

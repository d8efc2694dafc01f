//! HTTP strategy: a URL template turned into one outbound request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::context::ToolContext;
use crate::tools::handlers::{Handler, HandlerBuildError, HttpConfig};
use crate::tools::interpolate::{interpolate_encoded, stringify};
use crate::tools::tool::{ToolError, ToolResult, truncate_output};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Method used when the definition names none.
pub const DEFAULT_METHOD: Method = Method::POST;

/// Sends an interpolated request and maps the response to a tool result.
#[derive(Debug)]
pub struct HttpHandler {
    url_template: String,
    method: Method,
    headers: HeaderMap,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpHandler {
    pub fn new(config: &HttpConfig, client: reqwest::Client) -> Result<Self, HandlerBuildError> {
        let method = match config.method.as_deref() {
            None => DEFAULT_METHOD,
            Some(name) => match name.to_ascii_uppercase().as_str() {
                "GET" => Method::GET,
                "POST" => Method::POST,
                "PUT" => Method::PUT,
                "PATCH" => Method::PATCH,
                "DELETE" => Method::DELETE,
                "HEAD" => Method::HEAD,
                other => {
                    return Err(HandlerBuildError::invalid(
                        "http",
                        format!("unsupported method '{}'", other),
                    ));
                }
            },
        };

        let mut headers = HeaderMap::new();
        for (name, value) in config.headers.iter().flatten() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HandlerBuildError::invalid("http", format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                HandlerBuildError::invalid("http", format!("header '{}': {}", name.as_str(), e))
            })?;
            headers.insert(name, value);
        }

        Ok(Self {
            url_template: config.url.clone(),
            method,
            headers,
            timeout: config
                .timeout
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            client,
        })
    }

    fn sends_body(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Validate arguments and assemble the request without sending it.
    fn build_request(&self, args: &serde_json::Value) -> Result<reqwest::RequestBuilder, ToolError> {
        let (url, used) = interpolate_encoded(&self.url_template, args)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::InvalidScheme(url));
        }

        let remaining: serde_json::Map<String, serde_json::Value> = args
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| !used.contains(key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let request = self
            .client
            .request(self.method.clone(), &url)
            .headers(self.headers.clone());

        let request = if self.sends_body() {
            request.json(&serde_json::Value::Object(remaining))
        } else if remaining.is_empty() {
            request
        } else {
            let query: Vec<(String, String)> = remaining
                .iter()
                .filter_map(|(key, value)| stringify(value).map(|v| (key.clone(), v)))
                .collect();
            request.query(&query)
        };
        Ok(request)
    }
}

#[async_trait]
impl Handler for HttpHandler {
    async fn run(
        &self,
        args: &serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let request = self.build_request(args)?;

        let token = ctx
            .cancellation
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let timer = {
            let token = token.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        };

        tracing::debug!(method = %self.method, tool_use_id = %ctx.tool_use_id, "Sending HTTP request");
        let outcome = tokio::select! {
            response = async {
                let response = request.send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            } => Some(response),
            _ = token.cancelled() => None,
        };
        timer.abort();

        match outcome {
            Some(Ok((status, body))) if status.is_success() => {
                Ok(ToolResult::text(truncate_output(&body)))
            }
            Some(Ok((status, body))) => Ok(ToolResult::error(format!(
                "HTTP {}: {}",
                status,
                truncate_output(&body)
            ))),
            Some(Err(e)) => Err(ToolError::Http(e.to_string())),
            None if ctx.cancellation.as_ref().is_some_and(|t| t.is_cancelled()) => {
                Err(ToolError::Cancelled)
            }
            None => Err(ToolError::Timeout(self.timeout)),
        }
    }
}

//! HTTP order backend client

use crate::config::ApiConfig;
use crate::environment::{ApiFuture, OrderApi};
use crate::error::ApiError;
use crate::types::{Order, OrderId, OrderStatus};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;

/// Body of `PUT {base}/orders/{id}/status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate<'a> {
    order_id: &'a OrderId,
    status: OrderStatus,
}

/// [`OrderApi`] over JSON/HTTP
#[derive(Clone, Debug)]
pub struct HttpOrderApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpOrderApi {
    /// Create a client for `base_url` with the default request timeout
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built or
    /// `base_url` is not a valid base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::from_config(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built or
    /// the base URL is not a valid base URL.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let raw = config.base_url.trim_end_matches('/');
        let base_url = Url::parse(raw)
            .map_err(|e| ApiError::Transport(format!("invalid base URL {raw:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Transport(format!("{raw:?} cannot be a base URL")));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Base URL with `segments` appended, each percent-encoded as one path segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and turn transport errors and non-2xx statuses into `ApiError`
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %message, "Order backend returned an error");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl OrderApi for HttpOrderApi {
    fn upload_order<'a>(&'a self, order: &'a Order) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let lines = order.upload_lines();
            tracing::debug!(order_id = %order.id, lines = lines.len(), "Uploading order");
            self.execute(self.client.post(self.url(&["orders"])).json(&lines))
                .await?;
            Ok(())
        })
    }

    fn fetch_orders(&self) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let response = self.execute(self.client.get(self.url(&["orders"]))).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
        })
    }

    fn update_status<'a>(
        &'a self,
        order_id: &'a OrderId,
        status: OrderStatus,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&["orders", order_id.as_str(), "status"]);
            let body = StatusUpdate { order_id, status };
            self.execute(self.client.put(url).json(&body)).await?;
            Ok(())
        })
    }
}

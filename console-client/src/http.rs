//! HTTP 客户端 - 拉取订单与发送命令

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::order::{Actor, DriverRef, Order};
use shared::request::{AssignDriverRequest, CreateOrderRequest, StatusUpdateRequest};
use shared::response::{ApiResponse, CleanupReport};

use crate::config::ConsoleConfig;
use crate::error::{ClientError, ClientResult};

const ACTOR_ROLE_HEADER: &str = "x-actor-role";
const DRIVER_ID_HEADER: &str = "x-driver-id";
const DRIVER_NAME_HEADER: &str = "x-driver-name";

/// 全量订单来源 (pull 路径)
///
/// Returns the full order set, newest first.
#[async_trait]
pub trait OrderSource: Send + Sync + std::fmt::Debug {
    async fn fetch_orders(&self) -> ClientResult<Vec<Order>>;
}

/// 服务端返回的错误响应格式
#[derive(serde::Deserialize)]
struct ApiErrorResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

/// Non-2xx response → error
///
/// A body carrying a stable error code wins; otherwise fall back on the status.
fn error_from_body(status: StatusCode, text: String) -> ClientError {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&text) {
        return ClientError::Api {
            message: api_err.message.unwrap_or_else(|| status.to_string()),
            code: api_err.code,
        };
    }
    match status {
        StatusCode::FORBIDDEN => ClientError::Forbidden(text),
        StatusCode::NOT_FOUND => ClientError::NotFound(text),
        StatusCode::CONFLICT => ClientError::Conflict(text),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation(text),
        _ => ClientError::InvalidResponse(format!("{}: {}", status, text)),
    }
}

/// 网络 HTTP 客户端
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    actor: Actor,
}

impl HttpClient {
    pub fn new(config: &ConsoleConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            actor: config.actor.clone(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_actor(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(ACTOR_ROLE_HEADER, self.actor.role().as_str());
        match &self.actor {
            Actor::Driver(driver) => req
                .header(DRIVER_ID_HEADER, driver.id.as_str())
                .header(DRIVER_NAME_HEADER, driver.name.as_str()),
            _ => req,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status, text));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)?;
        if !envelope.success {
            return Err(ClientError::Api {
                code: envelope.code.unwrap_or_default(),
                message: envelope.message.unwrap_or_default(),
            });
        }
        envelope
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing data".into()))
    }

    /// `GET /api/orders`
    pub async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        let response = self.client.get(self.url("/api/orders")).send().await?;
        self.handle_response(response).await
    }

    /// `GET /api/orders/{id}`
    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        let path = format!("/api/orders/{}", order_id);
        let response = self.client.get(self.url(&path)).send().await?;
        self.handle_response(response).await
    }

    /// `POST /api/orders`
    pub async fn create_order(&self, req: &CreateOrderRequest) -> ClientResult<Order> {
        let response = self.client.post(self.url("/api/orders")).json(req).send().await?;
        self.handle_response(response).await
    }

    /// `PUT /api/orders/{id}/status`
    pub async fn update_status(
        &self,
        order_id: &str,
        req: &StatusUpdateRequest,
    ) -> ClientResult<Order> {
        let path = format!("/api/orders/{}/status", order_id);
        let req = self.with_actor(self.client.put(self.url(&path))).json(req);
        let response = req.send().await?;
        self.handle_response(response).await
    }

    /// `PUT /api/orders/{id}/driver` (`None` unassigns)
    pub async fn assign_driver(
        &self,
        order_id: &str,
        driver: Option<DriverRef>,
    ) -> ClientResult<Order> {
        let path = format!("/api/orders/{}/driver", order_id);
        let body = AssignDriverRequest { driver };
        let req = self.with_actor(self.client.put(self.url(&path))).json(&body);
        let response = req.send().await?;
        self.handle_response(response).await
    }

    /// `POST /api/cleanup`
    ///
    /// The hub answers with a report on success and failure alike.
    pub async fn trigger_cleanup(&self) -> ClientResult<CleanupReport> {
        let response = self.client.post(self.url("/api/cleanup")).send().await?;
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<CleanupReport>(&text) {
            Ok(report) => Ok(report),
            Err(_) if !status.is_success() => Err(error_from_body(status, text)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl OrderSource for HttpClient {
    async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
        self.list_orders().await
    }
}

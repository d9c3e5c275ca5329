use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{Goal, GoalInput, GoalProgress, Income, IncomeInput, RecordId};
use gloo_net::http::{Request, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Everything the store needs from the backend.
#[allow(async_fn_in_trait)]
pub trait IncomeApi {
    async fn list_incomes(&self) -> ApiResult<Vec<Income>>;
    async fn create_income(&self, income: &IncomeInput) -> ApiResult<Income>;
    async fn update_income(&self, id: &RecordId, income: &IncomeInput) -> ApiResult<Income>;
    async fn delete_income(&self, id: &RecordId) -> ApiResult<()>;

    async fn list_goals(&self) -> ApiResult<Vec<Goal>>;
    async fn list_goal_progress(&self) -> ApiResult<Vec<GoalProgress>>;
    async fn create_goal(&self, goal: &GoalInput) -> ApiResult<Goal>;
    async fn update_goal(&self, id: &RecordId, goal: &GoalInput) -> ApiResult<Goal>;
    async fn delete_goal(&self, id: &RecordId) -> ApiResult<()>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpClient {
    config: ApiConfig,
}

impl HttpClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.config.url(path);
        self.execute("GET", path, Request::get(&url), None::<&()>).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.config.url(path);
        self.execute("POST", path, Request::post(&url), Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.config.url(path);
        self.execute("PUT", path, Request::put(&url), Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.config.url(path);
        self.execute::<(), Value>("DELETE", path, Request::delete(&url), None)
            .await
            .map(|_| ())
    }

    /// `GET /`; the server answers with a short status message.
    pub async fn health(&self) -> ApiResult<String> {
        let body: Value = self.get("/").await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn execute<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        builder: RequestBuilder,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let result = send(builder, body).await;
        if let Err(error) = &result {
            tracing::error!(method, path, error = %error, "API Error");
        }
        result
    }
}

async fn send<B: Serialize, T: DeserializeOwned>(
    builder: RequestBuilder,
    body: Option<&B>,
) -> ApiResult<T> {
    let builder = builder
        .header("Content-Type", "application/json")
        .header("Accept", "application/json");
    let resp = match body {
        Some(body) => builder
            .json(body)
            .map_err(|e| ApiError::Encode(e.to_string()))?
            .send()
            .await?,
        None => builder.send().await?,
    };

    let text = resp.text().await?;
    if !resp.ok() {
        return Err(ApiError::Status {
            status: resp.status(),
            body: text,
        });
    }
    decode_body(&text)
}

/// An empty body (e.g. from DELETE) decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(text: &str) -> ApiResult<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    Ok(serde_json::from_str(text)?)
}

fn income_path(id: &RecordId) -> String {
    format!("/api/incomes/{id}")
}

fn goal_path(id: &RecordId) -> String {
    format!("/api/goals/{id}")
}

impl IncomeApi for HttpClient {
    async fn list_incomes(&self) -> ApiResult<Vec<Income>> {
        self.get("/api/incomes").await
    }

    async fn create_income(&self, income: &IncomeInput) -> ApiResult<Income> {
        self.post("/api/incomes", income).await
    }

    async fn update_income(&self, id: &RecordId, income: &IncomeInput) -> ApiResult<Income> {
        self.put(&income_path(id), income).await
    }

    async fn delete_income(&self, id: &RecordId) -> ApiResult<()> {
        self.delete(&income_path(id)).await
    }

    async fn list_goals(&self) -> ApiResult<Vec<Goal>> {
        self.get("/api/goals").await
    }

    async fn list_goal_progress(&self) -> ApiResult<Vec<GoalProgress>> {
        self.get("/api/goals/progress").await
    }

    async fn create_goal(&self, goal: &GoalInput) -> ApiResult<Goal> {
        self.post("/api/goals", goal).await
    }

    async fn update_goal(&self, id: &RecordId, goal: &GoalInput) -> ApiResult<Goal> {
        self.put(&goal_path(id), goal).await
    }

    async fn delete_goal(&self, id: &RecordId) -> ApiResult<()> {
        self.delete(&goal_path(id)).await
    }
}

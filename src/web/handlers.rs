//! Request handlers for the web application.

use crate::assistant::{Assistant, is_sql_valid};
use crate::error::{AssistantError, AssistantResult};
use crate::models::{QueryResult, TrainRequest, TrainingEntry};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::response::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

type AppState = State<Arc<Assistant>>;

const INDEX_HTML: &str = include_str!("index.html");

/// Questions offered by `generate_questions`.
const SUGGESTED_QUESTIONS: usize = 5;

/// JSON body whose rejections use the API error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AssistantError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AssistantError::invalid_input(rejection.body_text())),
        }
    }
}

/// Query string whose rejections use the API error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AssistantError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(AssistantError::invalid_input(rejection.body_text())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct RunSqlRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub id: String,
}

/// Tagged response bodies, mirrored by the page's script.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiResponse {
    Sql { text: String, is_valid: bool },
    Rows { columns: Vec<String>, rows: Vec<Vec<JsonValue>> },
    TrainingData { entries: Vec<TrainingEntry> },
    QuestionList { questions: Vec<String> },
}

impl From<QueryResult> for ApiResponse {
    fn from(result: QueryResult) -> Self {
        Self::Rows {
            columns: result.columns,
            rows: result.rows,
        }
    }
}

/// `id` is the first stored entry; `ids` lists every entry the request produced.
#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub id: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(assistant): AppState) -> Json<JsonValue> {
    Json(serde_json::json!({
        "status": "ok",
        "model": assistant.config().model,
        "connected": assistant.connection().is_some(),
    }))
}

pub async fn generate_sql(
    State(assistant): AppState,
    ApiQuery(params): ApiQuery<QuestionParams>,
) -> AssistantResult<Json<ApiResponse>> {
    if params.question.trim().is_empty() {
        return Err(AssistantError::invalid_input("No question provided"));
    }
    let text = assistant.generate_sql(&params.question).await?;
    let is_valid = is_sql_valid(&text);
    Ok(Json(ApiResponse::Sql { text, is_valid }))
}

pub async fn run_sql(
    State(assistant): AppState,
    ApiJson(request): ApiJson<RunSqlRequest>,
) -> AssistantResult<Json<ApiResponse>> {
    if request.sql.trim().is_empty() {
        return Err(AssistantError::invalid_input("No SQL provided"));
    }
    let result = assistant.run_sql(&request.sql).await?;
    info!(rows = result.row_count(), "Ran SQL from web request");
    Ok(Json(result.into()))
}

pub async fn get_training_data(State(assistant): AppState) -> AssistantResult<Json<ApiResponse>> {
    let entries = assistant.training_data().await?;
    Ok(Json(ApiResponse::TrainingData { entries }))
}

pub async fn train(
    State(assistant): AppState,
    ApiJson(request): ApiJson<TrainRequest>,
) -> AssistantResult<Json<TrainResponse>> {
    let records = request
        .into_records()
        .map_err(AssistantError::invalid_input)?;

    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        ids.push(assistant.train(record).await?);
    }
    info!(count = ids.len(), "Trained from web request");
    let id = ids.first().cloned().unwrap_or_default();
    Ok(Json(TrainResponse { id, ids }))
}

pub async fn remove_training_data(
    State(assistant): AppState,
    ApiJson(request): ApiJson<RemoveRequest>,
) -> AssistantResult<Json<RemoveResponse>> {
    let success = assistant.remove_training_data(&request.id).await?;
    Ok(Json(RemoveResponse { success }))
}

pub async fn generate_questions(State(assistant): AppState) -> AssistantResult<Json<ApiResponse>> {
    let questions = assistant.suggested_questions(SUGGESTED_QUESTIONS).await?;
    Ok(Json(ApiResponse::QuestionList { questions }))
}

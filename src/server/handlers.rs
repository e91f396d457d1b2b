//! Request handlers.

use crate::server::error::ApiError;
use crate::server::{AppState, RouteName};
use crate::types::{SchemaDescription, Text2SqlError};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Error message for `/text-to-sql/complex` without a schema or question.
pub const SCHEMA_AND_QUERY_REQUIRED: &str = "Schema and query cannot be empty";

/// Body of `/text-to-sql/simple`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimpleRequest {
    pub query: String,
}

/// Body of `/text-to-sql/complex` and `/text-to-sql/gpt`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SchemaRequest {
    pub query: String,
    /// Raw schema; parsed leniently
    pub schema: Option<Value>,
}

/// Body of `/convert`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConvertRequest {
    pub text: String,
}

/// Response of the `/text-to-sql/*` routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SqlResponse {
    pub sql_query: String,
}

/// Response of `/convert`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub sql_query: String,
    pub confidence: Option<f32>,
    /// Seconds spent generating
    pub execution_time: f64,
}

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// POST /text-to-sql/simple
pub async fn simple(
    State(state): State<AppState>,
    body: JsonBody<SimpleRequest>,
) -> Result<Json<SqlResponse>, ApiError> {
    let Json(req) = body?;
    info!(route = "simple", query = %req.query, "text-to-sql request");

    let generated = state.generate(RouteName::Simple, &req.query, None).await?;
    Ok(Json(SqlResponse {
        sql_query: generated.sql,
    }))
}

/// POST /text-to-sql/complex
pub async fn complex(
    State(state): State<AppState>,
    body: JsonBody<SchemaRequest>,
) -> Result<Json<SqlResponse>, ApiError> {
    let Json(req) = body?;
    info!(route = "complex", query = %req.query, "text-to-sql request");

    let schema = req
        .schema
        .as_ref()
        .filter(|v| !v.is_null())
        .map(SchemaDescription::from_value);
    if req.query.trim().is_empty() || schema.is_none() {
        return Err(Text2SqlError::invalid_input(SCHEMA_AND_QUERY_REQUIRED).into());
    }

    let generated = state
        .generate(RouteName::Complex, &req.query, schema.as_ref())
        .await?;
    Ok(Json(SqlResponse {
        sql_query: generated.sql,
    }))
}

/// POST /text-to-sql/gpt
pub async fn gpt(
    State(state): State<AppState>,
    body: JsonBody<SchemaRequest>,
) -> Result<Json<SqlResponse>, ApiError> {
    chat_route(state, RouteName::Gpt, body).await
}

/// POST /text-to-sql/groq
pub async fn groq(
    State(state): State<AppState>,
    body: JsonBody<SchemaRequest>,
) -> Result<Json<SqlResponse>, ApiError> {
    chat_route(state, RouteName::Groq, body).await
}

/// Chat-backed routes: schema optional.
async fn chat_route(
    state: AppState,
    route: RouteName,
    body: JsonBody<SchemaRequest>,
) -> Result<Json<SqlResponse>, ApiError> {
    let Json(req) = body?;
    info!(route = route.as_str(), query = %req.query, "text-to-sql request");

    let schema = req.schema.as_ref().map(SchemaDescription::from_value);
    let generated = state.generate(route, &req.query, schema.as_ref()).await?;
    Ok(Json(SqlResponse {
        sql_query: generated.sql,
    }))
}

/// POST /convert
pub async fn convert(
    State(state): State<AppState>,
    body: JsonBody<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(req) = body?;
    info!(route = "convert", text = %req.text, "convert request");

    let generated = state.generate(RouteName::Convert, &req.text, None).await?;
    Ok(Json(ConvertResponse {
        sql_query: generated.sql,
        confidence: generated.confidence,
        execution_time: generated.elapsed.as_secs_f64(),
    }))
}

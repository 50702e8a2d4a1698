//! Function-calling endpoints
//!
//! Lists call specs for the model and invokes operations by name. The
//! invocation endpoint answers 200 with the envelope wire shape; a failed
//! operation is an `{"error": ...}` body, not an HTTP error. When an API key
//! is configured every route here requires it as a Bearer token.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiState;
use super::auth::require_api_key;
use crate::plugins::Context;

/// Conversation the invocation came from
#[derive(Debug, Default, Deserialize)]
pub struct ContextQuery {
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
    pub thread_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl From<ContextQuery> for Context {
    fn from(query: ContextQuery) -> Self {
        Self {
            chat_id: query.chat_id,
            message_id: query.message_id,
            thread_id: query.thread_id,
            user_id: query.user_id,
            ..Self::new()
        }
    }
}

/// Owning plugin of an operation
#[derive(Serialize)]
pub struct SourceResponse {
    pub name: String,
    pub source: String,
}

/// Build function routes
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(list_functions))
        .route("/{name}", post(invoke))
        .route("/{name}/source", get(source))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Every call spec as a JSON schema, in registration order
async fn list_functions(State(state): State<ApiState>) -> Json<Vec<Value>> {
    Json(
        state
            .plugins
            .specs()
            .into_iter()
            .map(|spec| spec.to_schema())
            .collect(),
    )
}

/// Invoke one operation with a JSON arguments body
async fn invoke(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<ContextQuery>,
    body: Bytes,
) -> Json<Value> {
    let arguments = String::from_utf8_lossy(&body);
    let envelope = state
        .plugins
        .call(&name, Context::from(query), &arguments)
        .await;
    Json(envelope.to_json())
}

/// Source name of the plugin owning an operation
async fn source(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<SourceResponse>, StatusCode> {
    let source = state
        .plugins
        .source_name(&name)
        .ok_or(StatusCode::NOT_FOUND)?
        .to_string();
    Ok(Json(SourceResponse { name, source }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_query_fills_context() {
        let ctx = Context::from(ContextQuery {
            chat_id: Some(-100),
            message_id: Some(3),
            thread_id: None,
            user_id: Some(9),
        });
        assert_eq!(ctx.chat_id, Some(-100));
        assert_eq!(ctx.message_id, Some(3));
        assert_eq!(ctx.thread_id, None);
        assert_eq!(ctx.user_id, Some(9));
    }
}

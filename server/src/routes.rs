//! Route table and handlers.
//!
//! Mutating handlers run a fixed pipeline: mutate the store under its write
//! lock, release the lock, await the mirror, then respond. The response is
//! built from the store's copy of the todo; a mirror failure can only show
//! up as `storedInBlob: false`.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use todo_core::types::timestamp;
use todo_core::{CreateTodo, DeletedTodo, Todo, TodoList, UpdateTodo};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub const APP_NAME: &str = "Todo API";

const LANDING_TEMPLATE: &str = include_str!("landing.html");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: String,
    pub app: String,
    pub version: String,
    pub connections: Connections,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connections {
    pub storage: bool,
    pub key_vault: bool,
    /// Per-secret load flags; present only when a secrets store is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<BTreeMap<String, bool>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(state)
}

/// Ids that are not numbers can never match a todo.
fn parse_id(raw: &str) -> Result<u64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// Read a request body as `T`. A body that is empty or not declared as JSON
/// reads as `{}`; only a malformed JSON body is an error.
fn read_json<T>(headers: &HeaderMap, body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.is_empty() || !has_json_content_type(headers) {
        return Ok(T::default());
    }
    let Json(value) = Json::<T>::from_bytes(body)?;
    Ok(value)
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let secrets: Option<BTreeMap<String, bool>> = state.secrets().map(|loaded| {
        loaded
            .iter()
            .map(|(name, ok)| (name.to_string(), ok))
            .collect()
    });
    Json(Health {
        status: "healthy".to_string(),
        timestamp: timestamp::format(&Utc::now()),
        app: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: Connections {
            storage: state.mirror().is_configured(),
            key_vault: state.secrets().is_some(),
            secrets,
        },
    })
}

async fn list_todos(State(state): State<AppState>) -> Json<TodoList> {
    let store = state.store().read().await;
    Json(TodoList {
        count: store.len(),
        items: store.list().to_vec(),
    })
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let id = parse_id(&id)?;
    let store = state.store().read().await;
    Ok(Json(store.get(id)?.clone()))
}

async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let input: CreateTodo = read_json(&headers, &body)?;
    let todo = state.store().write().await.create(input, Utc::now())?;
    info!(id = todo.id, "Todo created");

    let todo = state.mirror_write(todo).await;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Todo>, AppError> {
    let id = parse_id(&id)?;
    let todo = {
        let mut store = state.store().write().await;
        // An unknown id wins over an unreadable body.
        store.get(id)?;
        let input: UpdateTodo = read_json(&headers, &body)?;
        store.update(id, input, Utc::now())?
    };
    info!(id, "Todo updated");

    let todo = state.mirror_write(todo).await;
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedTodo>, AppError> {
    let id = parse_id(&id)?;
    let todo = state.store().write().await.delete(id)?;
    info!(id, "Todo deleted");

    state.mirror().remove_todo(id).await;
    Ok(Json(DeletedTodo {
        message: "Todo deleted".to_string(),
        todo,
    }))
}

async fn landing(headers: HeaderMap) -> Html<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .filter(|proto| *proto == "http" || *proto == "https")
        .unwrap_or("http");
    let base_url = escape_html(&format!("{scheme}://{host}"));
    Html(LANDING_TEMPLATE.replace("{{base_url}}", &base_url))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

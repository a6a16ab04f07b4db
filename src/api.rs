//! HTTP surface - login, preset, and chat routes
//!
//! Error mapping follows the error taxonomy: missing fields are 400,
//! an unprovisioned school is 404, and anything unexpected is logged and
//! reported as a uniform 500 without leaking internals.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::error::Error;
use crate::session::SessionRegistry;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/assistant/preset", post(preset))
        .route("/assistant/chat", post(chat))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        let body = Json(serde_json::json!({ "error": msg }));
        (code, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::MissingField(_) => {
                ApiError::BadRequest("E-posta ve okul adı gereklidir".to_string())
            }
            Error::SchoolNotRegistered(_) => {
                ApiError::NotFound("Bu okul sisteme kayıtlı değil.".to_string())
            }
            Error::SessionNotFound(_) => ApiError::NotFound("Oturum bulunamadı.".to_string()),
            other => {
                error!(error = %other, "request failed");
                ApiError::Internal("Sunucu hatası oluştu".to_string())
            }
        }
    }
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    school_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    message: String,
    rag_collection_id: String,
    session_token: String,
    user: LoginUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    email: String,
    school_name: String,
    session_id: String,
}

async fn login(
    State(st): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = st
        .registry
        .create_session(&request.email, &request.school_name)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Giriş başarılı".to_string(),
        rag_collection_id: format!("rag_collection_{}", session.school.code),
        session_token: session.token.clone(),
        user: LoginUser {
            email: session.email.clone(),
            school_name: session.school_name.clone(),
            session_id: session.id.clone(),
        },
    }))
}

#[derive(Debug, Deserialize)]
struct PresetRequest {
    email: String,
    school: String,
}

#[derive(Debug, Serialize)]
struct PresetResponse {
    answer: String,
}

async fn preset(
    State(st): State<AppState>,
    Json(request): Json<PresetRequest>,
) -> Json<PresetResponse> {
    st.registry.set_preset(&request.email, &request.school).await;
    Json(PresetResponse {
        answer: format!(
            "Preset query received from {} for school {}.",
            request.email, request.school
        ),
    })
}

/// Chat is addressed either by session id (login flow) or, without one,
/// by email (preset flow).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    query: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
}

async fn chat(
    State(st): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let answer = match (&request.session_id, &request.email) {
        (Some(session_id), _) => st.registry.chat(session_id, &request.query).await?,
        (None, Some(email)) => st.registry.preset_chat(email, &request.query).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Oturum kimliği veya e-posta gereklidir".to_string(),
            ))
        }
    };
    Ok(Json(ChatResponse { answer }))
}

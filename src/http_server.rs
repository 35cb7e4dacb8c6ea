use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use crate::controller::QaController;
use crate::models::{GenerationConfig, Notice, QaEntry, UploadedFile};
use crate::session::SessionState;
use crate::AppState;

pub const SESSION_COOKIE: &str = "docqa_session";
const UPLOAD_FIELD: &str = "file";
/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AskForm {
    pub question: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for AskForm {
    fn default() -> Self {
        let defaults = GenerationConfig::default();
        Self {
            question: String::new(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            top_p: defaults.top_p,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SessionSnapshot {
    pub history: Vec<QaEntry>,
    pub favorites: Vec<QaEntry>,
}

#[derive(Debug, Clone, Copy)]
enum EntryList {
    History,
    Favorites,
}

impl EntryList {
    fn entries(self, session: &SessionState) -> &[QaEntry] {
        match self {
            EntryList::History => &session.history,
            EntryList::Favorites => &session.favorites,
        }
    }
}

/// Routes for the page and the JSON API
pub fn build_router(state: AppState) -> Router {
    // The JSON API is readable from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/session", get(session_snapshot))
        .layer(cors);

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .route("/favorites", post(add_favorite))
        .route("/history/:index/delete", post(delete_history))
        .route("/favorites/:index/delete", post(delete_favorite))
        .route("/history/:index/export", get(export_history))
        .route("/favorites/:index/export", get(export_favorite))
        .merge(api)
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .with_state(state)
}

/// Start the HTTP server and serve until it fails
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    log::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .build()
}

fn existing_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Run `f` against the caller's session.
///
/// Unknown or missing cookie ids get a fresh server-issued session and a
/// replacement cookie.
fn open_session<R>(
    state: &AppState,
    jar: CookieJar,
    f: impl FnOnce(&mut SessionState) -> R,
) -> (CookieJar, String, R) {
    let requested = existing_session_id(&jar);
    let (id, result) = state.sessions.open(requested.as_deref(), f);

    let jar = if requested.as_deref() == Some(id.as_str()) {
        jar
    } else {
        jar.add(session_cookie(id.clone()))
    };
    (jar, id, result)
}

async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, _, rendered) = open_session(&state, jar, |session| {
        let notices = session.take_notices();
        state.renderer.render_session(session, notices)
    });

    match rendered {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn upload(State(state): State<AppState>, jar: CookieJar, mut multipart: Multipart) -> impl IntoResponse {
    let received = match read_upload(&mut multipart).await {
        Ok(Some(file)) => {
            // extraction runs off the async workers and without the session lock
            let controller = state.controller.clone();
            tokio::task::spawn_blocking(move || controller.load(file))
                .await
                .map(Some)
                .map_err(|e| format!("Failed to read upload: {}", e))
        }
        Ok(None) => Ok(None),
        Err(message) => Err(message),
    };

    let (jar, _, ()) = open_session(&state, jar, |session| match received {
        Ok(Some((document, notices))) => QaController::apply_upload(session, document, notices),
        Ok(None) => session.notify(Notice::error("Choose a file to upload")),
        Err(message) => {
            log::warn!("{}", message);
            session.notify(Notice::error(message));
        }
    });

    (jar, Redirect::to("/"))
}

/// Pull the `file` field out of the form; `None` when no file was chosen
async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadedFile>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read upload: {}", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Ok(None);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {}", e))?;
        log::info!("Received upload {:?} ({} bytes)", name, bytes.len());

        return Ok(Some(UploadedFile::new(name, bytes.to_vec())));
    }

    Ok(None)
}

async fn ask(State(state): State<AppState>, jar: CookieJar, Form(form): Form<AskForm>) -> impl IntoResponse {
    let config = GenerationConfig::clamped(form.temperature, form.max_tokens, form.top_p);

    let (jar, id, pending) = open_session(&state, jar, |session| {
        QaController::begin_ask(session, &form.question, config)
    });

    if let Some(pending) = pending {
        let outcome = state
            .controller
            .answer_question(&pending.text, &form.question, &config)
            .await;
        let applied = state
            .sessions
            .update(&id, |session| QaController::apply_answer(session, &pending, outcome));
        if applied.is_none() {
            log::warn!("Session {} expired before its answer arrived", id);
        }
    }

    (jar, Redirect::to("/"))
}

async fn add_favorite(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (jar, _, ()) = open_session(&state, jar, QaController::add_latest_to_favorites);
    (jar, Redirect::to("/"))
}

async fn delete_history(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let (jar, _, ()) = open_session(&state, jar, |session| QaController::delete_history(session, index));
    (jar, Redirect::to("/"))
}

async fn delete_favorite(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let (jar, _, ()) = open_session(&state, jar, |session| QaController::delete_favorite(session, index));
    (jar, Redirect::to("/"))
}

async fn export_history(State(state): State<AppState>, jar: CookieJar, Path(index): Path<usize>) -> Response {
    export_entry(&state, &jar, EntryList::History, index)
}

async fn export_favorite(State(state): State<AppState>, jar: CookieJar, Path(index): Path<usize>) -> Response {
    export_entry(&state, &jar, EntryList::Favorites, index)
}

fn export_entry(state: &AppState, jar: &CookieJar, list: EntryList, index: usize) -> Response {
    let entry = existing_session_id(jar).and_then(|id| {
        state
            .sessions
            .read(&id, |session| list.entries(session).get(index).cloned())
            .flatten()
    });

    let Some(entry) = entry else {
        return (StatusCode::NOT_FOUND, "No such entry").into_response();
    };

    match state.controller.export_entry(&entry) {
        Ok(file) => (
            [
                (header::CONTENT_TYPE, file.format.mime_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Err(e) => {
            log::error!("Export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred while exporting the results: {}", e),
            )
                .into_response()
        }
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// History and favorites of the caller's session, empty for unknown sessions
async fn session_snapshot(State(state): State<AppState>, jar: CookieJar) -> Json<SessionSnapshot> {
    let snapshot = existing_session_id(&jar)
        .and_then(|id| {
            state.sessions.read(&id, |session| SessionSnapshot {
                history: session.history.clone(),
                favorites: session.favorites.clone(),
            })
        })
        .unwrap_or_default();

    Json(snapshot)
}

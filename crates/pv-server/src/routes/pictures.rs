//! Picture upload, retrieval, listing, and deletion handlers.

use axum::extract::{Extension, Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use pv_core::{PictureRef, PictureSummary, SessionId, StoreMode};
use pv_store::PutRequest;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Header carrying the caller's session token in both directions.
pub static X_SESSION_ID: HeaderName = HeaderName::from_static("x-session-id");

/// Multipart field holding the uploaded picture.
const PICTURE_FIELD: &str = "picture";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message: &'static str,
}

/// POST /api/upload
pub async fn upload(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    tagged(store_upload(ctx, headers, multipart).await, request_id)
}

async fn store_upload(
    ctx: AppContext,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let session = caller_session(&ctx, &headers)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| pv_core::Error::invalid(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some(PICTURE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| pv_core::Error::invalid(format!("failed to read upload: {e}")))?;
        upload = Some(PutRequest::new(filename, bytes.to_vec()));
        break;
    }

    let mut request = upload.ok_or_else(|| {
        pv_core::Error::invalid(format!("multipart field '{PICTURE_FIELD}' is missing"))
    })?;
    if let Some(session) = session.clone() {
        request = request.with_session(session);
    }

    let store = ctx.store.clone();
    let picture = run_blocking(move || store.put(request)).await?;

    let body = UploadResponse {
        id: picture.id.get(),
        filename: picture.filename,
        session_id: picture.session_id.map(|s| s.to_string()),
        message: "File uploaded successfully",
    };
    Ok(with_session_header(Json(body), session.as_ref()))
}

/// GET /api/pictures
pub async fn get_latest(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Response, AppError> {
    tagged(serve_picture(ctx, PictureRef::Latest).await, request_id)
}

/// GET /api/pictures/{id}
pub async fn get_picture(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let result = match id.parse::<PictureRef>() {
        Ok(target) => serve_picture(ctx, target).await,
        Err(e) => Err(e.into()),
    };
    tagged(result, request_id)
}

async fn serve_picture(ctx: AppContext, target: PictureRef) -> Result<Response, AppError> {
    let store = ctx.store.clone();
    let stored = run_blocking(move || store.get(target)).await?;
    let content_type = stored.content_type();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        stored.bytes,
    )
        .into_response())
}

/// DELETE /api/pictures
pub async fn delete_latest(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, AppError> {
    tagged(remove_picture(ctx, PictureRef::Latest).await, request_id)
}

/// DELETE /api/pictures/{id}
pub async fn delete_picture(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = match id.parse::<PictureRef>() {
        Ok(target) => remove_picture(ctx, target).await,
        Err(e) => Err(e.into()),
    };
    tagged(result, request_id)
}

async fn remove_picture(
    ctx: AppContext,
    target: PictureRef,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = ctx.store.clone();
    run_blocking(move || store.delete(target)).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// GET /api/gallery
pub async fn list_gallery(
    State(ctx): State<AppContext>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    tagged(gallery(ctx, headers).await, request_id)
}

async fn gallery(ctx: AppContext, headers: HeaderMap) -> Result<Response, AppError> {
    let session = caller_session(&ctx, &headers)?;

    let store = ctx.store.clone();
    let scope = session.clone();
    let pictures: Vec<PictureSummary> =
        run_blocking(move || store.list(scope.as_ref())).await?;

    Ok(with_session_header(Json(pictures), session.as_ref()))
}

/// Resolve the caller's session. Outside session mode the header is
/// ignored; in session mode a missing header gets a freshly issued token.
fn caller_session(ctx: &AppContext, headers: &HeaderMap) -> Result<Option<SessionId>, AppError> {
    if ctx.store.mode() != StoreMode::Session {
        return Ok(None);
    }

    let presented = headers
        .get(&X_SESSION_ID)
        .map(|v| {
            v.to_str()
                .map_err(|_| pv_core::Error::invalid("x-session-id is not valid ASCII"))
        })
        .transpose()?;

    let (session, issued) = ctx.sessions.resolve(presented)?;
    if issued {
        tracing::debug!(session = %session, "Issued new session");
    }
    Ok(Some(session))
}

fn with_session_header(body: impl IntoResponse, session: Option<&SessionId>) -> Response {
    let mut response = body.into_response();
    if let Some(val) = session.and_then(|s| HeaderValue::from_str(s.as_str()).ok()) {
        response.headers_mut().insert(X_SESSION_ID.clone(), val);
    }
    response
}

/// Attach the request's id to a failed response body.
fn tagged<T>(result: Result<T, AppError>, request_id: RequestId) -> Result<T, AppError> {
    result.map_err(|e| e.with_request_id(request_id.0))
}

/// Run a blocking store call off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> pv_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| pv_core::Error::Internal(format!("spawn_blocking join error: {e}")))?;
    Ok(result?)
}

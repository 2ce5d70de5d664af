use crate::error::Result;
use crate::model::{CreateUrlRequest, CreateUrlResponse, GetUrlResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, info};

pub async fn create_url_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<CreateUrlResponse>)> {
    let long_url = request.long_url.trim();

    // Empty input is rejected by the shortener itself; nothing to probe.
    if let Some(probe) = state.probe.as_ref().filter(|_| !long_url.is_empty()) {
        probe.check(long_url).await.inspect_err(|e| {
            debug!(long_url, error = %e, "Reachability check failed");
        })?;
    }

    let short_url = state.shortener.convert(long_url).await?;
    info!(long_url, short_url = %short_url, "Shortened url");

    Ok((StatusCode::CREATED, Json(CreateUrlResponse { short_url })))
}

/// Resolves a full short URL (or a bare code) given as the trailing path.
pub async fn get_url_handler(
    State(state): State<AppState>,
    Path(short_url): Path<String>,
) -> Result<Json<GetUrlResponse>> {
    let code = short_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let long_url = state.redirector.redirect(code).await?;
    Ok(Json(GetUrlResponse { long_url }))
}

pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_code): Path<String>,
) -> Result<Response> {
    let long_url = state.redirector.redirect(&short_code).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, long_url)]).into_response())
}

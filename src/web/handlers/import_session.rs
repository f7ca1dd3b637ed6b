//! Import session HTTP handlers
//!
//! Thin wrappers around [`SessionService`](crate::session::SessionService):
//! request DTOs are converted at the boundary and every result goes through
//! the standard response envelope.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppResult, ReadError};
use crate::ingestor::PlaylistSource;
use crate::models::{FilterCriteria, TypeFilter};
use crate::web::{responses::handle_result, AppState};

#[derive(Debug, Clone, Deserialize)]
pub struct LoadUrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

/// Filter as sent by clients; `"all"` or an empty group means every group
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    #[serde(rename = "type")]
    pub content_type: TypeFilter,
    pub group: Option<String>,
    pub search: String,
}

impl From<FilterRequest> for FilterCriteria {
    fn from(request: FilterRequest) -> Self {
        let group = request
            .group
            .filter(|group| !group.is_empty() && !group.eq_ignore_ascii_case("all"));

        Self {
            content_type: request.content_type,
            group,
            search: request.search.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub index: usize,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    /// Records in the current view whose selection was set
    pub affected: usize,
    pub selected: usize,
}

pub async fn get_session(State(state): State<AppState>) -> Response {
    handle_result(Ok(state.service.snapshot().await))
}

pub async fn load_from_url(
    State(state): State<AppState>,
    Json(request): Json<LoadUrlRequest>,
) -> Response {
    handle_result(state.service.load(PlaylistSource::Url(request.url)).await)
}

pub async fn load_from_file(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let name = params.name.unwrap_or_else(|| "upload.m3u".to_string());
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let error = ReadError::Upload {
                name,
                status: rejection.status().as_u16(),
                message: rejection.body_text(),
            };
            return handle_result::<()>(Err(error.into()));
        }
    };

    let source = PlaylistSource::Upload {
        name,
        bytes: body.to_vec(),
    };
    handle_result(state.service.load(source).await)
}

pub async fn list_channels(State(state): State<AppState>) -> Response {
    let view = state
        .service
        .with_session(|session| session.staged().map(|staged| staged.view()))
        .await;
    handle_result(view.map_err(Into::into))
}

pub async fn list_groups(State(state): State<AppState>) -> Response {
    let groups = state
        .service
        .with_session(|session| session.staged().map(|staged| staged.groups()))
        .await;
    handle_result(groups.map_err(Into::into))
}

pub async fn set_filter(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Response {
    let criteria = FilterCriteria::from(request);
    let result = state
        .service
        .with_session(|session| -> AppResult<_> {
            session.set_filter(criteria.clone())?;
            Ok(criteria)
        })
        .await;
    handle_result(result)
}

pub async fn toggle_selection(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Response {
    let result = state
        .service
        .with_session(|session| session.toggle(index))
        .await
        .map(|selected| ToggleResponse { index, selected });
    handle_result(result.map_err(Into::into))
}

pub async fn select_all(State(state): State<AppState>) -> Response {
    let result = state
        .service
        .with_session(|session| -> AppResult<_> {
            let affected = session.select_all()?;
            Ok(SelectionResponse {
                affected,
                selected: session.snapshot().selected,
            })
        })
        .await;
    handle_result(result)
}

pub async fn deselect_all(State(state): State<AppState>) -> Response {
    let result = state
        .service
        .with_session(|session| -> AppResult<_> {
            let affected = session.deselect_all()?;
            Ok(SelectionResponse {
                affected,
                selected: session.snapshot().selected,
            })
        })
        .await;
    handle_result(result)
}

pub async fn commit_import(State(state): State<AppState>) -> Response {
    handle_result(state.service.commit().await)
}

pub async fn abandon_session(State(state): State<AppState>) -> Response {
    let result = state
        .service
        .with_session(|session| -> AppResult<_> {
            session.abandon()?;
            Ok(session.snapshot())
        })
        .await;
    handle_result(result)
}

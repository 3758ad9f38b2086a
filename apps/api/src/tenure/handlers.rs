use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::tenure::calculator::{compute_tenure, compute_tenure_now, TenureReport};
use crate::tenure::dates::parse_date;

#[derive(Debug, Deserialize)]
pub struct TenureQuery {
    /// Evaluate as of this date instead of today (any accepted date format).
    pub as_of: Option<String>,
}

/// GET /api/v1/cv/:cv_id/tenure
pub async fn handle_get_tenure(
    State(state): State<AppState>,
    Path(cv_id): Path<Uuid>,
    Query(query): Query<TenureQuery>,
) -> Result<Json<TenureReport>, AppError> {
    let as_of = query
        .as_of
        .as_deref()
        .map(|raw| {
            parse_date(raw).ok_or_else(|| AppError::Validation(format!("Unrecognized date '{raw}'")))
        })
        .transpose()?;

    let entries = {
        let _loading = state.loading.begin();
        state.facade.list_experiences(cv_id).await?
    };
    debug!("Computing tenure for CV {cv_id} over {} entries", entries.len());

    Ok(Json(match as_of {
        Some(day) => compute_tenure(&entries, day),
        None => compute_tenure_now(&entries),
    }))
}

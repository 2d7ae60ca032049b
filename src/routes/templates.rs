use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::stores::TemplateFilter;

/// Build the template route group.
pub fn router() -> Router<AppState> {
    Router::new().route("/templates", get(list_templates))
}

#[derive(Deserialize, Default)]
struct ListQuery {
    search: Option<String>,
}

/// Listing entry. Deliberately omits slide contents so correct answers never
/// leave the server through the listing surface.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSummary {
    id: Uuid,
    name: String,
    slide_count: usize,
}

/// `GET /api/v1/templates?search=` — list public quiz templates.
async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TemplateSummary>>, AppError> {
    let filter = TemplateFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        author: None,
    };

    let templates = state.templates.find_templates(&filter).await.map_err(|e| {
        tracing::warn!("template store unavailable: {:#}", e.0);
        AppError::ServiceUnavailable("Template store unavailable; retry.".to_string())
    })?;

    Ok(Json(
        templates
            .into_iter()
            .map(|t| TemplateSummary {
                id: t.id,
                name: t.name,
                slide_count: t.slides.len(),
            })
            .collect(),
    ))
}

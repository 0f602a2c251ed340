use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    error::ApiResult,
    pagination::{PageInfo, Pagination},
    extract::ApiQuery,
    state::AppState,
    validation::non_blank,
};

use super::dto::{DiscoverQuery, DiscoverResponse};
use super::repo::{search_offerings, DiscoverFilter};

pub fn routes() -> Router<AppState> {
    Router::new().route("/discover", get(discover))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn discover(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<DiscoverQuery>,
) -> ApiResult<Json<DiscoverResponse>> {
    let (limit, offset) = Pagination {
        limit: q.limit,
        offset: q.offset,
    }
    .resolve(20);
    let query = non_blank(q.q);
    let category = non_blank(q.category);

    let rows = search_offerings(
        &state.db,
        user.id,
        &DiscoverFilter {
            query: query.as_deref(),
            category: category.as_deref(),
            limit,
            offset,
        },
    )
    .await?;

    let pagination = PageInfo::new(limit, offset, rows.len());
    Ok(Json(DiscoverResponse {
        skills: rows.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

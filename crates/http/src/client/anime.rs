//! Catalogue endpoints

use super::request::ApiRequest;
use crate::types::{AnimeFilters, SortBy};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 30;

/// `GET /anime/get-anime-list-filtered`
///
/// The server wants one boolean flag per sort key and one `genre_id`
/// parameter per genre.
pub fn filtered(filters: &AnimeFilters) -> ApiRequest {
    let mut request = ApiRequest::get(["anime", "get-anime-list-filtered"])
        .query("page", filters.page.unwrap_or(DEFAULT_PAGE))
        .query("limit", filters.limit.unwrap_or(DEFAULT_LIMIT))
        .query_opt("sort_order", filters.sort_order)
        .query_opt("status", filters.status.as_deref())
        .query_opt("rating", filters.rating.as_deref())
        .query_opt("kind", filters.kind.as_deref())
        .query_opt("start_year", filters.start_year)
        .query_opt("end_year", filters.end_year);

    if let Some(sort_by) = filters.sort_by {
        let flag = match sort_by {
            SortBy::Score => "filter_by_score",
            SortBy::Date => "filter_by_date",
            SortBy::Name => "filter_by_name",
        };
        request = request.query(flag, true);
    }

    for genre in &filters.genre_ids {
        request = request.query("genre_id", genre);
    }

    request
}

/// `GET /anime/id/{id}`
pub fn by_id(id: &str) -> ApiRequest {
    ApiRequest::get(["anime", "id", id])
}

/// `GET /anime/name/{name}`
pub fn by_name(name: &str) -> ApiRequest {
    ApiRequest::get(["anime", "name", name])
}

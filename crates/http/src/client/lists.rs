//! Per-user anime list endpoints

use super::request::ApiRequest;
use crate::types::ListName;

/// `GET /anime_save_list/get-anime-list-by-name/{name}`
pub fn by_name(name: ListName) -> ApiRequest {
    ApiRequest::get(["anime_save_list", "get-anime-list-by-name", name.as_str()])
}

/// `POST /anime_save_list/create-anime-save-list/{name}`
pub fn create(name: ListName) -> ApiRequest {
    ApiRequest::post(["anime_save_list", "create-anime-save-list", name.as_str()])
}

/// `PUT /anime_save_list/put_anime_id_in_list/{name}?anime_id=`
pub fn add_anime(name: ListName, anime_id: u64) -> ApiRequest {
    ApiRequest::put(["anime_save_list", "put_anime_id_in_list", name.as_str()])
        .query("anime_id", anime_id)
}

/// `DELETE /anime_save_list/delete-anime-id-from-list?anime_id=`
pub fn remove_anime(anime_id: u64) -> ApiRequest {
    ApiRequest::delete(["anime_save_list", "delete-anime-id-from-list"]).query("anime_id", anime_id)
}

/// `DELETE /anime_save_list/delete-anime-list-all`
pub fn clear_all() -> ApiRequest {
    ApiRequest::delete(["anime_save_list", "delete-anime-list-all"])
}

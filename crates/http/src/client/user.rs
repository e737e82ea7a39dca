//! User profile endpoints

use super::request::{ApiRequest, FileUpload};

/// `GET /user/get-user-by-username/{username}`
pub fn by_username(username: &str) -> ApiRequest {
    ApiRequest::get(["user", "get-user-by-username", username])
}

/// `GET /user/get-user/{id}`
pub fn by_id(id: &str) -> ApiRequest {
    ApiRequest::get(["user", "get-user", id])
}

/// `GET /user/search?username=`
pub fn search(username: &str) -> ApiRequest {
    ApiRequest::get(["user", "search"]).query("username", username)
}

/// `PUT /user/update-my-avatar` (multipart `file`)
pub fn update_avatar(upload: FileUpload) -> ApiRequest {
    ApiRequest::put(["user", "update-my-avatar"]).multipart(upload)
}

/// `PUT /user/update-my-banner` (multipart `file`)
pub fn update_banner(upload: FileUpload) -> ApiRequest {
    ApiRequest::put(["user", "update-my-banner"]).multipart(upload)
}

/// `PUT /user/update-my-nickname?nickname=`
pub fn update_nickname(nickname: &str) -> ApiRequest {
    ApiRequest::put(["user", "update-my-nickname"]).query("nickname", nickname)
}

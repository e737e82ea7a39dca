//! Comment endpoints

use super::request::ApiRequest;
use crate::types::NewComment;

/// `GET /comment/get-all-comments-for-anime/{anime_id}`
pub fn for_anime(anime_id: &str) -> ApiRequest {
    ApiRequest::get(["comment", "get-all-comments-for-anime", anime_id])
}

/// `GET /comment/get_3_latest_comments`
pub fn latest() -> ApiRequest {
    ApiRequest::get(["comment", "get_3_latest_comments"])
}

/// `POST /comment/create-comment-for-anime/{comment|reply}`
pub fn create(comment: &NewComment) -> ApiRequest {
    ApiRequest::post(["comment", "create-comment-for-anime", comment.kind().as_str()])
        .query("anime_id", &comment.anime_id)
        .query("comment_text", &comment.text)
        .query_opt("reply_to_comment_id", comment.reply_to_comment_id.as_deref())
}

/// `PUT /comment/update-comment/{id}?text=`
pub fn update(comment_id: &str, text: &str) -> ApiRequest {
    ApiRequest::put(["comment", "update-comment", comment_id]).query("text", text)
}

/// `PUT /comment/like-comment/{id}`
pub fn like(comment_id: &str) -> ApiRequest {
    ApiRequest::put(["comment", "like-comment", comment_id])
}

/// `PUT /comment/dislike-comment/{id}`
pub fn dislike(comment_id: &str) -> ApiRequest {
    ApiRequest::put(["comment", "dislike-comment", comment_id])
}

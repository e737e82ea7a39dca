//! Wire types shared by the client and its callers

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Ids arrive as UUID strings or integers depending on the table; keep them as text
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Response of `/auth/token` and `/auth/refresh-token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Some deployments mirror the refresh cookie in the body
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// User profile as returned by the `/user/*` endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub user_banner: Option<String>,
}

/// Body of `/user/create-user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// A catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    #[serde(deserialize_with = "id_string")]
    pub anime_id: String,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub russian: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub episodes_aired: Option<u32>,
    #[serde(default)]
    pub aired_on: Option<String>,
    #[serde(default)]
    pub released_on: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub franchise: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

/// Page of catalogue entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeListResponse {
    pub total_count: u64,
    pub anime_list: Vec<Anime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Score,
    Date,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Catalogue filter; unset fields are left out of the query string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimeFilters {
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    /// `anons`, `ongoing` or `released`
    pub status: Option<String>,
    /// `g`, `pg`, `pg_13`, `r`, `r_plus` or `none`
    pub rating: Option<String>,
    /// `movie`, `ona`, `ova`, `special`, `tv` or `tv_special`
    pub kind: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<String>,
    pub start_year: Option<u16>,
    pub end_year: Option<u16>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Names of the per-user anime lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListName {
    Watching,
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
    Dropped,
    #[serde(rename = "Plan to Watch")]
    PlanToWatch,
}

impl ListName {
    pub const ALL: [Self; 5] = [
        Self::Watching,
        Self::Completed,
        Self::OnHold,
        Self::Dropped,
        Self::PlanToWatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watching => "Watching",
            Self::Completed => "Completed",
            Self::OnHold => "On Hold",
            Self::Dropped => "Dropped",
            Self::PlanToWatch => "Plan to Watch",
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| {
                name.as_str().eq_ignore_ascii_case(s)
                    || name.as_str().replace(' ', "-").eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| format!("unknown list name: {s}"))
    }
}

/// Contents of one anime list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeSaveList {
    #[serde(default)]
    pub anime_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Comment,
    Reply,
}

impl CommentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
        }
    }
}

/// A comment on an anime page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub text: String,
    #[serde(deserialize_with = "id_string")]
    pub user_id: String,
    #[serde(deserialize_with = "id_string")]
    pub anime_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub user_liked_list: Vec<String>,
    #[serde(default)]
    pub reply_to_comment_id: Option<String>,
    #[serde(default = "default_comment_kind")]
    pub comment_type: CommentKind,
    #[serde(default)]
    pub is_edited: Option<bool>,
}

fn default_comment_kind() -> CommentKind {
    CommentKind::Comment
}

/// Parameters of a new comment or reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub anime_id: String,
    pub text: String,
    pub reply_to_comment_id: Option<String>,
}

impl NewComment {
    pub fn kind(&self) -> CommentKind {
        if self.reply_to_comment_id.is_some() {
            CommentKind::Reply
        } else {
            CommentKind::Comment
        }
    }
}

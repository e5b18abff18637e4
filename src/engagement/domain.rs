// Engagement types: posts, comments and the unified like record
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Display name used when a post's author cannot be resolved.
pub const UNKNOWN_POST_AUTHOR: &str = "Usuario";
/// Display name used when a comment's author cannot be resolved.
pub const UNKNOWN_COMMENT_AUTHOR: &str = "Usuario desconocido";
/// Author assumed for posts created without an `author_id`.
pub const DEFAULT_AUTHOR_ID: i64 = 1;

/// What a like points at. Posts and comments share one like table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeSubject {
    Post,
    Comment,
}

impl LikeSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl ToSql for LikeSubject {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LikeSubject {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(FromSqlError::Other(
                format!("unknown like subject '{}'", other).into(),
            )),
        }
    }
}

/// The target of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post { post_id: i64 },
    Comment { post_id: i64, comment_id: i64 },
}

impl LikeTarget {
    pub fn subject(&self) -> LikeSubject {
        match self {
            Self::Post { .. } => LikeSubject::Post,
            Self::Comment { .. } => LikeSubject::Comment,
        }
    }

    pub fn subject_id(&self) -> i64 {
        match self {
            Self::Post { post_id } => *post_id,
            Self::Comment { comment_id, .. } => *comment_id,
        }
    }

    pub fn not_found_message(&self) -> &'static str {
        match self {
            Self::Post { .. } => "Post not found",
            Self::Comment { .. } => "Post or comment not found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub likes_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author: String,
    pub title: Option<String>,
    pub content: String,
    pub created_at: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub comments: Vec<Comment>,
    pub likes: Vec<Like>,
}

impl Post {
    /// Counters agree with the collections they summarize.
    pub fn counters_consistent(&self) -> bool {
        self.likes_count == self.likes.len() as i64
            && self.comments_count == self.comments.len() as i64
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub author: String,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: i64,
    pub author: String,
    pub content: String,
}

/// Result of flipping a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

impl ToggleOutcome {
    pub fn message(&self, subject: LikeSubject) -> &'static str {
        match (subject, self.liked) {
            (LikeSubject::Post, true) => "Like added",
            (LikeSubject::Post, false) => "Like removed",
            (LikeSubject::Comment, true) => "Comment like added",
            (LikeSubject::Comment, false) => "Comment like removed",
        }
    }
}

/// Page window for post listings; `per_page` is clamped to 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let per_page = request.per_page as i64;
        let pages = ((total + per_page - 1) / per_page).max(1) as u32;
        Self {
            page: request.page,
            per_page: request.per_page,
            pages,
            total,
            has_next: request.page < pages,
            has_prev: request.page > 1,
        }
    }
}

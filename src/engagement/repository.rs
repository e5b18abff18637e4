use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

use crate::engagement::domain::*;
use crate::repository::{immediate, RepositoryError};
use crate::state::DbPool;

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError>;

    /// Newest first, with comments and likes embedded.
    async fn list_posts(&self, page: PageRequest) -> Result<Vec<Post>, RepositoryError>;

    async fn count_posts(&self) -> Result<i64, RepositoryError>;

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, RepositoryError>;

    /// Flip `user_id`'s like on the target and resync its counter atomically.
    async fn toggle_like(
        &self,
        target: LikeTarget,
        user_id: i64,
    ) -> Result<ToggleOutcome, RepositoryError>;

    async fn add_comment(
        &self,
        post_id: i64,
        comment: NewComment,
    ) -> Result<Comment, RepositoryError>;

    /// Comments in insertion order.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, RepositoryError>;
}

pub type DynEngagementRepository = Arc<dyn EngagementRepository>;

const POST_COLUMNS: &str =
    "id, author_id, author, title, content, created_at, likes_count, comments_count";
const COMMENT_COLUMNS: &str = "id, post_id, author_id, author, content, created_at, likes_count";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        likes_count: row.get(6)?,
        comments_count: row.get(7)?,
        comments: Vec::new(),
        likes: Vec::new(),
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        likes_count: row.get(6)?,
    })
}

fn post_exists(conn: &Connection, post_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )
}

fn target_exists(conn: &Connection, target: LikeTarget) -> rusqlite::Result<bool> {
    match target {
        LikeTarget::Post { post_id } => post_exists(conn, post_id),
        LikeTarget::Comment {
            post_id,
            comment_id,
        } => conn.query_row(
            "SELECT COUNT(*) > 0 FROM comments WHERE id = ?1 AND post_id = ?2",
            params![comment_id, post_id],
            |row| row.get(0),
        ),
    }
}

fn load_comments(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY id",
        COMMENT_COLUMNS
    ))?;
    let comments = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn load_likes(
    conn: &Connection,
    subject: LikeSubject,
    subject_id: i64,
) -> rusqlite::Result<Vec<Like>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, created_at FROM likes
         WHERE subject_type = ?1 AND subject_id = ?2
         ORDER BY created_at, rowid",
    )?;
    let likes = stmt
        .query_map(params![subject, subject_id], |row| {
            Ok(Like {
                user_id: row.get(0)?,
                created_at: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(likes)
}

fn hydrate(conn: &Connection, mut post: Post) -> rusqlite::Result<Post> {
    post.comments = load_comments(conn, post.id)?;
    post.likes = load_likes(conn, LikeSubject::Post, post.id)?;
    Ok(post)
}

fn load_post(conn: &Connection, post_id: i64) -> rusqlite::Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![post_id],
            post_from_row,
        )
        .optional()?;

    post.map(|p| hydrate(conn, p)).transpose()
}

/// SQLite implementation
pub struct SqliteEngagementRepository {
    pool: DbPool,
}

impl SqliteEngagementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for SqliteEngagementRepository {
    async fn create_post(&self, post: NewPost) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO posts (author_id, author, title, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.author_id,
                post.author,
                post.title,
                post.content,
                Utc::now().to_rfc3339()
            ],
        )?;

        let id = conn.last_insert_rowid();
        load_post(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(format!("Post {}", id)))
    }

    async fn list_posts(&self, page: PageRequest) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY id DESC LIMIT ?1 OFFSET ?2",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![page.limit(), page.offset()], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let posts = posts
            .into_iter()
            .map(|p| hydrate(&conn, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn count_posts(&self) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        let total = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(total)
    }

    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(load_post(&conn, post_id)?)
    }

    async fn toggle_like(
        &self,
        target: LikeTarget,
        user_id: i64,
    ) -> Result<ToggleOutcome, RepositoryError> {
        let conn = self.pool.get()?;
        let subject = target.subject();
        let subject_id = target.subject_id();

        immediate(&conn, |conn| {
            if !target_exists(conn, target)? {
                return Err(RepositoryError::NotFound(
                    target.not_found_message().to_string(),
                ));
            }

            let removed = conn.execute(
                "DELETE FROM likes WHERE subject_type = ?1 AND subject_id = ?2 AND user_id = ?3",
                params![subject, subject_id, user_id],
            )?;

            if removed == 0 {
                conn.execute(
                    "INSERT INTO likes (subject_type, subject_id, user_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![subject, subject_id, user_id, Utc::now().to_rfc3339()],
                )?;
            }

            let likes_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE subject_type = ?1 AND subject_id = ?2",
                params![subject, subject_id],
                |row| row.get(0),
            )?;

            let table = match subject {
                LikeSubject::Post => "posts",
                LikeSubject::Comment => "comments",
            };
            conn.execute(
                &format!("UPDATE {} SET likes_count = ?1 WHERE id = ?2", table),
                params![likes_count, subject_id],
            )?;

            Ok(ToggleOutcome {
                liked: removed == 0,
                likes_count,
            })
        })
    }

    async fn add_comment(
        &self,
        post_id: i64,
        comment: NewComment,
    ) -> Result<Comment, RepositoryError> {
        let conn = self.pool.get()?;

        immediate(&conn, |conn| {
            if !post_exists(conn, post_id)? {
                return Err(RepositoryError::NotFound("Post not found".into()));
            }

            conn.execute(
                "INSERT INTO comments (post_id, author_id, author, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    post_id,
                    comment.author_id,
                    comment.author,
                    comment.content,
                    Utc::now().to_rfc3339()
                ],
            )?;
            let id = conn.last_insert_rowid();

            conn.execute(
                "UPDATE posts SET comments_count =
                   (SELECT COUNT(*) FROM comments WHERE post_id = ?1)
                 WHERE id = ?1",
                params![post_id],
            )?;

            let created = conn.query_row(
                &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
                params![id],
                comment_from_row,
            )?;
            Ok(created)
        })
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        if !post_exists(&conn, post_id)? {
            return Err(RepositoryError::NotFound("Post not found".into()));
        }
        Ok(load_comments(&conn, post_id)?)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

use crate::repository::{immediate, is_unique_violation, RepositoryError};
use crate::state::DbPool;
use crate::volunteer::domain::*;

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub created_by: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_volunteers: Option<i64>,
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_volunteers: Option<i64>,
}

#[async_trait]
pub trait VolunteerRepository: Send + Sync {
    /// Non-deleted activities, newest first.
    async fn list_activities(&self) -> Result<Vec<VolunteerActivity>, RepositoryError>;

    /// Soft-deleted activities are not found.
    async fn find_activity(&self, id: i64) -> Result<Option<VolunteerActivity>, RepositoryError>;

    async fn create_activity(
        &self,
        activity: NewActivity,
    ) -> Result<VolunteerActivity, RepositoryError>;

    async fn update_activity(
        &self,
        id: i64,
        patch: ActivityPatch,
    ) -> Result<VolunteerActivity, RepositoryError>;

    async fn delete_activity(&self, id: i64) -> Result<(), RepositoryError>;

    /// A second request for the same `(activity, user)` is a `Conflict`.
    async fn create_request(
        &self,
        activity_id: i64,
        user_id: i64,
        message: String,
    ) -> Result<ActivityRequest, RepositoryError>;

    async fn list_requests(&self, activity_id: i64)
        -> Result<Vec<ActivityRequest>, RepositoryError>;

    async fn find_request(&self, id: i64) -> Result<Option<ActivityRequest>, RepositoryError>;

    /// Persist a reviewed request only if it is still pending. Approvals also
    /// re-check capacity and resync `current_volunteers` in the same transaction.
    async fn save_review(&self, reviewed: &ActivityRequest)
        -> Result<ActivityRequest, RepositoryError>;
}

pub type DynVolunteerRepository = Arc<dyn VolunteerRepository>;

const ACTIVITY_COLUMNS: &str = "id, title, description, location, created_by, start_date, \
     end_date, max_volunteers, current_volunteers, status, created_at, updated_at";
const REQUEST_COLUMNS: &str = "id, activity_id, user_id, message, status, created_at, \
     reviewed_by, reviewed_at, review_notes";

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<VolunteerActivity> {
    Ok(VolunteerActivity {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        created_by: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        max_volunteers: row.get(7)?,
        current_volunteers: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRequest> {
    Ok(ActivityRequest {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        user_id: row.get(2)?,
        message: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        reviewed_by: row.get(6)?,
        reviewed_at: row.get(7)?,
        review_notes: row.get(8)?,
    })
}

fn load_activity(conn: &Connection, id: i64) -> rusqlite::Result<Option<VolunteerActivity>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM volunteer_activities WHERE id = ?1 AND status = ?2",
            ACTIVITY_COLUMNS
        ),
        params![id, ActivityStatus::Active],
        activity_from_row,
    )
    .optional()
}

fn load_request(conn: &Connection, id: i64) -> rusqlite::Result<Option<ActivityRequest>> {
    conn.query_row(
        &format!("SELECT {} FROM activity_requests WHERE id = ?1", REQUEST_COLUMNS),
        params![id],
        request_from_row,
    )
    .optional()
}

fn activity_not_found(id: i64) -> RepositoryError {
    RepositoryError::NotFound(format!("Activity {} not found", id))
}

/// SQLite implementation
pub struct SqliteVolunteerRepository {
    pool: DbPool,
}

impl SqliteVolunteerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VolunteerRepository for SqliteVolunteerRepository {
    async fn list_activities(&self) -> Result<Vec<VolunteerActivity>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM volunteer_activities WHERE status != ?1 ORDER BY id DESC",
            ACTIVITY_COLUMNS
        ))?;
        let activities = stmt
            .query_map(params![ActivityStatus::Deleted], activity_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activities)
    }

    async fn find_activity(&self, id: i64) -> Result<Option<VolunteerActivity>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(load_activity(&conn, id)?)
    }

    async fn create_activity(
        &self,
        activity: NewActivity,
    ) -> Result<VolunteerActivity, RepositoryError> {
        let conn = self.pool.get()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO volunteer_activities
               (title, description, location, created_by, start_date, end_date,
                max_volunteers, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                activity.title,
                activity.description,
                activity.location,
                activity.created_by,
                activity.start_date,
                activity.end_date,
                activity.max_volunteers,
                ActivityStatus::Active,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        load_activity(&conn, id)?.ok_or_else(|| activity_not_found(id))
    }

    async fn update_activity(
        &self,
        id: i64,
        patch: ActivityPatch,
    ) -> Result<VolunteerActivity, RepositoryError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE volunteer_activities SET
               title = COALESCE(?1, title),
               description = COALESCE(?2, description),
               location = COALESCE(?3, location),
               start_date = COALESCE(?4, start_date),
               end_date = COALESCE(?5, end_date),
               max_volunteers = COALESCE(?6, max_volunteers),
               updated_at = ?7
             WHERE id = ?8 AND status = ?9",
            params![
                patch.title,
                patch.description,
                patch.location,
                patch.start_date,
                patch.end_date,
                patch.max_volunteers,
                Utc::now().to_rfc3339(),
                id,
                ActivityStatus::Active,
            ],
        )?;

        if rows == 0 {
            return Err(activity_not_found(id));
        }
        load_activity(&conn, id)?.ok_or_else(|| activity_not_found(id))
    }

    async fn delete_activity(&self, id: i64) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE volunteer_activities SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                ActivityStatus::Deleted,
                Utc::now().to_rfc3339(),
                id,
                ActivityStatus::Active
            ],
        )?;

        if rows == 0 {
            return Err(activity_not_found(id));
        }
        Ok(())
    }

    async fn create_request(
        &self,
        activity_id: i64,
        user_id: i64,
        message: String,
    ) -> Result<ActivityRequest, RepositoryError> {
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT INTO activity_requests (activity_id, user_id, message, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                activity_id,
                user_id,
                message,
                RequestStatus::Pending,
                Utc::now().to_rfc3339()
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(ref e) if is_unique_violation(e) => {
                return Err(RepositoryError::Conflict(
                    "You have already requested to join this activity".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        load_request(&conn, id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("Request {}", id)))
    }

    async fn list_requests(
        &self,
        activity_id: i64,
    ) -> Result<Vec<ActivityRequest>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM activity_requests WHERE activity_id = ?1 ORDER BY id",
            REQUEST_COLUMNS
        ))?;
        let requests = stmt
            .query_map(params![activity_id], request_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn find_request(&self, id: i64) -> Result<Option<ActivityRequest>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(load_request(&conn, id)?)
    }

    async fn save_review(
        &self,
        reviewed: &ActivityRequest,
    ) -> Result<ActivityRequest, RepositoryError> {
        let conn = self.pool.get()?;

        immediate(&conn, |conn| {
            if reviewed.status == RequestStatus::Approved {
                let activity = load_activity(conn, reviewed.activity_id)?
                    .ok_or_else(|| activity_not_found(reviewed.activity_id))?;
                let approved: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM activity_requests WHERE activity_id = ?1 AND status = ?2",
                    params![reviewed.activity_id, RequestStatus::Approved],
                    |row| row.get(0),
                )?;
                if activity.max_volunteers.is_some_and(|max| approved >= max) {
                    return Err(RepositoryError::Conflict(
                        ReviewError::AtCapacity.to_string(),
                    ));
                }
            }

            let rows = conn.execute(
                "UPDATE activity_requests
                 SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, review_notes = ?4
                 WHERE id = ?5 AND status = ?6",
                params![
                    reviewed.status,
                    reviewed.reviewed_by,
                    reviewed.reviewed_at,
                    reviewed.review_notes,
                    reviewed.id,
                    RequestStatus::Pending
                ],
            )?;

            if rows == 0 {
                return Err(RepositoryError::Conflict(
                    "Request has already been reviewed".into(),
                ));
            }

            if reviewed.status == RequestStatus::Approved {
                conn.execute(
                    "UPDATE volunteer_activities SET
                       current_volunteers = (SELECT COUNT(*) FROM activity_requests
                                             WHERE activity_id = ?1 AND status = ?2),
                       updated_at = ?3
                     WHERE id = ?1",
                    params![
                        reviewed.activity_id,
                        RequestStatus::Approved,
                        Utc::now().to_rfc3339()
                    ],
                )?;
            }

            load_request(conn, reviewed.id)?
                .ok_or_else(|| RepositoryError::NotFound(format!("Request {}", reviewed.id)))
        })
    }
}

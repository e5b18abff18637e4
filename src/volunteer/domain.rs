// Domain types - Pure, no side effects
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Active,
    Deleted,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

impl ToSql for ActivityStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ActivityStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            other => Err(FromSqlError::Other(
                format!("unknown activity status '{}'", other).into(),
            )),
        }
    }
}

/// Join request lifecycle: `pending` moves to `approved` or `rejected`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(FromSqlError::Other(
                format!("unknown request status '{}'", other).into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerActivity {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub created_by: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_volunteers: Option<i64>,
    pub current_volunteers: i64,
    pub status: ActivityStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl VolunteerActivity {
    pub fn is_full(&self) -> bool {
        self.max_volunteers
            .is_some_and(|max| self.current_volunteers >= max)
    }

    pub fn default_join_message(&self) -> String {
        format!("Solicitud para participar en {}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: i64,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: String,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<String>,
    pub review_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Self::Approve => RequestStatus::Approved,
            Self::Reject => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Request id does not belong to the activity in the path.
    WrongActivity,
    NotCreator,
    AlreadyReviewed(RequestStatus),
    AtCapacity,
}

impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongActivity => write!(f, "Request not found"),
            Self::NotCreator => write!(f, "Only the activity creator can review requests"),
            Self::AlreadyReviewed(status) => write!(f, "Request has already been {}", status),
            Self::AtCapacity => write!(f, "Activity has reached its volunteer limit"),
        }
    }
}

impl std::error::Error for ReviewError {}

/// Pure state transitions - the repository persists the result conditionally.
impl ActivityRequest {
    pub fn review(
        self,
        activity: &VolunteerActivity,
        acting_user: i64,
        decision: ReviewDecision,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ReviewError> {
        if self.activity_id != activity.id {
            return Err(ReviewError::WrongActivity);
        }
        if acting_user != activity.created_by {
            return Err(ReviewError::NotCreator);
        }
        if self.status.is_terminal() {
            return Err(ReviewError::AlreadyReviewed(self.status));
        }
        if decision == ReviewDecision::Approve && activity.is_full() {
            return Err(ReviewError::AtCapacity);
        }

        Ok(Self {
            status: decision.target_status(),
            reviewed_by: Some(acting_user),
            reviewed_at: Some(now.to_rfc3339()),
            review_notes: notes,
            ..self
        })
    }
}

/// Parse a schedule date given as RFC 3339 or as a plain `YYYY-MM-DD`.
pub fn parse_schedule_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    Unparseable(&'static str),
    EndsBeforeStart,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable(field) => {
                write!(f, "{} must be an RFC 3339 timestamp or YYYY-MM-DD", field)
            }
            Self::EndsBeforeStart => write!(f, "end_date cannot be before start_date"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Validate a scheduling window. Either bound may be absent.
pub fn check_schedule(start: Option<&str>, end: Option<&str>) -> Result<(), ScheduleError> {
    let start = start
        .map(|s| parse_schedule_date(s).ok_or(ScheduleError::Unparseable("start_date")))
        .transpose()?;
    let end = end
        .map(|s| parse_schedule_date(s).ok_or(ScheduleError::Unparseable("end_date")))
        .transpose()?;

    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(ScheduleError::EndsBeforeStart),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(max: Option<i64>, current: i64) -> VolunteerActivity {
        VolunteerActivity {
            id: 1,
            title: "Reforestación".into(),
            description: String::new(),
            location: None,
            created_by: 10,
            start_date: None,
            end_date: None,
            max_volunteers: max,
            current_volunteers: current,
            status: ActivityStatus::Active,
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn pending() -> ActivityRequest {
        ActivityRequest {
            id: 5,
            activity_id: 1,
            user_id: 20,
            message: "hola".into(),
            status: RequestStatus::Pending,
            created_at: "2024-01-01T00:00:00Z".into(),
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        }
    }

    #[test]
    fn creator_can_approve_pending() {
        let reviewed = pending()
            .review(
                &activity(None, 0),
                10,
                ReviewDecision::Approve,
                Some("bienvenido".into()),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(10));
        assert!(reviewed.reviewed_at.is_some());
        assert_eq!(reviewed.review_notes.as_deref(), Some("bienvenido"));
    }

    #[test]
    fn non_creator_cannot_review() {
        let err = pending()
            .review(&activity(None, 0), 99, ReviewDecision::Reject, None, Utc::now())
            .unwrap_err();
        assert_eq!(err, ReviewError::NotCreator);
    }

    #[test]
    fn reviewed_requests_are_terminal() {
        let rejected = pending()
            .review(&activity(None, 0), 10, ReviewDecision::Reject, None, Utc::now())
            .unwrap();

        let err = rejected
            .review(&activity(None, 0), 10, ReviewDecision::Approve, None, Utc::now())
            .unwrap_err();
        assert_eq!(err, ReviewError::AlreadyReviewed(RequestStatus::Rejected));
    }

    #[test]
    fn approve_fails_at_capacity_but_reject_succeeds() {
        let full = activity(Some(2), 2);
        assert_eq!(
            pending()
                .review(&full, 10, ReviewDecision::Approve, None, Utc::now())
                .unwrap_err(),
            ReviewError::AtCapacity
        );
        assert!(pending()
            .review(&full, 10, ReviewDecision::Reject, None, Utc::now())
            .is_ok());
    }

    #[test]
    fn request_must_belong_to_activity() {
        let mut other = activity(None, 0);
        other.id = 2;
        assert_eq!(
            pending()
                .review(&other, 10, ReviewDecision::Approve, None, Utc::now())
                .unwrap_err(),
            ReviewError::WrongActivity
        );
    }

    #[test]
    fn schedule_dates_accept_both_formats() {
        assert!(parse_schedule_date("2024-05-01").is_some());
        assert!(parse_schedule_date("2024-05-01T08:00:00Z").is_some());
        assert!(parse_schedule_date("2024-05-01T08:00:00-06:00").is_some());
        assert!(parse_schedule_date("May 1st").is_none());
    }

    #[test]
    fn schedule_rejects_end_before_start() {
        assert_eq!(
            check_schedule(Some("2024-05-02"), Some("2024-05-01")),
            Err(ScheduleError::EndsBeforeStart)
        );
        assert!(check_schedule(Some("2024-05-01"), Some("2024-05-01")).is_ok());
        assert!(check_schedule(None, Some("2024-05-01")).is_ok());
        assert_eq!(
            check_schedule(Some("soon"), None),
            Err(ScheduleError::Unparseable("start_date"))
        );
    }

    #[test]
    fn default_join_message_names_activity() {
        assert_eq!(
            activity(None, 0).default_join_message(),
            "Solicitud para participar en Reforestación"
        );
    }
}

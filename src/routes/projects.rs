use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use serde_json::json;

use crate::db::models::Project;
use crate::error::AppResult;
use crate::state::AppState;

const FEATURED_LIMIT: i64 = 3;

const PROJECT_COLUMNS: &str = "id, title, description, status, budget, beneficiaries_count, \
     progress_percentage, location, featured, created_at";

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ProjectStats {
    total_projects: i64,
    active_projects: i64,
    completed_projects: i64,
    total_budget: i64,
    total_beneficiaries: i64,
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        budget: row.get(4)?,
        beneficiaries_count: row.get(5)?,
        progress_percentage: row.get(6)?,
        location: row.get(7)?,
        featured: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Projects matching `filter` in id order. `None` returns every match.
fn query_projects(
    conn: &Connection,
    filter: &str,
    limit: Option<i64>,
) -> rusqlite::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM projects {} ORDER BY id LIMIT ?1",
        PROJECT_COLUMNS, filter
    ))?;
    // A negative LIMIT means no limit in SQLite
    let projects = stmt
        .query_map(params![limit.unwrap_or(-1)], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects)
}

/// Flagged projects, or the active ones when nothing is flagged.
fn featured_projects(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    let flagged = query_projects(conn, "WHERE featured = 1", Some(FEATURED_LIMIT))?;
    if !flagged.is_empty() {
        return Ok(flagged);
    }
    query_projects(conn, "WHERE status = 'active'", Some(FEATURED_LIMIT))
}

fn project_stats(conn: &Connection) -> rusqlite::Result<ProjectStats> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = 'active'), 0),
                COALESCE(SUM(status = 'completed'), 0),
                COALESCE(SUM(budget), 0),
                COALESCE(SUM(beneficiaries_count), 0)
         FROM projects",
        [],
        |row| {
            Ok(ProjectStats {
                total_projects: row.get(0)?,
                active_projects: row.get(1)?,
                completed_projects: row.get(2)?,
                total_budget: row.get(3)?,
                total_beneficiaries: row.get(4)?,
            })
        },
    )
}

async fn list(State(state): State<AppState>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let projects = query_projects(&conn, "", None)?;
    let total = projects.len();
    Ok(Json(json!({ "projects": projects, "total": total })).into_response())
}

async fn featured(State(state): State<AppState>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let projects = featured_projects(&conn)?;
    Ok(Json(json!({ "projects": projects })).into_response())
}

async fn stats(State(state): State<AppState>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let stats = project_stats(&conn)?;
    Ok(Json(json!({ "stats": stats })).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list))
        .route("/api/projects/featured", get(featured))
        .route("/api/projects/stats", get(stats))
}

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenIssuer;
use crate::config::Config;
use crate::engagement::{DynEngagementRepository, SqliteEngagementRepository};
use crate::users::{DynUserRepository, SqliteUserRepository};
use crate::volunteer::{DynVolunteerRepository, SqliteVolunteerRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenIssuer>,
    pub users: DynUserRepository,
    pub engagement: DynEngagementRepository,
    pub volunteer: DynVolunteerRepository,
}

impl AppState {
    /// Wire the SQLite repositories and the token issuer over one pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let tokens = Arc::new(TokenIssuer::from_config(&config.auth));
        Self {
            users: Arc::new(SqliteUserRepository::new(db.clone())),
            engagement: Arc::new(SqliteEngagementRepository::new(db.clone())),
            volunteer: Arc::new(SqliteVolunteerRepository::new(db.clone())),
            tokens,
            db,
            config,
        }
    }
}

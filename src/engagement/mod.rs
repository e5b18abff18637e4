pub mod domain;
pub mod handlers;
pub mod repository;

pub use domain::{Comment, Like, LikeSubject, LikeTarget, Post, ToggleOutcome};
pub use repository::{DynEngagementRepository, EngagementRepository, SqliteEngagementRepository};

pub mod handlers;
pub mod repository;

pub use repository::{
    normalize_email, DynUserRepository, NewUser, ProfileUpdate, SqliteUserRepository,
    UserRepository,
};

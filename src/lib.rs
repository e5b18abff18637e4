// Library exports for CASIRA Connect
// This allows integration tests and external code to use the API modules

pub mod auth;
pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod extractors;
pub mod repository;
pub mod routes;
pub mod state;
pub mod users;
pub mod volunteer;

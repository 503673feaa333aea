// Library exports for Plaza
// This allows integration tests and external code to use Plaza modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod repo;
pub mod routes;
pub mod state;
pub mod validate;

pub mod auth;
pub mod authentication;
pub mod concurrency;
pub mod config;
pub mod db;
pub mod deletion;
pub mod metrics;
pub mod routes;
pub mod session;
pub mod startup;
pub mod store;
pub mod utils;

pub mod config;
pub mod credential;
pub mod error;
pub mod kpi;
pub mod request;
pub mod schema;
pub mod tracking;

pub mod auth;
pub mod compactor;
pub mod config;
pub mod http;
pub mod limits;
pub mod model;
pub mod observability;
pub mod scheduler;
pub mod wal;

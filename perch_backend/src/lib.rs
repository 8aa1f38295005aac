pub mod alerts;
pub mod api;
pub mod bootstrap;
pub mod comments;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod mentions;
pub mod notifications;
pub mod pagination;
pub mod telemetry;
pub mod users;
pub mod utils;

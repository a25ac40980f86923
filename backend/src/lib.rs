use db_connector::Pool;

use crate::notify::Notifier;

pub mod catalog;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod utils;
pub mod workflow;

pub struct AppState {
    pub pool: Pool,
    pub jwt_secret: String,
    pub notifier: Notifier,
    pub media_root: String,
}

pub mod auth;
pub mod device;
pub mod issue_request;
pub mod profile;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::configure);
    cfg.configure(profile::configure);
    cfg.configure(device::configure);
    cfg.configure(issue_request::configure);
}

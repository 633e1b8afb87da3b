use actix_web::web;

use crate::handlers::shared::{json_error_handler, path_error_handler};

pub mod auth;
pub mod employees;
pub mod leaves;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .configure(auth::configure)
            .configure(employees::configure)
            .configure(leaves::configure),
    );
}

use actix_web::web;

use crate::handlers::leaves;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leaves")
            .route("", web::get().to(leaves::list_leaves))
            .route("", web::post().to(leaves::submit_leave))
            .route("/{id}", web::get().to(leaves::get_leave))
            .route("/{id}", web::delete().to(leaves::delete_leave))
            .route("/{id}/status", web::put().to(leaves::decide_leave)),
    );
}

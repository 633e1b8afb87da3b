use actix_web::{web, HttpResponse, Result};
use uuid::Uuid;

use crate::database::models::{DecisionInput, LeaveRequestInput};
use crate::handlers::shared::MessageResponse;
use crate::services::user_context::Actor;
use crate::AppState;

pub async fn list_leaves(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse> {
    let leaves = state.leave_service.list(&actor).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

pub async fn get_leave(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let leave = state.leave_service.get(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

pub async fn submit_leave(
    state: web::Data<AppState>,
    actor: Actor,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse> {
    let leave = state
        .leave_service
        .submit(&actor, input.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(leave))
}

pub async fn decide_leave(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    input: web::Json<DecisionInput>,
) -> Result<HttpResponse> {
    let leave = state
        .leave_service
        .decide(&actor, path.into_inner(), input.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(leave))
}

pub async fn delete_leave(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .leave_service
        .delete(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Leave request deleted")))
}

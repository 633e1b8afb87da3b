use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::database::models::{LinkEmployeeInput, LoginInput, RegisterInput, UserInfo};
use crate::services::user_context::Actor;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEmployeeResponse {
    pub message: String,
    pub user: UserInfo,
}

pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterInput>,
) -> Result<HttpResponse> {
    let response = state.auth_service.register(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginInput>,
) -> Result<HttpResponse> {
    let response = state.auth_service.login(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn me(actor: Actor) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(MeResponse {
        user: UserInfo::from(&actor),
    }))
}

pub async fn link_employee(
    state: web::Data<AppState>,
    actor: Actor,
    request: web::Json<LinkEmployeeInput>,
) -> Result<HttpResponse> {
    let user = state
        .auth_service
        .link_employee(&actor, request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(LinkEmployeeResponse {
        message: "Employee account linked successfully".to_string(),
        user,
    }))
}

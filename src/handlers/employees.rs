use actix_web::{web, HttpResponse, Result};
use uuid::Uuid;

use crate::database::models::{EmployeeInput, EmployeeUpdateInput};
use crate::handlers::shared::MessageResponse;
use crate::services::user_context::Actor;
use crate::AppState;

pub async fn list_employees(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse> {
    let employees = state.employee_service.list(&actor).await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employee(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let employee = state
        .employee_service
        .get(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn get_leave_balance(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let balance = state
        .employee_service
        .leave_balance(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}

pub async fn create_employee(
    state: web::Data<AppState>,
    actor: Actor,
    input: web::Json<EmployeeInput>,
) -> Result<HttpResponse> {
    let employee = state
        .employee_service
        .create(&actor, input.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

pub async fn update_employee(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    input: web::Json<EmployeeUpdateInput>,
) -> Result<HttpResponse> {
    let employee = state
        .employee_service
        .update(&actor, path.into_inner(), input.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .employee_service
        .delete(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Employee deleted")))
}

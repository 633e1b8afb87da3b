use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Role, User, UserInfo};
use crate::error::AppError;
use crate::services::auth::{Claims, UNAUTHENTICATED};
use crate::services::authorization::{self, Operation, Scope};
use crate::AppState;

/// The authenticated caller, resolved from the bearer token against the
/// current user record on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<Uuid>,
}

impl Actor {
    pub fn requires(&self, operation: Operation) -> Result<(), AppError> {
        authorization::require(self.role, operation)
    }

    pub fn scope(&self) -> Scope {
        Scope::for_actor(self.role, self.employee_id)
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            employee_id: user.employee_id,
        }
    }
}

impl From<&Actor> for UserInfo {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.user_id,
            email: actor.email.clone(),
            role: actor.role,
            employee_id: actor.employee_id,
        }
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let claims = Claims::from_request(req, payload).into_inner();
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let claims = claims?;
            let state = state.ok_or_else(|| {
                AppError::internal_server_error_message("Application state not configured")
            })?;

            state.auth_service.resolve_actor(&claims).await
        })
    }
}

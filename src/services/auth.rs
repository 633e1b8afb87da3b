use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    AuthResponse, LinkEmployeeInput, LoginInput, RegisterInput, Role, User, UserInfo,
};
use crate::database::repositories::{
    EmployeeRepository, Repositories, RepositoryError, UserRepository,
};
use crate::error::AppError;
use crate::middleware::correlation_id;
use crate::services::authorization::Operation;
use crate::services::employees::{duplicate_user_email, insert_with_next_code, NewEmployee};
use crate::services::user_context::Actor;
use crate::services::validation::{normalize_email, validate_contact_number, validate_password};

pub const UNAUTHENTICATED: &str = "Please authenticate";
const DEFAULT_CONTACT_NUMBER: &str = "0000000000";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub role: Role,
    pub employee_id: Option<Uuid>,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

impl FromRequest for Claims {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let (Some(token), Some(config)) = (token, req.app_data::<Data<Config>>()) else {
            log::debug!("[{}] Missing bearer token", correlation_id(req));
            return ready(Err(AppError::Unauthorized(UNAUTHENTICATED.to_string())));
        };

        match decode::<Claims>(
            token.trim(),
            &DecodingKey::from_secret(config.jwt_secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(token_data) => ready(Ok(token_data.claims)),
            Err(error) => {
                log::debug!("[{}] Rejected bearer token: {}", correlation_id(req), error);
                ready(Err(AppError::Unauthorized(UNAUTHENTICATED.to_string())))
            }
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    employees: Arc<dyn EmployeeRepository>,
    config: Config,
}

impl AuthService {
    pub fn new(config: Config, repositories: &Repositories) -> Self {
        Self {
            users: Arc::clone(&repositories.users),
            employees: Arc::clone(&repositories.employees),
            config,
        }
    }

    /// Self-service sign-up. Only the Employee role can be registered; the
    /// account is linked to the employee record with the same email, which
    /// is created when missing.
    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, AppError> {
        if let Some(role) = input.role.as_deref() {
            if matches!(role.parse::<Role>(), Ok(Role::Admin) | Ok(Role::Manager)) {
                return Err(AppError::forbidden(
                    "Admin and Manager accounts cannot be registered. Please use the fixed login credentials.",
                ));
            }
        }

        let email = normalize_email(&input.email)?;
        let contact_number = input
            .contact_number
            .as_deref()
            .map(str::trim)
            .filter(|contact| !contact.is_empty());
        if let Some(contact_number) = contact_number {
            validate_contact_number(contact_number)?;
        }
        validate_password(&input.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateKey("User already exists".to_string()));
        }

        let employee = match self.employees.find_by_email(&email).await? {
            Some(employee) => employee,
            None => {
                let employee_name = input
                    .employee_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_name(&email));

                insert_with_next_code(
                    self.employees.as_ref(),
                    NewEmployee {
                        employee_name,
                        email: email.clone(),
                        contact_number: contact_number
                            .unwrap_or(DEFAULT_CONTACT_NUMBER)
                            .to_string(),
                        joining_date: Utc::now(),
                        reporting_manager: None,
                    },
                )
                .await?
            }
        };

        // An existing record may already belong to someone else.
        let employee_id = match self.users.find_by_employee(employee.id).await? {
            Some(_) => None,
            None => Some(employee.id),
        };

        let password_hash = hash(&input.password, self.config.bcrypt_cost)?;
        let user = User::new(email.clone(), password_hash, Role::Employee, employee_id);
        match self.users.insert(&user).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate { field: "email" }) => {
                return Err(duplicate_user_email(&email));
            }
            Err(error) => return Err(error.into()),
        }

        log::info!("Registered employee account {}", user.email);

        let token = self.generate_token(&user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&input.email)
            .map_err(|_| AppError::validation("Invalid email format"))?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        if !verify(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.generate_token(&user)?;
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    /// Resolves verified claims to the current state of the user.
    pub async fn resolve_actor(&self, claims: &Claims) -> Result<Actor, AppError> {
        let user = self
            .users
            .find_by_id(claims.user_id())
            .await?
            .ok_or_else(|| AppError::Unauthorized(UNAUTHENTICATED.to_string()))?;

        Ok(Actor::from(&user))
    }

    /// Links an unlinked Employee account to an employee record, found by
    /// storage id, employee code, or the account's own email.
    pub async fn link_employee(
        &self,
        actor: &Actor,
        input: LinkEmployeeInput,
    ) -> Result<UserInfo, AppError> {
        if actor.requires(Operation::LinkEmployee).is_err() {
            return Err(AppError::forbidden("Only employees can link their account"));
        }
        if actor.employee_id.is_some() {
            return Err(AppError::validation(
                "Your account is already linked to an employee record",
            ));
        }

        let reference = input
            .employee_id
            .as_deref()
            .map(str::trim)
            .filter(|reference| !reference.is_empty())
            .ok_or_else(|| AppError::validation("Employee ID is required"))?;

        let mut employee = None;
        if let Ok(id) = Uuid::parse_str(reference) {
            employee = self.employees.find_by_id(id).await?;
        }
        if employee.is_none() {
            employee = self.employees.find_by_email(&actor.email).await?;
        }
        if employee.is_none() {
            employee = self.employees.find_by_code(reference).await?;
        }
        let employee = employee.ok_or_else(|| {
            AppError::not_found("Employee record not found. Please contact your administrator.")
        })?;

        let taken = AppError::validation("This employee record is already linked to another account");
        if let Some(existing) = self.users.find_by_employee(employee.id).await? {
            if existing.id != actor.user_id {
                return Err(taken);
            }
        }

        match self.users.link_employee(actor.user_id, employee.id).await {
            Ok(true) => {}
            Ok(false) => return Err(AppError::Unauthorized(UNAUTHENTICATED.to_string())),
            Err(RepositoryError::Duplicate { .. }) => return Err(taken),
            Err(error) => return Err(error.into()),
        }

        log::info!(
            "User {} linked to employee {}",
            actor.email,
            employee.employee_code
        );

        Ok(UserInfo {
            id: actor.user_id,
            email: actor.email.clone(),
            role: actor.role,
            employee_id: Some(employee.id),
        })
    }

    /// Ensures the fixed Admin and Manager accounts exist with their
    /// configured passwords.
    pub async fn seed_fixed_users(&self) -> Result<(), AppError> {
        let fixed = [
            (
                Role::Admin,
                self.config.admin_email.as_str(),
                self.config.admin_password.as_str(),
            ),
            (
                Role::Manager,
                self.config.manager_email.as_str(),
                self.config.manager_password.as_str(),
            ),
        ];

        for (role, email, password) in fixed {
            let email = email.trim().to_lowercase();
            match self.users.find_by_email(&email).await? {
                None => {
                    let password_hash = hash(password, self.config.bcrypt_cost)?;
                    self.users
                        .insert(&User::new(email.clone(), password_hash, role, None))
                        .await?;
                    log::info!("✓ Fixed {} account created", role);
                }
                Some(user) if !verify(password, &user.password_hash)? => {
                    let password_hash = hash(password, self.config.bcrypt_cost)?;
                    self.users.update_password(user.id, &password_hash).await?;
                    log::info!("✓ Fixed {} account password reset", role);
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    pub fn generate_token(&self, user: &User) -> Result<String, AppError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(self.config.jwt_expiration_days))
            .ok_or_else(|| AppError::internal_server_error_message("Invalid token expiry"))?
            .timestamp() as usize;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            employee_id: user.employee_id,
            exp: expiration,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?;

        Ok(token)
    }
}

/// `asha.rao@example.com` -> `Asha.rao`
fn default_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => email.to_string(),
    }
}

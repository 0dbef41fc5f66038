//! User service
//!
//! Account management for the admin panel:
//! - Create with argon2-hashed password and case-insensitive unique email
//! - Partial updates, including password changes
//! - Soft delete and restore; deleted users are hidden from `get` and `list`

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::password::hash_password;
use super::validation::{self, order_clause, parse_enum, required};
use crate::db::repositories::UserRepository;
use crate::models::{
    AuditAction, CreateUserInput, ListParams, NewAuditLog, PagedResult, UpdateUserInput, User,
    UserFilter, UserRole, UserStatus, USER_SORT_COLUMNS,
};

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

const ENTITY: &str = "user";

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    recorder: ChangeRecorder,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, recorder: ChangeRecorder) -> Self {
        Self { repo, recorder }
    }

    /// Create a user
    ///
    /// # Errors
    /// - `Validation` for a blank name, malformed email, short password or unknown role/status
    /// - `Conflict` if the email is taken, including by a soft-deleted user
    pub async fn create(&self, input: CreateUserInput, actor: &str) -> ServiceResult<User> {
        let name = required("Name", &input.name)?;
        let email = validation::email(&input.email)?;
        validate_password(&input.password)?;
        let role: UserRole = match input.role.as_deref() {
            Some(role) => parse_enum("role", role)?,
            None => UserRole::default(),
        };
        let status: UserStatus = match input.status.as_deref() {
            Some(status) => parse_enum("status", status)?,
            None => UserStatus::default(),
        };

        self.ensure_email_available(&email, None).await?;

        let password_hash = hash_password(&input.password)?;
        let mut user = User::new(name, email, password_hash, role);
        user.status = status;

        let created = self.repo.create(&user).await?;
        tracing::info!(user_id = created.id, "User created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "email": created.email, "role": created.role })),
            )
            .await;
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        match self.repo.get_by_id(id).await? {
            Some(user) if !user.is_deleted() => Ok(user),
            _ => Err(ServiceError::not_found("User", id)),
        }
    }

    pub async fn list(&self, filter: &UserFilter, params: &ListParams) -> ServiceResult<PagedResult<User>> {
        if let Some(role) = &filter.role {
            parse_enum::<UserRole>("role", role)?;
        }
        if let Some(status) = &filter.status {
            parse_enum::<UserStatus>("status", status)?;
        }
        let order_by = order_clause(params, &USER_SORT_COLUMNS)?;

        let total = self.repo.count(filter).await?;
        let items = self
            .repo
            .list(filter, &order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Apply the fields present in `input`
    pub async fn update(&self, id: i64, input: UpdateUserInput, actor: &str) -> ServiceResult<User> {
        let mut user = self.get(id).await?;
        let mut changed = Vec::new();

        if let Some(name) = input.name {
            user.name = required("Name", &name)?;
            changed.push("name");
        }
        if let Some(email) = input.email {
            let email = validation::email(&email)?;
            if email != user.email {
                self.ensure_email_available(&email, Some(id)).await?;
                user.email = email;
            }
            changed.push("email");
        }
        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password)?;
            changed.push("password");
        }
        if let Some(role) = input.role {
            user.role = parse_enum("role", &role)?;
            changed.push("role");
        }
        if let Some(status) = input.status {
            user.status = parse_enum("status", &status)?;
            changed.push("status");
        }

        user.updated_at = Utc::now();
        let updated = self.repo.update(&user).await?;

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Update, ENTITY, Some(id))
                    .with_details(json!({ "fields": changed })),
            )
            .await;
        Ok(updated)
    }

    /// Soft delete: stamps `deletedAt`, the row stays
    pub async fn delete(&self, id: i64, actor: &str) -> ServiceResult<()> {
        if !self.repo.soft_delete(id, Utc::now()).await? {
            return Err(ServiceError::not_found("User", id));
        }
        tracing::info!(user_id = id, "User soft-deleted");

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id)))
            .await;
        Ok(())
    }

    /// Undo a soft delete
    ///
    /// # Errors
    /// - `NotFound` if the user never existed
    /// - `Conflict` if the user is not deleted
    pub async fn restore(&self, id: i64, actor: &str) -> ServiceResult<User> {
        let user = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        if !user.is_deleted() {
            return Err(ServiceError::conflict(format!("User {} is not deleted", id)));
        }
        if !self.repo.restore(id).await? {
            return Err(ServiceError::conflict(format!("User {} is not deleted", id)));
        }

        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Restore, ENTITY, Some(id)))
            .await;
        self.get(id).await
    }

    async fn ensure_email_available(&self, email: &str, except: Option<i64>) -> ServiceResult<()> {
        match self.repo.get_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => Err(ServiceError::conflict(format!(
                "Email '{}' is already registered",
                email
            ))),
            _ => Ok(()),
        }
    }
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

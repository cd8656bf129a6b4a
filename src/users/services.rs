use tracing::info;

use crate::error::AppError;
use crate::users::dto::{CreateUserRequest, Patch, UpdateUserRequest};
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserChanges, DEFAULT_ROLE};

// Column widths of the users table.
const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 100;
const ROLE_MAX: usize = 50;

fn within(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_name(name: String) -> Result<String, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    within("name", &name, NAME_MAX)?;
    Ok(name)
}

// Stored exactly as sent; uniqueness is left to the storage constraint.
fn check_email(email: String) -> Result<String, AppError> {
    within("email", &email, EMAIL_MAX)?;
    Ok(email)
}

fn check_role(role: String) -> Result<String, AppError> {
    within("role", &role, ROLE_MAX)?;
    Ok(role)
}

fn patched(
    field: &str,
    patch: Patch<String>,
    check: fn(String) -> Result<String, AppError>,
) -> Result<Option<String>, AppError> {
    match patch {
        Patch::Absent => Ok(None),
        Patch::Null => Err(AppError::validation(format!("{field} must not be null"))),
        Patch::Value(v) => check(v).map(Some),
    }
}

pub fn validate_new_user(req: CreateUserRequest) -> Result<NewUser, AppError> {
    let (Some(name), Some(email)) = (req.name, req.email) else {
        return Err(AppError::validation(
            "missing required fields (name, email)",
        ));
    };
    let role = match req.role {
        Some(role) => check_role(role)?,
        None => DEFAULT_ROLE.to_string(),
    };
    Ok(NewUser {
        name: check_name(name)?,
        email: check_email(email)?,
        age: req.age,
        role,
    })
}

pub fn validate_changes(req: UpdateUserRequest) -> Result<UserChanges, AppError> {
    Ok(UserChanges {
        name: patched("name", req.name, check_name)?,
        email: patched("email", req.email, check_email)?,
        role: patched("role", req.role, check_role)?,
    })
}

pub async fn create_user(store: &dyn UserStore, req: CreateUserRequest) -> Result<User, AppError> {
    let new = validate_new_user(req)?;
    let user = store.insert(new).await?;
    info!(user_id = user.id, "user created");
    Ok(user)
}

pub async fn search_users(store: &dyn UserStore, q: Option<&str>) -> Result<Vec<User>, AppError> {
    let needle = q.filter(|q| !q.is_empty());
    store.search(needle).await
}

pub async fn update_user(
    store: &dyn UserStore,
    id: i64,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    find_user(store, id).await?;
    let changes = validate_changes(req)?;
    let user = store.update(id, changes).await?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}

/// Fails with `NotFound` when no user has this id.
pub async fn find_user(store: &dyn UserStore, id: i64) -> Result<User, AppError> {
    store.get(id).await?.ok_or(AppError::NotFound(id))
}

pub async fn delete_user(store: &dyn UserStore, id: i64) -> Result<(), AppError> {
    store.delete(id).await?;
    info!(user_id = id, "user deleted");
    Ok(())
}

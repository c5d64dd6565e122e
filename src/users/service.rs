use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::password::{hash_password, verify_password},
    error::ApiError,
    users::{
        dto::{LoginRequest, RegisterRequest, UpdateUserRequest},
        repo::{NewUser, StoreError, User, UserChanges, UserStore},
        validate::{check_email, check_password, normalize_email},
    },
};

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EmailTaken => ApiError::EmailTaken,
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Db(e) => ApiError::Internal(e.into()),
        }
    }
}

/// Validate a registration payload and create the account. Field checks are
/// run eagerly so a bad email and a short password are reported together.
pub async fn create_user(store: &dyn UserStore, req: RegisterRequest) -> Result<User, ApiError> {
    let email = normalize_email(&req.email);

    let mut errors = Vec::new();
    check_email(&email, &mut errors);
    check_password(&req.password, &mut errors);
    if !errors.is_empty() {
        warn!(email = %email, "registration payload rejected");
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&req.password)?;
    let user = store
        .create(NewUser {
            email,
            name: req.name.unwrap_or_default(),
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Apply a partial update to an existing account. A new password is
/// re-validated and re-hashed; other fields overwrite directly.
pub async fn update_user(
    store: &dyn UserStore,
    user_id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, ApiError> {
    let email = req.email.as_deref().map(normalize_email);

    let mut errors = Vec::new();
    if let Some(email) = &email {
        check_email(email, &mut errors);
    }
    if let Some(password) = &req.password {
        check_password(password, &mut errors);
    }
    if !errors.is_empty() {
        warn!(user_id = %user_id, "update payload rejected");
        return Err(ApiError::Validation(errors));
    }

    let password_hash = match &req.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = store
        .update(
            user_id,
            UserChanges {
                email,
                name: req.name,
                password_hash,
            },
        )
        .await?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

/// Check login credentials and resolve the account they belong to.
///
/// Unknown email and wrong password fail identically so that the endpoint
/// cannot be used to probe which addresses have accounts. The password is
/// compared exactly as submitted.
pub async fn authenticate(store: &dyn UserStore, req: LoginRequest) -> Result<User, ApiError> {
    let email = normalize_email(&req.email);

    let mut errors = Vec::new();
    check_email(&email, &mut errors);
    if !errors.is_empty() {
        warn!(email = %email, "login payload rejected");
        return Err(ApiError::Validation(errors));
    }

    let user = match store.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            warn!(email = %email, "login with unknown email");
            return Err(ApiError::Unauthorized);
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    info!(user_id = %user.id, "user authenticated");
    Ok(user)
}

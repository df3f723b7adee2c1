//! Authentication service for user signup and login
//!
//! Accounts are keyed by normalized e-mail. There are no sessions or tokens:
//! clients pass the e-mail back on every request.

use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
}

/// Input for creating an account
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SignupInput {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public part of a user record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    name: String,
    email: String,
    password: String,
}

impl SignupInput {
    /// Trim fields and reject empty or malformed ones
    pub fn normalized(self) -> AppResult<Self> {
        let input = Self {
            name: self.name.trim().to_string(),
            email: shared::normalize_email(&self.email),
            password: self.password,
        };

        if input.name.is_empty() || input.email.is_empty() || input.password.is_empty() {
            return Err(AppError::bad_request("All fields are required."));
        }
        input.validate().map_err(|e| {
            let field = e
                .field_errors()
                .keys()
                .next()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "email".to_string());
            AppError::Validation {
                message: format!("Invalid {}.", field),
                field,
            }
        })?;

        Ok(input)
    }
}

impl AuthService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an account with a bcrypt-hashed password
    pub async fn signup(&self, input: SignupInput) -> AppResult<()> {
        let input = input.normalized()?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&input.email)
            .fetch_one(&self.db)
            .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("Email already registered.".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("INSERT INTO users (name, email, password) VALUES ($1, $2, $3)")
            .bind(&input.name)
            .bind(&input.email)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        tracing::info!(email = %input.email, "User signed up");
        Ok(())
    }

    /// Check credentials and return the user's profile
    pub async fn login(&self, input: LoginInput) -> AppResult<UserProfile> {
        let email = shared::normalize_email(&input.email);
        if email.is_empty() || input.password.is_empty() {
            return Err(AppError::bad_request("Email and password required."));
        }

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT name, email, password FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &user.password)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(UserProfile {
            name: user.name,
            email: user.email,
        })
    }
}

//! User persistence. Deliberately small: this surface only needs enough
//! identity to issue and validate sessions, not a full profile system.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewUser, User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, email, hashed_password, display_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&new_user.email)
        .bind(&new_user.hashed_password)
        .bind(&new_user.display_name)
        .bind(&new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("users_email_key") {
                    return ApiError::Conflict { resource_type: "user", resource: "email".to_string() };
                }
            }
            ApiError::DatabaseError(e)
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, ApiError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET hashed_password = $1, updated_at = NOW() WHERE user_id = $2 AND deleted_at IS NULL")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_struct() {
        let new_user = NewUser {
            email: "test@example.com".to_string(),
            hashed_password: "$argon2id$...".to_string(),
            display_name: "Test User".to_string(),
            role: "user".to_string(),
        };
        assert_eq!(new_user.role, "user");
    }
}

//! Project CRUD. Projects are owned by a single user; every query is
//! scoped by `user_id` so one user can never see or touch another's rows.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{NewProject, Project};

#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_project: NewProject) -> Result<Project, ApiError> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (project_id, user_id, name, color)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(new_project.user_id)
        .bind(&new_project.name)
        .bind(&new_project.color)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_id(&self, user_id: Uuid, project_id: Uuid) -> Result<Option<Project>, ApiError> {
        sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn list(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Project>, ApiError> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE user_id = $1 AND ($2 OR NOT archived)
            ORDER BY name ASC
            "#,
        )
        .bind(user_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        name: Option<String>,
        color: Option<String>,
    ) -> Result<Project, ApiError> {
        let result = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($1, name),
                color = COALESCE($2, color),
                updated_at = NOW()
            WHERE project_id = $3 AND user_id = $4
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(color)
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        result.ok_or_else(|| ApiError::NotFound { resource_type: "project", resource: format!("project:{project_id}") })
    }

    pub async fn set_archived(&self, user_id: Uuid, project_id: Uuid, archived: bool) -> Result<Project, ApiError> {
        let result = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET archived = $1, updated_at = NOW()
            WHERE project_id = $2 AND user_id = $3
            RETURNING *
            "#,
        )
        .bind(archived)
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        result.ok_or_else(|| ApiError::NotFound { resource_type: "project", resource: format!("project:{project_id}") })
    }

    pub async fn delete(&self, user_id: Uuid, project_id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound { resource_type: "project", resource: format!("project:{project_id}") });
        }
        Ok(())
    }
}

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{map_db_error, AppError};
use crate::users::repo_types::{NewUser, User, UserChanges};

/// Persistence contract for users. Every method is atomic: a failed call
/// leaves storage exactly as it was.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new: NewUser) -> Result<User, AppError>;
    async fn get(&self, id: i64) -> Result<Option<User>, AppError>;
    /// `None` returns every user; otherwise a case-insensitive substring
    /// match on name or email. Ordered by id.
    async fn search(&self, needle: Option<&str>) -> Result<Vec<User>, AppError>;
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, age, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, age, role
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.age)
        .bind(&new.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, age, role FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(user)
    }

    async fn search(&self, needle: Option<&str>) -> Result<Vec<User>, AppError> {
        let pattern = needle.map(|n| format!("%{}%", escape_like(n)));
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, role
              FROM users
             WHERE $1::text IS NULL
                OR name ILIKE $1 ESCAPE '\'
                OR email ILIKE $1 ESCAPE '\'
             ORDER BY id ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.db)
        .await
        .map_err(map_db_error)?;
        Ok(rows)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, AppError> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;
        let mut user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, role
              FROM users
             WHERE id = $1
               FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or(AppError::NotFound(id))?;

        if !changes.is_empty() {
            user.apply(changes);
            user = sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                   SET name = $2, email = $3, role = $4
                 WHERE id = $1
                RETURNING id, name, email, age, role
                "#,
            )
            .bind(id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.role)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await.map_err(map_db_error)?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(id));
        }
        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}

/// Escapes LIKE metacharacters so the needle matches literally.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

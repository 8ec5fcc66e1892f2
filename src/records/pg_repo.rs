use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo::{Persistence, RecordStore};
use super::repo_types::{UserFields, UserRecord};

/// Record store backed by the `user_records` table.
#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list(&self) -> anyhow::Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, first_name, last_name, dob, anniversary_date, mobile_number,
                   created_at, updated_at
            FROM user_records
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list user records")?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, first_name, last_name, dob, anniversary_date, mobile_number,
                   created_at, updated_at
            FROM user_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get user record")?;
        Ok(row)
    }

    async fn create(&self, fields: UserFields) -> anyhow::Result<UserRecord> {
        let row = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO user_records (first_name, last_name, dob, anniversary_date, mobile_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, dob, anniversary_date, mobile_number,
                      created_at, updated_at
            "#,
        )
        .bind(fields.first_name)
        .bind(fields.last_name)
        .bind(fields.dob)
        .bind(fields.anniversary_date)
        .bind(fields.mobile_number)
        .fetch_one(&self.db)
        .await
        .context("insert user record")?;
        Ok(row)
    }

    async fn update(&self, id: i64, fields: UserFields) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE user_records
               SET first_name = $2,
                   last_name = $3,
                   dob = $4,
                   anniversary_date = $5,
                   mobile_number = $6,
                   updated_at = now()
             WHERE id = $1
            RETURNING id, first_name, last_name, dob, anniversary_date, mobile_number,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(fields.first_name)
        .bind(fields.last_name)
        .bind(fields.dob)
        .bind(fields.anniversary_date)
        .bind(fields.mobile_number)
        .fetch_optional(&self.db)
        .await
        .context("update user record")?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM user_records WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user record")?;
        Ok(result.rows_affected() > 0)
    }

    fn persistence(&self) -> Persistence {
        Persistence::Durable
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::AuditLogRepo;
use crate::error::Result;
use crate::models::audit_log::{AuditEvent, AuditLogFilter};
use crate::models::{AuditLog, Page};

pub struct PgAuditLogRepo {
    pool: PgPool,
}

impl PgAuditLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_clause_separator(builder: &mut QueryBuilder<'_, Postgres>, started: &mut bool) {
    if *started {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *started = true;
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    let mut started = false;

    if let Some(username) = &filter.username {
        push_clause_separator(builder, &mut started);
        builder.push("username = ").push_bind(username.clone());
    }
    if let Some(action) = &filter.action {
        push_clause_separator(builder, &mut started);
        builder.push("action = ").push_bind(action.clone());
    }
    if let Some(resource_type) = &filter.resource_type {
        push_clause_separator(builder, &mut started);
        builder
            .push("resource_type = ")
            .push_bind(resource_type.clone());
    }
    if let Some(from) = filter.from {
        push_clause_separator(builder, &mut started);
        builder.push("timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        push_clause_separator(builder, &mut started);
        builder.push("timestamp <= ").push_bind(to);
    }
}

#[async_trait]
impl AuditLogRepo for PgAuditLogRepo {
    async fn insert(&self, event: AuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, username, action, resource_type, resource_id, details,
                 ip_address, user_agent, status, error_message, timestamp)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(&event.username)
        .bind(&event.action)
        .bind(&event.resource_type)
        .bind(&event.resource_id)
        .bind(&event.details)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.status)
        .bind(&event.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, filter: &AuditLogFilter) -> Result<Page<AuditLog>> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM audit_logs");
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY timestamp DESC LIMIT ")
            .push_bind(filter.per_page)
            .push(" OFFSET ")
            .push_bind(filter.page * filter.per_page);

        let items = query
            .build_query_as::<AuditLog>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM audit_logs WHERE timestamp < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

//! `PostgreSQL` implementation of [`TicketRepository`].

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use tracing::Instrument;
use ticket_history_core::{
    HealthCheck, NewTicket, Page, ReadinessProbe, RepositoryFuture, Ticket, TicketError,
    TicketFilter, TicketId, TicketPatch, TicketRepository, TicketStatus,
};

const COLUMNS: &str = "id, session_id, client_id, operator_id, status, priority, region, \
                       subject, notes, created_at, updated_at, closed_at";

/// Ticket storage backed by a `tickets` table.
///
/// Filters compare case-insensitively through `lower(column) = lower($n)`,
/// which the migration backs with expression indexes. Column names only ever
/// come from the allow-list enums; caller values are always bound.
#[derive(Debug, Clone)]
pub struct PostgresTicketRepository {
    pool: PgPool,
}

impl PostgresTicketRepository {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i64,
    session_id: String,
    client_id: String,
    operator_id: String,
    status: String,
    priority: String,
    region: String,
    subject: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = TicketError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::parse(&row.status).map_err(|_| {
            TicketError::internal(format!("ticket {} has unknown status '{}'", row.id, row.status))
        })?;
        Ok(Self {
            id: TicketId::new(row.id),
            session_id: row.session_id,
            client_id: row.client_id,
            operator_id: row.operator_id,
            status,
            priority: row.priority,
            region: row.region,
            subject: row.subject,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn storage_error(operation: &'static str, error: sqlx::Error) -> TicketError {
    tracing::error!(operation, error = %error, "Ticket storage call failed");
    TicketError::internal(format!("{operation} failed: {error}"))
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    for (index, (column, value)) in filter.predicates().iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push("lower(");
        builder.push(column.column());
        builder.push(") = lower(");
        builder.push_bind(value.clone());
        builder.push(")");
    }
}

impl TicketRepository for PostgresTicketRepository {
    fn create<'a>(&'a self, ticket: &'a NewTicket) -> RepositoryFuture<'a, Ticket> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO tickets \
                 (session_id, client_id, operator_id, status, priority, region, subject, notes, closed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $9 THEN now() END) \
                 RETURNING {COLUMNS}"
            );
            let row: TicketRow = sqlx::query_as(&sql)
                .bind(&ticket.session_id)
                .bind(&ticket.client_id)
                .bind(&ticket.operator_id)
                .bind(ticket.status.as_str())
                .bind(&ticket.priority)
                .bind(&ticket.region)
                .bind(&ticket.subject)
                .bind(&ticket.notes)
                .bind(ticket.status.is_closed())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error("create", e))?;
            Ticket::try_from(row)
        }
        .instrument(tracing::debug_span!("tickets.create", client_id = %ticket.client_id)))
    }

    fn get(&self, id: TicketId) -> RepositoryFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let sql = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
            let row: Option<TicketRow> = sqlx::query_as(&sql)
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("get", e))?;
            row.map(Ticket::try_from).transpose()
        }
        .instrument(tracing::debug_span!("tickets.get", ticket_id = %id)))
    }

    fn list<'a>(&'a self, filter: &'a TicketFilter, page: Page) -> RepositoryFuture<'a, Vec<Ticket>> {
        Box::pin(async move {
            let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM tickets"));
            push_filter(&mut builder, filter);
            builder.push(" ORDER BY created_at DESC, id DESC");
            if let Some(limit) = page.limit {
                builder.push(" LIMIT ");
                builder.push_bind(i64::from(limit));
            }
            if page.offset > 0 {
                builder.push(" OFFSET ");
                builder.push_bind(i64::from(page.offset));
            }

            let rows: Vec<TicketRow> = builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| storage_error("list", e))?;
            rows.into_iter().map(Ticket::try_from).collect()
        }
        .instrument(tracing::debug_span!("tickets.list", predicates = filter.predicates().len(), limit = ?page.limit, offset = page.offset)))
    }

    fn count<'a>(&'a self, filter: &'a TicketFilter) -> RepositoryFuture<'a, u64> {
        Box::pin(async move {
            let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets");
            push_filter(&mut builder, filter);

            let (total,): (i64,) = builder
                .build_query_as()
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error("count", e))?;
            Ok(u64::try_from(total).unwrap_or(0))
        }
        .instrument(tracing::debug_span!("tickets.count", predicates = filter.predicates().len())))
    }

    fn update<'a>(&'a self, id: TicketId, patch: &'a TicketPatch) -> RepositoryFuture<'a, Option<Ticket>> {
        Box::pin(async move {
            let mut builder = QueryBuilder::<Postgres>::new(
                "UPDATE tickets SET updated_at = GREATEST(clock_timestamp(), updated_at + interval '1 microsecond')",
            );
            for (field, value) in patch.text_assignments() {
                builder.push(", ");
                builder.push(field.column());
                builder.push(" = ");
                builder.push_bind(value.to_owned());
            }
            if let Some(status) = patch.status {
                builder.push(", status = ");
                builder.push_bind(status.as_str());
                builder.push(if status.is_closed() {
                    ", closed_at = COALESCE(closed_at, clock_timestamp())"
                } else {
                    ", closed_at = NULL"
                });
            }
            builder.push(" WHERE id = ");
            builder.push_bind(id.get());
            builder.push(" RETURNING ");
            builder.push(COLUMNS);

            let row: Option<TicketRow> = builder
                .build_query_as()
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_error("update", e))?;
            row.map(Ticket::try_from).transpose()
        }
        .instrument(tracing::debug_span!("tickets.update", ticket_id = %id)))
    }
}

impl ReadinessProbe for PostgresTicketRepository {
    fn check(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = HealthCheck> + Send + '_>> {
        Box::pin(async move {
            match sqlx::query("SELECT 1").execute(&self.pool).await {
                Ok(_) => HealthCheck::healthy("database"),
                Err(error) => HealthCheck::unhealthy("database", error.to_string()),
            }
        })
    }
}

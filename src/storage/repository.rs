use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::domain::{
    Consumption, ConsumptionDetail, CreditType, CreditTypeId, CronMode, CronTask, DataType, Entity,
    EntityId, NewVoucher, Quantity, SearchCell, SearchOption, SearchRow, SearchValue, Ticket,
    TicketId, Voucher, VoucherId,
};

use super::{ConsumptionTotals, CreditStore, MIGRATION_001_HOST, TicketStore};

const INSERT_CONSUMPTION: &str = "INSERT INTO credit_tickets (voucher_id, ticket_id, consumed, created_at) VALUES (?, ?, ?, ?) RETURNING id";

const VOUCHER_COLUMNS: &str = "id, entity_id, name, type_id, quantity, is_active, begin_date, end_date, overconsumption_allowed, comment, created_at";

/// Result of a consumption that must stay within the voucher's credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoveredConsumption {
    Recorded(Consumption),
    Insufficient { remaining: Quantity },
}

/// Repository for persisting and querying credit data and the host records it hangs off.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create the host schema (entities, tickets, scheduled tasks).
    /// Credit tables are owned by the plugin and created on install.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_HOST)
            .execute(&self.pool)
            .await
            .context("Failed to run host migration")?;
        Ok(())
    }

    /// Initialize a database (connect + host migration).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns true when the plugin tables are present.
    pub async fn is_installed(&self) -> Result<bool> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) as count FROM sqlite_master WHERE type = 'table' AND name IN ('credit_types', 'credit_entities', 'credit_tickets')",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to inspect schema")?
        .get("count");
        Ok(count == 3)
    }

    // ========================
    // Entity and ticket operations
    // ========================

    pub async fn save_entity(&self, name: &str) -> Result<Entity> {
        let id: i64 = sqlx::query("INSERT INTO entities (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to save entity")?
            .get("id");
        Ok(Entity {
            id,
            name: name.to_string(),
        })
    }

    pub async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        let row = sqlx::query("SELECT id, name FROM entities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch entity")?;

        Ok(row.map(|row| Entity {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    pub async fn get_entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        let row = sqlx::query("SELECT id, name FROM entities WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch entity by name")?;

        Ok(row.map(|row| Entity {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    pub async fn list_entities(&self) -> Result<Vec<Entity>> {
        let rows = sqlx::query("SELECT id, name FROM entities ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entities")?;

        Ok(rows
            .iter()
            .map(|row| Entity {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    pub async fn save_ticket(
        &self,
        entity_id: EntityId,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Ticket> {
        let id: i64 = sqlx::query(
            "INSERT INTO tickets (entity_id, name, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(entity_id)
        .bind(name)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save ticket")?
        .get("id");

        Ok(Ticket {
            id,
            entity_id,
            name: name.to_string(),
            created_at,
        })
    }

    // ========================
    // Credit type operations
    // ========================

    pub async fn save_credit_type(&self, name: &str, comment: Option<&str>) -> Result<CreditType> {
        let id: i64 =
            sqlx::query("INSERT INTO credit_types (name, comment) VALUES (?, ?) RETURNING id")
                .bind(name)
                .bind(comment)
                .fetch_one(&self.pool)
                .await
                .context("Failed to save credit type")?
                .get("id");

        Ok(CreditType {
            id,
            name: name.to_string(),
            comment: comment.map(str::to_string),
        })
    }

    pub async fn get_credit_type(&self, id: CreditTypeId) -> Result<Option<CreditType>> {
        let row = sqlx::query("SELECT id, name, comment FROM credit_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credit type")?;

        Ok(row.map(|row| Self::row_to_credit_type(&row)))
    }

    pub async fn get_credit_type_by_name(&self, name: &str) -> Result<Option<CreditType>> {
        let row = sqlx::query("SELECT id, name, comment FROM credit_types WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credit type by name")?;

        Ok(row.map(|row| Self::row_to_credit_type(&row)))
    }

    pub async fn list_credit_types(&self) -> Result<Vec<CreditType>> {
        let rows = sqlx::query("SELECT id, name, comment FROM credit_types ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list credit types")?;

        Ok(rows.iter().map(Self::row_to_credit_type).collect())
    }

    fn row_to_credit_type(row: &sqlx::sqlite::SqliteRow) -> CreditType {
        CreditType {
            id: row.get("id"),
            name: row.get("name"),
            comment: row.get("comment"),
        }
    }

    // ========================
    // Voucher operations
    // ========================

    /// Save a new voucher and return it with its assigned id.
    pub async fn save_voucher(&self, voucher: NewVoucher) -> Result<Voucher> {
        let created_at = Utc::now();

        let id: i64 = sqlx::query(
            r#"
            INSERT INTO credit_entities (entity_id, name, type_id, quantity, is_active, begin_date, end_date, overconsumption_allowed, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(voucher.entity_id)
        .bind(&voucher.name)
        .bind(voucher.type_id)
        .bind(voucher.quantity)
        .bind(voucher.is_active)
        .bind(voucher.begin_date.map(|dt| dt.to_rfc3339()))
        .bind(voucher.end_date.map(|dt| dt.to_rfc3339()))
        .bind(voucher.overconsumption_allowed)
        .bind(&voucher.comment)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save voucher")?
        .get("id");

        Ok(voucher.into_voucher(id, created_at))
    }

    pub async fn get_voucher(&self, id: VoucherId) -> Result<Option<Voucher>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM credit_entities WHERE id = ?",
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch voucher")?;

        row.as_ref().map(Self::row_to_voucher).transpose()
    }

    pub async fn get_voucher_by_name(
        &self,
        entity_id: EntityId,
        name: &str,
    ) -> Result<Option<Voucher>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM credit_entities WHERE entity_id = ? AND name = ?",
            VOUCHER_COLUMNS
        ))
        .bind(entity_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch voucher by name")?;

        row.as_ref().map(Self::row_to_voucher).transpose()
    }

    /// List vouchers, optionally restricted to one entity.
    pub async fn list_vouchers(
        &self,
        entity_id: Option<EntityId>,
        include_inactive: bool,
    ) -> Result<Vec<Voucher>> {
        let mut query = format!("SELECT {} FROM credit_entities WHERE 1=1", VOUCHER_COLUMNS);
        if entity_id.is_some() {
            query.push_str(" AND entity_id = ?");
        }
        if !include_inactive {
            query.push_str(" AND is_active = 1");
        }
        query.push_str(" ORDER BY entity_id, name");

        let mut sql_query = sqlx::query(&query);
        if let Some(id) = entity_id {
            sql_query = sql_query.bind(id);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list vouchers")?;

        rows.iter().map(Self::row_to_voucher).collect()
    }

    /// Active vouchers that carry an end date, candidates for expiration.
    pub async fn list_active_dated_vouchers(&self) -> Result<Vec<Voucher>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM credit_entities WHERE is_active = 1 AND end_date IS NOT NULL ORDER BY id",
            VOUCHER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list dated vouchers")?;

        rows.iter().map(Self::row_to_voucher).collect()
    }

    pub async fn set_voucher_active(&self, id: VoucherId, active: bool) -> Result<()> {
        sqlx::query("UPDATE credit_entities SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update voucher state")?;
        Ok(())
    }

    fn row_to_voucher(row: &sqlx::sqlite::SqliteRow) -> Result<Voucher> {
        let begin_date: Option<String> = row.get("begin_date");
        let end_date: Option<String> = row.get("end_date");
        let created_at: String = row.get("created_at");

        Ok(Voucher {
            id: row.get("id"),
            entity_id: row.get("entity_id"),
            name: row.get("name"),
            type_id: row.get("type_id"),
            quantity: row.get("quantity"),
            is_active: row.get::<i32, _>("is_active") != 0,
            begin_date: begin_date
                .map(|s| parse_timestamp(&s))
                .transpose()
                .context("Invalid begin_date timestamp")?,
            end_date: end_date
                .map(|s| parse_timestamp(&s))
                .transpose()
                .context("Invalid end_date timestamp")?,
            overconsumption_allowed: row.get::<i32, _>("overconsumption_allowed") != 0,
            comment: row.get("comment"),
            created_at: parse_timestamp(&created_at).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Consumption operations
    // ========================

    pub async fn save_consumption(
        &self,
        voucher_id: VoucherId,
        ticket_id: TicketId,
        consumed: Quantity,
        created_at: DateTime<Utc>,
    ) -> Result<Consumption> {
        let id: i64 = sqlx::query(INSERT_CONSUMPTION)
            .bind(voucher_id)
            .bind(ticket_id)
            .bind(consumed)
            .bind(created_at.to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .context("Failed to save consumption")?
            .get("id");

        Ok(Consumption {
            id,
            voucher_id,
            ticket_id,
            consumed,
            created_at,
        })
    }

    /// Save a consumption only if the voucher still covers it.
    ///
    /// The remaining check and the insert share one `BEGIN IMMEDIATE`
    /// transaction, so concurrent writers are serialized on the database
    /// write lock and cannot spend the same credit twice.
    pub async fn save_consumption_within_credit(
        &self,
        voucher_id: VoucherId,
        ticket_id: TicketId,
        consumed: Quantity,
        created_at: DateTime<Utc>,
    ) -> Result<CoveredConsumption> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .context("Failed to lock database for consumption")?;

        let outcome =
            Self::insert_if_covered(&mut conn, voucher_id, ticket_id, consumed, created_at).await;

        let end = match outcome {
            Ok(CoveredConsumption::Recorded(_)) => "COMMIT",
            _ => "ROLLBACK",
        };
        sqlx::query(end)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to {} consumption", end.to_lowercase()))?;

        if let Ok(CoveredConsumption::Insufficient { remaining }) = &outcome {
            debug!(voucher_id, remaining, consumed, "consumption refused");
        }
        outcome
    }

    async fn insert_if_covered(
        conn: &mut SqliteConnection,
        voucher_id: VoucherId,
        ticket_id: TicketId,
        consumed: Quantity,
        created_at: DateTime<Utc>,
    ) -> Result<CoveredConsumption> {
        let remaining: Quantity = sqlx::query(
            r#"
            SELECT v.quantity - COALESCE(
                (SELECT SUM(c.consumed) FROM credit_tickets c WHERE c.voucher_id = v.id), 0
            ) AS remaining
            FROM credit_entities v
            WHERE v.id = ?
            "#,
        )
        .bind(voucher_id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to compute remaining credit")?
        .get("remaining");

        if remaining < consumed {
            return Ok(CoveredConsumption::Insufficient { remaining });
        }

        let id: i64 = sqlx::query(INSERT_CONSUMPTION)
            .bind(voucher_id)
            .bind(ticket_id)
            .bind(consumed)
            .bind(created_at.to_rfc3339())
            .fetch_one(&mut *conn)
            .await
            .context("Failed to save consumption")?
            .get("id");

        Ok(CoveredConsumption::Recorded(Consumption {
            id,
            voucher_id,
            ticket_id,
            consumed,
            created_at,
        }))
    }

    /// Consumptions charged to a ticket, with the voucher they were taken from.
    pub async fn list_consumptions_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Result<Vec<ConsumptionDetail>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.voucher_id, c.ticket_id, c.consumed, c.created_at, v.name as voucher_name
            FROM credit_tickets c
            JOIN credit_entities v ON v.id = c.voucher_id
            WHERE c.ticket_id = ?
            ORDER BY c.id
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list consumptions for ticket")?;

        rows.iter()
            .map(|row| {
                Ok(ConsumptionDetail {
                    consumption: Self::row_to_consumption(row)?,
                    voucher_name: row.get("voucher_name"),
                })
            })
            .collect()
    }

    pub async fn list_consumptions_for_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Vec<Consumption>> {
        let rows = sqlx::query(
            r#"
            SELECT id, voucher_id, ticket_id, consumed, created_at
            FROM credit_tickets
            WHERE voucher_id = ?
            ORDER BY id
            "#,
        )
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list consumptions for voucher")?;

        rows.iter().map(Self::row_to_consumption).collect()
    }

    /// Total consumed from a voucher by every ticket.
    pub async fn sum_consumed(&self, voucher_id: VoucherId) -> Result<Quantity> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(consumed), 0) as total FROM credit_tickets WHERE voucher_id = ?",
        )
        .bind(voucher_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum consumption")?;

        Ok(row.get("total"))
    }

    /// Total consumed per voucher of an entity, in a single query.
    /// Vouchers without consumption are absent from the map.
    pub async fn consumed_totals_for_entity(
        &self,
        entity_id: EntityId,
    ) -> Result<HashMap<VoucherId, Quantity>> {
        let rows = sqlx::query(
            r#"
            SELECT c.voucher_id, SUM(c.consumed) as total
            FROM credit_tickets c
            JOIN credit_entities v ON v.id = c.voucher_id
            WHERE v.entity_id = ?
            GROUP BY c.voucher_id
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute consumed totals")?;

        Ok(rows
            .iter()
            .map(|row| (row.get("voucher_id"), row.get("total")))
            .collect())
    }

    fn row_to_consumption(row: &sqlx::sqlite::SqliteRow) -> Result<Consumption> {
        let created_at: String = row.get("created_at");

        Ok(Consumption {
            id: row.get("id"),
            voucher_id: row.get("voucher_id"),
            ticket_id: row.get("ticket_id"),
            consumed: row.get("consumed"),
            created_at: parse_timestamp(&created_at).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Scheduled task operations
    // ========================

    /// Register a task, updating frequency and mode if it already exists.
    pub async fn register_cron_task(&self, task: &CronTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cron_tasks (itemtype, name, frequency_secs, mode, comment, last_run)
            VALUES (?, ?, ?, ?, ?, NULL)
            ON CONFLICT (itemtype, name) DO UPDATE SET
                frequency_secs = excluded.frequency_secs,
                mode = excluded.mode,
                comment = excluded.comment
            "#,
        )
        .bind(&task.itemtype)
        .bind(&task.name)
        .bind(task.frequency_secs)
        .bind(task.mode.as_str())
        .bind(&task.comment)
        .execute(&self.pool)
        .await
        .context("Failed to register cron task")?;
        Ok(())
    }

    /// Remove every task owned by an item type. Returns the number removed.
    pub async fn unregister_cron_tasks(&self, itemtype: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cron_tasks WHERE itemtype = ?")
            .bind(itemtype)
            .execute(&self.pool)
            .await
            .context("Failed to unregister cron tasks")?;
        Ok(result.rows_affected())
    }

    pub async fn get_cron_task(&self, name: &str) -> Result<Option<CronTask>> {
        let row = sqlx::query(
            "SELECT itemtype, name, frequency_secs, mode, comment, last_run FROM cron_tasks WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch cron task")?;

        row.as_ref().map(Self::row_to_cron_task).transpose()
    }

    pub async fn list_cron_tasks(&self) -> Result<Vec<CronTask>> {
        let rows = sqlx::query(
            "SELECT itemtype, name, frequency_secs, mode, comment, last_run FROM cron_tasks ORDER BY itemtype, name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cron tasks")?;

        rows.iter().map(Self::row_to_cron_task).collect()
    }

    pub async fn mark_cron_task_run(&self, name: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE cron_tasks SET last_run = ? WHERE name = ?")
            .bind(at.to_rfc3339())
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to record cron run")?;
        Ok(())
    }

    fn row_to_cron_task(row: &sqlx::sqlite::SqliteRow) -> Result<CronTask> {
        let mode: String = row.get("mode");
        let last_run: Option<String> = row.get("last_run");

        Ok(CronTask {
            itemtype: row.get("itemtype"),
            name: row.get("name"),
            frequency_secs: row.get("frequency_secs"),
            mode: CronMode::from_str(&mode)
                .ok_or_else(|| anyhow::anyhow!("Invalid cron mode: {}", mode))?,
            comment: row.get("comment"),
            last_run: last_run
                .map(|s| parse_timestamp(&s))
                .transpose()
                .context("Invalid last_run timestamp")?,
        })
    }

    // ========================
    // Search
    // ========================

    /// Run a composed search query for one item and decode each column by its datatype.
    pub async fn run_search(
        &self,
        sql: &str,
        item_id: i64,
        options: &[SearchOption],
    ) -> Result<Vec<SearchRow>> {
        debug!(%sql, item_id, "running search");

        let rows = sqlx::query(sql)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to run search")?;

        rows.iter()
            .map(|row| {
                let cells = options
                    .iter()
                    .map(|option| {
                        let alias = option.column_alias();
                        let value = match option.datatype {
                            DataType::Date => row
                                .try_get::<Option<String>, _>(alias.as_str())?
                                .map(|s| parse_timestamp(&s))
                                .transpose()?
                                .map_or(SearchValue::Null, SearchValue::Date),
                            DataType::Decimal { .. } => row
                                .try_get::<Option<i64>, _>(alias.as_str())?
                                .map_or(SearchValue::Null, SearchValue::Decimal),
                            DataType::Dropdown => row
                                .try_get::<Option<String>, _>(alias.as_str())?
                                .map_or(SearchValue::Null, SearchValue::Text),
                        };
                        Ok(SearchCell {
                            option_id: option.id,
                            value,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(SearchRow { cells })
            })
            .collect()
    }
}

impl TicketStore for Repository {
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query("SELECT id, entity_id, name, created_at FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch ticket")?;

        match row {
            Some(row) => {
                let created_at: String = row.get("created_at");
                Ok(Some(Ticket {
                    id: row.get("id"),
                    entity_id: row.get("entity_id"),
                    name: row.get("name"),
                    created_at: parse_timestamp(&created_at)
                        .context("Invalid created_at timestamp")?,
                }))
            }
            None => Ok(None),
        }
    }
}

impl CreditStore for Repository {
    async fn active_vouchers_for_entity(&self, entity_id: EntityId) -> Result<Vec<Voucher>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM credit_entities WHERE is_active = 1 AND entity_id = ? ORDER BY name",
            VOUCHER_COLUMNS
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list active vouchers")?;

        rows.iter().map(Self::row_to_voucher).collect()
    }

    async fn consumption_totals(
        &self,
        entity_id: EntityId,
        ticket_id: TicketId,
    ) -> Result<HashMap<VoucherId, ConsumptionTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.voucher_id,
                COALESCE(SUM(CASE WHEN c.ticket_id = ? THEN c.consumed ELSE 0 END), 0) as on_ticket,
                COALESCE(SUM(c.consumed), 0) as total
            FROM credit_tickets c
            JOIN credit_entities v ON v.id = c.voucher_id
            WHERE v.entity_id = ?
            GROUP BY c.voucher_id
            "#,
        )
        .bind(ticket_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute consumption totals")?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get("voucher_id"),
                    ConsumptionTotals {
                        on_ticket: row.get("on_ticket"),
                        total: row.get("total"),
                    },
                )
            })
            .collect())
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

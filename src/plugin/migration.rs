use std::borrow::Cow;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// One schema change, executed as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub description: String,
    pub sql: Cow<'static, str>,
}

/// Ordered batch of schema changes collected from the installable modules
/// and applied in a single transaction.
#[derive(Debug, Clone)]
pub struct Migration {
    version: String,
    steps: Vec<MigrationStep>,
}

impl Migration {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            steps: Vec::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Queue raw SQL (one or more statements).
    pub fn add_sql(&mut self, description: impl Into<String>, sql: &'static str) {
        self.steps.push(MigrationStep {
            description: description.into(),
            sql: Cow::Borrowed(sql),
        });
    }

    pub fn drop_table(&mut self, table: &str) {
        self.steps.push(MigrationStep {
            description: format!("drop table {}", table),
            sql: Cow::Owned(format!("DROP TABLE IF EXISTS {}", table)),
        });
    }

    /// Apply every queued step. Nothing is applied if one step fails.
    pub async fn execute(&self, pool: &SqlitePool) -> Result<()> {
        if self.is_empty() {
            debug!(version = %self.version, "migration has no steps");
            return Ok(());
        }

        let mut tx = pool
            .begin()
            .await
            .context("Failed to start migration transaction")?;

        for step in &self.steps {
            debug!(version = %self.version, step = %step.description, "applying migration step");
            sqlx::query(step.sql.as_ref())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Migration step failed: {}", step.description))?;
        }

        tx.commit()
            .await
            .context("Failed to commit migration")?;

        info!(
            version = %self.version,
            steps = self.steps.len(),
            "migration applied"
        );
        Ok(())
    }
}

//! Plugin lifecycle: schema install/uninstall and scheduled task registration.
//!
//! Every module owning tables implements [`Installable`] and is listed in
//! [`MODULES`]. Install walks the list in order, uninstall in reverse, so a
//! table is always created after and dropped before the tables it references.

mod migration;

pub use migration::*;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::domain::{CronMode, CronTask, DAY_SECS, tables};
use crate::storage::{
    MIGRATION_002_CREDIT_TYPES, MIGRATION_003_VOUCHERS, MIGRATION_004_CONSUMPTIONS, Repository,
};

pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Item type the plugin's scheduled tasks are registered under.
pub const CRON_ITEMTYPE: &str = "CreditVoucher";

/// Daily task deactivating vouchers past their end date.
pub const CRON_CREDIT_EXPIRED: &str = "creditexpired";

/// A module that may contribute schema changes on install and uninstall.
/// Both hooks are optional.
pub trait Installable: Sync {
    fn name(&self) -> &'static str;

    fn install(&self, _migration: &mut Migration) {}

    fn uninstall(&self, _migration: &mut Migration) {}
}

pub struct CreditTypeModule;

impl Installable for CreditTypeModule {
    fn name(&self) -> &'static str {
        "credit types"
    }

    fn install(&self, migration: &mut Migration) {
        migration.add_sql("create credit_types", MIGRATION_002_CREDIT_TYPES);
    }

    fn uninstall(&self, migration: &mut Migration) {
        migration.drop_table(tables::CREDIT_TYPES);
    }
}

pub struct VoucherModule;

impl Installable for VoucherModule {
    fn name(&self) -> &'static str {
        "vouchers"
    }

    fn install(&self, migration: &mut Migration) {
        migration.add_sql("create credit_entities", MIGRATION_003_VOUCHERS);
    }

    fn uninstall(&self, migration: &mut Migration) {
        migration.drop_table(tables::VOUCHERS);
    }
}

pub struct ConsumptionModule;

impl Installable for ConsumptionModule {
    fn name(&self) -> &'static str {
        "consumptions"
    }

    fn install(&self, migration: &mut Migration) {
        migration.add_sql("create credit_tickets", MIGRATION_004_CONSUMPTIONS);
    }

    fn uninstall(&self, migration: &mut Migration) {
        migration.drop_table(tables::CONSUMPTIONS);
    }
}

/// Installable modules, in dependency order.
pub static MODULES: &[&dyn Installable] = &[&CreditTypeModule, &VoucherModule, &ConsumptionModule];

/// Scheduled tasks registered on install.
pub fn cron_tasks() -> Vec<CronTask> {
    let mut expired = CronTask::new(
        CRON_ITEMTYPE,
        CRON_CREDIT_EXPIRED,
        DAY_SECS,
        CronMode::External,
    );
    expired.comment = "Deactivate vouchers past their end date".to_string();
    vec![expired]
}

/// Build the install migration from every registered module.
pub fn install_migration(modules: &[&dyn Installable]) -> Migration {
    let mut migration = Migration::new(PLUGIN_VERSION);
    for module in modules {
        debug!(module = module.name(), "collecting install steps");
        module.install(&mut migration);
    }
    migration
}

/// Build the uninstall migration, walking modules in reverse order.
pub fn uninstall_migration(modules: &[&dyn Installable]) -> Migration {
    let mut migration = Migration::new(PLUGIN_VERSION);
    for module in modules.iter().rev() {
        debug!(module = module.name(), "collecting uninstall steps");
        module.uninstall(&mut migration);
    }
    migration
}

/// Create the plugin tables and register its scheduled tasks.
/// Running it on an installed database changes nothing.
#[instrument(skip(repo))]
pub async fn install(repo: &Repository) -> Result<()> {
    install_migration(MODULES).execute(repo.pool()).await?;

    for task in cron_tasks() {
        repo.register_cron_task(&task).await?;
        info!(task = %task.name, mode = %task.mode, "registered cron task");
    }

    info!(version = PLUGIN_VERSION, "plugin installed");
    Ok(())
}

/// Drop the plugin tables and unregister its scheduled tasks.
#[instrument(skip(repo))]
pub async fn uninstall(repo: &Repository) -> Result<()> {
    uninstall_migration(MODULES).execute(repo.pool()).await?;

    let removed = repo.unregister_cron_tasks(CRON_ITEMTYPE).await?;
    info!(removed, "unregistered cron tasks");

    info!(version = PLUGIN_VERSION, "plugin uninstalled");
    Ok(())
}

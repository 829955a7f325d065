use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::domain::{
    Consumption, ConsumptionDetail, CreditType, CronTask, Entity, EntityId, ItemType, NewVoucher,
    Quantity, SearchRow, Ticket, TicketId, Voucher, VoucherId, format_quantity,
};
use crate::plugin::{self, CRON_CREDIT_EXPIRED};
use crate::storage::{CoveredConsumption, Repository, TicketStore};

use super::{
    AppError, BalanceLine, BalanceReporter, CronRun, NotificationData, TicketReport,
    VoucherBalance, add_credit_data, compose_search_query, notification::TAG_TICKET_ID,
};

/// Application service providing the credit operations.
/// This is the primary interface for any client (CLI, host integration, tests).
pub struct CreditService {
    repo: Repository,
}

impl CreditService {
    /// Create a new credit service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create the database if needed and install the plugin schema.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        plugin::install(&repo).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database with the credit tables installed.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let service = Self::open(database_path).await?;
        if !service.repo.is_installed().await? {
            warn!(database = database_path, "credit tables missing");
            return Err(AppError::NotInstalled(database_path.to_string()));
        }
        Ok(service)
    }

    /// Connect to an existing database whatever its install state.
    pub async fn open(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Install (or reinstall) the plugin schema and scheduled tasks.
    pub async fn install(&self) -> Result<(), AppError> {
        Ok(plugin::install(&self.repo).await?)
    }

    /// Drop the plugin schema and scheduled tasks. Host tables are kept.
    pub async fn uninstall(&self) -> Result<(), AppError> {
        Ok(plugin::uninstall(&self.repo).await?)
    }

    // ========================
    // Entity and ticket operations
    // ========================

    #[instrument(skip(self))]
    pub async fn create_entity(&self, name: &str) -> Result<Entity, AppError> {
        if self.repo.get_entity_by_name(name).await?.is_some() {
            return Err(AppError::EntityAlreadyExists(name.to_string()));
        }
        let entity = self.repo.save_entity(name).await?;
        info!(entity_id = entity.id, "created entity");
        Ok(entity)
    }

    pub async fn get_entity(&self, id: EntityId) -> Result<Entity, AppError> {
        self.repo
            .get_entity(id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound(id.to_string()))
    }

    pub async fn list_entities(&self) -> Result<Vec<Entity>, AppError> {
        Ok(self.repo.list_entities().await?)
    }

    #[instrument(skip(self))]
    pub async fn create_ticket(&self, entity_id: EntityId, name: &str) -> Result<Ticket, AppError> {
        self.get_entity(entity_id).await?;
        let ticket = self.repo.save_ticket(entity_id, name, Utc::now()).await?;
        info!(ticket_id = ticket.id, "created ticket");
        Ok(ticket)
    }

    pub async fn get_ticket(&self, id: TicketId) -> Result<Ticket, AppError> {
        self.repo
            .get_ticket(id)
            .await?
            .ok_or(AppError::TicketNotFound(id))
    }

    // ========================
    // Credit type operations
    // ========================

    #[instrument(skip(self))]
    pub async fn create_credit_type(
        &self,
        name: &str,
        comment: Option<&str>,
    ) -> Result<CreditType, AppError> {
        if self.repo.get_credit_type_by_name(name).await?.is_some() {
            return Err(AppError::CreditTypeAlreadyExists(name.to_string()));
        }
        Ok(self.repo.save_credit_type(name, comment).await?)
    }

    pub async fn list_credit_types(&self) -> Result<Vec<CreditType>, AppError> {
        Ok(self.repo.list_credit_types().await?)
    }

    // ========================
    // Voucher operations
    // ========================

    /// Create a voucher after validating entity, quantity, name, type and period.
    #[instrument(skip(self, voucher), fields(entity_id = voucher.entity_id, name = %voucher.name))]
    pub async fn create_voucher(&self, voucher: NewVoucher) -> Result<Voucher, AppError> {
        if voucher.quantity <= 0 {
            return Err(AppError::InvalidQuantity(
                "Voucher quantity must be positive".to_string(),
            ));
        }

        self.get_entity(voucher.entity_id).await?;

        if let Some(type_id) = voucher.type_id {
            if self.repo.get_credit_type(type_id).await?.is_none() {
                return Err(AppError::CreditTypeNotFound(type_id));
            }
        }

        if let (Some(begin), Some(end)) = (voucher.begin_date, voucher.end_date) {
            if end < begin {
                return Err(AppError::InvalidPeriod { begin, end });
            }
        }

        if self
            .repo
            .get_voucher_by_name(voucher.entity_id, &voucher.name)
            .await?
            .is_some()
        {
            return Err(AppError::VoucherAlreadyExists {
                name: voucher.name,
                entity_id: voucher.entity_id,
            });
        }

        let voucher = self.repo.save_voucher(voucher).await?;
        info!(
            voucher_id = voucher.id,
            quantity = %format_quantity(voucher.quantity),
            "created voucher"
        );
        Ok(voucher)
    }

    pub async fn get_voucher(&self, id: VoucherId) -> Result<Voucher, AppError> {
        self.repo
            .get_voucher(id)
            .await?
            .ok_or(AppError::VoucherNotFound(id))
    }

    pub async fn list_vouchers(
        &self,
        entity_id: Option<EntityId>,
        include_inactive: bool,
    ) -> Result<Vec<Voucher>, AppError> {
        Ok(self.repo.list_vouchers(entity_id, include_inactive).await?)
    }

    /// Activate or deactivate a voucher. Returns the updated voucher.
    #[instrument(skip(self))]
    pub async fn set_voucher_active(&self, id: VoucherId, active: bool) -> Result<Voucher, AppError> {
        let mut voucher = self.get_voucher(id).await?;
        self.repo.set_voucher_active(id, active).await?;
        voucher.is_active = active;
        info!(voucher_id = id, active, "voucher state changed");
        Ok(voucher)
    }

    /// Voucher with its consumption summed over every ticket.
    pub async fn get_voucher_balance(&self, id: VoucherId) -> Result<VoucherBalance, AppError> {
        let voucher = self.get_voucher(id).await?;
        let consumed = self.repo.sum_consumed(id).await?;
        Ok(VoucherBalance {
            remaining: voucher.remaining(consumed),
            voucher,
            consumed,
        })
    }

    /// Balances of every voucher of an entity.
    pub async fn entity_balances(
        &self,
        entity_id: EntityId,
        include_inactive: bool,
    ) -> Result<Vec<VoucherBalance>, AppError> {
        self.get_entity(entity_id).await?;
        let vouchers = self
            .repo
            .list_vouchers(Some(entity_id), include_inactive)
            .await?;
        let totals = self.repo.consumed_totals_for_entity(entity_id).await?;

        Ok(vouchers
            .into_iter()
            .map(|voucher| {
                let consumed = totals.get(&voucher.id).copied().unwrap_or(0);
                VoucherBalance {
                    remaining: voucher.remaining(consumed),
                    voucher,
                    consumed,
                }
            })
            .collect())
    }

    // ========================
    // Consumption operations
    // ========================

    /// Charge `amount` of a voucher to a ticket.
    ///
    /// `force` bypasses the remaining-credit check for vouchers that do not
    /// allow overconsumption; every other check still applies.
    #[instrument(skip(self))]
    pub async fn record_consumption(
        &self,
        voucher_id: VoucherId,
        ticket_id: TicketId,
        amount: Quantity,
        force: bool,
    ) -> Result<Consumption, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidQuantity(
                "Consumed quantity must be positive".to_string(),
            ));
        }

        let voucher = self.get_voucher(voucher_id).await?;
        if !voucher.is_active {
            return Err(AppError::VoucherInactive(voucher.name));
        }

        let now = Utc::now();
        if !voucher.is_in_period(now) {
            return Err(AppError::VoucherOutOfPeriod {
                name: voucher.name,
                at: now,
                begin_date: voucher.begin_date,
                end_date: voucher.end_date,
            });
        }

        let ticket = self.get_ticket(ticket_id).await?;
        if ticket.entity_id != voucher.entity_id {
            return Err(AppError::EntityMismatch {
                ticket_id,
                ticket_entity: ticket.entity_id,
                voucher_name: voucher.name,
                voucher_entity: voucher.entity_id,
            });
        }

        let consumption = if voucher.overconsumption_allowed || force {
            self.repo
                .save_consumption(voucher_id, ticket_id, amount, now)
                .await?
        } else {
            match self
                .repo
                .save_consumption_within_credit(voucher_id, ticket_id, amount, now)
                .await?
            {
                CoveredConsumption::Recorded(consumption) => consumption,
                CoveredConsumption::Insufficient { remaining } => {
                    return Err(AppError::InsufficientCredit {
                        voucher_name: voucher.name,
                        remaining,
                        required: amount,
                    });
                }
            }
        };
        info!(
            consumption_id = consumption.id,
            consumed = %format_quantity(amount),
            "recorded consumption"
        );
        Ok(consumption)
    }

    pub async fn list_consumptions_for_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Result<Vec<ConsumptionDetail>, AppError> {
        self.get_ticket(ticket_id).await?;
        Ok(self.repo.list_consumptions_for_ticket(ticket_id).await?)
    }

    pub async fn list_consumptions_for_voucher(
        &self,
        voucher_id: VoucherId,
    ) -> Result<Vec<Consumption>, AppError> {
        self.get_voucher(voucher_id).await?;
        Ok(self.repo.list_consumptions_for_voucher(voucher_id).await?)
    }

    // ========================
    // Reporting
    // ========================

    /// Remaining credit on each active voucher of the ticket's entity.
    pub async fn report(&self, ticket_id: TicketId) -> Result<Vec<BalanceLine>, AppError> {
        BalanceReporter::new(&self.repo, &self.repo)
            .report(ticket_id)
            .await
    }

    /// Same as [`Self::report`], with the ticket's entity and a timestamp.
    pub async fn ticket_report(&self, ticket_id: TicketId) -> Result<TicketReport, AppError> {
        let ticket = self.get_ticket(ticket_id).await?;
        let lines = self.report(ticket_id).await?;
        Ok(TicketReport {
            ticket_id,
            entity_id: ticket.entity_id,
            generated_at: Utc::now(),
            lines,
        })
    }

    /// Placeholder values for a ticket notification.
    pub async fn notification_data(
        &self,
        ticket_id: TicketId,
    ) -> Result<NotificationData, AppError> {
        let lines = self.report(ticket_id).await?;
        let mut data = NotificationData::default();
        data.set_tag(TAG_TICKET_ID, ticket_id.to_string());
        add_credit_data(&mut data, &lines);
        Ok(data)
    }

    /// Credit columns of the search results for one ticket or entity,
    /// one row per consumption.
    pub async fn search(&self, item_type: ItemType, item_id: i64) -> Result<Vec<SearchRow>, AppError> {
        let sql = compose_search_query(item_type);
        Ok(self
            .repo
            .run_search(&sql, item_id, item_type.search_options())
            .await?)
    }

    // ========================
    // Scheduled tasks
    // ========================

    pub async fn list_cron_tasks(&self) -> Result<Vec<CronTask>, AppError> {
        Ok(self.repo.list_cron_tasks().await?)
    }

    /// Run a registered task by name and stamp its last run.
    #[instrument(skip(self))]
    pub async fn run_cron_task(&self, name: &str, now: DateTime<Utc>) -> Result<CronRun, AppError> {
        if self.repo.get_cron_task(name).await?.is_none() {
            return Err(AppError::UnknownCronTask(name.to_string()));
        }

        let expired = match name {
            CRON_CREDIT_EXPIRED => self.expire_vouchers(now).await?,
            _ => return Err(AppError::UnknownCronTask(name.to_string())),
        };

        self.repo.mark_cron_task_run(name, now).await?;
        Ok(CronRun {
            task: name.to_string(),
            ran_at: now,
            expired,
        })
    }

    /// Deactivate every active voucher whose end date is before `now`.
    pub async fn expire_vouchers(&self, now: DateTime<Utc>) -> Result<Vec<Voucher>, AppError> {
        let mut expired = Vec::new();
        for mut voucher in self.repo.list_active_dated_vouchers().await? {
            if !voucher.is_expired(now) {
                continue;
            }
            self.repo.set_voucher_active(voucher.id, false).await?;
            voucher.is_active = false;
            info!(voucher_id = voucher.id, name = %voucher.name, "voucher expired");
            expired.push(voucher);
        }
        Ok(expired)
    }
}

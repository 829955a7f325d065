use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::application::{CreditService, VoucherBalance};
use crate::domain::{
    ItemType, NewVoucher, SEARCH_GROUP_LABEL, SearchValue, format_quantity, parse_quantity,
};

/// Credit - prepaid support vouchers consumed by tickets
#[derive(Parser)]
#[command(name = "credit")]
#[command(about = "Track prepaid credit vouchers consumed by support tickets")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CREDIT_DATABASE", default_value = "credit.db")]
    pub database: String,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and install the credit tables
    Init,

    /// Drop the credit tables and scheduled tasks
    Uninstall,

    /// Entity management commands
    #[command(subcommand)]
    Entity(EntityCommands),

    /// Ticket management commands
    #[command(subcommand)]
    Ticket(TicketCommands),

    /// Credit type management commands
    #[command(subcommand)]
    Type(TypeCommands),

    /// Voucher management commands
    #[command(subcommand)]
    Voucher(VoucherCommands),

    /// Charge a quantity of a voucher to a ticket
    Consume {
        /// Quantity to consume (e.g., "1.25" or "2")
        amount: String,

        /// Voucher ID
        #[arg(long)]
        voucher: i64,

        /// Ticket ID
        #[arg(long)]
        ticket: i64,

        /// Consume even if the voucher does not have enough credit left
        #[arg(long)]
        force: bool,
    },

    /// List consumptions of a ticket or a voucher
    Consumptions {
        /// Ticket ID
        #[arg(long, conflicts_with = "voucher", required_unless_present = "voucher")]
        ticket: Option<i64>,

        /// Voucher ID
        #[arg(long)]
        voucher: Option<i64>,
    },

    /// Remaining credit of the active vouchers available to a ticket
    Report {
        /// Ticket ID
        ticket: i64,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Voucher balances of an entity
    Balance {
        /// Entity ID
        entity: i64,

        /// Include inactive vouchers
        #[arg(long)]
        all: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print the notification placeholders of a ticket as JSON
    Notify {
        /// Ticket ID
        ticket: i64,
    },

    /// Credit columns of the search results for a ticket or entity
    Search {
        /// Item type: ticket, entity
        item_type: String,

        /// Item ID
        id: i64,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Scheduled task commands
    #[command(subcommand)]
    Cron(CronCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: balances, consumptions, full
        export_type: String,

        /// Restrict balances to one entity
        #[arg(long)]
        entity: Option<i64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Create a new entity
    Create {
        /// Entity name (must be unique)
        name: String,
    },

    /// List all entities
    List,
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Open a ticket in an entity
    Create {
        /// Ticket title
        name: String,

        /// Owning entity ID
        #[arg(long)]
        entity: i64,
    },

    /// Show a ticket and its consumptions
    Show {
        /// Ticket ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TypeCommands {
    /// Create a new credit type
    Create {
        /// Type name (must be unique)
        name: String,

        /// Comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// List all credit types
    List,
}

#[derive(Subcommand)]
pub enum VoucherCommands {
    /// Grant a new voucher to an entity
    Create {
        /// Voucher name (unique within the entity)
        name: String,

        /// Owning entity ID
        #[arg(long)]
        entity: i64,

        /// Quantity granted (e.g., "100" or "37.5")
        #[arg(short, long)]
        quantity: String,

        /// Credit type ID
        #[arg(short = 't', long = "type")]
        type_id: Option<i64>,

        /// First day of validity (YYYY-MM-DD)
        #[arg(long)]
        begin: Option<String>,

        /// Last day of validity (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Allow consumption beyond the granted quantity
        #[arg(long)]
        allow_overconsumption: bool,

        /// Create the voucher inactive
        #[arg(long)]
        inactive: bool,

        /// Comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// List vouchers
    List {
        /// Filter by entity ID
        #[arg(long)]
        entity: Option<i64>,

        /// Include inactive vouchers
        #[arg(long)]
        all: bool,
    },

    /// Show detailed voucher information
    Show {
        /// Voucher ID
        id: i64,
    },

    /// Activate a voucher
    Activate {
        /// Voucher ID
        id: i64,
    },

    /// Deactivate a voucher
    Deactivate {
        /// Voucher ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CronCommands {
    /// List registered scheduled tasks
    List,

    /// Run a scheduled task now
    Run {
        /// Task name (e.g., creditexpired)
        name: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                CreditService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Uninstall => {
                let service = CreditService::open(&self.database).await?;
                service.uninstall().await?;
                println!("Credit tables removed from {}", self.database);
            }

            Commands::Entity(cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_entity_command(&service, cmd).await?;
            }

            Commands::Ticket(cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_ticket_command(&service, cmd).await?;
            }

            Commands::Type(cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_type_command(&service, cmd).await?;
            }

            Commands::Voucher(cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_voucher_command(&service, cmd).await?;
            }

            Commands::Consume {
                amount,
                voucher,
                ticket,
                force,
            } => {
                let service = CreditService::connect(&self.database).await?;
                let amount = parse_quantity(&amount)
                    .context("Invalid quantity format. Use '1.25' or '2'")?;

                let consumption = service
                    .record_consumption(voucher, ticket, amount, force)
                    .await?;
                let balance = service.get_voucher_balance(voucher).await?;

                println!(
                    "Consumed {} of '{}' on ticket {} ({} remaining)",
                    format_quantity(consumption.consumed),
                    balance.voucher.name,
                    consumption.ticket_id,
                    format_quantity(balance.remaining)
                );
            }

            Commands::Consumptions { ticket, voucher } => {
                let service = CreditService::connect(&self.database).await?;
                run_consumptions_command(&service, ticket, voucher).await?;
            }

            Commands::Report { ticket, format } => {
                let service = CreditService::connect(&self.database).await?;
                run_report_command(&service, ticket, &format).await?;
            }

            Commands::Balance {
                entity,
                all,
                format,
            } => {
                let service = CreditService::connect(&self.database).await?;
                let balances = service.entity_balances(entity, all).await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&balances)?),
                    _ => print_balances(&balances),
                }
            }

            Commands::Notify { ticket } => {
                let service = CreditService::connect(&self.database).await?;
                let data = service.notification_data(ticket).await?;
                println!("{}", serde_json::to_string_pretty(&data)?);
            }

            Commands::Search {
                item_type,
                id,
                format,
            } => {
                let service = CreditService::connect(&self.database).await?;
                let item_type = ItemType::from_str(&item_type).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Invalid item type '{}'. Valid types: ticket, entity",
                        item_type
                    )
                })?;
                run_search_command(&service, item_type, id, &format).await?;
            }

            Commands::Cron(cmd) => {
                let service = CreditService::connect(&self.database).await?;
                run_cron_command(&service, cmd).await?;
            }

            Commands::Export {
                export_type,
                entity,
                output,
            } => {
                let service = CreditService::connect(&self.database).await?;
                run_export_command(&service, &export_type, entity, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_entity_command(service: &CreditService, cmd: EntityCommands) -> Result<()> {
    match cmd {
        EntityCommands::Create { name } => {
            let entity = service.create_entity(&name).await?;
            println!("Created entity: {} ({})", entity.name, entity.id);
        }

        EntityCommands::List => {
            let entities = service.list_entities().await?;
            if entities.is_empty() {
                println!("No entities found.");
            } else {
                println!("{:<6} {:<30}", "ID", "NAME");
                println!("{}", "-".repeat(37));
                for entity in entities {
                    println!("{:<6} {:<30}", entity.id, entity.name);
                }
            }
        }
    }
    Ok(())
}

async fn run_ticket_command(service: &CreditService, cmd: TicketCommands) -> Result<()> {
    match cmd {
        TicketCommands::Create { name, entity } => {
            let ticket = service.create_ticket(entity, &name).await?;
            println!("Created ticket: {} ({})", ticket.name, ticket.id);
        }

        TicketCommands::Show { id } => {
            let ticket = service.get_ticket(id).await?;
            let entity = service.get_entity(ticket.entity_id).await?;

            println!("Ticket: {}", ticket.name);
            println!("  ID:       {}", ticket.id);
            println!("  Entity:   {} ({})", entity.name, entity.id);
            println!(
                "  Opened:   {}",
                ticket.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            run_consumptions_command(service, Some(id), None).await?;
        }
    }
    Ok(())
}

async fn run_type_command(service: &CreditService, cmd: TypeCommands) -> Result<()> {
    match cmd {
        TypeCommands::Create { name, comment } => {
            let credit_type = service
                .create_credit_type(&name, comment.as_deref())
                .await?;
            println!("Created credit type: {} ({})", credit_type.name, credit_type.id);
        }

        TypeCommands::List => {
            let types = service.list_credit_types().await?;
            if types.is_empty() {
                println!("No credit types found.");
            } else {
                println!("{:<6} {:<24} {}", "ID", "NAME", "COMMENT");
                println!("{}", "-".repeat(50));
                for t in types {
                    println!(
                        "{:<6} {:<24} {}",
                        t.id,
                        t.name,
                        t.comment.unwrap_or_default()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_voucher_command(service: &CreditService, cmd: VoucherCommands) -> Result<()> {
    match cmd {
        VoucherCommands::Create {
            name,
            entity,
            quantity,
            type_id,
            begin,
            end,
            allow_overconsumption,
            inactive,
            comment,
        } => {
            let quantity = parse_quantity(&quantity)
                .context("Invalid quantity format. Use '100' or '37.5'")?;
            let begin_date = begin
                .map(|s| parse_date(&s))
                .transpose()
                .context("Invalid begin date. Use YYYY-MM-DD")?;
            let end_date = end
                .map(|s| parse_end_date(&s))
                .transpose()
                .context("Invalid end date. Use YYYY-MM-DD")?;

            let mut voucher = NewVoucher::new(entity, name, quantity)
                .with_period(begin_date, end_date)
                .with_overconsumption(allow_overconsumption);
            if let Some(type_id) = type_id {
                voucher = voucher.with_type(type_id);
            }
            if let Some(comment) = comment {
                voucher = voucher.with_comment(comment);
            }
            if inactive {
                voucher = voucher.inactive();
            }

            let voucher = service.create_voucher(voucher).await?;
            println!(
                "Created voucher: {} ({}) with {}",
                voucher.name,
                voucher.id,
                format_quantity(voucher.quantity)
            );
        }

        VoucherCommands::List { entity, all } => {
            let vouchers = service.list_vouchers(entity, all).await?;
            if vouchers.is_empty() {
                println!("No vouchers found.");
            } else {
                println!(
                    "{:<6} {:<8} {:<24} {:>10} {:<8}",
                    "ID", "ENTITY", "NAME", "QUANTITY", "ACTIVE"
                );
                println!("{}", "-".repeat(60));
                for v in vouchers {
                    println!(
                        "{:<6} {:<8} {:<24} {:>10} {:<8}",
                        v.id,
                        v.entity_id,
                        truncate(&v.name, 24),
                        format_quantity(v.quantity),
                        if v.is_active { "yes" } else { "no" }
                    );
                }
            }
        }

        VoucherCommands::Show { id } => {
            let balance = service.get_voucher_balance(id).await?;
            let voucher = &balance.voucher;

            println!("Voucher: {}", voucher.name);
            println!("  ID:               {}", voucher.id);
            println!("  Entity:           {}", voucher.entity_id);
            if let Some(type_id) = voucher.type_id {
                println!("  Type:             {}", type_id);
            }
            println!(
                "  Active:           {}",
                if voucher.is_active { "yes" } else { "no" }
            );
            println!(
                "  Overconsumption:  {}",
                if voucher.overconsumption_allowed {
                    "allowed"
                } else {
                    "refused"
                }
            );
            if let Some(begin) = voucher.begin_date {
                println!("  Begins:           {}", begin.format("%Y-%m-%d"));
            }
            if let Some(end) = voucher.end_date {
                println!("  Ends:             {}", end.format("%Y-%m-%d"));
            }
            if let Some(comment) = &voucher.comment {
                println!("  Comment:          {}", comment);
            }
            println!();
            println!("  Quantity:         {}", format_quantity(voucher.quantity));
            println!("  Consumed:         {}", format_quantity(balance.consumed));
            println!("  Remaining:        {}", format_quantity(balance.remaining));
        }

        VoucherCommands::Activate { id } => {
            let voucher = service.set_voucher_active(id, true).await?;
            println!("Activated voucher: {}", voucher.name);
        }

        VoucherCommands::Deactivate { id } => {
            let voucher = service.set_voucher_active(id, false).await?;
            println!("Deactivated voucher: {}", voucher.name);
        }
    }
    Ok(())
}

async fn run_consumptions_command(
    service: &CreditService,
    ticket: Option<i64>,
    voucher: Option<i64>,
) -> Result<()> {
    match (ticket, voucher) {
        (Some(ticket_id), _) => {
            let details = service.list_consumptions_for_ticket(ticket_id).await?;
            if details.is_empty() {
                println!("No consumption on ticket {}.", ticket_id);
                return Ok(());
            }
            println!("{:<20} {:<24} {:>10}", "DATE", "VOUCHER", "CONSUMED");
            println!("{}", "-".repeat(56));
            for d in details {
                println!(
                    "{:<20} {:<24} {:>10}",
                    d.consumption.created_at.format("%Y-%m-%d %H:%M"),
                    truncate(&d.voucher_name, 24),
                    format_quantity(d.consumption.consumed)
                );
            }
        }
        (None, Some(voucher_id)) => {
            let consumptions = service.list_consumptions_for_voucher(voucher_id).await?;
            if consumptions.is_empty() {
                println!("No consumption on voucher {}.", voucher_id);
                return Ok(());
            }
            println!("{:<20} {:<8} {:>10}", "DATE", "TICKET", "CONSUMED");
            println!("{}", "-".repeat(40));
            for c in consumptions {
                println!(
                    "{:<20} {:<8} {:>10}",
                    c.created_at.format("%Y-%m-%d %H:%M"),
                    c.ticket_id,
                    format_quantity(c.consumed)
                );
            }
        }
        (None, None) => anyhow::bail!("Specify --ticket or --voucher"),
    }
    Ok(())
}

async fn run_report_command(service: &CreditService, ticket_id: i64, format: &str) -> Result<()> {
    match format {
        "json" => {
            let report = service.ticket_report(ticket_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "csv" => {
            use crate::io::Exporter;
            Exporter::new(service)
                .export_report_csv(ticket_id, std::io::stdout())
                .await?;
        }
        _ => {
            let lines = service.report(ticket_id).await?;
            if lines.is_empty() {
                println!("No active voucher for ticket {}.", ticket_id);
                return Ok(());
            }
            println!("Credit for ticket {}", ticket_id);
            println!();
            println!("{:<24} {:>12} {:>12}", "VOUCHER", "CONSUMED", "REMAINING");
            println!("{}", "-".repeat(50));
            for line in &lines {
                println!(
                    "{:<24} {:>12} {:>12}",
                    truncate(&line.voucher_name, 24),
                    format_quantity(line.consumed_on_ticket),
                    format_quantity(line.remaining)
                );
            }
        }
    }
    Ok(())
}

fn print_balances(balances: &[VoucherBalance]) {
    if balances.is_empty() {
        println!("No vouchers found.");
        return;
    }

    println!(
        "{:<24} {:>10} {:>10} {:>10} {:<6}",
        "VOUCHER", "QUANTITY", "CONSUMED", "REMAINING", "ACTIVE"
    );
    println!("{}", "-".repeat(64));
    for b in balances {
        println!(
            "{:<24} {:>10} {:>10} {:>10} {:<6}",
            truncate(&b.voucher.name, 24),
            format_quantity(b.voucher.quantity),
            format_quantity(b.consumed),
            format_quantity(b.remaining),
            if b.voucher.is_active { "yes" } else { "no" }
        );
    }
}

async fn run_search_command(
    service: &CreditService,
    item_type: ItemType,
    id: i64,
    format: &str,
) -> Result<()> {
    let rows = service.search(item_type, id).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", search_title(item_type, id));
    println!();

    let options = item_type.search_options();
    let header: Vec<String> = options.iter().map(|o| format!("{:<20}", o.name)).collect();
    println!("{}", header.join(" "));
    println!("{}", "-".repeat(21 * options.len()));

    for row in &rows {
        let cells: Vec<String> = options
            .iter()
            .map(|option| {
                let text = match row.get(option.id) {
                    Some(SearchValue::Date(dt)) => dt.format("%Y-%m-%d %H:%M").to_string(),
                    Some(SearchValue::Decimal(q)) => format_quantity(*q),
                    Some(SearchValue::Text(s)) => truncate(s, 20),
                    _ => String::new(),
                };
                format!("{:<20}", text)
            })
            .collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}

async fn run_cron_command(service: &CreditService, cmd: CronCommands) -> Result<()> {
    match cmd {
        CronCommands::List => {
            let tasks = service.list_cron_tasks().await?;
            if tasks.is_empty() {
                println!("No scheduled tasks registered.");
                return Ok(());
            }
            println!(
                "{:<16} {:<16} {:>10} {:<10} {:<20}",
                "ITEMTYPE", "NAME", "EVERY (s)", "MODE", "LAST RUN"
            );
            println!("{}", "-".repeat(76));
            for task in tasks {
                println!(
                    "{:<16} {:<16} {:>10} {:<10} {:<20}",
                    task.itemtype,
                    task.name,
                    task.frequency_secs,
                    task.mode.as_str(),
                    task.last_run
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }

        CronCommands::Run { name } => {
            let run = service.run_cron_task(&name, Utc::now()).await?;
            if run.expired.is_empty() {
                println!("{}: no voucher expired", run.task);
            } else {
                println!("{}: {} voucher(s) expired", run.task, run.expired.len());
                for voucher in &run.expired {
                    println!("  {} ({})", voucher.name, voucher.id);
                }
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &CreditService,
    export_type: &str,
    entity: Option<i64>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "balances" => {
            let count = exporter.export_balances_csv(entity, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} voucher balances", count);
            }
        }
        "consumptions" => {
            let count = exporter.export_consumptions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} consumptions", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {} entities, {} vouchers, {} consumptions",
                    snapshot.entities.len(),
                    snapshot.vouchers.len(),
                    snapshot.consumptions.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: balances, consumptions, full",
                export_type
            );
        }
    }

    Ok(())
}

fn search_title(item_type: ItemType, id: i64) -> String {
    format!("{} for {} {}", SEARCH_GROUP_LABEL, item_type, id)
}

/// Parse a YYYY-MM-DD date as midnight UTC.
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))
}

/// Parse a YYYY-MM-DD date as the last second of that day, UTC.
fn parse_end_date(date_str: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

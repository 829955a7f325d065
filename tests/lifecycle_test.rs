mod common;

use anyhow::Result;
use chrono::Duration;
use common::{Helpdesk, parse_date, test_service, voucher};
use credit::application::{AppError, CreditService};
use credit::domain::{CronMode, DAY_SECS, NewVoucher};
use credit::plugin::{CRON_CREDIT_EXPIRED, CRON_ITEMTYPE};

#[tokio::test]
async fn test_install_registers_daily_expiry_task() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.repository().is_installed().await?);
    let tasks = service.list_cron_tasks().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].itemtype, CRON_ITEMTYPE);
    assert_eq!(tasks[0].name, CRON_CREDIT_EXPIRED);
    assert_eq!(tasks[0].frequency_secs, DAY_SECS);
    assert_eq!(tasks[0].mode, CronMode::External);
    assert!(tasks[0].last_run.is_none());
    Ok(())
}

#[tokio::test]
async fn test_install_twice_keeps_data() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let v = voucher(&service, &desk.acme, "V1", 1000).await?;
    service
        .record_consumption(v.id, desk.acme_ticket.id, 100, false)
        .await?;

    service.install().await?;

    assert_eq!(service.list_cron_tasks().await?.len(), 1);
    assert_eq!(service.get_voucher_balance(v.id).await?.consumed, 100);
    Ok(())
}

#[tokio::test]
async fn test_uninstall_drops_credit_tables_only() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let v = voucher(&service, &desk.acme, "V1", 1000).await?;
    service
        .record_consumption(v.id, desk.acme_ticket.id, 100, false)
        .await?;

    service.uninstall().await?;

    assert!(!service.repository().is_installed().await?);
    assert!(service.list_cron_tasks().await?.is_empty());
    // Host records survive
    assert_eq!(service.list_entities().await?.len(), 2);
    assert_eq!(service.get_ticket(desk.acme_ticket.id).await?.name, "Printer on fire");

    // Uninstalling again is harmless, and a reinstall starts empty
    service.uninstall().await?;
    service.install().await?;
    assert!(service.list_vouchers(None, true).await?.is_empty());
    assert!(service.report(desk.acme_ticket.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_creditexpired_deactivates_past_vouchers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;

    let old = service
        .create_voucher(
            NewVoucher::new(desk.acme.id, "2023", 1000)
                .with_period(Some(parse_date("2023-01-01")), Some(parse_date("2023-12-31"))),
        )
        .await?;
    let current = service
        .create_voucher(
            NewVoucher::new(desk.acme.id, "2024", 1000)
                .with_period(Some(parse_date("2024-01-01")), Some(parse_date("2024-12-31"))),
        )
        .await?;
    let open_ended = voucher(&service, &desk.globex, "Forever", 1000).await?;

    let now = parse_date("2024-03-15");
    let run = service.run_cron_task(CRON_CREDIT_EXPIRED, now).await?;

    assert_eq!(run.task, CRON_CREDIT_EXPIRED);
    assert_eq!(run.expired.len(), 1);
    assert_eq!(run.expired[0].id, old.id);
    assert!(!service.get_voucher(old.id).await?.is_active);
    assert!(service.get_voucher(current.id).await?.is_active);
    assert!(service.get_voucher(open_ended.id).await?.is_active);

    let task = &service.list_cron_tasks().await?[0];
    assert_eq!(task.last_run, Some(now));

    // Nothing left to expire on the next run
    let again = service
        .run_cron_task(CRON_CREDIT_EXPIRED, now + Duration::days(1))
        .await?;
    assert!(again.expired.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_cron_task_is_an_error() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.run_cron_task("purgelogs", parse_date("2024-01-01")).await;
    assert!(matches!(result, Err(AppError::UnknownCronTask(_))));
    Ok(())
}

#[tokio::test]
async fn test_connect_requires_installed_tables() -> Result<()> {
    let (service, temp) = test_service().await?;
    let db_path = temp.path().join("test.db");
    let db_path = db_path.to_str().unwrap();

    CreditService::connect(db_path).await?;

    service.uninstall().await?;
    let result = CreditService::connect(db_path).await;
    assert!(matches!(result, Err(AppError::NotInstalled(path)) if path == db_path));

    // Uninstall goes through `open` and stays harmless on a bare database
    CreditService::open(db_path).await?.uninstall().await?;

    service.install().await?;
    CreditService::connect(db_path).await?;
    Ok(())
}

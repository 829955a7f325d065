mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{Helpdesk, parse_date, test_service, voucher};
use credit::application::AppError;
use credit::domain::NewVoucher;

#[tokio::test]
async fn test_record_and_list_consumptions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let hotline = voucher(&service, &desk.acme, "Hotline", 10000).await?;
    let onsite = voucher(&service, &desk.acme, "On-site", 2000).await?;

    service
        .record_consumption(hotline.id, desk.acme_ticket.id, 150, false)
        .await?;
    service
        .record_consumption(onsite.id, desk.acme_ticket.id, 400, false)
        .await?;
    service
        .record_consumption(hotline.id, desk.acme_other_ticket.id, 75, false)
        .await?;

    let on_ticket = service.list_consumptions_for_ticket(desk.acme_ticket.id).await?;
    assert_eq!(on_ticket.len(), 2);
    assert_eq!(on_ticket[0].voucher_name, "Hotline");
    assert_eq!(on_ticket[1].voucher_name, "On-site");
    assert_eq!(on_ticket[1].consumption.consumed, 400);

    let on_voucher = service.list_consumptions_for_voucher(hotline.id).await?;
    assert_eq!(on_voucher.len(), 2);
    assert_eq!(on_voucher[1].ticket_id, desk.acme_other_ticket.id);

    let balances = service.entity_balances(desk.acme.id, false).await?;
    assert_eq!(balances.len(), 2);
    assert_eq!(balances[0].consumed, 225);
    assert_eq!(balances[0].remaining, 9775);

    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let v = voucher(&service, &desk.acme, "V", 1000).await?;

    for amount in [0, -100] {
        let result = service
            .record_consumption(v.id, desk.acme_ticket.id, amount, false)
            .await;
        assert!(matches!(result, Err(AppError::InvalidQuantity(_))));
    }
    Ok(())
}

#[tokio::test]
async fn test_inactive_voucher_cannot_be_consumed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let v = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Dormant", 1000).inactive())
        .await?;

    let result = service
        .record_consumption(v.id, desk.acme_ticket.id, 100, false)
        .await;
    assert!(matches!(result, Err(AppError::VoucherInactive(_))));
    Ok(())
}

#[tokio::test]
async fn test_voucher_outside_its_period_is_refused() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;

    let ended = service
        .create_voucher(
            NewVoucher::new(desk.acme.id, "2020", 1000)
                .with_period(Some(parse_date("2020-01-01")), Some(parse_date("2020-12-31"))),
        )
        .await?;
    let future = service
        .create_voucher(
            NewVoucher::new(desk.acme.id, "Next year", 1000)
                .with_period(Some(Utc::now() + Duration::days(365)), None),
        )
        .await?;

    for id in [ended.id, future.id] {
        let result = service
            .record_consumption(id, desk.acme_ticket.id, 100, false)
            .await;
        assert!(matches!(result, Err(AppError::VoucherOutOfPeriod { .. })));
    }
    Ok(())
}

#[tokio::test]
async fn test_ticket_and_voucher_must_share_entity() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let v = voucher(&service, &desk.acme, "V", 1000).await?;

    let result = service
        .record_consumption(v.id, desk.globex_ticket.id, 100, false)
        .await;
    assert!(matches!(result, Err(AppError::EntityMismatch { .. })));

    let result = service.record_consumption(v.id, 4242, 100, false).await;
    assert!(matches!(result, Err(AppError::TicketNotFound(4242))));
    Ok(())
}

#[tokio::test]
async fn test_insufficient_credit_unless_allowed_or_forced() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let strict = voucher(&service, &desk.acme, "Strict", 500).await?;
    let lenient = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Lenient", 500).with_overconsumption(true))
        .await?;

    service
        .record_consumption(strict.id, desk.acme_ticket.id, 400, false)
        .await?;
    let result = service
        .record_consumption(strict.id, desk.acme_ticket.id, 200, false)
        .await;
    match result {
        Err(AppError::InsufficientCredit {
            remaining,
            required,
            ..
        }) => {
            assert_eq!(remaining, 100);
            assert_eq!(required, 200);
        }
        other => panic!("expected InsufficientCredit, got {:?}", other),
    }

    // Exactly the remaining quantity is fine
    service
        .record_consumption(strict.id, desk.acme_ticket.id, 100, false)
        .await?;
    service
        .record_consumption(strict.id, desk.acme_ticket.id, 50, true)
        .await?;
    service
        .record_consumption(lenient.id, desk.acme_ticket.id, 900, false)
        .await?;

    assert_eq!(service.get_voucher_balance(strict.id).await?.remaining, -50);
    assert_eq!(service.get_voucher_balance(lenient.id).await?.remaining, -400);
    Ok(())
}

#[tokio::test]
async fn test_voucher_creation_checks() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    voucher(&service, &desk.acme, "Hotline", 1000).await?;

    let duplicate = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Hotline", 1000))
        .await;
    assert!(matches!(duplicate, Err(AppError::VoucherAlreadyExists { .. })));

    // Same name in another entity is fine
    voucher(&service, &desk.globex, "Hotline", 1000).await?;

    let empty = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Empty", 0))
        .await;
    assert!(matches!(empty, Err(AppError::InvalidQuantity(_))));

    let reversed = service
        .create_voucher(
            NewVoucher::new(desk.acme.id, "Reversed", 1000)
                .with_period(Some(parse_date("2024-06-01")), Some(parse_date("2024-01-01"))),
        )
        .await;
    assert!(matches!(reversed, Err(AppError::InvalidPeriod { .. })));

    let untyped = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Typed", 1000).with_type(77))
        .await;
    assert!(matches!(untyped, Err(AppError::CreditTypeNotFound(77))));

    let orphan = service
        .create_voucher(NewVoucher::new(9999, "Orphan", 1000))
        .await;
    assert!(matches!(orphan, Err(AppError::EntityNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_credit_types_attach_to_vouchers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;

    let hours = service
        .create_credit_type("Hours", Some("Billed per hour"))
        .await?;
    service.create_credit_type("Tokens", None).await?;
    assert!(matches!(
        service.create_credit_type("Hours", None).await,
        Err(AppError::CreditTypeAlreadyExists(_))
    ));

    let v = service
        .create_voucher(NewVoucher::new(desk.acme.id, "Support hours", 4000).with_type(hours.id))
        .await?;
    assert_eq!(service.get_voucher(v.id).await?.type_id, Some(hours.id));

    let names: Vec<_> = service
        .list_credit_types()
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Hours", "Tokens"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_consumptions_never_overdraw_a_strict_voucher() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let desk = Helpdesk::create(&service).await?;
    let strict = voucher(&service, &desk.acme, "Strict", 10000).await?;
    let (voucher_id, ticket_id) = (strict.id, desk.acme_ticket.id);
    let service = Arc::new(service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .record_consumption(voucher_id, ticket_id, 10000, false)
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(AppError::InsufficientCredit { remaining, .. }) => assert_eq!(remaining, 0),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let balance = service.get_voucher_balance(voucher_id).await?;
    assert_eq!(successes, 1);
    assert_eq!(balance.consumed, 10000);
    assert_eq!(balance.remaining, 0);
    Ok(())
}

use super::*;
use crate::cache::Cache;
use crate::inventory::LedgerError;
use crate::vouchers::VoucherError;

#[tokio::test]
async fn test_create_order_prices_from_product() {
    let mut env = create_test_env();

    let order = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), 2), line(TEE_ONE, None, 1)]),
            USER,
            options(None),
        )
        .await
        .unwrap();

    assert_eq!(order.user_id, USER);
    assert_eq!(order.created_by, USER);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].price, Decimal::new(350_000, 0));
    assert_eq!(order.items[0].product_name, "Hoodie");
    assert_eq!(order.items[1].price, Decimal::new(12_000_050, 2));
    assert_eq!(order.subtotal, Decimal::new(82_000_050, 2));
    assert_eq!(order.discount, Decimal::ZERO);
    assert_totals_consistent(&order);
    assert!(!order.txn_ref.is_empty());

    assert_eq!(env.stock(HOODIE_BLACK), 8);
    assert_eq!(env.stock(TEE_ONE), 2);
    assert_eq!(env.total_stock(HOODIE), 12);

    let stored = env.manager.get_order(order.id).await.unwrap();
    assert_eq!(stored, order);
    assert_eq!(env.manager.find_by_txn_ref(&order.txn_ref).unwrap().id, order.id);

    assert_eq!(env.audit_actions(), vec![AuditAction::OrderCreated]);
    assert_eq!(env.notification_kinds(), vec![NotificationKind::OrderCreated]);
}

#[tokio::test]
async fn test_duplicate_lines_merge_before_reserving() {
    let env = create_test_env();

    let order = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), 2), line(HOODIE_BLACK, Some(1), 3)]),
            USER,
            options(None),
        )
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 5);
    assert_eq!(env.stock(HOODIE_BLACK), 5);
    assert_totals_consistent(&order);
}

#[tokio::test]
async fn test_same_inventory_different_color_not_merged() {
    let env = create_test_env();

    let order = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), 1), line(HOODIE_BLACK, Some(9), 1)]),
            USER,
            options(None),
        )
        .await
        .unwrap();

    assert_eq!(order.items.len(), 2);
    assert_eq!(env.stock(HOODIE_BLACK), 8);
}

#[tokio::test]
async fn test_oversell_leaves_stock_untouched() {
    let mut env = create_test_env();

    // First line reserves fine, second line fails: both must roll back.
    let err = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), 4), line(TEE_ONE, None, 5)]),
            USER,
            options(None),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Ledger(LedgerError::InsufficientStock {
            inventory_id: TEE_ONE,
            requested: 5,
            available: 3,
        })
    ));
    assert_eq!(env.stock(HOODIE_BLACK), 10);
    assert_eq!(env.stock(TEE_ONE), 3);
    assert_eq!(env.total_stock(HOODIE), 14);
    assert!(env.storage().list_orders_for_user(USER).unwrap().is_empty());
    assert!(env.audit_actions().is_empty());
    assert!(env.notification_kinds().is_empty());
}

#[tokio::test]
async fn test_merged_quantity_exceeding_stock_fails() {
    let env = create_test_env();

    let err = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_WHITE, Some(2), 3), line(HOODIE_WHITE, Some(2), 2)]),
            USER,
            options(None),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Ledger(LedgerError::InsufficientStock { .. })));
    assert_eq!(env.stock(HOODIE_WHITE), 4);
}

#[tokio::test]
async fn test_empty_draft_rejected() {
    let env = create_test_env();
    let err = env
        .manager
        .create_order(draft(vec![]), USER, options(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::EmptyOrder));
}

#[tokio::test]
async fn test_invalid_quantities_rejected() {
    let env = create_test_env();

    let err = env
        .manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 0)]), USER, options(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidQuantity { quantity: 0, .. }));

    let err = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), MAX_QUANTITY), line(HOODIE_BLACK, Some(1), 1)]),
            USER,
            options(None),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidQuantity { .. }));
    assert_eq!(env.stock(HOODIE_BLACK), 10);
}

#[tokio::test]
async fn test_soft_deleted_product_unavailable() {
    let env = create_test_env();
    env.storage()
        .run(|uow| -> ManagerResult<()> {
            let mut hoodie = uow.get_product(HOODIE)?.unwrap();
            hoodie.is_deleted = true;
            uow.put_product(&hoodie)?;
            Ok(())
        })
        .unwrap();

    let err = env
        .manager
        .create_order(
            draft(vec![line(TEE_ONE, None, 1), line(HOODIE_BLACK, Some(1), 1)]),
            USER,
            options(None),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::ProductUnavailable {
            inventory_id: HOODIE_BLACK,
            ..
        }
    ));
    assert_eq!(env.stock(TEE_ONE), 3);
}

#[tokio::test]
async fn test_unknown_inventory_unavailable() {
    let env = create_test_env();
    let err = env
        .manager
        .create_order(draft(vec![line(999, None, 1)]), USER, options(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::ProductUnavailable { inventory_id: 999, .. }));
}

#[tokio::test]
async fn test_percentage_voucher_with_cap() {
    let env = create_test_env();
    let mut v = voucher("SALE10", DiscountType::Percentage, Decimal::new(10, 0));
    v.max_discount_value = Some(Decimal::new(50_000, 0));
    v.usage_limit = Some(5);
    seed_voucher(env.storage(), v);

    // 3 × 350 000 = 1 050 000 → 10% = 105 000, capped at 50 000
    let order = env
        .manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), 3)]),
            USER,
            options(Some("sale10")),
        )
        .await
        .unwrap();

    assert_eq!(order.subtotal, Decimal::new(1_050_000, 0));
    assert_eq!(order.discount, Decimal::new(50_000, 0));
    assert_eq!(order.total, Decimal::new(1_000_000, 0));
    assert_eq!(order.voucher_id, Some(100));
    assert_eq!(order.voucher_code.as_deref(), Some("SALE10"));
    assert_totals_consistent(&order);

    let stored = env.storage().get_voucher(100).unwrap().unwrap();
    assert_eq!(stored.usage_count, 1);
    let usage = env.storage().get_voucher_usage(USER, 100).unwrap().unwrap();
    assert_eq!(usage.used_count, 1);
}

#[tokio::test]
async fn test_fixed_voucher_clamped_to_subtotal() {
    let env = create_test_env();
    seed_voucher(
        env.storage(),
        voucher("BIG", DiscountType::Fixed, Decimal::new(1_000_000, 0)),
    );

    let order = env
        .manager
        .create_order(draft(vec![line(TEE_ONE, None, 1)]), USER, options(Some("BIG")))
        .await
        .unwrap();

    assert_eq!(order.discount, order.subtotal);
    assert_eq!(order.total, Decimal::ZERO);
    assert_totals_consistent(&order);
}

#[tokio::test]
async fn test_per_user_limit_second_redemption_fails() {
    let env = create_test_env();
    let mut v = voucher("ONCE", DiscountType::Fixed, Decimal::new(10_000, 0));
    v.usage_per_user = Some(1);
    seed_voucher(env.storage(), v);

    env.manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 1)]), USER, options(Some("ONCE")))
        .await
        .unwrap();

    let err = env
        .manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 1)]), USER, options(Some("ONCE")))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Voucher(VoucherError::PerUserLimitExceeded(_))));
    // The failed attempt reserved nothing and redeemed nothing
    assert_eq!(env.stock(HOODIE_BLACK), 9);
    assert_eq!(env.storage().get_voucher(100).unwrap().unwrap().usage_count, 1);

    // Another user may still redeem it
    env.manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 1)]), USER + 1, options(Some("ONCE")))
        .await
        .unwrap();
    assert_eq!(env.storage().get_voucher(100).unwrap().unwrap().usage_count, 2);
}

#[tokio::test]
async fn test_voucher_failure_rolls_back_reservation() {
    let env = create_test_env();
    let mut v = voucher("MIN", DiscountType::Fixed, Decimal::new(10_000, 0));
    v.min_order_value = Some(Decimal::new(5_000_000, 0));
    seed_voucher(env.storage(), v);

    let err = env
        .manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 2)]), USER, options(Some("MIN")))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::Voucher(VoucherError::BelowMinimumOrder { .. })));
    assert_eq!(env.stock(HOODIE_BLACK), 10);

    let err = env
        .manager
        .create_order(draft(vec![line(HOODIE_BLACK, Some(1), 2)]), USER, options(Some("NOPE")))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Voucher(VoucherError::NotFound(_))));
    assert_eq!(env.stock(HOODIE_BLACK), 10);
}

#[tokio::test]
async fn test_blank_voucher_code_ignored() {
    let env = create_test_env();
    let order = env
        .manager
        .create_order(draft(vec![line(TEE_ONE, None, 1)]), USER, options(Some("  ")))
        .await
        .unwrap();
    assert_eq!(order.voucher_id, None);
    assert_eq!(order.discount, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_from_cart_clears_cart() {
    let env = create_test_env();
    seed_cart(
        env.storage(),
        USER,
        vec![
            CartItem {
                inventory_id: HOODIE_BLACK,
                product_id: HOODIE,
                color_id: Some(1),
                size_id: Some(1),
                quantity: 2,
            },
            CartItem {
                inventory_id: HOODIE_BLACK,
                product_id: HOODIE,
                color_id: Some(1),
                size_id: Some(1),
                quantity: 3,
            },
        ],
    );

    let order = env
        .manager
        .create_order_from_cart(USER, options(None))
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 5);
    assert_eq!(env.stock(HOODIE_BLACK), 5);

    let cart = env.storage().get_cart(USER).unwrap().unwrap();
    assert!(cart.items.is_empty());
    assert!(cart.is_checked_out);

    let err = env
        .manager
        .create_order_from_cart(USER, options(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Cart(crate::cart::CartError::EmptyCart(USER))));
}

#[tokio::test]
async fn test_failed_cart_checkout_keeps_cart() {
    let env = create_test_env();
    seed_cart(
        env.storage(),
        USER,
        vec![CartItem {
            inventory_id: TEE_ONE,
            product_id: TEE,
            color_id: None,
            size_id: Some(1),
            quantity: 50,
        }],
    );

    assert!(env.manager.create_order_from_cart(USER, options(None)).await.is_err());

    let cart = env.storage().get_cart(USER).unwrap().unwrap();
    assert_eq!(cart.items.len(), 1);
    assert!(!cart.is_checked_out);
}

#[tokio::test]
async fn test_cart_quantities_overflowing_merge_rejected() {
    let env = create_test_env();
    let huge = CartItem {
        inventory_id: HOODIE_BLACK,
        product_id: HOODIE,
        color_id: Some(1),
        size_id: Some(1),
        quantity: i64::MAX / 2 + 1,
    };
    seed_cart(env.storage(), USER, vec![huge.clone(), huge]);

    let err = env
        .manager
        .create_order_from_cart(USER, options(None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidQuantity {
            inventory_id: HOODIE_BLACK,
            ..
        }
    ));
    assert_eq!(env.stock(HOODIE_BLACK), 10);
    assert!(!env.storage().get_cart(USER).unwrap().unwrap().is_checked_out);
}

#[tokio::test]
async fn test_create_invalidates_order_cache() {
    let env = create_test_env();

    let first = place_hoodies(&env, 1).await;
    let listed = env.manager.list_user_orders(USER).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(
        env.cache
            .get(&crate::cache::user_orders_key(USER))
            .await
            .unwrap()
            .is_some()
    );

    let second = place_hoodies(&env, 1).await;
    assert!(
        env.cache
            .get(&crate::cache::user_orders_key(USER))
            .await
            .unwrap()
            .is_none()
    );

    let listed = env.manager.list_user_orders(USER).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|o| o.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id) && ids.contains(&second.id));
}

#[test]
fn test_merge_lines_keeps_first_seen_order() {
    let merged = merge_lines(&[
        line(TEE_ONE, None, 1),
        line(HOODIE_BLACK, Some(1), 2),
        line(TEE_ONE, None, 4),
    ])
    .unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].inventory_id, TEE_ONE);
    assert_eq!(merged[0].quantity, 5);
    assert_eq!(merged[1].inventory_id, HOODIE_BLACK);
}

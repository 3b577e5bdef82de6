use super::*;

#[tokio::test]
async fn test_status_progression() {
    let mut env = create_test_env();
    let order = place_hoodies(&env, 1).await;
    env.audit_actions();

    for status in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let updated = env
            .manager
            .update_order_status(order.id, status, 99)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
        assert_eq!(updated.updated_by, 99);
    }

    assert_eq!(env.audit_actions().len(), 3);
    // Stock stays reserved through fulfilment
    assert_eq!(env.stock(HOODIE_BLACK), 9);
}

#[tokio::test]
async fn test_illegal_status_transitions() {
    let env = create_test_env();
    let order = place_hoodies(&env, 1).await;

    let err = env
        .manager
        .update_order_status(order.id, OrderStatus::Delivered, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidStatusTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Delivered,
        }
    ));

    env.manager.cancel_order(order.id, 1).await.unwrap();
    let err = env
        .manager
        .update_order_status(order.id, OrderStatus::Processing, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn test_same_status_is_noop() {
    let mut env = create_test_env();
    let order = place_hoodies(&env, 1).await;
    env.audit_actions();

    let same = env
        .manager
        .update_order_status(order.id, OrderStatus::Pending, 5)
        .await
        .unwrap();
    assert_eq!(same.updated_by, USER);
    assert!(env.audit_actions().is_empty());
}

#[tokio::test]
async fn test_payment_paid_by_txn_ref_is_idempotent() {
    let mut env = create_test_env();
    let order = place_hoodies(&env, 1).await;
    env.audit_actions();
    env.notification_kinds();

    let paid = env
        .manager
        .update_payment_status(OrderRef::TxnRef(order.txn_ref.clone()), PaymentStatus::Paid, None)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.updated_by, USER);

    let again = env
        .manager
        .update_payment_status(OrderRef::TxnRef(order.txn_ref.clone()), PaymentStatus::Paid, None)
        .await
        .unwrap();
    assert_eq!(again.payment_status, PaymentStatus::Paid);
    assert_eq!(again.updated_at, paid.updated_at);

    assert_eq!(env.audit_actions(), vec![AuditAction::PaymentStatusChanged]);
    assert_eq!(env.notification_kinds(), vec![NotificationKind::PaymentSucceeded]);
}

#[tokio::test]
async fn test_payment_transitions() {
    let env = create_test_env();
    let order = place_hoodies(&env, 1).await;

    env.manager
        .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Paid, Some(1))
        .await
        .unwrap();
    let refunded = env
        .manager
        .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Refunded, Some(1))
        .await
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert_eq!(refunded.updated_by, 1);

    let err = env
        .manager
        .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Paid, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidPaymentTransition {
            from: PaymentStatus::Refunded,
            to: PaymentStatus::Paid,
        }
    ));
}

#[tokio::test]
async fn test_failed_payment_cannot_become_paid() {
    let env = create_test_env();
    let order = place_hoodies(&env, 1).await;

    env.manager
        .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Failed, None)
        .await
        .unwrap();
    let err = env
        .manager
        .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Paid, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidPaymentTransition { .. }));
}

#[tokio::test]
async fn test_payment_unknown_txn_ref() {
    let env = create_test_env();
    let err = env
        .manager
        .update_payment_status(OrderRef::TxnRef("missing".to_string()), PaymentStatus::Paid, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::OrderNotFound(ref r) if r == "missing"));
}

#[tokio::test]
async fn test_get_order_served_from_cache_until_invalidated() {
    let env = create_test_env();
    let order = place_hoodies(&env, 1).await;

    let cached = env.manager.get_order(order.id).await.unwrap();
    assert_eq!(cached.status, OrderStatus::Pending);

    env.manager
        .update_order_status(order.id, OrderStatus::Processing, 1)
        .await
        .unwrap();
    let fresh = env.manager.get_order(order.id).await.unwrap();
    assert_eq!(fresh.status, OrderStatus::Processing);
}

#[test]
fn test_manager_error_maps_to_app_error() {
    use shared::error::{AppError, ErrorCode, ErrorKind};

    let err: AppError = ManagerError::InvalidStatusTransition {
        from: OrderStatus::Pending,
        to: OrderStatus::Delivered,
    }
    .into();
    assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err: AppError = ManagerError::OrderNotFound("1".to_string()).into();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err: AppError = ManagerError::EmptyOrder.into();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

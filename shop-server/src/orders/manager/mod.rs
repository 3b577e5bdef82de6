//! OrdersManager - checkout orchestration
//!
//! # Create Flow
//!
//! ```text
//! create_order(draft, user_id, options)
//!     ├─ 1. Reject empty drafts
//!     ├─ 2. Merge lines sharing (inventory_id, color_id)
//!     ├─ 3. Per line: resolve live product, price it, reserve stock
//!     ├─ 4. Subtotal
//!     ├─ 5. Voucher: evaluate + commit usage
//!     ├─ 6. Insert order (pending / unpaid, fresh txn_ref)
//!     ├─ 7. Commit                         ── everything above is one unit of work
//!     └─ 8. Audit, notify, invalidate cache ── best-effort, never rolls back
//! ```
//!
//! Any failure in steps 1-6 aborts the write transaction, so stock
//! reservations, voucher counters and the order row are discarded together.

mod error;
pub use error::*;

use crate::audit::{AuditAction, AuditService};
use crate::cache::{self, Cache};
use crate::cart;
use crate::inventory::ledger;
use crate::message::{self, Notification, NotificationKind, NotificationPublisher};
use crate::storage::{ShopStorage, UnitOfWork};
use crate::vouchers;
use rust_decimal::Decimal;
use shared::models::{
    CheckoutOptions, DraftLine, Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus,
};
use shared::util::{now_millis, snowflake_id};
use std::sync::Arc;
use std::time::Duration;

use super::money::{self, MAX_QUANTITY};

/// Default TTL of cached order reads
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// How an order is addressed by payment updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(i64),
    TxnRef(String),
}

impl std::fmt::Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderRef::Id(id) => write!(f, "{}", id),
            OrderRef::TxnRef(txn_ref) => f.write_str(txn_ref),
        }
    }
}

/// Result of [`OrdersManager::cancel_order`]
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    /// Stock restored and status set to cancelled
    Cancelled(Order),
    /// Order was already cancelled; nothing changed
    AlreadyCancelled(Order),
}

impl CancelOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CancelOutcome::Cancelled(_))
    }

    pub fn order(&self) -> &Order {
        match self {
            CancelOutcome::Cancelled(order) | CancelOutcome::AlreadyCancelled(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CancelOutcome::Cancelled(order) | CancelOutcome::AlreadyCancelled(order) => order,
        }
    }
}

pub struct OrdersManager {
    storage: ShopStorage,
    cache: Arc<dyn Cache>,
    publisher: Arc<dyn NotificationPublisher>,
    audit: Arc<AuditService>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<ShopStorage>")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(
        storage: ShopStorage,
        cache: Arc<dyn Cache>,
        publisher: Arc<dyn NotificationPublisher>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            storage,
            cache,
            publisher,
            audit,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn storage(&self) -> &ShopStorage {
        &self.storage
    }

    // ========== Commands ==========

    /// Place an order from an explicit draft
    pub async fn create_order(
        &self,
        draft: OrderDraft,
        user_id: i64,
        options: CheckoutOptions,
    ) -> ManagerResult<Order> {
        let order = self
            .storage
            .run(|uow| self.place(uow, &draft, user_id, &options))?;
        self.after_create(&order).await;
        Ok(order)
    }

    /// Place an order from the user's cart and check the cart out, atomically
    pub async fn create_order_from_cart(
        &self,
        user_id: i64,
        options: CheckoutOptions,
    ) -> ManagerResult<Order> {
        let order = self.storage.run(|uow| -> ManagerResult<Order> {
            let draft = cart::translate_in(uow, user_id)?;
            let order = self.place(uow, &draft, user_id, &options)?;
            cart::clear(uow, user_id)?;
            Ok(order)
        })?;
        self.after_create(&order).await;
        Ok(order)
    }

    /// Cancel an order and restore its stock
    ///
    /// Cancelling an already cancelled order is a no-op reported as
    /// [`CancelOutcome::AlreadyCancelled`].
    pub async fn cancel_order(&self, order_id: i64, actor: i64) -> ManagerResult<CancelOutcome> {
        let outcome = self.storage.run(|uow| -> ManagerResult<CancelOutcome> {
            let mut order = load_order(uow, order_id)?;
            if order.status == OrderStatus::Cancelled {
                return Ok(CancelOutcome::AlreadyCancelled(order));
            }
            if !order.status.can_transition_to(OrderStatus::Cancelled) {
                return Err(ManagerError::OrderNotCancellable {
                    order_id,
                    status: order.status,
                });
            }

            for item in &order.items {
                ledger::release(uow, item.inventory_id, item.quantity)?;
            }

            order.status = OrderStatus::Cancelled;
            order.updated_by = actor;
            order.updated_at = now_millis();
            uow.put_order(&order)?;
            Ok(CancelOutcome::Cancelled(order))
        })?;

        match &outcome {
            CancelOutcome::Cancelled(order) => {
                tracing::info!(order_id, actor, "Order cancelled, stock restored");
                self.audit.log(
                    AuditAction::OrderCancelled,
                    "order",
                    resource_id(order),
                    Some(actor),
                    serde_json::json!({
                        "description": "Order cancelled",
                        "restored_lines": order.items.len(),
                    }),
                );
                message::notify(
                    self.publisher.as_ref(),
                    Notification::new(
                        order.user_id,
                        NotificationKind::OrderCancelled,
                        "Order cancelled",
                        format!("Order #{} has been cancelled", order.id),
                    )
                    .with_metadata(serde_json::json!({ "order_id": order.id })),
                );
                self.invalidate().await;
            }
            CancelOutcome::AlreadyCancelled(_) => {
                tracing::debug!(order_id, "Order already cancelled, nothing to do");
            }
        }
        Ok(outcome)
    }

    /// Move an order through its fulfilment states
    ///
    /// `cancelled` is routed through [`Self::cancel_order`] so stock is always
    /// restored. Re-applying the current status is a no-op.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatus,
        actor: i64,
    ) -> ManagerResult<Order> {
        if status == OrderStatus::Cancelled {
            return Ok(self.cancel_order(order_id, actor).await?.into_order());
        }

        let (order, previous) = self.storage.run(|uow| -> ManagerResult<(Order, OrderStatus)> {
            let mut order = load_order(uow, order_id)?;
            let previous = order.status;
            if previous == status {
                return Ok((order, previous));
            }
            if !previous.can_transition_to(status) {
                return Err(ManagerError::InvalidStatusTransition {
                    from: previous,
                    to: status,
                });
            }
            order.status = status;
            order.updated_by = actor;
            order.updated_at = now_millis();
            uow.put_order(&order)?;
            Ok((order, previous))
        })?;

        if previous != status {
            tracing::info!(order_id, from = previous.as_str(), to = status.as_str(), "Order status changed");
            self.audit.log(
                AuditAction::OrderStatusChanged,
                "order",
                resource_id(&order),
                Some(actor),
                serde_json::json!({
                    "description": "Order status changed",
                    "from": previous.as_str(),
                    "to": status.as_str(),
                }),
            );
            message::notify(
                self.publisher.as_ref(),
                Notification::new(
                    order.user_id,
                    NotificationKind::OrderStatusChanged,
                    "Order updated",
                    format!("Order #{} is now {}", order.id, status.as_str()),
                )
                .with_metadata(serde_json::json!({ "order_id": order.id, "status": status })),
            );
            self.invalidate().await;
        }
        Ok(order)
    }

    /// Set the payment status of an order
    ///
    /// Safe to repeat: applying the current status again returns the order
    /// unchanged. `actor` is `None` for gateway-driven updates.
    pub async fn update_payment_status(
        &self,
        target: OrderRef,
        status: PaymentStatus,
        actor: Option<i64>,
    ) -> ManagerResult<Order> {
        let (order, previous) = self
            .storage
            .run(|uow| -> ManagerResult<(Order, PaymentStatus)> {
                let mut order = match &target {
                    OrderRef::Id(id) => uow.get_order(*id)?,
                    OrderRef::TxnRef(txn_ref) => uow.find_order_by_txn_ref(txn_ref)?,
                }
                .ok_or_else(|| ManagerError::OrderNotFound(target.to_string()))?;

                let previous = order.payment_status;
                if previous == status {
                    return Ok((order, previous));
                }
                if !previous.can_transition_to(status) {
                    return Err(ManagerError::InvalidPaymentTransition {
                        from: previous,
                        to: status,
                    });
                }
                order.payment_status = status;
                if let Some(actor) = actor {
                    order.updated_by = actor;
                }
                order.updated_at = now_millis();
                uow.put_order(&order)?;
                Ok((order, previous))
            })?;

        if previous != status {
            tracing::info!(
                order_id = order.id,
                txn_ref = %order.txn_ref,
                from = previous.as_str(),
                to = status.as_str(),
                "Payment status changed"
            );
            self.audit.log(
                AuditAction::PaymentStatusChanged,
                "order",
                resource_id(&order),
                actor,
                serde_json::json!({
                    "description": "Payment status changed",
                    "txn_ref": order.txn_ref,
                    "from": previous.as_str(),
                    "to": status.as_str(),
                }),
            );
            if let Some(kind) = match status {
                PaymentStatus::Paid => Some(NotificationKind::PaymentSucceeded),
                PaymentStatus::Failed => Some(NotificationKind::PaymentFailed),
                _ => None,
            } {
                message::notify(
                    self.publisher.as_ref(),
                    Notification::new(
                        order.user_id,
                        kind,
                        "Payment update",
                        format!("Payment for order #{} is {}", order.id, status.as_str()),
                    )
                    .with_metadata(serde_json::json!({ "order_id": order.id, "payment_status": status })),
                );
            }
            self.invalidate().await;
        }
        Ok(order)
    }

    // ========== Queries ==========

    pub async fn get_order(&self, order_id: i64) -> ManagerResult<Order> {
        let key = cache::order_detail_key(order_id);
        if let Some(order) = cache::get_json::<Order>(self.cache.as_ref(), &key).await {
            return Ok(order);
        }
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))?;
        cache::set_json(self.cache.as_ref(), &key, &order, self.cache_ttl).await;
        Ok(order)
    }

    pub fn find_by_txn_ref(&self, txn_ref: &str) -> ManagerResult<Order> {
        self.storage
            .find_order_by_txn_ref(txn_ref)?
            .ok_or_else(|| ManagerError::OrderNotFound(txn_ref.to_string()))
    }

    /// A user's orders, newest first
    pub async fn list_user_orders(&self, user_id: i64) -> ManagerResult<Vec<Order>> {
        let key = cache::user_orders_key(user_id);
        if let Some(orders) = cache::get_json::<Vec<Order>>(self.cache.as_ref(), &key).await {
            return Ok(orders);
        }
        let orders = self.storage.list_orders_for_user(user_id)?;
        cache::set_json(self.cache.as_ref(), &key, &orders, self.cache_ttl).await;
        Ok(orders)
    }

    // ========== Internals ==========

    fn place(
        &self,
        uow: &UnitOfWork<'_>,
        draft: &OrderDraft,
        user_id: i64,
        options: &CheckoutOptions,
    ) -> ManagerResult<Order> {
        if draft.lines.is_empty() {
            return Err(ManagerError::EmptyOrder);
        }

        let lines = merge_lines(&draft.lines)?;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(price_and_reserve(uow, line)?);
        }
        let subtotal = money::subtotal(&items);

        let (voucher_id, voucher_code, discount) = match options
            .voucher_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
        {
            Some(code) => {
                let evaluation = vouchers::evaluate_in(uow, code, user_id, subtotal)?;
                let voucher = vouchers::commit_usage(uow, evaluation.voucher.id, user_id)?;
                (Some(voucher.id), Some(voucher.code), evaluation.discount)
            }
            None => (None, None, Decimal::ZERO),
        };

        let mut id = snowflake_id();
        while uow.get_order(id)?.is_some() {
            id = snowflake_id();
        }
        let now = now_millis();
        let order = Order {
            id,
            user_id,
            txn_ref: uuid::Uuid::new_v4().simple().to_string(),
            items,
            subtotal,
            voucher_id,
            voucher_code,
            discount,
            total: money::final_total(subtotal, discount),
            shipping_info: options.shipping_info.clone(),
            payment_method: options.payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_by: user_id,
            updated_by: user_id,
            created_at: now,
            updated_at: now,
        };
        uow.put_order(&order)?;
        Ok(order)
    }

    async fn after_create(&self, order: &Order) {
        tracing::info!(
            order_id = order.id,
            user_id = order.user_id,
            txn_ref = %order.txn_ref,
            lines = order.items.len(),
            total = %order.total,
            "Order created"
        );
        self.audit.log(
            AuditAction::OrderCreated,
            "order",
            resource_id(order),
            Some(order.created_by),
            serde_json::json!({
                "description": "Order created",
                "txn_ref": order.txn_ref,
                "subtotal": order.subtotal.to_string(),
                "discount": order.discount.to_string(),
                "total": order.total.to_string(),
                "voucher_code": order.voucher_code,
            }),
        );
        message::notify(
            self.publisher.as_ref(),
            Notification::new(
                order.user_id,
                NotificationKind::OrderCreated,
                "Order placed",
                format!("Order #{} has been placed", order.id),
            )
            .with_metadata(serde_json::json!({
                "order_id": order.id,
                "txn_ref": order.txn_ref,
                "total": order.total.to_string(),
            })),
        );
        self.invalidate().await;
    }

    async fn invalidate(&self) {
        cache::invalidate(self.cache.as_ref(), cache::ORDERS_PATTERN).await;
    }
}

fn resource_id(order: &Order) -> String {
    format!("order:{}", order.id)
}

fn load_order(uow: &UnitOfWork<'_>, order_id: i64) -> ManagerResult<Order> {
    uow.get_order(order_id)?
        .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))
}

/// Merge lines sharing (inventory_id, color_id), keeping first-seen order
fn merge_lines(lines: &[DraftLine]) -> ManagerResult<Vec<DraftLine>> {
    let mut merged: Vec<DraftLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(ManagerError::InvalidQuantity {
                inventory_id: line.inventory_id,
                quantity: line.quantity,
            });
        }
        match merged
            .iter_mut()
            .find(|m| m.inventory_id == line.inventory_id && m.color_id == line.color_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or(
                    ManagerError::InvalidQuantity {
                        inventory_id: line.inventory_id,
                        quantity: i64::MAX,
                    },
                )?;
            }
            None => merged.push(line.clone()),
        }
    }

    if let Some(line) = merged.iter().find(|l| l.quantity > MAX_QUANTITY) {
        return Err(ManagerError::InvalidQuantity {
            inventory_id: line.inventory_id,
            quantity: line.quantity,
        });
    }
    Ok(merged)
}

/// Resolve the live product behind a line, price it and reserve its stock
fn price_and_reserve(uow: &UnitOfWork<'_>, line: &DraftLine) -> ManagerResult<OrderItem> {
    let unavailable = || ManagerError::ProductUnavailable {
        inventory_id: line.inventory_id,
        product_id: line.product_id,
    };

    let inventory = uow
        .get_inventory(line.inventory_id)?
        .filter(|inv| !inv.is_deleted)
        .ok_or_else(unavailable)?;
    let product = uow
        .get_product(inventory.product_id)?
        .filter(|p| !p.is_deleted)
        .ok_or_else(unavailable)?;
    if product.price <= Decimal::ZERO {
        return Err(ManagerError::InvalidPrice(product.id));
    }

    ledger::reserve(uow, inventory.id, line.quantity)?;

    Ok(OrderItem {
        inventory_id: inventory.id,
        product_id: product.id,
        product_name: product.name,
        color_id: line.color_id.or(inventory.color_id),
        size_id: line.size_id.or(inventory.size_id),
        quantity: line.quantity,
        price: money::round_money(product.price),
    })
}

#[cfg(test)]
mod tests;

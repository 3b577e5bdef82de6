use super::*;
use crate::audit::{AuditLogRequest, AuditStorage};
use crate::cache::MemoryCache;
use crate::message::MessageBus;
use shared::models::{
    Cart, CartItem, DiscountType, Inventory, PaymentMethod, Product, ShippingInfo, Voucher,
};
use tokio::sync::{broadcast, mpsc};

mod test_create;
mod test_status;

const USER: i64 = 7;
const HOODIE: i64 = 1;
const TEE: i64 = 2;
/// Hoodie, black
const HOODIE_BLACK: i64 = 10;
/// Hoodie, white
const HOODIE_WHITE: i64 = 11;
/// Tee, single variant
const TEE_ONE: i64 = 20;

struct TestEnv {
    manager: OrdersManager,
    cache: Arc<MemoryCache>,
    audit_rx: mpsc::Receiver<AuditLogRequest>,
    notifications: broadcast::Receiver<Notification>,
}

impl TestEnv {
    fn storage(&self) -> &ShopStorage {
        self.manager.storage()
    }

    fn stock(&self, inventory_id: i64) -> i64 {
        self.storage()
            .get_inventory(inventory_id)
            .unwrap()
            .unwrap()
            .quantity
    }

    fn total_stock(&self, product_id: i64) -> i64 {
        self.storage()
            .get_product(product_id)
            .unwrap()
            .unwrap()
            .total_stock
    }

    fn audit_actions(&mut self) -> Vec<AuditAction> {
        let mut actions = Vec::new();
        while let Ok(req) = self.audit_rx.try_recv() {
            actions.push(req.action);
        }
        actions
    }

    fn notification_kinds(&mut self) -> Vec<NotificationKind> {
        let mut kinds = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            kinds.push(n.kind);
        }
        kinds
    }
}

/// Hoodie 350 000 (black: 10, white: 4), tee 120 000.50 (tee: 3)
fn create_test_env() -> TestEnv {
    let storage = ShopStorage::open_in_memory().unwrap();
    seed_catalog(&storage);

    let audit_storage = AuditStorage::open(storage.database()).unwrap();
    let (audit, audit_rx) = AuditService::new(audit_storage, 64);
    let bus = MessageBus::new();
    let notifications = bus.subscribe();
    let cache = Arc::new(MemoryCache::new());

    let manager = OrdersManager::new(storage, cache.clone(), Arc::new(bus), audit);
    TestEnv {
        manager,
        cache,
        audit_rx,
        notifications,
    }
}

fn seed_catalog(storage: &ShopStorage) {
    storage
        .run(|uow| -> ManagerResult<()> {
            uow.put_product(&product(HOODIE, "Hoodie", Decimal::new(350_000, 0)))?;
            uow.put_product(&product(TEE, "Tee", Decimal::new(12_000_050, 2)))?;
            uow.put_inventory(&inventory(HOODIE_BLACK, HOODIE, Some(1), 10))?;
            uow.put_inventory(&inventory(HOODIE_WHITE, HOODIE, Some(2), 4))?;
            uow.put_inventory(&inventory(TEE_ONE, TEE, None, 3))?;
            ledger::recompute_product_stock(uow, HOODIE)?;
            ledger::recompute_product_stock(uow, TEE)?;
            Ok(())
        })
        .unwrap();
}

fn product(id: i64, name: &str, price: Decimal) -> Product {
    Product {
        id,
        name: name.to_string(),
        price,
        total_stock: 0,
        is_deleted: false,
        created_at: 0,
        updated_at: 0,
    }
}

fn inventory(id: i64, product_id: i64, color_id: Option<i64>, quantity: i64) -> Inventory {
    Inventory {
        id,
        product_id,
        color_id,
        size_id: Some(1),
        quantity,
        min_quantity: None,
        max_quantity: None,
        is_deleted: false,
        updated_at: 0,
    }
}

fn seed_voucher(storage: &ShopStorage, voucher: Voucher) {
    storage
        .run(|uow| -> ManagerResult<()> {
            uow.put_voucher(&voucher)?;
            Ok(())
        })
        .unwrap();
}

fn voucher(code: &str, discount_type: DiscountType, value: Decimal) -> Voucher {
    let now = now_millis();
    Voucher {
        id: 100,
        code: code.to_string(),
        discount_type,
        value,
        min_order_value: None,
        max_discount_value: None,
        usage_limit: None,
        usage_count: 0,
        usage_per_user: None,
        start_date: now - 60_000,
        end_date: now + 3_600_000,
        is_active: true,
        is_deleted: false,
    }
}

fn seed_cart(storage: &ShopStorage, user_id: i64, items: Vec<CartItem>) {
    storage
        .run(|uow| -> ManagerResult<()> {
            uow.put_cart(&Cart {
                user_id,
                items,
                is_checked_out: false,
                updated_at: 0,
            })?;
            Ok(())
        })
        .unwrap();
}

fn line(inventory_id: i64, color_id: Option<i64>, quantity: i64) -> DraftLine {
    let product_id = if inventory_id == TEE_ONE { TEE } else { HOODIE };
    DraftLine {
        inventory_id,
        product_id,
        color_id,
        size_id: Some(1),
        quantity,
    }
}

fn draft(lines: Vec<DraftLine>) -> OrderDraft {
    OrderDraft { lines }
}

fn options(voucher_code: Option<&str>) -> CheckoutOptions {
    CheckoutOptions {
        payment_method: PaymentMethod::Vnpay,
        shipping_info: ShippingInfo {
            recipient_name: "Nguyen Van A".to_string(),
            phone: "0901234567".to_string(),
            address: "1 Le Loi, District 1, HCMC".to_string(),
            note: None,
        },
        voucher_code: voucher_code.map(str::to_string),
    }
}

/// Place a plain order of `quantity` black hoodies
async fn place_hoodies(env: &TestEnv, quantity: i64) -> Order {
    env.manager
        .create_order(
            draft(vec![line(HOODIE_BLACK, Some(1), quantity)]),
            USER,
            options(None),
        )
        .await
        .unwrap()
}

fn assert_totals_consistent(order: &Order) {
    let sum: Decimal = order.items.iter().map(OrderItem::line_total).sum();
    assert_eq!(order.subtotal, sum);
    assert_eq!(order.total, order.subtotal - order.discount);
    assert!(order.total >= Decimal::ZERO);
}

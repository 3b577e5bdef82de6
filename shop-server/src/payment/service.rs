//! Payment flows over [`OrdersManager`]

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use shared::models::{Order, OrderStatus, PaymentStatus};

use super::vnpay::{PaymentUrlRequest, VnpayGateway};
use super::{PaymentError, PaymentResult};
use crate::audit::{AuditAction, AuditService};
use crate::orders::money;
use crate::orders::{ManagerError, OrderRef, OrdersManager};

/// Gateway code for a successful transaction
const VNP_SUCCESS: &str = "00";

/// IPN acknowledgement body expected by VNPay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnResponse {
    fn new(rsp_code: &str, message: &str) -> Self {
        Self {
            rsp_code: rsp_code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn confirmed() -> Self {
        Self::new("00", "Confirm Success")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn unknown_error() -> Self {
        Self::new("99", "Unknown error")
    }
}

/// What the browser return redirect reports
#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    pub order_id: i64,
    pub txn_ref: String,
    /// `vnp_ResponseCode` as sent by the gateway
    pub response_code: String,
    /// Gateway reported success; the persisted state is authoritative
    pub gateway_success: bool,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug)]
pub struct PaymentService {
    gateway: VnpayGateway,
    orders: Arc<OrdersManager>,
    audit: Arc<AuditService>,
}

impl PaymentService {
    pub fn new(gateway: VnpayGateway, orders: Arc<OrdersManager>, audit: Arc<AuditService>) -> Self {
        Self {
            gateway,
            orders,
            audit,
        }
    }

    pub fn gateway(&self) -> &VnpayGateway {
        &self.gateway
    }

    /// Signed redirect URL for one of the user's unpaid orders
    pub fn create_payment_url(&self, user_id: i64, req: &PaymentUrlRequest) -> PaymentResult<String> {
        let order = self.find_order(&req.txn_ref)?;
        if order.user_id != user_id {
            return Err(PaymentError::OrderNotFound(req.txn_ref.clone()));
        }
        if order.payment_status != PaymentStatus::Unpaid {
            return Err(PaymentError::OrderAlreadyPaid(req.txn_ref.clone()));
        }

        let url = self
            .gateway
            .build_payment_url(&order, req, chrono::Utc::now())?;
        tracing::info!(order_id = order.id, txn_ref = %order.txn_ref, "Payment URL created");
        Ok(url)
    }

    /// Verify a callback signature
    pub fn verify_callback(&self, params: &HashMap<String, String>) -> bool {
        self.gateway.verify_callback(params)
    }

    /// Browser return redirect: verify and report, never mutate
    pub fn handle_return(&self, params: &HashMap<String, String>) -> PaymentResult<ReturnOutcome> {
        if !self.verify_callback(params) {
            crate::security_log!(
                "WARN",
                "payment_return_signature_invalid",
                txn_ref = param(params, "vnp_TxnRef").unwrap_or("")
            );
            return Err(PaymentError::InvalidSignature);
        }

        let txn_ref = param(params, "vnp_TxnRef").ok_or(PaymentError::MissingParam("vnp_TxnRef"))?;
        let response_code = param(params, "vnp_ResponseCode").unwrap_or_default();
        let order = self.find_order(txn_ref)?;

        Ok(ReturnOutcome {
            order_id: order.id,
            txn_ref: order.txn_ref,
            response_code: response_code.to_string(),
            gateway_success: response_code == VNP_SUCCESS,
            status: order.status,
            payment_status: order.payment_status,
        })
    }

    /// Server-to-server IPN: the only path that settles a payment
    pub async fn handle_ipn(&self, params: &HashMap<String, String>) -> IpnResponse {
        let txn_ref = param(params, "vnp_TxnRef").unwrap_or("");

        if !self.verify_callback(params) {
            crate::security_log!("WARN", "payment_ipn_signature_invalid", txn_ref = txn_ref);
            self.reject(txn_ref, "invalid_signature");
            return IpnResponse::invalid_signature();
        }

        let order = match self.orders.find_by_txn_ref(txn_ref) {
            Ok(order) => order,
            Err(ManagerError::OrderNotFound(_)) => {
                tracing::warn!(txn_ref, "IPN for unknown order");
                self.reject(txn_ref, "order_not_found");
                return IpnResponse::order_not_found();
            }
            Err(e) => {
                tracing::error!(txn_ref, error = %e, "IPN order lookup failed");
                return IpnResponse::unknown_error();
            }
        };

        let expected = money::to_minor_units(order.total);
        let received = param(params, "vnp_Amount").and_then(|a| a.parse::<i64>().ok());
        if expected.is_none() || expected != received {
            tracing::warn!(
                order_id = order.id,
                txn_ref,
                ?expected,
                ?received,
                "IPN amount mismatch"
            );
            self.reject(txn_ref, "amount_mismatch");
            return IpnResponse::invalid_amount();
        }

        if order.payment_status != PaymentStatus::Unpaid {
            tracing::info!(
                order_id = order.id,
                payment_status = order.payment_status.as_str(),
                "IPN for already settled order"
            );
            return IpnResponse::already_confirmed();
        }

        let response_code = param(params, "vnp_ResponseCode").unwrap_or_default();
        let status = if response_code == VNP_SUCCESS {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        };

        match self
            .orders
            .update_payment_status(OrderRef::TxnRef(txn_ref.to_string()), status, None)
            .await
        {
            Ok(updated) => {
                self.audit.log(
                    AuditAction::PaymentIpnReceived,
                    "order",
                    format!("order:{}", updated.id),
                    None,
                    serde_json::json!({
                        "description": "VNPay IPN applied",
                        "txn_ref": txn_ref,
                        "response_code": response_code,
                        "transaction_no": param(params, "vnp_TransactionNo"),
                        "bank_code": param(params, "vnp_BankCode"),
                        "payment_status": status.as_str(),
                    }),
                );
                IpnResponse::confirmed()
            }
            // A concurrent IPN settled it first
            Err(ManagerError::InvalidPaymentTransition { .. }) => IpnResponse::already_confirmed(),
            Err(e) => {
                tracing::error!(txn_ref, error = %e, "IPN payment update failed");
                IpnResponse::unknown_error()
            }
        }
    }

    fn find_order(&self, txn_ref: &str) -> PaymentResult<Order> {
        self.orders.find_by_txn_ref(txn_ref).map_err(|e| match e {
            ManagerError::OrderNotFound(_) => PaymentError::OrderNotFound(txn_ref.to_string()),
            other => PaymentError::Manager(other),
        })
    }

    fn reject(&self, txn_ref: &str, reason: &str) {
        self.audit.log(
            AuditAction::PaymentIpnRejected,
            "payment",
            format!("txn_ref:{}", txn_ref),
            None,
            serde_json::json!({ "description": "VNPay IPN rejected", "reason": reason }),
        );
    }
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLogRequest, AuditStorage};
    use crate::cache::MemoryCache;
    use crate::message::MessageBus;
    use crate::payment::signer::canonical_sign;
    use crate::payment::vnpay::VnpayConfig;
    use crate::storage::ShopStorage;
    use rust_decimal::Decimal;
    use shared::models::{
        CheckoutOptions, DraftLine, Inventory, OrderDraft, PaymentMethod, Product, ShippingInfo,
    };
    use std::collections::BTreeMap;
    use tokio::sync::mpsc;

    const SECRET: &str = "SECRETKEY";

    struct Env {
        service: PaymentService,
        orders: Arc<OrdersManager>,
        audit_rx: mpsc::Receiver<AuditLogRequest>,
    }

    fn env() -> Env {
        let storage = ShopStorage::open_in_memory().unwrap();
        storage
            .run(|uow| -> crate::storage::StorageResult<()> {
                uow.put_product(&Product {
                    id: 1,
                    name: "Hoodie".to_string(),
                    price: Decimal::new(250_000, 0),
                    total_stock: 0,
                    is_deleted: false,
                    created_at: 0,
                    updated_at: 0,
                })?;
                uow.put_inventory(&Inventory {
                    id: 10,
                    product_id: 1,
                    color_id: None,
                    size_id: None,
                    quantity: 100,
                    min_quantity: None,
                    max_quantity: None,
                    is_deleted: false,
                    updated_at: 0,
                })?;
                Ok(())
            })
            .unwrap();

        let (audit, audit_rx) = AuditService::new(AuditStorage::open(storage.database()).unwrap(), 64);
        let orders = Arc::new(OrdersManager::new(
            storage,
            Arc::new(MemoryCache::new()),
            Arc::new(MessageBus::new()),
            audit.clone(),
        ));
        let gateway = VnpayGateway::new(VnpayConfig {
            tmn_code: "TESTCODE".to_string(),
            hash_secret: SECRET.to_string(),
            ..Default::default()
        });
        Env {
            service: PaymentService::new(gateway, orders.clone(), audit),
            orders,
            audit_rx,
        }
    }

    async fn place(env: &Env, user_id: i64, quantity: i64) -> Order {
        env.orders
            .create_order(
                OrderDraft {
                    lines: vec![DraftLine {
                        inventory_id: 10,
                        product_id: 1,
                        color_id: None,
                        size_id: None,
                        quantity,
                    }],
                },
                user_id,
                CheckoutOptions {
                    payment_method: PaymentMethod::Vnpay,
                    shipping_info: ShippingInfo {
                        recipient_name: "A".to_string(),
                        phone: "0900000000".to_string(),
                        address: "HCMC".to_string(),
                        note: None,
                    },
                    voucher_code: None,
                },
            )
            .await
            .unwrap()
    }

    /// A callback as the gateway would send it, signed with `secret`
    fn callback(order: &Order, response_code: &str, amount: i64, secret: &str) -> HashMap<String, String> {
        let mut signed = BTreeMap::new();
        signed.insert("vnp_TmnCode".to_string(), "TESTCODE".to_string());
        signed.insert("vnp_TxnRef".to_string(), order.txn_ref.clone());
        signed.insert("vnp_Amount".to_string(), amount.to_string());
        signed.insert("vnp_ResponseCode".to_string(), response_code.to_string());
        signed.insert("vnp_TransactionNo".to_string(), "14123456".to_string());
        signed.insert("vnp_BankCode".to_string(), "NCB".to_string());
        signed.insert("vnp_OrderInfo".to_string(), "Thanh toan don hang".to_string());
        let hash = canonical_sign(&signed, secret).unwrap();

        let mut params: HashMap<String, String> = signed.into_iter().collect();
        params.insert("vnp_SecureHash".to_string(), hash);
        params.insert("vnp_SecureHashType".to_string(), "HmacSHA512".to_string());
        params
    }

    fn minor(order: &Order) -> i64 {
        money::to_minor_units(order.total).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<AuditLogRequest>) -> Vec<AuditAction> {
        let mut actions = Vec::new();
        while let Ok(req) = rx.try_recv() {
            actions.push(req.action);
        }
        actions
    }

    #[tokio::test]
    async fn test_create_payment_url_checks_owner_and_status() {
        let env = env();
        let order = place(&env, 7, 2).await;
        let req = PaymentUrlRequest {
            txn_ref: order.txn_ref.clone(),
            ..Default::default()
        };

        let url = env.service.create_payment_url(7, &req).unwrap();
        assert!(url.contains("vnp_Amount=50000000"));
        assert!(url.contains(&format!("vnp_TxnRef={}", order.txn_ref)));

        assert!(matches!(
            env.service.create_payment_url(8, &req),
            Err(PaymentError::OrderNotFound(_))
        ));
        assert!(matches!(
            env.service.create_payment_url(
                7,
                &PaymentUrlRequest {
                    txn_ref: "nope".to_string(),
                    ..Default::default()
                }
            ),
            Err(PaymentError::OrderNotFound(_))
        ));

        env.orders
            .update_payment_status(OrderRef::Id(order.id), PaymentStatus::Paid, None)
            .await
            .unwrap();
        assert!(matches!(
            env.service.create_payment_url(7, &req),
            Err(PaymentError::OrderAlreadyPaid(_))
        ));
    }

    #[tokio::test]
    async fn test_ipn_success_marks_paid_once() {
        let mut env = env();
        let order = place(&env, 7, 1).await;
        drain(&mut env.audit_rx);
        let params = callback(&order, "00", minor(&order), SECRET);

        assert_eq!(env.service.handle_ipn(&params).await, IpnResponse::confirmed());
        let stored = env.orders.find_by_txn_ref(&order.txn_ref).unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(
            drain(&mut env.audit_rx),
            vec![AuditAction::PaymentStatusChanged, AuditAction::PaymentIpnReceived]
        );

        // Duplicate delivery
        assert_eq!(
            env.service.handle_ipn(&params).await,
            IpnResponse::already_confirmed()
        );
        assert!(drain(&mut env.audit_rx).is_empty());
    }

    #[tokio::test]
    async fn test_ipn_failure_code_marks_failed() {
        let env = env();
        let order = place(&env, 7, 1).await;
        let params = callback(&order, "24", minor(&order), SECRET);

        assert_eq!(env.service.handle_ipn(&params).await.rsp_code, "00");
        assert_eq!(
            env.orders.find_by_txn_ref(&order.txn_ref).unwrap().payment_status,
            PaymentStatus::Failed
        );

        // A late success after failure does not flip the status
        let late = callback(&order, "00", minor(&order), SECRET);
        assert_eq!(env.service.handle_ipn(&late).await.rsp_code, "02");
        assert_eq!(
            env.orders.find_by_txn_ref(&order.txn_ref).unwrap().payment_status,
            PaymentStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_ipn_rejections() {
        let mut env = env();
        let order = place(&env, 7, 1).await;
        drain(&mut env.audit_rx);

        let forged = callback(&order, "00", minor(&order), "WRONG");
        assert_eq!(env.service.handle_ipn(&forged).await.rsp_code, "97");

        let mut tampered = callback(&order, "00", minor(&order), SECRET);
        tampered.insert("vnp_ResponseCode".to_string(), "01".to_string());
        assert_eq!(env.service.handle_ipn(&tampered).await.rsp_code, "97");

        let wrong_amount = callback(&order, "00", minor(&order) - 100, SECRET);
        assert_eq!(env.service.handle_ipn(&wrong_amount).await.rsp_code, "04");

        let mut ghost = order.clone();
        ghost.txn_ref = "ghost".to_string();
        let unknown = callback(&ghost, "00", minor(&order), SECRET);
        assert_eq!(env.service.handle_ipn(&unknown).await.rsp_code, "01");

        assert_eq!(
            env.orders.find_by_txn_ref(&order.txn_ref).unwrap().payment_status,
            PaymentStatus::Unpaid
        );
        assert_eq!(
            drain(&mut env.audit_rx),
            vec![AuditAction::PaymentIpnRejected; 4]
        );
    }

    #[tokio::test]
    async fn test_return_is_read_only() {
        let env = env();
        let order = place(&env, 7, 1).await;
        let params = callback(&order, "00", minor(&order), SECRET);

        let outcome = env.service.handle_return(&params).unwrap();
        assert!(outcome.gateway_success);
        assert_eq!(outcome.order_id, order.id);
        assert_eq!(outcome.payment_status, PaymentStatus::Unpaid);
        assert_eq!(
            env.orders.find_by_txn_ref(&order.txn_ref).unwrap().payment_status,
            PaymentStatus::Unpaid
        );

        let forged = callback(&order, "00", minor(&order), "WRONG");
        assert!(matches!(
            env.service.handle_return(&forged),
            Err(PaymentError::InvalidSignature)
        ));
    }
}

//! VNPay wire format: outbound payment URL and inbound callback verification

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use shared::models::Order;

use super::signer::{canonical_query, canonical_sign, verify_signature};
use super::{PaymentError, PaymentResult};
use crate::orders::money;

pub const VNP_VERSION: &str = "2.1.0";
pub const VNP_SANDBOX_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";

/// Fields excluded from the signed set
const HASH_FIELD: &str = "vnp_SecureHash";
const HASH_TYPE_FIELD: &str = "vnp_SecureHashType";

/// Payment link validity in minutes (advisory; enforced by the gateway)
const PAYMENT_EXPIRY_MINUTES: i64 = 15;

/// VNPay timestamps are wall-clock GMT+7
const GATEWAY_UTC_OFFSET_HOURS: i64 = 7;

#[derive(Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub return_url: String,
    /// Default `vnp_Locale` (`vn` or `en`)
    pub locale: String,
}

impl std::fmt::Debug for VnpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VnpayConfig")
            .field("tmn_code", &self.tmn_code)
            .field("hash_secret", &"<redacted>")
            .field("pay_url", &self.pay_url)
            .field("return_url", &self.return_url)
            .field("locale", &self.locale)
            .finish()
    }
}

impl Default for VnpayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            hash_secret: String::new(),
            pay_url: VNP_SANDBOX_URL.to_string(),
            return_url: "http://localhost:3000/api/payment/vnpay/return".to_string(),
            locale: "vn".to_string(),
        }
    }
}

/// Client request for a payment link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentUrlRequest {
    pub txn_ref: String,
    #[serde(default)]
    pub bank_code: Option<String>,
    #[serde(default)]
    pub ip_addr: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VnpayGateway {
    config: VnpayConfig,
}

impl VnpayGateway {
    pub fn new(config: VnpayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VnpayConfig {
        &self.config
    }

    /// Build the signed redirect URL for `order`
    pub fn build_payment_url(
        &self,
        order: &Order,
        req: &PaymentUrlRequest,
        now: DateTime<Utc>,
    ) -> PaymentResult<String> {
        let amount = money::to_minor_units(order.total)
            .ok_or_else(|| PaymentError::InvalidAmount(order.total.to_string()))?;
        let locale = req
            .locale
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.config.locale);

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), VNP_VERSION.to_string());
        params.insert("vnp_Command".to_string(), "pay".to_string());
        params.insert("vnp_TmnCode".to_string(), self.config.tmn_code.clone());
        params.insert("vnp_Locale".to_string(), locale.to_string());
        params.insert("vnp_CurrCode".to_string(), "VND".to_string());
        params.insert("vnp_TxnRef".to_string(), order.txn_ref.clone());
        params.insert(
            "vnp_OrderInfo".to_string(),
            format!("Thanh toan don hang {}", order.txn_ref),
        );
        params.insert("vnp_OrderType".to_string(), "other".to_string());
        params.insert("vnp_Amount".to_string(), amount.to_string());
        params.insert("vnp_ReturnUrl".to_string(), self.config.return_url.clone());
        params.insert("vnp_IpAddr".to_string(), normalize_ip(req.ip_addr.as_deref()));
        params.insert("vnp_CreateDate".to_string(), format_gateway_time(now));
        params.insert(
            "vnp_ExpireDate".to_string(),
            format_gateway_time(now + TimeDelta::minutes(PAYMENT_EXPIRY_MINUTES)),
        );
        if let Some(bank_code) = req.bank_code.as_deref().filter(|b| !b.is_empty()) {
            params.insert("vnp_BankCode".to_string(), bank_code.to_string());
        }

        let hash = canonical_sign(&params, &self.config.hash_secret)?;
        Ok(format!(
            "{}?{}&{}={}",
            self.config.pay_url,
            canonical_query(&params),
            HASH_FIELD,
            hash
        ))
    }

    /// Check the `vnp_SecureHash` of a return/IPN callback
    pub fn verify_callback(&self, params: &HashMap<String, String>) -> bool {
        let Some(signature) = params.get(HASH_FIELD) else {
            return false;
        };
        verify_signature(&signed_fields(params), &self.config.hash_secret, signature)
    }
}

/// Every parameter except the hash fields
fn signed_fields(params: &HashMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .filter(|(k, _)| *k != HASH_FIELD && *k != HASH_TYPE_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Loopback IPv6 and IPv4-mapped addresses as plain IPv4
pub fn normalize_ip(ip: Option<&str>) -> String {
    match ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        None | Some("::1") => "127.0.0.1".to_string(),
        Some(ip) => ip.strip_prefix("::ffff:").unwrap_or(ip).to_string(),
    }
}

/// `yyyyMMddHHmmss` in GMT+7
pub fn format_gateway_time(at: DateTime<Utc>) -> String {
    (at + TimeDelta::hours(GATEWAY_UTC_OFFSET_HOURS)).format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use shared::models::{OrderStatus, PaymentMethod, PaymentStatus, ShippingInfo};

    fn test_order(total: Decimal) -> Order {
        Order {
            id: 1,
            user_id: 7,
            txn_ref: "a1b2c3".to_string(),
            items: vec![],
            subtotal: total,
            voucher_id: None,
            voucher_code: None,
            discount: Decimal::ZERO,
            total,
            shipping_info: ShippingInfo {
                recipient_name: "A".to_string(),
                phone: "0900000000".to_string(),
                address: "HCMC".to_string(),
                note: None,
            },
            payment_method: PaymentMethod::Vnpay,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_by: 7,
            updated_by: 7,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn gateway() -> VnpayGateway {
        VnpayGateway::new(VnpayConfig {
            tmn_code: "TESTCODE".to_string(),
            hash_secret: "SECRETKEY".to_string(),
            pay_url: VNP_SANDBOX_URL.to_string(),
            return_url: "https://shop.test/return".to_string(),
            locale: "vn".to_string(),
        })
    }

    /// Decode a form-encoded query string the way a gateway would
    fn parse_query(url: &str) -> HashMap<String, String> {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| {
                let decode = |s: &str| urlencoding::decode(&s.replace('+', " ")).unwrap().into_owned();
                (decode(k), decode(v))
            })
            .collect()
    }

    #[test]
    fn test_payment_url_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let url = gateway()
            .build_payment_url(
                &test_order(Decimal::new(1_050_000, 0)),
                &PaymentUrlRequest {
                    txn_ref: "a1b2c3".to_string(),
                    bank_code: Some("NCB".to_string()),
                    ip_addr: Some("::1".to_string()),
                    locale: None,
                },
                now,
            )
            .unwrap();

        assert!(url.starts_with(VNP_SANDBOX_URL));
        let params = parse_query(&url);
        assert_eq!(params["vnp_Version"], "2.1.0");
        assert_eq!(params["vnp_Command"], "pay");
        assert_eq!(params["vnp_TmnCode"], "TESTCODE");
        assert_eq!(params["vnp_Locale"], "vn");
        assert_eq!(params["vnp_CurrCode"], "VND");
        assert_eq!(params["vnp_TxnRef"], "a1b2c3");
        assert_eq!(params["vnp_OrderType"], "other");
        assert_eq!(params["vnp_Amount"], "105000000");
        assert_eq!(params["vnp_ReturnUrl"], "https://shop.test/return");
        assert_eq!(params["vnp_IpAddr"], "127.0.0.1");
        assert_eq!(params["vnp_CreateDate"], "20240101070000");
        assert_eq!(params["vnp_ExpireDate"], "20240101071500");
        assert_eq!(params["vnp_BankCode"], "NCB");
        assert_eq!(params["vnp_SecureHash"].len(), 128);
    }

    #[test]
    fn test_payment_url_roundtrips_through_verification() {
        let gw = gateway();
        let url = gw
            .build_payment_url(
                &test_order(Decimal::new(99_999, 0)),
                &PaymentUrlRequest {
                    txn_ref: "a1b2c3".to_string(),
                    locale: Some("en".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        let mut params = parse_query(&url);
        assert_eq!(params["vnp_Locale"], "en");
        assert!(!params.contains_key("vnp_BankCode"));
        assert!(gw.verify_callback(&params));

        params.insert("vnp_SecureHashType".to_string(), "HmacSHA512".to_string());
        assert!(gw.verify_callback(&params));

        let mut tampered = params.clone();
        tampered.insert("vnp_Amount".to_string(), "1".to_string());
        assert!(!gw.verify_callback(&tampered));

        let mut extra = params.clone();
        extra.insert("utm_source".to_string(), "mail".to_string());
        assert!(!gw.verify_callback(&extra));
    }

    #[test]
    fn test_unprefixed_signed_field_cannot_be_altered() {
        let gw = gateway();
        let mut fields = BTreeMap::new();
        fields.insert("vnp_TxnRef".to_string(), "a1b2c3".to_string());
        fields.insert("order_note".to_string(), "gift".to_string());
        let hash = canonical_sign(&fields, "SECRETKEY").unwrap();

        let mut params: HashMap<String, String> = fields.into_iter().collect();
        params.insert(HASH_FIELD.to_string(), hash);
        assert!(gw.verify_callback(&params));

        params.insert("order_note".to_string(), "changed".to_string());
        assert!(!gw.verify_callback(&params));
    }

    #[test]
    fn test_callback_without_hash_rejected() {
        let mut params = HashMap::new();
        params.insert("vnp_TxnRef".to_string(), "a1b2c3".to_string());
        assert!(!gateway().verify_callback(&params));
    }

    #[test]
    fn test_normalize_ip() {
        assert_eq!(normalize_ip(Some("::1")), "127.0.0.1");
        assert_eq!(normalize_ip(None), "127.0.0.1");
        assert_eq!(normalize_ip(Some("  ")), "127.0.0.1");
        assert_eq!(normalize_ip(Some("::ffff:10.0.0.2")), "10.0.0.2");
        assert_eq!(normalize_ip(Some("203.0.113.9")), "203.0.113.9");
    }

    #[test]
    fn test_fractional_total_rounds_to_minor_units() {
        let url = gateway()
            .build_payment_url(
                &test_order(Decimal::new(1_234_567, 3)),
                &PaymentUrlRequest::default(),
                Utc::now(),
            )
            .unwrap();
        // 1234.567 → 1234.57 → 123457
        assert_eq!(parse_query(&url)["vnp_Amount"], "123457");
    }
}

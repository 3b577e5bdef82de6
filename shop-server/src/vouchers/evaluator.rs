//! Voucher evaluation and redemption
//!
//! # Evaluation order
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. Code (uppercased) resolves to an active, non-deleted voucher → `NotFound`
//! 2. `start_date <= now <= end_date` → `Expired`
//! 3. `usage_count < usage_limit` (if set) → `UsageLimitExceeded`
//! 4. `subtotal >= min_order_value` (if set) → `BelowMinimumOrder`
//! 5. user's `used_count < usage_per_user` (if set) → `PerUserLimitExceeded`
//!
//! Evaluation never writes. [`commit_usage`] performs the redemption inside
//! the order's unit of work and re-checks the limits there, so two orders
//! racing for the last use cannot both succeed.

use crate::orders::money::{final_total, round_money};
use crate::storage::{ShopStorage, StorageError, UnitOfWork};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{DiscountType, UserVoucherUsage, Voucher};
use shared::util::now_millis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoucherError {
    #[error("Voucher not found: {0}")]
    NotFound(String),

    #[error("Voucher {0} is not valid at this time")]
    Expired(String),

    #[error("Voucher {0} has reached its usage limit")]
    UsageLimitExceeded(String),

    #[error("Order subtotal {subtotal} is below the minimum {minimum} for voucher {code}")]
    BelowMinimumOrder {
        code: String,
        minimum: Decimal,
        subtotal: Decimal,
    },

    #[error("Voucher {0} already used the maximum number of times by this user")]
    PerUserLimitExceeded(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type VoucherResult<T> = Result<T, VoucherError>;

impl From<VoucherError> for AppError {
    fn from(err: VoucherError) -> Self {
        match err {
            VoucherError::NotFound(code) => {
                AppError::new(ErrorCode::VoucherNotFound).with_detail("code", code)
            }
            VoucherError::Expired(code) => {
                AppError::new(ErrorCode::VoucherExpired).with_detail("code", code)
            }
            VoucherError::UsageLimitExceeded(code) => {
                AppError::new(ErrorCode::VoucherUsageLimitExceeded).with_detail("code", code)
            }
            VoucherError::BelowMinimumOrder {
                code,
                minimum,
                subtotal,
            } => AppError::new(ErrorCode::VoucherBelowMinimumOrder)
                .with_detail("code", code)
                .with_detail("minimum", minimum.to_string())
                .with_detail("subtotal", subtotal.to_string()),
            VoucherError::PerUserLimitExceeded(code) => {
                AppError::new(ErrorCode::VoucherPerUserLimitExceeded).with_detail("code", code)
            }
            VoucherError::Storage(e) => e.into(),
        }
    }
}

/// Outcome of a successful evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub discount: Decimal,
    pub final_total: Decimal,
    pub voucher: Voucher,
}

/// Discount a voucher grants on `subtotal`, never more than the subtotal
pub fn compute_discount(voucher: &Voucher, subtotal: Decimal) -> Decimal {
    let raw = match voucher.discount_type {
        DiscountType::Fixed => voucher.value,
        DiscountType::Percentage => {
            let pct = subtotal * voucher.value / Decimal::ONE_HUNDRED;
            match voucher.max_discount_value {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
    };
    round_money(raw.max(Decimal::ZERO).min(subtotal.max(Decimal::ZERO)))
}

/// Run checks 2-5 against an already resolved voucher
pub fn check(
    voucher: &Voucher,
    user_used_count: i64,
    subtotal: Decimal,
    now: i64,
) -> VoucherResult<()> {
    if !voucher.is_within_window(now) {
        return Err(VoucherError::Expired(voucher.code.clone()));
    }
    if !voucher.has_remaining_uses() {
        return Err(VoucherError::UsageLimitExceeded(voucher.code.clone()));
    }
    if let Some(minimum) = voucher.min_order_value
        && subtotal < minimum
    {
        return Err(VoucherError::BelowMinimumOrder {
            code: voucher.code.clone(),
            minimum,
            subtotal,
        });
    }
    if let Some(per_user) = voucher.usage_per_user
        && user_used_count >= per_user
    {
        return Err(VoucherError::PerUserLimitExceeded(voucher.code.clone()));
    }
    Ok(())
}

fn finish(
    code: &str,
    voucher: Option<Voucher>,
    usage: impl FnOnce(&Voucher) -> VoucherResult<i64>,
    subtotal: Decimal,
) -> VoucherResult<Evaluation> {
    let voucher = voucher
        .filter(Voucher::is_redeemable)
        .ok_or_else(|| VoucherError::NotFound(code.trim().to_uppercase()))?;
    let used = usage(&voucher)?;
    check(&voucher, used, subtotal, now_millis())?;

    let discount = compute_discount(&voucher, subtotal);
    Ok(Evaluation {
        discount,
        final_total: final_total(subtotal, discount),
        voucher,
    })
}

/// Evaluate `code` for `user_id` against an order subtotal (read-only)
pub fn evaluate(
    storage: &ShopStorage,
    code: &str,
    user_id: i64,
    subtotal: Decimal,
) -> VoucherResult<Evaluation> {
    let voucher = storage.find_voucher_by_code(code)?;
    finish(
        code,
        voucher,
        |v| {
            Ok(storage
                .get_voucher_usage(user_id, v.id)?
                .map_or(0, |u| u.used_count))
        },
        subtotal,
    )
}

/// Same as [`evaluate`], reading through an open unit of work
pub fn evaluate_in(
    uow: &UnitOfWork<'_>,
    code: &str,
    user_id: i64,
    subtotal: Decimal,
) -> VoucherResult<Evaluation> {
    let voucher = uow.find_voucher_by_code(code)?;
    finish(
        code,
        voucher,
        |v| Ok(uow.get_voucher_usage(user_id, v.id)?.map_or(0, |u| u.used_count)),
        subtotal,
    )
}

/// Record one redemption of `voucher_id` by `user_id`
///
/// Increments the global counter and upserts the per-user counter. Limits are
/// re-checked against the values inside this unit of work.
pub fn commit_usage(uow: &UnitOfWork<'_>, voucher_id: i64, user_id: i64) -> VoucherResult<Voucher> {
    let mut voucher = uow
        .get_voucher(voucher_id)?
        .filter(Voucher::is_redeemable)
        .ok_or_else(|| VoucherError::NotFound(voucher_id.to_string()))?;

    if !voucher.has_remaining_uses() {
        return Err(VoucherError::UsageLimitExceeded(voucher.code.clone()));
    }

    let now = now_millis();
    let mut usage = uow
        .get_voucher_usage(user_id, voucher_id)?
        .unwrap_or(UserVoucherUsage {
            user_id,
            voucher_id,
            used_count: 0,
            updated_at: now,
        });
    if voucher
        .usage_per_user
        .is_some_and(|per_user| usage.used_count >= per_user)
    {
        return Err(VoucherError::PerUserLimitExceeded(voucher.code.clone()));
    }

    voucher.usage_count += 1;
    uow.put_voucher(&voucher)?;

    usage.used_count += 1;
    usage.updated_at = now;
    uow.put_voucher_usage(&usage)?;

    tracing::info!(
        voucher_id,
        user_id,
        usage_count = voucher.usage_count,
        "Voucher redeemed"
    );
    Ok(voucher)
}

//! Inventory ledger
//!
//! Every mutation runs inside the caller's [`UnitOfWork`], so a reservation
//! made during order creation disappears if anything later in that unit of
//! work fails. After each change the owning product's `total_stock` is
//! recomputed from its live inventory records.
//!
//! | Operation | Guard | Failure |
//! |-----------|-------|---------|
//! | [`reserve`] | `quantity >= amount`, min bound | `InsufficientStock`, `QuantityOutOfBounds` |
//! | [`release`] | none (restores held stock) | `InventoryNotFound` |
//! | [`adjust`] | `min <= quantity + delta <= max`, never negative | `QuantityOutOfBounds` |

use crate::storage::{ShopStorage, StorageError, UnitOfWork};
use shared::error::{AppError, ErrorCode};
use shared::models::Inventory;
use shared::util::now_millis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Inventory not found: {0}")]
    InventoryNotFound(i64),

    #[error(
        "Insufficient stock for inventory {inventory_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        inventory_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Quantity {quantity} out of bounds for inventory {inventory_id}")]
    QuantityOutOfBounds { inventory_id: i64, quantity: i64 },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InventoryNotFound(id) => {
                AppError::new(ErrorCode::InventoryNotFound).with_detail("inventory_id", id)
            }
            LedgerError::InsufficientStock {
                inventory_id,
                requested,
                available,
            } => AppError::with_message(
                ErrorCode::ProductOutOfStock,
                format!("Only {} left in stock", available),
            )
            .with_detail("inventory_id", inventory_id)
            .with_detail("requested", requested)
            .with_detail("available", available),
            LedgerError::QuantityOutOfBounds {
                inventory_id,
                quantity,
            } => AppError::new(ErrorCode::InventoryOutOfBounds)
                .with_detail("inventory_id", inventory_id)
                .with_detail("quantity", quantity),
            LedgerError::InvalidAmount(amount) => AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("Quantity must be positive, got {}", amount),
            ),
            LedgerError::Storage(e) => e.into(),
        }
    }
}

/// Decrement stock by `amount`
///
/// Fails without writing anything when the record is missing or soft-deleted,
/// or when the remaining quantity would drop below zero or below `min_quantity`.
pub fn reserve(uow: &UnitOfWork<'_>, inventory_id: i64, amount: i64) -> LedgerResult<Inventory> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let mut inventory = load_live(uow, inventory_id)?;

    let remaining = inventory.quantity - amount;
    if remaining < 0 {
        return Err(LedgerError::InsufficientStock {
            inventory_id,
            requested: amount,
            available: inventory.quantity,
        });
    }
    // A decrement only moves stock away from max_quantity, so only the floor applies
    if inventory.min_quantity.is_some_and(|min| remaining < min) {
        return Err(LedgerError::QuantityOutOfBounds {
            inventory_id,
            quantity: remaining,
        });
    }

    inventory.quantity = remaining;
    store(uow, &mut inventory)?;
    tracing::debug!(inventory_id, amount, remaining, "Stock reserved");
    Ok(inventory)
}

/// Increment stock by `amount`
///
/// Used to restore stock held by a cancelled order. Callers guarantee it runs
/// at most once per cancelled line.
pub fn release(uow: &UnitOfWork<'_>, inventory_id: i64, amount: i64) -> LedgerResult<Inventory> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let mut inventory = uow
        .get_inventory(inventory_id)?
        .ok_or(LedgerError::InventoryNotFound(inventory_id))?;

    inventory.quantity = inventory.quantity.checked_add(amount).ok_or(
        LedgerError::QuantityOutOfBounds {
            inventory_id,
            quantity: i64::MAX,
        },
    )?;
    if inventory
        .max_quantity
        .is_some_and(|max| inventory.quantity > max)
    {
        tracing::warn!(
            inventory_id,
            quantity = inventory.quantity,
            "Released stock exceeds max_quantity"
        );
    }

    store(uow, &mut inventory)?;
    tracing::debug!(inventory_id, amount, quantity = inventory.quantity, "Stock released");
    Ok(inventory)
}

/// Apply a signed delta, enforcing every bound
pub fn adjust(uow: &UnitOfWork<'_>, inventory_id: i64, delta: i64) -> LedgerResult<Inventory> {
    let mut inventory = load_live(uow, inventory_id)?;

    let quantity = inventory
        .quantity
        .checked_add(delta)
        .ok_or(LedgerError::QuantityOutOfBounds {
            inventory_id,
            quantity: if delta < 0 { i64::MIN } else { i64::MAX },
        })?;
    if !inventory.accepts(quantity) {
        return Err(LedgerError::QuantityOutOfBounds {
            inventory_id,
            quantity,
        });
    }

    inventory.quantity = quantity;
    store(uow, &mut inventory)?;
    tracing::info!(inventory_id, delta, quantity, "Stock adjusted");
    Ok(inventory)
}

/// Units currently on hand (read-only)
pub fn available(storage: &ShopStorage, inventory_id: i64) -> LedgerResult<i64> {
    storage
        .get_inventory(inventory_id)?
        .filter(|inv| !inv.is_deleted)
        .map(|inv| inv.quantity)
        .ok_or(LedgerError::InventoryNotFound(inventory_id))
}

/// Recompute `total_stock` of a product from its live inventory records
pub fn recompute_product_stock(uow: &UnitOfWork<'_>, product_id: i64) -> LedgerResult<i64> {
    let total: i64 = uow
        .inventories_for_product(product_id)?
        .iter()
        .filter(|inv| !inv.is_deleted)
        .map(|inv| inv.quantity)
        .sum();

    match uow.get_product(product_id)? {
        Some(mut product) => {
            product.total_stock = total;
            product.updated_at = now_millis();
            uow.put_product(&product)?;
        }
        None => {
            tracing::warn!(product_id, "Inventory references a missing product");
        }
    }
    Ok(total)
}

fn load_live(uow: &UnitOfWork<'_>, inventory_id: i64) -> LedgerResult<Inventory> {
    uow.get_inventory(inventory_id)?
        .filter(|inv| !inv.is_deleted)
        .ok_or(LedgerError::InventoryNotFound(inventory_id))
}

fn store(uow: &UnitOfWork<'_>, inventory: &mut Inventory) -> LedgerResult<()> {
    inventory.updated_at = now_millis();
    uow.put_inventory(inventory)?;
    recompute_product_stock(uow, inventory.product_id)?;
    Ok(())
}

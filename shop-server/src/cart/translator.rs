//! Cart → order draft translation
//!
//! Produces unpriced [`DraftLine`]s from a user's open cart. Prices are
//! deliberately not carried over: the order manager resolves them from the
//! live product when the order is placed. Translation never mutates the cart;
//! [`clear`] does that once the order has been written.

use crate::storage::{ShopStorage, StorageError, StorageResult, UnitOfWork};
use shared::error::{AppError, ErrorCode};
use shared::models::{Cart, CartItem, DraftLine, Inventory, OrderDraft, Product};
use shared::util::now_millis;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart is empty for user {0}")]
    EmptyCart(i64),

    #[error("Cart line is no longer available: inventory {inventory_id}, product {product_id}")]
    LineItemUnavailable { inventory_id: i64, product_id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type CartResult<T> = Result<T, CartError>;

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::EmptyCart(user_id) => {
                AppError::new(ErrorCode::CartEmpty).with_detail("user_id", user_id)
            }
            CartError::LineItemUnavailable {
                inventory_id,
                product_id,
            } => AppError::new(ErrorCode::CartItemUnavailable)
                .with_detail("inventory_id", inventory_id)
                .with_detail("product_id", product_id),
            CartError::Storage(e) => e.into(),
        }
    }
}

/// Translate the user's open cart into an order draft (read-only)
pub fn translate(storage: &ShopStorage, user_id: i64) -> CartResult<OrderDraft> {
    build_draft(
        user_id,
        storage.get_cart(user_id)?,
        |id| storage.get_inventory(id),
        |id| storage.get_product(id),
    )
}

/// Same as [`translate`], reading through an open unit of work
pub fn translate_in(uow: &UnitOfWork<'_>, user_id: i64) -> CartResult<OrderDraft> {
    build_draft(
        user_id,
        uow.get_cart(user_id)?,
        |id| uow.get_inventory(id),
        |id| uow.get_product(id),
    )
}

/// Empty the cart and mark it checked out
pub fn clear(uow: &UnitOfWork<'_>, user_id: i64) -> CartResult<()> {
    if let Some(mut cart) = uow.get_cart(user_id)? {
        cart.items.clear();
        cart.is_checked_out = true;
        cart.updated_at = now_millis();
        uow.put_cart(&cart)?;
    }
    Ok(())
}

fn build_draft(
    user_id: i64,
    cart: Option<Cart>,
    inventory: impl Fn(i64) -> StorageResult<Option<Inventory>>,
    product: impl Fn(i64) -> StorageResult<Option<Product>>,
) -> CartResult<OrderDraft> {
    let cart = cart
        .filter(|c| !c.is_checked_out && !c.items.is_empty())
        .ok_or(CartError::EmptyCart(user_id))?;

    let mut lines = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        let unavailable = || CartError::LineItemUnavailable {
            inventory_id: item.inventory_id,
            product_id: item.product_id,
        };

        let record = inventory(item.inventory_id)?
            .filter(|inv| !inv.is_deleted)
            .ok_or_else(unavailable)?;
        product(record.product_id)?
            .filter(|p| !p.is_deleted)
            .ok_or_else(unavailable)?;

        lines.push(to_line(item));
    }

    Ok(OrderDraft { lines })
}

fn to_line(item: &CartItem) -> DraftLine {
    DraftLine {
        inventory_id: item.inventory_id,
        product_id: item.product_id,
        color_id: item.color_id,
        size_id: item.size_id,
        quantity: item.quantity,
    }
}

//! redb-based storage layer for the checkout pipeline
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `products` | `product_id` | `Product` | Authoritative price, aggregate stock |
//! | `inventories` | `inventory_id` | `Inventory` | Per-variant stock counters |
//! | `product_inventories` | `(product_id, inventory_id)` | `()` | Product → variants index |
//! | `orders` | `order_id` | `Order` | Orders (never hard-deleted) |
//! | `order_txn_refs` | `txn_ref` | `order_id` | Gateway correlation index |
//! | `user_orders` | `(user_id, order_id)` | `()` | Per-user listing index |
//! | `vouchers` | `voucher_id` | `Voucher` | Voucher definitions and usage count |
//! | `voucher_codes` | `CODE` | `voucher_id` | Uppercased code index |
//! | `voucher_usages` | `(user_id, voucher_id)` | `UserVoucherUsage` | Per-user counters |
//! | `carts` | `user_id` | `Cart` | Shopping carts |
//!
//! Values are JSON-serialized. All multi-record mutations go through
//! [`ShopStorage::run`], which hands a [`UnitOfWork`] to a closure and commits
//! only if the closure returns `Ok`.
//!
//! # Isolation
//!
//! redb allows a single write transaction at a time, so every unit of work is
//! serializable. Stock reservations and voucher redemptions re-check their
//! guard conditions inside the unit of work, which makes them conditional
//! updates rather than read-then-write races.

mod uow;

pub use uow::UnitOfWork;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use shared::error::AppError;
use shared::models::{Cart, Inventory, Order, Product, UserVoucherUsage, Voucher};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Products: key = product_id, value = JSON-serialized Product
pub(crate) const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

/// Inventory records: key = inventory_id, value = JSON-serialized Inventory
pub(crate) const INVENTORIES_TABLE: TableDefinition<i64, &[u8]> =
    TableDefinition::new("inventories");

/// Product → inventory index: key = (product_id, inventory_id), value = empty
pub(crate) const PRODUCT_INVENTORIES_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("product_inventories");

/// Orders: key = order_id, value = JSON-serialized Order
pub(crate) const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Txn ref index: key = txn_ref, value = order_id
pub(crate) const ORDER_TXN_REFS_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("order_txn_refs");

/// User → orders index: key = (user_id, order_id), value = empty
pub(crate) const USER_ORDERS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("user_orders");

/// Vouchers: key = voucher_id, value = JSON-serialized Voucher
pub(crate) const VOUCHERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("vouchers");

/// Voucher code index: key = uppercased code, value = voucher_id
pub(crate) const VOUCHER_CODES_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("voucher_codes");

/// Per-user voucher usage: key = (user_id, voucher_id), value = JSON-serialized UserVoucherUsage
pub(crate) const VOUCHER_USAGES_TABLE: TableDefinition<(i64, i64), &[u8]> =
    TableDefinition::new("voucher_usages");

/// Carts: key = user_id, value = JSON-serialized Cart
pub(crate) const CARTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("carts");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::database(err.to_string())
    }
}

/// Decode a JSON value stored under an `i64` key
pub(crate) fn get_json<T: DeserializeOwned>(
    table: &impl ReadableTable<i64, &'static [u8]>,
    key: i64,
) -> StorageResult<Option<T>> {
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

/// Shop storage backed by redb
#[derive(Clone)]
pub struct ShopStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for ShopStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopStorage").finish_non_exhaustive()
    }
}

impl ShopStorage {
    /// Open or create the database at the given path
    ///
    /// redb uses `Durability::Immediate` by default: commits are persistent
    /// as soon as `commit()` returns and the file is always consistent.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(INVENTORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCT_INVENTORIES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_TXN_REFS_TABLE)?;
            let _ = write_txn.open_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(VOUCHERS_TABLE)?;
            let _ = write_txn.open_table(VOUCHER_CODES_TABLE)?;
            let _ = write_txn.open_table(VOUCHER_USAGES_TABLE)?;
            let _ = write_txn.open_table(CARTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Underlying database handle, shared with the audit log
    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`. Every
    /// write performed through the [`UnitOfWork`] is applied or discarded
    /// together.
    pub fn run<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let uow = UnitOfWork::new(&txn);
        match f(&uow) {
            Ok(value) => {
                txn.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    // ========== Read-only Queries ==========

    pub fn get_product(&self, product_id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        get_json(&table, product_id)
    }

    pub fn get_inventory(&self, inventory_id: i64) -> StorageResult<Option<Inventory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INVENTORIES_TABLE)?;
        get_json(&table, inventory_id)
    }

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        get_json(&table, order_id)
    }

    /// Look up an order by its gateway transaction reference
    pub fn find_order_by_txn_ref(&self, txn_ref: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_TXN_REFS_TABLE)?;
        let Some(order_id) = index.get(txn_ref)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let table = read_txn.open_table(ORDERS_TABLE)?;
        get_json(&table, order_id)
    }

    /// All orders of a user, newest first
    pub fn list_orders_for_user(&self, user_id: i64) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(USER_ORDERS_TABLE)?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in index.range((user_id, i64::MIN)..=(user_id, i64::MAX))? {
            let (key, _value) = result?;
            let (_, order_id) = key.value();
            if let Some(order) = get_json::<Order>(&table, order_id)? {
                orders.push(order);
            }
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Look up a voucher by code (case-insensitive)
    pub fn find_voucher_by_code(&self, code: &str) -> StorageResult<Option<Voucher>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(VOUCHER_CODES_TABLE)?;
        let normalized = code.trim().to_uppercase();
        let Some(voucher_id) = index.get(normalized.as_str())?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let table = read_txn.open_table(VOUCHERS_TABLE)?;
        get_json(&table, voucher_id)
    }

    pub fn get_voucher(&self, voucher_id: i64) -> StorageResult<Option<Voucher>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VOUCHERS_TABLE)?;
        get_json(&table, voucher_id)
    }

    pub fn get_voucher_usage(
        &self,
        user_id: i64,
        voucher_id: i64,
    ) -> StorageResult<Option<UserVoucherUsage>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VOUCHER_USAGES_TABLE)?;
        match table.get((user_id, voucher_id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_cart(&self, user_id: i64) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;
        get_json(&table, user_id)
    }
}

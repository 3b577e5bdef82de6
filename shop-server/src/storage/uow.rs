//! Transaction-scoped repository handle

use super::{
    CARTS_TABLE, INVENTORIES_TABLE, ORDERS_TABLE, ORDER_TXN_REFS_TABLE, PRODUCTS_TABLE,
    PRODUCT_INVENTORIES_TABLE, StorageResult, USER_ORDERS_TABLE, VOUCHERS_TABLE,
    VOUCHER_CODES_TABLE, VOUCHER_USAGES_TABLE, get_json,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::{Cart, Inventory, Order, Product, UserVoucherUsage, Voucher};

/// Reads and writes bound to one open write transaction
///
/// Obtained from [`super::ShopStorage::run`]. Reads observe the writes made
/// earlier in the same unit of work.
pub struct UnitOfWork<'txn> {
    txn: &'txn WriteTransaction,
}

impl<'txn> UnitOfWork<'txn> {
    pub(super) fn new(txn: &'txn WriteTransaction) -> Self {
        Self { txn }
    }

    // ========== Products ==========

    pub fn get_product(&self, product_id: i64) -> StorageResult<Option<Product>> {
        let table = self.txn.open_table(PRODUCTS_TABLE)?;
        get_json(&table, product_id)
    }

    pub fn put_product(&self, product: &Product) -> StorageResult<()> {
        let mut table = self.txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    // ========== Inventory ==========

    pub fn get_inventory(&self, inventory_id: i64) -> StorageResult<Option<Inventory>> {
        let table = self.txn.open_table(INVENTORIES_TABLE)?;
        get_json(&table, inventory_id)
    }

    /// Store an inventory record and index it under its product
    pub fn put_inventory(&self, inventory: &Inventory) -> StorageResult<()> {
        {
            let mut table = self.txn.open_table(INVENTORIES_TABLE)?;
            let value = serde_json::to_vec(inventory)?;
            table.insert(inventory.id, value.as_slice())?;
        }
        let mut index = self.txn.open_table(PRODUCT_INVENTORIES_TABLE)?;
        index.insert((inventory.product_id, inventory.id), ())?;
        Ok(())
    }

    /// Every inventory record of a product, including soft-deleted ones
    pub fn inventories_for_product(&self, product_id: i64) -> StorageResult<Vec<Inventory>> {
        let index = self.txn.open_table(PRODUCT_INVENTORIES_TABLE)?;
        let table = self.txn.open_table(INVENTORIES_TABLE)?;

        let mut records = Vec::new();
        for result in index.range((product_id, i64::MIN)..=(product_id, i64::MAX))? {
            let (key, _value) = result?;
            let (_, inventory_id) = key.value();
            if let Some(inventory) = get_json::<Inventory>(&table, inventory_id)? {
                records.push(inventory);
            }
        }
        Ok(records)
    }

    // ========== Orders ==========

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let table = self.txn.open_table(ORDERS_TABLE)?;
        get_json(&table, order_id)
    }

    /// Store an order and maintain the txn-ref and per-user indexes
    pub fn put_order(&self, order: &Order) -> StorageResult<()> {
        {
            let mut table = self.txn.open_table(ORDERS_TABLE)?;
            let value = serde_json::to_vec(order)?;
            table.insert(order.id, value.as_slice())?;
        }
        {
            let mut refs = self.txn.open_table(ORDER_TXN_REFS_TABLE)?;
            refs.insert(order.txn_ref.as_str(), order.id)?;
        }
        let mut user_orders = self.txn.open_table(USER_ORDERS_TABLE)?;
        user_orders.insert((order.user_id, order.id), ())?;
        Ok(())
    }

    pub fn find_order_by_txn_ref(&self, txn_ref: &str) -> StorageResult<Option<Order>> {
        let order_id = {
            let refs = self.txn.open_table(ORDER_TXN_REFS_TABLE)?;
            refs.get(txn_ref)?.map(|guard| guard.value())
        };
        match order_id {
            Some(id) => self.get_order(id),
            None => Ok(None),
        }
    }

    // ========== Vouchers ==========

    pub fn get_voucher(&self, voucher_id: i64) -> StorageResult<Option<Voucher>> {
        let table = self.txn.open_table(VOUCHERS_TABLE)?;
        get_json(&table, voucher_id)
    }

    /// Store a voucher and index it under its uppercased code
    pub fn put_voucher(&self, voucher: &Voucher) -> StorageResult<()> {
        {
            let mut table = self.txn.open_table(VOUCHERS_TABLE)?;
            let value = serde_json::to_vec(voucher)?;
            table.insert(voucher.id, value.as_slice())?;
        }
        let mut codes = self.txn.open_table(VOUCHER_CODES_TABLE)?;
        let code = voucher.code.trim().to_uppercase();
        codes.insert(code.as_str(), voucher.id)?;
        Ok(())
    }

    pub fn find_voucher_by_code(&self, code: &str) -> StorageResult<Option<Voucher>> {
        let normalized = code.trim().to_uppercase();
        let voucher_id = {
            let codes = self.txn.open_table(VOUCHER_CODES_TABLE)?;
            codes.get(normalized.as_str())?.map(|guard| guard.value())
        };
        match voucher_id {
            Some(id) => self.get_voucher(id),
            None => Ok(None),
        }
    }

    pub fn get_voucher_usage(
        &self,
        user_id: i64,
        voucher_id: i64,
    ) -> StorageResult<Option<UserVoucherUsage>> {
        let table = self.txn.open_table(VOUCHER_USAGES_TABLE)?;
        match table.get((user_id, voucher_id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_voucher_usage(&self, usage: &UserVoucherUsage) -> StorageResult<()> {
        let mut table = self.txn.open_table(VOUCHER_USAGES_TABLE)?;
        let value = serde_json::to_vec(usage)?;
        table.insert((usage.user_id, usage.voucher_id), value.as_slice())?;
        Ok(())
    }

    // ========== Carts ==========

    pub fn get_cart(&self, user_id: i64) -> StorageResult<Option<Cart>> {
        let table = self.txn.open_table(CARTS_TABLE)?;
        get_json(&table, user_id)
    }

    pub fn put_cart(&self, cart: &Cart) -> StorageResult<()> {
        let mut table = self.txn.open_table(CARTS_TABLE)?;
        let value = serde_json::to_vec(cart)?;
        table.insert(cart.user_id, value.as_slice())?;
        Ok(())
    }
}

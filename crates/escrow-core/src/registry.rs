//! # Item Registry
//!
//! Maps storefront products to provider item identifiers.
//!
//! ```text
//!   admin save ──► set() ──┐                 ┌──► get() ──► checkout decision
//!                          ▼                 │
//!                  ┌──────────────┐   reconcile against
//!                  │ OptionStore  │──► ProductDirectory ──► find_product_by_item()
//!                  └──────────────┘
//! ```
//!
//! Every read reconciles the stored table against the product directory,
//! dropping entries whose product was deleted. When reconciliation would leave
//! nothing, the raw table is used instead: an empty result more likely means
//! the directory read failed than that every product is gone.

use crate::error::{GatewayError, GatewayResult};
use crate::item::ItemId;
use crate::product::{ProductDirectory, ProductId};
use crate::store::{ItemTable, OptionStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Product → item mapping with reconciliation on read
///
/// Clones share one write lock. Every load-modify-save against the store
/// (admin saves and prune write-backs) runs under it.
#[derive(Clone)]
pub struct ItemRegistry {
    store: Arc<dyn OptionStore>,
    products: Arc<dyn ProductDirectory>,
    write_lock: Arc<Mutex<()>>,
}

impl ItemRegistry {
    pub fn new(store: Arc<dyn OptionStore>, products: Arc<dyn ProductDirectory>) -> Self {
        Self {
            store,
            products,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Item bound to a product, if any.
    pub fn get(&self, product_id: ProductId) -> Option<ItemId> {
        self.load_reconciled()
            .get(&product_id.get())
            .and_then(ItemId::parse)
    }

    /// Reverse lookup. With duplicates (written around the registry) the
    /// lowest product id wins.
    pub fn find_product_by_item(&self, item: &ItemId) -> Option<ProductId> {
        find_in(&self.load_reconciled(), item)
    }

    /// All current bindings, reconciled.
    pub fn items(&self) -> BTreeMap<ProductId, ItemId> {
        self.load_reconciled()
            .into_iter()
            .filter_map(|(pid, raw)| ItemId::parse(raw).map(|item| (ProductId::new(pid), item)))
            .collect()
    }

    /// Bind, rebind or clear the item for a product.
    ///
    /// A blank or absent item clears the product's binding. An item already
    /// bound to another product is dropped without error. A failed store read
    /// aborts the save; nothing is written.
    pub fn set(&self, product_id: ProductId, item: Option<&str>) -> GatewayResult<()> {
        let _guard = self.lock_writes()?;

        let (before, _) = self.reconcile(self.store.load()?);
        let mut table = before.clone();

        match item.and_then(ItemId::parse) {
            Some(item) => match find_in(&table, &item) {
                None => {
                    table.insert(product_id.get(), item.clone().into_inner());
                    info!(
                        product_id = %product_id,
                        item = %item,
                        "Vesicash item saved"
                    );
                }
                Some(owner) if owner == product_id => {
                    debug!(product_id = %product_id, item = %item, "Vesicash item unchanged");
                }
                Some(owner) => {
                    warn!(
                        product_id = %product_id,
                        item = %item,
                        bound_to = %owner,
                        "Vesicash item not saved, already bound"
                    );
                }
            },
            None => {
                if table.remove(&product_id.get()).is_some() {
                    info!(product_id = %product_id, "Vesicash item cleared");
                }
            }
        }

        debug!(items = ?table, "Vesicash item table");

        if table != before {
            self.store.save(&table)?;
        }
        Ok(())
    }

    fn lock_writes(&self) -> GatewayResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| GatewayError::Internal(format!("item registry lock poisoned: {}", e)))
    }

    /// Load the raw table, treating storage errors as an empty table.
    fn load_raw(&self) -> ItemTable {
        match self.store.load() {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Failed to load Vesicash item table, treating as empty");
                ItemTable::new()
            }
        }
    }

    /// Reconciled view of a raw table, and whether anything was pruned.
    fn reconcile(&self, raw: ItemTable) -> (ItemTable, bool) {
        let reconciled = reconcile(&raw, self.products.as_ref());

        if reconciled.is_empty() {
            return (raw, false);
        }

        let pruned = reconciled.len() != raw.len();
        (reconciled, pruned)
    }

    fn load_reconciled(&self) -> ItemTable {
        let (reconciled, pruned) = self.reconcile(self.load_raw());
        if pruned {
            self.write_back();
        }
        reconciled
    }

    /// Save the pruned table, re-reading under the write lock so a concurrent
    /// save is not overwritten.
    fn write_back(&self) {
        let _guard = match self.lock_writes() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Skipping Vesicash item table write-back");
                return;
            }
        };

        let raw = match self.store.load() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Skipping Vesicash item table write-back");
                return;
            }
        };

        let before = raw.len();
        let (reconciled, pruned) = self.reconcile(raw);
        if !pruned {
            return;
        }

        debug!(
            pruned = before - reconciled.len(),
            "Pruning Vesicash items for deleted products"
        );
        if let Err(e) = self.store.save(&reconciled) {
            warn!(error = %e, "Failed to write back reconciled Vesicash item table");
        }
    }
}

/// Keep entries whose product still exists and whose item is non-blank.
fn reconcile(raw: &ItemTable, products: &dyn ProductDirectory) -> ItemTable {
    raw.iter()
        .filter(|(pid, item)| products.exists(ProductId::new(**pid)) && !item.trim().is_empty())
        .map(|(pid, item)| (*pid, item.clone()))
        .collect()
}

fn find_in(table: &ItemTable, item: &ItemId) -> Option<ProductId> {
    table
        .iter()
        .find(|(_, raw)| raw.trim() == item.as_str())
        .map(|(pid, _)| ProductId::new(*pid))
}

use crate::heap::Property;
use crate::keys::{ContextId, SlotKey, StoreId};
use crate::rt::field::FieldScope;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// Defaults or statics of a wrapped type, shared by the whole hierarchy.
    Class,
    /// Created for one constructed instance. The only kind that can be widened.
    Instance,
    /// Own store of an object literal.
    Object,
}

#[derive(Debug)]
pub struct PrivateStore {
    /// Declaration Context whose code may open this store.
    pub owner: ContextId,
    /// Store this one delegates missing slots to.
    pub parent: Option<StoreId>,
    pub scope: FieldScope,
    pub kind: StoreKind,
    slots: HashMap<SlotKey, Property>,
}

/// Arena of private stores. Stores are only ever keyed by opaque slot keys;
/// field names are resolved to keys by the access layer before reaching here.
#[derive(Debug, Default)]
pub struct StoreArea {
    stores: Vec<PrivateStore>,
}

impl StoreArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(
        &mut self,
        owner: ContextId,
        scope: FieldScope,
        parent: Option<StoreId>,
        kind: StoreKind,
    ) -> StoreId {
        self.stores.push(PrivateStore {
            owner,
            parent,
            scope,
            kind,
            slots: HashMap::new(),
        });
        StoreId::from_usize(self.stores.len())
    }

    pub fn get(&self, id: StoreId) -> &PrivateStore {
        &self.stores[id.to_index()]
    }

    pub fn contains(&self, id: StoreId) -> bool {
        id.to_index() < self.stores.len()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Initial value of a declared slot.
    pub fn define(&mut self, id: StoreId, key: SlotKey, property: Property) {
        self.stores[id.to_index()].slots.insert(key, property);
    }

    /// First store on the delegation chain holding `key`.
    pub fn find_holder(&self, id: StoreId, key: SlotKey) -> Option<StoreId> {
        let mut cur = Some(id);
        while let Some(store_id) = cur {
            let store = self.get(store_id);
            if store.slots.contains_key(&key) {
                return Some(store_id);
            }
            cur = store.parent;
        }
        None
    }

    pub fn lookup(&self, id: StoreId, key: SlotKey) -> Option<&Property> {
        self.find_holder(id, key)
            .and_then(|holder| self.get(holder).slots.get(&key))
    }

    /// Writes into `id` itself, shadowing whatever the chain held for `key`.
    pub fn write(&mut self, id: StoreId, key: SlotKey, property: Property) {
        self.stores[id.to_index()].slots.insert(key, property);
    }

    pub fn chain_contains(&self, id: StoreId, ancestor: StoreId) -> bool {
        let mut cur = Some(id);
        while let Some(store_id) = cur {
            if store_id == ancestor {
                return true;
            }
            cur = self.get(store_id).parent;
        }
        false
    }

    /// Widens a per-instance store to a more derived class. Slots already
    /// written to the store are kept. Other kinds are left alone and `false`
    /// is returned.
    pub fn reparent(&mut self, id: StoreId, owner: ContextId, parent: StoreId) -> bool {
        let store = &mut self.stores[id.to_index()];
        if store.kind != StoreKind::Instance {
            return false;
        }
        store.owner = owner;
        store.parent = Some(parent);
        true
    }
}

use crate::keys::{ContextId, SlotKey};
use crate::rt::field::{FieldDescriptor, FieldScope};
use crate::Symbol;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeclaredSlot {
    pub key: SlotKey,
    /// `protected`: mirrored into descendant contexts.
    pub shared: bool,
}

/// Name → opaque key table of one context for one scope.
///
/// `declared` holds the slots this context owns, `inherited` the protected
/// slots mirrored from its ancestors. Own declarations shadow inherited ones.
#[derive(Debug, Default, Clone)]
pub struct KeyTable {
    declared: HashMap<Symbol, DeclaredSlot>,
    inherited: HashMap<Symbol, SlotKey>,
}

impl KeyTable {
    /// Returns `false` and leaves the table untouched if `name` is already declared here.
    pub fn declare(&mut self, name: Symbol, key: SlotKey, shared: bool) -> bool {
        if self.declared.contains_key(&name) {
            return false;
        }
        self.declared.insert(name, DeclaredSlot { key, shared });
        true
    }

    pub fn inherit(&mut self, name: Symbol, key: SlotKey) {
        self.inherited.insert(name, key);
    }

    pub fn declared(&self, name: Symbol) -> Option<DeclaredSlot> {
        self.declared.get(&name).copied()
    }

    pub fn declares(&self, name: Symbol) -> bool {
        self.declared.contains_key(&name)
    }

    pub fn resolve(&self, name: Symbol) -> Option<SlotKey> {
        self.declared
            .get(&name)
            .map(|slot| slot.key)
            .or_else(|| self.inherited.get(&name).copied())
    }

    /// What a direct descendant gets to see: everything inherited, overridden
    /// by this context's own protected slots.
    pub fn shareable(&self) -> HashMap<Symbol, SlotKey> {
        let mut visible = self.inherited.clone();
        visible.extend(
            self.declared
                .iter()
                .filter(|(_, slot)| slot.shared)
                .map(|(name, slot)| (*name, slot.key)),
        );
        visible
    }

    pub fn names(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.declared.keys().chain(self.inherited.keys()).copied()
    }
}

/// Identity of one class or object definition, the unit of authorization.
#[derive(Debug)]
pub struct DeclarationContext {
    pub name: Symbol,
    pub parent: Option<ContextId>,
    pub children: Vec<ContextId>,
    instance_keys: KeyTable,
    static_keys: KeyTable,
    descriptors: Vec<FieldDescriptor>,
}

impl DeclarationContext {
    pub fn new(name: Symbol, parent: Option<ContextId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            instance_keys: KeyTable::default(),
            static_keys: KeyTable::default(),
            descriptors: Vec::new(),
        }
    }

    pub fn keys(&self, scope: FieldScope) -> &KeyTable {
        match scope {
            FieldScope::Instance => &self.instance_keys,
            FieldScope::Static => &self.static_keys,
        }
    }

    pub fn keys_mut(&mut self, scope: FieldScope) -> &mut KeyTable {
        match scope {
            FieldScope::Instance => &mut self.instance_keys,
            FieldScope::Static => &mut self.static_keys,
        }
    }

    pub fn record(&mut self, descriptor: FieldDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasso::Rodeo;

    #[test]
    fn own_protected_overrides_inherited_in_shareable() {
        let mut rodeo = Rodeo::default();
        let x = rodeo.get_or_intern("x");
        let y = rodeo.get_or_intern("y");

        let mut table = KeyTable::default();
        table.inherit(x, SlotKey::from_usize(1));
        assert!(table.declare(x, SlotKey::from_usize(2), true));
        assert!(table.declare(y, SlotKey::from_usize(3), false));
        assert!(!table.declare(y, SlotKey::from_usize(4), true));

        let shared = table.shareable();
        assert_eq!(shared.get(&x), Some(&SlotKey::from_usize(2)));
        assert_eq!(shared.get(&y), None);
        assert_eq!(table.resolve(y), Some(SlotKey::from_usize(3)));
    }
}

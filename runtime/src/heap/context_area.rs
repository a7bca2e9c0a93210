use crate::debug_log;
use crate::keys::{ClassId, ContextId, ObjectRef, SlotKey};
use crate::rt::class::ProtectedClass;
use crate::rt::context::DeclarationContext;
use crate::Symbol;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Contexts a wrapped function was registered with. Usually one.
pub type ContextSet = SmallVec<[ContextId; 2]>;

/// Arena of Declaration Contexts, wrapped types and wrapped-function
/// registrations. Contexts are parent-indexed and never re-parented.
#[derive(Debug, Default)]
pub struct ContextArea {
    contexts: Vec<DeclarationContext>,
    classes: Vec<ProtectedClass>,
    type_to_class_index: HashMap<ObjectRef, ClassId>,
    functions: HashMap<ObjectRef, ContextSet>,
    slot_counter: usize,
}

impl ContextArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_context(&mut self, name: Symbol, parent: Option<ContextId>) -> ContextId {
        self.contexts.push(DeclarationContext::new(name, parent));
        let id = ContextId::from_usize(self.contexts.len());
        if let Some(parent) = parent {
            self.context_mut(parent).children.push(id);
        }
        id
    }

    pub fn context(&self, id: ContextId) -> &DeclarationContext {
        &self.contexts[id.to_index()]
    }

    pub fn context_mut(&mut self, id: ContextId) -> &mut DeclarationContext {
        &mut self.contexts[id.to_index()]
    }

    pub fn push_class(&mut self, class: ProtectedClass) -> ClassId {
        let type_object = class.type_object;
        self.classes.push(class);
        let id = ClassId::from_usize(self.classes.len());
        self.type_to_class_index.insert(type_object, id);
        id
    }

    pub fn class(&self, id: ClassId) -> &ProtectedClass {
        &self.classes[id.to_index()]
    }

    pub fn class_of_type(&self, type_object: ObjectRef) -> Option<ClassId> {
        self.type_to_class_index.get(&type_object).copied()
    }

    /// Fresh opaque key. Keys are unique across the whole area, so a store
    /// chain can hold slots of several contexts without collisions.
    pub fn next_slot_key(&mut self) -> SlotKey {
        self.slot_counter += 1;
        SlotKey::from_usize(self.slot_counter)
    }

    /// `id` first, root last.
    pub fn ancestors_or_self(&self, id: ContextId) -> SmallVec<[ContextId; 4]> {
        let mut chain = SmallVec::new();
        let mut cur = Some(id);
        while let Some(ctx) = cur {
            chain.push(ctx);
            cur = self.context(ctx).parent;
        }
        chain
    }

    pub fn is_descendant_or_self(&self, candidate: ContextId, ancestor: ContextId) -> bool {
        self.ancestors_or_self(candidate).contains(&ancestor)
    }

    /// Adds `contexts` to the function's registration, keeping earlier ones.
    /// An empty slice still marks the function as wrapped.
    pub fn register_function(&mut self, function: ObjectRef, contexts: &[ContextId]) {
        let registered = self.functions.entry(function).or_default();
        for ctx in contexts {
            if !registered.contains(ctx) {
                registered.push(*ctx);
            }
        }
        debug_log!("Registered function {function:?} with contexts {registered:?}");
    }

    pub fn function_contexts(&self, function: ObjectRef) -> Option<&ContextSet> {
        self.functions.get(&function)
    }

    pub fn is_registered(&self, function: ObjectRef) -> bool {
        self.functions.contains_key(&function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasso::Rodeo;

    fn tree() -> (ContextArea, [ContextId; 4]) {
        let mut rodeo = Rodeo::default();
        let mut area = ContextArea::new();
        let a = area.push_context(rodeo.get_or_intern("A"), None);
        let b = area.push_context(rodeo.get_or_intern("B"), Some(a));
        let c = area.push_context(rodeo.get_or_intern("C"), Some(b));
        let d = area.push_context(rodeo.get_or_intern("D"), Some(a));
        (area, [a, b, c, d])
    }

    #[test]
    fn ancestors_are_most_derived_first() {
        let (area, [a, b, c, _]) = tree();
        assert_eq!(area.ancestors_or_self(c).as_slice(), &[c, b, a]);
        assert_eq!(area.context(a).children.len(), 2);
    }

    #[test]
    fn siblings_are_not_related() {
        let (area, [a, b, c, d]) = tree();
        assert!(area.is_descendant_or_self(c, a));
        assert!(area.is_descendant_or_self(b, b));
        assert!(!area.is_descendant_or_self(a, c));
        assert!(!area.is_descendant_or_self(d, b));
    }

    #[test]
    fn registration_is_deduplicated() {
        let (mut area, [a, b, _, _]) = tree();
        let function = ObjectRef::from_usize(1);
        area.register_function(function, &[a]);
        area.register_function(function, &[a, b]);
        assert_eq!(area.function_contexts(function).unwrap().as_slice(), &[a, b]);

        let callback = ObjectRef::from_usize(2);
        area.register_function(callback, &[]);
        assert!(area.is_registered(callback));
    }

    #[test]
    fn slot_keys_are_unique() {
        let (mut area, _) = tree();
        assert_ne!(area.next_slot_key(), area.next_slot_key());
    }
}

use crate::error::VeilError;
use crate::keys::ObjectRef;
use crate::rt::method::{HostFunction, NativeFn};
use crate::vm::Value;
use crate::{Symbol, throw_error};
use itertools::Itertools;
use std::collections::HashMap;

pub mod context_area;
pub mod private_store;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Data(Value),
    Accessor {
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
    },
}

/// Public property of a host object, also the value cell of a private slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: PropertyValue,
    pub writable: bool,
    pub enumerable: bool,
}

impl Property {
    pub fn data(value: Value) -> Self {
        Self {
            value: PropertyValue::Data(value),
            writable: true,
            enumerable: true,
        }
    }

    /// Non-enumerable wiring such as `prototype` and `constructor`.
    pub fn hidden(value: Value) -> Self {
        Self {
            value: PropertyValue::Data(value),
            writable: true,
            enumerable: false,
        }
    }
}

#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    Function(HostFunction),
}

#[derive(Debug)]
pub struct HostObject {
    pub prototype: Option<ObjectRef>,
    pub properties: HashMap<Symbol, Property>,
    pub kind: ObjectKind,
}

/// Object arena. Objects live as long as the engine that allocated them.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HostObject>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, object: HostObject) -> ObjectRef {
        self.objects.push(object);
        ObjectRef::from_usize(self.objects.len())
    }

    pub fn alloc_object(&mut self, prototype: Option<ObjectRef>) -> ObjectRef {
        self.push(HostObject {
            prototype,
            properties: HashMap::new(),
            kind: ObjectKind::Ordinary,
        })
    }

    pub fn alloc_function(
        &mut self,
        prototype: Option<ObjectRef>,
        function: HostFunction,
    ) -> ObjectRef {
        self.push(HostObject {
            prototype,
            properties: HashMap::new(),
            kind: ObjectKind::Function(function),
        })
    }

    pub fn get(&self, obj: ObjectRef) -> &HostObject {
        &self.objects[obj.to_index()]
    }

    /// Handles from another engine point past the end of this arena.
    pub fn checked(&self, obj: ObjectRef) -> Result<ObjectRef, VeilError> {
        if obj.to_index() < self.objects.len() {
            Ok(obj)
        } else {
            throw_error!(WrongHeapAddress, obj)
        }
    }

    fn get_mut(&mut self, obj: ObjectRef) -> &mut HostObject {
        &mut self.objects[obj.to_index()]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn prototype_of(&self, obj: ObjectRef) -> Option<ObjectRef> {
        self.get(obj).prototype
    }

    pub fn own_property(&self, obj: ObjectRef, key: Symbol) -> Option<&Property> {
        self.get(obj).properties.get(&key)
    }

    /// Walks the prototype chain, returning the holder together with the property.
    pub fn find_property(&self, obj: ObjectRef, key: Symbol) -> Option<(ObjectRef, &Property)> {
        let mut cur = Some(obj);
        while let Some(holder) = cur {
            let object = self.get(holder);
            if let Some(property) = object.properties.get(&key) {
                return Some((holder, property));
            }
            cur = object.prototype;
        }
        None
    }

    pub fn define_property(&mut self, obj: ObjectRef, key: Symbol, property: Property) {
        self.get_mut(obj).properties.insert(key, property);
    }

    pub fn remove_property(&mut self, obj: ObjectRef, key: Symbol) -> bool {
        self.get_mut(obj).properties.remove(&key).is_some()
    }

    /// Own keys in interning order.
    pub fn own_keys(&self, obj: ObjectRef) -> Vec<Symbol> {
        self.get(obj).properties.keys().copied().sorted().collect()
    }

    pub fn enumerable_keys(&self, obj: ObjectRef) -> Vec<Symbol> {
        self.get(obj)
            .properties
            .iter()
            .filter(|(_, property)| property.enumerable)
            .map(|(key, _)| *key)
            .sorted()
            .collect()
    }

    pub fn function(&self, obj: ObjectRef) -> Option<&HostFunction> {
        match &self.get(obj).kind {
            ObjectKind::Function(function) => Some(function),
            ObjectKind::Ordinary => None,
        }
    }

    pub fn is_callable(&self, obj: ObjectRef) -> bool {
        self.function(obj).is_some()
    }

    pub fn function_name(&self, obj: ObjectRef) -> Option<Symbol> {
        self.function(obj).map(|function| function.name)
    }

    pub fn function_body(&self, obj: ObjectRef) -> Result<NativeFn, VeilError> {
        match self.function(obj) {
            Some(function) => Ok(function.body()),
            None => throw_error!(NotCallable, format!("object #{}", obj.into_inner())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::method::native;
    use lasso::Rodeo;

    #[test]
    fn lookup_walks_the_prototype_chain() {
        let mut rodeo = Rodeo::default();
        let key = rodeo.get_or_intern("greeting");
        let mut heap = Heap::new();
        let base = heap.alloc_object(None);
        let derived = heap.alloc_object(Some(base));
        heap.define_property(base, key, Property::data(Value::from("hi")));

        let (holder, property) = heap.find_property(derived, key).unwrap();
        assert_eq!(holder, base);
        assert_eq!(property.value, PropertyValue::Data(Value::from("hi")));
        assert!(heap.own_property(derived, key).is_none());
    }

    #[test]
    fn only_functions_are_callable() {
        let mut rodeo = Rodeo::default();
        let name = rodeo.get_or_intern("f");
        let mut heap = Heap::new();
        let plain = heap.alloc_object(None);
        let function = heap.alloc_function(
            None,
            HostFunction::new(name, native(|_, _, _| Ok(Value::Null))),
        );

        assert!(heap.is_callable(function));
        assert_eq!(heap.function_name(function), Some(name));
        assert!(matches!(
            heap.function_body(plain),
            Err(VeilError::NotCallable(_))
        ));
    }
}

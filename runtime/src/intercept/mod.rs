//! Property traps. Every operation on a protected object goes through here;
//! reads of [`PRIVILEGED_OPERATOR`](crate::PRIVILEGED_OPERATOR) and every use
//! of a [`PrivateView`] are authenticated first, everything else is plain
//! host-object behaviour.

use crate::error::VeilError;
use crate::heap::private_store::StoreKind;
use crate::heap::{Property, PropertyValue};
use crate::rt::field::FieldScope;
use crate::vm::engine::Engine;
use crate::vm::{PrivateView, Value};
use crate::{DeletePolicy, Symbol, debug_log, throw_error};
use itertools::Itertools;

pub mod invoke;

impl Engine {
    pub fn get(&mut self, target: &Value, key: &str) -> Result<Value, VeilError> {
        let key = self.interner.get_or_intern(key);
        self.get_symbol(target, key)
    }

    pub fn get_symbol(&mut self, target: &Value, key: Symbol) -> Result<Value, VeilError> {
        self.checked(target)?;
        match target {
            Value::PrivateView(view) => self.read_private(*view, key),
            Value::Object(_) if key == self.symbols.operator => {
                self.private(target).map(Value::PrivateView)
            }
            Value::Object(obj) => {
                let Some((_, property)) = self.heap.find_property(*obj, key) else {
                    return Ok(Value::Undefined);
                };
                match property.value.clone() {
                    PropertyValue::Data(value) => Ok(value),
                    PropertyValue::Accessor {
                        get: Some(getter), ..
                    } => self.call(&Value::Object(getter), target.clone(), &[]),
                    PropertyValue::Accessor { get: None, .. } => Ok(Value::Undefined),
                }
            }
            other => throw_error!(NotAnObject, other.type_name().to_string()),
        }
    }

    pub fn set(
        &mut self,
        target: &Value,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), VeilError> {
        let key = self.interner.get_or_intern(key);
        self.set_symbol(target, key, value.into())
    }

    pub fn set_symbol(&mut self, target: &Value, key: Symbol, value: Value) -> Result<(), VeilError> {
        self.checked(target)?;
        let obj = match target {
            Value::PrivateView(view) => return self.write_private(*view, key, value),
            Value::Object(_) if key == self.symbols.operator => {
                return throw_error!(ReadOnlyField, key);
            }
            Value::Object(obj) => *obj,
            other => return throw_error!(NotAnObject, other.type_name().to_string()),
        };

        let found = self
            .heap
            .find_property(obj, key)
            .map(|(holder, property)| (holder, property.clone()));
        match found {
            Some((_, property)) => match property.value {
                PropertyValue::Accessor {
                    set: Some(setter), ..
                } => self
                    .call(&Value::Object(setter), target.clone(), &[value])
                    .map(|_| ()),
                PropertyValue::Accessor { set: None, .. } => throw_error!(ReadOnlyField, key),
                PropertyValue::Data(_) if !property.writable => throw_error!(ReadOnlyField, key),
                PropertyValue::Data(_) => {
                    self.heap.define_property(
                        obj,
                        key,
                        Property {
                            value: PropertyValue::Data(value),
                            ..property
                        },
                    );
                    Ok(())
                }
            },
            None => {
                self.heap.define_property(obj, key, Property::data(value));
                Ok(())
            }
        }
    }

    /// Deleting public properties behaves normally. Private slots are never
    /// removed: depending on [`DeletePolicy`] the attempt reports `false` or fails.
    pub fn delete(&mut self, target: &Value, key: &str) -> Result<bool, VeilError> {
        let key = self.interner.get_or_intern(key);
        self.checked(target)?;
        match target {
            Value::PrivateView(view) => {
                self.resolve_private_key(view.store, key)?;
                match self.config.delete_policy {
                    DeletePolicy::SilentFail => {
                        debug_log!("Ignored delete of private field {}", self.resolve(key));
                        Ok(false)
                    }
                    DeletePolicy::Reject => throw_error!(DeleteRejected, key),
                }
            }
            Value::Object(_) if key == self.symbols.operator => Ok(false),
            Value::Object(obj) => Ok(self.heap.remove_property(*obj, key)),
            other => throw_error!(NotAnObject, other.type_name().to_string()),
        }
    }

    /// On a view, tells whether the running code can resolve `key` there.
    pub fn has_own_property(&self, target: &Value, key: &str) -> Result<bool, VeilError> {
        let key = self.interner.get_or_intern(key);
        self.checked(target)?;
        match target {
            Value::PrivateView(view) => match self.resolve_private_key(view.store, key) {
                Ok(_) => Ok(true),
                Err(VeilError::NoSuchPrivateField { .. }) => Ok(false),
                Err(e) => Err(e),
            },
            Value::Object(obj) => {
                Ok(key != self.symbols.operator && self.heap.own_property(*obj, key).is_some())
            }
            other => throw_error!(NotAnObject, other.type_name().to_string()),
        }
    }

    /// Public own keys of an object, or the names the running code can
    /// resolve through a view.
    pub fn own_keys(&self, target: &Value) -> Result<Vec<Symbol>, VeilError> {
        self.checked(target)?;
        match target {
            Value::Object(obj) => Ok(self.heap.own_keys(*obj)),
            Value::PrivateView(view) => {
                let store = self.stores.get(view.store);
                let authorized = self.authorized_contexts(store.owner);
                if authorized.is_empty() {
                    return throw_error!(
                        UnauthorizedAccess,
                        owner: Some(self.area.context(store.owner).name)
                    );
                }
                Ok(authorized
                    .iter()
                    .flat_map(|ctx| self.area.context(*ctx).keys(store.scope).names())
                    .sorted()
                    .dedup()
                    .collect())
            }
            other => throw_error!(NotAnObject, other.type_name().to_string()),
        }
    }

    /// `target.#.name`
    pub fn get_private(&mut self, target: &Value, name: &str) -> Result<Value, VeilError> {
        let view = self.private(target)?;
        let name = self.interner.get_or_intern(name);
        self.read_private(view, name)
    }

    /// `target.#.name = value`
    pub fn set_private(
        &mut self,
        target: &Value,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), VeilError> {
        let view = self.private(target)?;
        let name = self.interner.get_or_intern(name);
        self.write_private(view, name, value.into())
    }

    pub(crate) fn read_private(&mut self, view: PrivateView, name: Symbol) -> Result<Value, VeilError> {
        let key = self.resolve_private_key(view.store, name)?;
        let Some(property) = self.stores.lookup(view.store, key) else {
            return self.missing_slot(view, name);
        };
        match property.value.clone() {
            PropertyValue::Data(value) => Ok(value),
            PropertyValue::Accessor {
                get: Some(getter), ..
            } => self.call(&Value::Object(getter), Value::Object(view.receiver), &[]),
            PropertyValue::Accessor { get: None, .. } => Ok(Value::Undefined),
        }
    }

    /// Instance writes land in the view's own store, static writes in the
    /// store of the type that declared the field. The instance defaults held
    /// by a type's prototype are never overwritten.
    pub(crate) fn write_private(
        &mut self,
        view: PrivateView,
        name: Symbol,
        value: Value,
    ) -> Result<(), VeilError> {
        let key = self.resolve_private_key(view.store, name)?;
        let Some(holder) = self.stores.find_holder(view.store, key) else {
            return self.missing_slot(view, name);
        };
        let Some(current) = self.stores.lookup(holder, key).cloned() else {
            return self.missing_slot(view, name);
        };
        match &current.value {
            PropertyValue::Accessor {
                set: Some(setter), ..
            } => {
                let setter = Value::Object(*setter);
                return self
                    .call(&setter, Value::Object(view.receiver), &[value])
                    .map(|_| ());
            }
            PropertyValue::Accessor { set: None, .. } => return throw_error!(ReadOnlyField, name),
            PropertyValue::Data(_) if !current.writable => return throw_error!(ReadOnlyField, name),
            PropertyValue::Data(_) => {}
        }

        let target = match view.scope {
            FieldScope::Instance if self.stores.get(view.store).kind == StoreKind::Class => {
                debug_log!("Refused write of {} into class defaults", self.resolve(name));
                return throw_error!(ReadOnlyField, name);
            }
            FieldScope::Instance => view.store,
            FieldScope::Static => holder,
        };
        self.stores.write(
            target,
            key,
            Property {
                value: PropertyValue::Data(value),
                ..current
            },
        );
        Ok(())
    }

    fn missing_slot<T>(&self, view: PrivateView, name: Symbol) -> Result<T, VeilError> {
        let owner = self.stores.get(view.store).owner;
        throw_error!(
            NoSuchPrivateField,
            field: name,
            owner: self.area.context(owner).name
        )
    }
}

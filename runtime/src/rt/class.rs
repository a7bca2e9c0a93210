use crate::error::VeilError;
use crate::heap::context_area::ContextArea;
use crate::heap::private_store::StoreKind;
use crate::heap::{Property, PropertyValue};
use crate::keys::{ClassId, ContextId, ObjectRef, SlotKey, StoreId};
use crate::rt::declaration::{ClassDefinition, Member, parse_annotated_name};
use crate::rt::field::{FieldDescriptor, FieldScope, Visibility};
use crate::rt::method::{HostFunction, NativeFn, native};
use crate::vm::Value;
use crate::vm::engine::{Engine, ProtectedType};
use crate::{Symbol, debug_log};
use std::fmt::Debug;

/// A wrapped type: constructor, prototype and the two class-level stores.
#[derive(Clone)]
pub struct ProtectedClass {
    pub name: Symbol,
    pub context: ContextId,
    pub type_object: ObjectRef,
    pub prototype: ObjectRef,
    pub instance_store: StoreId,
    pub static_store: StoreId,
    pub super_id: Option<ClassId>,
    pub constructor: Option<NativeFn>,
}

impl Debug for ProtectedClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedClass")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("type_object", &self.type_object)
            .field("super_id", &self.super_id)
            .finish_non_exhaustive()
    }
}

impl ProtectedClass {
    /// Creates the context, prototype and stores of a new type around
    /// `type_object` and binds them to the parent type.
    pub(crate) fn load(
        engine: &mut Engine,
        name: Symbol,
        type_object: ObjectRef,
        constructor: Option<NativeFn>,
        super_id: Option<ClassId>,
    ) -> ClassId {
        let parent = super_id.map(|id| engine.area.class(id).clone());
        let context = engine
            .area
            .push_context(name, parent.as_ref().map(|p| p.context));
        bind_inheritance(&mut engine.area, context);

        let prototype = engine
            .heap
            .alloc_object(parent.as_ref().map(|p| p.prototype));
        let (prototype_sym, constructor_sym) = (engine.symbols.prototype, engine.symbols.constructor);
        engine.heap.define_property(
            type_object,
            prototype_sym,
            Property::hidden(Value::Object(prototype)),
        );
        engine.heap.define_property(
            prototype,
            constructor_sym,
            Property::hidden(Value::Object(type_object)),
        );

        let instance_store = engine.stores.allocate(
            context,
            FieldScope::Instance,
            parent.as_ref().map(|p| p.instance_store),
            StoreKind::Class,
        );
        let static_store = engine.stores.allocate(
            context,
            FieldScope::Static,
            parent.as_ref().map(|p| p.static_store),
            StoreKind::Class,
        );

        engine.area.register_function(type_object, &[context]);
        engine.virtualized.insert(type_object, static_store);
        engine.virtualized.insert(prototype, instance_store);

        let id = engine.area.push_class(Self {
            name,
            context,
            type_object,
            prototype,
            instance_store,
            static_store,
            super_id,
            constructor,
        });
        debug_log!(
            "Loaded protected type {} as {id:?}",
            engine.interner.resolve(&name)
        );
        id
    }

    #[tracing::instrument(skip_all)]
    pub(crate) fn define(
        engine: &mut Engine,
        definition: ClassDefinition,
    ) -> Result<ProtectedType, VeilError> {
        let ClassDefinition {
            name,
            extends,
            constructor,
            members,
        } = definition;
        let members = members.parse(&engine.interner, engine.config.modifier_conflict)?;
        let super_id = extends
            .map(|parent| engine.class_id_of(parent.into()))
            .transpose()?;

        let name = engine.interner.get_or_intern(name);
        let parent_type = super_id.map(|id| engine.area.class(id).type_object);
        let body = constructor
            .clone()
            .unwrap_or_else(|| native(|_, _, _| Ok(Value::Undefined)));
        let type_object = engine
            .heap
            .alloc_function(parent_type, HostFunction::new(name, body));
        let class_id = Self::load(engine, name, type_object, constructor, super_id);

        let class = engine.area.class(class_id).clone();
        for (descriptor, member) in members {
            let (public_holder, store) = match descriptor.scope {
                FieldScope::Instance => (class.prototype, class.instance_store),
                FieldScope::Static => (class.type_object, class.static_store),
            };
            link_member(engine, class.context, descriptor, member, public_holder, store);
        }
        Ok(ProtectedType(type_object))
    }

    /// After-the-fact static. Returns `false` if the type already declares the name.
    pub(crate) fn declare_static_field(
        engine: &mut Engine,
        ty: ProtectedType,
        annotated: &str,
        value: Value,
    ) -> Result<bool, VeilError> {
        let parsed = parse_annotated_name(annotated, engine.config.modifier_conflict)?;
        let class_id = engine.class_id_of(ty.into())?;
        let class = engine.area.class(class_id).clone();
        let name = engine.interner.get_or_intern(parsed.name);

        if engine
            .area
            .context(class.context)
            .keys(FieldScope::Static)
            .declares(name)
            || engine.heap.own_property(class.type_object, name).is_some()
        {
            return Ok(false);
        }

        let descriptor = FieldDescriptor {
            name,
            visibility: parsed.visibility_or(Visibility::Private),
            scope: FieldScope::Static,
            mutable: parsed.mutable,
            is_method: value
                .as_object()
                .is_ok_and(|obj| engine.heap.is_callable(obj)),
        };
        link_member(
            engine,
            class.context,
            descriptor,
            Member::Value(value),
            class.type_object,
            class.static_store,
        );
        if descriptor.visibility.is_shared()
            && let Some(slot) = engine
                .area
                .context(class.context)
                .keys(FieldScope::Static)
                .declared(name)
        {
            propagate_shared(&mut engine.area, class.context, FieldScope::Static, name, slot.key);
        }
        Ok(true)
    }
}

/// Mirrors the parent's shareable keys into a freshly pushed context, for both scopes.
pub(crate) fn bind_inheritance(area: &mut ContextArea, child: ContextId) {
    let Some(parent) = area.context(child).parent else {
        return;
    };
    for scope in [FieldScope::Instance, FieldScope::Static] {
        let shared = area.context(parent).keys(scope).shareable();
        let table = area.context_mut(child).keys_mut(scope);
        for (name, key) in shared {
            table.inherit(name, key);
        }
    }
}

/// Pushes a protected key added after descendants were bound down the tree.
/// A descendant that declares its own protected `name` keeps it for its subtree.
pub(crate) fn propagate_shared(
    area: &mut ContextArea,
    context: ContextId,
    scope: FieldScope,
    name: Symbol,
    key: SlotKey,
) {
    let children = area.context(context).children.clone();
    for child in children {
        let table = area.context_mut(child).keys_mut(scope);
        if table.declared(name).is_some_and(|slot| slot.shared) {
            continue;
        }
        table.inherit(name, key);
        propagate_shared(area, child, scope, name, key);
    }
}

/// Public members become properties of `public_holder`, hidden ones get a
/// slot in `store`.
pub(crate) fn link_member(
    engine: &mut Engine,
    context: ContextId,
    descriptor: FieldDescriptor,
    member: Member,
    public_holder: ObjectRef,
    store: StoreId,
) {
    let property = materialize(engine, context, &descriptor, member);
    engine.area.context_mut(context).record(descriptor);
    if !descriptor.visibility.is_hidden() {
        engine
            .heap
            .define_property(public_holder, descriptor.name, property);
        return;
    }

    let table = engine.area.context(context).keys(descriptor.scope);
    // a name repeated inside one definition keeps its slot, the later value wins
    let key = match table.declared(descriptor.name) {
        Some(slot) => slot.key,
        None => {
            let key = engine.area.next_slot_key();
            engine
                .area
                .context_mut(context)
                .keys_mut(descriptor.scope)
                .declare(descriptor.name, key, descriptor.visibility.is_shared());
            key
        }
    };
    engine.stores.define(store, key, property);
}

fn materialize(
    engine: &mut Engine,
    context: ContextId,
    descriptor: &FieldDescriptor,
    member: Member,
) -> Property {
    let value = match member {
        Member::Value(value) => PropertyValue::Data(value),
        Member::Method(body) => {
            PropertyValue::Data(Value::Object(alloc_method(engine, context, descriptor.name, body)))
        }
        Member::Accessor { get, set } => PropertyValue::Accessor {
            get: get.map(|body| alloc_method(engine, context, descriptor.name, body)),
            set: set.map(|body| alloc_method(engine, context, descriptor.name, body)),
        },
    };
    Property {
        value,
        writable: descriptor.mutable,
        enumerable: !descriptor.is_method,
    }
}

fn alloc_method(engine: &mut Engine, context: ContextId, name: Symbol, body: NativeFn) -> ObjectRef {
    let function = engine
        .heap
        .alloc_function(None, HostFunction::new(name, body));
    engine.area.register_function(function, &[context]);
    function
}

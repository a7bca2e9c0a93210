use crate::error::VeilError;
use crate::heap::private_store::StoreKind;
use crate::rt::class::{bind_inheritance, link_member};
use crate::rt::declaration::ObjectDefinition;
use crate::rt::field::FieldScope;
use crate::vm::engine::{Engine, ProtectedInstance};

/// Object literal that owns its own Declaration Context. A prototype, if any,
/// becomes both the delegate and the parent context.
#[tracing::instrument(skip_all)]
pub(crate) fn define_object(
    engine: &mut Engine,
    definition: ObjectDefinition,
) -> Result<ProtectedInstance, VeilError> {
    let ObjectDefinition {
        name,
        prototype,
        members,
    } = definition;
    let members = members.parse(&engine.interner, engine.config.modifier_conflict)?;
    let parent = prototype
        .map(|value| engine.protected_store_of(&value))
        .transpose()?;

    let name = engine.interner.get_or_intern(name);
    let parent_context = parent.map(|(_, store)| engine.stores.get(store).owner);
    let context = engine.area.push_context(name, parent_context);
    bind_inheritance(&mut engine.area, context);

    let object = engine.heap.alloc_object(parent.map(|(obj, _)| obj));
    let store = engine.stores.allocate(
        context,
        FieldScope::Instance,
        parent.map(|(_, store)| store),
        StoreKind::Object,
    );
    engine.virtualized.insert(object, store);

    for (mut descriptor, member) in members {
        // objects have no static side
        descriptor.scope = FieldScope::Instance;
        link_member(engine, context, descriptor, member, object, store);
    }
    Ok(ProtectedInstance(object))
}

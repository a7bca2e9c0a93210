//! Caller-context authentication.
//!
//! The caller is identified by the innermost active call only. A call into an
//! unwrapped function pushes a frame without contexts, so authority never
//! leaks through intermediate code.

use crate::error::VeilError;
use crate::heap::context_area::ContextSet;
use crate::keys::{ContextId, SlotKey, StoreId};
use crate::vm::engine::Engine;
use crate::vm::{PrivateView, Value};
use crate::{Symbol, debug_log, throw_error};

impl Engine {
    /// Declaration Contexts of the innermost active call.
    pub fn current_caller_contexts(&self) -> &[ContextId] {
        self.stack.caller_contexts()
    }

    /// Whether the running code may open `target`'s private store.
    pub fn can_access(&self, target: &Value) -> bool {
        self.checked(target).is_ok()
            && self
                .store_of(target)
                .is_some_and(|store| !self.authorized_contexts(self.stores.get(store).owner).is_empty())
    }

    /// Caller contexts within the ancestor-or-self closure of `owner`,
    /// most derived first.
    pub(crate) fn authorized_contexts(&self, owner: ContextId) -> ContextSet {
        let callers = self.stack.caller_contexts();
        self.area
            .ancestors_or_self(owner)
            .into_iter()
            .filter(|ctx| callers.contains(ctx))
            .collect()
    }

    /// Opens the private store of `target`. Same as reading
    /// [`PRIVILEGED_OPERATOR`](crate::PRIVILEGED_OPERATOR) from it.
    pub fn private(&self, target: &Value) -> Result<PrivateView, VeilError> {
        self.checked(target)?;
        let (receiver, store) = match target {
            Value::PrivateView(view) => (view.receiver, view.store),
            other => {
                let receiver = other.as_object()?;
                let Some(store) = self.virtualized.get(&receiver).copied() else {
                    return throw_error!(UnauthorizedAccess, owner: None);
                };
                (receiver, store)
            }
        };
        let owner = self.stores.get(store).owner;
        if self.authorized_contexts(owner).is_empty() {
            debug_log!(
                "Denied private access to {receiver:?} from {:?}",
                self.current_caller_contexts()
            );
            return throw_error!(UnauthorizedAccess, owner: Some(self.area.context(owner).name));
        }
        Ok(PrivateView {
            receiver,
            store,
            scope: self.stores.get(store).scope,
        })
    }

    /// Name → opaque key, as seen by the current caller.
    ///
    /// Walks the owner's context chain from the most derived end. For every
    /// context the caller belongs to, the name is looked up in that context's
    /// table; the first hit wins. This is what makes a private `x` in a parent
    /// and a private `x` in a child resolve to different slots.
    #[hotpath::measure]
    pub(crate) fn resolve_private_key(
        &self,
        store: StoreId,
        name: Symbol,
    ) -> Result<SlotKey, VeilError> {
        let store = self.stores.get(store);
        let callers = self.stack.caller_contexts();
        let mut authorized = false;
        for ctx in self.area.ancestors_or_self(store.owner) {
            if !callers.contains(&ctx) {
                continue;
            }
            authorized = true;
            if let Some(key) = self.area.context(ctx).keys(store.scope).resolve(name) {
                return Ok(key);
            }
        }

        let owner = self.area.context(store.owner).name;
        if authorized {
            throw_error!(NoSuchPrivateField, field: name, owner: owner)
        } else {
            throw_error!(UnauthorizedAccess, owner: Some(owner))
        }
    }
}

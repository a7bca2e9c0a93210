use crate::error::VeilError;
use crate::heap::PropertyValue;
use crate::heap::private_store::StoreKind;
use crate::keys::{ClassId, ObjectRef};
use crate::rt::field::FieldScope;
use crate::vm::Value;
use crate::vm::engine::{Engine, ProtectedType};
use crate::vm::stack::ActiveCall;
use crate::{debug_log, throw_error};
use tracing_log::log::warn;

impl Engine {
    /// Apply trap. Every call, wrapped or not, gets a frame on the active-call
    /// registry; unwrapped functions get one without contexts.
    ///
    /// For wrapped functions the receiver is rebound: a view is replaced by the
    /// object it was opened on, so a privileged read inside the body always
    /// starts from the receiver itself. Raw receivers pass through untouched
    /// and fail authentication on their own.
    #[hotpath::measure]
    pub fn call(&mut self, function: &Value, this: Value, args: &[Value]) -> Result<Value, VeilError> {
        let obj = self.callable(function)?;
        self.checked(&this)?;
        let body = self.heap.function_body(obj)?;
        let registered = self.area.function_contexts(obj).cloned();
        let (contexts, receiver) = match registered {
            Some(contexts) => (contexts, rebind_receiver(this)),
            None => (Default::default(), this),
        };

        self.stack.push(ActiveCall {
            function: obj,
            contexts,
            constructing: None,
        })?;
        let result = body(self, receiver, args);
        self.stack.pop();
        result
    }

    /// `target.method(...args)`
    pub fn invoke(&mut self, target: &Value, method: &str, args: &[Value]) -> Result<Value, VeilError> {
        let function = self.get(target, method)?;
        if function.is_undefined() {
            return throw_error!(NotCallable, method.to_string());
        }
        self.call(&function, target.clone(), args)
    }

    /// Construct trap: `new ty(...args)`.
    #[tracing::instrument(skip_all)]
    pub fn construct(&mut self, ty: &Value, args: &[Value]) -> Result<Value, VeilError> {
        let class_id = self.class_id_of(ty.clone())?;
        let prototype = self.area.class(class_id).prototype;
        let instance = self.heap.alloc_object(Some(prototype));
        self.run_constructor(class_id, instance, args)
            .map(Value::Object)
    }

    /// Runs the parent constructor against the instance under construction.
    /// Only valid directly inside a constructor body. `this` is always the
    /// instance recorded for the running constructor, whatever is passed in.
    pub fn super_construct(&mut self, this: &Value, args: &[Value]) -> Result<Value, VeilError> {
        let Some((class_id, instance)) = self.stack.innermost().and_then(|call| call.constructing)
        else {
            return throw_error!(NoActiveConstructor);
        };
        if this.receiver().is_some_and(|obj| obj != instance) {
            warn!("super constructor called on {this:?}, running it on {instance:?} instead");
        }
        match self.area.class(class_id).super_id {
            Some(parent) => self.run_constructor(parent, instance, args).map(Value::Object),
            None => Ok(Value::Object(instance)),
        }
    }

    /// The wrapped type whose prototype `instance` delegates to.
    pub fn constructor_of(&self, instance: &Value) -> Result<Option<ProtectedType>, VeilError> {
        self.checked(instance)?;
        let Some(obj) = instance.receiver() else {
            return throw_error!(NotAnObject, instance.type_name().to_string());
        };
        let found = self
            .heap
            .find_property(obj, self.symbols.constructor)
            .and_then(|(_, property)| match property.value {
                PropertyValue::Data(Value::Object(ty)) => Some(ty),
                _ => None,
            })
            .filter(|ty| self.area.class_of_type(*ty).is_some());
        Ok(found.map(ProtectedType))
    }

    fn run_constructor(
        &mut self,
        class_id: ClassId,
        this: ObjectRef,
        args: &[Value],
    ) -> Result<ObjectRef, VeilError> {
        self.stage_instance(this, class_id);
        let class = self.area.class(class_id).clone();
        let contexts = self
            .area
            .function_contexts(class.type_object)
            .cloned()
            .unwrap_or_default();

        self.stack.push(ActiveCall {
            function: class.type_object,
            contexts,
            constructing: Some((class_id, this)),
        })?;
        let outcome = match (&class.constructor, class.super_id) {
            (Some(body), _) => body(self, Value::Object(this), args),
            // derived type without a body: parent constructor, same arguments
            (None, Some(parent)) => self.run_constructor(parent, this, args).map(Value::Object),
            (None, None) => Ok(Value::Undefined),
        };
        self.stack.pop();

        match outcome? {
            Value::Object(replacement) if replacement != this => {
                self.stage_instance(replacement, class_id);
                Ok(replacement)
            }
            _ => Ok(this),
        }
    }

    /// Binds `obj` to the instance store chain of `class_id`. The first
    /// construction allocates the per-instance store; a later constructor of a
    /// more derived type widens the same store instead of creating another.
    fn stage_instance(&mut self, obj: ObjectRef, class_id: ClassId) {
        let class = self.area.class(class_id);
        let (context, class_store) = (class.context, class.instance_store);

        let Some(store) = self.virtualized.get(&obj).copied() else {
            let store = self.stores.allocate(
                context,
                FieldScope::Instance,
                Some(class_store),
                StoreKind::Instance,
            );
            self.virtualized.insert(obj, store);
            debug_log!("Allocated instance store {store:?} for {obj:?}");
            return;
        };

        let owner = self.stores.get(store).owner;
        if self.area.is_descendant_or_self(owner, context) {
            return;
        }
        if self.area.is_descendant_or_self(context, owner)
            && self.stores.reparent(store, context, class_store)
        {
            debug_log!("Widened instance store {store:?} of {obj:?}");
            return;
        }
        warn!("{obj:?} is already bound to an unrelated store, keeping {store:?}");
    }
}

fn rebind_receiver(this: Value) -> Value {
    match this {
        Value::PrivateView(view) => Value::Object(view.receiver),
        other => other,
    }
}

use crate::error::VeilError;
use crate::heap::Heap;
use crate::heap::context_area::{ContextArea, ContextSet};
use crate::heap::private_store::StoreArea;
use crate::keys::{ClassId, ObjectRef, StoreId};
use crate::rt::class::ProtectedClass;
use crate::rt::declaration::{ClassDefinition, Definition, ObjectDefinition};
use crate::rt::field::FieldDescriptor;
use crate::rt::method::{HostFunction, native};
use crate::rt::object::define_object;
use crate::vm::stack::CallStack;
use crate::vm::{PRIVILEGED_OPERATOR, Value};
use crate::{EngineConfig, Symbol, build_error, debug_log, throw_error};
use lasso::ThreadedRodeo;
use std::collections::HashMap;
use std::sync::Arc;

/// Externally visible handle of a wrapped constructor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProtectedType(pub(crate) ObjectRef);

/// Externally visible handle of an object defined through [`Engine::define_object`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProtectedInstance(pub(crate) ObjectRef);

impl ProtectedType {
    pub fn object(self) -> ObjectRef {
        self.0
    }
}

impl ProtectedInstance {
    pub fn object(self) -> ObjectRef {
        self.0
    }
}

impl From<ProtectedType> for Value {
    fn from(value: ProtectedType) -> Self {
        Value::Object(value.0)
    }
}

impl From<ProtectedInstance> for Value {
    fn from(value: ProtectedInstance) -> Self {
        Value::Object(value.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Defined {
    Type(ProtectedType),
    Instance(ProtectedInstance),
}

impl Defined {
    pub fn into_type(self) -> Option<ProtectedType> {
        match self {
            Defined::Type(ty) => Some(ty),
            Defined::Instance(_) => None,
        }
    }

    pub fn into_instance(self) -> Option<ProtectedInstance> {
        match self {
            Defined::Instance(instance) => Some(instance),
            Defined::Type(_) => None,
        }
    }
}

impl From<Defined> for Value {
    fn from(value: Defined) -> Self {
        match value {
            Defined::Type(ty) => ty.into(),
            Defined::Instance(instance) => instance.into(),
        }
    }
}

/// Symbols the traps compare against on every access.
#[derive(Debug, Copy, Clone)]
pub(crate) struct WellKnownSymbols {
    pub operator: Symbol,
    pub constructor: Symbol,
    pub prototype: Symbol,
}

/// Owns every object, Declaration Context and private store, plus the
/// active-call registry. One engine per logical call stack.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) interner: Arc<ThreadedRodeo>,
    pub(crate) heap: Heap,
    pub(crate) area: ContextArea,
    pub(crate) stores: StoreArea,
    pub(crate) stack: CallStack,
    /// Objects the traps know about, with the store a privileged read opens.
    /// `None` marks a receiver that was wrapped without any private data.
    pub(crate) virtualized: HashMap<ObjectRef, StoreId>,
    pub(crate) symbols: WellKnownSymbols,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_interner(config, Arc::new(ThreadedRodeo::default()))
    }

    /// Shares an interner with the host, so symbols line up on both sides.
    pub fn with_interner(config: EngineConfig, interner: Arc<ThreadedRodeo>) -> Self {
        debug_log!("Creating engine with {config:?}");
        let symbols = WellKnownSymbols {
            operator: interner.get_or_intern_static(PRIVILEGED_OPERATOR),
            constructor: interner.get_or_intern_static("constructor"),
            prototype: interner.get_or_intern_static("prototype"),
        };
        Self {
            stack: CallStack::new(config.max_call_depth),
            config,
            interner,
            heap: Heap::new(),
            area: ContextArea::new(),
            stores: StoreArea::new(),
            virtualized: HashMap::new(),
            symbols,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn interner(&self) -> &Arc<ThreadedRodeo> {
        &self.interner
    }

    pub fn symbol(&self, name: &str) -> Symbol {
        self.interner.get_or_intern(name)
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.interner.resolve(&symbol)
    }

    /// Renders an error with its symbols resolved.
    pub fn pretty_error(&self, error: VeilError) -> String {
        error.into_pretty_string(&self.interner)
    }

    /// Plain, unwrapped host function.
    pub fn create_function<F>(&mut self, name: &str, body: F) -> Value
    where
        F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
    {
        let name = self.interner.get_or_intern(name);
        Value::Object(
            self.heap
                .alloc_function(None, HostFunction::new(name, native(body))),
        )
    }

    /// Plain, unwrapped object.
    pub fn create_object(&mut self, prototype: Option<ObjectRef>) -> Result<Value, VeilError> {
        let prototype = prototype.map(|obj| self.heap.checked(obj)).transpose()?;
        Ok(Value::Object(self.heap.alloc_object(prototype)))
    }

    pub fn define(&mut self, definition: impl Into<Definition>) -> Result<Defined, VeilError> {
        match definition.into() {
            Definition::Class(class) => self.define_class(class).map(Defined::Type),
            Definition::Object(object) => self.define_object(object).map(Defined::Instance),
        }
    }

    pub fn define_class(&mut self, definition: ClassDefinition) -> Result<ProtectedType, VeilError> {
        ProtectedClass::define(self, definition)
    }

    pub fn define_object(
        &mut self,
        definition: ObjectDefinition,
    ) -> Result<ProtectedInstance, VeilError> {
        define_object(self, definition)
    }

    /// Registers a host function as a constructor with a fresh root context.
    /// Wrapping the same function twice returns the same type.
    #[tracing::instrument(skip_all)]
    pub fn wrap(&mut self, callable: Value) -> Result<ProtectedType, VeilError> {
        let obj = self.callable(&callable)?;
        if self.area.class_of_type(obj).is_some() {
            return Ok(ProtectedType(obj));
        }
        let body = self.heap.function_body(obj)?;
        let name = self
            .heap
            .function_name(obj)
            .ok_or_else(|| build_error!(NotCallable, callable.type_name().to_string()))?;
        ProtectedClass::load(self, name, obj, Some(body), None);
        Ok(ProtectedType(obj))
    }

    /// Registers `function` with the contexts owning `owner`'s store that the
    /// current caller holds. An unauthorized caller gets a function with no
    /// authority at all.
    pub fn wrap_in_scope(&mut self, function: Value, owner: &Value) -> Result<Value, VeilError> {
        let obj = self.callable(&function)?;
        self.checked(owner)?;
        let contexts = match self.store_of(owner) {
            Some(store) => self.authorized_contexts(self.stores.get(store).owner),
            None => ContextSet::new(),
        };
        self.area.register_function(obj, &contexts);
        Ok(function)
    }

    pub fn declare_static_field(
        &mut self,
        ty: ProtectedType,
        annotated: &str,
        value: impl Into<Value>,
    ) -> Result<bool, VeilError> {
        ProtectedClass::declare_static_field(self, ty, annotated, value.into())
    }

    /// Field descriptors declared by the type itself, in declaration order.
    pub fn descriptors(&self, ty: ProtectedType) -> Result<Vec<FieldDescriptor>, VeilError> {
        let class_id = self.class_id_of(ty.into())?;
        let context = self.area.class(class_id).context;
        Ok(self.area.context(context).descriptors().to_vec())
    }

    /// Whether `value` is a wrapped type or function, or an object with a
    /// private store. Passing a raw object as the receiver of a wrapped call
    /// does not make it wrapped.
    pub fn is_wrapped(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => {
                self.area.class_of_type(*obj).is_some()
                    || self.area.is_registered(*obj)
                    || self.virtualized.contains_key(obj)
            }
            _ => false,
        }
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn call_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Rejects handles and views this engine never handed out.
    pub(crate) fn checked(&self, value: &Value) -> Result<(), VeilError> {
        match value {
            Value::Object(obj) => self.heap.checked(*obj).map(|_| ()),
            Value::PrivateView(view) if !self.stores.contains(view.store) => {
                throw_error!(WrongHeapAddress, view.receiver)
            }
            Value::PrivateView(view) => self.heap.checked(view.receiver).map(|_| ()),
            _ => Ok(()),
        }
    }

    pub(crate) fn callable(&self, value: &Value) -> Result<ObjectRef, VeilError> {
        self.checked(value)?;
        match value {
            Value::Object(obj) if self.heap.is_callable(*obj) => Ok(*obj),
            Value::Object(obj) => throw_error!(NotCallable, self.describe(*obj)),
            other => throw_error!(NotCallable, other.type_name().to_string()),
        }
    }

    pub(crate) fn class_id_of(&self, value: Value) -> Result<ClassId, VeilError> {
        self.checked(&value)?;
        let obj = value.as_object()?;
        self.area
            .class_of_type(obj)
            .ok_or_else(|| build_error!(MustBeWrapped, self.heap.function_name(obj)))
    }

    /// Store of an object that went through `define`/`construct`.
    pub(crate) fn protected_store_of(&self, value: &Value) -> Result<(ObjectRef, StoreId), VeilError> {
        self.checked(value)?;
        let obj = value.as_object()?;
        match self.virtualized.get(&obj).copied() {
            Some(store) => Ok((obj, store)),
            None => throw_error!(MustBeWrapped, self.heap.function_name(obj)),
        }
    }

    pub(crate) fn store_of(&self, value: &Value) -> Option<StoreId> {
        match value {
            Value::PrivateView(view) => Some(view.store),
            other => other
                .receiver()
                .and_then(|obj| self.virtualized.get(&obj).copied()),
        }
    }

    pub(crate) fn describe(&self, obj: ObjectRef) -> String {
        match self.heap.function_name(obj) {
            Some(name) => format!("function {}", self.resolve(name)),
            None => format!("object #{}", obj.into_inner()),
        }
    }
}

use crate::error::VeilError;
use crate::keys::{ObjectRef, StoreId};
use crate::rt::field::FieldScope;
use crate::throw_error;
use std::rc::Rc;

pub mod engine;
pub mod stack;

/// Key that, read from a protected object, yields a [`PrivateView`].
pub const PRIVILEGED_OPERATOR: &str = "#";

/// Host value as seen by function bodies and by the public API.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    PrivateView(PrivateView),
}

/// Capability onto one private store, scoped to the receiver it was opened on.
///
/// Holding a view grants nothing by itself: every read or write through it
/// authenticates the code running at that moment.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrivateView {
    pub receiver: ObjectRef,
    pub(crate) store: StoreId,
    pub scope: FieldScope,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::PrivateView(_) => "private view",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_object(&self) -> Result<ObjectRef, VeilError> {
        match self {
            Value::Object(obj) => Ok(*obj),
            other => throw_error!(NotAnObject, other.type_name().to_string()),
        }
    }

    /// The object behind a plain reference or behind a view.
    pub fn receiver(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            Value::PrivateView(view) => Some(view.receiver),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<PrivateView> for Value {
    fn from(value: PrivateView) -> Self {
        Value::PrivateView(value)
    }
}

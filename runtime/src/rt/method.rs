use crate::error::VeilError;
use crate::keys::Symbol;
use crate::vm::Value;
use crate::vm::engine::Engine;
use std::fmt::Debug;
use std::rc::Rc;

/// Host-side body of a function: `(engine, this, args) -> result`.
///
/// Bodies receive the engine mutably so they can reach other objects and the
/// privileged operator; they never see private stores directly.
pub type NativeFn = Rc<dyn Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError>>;

pub fn native<F>(body: F) -> NativeFn
where
    F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
{
    Rc::new(body)
}

#[derive(Clone)]
pub struct HostFunction {
    pub name: Symbol,
    body: NativeFn,
}

impl HostFunction {
    pub fn new(name: Symbol, body: NativeFn) -> Self {
        Self { name, body }
    }

    pub fn body(&self) -> NativeFn {
        self.body.clone()
    }
}

impl Debug for HostFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

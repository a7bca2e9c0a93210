//! Runtime access-control layer that gives a dynamic, prototype-based object
//! model `private`, `protected`, `static` and `public` members.
//!
//! Hidden values never live on the object itself: they are kept in private
//! stores owned by the [`Engine`], and every access through the privileged
//! operator (`"#"`) is checked against the Declaration Context of the innermost
//! active wrapped call.

pub mod access;
pub mod error;
pub mod heap;
pub mod intercept;
pub mod keys;
pub mod rt;
pub mod telemetry;
pub mod vm;

pub use error::{DeclarationFault, VeilError};
pub use keys::{ClassId, ContextId, ObjectRef, SlotKey, StoreId, Symbol};
pub use rt::declaration::{ClassDefinition, Definition, Member, ObjectDefinition};
pub use rt::field::{FieldDescriptor, FieldScope, Visibility};
pub use rt::method::NativeFn;
pub use vm::engine::{Defined, Engine, ProtectedInstance, ProtectedType};
pub use vm::{PRIVILEGED_OPERATOR, PrivateView, Value};

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "log-runtime-traces")]
        {
            tracing_log::log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! build_error {
    ($variant:ident) => {
        $crate::error::VeilError::$variant
    };
    ($variant:ident, $($field:ident: $value:expr),+ $(,)?) => {
        $crate::error::VeilError::$variant { $($field: $value),+ }
    };
    ($variant:ident, $value:expr) => {
        $crate::error::VeilError::$variant($value)
    };
}

#[macro_export]
macro_rules! throw_error {
    ($($arg:tt)*) => {
        Err($crate::build_error!($($arg)*))
    };
}

/// What `delete` through a private view does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Report `false` and leave the field untouched.
    #[default]
    SilentFail,
    /// Fail with [`VeilError::DeleteRejected`].
    Reject,
}

/// How a declaration carrying several visibility modifiers is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierConflict {
    #[default]
    LastWins,
    Reject,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub delete_policy: DeletePolicy,
    pub modifier_conflict: ModifierConflict,
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            modifier_conflict: ModifierConflict::default(),
            max_call_depth: 256,
        }
    }
}

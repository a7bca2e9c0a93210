use crate::keys::{ObjectRef, Symbol};
use lasso::ThreadedRodeo;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum VeilError {
    MalformedDeclaration {
        declaration: String,
        fault: DeclarationFault,
    },
    UnauthorizedAccess {
        owner: Option<Symbol>,
    },
    NoSuchPrivateField {
        field: Symbol,
        owner: Symbol,
    },
    MustBeWrapped(Option<Symbol>),
    NotCallable(String),
    NotAnObject(String),
    ReadOnlyField(Symbol),
    DeleteRejected(Symbol),
    NoActiveConstructor,
    StackOverflow(usize),
    WrongHeapAddress(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationFault {
    UnknownModifier(String),
    MissingName,
    ConflictingVisibility,
}

impl Display for VeilError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for VeilError {}

impl VeilError {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            VeilError::MalformedDeclaration { .. } => "MalformedDeclarationError",
            VeilError::UnauthorizedAccess { .. } => "UnauthorizedAccessError",
            VeilError::NoSuchPrivateField { .. } => "NoSuchPrivateFieldError",
            VeilError::MustBeWrapped(_) => "MustBeWrappedError",
            VeilError::NoActiveConstructor => "ReferenceError",
            VeilError::StackOverflow(_) => "RangeError",
            VeilError::WrongHeapAddress(_) => "InternalError",
            VeilError::NotCallable(_)
            | VeilError::NotAnObject(_)
            | VeilError::ReadOnlyField(_)
            | VeilError::DeleteRejected(_) => "TypeError",
        }
    }

    pub fn into_pretty_string(self, interner: &ThreadedRodeo) -> String {
        let message = match &self {
            VeilError::MalformedDeclaration { declaration, fault } => match fault {
                DeclarationFault::UnknownModifier(modifier) => {
                    format!("`{declaration}`: unknown modifier `{modifier}`")
                }
                DeclarationFault::MissingName => format!("`{declaration}`: missing field name"),
                DeclarationFault::ConflictingVisibility => {
                    format!("`{declaration}`: conflicting visibility modifiers")
                }
            },
            VeilError::UnauthorizedAccess { owner: Some(owner) } => format!(
                "current method does not have access to private members of {}",
                interner.resolve(owner)
            ),
            VeilError::UnauthorizedAccess { owner: None } => {
                "cannot access private data from invalid scope".to_string()
            }
            VeilError::NoSuchPrivateField { field, owner } => format!(
                "cannot access non-existent private key {} of {}",
                interner.resolve(field),
                interner.resolve(owner)
            ),
            VeilError::MustBeWrapped(name) => format!(
                "{} must be wrapped before it can be constructed or extended",
                name.map_or("value", |sym| interner.resolve(&sym))
            ),
            VeilError::NotCallable(what) => format!("{what} is not callable"),
            VeilError::NotAnObject(what) => format!("{what} is not an object"),
            VeilError::ReadOnlyField(field) => format!(
                "cannot assign to read-only field {}",
                interner.resolve(field)
            ),
            VeilError::DeleteRejected(field) => {
                format!("cannot delete private field {}", interner.resolve(field))
            }
            VeilError::NoActiveConstructor => {
                "super constructor may only be called from inside a constructor".to_string()
            }
            VeilError::StackOverflow(depth) => format!("maximum call depth of {depth} exceeded"),
            VeilError::WrongHeapAddress(obj) => {
                format!("object #{} does not belong to this engine", obj.into_inner())
            }
        };
        format!("{}: {}", self.kind_name(), message)
    }
}

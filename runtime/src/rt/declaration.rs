use crate::error::{DeclarationFault, VeilError};
use crate::rt::field::{FieldDescriptor, FieldScope, Visibility};
use crate::rt::method::{NativeFn, native};
use crate::vm::Value;
use crate::vm::engine::{Engine, ProtectedType};
use crate::ModifierConflict;
use lasso::ThreadedRodeo;
use std::fmt::Debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Modifier {
    Private,
    Protected,
    Public,
    Static,
    /// `const` or `final`
    ReadOnly,
}

impl TryFrom<&str> for Modifier {
    type Error = DeclarationFault;

    fn try_from(token: &str) -> Result<Self, Self::Error> {
        match token {
            "private" => Ok(Modifier::Private),
            "protected" => Ok(Modifier::Protected),
            "public" => Ok(Modifier::Public),
            "static" => Ok(Modifier::Static),
            "const" | "final" => Ok(Modifier::ReadOnly),
            other => Err(DeclarationFault::UnknownModifier(other.to_string())),
        }
    }
}

/// Result of splitting an annotated name such as `"protected static bar"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AnnotatedName<'a> {
    pub name: &'a str,
    /// `None` when no visibility modifier was written.
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub mutable: bool,
}

impl AnnotatedName<'_> {
    pub fn visibility_or(&self, default: Visibility) -> Visibility {
        self.visibility.unwrap_or(default)
    }

    pub fn scope(&self) -> FieldScope {
        if self.is_static {
            FieldScope::Static
        } else {
            FieldScope::Instance
        }
    }
}

/// The last whitespace-separated token is the bare name, every token before it
/// must be a recognized modifier.
pub fn parse_annotated_name(
    raw: &str,
    conflict: ModifierConflict,
) -> Result<AnnotatedName<'_>, VeilError> {
    let malformed = |fault| VeilError::MalformedDeclaration {
        declaration: raw.to_string(),
        fault,
    };

    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some(name) = tokens.pop() else {
        return Err(malformed(DeclarationFault::MissingName));
    };

    let mut parsed = AnnotatedName {
        name,
        visibility: None,
        is_static: false,
        mutable: true,
    };
    for token in tokens {
        let modifier = Modifier::try_from(token).map_err(malformed)?;
        let visibility = match modifier {
            Modifier::Private => Visibility::Private,
            Modifier::Protected => Visibility::Protected,
            Modifier::Public => Visibility::Public,
            Modifier::Static => {
                parsed.is_static = true;
                continue;
            }
            Modifier::ReadOnly => {
                parsed.mutable = false;
                continue;
            }
        };
        if let Some(previous) = parsed.visibility
            && previous != visibility
            && conflict == ModifierConflict::Reject
        {
            return Err(malformed(DeclarationFault::ConflictingVisibility));
        }
        parsed.visibility = Some(visibility);
    }
    Ok(parsed)
}

/// Value side of one entry of a definition record.
#[derive(Clone)]
pub enum Member {
    Value(Value),
    Method(NativeFn),
    Accessor {
        get: Option<NativeFn>,
        set: Option<NativeFn>,
    },
}

impl Member {
    pub fn is_method(&self) -> bool {
        !matches!(self, Member::Value(_))
    }
}

impl Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Accessor { get, set } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

/// Annotated name → member, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Members(Vec<(String, Member)>);

impl Members {
    fn push(&mut self, annotated: impl Into<String>, member: Member) {
        self.0.push((annotated.into(), member));
    }

    fn push_accessor(&mut self, annotated: String, get: Option<NativeFn>, set: Option<NativeFn>) {
        // a getter and a setter written under the same annotated name form one accessor
        if let Some((_, Member::Accessor { get: g, set: s })) =
            self.0.iter_mut().rev().find(|(name, _)| *name == annotated)
        {
            if get.is_some() {
                *g = get;
            }
            if set.is_some() {
                *s = set;
            }
            return;
        }
        self.0.push((annotated, Member::Accessor { get, set }));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Produces a descriptor for every entry.
    pub(crate) fn parse(
        self,
        interner: &ThreadedRodeo,
        conflict: ModifierConflict,
    ) -> Result<Vec<(FieldDescriptor, Member)>, VeilError> {
        self.0
            .into_iter()
            .map(|(annotated, member)| {
                let parsed = parse_annotated_name(&annotated, conflict)?;
                let descriptor = FieldDescriptor {
                    name: interner.get_or_intern(parsed.name),
                    visibility: parsed.visibility_or(Visibility::Public),
                    scope: parsed.scope(),
                    mutable: parsed.mutable,
                    is_method: member.is_method(),
                };
                Ok((descriptor, member))
            })
            .collect()
    }
}

macro_rules! member_builders {
    () => {
        pub fn field(mut self, annotated: impl Into<String>, value: impl Into<Value>) -> Self {
            self.members.push(annotated, Member::Value(value.into()));
            self
        }

        pub fn method<F>(mut self, annotated: impl Into<String>, body: F) -> Self
        where
            F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
        {
            self.members.push(annotated, Member::Method(native(body)));
            self
        }

        pub fn getter<F>(mut self, annotated: impl Into<String>, body: F) -> Self
        where
            F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
        {
            self.members
                .push_accessor(annotated.into(), Some(native(body)), None);
            self
        }

        pub fn setter<F>(mut self, annotated: impl Into<String>, body: F) -> Self
        where
            F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
        {
            self.members
                .push_accessor(annotated.into(), None, Some(native(body)));
            self
        }

        pub fn member(mut self, annotated: impl Into<String>, member: Member) -> Self {
            self.members.push(annotated, member);
            self
        }
    };
}

/// Class-like definition: a constructor plus instance and static members.
#[derive(Clone)]
pub struct ClassDefinition {
    pub(crate) name: String,
    pub(crate) extends: Option<ProtectedType>,
    pub(crate) constructor: Option<NativeFn>,
    pub(crate) members: Members,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            constructor: None,
            members: Members::default(),
        }
    }

    pub fn extends(mut self, parent: ProtectedType) -> Self {
        self.extends = Some(parent);
        self
    }

    /// Without a constructor a derived type runs its parent's with the same arguments.
    pub fn constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Engine, Value, &[Value]) -> Result<Value, VeilError> + 'static,
    {
        self.constructor = Some(native(body));
        self
    }

    member_builders!();
}

impl Debug for ClassDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("extends", &self.extends)
            .field("constructor", &self.constructor.is_some())
            .field("members", &self.members)
            .finish()
    }
}

/// Object-literal definition, optionally delegating to another protected object.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub(crate) name: String,
    pub(crate) prototype: Option<Value>,
    pub(crate) members: Members,
}

impl ObjectDefinition {
    pub fn new() -> Self {
        Self {
            name: "Object".to_string(),
            prototype: None,
            members: Members::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Must be a protected object, checked when the definition is processed.
    pub fn prototype(mut self, prototype: impl Into<Value>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }

    member_builders!();
}

impl Default for ObjectDefinition {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum Definition {
    Class(ClassDefinition),
    Object(ObjectDefinition),
}

impl From<ClassDefinition> for Definition {
    fn from(value: ClassDefinition) -> Self {
        Definition::Class(value)
    }
}

impl From<ObjectDefinition> for Definition {
    fn from(value: ObjectDefinition) -> Self {
        Definition::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_is_public_instance_and_mutable() {
        let parsed = parse_annotated_name("field3", ModifierConflict::LastWins).unwrap();
        assert_eq!(parsed.name, "field3");
        assert_eq!(parsed.visibility, None);
        assert_eq!(parsed.visibility_or(Visibility::Public), Visibility::Public);
        assert_eq!(parsed.scope(), FieldScope::Instance);
        assert!(parsed.mutable);
    }

    #[test]
    fn last_visibility_wins_by_default() {
        let parsed = parse_annotated_name("private public foo", ModifierConflict::LastWins).unwrap();
        assert_eq!(parsed.visibility, Some(Visibility::Public));
    }

    #[test]
    fn conflicting_visibility_can_be_rejected() {
        let err = parse_annotated_name("private public foo", ModifierConflict::Reject).unwrap_err();
        assert_eq!(
            err,
            VeilError::MalformedDeclaration {
                declaration: "private public foo".to_string(),
                fault: DeclarationFault::ConflictingVisibility,
            }
        );
        // repeating the same modifier is not a conflict
        assert!(parse_annotated_name("private private foo", ModifierConflict::Reject).is_ok());
    }

    #[test]
    fn unknown_modifier_is_malformed() {
        let err = parse_annotated_name("privte foo", ModifierConflict::LastWins).unwrap_err();
        assert!(matches!(
            err,
            VeilError::MalformedDeclaration {
                fault: DeclarationFault::UnknownModifier(ref m),
                ..
            } if m == "privte"
        ));
    }

    #[test]
    fn getter_and_setter_share_one_accessor() {
        let mut members = Members::default();
        members.push_accessor("private x".to_string(), Some(native(|_, _, _| Ok(Value::Undefined))), None);
        members.push_accessor("private x".to_string(), None, Some(native(|_, _, _| Ok(Value::Undefined))));
        assert_eq!(members.len(), 1);
        assert!(matches!(
            &members.0[0].1,
            Member::Accessor { get: Some(_), set: Some(_) }
        ));
    }
}

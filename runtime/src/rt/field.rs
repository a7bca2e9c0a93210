use crate::keys::Symbol;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    /// Hidden, but its storage key is mirrored into descendant contexts.
    Protected,
    Private,
}

impl Visibility {
    pub fn is_hidden(self) -> bool {
        !matches!(self, Visibility::Public)
    }

    pub fn is_shared(self) -> bool {
        matches!(self, Visibility::Protected)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldScope {
    Instance,
    Static,
}

/// One declared member. Built once while a definition is processed, never changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Symbol,
    pub visibility: Visibility,
    pub scope: FieldScope,
    pub mutable: bool,
    pub is_method: bool,
}

impl FieldDescriptor {
    pub fn is_static(&self) -> bool {
        self.scope == FieldScope::Static
    }
}

use lasso::Spur;
use std::num::NonZeroU32;

/// Interned field/type name.
pub type Symbol = Spur;

macro_rules! arena_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(NonZeroU32);

            impl $name {
                // ids are 1-based: an arena hands out `len()` right after a push
                pub(crate) fn from_usize(value: usize) -> Self {
                    let raw = u32::try_from(value).expect("arena id overflow");
                    Self(NonZeroU32::new(raw).expect("arena ids start at 1"))
                }

                pub fn to_index(self) -> usize {
                    self.0.get() as usize - 1
                }

                pub fn into_inner(self) -> NonZeroU32 {
                    self.0
                }
            }
        )*
    };
}

arena_id!(
    /// Object living in the [`Heap`](crate::heap::Heap).
    ObjectRef,
    /// Declaration Context in the [`ContextArea`](crate::heap::context_area::ContextArea).
    ContextId,
    /// Wrapped type record.
    ClassId,
    /// Private Store in the [`StoreArea`](crate::heap::private_store::StoreArea).
    StoreId,
    /// Opaque storage key of one hidden field. Never derived from the field name.
    SlotKey,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based() {
        let id = ContextId::from_usize(1);
        assert_eq!(id.to_index(), 0);
        assert_eq!(id.into_inner().get(), 1);
        assert_eq!(StoreId::from_usize(7).to_index(), 6);
    }
}

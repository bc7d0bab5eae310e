use bytemuck::{Pod, Zeroable};
use prism_common::ComponentKind;
use std::marker::PhantomData;

/// Identity and bookkeeping shared by every component record.
///
/// Only the registry creates metas, so a record's name and id always match
/// its slot in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
    name: String,
    id: u32,
    initialized: bool,
    dirty: bool,
}

impl ComponentMeta {
    /// A live record freshly placed in slot `id`. New records start dirty.
    pub(crate) fn live(name: &str, id: u32) -> Self {
        Self {
            name: name.to_owned(),
            id,
            initialized: true,
            dirty: true,
        }
    }

    /// A null placeholder for an empty slot.
    pub(crate) fn null(id: u32) -> Self {
        Self {
            name: String::new(),
            id,
            initialized: false,
            dirty: false,
        }
    }

    /// A placeholder for a slot whose record was just removed. Dirty so the
    /// next pass resets the slot's render struct.
    pub(crate) fn retired(id: u32) -> Self {
        Self {
            dirty: true,
            ..Self::null(id)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_clean(&self) -> bool {
        !self.dirty
    }

    /// Tag the record as modified since the last synchronization pass.
    ///
    /// Record mutators call this unconditionally, even when the new value
    /// equals the old one.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// A kind of scene component stored in a [`Registry`](crate::Registry).
///
/// Each kind pairs a rich record (`Self`) with a plain, fixed-layout render
/// struct (`Self::Struct`) that the renderer consumes as raw bytes.
pub trait Component: Send + 'static {
    const KIND: ComponentKind;

    /// GPU-transferable projection of the record.
    type Struct: Pod + Send + Sync;

    /// Build a record with default kind-specific fields around `meta`.
    fn with_meta(meta: ComponentMeta) -> Self;

    fn meta(&self) -> &ComponentMeta;

    fn meta_mut(&mut self) -> &mut ComponentMeta;

    /// Recompute the render struct from the whole record.
    fn to_struct(&self) -> Self::Struct;

    /// Struct written to slots without a live record.
    fn null_struct() -> Self::Struct {
        Self::Struct::zeroed()
    }

    /// Structured snapshot of the record's fields, used by `describe`.
    fn to_json(&self) -> serde_json::Value;

    fn name(&self) -> &str {
        self.meta().name()
    }

    fn id(&self) -> u32 {
        self.meta().id()
    }

    fn is_initialized(&self) -> bool {
        self.meta().is_initialized()
    }

    fn is_dirty(&self) -> bool {
        self.meta().is_dirty()
    }
}

/// Typed reference to a registry slot.
///
/// The index is the component's stable id. A handle outlives the record it
/// names; operations on a handle whose slot was retired fail with
/// `InvalidState`.
pub struct Handle<T> {
    index: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Wrap a raw slot index. The registry validates it on use.
    pub fn from_index(index: u32) -> Self {
        Self {
            index,
            _kind: PhantomData,
        }
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_meta_starts_dirty() {
        let meta = ComponentMeta::live("sun", 3);
        assert!(meta.is_initialized());
        assert!(meta.is_dirty());
        assert_eq!(meta.name(), "sun");
        assert_eq!(meta.id(), 3);
    }

    #[test]
    fn retired_meta_is_null_but_dirty() {
        let meta = ComponentMeta::retired(1);
        assert!(!meta.is_initialized());
        assert!(meta.is_dirty());
        assert!(meta.name().is_empty());
    }

    #[test]
    fn handles_compare_by_index() {
        let a: Handle<u8> = Handle::from_index(4);
        let b: Handle<u8> = Handle::from_index(4);
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "Handle(4)");
    }
}

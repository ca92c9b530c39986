/*!
 The table of entities a stream can refer back to.

 Every new class descriptor, class, string, object, array, and enum constant is appended to the table
 the first time it is seen; afterwards the stream only refers to it by its handle. Handles count up
 from [`BASE_WIRE_HANDLE`] so they are easy to tell apart from small integers in a hex dump.
*/

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    error::stream::JavaStreamError,
    stream::{
        models::{Archived, EntityKind},
        tags::BASE_WIRE_HANDLE,
    },
};

/// An identifier for an entry in the [`HandleTable`], as written to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u32);

impl Handle {
    /// The position of this handle in the table, if it is not below the base handle
    fn index(self) -> Option<usize> {
        self.0
            .checked_sub(BASE_WIRE_HANDLE)
            .and_then(|idx| usize::try_from(idx).ok())
    }
}

impl Display for Handle {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{:#x}", self.0)
    }
}

/// Registry of the entities seen since the start of the stream or the last reset
#[derive(Debug, Clone, Default)]
pub struct HandleTable {
    entries: Vec<Archived>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle the next registered entity will receive
    pub fn next_handle(&self) -> Handle {
        // A stream would have to be gigabytes long to overflow this
        Handle(BASE_WIRE_HANDLE.saturating_add(self.entries.len() as u32))
    }

    /// Append an entity and return its handle
    pub fn register(&mut self, entry: Archived) -> Handle {
        let handle = self.next_handle();
        self.entries.push(entry);
        handle
    }

    /// Take a handle for an entity whose body has not been read yet
    pub fn reserve(&mut self, kind: EntityKind) -> Handle {
        self.register(Archived::Placeholder(kind))
    }

    /// Replace the entry at a reserved handle with the finished entity
    pub fn fill(&mut self, handle: Handle, entry: Archived) -> Result<(), JavaStreamError> {
        let len = self.entries.len();
        let slot = handle
            .index()
            .and_then(|idx| self.entries.get_mut(idx))
            .ok_or(JavaStreamError::UnknownHandle(handle, len))?;
        *slot = entry;
        Ok(())
    }

    /// Look up an already-assigned handle
    pub fn resolve(&self, handle: Handle) -> Result<&Archived, JavaStreamError> {
        handle
            .index()
            .and_then(|idx| self.entries.get(idx))
            .ok_or(JavaStreamError::UnknownHandle(handle, self.entries.len()))
    }

    /// Forget every entry; the next entity registered receives the base handle again
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry along with its handle, in the order they were assigned
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Archived)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (Handle(BASE_WIRE_HANDLE + idx as u32), entry))
    }
}

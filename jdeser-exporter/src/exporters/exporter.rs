use std::{
    borrow::Cow,
    collections::HashSet,
    io::{BufWriter, Write},
    path::Path,
    rc::Rc,
};

use jdeser::{
    error::warning::DecodeWarning,
    stream::{
        handles::{Handle, HandleTable},
        models::{Archived, ArrayRecord, ClassDesc, Content, ObjectRecord, Value},
    },
};

use crate::app::{error::RuntimeError, runtime::Config};

/// Where exported data is written
pub type Output = BufWriter<Box<dyn Write>>;

/// Defines behavior for iterating over input sources and managing the export destination
pub trait Exporter<'a> {
    /// Create a new exporter that writes to the configured destination
    fn new(config: &'a Config) -> Result<Self, RuntimeError>
    where
        Self: Sized;
    /// Decode and render every source, returning how many could not be fully decoded
    fn iter_sources(&mut self) -> Result<usize, RuntimeError>;
    /// Get the handle to write to
    fn get_or_create_file(&mut self) -> &mut Output;
}

/// Defines behavior for formatting decoded contents to the desired output format
pub(super) trait Writer<T> {
    /// Format any top-level or nested content
    fn format_content(
        &self,
        content: &Content,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<T, RuntimeError>;
    /// Format a back-reference without expanding it
    fn format_reference(&self, handle: Handle, target: Option<&str>) -> T;
    /// Format a class descriptor and its superclass chain
    fn format_class(
        &self,
        class: &ClassDesc,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<T, RuntimeError>;
    /// Format an object, one group per class in its hierarchy
    fn format_object(
        &self,
        object: &ObjectRecord,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<T, RuntimeError>;
    /// Format an array and its elements
    fn format_array(
        &self,
        array: &ArrayRecord,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<T, RuntimeError>;
    /// Format a field value or array element
    fn format_value(
        &self,
        value: &Value,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<T, RuntimeError>;
    /// Format a non-fatal problem found in a source
    fn format_warning(&self, source: &Path, warning: &DecodeWarning) -> T;
    /// Format the reason a source stopped decoding early
    fn format_failure(&self, source: &Path, failure: &RuntimeError, position: usize) -> T;
    fn write_to_file(file: &mut Output, text: T) -> Result<(), RuntimeError>;
}

/// State shared while rendering a single top-level content
///
/// An object or array reachable along more than one path is expanded once;
/// later occurrences render as a back-reference to it.
pub(super) struct RenderContext<'h> {
    /// The handle table as it stood when the content finished decoding
    pub handles: &'h HandleTable,
    expanded: HashSet<*const ()>,
}

impl<'h> RenderContext<'h> {
    pub fn new(handles: &'h HandleTable) -> Self {
        Self {
            handles,
            expanded: HashSet::new(),
        }
    }

    /// `true` the first time `entity` is seen in this content
    pub fn first_visit<E>(&mut self, entity: &Rc<E>) -> bool {
        self.expanded.insert(Rc::as_ptr(entity).cast())
    }
}

/// Describe what a back-reference points at, if the handle table still knows it
pub(super) fn reference_target(handle: Handle, handles: &HandleTable) -> Option<Cow<'_, str>> {
    match handles.resolve(handle).ok()? {
        Archived::Object(object) => Some(object.class.display_name()),
        Archived::Array(array) => Some(Cow::Borrowed(&array.class.name)),
        Archived::Enum(constant) => Some(Cow::Borrowed(&constant.class.name)),
        Archived::ClassDesc(class) | Archived::Class(class) => Some(class.display_name()),
        other => Some(Cow::Borrowed(other.kind_name())),
    }
}

/// Render a UTF-16 code unit, escaping halves of surrogate pairs
pub(super) fn char_text(unit: u16) -> String {
    char::from_u32(unit.into())
        .map(|character| character.to_string())
        .unwrap_or_else(|| format!("\\u{unit:04x}"))
}

/*!
 Contains logic to decode Java object serialization streams, as written by `java.io.ObjectOutputStream`.

 Grammar referenced from the [Object Serialization Stream Protocol](https://docs.oracle.com/en/java/javase/21/docs/specs/serialization/protocol.html).

 Decoding never loads or runs any class code: every class is reconstructed from its descriptor in the
 stream, and data written by custom `writeObject` methods is kept as opaque annotations.
*/

use std::rc::Rc;

use log::{debug, trace, warn};

use crate::{
    error::{stream::JavaStreamError, warning::DecodeWarning},
    stream::{
        handles::{Handle, HandleTable},
        models::{Archived, ArrayRecord, Content, EntityKind, EnumConstant, ObjectRecord, TypeCode},
        reader::ByteReader,
        tags::{Tag, STREAM_MAGIC, STREAM_VERSION},
    },
};

/// Default limit on how deeply contents and superclass descriptors may nest inside each other
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings for a decode session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// How deeply contents and superclass descriptors may nest before decoding fails
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Where a decode session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// The header has not been read yet
    Header,
    /// The header was valid; top-level contents are being read
    Decoding,
    /// Every byte has been consumed
    Done,
    /// A fatal error occurred; the handle table can no longer be trusted
    Error,
}

/// Contains logic and data used to decode a serialization stream
#[derive(Debug)]
pub struct JavaStreamReader<'a> {
    /// The stream we want to decode
    pub(super) reader: ByteReader<'a>,
    /// As we decode the stream, build a table of seen entities to resolve back-references against
    pub(super) handles: HandleTable,
    options: DecoderOptions,
    state: StreamState,
    /// How many contents we are currently nested inside of
    depth: usize,
    /// Every top-level content fully decoded so far
    contents: Vec<Content>,
    warnings: Vec<DecodeWarning>,
}

impl<'a> From<&'a [u8]> for JavaStreamReader<'a> {
    fn from(stream: &'a [u8]) -> Self {
        Self::new(stream)
    }
}

impl<'a> From<&'a Vec<u8>> for JavaStreamReader<'a> {
    fn from(stream: &'a Vec<u8>) -> Self {
        Self::new(stream)
    }
}

impl<'a> JavaStreamReader<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::with_options(stream, DecoderOptions::default())
    }

    pub fn with_options(stream: &'a [u8], options: DecoderOptions) -> Self {
        Self {
            reader: ByteReader::new(stream),
            handles: HandleTable::new(),
            options,
            state: StreamState::Header,
            depth: 0,
            contents: vec![],
            warnings: vec![],
        }
    }

    /// Read-only access to the entities registered so far
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Top-level contents decoded so far; these stay valid even if a later content fails
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    /// Non-fatal problems found so far
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The offset of the next byte to be read
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    pub(super) fn record_warning(&mut self, warning: DecodeWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Check the magic number and protocol version at the start of the stream
    ///
    /// Reading stops at the first mismatch, so nothing past the bad bytes is consumed.
    pub fn validate_header(&mut self) -> Result<(), JavaStreamError> {
        match self.state {
            StreamState::Header => {}
            StreamState::Error => return Err(JavaStreamError::SessionAborted),
            StreamState::Decoding | StreamState::Done => return Ok(()),
        }

        let result = self.read_header();
        self.state = match result {
            Ok(()) => StreamState::Decoding,
            Err(_) => StreamState::Error,
        };
        result
    }

    fn read_header(&mut self) -> Result<(), JavaStreamError> {
        let magic = self.reader.read_u16()?;
        if magic != STREAM_MAGIC {
            return Err(JavaStreamError::HeaderError(magic, None));
        }
        let version = self.reader.read_u16()?;
        if version != STREAM_VERSION {
            return Err(JavaStreamError::HeaderError(magic, Some(version)));
        }
        Ok(())
    }

    /// Decode the next top-level content, or `None` once the stream is exhausted
    ///
    /// Any error is fatal to the whole session: handle numbering is cumulative, so after a partial
    /// record the table no longer matches what the writer had. Every later call fails with
    /// [`JavaStreamError::SessionAborted`].
    pub fn next_content(&mut self) -> Result<Option<Content>, JavaStreamError> {
        self.validate_header()?;

        loop {
            match self.state {
                StreamState::Error => return Err(JavaStreamError::SessionAborted),
                StreamState::Done => return Ok(None),
                StreamState::Header | StreamState::Decoding => {}
            }

            if self.reader.is_exhausted() {
                self.state = StreamState::Done;
                return Ok(None);
            }

            // Resets are only legal between top-level contents
            if self.reader.peek_byte()? == Tag::Reset.as_byte() {
                self.reader.read_byte()?;
                debug!(
                    "Reset at {:#x}, dropping {} handles",
                    self.reader.position() - 1,
                    self.handles.len()
                );
                self.handles.clear();
                continue;
            }

            return match self.read_value_content() {
                Ok(content) => {
                    self.contents.push(content.clone());
                    Ok(Some(content))
                }
                Err(why) => {
                    self.state = StreamState::Error;
                    self.depth = 0;
                    Err(why)
                }
            };
        }
    }

    /// Decode every remaining top-level content
    ///
    /// On success, returns every content decoded during the session, including ones
    /// already returned by [`JavaStreamReader::next_content`].
    pub fn parse(&mut self) -> Result<&[Content], JavaStreamError> {
        while self.next_content()?.is_some() {}
        Ok(&self.contents)
    }

    /// Decode any content, including the end marker of an annotation
    pub(super) fn read_content(&mut self) -> Result<Content, JavaStreamError> {
        self.nested(Self::dispatch)
    }

    /// Run `read` one nesting level deeper, failing once that would pass the configured limit
    pub(super) fn nested<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, JavaStreamError>,
    ) -> Result<T, JavaStreamError> {
        if self.depth >= self.options.max_depth {
            return Err(JavaStreamError::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    /// Decode a content that is used as a value, where the end marker is not allowed
    pub(super) fn read_value_content(&mut self) -> Result<Content, JavaStreamError> {
        let offset = self.reader.position();
        match self.read_content()? {
            Content::EndBlockData => Err(JavaStreamError::UnexpectedTag(
                Tag::EndBlockData.as_byte(),
                offset,
            )),
            content => Ok(content),
        }
    }

    /// Read contents up to and including the end marker
    pub(super) fn read_annotation(&mut self) -> Result<Vec<Content>, JavaStreamError> {
        let mut out_v = vec![];
        loop {
            match self.read_content()? {
                Content::EndBlockData => return Ok(out_v),
                content => out_v.push(content),
            }
        }
    }

    fn dispatch(&mut self) -> Result<Content, JavaStreamError> {
        let offset = self.reader.position();
        let byte = self.reader.peek_byte()?;
        let tag = Tag::from_byte(byte).ok_or(JavaStreamError::UnexpectedTag(byte, offset))?;
        trace!("{tag:?} at {offset:#x}");

        match tag {
            Tag::Null => {
                self.reader.read_byte()?;
                Ok(Content::Null)
            }
            Tag::Reference => self.read_reference(),
            Tag::Class => self.read_class(),
            Tag::ClassDesc | Tag::ProxyClassDesc => Ok(Content::ClassDesc(self.read_class_desc()?)),
            Tag::String | Tag::LongString => Ok(Content::String(self.read_new_string()?)),
            Tag::Enum => self.read_enum(),
            Tag::Object => self.read_object(),
            Tag::Exception => self.read_exception(),
            Tag::Array => self.read_array(),
            Tag::BlockData | Tag::BlockDataLong => self.read_block_data(),
            Tag::EndBlockData => {
                self.reader.read_byte()?;
                Ok(Content::EndBlockData)
            }
            Tag::Reset => Err(JavaStreamError::UnexpectedTag(byte, offset)),
        }
    }

    /// Read a reference tag and the handle that follows it
    pub(super) fn read_handle(&mut self) -> Result<Handle, JavaStreamError> {
        self.reader.read_byte()?;
        Ok(Handle(self.reader.read_u32()?))
    }

    /// Resolve a back-reference in a content position
    fn read_reference(&mut self) -> Result<Content, JavaStreamError> {
        let handle = self.read_handle()?;
        let entry = self.handles.resolve(handle)?;
        trace!("Resolved {handle} to a {}", entry.kind_name());
        Ok(match entry {
            Archived::String(text) => Content::String(Rc::clone(text)),
            Archived::ClassDesc(desc) => Content::ClassDesc(Rc::clone(desc)),
            Archived::Class(desc) => Content::Class(Rc::clone(desc)),
            Archived::Enum(constant) => Content::Enum(Rc::clone(constant)),
            Archived::Object(object) => Content::Object(Rc::clone(object)),
            Archived::Array(array) => Content::Array(Rc::clone(array)),
            // Still being decoded, so sharing it here would form a cycle
            Archived::Placeholder(_) => Content::Reference(handle),
        })
    }

    /// Read a `TC_STRING` or `TC_LONGSTRING` and register it
    pub(super) fn read_new_string(&mut self) -> Result<Rc<str>, JavaStreamError> {
        let tag = self.reader.read_byte()?;
        let text = if tag == Tag::LongString.as_byte() {
            self.reader.read_long_utf()?
        } else {
            self.reader.read_utf()?
        };
        let text: Rc<str> = Rc::from(text);
        let handle = self.handles.register(Archived::String(Rc::clone(&text)));
        trace!("String {handle}: {text:?}");
        Ok(text)
    }

    /// An instance of `java.lang.Class`
    fn read_class(&mut self) -> Result<Content, JavaStreamError> {
        self.reader.read_byte()?;
        let desc = self.read_required_class_desc()?;
        let handle = self.handles.register(Archived::Class(Rc::clone(&desc)));
        debug!("Class {handle}: {}", desc.display_name());
        Ok(Content::Class(desc))
    }

    fn read_enum(&mut self) -> Result<Content, JavaStreamError> {
        self.reader.read_byte()?;
        let class = self.read_required_class_desc()?;
        // The constant takes its handle before its name is read
        let handle = self.handles.reserve(EntityKind::Enum);
        let offset = self.reader.position();
        let name = self
            .read_type_string()?
            .ok_or(JavaStreamError::UnexpectedTag(Tag::Null.as_byte(), offset))?;
        debug!("Enum {handle}: {}.{name}", class.display_name());

        let constant = Rc::new(EnumConstant {
            handle,
            class,
            name,
        });
        self.handles
            .fill(handle, Archived::Enum(Rc::clone(&constant)))?;
        Ok(Content::Enum(constant))
    }

    fn read_object(&mut self) -> Result<Content, JavaStreamError> {
        self.reader.read_byte()?;
        let class = self.read_required_class_desc()?;
        // Register before reading fields so the object can refer to itself
        let handle = self.handles.reserve(EntityKind::Object);
        debug!("Object {handle}: {}", class.display_name());

        let data = self.read_class_data(&class)?;
        let object = Rc::new(ObjectRecord {
            handle,
            class,
            data,
        });
        self.handles
            .fill(handle, Archived::Object(Rc::clone(&object)))?;
        Ok(Content::Object(object))
    }

    fn read_array(&mut self) -> Result<Content, JavaStreamError> {
        self.reader.read_byte()?;
        let class = self.read_required_class_desc()?;
        let component = TypeCode::from_array_class(&class.name)
            .ok_or_else(|| JavaStreamError::InvalidArrayClass(class.name.clone()))?;
        let handle = self.handles.reserve(EntityKind::Array);

        let offset = self.reader.position();
        let length = self.reader.read_i32()?;
        let length = usize::try_from(length)
            .map_err(|_| JavaStreamError::InvalidLength(length.into(), offset))?;
        debug!("Array {handle}: {} with {length} elements", class.name);

        // The length is untrusted, so do not reserve more than the stream could possibly hold
        let mut elements = Vec::with_capacity(length.min(self.reader.remaining()));
        for _ in 0..length {
            elements.push(self.read_value(&component)?);
        }

        let array = Rc::new(ArrayRecord {
            handle,
            class,
            component,
            elements,
        });
        self.handles
            .fill(handle, Archived::Array(Rc::clone(&array)))?;
        Ok(Content::Array(array))
    }

    fn read_block_data(&mut self) -> Result<Content, JavaStreamError> {
        let tag = self.reader.read_byte()?;
        let offset = self.reader.position();
        let length = if tag == Tag::BlockDataLong.as_byte() {
            let length = self.reader.read_i32()?;
            usize::try_from(length)
                .map_err(|_| JavaStreamError::InvalidLength(length.into(), offset))?
        } else {
            self.reader.read_byte()? as usize
        };
        Ok(Content::BlockData(
            self.reader.read_exact_bytes(length)?.to_vec(),
        ))
    }

    /// The writer hit an exception mid-stream and serialized the throwable in place
    fn read_exception(&mut self) -> Result<Content, JavaStreamError> {
        let offset = self.reader.position();
        self.reader.read_byte()?;
        // The writer resets its handle table on both sides of the throwable
        self.handles.clear();
        let thrown = self.read_value_content()?;
        self.handles.clear();
        self.record_warning(DecodeWarning::UnsupportedConstruct(
            "exception wrapper",
            offset,
        ));
        Ok(Content::Exception(Box::new(thrown)))
    }
}

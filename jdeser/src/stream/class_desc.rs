/*!
 Reads class descriptors and their superclass chains.
*/

use std::rc::Rc;

use log::debug;

use crate::{
    error::{stream::JavaStreamError, warning::DecodeWarning},
    stream::{
        models::{Archived, ClassDesc, ClassFlags, ClassKind, EntityKind, FieldDesc, TypeCode},
        parser::JavaStreamReader,
        tags::{Tag, SC_SERIALIZABLE},
    },
};

impl JavaStreamReader<'_> {
    /// Read a class descriptor where `TC_NULL` means there is no class, i.e. the end of a superclass chain
    pub(super) fn read_class_desc_position(
        &mut self,
    ) -> Result<Option<Rc<ClassDesc>>, JavaStreamError> {
        let offset = self.reader.position();
        let byte = self.reader.peek_byte()?;
        match Tag::from_byte(byte) {
            Some(Tag::Null) => {
                self.reader.read_byte()?;
                Ok(None)
            }
            Some(Tag::ClassDesc | Tag::ProxyClassDesc) => self.read_class_desc().map(Some),
            Some(Tag::Reference) => {
                let handle = self.read_handle()?;
                match self.handles.resolve(handle)? {
                    Archived::ClassDesc(desc) => Ok(Some(Rc::clone(desc))),
                    // A placeholder here means a descriptor would be its own ancestor
                    _ => Err(JavaStreamError::InvalidReference(handle, "class descriptor")),
                }
            }
            _ => Err(JavaStreamError::UnexpectedTag(byte, offset)),
        }
    }

    /// Read a class descriptor where a class is mandatory
    pub(super) fn read_required_class_desc(&mut self) -> Result<Rc<ClassDesc>, JavaStreamError> {
        let offset = self.reader.position();
        self.read_class_desc_position()?
            .ok_or(JavaStreamError::UnexpectedTag(Tag::Null.as_byte(), offset))
    }

    /// Read a `TC_CLASSDESC` or `TC_PROXYCLASSDESC`, its annotation, and its superclass chain
    ///
    /// Each superclass counts as one level of nesting.
    pub(super) fn read_class_desc(&mut self) -> Result<Rc<ClassDesc>, JavaStreamError> {
        self.nested(Self::read_new_class_desc)
    }

    fn read_new_class_desc(&mut self) -> Result<Rc<ClassDesc>, JavaStreamError> {
        let offset = self.reader.position();
        if self.reader.read_byte()? == Tag::ProxyClassDesc.as_byte() {
            return self.read_proxy_class_desc(offset);
        }

        let name = self.reader.read_utf()?;
        let version = self.reader.read_u64()?;
        let flags = ClassFlags(self.reader.read_byte()?);
        let field_count = self.reader.read_u16()?;

        // The descriptor takes its handle before any of the field type names
        let handle = self.handles.reserve(EntityKind::ClassDesc);
        debug!("Class descriptor {handle}: {name} version {version:#x}, {field_count} fields");

        if flags.is_serializable() && flags.is_externalizable() {
            self.record_warning(DecodeWarning::FlagConflict(name.clone()));
        }

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(self.read_field_desc()?);
        }

        let annotations = self.read_annotation()?;
        let super_class = self.read_class_desc_position()?;

        let desc = Rc::new(ClassDesc {
            handle,
            name,
            version,
            flags,
            fields,
            annotations,
            super_class,
            kind: ClassKind::Regular,
        });
        self.handles
            .fill(handle, Archived::ClassDesc(Rc::clone(&desc)))?;
        Ok(desc)
    }

    /// Dynamic proxies are only described by their interfaces; the `InvocationHandler` lives
    /// in the fields of the `java.lang.reflect.Proxy` superclass
    fn read_proxy_class_desc(&mut self, offset: usize) -> Result<Rc<ClassDesc>, JavaStreamError> {
        let handle = self.handles.reserve(EntityKind::ClassDesc);

        let count_offset = self.reader.position();
        let count = self.reader.read_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| JavaStreamError::InvalidLength(count.into(), count_offset))?;
        let mut interfaces = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            interfaces.push(self.reader.read_utf()?);
        }
        debug!("Proxy class descriptor {handle}: {interfaces:?}");
        self.record_warning(DecodeWarning::UnsupportedConstruct(
            "proxy class descriptor",
            offset,
        ));

        let annotations = self.read_annotation()?;
        let super_class = self.read_class_desc_position()?;

        let desc = Rc::new(ClassDesc {
            handle,
            name: String::new(),
            version: 0,
            flags: ClassFlags(SC_SERIALIZABLE),
            fields: vec![],
            annotations,
            super_class,
            kind: ClassKind::Proxy(interfaces),
        });
        self.handles
            .fill(handle, Archived::ClassDesc(Rc::clone(&desc)))?;
        Ok(desc)
    }

    /// Read a field's type code, name, and type name if it is a reference
    fn read_field_desc(&mut self) -> Result<FieldDesc, JavaStreamError> {
        let offset = self.reader.position();
        let code = self.reader.read_byte()?;
        let name = self.reader.read_utf()?;

        let type_code = match code {
            b'L' | b'[' => {
                let type_name = self.read_type_string()?.unwrap_or_else(|| Rc::from(""));
                if code == b'L' {
                    TypeCode::Object(type_name)
                } else {
                    TypeCode::Array(type_name)
                }
            }
            other => {
                TypeCode::primitive(other).ok_or(JavaStreamError::InvalidTypeCode(other, offset))?
            }
        };

        Ok(FieldDesc { name, type_code })
    }

    /// Read a string that may be new, a back-reference to an earlier string, or null
    pub(super) fn read_type_string(&mut self) -> Result<Option<Rc<str>>, JavaStreamError> {
        let offset = self.reader.position();
        let byte = self.reader.peek_byte()?;
        match Tag::from_byte(byte) {
            Some(Tag::Null) => {
                self.reader.read_byte()?;
                Ok(None)
            }
            Some(Tag::String | Tag::LongString) => self.read_new_string().map(Some),
            Some(Tag::Reference) => {
                let handle = self.read_handle()?;
                match self.handles.resolve(handle)? {
                    Archived::String(text) => Ok(Some(Rc::clone(text))),
                    _ => Err(JavaStreamError::InvalidReference(handle, "string")),
                }
            }
            _ => Err(JavaStreamError::UnexpectedTag(byte, offset)),
        }
    }
}

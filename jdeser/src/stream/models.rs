/*!
 Data structures produced by decoding a serialization stream.

 Everything here is created during a single decode session. Entities that can be the target of a
 back-reference are shared through [`Rc`] so the [`HandleTable`](crate::stream::handles::HandleTable)
 and the decoded contents point at the same values.
*/

use std::{borrow::Cow, rc::Rc};

use crate::stream::{
    handles::Handle,
    tags::{SC_BLOCK_DATA, SC_ENUM, SC_EXTERNALIZABLE, SC_SERIALIZABLE, SC_WRITE_METHOD},
};

/// The type signature of a field or array component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCode {
    /// `B`, an [`i8`]
    Byte,
    /// `C`, a UTF-16 code unit
    Char,
    /// `D`, an [`f64`]
    Double,
    /// `F`, an [`f32`]
    Float,
    /// `I`, an [`i32`]
    Int,
    /// `J`, an [`i64`]
    Long,
    /// `S`, an [`i16`]
    Short,
    /// `Z`, a [`bool`]
    Boolean,
    /// `L`, an object reference along with its type name, i.e. `Ljava/lang/String;`
    Object(Rc<str>),
    /// `[`, an array reference along with its type name, i.e. `[I`
    Array(Rc<str>),
}

impl TypeCode {
    /// Map a single-character primitive code to its type
    pub fn primitive(code: u8) -> Option<Self> {
        match code {
            b'B' => Some(Self::Byte),
            b'C' => Some(Self::Char),
            b'D' => Some(Self::Double),
            b'F' => Some(Self::Float),
            b'I' => Some(Self::Int),
            b'J' => Some(Self::Long),
            b'S' => Some(Self::Short),
            b'Z' => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Determine the component type of an array from the name of the array's class
    ///
    /// `[I` holds ints, `[Ljava.lang.String;` holds objects, and `[[I` holds arrays.
    pub fn from_array_class(name: &str) -> Option<Self> {
        let component = name.strip_prefix('[')?;
        match component.as_bytes().first().copied()? {
            b'L' => Some(Self::Object(Rc::from(component))),
            b'[' => Some(Self::Array(Rc::from(component))),
            code if component.len() == 1 => Self::primitive(code),
            _ => None,
        }
    }

    /// The single-character code written to the stream for this type
    pub fn code(&self) -> char {
        match self {
            TypeCode::Byte => 'B',
            TypeCode::Char => 'C',
            TypeCode::Double => 'D',
            TypeCode::Float => 'F',
            TypeCode::Int => 'I',
            TypeCode::Long => 'J',
            TypeCode::Short => 'S',
            TypeCode::Boolean => 'Z',
            TypeCode::Object(_) => 'L',
            TypeCode::Array(_) => '[',
        }
    }

    /// The full signature, including the type name for references
    pub fn signature(&self) -> Cow<'_, str> {
        match self {
            TypeCode::Object(name) | TypeCode::Array(name) if !name.is_empty() => {
                Cow::Borrowed(name.as_ref())
            }
            other => Cow::Owned(other.code().to_string()),
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, TypeCode::Object(_) | TypeCode::Array(_))
    }
}

/// The flag byte of a class descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassFlags(pub u8);

impl ClassFlags {
    pub fn has_write_method(&self) -> bool {
        self.0 & SC_WRITE_METHOD != 0
    }

    pub fn is_serializable(&self) -> bool {
        self.0 & SC_SERIALIZABLE != 0
    }

    pub fn is_externalizable(&self) -> bool {
        self.0 & SC_EXTERNALIZABLE != 0
    }

    pub fn has_block_data(&self) -> bool {
        self.0 & SC_BLOCK_DATA != 0
    }

    pub fn is_enum(&self) -> bool {
        self.0 & SC_ENUM != 0
    }

    /// Names of the flags that are set, in bit order
    pub fn names(&self) -> Vec<&'static str> {
        [
            (SC_WRITE_METHOD, "write_method"),
            (SC_SERIALIZABLE, "serializable"),
            (SC_EXTERNALIZABLE, "externalizable"),
            (SC_BLOCK_DATA, "block_data"),
            (SC_ENUM, "enum"),
        ]
        .into_iter()
        .filter(|(bit, _)| self.0 & bit != 0)
        .map(|(_, name)| name)
        .collect()
    }
}

/// A declared field of a class, in the order the class descriptor listed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub type_code: TypeCode,
}

/// Distinguishes ordinary class descriptors from dynamic proxy descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    Regular,
    /// A dynamic proxy class, which is only described by the interfaces it implements
    Proxy(Vec<String>),
}

/// Describes the serialized layout of a class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDesc {
    /// The handle this descriptor was registered under
    pub handle: Handle,
    /// The fully qualified name of the class; empty for proxy classes
    pub name: String,
    /// The `serialVersionUID` of the class
    pub version: u64,
    pub flags: ClassFlags,
    /// Serializable fields, in wire order
    pub fields: Vec<FieldDesc>,
    /// Contents written by `annotateClass`, usually empty
    pub annotations: Vec<Content>,
    /// The closest serializable ancestor, if any
    pub super_class: Option<Rc<ClassDesc>>,
    pub kind: ClassKind,
}

impl ClassDesc {
    /// The descriptor and all of its ancestors, starting from the most ancestral
    pub fn ancestry(&self) -> Vec<&ClassDesc> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = &current.super_class {
            chain.push(parent.as_ref());
            current = parent.as_ref();
        }
        chain.reverse();
        chain
    }

    /// A human readable name that also covers proxy classes
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.kind {
            ClassKind::Regular => Cow::Borrowed(&self.name),
            ClassKind::Proxy(interfaces) => Cow::Owned(format!("proxy({})", interfaces.join(", "))),
        }
    }
}

/// A decoded field value or array element
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    /// A UTF-16 code unit; it may be half of a surrogate pair
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    /// Any object or array typed value
    Content(Content),
}

/// A single field value tagged with the field that declared it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub type_code: TypeCode,
    pub value: Value,
}

/// The data written by a single class in an object's inheritance chain
#[derive(Debug, Clone, PartialEq)]
pub struct ClassData {
    /// The class that declared these fields
    pub class: Rc<ClassDesc>,
    /// Field values in the order the class descriptor listed the fields
    pub values: Vec<FieldValue>,
    /// Contents written by a custom `writeObject` or `writeExternal`, which we do not interpret
    pub annotations: Vec<Content>,
}

/// An instance of a class
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub handle: Handle,
    pub class: Rc<ClassDesc>,
    /// One group per class in the inheritance chain, most ancestral first
    pub data: Vec<ClassData>,
}

impl ObjectRecord {
    /// Every field value, most ancestral class first
    pub fn fields(&self) -> impl Iterator<Item = &FieldValue> {
        self.data.iter().flat_map(|group| group.values.iter())
    }

    /// Find a field value by name; fields declared by subclasses shadow those of their ancestors
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data
            .iter()
            .rev()
            .flat_map(|group| group.values.iter())
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

/// An array of primitives or references
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRecord {
    pub handle: Handle,
    pub class: Rc<ClassDesc>,
    /// The element type, derived from the array class name
    pub component: TypeCode,
    pub elements: Vec<Value>,
}

/// A constant of an enum type
#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub handle: Handle,
    pub class: Rc<ClassDesc>,
    pub name: Rc<str>,
}

/// A single production of the stream grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Null,
    /// A back-reference to an object or array that was still being decoded, i.e. a cycle
    Reference(Handle),
    ClassDesc(Rc<ClassDesc>),
    /// An instance of `java.lang.Class`
    Class(Rc<ClassDesc>),
    String(Rc<str>),
    Object(Rc<ObjectRecord>),
    Array(Rc<ArrayRecord>),
    Enum(Rc<EnumConstant>),
    /// Raw bytes written outside of any declared field
    BlockData(Vec<u8>),
    /// A throwable the writer emitted after it failed mid-stream
    Exception(Box<Content>),
    /// Terminates a class or object annotation; never a value on its own
    EndBlockData,
}

impl Content {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::String(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRecord> {
        match self {
            Content::Object(object) => Some(object.as_ref()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRecord> {
        match self {
            Content::Array(array) => Some(array.as_ref()),
            _ => None,
        }
    }
}

/// The kinds of entity that can be reserved in the handle table before they are fully read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    ClassDesc,
    Object,
    Array,
    Enum,
}

/// An entry in the [`HandleTable`](crate::stream::handles::HandleTable)
#[derive(Debug, Clone, PartialEq)]
pub enum Archived {
    ClassDesc(Rc<ClassDesc>),
    Class(Rc<ClassDesc>),
    String(Rc<str>),
    Object(Rc<ObjectRecord>),
    Array(Rc<ArrayRecord>),
    Enum(Rc<EnumConstant>),
    /// A reserved slot for an entity whose body is still being read.
    /// Objects and arrays take their handle before their fields or elements so that
    /// they can refer to themselves.
    Placeholder(EntityKind),
}

impl Archived {
    /// A short description of the entry
    pub fn kind_name(&self) -> &'static str {
        match self {
            Archived::ClassDesc(_) => "class descriptor",
            Archived::Class(_) => "class",
            Archived::String(_) => "string",
            Archived::Object(_) => "object",
            Archived::Array(_) => "array",
            Archived::Enum(_) => "enum constant",
            Archived::Placeholder(_) => "placeholder",
        }
    }
}

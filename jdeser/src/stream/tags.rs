/*!
 Constants and type tags that make up the serialization stream grammar.
*/

/// First two bytes of every stream
pub const STREAM_MAGIC: u16 = 0xACED;
/// The only stream protocol version in use
pub const STREAM_VERSION: u16 = 5;
/// The first handle assigned in a stream; counting starts here instead of at zero
pub const BASE_WIRE_HANDLE: u32 = 0x7E_0000;

/// The class has a custom `writeObject` method, so its data is followed by an annotation
pub const SC_WRITE_METHOD: u8 = 0x01;
/// The class implements `Serializable`
pub const SC_SERIALIZABLE: u8 = 0x02;
/// The class implements `Externalizable`
pub const SC_EXTERNALIZABLE: u8 = 0x04;
/// Externalizable data was written in block data mode
pub const SC_BLOCK_DATA: u8 = 0x08;
/// The class is an enum type
pub const SC_ENUM: u8 = 0x10;

/// One-byte discriminators for every production in the stream grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Null,
    Reference,
    ClassDesc,
    Object,
    String,
    Array,
    Class,
    BlockData,
    EndBlockData,
    Reset,
    BlockDataLong,
    Exception,
    LongString,
    ProxyClassDesc,
    Enum,
}

impl Tag {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x70 => Some(Self::Null),
            0x71 => Some(Self::Reference),
            0x72 => Some(Self::ClassDesc),
            0x73 => Some(Self::Object),
            0x74 => Some(Self::String),
            0x75 => Some(Self::Array),
            0x76 => Some(Self::Class),
            0x77 => Some(Self::BlockData),
            0x78 => Some(Self::EndBlockData),
            0x79 => Some(Self::Reset),
            0x7A => Some(Self::BlockDataLong),
            0x7B => Some(Self::Exception),
            0x7C => Some(Self::LongString),
            0x7D => Some(Self::ProxyClassDesc),
            0x7E => Some(Self::Enum),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Null => 0x70,
            Self::Reference => 0x71,
            Self::ClassDesc => 0x72,
            Self::Object => 0x73,
            Self::String => 0x74,
            Self::Array => 0x75,
            Self::Class => 0x76,
            Self::BlockData => 0x77,
            Self::EndBlockData => 0x78,
            Self::Reset => 0x79,
            Self::BlockDataLong => 0x7A,
            Self::Exception => 0x7B,
            Self::LongString => 0x7C,
            Self::ProxyClassDesc => 0x7D,
            Self::Enum => 0x7E,
        }
    }
}

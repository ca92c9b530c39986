#[cfg(test)]
mod parser_tests {
    use std::rc::Rc;

    use crate::{
        error::{stream::JavaStreamError, warning::DecodeWarning},
        stream::{
            handles::Handle,
            models::{Archived, ClassKind, Content, TypeCode, Value},
            parser::{DecoderOptions, JavaStreamReader, StreamState, DEFAULT_MAX_DEPTH},
            tags::BASE_WIRE_HANDLE,
        },
    };

    /// Assembles streams by hand, starting after a valid header
    struct StreamBuilder {
        bytes: Vec<u8>,
    }

    impl StreamBuilder {
        fn new() -> Self {
            Self {
                bytes: vec![0xAC, 0xED, 0x00, 0x05],
            }
        }

        fn raw(mut self, bytes: &[u8]) -> Self {
            self.bytes.extend_from_slice(bytes);
            self
        }

        fn byte(self, byte: u8) -> Self {
            self.raw(&[byte])
        }

        fn u16(self, value: u16) -> Self {
            self.raw(&value.to_be_bytes())
        }

        fn i32(self, value: i32) -> Self {
            self.raw(&value.to_be_bytes())
        }

        fn i64(self, value: i64) -> Self {
            self.raw(&value.to_be_bytes())
        }

        fn utf(self, text: &str) -> Self {
            self.u16(text.len() as u16).raw(text.as_bytes())
        }

        fn string(self, text: &str) -> Self {
            self.byte(0x74).utf(text)
        }

        fn null(self) -> Self {
            self.byte(0x70)
        }

        fn end(self) -> Self {
            self.byte(0x78)
        }

        /// A back-reference to the `offset`-th handle of the table
        fn reference(self, offset: u32) -> Self {
            self.byte(0x71).raw(&(BASE_WIRE_HANDLE + offset).to_be_bytes())
        }

        /// `TC_CLASSDESC`, name, version 1, flags, and field count; fields follow
        fn class_header(self, name: &str, flags: u8, field_count: u16) -> Self {
            self.byte(0x72)
                .utf(name)
                .i64(1)
                .byte(flags)
                .u16(field_count)
        }

        fn field(self, code: u8, name: &str) -> Self {
            self.byte(code).utf(name)
        }

        fn object_field(self, code: u8, name: &str, type_name: &str) -> Self {
            self.field(code, name).string(type_name)
        }

        fn object_field_ref(self, code: u8, name: &str, type_offset: u32) -> Self {
            self.field(code, name).reference(type_offset)
        }

        fn build(self) -> Vec<u8> {
            self.bytes
        }
    }

    fn handle(offset: u32) -> Handle {
        Handle(BASE_WIRE_HANDLE + offset)
    }

    #[test]
    fn test_handles_increase_in_order() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Pair", 0x02, 2)
            .object_field(b'L', "first", "Ljava/lang/String;")
            .object_field_ref(b'L', "second", 1)
            .end()
            .null()
            .string("x")
            .reference(3)
            .string("y")
            .reference(4)
            .reference(2)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let kinds: Vec<&str> = parser
            .handles()
            .iter()
            .map(|(_, entry)| entry.kind_name())
            .collect();
        assert_eq!(
            kinds,
            vec!["class descriptor", "string", "object", "string", "string"]
        );

        let assigned: Vec<Handle> = parser.handles().iter().map(|(handle, _)| handle).collect();
        assert_eq!(assigned, (0..5).map(handle).collect::<Vec<_>>());

        let object = result[0].as_object().unwrap();
        assert_eq!(object.handle, handle(2));
        assert_eq!(
            object.field("first"),
            Some(&Value::Content(Content::String(Rc::from("x"))))
        );
        assert_eq!(
            object.field("second"),
            Some(&Value::Content(Content::String(Rc::from("x"))))
        );
        assert_eq!(result[1], Content::String(Rc::from("y")));
        assert_eq!(result[2], Content::String(Rc::from("y")));
        assert_eq!(result[3], result[0]);
    }

    #[test]
    fn test_type_name_back_reference() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Pair", 0x02, 2)
            .object_field(b'L', "first", "Ljava/lang/String;")
            .object_field_ref(b'L', "second", 1)
            .end()
            .null()
            .null()
            .null()
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let class = &result[0].as_object().unwrap().class;
        let (TypeCode::Object(first), TypeCode::Object(second)) =
            (&class.fields[0].type_code, &class.fields[1].type_code)
        else {
            panic!("Expected object fields, got {:?}", class.fields);
        };
        assert_eq!(&**first, "Ljava/lang/String;");
        assert!(Rc::ptr_eq(first, second));
        assert_eq!(parser.handles().len(), 3);
    }

    #[test]
    fn test_ancestor_field_order() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Child", 0x02, 1)
            .field(b'I', "c")
            .end()
            .class_header("Parent", 0x02, 1)
            .field(b'I', "b")
            .end()
            .class_header("GrandParent", 0x02, 1)
            .field(b'I', "a")
            .end()
            .null()
            .i32(1)
            .i32(2)
            .i32(3)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let object = result[0].as_object().unwrap();
        assert_eq!(object.class.name, "Child");
        assert_eq!(object.handle, handle(3));

        let classes: Vec<&str> = object
            .data
            .iter()
            .map(|group| group.class.name.as_str())
            .collect();
        assert_eq!(classes, vec!["GrandParent", "Parent", "Child"]);

        let fields: Vec<(&str, &Value)> = object
            .fields()
            .map(|field| (field.name.as_str(), &field.value))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("a", &Value::Int(1)),
                ("b", &Value::Int(2)),
                ("c", &Value::Int(3))
            ]
        );

        let ancestry: Vec<&str> = object
            .class
            .ancestry()
            .iter()
            .map(|class| class.name.as_str())
            .collect();
        assert_eq!(ancestry, classes);
    }

    #[test]
    fn test_mutual_reference() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("A", 0x02, 1)
            .object_field(b'L', "other", "LB;")
            .end()
            .null()
            .byte(0x73)
            .class_header("B", 0x02, 1)
            .object_field(b'L', "back", "LA;")
            .end()
            .null()
            .reference(2)
            .reference(2)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let a = result[0].as_object().unwrap();
        // Once A is complete, references to it share the decoded object
        let (Content::Object(first), Content::Object(again)) = (&result[0], &result[1]) else {
            panic!("Expected objects, got {result:?}");
        };
        assert!(Rc::ptr_eq(first, again));

        assert_eq!(a.handle, handle(2));
        let Some(Value::Content(Content::Object(b))) = a.field("other") else {
            panic!("Expected an object, got {:?}", a.field("other"));
        };
        assert_eq!(b.class.name, "B");
        assert_eq!(b.handle, handle(5));
        assert_eq!(
            b.field("back"),
            Some(&Value::Content(Content::Reference(handle(2))))
        );
    }

    #[test]
    fn test_truncated_field_list() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Broken", 0x02, 2)
            .field(b'I', "a")
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.next_content();

        assert!(matches!(
            result,
            Err(JavaStreamError::TruncatedStream(_, len)) if len == bytes.len()
        ));
        assert_eq!(parser.state(), StreamState::Error);
        assert!(parser.contents().is_empty());
    }

    #[test]
    fn test_truncated_field_value() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Short", 0x02, 1)
            .field(b'J', "value")
            .end()
            .null()
            .i32(7)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::TruncatedStream(bytes.len() + 4, bytes.len()))
        );
    }

    #[test]
    fn test_bad_magic() {
        let bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x70];

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::HeaderError(0xCAFE, None))
        );
        // Nothing past the magic number was read
        assert_eq!(parser.position(), 2);
        assert_eq!(parser.state(), StreamState::Error);
        assert_eq!(parser.next_content(), Err(JavaStreamError::SessionAborted));
        assert_eq!(parser.position(), 2);
    }

    #[test]
    fn test_bad_version() {
        let bytes = vec![0xAC, 0xED, 0x00, 0x04, 0x70];

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.validate_header(),
            Err(JavaStreamError::HeaderError(0xACED, Some(4)))
        );
    }

    #[test]
    fn test_empty_body() {
        let bytes = StreamBuilder::new().build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert!(parser.parse().unwrap().is_empty());
        assert_eq!(parser.state(), StreamState::Done);
        assert_eq!(parser.next_content(), Ok(None));
    }

    #[test]
    fn test_int_array() {
        let bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("[I", 0x02, 0)
            .end()
            .null()
            .i32(3)
            .i32(1)
            .i32(2)
            .i32(3)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let array = result[0].as_array().unwrap();
        assert_eq!(array.handle, handle(1));
        assert_eq!(array.class.name, "[I");
        assert_eq!(array.component, TypeCode::Int);
        assert_eq!(
            array.elements,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_nested_object_array() {
        let bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("[Ljava.lang.Object;", 0x02, 0)
            .end()
            .null()
            .i32(2)
            .byte(0x75)
            .reference(0)
            .i32(1)
            .null()
            .reference(1)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let outer = result[0].as_array().unwrap();
        assert_eq!(
            outer.component,
            TypeCode::Object(Rc::from("Ljava.lang.Object;"))
        );
        let Value::Content(Content::Array(inner)) = &outer.elements[0] else {
            panic!("Expected an array, got {:?}", outer.elements[0]);
        };
        assert!(Rc::ptr_eq(&inner.class, &outer.class));
        assert_eq!(inner.elements, vec![Value::Content(Content::Null)]);
        // An array can hold itself
        assert_eq!(
            outer.elements[1],
            Value::Content(Content::Reference(handle(1)))
        );
    }

    #[test]
    fn test_depth_limit() {
        let bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("[Ljava.lang.Object;", 0x02, 0)
            .end()
            .null()
            .i32(1)
            .byte(0x75)
            .reference(0)
            .i32(1)
            .null()
            .build();

        let mut parser =
            JavaStreamReader::with_options(&bytes, DecoderOptions { max_depth: 2 });
        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::DepthLimitExceeded(2))
        );

        let mut parser = JavaStreamReader::from(&bytes);
        assert_eq!(parser.parse().unwrap().len(), 1);
    }

    #[test]
    fn test_negative_array_length() {
        let prefix = StreamBuilder::new()
            .byte(0x75)
            .class_header("[B", 0x02, 0)
            .end()
            .null();
        let bytes = prefix.i32(-1).build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::InvalidLength(-1, bytes.len() - 4))
        );
    }

    #[test]
    fn test_invalid_array_class() {
        let bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("NotAnArray", 0x02, 0)
            .end()
            .null()
            .i32(0)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::InvalidArrayClass("NotAnArray".to_string()))
        );
    }

    #[test]
    fn test_string_back_references() {
        let bytes = StreamBuilder::new()
            .string("hello")
            .reference(0)
            .reference(0)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        assert_eq!(result.len(), 3);
        assert_eq!(parser.handles().len(), 1);
        let texts: Vec<&Rc<str>> = result
            .iter()
            .map(|content| match content {
                Content::String(text) => text,
                other => panic!("Expected a string, got {other:?}"),
            })
            .collect();
        assert!(texts.iter().all(|text| &***text == "hello"));
        assert!(Rc::ptr_eq(texts[0], texts[1]));
        assert!(Rc::ptr_eq(texts[0], texts[2]));
    }

    #[test]
    fn test_long_string() {
        let bytes = StreamBuilder::new()
            .byte(0x7C)
            .i64(3)
            .raw(b"abc")
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.parse().unwrap(),
            &[Content::String(Rc::from("abc"))]
        );
    }

    #[test]
    fn test_unknown_handle() {
        let bytes = StreamBuilder::new().reference(5).build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnknownHandle(handle(5), 0))
        );
    }

    #[test]
    fn test_unexpected_tag() {
        let bytes = StreamBuilder::new().byte(0x42).build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnexpectedTag(0x42, 4))
        );
    }

    #[test]
    fn test_end_marker_is_not_a_value() {
        let bytes = StreamBuilder::new().end().build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnexpectedTag(0x78, 4))
        );
    }

    #[test]
    fn test_error_keeps_earlier_contents() {
        let bytes = StreamBuilder::new().string("ok").byte(0x42).build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Ok(Some(Content::String(Rc::from("ok"))))
        );
        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnexpectedTag(0x42, 9))
        );
        assert_eq!(parser.next_content(), Err(JavaStreamError::SessionAborted));
        assert_eq!(parser.contents(), &[Content::String(Rc::from("ok"))]);
    }

    #[test]
    fn test_reset_restarts_handles() {
        let bytes = StreamBuilder::new()
            .string("a")
            .byte(0x79)
            .string("b")
            .reference(0)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        assert_eq!(result.len(), 3);
        assert_eq!(result[2], Content::String(Rc::from("b")));
        assert_eq!(parser.handles().len(), 1);
    }

    #[test]
    fn test_reset_inside_content() {
        let mut bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("[Ljava.lang.Object;", 0x02, 0)
            .end()
            .null()
            .i32(1)
            .build();
        let offset = bytes.len();
        bytes.push(0x79);

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnexpectedTag(0x79, offset))
        );
    }

    #[test]
    fn test_class_object_and_flag_conflict() {
        let bytes = StreamBuilder::new()
            .byte(0x76)
            .class_header("Odd", 0x06, 0)
            .end()
            .null()
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let Content::Class(class) = &result[0] else {
            panic!("Expected a class, got {:?}", result[0]);
        };
        assert_eq!(class.name, "Odd");
        assert_eq!(class.handle, handle(0));
        assert!(matches!(
            parser.handles().resolve(handle(1)),
            Ok(Archived::Class(_))
        ));
        assert_eq!(
            parser.warnings(),
            &[DecodeWarning::FlagConflict("Odd".to_string())]
        );
    }

    #[test]
    fn test_primitive_fields() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Primitives", 0x02, 9)
            .field(b'B', "b")
            .field(b'C', "c")
            .field(b'D', "d")
            .field(b'F', "f")
            .field(b'I', "i")
            .field(b'J', "j")
            .field(b'S', "s")
            .field(b'Z', "yes")
            .field(b'Z', "no")
            .end()
            .null()
            .byte(0xFF)
            .u16(0x00E9)
            .raw(&2.5f64.to_be_bytes())
            .raw(&(-1.0f32).to_be_bytes())
            .i32(-7)
            .i64(1 << 40)
            .u16(0x8000)
            .byte(0x01)
            .byte(0x00)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let values: Vec<&Value> = result[0]
            .as_object()
            .unwrap()
            .fields()
            .map(|field| &field.value)
            .collect();
        assert_eq!(
            values,
            vec![
                &Value::Byte(-1),
                &Value::Char(0xE9),
                &Value::Double(2.5),
                &Value::Float(-1.0),
                &Value::Int(-7),
                &Value::Long(1 << 40),
                &Value::Short(i16::MIN),
                &Value::Boolean(true),
                &Value::Boolean(false),
            ]
        );
    }

    #[test]
    fn test_invalid_type_code() {
        let prefix = StreamBuilder::new()
            .byte(0x73)
            .class_header("Bad", 0x02, 1)
            .build();
        let offset = prefix.len();
        let bytes = StreamBuilder { bytes: prefix }.field(b'Q', "q").build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::InvalidTypeCode(b'Q', offset))
        );
    }

    #[test]
    fn test_null_object_class() {
        let bytes = StreamBuilder::new().byte(0x73).null().build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::UnexpectedTag(0x70, 5))
        );
    }

    #[test]
    fn test_class_desc_from_string_handle() {
        let bytes = StreamBuilder::new()
            .string("java.lang.Object")
            .byte(0x73)
            .reference(0)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        parser.next_content().unwrap();

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::InvalidReference(
                handle(0),
                "class descriptor"
            ))
        );
    }

    #[test]
    fn test_class_cannot_extend_itself() {
        let bytes = StreamBuilder::new()
            .class_header("Loop", 0x02, 0)
            .end()
            .reference(0)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::InvalidReference(
                handle(0),
                "class descriptor"
            ))
        );
    }

    #[test]
    fn test_class_annotation() {
        let bytes = StreamBuilder::new()
            .class_header("Annotated", 0x02, 0)
            .string("note")
            .byte(0x77)
            .byte(1)
            .byte(0xAA)
            .end()
            .null()
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let Content::ClassDesc(class) = &result[0] else {
            panic!("Expected a class descriptor, got {:?}", result[0]);
        };
        assert_eq!(
            class.annotations,
            vec![
                Content::String(Rc::from("note")),
                Content::BlockData(vec![0xAA]),
            ]
        );
    }

    #[test]
    fn test_long_block_data() {
        let bytes = StreamBuilder::new()
            .byte(0x7A)
            .i32(3)
            .raw(&[1, 2, 3])
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.parse().unwrap(),
            &[Content::BlockData(vec![1, 2, 3])]
        );
    }

    #[test]
    fn test_externalizable_without_block_data() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Ext", 0x04, 0)
            .end()
            .null()
            .raw(&[0xDE, 0xAD])
            .build();

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::ExternalContents("Ext".to_string()))
        );
    }

    #[test]
    fn test_externalizable_with_block_data() {
        let prefix = StreamBuilder::new()
            .byte(0x73)
            .class_header("Ext", 0x0C, 0)
            .end()
            .null()
            .build();
        let offset = prefix.len();
        let bytes = StreamBuilder { bytes: prefix }
            .byte(0x77)
            .byte(2)
            .raw(&[0xAB, 0xCD])
            .end()
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let object = result[0].as_object().unwrap();
        assert_eq!(object.data.len(), 1);
        assert_eq!(
            object.data[0].annotations,
            vec![Content::BlockData(vec![0xAB, 0xCD])]
        );
        assert_eq!(
            parser.warnings(),
            &[DecodeWarning::UnsupportedConstruct(
                "externalizable object data",
                offset
            )]
        );
    }

    #[test]
    fn test_proxy_object() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .byte(0x7D)
            .i32(1)
            .utf("java.lang.Runnable")
            .end()
            .class_header("java.lang.reflect.Proxy", 0x02, 1)
            .object_field(b'L', "h", "Ljava/lang/reflect/InvocationHandler;")
            .end()
            .null()
            .null()
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let object = result[0].as_object().unwrap();
        assert_eq!(
            object.class.kind,
            ClassKind::Proxy(vec!["java.lang.Runnable".to_string()])
        );
        assert_eq!(object.class.display_name(), "proxy(java.lang.Runnable)");
        assert_eq!(object.handle, handle(3));
        assert_eq!(object.data.len(), 2);
        assert_eq!(object.field("h"), Some(&Value::Content(Content::Null)));
        assert_eq!(
            parser.warnings(),
            &[DecodeWarning::UnsupportedConstruct(
                "proxy class descriptor",
                5
            )]
        );
    }

    #[test]
    fn test_exception_wrapper() {
        let bytes = StreamBuilder::new()
            .string("before")
            .byte(0x7B)
            .byte(0x73)
            .class_header("java.io.IOException", 0x02, 0)
            .end()
            .null()
            .string("after")
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        assert_eq!(result.len(), 3);
        let Content::Exception(thrown) = &result[1] else {
            panic!("Expected an exception, got {:?}", result[1]);
        };
        let thrown = thrown.as_object().unwrap();
        assert_eq!(thrown.class.name, "java.io.IOException");
        // The table was cleared on both sides of the throwable
        assert_eq!(thrown.handle, handle(1));
        assert_eq!(parser.handles().len(), 1);
        assert_eq!(
            parser.handles().resolve(handle(0)).unwrap(),
            &Archived::String(Rc::from("after"))
        );
        assert_eq!(
            parser.warnings(),
            &[DecodeWarning::UnsupportedConstruct("exception wrapper", 13)]
        );
    }

    #[test]
    fn test_write_method_annotation_per_class() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("Child", 0x02, 1)
            .field(b'Z', "flag")
            .end()
            .class_header("Custom", 0x03, 1)
            .field(b'I', "count")
            .end()
            .null()
            .i32(9)
            .byte(0x77)
            .byte(1)
            .byte(0x05)
            .end()
            .byte(0x01)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let object = result[0].as_object().unwrap();
        assert_eq!(object.data[0].class.name, "Custom");
        assert_eq!(object.data[0].annotations, vec![Content::BlockData(vec![5])]);
        assert!(object.data[1].annotations.is_empty());
        assert_eq!(object.field("count"), Some(&Value::Int(9)));
        assert_eq!(object.field("flag"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_reference_to_finished_object() {
        let bytes = StreamBuilder::new()
            .byte(0x75)
            .class_header("[I", 0x02, 0)
            .end()
            .null()
            .i32(1)
            .i32(7)
            .reference(1)
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        let (Content::Array(first), Content::Array(again)) = (&result[0], &result[1]) else {
            panic!("Expected arrays, got {result:?}");
        };
        assert!(Rc::ptr_eq(first, again));
        assert_eq!(again.elements, vec![Value::Int(7)]);
    }

    #[test]
    fn test_reference_outlives_reset() {
        let bytes = StreamBuilder::new()
            .byte(0x73)
            .class_header("A", 0x02, 0)
            .end()
            .null()
            .reference(1)
            .byte(0x79)
            .string("x")
            .string("y")
            .build();

        let mut parser = JavaStreamReader::from(&bytes);
        let result = parser.parse().unwrap().to_vec();

        assert_eq!(result.len(), 4);
        let referenced = result[1].as_object().unwrap();
        assert_eq!(referenced.class.name, "A");
        assert_eq!(referenced.handle, handle(1));
        let (Content::Object(first), Content::Object(again)) = (&result[0], &result[1]) else {
            panic!("Expected objects, got {result:?}");
        };
        assert!(Rc::ptr_eq(first, again));
        // The handle now names a string, but the decoded contents are unaffected
        assert_eq!(
            parser.handles().resolve(handle(1)).unwrap(),
            &Archived::String(Rc::from("y"))
        );
        assert_eq!(parser.contents()[1], result[1]);
    }

    fn superclass_chain(levels: usize) -> Vec<u8> {
        let mut builder = StreamBuilder::new().byte(0x73);
        for _ in 0..levels {
            builder = builder.class_header("A", 0x02, 0).end();
        }
        builder.null().build()
    }

    #[test]
    fn test_superclass_chain_depth() {
        let options = DecoderOptions { max_depth: 5 };

        // The object, three descriptors and the innermost annotation fit within five levels
        let bytes = superclass_chain(3);
        let mut parser = JavaStreamReader::with_options(&bytes, options);
        let result = parser.parse().unwrap().to_vec();
        assert_eq!(result[0].as_object().unwrap().data.len(), 3);

        let bytes = superclass_chain(4);
        let mut parser = JavaStreamReader::with_options(&bytes, options);
        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::DepthLimitExceeded(5))
        );
    }

    #[test]
    fn test_deep_superclass_chain() {
        let bytes = superclass_chain(5000);

        let mut parser = JavaStreamReader::from(&bytes);

        assert_eq!(
            parser.next_content(),
            Err(JavaStreamError::DepthLimitExceeded(DEFAULT_MAX_DEPTH))
        );
        assert_eq!(parser.state(), StreamState::Error);
    }
}

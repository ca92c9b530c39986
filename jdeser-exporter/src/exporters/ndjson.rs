use std::{
    io::{BufWriter, Write},
    path::Path,
};

use base64::{prelude::BASE64_STANDARD, Engine};
use json::{array, object, JsonValue};

use jdeser::{
    error::warning::DecodeWarning,
    stream::{
        handles::Handle,
        models::{ArrayRecord, ClassDesc, ClassKind, Content, ObjectRecord, Value},
    },
};

use crate::{
    app::{error::RuntimeError, runtime::Config},
    exporters::exporter::{
        char_text, reference_target, Exporter, Output, RenderContext, Writer,
    },
};

pub struct NDJSON<'a> {
    /// Data that is setup from the application's runtime
    pub config: &'a Config,
    /// Buffered writer for the export destination
    pub file: Output,
}

impl<'a> Exporter<'a> for NDJSON<'a> {
    fn new(config: &'a Config) -> Result<Self, RuntimeError> {
        let file = config.open_output()?;
        Ok(NDJSON {
            config,
            file: BufWriter::new(file),
        })
    }

    fn iter_sources(&mut self) -> Result<usize, RuntimeError> {
        // Tell the user what we are doing
        if let Some(path) = &self.config.options.export_path {
            eprintln!("Exporting to {} as ndjson...", path.display());
        }

        let config = self.config;
        let mut failed = 0;
        for source in &config.options.inputs {
            let source_name = source.display().to_string();

            let mut index = 0;
            let report = config.decode_source(source, |content, handles| {
                let content = self.format_content(content, &mut RenderContext::new(handles), "")?;
                let line = object! {
                    source: source_name.as_str(),
                    index: index,
                    content: content,
                };
                index += 1;
                NDJSON::write_to_file(self.get_or_create_file(), line)
            })?;

            for warning in &report.warnings {
                let line = self.format_warning(source, warning);
                NDJSON::write_to_file(self.get_or_create_file(), line)?;
            }
            if let Some(failure) = &report.failure {
                let line = self.format_failure(source, failure, report.position);
                NDJSON::write_to_file(self.get_or_create_file(), line)?;
                failed += 1;
            }
        }

        self.get_or_create_file()
            .flush()
            .map_err(RuntimeError::DiskError)?;
        Ok(failed)
    }

    fn get_or_create_file(&mut self) -> &mut Output {
        &mut self.file
    }
}

impl Writer<JsonValue> for NDJSON<'_> {
    fn format_content(
        &self,
        content: &Content,
        context: &mut RenderContext,
        _: &str,
    ) -> Result<JsonValue, RuntimeError> {
        Ok(match content {
            Content::Null => JsonValue::Null,
            Content::Reference(handle) => self.format_reference(
                *handle,
                reference_target(*handle, context.handles).as_deref(),
            ),
            Content::ClassDesc(class) => self.format_class(class, context, "")?,
            Content::Class(class) => object! {
                kind: "class",
                class: self.format_class(class, context, "")?,
            },
            Content::String(text) => JsonValue::from(&**text),
            Content::Object(object) if context.first_visit(object) => {
                self.format_object(object, context, "")?
            }
            Content::Object(object) => {
                let class = object.class.display_name();
                self.format_reference(object.handle, Some(&*class))
            }
            Content::Array(array) if context.first_visit(array) => {
                self.format_array(array, context, "")?
            }
            Content::Array(array) => {
                self.format_reference(array.handle, Some(array.class.name.as_str()))
            }
            Content::Enum(constant) => object! {
                kind: "enum",
                handle: constant.handle.0,
                class: constant.class.display_name().into_owned(),
                name: &*constant.name,
            },
            Content::BlockData(bytes) => object! {
                kind: "block_data",
                data: BASE64_STANDARD.encode(bytes),
            },
            Content::Exception(thrown) => object! {
                kind: "exception",
                thrown: self.format_content(thrown, context, "")?,
            },
            Content::EndBlockData => object! {
                kind: "end_block_data",
            },
        })
    }

    fn format_reference(&self, handle: Handle, target: Option<&str>) -> JsonValue {
        let mut json_reference = object! {
            kind: "reference",
            handle: handle.0,
        };
        if let Some(target) = target {
            json_reference["target"] = JsonValue::from(target);
        }
        json_reference
    }

    fn format_class(
        &self,
        class: &ClassDesc,
        context: &mut RenderContext,
        _: &str,
    ) -> Result<JsonValue, RuntimeError> {
        let mut json_class = object! {
            kind: "class_desc",
            handle: class.handle.0,
            name: class.display_name().into_owned(),
            version: format!("{:#018x}", class.version),
            flags: class.flags.names(),
        };

        if let ClassKind::Proxy(interfaces) = &class.kind {
            json_class["interfaces"] = JsonValue::from(interfaces.clone());
        }

        let mut fields = array![];
        for field in &class.fields {
            fields
                .push(object! {
                    name: field.name.as_str(),
                    signature: field.type_code.signature().into_owned(),
                })
                .map_err(RuntimeError::JsonError)?;
        }
        json_class["fields"] = fields;

        if !class.annotations.is_empty() {
            json_class["annotations"] = self.format_annotations(&class.annotations, context)?;
        }
        if let Some(parent) = &class.super_class {
            json_class["super"] = self.format_class(parent, context, "")?;
        }
        Ok(json_class)
    }

    fn format_object(
        &self,
        object: &ObjectRecord,
        context: &mut RenderContext,
        _: &str,
    ) -> Result<JsonValue, RuntimeError> {
        let mut data = array![];
        for group in &object.data {
            let mut values = object! {};
            for field in &group.values {
                values[field.name.as_str()] = self.format_value(&field.value, context, "")?;
            }

            let mut json_group = object! {
                class: group.class.display_name().into_owned(),
                values: values,
            };
            if !group.annotations.is_empty() {
                json_group["annotations"] = self.format_annotations(&group.annotations, context)?;
            }
            data.push(json_group).map_err(RuntimeError::JsonError)?;
        }

        Ok(object! {
            kind: "object",
            handle: object.handle.0,
            class: object.class.display_name().into_owned(),
            data: data,
        })
    }

    fn format_array(
        &self,
        array: &ArrayRecord,
        context: &mut RenderContext,
        _: &str,
    ) -> Result<JsonValue, RuntimeError> {
        let mut elements = array![];
        for element in &array.elements {
            elements
                .push(self.format_value(element, context, "")?)
                .map_err(RuntimeError::JsonError)?;
        }

        Ok(object! {
            kind: "array",
            handle: array.handle.0,
            class: array.class.name.as_str(),
            elements: elements,
        })
    }

    fn format_value(
        &self,
        value: &Value,
        context: &mut RenderContext,
        _: &str,
    ) -> Result<JsonValue, RuntimeError> {
        Ok(match value {
            Value::Byte(byte) => JsonValue::from(*byte),
            Value::Char(unit) => JsonValue::from(char_text(*unit)),
            Value::Double(double) => JsonValue::from(*double),
            Value::Float(float) => JsonValue::from(*float),
            Value::Int(int) => JsonValue::from(*int),
            Value::Long(long) => JsonValue::from(*long),
            Value::Short(short) => JsonValue::from(*short),
            Value::Boolean(boolean) => JsonValue::from(*boolean),
            Value::Content(content) => self.format_content(content, context, "")?,
        })
    }

    fn format_warning(&self, source: &Path, warning: &DecodeWarning) -> JsonValue {
        object! {
            source: source.display().to_string(),
            warning: warning.to_string(),
        }
    }

    fn format_failure(&self, source: &Path, failure: &RuntimeError, position: usize) -> JsonValue {
        object! {
            source: source.display().to_string(),
            error: failure.to_string(),
            offset: position,
        }
    }

    fn write_to_file(file: &mut Output, text: JsonValue) -> Result<(), RuntimeError> {
        file.write_all((text.dump() + "\n").as_bytes())
            .map_err(RuntimeError::DiskError)
    }
}

impl NDJSON<'_> {
    fn format_annotations(
        &self,
        annotations: &[Content],
        context: &mut RenderContext,
    ) -> Result<JsonValue, RuntimeError> {
        let mut json_annotations = array![];
        for annotation in annotations {
            json_annotations
                .push(self.format_content(annotation, context, "")?)
                .map_err(RuntimeError::JsonError)?;
        }
        Ok(json_annotations)
    }
}

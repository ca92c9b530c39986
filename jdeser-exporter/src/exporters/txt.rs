use std::{
    io::{BufWriter, Write},
    path::Path,
};

use jdeser::{
    error::warning::DecodeWarning,
    stream::{
        handles::Handle,
        models::{ArrayRecord, ClassDesc, Content, ObjectRecord, Value},
    },
};

use crate::{
    app::{error::RuntimeError, runtime::Config},
    exporters::exporter::{
        char_text, reference_target, Exporter, Output, RenderContext, Writer,
    },
};

/// Each nesting level is indented this much deeper than its parent
const INDENT: &str = "    ";

pub struct TXT<'a> {
    /// Data that is setup from the application's runtime
    pub config: &'a Config,
    /// Buffered writer for the export destination
    pub file: Output,
}

impl<'a> Exporter<'a> for TXT<'a> {
    fn new(config: &'a Config) -> Result<Self, RuntimeError> {
        let file = config.open_output()?;
        Ok(TXT {
            config,
            file: BufWriter::new(file),
        })
    }

    fn iter_sources(&mut self) -> Result<usize, RuntimeError> {
        // Tell the user what we are doing
        if let Some(path) = &self.config.options.export_path {
            eprintln!("Exporting to {} as txt...", path.display());
        }

        let config = self.config;
        let mut failed = 0;
        for source in &config.options.inputs {
            TXT::write_to_file(
                self.get_or_create_file(),
                format!("==> {} <==\n", source.display()),
            )?;

            let mut index = 0;
            let report = config.decode_source(source, |content, handles| {
                let text = self.format_content(content, &mut RenderContext::new(handles), "")?;
                index += 1;
                TXT::write_to_file(self.get_or_create_file(), format!("[{index}] {text}\n"))
            })?;

            for warning in &report.warnings {
                let text = self.format_warning(source, warning);
                TXT::write_to_file(self.get_or_create_file(), text)?;
            }
            if let Some(failure) = &report.failure {
                let text = self.format_failure(source, failure, report.position);
                TXT::write_to_file(self.get_or_create_file(), text)?;
                failed += 1;
            }
            TXT::write_to_file(self.get_or_create_file(), "\n".to_string())?;
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

impl Writer<String> for TXT<'_> {
    fn format_content(
        &self,
        content: &Content,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<String, RuntimeError> {
        Ok(match content {
            Content::Null => "null".to_string(),
            Content::Reference(handle) => self.format_reference(
                *handle,
                reference_target(*handle, context.handles).as_deref(),
            ),
            Content::ClassDesc(class) => self.format_class(class, context, indent)?,
            Content::Class(class) => format!("class {}", class.display_name()),
            Content::String(text) => format!("{text:?}"),
            Content::Object(object) if context.first_visit(object) => {
                self.format_object(object, context, indent)?
            }
            Content::Object(object) => {
                let class = object.class.display_name();
                self.format_reference(object.handle, Some(&*class))
            }
            Content::Array(array) if context.first_visit(array) => {
                self.format_array(array, context, indent)?
            }
            Content::Array(array) => {
                self.format_reference(array.handle, Some(array.class.name.as_str()))
            }
            Content::Enum(constant) => format!(
                "{}.{} @ {}",
                constant.class.display_name(),
                constant.name,
                constant.handle
            ),
            Content::BlockData(bytes) => format!(
                "block data ({} bytes) {}",
                bytes.len(),
                bytes
                    .iter()
                    .map(|byte| format!("{byte:02x}"))
                    .collect::<Vec<String>>()
                    .join(" ")
            ),
            Content::Exception(thrown) => {
                format!("exception {}", self.format_content(thrown, context, indent)?)
            }
            Content::EndBlockData => "end of block data".to_string(),
        })
    }

    fn format_reference(&self, handle: Handle, target: Option<&str>) -> String {
        match target {
            Some(target) => format!("-> {handle} ({target})"),
            None => format!("-> {handle}"),
        }
    }

    fn format_class(
        &self,
        class: &ClassDesc,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<String, RuntimeError> {
        let child = format!("{indent}{INDENT}");
        let mut out_s = format!(
            "classdesc {} @ {} (version {:#018x}, flags [{}])\n",
            class.display_name(),
            class.handle,
            class.version,
            class.flags.names().join(", ")
        );

        for field in &class.fields {
            self.add_line(
                &mut out_s,
                &format!("{} {}", field.type_code.signature(), field.name),
                &child,
            );
        }
        for annotation in &class.annotations {
            let text = self.format_content(annotation, context, &child)?;
            self.add_line(&mut out_s, &format!("annotation {text}"), &child);
        }
        if let Some(parent) = &class.super_class {
            let text = self.format_class(parent, context, &child)?;
            self.add_line(&mut out_s, &format!("extends {text}"), &child);
        }

        Ok(finish(out_s))
    }

    fn format_object(
        &self,
        object: &ObjectRecord,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<String, RuntimeError> {
        let child = format!("{indent}{INDENT}");
        let grandchild = format!("{child}{INDENT}");
        let mut out_s = format!("{} @ {}\n", object.class.display_name(), object.handle);

        for group in &object.data {
            self.add_line(&mut out_s, &format!("[{}]", group.class.display_name()), &child);
            for field in &group.values {
                let text = self.format_value(&field.value, context, &grandchild)?;
                self.add_line(
                    &mut out_s,
                    &format!("{}: {} = {text}", field.name, field.type_code.signature()),
                    &grandchild,
                );
            }
            for annotation in &group.annotations {
                let text = self.format_content(annotation, context, &grandchild)?;
                self.add_line(&mut out_s, &format!("annotation {text}"), &grandchild);
            }
        }

        Ok(finish(out_s))
    }

    fn format_array(
        &self,
        array: &ArrayRecord,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<String, RuntimeError> {
        let child = format!("{indent}{INDENT}");
        let mut out_s = format!(
            "{} @ {} ({} elements)\n",
            array.class.name,
            array.handle,
            array.elements.len()
        );

        for (idx, element) in array.elements.iter().enumerate() {
            let text = self.format_value(element, context, &child)?;
            self.add_line(&mut out_s, &format!("[{idx}] {text}"), &child);
        }

        Ok(finish(out_s))
    }

    fn format_value(
        &self,
        value: &Value,
        context: &mut RenderContext,
        indent: &str,
    ) -> Result<String, RuntimeError> {
        Ok(match value {
            Value::Byte(byte) => byte.to_string(),
            Value::Char(unit) => format!("'{}'", char_text(*unit)),
            Value::Double(double) => double.to_string(),
            Value::Float(float) => float.to_string(),
            Value::Int(int) => int.to_string(),
            Value::Long(long) => long.to_string(),
            Value::Short(short) => short.to_string(),
            Value::Boolean(boolean) => boolean.to_string(),
            Value::Content(content) => self.format_content(content, context, indent)?,
        })
    }

    fn format_warning(&self, _: &Path, warning: &DecodeWarning) -> String {
        format!("warning: {warning}\n")
    }

    fn format_failure(&self, _: &Path, failure: &RuntimeError, position: usize) -> String {
        format!("error: stopped at offset {position:#x}: {failure}\n")
    }

    fn write_to_file(file: &mut Output, text: String) -> Result<(), RuntimeError> {
        file.write_all(text.as_bytes())
            .map_err(RuntimeError::DiskError)
    }
}

impl TXT<'_> {
    fn add_line(&self, string: &mut String, part: &str, indent: &str) {
        if !part.is_empty() {
            string.push_str(indent);
            string.push_str(part);
            string.push('\n');
        }
    }
}

/// Drop the newline after the last line so callers can embed the text
fn finish(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

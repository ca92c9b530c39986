/*!
 Reads field values and the per-class instance data of objects.
*/

use std::rc::Rc;

use log::trace;

use crate::{
    error::{stream::JavaStreamError, warning::DecodeWarning},
    stream::{
        models::{ClassData, ClassDesc, FieldValue, TypeCode, Value},
        parser::JavaStreamReader,
    },
};

impl JavaStreamReader<'_> {
    /// Read a single value of the given type
    pub(super) fn read_value(&mut self, type_code: &TypeCode) -> Result<Value, JavaStreamError> {
        Ok(match type_code {
            TypeCode::Byte => Value::Byte(self.reader.read_i8()?),
            TypeCode::Char => Value::Char(self.reader.read_u16()?),
            TypeCode::Double => Value::Double(self.reader.read_f64()?),
            TypeCode::Float => Value::Float(self.reader.read_f32()?),
            TypeCode::Int => Value::Int(self.reader.read_i32()?),
            TypeCode::Long => Value::Long(self.reader.read_i64()?),
            TypeCode::Short => Value::Short(self.reader.read_i16()?),
            TypeCode::Boolean => Value::Boolean(self.reader.read_bool()?),
            TypeCode::Object(_) | TypeCode::Array(_) => Value::Content(self.read_value_content()?),
        })
    }

    /// Read an object's instance data, one group per class from the most ancestral down
    pub(super) fn read_class_data(
        &mut self,
        class: &Rc<ClassDesc>,
    ) -> Result<Vec<ClassData>, JavaStreamError> {
        if class.flags.is_externalizable() {
            return self.read_external_data(class).map(|data| vec![data]);
        }

        let mut chain = vec![Rc::clone(class)];
        let mut current = class.super_class.clone();
        while let Some(parent) = current {
            current = parent.super_class.clone();
            chain.push(parent);
        }
        chain.reverse();

        let mut out_v = Vec::with_capacity(chain.len());
        for level in chain {
            let mut values = Vec::with_capacity(level.fields.len());
            for field in &level.fields {
                let value = self.read_value(&field.type_code)?;
                trace!("{}.{} = {value:?}", level.display_name(), field.name);
                values.push(FieldValue {
                    name: field.name.clone(),
                    type_code: field.type_code.clone(),
                    value,
                });
            }

            // Anything a custom `writeObject` wrote after the default fields
            let annotations = if level.flags.has_write_method() {
                self.read_annotation()?
            } else {
                vec![]
            };

            out_v.push(ClassData {
                class: level,
                values,
                annotations,
            });
        }
        Ok(out_v)
    }

    /// Externalizable classes write everything themselves, so only block data mode can be skipped over
    fn read_external_data(&mut self, class: &Rc<ClassDesc>) -> Result<ClassData, JavaStreamError> {
        if !class.flags.has_block_data() {
            return Err(JavaStreamError::ExternalContents(class.name.clone()));
        }

        let offset = self.reader.position();
        self.record_warning(DecodeWarning::UnsupportedConstruct(
            "externalizable object data",
            offset,
        ));
        Ok(ClassData {
            class: Rc::clone(class),
            values: vec![],
            annotations: self.read_annotation()?,
        })
    }
}

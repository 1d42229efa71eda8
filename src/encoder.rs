//! Recursive record encoder
//!
//! Renders one record into an [`Element`], running each field through the
//! value pipeline (hooks, conversion, validation, recovery) and recursing
//! into arrays, maps and nested objects with derived child configurations.

use tracing::warn;

use crate::error::{ConfigurationError, Result, WriterError};
use crate::field::{ErrorMode, FieldContext, FieldSpec};
use crate::fragment::{Element, Node};
use crate::hooks::WriteObserver;
use crate::metadata::{FieldMetadataProvider, RecordShapeProvider};
use crate::normalize::{NormalizeOptions, normalize};
use crate::record_config::{NullValueHandling, RecordConfiguration, RenderContext};
use crate::resolver::{ResolveHint, resolve};
use crate::topology::{XSI_NAMESPACE, singularize};
use crate::value::{DynamicRecord, FieldType, Record, Value};

const MAP_KEY_TAG: &str = "Key";
const MAP_VALUE_TAG: &str = "Value";

/// Encoder for the records of one resolved configuration
pub struct RecordEncoder<'a> {
    observer: &'a mut dyn WriteObserver,
    ctx: &'a RenderContext,
    /// `xsi` is declared on the root, so nil markers need no inline declaration
    xsi_in_scope: bool,
}

impl<'a> RecordEncoder<'a> {
    pub fn new(
        observer: &'a mut dyn WriteObserver,
        ctx: &'a RenderContext,
        config: &RecordConfiguration,
    ) -> Self {
        let xsi_in_scope = config
            .topology()
            .map(|t| t.has_root() && t.namespaces.has_prefix("xsi"))
            .unwrap_or(false);
        Self {
            observer,
            ctx,
            xsi_in_scope,
        }
    }

    /// Render `record` as text at the depth its configuration implies.
    /// `None` means the record is skipped.
    pub fn render(
        &mut self,
        record: &dyn Record,
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Option<String>> {
        let depth = if config.topology()?.has_root() { 1 } else { 0 };
        Ok(self
            .encode(record, config, index)?
            .map(|element| element.render(depth, self.ctx)))
    }

    /// Build the element for `record`; `None` means the record is skipped
    pub fn encode(
        &mut self,
        record: &dyn Record,
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Option<Element>> {
        let node_name = config.topology()?.node_name.clone();

        let substitute: DynamicRecord;
        let record: &dyn Record = if record.is_null() {
            match config.null_value_handling {
                NullValueHandling::Ignore => return Ok(None),
                NullValueHandling::EmitNilMarker => return Ok(Some(self.nil_element(&node_name))),
                NullValueHandling::SubstituteDefaultInstance => {
                    substitute = config.zero_instance();
                    &substitute
                }
            }
        } else {
            record
        };

        if config.strict_column_count {
            check_columns(record, config, index)?;
        }

        let mut node = Element::new(node_name);
        let mut started = false;

        for field in config.ordered_fields() {
            let owner_value: Option<Value> = field
                .owner
                .as_deref()
                .map(|path| owner_record(record, path).unwrap_or(Value::Null));
            let holder: &dyn Record = match &owner_value {
                Some(owner) => owner,
                None => record,
            };

            let raw = match holder.get(&field.name) {
                Some(value) => value,
                None if config.strict_missing_fields => {
                    return Err(WriterError::MissingField {
                        field: field.name.clone(),
                        index,
                    });
                }
                None => Value::Null,
            };

            let value = match self.acquire(holder, field, config, index, raw.clone()) {
                Ok(Some(value)) => value,
                Ok(None) => return Ok(None),
                Err(error) => match self.recover(holder, field, config, index, &raw, error)? {
                    Some(value) => value,
                    None => continue,
                },
            };

            started = true;
            if let Some(markup) = self
                .observer
                .serialize_field(holder, index, &field.name, &value)
            {
                node.push(Node::Raw(markup));
                continue;
            }
            self.write_field(&mut node, field, value, config, index)?;
        }

        Ok(started.then_some(node))
    }

    /// Value pipeline for one field; `Ok(None)` means a hook vetoed the record
    fn acquire(
        &mut self,
        holder: &dyn Record,
        field: &FieldSpec,
        config: &RecordConfiguration,
        index: u64,
        raw: Value,
    ) -> Result<Option<Value>> {
        let mut value = match (&raw, &field.default_value) {
            (Value::Null, Some(default)) => default.clone(),
            _ => raw,
        };

        if !self
            .observer
            .before_field_write(holder, index, &field.name, &mut value)
        {
            return Ok(None);
        }

        value = match &field.converter {
            Some(converter) => {
                let shown = value.to_string();
                converter(value).map_err(|reason| WriterError::Conversion {
                    field: field.name.clone(),
                    value: shown,
                    reason,
                })?
            }
            None => coerce(value, field.field_type, &field.name, config.culture.decimal_separator)?,
        };

        if config.validation_scope.includes_members() {
            validate_member(field, &value)?;
        }

        if !self
            .observer
            .after_field_write(holder, index, &field.name, &value)
        {
            return Ok(None);
        }
        Ok(Some(value))
    }

    /// Fallback, then default provider, then the field's error mode.
    /// `Ok(None)` drops just this field.
    fn recover(
        &mut self,
        holder: &dyn Record,
        field: &FieldSpec,
        config: &RecordConfiguration,
        index: u64,
        raw: &Value,
        error: WriterError,
    ) -> Result<Option<Value>> {
        let context = FieldContext {
            field_name: &field.name,
            record: holder,
            culture: &config.culture,
            index,
        };
        let recovered = field
            .fallback
            .as_ref()
            .and_then(|provider| provider(&context))
            .or_else(|| {
                field
                    .default_provider
                    .as_ref()
                    .and_then(|provider| provider(&context))
            });

        if let Some(value) = recovered {
            if config.validation_scope.includes_members() {
                validate_member(field, &value)?;
            }
            return Ok(Some(value));
        }

        let wrapped = WriterError::FieldWrite {
            field: field.name.clone(),
            index,
            value: raw.to_string(),
            source: Box::new(error),
        };
        match field.error_mode.unwrap_or(config.error_mode) {
            ErrorMode::IgnoreAndContinue => {
                warn!(field = %field.name, index, error = %wrapped, "Ignoring field error");
                Ok(None)
            }
            ErrorMode::ReportAndContinue => {
                if self
                    .observer
                    .field_write_error(holder, index, &field.name, &wrapped)
                {
                    warn!(field = %field.name, index, error = %wrapped, "Field error reported, field skipped");
                    Ok(None)
                } else {
                    Err(wrapped)
                }
            }
            ErrorMode::ThrowAndStop => Err(wrapped),
        }
    }

    fn write_field(
        &mut self,
        node: &mut Element,
        field: &FieldSpec,
        value: Value,
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<()> {
        let tag = field.tag_name();
        if field.is_attribute() && !value.is_scalar() && !value.is_null() {
            return Err(WriterError::Conversion {
                field: field.name.clone(),
                value: value.to_string(),
                reason: "a complex value can't be written as an attribute".to_string(),
            });
        }

        match value {
            Value::Null => {
                if field.is_nullable && !field.is_attribute() {
                    node.push(Node::Element(self.nil_element(tag)));
                }
            }
            Value::Array(items) => {
                let element = self.array_element(tag, &items, config, index)?;
                node.push(Node::Element(element));
            }
            Value::Map(pairs) => {
                let element = self.map_element(tag, &pairs, config, index)?;
                node.push(Node::Element(element));
            }
            Value::Object(object) => {
                if let Some(element) = self.nested_element(tag, &object, config, index)? {
                    node.push(Node::Element(element));
                }
            }
            scalar => {
                let text = scalar.scalar_text(self.ctx.culture.decimal_separator);
                let options = NormalizeOptions::for_field(field, &self.ctx.eol);
                let normalized = normalize(&field.name, text.as_deref(), &options)?;
                if field.is_text() {
                    node.push(Node::Text(normalized));
                } else if field.is_attribute() {
                    node.push_attribute(tag, normalized);
                } else {
                    node.push(Node::Element(Element::new(tag).with_text(normalized)));
                }
            }
        }
        Ok(())
    }

    fn nil_element(&self, tag: &str) -> Element {
        let mut element = Element::new(tag);
        if !self.xsi_in_scope {
            element.push_attribute("xmlns:xsi", XSI_NAMESPACE);
        }
        element.push_attribute("xsi:nil", "true");
        element
    }

    /// Any value rendered as a child element named `tag`
    fn value_element(
        &mut self,
        tag: &str,
        value: &Value,
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Option<Element>> {
        match value {
            Value::Null => Ok((config.null_value_handling == NullValueHandling::EmitNilMarker)
                .then(|| self.nil_element(tag))),
            Value::Array(items) => self.array_element(tag, items, config, index).map(Some),
            Value::Map(pairs) => self.map_element(tag, pairs, config, index).map(Some),
            Value::Object(object) => self.nested_element(tag, object, config, index),
            scalar => {
                let text = scalar.scalar_text(self.ctx.culture.decimal_separator);
                let options = NormalizeOptions {
                    eol: self.ctx.eol.clone(),
                    ..Default::default()
                };
                let normalized = normalize(tag, text.as_deref(), &options)?;
                Ok(Some(Element::new(tag).with_text(normalized)))
            }
        }
    }

    fn array_element(
        &mut self,
        tag: &str,
        items: &[Value],
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Element> {
        let item_tag = singularize(tag);
        let mut element = Element::new(tag);
        for item in items {
            if let Some(child) = self.value_element(&item_tag, item, config, index)? {
                element.push(Node::Element(child));
            }
        }
        Ok(element)
    }

    fn map_element(
        &mut self,
        tag: &str,
        pairs: &[(Value, Value)],
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Element> {
        let mut element = Element::new(tag);
        for (key, value) in pairs {
            let key_element = self
                .value_element(MAP_KEY_TAG, key, config, index)?
                .unwrap_or_else(|| Element::new(MAP_KEY_TAG));
            let value_element = self
                .value_element(MAP_VALUE_TAG, value, config, index)?
                .unwrap_or_else(|| Element::new(MAP_VALUE_TAG));
            element.push(Node::Element(key_element));
            element.push(Node::Element(value_element));
        }
        Ok(element)
    }

    /// Recurse into a nested object with its own configuration, retagged as `tag`
    fn nested_element(
        &mut self,
        tag: &str,
        object: &DynamicRecord,
        config: &RecordConfiguration,
        index: u64,
    ) -> Result<Option<Element>> {
        if object.is_empty() {
            return Ok(Some(Element::new(tag)));
        }
        let mut child = config.derive_child(tag);
        let shape = RecordShapeProvider.describe_fields(object);
        resolve(&mut child, ResolveHint::Shape(&shape))?;

        Ok(self.encode(object, &child, index)?.map(|mut element| {
            element.rename(tag);
            element
        }))
    }
}

/// Render one record with a fresh encoder
pub fn render_record(
    record: &dyn Record,
    config: &RecordConfiguration,
    index: u64,
    observer: &mut dyn WriteObserver,
) -> Result<Option<String>> {
    if !config.is_resolved() {
        return Err(ConfigurationError::Unresolved.into());
    }
    let ctx = config.render_context();
    RecordEncoder::new(observer, &ctx, config).render(record, config, index)
}

/// Follow a dotted owner path from the root record
fn owner_record(record: &dyn Record, path: &str) -> Option<Value> {
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = Record::get(&current, segment)?;
    }
    Some(current)
}

fn check_columns(record: &dyn Record, config: &RecordConfiguration, index: u64) -> Result<()> {
    let expected = config.top_level_field_names();
    let found = record.field_names();
    if expected.len() != found.len() {
        return Err(WriterError::ColumnCount {
            index,
            expected: expected.len(),
            found: found.len(),
        });
    }
    let missing: Vec<String> = expected
        .into_iter()
        .filter(|name| !found.iter().any(|f| f == name))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WriterError::MissingColumns {
            index,
            fields: missing,
        })
    }
}

fn validate_member(field: &FieldSpec, value: &Value) -> Result<()> {
    for validator in &field.validators {
        validator(value).map_err(|reason| WriterError::Validation {
            field: field.name.clone(),
            value: value.to_string(),
            reason,
        })?;
    }
    Ok(())
}

/// Convert `value` toward the declared field type
fn coerce(value: Value, target: FieldType, field: &str, decimal_separator: char) -> Result<Value> {
    let failed = |value: &Value, reason: &str| WriterError::Conversion {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let coerced = match (target, value) {
        (_, Value::Null) => Value::Null,
        (FieldType::Text, Value::Text(text)) => Value::Text(text),
        (FieldType::Text, scalar @ (Value::Bool(_) | Value::Int(_) | Value::Float(_))) => {
            Value::Text(scalar.scalar_text(decimal_separator).unwrap_or_default())
        }
        (FieldType::Int, Value::Text(text)) => match text.trim().parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => return Err(failed(&Value::Text(text), "not an integer")),
        },
        (FieldType::Int, Value::Float(f)) if f.fract() == 0.0 => Value::Int(f as i64),
        (FieldType::Int, Value::Bool(b)) => Value::Int(i64::from(b)),
        (FieldType::Float, Value::Int(i)) => Value::Float(i as f64),
        (FieldType::Float, Value::Text(text)) => {
            let normalized = text.trim().replace(decimal_separator, ".");
            match normalized.parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => return Err(failed(&Value::Text(text), "not a number")),
            }
        }
        (FieldType::Bool, Value::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Bool(true),
            "false" | "0" | "no" => Value::Bool(false),
            _ => return Err(failed(&Value::Text(text), "not a boolean")),
        },
        (FieldType::Bool, Value::Int(i)) if i == 0 || i == 1 => Value::Bool(i == 1),
        (FieldType::Array, scalar) if scalar.is_scalar() => Value::Array(vec![scalar]),
        (FieldType::Int | FieldType::Float | FieldType::Bool, other)
            if !other.is_scalar() || other.field_type() != target =>
        {
            return Err(failed(&other, "incompatible value for the declared type"));
        }
        (_, other) => other,
    };
    Ok(coerced)
}

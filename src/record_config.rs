//! Record configuration: resolved fields, topology and write policies

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::field::{ErrorMode, FieldSpec};
use crate::topology::{DocumentTopology, NamespaceTable};
use crate::value::{DynamicRecord, Record, Value};

/// How a null record (or null nested value) is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullValueHandling {
    #[default]
    Ignore,
    SubstituteDefaultInstance,
    EmitNilMarker,
}

/// Which validators run while a record is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScope {
    #[default]
    None,
    Member,
    Object,
}

impl ValidationScope {
    pub fn includes_members(self) -> bool {
        matches!(self, ValidationScope::Member | ValidationScope::Object)
    }
}

/// Formatting culture used for scalar text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    pub name: String,
    pub decimal_separator: char,
}

impl Culture {
    pub fn new(name: impl Into<String>, decimal_separator: char) -> Self {
        Self {
            name: name.into(),
            decimal_separator,
        }
    }

    pub fn invariant() -> Self {
        Self::new("invariant", '.')
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Formatting state threaded through rendering in place of ambient globals
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub culture: Culture,
    pub indent: usize,
    pub indent_char: char,
    pub eol: String,
}

impl RenderContext {
    pub fn indentation(&self, depth: usize) -> String {
        std::iter::repeat_n(self.indent_char, self.indent * depth).collect()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            culture: Culture::invariant(),
            indent: 2,
            indent_char: ' ',
            eol: "\n".to_string(),
        }
    }
}

/// Whole-record validator run before rendering under [`ValidationScope::Object`]
pub type ObjectValidator =
    Arc<dyn Fn(&dyn Record) -> std::result::Result<(), String> + Send + Sync>;

/// Name index over the resolved fields, ordered attributes first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndex {
    by_name: HashMap<String, usize>,
    order: Vec<usize>,
}

impl FieldIndex {
    pub fn build(fields: &[FieldSpec]) -> Self {
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        let attributes = (0..fields.len()).filter(|&i| fields[i].is_attribute());
        let elements = (0..fields.len()).filter(|&i| !fields[i].is_attribute());
        Self {
            by_name,
            order: attributes.chain(elements).collect(),
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

/// Configuration of one record stream (or one nested value shape)
#[derive(Clone)]
pub struct RecordConfiguration {
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) index: FieldIndex,
    pub(crate) topology: DocumentTopology,
    pub(crate) resolved: bool,
    pub(crate) uses_complex_location: bool,
    /// Derived for a nested value; never wrapped in a root element
    pub(crate) embedded: bool,

    pub root_name: Option<String>,
    pub node_name: Option<String>,
    /// Path hint such as `//Items/Item`; its first two segments name root and node
    pub location: Option<String>,
    pub namespaces: NamespaceTable,

    pub null_value_handling: NullValueHandling,
    pub strict_column_count: bool,
    pub strict_missing_fields: bool,
    pub validation_scope: ValidationScope,
    pub error_mode: ErrorMode,
    /// Raise the progress hook every N records; 0 disables it
    pub notify_after: u64,
    pub auto_discover: bool,

    pub indent: usize,
    pub indent_char: char,
    pub eol: String,
    pub xml_version: String,
    pub encoding: String,
    pub omit_xml_declaration: bool,
    pub culture: Culture,
    pub object_validator: Option<ObjectValidator>,
}

impl fmt::Debug for RecordConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordConfiguration")
            .field("fields", &self.fields)
            .field("topology", &self.topology)
            .field("resolved", &self.resolved)
            .field("uses_complex_location", &self.uses_complex_location)
            .field("root_name", &self.root_name)
            .field("node_name", &self.node_name)
            .field("location", &self.location)
            .field("null_value_handling", &self.null_value_handling)
            .field("error_mode", &self.error_mode)
            .field("validation_scope", &self.validation_scope)
            .field("notify_after", &self.notify_after)
            .finish_non_exhaustive()
    }
}

impl Default for RecordConfiguration {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            index: FieldIndex::default(),
            topology: DocumentTopology::default(),
            resolved: false,
            uses_complex_location: false,
            embedded: false,
            root_name: None,
            node_name: None,
            location: None,
            namespaces: NamespaceTable::new(),
            null_value_handling: NullValueHandling::Ignore,
            strict_column_count: false,
            strict_missing_fields: false,
            validation_scope: ValidationScope::None,
            error_mode: ErrorMode::ReportAndContinue,
            notify_after: 0,
            auto_discover: true,
            indent: 2,
            indent_char: ' ',
            eol: "\n".to_string(),
            xml_version: "1.0".to_string(),
            encoding: "utf-8".to_string(),
            omit_xml_declaration: true,
            culture: Culture::invariant(),
            object_validator: None,
        }
    }
}

impl RecordConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = Some(name.into());
        self
    }

    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.add(prefix, uri);
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_indent_char(mut self, indent_char: char) -> Self {
        self.indent_char = indent_char;
        self
    }

    pub fn with_eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    /// Single-line output: no indentation, no line terminators
    pub fn compact(self) -> Self {
        self.with_indent(0).with_eol("")
    }

    pub fn with_null_value_handling(mut self, handling: NullValueHandling) -> Self {
        self.null_value_handling = handling;
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn with_validation_scope(mut self, scope: ValidationScope) -> Self {
        self.validation_scope = scope;
        self
    }

    pub fn with_strict_column_count(mut self, strict: bool) -> Self {
        self.strict_column_count = strict;
        self
    }

    pub fn with_strict_missing_fields(mut self, strict: bool) -> Self {
        self.strict_missing_fields = strict;
        self
    }

    pub fn with_notify_after(mut self, every: u64) -> Self {
        self.notify_after = every;
        self
    }

    pub fn with_auto_discover(mut self, enabled: bool) -> Self {
        self.auto_discover = enabled;
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.omit_xml_declaration = !enabled;
        self
    }

    pub fn with_xml_version(mut self, version: impl Into<String>) -> Self {
        self.xml_version = version.into();
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    pub fn with_object_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&dyn Record) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.object_validator = Some(Arc::new(validator));
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn uses_complex_location(&self) -> bool {
        self.uses_complex_location
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Fields in configured order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.index.position(name).map(|i| &self.fields[i])
    }

    /// Fields in emission order: attributes first, then elements
    pub fn ordered_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.index.order().iter().map(|&i| &self.fields[i])
    }

    /// Resolved topology; fails until resolution has run
    pub fn topology(&self) -> Result<&DocumentTopology, ConfigurationError> {
        if self.resolved {
            Ok(&self.topology)
        } else {
            Err(ConfigurationError::Unresolved)
        }
    }

    /// Whether the `xsi`/`xsd` prefixes must be declared
    pub fn needs_schema_instance(&self) -> bool {
        self.null_value_handling == NullValueHandling::EmitNilMarker
            || self.fields.iter().any(|f| f.is_nullable)
    }

    /// Names of fields read directly from the record (no owner path)
    pub fn top_level_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.owner.is_none())
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext {
            culture: self.culture.clone(),
            indent: self.indent,
            indent_char: self.indent_char,
            eol: self.eol.clone(),
        }
    }

    /// Fresh, unresolved configuration for a nested value written under `node_name`.
    /// Policies and formatting carry over; fields are discovered from the value.
    pub fn derive_child(&self, node_name: &str) -> RecordConfiguration {
        RecordConfiguration {
            embedded: true,
            node_name: Some(node_name.to_string()),
            null_value_handling: self.null_value_handling,
            strict_missing_fields: self.strict_missing_fields,
            validation_scope: self.validation_scope,
            error_mode: self.error_mode,
            indent: self.indent,
            indent_char: self.indent_char,
            eol: self.eol.clone(),
            culture: self.culture.clone(),
            ..RecordConfiguration::default()
        }
    }

    /// Zero-valued stand-in for a null record, built from the resolved field types
    pub fn zero_instance(&self) -> DynamicRecord {
        let mut record = DynamicRecord::new();
        let mut owned: Vec<(String, DynamicRecord)> = Vec::new();
        for field in &self.fields {
            let zero = field.field_type.zero_value();
            match field.owner.as_deref().and_then(|o| o.split('.').next()) {
                None => record.insert(field.name.clone(), zero),
                Some(owner) => match owned.iter_mut().find(|(name, _)| name == owner) {
                    Some((_, nested)) => nested.insert(field.name.clone(), zero),
                    None => {
                        owned.push((owner.to_string(), DynamicRecord::new().with(&field.name, zero)))
                    }
                },
            }
        }
        for (owner, nested) in owned {
            record.insert(owner, Value::Object(nested));
        }
        record
    }
}

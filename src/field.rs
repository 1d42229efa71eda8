//! Field specifications and location expressions

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::record_config::Culture;
use crate::value::{FieldType, Record, Value};

/// Cached regex for canonical single-field locations (`Name`, `//Name`, `./@Name`, ...)
static CANONICAL_LOCATION_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_canonical_location_regex() -> &'static Regex {
    CANONICAL_LOCATION_REGEX.get_or_init(|| {
        Regex::new(r"^(?:|/|//|\./)(@?)([^/@|\[\]()\s]+)$")
            .expect("Failed to compile canonical location regex")
    })
}

/// Record-level and field-level failure policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    ThrowAndStop,
    #[default]
    ReportAndContinue,
    IgnoreAndContinue,
}

/// Padding direction for sized fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    #[default]
    None,
    Left,
    Right,
}

/// Where a field lives relative to its node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// `//Name|//@Name`: anywhere as element or attribute; written as an element
    Anywhere(String),
    Element(String),
    Attribute(String),
    /// `text()`: the node's own text content
    Text,
    /// Any other expression
    Complex(String),
}

impl Location {
    /// Default location for a field without a declared one
    pub fn anywhere(name: &str) -> Self {
        Location::Anywhere(name.to_string())
    }

    /// Parse a location expression for `field_name`
    pub fn parse(expr: &str, field_name: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() {
            return Location::anywhere(field_name);
        }
        if expr == "text()" {
            return Location::Text;
        }
        if expr == format!("//{0}|//@{0}", field_name) {
            return Location::Anywhere(field_name.to_string());
        }
        // A bare `@Name` has no axis and is not a canonical form
        if !expr.starts_with('@')
            && let Some(caps) = get_canonical_location_regex().captures(expr)
        {
            let name = caps[2].to_string();
            if name == field_name {
                return if caps[1].is_empty() {
                    Location::Element(name)
                } else {
                    Location::Attribute(name)
                };
            }
        }
        Location::Complex(expr.to_string())
    }

    pub fn is_attribute(&self) -> bool {
        match self {
            Location::Attribute(_) => true,
            Location::Complex(expr) => expr
                .rsplit('/')
                .next()
                .map(|step| step.starts_with('@'))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Canonical single-field forms keep the simple-path fast mode available.
    /// Anything only partially matching is treated as complex.
    pub fn is_complex(&self) -> bool {
        matches!(self, Location::Complex(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Anywhere(name) => write!(f, "//{0}|//@{0}", name),
            Location::Element(name) => write!(f, "//{}", name),
            Location::Attribute(name) => write!(f, "//@{}", name),
            Location::Text => write!(f, "text()"),
            Location::Complex(expr) => write!(f, "{}", expr),
        }
    }
}

/// Context handed to fallback and default providers
pub struct FieldContext<'a> {
    pub field_name: &'a str,
    pub record: &'a dyn Record,
    pub culture: &'a Culture,
    pub index: u64,
}

/// Per-field value transform
pub type ValueConverter = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Per-field substitute-value provider; `None` means not found
pub type ValueProvider = Arc<dyn Fn(&FieldContext<'_>) -> Option<Value> + Send + Sync>;

/// Per-field member validator
pub type MemberValidator = Arc<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// Resolved description of one serializable field
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    /// Dotted path to the sub-object holding this field
    pub owner: Option<String>,
    /// Declared location expression; `None` until resolution fills it
    pub location: Option<String>,
    pub is_attribute: Option<bool>,
    pub is_array: Option<bool>,
    pub is_nullable: bool,
    pub field_type: FieldType,
    pub size: Option<usize>,
    pub truncate: bool,
    pub quote: Option<bool>,
    pub justification: Justification,
    pub fill_char: Option<char>,
    pub default_value: Option<Value>,
    pub converter: Option<ValueConverter>,
    pub fallback: Option<ValueProvider>,
    pub default_provider: Option<ValueProvider>,
    pub validators: Vec<MemberValidator>,
    pub error_mode: Option<ErrorMode>,
    pub encode: Option<bool>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("location", &self.location)
            .field("is_attribute", &self.is_attribute)
            .field("is_array", &self.is_array)
            .field("is_nullable", &self.is_nullable)
            .field("field_type", &self.field_type)
            .field("size", &self.size)
            .field("truncate", &self.truncate)
            .field("quote", &self.quote)
            .field("justification", &self.justification)
            .field("fill_char", &self.fill_char)
            .field("default_value", &self.default_value)
            .field("has_converter", &self.converter.is_some())
            .field("validators", &self.validators.len())
            .field("error_mode", &self.error_mode)
            .field("encode", &self.encode)
            .finish()
    }
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            location: None,
            is_attribute: None,
            is_array: None,
            is_nullable: false,
            field_type: FieldType::Unknown,
            size: None,
            truncate: false,
            quote: None,
            justification: Justification::None,
            fill_char: None,
            default_value: None,
            converter: None,
            fallback: None,
            default_provider: None,
            validators: Vec::new(),
            error_mode: None,
            encode: None,
        }
    }

    /// Field written as `name="value"` on the node
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        let location = format!("//@{}", name);
        Self::new(name).with_location(location)
    }

    /// Field written as a child element
    pub fn element(name: impl Into<String>) -> Self {
        let name = name.into();
        let location = format!("//{}", name);
        Self::new(name).with_location(location)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = Some(true);
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub fn quoted(mut self, quote: bool) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn justify(mut self, justification: Justification) -> Self {
        self.justification = justification;
        self
    }

    pub fn fill(mut self, fill_char: char) -> Self {
        self.fill_char = Some(fill_char);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    pub fn with_fallback<F>(mut self, provider: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(provider));
        self
    }

    pub fn with_default_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        self.default_provider = Some(Arc::new(provider));
        self
    }

    pub fn with_validator(mut self, validator: MemberValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = Some(mode);
        self
    }

    pub fn encoded(mut self, encode: bool) -> Self {
        self.encode = Some(encode);
        self
    }

    /// Parsed location; the default when none was declared
    pub fn parsed_location(&self) -> Location {
        match &self.location {
            Some(expr) => Location::parse(expr, &self.name),
            None => Location::anywhere(&self.name),
        }
    }

    pub fn is_attribute(&self) -> bool {
        self.is_attribute
            .unwrap_or_else(|| self.parsed_location().is_attribute())
    }

    pub fn is_text(&self) -> bool {
        self.parsed_location() == Location::Text
    }

    pub fn is_array(&self) -> bool {
        self.is_array.unwrap_or(false)
    }

    /// Element or attribute name written for this field
    pub fn tag_name(&self) -> &str {
        &self.name
    }

    /// Fill character, defaulting to a space
    pub fn fill_char(&self) -> char {
        self.fill_char.unwrap_or(' ')
    }

    /// Checks run on every field once resolution has filled its gaps
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("field name can't be empty".to_string());
        }
        if self.size == Some(0) {
            return Err("size must be greater than 0".to_string());
        }
        if self.is_attribute() && self.is_array() {
            return Err("an attribute can't hold an array".to_string());
        }
        Ok(())
    }
}

//! Field metadata provider
//!
//! Supplies ordered field descriptors for the first record of a stream so
//! the resolver can build a topology from it.

use crate::value::{FieldType, Record};

/// One field as declared by a record's shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Dotted path to the sub-object that holds this field
    pub owner: Option<String>,
    /// Declared location expression; descriptors that carry one opt the
    /// record into declared-only discovery
    pub location: Option<String>,
    pub nullable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Runtime shape of a record, as seen by the resolver
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordShape {
    /// Declared schema name
    pub name: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    pub dynamic: bool,
}

impl RecordShape {
    /// Descriptors that declare an explicit location
    pub fn declared(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.location.is_some())
    }

    pub fn has_declared_locations(&self) -> bool {
        self.declared().next().is_some()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Trait for abstracting how field descriptors are obtained
pub trait FieldMetadataProvider {
    fn describe_fields(&self, sample: &dyn Record) -> RecordShape;
}

/// Default provider: asks the record to describe itself
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordShapeProvider;

impl FieldMetadataProvider for RecordShapeProvider {
    fn describe_fields(&self, sample: &dyn Record) -> RecordShape {
        RecordShape {
            name: sample.record_name(),
            fields: sample.describe(),
            dynamic: sample.is_dynamic(),
        }
    }
}

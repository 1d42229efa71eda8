//! Topology resolution
//!
//! Turns a partially specified [`RecordConfiguration`] into its final form:
//! a duplicate-free field list, an attribute-first field index and the
//! document topology. Resolution runs once; later calls are no-ops.

use std::collections::HashMap;
use tracing::debug;

use crate::error::ConfigurationError;
use crate::field::{FieldSpec, Location};
use crate::metadata::{FieldDescriptor, RecordShape};
use crate::record_config::{FieldIndex, RecordConfiguration};
use crate::sample::SampleNode;
use crate::topology::{
    DEFAULT_NODE_NAME, DEFAULT_ROOT_NAME, DocumentTopology, encode_name, pluralize,
};
use crate::value::FieldType;

/// What resolution may learn field names from
#[derive(Debug, Clone, Copy, Default)]
pub enum ResolveHint<'a> {
    #[default]
    None,
    /// Flat list of field names
    FieldNames(&'a [String]),
    /// A sampled element
    Sample(&'a SampleNode),
    /// Runtime shape of the first record
    Shape(&'a RecordShape),
}

impl<'a> ResolveHint<'a> {
    fn declared_name(&self) -> Option<(&'a str, bool)> {
        match *self {
            ResolveHint::Shape(shape) => shape.name.as_deref().map(|n| (n, shape.dynamic)),
            ResolveHint::Sample(sample) => Some((sample.name.as_str(), false)),
            _ => None,
        }
    }
}

/// Resolve `config` in place
pub fn resolve(
    config: &mut RecordConfiguration,
    hint: ResolveHint<'_>,
) -> Result<(), ConfigurationError> {
    if config.resolved {
        return Ok(());
    }

    let mut topology = resolve_names(config, &hint);

    let mut fields = config.fields.clone();
    let mut complex = false;
    if fields.is_empty() {
        if config.auto_discover {
            fields = discover_fields(&hint)?;
        }
    } else {
        complex = fill_declared_fields(&mut fields, &hint);
    }

    if fields.is_empty() {
        return Err(ConfigurationError::NoFieldsResolved);
    }

    for field in &fields {
        field
            .check()
            .map_err(|reason| ConfigurationError::InvalidField {
                name: field.name.clone(),
                reason,
            })?;
    }
    check_duplicates(&fields)?;

    config.index = FieldIndex::build(&fields);
    config.fields = fields;
    config.uses_complex_location = complex;

    topology.namespaces = config.namespaces.clone();
    if config.needs_schema_instance() {
        topology.namespaces.ensure_schema_instance();
    }
    config.topology = topology;
    config.resolved = true;

    debug!(
        root = ?config.topology.root_name,
        node = %config.topology.node_name,
        fields = config.fields.len(),
        complex_location = config.uses_complex_location,
        "Resolved record topology"
    );
    Ok(())
}

/// Meaningful segments of a path hint
fn path_segments(location: &str) -> Vec<&str> {
    location
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !matches!(*s, "." | ".." | "*"))
        .collect()
}

fn non_blank(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn resolve_names(config: &RecordConfiguration, hint: &ResolveHint<'_>) -> DocumentTopology {
    let mut root: Option<String>;
    let mut node: Option<String>;

    match non_blank(config.location.as_deref()) {
        Some(location) => {
            let segments = path_segments(&location);
            root = segments.first().map(|s| s.to_string());
            node = segments.get(1).map(|s| s.to_string());
        }
        None => {
            node = non_blank(config.node_name.as_deref());
            root = non_blank(config.root_name.as_deref());
            if let Some((declared, dynamic)) = hint.declared_name() {
                if !dynamic || node.is_none() {
                    node = node.or_else(|| Some(declared.to_string()));
                }
                if !dynamic && !config.embedded && root.is_none() {
                    root = node.as_deref().map(pluralize);
                }
            }
        }
    }

    if config.embedded {
        root = None;
    } else if root.is_none() {
        root = Some(DEFAULT_ROOT_NAME.to_string());
    }

    if root.is_some() && node.is_none() {
        node = root.take();
    }

    let node_name = node.unwrap_or_else(|| DEFAULT_NODE_NAME.to_string());
    DocumentTopology {
        root_name: root.map(|r| encode_name(&r)),
        node_name: encode_name(&node_name),
        namespaces: Default::default(),
    }
}

/// Fill gaps in explicitly declared fields; returns whether any location is complex
fn fill_declared_fields(fields: &mut [FieldSpec], hint: &ResolveHint<'_>) -> bool {
    let shape = match hint {
        ResolveHint::Shape(shape) => Some(*shape),
        _ => None,
    };

    let mut complex = false;
    for field in fields.iter_mut() {
        if let Some(descriptor) = shape.and_then(|s| s.descriptor(&field.name)) {
            if field.field_type == FieldType::Unknown {
                field.field_type = descriptor.field_type;
            }
            if field.owner.is_none() {
                field.owner = descriptor.owner.clone();
            }
            field.is_nullable |= descriptor.nullable;
        }
        if field.is_array.is_none() {
            field.is_array = Some(field.field_type.is_collection());
        }
        match field.location.as_deref().map(str::trim) {
            None | Some("") => {
                field.location = Some(Location::anywhere(&field.name).to_string());
            }
            Some(_) => complex |= field.parsed_location().is_complex(),
        }
    }
    complex
}

fn discover_fields(hint: &ResolveHint<'_>) -> Result<Vec<FieldSpec>, ConfigurationError> {
    match hint {
        ResolveHint::Shape(shape) => Ok(from_shape(shape)),
        ResolveHint::Sample(sample) => from_sample(sample),
        ResolveHint::FieldNames(names) => Ok(names
            .iter()
            .map(|name| FieldSpec::element(name.clone()))
            .collect()),
        ResolveHint::None => Ok(Vec::new()),
    }
}

/// Descriptors with declared locations opt the shape into declared-only discovery
fn from_shape(shape: &RecordShape) -> Vec<FieldSpec> {
    let declared_only = shape.has_declared_locations();
    shape
        .fields
        .iter()
        .filter(|d| !declared_only || d.location.is_some())
        .map(from_descriptor)
        .collect()
}

fn from_descriptor(descriptor: &FieldDescriptor) -> FieldSpec {
    let mut spec = FieldSpec::new(descriptor.name.clone()).with_type(descriptor.field_type);
    spec.location = Some(match &descriptor.location {
        Some(location) => location.clone(),
        None => Location::anywhere(&descriptor.name).to_string(),
    });
    spec.owner = descriptor.owner.clone();
    spec.is_nullable = descriptor.nullable;
    spec.is_array = Some(descriptor.field_type.is_collection());
    spec
}

/// One field per distinct attribute, one per distinct child element;
/// repeated children become a single array field
fn from_sample(sample: &SampleNode) -> Result<Vec<FieldSpec>, ConfigurationError> {
    let mut fields: Vec<FieldSpec> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    // Sampled names are compared case-insensitively
    for (name, _) in &sample.attributes {
        let key = name.to_lowercase();
        if seen.contains_key(&key) {
            return Err(ConfigurationError::DuplicateDiscoveredName { name: name.clone() });
        }
        seen.insert(key, fields.len());
        fields.push(FieldSpec::attribute(name.clone()));
    }

    for child in &sample.children {
        let key = child.name.to_lowercase();
        match seen.get(&key) {
            Some(&position) => {
                let existing = &mut fields[position];
                if existing.is_attribute() {
                    return Err(ConfigurationError::DuplicateField {
                        names: vec![child.name.clone()],
                    });
                }
                existing.is_array = Some(true);
            }
            None => {
                seen.insert(key, fields.len());
                fields.push(FieldSpec::element(child.name.clone()));
            }
        }
    }

    if sample.children.is_empty() {
        let local = sample
            .name
            .rsplit(':')
            .next()
            .unwrap_or(sample.name.as_str());
        fields.push(FieldSpec::new(local).with_location("text()"));
    }
    Ok(fields)
}

fn check_duplicates(fields: &[FieldSpec]) -> Result<(), ConfigurationError> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for field in fields {
        match counts.iter_mut().find(|(name, _)| *name == field.name) {
            Some((_, count)) => *count += 1,
            None => counts.push((field.name.as_str(), 1)),
        }
    }
    let names: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(ConfigurationError::DuplicateField { names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::XSI_NAMESPACE;

    fn shape(name: Option<&str>, dynamic: bool, fields: Vec<FieldDescriptor>) -> RecordShape {
        RecordShape {
            name: name.map(str::to_string),
            fields,
            dynamic,
        }
    }

    #[test]
    fn test_explicit_fields_get_default_locations() {
        let mut config = RecordConfiguration::new()
            .with_root_name("Items")
            .with_node_name("Item")
            .with_field(FieldSpec::new("Name"))
            .with_field(FieldSpec::new("Tags").with_type(FieldType::Array));
        resolve(&mut config, ResolveHint::None).unwrap();

        let name = config.field("Name").unwrap();
        assert_eq!(name.location.as_deref(), Some("//Name|//@Name"));
        assert!(!name.is_attribute());
        assert!(config.field("Tags").unwrap().is_array());
        assert!(!config.uses_complex_location());
    }

    #[test]
    fn test_complex_location_is_flagged() {
        let mut config = RecordConfiguration::new()
            .with_field(FieldSpec::attribute("Id"))
            .with_field(FieldSpec::new("Name").with_location("//Order/Name"));
        resolve(&mut config, ResolveHint::None).unwrap();
        assert!(config.uses_complex_location());

        let mut canonical = RecordConfiguration::new()
            .with_field(FieldSpec::new("Id").with_location("./@Id"))
            .with_field(FieldSpec::new("Name").with_location("Name"));
        resolve(&mut canonical, ResolveHint::None).unwrap();
        assert!(!canonical.uses_complex_location());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut config = RecordConfiguration::new()
            .with_field(FieldSpec::element("Name"))
            .with_field(FieldSpec::attribute("Id"));
        resolve(&mut config, ResolveHint::None).unwrap();
        let first_order: Vec<String> = config.ordered_fields().map(|f| f.name.clone()).collect();
        let first_topology = config.topology().unwrap().clone();

        let other_names = vec!["Other".to_string()];
        resolve(&mut config, ResolveHint::FieldNames(&other_names)).unwrap();
        let second_order: Vec<String> = config.ordered_fields().map(|f| f.name.clone()).collect();

        assert_eq!(first_order, vec!["Id", "Name"]);
        assert_eq!(first_order, second_order);
        assert_eq!(&first_topology, config.topology().unwrap());
    }

    #[test]
    fn test_sample_discovery_merges_repeated_children() {
        let sample = SampleNode::new("Product")
            .with_attribute("Code", "P1")
            .with_child(SampleNode::new("Tag").with_text("a"))
            .with_child(SampleNode::new("Tag").with_text("b"));
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Sample(&sample)).unwrap();

        assert_eq!(config.fields().len(), 2);
        let code = config.field("Code").unwrap();
        assert!(code.is_attribute());
        let tag = config.field("Tag").unwrap();
        assert!(!tag.is_attribute());
        assert!(tag.is_array());
    }

    #[test]
    fn test_sample_name_as_both_attribute_and_element_fails() {
        let sample = SampleNode::new("Row")
            .with_attribute("X", "1")
            .with_child(SampleNode::new("X"));
        let mut config = RecordConfiguration::new();
        let err = resolve(&mut config, ResolveHint::Sample(&sample)).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateField {
                names: vec!["X".to_string()]
            }
        );
        assert!(!config.is_resolved());
    }

    #[test]
    fn test_sample_names_ignore_case() {
        let sample = SampleNode::new("Row")
            .with_child(SampleNode::new("Tag"))
            .with_child(SampleNode::new("tag"));
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Sample(&sample)).unwrap();
        assert_eq!(config.fields().len(), 1);
        assert_eq!(config.fields()[0].name, "Tag");
        assert!(config.fields()[0].is_array());

        let clash = SampleNode::new("Row")
            .with_attribute("Code", "1")
            .with_child(SampleNode::new("code"));
        let mut config = RecordConfiguration::new();
        assert!(matches!(
            resolve(&mut config, ResolveHint::Sample(&clash)),
            Err(ConfigurationError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_duplicate_sample_attribute_fails() {
        let sample = SampleNode::new("Row")
            .with_attribute("A", "1")
            .with_attribute("A", "2");
        let mut config = RecordConfiguration::new();
        assert!(matches!(
            resolve(&mut config, ResolveHint::Sample(&sample)),
            Err(ConfigurationError::DuplicateDiscoveredName { .. })
        ));
    }

    #[test]
    fn test_leaf_sample_yields_text_field() {
        let sample = SampleNode::new("p:Price").with_text("12");
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Sample(&sample)).unwrap();

        assert_eq!(config.fields().len(), 1);
        let field = &config.fields()[0];
        assert_eq!(field.name, "Price");
        assert!(field.is_text());
    }

    #[test]
    fn test_no_fields_is_an_error() {
        let mut config = RecordConfiguration::new();
        assert_eq!(
            resolve(&mut config, ResolveHint::None),
            Err(ConfigurationError::NoFieldsResolved)
        );

        let mut disabled = RecordConfiguration::new().with_auto_discover(false);
        let names = vec!["A".to_string()];
        assert_eq!(
            resolve(&mut disabled, ResolveHint::FieldNames(&names)),
            Err(ConfigurationError::NoFieldsResolved)
        );
    }

    #[test]
    fn test_duplicate_explicit_fields() {
        let mut config = RecordConfiguration::new()
            .with_field(FieldSpec::element("A"))
            .with_field(FieldSpec::attribute("A"));
        assert!(matches!(
            resolve(&mut config, ResolveHint::None),
            Err(ConfigurationError::DuplicateField { names }) if names == vec!["A".to_string()]
        ));
    }

    #[test]
    fn test_typed_shape_names_node_and_plural_root() {
        let shape = shape(
            Some("Category"),
            false,
            vec![FieldDescriptor::new("Id", FieldType::Int)],
        );
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Shape(&shape)).unwrap();

        let topology = config.topology().unwrap();
        assert_eq!(topology.root_name.as_deref(), Some("Categories"));
        assert_eq!(topology.node_name, "Category");
    }

    #[test]
    fn test_location_hint_names_root_and_node() {
        let names = vec!["A".to_string()];
        let mut config = RecordConfiguration::new().with_location("//Orders/./Order");
        resolve(&mut config, ResolveHint::FieldNames(&names)).unwrap();

        let topology = config.topology().unwrap();
        assert_eq!(topology.root_name.as_deref(), Some("Orders"));
        assert_eq!(topology.node_name, "Order");
    }

    #[test]
    fn test_single_segment_location_becomes_node_without_root() {
        let names = vec!["A".to_string()];
        let mut config = RecordConfiguration::new().with_location("/Entry");
        resolve(&mut config, ResolveHint::FieldNames(&names)).unwrap();

        let topology = config.topology().unwrap();
        assert_eq!(topology.root_name, None);
        assert_eq!(topology.node_name, "Entry");
    }

    #[test]
    fn test_names_are_entity_encoded() {
        let names = vec!["A".to_string()];
        let mut config = RecordConfiguration::new()
            .with_root_name("R&D")
            .with_node_name("Item");
        resolve(&mut config, ResolveHint::FieldNames(&names)).unwrap();
        assert_eq!(
            config.topology().unwrap().root_name.as_deref(),
            Some("R&amp;D")
        );
    }

    #[test]
    fn test_declared_locations_opt_in() {
        let shape = shape(
            Some("Order"),
            false,
            vec![
                FieldDescriptor::new("Id", FieldType::Int).with_location("//@Id"),
                FieldDescriptor::new("Internal", FieldType::Text),
                FieldDescriptor::new("Note", FieldType::Text)
                    .with_location("//Note")
                    .nullable(),
            ],
        );
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Shape(&shape)).unwrap();

        let names: Vec<_> = config.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "Note"]);
        let topology = config.topology().unwrap();
        assert_eq!(topology.namespaces.uri_for("xsi"), Some(XSI_NAMESPACE));
    }

    #[test]
    fn test_shape_fills_gaps_in_explicit_fields() {
        let shape = shape(
            None,
            true,
            vec![
                FieldDescriptor::new("City", FieldType::Text).with_owner("Address"),
                FieldDescriptor::new("Lines", FieldType::Array),
            ],
        );
        let mut config = RecordConfiguration::new()
            .with_root_name("People")
            .with_node_name("Person")
            .with_field(FieldSpec::new("City"))
            .with_field(FieldSpec::new("Lines"));
        resolve(&mut config, ResolveHint::Shape(&shape)).unwrap();

        assert_eq!(config.field("City").unwrap().owner.as_deref(), Some("Address"));
        assert!(config.field("Lines").unwrap().is_array());
    }

    #[test]
    fn test_embedded_configuration_has_no_root() {
        let parent = RecordConfiguration::new();
        let mut child = parent.derive_child("Line");
        let names = vec!["Sku".to_string()];
        resolve(&mut child, ResolveHint::FieldNames(&names)).unwrap();

        let topology = child.topology().unwrap();
        assert_eq!(topology.root_name, None);
        assert_eq!(topology.node_name, "Line");
    }

    #[test]
    fn test_dynamic_records_without_hints_use_placeholder() {
        let shape = shape(None, true, vec![FieldDescriptor::new("A", FieldType::Int)]);
        let mut config = RecordConfiguration::new();
        resolve(&mut config, ResolveHint::Shape(&shape)).unwrap();

        let topology = config.topology().unwrap();
        assert_eq!(topology.root_name, None);
        assert_eq!(topology.node_name, DEFAULT_ROOT_NAME);
    }
}

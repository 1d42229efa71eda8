//! Topology resolution through the public API

use xml_record_writer::{
    ConfigurationError, FieldMetadataProvider, RecordConfiguration, RecordShapeProvider,
    ResolveHint, SampleNode, StreamState, XmlRecordWriter, resolve,
};

use crate::common::mocks::Order;

#[test]
fn test_sample_snippet_discovers_attribute_and_array() {
    let sample =
        SampleNode::from_xml(r#"<Product Code="P1"><Tag>a</Tag><Tag>b</Tag></Product>"#).unwrap();
    let mut config = RecordConfiguration::new();
    resolve(&mut config, ResolveHint::Sample(&sample)).unwrap();

    let names: Vec<&str> = config.ordered_fields().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Code", "Tag"]);
    assert!(config.field("Code").unwrap().is_attribute());
    assert!(config.field("Tag").unwrap().is_array());

    let topology = config.topology().unwrap();
    assert_eq!(topology.root_name.as_deref(), Some("Products"));
    assert_eq!(topology.node_name, "Product");
}

#[test]
fn test_sample_snippet_with_clashing_names_is_rejected() {
    let sample = SampleNode::from_xml(r#"<Row X="1"><X>2</X></Row>"#).unwrap();
    let mut config = RecordConfiguration::new();

    let err = resolve(&mut config, ResolveHint::Sample(&sample)).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateField {
            names: vec!["X".to_string()]
        }
    );
}

#[test]
fn test_typed_record_shape_resolves_plural_root() {
    let shape = RecordShapeProvider.describe_fields(&Order::sample(1));
    let mut config = RecordConfiguration::new();
    resolve(&mut config, ResolveHint::Shape(&shape)).unwrap();

    let topology = config.topology().unwrap();
    assert_eq!(topology.root_name.as_deref(), Some("Orders"));
    assert_eq!(topology.node_name, "Order");

    let first = config.ordered_fields().next().unwrap();
    assert_eq!(first.name, "Id");
    assert!(first.is_attribute());
    assert!(config.needs_schema_instance());
}

#[test]
fn test_writer_resolution_is_idempotent() {
    let names = vec!["A".to_string(), "B".to_string()];
    let mut writer = XmlRecordWriter::new(Vec::new(), RecordConfiguration::new().compact());
    writer.resolve(ResolveHint::FieldNames(&names)).unwrap();
    assert_eq!(writer.state(), StreamState::TopologyResolved);

    let other = vec!["C".to_string()];
    writer.resolve(ResolveHint::FieldNames(&other)).unwrap();

    let resolved: Vec<&str> = writer
        .config()
        .fields()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(resolved, vec!["A", "B"]);
}

#[test]
fn test_nothing_to_learn_from_is_an_error() {
    let mut config = RecordConfiguration::new();
    assert_eq!(
        resolve(&mut config, ResolveHint::None),
        Err(ConfigurationError::NoFieldsResolved)
    );
    assert!(!config.is_resolved());
}

//! Settings files driving a real write

use xml_record_writer::{ConfigManager, DynamicRecord, XmlRecordWriter};

use crate::common::test_helpers::TestWorkspace;

const SETTINGS: &str = r#"
[document]
root = "Items"
node = "Item"
indent = 0
eol = ""

[[fields]]
name = "Id"
attribute = true

[[fields]]
name = "Code"
size = 5
justify = "right"
fill = "0"
"#;

#[tokio::test]
async fn test_toml_settings_shape_the_document() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("writer.toml", SETTINGS);

    let settings = ConfigManager::load_from_file(&path).await.unwrap();
    ConfigManager::validate_config(&settings).unwrap();

    let mut writer = XmlRecordWriter::new(Vec::new(), settings.into_record_configuration().unwrap());
    writer
        .write_all(vec![DynamicRecord::new().with("Id", 1).with("Code", "42")])
        .unwrap();

    assert_eq!(
        String::from_utf8(writer.into_inner()).unwrap(),
        r#"<Items><Item Id="1"><Code>00042</Code></Item></Items>"#
    );
}

#[tokio::test]
async fn test_json_settings_with_declaration_and_tabs() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "writer.json",
        r#"{
            "document": { "root": "Rows", "node": "Row", "indent": 1, "indent_char": "\t", "xml_declaration": true },
            "fields": [ { "name": "Name" } ]
        }"#,
    );

    let settings = ConfigManager::load_from_file(&path).await.unwrap();
    let mut writer = XmlRecordWriter::new(Vec::new(), settings.into_record_configuration().unwrap());
    writer
        .write_all(vec![DynamicRecord::new().with("Name", "A")])
        .unwrap();

    assert_eq!(
        String::from_utf8(writer.into_inner()).unwrap(),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Rows>\n\t<Row>\n\t\t<Name>A</Name>\n\t</Row>\n</Rows>"
    );
}

#[tokio::test]
async fn test_rejected_settings_never_reach_the_writer() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "writer.toml",
        r#"
[[fields]]
name = "Code"
size = 0
"#,
    );

    let settings = ConfigManager::load_from_file(&path).await.unwrap();
    let err = ConfigManager::validate_config(&settings).unwrap_err();
    assert!(err.to_string().contains("Code"));
}

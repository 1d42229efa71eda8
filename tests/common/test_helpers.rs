use std::path::PathBuf;
use tempfile::TempDir;

use xml_record_writer::{
    DynamicRecord, FieldSpec, Record, RecordConfiguration, WriteObserver, WriteSummary,
    WriterError, XmlRecordWriter,
};

/// Root `Items`, node `Item`, `Id` attribute and `Name` element, no whitespace
pub fn items_config() -> RecordConfiguration {
    RecordConfiguration::new()
        .with_root_name("Items")
        .with_node_name("Item")
        .with_field(FieldSpec::attribute("Id"))
        .with_field(FieldSpec::element("Name"))
        .compact()
}

pub fn item(id: i64, name: &str) -> DynamicRecord {
    DynamicRecord::new().with("Id", id).with("Name", name)
}

/// Write `records` into memory; the document text is returned even on failure
pub fn write_document<R: Record>(
    config: RecordConfiguration,
    records: Vec<R>,
) -> (String, Result<WriteSummary, WriterError>) {
    let mut writer = XmlRecordWriter::new(Vec::new(), config);
    let result = writer.write_all(records);
    (String::from_utf8(writer.into_inner()).unwrap(), result)
}

/// Same as [`write_document`] with an observer, which is handed back
pub fn write_observed<R: Record, O: WriteObserver>(
    config: RecordConfiguration,
    records: Vec<R>,
    observer: O,
) -> (String, Result<WriteSummary, WriterError>, O) {
    let mut writer = XmlRecordWriter::with_observer(Vec::new(), config, observer);
    let result = writer.write_all(records);
    let (sink, observer) = writer.into_parts();
    (String::from_utf8(sink).unwrap(), result, observer)
}

/// Temporary directory holding input and settings files for binary tests
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

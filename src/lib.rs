//! # xml-record-writer Library
//!
//! Streams a sequence of records into one well-formed XML document. The
//! document topology (root and node names, field placement, namespaces) is
//! resolved once, lazily, from the first record or an explicit hint, and each
//! record is rendered and written before the next one is pulled.
//!
//! ```
//! use xml_record_writer::{DynamicRecord, FieldSpec, RecordConfiguration, XmlRecordWriter};
//!
//! let config = RecordConfiguration::new()
//!     .with_root_name("Items")
//!     .with_node_name("Item")
//!     .with_field(FieldSpec::attribute("Id"))
//!     .with_field(FieldSpec::element("Name"))
//!     .compact();
//!
//! let mut writer = XmlRecordWriter::new(Vec::new(), config);
//! writer
//!     .write_all(vec![
//!         DynamicRecord::new().with("Id", 1).with("Name", "A"),
//!         DynamicRecord::new().with("Id", 2).with("Name", "B"),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(writer.into_inner()).unwrap(),
//!     r#"<Items><Item Id="1"><Name>A</Name></Item><Item Id="2"><Name>B</Name></Item></Items>"#
//! );
//! ```

pub mod cli;
pub mod config;
pub mod emitter;
pub mod encoder;
pub mod error;
pub mod error_reporter;
pub mod field;
pub mod fragment;
pub mod hooks;
pub mod metadata;
pub mod normalize;
pub mod output;
pub mod record_config;
pub mod resolver;
pub mod sample;
pub mod topology;
pub mod validation;
pub mod value;

pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use emitter::{RecordStream, StreamState, WriteSummary, XmlRecordWriter};
pub use encoder::{RecordEncoder, render_record};
pub use error::{ConfigurationError, Result, WriterError};
pub use error_reporter::ErrorReporter;
pub use field::{ErrorMode, FieldContext, FieldSpec, Justification, Location, MemberValidator};
pub use fragment::{Element, Node};
pub use hooks::{NoopObserver, RecordAction, WriteObserver};
pub use metadata::{FieldDescriptor, FieldMetadataProvider, RecordShape, RecordShapeProvider};
pub use normalize::{NormalizeOptions, normalize};
pub use output::Output;
pub use record_config::{
    Culture, NullValueHandling, ObjectValidator, RecordConfiguration, RenderContext,
    ValidationScope,
};
pub use resolver::{ResolveHint, resolve};
pub use sample::SampleNode;
pub use topology::{DocumentTopology, NamespaceTable};
pub use value::{DynamicRecord, FieldType, Record, Value};

use crate::cli::{Cli, OutputFormat};
use crate::field::{ErrorMode, FieldSpec, Justification};
use crate::record_config::{Culture, NullValueHandling, RecordConfiguration, ValidationScope};
use crate::value::FieldType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_INDENT: usize = 16;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Writer settings as read from a settings file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub policy: PolicyConfig,
    pub culture: Culture,
    pub namespaces: Vec<NamespaceConfig>,
    pub fields: Vec<FieldConfig>,
    pub output: OutputConfig,
}

/// Document shape and formatting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    pub root: Option<String>,
    pub node: Option<String>,
    /// Path hint such as `//Items/Item`
    pub location: Option<String>,
    pub indent: usize,
    /// A single space or tab
    pub indent_char: String,
    pub eol: String,
    pub xml_declaration: bool,
    pub xml_version: String,
    pub encoding: String,
}

/// Failure, null and progress policies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    pub null_handling: NullValueHandling,
    pub error_mode: ErrorMode,
    pub validation_scope: ValidationScope,
    pub strict_column_count: bool,
    pub strict_missing_fields: bool,
    /// Progress notification interval; 0 disables it
    pub notify_after: u64,
    pub auto_discover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceConfig {
    pub prefix: String,
    pub uri: String,
}

/// One explicitly declared field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FieldConfig {
    pub name: String,
    pub location: Option<String>,
    /// Shorthand for an attribute location when `location` is absent
    pub attribute: bool,
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub nullable: bool,
    pub array: bool,
    pub size: Option<usize>,
    pub truncate: bool,
    pub quote: Option<bool>,
    pub justify: Justification,
    pub fill: Option<String>,
    pub default: Option<String>,
    pub encode: Option<bool>,
    pub error_mode: Option<ErrorMode>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            root: None,
            node: None,
            location: None,
            indent: 2,
            indent_char: " ".to_string(),
            eol: "\n".to_string(),
            xml_declaration: false,
            xml_version: "1.0".to_string(),
            encoding: "utf-8".to_string(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            null_handling: NullValueHandling::Ignore,
            error_mode: ErrorMode::ReportAndContinue,
            validation_scope: ValidationScope::None,
            strict_column_count: false,
            strict_missing_fields: false,
            notify_after: 0,
            auto_discover: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

fn normalized_keyword(value: &str) -> String {
    value.trim().to_lowercase().replace('-', "_")
}

/// Parse a null-handling keyword (`ignore`, `substitute_default_instance`, `emit_nil_marker`)
pub fn parse_null_handling(value: &str) -> std::result::Result<NullValueHandling, String> {
    match normalized_keyword(value).as_str() {
        "ignore" => Ok(NullValueHandling::Ignore),
        "substitute_default_instance" | "default" => Ok(NullValueHandling::SubstituteDefaultInstance),
        "emit_nil_marker" | "nil" => Ok(NullValueHandling::EmitNilMarker),
        _ => Err(format!("unknown null handling '{}'", value)),
    }
}

/// Parse an error-mode keyword (`throw_and_stop`, `report_and_continue`, `ignore_and_continue`)
pub fn parse_error_mode(value: &str) -> std::result::Result<ErrorMode, String> {
    match normalized_keyword(value).as_str() {
        "throw_and_stop" | "throw" => Ok(ErrorMode::ThrowAndStop),
        "report_and_continue" | "report" => Ok(ErrorMode::ReportAndContinue),
        "ignore_and_continue" | "ignore" => Ok(ErrorMode::IgnoreAndContinue),
        _ => Err(format!("unknown error mode '{}'", value)),
    }
}

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl FieldConfig {
    pub fn to_field_spec(&self) -> Result<FieldSpec> {
        let mut spec = match &self.location {
            Some(location) => FieldSpec::new(self.name.clone()).with_location(location.clone()),
            None if self.attribute => FieldSpec::attribute(self.name.clone()),
            None => FieldSpec::new(self.name.clone()),
        };

        if let Some(field_type) = self.field_type {
            spec = spec.with_type(field_type);
        }
        if let Some(owner) = &self.owner {
            spec = spec.with_owner(owner.clone());
        }
        if self.nullable {
            spec = spec.nullable();
        }
        if self.array {
            spec = spec.array();
        }
        if let Some(size) = self.size {
            spec = spec.with_size(size);
        }
        if self.truncate {
            spec = spec.truncate();
        }
        if let Some(quote) = self.quote {
            spec = spec.quoted(quote);
        }
        spec = spec.justify(self.justify);
        if let Some(fill) = &self.fill {
            let fill = single_char(fill).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Fill for field '{}' must be a single character",
                    self.name
                ))
            })?;
            spec = spec.fill(fill);
        }
        if let Some(default) = &self.default {
            spec = spec.with_default(default.clone());
        }
        if let Some(encode) = self.encode {
            spec = spec.encoded(encode);
        }
        if let Some(mode) = self.error_mode {
            spec = spec.with_error_mode(mode);
        }
        Ok(spec)
    }
}

impl Config {
    /// Build the unresolved writer configuration these settings describe
    pub fn into_record_configuration(&self) -> Result<RecordConfiguration> {
        let indent_char = single_char(&self.document.indent_char).ok_or_else(|| {
            ConfigError::Validation("Indent character must be a single character".to_string())
        })?;

        let mut config = RecordConfiguration::new()
            .with_indent(self.document.indent)
            .with_indent_char(indent_char)
            .with_eol(self.document.eol.clone())
            .with_xml_declaration(self.document.xml_declaration)
            .with_xml_version(self.document.xml_version.clone())
            .with_encoding(self.document.encoding.clone())
            .with_null_value_handling(self.policy.null_handling)
            .with_error_mode(self.policy.error_mode)
            .with_validation_scope(self.policy.validation_scope)
            .with_strict_column_count(self.policy.strict_column_count)
            .with_strict_missing_fields(self.policy.strict_missing_fields)
            .with_notify_after(self.policy.notify_after)
            .with_auto_discover(self.policy.auto_discover)
            .with_culture(self.culture.clone());

        if let Some(root) = &self.document.root {
            config = config.with_root_name(root.clone());
        }
        if let Some(node) = &self.document.node {
            config = config.with_node_name(node.clone());
        }
        if let Some(location) = &self.document.location {
            config = config.with_location(location.clone());
        }
        for namespace in &self.namespaces {
            config = config.with_namespace(namespace.prefix.clone(), namespace.uri.clone());
        }
        for field in &self.fields {
            config = config.with_field(field.to_field_spec()?);
        }
        Ok(config)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "xml-record-writer.toml",
            "xml-record-writer.json",
            ".xml-record-writer.toml",
            ".xml-record-writer.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xml-record-writer");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(root) = env.get("XML_WRITER_ROOT") {
            config.document.root = Some(root);
        }

        if let Some(node) = env.get("XML_WRITER_NODE") {
            config.document.node = Some(node);
        }

        if let Some(indent) = env.get("XML_WRITER_INDENT") {
            config.document.indent = indent.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XML_WRITER_INDENT value: {}", indent))
            })?;
        }

        if let Some(declaration) = env.get("XML_WRITER_XML_DECLARATION") {
            config.document.xml_declaration = declaration.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid XML_WRITER_XML_DECLARATION value: {}",
                    declaration
                ))
            })?;
        }

        if let Some(mode) = env.get("XML_WRITER_ERROR_MODE") {
            config.policy.error_mode = parse_error_mode(&mode).map_err(|reason| {
                ConfigError::Environment(format!("Invalid XML_WRITER_ERROR_MODE value: {}", reason))
            })?;
        }

        if let Some(handling) = env.get("XML_WRITER_NULL_HANDLING") {
            config.policy.null_handling = parse_null_handling(&handling).map_err(|reason| {
                ConfigError::Environment(format!(
                    "Invalid XML_WRITER_NULL_HANDLING value: {}",
                    reason
                ))
            })?;
        }

        if let Some(every) = env.get("XML_WRITER_NOTIFY_AFTER") {
            config.policy.notify_after = every.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XML_WRITER_NOTIFY_AFTER value: {}", every))
            })?;
        }

        if let Some(format) = env.get("XML_WRITER_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                "summary" => OutputFormatConfig::Summary,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XML_WRITER_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(root) = &cli.root {
            config.document.root = Some(root.clone());
        }
        if let Some(node) = &cli.node {
            config.document.node = Some(node.clone());
        }
        if let Some(location) = &cli.location {
            config.document.location = Some(location.clone());
        }
        if let Some(indent) = cli.indent {
            config.document.indent = indent;
        }
        if cli.compact {
            config.document.indent = 0;
            config.document.eol = String::new();
        }
        if cli.xml_declaration {
            config.document.xml_declaration = true;
        }

        if let Some(handling) = cli.null_handling {
            config.policy.null_handling = handling;
        }
        if let Some(mode) = cli.error_mode {
            config.policy.error_mode = mode;
        }
        if let Some(every) = cli.notify_after {
            config.policy.notify_after = every;
        }

        config.output.format = cli.format.into();
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        let document = override_config.document;
        if document.root.is_some() {
            base.document.root = document.root;
        }
        if document.node.is_some() {
            base.document.node = document.node;
        }
        if document.location.is_some() {
            base.document.location = document.location;
        }
        base.document.indent = document.indent;
        base.document.indent_char = document.indent_char;
        base.document.eol = document.eol;
        base.document.xml_declaration = document.xml_declaration;
        base.document.xml_version = document.xml_version;
        base.document.encoding = document.encoding;

        base.policy = override_config.policy;
        base.culture = override_config.culture;

        if !override_config.namespaces.is_empty() {
            base.namespaces = override_config.namespaces;
        }
        if !override_config.fields.is_empty() {
            base.fields = override_config.fields;
        }

        base.output = override_config.output;
        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let document = &config.document;
        if document.indent > MAX_INDENT {
            return Err(ConfigError::Validation(format!(
                "Indent cannot exceed {}",
                MAX_INDENT
            )));
        }
        if document.indent_char != " " && document.indent_char != "\t" {
            return Err(ConfigError::Validation(
                "Indent character must be a space or a tab".to_string(),
            ));
        }
        for (label, name) in [("Root", &document.root), ("Node", &document.node)] {
            if let Some(name) = name
                && name.trim().is_empty()
            {
                return Err(ConfigError::Validation(format!(
                    "{} name cannot be empty",
                    label
                )));
            }
        }

        for namespace in &config.namespaces {
            if namespace.prefix.trim().is_empty() || namespace.uri.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Namespace prefix and URI cannot be empty".to_string(),
                ));
            }
        }

        for field in &config.fields {
            if field.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Field name cannot be empty".to_string(),
                ));
            }
            if field.size == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "Size of field '{}' must be greater than 0",
                    field.name
                )));
            }
            if let Some(fill) = &field.fill
                && single_char(fill).is_none()
            {
                return Err(ConfigError::Validation(format!(
                    "Fill for field '{}' must be a single character",
                    field.name
                )));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

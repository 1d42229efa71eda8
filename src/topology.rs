//! Document topology: root/node names and the namespace table

use quick_xml::escape::escape;

/// XML Schema instance namespace, used for nil markers
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Root name used when nothing else resolves one
pub const DEFAULT_ROOT_NAME: &str = "Root";

/// Node name used when nothing else resolves one
pub const DEFAULT_NODE_NAME: &str = "XElement";

/// Ordered prefix to URI table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceTable {
    entries: Vec<(String, String)>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefix; an existing prefix keeps its URI
    pub fn add(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> bool {
        let prefix = prefix.into();
        if self.has_prefix(&prefix) {
            return false;
        }
        self.entries.push((prefix, uri.into()));
        true
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == prefix)
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, u)| u.as_str())
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Register `xsi` and `xsd`, each at most once
    pub fn ensure_schema_instance(&mut self) {
        self.add("xsi", XSI_NAMESPACE);
        self.add("xsd", XSD_NAMESPACE);
    }

    /// ` xmlns:p="uri" ...` for every prefix except `xml`; empty when there is none
    pub fn declarations(&self) -> String {
        let decls: Vec<String> = self
            .iter()
            .filter(|(prefix, _)| *prefix != "xml")
            .map(|(prefix, uri)| format!("xmlns:{}=\"{}\"", prefix, escape(uri)))
            .collect();
        if decls.is_empty() {
            String::new()
        } else {
            format!(" {}", decls.join(" "))
        }
    }
}

/// Resolved root/node names and namespaces of one configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentTopology {
    /// Wrapper element; `None` renders a bare sequence of nodes
    pub root_name: Option<String>,
    pub node_name: String,
    pub namespaces: NamespaceTable,
}

impl DocumentTopology {
    pub fn has_root(&self) -> bool {
        self.root_name.is_some()
    }
}

/// Entity-encode a resolved tag name
pub fn encode_name(name: &str) -> String {
    escape(name).into_owned()
}

/// Plural form of an English noun, used for root names
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_ascii_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    format!("{}s", word)
}

/// Singular form of an English noun, used for array item tags
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.len() > 1 && lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

//! Sampled element shapes used for auto-discovery

use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Result, WriterError};

/// Shape of one sampled element: its qualified name, attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<SampleNode>,
    pub text: Option<String>,
}

impl SampleNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: SampleNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Parse the first element of an XML snippet into a sample shape
    pub fn from_xml(xml: &str) -> Result<SampleNode> {
        let mut reader = Reader::from_str(xml);

        let mut stack: Vec<SampleNode> = Vec::new();
        loop {
            let event = reader
                .read_event()
                .map_err(|e| invalid(format!("at position {}: {}", reader.buffer_position(), e)))?;
            match event {
                Event::Start(start) => stack.push(Self::from_start(&start)?),
                Event::Empty(start) => {
                    let node = Self::from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let content = text.decode().map_err(|e| invalid(e.to_string()))?;
                        current.push_text(&content);
                    }
                }
                Event::GeneralRef(reference) => {
                    if let Some(current) = stack.last_mut() {
                        let resolved = match reference
                            .resolve_char_ref()
                            .map_err(|e| invalid(e.to_string()))?
                        {
                            Some(ch) => ch.to_string(),
                            None => {
                                let name = reference.decode().map_err(|e| invalid(e.to_string()))?;
                                resolve_predefined_entity(&name)
                                    .map(str::to_string)
                                    .ok_or_else(|| invalid(format!("unknown entity '&{};'", name)))?
                            }
                        };
                        current.push_text(&resolved);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Event::End(_) => {
                    let Some(mut node) = stack.pop() else {
                        return Err(invalid("unexpected closing tag".to_string()));
                    };
                    node.text = node
                        .text
                        .take()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Eof => {
                    return Err(invalid("no complete element found".to_string()));
                }
                _ => {}
            }
        }
    }

    fn push_text(&mut self, content: &str) {
        self.text.get_or_insert_with(String::new).push_str(content);
    }

    fn from_start(start: &BytesStart<'_>) -> Result<SampleNode> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut node = SampleNode::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| invalid(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            // namespace declarations describe the document, not the record
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| invalid(e.to_string()))?
                .into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }
}

fn invalid(details: String) -> WriterError {
    WriterError::InvalidSample { details }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_with_attributes_and_children() {
        let sample = SampleNode::from_xml(
            r#"<Product Code="P1" xmlns:x="urn:x"><Tag>a</Tag><Tag>b</Tag><x:Extra/></Product>"#,
        )
        .unwrap();

        assert_eq!(sample.name, "Product");
        assert_eq!(
            sample.attributes,
            vec![("Code".to_string(), "P1".to_string())]
        );
        let names: Vec<_> = sample.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Tag", "Tag", "x:Extra"]);
        assert_eq!(sample.children[0].text.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_leaf_sample() {
        let sample = SampleNode::from_xml("<Price>12</Price>").unwrap();
        assert!(sample.children.is_empty());
        assert_eq!(sample.text.as_deref(), Some("12"));
    }

    #[test]
    fn test_sample_text_and_attributes_are_unescaped() {
        let sample =
            SampleNode::from_xml(r#"<Item Note="a &lt; b"><Name> Fish &amp; Chips &#33; </Name></Item>"#)
                .unwrap();

        assert_eq!(sample.attributes[0].1, "a < b");
        assert_eq!(sample.children[0].text.as_deref(), Some("Fish & Chips !"));
        assert_eq!(sample.text, None);
    }

    #[test]
    fn test_parse_incomplete_sample_fails() {
        let result = SampleNode::from_xml("<Open><Inner></Inner>");
        assert!(matches!(result, Err(WriterError::InvalidSample { .. })));
    }
}

//! Element tree for rendered records
//!
//! The encoder builds an [`Element`] per record and renders it to text only
//! once, so a nested object can be renamed structurally before emission.

use crate::record_config::RenderContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Already normalized character data
    Text(String),
    /// Caller-supplied markup written verbatim
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    /// Name and normalized value pairs, in write order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn push_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn open_tag(&self) -> String {
        let mut tag = format!("<{}", self.name);
        for (name, value) in &self.attributes {
            tag.push_str(&format!(" {}=\"{}\"", name, value));
        }
        tag
    }

    fn is_text_only(&self) -> bool {
        self.children.iter().all(|c| matches!(c, Node::Text(_)))
    }

    /// Render at `depth` indentation levels; no trailing line terminator
    pub fn render(&self, depth: usize, ctx: &RenderContext) -> String {
        let indent = ctx.indentation(depth);
        let mut out = format!("{}{}", indent, self.open_tag());

        if self.children.is_empty() {
            out.push_str(" />");
            return out;
        }

        if self.is_text_only() {
            out.push('>');
            for child in &self.children {
                if let Node::Text(text) = child {
                    out.push_str(text);
                }
            }
            out.push_str(&format!("</{}>", self.name));
            return out;
        }

        out.push('>');
        let inner = ctx.indentation(depth + 1);
        for child in &self.children {
            out.push_str(&ctx.eol);
            match child {
                Node::Element(element) => out.push_str(&element.render(depth + 1, ctx)),
                Node::Text(text) | Node::Raw(text) => {
                    out.push_str(&inner);
                    out.push_str(text);
                }
            }
        }
        out.push_str(&ctx.eol);
        out.push_str(&format!("{}</{}>", indent, self.name));
        out
    }
}

//! Scalar normalization: quoting, sizing and entity encoding

use quick_xml::escape::escape;

use crate::error::{Result, WriterError};
use crate::field::{FieldSpec, Justification};

const QUOTE: char = '"';
const CDATA_START: &str = "<![CDATA[";

/// Formatting rules applied to one scalar
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub size: Option<usize>,
    pub truncate: bool,
    pub quote: Option<bool>,
    pub justification: Justification,
    pub fill_char: char,
    pub encode: bool,
    /// Header values may never contain the record terminator
    pub is_header: bool,
    /// Record terminator; values containing it get quoted
    pub eol: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            size: None,
            truncate: false,
            quote: None,
            justification: Justification::None,
            fill_char: ' ',
            encode: true,
            is_header: false,
            eol: "\n".to_string(),
        }
    }
}

impl NormalizeOptions {
    pub fn for_field(field: &FieldSpec, eol: &str) -> Self {
        Self {
            size: field.size,
            truncate: field.truncate,
            quote: field.quote,
            justification: field.justification,
            fill_char: field.fill_char(),
            encode: field.encode.unwrap_or(true),
            is_header: false,
            eol: eol.to_string(),
        }
    }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with(QUOTE) && value.ends_with(QUOTE)
}

fn pad(value: String, size: usize, fill: char, justification: Justification) -> String {
    let missing = size - value.chars().count();
    let padding: String = std::iter::repeat_n(fill, missing).collect();
    match justification {
        Justification::Right => padding + &value,
        Justification::Left => value + &padding,
        Justification::None => value,
    }
}

/// Turn raw scalar text into the text written for `field_name`
pub fn normalize(field_name: &str, value: Option<&str>, options: &NormalizeOptions) -> Result<String> {
    let mut text = value.unwrap_or_default().to_string();

    let wants_quote = options.quote.unwrap_or(false);
    if !is_quoted(&text) {
        let holds_terminator = !options.eol.is_empty() && text.contains(options.eol.as_str());
        if wants_quote {
            text = format!("{QUOTE}{text}{QUOTE}");
        } else if holds_terminator {
            if options.is_header {
                return Err(WriterError::HeaderTerminator {
                    field: field_name.to_string(),
                });
            }
            text = format!("{QUOTE}{text}{QUOTE}");
        }
    }

    if let Some(size) = options.size {
        let actual = text.chars().count();
        if actual < size {
            text = pad(text, size, options.fill_char, options.justification);
        } else if actual > size {
            if !options.truncate {
                return Err(WriterError::SizeOverflow {
                    field: field_name.to_string(),
                    size,
                    actual,
                    value: text,
                });
            }
            text = text.chars().take(size).collect();
        }
    }

    if text.starts_with(CDATA_START) || !options.encode {
        return Ok(text);
    }
    Ok(escape(text.as_str()).into_owned())
}

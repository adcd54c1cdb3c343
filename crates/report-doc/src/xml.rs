//! Raw XML output.

use crate::node::Node;
use std::io::{self, Write};

const INDENT: &str = "  ";

pub(crate) fn write_document<W: Write + ?Sized>(root: &Node, out: &mut W) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    write_node(root, 0, out)
}

fn write_node<W: Write + ?Sized>(node: &Node, level: usize, out: &mut W) -> io::Result<()> {
    let pad = INDENT.repeat(level);
    write!(out, "{pad}<{}", node.name())?;
    for (k, v) in node.attributes() {
        write!(out, " {}=\"{}\"", k, escape(v, true))?;
    }

    let text = node.text().filter(|t| !t.is_empty());
    match (text, node.children().is_empty()) {
        (None, true) => writeln!(out, "/>"),
        (Some(text), true) => writeln!(out, ">{}</{}>", escape(text, false), node.name()),
        (text, false) => {
            writeln!(out, ">")?;
            if let Some(text) = text {
                writeln!(out, "{pad}{INDENT}{}", escape(text, false))?;
            }
            for child in node.children() {
                write_node(child, level + 1, out)?;
            }
            writeln!(out, "{pad}</{}>", node.name())
        }
    }
}

/// XML name without namespace prefix: a letter or `_`, then letters, digits,
/// `_`, `-` or `.`.
pub(crate) fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape(raw: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '\n' if attribute => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' if attribute => escaped.push_str("&#9;"),
            // Not representable in XML 1.0, not even as a reference.
            c if (c as u32) < 0x20 && !matches!(c, '\n' | '\t') => escaped.push('\u{FFFD}'),
            _ => escaped.push(c),
        }
    }
    escaped
}

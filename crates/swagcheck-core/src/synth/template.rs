//! RFC 6570 URI template expansion
//!
//! Covers all four levels: simple and reserved expansion, the `# . / ; ? &`
//! operators, and the `:N` prefix / `*` explode modifiers. Variables with no
//! value (missing, `null`, empty list or map) expand to nothing.

use std::fmt::Write;

use serde_json::{Map, Value};

struct Operator {
    first: &'static str,
    separator: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

const SIMPLE: Operator = Operator {
    first: "",
    separator: ",",
    named: false,
    if_empty: "",
    allow_reserved: false,
};

impl Operator {
    fn split(expression: &str) -> (Self, &str) {
        let mut chars = expression.chars();
        let op = match chars.next() {
            Some('+') => Self {
                allow_reserved: true,
                ..SIMPLE
            },
            Some('#') => Self {
                first: "#",
                allow_reserved: true,
                ..SIMPLE
            },
            Some('.') => Self {
                first: ".",
                separator: ".",
                ..SIMPLE
            },
            Some('/') => Self {
                first: "/",
                separator: "/",
                ..SIMPLE
            },
            Some(';') => Self {
                first: ";",
                separator: ";",
                named: true,
                ..SIMPLE
            },
            Some('?') => Self {
                first: "?",
                separator: "&",
                named: true,
                if_empty: "=",
                ..SIMPLE
            },
            Some('&') => Self {
                first: "&",
                separator: "&",
                named: true,
                if_empty: "=",
                ..SIMPLE
            },
            _ => return (SIMPLE, expression),
        };
        (op, chars.as_str())
    }
}

#[derive(Clone, Copy)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

fn parse_varspec(spec: &str) -> (&str, Modifier) {
    if let Some(name) = spec.strip_suffix('*') {
        return (name, Modifier::Explode);
    }
    if let Some((name, len)) = spec.split_once(':') {
        if let Ok(len) = len.parse() {
            return (name, Modifier::Prefix(len));
        }
    }
    (spec, Modifier::None)
}

/// Expand `template` with `variables`.
///
/// An unterminated `{` is copied through literally.
#[must_use]
pub fn expand(template: &str, variables: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        expand_expression(&after[..close], variables, &mut out);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn expand_expression(expression: &str, variables: &Map<String, Value>, out: &mut String) {
    let (op, varspecs) = Operator::split(expression);
    let mut first = true;
    for spec in varspecs.split(',') {
        let (name, modifier) = parse_varspec(spec.trim());
        let Some(value) = variables.get(name).filter(|v| is_defined(v)) else {
            tracing::warn!(variable = name, "URI template variable has no value, expanding to empty");
            continue;
        };
        out.push_str(if first { op.first } else { op.separator });
        first = false;
        expand_value(name, value, modifier, &op, out);
    }
}

fn is_defined(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(pairs) => !pairs.is_empty(),
        _ => true,
    }
}

fn expand_value(name: &str, value: &Value, modifier: Modifier, op: &Operator, out: &mut String) {
    match (value, modifier) {
        (Value::Array(items), Modifier::Explode) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(op.separator);
                }
                if op.named {
                    out.push_str(name);
                    out.push('=');
                }
                encode_into(&scalar_text(item), op.allow_reserved, out);
            }
        }
        (Value::Array(items), _) => {
            if op.named {
                out.push_str(name);
                out.push('=');
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_into(&scalar_text(item), op.allow_reserved, out);
            }
        }
        (Value::Object(pairs), Modifier::Explode) => {
            for (i, (key, item)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(op.separator);
                }
                encode_into(key, op.allow_reserved, out);
                out.push('=');
                encode_into(&scalar_text(item), op.allow_reserved, out);
            }
        }
        (Value::Object(pairs), _) => {
            if op.named {
                out.push_str(name);
                out.push('=');
            }
            for (i, (key, item)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_into(key, op.allow_reserved, out);
                out.push(',');
                encode_into(&scalar_text(item), op.allow_reserved, out);
            }
        }
        (scalar, _) => {
            let mut text = scalar_text(scalar);
            if let Modifier::Prefix(len) = modifier {
                text = text.chars().take(len).collect();
            }
            if op.named {
                out.push_str(name);
                if text.is_empty() {
                    out.push_str(op.if_empty);
                    return;
                }
                out.push('=');
            }
            encode_into(&text, op.allow_reserved, out);
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

const fn is_reserved(b: u8) -> bool {
    matches!(
        b,
        b':' | b'/'
            | b'?'
            | b'#'
            | b'['
            | b']'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
    )
}

fn is_pct_triplet(bytes: &[u8], at: usize) -> bool {
    bytes[at] == b'%'
        && bytes.get(at + 1).is_some_and(u8::is_ascii_hexdigit)
        && bytes.get(at + 2).is_some_and(u8::is_ascii_hexdigit)
}

fn encode_into(text: &str, allow_reserved: bool, out: &mut String) {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if is_unreserved(b) || (allow_reserved && (is_reserved(b) || is_pct_triplet(bytes, i))) {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
}

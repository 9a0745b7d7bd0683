use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Records larger than this are rejected outright rather than parsed.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;
/// Upper bound for the metadata block alone.
pub const MAX_FRONT_MATTER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("missing front matter delimiter")]
    MissingDelimiter,
    #[error("missing closing --- for front matter")]
    Unterminated,
    #[error("front matter is not a YAML mapping")]
    NotAMapping,
    #[error("invalid YAML in front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("file is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },
    #[error("front matter is {size} bytes, over the {limit} byte limit")]
    BlockTooLarge { size: usize, limit: usize },
}

/// Split a record into its front matter source and body text.
///
/// The file must begin with a `---` line; the block ends at the next `---`
/// line. The body is returned exactly as stored, byte for byte, so the write
/// path can reattach it untouched.
pub fn split_front_matter(content: &str) -> Result<(&str, &str), FrontMatterError> {
    if content.len() > MAX_RECORD_BYTES {
        return Err(FrontMatterError::FileTooLarge {
            size: content.len(),
            limit: MAX_RECORD_BYTES,
        });
    }
    let first_break = content.find('\n').ok_or(FrontMatterError::MissingDelimiter)?;
    if content[..first_break].trim_end_matches('\r') != "---" {
        return Err(FrontMatterError::MissingDelimiter);
    }
    let mut pos = first_break + 1;
    while pos <= content.len() {
        let line_end = content[pos..].find('\n').map(|offset| pos + offset);
        let (line, next) = match line_end {
            Some(end) => (&content[pos..end], end + 1),
            None => (&content[pos..], content.len()),
        };
        if line.trim() == "---" {
            let front = &content[first_break + 1..pos];
            let body = if next >= content.len() {
                ""
            } else {
                &content[next..]
            };
            if front.len() > MAX_FRONT_MATTER_BYTES {
                return Err(FrontMatterError::BlockTooLarge {
                    size: front.len(),
                    limit: MAX_FRONT_MATTER_BYTES,
                });
            }
            return Ok((front, body));
        }
        if line_end.is_none() {
            break;
        }
        pos = next;
    }
    Err(FrontMatterError::Unterminated)
}

/// Parse the front matter source into an ordered, type-preserving mapping.
///
/// This is the representation the writer edits; it never passes through the
/// typed record schema, so unknown keys and scalar types survive as written.
pub fn parse_mapping(front: &str) -> Result<Mapping, FrontMatterError> {
    match serde_yaml::from_str::<Value>(front)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(FrontMatterError::NotAMapping),
    }
}

/// Serialize an edited mapping back into a full record document.
pub fn render_document(front: &Mapping, body: &str) -> Result<String, FrontMatterError> {
    let mut out = String::from("---\n");
    if !front.is_empty() {
        out.push_str(&serde_yaml::to_string(&Value::Mapping(front.clone()))?);
    }
    out.push_str("---\n");
    out.push_str(body);
    Ok(out)
}

/// Coerce a scalar YAML value to its string form. Sequences and mappings
/// yield None; the typed schema has no use for them outside `extra`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(val) => Some(val.clone()),
        Value::Number(num) => Some(num.to_string()),
        Value::Bool(val) => Some(val.to_string()),
        _ => None,
    }
}

/// Parse an incoming edit value as a bare YAML scalar so that numbers and
/// booleans keep their natural type in the tree. Anything that does not
/// resolve to a scalar is stored as a plain string.
pub fn yaml_scalar(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

/// A reference value as written inside a metadata field.
///
/// Three encodings occur in the wild: symbolic wiki links (`[[Name]]`, with
/// optional `#section` and `|alias` parts), relative paths
/// (`projects/Name.md`), and bare names with or without the `.md` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    WikiLink { target: String, raw: String },
    Path { path: String, raw: String },
    Bare { name: String, raw: String },
}

impl RecordRef {
    /// Parse a raw field value into its reference shape. Empty or
    /// whitespace-only values carry no reference at all.
    pub fn parse(raw: &str) -> Option<RecordRef> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(inner) = trimmed
            .strip_prefix("[[")
            .and_then(|rest| rest.strip_suffix("]]"))
        {
            let target = inner
                .split(['#', '|'])
                .next()
                .unwrap_or("")
                .trim();
            // Wiki links may carry a folder prefix; the name is the last
            // path segment.
            let target = target.rsplit(['/', '\\']).next().unwrap_or("").trim();
            let target = strip_md_suffix(target);
            return Some(RecordRef::WikiLink {
                target: target.to_string(),
                raw: trimmed.to_string(),
            });
        }
        if trimmed.contains(['/', '\\']) {
            return Some(RecordRef::Path {
                path: trimmed.to_string(),
                raw: trimmed.to_string(),
            });
        }
        Some(RecordRef::Bare {
            name: strip_md_suffix(trimmed).to_string(),
            raw: trimmed.to_string(),
        })
    }

    /// The name this reference targets, when it has one. Path references
    /// resolve by location instead and carry no name.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            RecordRef::WikiLink { target, .. } if !target.is_empty() => Some(target),
            RecordRef::Bare { name, .. } if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    /// The relative path this reference targets, for path-shaped values.
    pub fn target_path(&self) -> Option<&str> {
        match self {
            RecordRef::Path { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The value exactly as it appeared in the field.
    pub fn as_raw(&self) -> &str {
        match self {
            RecordRef::WikiLink { raw, .. }
            | RecordRef::Path { raw, .. }
            | RecordRef::Bare { raw, .. } => raw,
        }
    }

    /// Encode a name in the symbolic link form used for newly written
    /// references.
    pub fn wiki_link(name: &str) -> String {
        format!("[[{name}]]")
    }
}

fn strip_md_suffix(value: &str) -> &str {
    value.strip_suffix(".md").unwrap_or(value)
}

//! Text normalization shared by every source.
//!
//! Titles and abstracts coming out of the arXiv feed are hard-wrapped, titles
//! from all sources are compared case-insensitively when picking a best match,
//! and author lists arrive as JSON arrays of `{"name": ...}` objects from both
//! Semantic Scholar and the conference snapshots.
//!
//! # Examples
//!
//! ```
//! use papermash::format;
//!
//! let title = "  Attention Is\n  All You Need ";
//! assert_eq!(format::clean_text(title), "Attention Is   All You Need");
//! assert_eq!(format::match_key("  Attention Is All You Need "), "attention is all you need");
//! ```

/// Collapses line breaks into spaces and trims surrounding whitespace.
///
/// Each `\r\n`, `\n` or `\r` becomes exactly one space; runs of other whitespace
/// inside the text are preserved.
pub fn clean_text(text: &str) -> String {
  text.replace("\r\n", " ").replace(['\n', '\r'], " ").trim().to_string()
}

/// Normalizes a title for comparison: lowercased and trimmed.
pub fn match_key(title: &str) -> String { title.trim().to_lowercase() }

/// Extracts display names from a JSON author list.
///
/// Each object contributes its `name` field, or an empty string when the field is
/// missing or not a string. Non-object elements are skipped. Anything other than
/// an array yields an empty list.
pub fn author_names(value: &serde_json::Value) -> Vec<String> {
  let Some(authors) = value.as_array() else {
    return Vec::new();
  };
  authors
    .iter()
    .filter_map(|author| author.as_object())
    .map(|author| {
      author.get("name").and_then(|name| name.as_str()).map(clean_text).unwrap_or_default()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clean_text() {
    assert_eq!(clean_text("Hello World"), "Hello World");
    assert_eq!(clean_text("Hello\nWorld"), "Hello World");
    assert_eq!(clean_text("Hello\r\nWorld"), "Hello World");
    assert_eq!(clean_text("\n  Padded title \n"), "Padded title");
    assert_eq!(clean_text("Wrapped\n  line"), "Wrapped   line");
    assert_eq!(clean_text("   "), "");
  }

  #[test]
  fn test_match_key() {
    assert_eq!(match_key("Attention Is All You Need"), "attention is all you need");
    assert_eq!(match_key("  UPPERCASE TEXT\t"), "uppercase text");
    assert_eq!(match_key(""), "");
  }

  #[test]
  fn test_author_names() {
    let authors = serde_json::json!([
      {"authorId": "1", "name": "Ashish Vaswani"},
      {"authorId": "2"},
      "stray string",
      {"name": 42},
      {"name": "Noam Shazeer"}
    ]);
    assert_eq!(author_names(&authors), vec!["Ashish Vaswani", "", "", "Noam Shazeer"]);
    assert!(author_names(&serde_json::json!({"name": "Not A List"})).is_empty());
    assert!(author_names(&serde_json::Value::Null).is_empty());
  }
}

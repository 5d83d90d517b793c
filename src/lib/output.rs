//! Rendering of looked-up values for printing.

use indexmap::IndexMap;

use crate::entry::EntryStore;
use crate::escape::format_value;

/// Result of looking up keys for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
  /// Text to print, `None` when a single plain key was not found.
  pub output: Option<String>,
  /// Requested keys that are not in the store.
  pub missing: Vec<String>,
}

impl Lookup {
  pub fn is_complete(&self) -> bool {
    self.missing.is_empty()
  }
}

/// Looks up `keys` in `store`, or every key when `keys` is empty.
///
/// Plain output is the value alone, formatted by [`format_value`]. JSON output
/// is an object in request order holding the stored values, with `null` for
/// missing keys.
pub fn lookup(
  store: &EntryStore,
  keys: &[String],
  json: bool,
  multiline: bool,
) -> Result<Lookup, serde_json::Error> {
  let keys: Vec<&str> = if keys.is_empty() {
    store.keys().collect()
  } else {
    keys.iter().map(String::as_str).collect()
  };

  let missing: Vec<String> = keys
    .iter()
    .filter(|key| !store.contains_key(key))
    .map(|key| key.to_string())
    .collect();

  let output = if json {
    let object: IndexMap<&str, Option<&str>> = keys.iter().map(|key| (*key, store.get(key))).collect();
    Some(serde_json::to_string(&object)?)
  } else {
    keys
      .first()
      .and_then(|key| store.get(key))
      .map(|value| format_value(value, multiline))
  };

  Ok(Lookup { output, missing })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse::parse;

  const CONTENT: &str = "NAME=dotenv-cli\nDOUBLE=\"Double quotes\"\nMULTI=\"a\nb\"\n";

  fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
  }

  #[test]
  fn test_plain_value() {
    let store = parse(CONTENT).unwrap();
    let found = lookup(&store, &keys(&["DOUBLE"]), false, false).unwrap();

    assert_eq!(found.output.as_deref(), Some("Double quotes"));
    assert!(found.is_complete());
  }

  #[test]
  fn test_plain_multiline_value() {
    let store = parse(CONTENT).unwrap();

    let escaped = lookup(&store, &keys(&["MULTI"]), false, false).unwrap();
    assert_eq!(escaped.output.as_deref(), Some("a\\nb"));

    let raw = lookup(&store, &keys(&["MULTI"]), false, true).unwrap();
    assert_eq!(raw.output.as_deref(), Some("a\nb"));
  }

  #[test]
  fn test_plain_missing_value() {
    let store = parse(CONTENT).unwrap();
    let found = lookup(&store, &keys(&["MISSING"]), false, false).unwrap();

    assert_eq!(found.output, None);
    assert_eq!(found.missing, keys(&["MISSING"]));
  }

  #[test]
  fn test_json_all_keys() {
    let store = parse(CONTENT).unwrap();
    let found = lookup(&store, &[], true, false).unwrap();

    assert_eq!(
      found.output.as_deref(),
      Some(r#"{"NAME":"dotenv-cli","DOUBLE":"Double quotes","MULTI":"a\nb"}"#)
    );
  }

  #[test]
  fn test_json_selected_keys_with_missing() {
    let store = parse(CONTENT).unwrap();
    let found = lookup(&store, &keys(&["DOUBLE", "NOPE", "NAME"]), true, false).unwrap();

    assert_eq!(
      found.output.as_deref(),
      Some(r#"{"DOUBLE":"Double quotes","NOPE":null,"NAME":"dotenv-cli"}"#)
    );
    assert!(!found.is_complete());
  }
}

//! Value extraction for quoted and list assignments.

#[cfg(feature = "tracing")]
use tracing::trace;

const DOUBLE_QUOTE: char = '"';
const SINGLE_QUOTE: char = '\'';
const LIST_OPEN: char = '[';
const LIST_CLOSE: char = ']';
const LINE_BREAK: &str = "\n";

/// How the right-hand side of an assignment is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
  Bare,
  Quoted(char),
  List,
}

impl ValueKind {
  /// Classifies a trimmed right-hand side by its first character.
  pub fn of(value: &str) -> Self {
    match value.chars().next() {
      Some(quote @ (DOUBLE_QUOTE | SINGLE_QUOTE)) => ValueKind::Quoted(quote),
      Some(LIST_OPEN) => ValueKind::List,
      _ => ValueKind::Bare,
    }
  }

  /// The character whose presence at the end of a trimmed line closes the value.
  pub fn closing(self) -> Option<char> {
    match self {
      ValueKind::Bare => None,
      ValueKind::Quoted(quote) => Some(quote),
      ValueKind::List => Some(LIST_CLOSE),
    }
  }

  /// Whether the first line already holds the closing delimiter.
  ///
  /// The opening quote does not count, so `KEY="` starts a multiline value.
  pub fn closes_on_first_line(self, value: &str) -> bool {
    match self {
      ValueKind::Bare => true,
      ValueKind::Quoted(quote) => value
        .strip_prefix(quote)
        .is_some_and(|rest| rest.trim_end().ends_with(quote)),
      ValueKind::List => value.trim_end().ends_with(LIST_CLOSE),
    }
  }

  pub fn describe(self) -> &'static str {
    match self {
      ValueKind::Bare => "un-quoted",
      ValueKind::Quoted(DOUBLE_QUOTE) => "double quoted",
      ValueKind::Quoted(_) => "single quoted",
      ValueKind::List => "list",
    }
  }
}

/// Turns the raw text of a value into its stored form.
///
/// `first` is the right-hand side on the assignment line and `rest` the lines
/// consumed after it. Quoted values lose exactly one delimiter on each side and
/// keep everything in between verbatim. Lists must be JSON arrays of strings
/// and come back in canonical form.
pub fn extract(kind: ValueKind, first: &str, rest: &[&str]) -> Result<String, serde_json::Error> {
  let mut joined = first.to_string();
  for line in rest {
    joined.push_str(LINE_BREAK);
    joined.push_str(line);
  }
  let joined = joined.trim();

  #[cfg(feature = "tracing")]
  trace!("Extracting {} value from {:?}", kind.describe(), joined);

  match kind {
    ValueKind::Bare => Ok(joined.to_string()),
    ValueKind::Quoted(quote) => {
      let inner = joined.strip_prefix(quote).unwrap_or(joined);
      let inner = inner.strip_suffix(quote).unwrap_or(inner);
      Ok(inner.to_string())
    }
    ValueKind::List => canonical_list(joined),
  }
}

/// Re-emits a JSON array of strings as `["a", "b", "c"]`.
pub fn canonical_list(text: &str) -> Result<String, serde_json::Error> {
  let items: Vec<String> = serde_json::from_str(text)?;
  let items = items
    .iter()
    .map(serde_json::to_string)
    .collect::<Result<Vec<_>, _>>()?;

  Ok(format!("{LIST_OPEN}{}{LIST_CLOSE}", items.join(", ")))
}

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::entry::{Entry, EntryStore};
use crate::value::{self, ValueKind};

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: &str = "=";
const LINE_BREAK: char = '\n';
const CARRIAGE_RETURN: char = '\r';

/// Splits `text` into the lines the editor and the scanner both index.
///
/// Only `\n` separates lines, so a trailing line break yields a final empty
/// line and joining the pieces with `\n` restores the text byte for byte.
pub fn split_lines(text: &str) -> Vec<&str> {
  text.split(LINE_BREAK).collect()
}

/// Scans `input` into an [`EntryStore`].
///
/// `${...}` references are left as written; see [`EntryStore::resolve`].
pub fn parse(input: &str) -> Result<EntryStore, ParseError> {
  let lines: Vec<&str> = split_lines(input)
    .into_iter()
    .map(|line| line.strip_suffix(CARRIAGE_RETURN).unwrap_or(line))
    .collect();

  #[cfg(feature = "tracing")]
  debug!("Parsing env file with {} lines", lines.len());

  let mut store = EntryStore::new();
  let mut index = 0;

  while index < lines.len() {
    let line = lines[index];
    let line_start = index;
    index += 1;

    let (key, raw_value) = match Line::from(line) {
      Line::Empty => {
        #[cfg(feature = "tracing")]
        trace!("{} | Ignoring empty line", line_start + 1);
        continue;
      }
      Line::Comment => {
        #[cfg(feature = "tracing")]
        trace!("{} | Ignoring comment", line_start + 1);
        continue;
      }
      Line::Other => {
        #[cfg(feature = "tracing")]
        trace!("{} | Ignoring line without key=value: {}", line_start + 1, line);
        continue;
      }
      Line::Assignment { key, value } => (key, value),
    };

    let kind = ValueKind::of(raw_value);
    let line_end = find_line_end(&lines, line_start, raw_value, kind)?;

    #[cfg(feature = "tracing")]
    trace!(
      "{} | key: {}, {}, {}",
      line_start + 1,
      key,
      kind.describe(),
      if line_end == line_start { "single line" } else { "multiline" }
    );

    if kind == ValueKind::Bare && raw_value.contains(['"', '\'']) {
      return Err(ParseError::InvalidValue {
        line: line_start + 1,
        text: line.to_string(),
      });
    }

    let value = value::extract(kind, raw_value, &lines[line_start + 1..=line_end]).map_err(
      |source| ParseError::InvalidList {
        line: line_start + 1,
        text: line.to_string(),
        source,
      },
    )?;

    store.insert(Entry::new(key, value, line_start, line_end));
    index = line_end + 1;
  }

  #[cfg(feature = "tracing")]
  debug!("Parsed {} entries", store.len());

  Ok(store)
}

/// Index of the line that closes a value opened on `line_start`.
///
/// Scanning is eager: the first later line whose trimmed text ends with the
/// closing delimiter ends the value, whatever else it contains.
fn find_line_end(
  lines: &[&str],
  line_start: usize,
  raw_value: &str,
  kind: ValueKind,
) -> Result<usize, ParseError> {
  let Some(closing) = kind.closing() else {
    return Ok(line_start);
  };

  if kind.closes_on_first_line(raw_value) {
    return Ok(line_start);
  }

  lines
    .iter()
    .enumerate()
    .skip(line_start + 1)
    .find(|(_, line)| line.trim().ends_with(closing))
    .map(|(index, _)| index)
    .ok_or_else(|| ParseError::Unterminated {
      line: line_start + 1,
      text: lines[line_start].to_string(),
      delimiter: closing,
    })
}

impl TryFrom<&str> for EntryStore {
  type Error = ParseError;

  fn try_from(s: &str) -> Result<Self, Self::Error> {
    parse(s)
  }
}

impl std::str::FromStr for EntryStore {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    parse(s)
  }
}

/// Classification of a single physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
  Empty,
  Comment,
  Assignment { key: &'a str, value: &'a str },
  Other,
}

impl<'a> From<&'a str> for Line<'a> {
  fn from(s: &'a str) -> Self {
    let trimmed = s.trim();

    if trimmed.is_empty() {
      Line::Empty
    } else if trimmed.starts_with(COMMENT_PREFIX) {
      Line::Comment
    } else if let Some((key, value)) = trimmed.split_once(ASSIGNMENT_OPERATOR)
      && !key.trim().is_empty()
    {
      Line::Assignment {
        key: key.trim(),
        value: value.trim(),
      }
    } else {
      Line::Other
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  #[error("Error parsing .env file at line {line}: Invalid value: {text}")]
  InvalidValue { line: usize, text: String },
  #[error("Error parsing .env file at line {line}: Invalid list: {text}")]
  InvalidList {
    line: usize,
    text: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("Error parsing .env file at line {line}: Missing closing {delimiter}: {text}")]
  Unterminated {
    line: usize,
    text: String,
    delimiter: char,
  },
}

impl ParseError {
  /// 1-based line number the failing assignment starts on.
  pub fn line(&self) -> usize {
    match self {
      ParseError::InvalidValue { line, .. }
      | ParseError::InvalidList { line, .. }
      | ParseError::Unterminated { line, .. } => *line,
    }
  }

  /// Raw text of the failing line.
  pub fn text(&self) -> &str {
    match self {
      ParseError::InvalidValue { text, .. }
      | ParseError::InvalidList { text, .. }
      | ParseError::Unterminated { text, .. } => text,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"# Sample file
NAME=dotenv-cli

DOUBLE="Double quotes"
SINGLE='Single quotes'
MULTI="first line
second line
third line"
LIST_SINGLE_LINE=["one","two",  "three"]
LIST_MULTI_LINE=[
  "one",
  "two",
  "three"
]
not an assignment
EMPTY=
"#;

  #[test]
  fn test_parse_simple() {
    let store = parse("KEY=value\nANOTHER=test").unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("KEY"), Some("value"));
    assert_eq!(store.get("ANOTHER"), Some("test"));

    let entry = store.entry("ANOTHER").unwrap();
    assert_eq!(entry.line_start, 1);
    assert_eq!(entry.line_end, 1);
  }

  #[test]
  fn test_parse_sample() {
    let store = parse(SAMPLE).unwrap();

    assert_eq!(
      store.keys().collect::<Vec<_>>(),
      vec!["NAME", "DOUBLE", "SINGLE", "MULTI", "LIST_SINGLE_LINE", "LIST_MULTI_LINE", "EMPTY"]
    );
    assert_eq!(store.get("NAME"), Some("dotenv-cli"));
    assert_eq!(store.get("DOUBLE"), Some("Double quotes"));
    assert_eq!(store.get("SINGLE"), Some("Single quotes"));
    assert_eq!(store.get("MULTI"), Some("first line\nsecond line\nthird line"));
    assert_eq!(store.get("LIST_SINGLE_LINE"), Some(r#"["one", "two", "three"]"#));
    assert_eq!(store.get("LIST_MULTI_LINE"), Some(r#"["one", "two", "three"]"#));
    assert_eq!(store.get("EMPTY"), Some(""));
  }

  #[test]
  fn test_line_spans_reconstruct_assignment() {
    let store = parse(SAMPLE).unwrap();
    let lines = split_lines(SAMPLE);

    let multi = store.entry("MULTI").unwrap();
    assert_eq!(multi.lines(), 5..=7);
    assert_eq!(
      lines[multi.lines()].join("\n"),
      "MULTI=\"first line\nsecond line\nthird line\""
    );

    let list = store.entry("LIST_MULTI_LINE").unwrap();
    assert_eq!(list.lines(), 9..=13);
    assert!(lines[list.line_start].starts_with("LIST_MULTI_LINE=["));
    assert_eq!(lines[list.line_end], "]");
  }

  #[test]
  fn test_value_keeps_extra_equals() {
    let store = parse("URL=postgres://host/db?opt=1").unwrap();
    assert_eq!(store.get("URL"), Some("postgres://host/db?opt=1"));
  }

  #[test]
  fn test_keys_and_values_are_trimmed() {
    let store = parse("  KEY   =   value  ").unwrap();
    assert_eq!(store.get("KEY"), Some("value"));
  }

  #[test]
  fn test_duplicate_key_last_wins() {
    let store = parse("KEY=first\nOTHER=x\nKEY=second").unwrap();

    assert_eq!(store.keys().collect::<Vec<_>>(), vec!["KEY", "OTHER"]);
    assert_eq!(store.get("KEY"), Some("second"));
    assert_eq!(store.entry("KEY").unwrap().lines(), 2..=2);
  }

  #[test]
  fn test_bare_value_with_quote_is_error() {
    let err = parse("OK=fine\n\nKEY=has\"quote").unwrap_err();

    assert!(matches!(err, ParseError::InvalidValue { .. }));
    assert_eq!(err.line(), 3);
    assert_eq!(err.text(), "KEY=has\"quote");
    assert_eq!(
      err.to_string(),
      "Error parsing .env file at line 3: Invalid value: KEY=has\"quote"
    );

    let err = parse("KEY=it's").unwrap_err();
    assert_eq!(err.line(), 1);
  }

  #[test]
  fn test_invalid_list_is_error() {
    let err = parse("A=1\nLIST=[ 'one','two', \"three\" ]").unwrap_err();
    assert!(matches!(err, ParseError::InvalidList { line: 2, .. }));

    let err = parse("LIST=[\n  \"one\",\n]").unwrap_err();
    assert!(matches!(err, ParseError::InvalidList { line: 1, .. }));
  }

  #[test]
  fn test_single_quote_multiline_stops_at_single_quote() {
    let input = "SINGLE='first\nsecond'\nNEXT=value";
    let store = parse(input).unwrap();

    assert_eq!(store.get("SINGLE"), Some("first\nsecond"));
    assert_eq!(store.entry("SINGLE").unwrap().lines(), 0..=1);
    assert_eq!(store.get("NEXT"), Some("value"));
  }

  #[test]
  fn test_double_quote_only_on_first_line_opens_multiline() {
    let store = parse("KEY=\"\nbody\n\"\nAFTER=1").unwrap();
    assert_eq!(store.get("KEY"), Some("\nbody\n"));
    assert_eq!(store.entry("KEY").unwrap().lines(), 0..=2);
    assert_eq!(store.get("AFTER"), Some("1"));
  }

  #[test]
  fn test_unterminated_value_is_error() {
    let err = parse("A=1\nKEY=\"never closed\nstill going").unwrap_err();
    assert!(matches!(
      err,
      ParseError::Unterminated {
        line: 2,
        delimiter: '"',
        ..
      }
    ));
  }

  #[test]
  fn test_crlf_line_endings() {
    let store = parse("KEY=value\r\nQUOTED=\"a\r\nb\"\r\n").unwrap();
    assert_eq!(store.get("KEY"), Some("value"));
    assert_eq!(store.get("QUOTED"), Some("a\nb"));
  }

  #[test]
  fn test_ignored_lines() {
    let store = parse("# KEY=commented\n   \njust text\n=no key\nREAL=1").unwrap();
    assert_eq!(store.keys().collect::<Vec<_>>(), vec!["REAL"]);
    assert_eq!(store.entry("REAL").unwrap().lines(), 4..=4);
  }

  #[test]
  fn test_references_are_not_resolved_while_parsing() {
    let store: EntryStore = "A=1\nB=${A}".try_into().unwrap();
    assert_eq!(store.get("B"), Some("${A}"));
  }
}

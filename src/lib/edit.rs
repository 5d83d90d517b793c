//! Positional edits of a `.env` file.
//!
//! Edits touch only the line span recorded for the target key. Every other
//! line, comments and blank lines included, is written back byte for byte.
//!
//! Each file operation reads the whole file once and writes it once. Nothing
//! is locked: two processes editing the same file at the same time can lose
//! each other's changes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dotenv_cli::edit::Editor;
//!
//! let mut store = dotenv_cli::load(".env").unwrap();
//! Editor::set(&mut store, ".env", "GREETING", "hello world", false).unwrap();
//! assert_eq!(store.get("GREETING"), Some("hello world"));
//! ```

use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::entry::{Entry, EntryStore};
use crate::escape::escape_and_quote;
use crate::parse::{ParseError, parse, split_lines};

const ASSIGNMENT_OPERATOR: &str = "=";
const LINE_BREAK: &str = "\n";

/// What [`Editor::set`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
  Replaced,
  Appended,
}

/// What [`Editor::delete`] did to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  NotFound,
}

pub struct Editor;

impl Editor {
  /// Sets `key` to `value` in the file at `path`.
  ///
  /// `value` goes through [`escape_and_quote`] first. An existing key has its
  /// whole line span replaced by a single `KEY=VALUE` assignment. A new key
  /// is appended on its own line. `store` is rebuilt from the new content so
  /// every line span is current again. The file is left untouched when the
  /// new content would not parse, or when `key` would not read back from the
  /// written lines with the value the assignment holds on its own.
  pub fn set<P: AsRef<Path>>(
    store: &mut EntryStore,
    path: P,
    key: &str,
    value: &str,
    force_quote: bool,
  ) -> Result<SetOutcome, EditError> {
    let path = path.as_ref();
    let rhs = escape_and_quote(value, force_quote);

    #[cfg(feature = "tracing")]
    debug!("Updating {:?} in {:?}", key, path);

    let content = std::fs::read_to_string(path).map_err(EditError::Read)?;
    let (updated, outcome) = Self::set_in(store, &content, key, &rhs)?;
    let reparsed = parse(&updated).map_err(EditError::Parse)?;

    let assignment = format!("{key}{ASSIGNMENT_OPERATOR}{rhs}");
    let start = match store.entry(key) {
      Some(entry) => entry.line_start,
      // Appended text always ends with a line break, so the last line is empty
      None => split_lines(&updated).len().saturating_sub(2 + line_breaks(&assignment)),
    };
    check_read_back(&reparsed, key, &assignment, start)?;

    std::fs::write(path, updated).map_err(EditError::Write)?;
    *store = reparsed;

    #[cfg(feature = "tracing")]
    info!("{:?} {:?}", outcome, key);

    Ok(outcome)
  }

  /// Removes the assignment of `key` from the file at `path`.
  ///
  /// An unknown key leaves the file alone and reports
  /// [`DeleteOutcome::NotFound`].
  pub fn delete<P: AsRef<Path>>(
    store: &mut EntryStore,
    path: P,
    key: &str,
  ) -> Result<DeleteOutcome, EditError> {
    let path = path.as_ref();

    if !store.contains_key(key) {
      #[cfg(feature = "tracing")]
      debug!("Environment variable {:?} not found", key);
      return Ok(DeleteOutcome::NotFound);
    }

    let content = std::fs::read_to_string(path).map_err(EditError::Read)?;
    let Some(updated) = Self::delete_in(store, &content, key)? else {
      return Ok(DeleteOutcome::NotFound);
    };
    let reparsed = parse(&updated).map_err(EditError::Parse)?;

    std::fs::write(path, updated).map_err(EditError::Write)?;
    *store = reparsed;

    #[cfg(feature = "tracing")]
    info!("Deleted {:?}", key);

    Ok(DeleteOutcome::Deleted)
  }

  /// Text-level counterpart of [`Editor::set`]; `rhs` is written verbatim.
  pub fn set_in(
    store: &EntryStore,
    content: &str,
    key: &str,
    rhs: &str,
  ) -> Result<(String, SetOutcome), EditError> {
    let assignment = format!("{key}{ASSIGNMENT_OPERATOR}{rhs}");

    let Some(entry) = store.entry(key) else {
      #[cfg(feature = "tracing")]
      debug!("Appending {:?}", key);

      let mut updated = content.to_string();
      if !updated.is_empty() && !updated.ends_with(LINE_BREAK) {
        updated.push_str(LINE_BREAK);
      }
      updated.push_str(&assignment);
      updated.push_str(LINE_BREAK);
      return Ok((updated, SetOutcome::Appended));
    };

    #[cfg(feature = "tracing")]
    debug!("Replacing lines {}-{}", entry.line_start, entry.line_end);

    let mut lines = split_lines(content);
    check_span(entry, lines.len())?;
    lines.splice(entry.lines(), [assignment.as_str()]);

    Ok((lines.join(LINE_BREAK), SetOutcome::Replaced))
  }

  /// Text-level counterpart of [`Editor::delete`]; `None` when `key` is unknown.
  pub fn delete_in(store: &EntryStore, content: &str, key: &str) -> Result<Option<String>, EditError> {
    let Some(entry) = store.entry(key) else {
      return Ok(None);
    };

    #[cfg(feature = "tracing")]
    debug!("Deleting lines {}-{}", entry.line_start, entry.line_end);

    let mut lines = split_lines(content);
    check_span(entry, lines.len())?;
    lines.drain(entry.lines());

    Ok(Some(lines.join(LINE_BREAK)))
  }
}

fn check_span(entry: &Entry, line_count: usize) -> Result<(), EditError> {
  if entry.line_start > entry.line_end {
    return Err(EditError::InvalidSpan {
      key: entry.key.clone(),
      line_start: entry.line_start + 1,
      line_end: entry.line_end + 1,
    });
  }

  if entry.line_end < line_count {
    Ok(())
  } else {
    Err(EditError::StaleEntry {
      key: entry.key.clone(),
      line: entry.line_end + 1,
      line_count,
    })
  }
}

fn line_breaks(text: &str) -> usize {
  text.matches(LINE_BREAK).count()
}

/// Checks that `key` in `reparsed` covers exactly the lines of `assignment`,
/// written from line `start`, and holds the value `assignment` parses to alone.
fn check_read_back(reparsed: &EntryStore, key: &str, assignment: &str, start: usize) -> Result<(), EditError> {
  let span = line_breaks(assignment);
  let alone = parse(assignment).map_err(EditError::Parse)?;

  let reads_back = match (alone.entry(key), reparsed.entry(key)) {
    (Some(expected), Some(written)) => {
      expected.lines() == (0..=span)
        && written.lines() == (start..=start + span)
        && written.value == expected.value
    }
    _ => false,
  };

  if reads_back {
    Ok(())
  } else {
    #[cfg(feature = "tracing")]
    debug!("{:?} would not read back from lines {}-{}", key, start, start + span);

    Err(EditError::ReadBack { key: key.to_string() })
  }
}

/// Errors that can occur while editing a file.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
  /// Error reading the file before the edit
  #[error("Read error: {0}")]
  Read(std::io::Error),
  /// Error writing the edited content
  #[error("Write error: {0}")]
  Write(std::io::Error),
  /// The edited content does not parse
  #[error("Edit would leave an unreadable file: {0}")]
  Parse(ParseError),
  /// The entry points past the end of the file it is applied to
  #[error("Entry {key} ends on line {line} but the file has {line_count} lines")]
  StaleEntry {
    key: String,
    line: usize,
    line_count: usize,
  },
  /// The entry starts after it ends
  #[error("Entry {key} starts on line {line_start} but ends on line {line_end}")]
  InvalidSpan {
    key: String,
    line_start: usize,
    line_end: usize,
  },
  /// The written assignment would not read back as the value that was set
  #[error("Value for {key} would not read back as written")]
  ReadBack { key: String },
}

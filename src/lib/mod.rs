//! Read and edit `.env` files in place.
//!
//! This library parses `.env` files into an ordered [`EntryStore`] that
//! remembers which lines each assignment came from, resolves `${VAR}`
//! references between entries, and edits the file by rewriting only the lines
//! of the targeted key.
//!
//! # Features
//!
//! - **Quoted and multiline values**: `"..."` and `'...'` values may span lines
//! - **Lists**: `[...]` values are checked as JSON arrays of strings and stored
//!   in canonical form
//! - **Positional edits**: set and delete leave every other line untouched
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use dotenv_cli::edit::Editor;
//!
//! let mut store = dotenv_cli::load(".env").unwrap();
//! println!("{}", store.to_json(true).unwrap());
//!
//! Editor::delete(&mut store, ".env", "OLD_KEY").unwrap();
//! ```

use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::debug;

pub mod edit;
pub mod entry;
pub mod escape;
pub mod output;
pub mod parse;
pub mod rules;
pub mod value;

pub use edit::{DeleteOutcome, EditError, Editor, SetOutcome};
pub use entry::{CycleError, Entry, EntryStore};
pub use escape::{escape_and_quote, format_value};
pub use parse::{ParseError, parse};
pub use rules::{Action, Options, RuleViolation};

/// Reads and parses the file at `path` without resolving references.
///
/// Line spans match the file on disk, which is what [`Editor`] needs.
pub fn read<P: AsRef<Path>>(path: P) -> Result<EntryStore, Error> {
  let path = path.as_ref();

  #[cfg(feature = "tracing")]
  debug!("Reading {:?}", path);

  let content = std::fs::read_to_string(path)?;
  Ok(parse(&content)?)
}

/// Reads and parses the file at `path`, then resolves `${VAR}` references.
pub fn load<P: AsRef<Path>>(path: P) -> Result<EntryStore, Error> {
  match load_partial(path)? {
    (_, Some(cycle)) => Err(cycle.into()),
    (store, None) => Ok(store),
  }
}

/// Like [`load`], but a reference cycle does not discard the rest of the file.
///
/// Entries caught in a cycle keep their unresolved value and are named in the
/// returned [`CycleError`]; all other entries are resolved.
pub fn load_partial<P: AsRef<Path>>(path: P) -> Result<(EntryStore, Option<CycleError>), Error> {
  let mut store = read(path)?;
  let cycle = store.resolve().err();
  Ok((store, cycle))
}

/// Errors surfaced by the library's file-level operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Parse(#[from] ParseError),
  #[error(transparent)]
  Cycle(#[from] CycleError),
  #[error(transparent)]
  Edit(#[from] EditError),
  #[error(transparent)]
  Rule(#[from] RuleViolation),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

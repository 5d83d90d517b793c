//! In-memory model of a parsed `.env` file.
//!
//! An [`EntryStore`] maps each key to the [`Entry`] holding its decoded value
//! and the zero-based, inclusive line span it was read from. Keys keep file
//! order, and re-assigning a key replaces its entry without moving it.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const REFERENCE_MARKER: &str = "${";

static REFERENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("reference pattern is valid"));

/// A single `KEY=VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
  pub key: String,
  pub value: String,
  pub line_start: usize,
  pub line_end: usize,
}

impl Entry {
  pub fn new(key: impl Into<String>, value: impl Into<String>, line_start: usize, line_end: usize) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
      line_start,
      line_end: line_end.max(line_start),
    }
  }

  pub fn lines(&self) -> RangeInclusive<usize> {
    self.line_start..=self.line_end
  }

  pub fn is_multiline(&self) -> bool {
    self.line_end > self.line_start
  }
}

impl fmt::Display for Entry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.key, self.value)
  }
}

/// Ordered collection of entries, keyed by variable name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryStore {
  entries: IndexMap<String, Entry>,
}

impl EntryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `entry`, replacing any previous entry for the same key in place.
  pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
    self.entries.insert(entry.key.clone(), entry)
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(|entry| entry.value.as_str())
  }

  pub fn entry(&self, key: &str) -> Option<&Entry> {
    self.entries.get(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  /// Removes `key` while keeping the order of the remaining entries.
  pub fn remove(&mut self, key: &str) -> Option<Entry> {
    self.entries.shift_remove(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Entry> {
    self.entries.values()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Plain `key -> value` mapping in file order.
  pub fn to_map(&self) -> IndexMap<String, String> {
    self
      .entries
      .iter()
      .map(|(key, entry)| (key.clone(), entry.value.clone()))
      .collect()
  }

  pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
      serde_json::to_string_pretty(self)
    } else {
      serde_json::to_string(self)
    }
  }

  /// Substitutes `${KEY}` references with the referenced entry's value.
  ///
  /// Each entry is rewritten pass after pass until a pass makes no
  /// substitution. References read whatever the target entry holds at that
  /// moment, so entries earlier in the file are usually already resolved.
  /// Unknown keys are left untouched.
  ///
  /// Entries that sit on a reference cycle, or reach one through their
  /// references, are found from the reference graph before anything is
  /// substituted. They keep their original value and are reported in the
  /// returned [`CycleError`]; every other entry is still resolved.
  pub fn resolve(&mut self) -> Result<(), CycleError> {
    let cyclic = self.cyclic_entries();
    let max_passes = self.entries.len() + 1;
    let mut unsettled = Vec::new();

    for index in 0..self.entries.len() {
      if cyclic[index] {
        #[cfg(feature = "tracing")]
        debug!("Reference cycle while resolving {}", self.entries[index].key);
        continue;
      }

      let original = self.entries[index].value.clone();
      if !original.contains(REFERENCE_MARKER) {
        continue;
      }

      let mut passes = 0;
      loop {
        let Some(next) = self.substitute(&self.entries[index].value) else {
          break;
        };

        // Substituted text can spell out a reference that was not there before
        passes += 1;
        if passes > max_passes {
          let entry = &mut self.entries[index];
          entry.value = original;
          unsettled.push(index);
          break;
        }

        #[cfg(feature = "tracing")]
        trace!("Resolved pass {} of {}: {:?}", passes, self.entries[index].key, next);

        self.entries[index].value = next;
      }
    }

    let keys: Vec<String> = self
      .entries
      .values()
      .enumerate()
      .filter(|(index, _)| cyclic[*index] || unsettled.contains(index))
      .map(|(_, entry)| entry.key.clone())
      .collect();

    if keys.is_empty() {
      Ok(())
    } else {
      Err(CycleError { keys })
    }
  }

  /// Marks every entry that is on a reference cycle or references into one.
  fn cyclic_entries(&self) -> Vec<bool> {
    let edges: Vec<Vec<usize>> = self
      .entries
      .values()
      .map(|entry| {
        REFERENCE
          .captures_iter(&entry.value)
          .filter_map(|caps| self.entries.get_index_of(&caps[1]))
          .collect()
      })
      .collect();

    let mut marks = vec![Mark::Unvisited; edges.len()];
    (0..edges.len())
      .map(|index| visit(index, &edges, &mut marks))
      .collect()
  }

  /// One substitution pass over `value`, or `None` when nothing was replaced.
  fn substitute(&self, value: &str) -> Option<String> {
    let mut substituted = false;
    let next = REFERENCE.replace_all(value, |caps: &Captures| match self.entries.get(&caps[1]) {
      Some(entry) => {
        substituted = true;
        entry.value.clone()
      }
      None => caps[0].to_string(),
    });

    substituted.then(|| next.into_owned())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  Visiting,
  Acyclic,
  Cyclic,
}

/// Depth-first walk of the reference graph; true when `index` reaches a cycle.
fn visit(index: usize, edges: &[Vec<usize>], marks: &mut [Mark]) -> bool {
  match marks[index] {
    Mark::Visiting | Mark::Cyclic => return true,
    Mark::Acyclic => return false,
    Mark::Unvisited => {}
  }

  marks[index] = Mark::Visiting;
  let mut cyclic = false;
  for &next in &edges[index] {
    cyclic |= visit(next, edges, marks);
  }
  marks[index] = if cyclic { Mark::Cyclic } else { Mark::Acyclic };

  cyclic
}

impl FromIterator<Entry> for EntryStore {
  fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
    let mut store = Self::new();
    for entry in iter {
      store.insert(entry);
    }
    store
  }
}

impl Serialize for EntryStore {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, entry) in &self.entries {
      map.serialize_entry(key, &entry.value)?;
    }
    map.end()
  }
}

/// `${...}` references that never settled on a final value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Variable reference cycle in: {}", keys.join(", "))]
pub struct CycleError {
  pub keys: Vec<String>,
}

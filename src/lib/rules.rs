//! Command-line request model and the rules a request must satisfy.

use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Flags and arguments as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
  pub keys: Vec<String>,
  pub json: bool,
  pub multiline: bool,
  pub quote: bool,
  /// Value to set, from `--set` or piped input.
  pub set: Option<String>,
  pub delete: bool,
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// Print values. `keys` empty means every key in file order.
  Get {
    keys: Vec<String>,
    json: bool,
    multiline: bool,
  },
  Set {
    key: String,
    value: String,
    quote: bool,
  },
  Delete {
    key: String,
  },
}

impl Options {
  /// Checks the qualifying rules and turns the options into an [`Action`].
  ///
  /// Anything other than a single key is printed as JSON.
  pub fn action(self) -> Result<Action, RuleViolation> {
    let Options {
      mut keys,
      json,
      multiline,
      quote,
      set,
      delete,
    } = self;

    if json && set.is_some() {
      return Err(RuleViolation::JsonWithSet);
    }
    if delete && (set.is_some() || json || multiline) {
      return Err(RuleViolation::DeleteWithOthers);
    }

    if let Some(value) = set {
      let key = single_key(&mut keys).ok_or(RuleViolation::SetNeedsSingleKey)?;
      #[cfg(feature = "tracing")]
      debug!("Request: set {}", key);
      return Ok(Action::Set { key, value, quote });
    }

    if delete {
      let key = single_key(&mut keys).ok_or(RuleViolation::DeleteNeedsSingleKey)?;
      #[cfg(feature = "tracing")]
      debug!("Request: delete {}", key);
      return Ok(Action::Delete { key });
    }

    let json = json || keys.len() != 1;
    #[cfg(feature = "tracing")]
    debug!("Request: get {:?} (json: {})", keys, json);

    Ok(Action::Get {
      keys,
      json,
      multiline,
    })
  }
}

fn single_key(keys: &mut Vec<String>) -> Option<String> {
  if keys.len() == 1 { keys.pop() } else { None }
}

/// A request that cannot be carried out as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
  #[error("Cannot use --json and --set together")]
  JsonWithSet,
  #[error("Must specify a single key when using --set")]
  SetNeedsSingleKey,
  #[error("Cannot use --delete with any other options")]
  DeleteWithOthers,
  #[error("Must specify a single key when using --delete")]
  DeleteNeedsSingleKey,
  #[error("File not found: {}", .0.display())]
  FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
  }

  #[test]
  fn test_single_key_get() {
    let options = Options {
      keys: keys(&["NAME"]),
      multiline: true,
      ..Default::default()
    };

    assert_eq!(
      options.action().unwrap(),
      Action::Get {
        keys: keys(&["NAME"]),
        json: false,
        multiline: true,
      }
    );
  }

  #[test]
  fn test_no_keys_or_many_keys_is_json() {
    let action = Options::default().action().unwrap();
    assert!(matches!(action, Action::Get { json: true, .. }));

    let options = Options {
      keys: keys(&["NAME", "DOUBLE"]),
      ..Default::default()
    };
    assert!(matches!(options.action().unwrap(), Action::Get { json: true, .. }));
  }

  #[test]
  fn test_set() {
    let options = Options {
      keys: keys(&["NAME"]),
      set: Some("value".to_string()),
      quote: true,
      ..Default::default()
    };

    assert_eq!(
      options.action().unwrap(),
      Action::Set {
        key: "NAME".to_string(),
        value: "value".to_string(),
        quote: true,
      }
    );
  }

  #[test]
  fn test_json_with_set_is_rejected() {
    let options = Options {
      keys: keys(&["NAME"]),
      json: true,
      set: Some("value".to_string()),
      ..Default::default()
    };
    assert_eq!(options.action().unwrap_err(), RuleViolation::JsonWithSet);
  }

  #[test]
  fn test_set_needs_single_key() {
    for given in [keys(&[]), keys(&["A", "B"])] {
      let options = Options {
        keys: given,
        set: Some("value".to_string()),
        ..Default::default()
      };
      assert_eq!(options.action().unwrap_err(), RuleViolation::SetNeedsSingleKey);
    }
  }

  #[test]
  fn test_delete_rules() {
    let options = Options {
      keys: keys(&["A"]),
      delete: true,
      multiline: true,
      ..Default::default()
    };
    assert_eq!(options.action().unwrap_err(), RuleViolation::DeleteWithOthers);

    let options = Options {
      delete: true,
      ..Default::default()
    };
    assert_eq!(options.action().unwrap_err(), RuleViolation::DeleteNeedsSingleKey);

    let options = Options {
      keys: keys(&["A"]),
      delete: true,
      ..Default::default()
    };
    assert_eq!(
      options.action().unwrap(),
      Action::Delete {
        key: "A".to_string()
      }
    );
  }
}

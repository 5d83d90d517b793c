//! Quoting of values written to disk and formatting of values read back.

const DOUBLE_QUOTE: char = '"';
const SINGLE_QUOTE: char = '\'';
const BACKSLASH: char = '\\';
const LINE_BREAK: &str = "\n";
const ESCAPED_LINE_BREAK: &str = "\\n";

/// Produces the right-hand side to store for `value`.
///
/// A value already wrapped in double quotes is unwrapped first, so quoting is
/// idempotent. List literals are returned as-is unless `force` is set.
/// Otherwise the value is quoted when `force` is set or when it could not be
/// read back as a bare value: whitespace, any quote character, or a leading
/// `[`. Quoting escapes every `"` not already preceded by a backslash.
pub fn escape_and_quote(value: &str, force: bool) -> String {
  let value = value
    .strip_prefix(DOUBLE_QUOTE)
    .and_then(|inner| inner.strip_suffix(DOUBLE_QUOTE))
    .unwrap_or(value);

  if !force && is_list_literal(value) {
    return value.to_string();
  }

  if force || needs_quotes(value) {
    format!("{DOUBLE_QUOTE}{}{DOUBLE_QUOTE}", escape_quotes(value))
  } else {
    value.to_string()
  }
}

/// Renders a stored value for output.
///
/// With `multiline`, literal `\n` sequences become line breaks. Without it,
/// line breaks are written as literal `\n` so the value fits on one line.
pub fn format_value(value: &str, multiline: bool) -> String {
  if multiline {
    value.replace(ESCAPED_LINE_BREAK, LINE_BREAK)
  } else {
    value.replace(LINE_BREAK, ESCAPED_LINE_BREAK)
  }
}

fn is_list_literal(value: &str) -> bool {
  value.starts_with('[') && value.ends_with(']')
}

fn needs_quotes(value: &str) -> bool {
  value.starts_with('[')
    || value
      .chars()
      .any(|c| c.is_whitespace() || c == DOUBLE_QUOTE || c == SINGLE_QUOTE)
}

fn escape_quotes(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  let mut previous = None;

  for c in value.chars() {
    if c == DOUBLE_QUOTE && previous != Some(BACKSLASH) {
      escaped.push(BACKSLASH);
    }
    escaped.push(c);
    previous = Some(c);
  }

  escaped
}

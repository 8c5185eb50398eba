//! Shell word quoting and small rendering helpers shared by all dialect builders.
//!
//! Everything here produces POSIX `sh` syntax. Builders never concatenate raw
//! user values into a command line; they go through [`quote`] (single-quoted
//! words) or [`double_quote`] (when a `$VAR` expansion must survive).

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Continuation used between pipeline stages and long option lists.
pub const CONTINUATION: &str = " \\\n  ";

/// Separator between two stages of a pipeline.
pub const PIPE: &str = " \\\n  | ";

static SAFE_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9@%+=:,./_-]+$").unwrap());

/// Quote a value as a single shell word.
///
/// Words made only of safe characters are returned unchanged, everything else
/// is wrapped in single quotes with embedded single quotes spliced as `'"'"'`.
pub fn quote(value: &str) -> Cow<'_, str> {
    if value.is_empty() {
        return Cow::Borrowed("''");
    }
    if SAFE_WORD_RE.is_match(value) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("'{}'", value.replace('\'', "'\"'\"'")))
}

/// Escape a value for use inside a double-quoted shell string.
///
/// Only `\`, `"`, `$` and `` ` `` are special there.
pub fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Wrap `before`, an unescaped `${var}` expansion and `after` into one
/// double-quoted shell word.
pub fn double_quote_around_var(before: &str, var: &str, after: &str) -> String {
    format!(
        "\"{}${{{}}}{}\"",
        escape_double_quoted(before),
        var,
        escape_double_quoted(after)
    )
}

/// Double-quote a whole value.
pub fn double_quote(value: &str) -> String {
    format!("\"{}\"", escape_double_quoted(value))
}

/// Render `NAME=value` environment assignments, skipping unset values.
pub fn env_prefix<'a, I>(vars: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut out = String::new();
    for (name, value) in vars {
        if let Some(value) = value {
            out.push_str(name);
            out.push('=');
            out.push_str(&quote(value));
            out.push(' ');
        }
    }
    out
}

/// A filter that reads the whole statement from stdin and prints it without
/// trailing statement terminators and whitespace.
///
/// Used wherever the statement gets wrapped into another statement, so the
/// wrap stays syntactically valid.
pub fn strip_trailing_terminator() -> &'static str {
    r#"awk '{ buf = buf $0 "\n" } END { sub(/[;[:space:]]+$/, "", buf); printf "%s", buf }'"#
}

/// Read the statement from stdin, strip its terminator and surround it with
/// `prefix` and `suffix`.
///
/// The suffix starts on a new line so a trailing `--` comment cannot hide it.
pub fn wrap_statement(prefix: &str, suffix: &str) -> String {
    format!(
        "(printf '%s' {} && {} && printf '\\n%s\\n' {})",
        quote(prefix),
        strip_trailing_terminator(),
        quote(suffix)
    )
}

/// Render a character for display in error messages and capability listings.
pub fn display_char(c: char) -> String {
    match c {
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_safe_word_unchanged() {
        assert_eq!(quote("localhost"), "localhost");
        assert_eq!(quote("db.example.com:5432"), "db.example.com:5432");
    }

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_with_spaces_and_quotes() {
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("it's"), "'it'\"'\"'s'");
    }

    #[test]
    fn test_quote_keeps_backslashes_literal() {
        assert_eq!(quote("\\N"), "'\\N'");
    }

    #[test]
    fn test_escape_double_quoted() {
        assert_eq!(escape_double_quoted("a\"b$c`d\\e"), "a\\\"b\\$c\\`d\\\\e");
    }

    #[test]
    fn test_double_quote_around_var() {
        assert_eq!(
            double_quote_around_var("COPY t FROM '", "OBJ", "'"),
            "\"COPY t FROM '${OBJ}'\""
        );
    }

    #[test]
    fn test_env_prefix_skips_unset() {
        let prefix = env_prefix([("A", Some("1")), ("B", None), ("C", Some("x y"))]);
        assert_eq!(prefix, "A=1 C='x y' ");
    }

    #[test]
    fn test_wrap_statement_quotes_prefix_and_suffix() {
        let cmd = wrap_statement("COPY (", ") TO STDOUT");
        assert!(cmd.starts_with("(printf '%s' 'COPY ('"));
        assert!(cmd.ends_with("printf '\\n%s\\n' ') TO STDOUT')"));
        assert!(cmd.contains("awk"));
    }

    fn run_filter(command: &str, input: &str) -> String {
        use std::io::Write;
        use std::process::{Command, Stdio};

        let mut child = Command::new("sh")
            .args(["-c", command])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn test_wrap_statement_strips_terminator() {
        let out = run_filter(&wrap_statement("COPY (", ") TO STDOUT"), "SELECT 1;\n\n");
        assert_eq!(out, "COPY (SELECT 1\n) TO STDOUT\n");
    }

    #[test]
    fn test_wrap_statement_survives_trailing_line_comment() {
        let out = run_filter(&wrap_statement("COPY (", ") TO STDOUT"), "SELECT 1 -- c\n");
        assert_eq!(out, "COPY (SELECT 1 -- c\n) TO STDOUT\n");
        assert_eq!(out.lines().last(), Some(") TO STDOUT"));
    }
}

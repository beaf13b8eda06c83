//! Delimited row splitting
//!
//! The simulator quotes disassembly text, and operands such as `a0, a1, 4`
//! contain commas, so a plain `split(',')` would shift every later column.

use super::TraceError;
use std::io::BufRead;

/// One physical line of a trace file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawLine {
    /// 1-based line number
    pub number: usize,
    /// Line text, or `None` when the bytes are not UTF-8
    pub text: Option<String>,
}

/// Iterate raw lines; only failures of the reader itself are errors
///
/// Simulator logs can carry stray bytes in disassembly text. Such a line is
/// handed on with no text so the caller can skip it and keep counting. A
/// trailing `\r` is removed as `BufRead::lines` would.
pub(crate) fn raw_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<RawLine, TraceError>> {
    reader.split(b'\n').enumerate().map(|(index, bytes)| {
        let mut bytes = bytes.map_err(|source| TraceError::Read {
            line: index + 1,
            source,
        })?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        Ok(RawLine {
            number: index + 1,
            text: String::from_utf8(bytes).ok(),
        })
    })
}

/// Quote a field for CSV output when it holds a comma, quote or newline
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one comma-separated line into trimmed fields
///
/// Double-quoted fields may contain commas; a doubled quote (`""`) inside a
/// quoted field is an escaped quote. An unterminated quote runs to end of line.
///
/// # Example
/// ```
/// use stallscope::trace::split_row;
///
/// let fields = split_row(r#"0x80000000,"addi a0, a0, 1",3"#);
/// assert_eq!(fields, vec!["0x80000000", "addi a0, a0, 1", "3"]);
/// ```
pub fn split_row(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_lines_keep_going_past_invalid_utf8() {
        let data: &[u8] = b"0x0,nop\n0x4,\xff\xfe\n0x8,nop";
        let lines: Vec<_> = raw_lines(data).collect::<Result<_, _>>().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text.as_deref(), Some("0x0,nop"));
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].text, None);
        assert_eq!(lines[2].text.as_deref(), Some("0x8,nop"));

        let crlf: &[u8] = b"0x0,nop\r\n\r\n";
        let lines: Vec<_> = raw_lines(crlf).collect::<Result<_, _>>().unwrap();
        assert_eq!(lines[0].text.as_deref(), Some("0x0,nop"));
        assert_eq!(lines[1].text.as_deref(), Some(""));
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("0x10"), "0x10");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(split_row(&escape_field("x, \"y\"")), vec!["x, \"y\""]);
    }

    #[test]
    fn test_split_plain_fields() {
        assert_eq!(split_row("1,2,3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_split_trims_whitespace_and_line_endings() {
        assert_eq!(split_row(" 0x10 , lw ,7\r\n"), vec!["0x10", "lw", "7"]);
    }

    #[test]
    fn test_split_quoted_commas() {
        let fields = split_row(r#"0x80000004,"sw a1, 8(sp)",5,6"#);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[1], "sw a1, 8(sp)");
    }

    #[test]
    fn test_split_escaped_quote() {
        let fields = split_row(r#""say ""hi""",2"#);
        assert_eq!(fields, vec![r#"say "hi""#, "2"]);
    }

    #[test]
    fn test_split_empty_trailing_field() {
        assert_eq!(split_row("10,5,"), vec!["10", "5", ""]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(split_row(r#"1,"abc, def"#), vec!["1", "abc, def"]);
    }
}

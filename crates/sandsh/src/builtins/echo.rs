//! echo and printf builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// echo - write arguments to standard output.
///
/// Flags: -n (no trailing newline), -e (interpret escapes), -E (literal).
pub struct Echo;

#[async_trait]
impl Builtin for Echo {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut newline = true;
        let mut escapes = false;
        let mut args = ctx.args;

        while let Some(first) = args.first() {
            match first.as_str() {
                "-n" => newline = false,
                "-e" => escapes = true,
                "-E" => escapes = false,
                "-ne" | "-en" => {
                    newline = false;
                    escapes = true;
                }
                _ => break,
            }
            args = &args[1..];
        }

        let mut out = args.join(" ");
        if escapes {
            let (expanded, stop) = process_escapes(&out);
            out = expanded;
            if stop {
                return Ok(ExecResult::ok(out));
            }
        }
        if newline {
            out.push('\n');
        }
        Ok(ExecResult::ok(out))
    }

    fn usage(&self) -> &'static str {
        "usage: echo [-neE] [arg ...]"
    }
}

/// Expand backslash escapes; `\c` truncates output and suppresses the
/// newline.
fn process_escapes(input: &str) -> (String, bool) {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('e') | Some('E') => out.push('\x1b'),
            Some('\\') => out.push('\\'),
            Some('c') => return (out, true),
            Some('0') => {
                let mut octal = String::new();
                while octal.len() < 3 {
                    match chars.peek() {
                        Some(d) if d.is_digit(8) => {
                            octal.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Ok(v) = u8::from_str_radix(&octal, 8) {
                    out.push(v as char);
                }
            }
            Some('x') => {
                let mut hex = String::new();
                while hex.len() < 2 {
                    match chars.peek() {
                        Some(d) if d.is_ascii_hexdigit() => {
                            hex.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u8::from_str_radix(&hex, 16) {
                    Ok(v) => out.push(v as char),
                    Err(_) => out.push_str("\\x"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    (out, false)
}

/// printf - formatted output.
///
/// Supports %s %d %i %u %x %X %o %c %% with width, `-` alignment, zero
/// padding, and precision. The format string cycles until every argument
/// is consumed.
pub struct Printf;

#[async_trait]
impl Builtin for Printf {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let Some(format) = ctx.args.first() else {
            return Ok(ExecResult::err("printf: usage: printf format [arguments]\n", 2));
        };
        let args = &ctx.args[1..];
        let mut out = String::new();
        let mut index = 0;

        loop {
            let consumed = format_once(format, args, &mut index, &mut out);
            // Cycle only while arguments remain and the format consumes some.
            if index >= args.len() || consumed == 0 {
                break;
            }
        }
        Ok(ExecResult::ok(out))
    }

    fn usage(&self) -> &'static str {
        "usage: printf format [arguments ...]"
    }
}

/// One pass over the format string. Returns how many arguments were used.
fn format_once(format: &str, args: &[String], index: &mut usize, out: &mut String) -> usize {
    let mut used = 0;
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let mut buf = String::from("\\");
                if let Some(n) = chars.next() {
                    buf.push(n);
                }
                let (expanded, _) = process_escapes(&buf);
                out.push_str(&expanded);
            }
            '%' => {
                if chars.peek() == Some(&'%') {
                    chars.next();
                    out.push('%');
                    continue;
                }
                let mut left = false;
                let mut zero = false;
                let mut width = String::new();
                let mut precision = String::new();
                while let Some(&f) = chars.peek() {
                    match f {
                        '-' => {
                            left = true;
                            chars.next();
                        }
                        '0' if width.is_empty() => {
                            zero = true;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        width.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() == Some(&'.') {
                    chars.next();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            precision.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                let conv = chars.next().unwrap_or('s');
                let arg = args.get(*index).cloned().unwrap_or_default();
                if !matches!(conv, '%') {
                    *index += 1;
                    used += 1;
                }
                let rendered = render_conversion(conv, &arg, &precision);
                out.push_str(&pad(&rendered, &width, left, zero && !left));
            }
            _ => out.push(c),
        }
    }
    used
}

fn render_conversion(conv: char, arg: &str, precision: &str) -> String {
    let int_value = || parse_int(arg);
    match conv {
        'd' | 'i' => int_value().to_string(),
        'u' => (int_value() as u64).to_string(),
        'x' => format!("{:x}", int_value()),
        'X' => format!("{:X}", int_value()),
        'o' => format!("{:o}", int_value()),
        'c' => arg.chars().next().map(String::from).unwrap_or_default(),
        's' => {
            let mut s = arg.to_string();
            if let Ok(p) = precision.parse::<usize>() {
                s = s.chars().take(p).collect();
            }
            s
        }
        'q' => crate::transform::quote_word(arg),
        other => format!("%{other}"),
    }
}

fn parse_int(arg: &str) -> i64 {
    let t = arg.trim();
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).unwrap_or(0);
    }
    t.parse().unwrap_or(0)
}

fn pad(s: &str, width: &str, left: bool, zero: bool) -> String {
    let Ok(w) = width.parse::<usize>() else {
        return s.to_string();
    };
    let len = s.chars().count();
    if len >= w {
        return s.to_string();
    }
    let fill = if zero { '0' } else { ' ' };
    let padding: String = std::iter::repeat(fill).take(w - len).collect();
    if left {
        format!("{s}{padding}")
    } else if zero && (s.starts_with('-')) {
        format!("-{padding}{}", &s[1..])
    } else {
        format!("{padding}{s}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn escape_processing() {
        let (out, stop) = process_escapes("a\\tb\\n");
        assert_eq!(out, "a\tb\n");
        assert!(!stop);

        let (out, stop) = process_escapes("ab\\cde");
        assert_eq!(out, "ab");
        assert!(stop);

        let (out, _) = process_escapes("\\x41\\060");
        assert_eq!(out, "A0");
    }

    #[test]
    fn pad_widths() {
        assert_eq!(pad("7", "3", false, false), "  7");
        assert_eq!(pad("7", "3", true, false), "7  ");
        assert_eq!(pad("7", "3", false, true), "007");
        assert_eq!(pad("-7", "4", false, true), "-007");
        assert_eq!(pad("hello", "3", false, false), "hello");
    }

    #[test]
    fn integer_parsing() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("0x1f"), 31);
        assert_eq!(parse_int("junk"), 0);
    }
}

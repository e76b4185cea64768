//! cut and tr builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// cut - select fields or characters from each line.
///
/// Supports `-d DELIM -f LIST` and `-c LIST`, where LIST is comma-separated
/// numbers and ranges (`1,3-5`, `2-`).
pub struct Cut;

#[async_trait]
impl Builtin for Cut {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut delimiter = '\t';
        let mut fields: Option<String> = None;
        let mut chars_list: Option<String> = None;
        let mut files = Vec::new();

        let mut iter = ctx.args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-d" => {
                    if let Some(d) = iter.next() {
                        delimiter = d.chars().next().unwrap_or('\t');
                    }
                }
                "-f" => fields = iter.next().cloned(),
                "-c" => chars_list = iter.next().cloned(),
                other if other.starts_with("-d") => {
                    delimiter = other[2..].chars().next().unwrap_or('\t');
                }
                other if other.starts_with("-f") => fields = Some(other[2..].to_string()),
                other if other.starts_with("-c") => chars_list = Some(other[2..].to_string()),
                _ => files.push(arg.clone()),
            }
        }

        let spec = match (&fields, &chars_list) {
            (Some(f), _) => f,
            (None, Some(c)) => c,
            (None, None) => {
                return Ok(ExecResult::err(
                    "cut: you must specify a list of fields or characters\n",
                    1,
                ))
            }
        };
        let Some(ranges) = parse_ranges(spec) else {
            return Ok(ExecResult::err(format!("cut: invalid list: '{spec}'\n"), 1));
        };

        let mut content = String::new();
        let mut stderr = String::new();
        if files.is_empty() {
            content = ctx.take_stdin().unwrap_or_default();
        } else {
            for file in &files {
                let path = ctx.resolve(file);
                match ctx.fs.read_file(&path).await {
                    Ok(bytes) => content.push_str(&String::from_utf8_lossy(&bytes)),
                    Err(e) => stderr.push_str(&format!("cut: {file}: {e}\n")),
                }
            }
        }

        let mut out = String::new();
        for line in content.lines() {
            if fields.is_some() {
                if !line.contains(delimiter) {
                    out.push_str(line);
                    out.push('\n');
                    continue;
                }
                let parts: Vec<&str> = line.split(delimiter).collect();
                let selected: Vec<&str> = select(&ranges, parts.len())
                    .into_iter()
                    .map(|i| parts[i])
                    .collect();
                out.push_str(&selected.join(&delimiter.to_string()));
            } else {
                let chars: Vec<char> = line.chars().collect();
                let selected: String = select(&ranges, chars.len())
                    .into_iter()
                    .map(|i| chars[i])
                    .collect();
                out.push_str(&selected);
            }
            out.push('\n');
        }

        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 1 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: cut -f list [-d delim] [file ...] | cut -c list [file ...]"
    }
}

/// Parse `1,3-5,7-` into inclusive 1-based ranges.
fn parse_ranges(spec: &str) -> Option<Vec<(usize, Option<usize>)>> {
    let mut ranges = Vec::new();
    for part in spec.split(',') {
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: usize = if lo.is_empty() { 1 } else { lo.parse().ok()? };
            let hi: Option<usize> = if hi.is_empty() {
                None
            } else {
                Some(hi.parse().ok()?)
            };
            if lo == 0 {
                return None;
            }
            ranges.push((lo, hi));
        } else {
            let n: usize = part.parse().ok()?;
            if n == 0 {
                return None;
            }
            ranges.push((n, Some(n)));
        }
    }
    Some(ranges)
}

/// 0-based indices selected by the ranges, in order, deduplicated.
fn select(ranges: &[(usize, Option<usize>)], len: usize) -> Vec<usize> {
    let mut picked = vec![false; len];
    for &(lo, hi) in ranges {
        let hi = hi.unwrap_or(len).min(len);
        for i in lo..=hi {
            if i >= 1 && i <= len {
                picked[i - 1] = true;
            }
        }
    }
    (0..len).filter(|&i| picked[i]).collect()
}

/// tr - translate or delete characters. Supports SET1 SET2 translation
/// with ranges (`a-z`), classes (`[:lower:]`), `-d` deletion, and `-s`
/// squeezing.
pub struct Tr;

#[async_trait]
impl Builtin for Tr {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut delete = false;
        let mut squeeze = false;
        let mut sets = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-d" => delete = true,
                "-s" => squeeze = true,
                "-ds" | "-sd" => {
                    delete = true;
                    squeeze = true;
                }
                _ => sets.push(arg.clone()),
            }
        }

        let input = ctx.take_stdin().unwrap_or_default();
        let set1 = match sets.first() {
            Some(s) => expand_set(s),
            None => return Ok(ExecResult::err("tr: missing operand\n", 1)),
        };

        let mut out = String::with_capacity(input.len());
        if delete {
            for c in input.chars() {
                if !set1.contains(&c) {
                    out.push(c);
                }
            }
        } else if let Some(set2_spec) = sets.get(1) {
            let set2 = expand_set(set2_spec);
            for c in input.chars() {
                match set1.iter().position(|&s| s == c) {
                    Some(i) => {
                        // Short SET2 repeats its last character.
                        let mapped = set2.get(i).or(set2.last()).copied().unwrap_or(c);
                        out.push(mapped);
                    }
                    None => out.push(c),
                }
            }
        } else if squeeze {
            // `tr -s SET1` squeezes without translating.
            out = input;
        } else {
            return Ok(ExecResult::err("tr: missing operand after set 1\n", 1));
        }

        if squeeze {
            // With two sets squeeze applies to SET2, otherwise to SET1.
            let squeeze_set: Vec<char> = if sets.len() > 1 && !delete {
                expand_set(&sets[1])
            } else {
                set1.clone()
            };
            let mut squeezed = String::with_capacity(out.len());
            let mut prev: Option<char> = None;
            for c in out.chars() {
                if Some(c) == prev && squeeze_set.contains(&c) {
                    continue;
                }
                squeezed.push(c);
                prev = Some(c);
            }
            out = squeezed;
        }

        Ok(ExecResult::ok(out))
    }

    fn usage(&self) -> &'static str {
        "usage: tr [-ds] set1 [set2]"
    }
}

/// Expand a tr set: ranges, classes, and backslash escapes.
fn expand_set(spec: &str) -> Vec<char> {
    let mut out = Vec::new();
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        // [:class:]
        if chars[i] == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(end) = spec[i..].find(":]") {
                let name = &spec[i + 2..i + end];
                out.extend(class_chars(name));
                i += end + 2;
                continue;
            }
        }
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(match chars[i + 1] {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
            i += 2;
            continue;
        }
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] >= chars[i] {
            let (lo, hi) = (chars[i], chars[i + 2]);
            for c in lo..=hi {
                out.push(c);
            }
            i += 3;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn class_chars(name: &str) -> Vec<char> {
    match name {
        "lower" => ('a'..='z').collect(),
        "upper" => ('A'..='Z').collect(),
        "digit" => ('0'..='9').collect(),
        "alpha" => ('a'..='z').chain('A'..='Z').collect(),
        "alnum" => ('a'..='z').chain('A'..='Z').chain('0'..='9').collect(),
        "space" => vec![' ', '\t', '\n', '\r', '\x0b', '\x0c'],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_parsing() {
        assert_eq!(parse_ranges("1,3-5"), Some(vec![(1, Some(1)), (3, Some(5))]));
        assert_eq!(parse_ranges("2-"), Some(vec![(2, None)]));
        assert!(parse_ranges("0").is_none());
        assert!(parse_ranges("x").is_none());
    }

    #[test]
    fn selection() {
        let ranges = parse_ranges("1,3-").unwrap();
        assert_eq!(select(&ranges, 4), vec![0, 2, 3]);
    }

    #[test]
    fn set_expansion() {
        assert_eq!(expand_set("a-d"), vec!['a', 'b', 'c', 'd']);
        assert_eq!(expand_set("\\n"), vec!['\n']);
        assert!(expand_set("[:digit:]").contains(&'7'));
    }
}

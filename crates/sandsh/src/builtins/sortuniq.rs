//! sort and uniq builtins.

use async_trait::async_trait;
use std::cmp::Ordering;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

async fn gather_lines(
    ctx: &mut Context<'_>,
    name: &str,
    files: &[String],
) -> (Vec<String>, String) {
    let mut content = String::new();
    let mut stderr = String::new();
    if files.is_empty() {
        content = ctx.take_stdin().unwrap_or_default();
    } else {
        for file in files {
            if file == "-" {
                content.push_str(&ctx.take_stdin().unwrap_or_default());
                continue;
            }
            let path = ctx.resolve(file);
            match ctx.fs.read_file(&path).await {
                Ok(bytes) => content.push_str(&String::from_utf8_lossy(&bytes)),
                Err(e) => stderr.push_str(&format!("{name}: {file}: {e}\n")),
            }
        }
    }
    let lines = content.lines().map(str::to_string).collect();
    (lines, stderr)
}

/// sort - sort lines.
///
/// Flags: -r (reverse), -n (numeric), -u (unique), -f (fold case).
pub struct Sort;

#[async_trait]
impl Builtin for Sort {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut reverse = false;
        let mut numeric = false;
        let mut unique = false;
        let mut fold = false;
        let mut files = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-r" => reverse = true,
                "-n" => numeric = true,
                "-u" => unique = true,
                "-f" => fold = true,
                "-rn" | "-nr" => {
                    reverse = true;
                    numeric = true;
                }
                _ => files.push(arg.clone()),
            }
        }

        let (mut lines, stderr) = gather_lines(ctx, "sort", &files).await;
        lines.sort_by(|a, b| {
            let ord = if numeric {
                let na = leading_number(a);
                let nb = leading_number(b);
                na.partial_cmp(&nb).unwrap_or(Ordering::Equal).then(a.cmp(b))
            } else if fold {
                a.to_lowercase().cmp(&b.to_lowercase()).then(a.cmp(b))
            } else {
                a.cmp(b)
            };
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        if unique {
            lines.dedup();
        }

        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 2 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: sort [-rnuf] [file ...]"
    }
}

fn leading_number(s: &str) -> f64 {
    let t = s.trim_start();
    let end = t
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    t[..end].parse().unwrap_or(0.0)
}

/// uniq - filter adjacent duplicate lines.
///
/// Flags: -c (prefix counts), -d (only duplicates), -u (only unique).
pub struct Uniq;

#[async_trait]
impl Builtin for Uniq {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut counts = false;
        let mut dups_only = false;
        let mut unique_only = false;
        let mut files = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-c" => counts = true,
                "-d" => dups_only = true,
                "-u" => unique_only = true,
                _ => files.push(arg.clone()),
            }
        }

        let (lines, stderr) = gather_lines(ctx, "uniq", &files).await;
        let mut out = String::new();
        let mut i = 0;
        while i < lines.len() {
            let mut j = i + 1;
            while j < lines.len() && lines[j] == lines[i] {
                j += 1;
            }
            let run = j - i;
            let keep = if dups_only {
                run > 1
            } else if unique_only {
                run == 1
            } else {
                true
            };
            if keep {
                if counts {
                    out.push_str(&format!("{:7} {}\n", run, lines[i]));
                } else {
                    out.push_str(&lines[i]);
                    out.push('\n');
                }
            }
            i = j;
        }

        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 1 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: uniq [-cdu] [file ...]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefixes() {
        assert_eq!(leading_number("42abc"), 42.0);
        assert_eq!(leading_number("  -3"), -3.0);
        assert_eq!(leading_number("x"), 0.0);
    }
}

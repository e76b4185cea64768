//! head and tail builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

struct Selection {
    lines: Option<usize>,
    bytes: Option<usize>,
}

fn parse_args<'a>(
    name: &str,
    args: &'a [String],
) -> std::result::Result<(Selection, Vec<&'a String>), String> {
    let mut selection = Selection {
        lines: None,
        bytes: None,
    };
    let mut files = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-n" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{name}: option requires an argument -- 'n'\n"))?;
                selection.lines = Some(
                    value
                        .trim_start_matches(['-', '+'])
                        .parse()
                        .map_err(|_| format!("{name}: invalid number of lines: '{value}'\n"))?,
                );
            }
            "-c" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{name}: option requires an argument -- 'c'\n"))?;
                selection.bytes = Some(
                    value
                        .parse()
                        .map_err(|_| format!("{name}: invalid number of bytes: '{value}'\n"))?,
                );
            }
            other if other.starts_with('-') && other.len() > 1 => {
                // `-5` shorthand.
                match other[1..].parse() {
                    Ok(n) => selection.lines = Some(n),
                    Err(_) => return Err(format!("{name}: invalid option -- '{other}'\n")),
                }
            }
            _ => files.push(arg),
        }
    }
    Ok((selection, files))
}

async fn gather(ctx: &mut Context<'_>, name: &str, files: &[&String]) -> Result<(String, String)> {
    let mut content = String::new();
    let mut stderr = String::new();
    if files.is_empty() {
        content = ctx.take_stdin().unwrap_or_default();
    } else {
        for file in files {
            if file.as_str() == "-" {
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
    Ok((content, stderr))
}

/// head - first lines (or bytes) of input.
pub struct Head;

#[async_trait]
impl Builtin for Head {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let (selection, files) = match parse_args("head", ctx.args) {
            Ok(parsed) => parsed,
            Err(msg) => return Ok(ExecResult::err(msg, 1)),
        };
        let (content, stderr) = gather(ctx, "head", &files).await?;
        let out = if let Some(n) = selection.bytes {
            content.chars().take(n).collect()
        } else {
            let n = selection.lines.unwrap_or(10);
            content.split_inclusive('\n').take(n).collect()
        };
        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 1 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: head [-n lines | -c bytes] [file ...]"
    }
}

/// tail - last lines (or bytes) of input.
pub struct Tail;

#[async_trait]
impl Builtin for Tail {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let (selection, files) = match parse_args("tail", ctx.args) {
            Ok(parsed) => parsed,
            Err(msg) => return Ok(ExecResult::err(msg, 1)),
        };
        let (content, stderr) = gather(ctx, "tail", &files).await?;
        let out: String = if let Some(n) = selection.bytes {
            let chars: Vec<char> = content.chars().collect();
            let start = chars.len().saturating_sub(n);
            chars[start..].iter().collect()
        } else {
            let n = selection.lines.unwrap_or(10);
            let lines: Vec<&str> = content.split_inclusive('\n').collect();
            let start = lines.len().saturating_sub(n);
            lines[start..].concat()
        };
        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 1 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: tail [-n lines | -c bytes] [file ...]"
    }
}

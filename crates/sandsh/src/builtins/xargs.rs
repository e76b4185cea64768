//! xargs builtin.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// xargs - build command lines from stdin and run them through the shell.
///
/// Supports `-n max-args` batching and `-I replstr` substitution. The
/// constructed command runs via the re-entry handle: a child shell over a
/// snapshot of the current state, sharing the filesystem.
pub struct Xargs;

#[async_trait]
impl Builtin for Xargs {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut per_batch: Option<usize> = None;
        let mut replace: Option<String> = None;
        let mut command: Vec<String> = Vec::new();

        let mut iter = ctx.args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-n" if command.is_empty() => {
                    let Some(n) = iter.next().and_then(|v| v.parse().ok()) else {
                        return Ok(ExecResult::err("xargs: -n: invalid number\n", 1));
                    };
                    per_batch = Some(n);
                }
                "-I" if command.is_empty() => {
                    replace = iter.next().cloned();
                }
                _ => command.push(arg.clone()),
            }
        }
        if command.is_empty() {
            command.push("echo".to_string());
        }

        let input = ctx.take_stdin().unwrap_or_default();
        let items: Vec<&str> = if replace.is_some() {
            input.lines().filter(|l| !l.is_empty()).collect()
        } else {
            input.split_whitespace().collect()
        };
        if items.is_empty() {
            return Ok(ExecResult::code(0));
        }

        let mut acc = ExecResult::default();
        if let Some(token) = replace {
            for item in items {
                let line = command
                    .iter()
                    .map(|part| quote(&part.replace(&token, item)))
                    .collect::<Vec<_>>()
                    .join(" ");
                let res = ctx.exec(&line).await;
                acc.stdout.push_str(&res.stdout);
                acc.stderr.push_str(&res.stderr);
                acc.exit_code = res.exit_code;
            }
        } else {
            let batch = per_batch.unwrap_or(items.len().max(1));
            for chunk in items.chunks(batch.max(1)) {
                let mut line: Vec<String> = command.clone();
                line.extend(chunk.iter().map(|item| quote(item)));
                let res = ctx.exec(&line.join(" ")).await;
                acc.stdout.push_str(&res.stdout);
                acc.stderr.push_str(&res.stderr);
                acc.exit_code = res.exit_code;
            }
        }
        // xargs reports 123 when any invocation failed.
        if acc.exit_code != 0 {
            acc.exit_code = 123;
        }
        Ok(acc)
    }

    fn usage(&self) -> &'static str {
        "usage: xargs [-n max-args] [-I replstr] [command [args ...]]"
    }
}

fn quote(arg: &str) -> String {
    crate::transform::quote_word(arg)
}

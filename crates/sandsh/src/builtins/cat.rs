//! cat builtin.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// cat - concatenate files (or stdin) to standard output. `-n` numbers
/// output lines; `-` reads stdin.
pub struct Cat;

#[async_trait]
impl Builtin for Cat {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut number_lines = false;
        let mut files: Vec<&String> = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-n" => number_lines = true,
                _ => files.push(arg),
            }
        }

        let mut output = String::new();
        if files.is_empty() {
            if let Some(stdin) = ctx.take_stdin() {
                output.push_str(&stdin);
            }
        } else {
            for file in files {
                if file == "-" {
                    if let Some(stdin) = ctx.take_stdin() {
                        output.push_str(&stdin);
                    }
                    continue;
                }
                let path = ctx.resolve(file);
                match ctx.fs.read_file(&path).await {
                    Ok(content) => output.push_str(&String::from_utf8_lossy(&content)),
                    Err(e) => {
                        return Ok(ExecResult::err(format!("cat: {file}: {e}\n"), 1));
                    }
                }
            }
        }

        if number_lines {
            let mut numbered = String::new();
            for (i, line) in output.split_inclusive('\n').enumerate() {
                numbered.push_str(&format!("{:6}\t{line}", i + 1));
            }
            output = numbered;
        }
        Ok(ExecResult::ok(output))
    }

    fn usage(&self) -> &'static str {
        "usage: cat [-n] [file ...]"
    }
}

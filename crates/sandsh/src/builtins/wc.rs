//! wc builtin.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// wc - line, word, byte, and character counts.
pub struct Wc;

#[async_trait]
impl Builtin for Wc {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut show_lines = false;
        let mut show_words = false;
        let mut show_bytes = false;
        let mut show_chars = false;
        let mut files = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-l" => show_lines = true,
                "-w" => show_words = true,
                "-c" => show_bytes = true,
                "-m" => show_chars = true,
                _ => files.push(arg.clone()),
            }
        }
        let default = !(show_lines || show_words || show_bytes || show_chars);

        let mut out = String::new();
        let mut stderr = String::new();
        let mut totals = (0usize, 0usize, 0usize);
        let mut counted = 0usize;

        let mut emit = |name: Option<&str>, lines: usize, words: usize, bytes: usize, out: &mut String| {
            let mut cols: Vec<String> = Vec::new();
            if default || show_lines {
                cols.push(lines.to_string());
            }
            if default || show_words {
                cols.push(words.to_string());
            }
            if default || show_bytes || show_chars {
                cols.push(bytes.to_string());
            }
            if cols.len() == 1 && name.is_none() {
                out.push_str(&cols[0]);
            } else {
                out.push_str(&cols.join(" "));
                if let Some(name) = name {
                    out.push(' ');
                    out.push_str(name);
                }
            }
            out.push('\n');
        };

        if files.is_empty() {
            let content = ctx.take_stdin().unwrap_or_default();
            let (l, w, b) = count(&content, show_chars);
            emit(None, l, w, b, &mut out);
        } else {
            for file in &files {
                let path = ctx.resolve(file);
                match ctx.fs.read_file(&path).await {
                    Ok(bytes) => {
                        let content = String::from_utf8_lossy(&bytes);
                        let (l, w, b) = count(&content, show_chars);
                        totals.0 += l;
                        totals.1 += w;
                        totals.2 += b;
                        counted += 1;
                        emit(Some(file), l, w, b, &mut out);
                    }
                    Err(e) => stderr.push_str(&format!("wc: {file}: {e}\n")),
                }
            }
            if counted > 1 {
                emit(Some("total"), totals.0, totals.1, totals.2, &mut out);
            }
        }

        Ok(ExecResult {
            stdout: out,
            exit_code: if stderr.is_empty() { 0 } else { 1 },
            stderr,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: wc [-lwcm] [file ...]"
    }
}

fn count(content: &str, chars_not_bytes: bool) -> (usize, usize, usize) {
    let lines = content.matches('\n').count();
    let words = content.split_whitespace().count();
    let size = if chars_not_bytes {
        content.chars().count()
    } else {
        content.len()
    };
    (lines, words, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        assert_eq!(count("a b\nc\n", false), (2, 3, 6));
        assert_eq!(count("", false), (0, 0, 0));
        assert_eq!(count("no newline", false), (0, 2, 10));
    }
}

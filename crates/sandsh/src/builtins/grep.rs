//! grep builtin.
//!
//! Pattern matching over files or stdin using the regex crate.
//!
//! Usage:
//!   grep pattern file
//!   echo "text" | grep pattern
//!   grep -i pattern file        # case insensitive
//!   grep -v pattern file        # invert match
//!   grep -n pattern file        # show line numbers
//!   grep -c pattern file        # count matches
//!   grep -q pattern file        # quiet, exit status only
//!   grep -o pattern file        # only the matching part
//!   grep -F pattern file        # fixed string match
//!   grep -E pattern file        # extended regex (the default engine)
//!   grep -w pattern file        # whole words
//!   grep -x pattern file        # whole lines
//!   grep -r pattern dir         # recurse into directories

use async_trait::async_trait;
use regex::{escape, RegexBuilder};
use std::path::PathBuf;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

pub struct Grep;

#[derive(Default)]
struct GrepOptions {
    ignore_case: bool,
    invert: bool,
    line_numbers: bool,
    count_only: bool,
    quiet: bool,
    only_matching: bool,
    fixed: bool,
    word: bool,
    whole_line: bool,
    recursive: bool,
    files_with_matches: bool,
}

#[async_trait]
impl Builtin for Grep {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut opts = GrepOptions::default();
        let mut pattern: Option<String> = None;
        let mut files: Vec<String> = Vec::new();

        let mut iter = ctx.args.iter();
        while let Some(arg) = iter.next() {
            if let Some(flags) = arg.strip_prefix('-').filter(|f| !f.is_empty() && *arg != "-") {
                let mut unknown = None;
                for f in flags.chars() {
                    match f {
                        'i' => opts.ignore_case = true,
                        'v' => opts.invert = true,
                        'n' => opts.line_numbers = true,
                        'c' => opts.count_only = true,
                        'q' => opts.quiet = true,
                        'o' => opts.only_matching = true,
                        'F' => opts.fixed = true,
                        'E' | 'P' => {}
                        'w' => opts.word = true,
                        'x' => opts.whole_line = true,
                        'r' | 'R' => opts.recursive = true,
                        'l' => opts.files_with_matches = true,
                        'e' => {
                            pattern = iter.next().cloned();
                        }
                        other => unknown = Some(other),
                    }
                }
                if let Some(f) = unknown {
                    return Ok(ExecResult::err(format!("grep: invalid option -- '{f}'\n"), 2));
                }
            } else if pattern.is_none() {
                pattern = Some(arg.clone());
            } else {
                files.push(arg.clone());
            }
        }

        let Some(pattern) = pattern else {
            return Ok(ExecResult::err("usage: grep [-ivncqoFEwxrl] pattern [file ...]\n", 2));
        };

        let mut source = if opts.fixed {
            escape(&pattern)
        } else {
            pattern.clone()
        };
        if opts.word {
            source = format!(r"\b(?:{source})\b");
        }
        if opts.whole_line {
            source = format!("^(?:{source})$");
        }
        let re = match RegexBuilder::new(&source)
            .case_insensitive(opts.ignore_case)
            .build()
        {
            Ok(re) => re,
            Err(e) => return Ok(ExecResult::err(format!("grep: invalid pattern: {e}\n"), 2)),
        };

        // Gather inputs: (label, content).
        let mut inputs: Vec<(Option<String>, String)> = Vec::new();
        let mut stderr = String::new();
        if files.is_empty() {
            inputs.push((None, ctx.take_stdin().unwrap_or_default()));
        } else {
            for file in &files {
                if file == "-" {
                    inputs.push((None, ctx.take_stdin().unwrap_or_default()));
                    continue;
                }
                let path = ctx.resolve(file);
                match ctx.fs.stat(&path).await {
                    Ok(meta) if meta.file_type.is_dir() => {
                        if opts.recursive {
                            collect_tree(ctx, &path, file, &mut inputs, &mut stderr).await;
                        } else {
                            stderr.push_str(&format!("grep: {file}: Is a directory\n"));
                        }
                    }
                    Ok(_) => match ctx.fs.read_file(&path).await {
                        Ok(content) => inputs.push((
                            Some(file.clone()),
                            String::from_utf8_lossy(&content).to_string(),
                        )),
                        Err(e) => stderr.push_str(&format!("grep: {file}: {e}\n")),
                    },
                    Err(_) => {
                        stderr.push_str(&format!("grep: {file}: No such file or directory\n"))
                    }
                }
            }
        }

        let show_names = inputs.len() > 1 || opts.recursive;
        let mut out = String::new();
        let mut any_match = false;
        for (label, content) in &inputs {
            let mut count = 0usize;
            for (lineno, line) in content.lines().enumerate() {
                let matched = re.is_match(line) != opts.invert;
                if !matched {
                    continue;
                }
                any_match = true;
                count += 1;
                if opts.quiet || opts.count_only || opts.files_with_matches {
                    continue;
                }
                if opts.only_matching && !opts.invert {
                    for m in re.find_iter(line) {
                        push_prefixed(&mut out, label, show_names, opts.line_numbers, lineno);
                        out.push_str(m.as_str());
                        out.push('\n');
                    }
                } else {
                    push_prefixed(&mut out, label, show_names, opts.line_numbers, lineno);
                    out.push_str(line);
                    out.push('\n');
                }
            }
            if opts.count_only && !opts.quiet {
                if let (Some(name), true) = (label, show_names) {
                    out.push_str(&format!("{name}:{count}\n"));
                } else {
                    out.push_str(&format!("{count}\n"));
                }
            }
            if opts.files_with_matches && count > 0 && !opts.quiet {
                if let Some(name) = label {
                    out.push_str(name);
                    out.push('\n');
                }
            }
        }

        let exit_code = if any_match {
            0
        } else if stderr.is_empty() {
            1
        } else {
            2
        };
        Ok(ExecResult {
            stdout: if opts.quiet { String::new() } else { out },
            stderr,
            exit_code,
            ..Default::default()
        })
    }

    fn usage(&self) -> &'static str {
        "usage: grep [-ivncqoFEwxrl] [-e pattern] pattern [file ...]"
    }
}

fn push_prefixed(
    out: &mut String,
    label: &Option<String>,
    show_names: bool,
    line_numbers: bool,
    lineno: usize,
) {
    if show_names {
        if let Some(name) = label {
            out.push_str(name);
            out.push(':');
        }
    }
    if line_numbers {
        out.push_str(&format!("{}:", lineno + 1));
    }
}

/// Depth-first collection for `grep -r`, pruning revisited directories.
async fn collect_tree(
    ctx: &Context<'_>,
    root: &PathBuf,
    label: &str,
    inputs: &mut Vec<(Option<String>, String)>,
    stderr: &mut String,
) {
    let mut visited: Vec<PathBuf> = Vec::new();
    let mut stack: Vec<(PathBuf, String)> = vec![(root.clone(), label.to_string())];
    while let Some((dir, name)) = stack.pop() {
        let canonical = match ctx.fs.realpath(&dir).await {
            Ok(c) => c,
            Err(_) => continue,
        };
        if visited.contains(&canonical) {
            continue;
        }
        visited.push(canonical);
        let entries = match ctx.fs.read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                stderr.push_str(&format!("grep: {name}: {e}\n"));
                continue;
            }
        };
        for entry in entries {
            let child = dir.join(&entry.name);
            let child_label = format!("{name}/{}", entry.name);
            if entry.metadata.file_type.is_dir() {
                stack.push((child, child_label));
            } else if let Ok(content) = ctx.fs.read_file(&child).await {
                inputs.push((
                    Some(child_label),
                    String::from_utf8_lossy(&content).to_string(),
                ));
            }
        }
    }
    inputs.sort_by(|a, b| a.0.cmp(&b.0));
}

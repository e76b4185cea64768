//! ls builtin.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::fs::{FileType, Metadata};
use crate::interpreter::ExecResult;

/// ls - list directory contents.
///
/// Flags: -a (include dotfiles), -l (long listing), -d (list the directory
/// itself), -1 (accepted; output is always one name per line).
pub struct Ls;

#[async_trait]
impl Builtin for Ls {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut all = false;
        let mut long = false;
        let mut directory = false;
        let mut paths = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-a" | "-A" => all = true,
                "-l" => long = true,
                "-d" => directory = true,
                "-la" | "-al" => {
                    all = true;
                    long = true;
                }
                "-1" => {}
                _ => paths.push(arg.clone()),
            }
        }
        if paths.is_empty() {
            paths.push(".".to_string());
        }

        let mut out = String::new();
        let mut stderr = String::new();
        let multiple = paths.len() > 1;
        for (i, name) in paths.iter().enumerate() {
            let path = ctx.resolve(name);
            let meta = match ctx.fs.stat(&path).await {
                Ok(meta) => meta,
                Err(_) => {
                    stderr.push_str(&format!(
                        "ls: cannot access '{name}': No such file or directory\n"
                    ));
                    continue;
                }
            };
            if multiple && i > 0 {
                out.push('\n');
            }
            if meta.file_type.is_dir() && !directory {
                if multiple {
                    out.push_str(&format!("{name}:\n"));
                }
                match ctx.fs.read_dir(&path).await {
                    Ok(entries) => {
                        for entry in entries {
                            if !all && entry.name.starts_with('.') {
                                continue;
                            }
                            if long {
                                out.push_str(&long_line(&entry.metadata, &entry.name));
                            } else {
                                out.push_str(&entry.name);
                                out.push('\n');
                            }
                        }
                    }
                    Err(e) => stderr.push_str(&format!("ls: {name}: {e}\n")),
                }
            } else if long {
                out.push_str(&long_line(&meta, name));
            } else {
                out.push_str(name);
                out.push('\n');
            }
        }

        if stderr.is_empty() {
            Ok(ExecResult::ok(out))
        } else {
            Ok(ExecResult {
                stdout: out,
                stderr,
                exit_code: 2,
                ..Default::default()
            })
        }
    }

    fn usage(&self) -> &'static str {
        "usage: ls [-adl1] [file ...]"
    }
}

fn long_line(meta: &Metadata, name: &str) -> String {
    let type_char = match meta.file_type {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::File => '-',
    };
    format!(
        "{}{} 1 user user {:>8} {}\n",
        type_char,
        mode_string(meta.mode),
        meta.size,
        name
    )
}

fn mode_string(mode: u32) -> String {
    let mut s = String::with_capacity(9);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings() {
        assert_eq!(mode_string(0o755), "rwxr-xr-x");
        assert_eq!(mode_string(0o644), "rw-r--r--");
        assert_eq!(mode_string(0o000), "---------");
    }
}

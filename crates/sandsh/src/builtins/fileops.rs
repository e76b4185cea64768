//! File manipulation builtins: mkdir, rm, cp, mv, touch, ln.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// mkdir - create directories; `-p` creates parents and tolerates existing
/// directories.
pub struct Mkdir;

#[async_trait]
impl Builtin for Mkdir {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut parents = false;
        let mut dirs = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-p" => parents = true,
                _ => dirs.push(arg),
            }
        }
        if dirs.is_empty() {
            return Ok(ExecResult::err("mkdir: missing operand\n", 1));
        }
        let mut stderr = String::new();
        for dir in dirs {
            let path = ctx.resolve(dir);
            if let Err(e) = ctx.fs.mkdir(&path, parents).await {
                stderr.push_str(&format!("mkdir: cannot create directory '{dir}': {e}\n"));
            }
        }
        if stderr.is_empty() {
            Ok(ExecResult::code(0))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }

    fn usage(&self) -> &'static str {
        "usage: mkdir [-p] directory ..."
    }
}

/// rm - remove files; `-r` recurses into directories, `-f` ignores missing
/// operands.
pub struct Rm;

#[async_trait]
impl Builtin for Rm {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut recursive = false;
        let mut force = false;
        let mut files = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-r" | "-R" => recursive = true,
                "-f" => force = true,
                "-rf" | "-fr" => {
                    recursive = true;
                    force = true;
                }
                _ => files.push(arg),
            }
        }
        if files.is_empty() {
            if force {
                return Ok(ExecResult::code(0));
            }
            return Ok(ExecResult::err("rm: missing operand\n", 1));
        }
        let mut stderr = String::new();
        for file in files {
            let path = ctx.resolve(file);
            match ctx.fs.lstat(&path).await {
                Ok(meta) if meta.file_type.is_dir() && !recursive => {
                    stderr.push_str(&format!("rm: cannot remove '{file}': Is a directory\n"));
                }
                Ok(_) => {
                    if let Err(e) = ctx.fs.remove(&path, recursive).await {
                        stderr.push_str(&format!("rm: cannot remove '{file}': {e}\n"));
                    }
                }
                Err(_) if force => {}
                Err(_) => {
                    stderr.push_str(&format!(
                        "rm: cannot remove '{file}': No such file or directory\n"
                    ));
                }
            }
        }
        if stderr.is_empty() {
            Ok(ExecResult::code(0))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }

    fn usage(&self) -> &'static str {
        "usage: rm [-rf] file ..."
    }
}

/// Destination path for cp/mv: into the directory when the target is one.
async fn destination(ctx: &Context<'_>, src: &str, dst: &PathBuf) -> PathBuf {
    if let Ok(meta) = ctx.fs.stat(dst).await {
        if meta.file_type.is_dir() {
            if let Some(name) = PathBuf::from(src).file_name() {
                return dst.join(name);
            }
        }
    }
    dst.clone()
}

/// cp - copy files; `-r` copies directory trees.
pub struct Cp;

#[async_trait]
impl Builtin for Cp {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut recursive = false;
        let mut operands = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-r" | "-R" | "-a" => recursive = true,
                _ => operands.push(arg.clone()),
            }
        }
        if operands.len() < 2 {
            return Ok(ExecResult::err("cp: missing file operand\n", 1));
        }
        let target = ctx.resolve(&operands[operands.len() - 1]);
        let sources = &operands[..operands.len() - 1];
        let mut stderr = String::new();
        for src in sources {
            let from = ctx.resolve(src);
            let to = destination(ctx, src, &target).await;
            if let Err(e) = ctx.fs.copy(&from, &to, recursive).await {
                stderr.push_str(&format!("cp: cannot copy '{src}': {e}\n"));
            }
        }
        if stderr.is_empty() {
            Ok(ExecResult::code(0))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }

    fn usage(&self) -> &'static str {
        "usage: cp [-r] source ... dest"
    }
}

/// mv - move or rename files.
pub struct Mv;

#[async_trait]
impl Builtin for Mv {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let operands: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if operands.len() < 2 {
            return Ok(ExecResult::err("mv: missing file operand\n", 1));
        }
        let target = ctx.resolve(operands[operands.len() - 1]);
        let sources = &operands[..operands.len() - 1];
        let mut stderr = String::new();
        for src in sources {
            let from = ctx.resolve(src);
            let to = destination(ctx, src, &target).await;
            if let Err(e) = ctx.fs.rename(&from, &to).await {
                stderr.push_str(&format!("mv: cannot move '{src}': {e}\n"));
            }
        }
        if stderr.is_empty() {
            Ok(ExecResult::code(0))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }

    fn usage(&self) -> &'static str {
        "usage: mv source ... dest"
    }
}

/// touch - create files or update their timestamps.
pub struct Touch;

#[async_trait]
impl Builtin for Touch {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let files: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if files.is_empty() {
            return Ok(ExecResult::err("touch: missing file operand\n", 1));
        }
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(ctx.state.now_epoch());
        let mut stderr = String::new();
        for file in files {
            let path = ctx.resolve(file);
            if ctx.fs.exists(&path).await.unwrap_or(false) {
                if let Err(e) = ctx.fs.set_times(&path, now).await {
                    stderr.push_str(&format!("touch: {file}: {e}\n"));
                }
            } else if let Err(e) = ctx.fs.write_file(&path, b"").await {
                stderr.push_str(&format!("touch: cannot touch '{file}': {e}\n"));
            }
        }
        if stderr.is_empty() {
            Ok(ExecResult::code(0))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }

    fn usage(&self) -> &'static str {
        "usage: touch file ..."
    }
}

/// ln - create links. Only `-s` (symbolic) is supported; the VFS has no
/// hard links.
pub struct Ln;

#[async_trait]
impl Builtin for Ln {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut symbolic = false;
        let mut force = false;
        let mut operands = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-s" => symbolic = true,
                "-f" => force = true,
                "-sf" | "-fs" => {
                    symbolic = true;
                    force = true;
                }
                _ => operands.push(arg.clone()),
            }
        }
        if !symbolic {
            return Ok(ExecResult::err("ln: hard links are not supported\n", 1));
        }
        if operands.len() != 2 {
            return Ok(ExecResult::err("ln: usage: ln -s target link\n", 1));
        }
        let target = PathBuf::from(&operands[0]);
        let link = ctx.resolve(&operands[1]);
        if force && ctx.fs.exists(&link).await.unwrap_or(false) {
            let _ = ctx.fs.remove(&link, false).await;
        }
        match ctx.fs.symlink(&target, &link).await {
            Ok(()) => Ok(ExecResult::code(0)),
            Err(e) => Ok(ExecResult::err(format!("ln: {}: {e}\n", operands[1]), 1)),
        }
    }

    fn usage(&self) -> &'static str {
        "usage: ln -s target link"
    }
}

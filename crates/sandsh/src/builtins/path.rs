//! Path-text builtins: basename, dirname, realpath, readlink.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// basename - strip directory (and optional suffix) from a path.
pub struct Basename;

#[async_trait]
impl Builtin for Basename {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let Some(path) = ctx.args.first() else {
            return Ok(ExecResult::err("basename: missing operand\n", 1));
        };
        let trimmed = path.trim_end_matches('/');
        let mut base = if trimmed.is_empty() {
            "/"
        } else {
            trimmed.rsplit('/').next().unwrap_or(trimmed)
        }
        .to_string();
        if let Some(suffix) = ctx.args.get(1) {
            if base.len() > suffix.len() {
                if let Some(stripped) = base.strip_suffix(suffix.as_str()) {
                    base = stripped.to_string();
                }
            }
        }
        Ok(ExecResult::ok(format!("{base}\n")))
    }

    fn usage(&self) -> &'static str {
        "usage: basename path [suffix]"
    }
}

/// dirname - strip the last component from a path.
pub struct Dirname;

#[async_trait]
impl Builtin for Dirname {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let Some(path) = ctx.args.first() else {
            return Ok(ExecResult::err("dirname: missing operand\n", 1));
        };
        let trimmed = path.trim_end_matches('/');
        let dir = match trimmed.rfind('/') {
            Some(0) => "/",
            Some(i) => &trimmed[..i],
            None => ".",
        };
        let dir = if trimmed.is_empty() && path.starts_with('/') {
            "/"
        } else {
            dir
        };
        Ok(ExecResult::ok(format!("{dir}\n")))
    }

    fn usage(&self) -> &'static str {
        "usage: dirname path"
    }
}

/// realpath - canonicalize a path against the VFS.
pub struct Realpath;

#[async_trait]
impl Builtin for Realpath {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let Some(path) = ctx.args.first() else {
            return Ok(ExecResult::err("realpath: missing operand\n", 1));
        };
        let resolved = ctx.resolve(path);
        match ctx.fs.realpath(&resolved).await {
            Ok(canonical) => Ok(ExecResult::ok(format!("{}\n", canonical.display()))),
            Err(e) => Ok(ExecResult::err(format!("realpath: {path}: {e}\n"), 1)),
        }
    }

    fn usage(&self) -> &'static str {
        "usage: realpath path"
    }
}

/// readlink - print a symlink target; `-f` canonicalizes like realpath.
pub struct Readlink;

#[async_trait]
impl Builtin for Readlink {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut canonicalize = false;
        let mut target = None;
        for arg in ctx.args {
            match arg.as_str() {
                "-f" => canonicalize = true,
                _ => target = Some(arg.clone()),
            }
        }
        let Some(path) = target else {
            return Ok(ExecResult::err("readlink: missing operand\n", 1));
        };
        let resolved = ctx.resolve(&path);
        if canonicalize {
            return match ctx.fs.realpath(&resolved).await {
                Ok(canonical) => Ok(ExecResult::ok(format!("{}\n", canonical.display()))),
                Err(_) => Ok(ExecResult::code(1)),
            };
        }
        match ctx.fs.read_link(&resolved).await {
            Ok(link_target) => Ok(ExecResult::ok(format!("{}\n", link_target.display()))),
            Err(_) => Ok(ExecResult::code(1)),
        }
    }

    fn usage(&self) -> &'static str {
        "usage: readlink [-f] path"
    }
}

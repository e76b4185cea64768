//! cd and pwd builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// cd - change the working directory.
pub struct Cd;

#[async_trait]
impl Builtin for Cd {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let target = match ctx.args.first().map(String::as_str) {
            None | Some("~") => ctx.state.get_scalar("HOME"),
            Some("-") => {
                let prev = ctx.state.previous_dir.to_string_lossy().to_string();
                if prev.is_empty() {
                    return Ok(ExecResult::err("cd: OLDPWD not set\n", 1));
                }
                prev
            }
            Some(dir) => dir.to_string(),
        };
        if target.is_empty() {
            return Ok(ExecResult::err("cd: HOME not set\n", 1));
        }

        let path = ctx.resolve(&target);
        match ctx.fs.stat(&path).await {
            Ok(meta) if meta.file_type.is_dir() => {
                let echo_new = ctx.args.first().map(String::as_str) == Some("-");
                ctx.state.previous_dir = ctx.state.cwd.clone();
                ctx.state
                    .set_scalar("OLDPWD", ctx.state.cwd.to_string_lossy().to_string());
                ctx.state.cwd = path.clone();
                ctx.state
                    .set_scalar("PWD", path.to_string_lossy().to_string());
                if echo_new {
                    return Ok(ExecResult::ok(format!("{}\n", path.display())));
                }
                Ok(ExecResult::code(0))
            }
            Ok(_) => Ok(ExecResult::err(format!("cd: {target}: Not a directory\n"), 1)),
            Err(_) => Ok(ExecResult::err(
                format!("cd: {target}: No such file or directory\n"),
                1,
            )),
        }
    }

    fn usage(&self) -> &'static str {
        "usage: cd [dir]"
    }
}

/// pwd - print the working directory.
pub struct Pwd;

#[async_trait]
impl Builtin for Pwd {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(format!("{}\n", ctx.state.cwd.display())))
    }

    fn usage(&self) -> &'static str {
        "usage: pwd"
    }
}

//! Exit-status and control-flow builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::{ControlFlow, ExecResult};

pub struct True;

#[async_trait]
impl Builtin for True {
    async fn execute(&self, _ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::code(0))
    }
}

pub struct False;

#[async_trait]
impl Builtin for False {
    async fn execute(&self, _ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::code(1))
    }
}

/// `:` - null command.
pub struct Colon;

#[async_trait]
impl Builtin for Colon {
    async fn execute(&self, _ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::code(0))
    }
}

/// exit [n] - terminate the script.
pub struct Exit;

#[async_trait]
impl Builtin for Exit {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let code = match ctx.args.first() {
            Some(arg) => match arg.parse::<i32>() {
                Ok(n) => n & 0xff,
                Err(_) => {
                    let mut res =
                        ExecResult::err(format!("exit: {arg}: numeric argument required\n"), 2);
                    res.control_flow = ControlFlow::Exit(2);
                    return Ok(res);
                }
            },
            None => ctx.state.last_exit_code,
        };
        let mut res = ExecResult::code(code);
        res.control_flow = ControlFlow::Exit(code);
        Ok(res)
    }

    fn usage(&self) -> &'static str {
        "usage: exit [n]"
    }
}

fn level_arg(ctx: &Context<'_>, name: &str) -> std::result::Result<u32, ExecResult> {
    match ctx.args.first() {
        None => Ok(1),
        Some(arg) => match arg.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ExecResult::err(
                format!("{name}: {arg}: loop count out of range\n"),
                1,
            )),
        },
    }
}

/// break [n] - leave n enclosing loops.
pub struct Break;

#[async_trait]
impl Builtin for Break {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(match level_arg(ctx, "break") {
            Ok(n) => ExecResult::with_control_flow(ControlFlow::Break(n)),
            Err(res) => res,
        })
    }

    fn usage(&self) -> &'static str {
        "usage: break [n]"
    }
}

/// continue [n] - resume the nth enclosing loop.
pub struct Continue;

#[async_trait]
impl Builtin for Continue {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        Ok(match level_arg(ctx, "continue") {
            Ok(n) => ExecResult::with_control_flow(ControlFlow::Continue(n)),
            Err(res) => res,
        })
    }

    fn usage(&self) -> &'static str {
        "usage: continue [n]"
    }
}

/// return [n] - unwind the current function call.
pub struct Return;

#[async_trait]
impl Builtin for Return {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let code = match ctx.args.first() {
            Some(arg) => arg.parse::<i32>().unwrap_or(2),
            None => ctx.state.last_exit_code,
        };
        Ok(ExecResult::with_control_flow(ControlFlow::Return(code)))
    }

    fn usage(&self) -> &'static str {
        "usage: return [n]"
    }
}

/// shift [n] - drop leading positional parameters.
pub struct Shift;

#[async_trait]
impl Builtin for Shift {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let n = match ctx.args.first() {
            Some(arg) => match arg.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    return Ok(ExecResult::err(
                        format!("shift: {arg}: numeric argument required\n"),
                        1,
                    ))
                }
            },
            None => 1,
        };
        if n > ctx.state.positional.len() {
            return Ok(ExecResult::code(1));
        }
        ctx.state.positional.drain(..n);
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: shift [n]"
    }
}

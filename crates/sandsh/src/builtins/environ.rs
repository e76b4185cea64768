//! env and which builtins.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// env - print the exported environment.
pub struct Env;

#[async_trait]
impl Builtin for Env {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let env = ctx.env();
        let mut pairs: Vec<(String, String)> = env.into_iter().collect();
        pairs.sort();
        let mut out = String::new();
        for (name, value) in pairs {
            out.push_str(&format!("{name}={value}\n"));
        }
        Ok(ExecResult::ok(out))
    }

    fn usage(&self) -> &'static str {
        "usage: env"
    }
}

/// which - locate a command among functions and builtins.
pub struct Which;

#[async_trait]
impl Builtin for Which {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut out = String::new();
        let mut status = 0;
        for name in ctx.args {
            if ctx.state.functions.contains_key(name) {
                out.push_str(&format!("{name}: shell function\n"));
            } else if ctx.registry.contains(name) {
                out.push_str(&format!("/bin/{name}\n"));
            } else {
                status = 1;
            }
        }
        Ok(ExecResult::with_code(out, status))
    }

    fn usage(&self) -> &'static str {
        "usage: which name ..."
    }
}

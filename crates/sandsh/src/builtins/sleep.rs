//! sleep builtin.

use async_trait::async_trait;
use std::time::Duration;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// sleep - suspend cooperatively. Accepts seconds, with optional `s`/`m`/`h`
/// suffix. The wait is clamped to the shell's cancellation deadline.
pub struct Sleep;

#[async_trait]
impl Builtin for Sleep {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let Some(arg) = ctx.args.first() else {
            return Ok(ExecResult::err("sleep: missing operand\n", 1));
        };
        let (number, unit) = match arg.find(|c: char| c.is_ascii_alphabetic()) {
            Some(i) => arg.split_at(i),
            None => (arg.as_str(), "s"),
        };
        let Ok(value) = number.parse::<f64>() else {
            return Ok(ExecResult::err(
                format!("sleep: invalid time interval '{arg}'\n"),
                1,
            ));
        };
        let seconds = match unit {
            "s" | "" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => {
                return Ok(ExecResult::err(
                    format!("sleep: invalid time interval '{arg}'\n"),
                    1,
                ))
            }
        };
        ctx.sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: sleep duration[smh]"
    }
}

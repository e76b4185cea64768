//! seq builtin.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// seq - print a sequence of numbers: `seq LAST`, `seq FIRST LAST`,
/// `seq FIRST INCR LAST`. `-s` sets the separator, `-w` pads with zeros.
pub struct Seq;

#[async_trait]
impl Builtin for Seq {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut separator = "\n".to_string();
        let mut pad = false;
        let mut numbers = Vec::new();

        let mut iter = ctx.args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-s" => {
                    if let Some(s) = iter.next() {
                        separator = s.clone();
                    }
                }
                "-w" => pad = true,
                other if other.len() > 2 && other.starts_with("-s") => {
                    separator = other[2..].to_string();
                }
                _ => numbers.push(arg.clone()),
            }
        }

        let parse = |s: &String| -> std::result::Result<i64, ExecResult> {
            s.parse().map_err(|_| {
                ExecResult::err(format!("seq: invalid floating point argument: '{s}'\n"), 1)
            })
        };

        let (first, incr, last) = match numbers.len() {
            1 => (1, 1, match parse(&numbers[0]) { Ok(n) => n, Err(e) => return Ok(e) }),
            2 => (
                match parse(&numbers[0]) { Ok(n) => n, Err(e) => return Ok(e) },
                1,
                match parse(&numbers[1]) { Ok(n) => n, Err(e) => return Ok(e) },
            ),
            3 => (
                match parse(&numbers[0]) { Ok(n) => n, Err(e) => return Ok(e) },
                match parse(&numbers[1]) { Ok(n) => n, Err(e) => return Ok(e) },
                match parse(&numbers[2]) { Ok(n) => n, Err(e) => return Ok(e) },
            ),
            _ => return Ok(ExecResult::err("seq: missing operand\n", 1)),
        };
        if incr == 0 {
            return Ok(ExecResult::err("seq: increment must not be 0\n", 1));
        }

        let mut values = Vec::new();
        let mut n = first;
        while (incr > 0 && n <= last) || (incr < 0 && n >= last) {
            values.push(n);
            n += incr;
        }

        let width = values
            .iter()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(0);
        let rendered: Vec<String> = values
            .iter()
            .map(|v| {
                if pad {
                    format!("{v:0width$}")
                } else {
                    v.to_string()
                }
            })
            .collect();

        let mut out = rendered.join(&separator);
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(ExecResult::ok(out))
    }

    fn usage(&self) -> &'static str {
        "usage: seq [-w] [-s sep] [first [incr]] last"
    }
}

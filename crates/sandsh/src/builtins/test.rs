//! test / [ builtin.
//!
//! POSIX test expressions: string and numeric comparisons, file tests,
//! `!` negation, `-a`/`-o` conjunction, and parentheses. Unlike `[[ ]]`
//! the operands arrive fully expanded, so `=` compares strings literally.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::cond::unary_test;
use crate::interpreter::ExecResult;

pub struct Test;

const UNARY_OPS: &[&str] = &[
    "-a", "-b", "-c", "-d", "-e", "-f", "-g", "-h", "-k", "-p", "-r", "-s", "-t", "-u", "-w",
    "-x", "-G", "-L", "-N", "-O", "-S", "-z", "-n", "-o", "-v",
];

#[async_trait]
impl Builtin for Test {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut args: Vec<String> = ctx.args.to_vec();
        // `[` requires a closing `]`.
        if let Some(last) = args.last() {
            if last == "]" {
                args.pop();
            }
        }
        if args.is_empty() {
            return Ok(ExecResult::code(1));
        }

        let mut eval = TestEval { ctx, pos: 0, args };
        match eval.or_expr().await {
            Ok(value) => {
                if eval.pos != eval.args.len() {
                    return Ok(ExecResult::err("test: too many arguments\n", 2));
                }
                Ok(ExecResult::code(if value { 0 } else { 1 }))
            }
            Err(msg) => Ok(ExecResult::err(format!("test: {msg}\n"), 2)),
        }
    }

    fn usage(&self) -> &'static str {
        "usage: test expression | [ expression ]"
    }
}

struct TestEval<'a, 'b> {
    ctx: &'a mut Context<'b>,
    pos: usize,
    args: Vec<String>,
}

impl TestEval<'_, '_> {
    fn peek(&self) -> Option<&str> {
        self.args.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos).cloned();
        if arg.is_some() {
            self.pos += 1;
        }
        arg
    }

    async fn or_expr(&mut self) -> std::result::Result<bool, String> {
        let mut value = self.and_expr().await?;
        while self.peek() == Some("-o") {
            self.pos += 1;
            let rhs = self.and_expr().await?;
            value = value || rhs;
        }
        Ok(value)
    }

    async fn and_expr(&mut self) -> std::result::Result<bool, String> {
        let mut value = self.primary().await?;
        while self.peek() == Some("-a") {
            self.pos += 1;
            let rhs = self.primary().await?;
            value = value && rhs;
        }
        Ok(value)
    }

    // Recursion through `!` and `(` is bounded by the argument count;
    // boxing breaks the future cycle.
    fn primary_boxed<'s>(
        &'s mut self,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<bool, String>> + Send + 's>,
    > {
        Box::pin(self.primary())
    }

    fn or_expr_boxed<'s>(
        &'s mut self,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<bool, String>> + Send + 's>,
    > {
        Box::pin(self.or_expr())
    }

    async fn primary(&mut self) -> std::result::Result<bool, String> {
        match self.peek() {
            Some("!") => {
                self.pos += 1;
                let inner = self.primary_boxed().await?;
                return Ok(!inner);
            }
            Some("(") => {
                self.pos += 1;
                let inner = self.or_expr_boxed().await?;
                if self.bump().as_deref() != Some(")") {
                    return Err("expected `)`".to_string());
                }
                return Ok(inner);
            }
            _ => {}
        }

        let Some(first) = self.bump() else {
            return Err("expression expected".to_string());
        };

        // Unary operator with operand. `-a`/`-o` only bind as operators
        // between expressions, so here they are file tests.
        if UNARY_OPS.contains(&first.as_str()) {
            let Some(operand) = self.bump() else {
                // `test -n` with no operand is a non-empty-string test on
                // the operator text itself.
                return Ok(!first.is_empty());
            };
            let path = self.ctx.resolve(&operand);
            return unary_test(self.ctx.fs.as_ref(), self.ctx.state, &path, &first, &operand)
                .await;
        }

        // Binary operator?
        let op = match self.peek() {
            Some(op)
                if matches!(
                    op,
                    "=" | "==" | "!=" | "<" | ">" | "-eq" | "-ne" | "-lt" | "-le" | "-gt"
                        | "-ge"
                ) =>
            {
                op.to_string()
            }
            _ => {
                // Lone string: true when non-empty.
                return Ok(!first.is_empty());
            }
        };
        self.pos += 1;
        let Some(rhs) = self.bump() else {
            return Err(format!("{op}: unary operator expected"));
        };

        match op.as_str() {
            "=" | "==" => Ok(first == rhs),
            "!=" => Ok(first != rhs),
            "<" => Ok(first < rhs),
            ">" => Ok(first > rhs),
            numeric => {
                let l: i64 = first
                    .trim()
                    .parse()
                    .map_err(|_| format!("{first}: integer expression expected"))?;
                let r: i64 = rhs
                    .trim()
                    .parse()
                    .map_err(|_| format!("{rhs}: integer expression expected"))?;
                Ok(match numeric {
                    "-eq" => l == r,
                    "-ne" => l != r,
                    "-lt" => l < r,
                    "-le" => l <= r,
                    "-gt" => l > r,
                    "-ge" => l >= r,
                    _ => unreachable!(),
                })
            }
        }
    }
}

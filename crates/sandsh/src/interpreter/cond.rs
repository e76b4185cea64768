//! `[[ ... ]]` conditional evaluation.
//!
//! String comparisons, glob pattern matches, `=~` regex matches, file
//! tests against the VFS, and numeric comparisons, with short-circuit
//! `&&`/`||`. The `test`/`[` builtin shares the primitive evaluators.

use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use super::expand::ExpError;
use super::pattern;
use super::state::ShellState;
use super::Interpreter;
use crate::fs::{FileSystem, FileType};
use crate::parser::CondExpr;

/// The unary-test primitive, shared with the `test`/`[` builtin. `path`
/// is the operand already resolved against the working directory.
pub(crate) async fn unary_test(
    fs: &dyn FileSystem,
    state: &ShellState,
    path: &Path,
    op: &str,
    value: &str,
) -> Result<bool, String> {
    match op {
        "-z" => return Ok(value.is_empty()),
        "-n" => return Ok(!value.is_empty()),
        "-o" => {
            return Ok(match value {
                "errexit" => state.options.errexit,
                "nounset" => state.options.nounset,
                "pipefail" => state.options.pipefail,
                "noclobber" => state.options.noclobber,
                "noglob" => state.options.noglob,
                "xtrace" => state.options.xtrace,
                _ => false,
            })
        }
        "-v" => return Ok(state.get(value).is_some()),
        "-t" => return Ok(false),
        _ => {}
    }

    let meta = match op {
        "-h" | "-L" => match fs.lstat(path).await {
            Ok(m) => m,
            Err(_) => return Ok(false),
        },
        _ => match fs.stat(path).await {
            Ok(m) => m,
            Err(_) => return Ok(false),
        },
    };
    Ok(match op {
        "-e" | "-a" => true,
        "-f" => meta.file_type == FileType::File,
        "-d" => meta.file_type == FileType::Directory,
        "-h" | "-L" => meta.file_type == FileType::Symlink,
        "-s" => meta.size > 0,
        "-r" => meta.mode & 0o444 != 0,
        "-w" => meta.mode & 0o222 != 0,
        "-x" => meta.mode & 0o111 != 0,
        "-b" | "-c" | "-p" | "-S" | "-g" | "-k" | "-u" | "-G" | "-O" | "-N" => false,
        other => return Err(format!("unknown conditional operator: {other}")),
    })
}

impl Interpreter {
    pub(crate) fn eval_cond<'a>(
        &'a mut self,
        expr: &'a CondExpr,
    ) -> Pin<Box<dyn Future<Output = Result<bool, ExpError>> + Send + 'a>> {
        Box::pin(async move {
            match expr {
                CondExpr::And(lhs, rhs) => {
                    Ok(self.eval_cond(lhs).await? && self.eval_cond(rhs).await?)
                }
                CondExpr::Or(lhs, rhs) => {
                    Ok(self.eval_cond(lhs).await? || self.eval_cond(rhs).await?)
                }
                CondExpr::Not(inner) => Ok(!self.eval_cond(inner).await?),
                CondExpr::Group(inner) => self.eval_cond(inner).await,
                CondExpr::Bare(word) => {
                    let value = self.expand_word_single(word).await?;
                    Ok(!value.is_empty())
                }
                CondExpr::Unary { op, operand } => {
                    let value = self.expand_word_single(operand).await?;
                    self.eval_unary_test(op, &value).await
                }
                CondExpr::Binary { op, lhs, rhs } => {
                    let left = self.expand_word_single(lhs).await?;
                    match op.as_str() {
                        "==" | "=" => {
                            let pat = self.expand_word_pattern(rhs).await?;
                            Ok(pattern::match_glob(&pat, &left))
                        }
                        "!=" => {
                            let pat = self.expand_word_pattern(rhs).await?;
                            Ok(!pattern::match_glob(&pat, &left))
                        }
                        "=~" => {
                            let pat = self.expand_word_single(rhs).await?;
                            let re = Regex::new(&pat).map_err(|e| {
                                ExpError::new(format!("invalid regex: {e}"))
                            })?;
                            Ok(re.is_match(&left))
                        }
                        "<" => {
                            let right = self.expand_word_single(rhs).await?;
                            Ok(left < right)
                        }
                        ">" => {
                            let right = self.expand_word_single(rhs).await?;
                            Ok(left > right)
                        }
                        "-nt" | "-ot" | "-ef" => {
                            let right = self.expand_word_single(rhs).await?;
                            self.eval_file_pair_test(op, &left, &right).await
                        }
                        numeric => {
                            let right = self.expand_word_single(rhs).await?;
                            let l = self.eval_arith_text(&left).await?;
                            let r = self.eval_arith_text(&right).await?;
                            Ok(match numeric {
                                "-eq" => l == r,
                                "-ne" => l != r,
                                "-lt" => l < r,
                                "-le" => l <= r,
                                "-gt" => l > r,
                                "-ge" => l >= r,
                                other => {
                                    return Err(ExpError::new(format!(
                                        "unknown conditional operator: {other}"
                                    )))
                                }
                            })
                        }
                    }
                }
            }
        })
    }

    /// Unary tests shared by `[[ ]]` and the `test` builtin.
    pub(crate) async fn eval_unary_test(
        &mut self,
        op: &str,
        value: &str,
    ) -> Result<bool, ExpError> {
        let path = self.resolve_path(value);
        unary_test(self.fs.as_ref(), &self.state, &path, op, value)
            .await
            .map_err(ExpError::new)
    }

    pub(crate) async fn eval_file_pair_test(
        &mut self,
        op: &str,
        left: &str,
        right: &str,
    ) -> Result<bool, ExpError> {
        let lpath = self.resolve_path(left);
        let rpath = self.resolve_path(right);
        let lmeta = self.fs.stat(&lpath).await.ok();
        let rmeta = self.fs.stat(&rpath).await.ok();
        Ok(match op {
            "-nt" => match (&lmeta, &rmeta) {
                (Some(l), Some(r)) => l.modified > r.modified,
                (Some(_), None) => true,
                _ => false,
            },
            "-ot" => match (&lmeta, &rmeta) {
                (Some(l), Some(r)) => l.modified < r.modified,
                (None, Some(_)) => true,
                _ => false,
            },
            "-ef" => match (
                self.fs.realpath(&lpath).await.ok(),
                self.fs.realpath(&rpath).await.ok(),
            ) {
                (Some(l), Some(r)) => lmeta.is_some() && rmeta.is_some() && l == r,
                _ => false,
            },
            _ => false,
        })
    }
}

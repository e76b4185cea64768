//! Built-in shell commands.
//!
//! Each command is an object implementing [`Builtin`]; the interpreter
//! resolves names through a [`Registry`]. Handlers receive a [`Context`]
//! with the argument list, mutable shell state, the shared filesystem, any
//! piped stdin, and a re-entry handle (`Context::exec`) for commands like
//! `xargs` that run sub-scripts.
//!
//! A handler returning `Err` is contained by the interpreter: the message
//! goes to stderr with exit code 1 and the script continues unless
//! `errexit` is on. `--help` is handled registry-side from
//! [`Builtin::usage`].

mod cat;
mod cuttr;
mod date;
mod echo;
mod environ;
mod fileops;
mod flow;
mod grep;
mod headtail;
mod ls;
mod navigation;
mod path;
mod seq;
mod sleep;
mod sortuniq;
mod test;
mod vars;
mod wc;
mod xargs;

pub use cat::Cat;
pub use cuttr::{Cut, Tr};
pub use date::Date;
pub use echo::{Echo, Printf};
pub use environ::{Env, Which};
pub use fileops::{Cp, Ln, Mkdir, Mv, Rm, Touch};
pub use flow::{Break, Colon, Continue, Exit, False, Return, Shift, True};
pub use grep::Grep;
pub use headtail::{Head, Tail};
pub use ls::Ls;
pub use navigation::{Cd, Pwd};
pub use path::{Basename, Dirname, Readlink, Realpath};
pub use seq::Seq;
pub use sleep::Sleep;
pub use sortuniq::{Sort, Uniq};
pub use test::Test;
pub use vars::{Declare, Export, Local, Read, Readonly, Set, Shopt, Unset};
pub use wc::Wc;
pub use xargs::Xargs;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::fs::FileSystem;
use crate::interpreter::{ExecResult, Interpreter, ShellState};
use crate::limits::ExecutionLimits;
use crate::logging::LogConfig;
use crate::parser::Parser;

/// Execution context handed to a builtin.
pub struct Context<'a> {
    /// Arguments, command name excluded.
    pub args: &'a [String],
    /// Shell state: variables, options, cwd, positional parameters.
    pub state: &'a mut ShellState,
    /// Shared virtual filesystem.
    pub fs: Arc<dyn FileSystem>,
    /// Piped or redirected stdin for this command.
    pub(crate) stdin: Option<String>,
    /// Trace/redaction configuration.
    pub log: &'a LogConfig,
    pub(crate) registry: Arc<Registry>,
    pub(crate) limits: ExecutionLimits,
    pub(crate) deadline: Option<Instant>,
    pub(crate) depth: u32,
}

impl Context<'_> {
    /// Resolve a path argument against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        crate::fs::path::resolve_path(&self.state.cwd, std::path::Path::new(path))
    }

    /// Exported environment, as commands see it.
    pub fn env(&self) -> HashMap<String, String> {
        self.state.env_view()
    }

    /// Whether stdin is connected (piped or group-redirected).
    pub fn has_stdin(&self) -> bool {
        self.stdin.is_some() || self.state.pending_stdin.is_some()
    }

    /// Consume all remaining stdin.
    pub fn take_stdin(&mut self) -> Option<String> {
        self.stdin.take().or_else(|| self.state.pending_stdin.take())
    }

    /// Consume one line of stdin, leaving the rest for later commands in
    /// the same redirected compound.
    pub fn read_line(&mut self) -> Option<String> {
        let source = if self.stdin.is_some() {
            &mut self.stdin
        } else {
            &mut self.state.pending_stdin
        };
        let buf = source.as_mut()?;
        if buf.is_empty() {
            return None;
        }
        match buf.find('\n') {
            Some(i) => {
                let line = buf[..i].to_string();
                *buf = buf[i + 1..].to_string();
                Some(line)
            }
            None => Some(std::mem::take(buf)),
        }
    }

    /// Run a script in a child shell over a snapshot of the current state.
    /// Used by `xargs`; mutations do not escape, the filesystem is shared.
    pub async fn exec(&mut self, script: &str) -> ExecResult {
        if self.depth >= self.limits.max_subshell_depth {
            return ExecResult::err(
                "sandsh: maximum substitution depth exceeded\n".to_string(),
                1,
            );
        }
        let parsed = match Parser::new(script).parse() {
            Ok(parsed) => parsed,
            Err(e) => return ExecResult::err(format!("sandsh: {e}\n"), 2),
        };
        let mut child = Interpreter::new(
            Arc::clone(&self.fs),
            self.state.clone(),
            Arc::clone(&self.registry),
            self.limits.clone(),
            self.log.clone(),
            self.deadline,
        );
        child.depth = self.depth + 1;
        child.run_script(&parsed).await
    }

    /// Cooperative sleep, clamped to the cancellation deadline.
    pub async fn sleep(&self, duration: Duration) {
        let duration = match self.deadline {
            Some(deadline) => duration.min(deadline.saturating_duration_since(Instant::now())),
            None => duration,
        };
        tokio::time::sleep(duration).await;
    }
}

/// Trait for builtin commands.
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Execute the command.
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult>;

    /// One-line usage string served for `--help`. Empty opts out.
    fn usage(&self) -> &'static str {
        ""
    }
}

/// Name → handler table.
#[derive(Clone, Default)]
pub struct Registry {
    map: HashMap<String, Arc<dyn Builtin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("printf", Arc::new(Printf));
        registry.register("cat", Arc::new(Cat));
        registry.register("ls", Arc::new(Ls));
        registry.register("mkdir", Arc::new(Mkdir));
        registry.register("rm", Arc::new(Rm));
        registry.register("cp", Arc::new(Cp));
        registry.register("mv", Arc::new(Mv));
        registry.register("touch", Arc::new(Touch));
        registry.register("ln", Arc::new(Ln));
        registry.register("cd", Arc::new(Cd));
        registry.register("pwd", Arc::new(Pwd));
        registry.register("grep", Arc::new(Grep));
        registry.register("head", Arc::new(Head));
        registry.register("tail", Arc::new(Tail));
        registry.register("wc", Arc::new(Wc));
        registry.register("sort", Arc::new(Sort));
        registry.register("uniq", Arc::new(Uniq));
        registry.register("cut", Arc::new(Cut));
        registry.register("tr", Arc::new(Tr));
        registry.register("seq", Arc::new(Seq));
        registry.register("basename", Arc::new(Basename));
        registry.register("dirname", Arc::new(Dirname));
        registry.register("realpath", Arc::new(Realpath));
        registry.register("readlink", Arc::new(Readlink));
        registry.register("test", Arc::new(Test));
        registry.register("[", Arc::new(Test));
        registry.register("true", Arc::new(True));
        registry.register("false", Arc::new(False));
        registry.register(":", Arc::new(Colon));
        registry.register("exit", Arc::new(Exit));
        registry.register("break", Arc::new(Break));
        registry.register("continue", Arc::new(Continue));
        registry.register("return", Arc::new(Return));
        registry.register("shift", Arc::new(Shift));
        registry.register("export", Arc::new(Export));
        registry.register("unset", Arc::new(Unset));
        registry.register("set", Arc::new(Set));
        registry.register("shopt", Arc::new(Shopt));
        registry.register("declare", Arc::new(Declare));
        registry.register("typeset", Arc::new(Declare));
        registry.register("readonly", Arc::new(Readonly));
        registry.register("local", Arc::new(Local));
        registry.register("read", Arc::new(Read));
        registry.register("env", Arc::new(Env));
        registry.register("which", Arc::new(Which));
        registry.register("sleep", Arc::new(Sleep));
        registry.register("xargs", Arc::new(Xargs));
        registry.register("date", Arc::new(Date));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, builtin: Arc<dyn Builtin>) {
        self.map.insert(name.into(), builtin);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.map.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Registered names, sorted. Used by `which`.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.keys().cloned().collect();
        names.sort();
        names
    }
}

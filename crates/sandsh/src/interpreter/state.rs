//! Execution state and result types.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::parser::FunctionDef;

/// A shell variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Indexed(Vec<String>),
    Assoc(BTreeMap<String, String>),
}

impl Value {
    /// The value used where a scalar is expected: element 0 for indexed
    /// arrays, empty for associative arrays without a subscript.
    pub fn as_scalar(&self) -> String {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Indexed(items) => items.first().cloned().unwrap_or_default(),
            Value::Assoc(_) => String::new(),
        }
    }
}

/// Control flow signals from `break`, `continue`, `return`, and `exit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlFlow {
    #[default]
    None,
    /// Unwind N enclosing loops.
    Break(u32),
    /// Jump to the next iteration of the Nth enclosing loop.
    Continue(u32),
    /// Unwind the current function call.
    Return(i32),
    /// Terminate the whole script.
    Exit(i32),
}

/// Result of executing a command or script fragment.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub control_flow: ControlFlow,
}

impl ExecResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn err(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code,
            ..Self::default()
        }
    }

    pub fn with_code(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code,
            ..Self::default()
        }
    }

    pub fn code(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn with_control_flow(control_flow: ControlFlow) -> Self {
        Self {
            control_flow,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Fold another fragment's output into this one, keeping the newest
    /// exit code and control flow.
    pub fn absorb(&mut self, other: ExecResult) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        self.exit_code = other.exit_code;
        self.control_flow = other.control_flow;
    }
}

/// `set` options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellOptions {
    /// `set -e`
    pub errexit: bool,
    /// `set -u`
    pub nounset: bool,
    /// `set -o pipefail`
    pub pipefail: bool,
    /// `set -C`
    pub noclobber: bool,
    /// `set -f`
    pub noglob: bool,
    /// `set -x`
    pub xtrace: bool,
}

/// `shopt` options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShoptOptions {
    pub nullglob: bool,
    pub failglob: bool,
    pub dotglob: bool,
    /// Accepted but without effect: every pipeline stage runs on a snapshot.
    pub lastpipe: bool,
}

/// One `local` scope frame: prior values to restore on function return.
/// `None` means the variable did not exist before.
#[derive(Debug, Clone, Default)]
pub struct LocalFrame {
    pub saved: HashMap<String, Option<Value>>,
}

/// Complete per-shell execution state. Subshells, pipeline stages, and
/// command substitutions run on a [`Clone`] of this and never write back.
#[derive(Clone)]
pub struct ShellState {
    pub variables: HashMap<String, Value>,
    pub exported: HashSet<String>,
    pub readonly: HashSet<String>,
    pub functions: HashMap<String, Arc<FunctionDef>>,
    /// `$1`..`$N`.
    pub positional: Vec<String>,
    /// `$0`.
    pub script_name: String,
    pub cwd: PathBuf,
    pub previous_dir: PathBuf,
    pub options: ShellOptions,
    pub shopt: ShoptOptions,
    pub last_exit_code: i32,
    pub pipestatus: Vec<i32>,
    /// Injected PID surrogate for `$$`.
    pub pid: u32,
    /// `$!`.
    pub last_background_pid: Option<u32>,
    pub next_virtual_pid: u32,
    /// LCG state behind `$RANDOM`.
    pub random_state: u32,
    /// Construction instant backing `$SECONDS`.
    pub started: Instant,
    /// Epoch seconds injected for `date`; advances with `started`.
    pub epoch: u64,
    pub local_frames: Vec<LocalFrame>,
    /// Stdin shared by the commands of a redirected compound.
    pub pending_stdin: Option<String>,
    /// Suppresses errexit inside `if`/`while`/`until` guards and `!`.
    pub in_condition: bool,
    /// Simple commands executed, for the execution limit.
    pub commands_run: u64,
    /// Function call nesting, for the recursion limit.
    pub call_depth: u32,
    /// Counter for `/dev/fd/N` process-substitution paths.
    pub next_proc_fd: u32,
}

impl ShellState {
    pub fn new() -> Self {
        let mut variables = HashMap::new();
        variables.insert("IFS".to_string(), Value::Scalar(" \t\n".to_string()));
        variables.insert("HOME".to_string(), Value::Scalar("/home/user".to_string()));
        variables.insert("PWD".to_string(), Value::Scalar("/home/user".to_string()));
        Self {
            variables,
            exported: HashSet::new(),
            readonly: HashSet::new(),
            functions: HashMap::new(),
            positional: Vec::new(),
            script_name: "sandsh".to_string(),
            cwd: PathBuf::from("/home/user"),
            previous_dir: PathBuf::from("/home/user"),
            options: ShellOptions::default(),
            shopt: ShoptOptions::default(),
            last_exit_code: 0,
            pipestatus: Vec::new(),
            pid: 1,
            last_background_pid: None,
            next_virtual_pid: 1000,
            random_state: 0x5eed,
            started: Instant::now(),
            epoch: 0,
            local_frames: Vec::new(),
            pending_stdin: None,
            in_condition: false,
            commands_run: 0,
            call_depth: 0,
            next_proc_fd: 10,
        }
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Scalar view of a variable, empty when unset.
    pub fn get_scalar(&self, name: &str) -> String {
        self.variables
            .get(name)
            .map(|v| v.as_scalar())
            .unwrap_or_default()
    }

    /// Set a variable, recording the prior value in the innermost `local`
    /// frame that already claims it. Plain assignment follows dynamic
    /// scoping: whoever declared it local owns the save slot.
    pub fn set(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn set_scalar(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Value::Scalar(value.into()));
    }

    pub fn unset(&mut self, name: &str) {
        self.variables.remove(name);
        self.exported.remove(name);
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.readonly.contains(name)
    }

    /// Declare a name local to the current function frame, saving the outer
    /// binding for restoration on return.
    pub fn declare_local(&mut self, name: &str) {
        if let Some(frame) = self.local_frames.last_mut() {
            if !frame.saved.contains_key(name) {
                let prior = self.variables.get(name).cloned();
                frame.saved.insert(name.to_string(), prior);
            }
        }
    }

    pub fn push_local_frame(&mut self) {
        self.local_frames.push(LocalFrame::default());
    }

    /// Pop a function frame, restoring every saved binding.
    pub fn pop_local_frame(&mut self) {
        if let Some(frame) = self.local_frames.pop() {
            for (name, prior) in frame.saved {
                match prior {
                    Some(value) => {
                        self.variables.insert(name, value);
                    }
                    None => {
                        self.variables.remove(&name);
                    }
                }
            }
        }
    }

    /// The environment visible to command handlers: exported names plus
    /// baseline `HOME`/`PWD`/`IFS`-style variables the shell maintains.
    pub fn env_view(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for name in &self.exported {
            if let Some(value) = self.variables.get(name) {
                env.insert(name.clone(), value.as_scalar());
            }
        }
        env
    }

    /// `$RANDOM`: 15-bit LCG, deterministic from the seeded state.
    pub fn next_random(&mut self) -> u32 {
        self.random_state = self
            .random_state
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        (self.random_state >> 16) & 0x7fff
    }

    /// `$SECONDS`.
    pub fn seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Current epoch seconds for `date`.
    pub fn now_epoch(&self) -> u64 {
        self.epoch + self.started.elapsed().as_secs()
    }

    /// Allocate a synthetic PID for background jobs and subshells.
    pub fn alloc_pid(&mut self) -> u32 {
        let pid = self.next_virtual_pid;
        self.next_virtual_pid += 1;
        pid
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

//! Interpreter: walks the AST and executes it.
//!
//! One instance serves one script execution. Pipelines with more than one
//! stage, subshells, command substitutions, and background statements run
//! on cloned state (`subshell()`); their mutations never escape, matching
//! the single-writer execution model.

pub(crate) mod arith;
pub(crate) mod cond;
pub(crate) mod expand;
pub(crate) mod pattern;
mod state;

pub use state::{ControlFlow, ExecResult, ShellOptions, ShellState, ShoptOptions, Value};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::builtins::{Context, Registry};
use crate::fs::{path as fspath, FileSystem};
use crate::limits::ExecutionLimits;
use crate::logging::LogConfig;
use crate::parser::{
    Assignment, AssignValue, CaseCommand, CaseTerminator, Command, CommandKind, ForCommand,
    IfCommand, ListOperator, LoopCommand, Parser, Pipeline, Redirect, RedirectOp, RedirTarget,
    Script, SimpleCommand, Statement,
};

use expand::ExpError;

pub struct Interpreter {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) state: ShellState,
    pub(crate) registry: Arc<Registry>,
    pub(crate) limits: ExecutionLimits,
    pub(crate) log: LogConfig,
    pub(crate) deadline: Option<Instant>,
    /// Nesting depth of subshells/substitutions, for the depth limit.
    pub(crate) depth: u32,
    /// Stderr produced by expansions (command substitutions) while the
    /// enclosing command was still being assembled.
    pub(crate) pending_stderr: String,
    /// Exit code of the most recent command substitution; becomes `$?`
    /// after an assignment-only command.
    pub(crate) last_substitution_status: Option<i32>,
    /// Output-direction process substitutions to run after the command.
    pub(crate) procsub_pending: Vec<(PathBuf, Script)>,
    /// Whether the last statement's final pipeline actually ran (errexit
    /// does not fire on short-circuited conditions).
    errexit_candidate: bool,
}

/// Redirection routing computed before a command runs.
struct RedirSetup {
    stdin: Option<String>,
    out: SinkTarget,
    err: SinkTarget,
}

#[derive(Debug, Clone, PartialEq)]
enum SinkTarget {
    /// Parent stdout.
    Out,
    /// Parent stderr.
    Err,
    /// Append to a file (already created/truncated at setup).
    File(PathBuf),
}

impl Interpreter {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        state: ShellState,
        registry: Arc<Registry>,
        limits: ExecutionLimits,
        log: LogConfig,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            fs,
            state,
            registry,
            limits,
            log,
            deadline,
            depth: 0,
            pending_stderr: String::new(),
            last_substitution_status: None,
            procsub_pending: Vec::new(),
            errexit_candidate: false,
        }
    }

    /// Snapshot child for subshells, pipeline stages, and substitutions.
    pub(crate) fn subshell(&self) -> Interpreter {
        Interpreter {
            fs: Arc::clone(&self.fs),
            state: self.state.clone(),
            registry: Arc::clone(&self.registry),
            limits: self.limits.clone(),
            log: self.log.clone(),
            deadline: self.deadline,
            depth: self.depth + 1,
            pending_stderr: String::new(),
            last_substitution_status: None,
            procsub_pending: Vec::new(),
            errexit_candidate: false,
        }
    }

    pub(crate) fn resolve_path(&self, path: &str) -> PathBuf {
        fspath::resolve_path(&self.state.cwd, Path::new(path))
    }

    fn cancelled(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    fn take_pending_stderr(&mut self) -> String {
        std::mem::take(&mut self.pending_stderr)
    }

    pub(crate) fn run_script_boxed<'a>(
        &'a mut self,
        script: &'a Script,
    ) -> Pin<Box<dyn Future<Output = ExecResult> + Send + 'a>> {
        Box::pin(self.run_script(script))
    }

    pub async fn run_script(&mut self, script: &Script) -> ExecResult {
        let mut acc = ExecResult::default();
        for statement in &script.statements {
            let res = self.run_statement(statement).await;
            let code = res.exit_code;
            acc.absorb(res);
            self.state.last_exit_code = code;
            if acc.control_flow != ControlFlow::None {
                return acc;
            }
            if self.state.options.errexit
                && code != 0
                && !self.state.in_condition
                && self.errexit_candidate
            {
                acc.control_flow = ControlFlow::Exit(code);
                return acc;
            }
        }
        acc.exit_code = self.state.last_exit_code;
        acc
    }

    async fn run_statement(&mut self, statement: &Statement) -> ExecResult {
        if statement.background {
            // Deterministic background: the job runs to completion on a
            // snapshot before the statement returns 0.
            let pid = self.state.alloc_pid();
            self.state.last_background_pid = Some(pid);
            let mut child = self.subshell();
            let foreground = Statement {
                pipelines: statement.pipelines.clone(),
                operators: statement.operators.clone(),
                background: false,
            };
            let mut res = child.run_statement_boxed(&foreground).await;
            res.exit_code = 0;
            res.control_flow = ControlFlow::None;
            self.errexit_candidate = false;
            return res;
        }

        let mut acc = ExecResult::default();
        let mut exit;

        // First pipeline; guarded when an operator follows it.
        let guarded = !statement.operators.is_empty();
        let res = self.run_pipeline_guarded(&statement.pipelines[0], guarded).await;
        exit = res.exit_code;
        let mut final_ran = statement.operators.is_empty();
        let mut negated_last = statement.pipelines[0].negated;
        acc.absorb(res);
        self.state.last_exit_code = exit;

        let mut i = 0;
        while i < statement.operators.len() && acc.control_flow == ControlFlow::None {
            let op = statement.operators[i];
            i += 1;
            let should_run = match op {
                ListOperator::And => exit == 0,
                ListOperator::Or => exit != 0,
            };
            if should_run {
                let is_final = i == statement.operators.len();
                let pipeline = &statement.pipelines[i];
                let res = self.run_pipeline_guarded(pipeline, !is_final).await;
                exit = res.exit_code;
                final_ran = is_final;
                negated_last = pipeline.negated;
                acc.absorb(res);
                self.state.last_exit_code = exit;
            } else {
                final_ran = false;
            }
        }

        acc.exit_code = exit;
        self.errexit_candidate = final_ran && !negated_last;
        acc
    }

    fn run_statement_boxed<'a>(
        &'a mut self,
        statement: &'a Statement,
    ) -> Pin<Box<dyn Future<Output = ExecResult> + Send + 'a>> {
        Box::pin(self.run_statement(statement))
    }

    async fn run_pipeline_guarded(&mut self, pipeline: &Pipeline, guarded: bool) -> ExecResult {
        if guarded {
            let saved = self.state.in_condition;
            self.state.in_condition = true;
            let res = self.run_pipeline(pipeline).await;
            self.state.in_condition = saved;
            res
        } else {
            self.run_pipeline(pipeline).await
        }
    }

    async fn run_pipeline(&mut self, pipeline: &Pipeline) -> ExecResult {
        if self.cancelled() {
            return cancelled_result();
        }

        let mut result = if pipeline.commands.len() == 1 {
            // Single stage runs in the current shell: assignments persist
            // and control flow escapes.
            let res = self.run_command_boxed(&pipeline.commands[0], None).await;
            self.state.pipestatus = vec![res.exit_code];
            res
        } else {
            let mut statuses = Vec::with_capacity(pipeline.commands.len());
            let mut acc = ExecResult::default();
            let mut stdin: Option<String> = None;
            for (i, command) in pipeline.commands.iter().enumerate() {
                let last = i + 1 == pipeline.commands.len();
                let mut child = self.subshell();
                let res = child.run_command_boxed(command, stdin.take()).await;
                statuses.push(res.exit_code);
                if last {
                    acc.stdout.push_str(&res.stdout);
                    acc.stderr.push_str(&res.stderr);
                } else if pipeline.pipe_stderr[i] {
                    // `|&`: stderr joins the stream feeding the next stage.
                    let mut merged = res.stdout;
                    merged.push_str(&res.stderr);
                    stdin = Some(merged);
                } else {
                    acc.stderr.push_str(&res.stderr);
                    stdin = Some(res.stdout);
                }
            }
            let exit = if self.state.options.pipefail {
                statuses.iter().rev().find(|&&c| c != 0).copied().unwrap_or(0)
            } else {
                *statuses.last().unwrap_or(&0)
            };
            self.state.pipestatus = statuses;
            acc.exit_code = exit;
            acc
        };

        if pipeline.negated {
            result.exit_code = if result.exit_code == 0 { 1 } else { 0 };
        }
        result
    }

    pub(crate) fn run_command_boxed<'a>(
        &'a mut self,
        command: &'a Command,
        stdin: Option<String>,
    ) -> Pin<Box<dyn Future<Output = ExecResult> + Send + 'a>> {
        Box::pin(self.run_command(command, stdin))
    }

    async fn run_command(&mut self, command: &Command, stdin: Option<String>) -> ExecResult {
        if self.cancelled() {
            return cancelled_result();
        }

        let mut setup = match self.setup_redirects(&command.redirects, stdin).await {
            Ok(setup) => setup,
            Err(e) => {
                let mut res = ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                res.stderr = format!("{}{}", self.take_pending_stderr(), res.stderr);
                return res;
            }
        };

        let plain = matches!(setup.out, SinkTarget::Out) && matches!(setup.err, SinkTarget::Err);
        let res = self.run_kind(&command.kind, setup.stdin.take()).await;
        let mut routed = if plain {
            res
        } else {
            self.route_output(res, &setup).await
        };

        // Output-direction process substitutions run once the command has
        // finished writing.
        if !self.procsub_pending.is_empty() {
            let pending = std::mem::take(&mut self.procsub_pending);
            for (path, script) in pending {
                let content = self
                    .fs
                    .read_file(&path)
                    .await
                    .map(|b| String::from_utf8_lossy(&b).to_string())
                    .unwrap_or_default();
                let mut child = self.subshell();
                child.state.pending_stdin = Some(content);
                let sub = child.run_script_boxed(&script).await;
                routed.stdout.push_str(&sub.stdout);
                routed.stderr.push_str(&sub.stderr);
            }
        }

        routed.stderr = format!("{}{}", self.take_pending_stderr(), routed.stderr);
        routed
    }

    async fn run_kind(&mut self, kind: &CommandKind, stdin: Option<String>) -> ExecResult {
        match kind {
            CommandKind::Simple(simple) => self.run_simple(simple, stdin).await,
            // Compound bodies share redirected stdin through the state, so
            // `read` inside the body consumes from it across commands.
            CommandKind::If(_)
            | CommandKind::Loop(_)
            | CommandKind::For(_)
            | CommandKind::Case(_)
            | CommandKind::Group(_) => {
                let replaced = stdin.is_some();
                let saved = if replaced {
                    std::mem::replace(&mut self.state.pending_stdin, stdin)
                } else {
                    None
                };
                let res = match kind {
                    CommandKind::If(cmd) => self.run_if(cmd).await,
                    CommandKind::Loop(cmd) => self.run_loop(cmd).await,
                    CommandKind::For(cmd) => self.run_for(cmd).await,
                    CommandKind::Case(cmd) => self.run_case(cmd).await,
                    CommandKind::Group(body) => self.run_script_boxed(body).await,
                    _ => unreachable!(),
                };
                if replaced {
                    self.state.pending_stdin = saved;
                }
                res
            }
            CommandKind::Subshell(body) => {
                let mut child = self.subshell();
                if stdin.is_some() {
                    child.state.pending_stdin = stdin;
                }
                let mut res = child.run_script_boxed(body).await;
                // Exit and loop control stop at the subshell boundary.
                res.control_flow = ControlFlow::None;
                res
            }
            CommandKind::Arithmetic(src) => match self.eval_arith_text(src).await {
                Ok(value) => ExecResult::code(if value != 0 { 0 } else { 1 }),
                Err(e) => ExecResult::err(format!("sandsh: (({src})): {}\n", e.message), 1),
            },
            CommandKind::Conditional(expr) => match self.eval_cond(expr).await {
                Ok(true) => ExecResult::code(0),
                Ok(false) => ExecResult::code(1),
                Err(e) => ExecResult::err(format!("sandsh: [[: {}\n", e.message), 2),
            },
            CommandKind::FunctionDef(def) => {
                self.state
                    .functions
                    .insert(def.name.clone(), Arc::new(def.clone()));
                ExecResult::code(0)
            }
        }
    }

    async fn run_if(&mut self, cmd: &IfCommand) -> ExecResult {
        let guard = self.run_condition(&cmd.cond).await;
        if guard.control_flow != ControlFlow::None {
            return guard;
        }
        let mut acc = ExecResult {
            stdout: guard.stdout,
            stderr: guard.stderr,
            exit_code: 0,
            control_flow: ControlFlow::None,
        };
        if guard.exit_code == 0 {
            let res = self.run_script_boxed(&cmd.then_body).await;
            acc.absorb(res);
            return acc;
        }
        for (elif_cond, elif_body) in &cmd.elifs {
            let guard = self.run_condition(elif_cond).await;
            let code = guard.exit_code;
            let flow = guard.control_flow;
            acc.stdout.push_str(&guard.stdout);
            acc.stderr.push_str(&guard.stderr);
            if flow != ControlFlow::None {
                acc.control_flow = flow;
                acc.exit_code = code;
                return acc;
            }
            if code == 0 {
                let res = self.run_script_boxed(elif_body).await;
                acc.absorb(res);
                return acc;
            }
        }
        if let Some(else_body) = &cmd.else_body {
            let res = self.run_script_boxed(else_body).await;
            acc.absorb(res);
            return acc;
        }
        acc.exit_code = 0;
        acc
    }

    /// Run a guard script with errexit suppressed.
    async fn run_condition(&mut self, script: &Script) -> ExecResult {
        let saved = self.state.in_condition;
        self.state.in_condition = true;
        let res = self.run_script_boxed(script).await;
        self.state.in_condition = saved;
        res
    }

    async fn run_loop(&mut self, cmd: &LoopCommand) -> ExecResult {
        let mut acc = ExecResult::default();
        let mut iterations: u64 = 0;
        loop {
            if self.cancelled() {
                acc.absorb(cancelled_result());
                return acc;
            }
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                acc.absorb(limit_result("loop iterations"));
                return acc;
            }

            let guard = self.run_condition(&cmd.cond).await;
            let done = (guard.exit_code == 0) == cmd.until;
            let flow = guard.control_flow;
            acc.stdout.push_str(&guard.stdout);
            acc.stderr.push_str(&guard.stderr);
            if flow != ControlFlow::None {
                acc.control_flow = flow;
                acc.exit_code = guard.exit_code;
                return acc;
            }
            if done {
                return acc;
            }

            let res = self.run_script_boxed(&cmd.body).await;
            let flow = res.control_flow;
            acc.stdout.push_str(&res.stdout);
            acc.stderr.push_str(&res.stderr);
            acc.exit_code = res.exit_code;
            match flow {
                ControlFlow::Break(n) => {
                    if n > 1 {
                        acc.control_flow = ControlFlow::Break(n - 1);
                    }
                    acc.exit_code = 0;
                    return acc;
                }
                ControlFlow::Continue(n) => {
                    if n > 1 {
                        acc.control_flow = ControlFlow::Continue(n - 1);
                        return acc;
                    }
                }
                ControlFlow::Return(_) | ControlFlow::Exit(_) => {
                    acc.control_flow = flow;
                    return acc;
                }
                ControlFlow::None => {}
            }
        }
    }

    async fn run_for(&mut self, cmd: &ForCommand) -> ExecResult {
        let values = match &cmd.words {
            Some(words) => match self.expand_words(words).await {
                Ok(values) => values,
                Err(e) => {
                    let mut res =
                        ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                    res.stderr = format!("{}{}", self.take_pending_stderr(), res.stderr);
                    return res;
                }
            },
            None => self.state.positional.clone(),
        };

        let mut acc = ExecResult::default();
        let mut iterations: u64 = 0;
        for value in values {
            if self.cancelled() {
                acc.absorb(cancelled_result());
                return acc;
            }
            iterations += 1;
            if iterations > self.limits.max_loop_iterations {
                acc.absorb(limit_result("loop iterations"));
                return acc;
            }
            self.state.set_scalar(&cmd.var, value);
            let res = self.run_script_boxed(&cmd.body).await;
            let flow = res.control_flow;
            acc.stdout.push_str(&res.stdout);
            acc.stderr.push_str(&res.stderr);
            acc.exit_code = res.exit_code;
            match flow {
                ControlFlow::Break(n) => {
                    if n > 1 {
                        acc.control_flow = ControlFlow::Break(n - 1);
                    }
                    acc.exit_code = 0;
                    return acc;
                }
                ControlFlow::Continue(n) => {
                    if n > 1 {
                        acc.control_flow = ControlFlow::Continue(n - 1);
                        return acc;
                    }
                }
                ControlFlow::Return(_) | ControlFlow::Exit(_) => {
                    acc.control_flow = flow;
                    return acc;
                }
                ControlFlow::None => {}
            }
        }
        acc
    }

    async fn run_case(&mut self, cmd: &CaseCommand) -> ExecResult {
        let subject = match self.expand_word_single(&cmd.word).await {
            Ok(s) => s,
            Err(e) => {
                return ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
            }
        };

        let mut acc = ExecResult::default();
        let mut run_next_unconditionally = false;
        for item in &cmd.items {
            let mut matched = run_next_unconditionally;
            run_next_unconditionally = false;
            if !matched {
                for pattern_word in &item.patterns {
                    let pat = match self.expand_word_pattern(pattern_word).await {
                        Ok(p) => p,
                        Err(e) => {
                            acc.stderr
                                .push_str(&format!("sandsh: {}\n", e.message));
                            acc.exit_code = e.status;
                            return acc;
                        }
                    };
                    if pattern::match_glob(&pat, &subject) {
                        matched = true;
                        break;
                    }
                }
            }
            if !matched {
                continue;
            }
            let res = self.run_script_boxed(&item.body).await;
            let flow = res.control_flow;
            acc.absorb(res);
            if flow != ControlFlow::None {
                return acc;
            }
            match item.terminator {
                CaseTerminator::Break => return acc,
                CaseTerminator::FallThrough => run_next_unconditionally = true,
                CaseTerminator::Continue => {}
            }
        }
        acc
    }

    async fn run_simple(&mut self, simple: &SimpleCommand, stdin: Option<String>) -> ExecResult {
        self.state.commands_run += 1;
        if self.state.commands_run > self.limits.max_commands {
            return limit_result("commands executed");
        }
        self.last_substitution_status = None;

        // Assignment-only command: mutate the current scope.
        if simple.words.is_empty() {
            for assignment in &simple.assignments {
                if let Err(e) = self.apply_assignment(assignment).await {
                    let mut res = ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                    res.stderr = format!("{}{}", self.take_pending_stderr(), res.stderr);
                    return res;
                }
            }
            let code = self.last_substitution_status.take().unwrap_or(0);
            let mut res = ExecResult::code(code);
            res.stderr = self.take_pending_stderr();
            return res;
        }

        let args = match self.expand_words(&simple.words).await {
            Ok(args) => args,
            Err(e) => {
                let mut res = ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                res.stderr = format!("{}{}", self.take_pending_stderr(), res.stderr);
                return res;
            }
        };

        // All words expanded away (`$EMPTY`): fall back to assignments.
        if args.is_empty() {
            for assignment in &simple.assignments {
                if let Err(e) = self.apply_assignment(assignment).await {
                    return ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                }
            }
            let code = self.last_substitution_status.take().unwrap_or(0);
            let mut res = ExecResult::code(code);
            res.stderr = self.take_pending_stderr();
            return res;
        }

        let name = args[0].clone();
        let rest: Vec<String> = args[1..].to_vec();

        let mut trace = String::new();
        if self.state.options.xtrace {
            trace.push_str("+ ");
            trace.push_str(&name);
            for arg in &rest {
                trace.push(' ');
                trace.push_str(&self.log.redact_value(arg));
            }
            trace.push('\n');
        }

        // Prefix assignments are visible only to this command.
        let saved = self.apply_temp_assignments(&simple.assignments).await;
        let saved = match saved {
            Ok(saved) => saved,
            Err(e) => {
                let mut res = ExecResult::err(format!("sandsh: {}\n", e.message), e.status);
                res.stderr = format!("{}{}", self.take_pending_stderr(), res.stderr);
                return res;
            }
        };

        let mut result = self.dispatch(&name, &rest, stdin).await;
        self.restore_temp_assignments(saved);

        result.stderr = format!("{}{}{}", trace, self.take_pending_stderr(), result.stderr);
        result
    }

    async fn dispatch(
        &mut self,
        name: &str,
        args: &[String],
        stdin: Option<String>,
    ) -> ExecResult {
        // Current-scope special forms.
        match name {
            "eval" => return self.run_eval(args).await,
            "source" | "." => return self.run_source(args, stdin).await,
            _ => {}
        }

        if let Some(def) = self.state.functions.get(name).cloned() {
            return self.call_function(&def, args, stdin).await;
        }

        if let Some(builtin) = self.registry.get(name) {
            if args.iter().any(|a| a == "--help") && !builtin.usage().is_empty() {
                return ExecResult::ok(format!("{}\n", builtin.usage()));
            }
            let mut ctx = Context {
                args,
                state: &mut self.state,
                fs: Arc::clone(&self.fs),
                stdin,
                log: &self.log,
                registry: Arc::clone(&self.registry),
                limits: self.limits.clone(),
                deadline: self.deadline,
                depth: self.depth,
            };
            return match builtin.execute(&mut ctx).await {
                Ok(res) => res,
                Err(e) => ExecResult::err(format!("{name}: {e}\n"), e.exit_code()),
            };
        }

        ExecResult::err(format!("sandsh: {name}: command not found\n"), 127)
    }

    async fn run_eval(&mut self, args: &[String]) -> ExecResult {
        let script_text = args.join(" ");
        if script_text.trim().is_empty() {
            return ExecResult::code(0);
        }
        match Parser::new(&script_text).parse() {
            Ok(script) => self.run_script_boxed(&script).await,
            Err(e) => ExecResult::err(format!("sandsh: eval: {e}\n"), 2),
        }
    }

    async fn run_source(&mut self, args: &[String], stdin: Option<String>) -> ExecResult {
        let Some(file) = args.first() else {
            return ExecResult::err("sandsh: source: filename argument required\n".to_string(), 2);
        };
        let path = self.resolve_path(file);
        let content = match self.fs.read_file(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            Err(e) => {
                return ExecResult::err(format!("sandsh: source: {file}: {e}\n"), 1);
            }
        };
        let script = match Parser::new(&content).parse() {
            Ok(script) => script,
            Err(e) => return ExecResult::err(format!("sandsh: source: {e}\n"), 2),
        };
        // Extra arguments become positional parameters for the sourced file.
        let replaced_positional = args.len() > 1;
        let saved_positional = if replaced_positional {
            Some(std::mem::replace(
                &mut self.state.positional,
                args[1..].to_vec(),
            ))
        } else {
            None
        };
        let saved_stdin = match stdin {
            Some(s) => Some(std::mem::replace(&mut self.state.pending_stdin, Some(s))),
            None => None,
        };
        let mut res = self.run_script_boxed(&script).await;
        if let Some(saved) = saved_stdin {
            self.state.pending_stdin = saved;
        }
        if let Some(saved) = saved_positional {
            self.state.positional = saved;
        }
        // `return` inside a sourced file stops the file, not the caller.
        if let ControlFlow::Return(code) = res.control_flow {
            res.exit_code = code;
            res.control_flow = ControlFlow::None;
        }
        res
    }

    async fn call_function(
        &mut self,
        def: &Arc<crate::parser::FunctionDef>,
        args: &[String],
        stdin: Option<String>,
    ) -> ExecResult {
        if self.state.call_depth >= self.limits.max_call_depth {
            return limit_result("function nesting");
        }
        self.state.call_depth += 1;
        let saved_positional =
            std::mem::replace(&mut self.state.positional, args.to_vec());
        self.state.push_local_frame();

        let mut res = self.run_command_boxed(&def.body, stdin).await;

        self.state.pop_local_frame();
        self.state.positional = saved_positional;
        self.state.call_depth -= 1;

        match res.control_flow {
            ControlFlow::Return(code) => {
                res.exit_code = code;
                res.control_flow = ControlFlow::None;
            }
            ControlFlow::Break(_) | ControlFlow::Continue(_) => {
                // Loop control does not cross a function boundary.
                res.control_flow = ControlFlow::None;
            }
            _ => {}
        }
        res
    }

    /// Apply an assignment to the current scope.
    async fn apply_assignment(&mut self, assignment: &Assignment) -> Result<(), ExpError> {
        if self.state.is_readonly(&assignment.name) {
            return Err(ExpError::new(format!(
                "{}: readonly variable",
                assignment.name
            )));
        }
        match (&assignment.value, &assignment.index) {
            (AssignValue::Array(words), None) => {
                let values = self.expand_words(words).await?;
                if assignment.append {
                    if let Some(Value::Indexed(existing)) =
                        self.state.variables.get_mut(&assignment.name)
                    {
                        existing.extend(values);
                        return Ok(());
                    }
                }
                self.state.set(&assignment.name, Value::Indexed(values));
            }
            (AssignValue::Scalar(word), None) => {
                let value = self.expand_word_single(word).await?;
                let value = if assignment.append {
                    let mut existing = self.state.get_scalar(&assignment.name);
                    existing.push_str(&value);
                    existing
                } else {
                    value
                };
                self.state.set_scalar(&assignment.name, value);
            }
            (AssignValue::Scalar(word), Some(index)) => {
                let value = self.expand_word_single(word).await?;
                self.assign_subscript(&assignment.name, index, value, assignment.append)
                    .await?;
            }
            (AssignValue::Array(_), Some(_)) => {
                return Err(ExpError::new(format!(
                    "{}: cannot assign list to array member",
                    assignment.name
                )));
            }
        }
        Ok(())
    }

    async fn assign_subscript(
        &mut self,
        name: &str,
        index: &str,
        value: String,
        append: bool,
    ) -> Result<(), ExpError> {
        match self.state.variables.get(name).cloned() {
            Some(Value::Assoc(mut map)) => {
                let key = self.expand_text(index).await?;
                let entry = map.entry(key).or_default();
                if append {
                    entry.push_str(&value);
                } else {
                    *entry = value;
                }
                self.state.set(name, Value::Assoc(map));
            }
            existing => {
                let idx = self.eval_arith_text(index).await?;
                let mut items = match existing {
                    Some(Value::Indexed(items)) => items,
                    Some(Value::Scalar(s)) => vec![s],
                    _ => Vec::new(),
                };
                let idx = if idx < 0 {
                    let n = items.len() as i64;
                    usize::try_from(n + idx)
                        .map_err(|_| ExpError::new(format!("{name}: bad array subscript")))?
                } else {
                    idx as usize
                };
                if idx >= items.len() {
                    items.resize(idx + 1, String::new());
                }
                if append {
                    items[idx].push_str(&value);
                } else {
                    items[idx] = value;
                }
                self.state.set(name, Value::Indexed(items));
            }
        }
        Ok(())
    }

    /// Apply prefix assignments, returning the saved bindings for restore.
    async fn apply_temp_assignments(
        &mut self,
        assignments: &[Assignment],
    ) -> Result<Vec<(String, Option<Value>, bool)>, ExpError> {
        let mut saved = Vec::new();
        for assignment in assignments {
            let prior = self.state.variables.get(&assignment.name).cloned();
            let was_exported = self.state.exported.contains(&assignment.name);
            saved.push((assignment.name.clone(), prior, was_exported));
            self.apply_assignment(assignment).await?;
            // Temporary exports: visible through ctx.env for the command.
            self.state.exported.insert(assignment.name.clone());
        }
        Ok(saved)
    }

    fn restore_temp_assignments(&mut self, saved: Vec<(String, Option<Value>, bool)>) {
        for (name, prior, was_exported) in saved.into_iter().rev() {
            match prior {
                Some(value) => {
                    self.state.variables.insert(name.clone(), value);
                }
                None => {
                    self.state.variables.remove(&name);
                }
            }
            if !was_exported {
                self.state.exported.remove(&name);
            }
        }
    }

    /// Resolve redirections before the command runs. Files are created or
    /// truncated here so they change even when the command writes nothing.
    async fn setup_redirects(
        &mut self,
        redirects: &[Redirect],
        stdin: Option<String>,
    ) -> Result<RedirSetup, ExpError> {
        let mut setup = RedirSetup {
            stdin,
            out: SinkTarget::Out,
            err: SinkTarget::Err,
        };

        for redirect in redirects {
            let fd = redirect.fd.unwrap_or(match redirect.op {
                RedirectOp::In
                | RedirectOp::ReadWrite
                | RedirectOp::DupIn
                | RedirectOp::HereDoc
                | RedirectOp::HereString => 0,
                _ => 1,
            });

            match redirect.op {
                RedirectOp::In => {
                    let path = self.redirect_path(redirect).await?;
                    let bytes = self.fs.read_file(&path).await.map_err(|e| {
                        ExpError::new(format!("{}: {e}", path.display()))
                    })?;
                    setup.stdin = Some(String::from_utf8_lossy(&bytes).to_string());
                }
                RedirectOp::ReadWrite => {
                    let path = self.redirect_path(redirect).await?;
                    if !self.fs.exists(&path).await.unwrap_or(false) {
                        self.fs.write_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                    }
                    let bytes = self.fs.read_file(&path).await.map_err(|e| {
                        ExpError::new(format!("{}: {e}", path.display()))
                    })?;
                    setup.stdin = Some(String::from_utf8_lossy(&bytes).to_string());
                }
                RedirectOp::HereString => {
                    if let RedirTarget::Word(word) = &redirect.target {
                        let mut content = self.expand_word_single(word).await?;
                        content.push('\n');
                        setup.stdin = Some(content);
                    }
                }
                RedirectOp::HereDoc => {
                    if let RedirTarget::HereDoc { body, .. } = &redirect.target {
                        let content = self.expand_word_single(body).await?;
                        setup.stdin = Some(content);
                    }
                }
                RedirectOp::Out | RedirectOp::OutClobber | RedirectOp::Append => {
                    let path = self.redirect_path(redirect).await?;
                    if redirect.op == RedirectOp::Append {
                        // Materialize so the file exists even with no output.
                        self.fs.append_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                    } else {
                        if self.state.options.noclobber
                            && redirect.op == RedirectOp::Out
                            && self.fs.exists(&path).await.unwrap_or(false)
                        {
                            return Err(ExpError::new(format!(
                                "{}: cannot overwrite existing file",
                                path.display()
                            )));
                        }
                        self.fs.write_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                    }
                    let sink = SinkTarget::File(path);
                    if fd == 2 {
                        setup.err = sink;
                    } else {
                        setup.out = sink;
                    }
                }
                RedirectOp::DupOut | RedirectOp::DupIn => match &redirect.target {
                    RedirTarget::Fd(target_fd) => {
                        let source = match target_fd {
                            1 => setup.out.clone(),
                            2 => setup.err.clone(),
                            _ => continue,
                        };
                        if fd == 2 {
                            setup.err = source;
                        } else if fd == 1 {
                            setup.out = source;
                        }
                    }
                    RedirTarget::Word(_) => {
                        // `>&file` form: same as `>file`.
                        let path = self.redirect_path(redirect).await?;
                        self.fs.write_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                        let sink = SinkTarget::File(path);
                        if fd == 2 {
                            setup.err = sink;
                        } else {
                            setup.out = sink;
                        }
                    }
                    RedirTarget::HereDoc { .. } => {}
                },
                RedirectOp::OutErr | RedirectOp::AppendErr => {
                    let path = self.redirect_path(redirect).await?;
                    if redirect.op == RedirectOp::AppendErr {
                        self.fs.append_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                    } else {
                        self.fs.write_file(&path, b"").await.map_err(|e| {
                            ExpError::new(format!("{}: {e}", path.display()))
                        })?;
                    }
                    setup.out = SinkTarget::File(path.clone());
                    setup.err = SinkTarget::File(path);
                }
            }
        }
        Ok(setup)
    }

    async fn redirect_path(&mut self, redirect: &Redirect) -> Result<PathBuf, ExpError> {
        let RedirTarget::Word(word) = &redirect.target else {
            return Err(ExpError::new("bad redirection target"));
        };
        let target = self.expand_word_single(word).await?;
        Ok(self.resolve_path(&target))
    }

    /// Send the command's captured streams where the redirections point.
    async fn route_output(&mut self, res: ExecResult, setup: &RedirSetup) -> ExecResult {
        let mut routed = ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: res.exit_code,
            control_flow: res.control_flow,
        };
        for (buffer, sink) in [(res.stdout, &setup.out), (res.stderr, &setup.err)] {
            match sink {
                SinkTarget::Out => routed.stdout.push_str(&buffer),
                SinkTarget::Err => routed.stderr.push_str(&buffer),
                SinkTarget::File(path) => {
                    if let Err(e) = self.fs.append_file(path, buffer.as_bytes()).await {
                        routed
                            .stderr
                            .push_str(&format!("sandsh: {}: {e}\n", path.display()));
                    }
                }
            }
        }
        routed
    }
}

fn cancelled_result() -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: "sandsh: cancelled\n".to_string(),
        exit_code: 130,
        control_flow: ControlFlow::Exit(130),
    }
}

fn limit_result(what: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: format!("sandsh: resource limit exceeded: {what}\n"),
        exit_code: 1,
        control_flow: ControlFlow::Exit(1),
    }
}

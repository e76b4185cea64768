//! sandsh - sandboxed in-process bash interpreter for autonomous agents.
//!
//! Scripts execute against a virtual filesystem; nothing touches the host.
//! The shell is single-script, cooperatively scheduled, and deterministic
//! modulo the injected PID, random seed, and clock.
//!
//! # Example
//!
//! ```rust
//! use sandsh::Shell;
//!
//! #[tokio::main]
//! async fn main() -> sandsh::Result<()> {
//!     let mut shell = Shell::builder()
//!         .file("/data/greeting.txt", "hello\n")
//!         .build();
//!     let result = shell.exec("cat /data/greeting.txt | tr a-z A-Z").await?;
//!     assert_eq!(result.stdout, "HELLO\n");
//!     assert_eq!(result.exit_code, 0);
//!     Ok(())
//! }
//! ```

mod builtins;
mod error;
pub mod fs;
mod interpreter;
mod limits;
mod logging;
pub mod parser;
pub mod transform;

pub use builtins::{Builtin, Context, Registry};
pub use error::{Error, Result};
pub use fs::{ContentProvider, FileSystem, FileType, MemFs, Metadata};
pub use interpreter::{ControlFlow, ExecResult, ShellOptions, ShellState, ShoptOptions, Value};
pub use limits::ExecutionLimits;
pub use logging::LogConfig;
pub use transform::{TransformOutcome, TransformPipeline, TransformPlugin};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use interpreter::Interpreter;
use parser::{Parser, Script};
use serde_json::{Map, Value as JsonValue};

/// Result of [`Shell::exec`]. Output is decoded as UTF-8 with replacement.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Exported environment after the script ran.
    pub env: HashMap<String, String>,
    /// Metadata contributed by transform plugins for this execution.
    pub metadata: Map<String, JsonValue>,
}

/// Result of [`Shell::transform`]: the script after all plugins, serialized.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub script: String,
    pub ast: Script,
    pub metadata: Map<String, JsonValue>,
}

enum Seed {
    Bytes(Vec<u8>),
    Lazy(ContentProvider),
}

/// Main entry point: a sandboxed shell instance.
///
/// State (variables, functions, working directory, options) persists
/// across `exec` calls; the filesystem is shared for the lifetime of the
/// instance.
pub struct Shell {
    fs: Arc<dyn FileSystem>,
    state: ShellState,
    registry: Registry,
    transforms: TransformPipeline,
    limits: ExecutionLimits,
    log: LogConfig,
    deadline: Option<Instant>,
    pending_seeds: Vec<(PathBuf, Seed)>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    /// A shell with an empty in-memory filesystem and default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ShellBuilder {
        ShellBuilder::default()
    }

    /// The shared filesystem handle.
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Install or override a command.
    pub fn register_command(&mut self, name: impl Into<String>, builtin: Arc<dyn Builtin>) {
        self.registry.register(name, builtin);
    }

    /// Install an AST transform applied before every subsequent `exec`.
    pub fn register_transform_plugin(&mut self, plugin: Box<dyn TransformPlugin>) {
        self.transforms.push(plugin);
    }

    /// Execute a script. Parse errors do not return `Err`: they surface as
    /// exit code 2 with the diagnostic on stderr, like a real shell.
    pub async fn exec(&mut self, script: &str) -> Result<ExecOutput> {
        self.flush_seeds().await?;

        let ast = match Parser::new(script).parse() {
            Ok(ast) => ast,
            Err(e) => {
                return Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: format!("sandsh: {e}\n"),
                    exit_code: e.exit_code(),
                    env: self.state.env_view(),
                    metadata: Map::new(),
                });
            }
        };

        let (ast, metadata) = self.transforms.apply(ast);

        let mut interpreter = Interpreter::new(
            Arc::clone(&self.fs),
            std::mem::take(&mut self.state),
            Arc::new(self.registry.clone()),
            self.limits.clone(),
            self.log.clone(),
            self.deadline,
        );
        let result = interpreter.run_script(&ast).await;
        self.state = interpreter.state;
        self.state.last_exit_code = result.exit_code;

        Ok(ExecOutput {
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            env: self.state.env_view(),
            metadata,
        })
    }

    /// Parse, apply transform plugins, and serialize without executing.
    pub fn transform(&self, script: &str) -> Result<TransformOutput> {
        let ast = Parser::new(script).parse()?;
        let (ast, metadata) = self.transforms.apply(ast);
        Ok(TransformOutput {
            script: transform::serialize(&ast),
            ast,
            metadata,
        })
    }

    /// Seed builder-declared files, creating intermediate directories.
    async fn flush_seeds(&mut self) -> Result<()> {
        for (path, seed) in std::mem::take(&mut self.pending_seeds) {
            if let Some(parent) = path.parent() {
                self.fs.mkdir(parent, true).await?;
            }
            match seed {
                Seed::Bytes(bytes) => self.fs.write_file(&path, &bytes).await?,
                Seed::Lazy(provider) => {
                    // Lazy seeding needs MemFs; other backends materialize
                    // immediately.
                    let bytes = provider().await?;
                    self.fs.write_file(&path, &bytes).await?;
                }
            }
        }
        Ok(())
    }
}

/// Builder for customized [`Shell`] configuration.
pub struct ShellBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    files: Vec<(PathBuf, Seed)>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    pid: u32,
    random_seed: u32,
    epoch: u64,
    deadline: Option<Instant>,
    limits: ExecutionLimits,
    log: LogConfig,
}

impl Default for ShellBuilder {
    fn default() -> Self {
        Self {
            fs: None,
            files: Vec::new(),
            env: Vec::new(),
            cwd: None,
            pid: 1,
            random_seed: 0x5eed,
            epoch: 0,
            deadline: None,
            limits: ExecutionLimits::default(),
            log: LogConfig::default(),
        }
    }
}

impl ShellBuilder {
    /// Seed a file; intermediate directories are created implicitly.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.files
            .push((path.into(), Seed::Bytes(content.as_ref().to_vec())));
        self
    }

    /// Seed a file backed by a provider invoked on first read.
    pub fn lazy_file(mut self, path: impl Into<PathBuf>, provider: ContentProvider) -> Self {
        self.files.push((path.into(), Seed::Lazy(provider)));
        self
    }

    /// Set an environment variable, exported to command handlers.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Use a custom filesystem backend.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// PID surrogate reported by `$$` (default 1).
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Seed for `$RANDOM`, for reproducible runs.
    pub fn random_seed(mut self, seed: u32) -> Self {
        self.random_seed = seed;
        self
    }

    /// Epoch seconds reported by `date` (default 0, the Unix epoch).
    pub fn epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Cancellation deadline: execution past this instant aborts with
    /// exit 130.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn build(self) -> Shell {
        let (fs, mem): (Arc<dyn FileSystem>, Option<Arc<MemFs>>) = match self.fs {
            Some(fs) => (fs, None),
            None => {
                let mem = Arc::new(MemFs::new());
                (Arc::clone(&mem) as Arc<dyn FileSystem>, Some(mem))
            }
        };

        let mut state = ShellState::new();
        state.pid = self.pid;
        state.random_state = self.random_seed;
        state.epoch = self.epoch;
        for (key, value) in self.env {
            state.set_scalar(&key, value);
            state.exported.insert(key);
        }
        if let Some(cwd) = self.cwd {
            state.set_scalar("PWD", cwd.to_string_lossy().to_string());
            state.cwd = cwd.clone();
            state.previous_dir = cwd;
        }

        // Seed synchronously on the in-memory backend (lazy entries keep
        // their providers); custom backends are seeded on first exec.
        let mut pending_seeds = Vec::new();
        match mem {
            Some(mem) => {
                for (path, seed) in self.files {
                    match seed {
                        Seed::Bytes(bytes) => mem.add_file(&path, bytes, 0o644),
                        Seed::Lazy(provider) => mem.add_lazy_file(&path, provider, 0o644),
                    }
                }
            }
            None => pending_seeds = self.files,
        }

        Shell {
            fs,
            state,
            registry: Registry::with_defaults(),
            transforms: TransformPipeline::new(),
            limits: self.limits,
            log: self.log,
            deadline: self.deadline,
            pending_seeds,
        }
    }
}

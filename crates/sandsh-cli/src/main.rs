//! sandsh CLI - command line interface for sandboxed script execution.
//!
//! Usage:
//!   sandsh -c 'echo hello'        # Execute a command string
//!   sandsh script.sh [args ...]   # Execute a host script file in the sandbox
//!   sandsh                        # Line-oriented REPL, exits on EOF

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// sandsh - sandboxed shell interpreter
#[derive(Parser, Debug)]
#[command(name = "sandsh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Execute the given command string
    #[arg(short = 'c')]
    command: Option<String>,

    /// Script file to execute
    #[arg()]
    script: Option<PathBuf>,

    /// Arguments passed to the script as positional parameters
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut shell = sandsh::Shell::new();

    if let Some(command) = args.command {
        let result = shell
            .exec(&command)
            .await
            .context("failed to execute command")?;
        print!("{}", result.stdout);
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
        std::process::exit(result.exit_code);
    }

    if let Some(script_path) = args.script {
        let script = std::fs::read_to_string(&script_path)
            .with_context(|| format!("failed to read script: {}", script_path.display()))?;
        // Positional parameters via `set --`; quoting keeps arguments intact.
        if !args.args.is_empty() {
            let quoted: Vec<String> = args
                .args
                .iter()
                .map(|a| sandsh::transform::quote_word(a))
                .collect();
            shell
                .exec(&format!("set -- {}", quoted.join(" ")))
                .await
                .context("failed to set positional parameters")?;
        }
        let result = shell
            .exec(&script)
            .await
            .context("failed to execute script")?;
        print!("{}", result.stdout);
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
        std::process::exit(result.exit_code);
    }

    // Interactive REPL: prompt, read, exec, print; EOF exits with the last
    // command's status.
    let stdin = std::io::stdin();
    let mut last_exit = 0;
    loop {
        print!("sandsh$ ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if line.trim().is_empty() {
            continue;
        }
        match shell.exec(&line).await {
            Ok(result) => {
                print!("{}", result.stdout);
                if !result.stderr.is_empty() {
                    eprint!("{}", result.stderr);
                }
                last_exit = result.exit_code;
            }
            Err(e) => {
                eprintln!("sandsh: {e}");
                last_exit = 1;
            }
        }
    }
    std::process::exit(last_exit);
}

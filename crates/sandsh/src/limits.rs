//! Execution limits for sandboxed scripts.
//!
//! A runaway script (fork-bomb style recursion, `while true` loops) cannot be
//! killed by a host signal because nothing forks. The executor instead counts
//! commands, loop iterations, and call depth against these limits and fails
//! the script with a `ResourceLimit` diagnostic when one is exceeded.

/// Limits applied to a single script execution.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// Maximum simple commands executed per `exec` call.
    pub max_commands: u64,
    /// Maximum iterations of any single loop.
    pub max_loop_iterations: u64,
    /// Maximum function call nesting depth.
    pub max_call_depth: u32,
    /// Maximum nesting of command substitutions / `exec` re-entry.
    pub max_subshell_depth: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_commands: 100_000,
            max_loop_iterations: 1_000_000,
            max_call_depth: 200,
            max_subshell_depth: 64,
        }
    }
}

impl ExecutionLimits {
    /// Unlimited execution. Useful for trusted scripts in tests.
    pub fn unlimited() -> Self {
        Self {
            max_commands: u64::MAX,
            max_loop_iterations: u64::MAX,
            max_call_depth: u32::MAX,
            max_subshell_depth: u32::MAX,
        }
    }
}

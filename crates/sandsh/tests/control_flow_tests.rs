//! Compound commands, functions, loop control, subshell isolation,
//! errexit, limits, and cancellation.

use sandsh::{ExecutionLimits, Shell};
use std::time::{Duration, Instant};

async fn out(shell: &mut Shell, script: &str) -> String {
    let result = shell.exec(script).await.unwrap();
    assert_eq!(
        result.exit_code, 0,
        "script {script:?} failed: {}",
        result.stderr
    );
    result.stdout
}

#[tokio::test]
async fn if_elif_else() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "if true; then echo yes; fi").await, "yes\n");
    assert_eq!(
        out(&mut shell, "if false; then echo a; elif true; then echo b; else echo c; fi").await,
        "b\n"
    );
    assert_eq!(
        out(&mut shell, "if false; then echo a; else echo c; fi").await,
        "c\n"
    );
    // No branch taken exits 0.
    assert_eq!(out(&mut shell, "if false; then echo a; fi").await, "");
}

#[tokio::test]
async fn while_and_until_loops() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "i=0; while ((i < 3)); do echo $i; ((i += 1)); done").await,
        "0\n1\n2\n"
    );
    assert_eq!(
        out(&mut shell, "i=0; until ((i >= 2)); do echo $i; ((i += 1)); done").await,
        "0\n1\n"
    );
}

#[tokio::test]
async fn for_loops() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "for i in a b c; do echo $i; done").await,
        "a\nb\nc\n"
    );
    assert_eq!(
        out(&mut shell, "set -- x y; for arg; do echo $arg; done").await,
        "x\ny\n"
    );
    assert_eq!(
        out(&mut shell, "for i in {1..3}; do echo $i; done").await,
        "1\n2\n3\n"
    );
}

#[tokio::test]
async fn break_and_continue_with_levels() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "for i in 1 2 3; do if [ $i = 2 ]; then break; fi; echo $i; done").await,
        "1\n"
    );
    assert_eq!(
        out(
            &mut shell,
            "for i in 1 2 3; do if [ $i = 2 ]; then continue; fi; echo $i; done"
        )
        .await,
        "1\n3\n"
    );
    assert_eq!(
        out(
            &mut shell,
            "for i in 1 2; do for j in a b; do echo $i$j; break 2; done; done"
        )
        .await,
        "1a\n"
    );
    assert_eq!(
        out(
            &mut shell,
            "for i in 1 2; do for j in a b; do continue 2; done; echo skipped; done; echo end"
        )
        .await,
        "end\n"
    );
}

#[tokio::test]
async fn case_matching_and_fallthrough() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "case apple in a*) echo fruit ;; *) echo other ;; esac").await,
        "fruit\n"
    );
    assert_eq!(
        out(&mut shell, "case zebra in a*) echo fruit ;; *) echo other ;; esac").await,
        "other\n"
    );
    // `;&` runs the next body without re-matching.
    assert_eq!(
        out(&mut shell, "case a in a) echo one ;& b) echo two ;; c) echo three ;; esac").await,
        "one\ntwo\n"
    );
    // `;;&` keeps testing patterns.
    assert_eq!(
        out(&mut shell, "case ab in a*) echo starts-a ;;& *b) echo ends-b ;; esac").await,
        "starts-a\nends-b\n"
    );
    assert_eq!(
        out(&mut shell, "case x in a|x|y) echo alt ;; esac").await,
        "alt\n"
    );
}

#[tokio::test]
async fn subshell_isolation() {
    let mut shell = Shell::new();
    let result = shell
        .exec("X=outer; (X=inner; echo $X); echo $X")
        .await
        .unwrap();
    assert_eq!(result.stdout, "inner\nouter\n");
    assert_eq!(result.exit_code, 0);

    // cwd changes stay inside the subshell too.
    assert_eq!(out(&mut shell, "(cd /tmp; pwd); pwd").await, "/tmp\n/home/user\n");
    // Subshell exit code propagates, but `exit` does not kill the parent.
    assert_eq!(
        out(&mut shell, "(exit 3) || echo caught-$?").await,
        "caught-3\n"
    );
}

#[tokio::test]
async fn group_shares_scope() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "{ X=shared; }; echo $X").await, "shared\n");
}

#[tokio::test]
async fn functions_and_dynamic_scope() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "greet() { echo \"hi $1\"; }; greet world").await,
        "hi world\n"
    );
    assert_eq!(
        out(&mut shell, "function twice { echo $1$1; }; twice ab").await,
        "abab\n"
    );
    // Locals shadow and restore.
    assert_eq!(
        out(
            &mut shell,
            "X=global; f() { local X=local; echo $X; }; f; echo $X"
        )
        .await,
        "local\nglobal\n"
    );
    // Dynamic scoping: callees see the caller's locals.
    assert_eq!(
        out(
            &mut shell,
            "inner() { echo $V; }; outer() { local V=seen; inner; }; outer"
        )
        .await,
        "seen\n"
    );
    // Plain assignments inside functions escape to the caller.
    assert_eq!(
        out(&mut shell, "f() { Y=set-inside; }; f; echo $Y").await,
        "set-inside\n"
    );
}

#[tokio::test]
async fn return_unwinds_function() {
    let mut shell = Shell::new();
    let result = shell
        .exec("f() { return 7; echo unreachable; }; f; echo $?")
        .await
        .unwrap();
    assert_eq!(result.stdout, "7\n");

    // `return` is scoped to the function, not the caller.
    assert_eq!(
        out(&mut shell, "f() { return 0; }; f; echo after").await,
        "after\n"
    );
}

#[tokio::test]
async fn positional_params_restored_after_call() {
    let mut shell = Shell::new();
    assert_eq!(
        out(
            &mut shell,
            "set -- top; f() { echo in:$1; }; f nested; echo out:$1"
        )
        .await,
        "in:nested\nout:top\n"
    );
}

#[tokio::test]
async fn exit_stops_the_script() {
    let mut shell = Shell::new();
    let result = shell.exec("echo before; exit 5; echo after").await.unwrap();
    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.exit_code, 5);
}

#[tokio::test]
async fn errexit_aborts_after_failure() {
    let mut shell = Shell::new();
    let result = shell.exec("set -e; false; echo after").await.unwrap();
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn errexit_spares_condition_contexts() {
    let mut shell = Shell::new();
    let result = shell
        .exec("set -e; if false; then echo t; fi; false || echo rescued; ! false; echo end")
        .await
        .unwrap();
    assert_eq!(result.stdout, "rescued\nend\n");
    assert_eq!(result.exit_code, 0);

    let result = shell
        .exec("set -e; while false; do :; done; echo looped")
        .await
        .unwrap();
    assert_eq!(result.stdout, "looped\n");
}

#[tokio::test]
async fn conditional_command_tests() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "[[ abc == a* ]] && echo glob").await, "glob\n");
    assert_eq!(out(&mut shell, "[[ abc != b* ]] && echo ne").await, "ne\n");
    assert_eq!(out(&mut shell, "[[ 10 -gt 9 ]] && echo gt").await, "gt\n");
    assert_eq!(out(&mut shell, "[[ abc =~ ^a.c$ ]] && echo re").await, "re\n");
    assert_eq!(
        out(&mut shell, "[[ -z '' && -n x ]] && echo both").await,
        "both\n"
    );
    assert_eq!(
        out(&mut shell, "[[ ( 1 -eq 2 || 3 -eq 3 ) && ! -z full ]] && echo ok").await,
        "ok\n"
    );
    let mut seeded = Shell::builder().file("/etc/hosts", "localhost\n").build();
    assert_eq!(
        out(&mut seeded, "[[ -f /etc/hosts && -d /etc ]] && echo fs").await,
        "fs\n"
    );
}

#[tokio::test]
async fn arithmetic_command_exit_codes() {
    let mut shell = Shell::new();
    assert_eq!(shell.exec("((1 + 1))").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("((1 - 1))").await.unwrap().exit_code, 1);
    assert_eq!(out(&mut shell, "((x = 5)); echo $x").await, "5\n");
    assert_eq!(
        out(&mut shell, "i=0; ((i++)); ((i++)); echo $i").await,
        "2\n"
    );
}

#[tokio::test]
async fn eval_runs_in_current_scope() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "eval 'X=fromeval'; echo $X").await, "fromeval\n");
    assert_eq!(out(&mut shell, "cmd='echo hi'; eval $cmd").await, "hi\n");
}

#[tokio::test]
async fn source_runs_in_current_scope() {
    let mut shell = Shell::builder()
        .file("/lib/util.sh", "util_loaded=yes\nutil() { echo util:$1; }\n")
        .build();
    assert_eq!(
        out(&mut shell, "source /lib/util.sh; echo $util_loaded; util x").await,
        "yes\nutil:x\n"
    );
    let result = shell.exec(". /missing.sh").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("/missing.sh"));
}

#[tokio::test]
async fn command_not_found_is_127() {
    let mut shell = Shell::new();
    let result = shell.exec("definitely_not_a_command").await.unwrap();
    assert_eq!(result.exit_code, 127);
    assert!(result.stderr.contains("command not found"));
    // The script continues without errexit.
    let result = shell.exec("nope_cmd; echo still-here").await.unwrap();
    assert_eq!(result.stdout, "still-here\n");
}

#[tokio::test]
async fn loop_iteration_limit_stops_runaway_scripts() {
    let mut shell = Shell::builder()
        .limits(ExecutionLimits {
            max_loop_iterations: 50,
            ..ExecutionLimits::default()
        })
        .build();
    let result = shell.exec("while true; do :; done; echo not-reached").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("resource limit"));
    assert!(!result.stdout.contains("not-reached"));
}

#[tokio::test]
async fn recursion_limit_stops_runaway_functions() {
    let mut shell = Shell::builder()
        .limits(ExecutionLimits {
            max_call_depth: 20,
            ..ExecutionLimits::default()
        })
        .build();
    let result = shell.exec("f() { f; }; f").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("resource limit"));
}

#[tokio::test]
async fn deadline_cancels_execution_with_130() {
    let mut shell = Shell::builder()
        .deadline(Instant::now() + Duration::from_millis(50))
        .build();
    let result = shell
        .exec("echo first; sleep 30; echo second")
        .await
        .unwrap();
    assert_eq!(result.exit_code, 130);
    assert!(result.stdout.contains("first"));
    assert!(!result.stdout.contains("second"));
}

#[tokio::test]
async fn xtrace_writes_commands_to_stderr() {
    let mut shell = Shell::new();
    let result = shell.exec("set -x; echo traced").await.unwrap();
    assert_eq!(result.stdout, "traced\n");
    assert!(result.stderr.contains("+ echo traced"));
}

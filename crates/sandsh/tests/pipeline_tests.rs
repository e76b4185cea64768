//! Pipeline semantics: `|`, `|&`, PIPESTATUS, pipefail, negation, and the
//! snapshot isolation of pipeline stages.

use sandsh::Shell;

#[tokio::test]
async fn seeded_file_through_cat_and_grep() {
    let mut shell = Shell::builder().file("/data/f.txt", "hello\n").build();
    let result = shell.exec("cat /data/f.txt | grep hello").await.unwrap();
    assert_eq!(result.stdout, "hello\n");
    assert_eq!(result.stderr, "");
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn stage_failure_does_not_fail_pipeline_by_default() {
    let mut shell = Shell::new();
    let result = shell.exec("ls /no_such | cat").await.unwrap();
    assert_eq!(result.stdout, "");
    assert!(result.stderr.contains("No such file"));
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn grep_without_match_exits_one() {
    let mut shell = Shell::new();
    let result = shell.exec("echo hello | grep nomatch").await.unwrap();
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn pipefail_propagates_first_failure() {
    let mut shell = Shell::new();
    let result = shell.exec("set -o pipefail; false | true").await.unwrap();
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn pipefail_off_keeps_last_stage_exit() {
    let mut shell = Shell::new();
    let result = shell.exec("false | true").await.unwrap();
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn pipe_amp_routes_stderr_into_stream() {
    let mut shell = Shell::new();
    let result = shell.exec("ls /no_such |& cat").await.unwrap();
    assert!(result.stdout.contains("No such file"));
    assert_eq!(result.stderr, "");
}

#[tokio::test]
async fn pipestatus_has_one_entry_per_stage() {
    let mut shell = Shell::new();
    let result = shell
        .exec("true | false | true; echo ${PIPESTATUS[0]} ${PIPESTATUS[1]} ${PIPESTATUS[2]}")
        .await
        .unwrap();
    assert_eq!(result.stdout, "0 1 0\n");

    let result = shell
        .exec("true | false | true; echo ${#PIPESTATUS[@]}")
        .await
        .unwrap();
    assert_eq!(result.stdout, "3\n");
}

#[tokio::test]
async fn pipestatus_for_single_command() {
    let mut shell = Shell::new();
    let result = shell.exec("false; echo ${PIPESTATUS[0]}").await.unwrap();
    // PIPESTATUS reflects the most recent pipeline, here `false` itself.
    assert_eq!(result.stdout, "1\n");
}

#[tokio::test]
async fn negation_inverts_exit_code() {
    let mut shell = Shell::new();
    assert_eq!(shell.exec("! false").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("! true").await.unwrap().exit_code, 1);
    assert_eq!(shell.exec("! echo hi | grep hi").await.unwrap().exit_code, 1);
}

#[tokio::test]
async fn compound_command_as_pipeline_stage() {
    let mut shell = Shell::new();
    let result = shell
        .exec("for i in 3 1 2; do echo $i; done | sort")
        .await
        .unwrap();
    assert_eq!(result.stdout, "1\n2\n3\n");
}

#[tokio::test]
async fn pipeline_stages_run_on_state_snapshots() {
    let mut shell = Shell::new();
    let result = shell
        .exec("X=outer; echo start | { X=stage; cat; }; echo $X")
        .await
        .unwrap();
    assert_eq!(result.stdout, "start\nouter\n");
}

#[tokio::test]
async fn three_stage_streaming_order() {
    let mut shell = Shell::new();
    let result = shell
        .exec("printf 'b\\na\\nc\\n' | sort | head -n 2")
        .await
        .unwrap();
    assert_eq!(result.stdout, "a\nb\n");
}

#[tokio::test]
async fn background_statement_returns_zero_immediately() {
    let mut shell = Shell::new();
    let result = shell.exec("false & echo done").await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("done"));
}

#[tokio::test]
async fn background_job_output_is_captured() {
    let mut shell = Shell::new();
    let result = shell.exec("echo from-bg &").await.unwrap();
    assert_eq!(result.stdout, "from-bg\n");
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn dollar_bang_reports_background_pid() {
    let mut shell = Shell::new();
    let result = shell.exec("true & echo $!").await.unwrap();
    let pid: u32 = result.stdout.trim().parse().unwrap();
    assert!(pid >= 1000);
}

#[tokio::test]
async fn and_or_chains() {
    let mut shell = Shell::new();
    let result = shell
        .exec("true && echo yes || echo no; false && echo yes || echo no")
        .await
        .unwrap();
    assert_eq!(result.stdout, "yes\nno\n");
}

//! Redirection semantics against the virtual filesystem.

use sandsh::Shell;

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
async fn output_redirect_truncates() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "echo one > /tmp/f; echo two > /tmp/f; cat /tmp/f").await,
        "two\n"
    );
}

#[tokio::test]
async fn append_redirect() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "echo one > /tmp/f; echo two >> /tmp/f; cat /tmp/f").await,
        "one\ntwo\n"
    );
}

#[tokio::test]
async fn echo_n_round_trip() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "echo -n X > /tmp/x; cat /tmp/x").await, "X");
}

#[tokio::test]
async fn input_redirect() {
    let mut shell = Shell::builder().file("/data/in.txt", "from file\n").build();
    assert_eq!(out(&mut shell, "cat < /data/in.txt").await, "from file\n");
}

#[tokio::test]
async fn missing_input_fails_without_running() {
    let mut shell = Shell::new();
    let result = shell.exec("cat < /missing").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("/missing"));
}

#[tokio::test]
async fn stderr_redirect_to_file() {
    let mut shell = Shell::new();
    let result = shell.exec("ls /no_such 2> /tmp/err").await.unwrap();
    assert_eq!(result.stderr, "");
    let content = out(&mut shell, "cat /tmp/err").await;
    assert!(content.contains("No such file"));
}

#[tokio::test]
async fn dup_stderr_into_stdout() {
    let mut shell = Shell::new();
    let result = shell.exec("ls /no_such > /tmp/all 2>&1").await.unwrap();
    assert_eq!(result.stderr, "");
    assert_eq!(result.stdout, "");
    let content = out(&mut shell, "cat /tmp/all").await;
    assert!(content.contains("No such file"));
}

#[tokio::test]
async fn dup_order_matters() {
    let mut shell = Shell::new();
    // `2>&1 > f`: stderr follows the OLD stdout (the parent), stdout the file.
    let result = shell.exec("ls /no_such 2>&1 > /tmp/only_out").await.unwrap();
    assert!(result.stdout.contains("No such file"));
    assert_eq!(out(&mut shell, "cat /tmp/only_out").await, "");
}

#[tokio::test]
async fn both_streams_redirect() {
    let mut shell = Shell::new();
    let result = shell
        .exec("{ echo out; ls /no_such; } &> /tmp/both")
        .await
        .unwrap();
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "");
    let content = out(&mut shell, "cat /tmp/both").await;
    assert!(content.contains("out"));
    assert!(content.contains("No such file"));
}

#[tokio::test]
async fn dev_null_discards() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "echo gone > /dev/null; cat /dev/null").await, "");
    assert_eq!(out(&mut shell, "ls /no_such 2> /dev/null; echo ok").await, "ok\n");
}

#[tokio::test]
async fn noclobber_and_force_override() {
    let mut shell = Shell::new();
    shell.exec("echo v1 > /tmp/f").await.unwrap();
    let result = shell.exec("set -C; echo v2 > /tmp/f").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("cannot overwrite"));
    assert_eq!(out(&mut shell, "cat /tmp/f").await, "v1\n");

    // `>|` ignores noclobber.
    shell.exec("set -C; echo v3 >| /tmp/f").await.unwrap();
    assert_eq!(out(&mut shell, "cat /tmp/f").await, "v3\n");
}

#[tokio::test]
async fn here_string() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "cat <<< 'one liner'").await, "one liner\n");
    assert_eq!(out(&mut shell, "x=5; cat <<< \"value $x\"").await, "value 5\n");
}

#[tokio::test]
async fn heredoc_with_expansion() {
    let mut shell = Shell::new();
    let script = "name=world\ncat <<EOF\nhello $name\ntotal: $((2 + 3))\nEOF\n";
    assert_eq!(out(&mut shell, script).await, "hello world\ntotal: 5\n");
}

#[tokio::test]
async fn quoted_heredoc_stays_literal() {
    let mut shell = Shell::new();
    let script = "cat <<'EOF'\nliteral $name and $(cmd)\nEOF\n";
    assert_eq!(out(&mut shell, script).await, "literal $name and $(cmd)\n");
}

#[tokio::test]
async fn heredoc_dash_strips_tabs() {
    let mut shell = Shell::new();
    let script = "cat <<-EOF\n\t\tindented\n\tEOF\n";
    assert_eq!(out(&mut shell, script).await, "indented\n");
}

#[tokio::test]
async fn heredoc_feeds_pipeline() {
    let mut shell = Shell::new();
    let script = "cat <<EOF | wc -l\none\ntwo\nEOF\n";
    assert_eq!(out(&mut shell, script).await, "2\n");
}

#[tokio::test]
async fn redirect_on_compound_command() {
    let mut shell = Shell::new();
    assert_eq!(
        out(
            &mut shell,
            "for i in 1 2; do echo $i; done > /tmp/loop; cat /tmp/loop"
        )
        .await,
        "1\n2\n"
    );
    assert_eq!(
        out(
            &mut shell,
            "{ echo a; echo b; } > /tmp/group; cat /tmp/group"
        )
        .await,
        "a\nb\n"
    );
}

#[tokio::test]
async fn while_read_from_redirected_file() {
    let mut shell = Shell::builder()
        .file("/data/lines.txt", "alpha\nbeta\ngamma\n")
        .build();
    assert_eq!(
        out(
            &mut shell,
            "while read line; do echo got:$line; done < /data/lines.txt"
        )
        .await,
        "got:alpha\ngot:beta\ngot:gamma\n"
    );
}

#[tokio::test]
async fn group_stdin_is_consumed_sequentially() {
    let mut shell = Shell::builder()
        .file("/data/two.txt", "first\nsecond\n")
        .build();
    assert_eq!(
        out(
            &mut shell,
            "{ read a; read b; echo $b then $a; } < /data/two.txt"
        )
        .await,
        "second then first\n"
    );
}

#[tokio::test]
async fn redirect_only_command_creates_file() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "> /tmp/created; ls /tmp").await,
        "created\n"
    );
}

#[tokio::test]
async fn redirect_target_is_expanded() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "f=/tmp/via-var; echo data > $f; cat /tmp/via-var").await,
        "data\n"
    );
}

#[tokio::test]
async fn empty_file_reads_back_empty() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "touch /tmp/empty; cat /tmp/empty; wc -c < /tmp/empty").await, "0\n");
}

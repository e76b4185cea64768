//! Behavior of the text-processing and utility builtins through the shell.

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
async fn echo_flags() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "echo hello world").await, "hello world\n");
    assert_eq!(out(&mut shell, "echo -n no-newline").await, "no-newline");
    assert_eq!(out(&mut shell, "echo -e 'a\\tb'").await, "a\tb\n");
    assert_eq!(out(&mut shell, "echo -E 'a\\tb'").await, "a\\tb\n");
}

#[tokio::test]
async fn printf_formats() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "printf '%s\\n' hi").await, "hi\n");
    assert_eq!(out(&mut shell, "printf '%d-%d\\n' 3 4").await, "3-4\n");
    assert_eq!(out(&mut shell, "printf '%05d\\n' 42").await, "00042\n");
    assert_eq!(out(&mut shell, "printf '%x %o\\n' 255 8").await, "ff 10\n");
    assert_eq!(out(&mut shell, "printf '%s=%s\\n' a 1 b 2").await, "a=1\nb=2\n");
    assert_eq!(out(&mut shell, "printf '%-4s|\\n' ab").await, "ab  |\n");
}

#[tokio::test]
async fn head_tail() {
    let mut shell = Shell::builder()
        .file("/data/ten.txt", "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n")
        .build();
    assert_eq!(out(&mut shell, "head -n 3 /data/ten.txt").await, "1\n2\n3\n");
    assert_eq!(out(&mut shell, "tail -n 2 /data/ten.txt").await, "9\n10\n");
    assert_eq!(out(&mut shell, "seq 20 | head -n 2").await, "1\n2\n");
    assert_eq!(out(&mut shell, "printf 'abcdef' | head -c 3").await, "abc");
}

#[tokio::test]
async fn sort_and_uniq() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "printf 'b\\na\\nc\\n' | sort").await, "a\nb\nc\n");
    assert_eq!(out(&mut shell, "printf 'b\\na\\nc\\n' | sort -r").await, "c\nb\na\n");
    assert_eq!(out(&mut shell, "printf '10\\n9\\n2\\n' | sort -n").await, "2\n9\n10\n");
    assert_eq!(out(&mut shell, "printf 'a\\na\\nb\\n' | sort -u").await, "a\nb\n");
    assert_eq!(out(&mut shell, "printf 'a\\na\\nb\\na\\n' | uniq").await, "a\nb\na\n");
    assert_eq!(
        out(&mut shell, "printf 'a\\na\\nb\\n' | uniq -c").await,
        "      2 a\n      1 b\n"
    );
    assert_eq!(out(&mut shell, "printf 'a\\na\\nb\\n' | uniq -d").await, "a\n");
}

#[tokio::test]
async fn wc_counts() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "printf 'a b\\nc\\n' | wc -l").await, "2\n");
    assert_eq!(out(&mut shell, "printf 'a b\\nc\\n' | wc -w").await, "3\n");
    assert_eq!(out(&mut shell, "printf 'abc' | wc -c").await, "3\n");
}

#[tokio::test]
async fn cut_fields_and_chars() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "printf 'a:b:c\\nd:e:f\\n' | cut -d: -f2").await,
        "b\ne\n"
    );
    assert_eq!(
        out(&mut shell, "printf 'a:b:c\\n' | cut -d: -f1,3").await,
        "a:c\n"
    );
    assert_eq!(out(&mut shell, "printf 'abcdef\\n' | cut -c2-4").await, "bcd\n");
}

#[tokio::test]
async fn tr_translation() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "echo hello | tr a-z A-Z").await, "HELLO\n");
    assert_eq!(out(&mut shell, "echo hello | tr -d l").await, "heo\n");
    assert_eq!(out(&mut shell, "echo aabbcc | tr -s ab").await, "abcc\n");
    assert_eq!(out(&mut shell, "echo abc | tr '[:lower:]' '[:upper:]'").await, "ABC\n");
}

#[tokio::test]
async fn grep_variants() {
    let mut shell = Shell::builder()
        .file("/data/log.txt", "info: start\nwarn: slow\nerror: bad\ninfo: done\n")
        .build();
    assert_eq!(
        out(&mut shell, "grep info /data/log.txt").await,
        "info: start\ninfo: done\n"
    );
    assert_eq!(out(&mut shell, "grep -c info /data/log.txt").await, "2\n");
    assert_eq!(
        out(&mut shell, "grep -n error /data/log.txt").await,
        "3:error: bad\n"
    );
    assert_eq!(
        out(&mut shell, "grep -v info /data/log.txt").await,
        "warn: slow\nerror: bad\n"
    );
    assert_eq!(out(&mut shell, "grep -i INFO /data/log.txt | wc -l").await, "2\n");
    assert_eq!(out(&mut shell, "grep -o 'err..' /data/log.txt").await, "error\n");
    assert_eq!(
        shell.exec("grep -q info /data/log.txt").await.unwrap().exit_code,
        0
    );
    assert_eq!(
        shell.exec("grep -q zzz /data/log.txt").await.unwrap().exit_code,
        1
    );
}

#[tokio::test]
async fn seq_sequences() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "seq 3").await, "1\n2\n3\n");
    assert_eq!(out(&mut shell, "seq 2 4").await, "2\n3\n4\n");
    assert_eq!(out(&mut shell, "seq 10 -5 0").await, "10\n5\n0\n");
    assert_eq!(out(&mut shell, "seq -s, 1 3").await, "1,2,3\n");
}

#[tokio::test]
async fn basename_dirname() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "basename /usr/local/bin").await, "bin\n");
    assert_eq!(out(&mut shell, "basename /tmp/archive.tar .tar").await, "archive\n");
    assert_eq!(out(&mut shell, "dirname /usr/local/bin").await, "/usr/local\n");
    assert_eq!(out(&mut shell, "dirname plain").await, ".\n");
    assert_eq!(out(&mut shell, "dirname /top").await, "/\n");
}

#[tokio::test]
async fn file_management_commands() {
    let mut shell = Shell::new();
    assert_eq!(
        out(
            &mut shell,
            "mkdir -p /proj/src; touch /proj/src/main.rs; ls /proj/src"
        )
        .await,
        "main.rs\n"
    );
    assert_eq!(
        out(
            &mut shell,
            "echo content > /proj/a.txt; cp /proj/a.txt /proj/b.txt; cat /proj/b.txt"
        )
        .await,
        "content\n"
    );
    assert_eq!(
        out(&mut shell, "mv /proj/b.txt /proj/c.txt; ls /proj").await,
        "a.txt\nc.txt\nsrc\n"
    );
    assert_eq!(out(&mut shell, "rm /proj/c.txt; ls /proj").await, "a.txt\nsrc\n");
    assert_eq!(out(&mut shell, "rm -r /proj; echo gone").await, "gone\n");

    let result = shell.exec("rm /proj/a.txt").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(shell.exec("rm -f /proj/a.txt").await.unwrap().exit_code, 0);
}

#[tokio::test]
async fn cp_r_copies_tree() {
    let mut shell = Shell::builder()
        .file("/src/a/f1", "one")
        .file("/src/a/b/f2", "two")
        .build();
    assert_eq!(
        out(&mut shell, "cp -r /src /dst; cat /dst/a/f1 /dst/a/b/f2").await,
        "onetwo"
    );
}

#[tokio::test]
async fn symlinks_through_ln_and_readlink() {
    let mut shell = Shell::builder().file("/data/real.txt", "real\n").build();
    assert_eq!(
        out(
            &mut shell,
            "ln -s /data/real.txt /data/link.txt; cat /data/link.txt"
        )
        .await,
        "real\n"
    );
    assert_eq!(
        out(&mut shell, "readlink /data/link.txt").await,
        "/data/real.txt\n"
    );
    assert_eq!(
        out(&mut shell, "realpath /data/link.txt").await,
        "/data/real.txt\n"
    );
}

#[tokio::test]
async fn cd_and_pwd() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "pwd").await, "/home/user\n");
    assert_eq!(out(&mut shell, "cd /tmp; pwd").await, "/tmp\n");
    assert_eq!(out(&mut shell, "cd /tmp; cd; pwd").await, "/home/user\n");
    assert_eq!(out(&mut shell, "cd /tmp; cd /home; cd -; pwd").await, "/tmp\n/tmp\n");
    let result = shell.exec("cd /nowhere").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("No such file"));
}

#[tokio::test]
async fn test_builtin_forms() {
    let mut shell = Shell::new();
    assert_eq!(shell.exec("test abc = abc").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("[ abc = def ]").await.unwrap().exit_code, 1);
    assert_eq!(shell.exec("[ 3 -lt 5 ]").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("[ -z '' ]").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("[ -n '' ]").await.unwrap().exit_code, 1);
    assert_eq!(shell.exec("[ ! -z x ]").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("[ ! -n x ]").await.unwrap().exit_code, 1);
    assert_eq!(shell.exec("[ a = a -a b = b ]").await.unwrap().exit_code, 0);
    assert_eq!(shell.exec("[ a = b -o c = c ]").await.unwrap().exit_code, 0);
    let mut seeded = Shell::builder().file("/f.txt", "x").build();
    assert_eq!(seeded.exec("[ -f /f.txt ]").await.unwrap().exit_code, 0);
    assert_eq!(seeded.exec("[ -d /f.txt ]").await.unwrap().exit_code, 1);
    assert_eq!(seeded.exec("[ -s /f.txt ]").await.unwrap().exit_code, 0);
}

#[tokio::test]
async fn read_splits_fields() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "echo 'one two three' | { read a b; echo \"$a|$b\"; }").await,
        "one|two three\n"
    );
    assert_eq!(
        out(&mut shell, "echo solo | { read; echo got:$REPLY; }").await,
        "got:solo\n"
    );
}

#[tokio::test]
async fn export_and_env() {
    let mut shell = Shell::new();
    let result = shell
        .exec("export DEPLOY_ENV=prod; env | grep DEPLOY_ENV")
        .await
        .unwrap();
    assert_eq!(result.stdout, "DEPLOY_ENV=prod\n");
    // Unexported variables stay out of env.
    let result = shell.exec("hidden=1; env | grep hidden").await.unwrap();
    assert_eq!(result.stdout, "");
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn prefix_assignments_are_temporary() {
    let mut shell = Shell::new();
    let result = shell
        .exec("TMPVAR=abc env | grep TMPVAR; echo [${TMPVAR:-unset}]")
        .await
        .unwrap();
    assert_eq!(result.stdout, "TMPVAR=abc\n[unset]\n");
}

#[tokio::test]
async fn readonly_rejects_writes() {
    let mut shell = Shell::new();
    let result = shell.exec("readonly LOCKED=1; LOCKED=2").await.unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("readonly"));
    assert_eq!(out(&mut shell, "echo $LOCKED").await, "1\n");
}

#[tokio::test]
async fn unset_removes_variables_and_functions() {
    let mut shell = Shell::new();
    assert_eq!(out(&mut shell, "x=1; unset x; echo [${x:-gone}]").await, "[gone]\n");
    let result = shell
        .exec("f() { echo hi; }; unset -f f; f")
        .await
        .unwrap();
    assert_eq!(result.exit_code, 127);
}

#[tokio::test]
async fn shift_consumes_positionals() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "set -- a b c; shift; echo $1 $#").await,
        "b 2\n"
    );
    assert_eq!(
        out(&mut shell, "set -- a b c; shift 2; echo $1").await,
        "c\n"
    );
}

#[tokio::test]
async fn xargs_builds_commands() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "echo 'a b c' | xargs echo item:").await,
        "item: a b c\n"
    );
    assert_eq!(
        out(&mut shell, "printf '1 2 3 4' | xargs -n 2 echo pair:").await,
        "pair: 1 2\npair: 3 4\n"
    );
    assert_eq!(
        out(&mut shell, "printf 'x\\ny\\n' | xargs -I {} echo [{}]").await,
        "[x]\n[y]\n"
    );
    // xargs runs through the real shell: files land on the shared VFS.
    assert_eq!(
        out(
            &mut shell,
            "echo /tmp/made-by-xargs | xargs touch; ls /tmp"
        )
        .await,
        "made-by-xargs\n"
    );
}

#[tokio::test]
async fn which_and_date() {
    let mut shell = Shell::builder().epoch(86_400).build();
    assert_eq!(out(&mut shell, "which cat").await, "/bin/cat\n");
    assert_eq!(shell.exec("which no_such_cmd").await.unwrap().exit_code, 1);
    assert_eq!(out(&mut shell, "date +%Y-%m-%d").await, "1970-01-02\n");
    let epoch = out(&mut shell, "date +%s").await;
    let n: u64 = epoch.trim().parse().unwrap();
    assert!(n >= 86_400);
}

#[tokio::test]
async fn help_flag_convention() {
    let mut shell = Shell::new();
    let result = shell.exec("grep --help").await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("usage: grep"));
    let result = shell.exec("mkdir --help").await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("usage: mkdir"));
}

#[tokio::test]
async fn declare_prints_and_creates() {
    let mut shell = Shell::new();
    assert_eq!(
        out(&mut shell, "declare x=5; echo $x").await,
        "5\n"
    );
    let result = shell
        .exec("arr=(a b); declare -p arr")
        .await
        .unwrap();
    assert!(result.stdout.contains("declare -a arr"));
}

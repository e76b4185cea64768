//! Property-based tests: the parser/interpreter never panic on arbitrary
//! input, and the serializer round-trips every AST it is handed.

use proptest::prelude::*;
use sandsh::parser::Parser;
use sandsh::transform::serialize;
use sandsh::Shell;

/// Run a script and return whether it completed (didn't panic).
async fn try_exec(script: &str) -> bool {
    let mut shell = Shell::new();
    let _ = shell.exec(script).await;
    true
}

mod strategies {
    use proptest::prelude::*;

    pub fn arbitrary_string() -> impl Strategy<Value = String> {
        prop::string::string_regex(".{0,100}").unwrap()
    }

    pub fn identifier() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,16}").unwrap()
    }

    pub fn word() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9_./-]{1,24}").unwrap()
    }

    pub fn arithmetic() -> impl Strategy<Value = String> {
        prop::string::string_regex("[0-9+\\-*/%() ]{1,30}").unwrap()
    }

    /// Well-formed scripts built from a few shapes, for round-trip checks.
    pub fn structured_script() -> impl Strategy<Value = String> {
        let simple = (word(), word()).prop_map(|(a, b)| format!("echo {a} {b}"));
        let assign = (identifier(), word()).prop_map(|(n, v)| format!("{n}={v}"));
        let pipe = (word(), word()).prop_map(|(a, b)| format!("echo {a} | grep {b}"));
        let cond = (word(), word())
            .prop_map(|(a, b)| format!("if [ {a} = {b} ]; then echo same; else echo diff; fi"));
        let looped =
            (identifier(), word()).prop_map(|(v, w)| format!("for {v} in {w} x; do echo ${v}; done"));
        let redirect = word().prop_map(|w| format!("echo {w} > /tmp/out"));
        let subst = word().prop_map(|w| format!("echo $(echo {w})"));
        prop::collection::vec(
            prop_oneof![simple, assign, pipe, cond, looped, redirect, subst],
            1..4,
        )
        .prop_map(|commands| commands.join("\n"))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Arbitrary input never panics the pipeline.
    #[test]
    fn never_panics_on_arbitrary_input(input in strategies::arbitrary_string()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let completed = rt.block_on(try_exec(&input));
        prop_assert!(completed);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// `parse(serialize(parse(s))) == parse(s)` for well-formed scripts.
    #[test]
    fn serializer_round_trips(script in strategies::structured_script()) {
        let first = match Parser::new(&script).parse() {
            Ok(ast) => ast,
            Err(_) => return Ok(()),
        };
        let text = serialize(&first);
        let second = Parser::new(&text).parse();
        prop_assert!(second.is_ok(), "reparse failed for {:?}", text);
        prop_assert_eq!(first, second.unwrap(), "round trip changed AST for {:?}", text);
    }

    /// Assignments of arbitrary safe words execute cleanly.
    #[test]
    fn handles_valid_assignments(name in strategies::identifier(), value in strategies::word()) {
        let script = format!("{name}={value}\necho ${{{name}}}");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut shell = Shell::new();
        let result = rt.block_on(shell.exec(&script)).unwrap();
        prop_assert_eq!(result.stdout.trim_end(), value.as_str());
    }

    /// Arithmetic expansion never panics, even on malformed expressions.
    #[test]
    fn handles_arithmetic(expr in strategies::arithmetic()) {
        let script = format!("echo $(({expr}))");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let completed = rt.block_on(try_exec(&script));
        prop_assert!(completed);
    }

    /// Glob matching: every name matches its own escaped pattern.
    #[test]
    fn glob_self_match(name in strategies::word()) {
        let script = format!("case '{name}' in '{name}') echo hit ;; esac");
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut shell = Shell::new();
        let result = rt.block_on(shell.exec(&script)).unwrap();
        prop_assert_eq!(result.stdout.as_str(), "hit\n");
    }
}

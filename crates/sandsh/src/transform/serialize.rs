//! AST serializer.
//!
//! Emits script text that re-parses to a structurally equal AST
//! (`parse(serialize(parse(s))) == parse(s)`). Output targets functional
//! equivalence, not source-whitespace preservation: statements are joined
//! with newlines at the top level and `; ` inside compound bodies, and
//! every parameter expansion is emitted in braced form.

use crate::parser::{
    Assignment, AssignValue, BraceExpr, CaseTerminator, Command, CommandKind, CondExpr,
    ListOperator, ParamExpansion, ParamOp, Pipeline, Redirect, RedirectOp, RedirTarget, Script,
    Statement, Word, WordPart,
};

/// Serialize a script to text.
pub fn serialize(script: &Script) -> String {
    let mut ser = Serializer::default();
    ser.script_toplevel(script);
    ser.out
}

/// Serialize a single word (used by `Display for Word` and diagnostics).
pub fn serialize_word(word: &Word) -> String {
    let mut ser = Serializer::default();
    ser.word(word, false);
    ser.out
}

/// Quote arbitrary text so it survives a trip through the parser as one
/// literal word. Used by `printf %q` and `xargs`.
pub fn quote_word(text: &str) -> String {
    if text.is_empty() {
        return "''".to_string();
    }
    let safe = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:%@+=,".contains(c));
    if safe {
        return text.to_string();
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    // ANSI-C quoting handles embedded single quotes cleanly.
    let mut out = String::from("$'");
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

#[derive(Default)]
struct Serializer {
    out: String,
    /// Heredocs seen on the current line: (delimiter, body text, quoted).
    pending_heredocs: Vec<(String, String, bool)>,
}

impl Serializer {
    fn script_toplevel(&mut self, script: &Script) {
        for (i, statement) in script.statements.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.statement(statement);
            self.flush_heredocs();
        }
    }

    /// Inline form for compound bodies: statements joined by `; ` (or just
    /// a space after a backgrounded statement).
    fn script_inline(&mut self, script: &Script) {
        for (i, statement) in script.statements.iter().enumerate() {
            if i > 0 {
                if self.out.ends_with('&') {
                    self.out.push(' ');
                } else {
                    self.out.push_str("; ");
                }
            }
            self.statement(statement);
        }
    }

    fn flush_heredocs(&mut self) {
        for (delimiter, body, _) in std::mem::take(&mut self.pending_heredocs) {
            self.out.push('\n');
            self.out.push_str(&body);
            if !body.is_empty() && !body.ends_with('\n') {
                self.out.push('\n');
            }
            self.out.push_str(&delimiter);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        for (i, pipeline) in statement.pipelines.iter().enumerate() {
            if i > 0 {
                self.out.push_str(match statement.operators[i - 1] {
                    ListOperator::And => " && ",
                    ListOperator::Or => " || ",
                });
            }
            self.pipeline(pipeline);
        }
        if statement.background {
            self.out.push_str(" &");
        }
    }

    fn pipeline(&mut self, pipeline: &Pipeline) {
        if pipeline.negated {
            self.out.push_str("! ");
        }
        for (i, command) in pipeline.commands.iter().enumerate() {
            if i > 0 {
                self.out.push_str(if pipeline.pipe_stderr[i - 1] {
                    " |& "
                } else {
                    " | "
                });
            }
            self.command(command);
        }
    }

    fn command(&mut self, command: &Command) {
        self.command_kind(&command.kind);
        for redirect in &command.redirects {
            self.out.push(' ');
            self.redirect(redirect);
        }
    }

    fn command_kind(&mut self, kind: &CommandKind) {
        match kind {
            CommandKind::Simple(simple) => {
                let mut first = true;
                for assignment in &simple.assignments {
                    if !first {
                        self.out.push(' ');
                    }
                    first = false;
                    self.assignment(assignment);
                }
                for word in &simple.words {
                    if !first {
                        self.out.push(' ');
                    }
                    first = false;
                    self.word(word, false);
                }
            }
            CommandKind::If(cmd) => {
                self.out.push_str("if ");
                self.script_inline(&cmd.cond);
                self.out.push_str("; then ");
                self.script_inline(&cmd.then_body);
                for (elif_cond, elif_body) in &cmd.elifs {
                    self.separator();
                    self.out.push_str("elif ");
                    self.script_inline(elif_cond);
                    self.out.push_str("; then ");
                    self.script_inline(elif_body);
                }
                if let Some(else_body) = &cmd.else_body {
                    self.separator();
                    self.out.push_str("else ");
                    self.script_inline(else_body);
                }
                self.separator();
                self.out.push_str("fi");
            }
            CommandKind::Loop(cmd) => {
                self.out
                    .push_str(if cmd.until { "until " } else { "while " });
                self.script_inline(&cmd.cond);
                self.out.push_str("; do ");
                self.script_inline(&cmd.body);
                self.separator();
                self.out.push_str("done");
            }
            CommandKind::For(cmd) => {
                self.out.push_str("for ");
                self.out.push_str(&cmd.var);
                if let Some(words) = &cmd.words {
                    self.out.push_str(" in");
                    for word in words {
                        self.out.push(' ');
                        self.word(word, false);
                    }
                }
                self.out.push_str("; do ");
                self.script_inline(&cmd.body);
                self.separator();
                self.out.push_str("done");
            }
            CommandKind::Case(cmd) => {
                self.out.push_str("case ");
                self.word(&cmd.word, false);
                self.out.push_str(" in ");
                for item in &cmd.items {
                    for (i, pattern) in item.patterns.iter().enumerate() {
                        if i > 0 {
                            self.out.push('|');
                        }
                        self.word(pattern, false);
                    }
                    self.out.push_str(") ");
                    self.script_inline(&item.body);
                    if !item.body.statements.is_empty() {
                        self.out.push(' ');
                    }
                    self.out.push_str(match item.terminator {
                        CaseTerminator::Break => ";;",
                        CaseTerminator::FallThrough => ";&",
                        CaseTerminator::Continue => ";;&",
                    });
                    self.out.push(' ');
                }
                self.out.push_str("esac");
            }
            CommandKind::Subshell(body) => {
                self.out.push('(');
                self.script_inline(body);
                self.out.push(')');
            }
            CommandKind::Group(body) => {
                self.out.push_str("{ ");
                self.script_inline(body);
                self.separator();
                self.out.push('}');
            }
            CommandKind::FunctionDef(def) => {
                self.out.push_str(&def.name);
                self.out.push_str("() ");
                self.command(&def.body);
            }
            CommandKind::Arithmetic(expr) => {
                self.out.push_str("((");
                self.out.push_str(expr);
                self.out.push_str("))");
            }
            CommandKind::Conditional(expr) => {
                self.out.push_str("[[ ");
                self.cond(expr);
                self.out.push_str(" ]]");
            }
        }
    }

    /// `; ` before a closing keyword, or a plain space after `&`.
    fn separator(&mut self) {
        if self.out.ends_with('&') || self.out.ends_with("then ") || self.out.ends_with("do ") {
            self.out.push(' ');
        } else {
            self.out.push_str("; ");
        }
    }

    fn assignment(&mut self, assignment: &Assignment) {
        self.out.push_str(&assignment.name);
        if let Some(index) = &assignment.index {
            self.out.push('[');
            self.out.push_str(index);
            self.out.push(']');
        }
        if assignment.append {
            self.out.push('+');
        }
        self.out.push('=');
        match &assignment.value {
            AssignValue::Scalar(word) => self.word(word, false),
            AssignValue::Array(words) => {
                self.out.push('(');
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        self.out.push(' ');
                    }
                    self.word(word, false);
                }
                self.out.push(')');
            }
        }
    }

    fn redirect(&mut self, redirect: &Redirect) {
        if let Some(fd) = redirect.fd {
            self.out.push_str(&fd.to_string());
        }
        let op = match redirect.op {
            RedirectOp::In => "<",
            RedirectOp::Out => ">",
            RedirectOp::OutClobber => ">|",
            RedirectOp::Append => ">>",
            RedirectOp::ReadWrite => "<>",
            RedirectOp::DupIn => "<&",
            RedirectOp::DupOut => ">&",
            RedirectOp::OutErr => "&>",
            RedirectOp::AppendErr => "&>>",
            RedirectOp::HereDoc => "<<",
            RedirectOp::HereString => "<<<",
        };
        self.out.push_str(op);
        match &redirect.target {
            RedirTarget::Fd(fd) => self.out.push_str(&fd.to_string()),
            RedirTarget::Word(word) => {
                if !matches!(redirect.op, RedirectOp::DupIn | RedirectOp::DupOut) {
                    self.out.push(' ');
                }
                self.word(word, false);
            }
            RedirTarget::HereDoc { body, quoted } => {
                let body_text = if *quoted {
                    match body.parts.first() {
                        Some(WordPart::Literal(text)) => text.clone(),
                        _ => String::new(),
                    }
                } else {
                    heredoc_body_text(&body.parts)
                };
                let delimiter = pick_delimiter(&body_text);
                if *quoted {
                    self.out.push('\'');
                    self.out.push_str(&delimiter);
                    self.out.push('\'');
                } else {
                    self.out.push_str(&delimiter);
                }
                self.pending_heredocs
                    .push((delimiter, body_text, *quoted));
            }
        }
    }

    fn cond(&mut self, expr: &CondExpr) {
        match expr {
            CondExpr::And(lhs, rhs) => {
                self.cond(lhs);
                self.out.push_str(" && ");
                self.cond(rhs);
            }
            CondExpr::Or(lhs, rhs) => {
                self.cond(lhs);
                self.out.push_str(" || ");
                self.cond(rhs);
            }
            CondExpr::Not(inner) => {
                self.out.push_str("! ");
                self.cond(inner);
            }
            CondExpr::Group(inner) => {
                self.out.push_str("( ");
                self.cond(inner);
                self.out.push_str(" )");
            }
            CondExpr::Unary { op, operand } => {
                self.out.push_str(op);
                self.out.push(' ');
                self.word(operand, false);
            }
            CondExpr::Binary { op, lhs, rhs } => {
                self.word(lhs, false);
                self.out.push(' ');
                self.out.push_str(op);
                self.out.push(' ');
                self.word(rhs, false);
            }
            CondExpr::Bare(word) => self.word(word, false),
        }
    }

    /// `escape_slash` protects `/` inside `${var/pat/rep}` arguments.
    fn word(&mut self, word: &Word, escape_slash: bool) {
        for part in &word.parts {
            self.word_part(part, escape_slash);
        }
    }

    fn word_part(&mut self, part: &WordPart, escape_slash: bool) {
        match part {
            WordPart::Literal(text) => self.out.push_str(&escape_literal(text, escape_slash)),
            WordPart::SingleQuoted(text) => self.out.push_str(&single_quoted(text)),
            WordPart::DoubleQuoted(parts) => {
                self.out.push('"');
                for part in parts {
                    match part {
                        WordPart::Literal(text) => {
                            self.out.push_str(&escape_dquote_literal(text))
                        }
                        other => self.word_part(other, false),
                    }
                }
                self.out.push('"');
            }
            WordPart::Parameter(p) => self.parameter(p),
            WordPart::CommandSub(script) => {
                self.out.push_str("$(");
                let mut inner = Serializer::default();
                inner.script_toplevel(script);
                self.out.push_str(&inner.out);
                self.out.push(')');
            }
            WordPart::ArithSub(src) => {
                self.out.push_str("$((");
                self.out.push_str(src);
                self.out.push_str("))");
            }
            WordPart::Brace(expr) => self.brace(expr),
            WordPart::Tilde(user) => {
                self.out.push('~');
                if let Some(user) = user {
                    self.out.push_str(user);
                }
            }
            WordPart::Glob(pattern) => self.out.push_str(pattern),
            WordPart::ProcessSub { output, body } => {
                self.out.push_str(if *output { ">(" } else { "<(" });
                let mut inner = Serializer::default();
                inner.script_toplevel(body);
                self.out.push_str(&inner.out);
                self.out.push(')');
            }
        }
    }

    fn brace(&mut self, expr: &BraceExpr) {
        self.out.push('{');
        match expr {
            BraceExpr::Items(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.word(item, false);
                }
            }
            BraceExpr::Range { start, end, step } => {
                self.out.push_str(&start.to_string());
                self.out.push_str("..");
                self.out.push_str(&end.to_string());
                if *step != 1 {
                    self.out.push_str("..");
                    self.out.push_str(&step.to_string());
                }
            }
            BraceExpr::CharRange { start, end, step } => {
                self.out.push(*start);
                self.out.push_str("..");
                self.out.push(*end);
                if *step != 1 {
                    self.out.push_str("..");
                    self.out.push_str(&step.to_string());
                }
            }
        }
        self.out.push('}');
    }

    fn parameter(&mut self, p: &ParamExpansion) {
        self.out.push_str("${");
        let name_and_index = |ser: &mut Serializer| {
            ser.out.push_str(&p.name);
            if let Some(index) = &p.index {
                ser.out.push('[');
                ser.out.push_str(index);
                ser.out.push(']');
            }
        };

        match p.op.as_deref() {
            None => name_and_index(self),
            Some(ParamOp::Length) => {
                self.out.push('#');
                name_and_index(self);
            }
            Some(ParamOp::Indirect) => {
                self.out.push('!');
                name_and_index(self);
            }
            Some(ParamOp::PrefixNames { keys_form }) => {
                self.out.push('!');
                self.out.push_str(&p.name);
                self.out.push(if *keys_form { '@' } else { '*' });
            }
            Some(ParamOp::ArrayKeys) => {
                self.out.push('!');
                name_and_index(self);
            }
            Some(ParamOp::Default { word, colon }) => {
                name_and_index(self);
                if *colon {
                    self.out.push(':');
                }
                self.out.push('-');
                self.op_word(word);
            }
            Some(ParamOp::Assign { word, colon }) => {
                name_and_index(self);
                if *colon {
                    self.out.push(':');
                }
                self.out.push('=');
                self.op_word(word);
            }
            Some(ParamOp::Alternative { word, colon }) => {
                name_and_index(self);
                if *colon {
                    self.out.push(':');
                }
                self.out.push('+');
                self.op_word(word);
            }
            Some(ParamOp::ErrorIfUnset { word, colon }) => {
                name_and_index(self);
                if *colon {
                    self.out.push(':');
                }
                self.out.push('?');
                self.op_word(word);
            }
            Some(ParamOp::Substring { offset, length }) => {
                name_and_index(self);
                self.out.push(':');
                if offset.starts_with('-') {
                    self.out.push(' ');
                }
                self.out.push_str(offset);
                if let Some(length) = length {
                    self.out.push(':');
                    if length.starts_with('-') {
                        self.out.push(' ');
                    }
                    self.out.push_str(length);
                }
            }
            Some(ParamOp::RemovePrefix { pattern, longest }) => {
                name_and_index(self);
                self.out.push('#');
                if *longest {
                    self.out.push('#');
                }
                self.op_word(pattern);
            }
            Some(ParamOp::RemoveSuffix { pattern, longest }) => {
                name_and_index(self);
                self.out.push('%');
                if *longest {
                    self.out.push('%');
                }
                self.op_word(pattern);
            }
            Some(ParamOp::Replace {
                pattern,
                replacement,
                all,
                prefix,
                suffix,
            }) => {
                name_and_index(self);
                self.out.push('/');
                if *all {
                    self.out.push('/');
                } else if *prefix {
                    self.out.push('#');
                } else if *suffix {
                    self.out.push('%');
                }
                self.word(pattern, true);
                if let Some(replacement) = replacement {
                    self.out.push('/');
                    self.word(replacement, true);
                }
            }
            Some(ParamOp::CaseConvert { upper, all }) => {
                name_and_index(self);
                let marker = if *upper { '^' } else { ',' };
                self.out.push(marker);
                if *all {
                    self.out.push(marker);
                }
            }
        }
        self.out.push('}');
    }

    /// A parameter-operation argument word (terminated by `}`).
    fn op_word(&mut self, word: &Word) {
        self.word(word, false);
    }
}

/// Escape shell-special characters in an unquoted literal so it re-parses
/// as the same literal text.
fn escape_literal(text: &str, escape_slash: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let special = matches!(
            c,
            ' ' | '\t' | '|' | '&' | ';' | '<' | '>' | '(' | ')' | '$' | '`' | '\\' | '"'
                | '\'' | '*' | '?' | '[' | ']' | '{' | '}' | '~' | '#' | '!'
        ) || (escape_slash && c == '/');
        if c == '\n' {
            // Newlines cannot be backslash-escaped (that is a line
            // continuation); single-quote them.
            out.push_str("'\n'");
            continue;
        }
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_dquote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn single_quoted(text: &str) -> String {
    if !text.contains('\'') && !text.contains('\\') {
        return format!("'{text}'");
    }
    // Content with single quotes round-trips through ANSI-C quoting, which
    // the lexer folds back into a single-quoted part.
    let mut out = String::from("$'");
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Render unquoted heredoc body parts back to text.
fn heredoc_body_text(parts: &[WordPart]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            WordPart::Literal(text) => {
                for c in text.chars() {
                    if matches!(c, '$' | '`' | '\\') {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            WordPart::Parameter(p) => {
                let mut ser = Serializer::default();
                ser.parameter(p);
                out.push_str(&ser.out);
            }
            WordPart::CommandSub(script) => {
                out.push_str("$(");
                out.push_str(&serialize(script));
                out.push(')');
            }
            WordPart::ArithSub(src) => {
                out.push_str("$((");
                out.push_str(src);
                out.push_str("))");
            }
            other => {
                let mut ser = Serializer::default();
                ser.word_part(other, false);
                out.push_str(&ser.out);
            }
        }
    }
    out
}

/// A heredoc delimiter that does not collide with any body line.
fn pick_delimiter(body: &str) -> String {
    let mut candidate = "EOF".to_string();
    let mut counter = 0;
    while body.lines().any(|line| line == candidate) {
        counter += 1;
        candidate = format!("EOF{counter}");
    }
    candidate
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn round_trip(input: &str) {
        let first = Parser::new(input).parse().unwrap();
        let text = serialize(&first);
        let second = Parser::new(&text)
            .parse()
            .unwrap_or_else(|e| panic!("reparse of {text:?} failed: {e}"));
        assert_eq!(first, second, "serialized form: {text:?}");
    }

    #[test]
    fn round_trips_simple_commands() {
        round_trip("echo hello world");
        round_trip("echo 'single quoted' \"double $x quoted\"");
        round_trip("FOO=bar BAZ=$(date) env");
        round_trip("arr=(a b c)");
        round_trip("m[key]=value");
    }

    #[test]
    fn round_trips_operators_and_pipelines() {
        round_trip("true && echo yes || echo no");
        round_trip("ls | grep x |& wc -l");
        round_trip("! grep -q pattern file");
        round_trip("sleep 5 &");
        round_trip("a; b; c");
    }

    #[test]
    fn round_trips_redirections() {
        round_trip("echo hi > /tmp/out");
        round_trip("echo hi >> /tmp/out 2>&1");
        round_trip("cmd < input.txt");
        round_trip("cmd &> all.log");
        round_trip("cmd 2> err.log");
        round_trip("cat <<< here-string");
    }

    #[test]
    fn round_trips_heredocs() {
        round_trip("cat <<EOF\nline one\nline two\nEOF\n");
        round_trip("cat <<'EOF'\nliteral $x\nEOF\n");
        round_trip("cat <<END\nwith $var and $(cmd)\nEND\n");
    }

    #[test]
    fn round_trips_compounds() {
        round_trip("if true; then echo yes; fi");
        round_trip("if a; then b; elif c; then d; else e; fi");
        round_trip("while read line; do echo $line; done");
        round_trip("until test -f /done; do sleep 1; done");
        round_trip("for i in 1 2 3; do echo $i; done");
        round_trip("for arg; do echo $arg; done");
        round_trip("case $x in a) echo a ;; b|c) echo bc ;& *) echo rest ;;& esac");
        round_trip("(cd /tmp; ls)");
        round_trip("{ echo a; echo b; }");
        round_trip("greet() { echo hi; }");
        round_trip("((x += 1))");
        round_trip("[[ -f /etc/passwd && $x == y* ]]");
        round_trip("[[ $a =~ ^[0-9]+$ || ! -d /tmp ]]");
    }

    #[test]
    fn round_trips_expansions() {
        round_trip("echo $HOME ${name} ${x:-default} ${y:=set} ${z:+alt} ${w:?missing}");
        round_trip("echo ${#arr[@]} ${arr[1]} ${arr[@]}");
        round_trip("echo ${path#*/} ${path##*/} ${path%/*} ${path%%/*}");
        round_trip("echo ${v/foo/bar} ${v//foo/bar} ${v/#foo/bar} ${v/%foo/bar}");
        round_trip("echo ${s^} ${s^^} ${s,} ${s,,}");
        round_trip("echo ${!ref} ${!prefix*} ${!arr[@]}");
        round_trip("echo ${s:2:3} ${s: -2}");
        round_trip("echo $(ls | wc -l) `date`");
        round_trip("echo $((1 + 2 * 3))");
        round_trip("echo {a,b,c} {1..5} {a..e} file{1..3}.txt");
        round_trip("echo ~/notes ~alice/www");
        round_trip("ls *.txt f?.log [abc]*");
        round_trip("diff <(sort a) <(sort b)");
    }

    #[test]
    fn round_trips_escapes() {
        round_trip("echo a\\ b");
        round_trip("echo \\*");
        round_trip("echo 'it'\\''s'");
        round_trip("echo \"quote \\\" inside\"");
    }

    #[test]
    fn serializer_is_idempotent_at_ast_level() {
        let input = "for i in 1 2 3; do echo $i | wc -c; done > /tmp/out 2>&1";
        let first = Parser::new(input).parse().unwrap();
        let text1 = serialize(&first);
        let second = Parser::new(&text1).parse().unwrap();
        let text2 = serialize(&second);
        assert_eq!(text1, text2);
    }

    #[test]
    fn quote_word_survives_reparse() {
        for case in ["plain", "with space", "it's", "a\"b", "", "mix 'of\" all"] {
            let quoted = quote_word(case);
            let script = Parser::new(&format!("echo {quoted}")).parse().unwrap();
            match &script.statements[0].pipelines[0].commands[0].kind {
                CommandKind::Simple(simple) => {
                    assert_eq!(
                        simple.words[1].as_static().as_deref(),
                        Some(case),
                        "quoting {case:?} as {quoted:?}"
                    );
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }
}

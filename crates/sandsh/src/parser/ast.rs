//! AST types for parsed scripts.
//!
//! Nodes are immutable once built and structurally comparable; the
//! serializer relies on `PartialEq` to state its round-trip invariant.

use std::fmt;

/// A complete script: statements separated by `;`, `&`, or newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

/// Pipelines joined by `&&`/`||`, optionally backgrounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub pipelines: Vec<Pipeline>,
    /// Operator between pipeline `i` and `i+1`; length is `pipelines.len() - 1`.
    pub operators: Vec<ListOperator>,
    pub background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperator {
    And,
    Or,
}

/// Commands connected by `|` or `|&`, optionally negated with `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub negated: bool,
    pub commands: Vec<Command>,
    /// Whether the pipe after command `i` also carries stderr (`|&`);
    /// length is `commands.len() - 1`.
    pub pipe_stderr: Vec<bool>,
}

/// Any command form plus its redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Simple(SimpleCommand),
    If(IfCommand),
    For(ForCommand),
    /// `while` / `until` loop.
    Loop(LoopCommand),
    Case(CaseCommand),
    /// `( body )`: body runs on a state snapshot.
    Subshell(Script),
    /// `{ body; }`: body runs in the current scope.
    Group(Script),
    FunctionDef(FunctionDef),
    /// `(( expr ))`: raw expression text, parsed at evaluation time.
    Arithmetic(String),
    /// `[[ expr ]]`
    Conditional(CondExpr),
}

/// Assignments, then command words. `words` is empty for a pure-assignment
/// command, otherwise `words[0]` is the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub assignments: Vec<Assignment>,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    /// Subscript text for `arr[idx]=`.
    pub index: Option<String>,
    pub append: bool,
    pub value: AssignValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignValue {
    Scalar(Word),
    Array(Vec<Word>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfCommand {
    pub cond: Script,
    pub then_body: Script,
    pub elifs: Vec<(Script, Script)>,
    pub else_body: Option<Script>,
}

/// `for var in words; do body; done`. `words: None` iterates the
/// positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForCommand {
    pub var: String,
    pub words: Option<Vec<Word>>,
    pub body: Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopCommand {
    pub until: bool,
    pub cond: Script,
    pub body: Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseCommand {
    pub word: Word,
    pub items: Vec<CaseItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: Script,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// `;;`: stop matching.
    Break,
    /// `;&`: run the next body without re-matching.
    FallThrough,
    /// `;;&`: keep testing subsequent patterns.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Box<Command>,
}

/// `[[ ... ]]` expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondExpr {
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
    Not(Box<CondExpr>),
    Group(Box<CondExpr>),
    Unary { op: String, operand: Word },
    Binary { op: String, lhs: Word, rhs: Word },
    /// Bare word: true when non-empty after expansion.
    Bare(Word),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Explicit source fd (`2>`); defaults to 0 for input ops, 1 for output.
    pub fd: Option<u32>,
    pub op: RedirectOp,
    pub target: RedirTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `<`
    In,
    /// `>`
    Out,
    /// `>|`: ignore `noclobber`.
    OutClobber,
    /// `>>`
    Append,
    /// `<>`
    ReadWrite,
    /// `<&`
    DupIn,
    /// `>&`
    DupOut,
    /// `&>`
    OutErr,
    /// `&>>`
    AppendErr,
    /// `<<` / `<<-` (tab stripping happens at lex time).
    HereDoc,
    /// `<<<`
    HereString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirTarget {
    Word(Word),
    Fd(u32),
    HereDoc {
        /// Body parts; expansions present only when the delimiter was unquoted.
        body: Word,
        /// Whether the delimiter was quoted (body stays literal).
        quoted: bool,
    },
}

/// A word: an ordered run of parts concatenated after expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    /// Unquoted literal run (escape processing already applied).
    Literal(String),
    SingleQuoted(String),
    DoubleQuoted(Vec<WordPart>),
    Parameter(ParamExpansion),
    CommandSub(Script),
    /// `$(( expr ))`: raw expression text.
    ArithSub(String),
    Brace(BraceExpr),
    /// `~` or `~user`, only meaningful at the start of a word.
    Tilde(Option<String>),
    /// Unquoted glob metacharacters: `*`, `?`, or a whole `[...]` class.
    Glob(String),
    ProcessSub {
        /// `>(...)` when true, `<(...)` when false.
        output: bool,
        body: Script,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamExpansion {
    pub name: String,
    /// Raw subscript text for `${arr[...]}`.
    pub index: Option<String>,
    pub op: Option<Box<ParamOp>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamOp {
    /// `:-` / `-`
    Default { word: Word, colon: bool },
    /// `:=` / `=`
    Assign { word: Word, colon: bool },
    /// `:+` / `+`
    Alternative { word: Word, colon: bool },
    /// `:?` / `?`
    ErrorIfUnset { word: Word, colon: bool },
    /// `${#var}`
    Length,
    /// `${var:off}` / `${var:off:len}`, with arithmetic offset texts.
    Substring { offset: String, length: Option<String> },
    /// `${var#pat}` / `${var##pat}`
    RemovePrefix { pattern: Word, longest: bool },
    /// `${var%pat}` / `${var%%pat}`
    RemoveSuffix { pattern: Word, longest: bool },
    /// `${var/pat/rep}` family; `prefix`/`suffix` anchor via `/#` and `/%`.
    Replace {
        pattern: Word,
        replacement: Option<Word>,
        all: bool,
        prefix: bool,
        suffix: bool,
    },
    /// `^` `^^` `,` `,,`
    CaseConvert { upper: bool, all: bool },
    /// `${!var}`
    Indirect,
    /// `${!prefix*}` / `${!prefix@}`
    PrefixNames { keys_form: bool },
    /// `${!arr[@]}` / `${!arr[*]}`
    ArrayKeys,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BraceExpr {
    /// `{a,b,c}`: alternatives, each a word that may itself expand.
    Items(Vec<Word>),
    /// `{1..5}` / `{10..0..2}`
    Range { start: i64, end: i64, step: i64 },
    /// `{a..e}`
    CharRange { start: char, end: char, step: i64 },
}

impl Word {
    pub fn literal(s: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal(s.into())],
        }
    }

    pub fn empty() -> Self {
        Self { parts: Vec::new() }
    }

    /// The word's static text, if it contains no expansions: quoting is
    /// removed, glob characters are kept verbatim. Used for command-name
    /// checks, case/heredoc delimiters, and function names.
    pub fn as_static(&self) -> Option<String> {
        fn flatten(parts: &[WordPart], out: &mut String) -> bool {
            for part in parts {
                match part {
                    WordPart::Literal(s) | WordPart::SingleQuoted(s) | WordPart::Glob(s) => {
                        out.push_str(s)
                    }
                    WordPart::DoubleQuoted(inner) => {
                        if !flatten(inner, out) {
                            return false;
                        }
                    }
                    WordPart::Tilde(user) => {
                        out.push('~');
                        if let Some(u) = user {
                            out.push_str(u);
                        }
                    }
                    _ => return false,
                }
            }
            true
        }
        let mut out = String::new();
        flatten(&self.parts, &mut out).then_some(out)
    }

    /// Whether this word is the bare unquoted literal `expected` (reserved
    /// word check: a quoted `"if"` is not the keyword).
    pub fn is_bare_literal(&self, expected: &str) -> bool {
        matches!(self.parts.as_slice(), [WordPart::Literal(s)] if s == expected)
    }
}

impl fmt::Display for Word {
    /// Serialized form; delegates to the transform-layer serializer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::transform::serialize_word(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_static_flattens_quoting() {
        let word = Word {
            parts: vec![
                WordPart::Literal("a".into()),
                WordPart::SingleQuoted("b c".into()),
                WordPart::DoubleQuoted(vec![WordPart::Literal("d".into())]),
            ],
        };
        assert_eq!(word.as_static().as_deref(), Some("ab cd"));
    }

    #[test]
    fn as_static_rejects_expansions() {
        let word = Word {
            parts: vec![WordPart::Parameter(ParamExpansion {
                name: "HOME".into(),
                index: None,
                op: None,
            })],
        };
        assert_eq!(word.as_static(), None);
    }

    #[test]
    fn bare_literal_requires_unquoted() {
        assert!(Word::literal("if").is_bare_literal("if"));
        let quoted = Word {
            parts: vec![WordPart::SingleQuoted("if".into())],
        };
        assert!(!quoted.is_bare_literal("if"));
    }
}

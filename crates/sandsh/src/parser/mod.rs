//! Recursive-descent parser.
//!
//! Grammar, left to right:
//!
//! ```text
//! script    : statement ((';' | '&' | '\n') statement)*
//! statement : pipeline (('&&' | '||') pipeline)*
//! pipeline  : '!'? command (('|' | '|&') command)*
//! command   : simple | if | while | until | for | case | subshell
//!           | group | funcdef | '((' expr '))' | '[[' cond ']]'
//! ```
//!
//! Syntax errors abort the parse with a line/column diagnostic; there are
//! no partial ASTs.

pub mod arith;
pub mod ast;
mod lexer;
mod tokens;

pub use arith::{parse_arith, ArithExpr, BinOp, UnaryOp};
pub use ast::*;
pub use lexer::Lexer;
pub use tokens::{Token, TokenKind};

use crate::error::{Error, Result};

/// Internal syntax error with position; lowered to [`Error::Syntax`] at the
/// public boundary.
#[derive(Debug, Clone)]
pub(crate) struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

pub(crate) type SynResult<T> = std::result::Result<T, SyntaxError>;

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax {
            line: e.line,
            column: e.column,
            message: e.message,
        }
    }
}

/// Words that terminate or structure compound commands and therefore can
/// never begin a command.
const RESERVED_ONLY: &[&str] = &["then", "elif", "else", "fi", "do", "done", "esac", "in"];

const COND_UNARY_OPS: &[&str] = &[
    "-a", "-b", "-c", "-d", "-e", "-f", "-g", "-h", "-k", "-p", "-r", "-s", "-t", "-u", "-w",
    "-x", "-G", "-L", "-N", "-O", "-S", "-z", "-n", "-o", "-v",
];

const COND_BINARY_OPS: &[&str] = &[
    "==", "=", "!=", "=~", "<", ">", "-eq", "-ne", "-lt", "-le", "-gt", "-ge", "-nt", "-ot",
    "-ef",
];

pub struct Parser {
    lexer: Lexer,
    current: Option<Token>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            lexer: Lexer::new(input),
            current: None,
        }
    }

    /// Parse the input and return the AST.
    pub fn parse(mut self) -> Result<Script> {
        let script = self.parse_toplevel()?;
        Ok(script)
    }

    /// Parse for internal recursion (command substitution bodies); keeps the
    /// lighter error type.
    pub(crate) fn parse_inner(mut self) -> SynResult<Script> {
        self.parse_toplevel()
    }

    fn parse_toplevel(&mut self) -> SynResult<Script> {
        self.advance()?;
        let script = self.parse_script(&[])?;
        if let Some(tok) = &self.current {
            return Err(SyntaxError {
                line: tok.line,
                column: tok.column,
                message: format!("unexpected token {}", tok.kind.describe()),
            });
        }
        Ok(script)
    }

    fn advance(&mut self) -> SynResult<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let (line, column) = self
            .current
            .as_ref()
            .map(|t| (t.line, t.column))
            .unwrap_or((0, 0));
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    fn kind(&self) -> Option<&TokenKind> {
        self.current.as_ref().map(|t| &t.kind)
    }

    fn at_word(&self, expected: &str) -> bool {
        matches!(self.kind(), Some(TokenKind::Word(w)) if w.is_bare_literal(expected))
    }

    fn skip_newlines(&mut self) -> SynResult<()> {
        while matches!(self.kind(), Some(TokenKind::Newline)) {
            self.advance()?;
        }
        Ok(())
    }

    fn expect_word(&mut self, expected: &str) -> SynResult<()> {
        if self.at_word(expected) {
            self.advance()
        } else {
            Err(self.error_here(format!(
                "expected `{expected}`, found {}",
                self.kind().map(|k| k.describe()).unwrap_or_else(|| "end of input".into())
            )))
        }
    }

    /// Whether the current token ends a script body given the reserved-word
    /// stops of the enclosing construct.
    fn at_script_end(&self, stops: &[&str]) -> bool {
        match self.kind() {
            None => true,
            Some(TokenKind::RParen)
            | Some(TokenKind::RBrace)
            | Some(TokenKind::SemiSemi)
            | Some(TokenKind::SemiAmp)
            | Some(TokenKind::SemiSemiAmp) => true,
            Some(TokenKind::Word(w)) => stops.iter().any(|s| w.is_bare_literal(s)),
            _ => false,
        }
    }

    fn parse_script(&mut self, stops: &[&str]) -> SynResult<Script> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.at_script_end(stops) {
                break;
            }
            let mut statement = self.parse_statement()?;
            match self.kind() {
                Some(TokenKind::Semi) => {
                    self.advance()?;
                }
                Some(TokenKind::Amp) => {
                    statement.background = true;
                    self.advance()?;
                }
                Some(TokenKind::Newline) | None => {}
                _ if self.at_script_end(stops) => {}
                Some(other) => {
                    return Err(self.error_here(format!("unexpected token {}", other.describe())));
                }
            }
            statements.push(statement);
        }
        Ok(Script { statements })
    }

    fn parse_statement(&mut self) -> SynResult<Statement> {
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();
        loop {
            let op = match self.kind() {
                Some(TokenKind::AndAnd) => ListOperator::And,
                Some(TokenKind::OrOr) => ListOperator::Or,
                _ => break,
            };
            self.advance()?;
            self.skip_newlines()?;
            operators.push(op);
            pipelines.push(self.parse_pipeline()?);
        }
        Ok(Statement {
            pipelines,
            operators,
            background: false,
        })
    }

    fn parse_pipeline(&mut self) -> SynResult<Pipeline> {
        let mut negated = false;
        while matches!(self.kind(), Some(TokenKind::Bang)) {
            negated = !negated;
            self.advance()?;
        }
        let mut commands = vec![self.parse_command()?];
        let mut pipe_stderr = Vec::new();
        loop {
            let with_stderr = match self.kind() {
                Some(TokenKind::Pipe) => false,
                Some(TokenKind::PipeAmp) => true,
                _ => break,
            };
            self.advance()?;
            self.skip_newlines()?;
            pipe_stderr.push(with_stderr);
            commands.push(self.parse_command()?);
        }
        Ok(Pipeline {
            negated,
            commands,
            pipe_stderr,
        })
    }

    fn parse_command(&mut self) -> SynResult<Command> {
        let (kind, mut redirects) = match self.kind() {
            Some(TokenKind::Word(w)) => {
                if let Some(text) = w.as_static() {
                    if w.is_bare_literal(&text) && RESERVED_ONLY.contains(&text.as_str()) {
                        return Err(
                            self.error_here(format!("unexpected reserved word `{text}`"))
                        );
                    }
                }
                if w.is_bare_literal("if") {
                    (self.parse_if()?, Vec::new())
                } else if w.is_bare_literal("while") {
                    (self.parse_loop(false)?, Vec::new())
                } else if w.is_bare_literal("until") {
                    (self.parse_loop(true)?, Vec::new())
                } else if w.is_bare_literal("for") {
                    (self.parse_for()?, Vec::new())
                } else if w.is_bare_literal("case") {
                    (self.parse_case()?, Vec::new())
                } else if w.is_bare_literal("function") {
                    (self.parse_function_keyword()?, Vec::new())
                } else {
                    self.parse_simple_command()?
                }
            }
            Some(TokenKind::LParen) => {
                self.advance()?;
                let body = self.parse_script(&[])?;
                if !matches!(self.kind(), Some(TokenKind::RParen)) {
                    return Err(self.error_here("expected `)`"));
                }
                self.advance()?;
                (CommandKind::Subshell(body), Vec::new())
            }
            Some(TokenKind::LBrace) => {
                self.advance()?;
                let body = self.parse_script(&[])?;
                if !matches!(self.kind(), Some(TokenKind::RBrace)) {
                    return Err(self.error_here("expected `}`"));
                }
                self.advance()?;
                (CommandKind::Group(body), Vec::new())
            }
            Some(TokenKind::ArithCommand(expr)) => {
                let expr = expr.clone();
                self.advance()?;
                (CommandKind::Arithmetic(expr), Vec::new())
            }
            Some(TokenKind::DoubleLBracket) => (self.parse_conditional()?, Vec::new()),
            Some(TokenKind::Redirect { .. }) | Some(TokenKind::HereDocOp { .. }) => {
                self.parse_simple_command()?
            }
            Some(other) => {
                return Err(self.error_here(format!("unexpected token {}", other.describe())));
            }
            None => return Err(self.error_here("unexpected end of input")),
        };

        // Trailing redirections apply to compound commands too.
        while matches!(
            self.kind(),
            Some(TokenKind::Redirect { .. }) | Some(TokenKind::HereDocOp { .. })
        ) {
            redirects.push(self.parse_redirect()?);
        }
        Ok(Command { kind, redirects })
    }

    fn parse_simple_command(&mut self) -> SynResult<(CommandKind, Vec<Redirect>)> {
        let mut assignments: Vec<Assignment> = Vec::new();
        let mut words: Vec<Word> = Vec::new();
        let mut redirects: Vec<Redirect> = Vec::new();

        loop {
            match self.kind() {
                Some(TokenKind::Word(w)) => {
                    let word = w.clone();
                    if words.is_empty() {
                        if let Some(assignment) = split_assignment(&word) {
                            self.advance()?;
                            let assignment = self.finish_assignment(assignment)?;
                            assignments.push(assignment);
                            continue;
                        }
                    }
                    self.advance()?;
                    // `name ()` introduces a function definition.
                    if words.is_empty()
                        && assignments.is_empty()
                        && redirects.is_empty()
                        && matches!(self.kind(), Some(TokenKind::LParen))
                    {
                        if let Some(name) = word.as_static() {
                            if is_name(&name) {
                                return Ok((self.parse_function_body(name)?, Vec::new()));
                            }
                        }
                    }
                    words.push(word);
                }
                Some(TokenKind::Redirect { .. }) | Some(TokenKind::HereDocOp { .. }) => {
                    redirects.push(self.parse_redirect()?);
                }
                // `{`, `}`, and `!` are only special in command position;
                // as arguments they are ordinary words.
                Some(TokenKind::LBrace) if !words.is_empty() => {
                    words.push(Word::literal("{"));
                    self.advance()?;
                }
                Some(TokenKind::RBrace) if !words.is_empty() => {
                    words.push(Word::literal("}"));
                    self.advance()?;
                }
                Some(TokenKind::Bang) if !words.is_empty() => {
                    words.push(Word::literal("!"));
                    self.advance()?;
                }
                _ => break,
            }
        }

        if assignments.is_empty() && words.is_empty() && redirects.is_empty() {
            return Err(self.error_here("expected a command"));
        }

        Ok((
            CommandKind::Simple(SimpleCommand {
                assignments,
                words,
            }),
            redirects,
        ))
    }

    fn finish_assignment(&mut self, mut assignment: Assignment) -> SynResult<Assignment> {
        // `name=(...)`: array literal directly after the `=`.
        let scalar_is_empty = matches!(
            &assignment.value,
            AssignValue::Scalar(w) if w.parts.is_empty()
        );
        if scalar_is_empty && matches!(self.kind(), Some(TokenKind::LParen)) {
            self.advance()?;
            let mut elements = Vec::new();
            loop {
                self.skip_newlines()?;
                match self.kind() {
                    Some(TokenKind::RParen) => {
                        self.advance()?;
                        break;
                    }
                    Some(TokenKind::Word(w)) => {
                        elements.push(w.clone());
                        self.advance()?;
                    }
                    _ => return Err(self.error_here("expected `)` to close array literal")),
                }
            }
            assignment.value = AssignValue::Array(elements);
        }
        Ok(assignment)
    }

    fn parse_redirect(&mut self) -> SynResult<Redirect> {
        match self.kind().cloned() {
            Some(TokenKind::Redirect { fd, op }) => {
                self.advance()?;
                let word = match self.kind() {
                    Some(TokenKind::Word(w)) => {
                        let w = w.clone();
                        self.advance()?;
                        w
                    }
                    _ => return Err(self.error_here("expected redirection target")),
                };
                let target = match op {
                    RedirectOp::DupIn | RedirectOp::DupOut => match word.as_static() {
                        Some(text) if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() => {
                            RedirTarget::Fd(text.parse().map_err(|_| {
                                self.error_here("bad file descriptor")
                            })?)
                        }
                        _ => RedirTarget::Word(word),
                    },
                    RedirectOp::HereString => RedirTarget::Word(word),
                    _ => RedirTarget::Word(word),
                };
                Ok(Redirect { fd, op, target })
            }
            Some(TokenKind::HereDocOp { fd, strip_tabs }) => {
                self.advance()?;
                let delim_word = match self.kind() {
                    Some(TokenKind::Word(w)) => w.clone(),
                    _ => return Err(self.error_here("expected heredoc delimiter")),
                };
                let quoted = delim_word
                    .parts
                    .iter()
                    .any(|p| matches!(p, WordPart::SingleQuoted(_) | WordPart::DoubleQuoted(_)));
                let delimiter = delim_word
                    .as_static()
                    .ok_or_else(|| self.error_here("bad heredoc delimiter"))?;
                // Capture the body while the lexer still sits just past the
                // delimiter; advancing first could swallow the newline that
                // marks where the body starts.
                let body_text = self.lexer.read_heredoc(&delimiter, strip_tabs);
                self.advance()?;
                let body = if body_text.is_empty() {
                    Word::empty()
                } else if quoted {
                    Word {
                        parts: vec![WordPart::Literal(body_text)],
                    }
                } else {
                    Word {
                        parts: Lexer::expandable_text_parts(&body_text)?,
                    }
                };
                Ok(Redirect {
                    fd,
                    op: RedirectOp::HereDoc,
                    target: RedirTarget::HereDoc { body, quoted },
                })
            }
            _ => Err(self.error_here("expected redirection")),
        }
    }

    fn parse_if(&mut self) -> SynResult<CommandKind> {
        self.advance()?; // if
        let cond = self.parse_script(&["then"])?;
        self.expect_word("then")?;
        let then_body = self.parse_script(&["elif", "else", "fi"])?;
        let mut elifs = Vec::new();
        let mut else_body = None;
        loop {
            if self.at_word("elif") {
                self.advance()?;
                let elif_cond = self.parse_script(&["then"])?;
                self.expect_word("then")?;
                let elif_body = self.parse_script(&["elif", "else", "fi"])?;
                elifs.push((elif_cond, elif_body));
            } else if self.at_word("else") {
                self.advance()?;
                else_body = Some(self.parse_script(&["fi"])?);
            } else {
                break;
            }
        }
        self.expect_word("fi")?;
        Ok(CommandKind::If(IfCommand {
            cond,
            then_body,
            elifs,
            else_body,
        }))
    }

    fn parse_loop(&mut self, until: bool) -> SynResult<CommandKind> {
        self.advance()?; // while / until
        let cond = self.parse_script(&["do"])?;
        self.expect_word("do")?;
        let body = self.parse_script(&["done"])?;
        self.expect_word("done")?;
        Ok(CommandKind::Loop(LoopCommand { until, cond, body }))
    }

    fn parse_for(&mut self) -> SynResult<CommandKind> {
        self.advance()?; // for
        let var = match self.kind() {
            Some(TokenKind::Word(w)) => match w.as_static() {
                Some(name) if is_name(&name) => {
                    self.advance()?;
                    name
                }
                _ => return Err(self.error_here("expected variable name after `for`")),
            },
            _ => return Err(self.error_here("expected variable name after `for`")),
        };

        let mut word_list = None;
        if self.at_word("in") {
            self.advance()?;
            let mut list = Vec::new();
            loop {
                match self.kind() {
                    Some(TokenKind::Word(w)) => {
                        list.push(w.clone());
                        self.advance()?;
                    }
                    _ => break,
                }
            }
            word_list = Some(list);
        }
        // Separator before `do`.
        while matches!(self.kind(), Some(TokenKind::Semi) | Some(TokenKind::Newline)) {
            self.advance()?;
        }
        self.expect_word("do")?;
        let body = self.parse_script(&["done"])?;
        self.expect_word("done")?;
        Ok(CommandKind::For(ForCommand {
            var,
            words: word_list,
            body,
        }))
    }

    fn parse_case(&mut self) -> SynResult<CommandKind> {
        self.advance()?; // case
        let word = match self.kind() {
            Some(TokenKind::Word(w)) => {
                let w = w.clone();
                self.advance()?;
                w
            }
            _ => return Err(self.error_here("expected word after `case`")),
        };
        self.skip_newlines()?;
        self.expect_word("in")?;
        self.skip_newlines()?;

        let mut items = Vec::new();
        loop {
            self.skip_newlines()?;
            if self.at_word("esac") {
                break;
            }
            if matches!(self.kind(), Some(TokenKind::LParen)) {
                self.advance()?;
            }
            let mut patterns = Vec::new();
            loop {
                match self.kind() {
                    Some(TokenKind::Word(w)) => {
                        patterns.push(w.clone());
                        self.advance()?;
                    }
                    _ => return Err(self.error_here("expected case pattern")),
                }
                if matches!(self.kind(), Some(TokenKind::Pipe)) {
                    self.advance()?;
                } else {
                    break;
                }
            }
            if !matches!(self.kind(), Some(TokenKind::RParen)) {
                return Err(self.error_here("expected `)` after case pattern"));
            }
            self.advance()?;

            let body = self.parse_script(&["esac"])?;
            let terminator = match self.kind() {
                Some(TokenKind::SemiSemi) => {
                    self.advance()?;
                    CaseTerminator::Break
                }
                Some(TokenKind::SemiAmp) => {
                    self.advance()?;
                    CaseTerminator::FallThrough
                }
                Some(TokenKind::SemiSemiAmp) => {
                    self.advance()?;
                    CaseTerminator::Continue
                }
                _ => CaseTerminator::Break,
            };
            items.push(CaseItem {
                patterns,
                body,
                terminator,
            });
        }
        self.expect_word("esac")?;
        Ok(CommandKind::Case(CaseCommand { word, items }))
    }

    fn parse_function_keyword(&mut self) -> SynResult<CommandKind> {
        self.advance()?; // function
        let name = match self.kind() {
            Some(TokenKind::Word(w)) => match w.as_static() {
                Some(name) if is_name(&name) => {
                    self.advance()?;
                    name
                }
                _ => return Err(self.error_here("expected function name")),
            },
            _ => return Err(self.error_here("expected function name")),
        };
        if matches!(self.kind(), Some(TokenKind::LParen)) {
            return self.parse_function_body(name);
        }
        self.skip_newlines()?;
        let body = self.parse_command()?;
        Ok(CommandKind::FunctionDef(FunctionDef {
            name,
            body: Box::new(body),
        }))
    }

    /// Shared tail of `name ()` and `function name ()`: the cursor sits on
    /// `(`.
    fn parse_function_body(&mut self, name: String) -> SynResult<CommandKind> {
        self.advance()?; // (
        if !matches!(self.kind(), Some(TokenKind::RParen)) {
            return Err(self.error_here("expected `)` in function definition"));
        }
        self.advance()?;
        self.skip_newlines()?;
        let body = self.parse_command()?;
        Ok(CommandKind::FunctionDef(FunctionDef {
            name,
            body: Box::new(body),
        }))
    }

    fn parse_conditional(&mut self) -> SynResult<CommandKind> {
        // Switch lexing before pulling the first inner token.
        self.lexer.set_cond_mode(true);
        self.advance()?; // [[
        let expr = self.parse_cond_or()?;
        if !matches!(self.kind(), Some(TokenKind::DoubleRBracket)) {
            self.lexer.set_cond_mode(false);
            return Err(self.error_here("expected `]]`"));
        }
        self.lexer.set_cond_mode(false);
        self.advance()?;
        Ok(CommandKind::Conditional(expr))
    }

    fn parse_cond_or(&mut self) -> SynResult<CondExpr> {
        let mut lhs = self.parse_cond_and()?;
        loop {
            self.skip_newlines()?;
            if !matches!(self.kind(), Some(TokenKind::OrOr)) {
                break;
            }
            self.advance()?;
            self.skip_newlines()?;
            let rhs = self.parse_cond_and()?;
            lhs = CondExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cond_and(&mut self) -> SynResult<CondExpr> {
        let mut lhs = self.parse_cond_unary()?;
        loop {
            self.skip_newlines()?;
            if !matches!(self.kind(), Some(TokenKind::AndAnd)) {
                break;
            }
            self.advance()?;
            self.skip_newlines()?;
            let rhs = self.parse_cond_unary()?;
            lhs = CondExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cond_unary(&mut self) -> SynResult<CondExpr> {
        self.skip_newlines()?;
        match self.kind() {
            Some(TokenKind::Bang) => {
                self.advance()?;
                Ok(CondExpr::Not(Box::new(self.parse_cond_unary()?)))
            }
            Some(TokenKind::LParen) => {
                self.advance()?;
                let inner = self.parse_cond_or()?;
                self.skip_newlines()?;
                if !matches!(self.kind(), Some(TokenKind::RParen)) {
                    return Err(self.error_here("expected `)` in conditional expression"));
                }
                self.advance()?;
                Ok(CondExpr::Group(Box::new(inner)))
            }
            Some(TokenKind::Word(w)) => {
                let first = w.clone();
                // Unary operator word?
                if let Some(text) = first.as_static() {
                    if first.is_bare_literal(&text) && COND_UNARY_OPS.contains(&text.as_str()) {
                        self.advance()?;
                        let operand = match self.kind() {
                            Some(TokenKind::Word(w)) => {
                                let w = w.clone();
                                self.advance()?;
                                w
                            }
                            _ => return Err(self.error_here("expected operand in conditional")),
                        };
                        return Ok(CondExpr::Unary { op: text, operand });
                    }
                }
                self.advance()?;
                // Binary operator?
                if let Some(TokenKind::Word(op_word)) = self.kind() {
                    if let Some(op_text) = op_word.as_static() {
                        if op_word.is_bare_literal(&op_text)
                            && COND_BINARY_OPS.contains(&op_text.as_str())
                        {
                            self.advance()?;
                            let rhs = match self.kind() {
                                Some(TokenKind::Word(w)) => {
                                    let w = w.clone();
                                    self.advance()?;
                                    w
                                }
                                _ => {
                                    return Err(
                                        self.error_here("expected operand in conditional")
                                    )
                                }
                            };
                            return Ok(CondExpr::Binary {
                                op: op_text,
                                lhs: first,
                                rhs,
                            });
                        }
                    }
                }
                Ok(CondExpr::Bare(first))
            }
            _ => Err(self.error_here("expected conditional expression")),
        }
    }
}

/// `name=`, `name+=`, `name[idx]=` prefixes make a word an assignment.
/// Returns the assignment with the value word split out.
fn split_assignment(word: &Word) -> Option<Assignment> {
    let first = match word.parts.first() {
        Some(WordPart::Literal(text)) => text,
        _ => return None,
    };
    let eq = first.find('=')?;
    let (lhs, mut rest) = first.split_at(eq);
    rest = &rest[1..];

    let (lhs, append) = match lhs.strip_suffix('+') {
        Some(stripped) => (stripped, true),
        None => (lhs, false),
    };

    let (name, index) = match lhs.find('[') {
        Some(open) => {
            let close = lhs.rfind(']')?;
            if close != lhs.len() - 1 || close <= open {
                return None;
            }
            (&lhs[..open], Some(lhs[open + 1..close].to_string()))
        }
        None => (lhs, None),
    };
    if !is_name(name) {
        return None;
    }

    let mut value_parts = Vec::new();
    if !rest.is_empty() {
        value_parts.push(WordPart::Literal(rest.to_string()));
    }
    value_parts.extend(word.parts.iter().skip(1).cloned());

    Some(Assignment {
        name: name.to_string(),
        index,
        append,
        value: AssignValue::Scalar(Word { parts: value_parts }),
    })
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Script {
        Parser::new(input).parse().unwrap()
    }

    fn first_command(script: &Script) -> &Command {
        &script.statements[0].pipelines[0].commands[0]
    }

    #[test]
    fn simple_command_with_args() {
        let script = parse_ok("echo hello world");
        let cmd = first_command(&script);
        match &cmd.kind {
            CommandKind::Simple(simple) => {
                assert_eq!(simple.words.len(), 3);
                assert_eq!(simple.words[0].as_static().as_deref(), Some("echo"));
            }
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn pipeline_with_stderr_pipe() {
        let script = parse_ok("ls /x |& cat | wc -l");
        let pipeline = &script.statements[0].pipelines[0];
        assert_eq!(pipeline.commands.len(), 3);
        assert_eq!(pipeline.pipe_stderr, vec![true, false]);
    }

    #[test]
    fn negated_pipeline() {
        let script = parse_ok("! grep -q x f");
        assert!(script.statements[0].pipelines[0].negated);
    }

    #[test]
    fn and_or_chains() {
        let script = parse_ok("true && echo yes || echo no");
        let statement = &script.statements[0];
        assert_eq!(statement.pipelines.len(), 3);
        assert_eq!(statement.operators, vec![ListOperator::And, ListOperator::Or]);
    }

    #[test]
    fn background_statement() {
        let script = parse_ok("sleep 1 &\necho done");
        assert!(script.statements[0].background);
        assert!(!script.statements[1].background);
    }

    #[test]
    fn assignments_before_command() {
        let script = parse_ok("FOO=bar BAZ=qux env");
        match &first_command(&script).kind {
            CommandKind::Simple(simple) => {
                assert_eq!(simple.assignments.len(), 2);
                assert_eq!(simple.assignments[0].name, "FOO");
                assert_eq!(simple.words.len(), 1);
            }
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn assignment_only_command() {
        let script = parse_ok("X=1");
        match &first_command(&script).kind {
            CommandKind::Simple(simple) => {
                assert_eq!(simple.assignments.len(), 1);
                assert!(simple.words.is_empty());
            }
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn array_assignment() {
        let script = parse_ok("arr=(a b c)");
        match &first_command(&script).kind {
            CommandKind::Simple(simple) => match &simple.assignments[0].value {
                AssignValue::Array(items) => assert_eq!(items.len(), 3),
                other => panic!("expected array, got {other:?}"),
            },
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn subscript_assignment() {
        let script = parse_ok("m[a]=1");
        match &first_command(&script).kind {
            CommandKind::Simple(simple) => {
                assert_eq!(simple.assignments[0].name, "m");
                assert_eq!(simple.assignments[0].index.as_deref(), Some("a"));
            }
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn append_assignment() {
        let script = parse_ok("PATH+=:/usr/local/bin");
        match &first_command(&script).kind {
            CommandKind::Simple(simple) => assert!(simple.assignments[0].append),
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn redirects_on_simple_command() {
        let script = parse_ok("echo hi > /tmp/out 2>&1");
        let cmd = first_command(&script);
        assert_eq!(cmd.redirects.len(), 2);
        assert!(matches!(
            cmd.redirects[1],
            Redirect { fd: Some(2), op: RedirectOp::DupOut, target: RedirTarget::Fd(1) }
        ));
    }

    #[test]
    fn redirect_on_compound() {
        let script = parse_ok("{ echo a; echo b; } > /tmp/out");
        let cmd = first_command(&script);
        assert!(matches!(cmd.kind, CommandKind::Group(_)));
        assert_eq!(cmd.redirects.len(), 1);
    }

    #[test]
    fn if_elif_else() {
        let script = parse_ok("if a; then b; elif c; then d; else e; fi");
        match &first_command(&script).kind {
            CommandKind::If(cmd) => {
                assert_eq!(cmd.elifs.len(), 1);
                assert!(cmd.else_body.is_some());
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn while_and_until() {
        let script = parse_ok("while a; do b; done\nuntil c; do d; done");
        assert!(matches!(
            &first_command(&script).kind,
            CommandKind::Loop(LoopCommand { until: false, .. })
        ));
        assert!(matches!(
            &script.statements[1].pipelines[0].commands[0].kind,
            CommandKind::Loop(LoopCommand { until: true, .. })
        ));
    }

    #[test]
    fn for_with_words() {
        let script = parse_ok("for i in 1 2 3; do echo $i; done");
        match &first_command(&script).kind {
            CommandKind::For(cmd) => {
                assert_eq!(cmd.var, "i");
                assert_eq!(cmd.words.as_ref().unwrap().len(), 3);
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn for_without_words_uses_positionals() {
        let script = parse_ok("for arg; do echo $arg; done");
        match &first_command(&script).kind {
            CommandKind::For(cmd) => assert!(cmd.words.is_none()),
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn case_with_terminators() {
        let script = parse_ok("case $x in a) echo a ;; b|c) echo bc ;& d) echo d ;;& *) echo any ;; esac");
        match &first_command(&script).kind {
            CommandKind::Case(cmd) => {
                assert_eq!(cmd.items.len(), 4);
                assert_eq!(cmd.items[0].terminator, CaseTerminator::Break);
                assert_eq!(cmd.items[1].patterns.len(), 2);
                assert_eq!(cmd.items[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(cmd.items[2].terminator, CaseTerminator::Continue);
            }
            other => panic!("expected case, got {other:?}"),
        }
    }

    #[test]
    fn subshell_and_group() {
        let script = parse_ok("(cd /tmp; ls)");
        assert!(matches!(&first_command(&script).kind, CommandKind::Subshell(_)));
        let script = parse_ok("{ cd /tmp; ls; }");
        assert!(matches!(&first_command(&script).kind, CommandKind::Group(_)));
    }

    #[test]
    fn function_definitions() {
        let script = parse_ok("greet() { echo hi; }");
        match &first_command(&script).kind {
            CommandKind::FunctionDef(def) => {
                assert_eq!(def.name, "greet");
                assert!(matches!(def.body.kind, CommandKind::Group(_)));
            }
            other => panic!("expected function, got {other:?}"),
        }

        let script = parse_ok("function greet { echo hi; }");
        assert!(matches!(
            &first_command(&script).kind,
            CommandKind::FunctionDef(_)
        ));
    }

    #[test]
    fn arithmetic_command() {
        let script = parse_ok("((x += 1))");
        match &first_command(&script).kind {
            CommandKind::Arithmetic(expr) => assert_eq!(expr, "x += 1"),
            other => panic!("expected arithmetic, got {other:?}"),
        }
    }

    #[test]
    fn conditional_command() {
        let script = parse_ok("[[ -f /etc/passwd && $x == y* ]]");
        match &first_command(&script).kind {
            CommandKind::Conditional(CondExpr::And(lhs, rhs)) => {
                assert!(matches!(**lhs, CondExpr::Unary { .. }));
                assert!(matches!(**rhs, CondExpr::Binary { .. }));
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn conditional_regex_match() {
        let script = parse_ok("[[ $x =~ ^[0-9]+$ ]]");
        match &first_command(&script).kind {
            CommandKind::Conditional(CondExpr::Binary { op, .. }) => assert_eq!(op, "=~"),
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn heredoc_redirect() {
        let script = parse_ok("cat <<EOF\nhello $name\nEOF\n");
        let cmd = first_command(&script);
        match &cmd.redirects[0].target {
            RedirTarget::HereDoc { body, quoted } => {
                assert!(!quoted);
                assert!(body.parts.len() >= 2);
            }
            other => panic!("expected heredoc target, got {other:?}"),
        }
    }

    #[test]
    fn quoted_heredoc_stays_literal() {
        let script = parse_ok("cat <<'EOF'\nhello $name\nEOF\n");
        let cmd = first_command(&script);
        match &cmd.redirects[0].target {
            RedirTarget::HereDoc { body, quoted } => {
                assert!(quoted);
                assert_eq!(body.parts, vec![WordPart::Literal("hello $name\n".into())]);
            }
            other => panic!("expected heredoc target, got {other:?}"),
        }
    }

    #[test]
    fn heredoc_followed_by_pipeline() {
        let script = parse_ok("cat <<EOF | wc -l\none\ntwo\nEOF\n");
        let pipeline = &script.statements[0].pipelines[0];
        assert_eq!(pipeline.commands.len(), 2);
    }

    #[test]
    fn syntax_error_has_position() {
        let err = Parser::new("if true; then echo hi").parse().unwrap_err();
        match err {
            Error::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_reserved_word_is_an_error() {
        assert!(Parser::new("fi").parse().is_err());
        assert!(Parser::new("done").parse().is_err());
    }

    #[test]
    fn empty_script_parses() {
        let script = parse_ok("\n\n# just a comment\n");
        assert!(script.statements.is_empty());
    }

    #[test]
    fn statements_split_on_semicolons_and_newlines() {
        let script = parse_ok("a; b\nc");
        assert_eq!(script.statements.len(), 3);
    }
}

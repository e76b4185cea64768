//! Lexer for shell scripts.
//!
//! Single pass over the source, producing [`Token`]s on demand. Words are
//! fully structured at lex time: quoting, parameter expansions, command and
//! arithmetic substitution, braces, tildes, and glob characters all become
//! [`WordPart`]s here, so the parser only deals in tokens.
//!
//! Heredoc bodies are captured lazily: the parser calls [`Lexer::read_heredoc`]
//! when it meets the operator, and the lexer splices the body lines out of
//! the remaining input so tokenization continues on the rest of the command
//! line.

use super::ast::{BraceExpr, ParamExpansion, ParamOp, RedirectOp, Word, WordPart};
use super::tokens::{Token, TokenKind};
use super::{Parser, SyntaxError, SynResult};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    /// Inside `[[ ... ]]`: `<`/`>` are comparison words, `]]` closes.
    cond_mode: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            cond_mode: false,
        }
    }

    pub fn set_cond_mode(&mut self, on: bool) {
        self.cond_mode = on;
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') => {
                    self.advance();
                }
                // Line continuation.
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Lex the next token. `None` at end of input.
    pub fn next_token(&mut self) -> SynResult<Option<Token>> {
        self.skip_blanks();
        let (line, column) = (self.line, self.column);
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let kind = match ch {
            '\n' => {
                self.advance();
                TokenKind::Newline
            }
            '#' => {
                self.skip_comment();
                return self.next_token();
            }
            ';' => {
                self.advance();
                if self.peek() == Some(';') {
                    self.advance();
                    if self.peek() == Some('&') {
                        self.advance();
                        TokenKind::SemiSemiAmp
                    } else {
                        TokenKind::SemiSemi
                    }
                } else if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::SemiAmp
                } else {
                    TokenKind::Semi
                }
            }
            '|' => {
                self.advance();
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::PipeAmp
                } else {
                    TokenKind::Pipe
                }
            }
            '&' => {
                self.advance();
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AndAnd
                } else if self.peek() == Some('>') {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        TokenKind::Redirect {
                            fd: None,
                            op: RedirectOp::AppendErr,
                        }
                    } else {
                        TokenKind::Redirect {
                            fd: None,
                            op: RedirectOp::OutErr,
                        }
                    }
                } else {
                    TokenKind::Amp
                }
            }
            '(' => {
                if self.peek_at(1) == Some('(') {
                    if let Some(expr) = self.try_lex_arith_command() {
                        TokenKind::ArithCommand(expr)
                    } else {
                        self.advance();
                        TokenKind::LParen
                    }
                } else {
                    self.advance();
                    TokenKind::LParen
                }
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '{' if matches!(self.peek_at(1), Some(' ') | Some('\t') | Some('\n') | None) => {
                self.advance();
                TokenKind::LBrace
            }
            '}' if matches!(
                self.peek_at(1),
                Some(' ') | Some('\t') | Some('\n') | Some(';') | Some(')') | Some('|') | Some('&')
                    | None
            ) =>
            {
                self.advance();
                TokenKind::RBrace
            }
            '[' if !self.cond_mode
                && self.peek_at(1) == Some('[')
                && matches!(self.peek_at(2), Some(' ') | Some('\t') | Some('\n')) =>
            {
                self.advance();
                self.advance();
                TokenKind::DoubleLBracket
            }
            ']' if self.cond_mode
                && self.peek_at(1) == Some(']')
                && !matches!(self.peek_at(2), Some(c) if is_word_char(c)) =>
            {
                self.advance();
                self.advance();
                TokenKind::DoubleRBracket
            }
            '!' if matches!(self.peek_at(1), Some(' ') | Some('\t') | Some('\n') | None) => {
                self.advance();
                TokenKind::Bang
            }
            '<' | '>' if self.cond_mode => {
                self.advance();
                TokenKind::Word(Word::literal(ch.to_string()))
            }
            '<' if self.peek_at(1) != Some('(') => self.lex_redirect(None)?,
            '>' if self.peek_at(1) != Some('(') => self.lex_redirect(None)?,
            '0'..='9' => {
                // Possible fd-prefixed redirect: digits immediately followed
                // by `<` or `>`.
                let mut digits = String::new();
                let mut offset = 0;
                while let Some(c) = self.peek_at(offset) {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        offset += 1;
                    } else {
                        break;
                    }
                }
                if !self.cond_mode
                    && matches!(self.peek_at(offset), Some('<') | Some('>'))
                    && self.peek_at(offset + 1) != Some('(')
                {
                    for _ in 0..offset {
                        self.advance();
                    }
                    let fd: u32 = digits.parse().map_err(|_| self.error("bad file descriptor"))?;
                    self.lex_redirect(Some(fd))?
                } else {
                    TokenKind::Word(self.read_word()?)
                }
            }
            _ => TokenKind::Word(self.read_word()?),
        };

        Ok(Some(Token { kind, line, column }))
    }

    /// Lex a redirect operator starting at `<` or `>`.
    fn lex_redirect(&mut self, fd: Option<u32>) -> SynResult<TokenKind> {
        let ch = self.advance().ok_or_else(|| self.error("unexpected end of input"))?;
        let kind = if ch == '<' {
            match self.peek() {
                Some('<') => {
                    self.advance();
                    match self.peek() {
                        Some('<') => {
                            self.advance();
                            TokenKind::Redirect {
                                fd,
                                op: RedirectOp::HereString,
                            }
                        }
                        Some('-') => {
                            self.advance();
                            TokenKind::HereDocOp {
                                fd,
                                strip_tabs: true,
                            }
                        }
                        _ => TokenKind::HereDocOp {
                            fd,
                            strip_tabs: false,
                        },
                    }
                }
                Some('&') => {
                    self.advance();
                    TokenKind::Redirect {
                        fd,
                        op: RedirectOp::DupIn,
                    }
                }
                Some('>') => {
                    self.advance();
                    TokenKind::Redirect {
                        fd,
                        op: RedirectOp::ReadWrite,
                    }
                }
                _ => TokenKind::Redirect {
                    fd,
                    op: RedirectOp::In,
                },
            }
        } else {
            match self.peek() {
                Some('>') => {
                    self.advance();
                    TokenKind::Redirect {
                        fd,
                        op: RedirectOp::Append,
                    }
                }
                Some('|') => {
                    self.advance();
                    TokenKind::Redirect {
                        fd,
                        op: RedirectOp::OutClobber,
                    }
                }
                Some('&') => {
                    self.advance();
                    TokenKind::Redirect {
                        fd,
                        op: RedirectOp::DupOut,
                    }
                }
                _ => TokenKind::Redirect {
                    fd,
                    op: RedirectOp::Out,
                },
            }
        };
        Ok(kind)
    }

    /// `((expr))` command form. Returns the inner text if the construct is
    /// genuinely arithmetic (closes with an adjacent `))`), otherwise leaves
    /// the input untouched so `(` lexes as a subshell.
    fn try_lex_arith_command(&mut self) -> Option<String> {
        let start = self.pos;
        let mut i = start + 2;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        while i < self.chars.len() {
            let c = self.chars[i];
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '\\' => i += 1,
                '(' => depth += 1,
                ')' => {
                    if depth > 0 {
                        depth -= 1;
                    } else if self.chars.get(i + 1) == Some(&')') {
                        let inner: String = self.chars[start + 2..i].iter().collect();
                        for _ in start..i + 2 {
                            self.advance();
                        }
                        return Some(inner);
                    } else {
                        return None;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Capture a heredoc body. Called by the parser right after it reads the
    /// delimiter word; the body starts on the line after the current one and
    /// is spliced out of the input so lexing resumes mid-line.
    pub fn read_heredoc(&mut self, delimiter: &str, strip_tabs: bool) -> String {
        // The body begins after the newline that ends the current line.
        let mut line_end = self.pos;
        while line_end < self.chars.len() && self.chars[line_end] != '\n' {
            line_end += 1;
        }
        if line_end >= self.chars.len() {
            return String::new();
        }
        let body_start = line_end + 1;

        let mut body = String::new();
        let mut i = body_start;
        let end;
        loop {
            let mut j = i;
            while j < self.chars.len() && self.chars[j] != '\n' {
                j += 1;
            }
            let raw: String = self.chars[i..j].iter().collect();
            let line = if strip_tabs {
                raw.trim_start_matches('\t').to_string()
            } else {
                raw
            };
            if line == delimiter {
                end = if j < self.chars.len() { j + 1 } else { j };
                break;
            }
            body.push_str(&line);
            if j < self.chars.len() {
                body.push('\n');
                i = j + 1;
            } else {
                // Unterminated heredoc: take everything to end of input.
                end = j;
                break;
            }
        }

        self.chars.drain(body_start..end);
        body
    }

    /// Parse `$`-expansions in heredoc-body text (quotes are not special
    /// there, backslash escapes only `$`, `` ` `` and `\`).
    pub fn expandable_text_parts(text: &str) -> SynResult<Vec<WordPart>> {
        let mut lexer = Lexer::new(text);
        let mut parts = Vec::new();
        let mut lit = String::new();
        while let Some(c) = lexer.peek() {
            match c {
                '\\' => {
                    lexer.advance();
                    match lexer.peek() {
                        Some(n @ ('$' | '`' | '\\')) => {
                            lit.push(n);
                            lexer.advance();
                        }
                        Some(n) => {
                            lit.push('\\');
                            lit.push(n);
                            lexer.advance();
                        }
                        None => lit.push('\\'),
                    }
                }
                '$' => {
                    flush_literal(&mut lit, &mut parts);
                    if let Some(part) = lexer.parse_dollar()? {
                        parts.push(part);
                    } else {
                        lit.push('$');
                    }
                }
                '`' => {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(lexer.parse_backtick()?);
                }
                _ => {
                    lit.push(c);
                    lexer.advance();
                }
            }
        }
        flush_literal(&mut lit, &mut parts);
        Ok(parts)
    }

    /// Read one word starting at the current position.
    pub fn read_word(&mut self) -> SynResult<Word> {
        let mut parts: Vec<WordPart> = Vec::new();
        let mut lit = String::new();

        loop {
            let Some(c) = self.peek() else { break };
            match c {
                ' ' | '\t' | '\n' | ';' | '&' | '|' | '(' | ')' => break,
                '<' | '>' => {
                    if !self.cond_mode && self.peek_at(1) == Some('(') {
                        flush_literal(&mut lit, &mut parts);
                        let output = c == '>';
                        self.advance();
                        let inner = self.extract_balanced_parens()?;
                        let body = Parser::new(&inner).parse_inner()?;
                        parts.push(WordPart::ProcessSub { output, body });
                    } else {
                        break;
                    }
                }
                ']' if self.cond_mode && self.peek_at(1) == Some(']') => break,
                '\'' => {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(self.read_single_quoted()?);
                }
                '"' => {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(self.read_double_quoted()?);
                }
                '\\' => {
                    self.advance();
                    match self.peek() {
                        Some('\n') => {
                            self.advance();
                        }
                        Some(n) => {
                            lit.push(n);
                            self.advance();
                        }
                        None => lit.push('\\'),
                    }
                }
                '$' => {
                    flush_literal(&mut lit, &mut parts);
                    if let Some(part) = self.parse_dollar()? {
                        parts.push(part);
                    } else {
                        lit.push('$');
                    }
                }
                '`' => {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(self.parse_backtick()?);
                }
                '~' if parts.is_empty() && lit.is_empty() => {
                    self.advance();
                    let mut user = String::new();
                    while let Some(n) = self.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' || n == '.' || n == '-' {
                            user.push(n);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    parts.push(WordPart::Tilde(if user.is_empty() {
                        None
                    } else {
                        Some(user)
                    }));
                }
                '*' | '?' => {
                    flush_literal(&mut lit, &mut parts);
                    self.advance();
                    parts.push(WordPart::Glob(c.to_string()));
                }
                '[' => {
                    // `name[idx]=` is an array assignment, not a glob class.
                    if parts.is_empty() && is_identifier(&lit) {
                        if let Some(consumed) = self.try_read_subscript_assign() {
                            lit.push_str(&consumed);
                            continue;
                        }
                    }
                    if let Some(class) = self.try_read_glob_class() {
                        flush_literal(&mut lit, &mut parts);
                        parts.push(WordPart::Glob(class));
                    } else {
                        lit.push('[');
                        self.advance();
                    }
                }
                '{' => {
                    if let Some(expr) = self.try_read_brace_expr()? {
                        flush_literal(&mut lit, &mut parts);
                        parts.push(WordPart::Brace(expr));
                    } else {
                        lit.push('{');
                        self.advance();
                    }
                }
                '#' if lit.is_empty() && parts.is_empty() => {
                    // A word never starts with an unquoted `#`; that is a
                    // comment, handled by next_token.
                    break;
                }
                _ => {
                    lit.push(c);
                    self.advance();
                }
            }
        }

        flush_literal(&mut lit, &mut parts);
        Ok(Word { parts })
    }

    fn read_single_quoted(&mut self) -> SynResult<WordPart> {
        self.advance(); // opening '
        let mut content = String::new();
        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) => content.push(c),
                None => return Err(self.error("unterminated single quote")),
            }
        }
        Ok(WordPart::SingleQuoted(content))
    }

    fn read_double_quoted(&mut self) -> SynResult<WordPart> {
        self.advance(); // opening "
        let mut parts = Vec::new();
        let mut lit = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated double quote"));
            };
            match c {
                '"' => {
                    self.advance();
                    break;
                }
                '\\' => {
                    self.advance();
                    match self.peek() {
                        Some('\n') => {
                            self.advance();
                        }
                        Some(n @ ('"' | '\\' | '$' | '`')) => {
                            lit.push(n);
                            self.advance();
                        }
                        Some(n) => {
                            lit.push('\\');
                            lit.push(n);
                            self.advance();
                        }
                        None => return Err(self.error("unterminated double quote")),
                    }
                }
                '$' => {
                    flush_literal(&mut lit, &mut parts);
                    if let Some(part) = self.parse_dollar()? {
                        parts.push(part);
                    } else {
                        lit.push('$');
                    }
                }
                '`' => {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(self.parse_backtick()?);
                }
                _ => {
                    lit.push(c);
                    self.advance();
                }
            }
        }
        flush_literal(&mut lit, &mut parts);
        Ok(WordPart::DoubleQuoted(parts))
    }

    /// ANSI-C `$'...'` escapes.
    fn read_ansi_c_quoted(&mut self) -> SynResult<WordPart> {
        self.advance(); // opening '
        let mut content = String::new();
        loop {
            match self.advance() {
                Some('\'') => break,
                Some('\\') => match self.advance() {
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('r') => content.push('\r'),
                    Some('0') => content.push('\0'),
                    Some('a') => content.push('\x07'),
                    Some('b') => content.push('\x08'),
                    Some('f') => content.push('\x0c'),
                    Some('v') => content.push('\x0b'),
                    Some('e') | Some('E') => content.push('\x1b'),
                    Some('\\') => content.push('\\'),
                    Some('\'') => content.push('\''),
                    Some('"') => content.push('"'),
                    Some('x') => {
                        let mut hex = String::new();
                        for _ in 0..2 {
                            match self.peek() {
                                Some(h) if h.is_ascii_hexdigit() => {
                                    hex.push(h);
                                    self.advance();
                                }
                                _ => break,
                            }
                        }
                        if let Ok(v) = u8::from_str_radix(&hex, 16) {
                            content.push(v as char);
                        }
                    }
                    Some(other) => {
                        content.push('\\');
                        content.push(other);
                    }
                    None => return Err(self.error("unterminated $'...' quote")),
                },
                Some(c) => content.push(c),
                None => return Err(self.error("unterminated $'...' quote")),
            }
        }
        Ok(WordPart::SingleQuoted(content))
    }

    /// Parse the construct after `$`. Returns `None` when the `$` is literal.
    fn parse_dollar(&mut self) -> SynResult<Option<WordPart>> {
        debug_assert_eq!(self.peek(), Some('$'));
        match self.peek_at(1) {
            Some('(') => {
                self.advance(); // $
                if self.peek_at(1) == Some('(') {
                    // Try arithmetic first; fall back to a command
                    // substitution opening with a subshell.
                    if let Some(expr) = self.try_lex_arith_substitution() {
                        return Ok(Some(WordPart::ArithSub(expr)));
                    }
                }
                let inner = self.extract_balanced_parens()?;
                let script = Parser::new(&inner).parse_inner()?;
                Ok(Some(WordPart::CommandSub(script)))
            }
            Some('{') => {
                self.advance(); // $
                self.advance(); // {
                let expansion = self.parse_braced_parameter()?;
                Ok(Some(WordPart::Parameter(expansion)))
            }
            Some('\'') => {
                self.advance(); // $
                Ok(Some(self.read_ansi_c_quoted()?))
            }
            Some('"') => {
                self.advance(); // $
                Ok(Some(self.read_double_quoted()?))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.advance(); // $
                let mut name = String::new();
                while let Some(n) = self.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Ok(Some(WordPart::Parameter(ParamExpansion {
                    name,
                    index: None,
                    op: None,
                })))
            }
            Some(c) if "@*#?$!-".contains(c) || c.is_ascii_digit() => {
                self.advance(); // $
                self.advance(); // special char
                Ok(Some(WordPart::Parameter(ParamExpansion {
                    name: c.to_string(),
                    index: None,
                    op: None,
                })))
            }
            _ => {
                self.advance(); // lone $
                Ok(None)
            }
        }
    }

    fn parse_backtick(&mut self) -> SynResult<WordPart> {
        self.advance(); // opening `
        let mut inner = String::new();
        loop {
            match self.advance() {
                Some('`') => break,
                Some('\\') => match self.advance() {
                    Some(c @ ('`' | '\\' | '$')) => inner.push(c),
                    Some(c) => {
                        inner.push('\\');
                        inner.push(c);
                    }
                    None => return Err(self.error("unterminated backquote")),
                },
                Some(c) => inner.push(c),
                None => return Err(self.error("unterminated backquote")),
            }
        }
        let script = Parser::new(&inner).parse_inner()?;
        Ok(WordPart::CommandSub(script))
    }

    /// `$((expr))` requires the closing `))`; `$((` can also open a
    /// command substitution whose first command is a subshell.
    fn try_lex_arith_substitution(&mut self) -> Option<String> {
        // Positioned at the first `(` after `$` was consumed.
        self.try_lex_arith_command()
    }

    /// Extract text between balanced parentheses; the cursor sits on `(`.
    fn extract_balanced_parens(&mut self) -> SynResult<String> {
        self.advance(); // (
        let mut depth = 1usize;
        let mut inner = String::new();
        let mut quote: Option<char> = None;
        loop {
            let Some(c) = self.advance() else {
                return Err(self.error("unexpected end of input looking for `)`"));
            };
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    inner.push(c);
                    if let Some(n) = self.advance() {
                        inner.push(n);
                    }
                    continue;
                }
                inner.push(c);
                continue;
            }
            match c {
                '\'' | '"' => {
                    quote = Some(c);
                    inner.push(c);
                }
                '\\' => {
                    inner.push(c);
                    if let Some(n) = self.advance() {
                        inner.push(n);
                    }
                }
                '(' => {
                    depth += 1;
                    inner.push(c);
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(inner);
                    }
                    inner.push(c);
                }
                _ => inner.push(c),
            }
        }
    }

    /// Parse `${...}`; the cursor is just past `{`.
    fn parse_braced_parameter(&mut self) -> SynResult<ParamExpansion> {
        // ${#...} length and ${!...} indirection prefixes.
        let mut length_op = false;
        let mut indirect = false;
        match self.peek() {
            Some('#') => {
                // `${#}` is the positional count; `${#x}` is a length.
                if !matches!(self.peek_at(1), Some('}') | None) {
                    length_op = true;
                    self.advance();
                }
            }
            Some('!') => {
                if !matches!(self.peek_at(1), Some('}') | None) {
                    indirect = true;
                    self.advance();
                }
            }
            _ => {}
        }

        let mut name = String::new();
        match self.peek() {
            Some(c) if "@*#?$!-".contains(c) || c.is_ascii_digit() => {
                // Special parameters are single characters except positional
                // numbers, which may be multi-digit inside braces.
                if c.is_ascii_digit() {
                    while let Some(d) = self.peek() {
                        if d.is_ascii_digit() {
                            name.push(d);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                } else {
                    name.push(c);
                    self.advance();
                }
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                while let Some(n) = self.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            _ => {}
        }
        if name.is_empty() {
            return Err(self.error("bad substitution"));
        }

        let mut index: Option<String> = None;
        if self.peek() == Some('[') {
            self.advance();
            let sub = self.scan_until_depth_aware(&[']'])?;
            if self.peek() != Some(']') {
                return Err(self.error("unmatched `[` in parameter subscript"));
            }
            self.advance();
            index = Some(sub);
        }

        // Indirection forms.
        if indirect {
            let op = match (self.peek(), &index) {
                (Some('}'), Some(sub)) if sub == "@" || sub == "*" => Some(ParamOp::ArrayKeys),
                (Some('}'), None) => Some(ParamOp::Indirect),
                (Some('*'), None) if self.peek_at(1) == Some('}') => {
                    self.advance();
                    Some(ParamOp::PrefixNames { keys_form: false })
                }
                (Some('@'), None) if self.peek_at(1) == Some('}') => {
                    self.advance();
                    Some(ParamOp::PrefixNames { keys_form: true })
                }
                _ => return Err(self.error("bad substitution")),
            };
            if self.advance() != Some('}') {
                return Err(self.error("missing `}` in parameter expansion"));
            }
            let index = if matches!(op, Some(ParamOp::ArrayKeys)) {
                index
            } else {
                None
            };
            return Ok(ParamExpansion {
                name,
                index,
                op: op.map(Box::new),
            });
        }

        if length_op {
            if self.advance() != Some('}') {
                return Err(self.error("missing `}` in parameter expansion"));
            }
            return Ok(ParamExpansion {
                name,
                index,
                op: Some(Box::new(ParamOp::Length)),
            });
        }

        let op: Option<ParamOp> = match self.peek() {
            Some('}') => None,
            Some(':') => {
                self.advance();
                match self.peek() {
                    Some('-') => {
                        self.advance();
                        Some(ParamOp::Default {
                            word: self.parse_op_word()?,
                            colon: true,
                        })
                    }
                    Some('=') => {
                        self.advance();
                        Some(ParamOp::Assign {
                            word: self.parse_op_word()?,
                            colon: true,
                        })
                    }
                    Some('+') => {
                        self.advance();
                        Some(ParamOp::Alternative {
                            word: self.parse_op_word()?,
                            colon: true,
                        })
                    }
                    Some('?') => {
                        self.advance();
                        Some(ParamOp::ErrorIfUnset {
                            word: self.parse_op_word()?,
                            colon: true,
                        })
                    }
                    _ => {
                        let offset = self.scan_until_depth_aware(&[':', '}'])?;
                        let length = if self.peek() == Some(':') {
                            self.advance();
                            Some(self.scan_until_depth_aware(&['}'])?)
                        } else {
                            None
                        };
                        Some(ParamOp::Substring {
                            offset: offset.trim().to_string(),
                            length: length.map(|l| l.trim().to_string()),
                        })
                    }
                }
            }
            Some('-') => {
                self.advance();
                Some(ParamOp::Default {
                    word: self.parse_op_word()?,
                    colon: false,
                })
            }
            Some('=') => {
                self.advance();
                Some(ParamOp::Assign {
                    word: self.parse_op_word()?,
                    colon: false,
                })
            }
            Some('+') => {
                self.advance();
                Some(ParamOp::Alternative {
                    word: self.parse_op_word()?,
                    colon: false,
                })
            }
            Some('?') => {
                self.advance();
                Some(ParamOp::ErrorIfUnset {
                    word: self.parse_op_word()?,
                    colon: false,
                })
            }
            Some('#') => {
                self.advance();
                let longest = if self.peek() == Some('#') {
                    self.advance();
                    true
                } else {
                    false
                };
                Some(ParamOp::RemovePrefix {
                    pattern: self.parse_op_word()?,
                    longest,
                })
            }
            Some('%') => {
                self.advance();
                let longest = if self.peek() == Some('%') {
                    self.advance();
                    true
                } else {
                    false
                };
                Some(ParamOp::RemoveSuffix {
                    pattern: self.parse_op_word()?,
                    longest,
                })
            }
            Some('/') => {
                self.advance();
                let (all, prefix, suffix) = match self.peek() {
                    Some('/') => {
                        self.advance();
                        (true, false, false)
                    }
                    Some('#') => {
                        self.advance();
                        (false, true, false)
                    }
                    Some('%') => {
                        self.advance();
                        (false, false, true)
                    }
                    _ => (false, false, false),
                };
                let pattern_text = self.scan_until_depth_aware(&['/', '}'])?;
                let pattern = parse_subword(&pattern_text)?;
                let replacement = if self.peek() == Some('/') {
                    self.advance();
                    Some(self.parse_op_word()?)
                } else {
                    None
                };
                Some(ParamOp::Replace {
                    pattern,
                    replacement,
                    all,
                    prefix,
                    suffix,
                })
            }
            Some('^') => {
                self.advance();
                let all = if self.peek() == Some('^') {
                    self.advance();
                    true
                } else {
                    false
                };
                Some(ParamOp::CaseConvert { upper: true, all })
            }
            Some(',') => {
                self.advance();
                let all = if self.peek() == Some(',') {
                    self.advance();
                    true
                } else {
                    false
                };
                Some(ParamOp::CaseConvert { upper: false, all })
            }
            _ => return Err(self.error("bad substitution")),
        };

        if self.advance() != Some('}') {
            return Err(self.error("missing `}` in parameter expansion"));
        }
        Ok(ParamExpansion {
            name,
            index,
            op: op.map(Box::new),
        })
    }

    /// The word argument of a parameter operation, up to the closing `}`.
    fn parse_op_word(&mut self) -> SynResult<Word> {
        let text = self.scan_until_depth_aware(&['}'])?;
        parse_subword(&text)
    }

    /// Scan forward to one of `stops` at depth 0, honoring `${}`, `$()`,
    /// quotes, and backslash escapes. The stop character is not consumed.
    fn scan_until_depth_aware(&mut self, stops: &[char]) -> SynResult<String> {
        let mut out = String::new();
        let mut brace_depth = 0usize;
        let mut paren_depth = 0usize;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unexpected end of input in parameter expansion"));
            };
            if brace_depth == 0 && paren_depth == 0 && stops.contains(&c) {
                return Ok(out);
            }
            match c {
                '\\' => {
                    out.push(c);
                    self.advance();
                    if let Some(n) = self.peek() {
                        out.push(n);
                        self.advance();
                    }
                }
                '\'' => {
                    out.push(c);
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(inner) => out.push(inner),
                            None => return Err(self.error("unterminated single quote")),
                        }
                    }
                }
                '"' => {
                    out.push(c);
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('"') => {
                                out.push('"');
                                break;
                            }
                            Some('\\') => {
                                out.push('\\');
                                if let Some(n) = self.advance() {
                                    out.push(n);
                                }
                            }
                            Some(inner) => out.push(inner),
                            None => return Err(self.error("unterminated double quote")),
                        }
                    }
                }
                '{' => {
                    brace_depth += 1;
                    out.push(c);
                    self.advance();
                }
                '}' => {
                    brace_depth = brace_depth.saturating_sub(1);
                    out.push(c);
                    self.advance();
                }
                '(' => {
                    paren_depth += 1;
                    out.push(c);
                    self.advance();
                }
                ')' => {
                    paren_depth = paren_depth.saturating_sub(1);
                    out.push(c);
                    self.advance();
                }
                _ => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    /// `name[subscript]=` / `name[subscript]+=`: return the raw
    /// `[subscript]` text when an assignment follows, so the word keeps it
    /// literal instead of treating `[` as a glob class.
    fn try_read_subscript_assign(&mut self) -> Option<String> {
        let mut i = self.pos + 1;
        let mut depth = 1usize;
        while i < self.chars.len() {
            match self.chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let after = self.chars.get(i + 1);
                        let after2 = self.chars.get(i + 2);
                        let is_assign = after == Some(&'=')
                            || (after == Some(&'+') && after2 == Some(&'='));
                        if !is_assign {
                            return None;
                        }
                        let text: String = self.chars[self.pos..=i].iter().collect();
                        for _ in self.pos..=i {
                            self.advance();
                        }
                        return Some(text);
                    }
                }
                '\n' | ' ' | '\t' => return None,
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// `[...]` glob class: requires a closing `]` within the current word.
    /// A `]` directly after `[` or `[!`/`[^` is literal. Classes containing
    /// expansions are left to the literal path so the `$` still expands.
    fn try_read_glob_class(&mut self) -> Option<String> {
        let mut i = self.pos + 1;
        if matches!(self.chars.get(i), Some('!') | Some('^')) {
            i += 1;
        }
        if self.chars.get(i) == Some(&']') {
            i += 1;
        }
        while i < self.chars.len() {
            match self.chars[i] {
                '$' | '`' => return None,
                ']' => {
                    let class: String = self.chars[self.pos..=i].iter().collect();
                    for _ in self.pos..=i {
                        self.advance();
                    }
                    return Some(class);
                }
                ' ' | '\t' | '\n' | '|' | '&' | ';' | '<' | '>' | '(' | ')' => return None,
                _ => i += 1,
            }
        }
        None
    }

    /// Brace expansion lookahead: `{...}` with a top-level comma or `..`
    /// and no unquoted whitespace is an expansion, not a group.
    fn try_read_brace_expr(&mut self) -> SynResult<Option<BraceExpr>> {
        let mut i = self.pos + 1;
        let mut depth = 1usize;
        let mut has_comma = false;
        let mut has_range = false;
        let mut prev = '\0';
        let mut quote: Option<char> = None;
        let end = loop {
            let Some(&c) = self.chars.get(i) else {
                return Ok(None);
            };
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                i += 1;
                prev = c;
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '\\' => i += 1,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break i;
                    }
                }
                ',' if depth == 1 => has_comma = true,
                '.' if depth == 1 && prev == '.' => has_range = true,
                ' ' | '\t' | '\n' | ';' if depth == 1 => return Ok(None),
                _ => {}
            }
            prev = c;
            i += 1;
        };
        if !has_comma && !has_range {
            return Ok(None);
        }

        let inner: String = self.chars[self.pos + 1..end].iter().collect();

        if !has_comma {
            if let Some(range) = parse_brace_range(&inner) {
                for _ in self.pos..=end {
                    self.advance();
                }
                return Ok(Some(range));
            }
            return Ok(None);
        }

        // Split on top-level commas.
        let mut items: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                current.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '\\' => {
                    current.push(c);
                    if let Some(n) = chars.next() {
                        current.push(n);
                    }
                }
                '{' => {
                    depth += 1;
                    current.push(c);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    items.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }
        items.push(current);

        let words = items
            .iter()
            .map(|item| parse_subword(item))
            .collect::<SynResult<Vec<Word>>>()?;
        for _ in self.pos..=end {
            self.advance();
        }
        Ok(Some(BraceExpr::Items(words)))
    }
}

fn flush_literal(lit: &mut String, parts: &mut Vec<WordPart>) {
    if !lit.is_empty() {
        parts.push(WordPart::Literal(std::mem::take(lit)));
    }
}

fn is_word_char(c: char) -> bool {
    !matches!(
        c,
        ' ' | '\t' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')'
    )
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse text extracted from inside another construct (a brace item or
/// parameter-operation argument) as a single word, spaces included.
pub(super) fn parse_subword(text: &str) -> SynResult<Word> {
    let mut lexer = Lexer::new(text);
    let mut parts: Vec<WordPart> = Vec::new();
    let mut lit = String::new();
    loop {
        let Some(c) = lexer.peek() else { break };
        match c {
            '\'' => {
                flush_literal(&mut lit, &mut parts);
                parts.push(lexer.read_single_quoted()?);
            }
            '"' => {
                flush_literal(&mut lit, &mut parts);
                parts.push(lexer.read_double_quoted()?);
            }
            '\\' => {
                lexer.advance();
                match lexer.peek() {
                    Some(n) => {
                        lit.push(n);
                        lexer.advance();
                    }
                    None => lit.push('\\'),
                }
            }
            '$' => {
                flush_literal(&mut lit, &mut parts);
                if let Some(part) = lexer.parse_dollar()? {
                    parts.push(part);
                } else {
                    lit.push('$');
                }
            }
            '`' => {
                flush_literal(&mut lit, &mut parts);
                parts.push(lexer.parse_backtick()?);
            }
            '*' | '?' => {
                flush_literal(&mut lit, &mut parts);
                lexer.advance();
                parts.push(WordPart::Glob(c.to_string()));
            }
            '[' => {
                if let Some(class) = lexer.try_read_glob_class() {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(WordPart::Glob(class));
                } else {
                    lit.push('[');
                    lexer.advance();
                }
            }
            '{' => {
                if let Some(expr) = lexer.try_read_brace_expr()? {
                    flush_literal(&mut lit, &mut parts);
                    parts.push(WordPart::Brace(expr));
                } else {
                    lit.push('{');
                    lexer.advance();
                }
            }
            _ => {
                lit.push(c);
                lexer.advance();
            }
        }
    }
    flush_literal(&mut lit, &mut parts);
    Ok(Word { parts })
}

/// `{1..5}` / `{a..z}` / `{1..9..2}` range forms.
fn parse_brace_range(inner: &str) -> Option<BraceExpr> {
    let segments: Vec<&str> = inner.split("..").collect();
    if segments.len() != 2 && segments.len() != 3 {
        return None;
    }
    let step = if segments.len() == 3 {
        segments[2].parse::<i64>().ok()?
    } else {
        1
    };
    if let (Ok(start), Ok(end)) = (segments[0].parse::<i64>(), segments[1].parse::<i64>()) {
        return Some(BraceExpr::Range { start, end, step });
    }
    let (s, e) = (segments[0], segments[1]);
    if s.chars().count() == 1 && e.chars().count() == 1 {
        let (sc, ec) = (s.chars().next()?, e.chars().next()?);
        if sc.is_ascii_alphabetic() && ec.is_ascii_alphabetic() {
            return Some(BraceExpr::CharRange {
                start: sc,
                end: ec,
                step,
            });
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            out.push(tok.kind);
        }
        out
    }

    fn word(input: &str) -> Word {
        let mut lexer = Lexer::new(input);
        match lexer.next_token().unwrap().unwrap().kind {
            TokenKind::Word(w) => w,
            other => panic!("expected word, got {other:?}"),
        }
    }

    #[test]
    fn simple_words_and_operators() {
        let toks = tokens("a | b && c || d; e &");
        assert_eq!(toks.len(), 10);
        assert!(matches!(toks[1], TokenKind::Pipe));
        assert!(matches!(toks[3], TokenKind::AndAnd));
        assert!(matches!(toks[5], TokenKind::OrOr));
        assert!(matches!(toks[7], TokenKind::Semi));
        assert!(matches!(toks[9], TokenKind::Amp));
    }

    #[test]
    fn pipe_amp_and_case_terminators() {
        assert!(matches!(tokens("a |& b")[1], TokenKind::PipeAmp));
        assert!(matches!(tokens(";;")[0], TokenKind::SemiSemi));
        assert!(matches!(tokens(";&")[0], TokenKind::SemiAmp));
        assert!(matches!(tokens(";;&")[0], TokenKind::SemiSemiAmp));
    }

    #[test]
    fn redirect_operators() {
        let toks = tokens("a > b >> c < d 2> e 2>&1 &> f");
        assert!(matches!(
            toks[1],
            TokenKind::Redirect { fd: None, op: RedirectOp::Out }
        ));
        assert!(matches!(
            toks[3],
            TokenKind::Redirect { fd: None, op: RedirectOp::Append }
        ));
        assert!(matches!(
            toks[5],
            TokenKind::Redirect { fd: None, op: RedirectOp::In }
        ));
        assert!(matches!(
            toks[7],
            TokenKind::Redirect { fd: Some(2), op: RedirectOp::Out }
        ));
        assert!(matches!(
            toks[9],
            TokenKind::Redirect { fd: Some(2), op: RedirectOp::DupOut }
        ));
        assert!(matches!(
            toks[11],
            TokenKind::Redirect { fd: None, op: RedirectOp::OutErr }
        ));
    }

    #[test]
    fn digit_words_are_not_redirects() {
        let toks = tokens("echo 123");
        assert!(matches!(&toks[1], TokenKind::Word(w) if w.as_static().as_deref() == Some("123")));
    }

    #[test]
    fn quoting_forms() {
        let w = word("'a b'");
        assert_eq!(w.parts, vec![WordPart::SingleQuoted("a b".into())]);

        let w = word("\"x $HOME\"");
        match &w.parts[0] {
            WordPart::DoubleQuoted(parts) => {
                assert_eq!(parts[0], WordPart::Literal("x ".into()));
                assert!(matches!(&parts[1], WordPart::Parameter(p) if p.name == "HOME"));
            }
            other => panic!("expected double quoted, got {other:?}"),
        }

        let w = word("$'a\\nb'");
        assert_eq!(w.parts, vec![WordPart::SingleQuoted("a\nb".into())]);
    }

    #[test]
    fn escapes_become_literals() {
        let w = word("a\\ b");
        assert_eq!(w.parts, vec![WordPart::Literal("a b".into())]);
        let w = word("\\*");
        assert_eq!(w.parts, vec![WordPart::Literal("*".into())]);
    }

    #[test]
    fn glob_characters_are_tagged() {
        let w = word("*.txt");
        assert_eq!(w.parts[0], WordPart::Glob("*".into()));
        assert_eq!(w.parts[1], WordPart::Literal(".txt".into()));

        let w = word("f[0-9].log");
        assert_eq!(w.parts[1], WordPart::Glob("[0-9]".into()));
    }

    #[test]
    fn array_subscript_assignment_is_not_a_glob() {
        let w = word("m[a]=1");
        assert_eq!(w.parts, vec![WordPart::Literal("m[a]=1".into())]);
    }

    #[test]
    fn parameter_expansions() {
        let w = word("${name:-fallback}");
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "name");
                assert!(matches!(
                    p.op.as_deref(),
                    Some(ParamOp::Default { colon: true, .. })
                ));
            }
            other => panic!("expected parameter, got {other:?}"),
        }

        let w = word("${#items[@]}");
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert_eq!(p.name, "items");
                assert_eq!(p.index.as_deref(), Some("@"));
                assert!(matches!(p.op.as_deref(), Some(ParamOp::Length)));
            }
            other => panic!("expected parameter, got {other:?}"),
        }

        let w = word("${path%/*}");
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert!(matches!(
                    p.op.as_deref(),
                    Some(ParamOp::RemoveSuffix { longest: false, .. })
                ));
            }
            other => panic!("expected parameter, got {other:?}"),
        }

        let w = word("${v/x/y}");
        match &w.parts[0] {
            WordPart::Parameter(p) => {
                assert!(matches!(
                    p.op.as_deref(),
                    Some(ParamOp::Replace { all: false, .. })
                ));
            }
            other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn command_substitution_parses_inner_script() {
        let w = word("$(echo hi)");
        match &w.parts[0] {
            WordPart::CommandSub(script) => assert_eq!(script.statements.len(), 1),
            other => panic!("expected command substitution, got {other:?}"),
        }
    }

    #[test]
    fn backticks_parse_as_command_substitution() {
        let w = word("`echo hi`");
        assert!(matches!(&w.parts[0], WordPart::CommandSub(_)));
    }

    #[test]
    fn arithmetic_substitution() {
        let w = word("$((1 + 2))");
        assert_eq!(w.parts, vec![WordPart::ArithSub("1 + 2".into())]);
    }

    #[test]
    fn arith_command_token() {
        let toks = tokens("((x = x + 1))");
        assert!(matches!(&toks[0], TokenKind::ArithCommand(e) if e == "x = x + 1"));
    }

    #[test]
    fn nested_subshell_is_not_arithmetic() {
        let toks = tokens("((echo a); echo b)");
        assert!(matches!(toks[0], TokenKind::LParen));
        assert!(matches!(toks[1], TokenKind::LParen));
    }

    #[test]
    fn brace_expansion_items_and_ranges() {
        let w = word("{a,b,c}");
        match &w.parts[0] {
            WordPart::Brace(BraceExpr::Items(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected brace items, got {other:?}"),
        }

        let w = word("{1..5}");
        assert_eq!(
            w.parts[0],
            WordPart::Brace(BraceExpr::Range { start: 1, end: 5, step: 1 })
        );

        let w = word("{a..e}");
        assert_eq!(
            w.parts[0],
            WordPart::Brace(BraceExpr::CharRange { start: 'a', end: 'e', step: 1 })
        );
    }

    #[test]
    fn lone_braces_stay_literal() {
        let w = word("{abc}");
        assert_eq!(w.parts, vec![WordPart::Literal("{abc}".into())]);
    }

    #[test]
    fn tilde_only_at_word_start() {
        let w = word("~/notes");
        assert_eq!(w.parts[0], WordPart::Tilde(None));
        assert_eq!(w.parts[1], WordPart::Literal("/notes".into()));

        let w = word("~alice/www");
        assert_eq!(w.parts[0], WordPart::Tilde(Some("alice".into())));

        let w = word("a~b");
        assert_eq!(w.parts, vec![WordPart::Literal("a~b".into())]);
    }

    #[test]
    fn heredoc_capture_splices_body() {
        let mut lexer = Lexer::new("cat <<EOF && echo done\nline one\nline two\nEOF\necho after");
        // cat
        lexer.next_token().unwrap();
        // <<
        let tok = lexer.next_token().unwrap().unwrap();
        assert!(matches!(tok.kind, TokenKind::HereDocOp { strip_tabs: false, .. }));
        // delimiter
        lexer.next_token().unwrap();
        let body = lexer.read_heredoc("EOF", false);
        assert_eq!(body, "line one\nline two\n");
        // Lexing resumes on the same command line.
        let rest = {
            let mut kinds = Vec::new();
            while let Some(t) = lexer.next_token().unwrap() {
                kinds.push(t.kind);
            }
            kinds
        };
        assert!(matches!(rest[0], TokenKind::AndAnd));
        assert!(matches!(&rest[1], TokenKind::Word(w) if w.as_static().as_deref() == Some("echo")));
    }

    #[test]
    fn heredoc_strip_tabs() {
        let mut lexer = Lexer::new("cat <<-END\n\t\tindented\n\tEND\n");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let body = lexer.read_heredoc("END", true);
        assert_eq!(body, "indented\n");
    }

    #[test]
    fn comments_are_skipped() {
        let toks = tokens("echo hi # trailing\necho bye");
        assert_eq!(toks.len(), 5);
        assert!(matches!(toks[2], TokenKind::Newline));
    }

    #[test]
    fn cond_mode_changes_lexing() {
        let mut lexer = Lexer::new("[[ $a < $b ]]");
        let t = lexer.next_token().unwrap().unwrap();
        assert!(matches!(t.kind, TokenKind::DoubleLBracket));
        lexer.set_cond_mode(true);
        lexer.next_token().unwrap(); // $a
        let lt = lexer.next_token().unwrap().unwrap();
        assert!(matches!(&lt.kind, TokenKind::Word(w) if w.as_static().as_deref() == Some("<")));
        lexer.next_token().unwrap(); // $b
        let close = lexer.next_token().unwrap().unwrap();
        assert!(matches!(close.kind, TokenKind::DoubleRBracket));
    }

    #[test]
    fn process_substitution() {
        let w = word("<(sort f)");
        assert!(matches!(&w.parts[0], WordPart::ProcessSub { output: false, .. }));
    }

    #[test]
    fn positions_track_lines() {
        let mut lexer = Lexer::new("echo hi\necho bye");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap(); // newline
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.line, 2);
        assert_eq!(tok.column, 1);
    }
}

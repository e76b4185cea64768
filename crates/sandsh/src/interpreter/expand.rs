//! Word expansion.
//!
//! Ordered phases: brace, tilde, parameter/command/arithmetic substitution,
//! IFS word-splitting, pathname globbing, quote removal. Double-quoted
//! content is never split or globbed; `"$@"` still produces one field per
//! positional parameter.
//!
//! Fields are built from segments that remember whether their text came
//! from a quoted context (protected from globbing) and whether a glob
//! metacharacter is active. Quote removal falls out of joining segments.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use super::pattern;
use super::state::Value;
use super::Interpreter;
use crate::parser::{
    BraceExpr, Lexer, ParamExpansion, ParamOp, Script, Word, WordPart,
};

/// Expansion failure: message plus the exit code it imposes on the
/// containing command (1 normally, 2 for `nounset` violations).
#[derive(Debug, Clone)]
pub struct ExpError {
    pub message: String,
    pub status: i32,
}

impl ExpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 1,
        }
    }

    pub fn unbound(name: &str) -> Self {
        Self {
            message: format!("{name}: unbound variable"),
            status: 2,
        }
    }
}

impl From<crate::parser::SyntaxError> for ExpError {
    fn from(e: crate::parser::SyntaxError) -> Self {
        ExpError::new(e.message)
    }
}

#[derive(Debug, Clone)]
struct Seg {
    text: String,
    /// Glob metacharacters in `text` are active.
    glob: bool,
}

#[derive(Debug, Clone, Default)]
struct Field {
    segs: Vec<Seg>,
    /// Any quoted content landed here; keeps empty fields alive (`""`).
    quoted: bool,
    /// Created by an explicit non-whitespace delimiter; kept even if empty.
    forced: bool,
}

impl Field {
    fn text(&self) -> String {
        self.segs.iter().map(|s| s.text.as_str()).collect()
    }

    fn is_empty_text(&self) -> bool {
        self.segs.iter().all(|s| s.text.is_empty())
    }

    /// Pattern string for the glob phase: protected segments escaped.
    fn pattern(&self) -> String {
        let mut out = String::new();
        for seg in &self.segs {
            if seg.glob {
                out.push_str(&seg.text);
            } else {
                out.push_str(&pattern::escape(&seg.text));
            }
        }
        out
    }

    fn has_active_glob(&self) -> bool {
        self.segs.iter().any(|s| s.glob && pattern::has_glob_chars(&s.text))
    }
}

#[derive(Debug, Default)]
struct FieldAcc {
    fields: Vec<Field>,
    pending_break: bool,
}

impl FieldAcc {
    fn new() -> Self {
        Self {
            fields: vec![Field::default()],
            pending_break: false,
        }
    }

    fn current(&mut self) -> &mut Field {
        if self.pending_break {
            self.fields.push(Field::default());
            self.pending_break = false;
        }
        // Invariant: constructed with one field, never drained mid-build.
        self.fields.last_mut().expect("field accumulator is never empty")
    }

    fn append(&mut self, text: &str, glob: bool, quoted: bool) {
        let field = self.current();
        if quoted {
            field.quoted = true;
        }
        if !text.is_empty() {
            field.segs.push(Seg {
                text: text.to_string(),
                glob,
            });
        } else if !quoted && !field.forced {
            // Empty split piece: the break that created it is real.
            field.forced = true;
        }
    }

    fn mark_quoted(&mut self) {
        self.current().quoted = true;
    }

    /// `"$@"` with zero elements yields zero fields even though the quotes
    /// marked the field: withdraw the mark if nothing else landed here.
    fn unmark_quoted_if_textless(&mut self) {
        if !self.pending_break {
            if let Some(field) = self.fields.last_mut() {
                if field.segs.is_empty() {
                    field.quoted = false;
                }
            }
        }
    }

    fn split_break(&mut self) {
        self.pending_break = true;
    }

    /// Drop fields that received nothing: an unquoted expansion of an empty
    /// value produces zero fields.
    fn finish(self) -> Vec<Field> {
        self.fields
            .into_iter()
            .filter(|f| !f.is_empty_text() || f.quoted || f.forced)
            .collect()
    }
}

/// How expansion output feeds back into the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Full pipeline: split and glob.
    Split,
    /// Single-field: assignments, redirect targets, heredoc bodies.
    Single,
    /// Single-field, but expansion results keep glob chars active (case
    /// patterns, `[[ == ]]` right-hand sides, parameter-op patterns).
    Pattern,
}

impl Interpreter {
    /// Full expansion of a word list into final argument strings.
    pub(crate) async fn expand_words(&mut self, words: &[Word]) -> Result<Vec<String>, ExpError> {
        let mut out = Vec::new();
        for word in words {
            for branch in expand_braces(word) {
                let mut acc = FieldAcc::new();
                self.expand_parts(&branch.parts, false, Mode::Split, &mut acc)
                    .await?;
                for field in acc.finish() {
                    if !self.state.options.noglob && field.has_active_glob() {
                        let matches = self.glob_expand(&field.pattern()).await;
                        if matches.is_empty() {
                            if self.state.shopt.failglob {
                                return Err(ExpError::new(format!(
                                    "no match: {}",
                                    field.text()
                                )));
                            }
                            if self.state.shopt.nullglob {
                                continue;
                            }
                            out.push(field.text());
                        } else {
                            out.extend(matches);
                        }
                    } else {
                        out.push(field.text());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Expand to exactly one string: no splitting, no globbing.
    pub(crate) async fn expand_word_single(&mut self, word: &Word) -> Result<String, ExpError> {
        let mut acc = FieldAcc::new();
        self.expand_parts(&word.parts, false, Mode::Single, &mut acc)
            .await?;
        Ok(acc
            .fields
            .iter()
            .map(Field::text)
            .collect::<Vec<_>>()
            .concat())
    }

    /// Expand to a glob pattern string: quoted text escaped, unquoted
    /// expansion results pattern-active.
    pub(crate) async fn expand_word_pattern(&mut self, word: &Word) -> Result<String, ExpError> {
        let mut acc = FieldAcc::new();
        self.expand_parts(&word.parts, false, Mode::Pattern, &mut acc)
            .await?;
        let mut out = String::new();
        for field in &acc.fields {
            out.push_str(&field.pattern());
        }
        Ok(out)
    }

    /// Expand `$`-constructs in raw text (heredoc-style).
    pub(crate) async fn expand_text(&mut self, text: &str) -> Result<String, ExpError> {
        let parts = Lexer::expandable_text_parts(text)?;
        self.expand_word_single(&Word { parts }).await
    }

    /// Expand then evaluate arithmetic text.
    pub(crate) async fn eval_arith_text(&mut self, src: &str) -> Result<i64, ExpError> {
        let expanded = self.expand_text(src).await?;
        super::arith::eval_arith(&mut self.state, &expanded)
            .map_err(|e| ExpError::new(format!("arithmetic: {e}")))
    }

    fn expand_parts<'a>(
        &'a mut self,
        parts: &'a [WordPart],
        quoted: bool,
        mode: Mode,
        acc: &'a mut FieldAcc,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExpError>> + Send + 'a>> {
        Box::pin(async move {
            for part in parts {
                match part {
                    WordPart::Literal(text) => acc.append(text, false, quoted),
                    WordPart::SingleQuoted(text) => acc.append(text, false, true),
                    WordPart::DoubleQuoted(inner) => {
                        acc.mark_quoted();
                        self.expand_parts(inner, true, mode, acc).await?;
                    }
                    WordPart::Glob(text) => acc.append(text, !quoted, quoted),
                    WordPart::Tilde(user) => {
                        let home = match user {
                            None => self.state.get_scalar("HOME"),
                            Some(name) => format!("/home/{name}"),
                        };
                        if home.is_empty() {
                            acc.append("~", false, quoted);
                        } else {
                            acc.append(&home, false, quoted);
                        }
                    }
                    WordPart::Brace(expr) => {
                        // Outside brace-expansion position (assignments,
                        // patterns) the braces are literal text.
                        let literal = crate::transform::serialize_word(&Word {
                            parts: vec![WordPart::Brace(expr.clone())],
                        });
                        acc.append(&literal, false, quoted);
                    }
                    WordPart::Parameter(p) => {
                        self.expand_parameter(p, quoted, mode, acc).await?;
                    }
                    WordPart::CommandSub(script) => {
                        let output = self.run_substitution(script).await?;
                        let trimmed = output.trim_end_matches('\n');
                        self.push_expansion(acc, trimmed, quoted, mode);
                    }
                    WordPart::ArithSub(src) => {
                        let value = self.eval_arith_text(src).await?;
                        self.push_expansion(acc, &value.to_string(), quoted, mode);
                    }
                    WordPart::ProcessSub { output, body } => {
                        let path = self.setup_process_sub(*output, body).await?;
                        acc.append(&path, false, quoted);
                    }
                }
            }
            Ok(())
        })
    }

    /// Append the result of a substitution, splitting when the context
    /// calls for it.
    fn push_expansion(&mut self, acc: &mut FieldAcc, text: &str, quoted: bool, mode: Mode) {
        if quoted {
            acc.append(text, false, true);
            return;
        }
        match mode {
            Mode::Single => acc.append(text, false, false),
            Mode::Pattern => acc.append(text, true, false),
            Mode::Split => self.append_split(acc, text),
        }
    }

    fn append_split(&mut self, acc: &mut FieldAcc, text: &str) {
        let ifs = self
            .state
            .get("IFS")
            .map(|v| v.as_scalar())
            .unwrap_or_else(|| " \t\n".to_string());
        if ifs.is_empty() {
            acc.append(text, true, false);
            return;
        }
        let (leading_break, pieces, trailing_break) = split_ifs(text, &ifs);
        if leading_break {
            acc.split_break();
        }
        for (i, piece) in pieces.iter().enumerate() {
            if i > 0 {
                acc.split_break();
            }
            acc.append(piece, true, false);
        }
        if trailing_break {
            acc.split_break();
        }
    }

    async fn expand_parameter(
        &mut self,
        p: &ParamExpansion,
        quoted: bool,
        mode: Mode,
        acc: &mut FieldAcc,
    ) -> Result<(), ExpError> {
        match self.resolve_parameter(p).await? {
            ParamValue::Single(text) => {
                self.push_expansion(acc, &text, quoted, mode);
            }
            ParamValue::Fields { items, star } => {
                if quoted && star {
                    let sep = self.ifs_first();
                    let joined = items.join(&sep);
                    acc.append(&joined, false, true);
                } else if quoted && mode == Mode::Split {
                    // "$@": one field per element, kept even when empty.
                    if items.is_empty() {
                        acc.unmark_quoted_if_textless();
                    }
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            acc.split_break();
                        }
                        acc.append(item, false, true);
                    }
                } else if !quoted && mode == Mode::Split {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            acc.split_break();
                        }
                        self.append_split(acc, item);
                    }
                } else {
                    // Single-field contexts join: `x="$@"` gets spaces,
                    // `x="$*"` the first IFS character.
                    let sep = if star { self.ifs_first() } else { " ".to_string() };
                    let joined = items.join(&sep);
                    if quoted {
                        acc.append(&joined, false, true);
                    } else {
                        self.push_expansion(acc, &joined, quoted, mode);
                    }
                }
            }
        }
        Ok(())
    }

    fn ifs_first(&self) -> String {
        match self.state.get("IFS") {
            None => " ".to_string(),
            Some(v) => v.as_scalar().chars().next().map(String::from).unwrap_or_default(),
        }
    }

    /// Resolve a parameter expansion to its value, applying the operation.
    async fn resolve_parameter(&mut self, p: &ParamExpansion) -> Result<ParamValue, ExpError> {
        let base = self.resolve_base(p).await?;

        let Some(op) = p.op.as_deref() else {
            return self.finish_plain(p, base);
        };

        match op {
            ParamOp::Length => {
                let len = match &base {
                    Resolved::List(items) => items.len(),
                    Resolved::Str(s) => s.chars().count(),
                    Resolved::Unset => {
                        if self.state.options.nounset {
                            return Err(ExpError::unbound(&p.name));
                        }
                        0
                    }
                };
                Ok(ParamValue::Single(len.to_string()))
            }
            ParamOp::Default { word, colon } => {
                if base.is_absent(*colon) {
                    let fallback = self.expand_word_single_boxed(word).await?;
                    Ok(ParamValue::Single(fallback))
                } else {
                    self.finish_plain(p, base)
                }
            }
            ParamOp::Assign { word, colon } => {
                if base.is_absent(*colon) {
                    let fallback = self.expand_word_single_boxed(word).await?;
                    if !is_assignable(&p.name) {
                        return Err(ExpError::new(format!(
                            "{}: cannot assign in this way",
                            p.name
                        )));
                    }
                    self.state.set_scalar(&p.name, fallback.clone());
                    Ok(ParamValue::Single(fallback))
                } else {
                    self.finish_plain(p, base)
                }
            }
            ParamOp::Alternative { word, colon } => {
                if base.is_absent(*colon) {
                    Ok(ParamValue::Single(String::new()))
                } else {
                    let alt = self.expand_word_single_boxed(word).await?;
                    Ok(ParamValue::Single(alt))
                }
            }
            ParamOp::ErrorIfUnset { word, colon } => {
                if base.is_absent(*colon) {
                    let message = if word.parts.is_empty() {
                        format!("{}: parameter null or not set", p.name)
                    } else {
                        let msg = self.expand_word_single_boxed(word).await?;
                        format!("{}: {msg}", p.name)
                    };
                    Err(ExpError {
                        message,
                        status: 1,
                    })
                } else {
                    self.finish_plain(p, base)
                }
            }
            ParamOp::Substring { offset, length } => {
                let off = self.eval_arith_text(offset).await?;
                let len = match length {
                    Some(l) => Some(self.eval_arith_text(l).await?),
                    None => None,
                };
                match base {
                    Resolved::List(items) => {
                        // Positional slicing counts from $1: `${@:2}` starts
                        // at the second parameter.
                        let off = if (p.name == "@" || p.name == "*") && off > 0 {
                            off - 1
                        } else {
                            off
                        };
                        let sliced = slice_list(&items, off, len);
                        Ok(ParamValue::Fields {
                            items: sliced,
                            star: is_star(p),
                        })
                    }
                    other => {
                        let s = other.into_string(&p.name, self.state.options.nounset)?;
                        Ok(ParamValue::Single(slice_string(&s, off, len)))
                    }
                }
            }
            ParamOp::RemovePrefix { pattern: pat, longest } => {
                let pat = self.expand_word_pattern_boxed(pat).await?;
                self.map_value(p, base, |s| match pattern::match_prefix(&pat, &s, *longest) {
                    Some(end) => s[end..].to_string(),
                    None => s,
                })
            }
            ParamOp::RemoveSuffix { pattern: pat, longest } => {
                let pat = self.expand_word_pattern_boxed(pat).await?;
                self.map_value(p, base, |s| match pattern::match_suffix(&pat, &s, *longest) {
                    Some(start) => s[..start].to_string(),
                    None => s,
                })
            }
            ParamOp::Replace {
                pattern: pat,
                replacement,
                all,
                prefix,
                suffix,
            } => {
                let pat = self.expand_word_pattern_boxed(pat).await?;
                let rep = match replacement {
                    Some(word) => self.expand_word_single_boxed(word).await?,
                    None => String::new(),
                };
                self.map_value(p, base, |s| {
                    pattern::replace(&pat, &rep, &s, *all, *prefix, *suffix)
                })
            }
            ParamOp::CaseConvert { upper, all } => self.map_value(p, base, |s| {
                convert_case(&s, *upper, *all)
            }),
            ParamOp::Indirect => {
                let target = base.into_string(&p.name, self.state.options.nounset)?;
                if target.is_empty() {
                    return Ok(ParamValue::Single(String::new()));
                }
                let inner = ParamExpansion {
                    name: target,
                    index: None,
                    op: None,
                };
                let value = self.resolve_base(&inner).await?;
                self.finish_plain(&inner, value)
            }
            ParamOp::PrefixNames { keys_form: _ } => {
                let mut names: Vec<String> = self
                    .state
                    .variables
                    .keys()
                    .filter(|k| k.starts_with(&p.name))
                    .cloned()
                    .collect();
                names.sort();
                Ok(ParamValue::Fields {
                    items: names,
                    star: false,
                })
            }
            ParamOp::ArrayKeys => {
                let keys = match self.state.get(&p.name) {
                    Some(Value::Indexed(items)) => {
                        (0..items.len()).map(|i| i.to_string()).collect()
                    }
                    Some(Value::Assoc(map)) => map.keys().cloned().collect(),
                    Some(Value::Scalar(_)) => vec!["0".to_string()],
                    None => Vec::new(),
                };
                Ok(ParamValue::Fields {
                    items: keys,
                    star: false,
                })
            }
        }
    }

    /// Lower a resolved base value with no (or value-mapping) operation.
    fn finish_plain(&self, p: &ParamExpansion, base: Resolved) -> Result<ParamValue, ExpError> {
        match base {
            Resolved::List(items) => Ok(ParamValue::Fields {
                items,
                star: is_star(p),
            }),
            Resolved::Str(s) => Ok(ParamValue::Single(s)),
            Resolved::Unset => {
                if self.state.options.nounset {
                    Err(ExpError::unbound(&p.name))
                } else {
                    Ok(ParamValue::Single(String::new()))
                }
            }
        }
    }

    fn map_value(
        &self,
        p: &ParamExpansion,
        base: Resolved,
        f: impl Fn(String) -> String,
    ) -> Result<ParamValue, ExpError> {
        match base {
            Resolved::List(items) => Ok(ParamValue::Fields {
                items: items.into_iter().map(f).collect(),
                star: is_star(p),
            }),
            Resolved::Str(s) => Ok(ParamValue::Single(f(s))),
            Resolved::Unset => {
                if self.state.options.nounset {
                    Err(ExpError::unbound(&p.name))
                } else {
                    Ok(ParamValue::Single(String::new()))
                }
            }
        }
    }

    /// Resolve the parameter's base value, before operations.
    async fn resolve_base(&mut self, p: &ParamExpansion) -> Result<Resolved, ExpError> {
        // Special parameters first.
        if p.index.is_none() {
            match p.name.as_str() {
                "?" => return Ok(Resolved::Str(self.state.last_exit_code.to_string())),
                "$" => return Ok(Resolved::Str(self.state.pid.to_string())),
                "#" => return Ok(Resolved::Str(self.state.positional.len().to_string())),
                "!" => {
                    return Ok(match self.state.last_background_pid {
                        Some(pid) => Resolved::Str(pid.to_string()),
                        None => Resolved::Str(String::new()),
                    })
                }
                "-" => return Ok(Resolved::Str(self.option_flags())),
                "0" => return Ok(Resolved::Str(self.state.script_name.clone())),
                "@" | "*" => {
                    return Ok(Resolved::List(self.state.positional.clone()));
                }
                "RANDOM" => return Ok(Resolved::Str(self.state.next_random().to_string())),
                "SECONDS" => return Ok(Resolved::Str(self.state.seconds().to_string())),
                "PIPESTATUS" => {
                    return Ok(Resolved::Str(
                        self.state
                            .pipestatus
                            .first()
                            .map(|c| c.to_string())
                            .unwrap_or_default(),
                    ))
                }
                digits if digits.chars().all(|c| c.is_ascii_digit()) && !digits.is_empty() => {
                    let n: usize = digits.parse().map_err(|_| ExpError::new("bad positional"))?;
                    return Ok(match self.state.positional.get(n.saturating_sub(1)) {
                        _ if n == 0 => Resolved::Str(self.state.script_name.clone()),
                        Some(v) => Resolved::Str(v.clone()),
                        None => Resolved::Unset,
                    });
                }
                _ => {}
            }
        }

        let Some(index) = &p.index else {
            if p.name == "PIPESTATUS" {
                return Ok(Resolved::Str(
                    self.state
                        .pipestatus
                        .first()
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                ));
            }
            return Ok(match self.state.get(&p.name) {
                Some(value) => Resolved::Str(value.as_scalar()),
                None => Resolved::Unset,
            });
        };

        // Subscripted access.
        if index == "@" || index == "*" {
            if p.name == "PIPESTATUS" {
                return Ok(Resolved::List(
                    self.state.pipestatus.iter().map(|c| c.to_string()).collect(),
                ));
            }
            return Ok(match self.state.get(&p.name) {
                Some(Value::Indexed(items)) => Resolved::List(items.clone()),
                Some(Value::Assoc(map)) => Resolved::List(map.values().cloned().collect()),
                Some(Value::Scalar(s)) => Resolved::List(vec![s.clone()]),
                None => Resolved::List(Vec::new()),
            });
        }

        if p.name == "PIPESTATUS" {
            let idx = self.eval_arith_text(index).await?;
            let value = usize::try_from(idx)
                .ok()
                .and_then(|i| self.state.pipestatus.get(i))
                .map(|c| c.to_string());
            return Ok(match value {
                Some(v) => Resolved::Str(v),
                None => Resolved::Unset,
            });
        }

        match self.state.get(&p.name).cloned() {
            Some(Value::Indexed(items)) => {
                let idx = self.eval_arith_text(index).await?;
                let effective = if idx < 0 {
                    idx + items.len() as i64
                } else {
                    idx
                };
                Ok(match usize::try_from(effective).ok().and_then(|i| items.get(i)) {
                    Some(v) => Resolved::Str(v.clone()),
                    None => Resolved::Unset,
                })
            }
            Some(Value::Assoc(map)) => {
                let key = self.expand_text(index).await?;
                Ok(match map.get(&key) {
                    Some(v) => Resolved::Str(v.clone()),
                    None => Resolved::Unset,
                })
            }
            Some(Value::Scalar(s)) => {
                // A scalar behaves as an array with one element at index 0.
                let idx = self.eval_arith_text(index).await?;
                Ok(if idx == 0 {
                    Resolved::Str(s)
                } else {
                    Resolved::Unset
                })
            }
            None => Ok(Resolved::Unset),
        }
    }

    fn option_flags(&self) -> String {
        let mut flags = String::new();
        if self.state.options.errexit {
            flags.push('e');
        }
        if self.state.options.noglob {
            flags.push('f');
        }
        if self.state.options.nounset {
            flags.push('u');
        }
        if self.state.options.xtrace {
            flags.push('x');
        }
        if self.state.options.noclobber {
            flags.push('C');
        }
        flags.push('h');
        flags
    }

    /// Boxed trampoline: parameter operations recurse into word expansion.
    fn expand_word_single_boxed<'a>(
        &'a mut self,
        word: &'a Word,
    ) -> Pin<Box<dyn Future<Output = Result<String, ExpError>> + Send + 'a>> {
        Box::pin(self.expand_word_single(word))
    }

    fn expand_word_pattern_boxed<'a>(
        &'a mut self,
        word: &'a Word,
    ) -> Pin<Box<dyn Future<Output = Result<String, ExpError>> + Send + 'a>> {
        Box::pin(self.expand_word_pattern(word))
    }

    /// Run a command substitution on a snapshot child. Its stderr joins the
    /// enclosing command's stderr; its exit code feeds `$?` for
    /// assignment-only commands.
    pub(crate) async fn run_substitution(&mut self, script: &Script) -> Result<String, ExpError> {
        if self.depth >= self.limits.max_subshell_depth {
            return Err(ExpError::new("maximum substitution depth exceeded"));
        }
        let mut child = self.subshell();
        let result = child.run_script_boxed(script).await;
        self.pending_stderr.push_str(&result.stderr);
        self.last_substitution_status = Some(result.exit_code);
        Ok(result.stdout)
    }

    /// Prepare a process substitution and return its path.
    async fn setup_process_sub(
        &mut self,
        output: bool,
        body: &Script,
    ) -> Result<String, ExpError> {
        let fd = self.state.next_proc_fd;
        self.state.next_proc_fd += 1;
        let path = PathBuf::from(format!("/dev/fd/{fd}"));
        let _ = self.fs.mkdir(std::path::Path::new("/dev/fd"), true).await;
        if output {
            self.fs
                .write_file(&path, b"")
                .await
                .map_err(|e| ExpError::new(e.to_string()))?;
            self.procsub_pending.push((path.clone(), body.clone()));
        } else {
            let captured = self.run_substitution(body).await?;
            self.fs
                .write_file(&path, captured.as_bytes())
                .await
                .map_err(|e| ExpError::new(e.to_string()))?;
        }
        Ok(path.to_string_lossy().to_string())
    }

    /// Pathname expansion of a pattern against the VFS. Results are sorted;
    /// empty when nothing matches.
    pub(crate) async fn glob_expand(&mut self, pat: &str) -> Vec<String> {
        let absolute = pat.starts_with('/');
        let components: Vec<&str> = pat.split('/').filter(|c| !c.is_empty()).collect();
        let trailing_dir = pat.ends_with('/') && pat.len() > 1;
        let mut prefixes: Vec<String> = vec![if absolute {
            "/".to_string()
        } else {
            String::new()
        }];

        for (i, comp) in components.iter().enumerate() {
            let last = i + 1 == components.len();
            let mut next: Vec<String> = Vec::new();
            for prefix in &prefixes {
                if pattern::has_glob_chars(comp) {
                    let dir = self.glob_dir_path(prefix);
                    let Ok(entries) = self.fs.read_dir(&dir).await else {
                        continue;
                    };
                    let hidden_ok = self.state.shopt.dotglob
                        || comp.starts_with('.')
                        || comp.starts_with("\\.");
                    for entry in entries {
                        if entry.name.starts_with('.') && !hidden_ok {
                            continue;
                        }
                        if !pattern::match_glob(comp, &entry.name) {
                            continue;
                        }
                        if (last && trailing_dir || !last) && !entry.metadata.file_type.is_dir() {
                            continue;
                        }
                        next.push(join_glob(prefix, &entry.name));
                    }
                } else {
                    let literal = pattern::unescape(comp);
                    let candidate = join_glob(prefix, &literal);
                    let full = self.glob_dir_path(&candidate);
                    if self.fs.exists(&full).await.unwrap_or(false) {
                        if !last {
                            next.push(candidate);
                        } else if !trailing_dir
                            || self
                                .fs
                                .stat(&full)
                                .await
                                .map(|m| m.file_type.is_dir())
                                .unwrap_or(false)
                        {
                            next.push(candidate);
                        }
                    }
                }
            }
            prefixes = next;
            if prefixes.is_empty() {
                return Vec::new();
            }
        }

        let mut results: Vec<String> = prefixes
            .into_iter()
            .filter(|p| !p.is_empty() && p != "/")
            .map(|p| if trailing_dir { format!("{p}/") } else { p })
            .collect();
        results.sort();
        results
    }

    /// Absolute path for a glob prefix, for VFS calls.
    fn glob_dir_path(&self, prefix: &str) -> PathBuf {
        if prefix.is_empty() {
            self.state.cwd.clone()
        } else if prefix.starts_with('/') {
            PathBuf::from(prefix)
        } else {
            self.state.cwd.join(prefix)
        }
    }
}

fn join_glob(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix == "/" {
        format!("/{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

fn is_star(p: &ParamExpansion) -> bool {
    p.name == "*" || p.index.as_deref() == Some("*")
}

fn is_assignable(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
enum Resolved {
    Unset,
    Str(String),
    List(Vec<String>),
}

impl Resolved {
    /// `:`-qualified operations treat empty like unset.
    fn is_absent(&self, colon: bool) -> bool {
        match self {
            Resolved::Unset => true,
            Resolved::Str(s) => colon && s.is_empty(),
            Resolved::List(items) => colon && items.is_empty(),
        }
    }

    fn into_string(self, name: &str, nounset: bool) -> Result<String, ExpError> {
        match self {
            Resolved::Str(s) => Ok(s),
            Resolved::List(items) => Ok(items.join(" ")),
            Resolved::Unset => {
                if nounset {
                    Err(ExpError::unbound(name))
                } else {
                    Ok(String::new())
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum ParamValue {
    Single(String),
    Fields { items: Vec<String>, star: bool },
}

/// `${v:off:len}` on strings; negative offsets count from the end,
/// negative lengths bound the end position.
fn slice_string(s: &str, off: i64, len: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len() as i64;
    let start = if off < 0 { (n + off).max(0) } else { off.min(n) };
    let end = match len {
        None => n,
        Some(l) if l < 0 => (n + l).max(start),
        Some(l) => (start + l).min(n),
    };
    chars[start as usize..end as usize].iter().collect()
}

/// `${@:off:len}` on lists.
fn slice_list(items: &[String], off: i64, len: Option<i64>) -> Vec<String> {
    let n = items.len() as i64;
    let start = if off < 0 { (n + off).max(0) } else { off.min(n) };
    let end = match len {
        None => n,
        Some(l) if l < 0 => n,
        Some(l) => (start + l).min(n),
    };
    items[start as usize..end as usize].to_vec()
}

fn convert_case(s: &str, upper: bool, all: bool) -> String {
    if all {
        if upper {
            s.to_uppercase()
        } else {
            s.to_lowercase()
        }
    } else {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let converted: String = if upper {
                    first.to_uppercase().collect()
                } else {
                    first.to_lowercase().collect()
                };
                format!("{converted}{}", chars.as_str())
            }
        }
    }
}

/// POSIX field splitting. Returns `(leading_break, pieces, trailing_break)`:
/// whitespace-IFS runs collapse, non-whitespace IFS characters each delimit
/// one field (possibly empty), and a trailing delimiter closes the last
/// field without opening a new one.
fn split_ifs(text: &str, ifs: &str) -> (bool, Vec<String>, bool) {
    let ws: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
    let hard: Vec<char> = ifs.chars().filter(|c| !c.is_whitespace()).collect();

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut consumed_any = false;
    let mut leading_break = false;
    let mut trailing_break = false;
    // A whitespace run just closed a field; a following hard delimiter
    // merges with it instead of producing an empty field.
    let mut ws_split_pending = false;

    for c in text.chars() {
        if hard.contains(&c) {
            if ws_split_pending {
                ws_split_pending = false;
            } else {
                pieces.push(std::mem::take(&mut current));
            }
            trailing_break = true;
            consumed_any = true;
        } else if ws.contains(&c) {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                ws_split_pending = true;
            } else if !consumed_any && pieces.is_empty() {
                leading_break = true;
            }
            trailing_break = true;
        } else {
            current.push(c);
            consumed_any = true;
            ws_split_pending = false;
            trailing_break = false;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
        trailing_break = false;
    }
    (leading_break, pieces, trailing_break)
}


/// Brace expansion: each `Brace` part multiplies the word.
fn expand_braces(word: &Word) -> Vec<Word> {
    let Some(pos) = word
        .parts
        .iter()
        .position(|p| matches!(p, WordPart::Brace(_)))
    else {
        return vec![word.clone()];
    };
    let WordPart::Brace(expr) = &word.parts[pos] else {
        unreachable!();
    };

    let alternatives: Vec<Vec<WordPart>> = match expr {
        BraceExpr::Items(items) => items.iter().map(|w| w.parts.clone()).collect(),
        BraceExpr::Range { start, end, step } => {
            number_range(*start, *end, *step)
                .into_iter()
                .map(|n| vec![WordPart::Literal(n.to_string())])
                .collect()
        }
        BraceExpr::CharRange { start, end, step } => {
            number_range(*start as i64, *end as i64, *step)
                .into_iter()
                .filter_map(|n| u32::try_from(n).ok().and_then(char::from_u32))
                .map(|c| vec![WordPart::Literal(c.to_string())])
                .collect()
        }
    };

    let mut out = Vec::new();
    for alt in alternatives {
        let mut parts = Vec::new();
        parts.extend_from_slice(&word.parts[..pos]);
        parts.extend(alt);
        parts.extend_from_slice(&word.parts[pos + 1..]);
        // Remaining braces (in the suffix or spliced from the item) expand
        // recursively.
        out.extend(expand_braces(&Word { parts }));
    }
    out
}

// Brace ranges are bounded; a hostile `{1..9999999999}` must not exhaust
// memory.
const MAX_BRACE_ITEMS: usize = 100_000;

fn number_range(start: i64, end: i64, step: i64) -> Vec<i64> {
    let step = if step == 0 { 1 } else { step.abs() };
    let mut out = Vec::new();
    if start <= end {
        let mut n = start;
        while n <= end && out.len() < MAX_BRACE_ITEMS {
            out.push(n);
            n = n.saturating_add(step);
        }
    } else {
        let mut n = start;
        while n >= end && out.len() < MAX_BRACE_ITEMS {
            out.push(n);
            n = n.saturating_sub(step);
        }
    }
    out
}

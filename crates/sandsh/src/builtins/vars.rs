//! Variable and option builtins: export, unset, set, shopt, declare,
//! readonly, local, read.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::{ExecResult, Value};

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_assign(arg: &str) -> (&str, Option<&str>) {
    match arg.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (arg, None),
    }
}

/// export - mark variables for the environment of commands.
pub struct Export;

#[async_trait]
impl Builtin for Export {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() || ctx.args[0] == "-p" {
            let mut out = String::new();
            let mut names: Vec<&String> = ctx.state.exported.iter().collect();
            names.sort();
            for name in names {
                let value = ctx.state.get_scalar(name);
                out.push_str(&format!("declare -x {name}=\"{value}\"\n"));
            }
            return Ok(ExecResult::ok(out));
        }
        for arg in ctx.args {
            let (name, value) = split_assign(arg);
            if !is_name(name) {
                return Ok(ExecResult::err(
                    format!("export: `{arg}': not a valid identifier\n"),
                    1,
                ));
            }
            if let Some(value) = value {
                if ctx.state.is_readonly(name) {
                    return Ok(ExecResult::err(
                        format!("export: {name}: readonly variable\n"),
                        1,
                    ));
                }
                ctx.state.set_scalar(name, value);
            }
            ctx.state.exported.insert(name.to_string());
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: export [-p] [name[=value] ...]"
    }
}

/// unset - remove variables or functions.
pub struct Unset;

#[async_trait]
impl Builtin for Unset {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut functions_only = false;
        let mut names = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-f" => functions_only = true,
                "-v" => functions_only = false,
                _ => names.push(arg.clone()),
            }
        }
        for name in names {
            if functions_only {
                ctx.state.functions.remove(&name);
            } else if ctx.state.is_readonly(&name) {
                return Ok(ExecResult::err(
                    format!("unset: {name}: cannot unset: readonly variable\n"),
                    1,
                ));
            } else {
                ctx.state.unset(&name);
            }
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: unset [-fv] name ..."
    }
}

/// set - toggle shell options or replace the positional parameters.
pub struct Set;

#[async_trait]
impl Builtin for Set {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() {
            let mut out = String::new();
            let mut vars: Vec<(&String, &Value)> = ctx.state.variables.iter().collect();
            vars.sort_by_key(|(name, _)| name.as_str());
            for (name, value) in vars {
                out.push_str(&format!("{name}={}\n", value.as_scalar()));
            }
            return Ok(ExecResult::ok(out));
        }

        let mut iter = ctx.args.iter();
        while let Some(arg) = iter.next() {
            let (enable, rest) = match arg.as_str() {
                "--" => {
                    let params: Vec<String> = iter.cloned().collect();
                    ctx.state.positional = params;
                    return Ok(ExecResult::code(0));
                }
                s if s.starts_with('-') => (true, &s[1..]),
                s if s.starts_with('+') => (false, &s[1..]),
                _ => {
                    // Remaining words replace the positional parameters.
                    let mut params = vec![arg.clone()];
                    params.extend(iter.cloned());
                    ctx.state.positional = params;
                    return Ok(ExecResult::code(0));
                }
            };
            if rest == "o" {
                let Some(name) = iter.next() else {
                    return Ok(ExecResult::err("set: -o: option name required\n", 2));
                };
                if !set_named_option(ctx, name, enable) {
                    return Ok(ExecResult::err(
                        format!("set: {name}: invalid option name\n"),
                        2,
                    ));
                }
                continue;
            }
            for flag in rest.chars() {
                match flag {
                    'e' => ctx.state.options.errexit = enable,
                    'u' => ctx.state.options.nounset = enable,
                    'x' => ctx.state.options.xtrace = enable,
                    'f' => ctx.state.options.noglob = enable,
                    'C' => ctx.state.options.noclobber = enable,
                    other => {
                        return Ok(ExecResult::err(
                            format!("set: -{other}: invalid option\n"),
                            2,
                        ))
                    }
                }
            }
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: set [-eufxC] [-o option] [+...] [--] [arg ...]"
    }
}

fn set_named_option(ctx: &mut Context<'_>, name: &str, enable: bool) -> bool {
    match name {
        "errexit" => ctx.state.options.errexit = enable,
        "nounset" => ctx.state.options.nounset = enable,
        "pipefail" => ctx.state.options.pipefail = enable,
        "noclobber" => ctx.state.options.noclobber = enable,
        "noglob" => ctx.state.options.noglob = enable,
        "xtrace" => ctx.state.options.xtrace = enable,
        _ => return false,
    }
    true
}

/// shopt - bash-style option toggles.
pub struct Shopt;

#[async_trait]
impl Builtin for Shopt {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut mode: Option<bool> = None;
        let mut quiet = false;
        let mut names = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-s" => mode = Some(true),
                "-u" => mode = Some(false),
                "-q" => quiet = true,
                _ => names.push(arg.clone()),
            }
        }

        let mut out = String::new();
        let mut status = 0;
        if names.is_empty() {
            for (name, value) in [
                ("dotglob", ctx.state.shopt.dotglob),
                ("failglob", ctx.state.shopt.failglob),
                ("lastpipe", ctx.state.shopt.lastpipe),
                ("nullglob", ctx.state.shopt.nullglob),
            ] {
                out.push_str(&format!(
                    "{name}\t{}\n",
                    if value { "on" } else { "off" }
                ));
            }
            return Ok(ExecResult::ok(out));
        }

        for name in &names {
            let slot: Option<&mut bool> = match name.as_str() {
                "nullglob" => Some(&mut ctx.state.shopt.nullglob),
                "failglob" => Some(&mut ctx.state.shopt.failglob),
                "dotglob" => Some(&mut ctx.state.shopt.dotglob),
                "lastpipe" => Some(&mut ctx.state.shopt.lastpipe),
                _ => None,
            };
            let Some(slot) = slot else {
                out.push_str(&format!("shopt: {name}: invalid shell option name\n"));
                status = 1;
                continue;
            };
            match mode {
                Some(value) => *slot = value,
                None => {
                    if !*slot {
                        status = 1;
                    }
                    if !quiet {
                        out.push_str(&format!(
                            "{name}\t{}\n",
                            if *slot { "on" } else { "off" }
                        ));
                    }
                }
            }
        }
        Ok(ExecResult::with_code(out, status))
    }

    fn usage(&self) -> &'static str {
        "usage: shopt [-squ] [optname ...]"
    }
}

/// declare / typeset - declare variables with attributes.
pub struct Declare;

#[async_trait]
impl Builtin for Declare {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut indexed = false;
        let mut assoc = false;
        let mut print = false;
        let mut export = false;
        let mut names = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-a" => indexed = true,
                "-A" => assoc = true,
                "-p" => print = true,
                "-x" => export = true,
                "-i" | "-r" | "-l" | "-u" => {}
                _ => names.push(arg.clone()),
            }
        }

        if print || names.is_empty() {
            let mut out = String::new();
            let targets: Vec<String> = if names.is_empty() {
                let mut all: Vec<String> = ctx.state.variables.keys().cloned().collect();
                all.sort();
                all
            } else {
                names.clone()
            };
            for name in targets {
                match ctx.state.get(&name) {
                    Some(Value::Scalar(s)) => {
                        out.push_str(&format!("declare -- {name}=\"{s}\"\n"))
                    }
                    Some(Value::Indexed(items)) => {
                        let rendered: Vec<String> = items
                            .iter()
                            .enumerate()
                            .map(|(i, v)| format!("[{i}]=\"{v}\""))
                            .collect();
                        out.push_str(&format!(
                            "declare -a {name}=({})\n",
                            rendered.join(" ")
                        ));
                    }
                    Some(Value::Assoc(map)) => {
                        let rendered: Vec<String> = map
                            .iter()
                            .map(|(k, v)| format!("[{k}]=\"{v}\""))
                            .collect();
                        out.push_str(&format!(
                            "declare -A {name}=({})\n",
                            rendered.join(" ")
                        ));
                    }
                    None => {
                        out.push_str(&format!("declare: {name}: not found\n"));
                    }
                }
            }
            return Ok(ExecResult::ok(out));
        }

        for arg in names {
            let (name, value) = split_assign(&arg);
            if !is_name(name) {
                return Ok(ExecResult::err(
                    format!("declare: `{arg}': not a valid identifier\n"),
                    1,
                ));
            }
            if assoc {
                if !matches!(ctx.state.get(name), Some(Value::Assoc(_))) {
                    ctx.state.set(name, Value::Assoc(BTreeMap::new()));
                }
            } else if indexed {
                if !matches!(ctx.state.get(name), Some(Value::Indexed(_))) {
                    ctx.state.set(name, Value::Indexed(Vec::new()));
                }
            }
            if let Some(value) = value {
                if assoc || indexed {
                    // Plain text after `=` seeds element 0 / key 0.
                    if assoc {
                        let mut map = BTreeMap::new();
                        map.insert("0".to_string(), value.to_string());
                        ctx.state.set(name, Value::Assoc(map));
                    } else {
                        ctx.state.set(name, Value::Indexed(vec![value.to_string()]));
                    }
                } else {
                    ctx.state.set_scalar(name, value);
                }
            }
            if export {
                ctx.state.exported.insert(name.to_string());
            }
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: declare [-aApx] [name[=value] ...]"
    }
}

/// readonly - mark variables immutable.
pub struct Readonly;

#[async_trait]
impl Builtin for Readonly {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() || ctx.args[0] == "-p" {
            let mut out = String::new();
            let mut names: Vec<&String> = ctx.state.readonly.iter().collect();
            names.sort();
            for name in names {
                out.push_str(&format!(
                    "declare -r {name}=\"{}\"\n",
                    ctx.state.get_scalar(name)
                ));
            }
            return Ok(ExecResult::ok(out));
        }
        for arg in ctx.args {
            let (name, value) = split_assign(arg);
            if !is_name(name) {
                return Ok(ExecResult::err(
                    format!("readonly: `{arg}': not a valid identifier\n"),
                    1,
                ));
            }
            if let Some(value) = value {
                if ctx.state.is_readonly(name) {
                    return Ok(ExecResult::err(
                        format!("readonly: {name}: readonly variable\n"),
                        1,
                    ));
                }
                ctx.state.set_scalar(name, value);
            }
            ctx.state.readonly.insert(name.to_string());
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: readonly [-p] [name[=value] ...]"
    }
}

/// local - declare function-scoped variables.
pub struct Local;

#[async_trait]
impl Builtin for Local {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        if ctx.state.local_frames.is_empty() {
            return Ok(ExecResult::err(
                "local: can only be used in a function\n",
                1,
            ));
        }
        for arg in ctx.args {
            let (name, value) = split_assign(arg);
            if !is_name(name) {
                return Ok(ExecResult::err(
                    format!("local: `{arg}': not a valid identifier\n"),
                    1,
                ));
            }
            ctx.state.declare_local(name);
            match value {
                Some(value) => ctx.state.set_scalar(name, value),
                None => ctx.state.set_scalar(name, ""),
            }
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: local name[=value] ..."
    }
}

/// read - read a line of stdin into variables.
///
/// `-r` disables backslash processing. The line is split by IFS; the last
/// variable receives the remainder. Without variables, `REPLY` is set.
pub struct Read;

#[async_trait]
impl Builtin for Read {
    async fn execute(&self, ctx: &mut Context<'_>) -> Result<ExecResult> {
        let mut raw = false;
        let mut vars = Vec::new();
        for arg in ctx.args {
            match arg.as_str() {
                "-r" => raw = true,
                _ => vars.push(arg.clone()),
            }
        }

        let Some(mut line) = ctx.read_line() else {
            // End of input: variables are cleared, status is failure.
            for var in &vars {
                ctx.state.set_scalar(var, "");
            }
            return Ok(ExecResult::code(1));
        };
        if !raw {
            line = unescape_backslashes(&line);
        }

        if vars.is_empty() {
            ctx.state.set_scalar("REPLY", line);
            return Ok(ExecResult::code(0));
        }

        let ifs = ctx.state.get_scalar("IFS");
        let ifs = if ifs.is_empty() && ctx.state.get("IFS").is_none() {
            " \t\n".to_string()
        } else {
            ifs
        };
        let trimmed = line.trim_matches(|c: char| ifs.contains(c) && c.is_whitespace());
        let mut fields: Vec<&str> = if ifs.is_empty() {
            vec![trimmed]
        } else {
            trimmed
                .splitn(vars.len(), |c: char| ifs.contains(c))
                .collect()
        };
        while fields.len() < vars.len() {
            fields.push("");
        }
        for (var, field) in vars.iter().zip(fields) {
            ctx.state.set_scalar(var, field);
        }
        Ok(ExecResult::code(0))
    }

    fn usage(&self) -> &'static str {
        "usage: read [-r] [name ...]"
    }
}

fn unescape_backslashes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.next() {
                out.push(n);
            }
        } else {
            out.push(c);
        }
    }
    out
}

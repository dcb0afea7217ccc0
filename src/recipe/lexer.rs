// src/recipe/lexer.rs

//! Quote-aware scanning of PKGBUILD text
//!
//! This is not a shell parser. It knows just enough about quoting,
//! expansions, comments, line continuations and heredocs to cut a recipe
//! into logical statements and to find characters that sit outside any
//! quoted or expanded region.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Single,
    Double,
    Backtick,
    CmdSub,
    Arith,
    Param,
    Array,
    Group,
}

impl Ctx {
    fn describe(self) -> &'static str {
        match self {
            Ctx::Single => "single-quoted string",
            Ctx::Double => "double-quoted string",
            Ctx::Backtick => "backtick substitution",
            Ctx::CmdSub => "command substitution",
            Ctx::Arith => "arithmetic expression",
            Ctx::Param => "parameter expansion",
            Ctx::Array => "array literal",
            Ctx::Group => "parenthesized group",
        }
    }
}

/// A heredoc waiting for its body after the current line ends
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
}

fn at_word_start(cur: &str) -> bool {
    match cur.chars().last() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, ';' | '&' | '|' | '('),
    }
}

/// Split recipe text into logical statements
///
/// Comments are dropped, backslash-newline continuations are joined,
/// newlines inside array literals become spaces. Newlines inside quotes,
/// substitutions and heredoc bodies are kept, so a returned statement may
/// still span several physical lines. Blank statements are returned as
/// empty strings so callers can preserve paragraph breaks.
pub fn logical_lines(text: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut lines = Vec::new();
    let mut cur = String::new();
    let mut stack: Vec<Ctx> = Vec::new();
    let mut heredocs: Vec<PendingHeredoc> = Vec::new();
    let mut i = 0;

    let peek = |idx: usize| -> Option<char> { chars.get(idx).copied() };

    while i < n {
        let c = chars[i];
        let top = stack.last().copied();

        match top {
            Some(Ctx::Single) => {
                cur.push(c);
                if c == '\'' {
                    stack.pop();
                }
                i += 1;
            }
            Some(Ctx::Double) | Some(Ctx::Backtick) | Some(Ctx::Param) => {
                let closer = match top {
                    Some(Ctx::Double) => '"',
                    Some(Ctx::Backtick) => '`',
                    _ => '}',
                };
                match c {
                    '\\' => {
                        if peek(i + 1) == Some('\n') {
                            i += 2;
                        } else {
                            cur.push(c);
                            if let Some(next) = peek(i + 1) {
                                cur.push(next);
                            }
                            i += 2;
                        }
                    }
                    _ if c == closer => {
                        cur.push(c);
                        stack.pop();
                        i += 1;
                    }
                    '$' if peek(i + 1) == Some('(') && top != Some(Ctx::Backtick) => {
                        if peek(i + 2) == Some('(') {
                            cur.push_str("$((");
                            stack.push(Ctx::Arith);
                            i += 3;
                        } else {
                            cur.push_str("$(");
                            stack.push(Ctx::CmdSub);
                            i += 2;
                        }
                    }
                    '$' if peek(i + 1) == Some('{') && top != Some(Ctx::Backtick) => {
                        cur.push_str("${");
                        stack.push(Ctx::Param);
                        i += 2;
                    }
                    '"' if top == Some(Ctx::Param) => {
                        cur.push(c);
                        stack.push(Ctx::Double);
                        i += 1;
                    }
                    '\'' if top == Some(Ctx::Param) && !stack.contains(&Ctx::Double) => {
                        cur.push(c);
                        stack.push(Ctx::Single);
                        i += 1;
                    }
                    _ => {
                        cur.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                // Shell mode: top level, command substitution, arithmetic, arrays, groups
                match c {
                    '\\' => {
                        if peek(i + 1) == Some('\n') {
                            i += 2;
                            let mut had_space = false;
                            while matches!(peek(i), Some(' ') | Some('\t')) {
                                had_space = true;
                                i += 1;
                            }
                            if had_space && !cur.is_empty() && !cur.ends_with([' ', '\t']) {
                                cur.push(' ');
                            }
                        } else {
                            cur.push(c);
                            if let Some(next) = peek(i + 1) {
                                cur.push(next);
                            }
                            i += 2;
                        }
                    }
                    '\'' => {
                        cur.push(c);
                        stack.push(Ctx::Single);
                        i += 1;
                    }
                    '"' => {
                        cur.push(c);
                        stack.push(Ctx::Double);
                        i += 1;
                    }
                    '`' => {
                        cur.push(c);
                        stack.push(Ctx::Backtick);
                        i += 1;
                    }
                    '$' if peek(i + 1) == Some('(') => {
                        if peek(i + 2) == Some('(') {
                            cur.push_str("$((");
                            stack.push(Ctx::Arith);
                            i += 3;
                        } else {
                            cur.push_str("$(");
                            stack.push(Ctx::CmdSub);
                            i += 2;
                        }
                    }
                    '$' if peek(i + 1) == Some('{') => {
                        cur.push_str("${");
                        stack.push(Ctx::Param);
                        i += 2;
                    }
                    '(' => {
                        if top == Some(Ctx::Arith) {
                            stack.push(Ctx::Group);
                            cur.push(c);
                            i += 1;
                        } else if peek(i + 1) == Some('(') && at_word_start(&cur) {
                            cur.push_str("((");
                            stack.push(Ctx::Arith);
                            i += 2;
                        } else if cur.ends_with('=') {
                            cur.push(c);
                            stack.push(Ctx::Array);
                            i += 1;
                        } else {
                            cur.push(c);
                            stack.push(Ctx::Group);
                            i += 1;
                        }
                    }
                    ')' => match top {
                        Some(Ctx::Arith) if peek(i + 1) == Some(')') => {
                            cur.push_str("))");
                            stack.pop();
                            i += 2;
                        }
                        Some(Ctx::CmdSub) | Some(Ctx::Array) | Some(Ctx::Group) => {
                            cur.push(c);
                            stack.pop();
                            i += 1;
                        }
                        _ => {
                            // Stray closer, e.g. a case pattern
                            cur.push(c);
                            i += 1;
                        }
                    },
                    '#' if top != Some(Ctx::Arith) && at_word_start(&cur) => {
                        while i < n && chars[i] != '\n' {
                            i += 1;
                        }
                    }
                    '<' if top != Some(Ctx::Arith) && peek(i + 1) == Some('<') => {
                        if peek(i + 2) == Some('<') {
                            cur.push_str("<<<");
                            i += 3;
                            continue;
                        }
                        cur.push_str("<<");
                        i += 2;
                        let mut strip_tabs = false;
                        if peek(i) == Some('-') {
                            strip_tabs = true;
                            cur.push('-');
                            i += 1;
                        }
                        while matches!(peek(i), Some(' ') | Some('\t')) {
                            cur.push(chars[i]);
                            i += 1;
                        }
                        let mut delimiter = String::new();
                        while let Some(d) = peek(i) {
                            if d.is_whitespace() || matches!(d, ';' | '&' | '|' | '<' | '>' | ')')
                            {
                                break;
                            }
                            cur.push(d);
                            if !matches!(d, '\'' | '"' | '\\') {
                                delimiter.push(d);
                            }
                            i += 1;
                        }
                        if delimiter.is_empty() {
                            return Err(Error::ParseError(
                                "heredoc operator without delimiter".to_string(),
                            ));
                        }
                        heredocs.push(PendingHeredoc {
                            delimiter,
                            strip_tabs,
                        });
                    }
                    '\n' => match top {
                        Some(Ctx::Array) => {
                            if !cur.ends_with([' ', '\t', '(']) {
                                cur.push(' ');
                            }
                            i += 1;
                        }
                        Some(_) => {
                            cur.push(c);
                            i += 1;
                        }
                        None => {
                            i += 1;
                            if !heredocs.is_empty() {
                                i = read_heredocs(&chars, i, &mut cur, &mut heredocs)?;
                            }
                            lines.push(std::mem::take(&mut cur));
                        }
                    },
                    _ => {
                        cur.push(c);
                        i += 1;
                    }
                }
            }
        }
    }

    if let Some(ctx) = stack.last() {
        return Err(Error::ParseError(format!(
            "unterminated {} at end of recipe",
            ctx.describe()
        )));
    }

    if let Some(heredoc) = heredocs.first() {
        return Err(Error::ParseError(format!(
            "heredoc '{}' is never terminated",
            heredoc.delimiter
        )));
    }

    if !cur.trim().is_empty() {
        lines.push(cur);
    }

    Ok(lines)
}

/// Append heredoc bodies verbatim to `cur`, returning the new position
fn read_heredocs(
    chars: &[char],
    mut i: usize,
    cur: &mut String,
    heredocs: &mut Vec<PendingHeredoc>,
) -> Result<usize> {
    let n = chars.len();

    for heredoc in heredocs.drain(..) {
        loop {
            if i >= n {
                return Err(Error::ParseError(format!(
                    "heredoc '{}' is never terminated",
                    heredoc.delimiter
                )));
            }

            let start = i;
            while i < n && chars[i] != '\n' {
                i += 1;
            }
            let line: String = chars[start..i].iter().collect();
            if i < n {
                i += 1;
            }

            cur.push('\n');
            cur.push_str(&line);

            let candidate = if heredoc.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line.as_str()
            };

            if candidate == heredoc.delimiter {
                break;
            }
        }
    }

    Ok(i)
}

/// Byte offsets of characters outside every quote or expansion
///
/// Scanning stops at the end of the first physical line that opens a
/// heredoc, since everything after it is heredoc body.
pub fn top_level_chars(text: &str) -> Vec<(usize, char)> {
    let mut result = Vec::new();
    let mut stack: Vec<Ctx> = Vec::new();
    let mut heredoc_open = false;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        let top = stack.last().copied();

        match top {
            Some(Ctx::Single) => {
                if c == '\'' {
                    stack.pop();
                }
            }
            Some(_) => match c {
                '\\' => {
                    iter.next();
                }
                '\'' if top == Some(Ctx::Param) && !stack.contains(&Ctx::Double) => {
                    stack.push(Ctx::Single)
                }
                '"' if top == Some(Ctx::Double) => {
                    stack.pop();
                }
                '"' => stack.push(Ctx::Double),
                '`' if top == Some(Ctx::Backtick) => {
                    stack.pop();
                }
                '}' if top == Some(Ctx::Param) => {
                    stack.pop();
                }
                ')' if top == Some(Ctx::CmdSub) => {
                    stack.pop();
                }
                '(' if top == Some(Ctx::CmdSub) => stack.push(Ctx::CmdSub),
                '$' => match iter.peek() {
                    Some((_, '(')) => {
                        iter.next();
                        stack.push(Ctx::CmdSub);
                    }
                    Some((_, '{')) => {
                        iter.next();
                        stack.push(Ctx::Param);
                    }
                    _ => {}
                },
                '\'' if top == Some(Ctx::CmdSub) => stack.push(Ctx::Single),
                _ => {}
            },
            None => match c {
                '\\' => {
                    iter.next();
                }
                '\'' => stack.push(Ctx::Single),
                '"' => stack.push(Ctx::Double),
                '`' => stack.push(Ctx::Backtick),
                '$' => match iter.peek() {
                    Some((_, '(')) => {
                        iter.next();
                        stack.push(Ctx::CmdSub);
                    }
                    Some((_, '{')) => {
                        iter.next();
                        stack.push(Ctx::Param);
                    }
                    _ => result.push((idx, c)),
                },
                '<' if matches!(iter.peek(), Some((_, '<'))) => {
                    iter.next();
                    if matches!(iter.peek(), Some((_, '<'))) {
                        iter.next();
                    } else {
                        heredoc_open = true;
                    }
                }
                '\n' if heredoc_open => break,
                _ => result.push((idx, c)),
            },
        }
    }

    result
}

/// Split text into words on whitespace that is outside quotes and expansions
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    let top_level = top_level_chars(text);
    let mut breaks = top_level
        .iter()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(idx, _)| *idx)
        .peekable();

    for (idx, _) in text.char_indices() {
        if breaks.peek() == Some(&idx) {
            breaks.next();
            if let Some(s) = start.take() {
                words.push(text[s..idx].to_string());
            }
            continue;
        }
        if start.is_none() {
            start = Some(idx);
        }
    }

    if let Some(s) = start {
        words.push(text[s..].to_string());
    }

    words
}

/// Quote a value for a single-quoted shell word
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// src/recipe/canonical.rs

//! Canonical one-statement-per-line form of a PKGBUILD
//!
//! Canonicalization strips comments, joins continuations, reflows array
//! literals onto a single line and rewrites every function as
//!
//! ```bash
//! name() {
//!     statement
//! }
//! ```
//!
//! with one body statement per line. Heredoc bodies and multi-line quoted
//! strings are kept verbatim. Running it twice gives the same text.

use crate::error::{Error, Result};
use crate::recipe::lexer::{logical_lines, split_words, top_level_chars};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static FUNCTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:function\s+)?([A-Za-z_][A-Za-z0-9_.@+:-]*)\s*\(\s*\)\s*(.*)$")
        .expect("valid regex")
});

static FUNCTION_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^function\s+([A-Za-z_][A-Za-z0-9_.@+:-]*)\s*(.*)$").expect("valid regex")
});

static ARRAY_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)(\+?=)\((.*)\)$").expect("valid regex")
});

const BODY_INDENT: &str = "    ";

/// One top-level element of a canonical recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Paragraph break between statements
    Blank,
    /// A single top-level statement, possibly spanning lines if it carries
    /// a heredoc or a multi-line quoted string
    Statement(String),
    Function(Function),
}

/// A function block with its body split into statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub body: Vec<String>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: Vec::new(),
        }
    }

    /// Body statements joined by newlines
    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Replace the body with the statements of `text`
    ///
    /// Heredocs and multi-line quoted strings stay one statement, with
    /// their inner lines untouched.
    pub fn set_body_text(&mut self, text: &str) -> Result<()> {
        self.body = logical_lines(text)?
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(normalize_statement)
            .collect();
        Ok(())
    }
}

/// A recipe in canonical form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    pub items: Vec<Item>,
}

impl Recipe {
    /// Parse recipe text into canonical items
    pub fn parse(text: &str) -> Result<Self> {
        let lines = logical_lines(text)?;
        let mut items = Vec::new();
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx].trim();
            idx += 1;

            if line.is_empty() {
                if !items.is_empty() && items.last() != Some(&Item::Blank) {
                    items.push(Item::Blank);
                }
                continue;
            }

            let Some((name, rest)) = function_header(line) else {
                items.push(Item::Statement(normalize_statement(line)));
                continue;
            };

            let rest = rest.trim();
            let first = if let Some(after_brace) = rest.strip_prefix('{') {
                after_brace.to_string()
            } else if rest.is_empty() {
                let next = lines[idx..]
                    .iter()
                    .position(|l| !l.trim().is_empty())
                    .map(|p| idx + p);
                match next {
                    Some(j) if lines[j].trim_start().starts_with('{') => {
                        idx = j + 1;
                        lines[j].trim_start()[1..].to_string()
                    }
                    _ => {
                        items.push(Item::Statement(normalize_statement(line)));
                        continue;
                    }
                }
            } else {
                items.push(Item::Statement(normalize_statement(line)));
                continue;
            };

            let (function, trailing) = read_body(name, first, &lines, &mut idx)?;
            items.push(Item::Function(function));
            if let Some(trailing) = trailing {
                items.push(Item::Statement(normalize_statement(&trailing)));
            }
        }

        while items.last() == Some(&Item::Blank) {
            items.pop();
        }

        Ok(Self { items })
    }

    /// Render canonical text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Item::Blank => out.push('\n'),
                Item::Statement(statement) => {
                    out.push_str(statement);
                    out.push('\n');
                }
                Item::Function(function) => {
                    out.push_str(&function.name);
                    out.push_str("() {\n");
                    for statement in &function.body {
                        out.push_str(BODY_INDENT);
                        out.push_str(statement);
                        out.push('\n');
                    }
                    out.push_str("}\n");
                }
            }
        }
        out
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.items.iter_mut().find_map(|item| match item {
            Item::Function(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    /// Names of all functions in declaration order
    pub fn function_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Function(f) => Some(f.name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Append literal text after the last statement
    pub fn append_text(&mut self, text: &str) -> Result<()> {
        let extra = Recipe::parse(text)?;
        if extra.items.is_empty() {
            return Ok(());
        }
        if !self.items.is_empty() {
            self.items.push(Item::Blank);
        }
        self.items.extend(extra.items);
        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Canonicalize recipe text
pub fn canonicalize(text: &str) -> Result<String> {
    Ok(Recipe::parse(text)?.render())
}

fn function_header(line: &str) -> Option<(&str, &str)> {
    let caps = FUNCTION_HEADER
        .captures(line)
        .or_else(|| FUNCTION_KEYWORD.captures(line))?;
    let name = caps.get(1)?.as_str();
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((name, rest))
}

/// Collect function body statements up to the matching closing brace
fn read_body(
    name: &str,
    first: String,
    lines: &[String],
    idx: &mut usize,
) -> Result<(Function, Option<String>)> {
    let mut function = Function::new(name);
    let mut depth = 1i32;
    let mut pending = Some(first);

    loop {
        let text = match pending.take() {
            Some(text) => text,
            None => {
                let Some(line) = lines.get(*idx) else {
                    return Err(Error::UnterminatedSection(name.to_string()));
                };
                *idx += 1;
                line.clone()
            }
        };

        let mut close = None;
        let top_level = top_level_chars(&text);
        for (n, &(pos, c)) in top_level.iter().enumerate() {
            if !matches!(c, '{' | '}') || !is_reserved_brace(&text, &top_level[..n], pos, c) {
                continue;
            }
            if c == '{' {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    close = Some(pos);
                    break;
                }
            }
        }

        match close {
            Some(pos) => {
                let before = text[..pos].trim();
                if !before.is_empty() {
                    function.body.push(normalize_statement(before));
                }
                let trailing = text[pos + 1..].trim().trim_start_matches(';').trim();
                let trailing = (!trailing.is_empty()).then(|| trailing.to_string());
                return Ok((function, trailing));
            }
            None => {
                let statement = text.trim();
                if !statement.is_empty() {
                    function.body.push(normalize_statement(statement));
                }
            }
        }
    }
}

/// Whether the brace at `pos` opens or closes a group
///
/// Bash treats `{` and `}` as reserved words only when they stand alone
/// in command position; `echo }` or `{a,b}` are plain words.
fn is_reserved_brace(text: &str, before: &[(usize, char)], pos: usize, brace: char) -> bool {
    let ends_word = match text[pos + 1..].chars().next() {
        None => true,
        Some(next) => {
            next.is_whitespace() || (brace == '}' && matches!(next, ';' | '&' | '|' | ')'))
        }
    };
    if !ends_word {
        return false;
    }

    let prefix = text[..pos].trim_end();
    let Some((last, _)) = prefix.char_indices().last() else {
        return true;
    };

    let separator = before
        .iter()
        .any(|&(idx, c)| idx == last && matches!(c, ';' | '&' | '|' | '(' | '{'));
    if separator {
        return true;
    }

    let word = prefix
        .rsplit(|c: char| c.is_whitespace() || matches!(c, ';' | '&' | '|'))
        .next()
        .unwrap_or_default();
    brace == '{' && matches!(word, "then" | "do" | "else" | "!")
}

/// Reflow a pure array assignment to `name=(a b c)`; other statements are trimmed
pub fn normalize_statement(statement: &str) -> String {
    let statement = statement.trim();

    if let Some(caps) = ARRAY_ASSIGNMENT.captures(statement) {
        let name = &caps[1];
        let op = &caps[2];
        let open = name.len() + op.len();
        let closes_at_end = top_level_chars(statement)
            .into_iter()
            .find(|(pos, c)| *pos > open && *c == ')')
            .is_some_and(|(pos, _)| pos == statement.len() - 1);
        if closes_at_end {
            let words = split_words(&caps[3]);
            return format!("{}{}({})", name, op, words.join(" "));
        }
    }

    statement.to_string()
}

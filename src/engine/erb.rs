//! Embedded-expression text dialect (tag `erb`)
//!
//! Literal text with `<%= expr %>` output tags and `<%# comment %>` tags.
//! `<%%` emits a literal `<%`; a tag closed with `-%>` swallows the newline
//! that follows it. Code tags (`<% ... %>`) are not supported.

use crate::engine::expr::{self, Env, Expr};
use crate::engine::{Content, Template};
use crate::error::{CompileError, Result};
use crate::scope::Scope;
use crate::value::Args;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Output(Expr),
}

/// A compiled erb template
#[derive(Debug, Clone)]
pub struct ErbTemplate {
    parts: Vec<Part>,
}

impl ErbTemplate {
    pub fn compile(source: &str, origin: &str) -> std::result::Result<Self, CompileError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while let Some(found) = source[pos..].find("<%") {
            let open = pos + found;
            text.push_str(&source[pos..open]);

            let after = &source[open + 2..];
            if after.starts_with('%') {
                text.push_str("<%");
                pos = open + 3;
                continue;
            }

            let close = after.find("%>").map(|p| open + 2 + p).ok_or_else(|| {
                CompileError::new(origin, "Unterminated tag", open..source.len())
            })?;
            let trim_newline = source[..close].ends_with('-');
            let body_end = if trim_newline { close - 1 } else { close };

            match after.as_bytes().first() {
                Some(b'=') => {
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    let body = &source[open + 3..body_end.max(open + 3)];
                    parts.push(Part::Output(expr::parse(body, origin, open + 3)?));
                }
                Some(b'#') => {}
                _ => {
                    return Err(CompileError::new(
                        origin,
                        "Code tags are not supported; use <%= expr %>",
                        open..close + 2,
                    ))
                }
            }

            pos = close + 2;
            if trim_newline && source[pos..].starts_with('\n') {
                pos += 1;
            }
        }

        text.push_str(&source[pos..]);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }
        Ok(Self { parts })
    }
}

impl Template for ErbTemplate {
    fn render(
        &self,
        scope: &dyn Scope,
        locals: &Args,
        content: Option<&Content<'_>>,
    ) -> Result<String> {
        let env = Env {
            scope,
            locals,
            content,
        };
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Output(expr) => out.push_str(&expr.render(&env)?),
            }
        }
        Ok(out)
    }
}

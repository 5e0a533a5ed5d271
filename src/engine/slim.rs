//! Indentation-based HTML dialect (tag `slim`)
//!
//! Each line is one of:
//!
//! ```text
//! tag.class#id(attr=expr attr="text") inline text with #{expr}
//! tag = expr
//! | piped text with #{expr}
//! = expr
//! / comment
//! ```
//!
//! Lines indented deeper than an element line become its children. Output is
//! compact: `p Hello #{name}!` renders `<p>Hello Jones!</p>`.

use crate::engine::expr::{self, Env, Expr};
use crate::engine::{Content, Template};
use crate::error::{CompileError, Result};
use crate::scope::Scope;
use crate::value::{Args, Value};

/// Elements rendered without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Literal text or an interpolated expression
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
    },
    Text(Vec<Segment>),
    Output(Expr),
}

/// A compiled slim template
#[derive(Debug, Clone)]
pub struct SlimTemplate {
    nodes: Vec<Node>,
}

impl SlimTemplate {
    pub fn compile(source: &str, origin: &str) -> std::result::Result<Self, CompileError> {
        let lines = split_lines(source);
        let mut parser = LineParser {
            lines: &lines,
            pos: 0,
            origin,
        };

        let mut nodes = Vec::new();
        while parser.pos < lines.len() {
            nodes.extend(parser.parse_block(0)?);
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl Template for SlimTemplate {
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
        render_nodes(&self.nodes, &env, &mut out)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'s> {
    indent: usize,
    text: &'s str,
    /// Byte offset of `text` in the whole source
    offset: usize,
}

fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in source.split('\n') {
        let trimmed = raw.trim_end();
        let content = trimmed.trim_start();
        if !content.is_empty() {
            let indent = trimmed.len() - content.len();
            lines.push(Line {
                indent,
                text: content,
                offset: offset + indent,
            });
        }
        offset += raw.len() + 1;
    }
    lines
}

enum LineKind {
    Node(Node),
    Comment,
}

struct LineParser<'p, 's> {
    lines: &'p [Line<'s>],
    pos: usize,
    origin: &'p str,
}

impl<'p, 's> LineParser<'p, 's> {
    fn error(&self, message: impl Into<String>, span: std::ops::Range<usize>) -> CompileError {
        CompileError::new(self.origin, message, span)
    }

    /// Parse consecutive lines sharing the indentation of the first line at or
    /// beyond `min_indent`
    fn parse_block(&mut self, min_indent: usize) -> std::result::Result<Vec<Node>, CompileError> {
        let mut nodes = Vec::new();
        let block_indent = match self.lines.get(self.pos) {
            Some(line) if line.indent >= min_indent => line.indent,
            _ => return Ok(nodes),
        };

        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.indent < block_indent {
                break;
            }
            if line.indent > block_indent {
                return Err(self.error(
                    "Unexpected indentation",
                    line.offset..line.offset + line.text.len(),
                ));
            }
            self.pos += 1;

            let has_children = self
                .lines
                .get(self.pos)
                .map_or(false, |next| next.indent > block_indent);

            match self.parse_line(line)? {
                LineKind::Comment => {
                    // Comment blocks swallow their nested lines
                    while self
                        .lines
                        .get(self.pos)
                        .map_or(false, |next| next.indent > block_indent)
                    {
                        self.pos += 1;
                    }
                }
                LineKind::Node(Node::Element {
                    tag,
                    attributes,
                    mut children,
                }) => {
                    if has_children {
                        children.extend(self.parse_block(block_indent + 1)?);
                    }
                    nodes.push(Node::Element {
                        tag,
                        attributes,
                        children,
                    });
                }
                LineKind::Node(node) => {
                    if has_children {
                        let next = self.lines[self.pos];
                        return Err(self.error(
                            "Only elements can have nested content",
                            next.offset..next.offset + next.text.len(),
                        ));
                    }
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }

    fn parse_line(&self, line: Line<'s>) -> std::result::Result<LineKind, CompileError> {
        let text = line.text;
        if text.starts_with('/') {
            return Ok(LineKind::Comment);
        }
        if let Some(rest) = text.strip_prefix('|') {
            let (rest, skipped) = strip_one_space(rest);
            let segments = interpolate(rest, self.origin, line.offset + 1 + skipped)?;
            return Ok(LineKind::Node(Node::Text(segments)));
        }
        if let Some(rest) = text.strip_prefix('=') {
            let expr = expr::parse(rest, self.origin, line.offset + 1)?;
            return Ok(LineKind::Node(Node::Output(expr)));
        }
        self.parse_element(line).map(LineKind::Node)
    }

    fn parse_element(&self, line: Line<'s>) -> std::result::Result<Node, CompileError> {
        let text = line.text;
        let bytes = text.as_bytes();
        let mut i = take_while(text, 0, is_name_char);

        let mut tag = text[..i].to_string();
        if tag.is_empty() {
            if matches!(bytes.first(), Some(b'.') | Some(b'#')) {
                tag = "div".to_string();
            } else {
                return Err(self.error("Expected a tag name", line.offset..line.offset + 1));
            }
        }

        let mut id: Option<String> = None;
        let mut classes: Vec<String> = Vec::new();
        while i < bytes.len() && (bytes[i] == b'.' || bytes[i] == b'#') {
            let marker = bytes[i];
            let start = i + 1;
            let end = take_while(text, start, is_name_char);
            if end == start {
                return Err(self.error(
                    "Expected a class or id name",
                    line.offset + i..line.offset + i + 1,
                ));
            }
            let name = text[start..end].to_string();
            if marker == b'.' {
                classes.push(name);
            } else {
                id = Some(name);
            }
            i = end;
        }

        let mut attributes = Vec::new();
        if let Some(id) = id {
            attributes.push(Attribute {
                name: "id".to_string(),
                value: vec![Segment::Text(id)],
            });
        }
        if !classes.is_empty() {
            attributes.push(Attribute {
                name: "class".to_string(),
                value: vec![Segment::Text(classes.join(" "))],
            });
        }

        if bytes.get(i) == Some(&b'(') {
            i = self.parse_attributes(line, i + 1, &mut attributes)?;
        }

        let mut children = Vec::new();
        let rest = &text[i..];
        let trimmed = rest.trim_start();
        let rest_offset = line.offset + i + (rest.len() - trimmed.len());
        if let Some(source) = trimmed.strip_prefix('=') {
            children.push(Node::Output(expr::parse(
                source,
                self.origin,
                rest_offset + 1,
            )?));
        } else if !rest.is_empty() {
            if let Some(c) = rest.chars().next().filter(|&c| c != ' ') {
                return Err(self.error(
                    format!("Unexpected character '{}'", c),
                    line.offset + i..line.offset + i + 1,
                ));
            }
            let segments = interpolate(&rest[1..], self.origin, line.offset + i + 1)?;
            if !segments.is_empty() {
                children.push(Node::Text(segments));
            }
        }

        Ok(Node::Element {
            tag,
            attributes,
            children,
        })
    }

    /// Parse `name=value` pairs up to the closing parenthesis; returns the
    /// index just past it
    fn parse_attributes(
        &self,
        line: Line<'s>,
        mut i: usize,
        attributes: &mut Vec<Attribute>,
    ) -> std::result::Result<usize, CompileError> {
        let text = line.text;
        let bytes = text.as_bytes();
        loop {
            i = take_while(text, i, |c| c == ' ' || c == '\t');
            match bytes.get(i) {
                Some(b')') => return Ok(i + 1),
                None => {
                    return Err(self.error(
                        "Unterminated attribute list",
                        line.offset + i..line.offset + i,
                    ))
                }
                _ => {}
            }

            let name_end = take_while(text, i, |c| is_name_char(c) || c == ':');
            if name_end == i || bytes.get(name_end) != Some(&b'=') {
                return Err(self.error(
                    "Expected attribute of the form name=value",
                    line.offset + i..line.offset + name_end.max(i + 1),
                ));
            }
            let name = text[i..name_end].to_string();
            i = name_end + 1;

            let value = if bytes.get(i) == Some(&b'"') {
                let start = i + 1;
                let end = text[start..]
                    .find('"')
                    .map(|p| start + p)
                    .ok_or_else(|| {
                        self.error("Unterminated attribute value", line.offset + i..line.offset + i + 1)
                    })?;
                i = end + 1;
                interpolate(&text[start..end], self.origin, line.offset + start)?
            } else {
                let end = take_while(text, i, |c| c != ' ' && c != '\t' && c != ')');
                let expr = expr::parse(&text[i..end], self.origin, line.offset + i)?;
                i = end;
                vec![Segment::Expr(expr)]
            };

            match attributes.iter_mut().find(|a| a.name == name) {
                Some(existing) if name == "class" => {
                    existing.value.push(Segment::Text(" ".to_string()));
                    existing.value.extend(value);
                }
                Some(existing) => existing.value = value,
                None => attributes.push(Attribute { name, value }),
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Index of the first char at or after `start` not matching `pred`
fn take_while(text: &str, start: usize, pred: impl Fn(char) -> bool) -> usize {
    text[start..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(text.len(), |(p, _)| start + p)
}

fn strip_one_space(text: &str) -> (&str, usize) {
    match text.strip_prefix(' ') {
        Some(rest) => (rest, 1),
        None => (text, 0),
    }
}

/// Split text into literal and `#{expr}` segments
pub(crate) fn interpolate(
    text: &str,
    origin: &str,
    offset: usize,
) -> std::result::Result<Vec<Segment>, CompileError> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut pos = 0;

    while let Some(start) = rest.find("#{") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let expr_start = start + 2;
        let end = rest[expr_start..].find('}').ok_or_else(|| {
            CompileError::new(
                origin,
                "Unterminated interpolation",
                offset + pos + start..offset + pos + rest.len(),
            )
        })?;
        let source = &rest[expr_start..expr_start + end];
        segments.push(Segment::Expr(expr::parse(
            source,
            origin,
            offset + pos + expr_start,
        )?));

        let consumed = expr_start + end + 1;
        pos += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}

pub(crate) fn render_segments(segments: &[Segment], env: &Env<'_>, out: &mut String) -> Result<()> {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Expr(expr) => out.push_str(&expr.render(env)?),
        }
    }
    Ok(())
}

fn render_nodes(nodes: &[Node], env: &Env<'_>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(segments) => render_segments(segments, env, out)?,
            Node::Output(expr) => out.push_str(&expr.render(env)?),
            Node::Element {
                tag,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for attribute in attributes {
                    render_attribute(attribute, env, out)?;
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) && children.is_empty() {
                    continue;
                }
                render_nodes(children, env, out)?;
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
    Ok(())
}

/// Attributes bound to a single `nil` or `false` expression are omitted
fn render_attribute(attribute: &Attribute, env: &Env<'_>, out: &mut String) -> Result<()> {
    if let [Segment::Expr(expr)] = attribute.value.as_slice() {
        let value = expr.eval(env)?;
        if matches!(value, Value::Nil | Value::Bool(false)) {
            return Ok(());
        }
        out.push_str(&format!(" {}=\"{}\"", attribute.name, value));
        return Ok(());
    }

    out.push(' ');
    out.push_str(&attribute.name);
    out.push_str("=\"");
    render_segments(&attribute.value, env, out)?;
    out.push('"');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use pretty_assertions::assert_eq;

    fn render(source: &str, locals: &Args) -> String {
        SlimTemplate::compile(source, "test")
            .expect("Should compile")
            .render(&(), locals, None)
            .expect("Should render")
    }

    #[test]
    fn test_simple_paragraph() {
        assert_eq!(render("p It works!", &Args::new()), "<p>It works!</p>");
    }

    #[test]
    fn test_interpolation() {
        let locals = args! { "title" => "Mr.", "name" => "Jones" };
        assert_eq!(
            render("p Hello #{title} #{name}!", &locals),
            "<p>Hello Mr. Jones!</p>"
        );
    }

    #[test]
    fn test_nested_elements() {
        let source = "table\n  tr\n    th x\n    td = x\n  tr\n    th y\n    td = y\n";
        let locals = args! { "x" => 5, "y" => 6 };
        assert_eq!(
            render(source, &locals),
            "<table><tr><th>x</th><td>5</td></tr><tr><th>y</th><td>6</td></tr></table>"
        );
    }

    #[test]
    fn test_piped_text_and_output_lines() {
        let source = "th\n  | x\n  = op\n  | y\ntd = x + y";
        let locals = args! { "x" => 5, "y" => 6, "op" => "+" };
        assert_eq!(render(source, &locals), "<th>x+y</th><td>11</td>");
    }

    #[test]
    fn test_class_and_id_shorthand() {
        assert_eq!(
            render("span.badge.big#main Hi", &Args::new()),
            r#"<span id="main" class="badge big">Hi</span>"#
        );
        assert_eq!(render(".box", &Args::new()), r#"<div class="box"></div>"#);
    }

    #[test]
    fn test_attributes() {
        let locals = args! { "role" => "admin", "hidden" => false };
        assert_eq!(
            render(r#"i.role(class=role title="as #{role}" data-x=hidden)"#, &locals),
            r#"<i class="role admin" title="as admin"></i>"#
        );
    }

    #[test]
    fn test_void_element() {
        assert_eq!(render("p\n  br\n  | after", &Args::new()), "<p><br>after</p>");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            render("/ hidden\n  p nested hidden\np shown", &Args::new()),
            "<p>shown</p>"
        );
    }

    #[test]
    fn test_unexpected_indentation() {
        let err = SlimTemplate::compile("p\n    a\n  b", "test").unwrap_err();
        assert_eq!(err.message, "Unexpected indentation");
    }

    #[test]
    fn test_text_cannot_have_children() {
        let err = SlimTemplate::compile("| text\n  p", "test").unwrap_err();
        assert!(err.message.contains("nested"));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let err = SlimTemplate::compile("p #{name", "page.slim").unwrap_err();
        assert_eq!(err.origin, "page.slim");
        assert_eq!(err.message, "Unterminated interpolation");
    }

    #[test]
    fn test_expression_error_span_points_into_source() {
        let source = "p\n  td = a +";
        let err = SlimTemplate::compile(source, "test").unwrap_err();
        assert!(err.span.start >= source.find('=').unwrap());
    }

    #[test]
    fn test_yield_renders_content() {
        let template = SlimTemplate::compile("main\n  = yield", "test").unwrap();
        let content = || -> Result<String> { Ok("<p>inner</p>".to_string()) };
        let out = template.render(&(), &Args::new(), Some(&content)).unwrap();
        assert_eq!(out, "<main><p>inner</p></main>");
    }
}

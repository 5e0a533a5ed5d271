//! Expression language shared by the template dialects
//!
//! Grammar:
//!
//! ```text
//! expr  := term { "+" term }
//! term  := atom { "." identifier }
//! atom  := identifier | string | number | true | false | nil | yield | "(" expr ")"
//! ```

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::engine::lexer::{self, Token};
use crate::engine::Content;
use crate::error::{CompileError, Error, Result};
use crate::scope::Scope;
use crate::value::{Args, Value};

/// A parsed template expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Name lookup: locals first, then the scope
    Name(String),
    Member(Box<Expr>, String),
    Yield,
    Add(Box<Expr>, Box<Expr>),
}

/// Everything an expression can see during one render
pub struct Env<'a> {
    pub scope: &'a dyn Scope,
    pub locals: &'a Args,
    pub content: Option<&'a Content<'a>>,
}

impl Expr {
    pub fn eval(&self, env: &Env<'_>) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => match env.locals.get(name) {
                Some(value) => Ok(value.clone()),
                None => env.scope.lookup(name).ok_or_else(|| Error::UndefinedName {
                    name: name.clone(),
                }),
            },
            Expr::Member(target, member) => {
                let value = target.eval(env)?;
                value.get(member).cloned().ok_or_else(|| Error::UndefinedName {
                    name: format!("{}.{}", target.describe(), member),
                })
            }
            Expr::Yield => match env.content {
                Some(content) => content().map(Value::String),
                None => Err(Error::NoContent),
            },
            Expr::Add(lhs, rhs) => Ok(lhs.eval(env)?.add(&rhs.eval(env)?)),
        }
    }

    /// Render the value of this expression as text
    pub fn render(&self, env: &Env<'_>) -> Result<String> {
        Ok(self.eval(env)?.to_string())
    }

    fn describe(&self) -> String {
        match self {
            Expr::Literal(value) => value.to_string(),
            Expr::Name(name) => name.clone(),
            Expr::Member(target, member) => format!("{}.{}", target.describe(), member),
            Expr::Yield => "yield".to_string(),
            Expr::Add(lhs, rhs) => format!("{} + {}", lhs.describe(), rhs.describe()),
        }
    }
}

/// Parse an expression found at byte `offset` of the template `origin`.
///
/// Error spans are reported relative to the whole template source.
pub fn parse(input: &str, origin: &str, offset: usize) -> std::result::Result<Expr, CompileError> {
    let len = input.len();

    let mut tokens = Vec::new();
    for item in lexer::lex(input) {
        match item {
            Ok((tok, span)) => tokens.push((tok, span)),
            Err(span) => {
                return Err(CompileError::new(
                    origin,
                    format!("Unexpected character '{}'", &input[span.clone()]),
                    span.start + offset..span.end + offset,
                ))
            }
        }
    }

    let token_stream = Stream::from_iter(tokens.into_iter().map(|(tok, span)| (tok, span.into())))
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            let mut err: CompileError = match errs.into_iter().next() {
                Some(rich) => rich.into(),
                None => CompileError::new(origin, "Invalid expression", 0..len),
            };
            err.origin = origin.to_string();
            err.span = err.span.start + offset..err.span.end + offset;
            err
        })
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::String(s) => Expr::Literal(Value::String(s)),
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Nil => Expr::Literal(Value::Nil),
        };

        let identifier = select! {
            Token::Ident(s) => s,
        };

        let atom = choice((
            literal,
            just(Token::Yield).to(Expr::Yield),
            identifier.clone().map(Expr::Name),
            expr.delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        let term = atom.foldl(
            just(Token::Dot).ignore_then(identifier).repeated(),
            |target, member| Expr::Member(Box::new(target), member),
        );

        term.clone().foldl(
            just(Token::Plus).ignore_then(term).repeated(),
            |lhs, rhs| Expr::Add(Box::new(lhs), Box::new(rhs)),
        )
    })
}

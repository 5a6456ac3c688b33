//! Tokenizer and parser for key template expressions
//!
//! The grammar is deliberately tiny: string/number/boolean/null literals,
//! variable paths, one-argument function calls, parentheses and `+`
//! concatenation. Anything else is a syntax error.

use crate::error::KeyExpansionError;
use serde_json::Value;

/// Parsed key expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path { root: String, segments: Vec<Segment> },
    Call { function: String, arg: Box<Expr> },
    Concat(Vec<Expr>),
}

/// Step into a structured value
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Num(String),
    Ident(String),
    Hash,
    Plus,
    LParen,
    RParen,
    Dot,
    LBracket,
    RBracket,
}

fn syntax(position: usize, message: impl Into<String>) -> KeyExpansionError {
    KeyExpansionError::Syntax {
        position,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, KeyExpansionError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(syntax(pos, "unterminated string literal")),
                        Some((_, '\'')) if matches!(chars.get(i + 1), Some((_, '\''))) => {
                            text.push('\'');
                            i += 2;
                        }
                        Some((_, '\'')) => {
                            i += 1;
                            break;
                        }
                        Some((_, ch)) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((pos, Token::Str(text)));
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some((_, ch)) = chars.get(i) {
                    if ch.is_ascii_digit() || (*ch == '.' && !text.contains('.')) {
                        text.push(*ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                if text.ends_with('.') {
                    return Err(syntax(pos, "number must not end with `.`"));
                }
                tokens.push((pos, Token::Num(text)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some((_, ch)) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || *ch == '_' {
                        text.push(*ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push((pos, Token::Ident(text)));
            }
            '#' => {
                tokens.push((pos, Token::Hash));
                i += 1;
            }
            '+' => {
                tokens.push((pos, Token::Plus));
                i += 1;
            }
            '(' => {
                tokens.push((pos, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((pos, Token::RParen));
                i += 1;
            }
            '.' => {
                tokens.push((pos, Token::Dot));
                i += 1;
            }
            '[' => {
                tokens.push((pos, Token::LBracket));
                i += 1;
            }
            ']' => {
                tokens.push((pos, Token::RBracket));
                i += 1;
            }
            other => return Err(syntax(pos, format!("unexpected character `{}`", other))),
        }
    }

    Ok(tokens)
}

/// Deepest allowed nesting of parentheses and function calls
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|(p, _)| *p)
            .unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, t)| t.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), KeyExpansionError> {
        let pos = self.position();
        match self.next() {
            Some(t) if t == expected => Ok(()),
            _ => Err(syntax(pos, format!("expected {}", what))),
        }
    }

    fn expr(&mut self) -> Result<Expr, KeyExpansionError> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(
                self.position(),
                format!("expression nested deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        let expr = self.concat();
        self.depth -= 1;
        expr
    }

    fn concat(&mut self) -> Result<Expr, KeyExpansionError> {
        let mut terms = vec![self.term()?];
        while self.peek() == Some(&Token::Plus) {
            self.cursor += 1;
            terms.push(self.term()?);
        }
        if terms.len() == 1 {
            Ok(terms.remove(0))
        } else {
            Ok(Expr::Concat(terms))
        }
    }

    fn term(&mut self) -> Result<Expr, KeyExpansionError> {
        let pos = self.position();
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Num(n)) => serde_json::from_str::<Value>(&n)
                .map(Expr::Literal)
                .map_err(|_| syntax(pos, format!("invalid number `{}`", n))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Hash) => {
                let pos = self.position();
                match self.next() {
                    Some(Token::Ident(name)) => self.reference(name),
                    _ => Err(syntax(pos, "expected a name after `#`")),
                }
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                _ => self.reference(name),
            },
            Some(_) => Err(syntax(pos, "expected a literal, variable or function call")),
            None => Err(syntax(pos, "unexpected end of template")),
        }
    }

    fn reference(&mut self, name: String) -> Result<Expr, KeyExpansionError> {
        if self.peek() == Some(&Token::LParen) {
            self.cursor += 1;
            let arg = self.expr()?;
            self.expect(Token::RParen, "`)` to close the function call")?;
            return Ok(Expr::Call {
                function: name,
                arg: Box::new(arg),
            });
        }

        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.cursor += 1;
                    let pos = self.position();
                    match self.next() {
                        Some(Token::Ident(field)) => segments.push(Segment::Field(field)),
                        _ => return Err(syntax(pos, "expected a field name after `.`")),
                    }
                }
                Some(Token::LBracket) => {
                    self.cursor += 1;
                    let pos = self.position();
                    let index = match self.next() {
                        Some(Token::Num(n)) => n
                            .parse::<usize>()
                            .map_err(|_| syntax(pos, "index must be a non-negative integer"))?,
                        _ => return Err(syntax(pos, "expected an index")),
                    };
                    self.expect(Token::RBracket, "`]`")?;
                    segments.push(Segment::Index(index));
                }
                _ => break,
            }
        }

        Ok(Expr::Path {
            root: name,
            segments,
        })
    }
}

/// Parse a key template expression
pub fn parse(template: &str) -> Result<Expr, KeyExpansionError> {
    let tokens = tokenize(template)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: template.len(),
        depth: 0,
    };

    let expr = parser.expr()?;
    if parser.peek().is_some() {
        return Err(syntax(parser.position(), "unexpected trailing input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_concat() {
        let expr = parse("'user:info:' + #id").unwrap();
        assert_eq!(
            expr,
            Expr::Concat(vec![
                Expr::Literal(json!("user:info:")),
                Expr::Path {
                    root: "id".to_string(),
                    segments: vec![]
                },
            ])
        );
    }

    #[test]
    fn test_parse_bare_variable_and_call() {
        let expr = parse("'search:' + hash(#req)").unwrap();
        match expr {
            Expr::Concat(terms) => match &terms[1] {
                Expr::Call { function, arg } => {
                    assert_eq!(function, "hash");
                    assert!(matches!(**arg, Expr::Path { ref root, .. } if root == "req"));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_paths() {
        let expr = parse("#query.tags[1].name").unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                root: "query".to_string(),
                segments: vec![
                    Segment::Field("tags".to_string()),
                    Segment::Index(1),
                    Segment::Field("name".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(parse("'it''s'").unwrap(), Expr::Literal(json!("it's")));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = format!("{}#id{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert!(parse(&nested).is_ok());

        let deep = format!("{}#id{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse(&deep), Err(KeyExpansionError::Syntax { .. })));

        let calls = format!("{}#id{}", "hash(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(matches!(parse(&calls), Err(KeyExpansionError::Syntax { .. })));
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["'open", "#", "'a' +", "#id +* 2", "(#id", "#a.", "#a[x]", "'a' 'b'"] {
            assert!(
                matches!(parse(bad), Err(KeyExpansionError::Syntax { .. })),
                "expected syntax error for {:?}",
                bad
            );
        }
    }
}

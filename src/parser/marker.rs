//! PEP 508 environment marker parser
//!
//! Grammar:
//! - `marker := and ("or" and)*`
//! - `and := atom ("and" atom)*`
//! - `atom := "(" marker ")" | value op value`
//! - `value := variable | quoted string`

use crate::domain::{MarkerExpr, MarkerOp, MarkerValue, MarkerVariable};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Op(MarkerOp),
    Ident(String),
    Str(String),
}

/// Parse a marker expression such as `python_version < "3.8" and sys_platform == "linux"`
pub fn parse_marker(input: &str) -> Result<MarkerExpr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input,
    };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ParseError::invalid_marker(input, "unexpected trailing input"));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| ParseError::invalid_marker(input, "unterminated string"))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '=' | '!' | '~' | '<' | '>' => {
                let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
                let (op, len) = if rest.starts_with("===") {
                    (MarkerOp::Arbitrary, 3)
                } else if rest.starts_with("==") {
                    (MarkerOp::Equal, 2)
                } else if rest.starts_with("!=") {
                    (MarkerOp::NotEqual, 2)
                } else if rest.starts_with("~=") {
                    (MarkerOp::Compatible, 2)
                } else if rest.starts_with("<=") {
                    (MarkerOp::LessEqual, 2)
                } else if rest.starts_with(">=") {
                    (MarkerOp::GreaterEqual, 2)
                } else if rest.starts_with('<') {
                    (MarkerOp::Less, 1)
                } else if rest.starts_with('>') {
                    (MarkerOp::Greater, 1)
                } else {
                    return Err(ParseError::invalid_marker(
                        input,
                        format!("unexpected character '{}'", c),
                    ));
                };
                tokens.push(Token::Op(op));
                i += len;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "in" => tokens.push(Token::Op(MarkerOp::In)),
                    "not" => match next_word(&chars, i) {
                        Some((next, end)) if next == "in" => {
                            tokens.push(Token::Op(MarkerOp::NotIn));
                            i = end;
                        }
                        _ => return Err(ParseError::invalid_marker(input, "expected 'in' after 'not'")),
                    },
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => {
                return Err(ParseError::invalid_marker(
                    input,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

fn next_word(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    let start = i;
    while i < chars.len() && chars[i].is_ascii_alphabetic() {
        i += 1;
    }
    (i > start).then(|| (chars[start..i].iter().collect(), i))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::invalid_marker(self.input, message)
    }

    fn parse_or(&mut self) -> Result<MarkerExpr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<MarkerExpr, ParseError> {
        let mut expr = self.parse_atom()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            expr = expr.and(self.parse_atom()?);
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<MarkerExpr, ParseError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let expr = self.parse_or()?;
            return match self.next() {
                Some(Token::RParen) => Ok(expr),
                _ => Err(self.error("missing closing parenthesis")),
            };
        }

        let lhs = self.parse_value()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            _ => return Err(self.error("expected a comparison operator")),
        };
        let rhs = self.parse_value()?;
        Ok(MarkerExpr::Compare { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, ParseError> {
        match self.next() {
            Some(Token::Str(text)) => Ok(MarkerValue::Literal(text)),
            Some(Token::Ident(name)) => MarkerVariable::from_name(&name)
                .map(MarkerValue::Variable)
                .ok_or(ParseError::UndefinedMarkerVariable { name }),
            _ => Err(self.error("expected a variable or a quoted string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_marker("python_version < \"3.8\"").unwrap();
        assert_eq!(
            expr,
            MarkerExpr::compare(MarkerVariable::PythonVersion, MarkerOp::Less, "3.8")
        );
    }

    #[test]
    fn test_parse_single_quotes_and_precedence() {
        let expr =
            parse_marker("sys_platform == 'linux' or sys_platform == 'darwin' and extra == 'x'")
                .unwrap();
        match expr {
            MarkerExpr::Or(_, right) => assert!(matches!(*right, MarkerExpr::And(..))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_parentheses() {
        let expr = parse_marker("(os_name == 'nt' or os_name == 'posix') and extra == 'cli'")
            .unwrap();
        assert!(matches!(expr, MarkerExpr::And(..)));
        assert_eq!(
            expr.to_string(),
            r#"(os_name == "nt" or os_name == "posix") and extra == "cli""#
        );
    }

    #[test]
    fn test_parse_reversed_operands() {
        let expr = parse_marker("'3.8' <= python_version").unwrap();
        match expr {
            MarkerExpr::Compare { lhs, op, rhs } => {
                assert_eq!(lhs, MarkerValue::Literal("3.8".to_string()));
                assert_eq!(op, MarkerOp::LessEqual);
                assert_eq!(rhs, MarkerValue::Variable(MarkerVariable::PythonVersion));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_in_and_not_in() {
        let expr = parse_marker("'arm' in platform_machine").unwrap();
        assert!(matches!(expr, MarkerExpr::Compare { op: MarkerOp::In, .. }));
        let expr = parse_marker("platform_machine not in 'x86_64 aarch64'").unwrap();
        assert!(matches!(expr, MarkerExpr::Compare { op: MarkerOp::NotIn, .. }));
    }

    #[test]
    fn test_undefined_variable() {
        let err = parse_marker("python_flavour == 'cpython'").unwrap_err();
        assert_eq!(
            err,
            ParseError::UndefinedMarkerVariable {
                name: "python_flavour".to_string()
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_marker("python_version <").is_err());
        assert!(parse_marker("python_version < '3.8").is_err());
        assert!(parse_marker("(python_version < '3.8'").is_err());
        assert!(parse_marker("python_version < '3.8' extra").is_err());
        assert!(parse_marker("extra not 'x'").is_err());
    }
}

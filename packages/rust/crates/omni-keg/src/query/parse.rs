use super::TagExpr;
use super::lexer::{Token, invalid, tokenize};
use crate::error::KegResult;
use crate::model::normalize_tag;

struct Parser<'a> {
    raw: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn or_expr(&mut self) -> KegResult<TagExpr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = TagExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> KegResult<TagExpr> {
        let mut left = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.not_expr()?;
            left = TagExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> KegResult<TagExpr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(TagExpr::Not(Box::new(self.not_expr()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> KegResult<TagExpr> {
        match self.advance() {
            Some(Token::Word(word) | Token::Quoted(word)) => normalize_tag(&word)
                .map(TagExpr::Tag)
                .ok_or_else(|| invalid(self.raw, "empty tag name")),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(invalid(self.raw, "unbalanced parentheses")),
                }
            }
            Some(Token::RParen) => Err(invalid(self.raw, "unbalanced parentheses")),
            Some(op @ (Token::And | Token::Or)) => Err(invalid(
                self.raw,
                format!("operator {} has no left operand", op.describe()),
            )),
            Some(Token::Not) => Err(invalid(self.raw, "misplaced 'not'")),
            None => Err(invalid(self.raw, "unexpected end of expression")),
        }
    }
}

/// Parse a tag expression. Precedence: `not` > `and` > `or`.
///
/// # Errors
///
/// [`crate::KegError::ParseFailure`] ("invalid tag expression") on empty input,
/// unbalanced parentheses, dangling operators, or stray `&`/`|`.
pub fn parse_tag_expression(raw: &str) -> KegResult<TagExpr> {
    let tokens = tokenize(raw)?;
    if tokens.is_empty() {
        return Err(invalid(raw, "empty expression"));
    }
    let mut parser = Parser {
        raw,
        tokens,
        pos: 0,
    };
    let expr = parser.or_expr()?;
    match parser.advance() {
        None => Ok(expr),
        Some(Token::RParen) => Err(invalid(raw, "unbalanced parentheses")),
        Some(token) => Err(invalid(raw, format!("unexpected {}", token.describe()))),
    }
}

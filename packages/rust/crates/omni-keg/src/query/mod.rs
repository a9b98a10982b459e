//! Boolean tag expressions: `a and (b or c)`, `a && !c`, `not "or"`.

mod eval;
mod lexer;
mod parse;

use std::fmt;

pub use self::eval::evaluate;
pub use self::parse::parse_tag_expression;

/// Parsed tag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagExpr {
    /// Normalized tag literal.
    Tag(String),
    /// Complement against the universe.
    Not(Box<TagExpr>),
    /// Intersection.
    And(Box<TagExpr>, Box<TagExpr>),
    /// Union.
    Or(Box<TagExpr>, Box<TagExpr>),
}

fn is_reserved(word: &str) -> bool {
    ["and", "or", "not"]
        .iter()
        .any(|reserved| word.eq_ignore_ascii_case(reserved))
}

impl fmt::Display for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) if is_reserved(tag) => write!(f, "\"{tag}\""),
            Self::Tag(tag) => f.write_str(tag),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::And(left, right) => write!(f, "({left} and {right})"),
            Self::Or(left, right) => write!(f, "({left} or {right})"),
        }
    }
}

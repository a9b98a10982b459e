use crate::error::{KegError, KegResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    Word(String),
    Quoted(String),
    LParen,
    RParen,
    And,
    Or,
    Not,
}

impl Token {
    pub(super) fn describe(&self) -> String {
        match self {
            Self::Word(word) => format!("'{word}'"),
            Self::Quoted(word) => format!("\"{word}\""),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::And => "'and'".to_string(),
            Self::Or => "'or'".to_string(),
            Self::Not => "'not'".to_string(),
        }
    }
}

pub(super) fn invalid(raw: &str, detail: impl std::fmt::Display) -> KegError {
    KegError::parse("tag expression", format!("invalid tag expression {raw:?}: {detail}"))
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '!' | '&' | '|' | '"' | '\'')
}

fn keyword(word: String) -> Token {
    if word.eq_ignore_ascii_case("and") {
        Token::And
    } else if word.eq_ignore_ascii_case("or") {
        Token::Or
    } else if word.eq_ignore_ascii_case("not") {
        Token::Not
    } else {
        Token::Word(word)
    }
}

pub(super) fn tokenize(raw: &str) -> KegResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '!' => tokens.push(Token::Not),
            '&' | '|' => {
                if chars.next_if_eq(&ch).is_none() {
                    return Err(invalid(raw, format!("stray '{ch}'; use '{ch}{ch}'")));
                }
                tokens.push(if ch == '&' { Token::And } else { Token::Or });
            }
            '"' | '\'' => {
                let mut word = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ch {
                        closed = true;
                        break;
                    }
                    word.push(inner);
                }
                if !closed {
                    return Err(invalid(raw, "unterminated quote"));
                }
                tokens.push(Token::Quoted(word));
            }
            first => {
                let mut word = String::from(first);
                while let Some(next) = chars.next_if(|c| !is_delimiter(*c)) {
                    word.push(next);
                }
                tokens.push(keyword(word));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_and_keywords() -> KegResult<()> {
        let tokens = tokenize("a AND (b||!c) Or 'not'")?;
        assert_eq!(
            tokens,
            vec![
                Token::Word("a".into()),
                Token::And,
                Token::LParen,
                Token::Word("b".into()),
                Token::Or,
                Token::Not,
                Token::Word("c".into()),
                Token::RParen,
                Token::Or,
                Token::Quoted("not".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_stray_ampersand_and_open_quote() {
        assert!(tokenize("a & b").is_err());
        assert!(tokenize("a | b").is_err());
        assert!(tokenize("\"open").is_err());
    }
}

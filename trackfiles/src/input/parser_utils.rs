use std::fmt::Debug;
use std::iter::Peekable;

#[derive(Debug, Clone, Fail)]
pub enum LexerError {
    #[fail(display = "unexpected character \"{}\" on line {}", c, i)]
    UnexpectedChar { i: usize, c: String },
    #[fail(display = "unexpected end of file in {} starting on line {}", what, i)]
    UnexpectedEOF { i: usize, what: &'static str },
}

#[derive(Debug, Clone, Fail)]
pub enum ParseError {
    #[fail(display = "line {}: expected {}, found {}", line, expected, found)]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },
    #[fail(display = "unexpected end of file, expected {}", _0)]
    UnexpectedEOF(String),
}

/// A token together with the source line it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct Located<T> {
    pub token: T,
    pub line: usize,
}

pub fn matches<Token: PartialEq>(i: &mut usize, tokens: &[Located<Token>], tok: &Token) -> bool {
    let r = tokens.get(*i).map(|t| &t.token == tok).unwrap_or(false);
    if r {
        *i += 1;
    }
    r
}

pub fn must_match<Token: PartialEq + Debug>(i: &mut usize,
                                            tokens: &[Located<Token>],
                                            tok: &Token)
                                            -> Result<(), ParseError> {
    if matches(i, tokens, tok) {
        Ok(())
    } else {
        Err(unexpected(*i, tokens, &format!("{:?}", tok)))
    }
}

pub fn unexpected<Token: Debug>(i: usize, tokens: &[Located<Token>], expected: &str) -> ParseError {
    match tokens.get(i) {
        Some(t) => ParseError::UnexpectedToken {
            line: t.line,
            expected: expected.to_string(),
            found: format!("{:?}", t.token),
        },
        None => ParseError::UnexpectedEOF(expected.to_string()),
    }
}

pub fn consume_while<F>(it: &mut Peekable<&mut dyn Iterator<Item = char>>, x: F) -> Vec<char>
    where F: Fn(char) -> bool
{
    let mut v: Vec<char> = vec![];

    while let Some(&ch) = it.peek() {
        if x(ch) {
            it.next();
            v.push(ch);
        } else {
            break;
        }
    }

    v
}

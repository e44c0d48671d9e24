use crate::input::parser_utils::{LexerError, Located};

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptToken {
    Value(String),
    Operator(String),
    /// One of `; { } ( ) ,`
    Separator(char),
    LineEnd,
    EOF,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Negator,
    Logical,
    Equality,
    Assignment,
    Operation,
    Other,
}

pub fn operator_kind(op: &str) -> OperatorKind {
    use self::OperatorKind::*;
    match op {
        "NOT" | "!" => Negator,
        "AND" | "OR" | "||" | "&&" | "EOR" | "^" => Logical,
        "=" | "#=" | "+=" | "-=" | "*=" | "/=" | "/#=" | "%=" => Assignment,
        "-" | "*" | "+" | "/" | "/#" | "%" | "DIV" | "MOD" => Operation,
        ">" | ">#" | ">=" | ">=#" | "<" | "<#" | "<=" | "<=#" | "==" | "==#" | "!=" | "!=#" => Equality,
        _ => Other,
    }
}

/// Words that are operators rather than values.
fn word_operator(word: &str) -> bool {
    match word {
        "NOT" | "AND" | "OR" | "EOR" | "DIV" | "MOD" => true,
        _ => false,
    }
}

/// True if `c` may extend the operator `value`.
pub fn validate_operator(value: &str, c: char) -> bool {
    if value.len() > 3 {
        return false;
    }
    match value {
        "|" => c == '|',
        "&" => c == '&',
        "^" => false,
        "!" | "*" | "%" | "=" | "/#" | "#" => c == '=',
        "+" | "-" => c == '=' || value.starts_with(c),
        "/" | "<" | ">" => c == '=' || c == '#',
        "==" | "!=" | "<=" | ">=" => c == '#',
        _ => false,
    }
}

fn is_operator_char(c: char) -> bool {
    match c {
        '|' | '&' | '^' | '!' | '+' | '-' | '%' | '#' | '<' | '>' | '=' | '*' | '/' => true,
        _ => false,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    None,
    Operator,
    OpenComment,
    EndComment,
}

fn flush(tokens: &mut Vec<Located<ScriptToken>>, value: &mut String, state: State, line: usize) -> bool {
    if value.is_empty() {
        return false;
    }
    let s = std::mem::replace(value, String::new());
    let token = if state == State::Operator || word_operator(&s) {
        ScriptToken::Operator(s)
    } else {
        ScriptToken::Value(s)
    };
    tokens.push(Located { token, line });
    true
}

/// Splits script source into uppercased tokens. A `LineEnd` follows every
/// line that produced a token; comments produce nothing.
pub fn lexer(x: &mut dyn Iterator<Item = char>) -> Result<Vec<Located<ScriptToken>>, LexerError> {
    let source: String = x.collect();
    let mut tokens = Vec::new();
    let mut state = State::None;
    let mut value = String::new();
    let mut line = 0;

    for text in source.lines() {
        line += 1;
        let mut content = false;
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match state {
                State::OpenComment => {
                    if c == '*' {
                        state = State::EndComment;
                    }
                    continue;
                }
                State::EndComment => {
                    state = match c {
                        '/' => State::None,
                        '*' => State::EndComment,
                        _ => State::OpenComment,
                    };
                    continue;
                }
                _ => {}
            }

            match c {
                '/' if state == State::Operator && value == "/" => {
                    value.clear();
                    state = State::None;
                    break;
                }
                '*' if state == State::Operator && value == "/" => {
                    value.clear();
                    state = State::OpenComment;
                }
                '"' => {
                    content |= flush(&mut tokens, &mut value, state, line);
                    state = State::None;
                    let mut s = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some(c) => s.push(c),
                            None => return Err(LexerError::UnexpectedEOF { i: line, what: "quoted string" }),
                        }
                    }
                    tokens.push(Located { token: ScriptToken::Value(s), line });
                    content = true;
                }
                ';' | '{' | '}' | '(' | ')' | ',' => {
                    flush(&mut tokens, &mut value, state, line);
                    state = State::None;
                    tokens.push(Located { token: ScriptToken::Separator(c), line });
                    content = true;
                }
                c if c.is_whitespace() => {
                    content |= flush(&mut tokens, &mut value, state, line);
                    state = State::None;
                }
                c if is_operator_char(c) => {
                    if state == State::Operator {
                        if !validate_operator(&value, c) {
                            content |= flush(&mut tokens, &mut value, state, line);
                        }
                    } else {
                        content |= flush(&mut tokens, &mut value, state, line);
                    }
                    value.push(c);
                    state = State::Operator;
                }
                c => {
                    if state == State::Operator {
                        content |= flush(&mut tokens, &mut value, state, line);
                    }
                    state = State::None;
                    value.extend(c.to_uppercase());
                }
            }
        }
        // Code before a block comment still ends its line.
        if state != State::OpenComment && state != State::EndComment {
            content |= flush(&mut tokens, &mut value, state, line);
            state = State::None;
        }
        if content {
            tokens.push(Located { token: ScriptToken::LineEnd, line });
        }
    }
    tokens.push(Located { token: ScriptToken::EOF, line });
    Ok(tokens)
}

//! Token tree for signal scripts: statements, blocks, enclosures and
//! conditionals, before any symbol is resolved.

use super::lexer::{operator_kind, OperatorKind, ScriptToken};
use crate::input::parser_utils::*;

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Value(String),
    Operator(String),
    /// Contents of a parenthesised group.
    Enclosure(Vec<Element>),
    Comma,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Statement { elements: Vec<Element>, line: usize },
    Block(Vec<Node>),
    Conditional {
        guard: Vec<Element>,
        line: usize,
        then: Box<Node>,
        alternates: Vec<(Vec<Element>, Node)>,
        otherwise: Option<Box<Node>>,
    },
}

/// The tokens of one `SCRIPT name` section, terminated by `EOF`.
#[derive(Clone, Debug)]
pub struct ScriptSection {
    pub name: String,
    pub line: usize,
    pub tokens: Vec<Located<ScriptToken>>,
}

fn value_at(t: &[Located<ScriptToken>], i: usize) -> Option<&str> {
    match t.get(i).map(|t| &t.token) {
        Some(ScriptToken::Value(v)) => Some(v.as_str()),
        _ => None,
    }
}

/// Splits a script file into its `SCRIPT name` sections. Lines before the
/// first section and sections opened by `REM SCRIPT` are dropped.
pub fn script_sections(tokens: Vec<Located<ScriptToken>>) -> Vec<ScriptSection> {
    let mut sections: Vec<ScriptSection> = Vec::new();
    let mut current: Option<ScriptSection> = None;
    let mut i = 0;
    while i < tokens.len() {
        let line_start = i == 0 || tokens[i - 1].token == ScriptToken::LineEnd;
        if line_start {
            let word = value_at(&tokens, i);
            let next = value_at(&tokens, i + 1);
            let header = match (word, next) {
                (Some("SCRIPT"), Some(name)) => Some(Some(name.to_string())),
                (Some("REM"), Some("SCRIPT")) => Some(None),
                _ => None,
            };
            if let Some(name) = header {
                if let Some(mut s) = current.take() {
                    let line = tokens[i].line;
                    s.tokens.push(Located { token: ScriptToken::EOF, line });
                    sections.push(s);
                }
                let line = tokens[i].line;
                current = name.map(|name| ScriptSection { name, line, tokens: Vec::new() });
                while i < tokens.len() && tokens[i].token != ScriptToken::LineEnd {
                    i += 1;
                }
                i += 1;
                continue;
            }
        }
        if tokens[i].token != ScriptToken::EOF {
            if let Some(ref mut s) = current {
                s.tokens.push(tokens[i].clone());
            }
        }
        i += 1;
    }
    if let Some(mut s) = current {
        let line = tokens.last().map(|t| t.line).unwrap_or(0);
        s.tokens.push(Located { token: ScriptToken::EOF, line });
        sections.push(s);
    }
    sections
}

pub fn parse_body(t: &[Located<ScriptToken>]) -> Result<Vec<Node>, ParseError> {
    let mut i = 0;
    nodes(&mut i, t, false)
}

fn skip_line_ends(i: &mut usize, t: &[Located<ScriptToken>]) {
    while matches(i, t, &ScriptToken::LineEnd) {}
}

fn nodes(i: &mut usize, t: &[Located<ScriptToken>], in_block: bool) -> Result<Vec<Node>, ParseError> {
    let mut list = Vec::new();
    loop {
        while matches(i, t, &ScriptToken::LineEnd) || matches(i, t, &ScriptToken::Separator(';')) {}
        match t.get(*i).map(|x| &x.token) {
            Some(ScriptToken::Separator('}')) if in_block => {
                *i += 1;
                return Ok(list);
            }
            Some(ScriptToken::Separator('}')) => return Err(unexpected(*i, t, "a statement")),
            Some(ScriptToken::EOF) | None => {
                if in_block {
                    return Err(ParseError::UnexpectedEOF("\"}\"".to_string()));
                }
                return Ok(list);
            }
            _ => list.push(node(i, t)?),
        }
    }
}

fn node(i: &mut usize, t: &[Located<ScriptToken>]) -> Result<Node, ParseError> {
    skip_line_ends(i, t);
    if matches(i, t, &ScriptToken::Separator('{')) {
        return Ok(Node::Block(nodes(i, t, true)?));
    }
    if value_at(t, *i) == Some("IF") {
        return conditional(i, t);
    }
    statement(i, t)
}

fn guard(i: &mut usize, t: &[Located<ScriptToken>]) -> Result<Vec<Element>, ParseError> {
    skip_line_ends(i, t);
    must_match(i, t, &ScriptToken::Separator('('))?;
    enclosure(i, t)
}

fn conditional(i: &mut usize, t: &[Located<ScriptToken>]) -> Result<Node, ParseError> {
    let line = t[*i].line;
    *i += 1;
    let guard_elements = guard(i, t)?;
    let then = Box::new(node(i, t)?);
    let mut alternates = Vec::new();
    let mut otherwise = None;
    loop {
        let mut j = *i;
        while matches(&mut j, t, &ScriptToken::LineEnd) || matches(&mut j, t, &ScriptToken::Separator(';')) {}
        match value_at(t, j) {
            Some("ELSE") => {
                j += 1;
                skip_line_ends(&mut j, t);
                *i = j;
                if value_at(t, *i) == Some("IF") {
                    *i += 1;
                    let g = guard(i, t)?;
                    alternates.push((g, node(i, t)?));
                } else {
                    otherwise = Some(Box::new(node(i, t)?));
                    break;
                }
            }
            Some("ELSEIF") => {
                *i = j + 1;
                let g = guard(i, t)?;
                alternates.push((g, node(i, t)?));
            }
            _ => break,
        }
    }
    Ok(Node::Conditional { guard: guard_elements, line, then, alternates, otherwise })
}

/// True for a line opening with an operator that needs a left operand.
fn opens_with_operator(token: Option<&ScriptToken>) -> bool {
    match token {
        Some(ScriptToken::Operator(o)) => match operator_kind(o) {
            OperatorKind::Operation | OperatorKind::Logical | OperatorKind::Equality => true,
            _ => false,
        },
        _ => false,
    }
}

/// Reads a statement up to `;`, `}` or a line end. A line end after an
/// operator, or before a line opening with one, does not end it.
fn statement(i: &mut usize, t: &[Located<ScriptToken>]) -> Result<Node, ParseError> {
    let line = t.get(*i).map(|x| x.line).unwrap_or(0);
    let mut elements = Vec::new();
    loop {
        match t.get(*i).map(|x| &x.token) {
            Some(ScriptToken::Separator(';')) => {
                *i += 1;
                break;
            }
            Some(ScriptToken::Separator('}')) | Some(ScriptToken::EOF) | None => break,
            Some(ScriptToken::LineEnd) => {
                *i += 1;
                let continues = match elements.last() {
                    Some(Element::Operator(_)) => true,
                    _ => opens_with_operator(t.get(*i).map(|x| &x.token)),
                };
                if !continues {
                    break;
                }
            }
            Some(ScriptToken::Separator('(')) => {
                *i += 1;
                elements.push(Element::Enclosure(enclosure(i, t)?));
            }
            Some(ScriptToken::Separator(',')) => {
                *i += 1;
                elements.push(Element::Comma);
            }
            Some(ScriptToken::Value(v)) => {
                *i += 1;
                elements.push(Element::Value(v.clone()));
            }
            Some(ScriptToken::Operator(o)) => {
                *i += 1;
                elements.push(Element::Operator(o.clone()));
            }
            Some(_) => return Err(unexpected(*i, t, "a statement")),
        }
    }
    fold_signs(&mut elements, false);
    Ok(Node::Statement { elements, line })
}

/// Reads the contents of a group whose `(` has been consumed.
fn enclosure(i: &mut usize, t: &[Located<ScriptToken>]) -> Result<Vec<Element>, ParseError> {
    let mut elements = Vec::new();
    loop {
        match t.get(*i).map(|x| &x.token) {
            Some(ScriptToken::Separator(')')) => {
                *i += 1;
                break;
            }
            Some(ScriptToken::Separator('(')) => {
                *i += 1;
                elements.push(Element::Enclosure(enclosure(i, t)?));
            }
            Some(ScriptToken::Separator(',')) => {
                *i += 1;
                elements.push(Element::Comma);
            }
            Some(ScriptToken::LineEnd) => *i += 1,
            Some(ScriptToken::Value(v)) => {
                *i += 1;
                elements.push(Element::Value(v.clone()));
            }
            Some(ScriptToken::Operator(o)) => {
                *i += 1;
                elements.push(Element::Operator(o.clone()));
            }
            Some(ScriptToken::EOF) | None => return Err(ParseError::UnexpectedEOF("\")\"".to_string())),
            Some(_) => return Err(unexpected(*i, t, "\")\"")),
        }
    }
    fold_signs(&mut elements, true);
    Ok(elements)
}

/// Folds a `+` or `-` into the value after it when it starts an operand:
/// at the start of a group, after a comma, or after a comparison, logical or
/// assignment operator. `-5` becomes the value `-5`, `-A` the value `-A` and
/// `+A` just `A`.
fn fold_signs(elements: &mut Vec<Element>, group: bool) {
    let mut k = 0;
    while k + 1 < elements.len() {
        let starts_operand = match k.checked_sub(1).map(|p| &elements[p]) {
            None => group,
            Some(Element::Comma) => true,
            Some(Element::Operator(o)) => match operator_kind(o) {
                OperatorKind::Equality | OperatorKind::Logical | OperatorKind::Assignment => true,
                _ => false,
            },
            Some(_) => false,
        };
        let folded = match (&elements[k], &elements[k + 1]) {
            (Element::Operator(sign), Element::Value(v)) if starts_operand => match sign.as_str() {
                "-" => Some(format!("-{}", v)),
                "+" => Some(v.clone()),
                _ => None,
            },
            _ => None,
        };
        if let Some(v) = folded {
            elements[k] = Element::Value(v);
            elements.remove(k + 1);
        }
        k += 1;
    }
}

//! Turns the token tree into typed statements, resolving every symbol
//! against the signal configuration and the script's local floats.

use super::ast::*;
use super::lexer::{operator_kind, OperatorKind};
use super::tree::{Element, Node};
use super::ScriptError;
use crate::diagnostics::Diagnostics;
use crate::signals::{sub_type_index, Aspect, BlockState, SignalConfig};
use std::collections::HashMap;

use log::debug;
use smallvec::SmallVec;

/// Splits a minus sign folded onto a name. Numeric literals keep theirs.
fn split_sign(value: &str) -> (bool, &str) {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some('-'), Some(c)) if !c.is_ascii_digit() && c != '.' => (true, &value[1..]),
        _ => (false, value),
    }
}

pub struct ScriptBuilder<'c, 'd> {
    config: &'c SignalConfig,
    diag: &'d mut Diagnostics,
    file: String,
    local_floats: HashMap<String, usize>,
    seen_statement: bool,
}

impl<'c, 'd> ScriptBuilder<'c, 'd> {
    pub fn new(config: &'c SignalConfig, diag: &'d mut Diagnostics, file: &str) -> ScriptBuilder<'c, 'd> {
        ScriptBuilder {
            config,
            diag,
            file: file.to_string(),
            local_floats: HashMap::new(),
            seen_statement: false,
        }
    }

    fn warn(&mut self, line: usize, message: impl Into<String>) {
        self.diag.warn(&self.file, line, message);
    }

    pub fn build(mut self, name: &str, body: &[Node]) -> Result<SignalScript, ScriptError> {
        let statements = self.statements(body)?;
        debug!("Built script {} with {} statements and {} local floats",
               name, statements.len(), self.local_floats.len());
        Ok(SignalScript { name: name.to_string(), local_floats: self.local_floats, statements })
    }

    /// Registers a local float, returning its slot. A name already declared
    /// keeps its slot.
    pub fn declare_float(&mut self, name: &str) -> usize {
        let next = self.local_floats.len();
        *self.local_floats.entry(name.to_uppercase()).or_insert(next)
    }

    fn statements(&mut self, nodes: &[Node]) -> Result<Vec<Statement>, ScriptError> {
        let mut out = Vec::new();
        for node in nodes {
            self.node(node, &mut out)?;
        }
        Ok(out)
    }

    fn node(&mut self, node: &Node, out: &mut Vec<Statement>) -> Result<(), ScriptError> {
        match node {
            Node::Block(nodes) => {
                for n in nodes {
                    self.node(n, out)?;
                }
            }
            Node::Statement { elements, line } => {
                if let Some(s) = self.statement(elements, *line)? {
                    out.push(Statement::Assign(s));
                }
            }
            Node::Conditional { guard, line, then, alternates, otherwise } => {
                self.seen_statement = true;
                let conditions = self.conditions(guard, *line)?;
                let if_block = self.body(then)?;
                let mut else_if_blocks = Vec::new();
                for (g, n) in alternates {
                    else_if_blocks.push(ElseIfBlock { conditions: self.conditions(g, *line)?, block: self.body(n)? });
                }
                let else_block = match otherwise {
                    Some(n) => Some(self.body(n)?),
                    None => None,
                };
                out.push(Statement::Condition(ConditionBlock { conditions, if_block, else_if_blocks, else_block }));
            }
        }
        Ok(())
    }

    fn body(&mut self, node: &Node) -> Result<Vec<Statement>, ScriptError> {
        let mut out = Vec::new();
        self.node(node, &mut out)?;
        Ok(out)
    }

    /// Handles declarations and assignments. Returns `None` for declarations
    /// and for statements that are dropped with a warning.
    fn statement(&mut self, elements: &[Element], line: usize) -> Result<Option<ScriptStatement>, ScriptError> {
        match elements.first() {
            None => return Ok(None),
            Some(Element::Value(v)) if v == "EXTERN" => return Ok(None),
            Some(Element::Value(v)) if v == "FLOAT" => {
                for e in &elements[1..] {
                    match e {
                        Element::Value(name) => {
                            if self.seen_statement && !self.local_floats.contains_key(name) {
                                self.warn(line, format!("Late declaration of FLOAT {}", name));
                            }
                            self.declare_float(name);
                        }
                        Element::Comma => {}
                        _ => self.warn(line, "Invalid FLOAT declaration"),
                    }
                }
                return Ok(None);
            }
            _ => {}
        }
        self.seen_statement = true;

        let assignment = match (elements.get(0), elements.get(1)) {
            (Some(Element::Value(target)), Some(Element::Operator(op))) => {
                match op.as_str() {
                    "==" | "==#" => {
                        self.warn(line, format!("Assignment operator {} corrected to =", op));
                        Some((target.clone(), "=".to_string()))
                    }
                    op if operator_kind(op) == OperatorKind::Assignment => Some((target.clone(), op.to_string())),
                    _ => None,
                }
            }
            _ => None,
        };

        let (target_name, op) = match assignment {
            Some(x) => x,
            None => {
                let terms = self.expression(elements, line)?;
                return Ok(Some(ScriptStatement { target: None, terms, line }));
            }
        };

        let mut rhs = &elements[2..];
        if op == "=" {
            if let Some(Element::Operator(o)) = rhs.first() {
                if o == "#" {
                    self.warn(line, "Assignment operator = # corrected to =");
                    rhs = &rhs[1..];
                }
            }
        }

        let target = match ExternalFloat::from_name(&target_name) {
            Some(f) => AssignTarget::ExternalFloat(f),
            None => match self.local_floats.get(&target_name) {
                Some(slot) => AssignTarget::LocalFloat(*slot),
                None => {
                    self.warn(line, format!("Unknown assignment target {}, statement ignored", target_name));
                    return Ok(None);
                }
            },
        };

        // x op= e  is  x = x op (e)
        let base = op.trim_end_matches('=');
        let terms = if base.is_empty() || base == "#" {
            self.expression(rhs, line)?
        } else {
            let expanded = vec![
                Element::Value(target_name.clone()),
                Element::Operator(base.to_string()),
                Element::Enclosure(rhs.to_vec()),
            ];
            self.expression(&expanded, line)?
        };
        Ok(Some(ScriptStatement { target: Some(target), terms, line }))
    }

    fn expression(&mut self, elements: &[Element], line: usize) -> Result<Vec<StatTerm>, ScriptError> {
        let mut terms = Vec::new();
        let mut group = 0;
        self.terms(elements, 0, &mut group, &mut terms, line)?;
        Ok(terms)
    }

    fn terms(&mut self,
             elements: &[Element],
             nesting: usize,
             group: &mut usize,
             out: &mut Vec<StatTerm>,
             line: usize)
             -> Result<(), ScriptError> {
        let mut operator = TermOperator::None;
        let mut negate = false;
        let mut k = 0;
        while k < elements.len() {
            match &elements[k] {
                Element::Operator(o) => match operator_kind(o) {
                    OperatorKind::Operation => {
                        operator = TermOperator::from_operator(o).unwrap_or(TermOperator::None);
                    }
                    OperatorKind::Negator => negate = true,
                    _ => self.warn(line, format!("Unexpected operator {} in expression", o)),
                },
                Element::Enclosure(inner) => {
                    *group += 1;
                    let g = *group;
                    out.push(StatTerm { kind: TermKind::SubLevel, operator, negate, nesting, group: g, line });
                    self.terms(inner, g, group, out, line)?;
                    operator = TermOperator::None;
                    negate = false;
                }
                Element::Value(_) => {
                    let (kind, minus) = self.term_kind(elements, &mut k, line)?;
                    if minus {
                        operator = match operator {
                            TermOperator::None | TermOperator::Plus => TermOperator::Minus,
                            TermOperator::Minus => TermOperator::Plus,
                            other => {
                                self.warn(line, "Ignored sign in expression");
                                other
                            }
                        };
                    }
                    out.push(StatTerm { kind, operator, negate, nesting, group: 0, line });
                    operator = TermOperator::None;
                    negate = false;
                }
                Element::Comma => self.warn(line, "Unexpected , in expression"),
            }
            k += 1;
        }
        Ok(())
    }

    /// Reads the function call or parameter at `elements[*k]`, leaving `k`
    /// on its last element. The flag is set when a minus sign was folded
    /// onto a name.
    fn term_kind(&mut self, elements: &[Element], k: &mut usize, line: usize) -> Result<(TermKind, bool), ScriptError> {
        let (minus, name) = match &elements[*k] {
            Element::Value(v) => {
                let (minus, name) = split_sign(v);
                (minus, name.to_string())
            }
            _ => return Ok((TermKind::Parameter(Parameter::Invalid), false)),
        };
        if let Some(Element::Enclosure(args)) = elements.get(*k + 1) {
            *k += 1;
            let kind = match ExternalFunction::from_name(&name) {
                Some(f) => TermKind::Function(f, self.parameters(args, &name, line)?),
                None => {
                    self.warn(line, format!("Unknown function call : {}", name));
                    TermKind::Parameter(Parameter::Invalid)
                }
            };
            return Ok((kind, minus));
        }
        if name == "RETURN" {
            return Ok((TermKind::Function(ExternalFunction::Return, SmallVec::new()), minus));
        }
        Ok((TermKind::Parameter(self.resolve_parameter(&name, line)), minus))
    }

    fn parameters(&mut self, args: &[Element], function: &str, line: usize) -> Result<SmallVec<[Parameter; 4]>, ScriptError> {
        let mut params = SmallVec::new();
        if args.is_empty() {
            return Ok(params);
        }
        for part in args.split(|e| *e == Element::Comma) {
            if part.windows(2).any(|w| match w {
                [Element::Value(_), Element::Enclosure(_)] => true,
                _ => false,
            }) {
                return Err(ScriptError::NestedFunctionCall { line, function: function.to_string() });
            }
            match part {
                [Element::Value(v)] => {
                    let (minus, name) = split_sign(v);
                    if minus {
                        self.warn(line, format!("Ignored sign on parameter {}", v));
                    }
                    params.push(self.resolve_parameter(name, line));
                }
                _ => {
                    self.warn(line, format!("Invalid parameter in call to {}", function));
                    params.push(Parameter::Invalid);
                }
            }
        }
        Ok(params)
    }

    /// Resolves a symbol to a parameter. Never fails: unknown names give a
    /// warning and `Constant(0)`.
    pub fn resolve_parameter(&mut self, token: &str, line: usize) -> Parameter {
        let upper = token.to_uppercase();
        let term = upper.trim_start_matches('#');

        if let Ok(x) = term.parse::<i32>() {
            return Parameter::Constant(x);
        }
        if let Some(f) = ExternalFloat::from_name(term) {
            return Parameter::ExternalFloat(f);
        }
        if let Some(slot) = self.local_floats.get(term) {
            return Parameter::LocalFloat(*slot);
        }

        for prefix in &["BLOCK_", "SIGASP_", "SIGFN_", "ORSUBTYPE_", "SIGFEAT_"] {
            if !term.starts_with(prefix) {
                continue;
            }
            let part = &term[prefix.len()..];
            let parsed = match *prefix {
                "BLOCK_" => BlockState::from_name(part).map(Parameter::BlockState),
                "SIGASP_" => Aspect::from_name(part).map(Parameter::SignalAspect),
                "SIGFN_" => self.config.function_index(part).map(Parameter::SignalFunction),
                "ORSUBTYPE_" => self.config.normal_subtype_index(part).map(Parameter::NormalSubtype),
                _ => sub_type_index(part).map(Parameter::SignalFeature),
            };
            if let Some(p) = parsed {
                return p;
            }
            self.warn(line, format!("Unknown {} : {}", prefix, term));
            return Parameter::Constant(0);
        }
        self.warn(line, format!("Unknown parameter : {}", term));
        Parameter::Constant(0)
    }

    fn conditions(&mut self, elements: &[Element], line: usize) -> Result<Vec<ConditionItem>, ScriptError> {
        let mut items = Vec::new();
        let mut k = 0;
        while k < elements.len() {
            match &elements[k] {
                Element::Operator(o) => match operator_kind(o) {
                    OperatorKind::Logical => match o.as_str() {
                        "&&" | "AND" => items.push(ConditionItem::And),
                        "||" | "OR" => items.push(ConditionItem::Or),
                        _ => self.warn(line, format!("Invalid condition operator {}", o)),
                    },
                    OperatorKind::Negator => match elements.get(k + 1) {
                        Some(Element::Enclosure(_)) | Some(Element::Operator(_)) => items.push(ConditionItem::Negate),
                        _ => {
                            items.push(ConditionItem::Leaf(self.comparison(elements, &mut k, line)?));
                        }
                    },
                    _ => self.warn(line, format!("Unexpected operator {} in condition", o)),
                },
                Element::Enclosure(inner) => items.push(ConditionItem::Group(self.conditions(inner, line)?)),
                Element::Value(_) => items.push(ConditionItem::Leaf(self.comparison(elements, &mut k, line)?)),
                Element::Comma => self.warn(line, "Unexpected , in condition"),
            }
            k += 1;
        }
        if items.len() == 1 {
            if let ConditionItem::Group(_) = items[0] {
                if let Some(ConditionItem::Group(inner)) = items.pop() {
                    return Ok(inner);
                }
            }
        }
        Ok(items)
    }

    /// Reads one operand with an optional leading negation.
    fn operand(&mut self, elements: &[Element], k: &mut usize, line: usize) -> Result<(StatTerm, bool), ScriptError> {
        let mut negate = false;
        while let Some(Element::Operator(o)) = elements.get(*k) {
            if operator_kind(o) != OperatorKind::Negator {
                break;
            }
            negate = !negate;
            *k += 1;
        }
        let (kind, minus) = match elements.get(*k) {
            Some(Element::Value(_)) => self.term_kind(elements, k, line)?,
            _ => {
                self.warn(line, "Missing operand in condition");
                (TermKind::Parameter(Parameter::Invalid), false)
            }
        };
        let operator = if minus { TermOperator::Minus } else { TermOperator::None };
        let term = StatTerm { kind, operator, negate: false, nesting: 0, group: 0, line };
        Ok((term, negate))
    }

    fn comparison(&mut self, elements: &[Element], k: &mut usize, line: usize) -> Result<Comparison, ScriptError> {
        let (term1, negate1) = self.operand(elements, k, line)?;
        let condition = match elements.get(*k + 1) {
            Some(Element::Operator(o)) if operator_kind(o) == OperatorKind::Equality => TermCondition::from_operator(o),
            _ => None,
        };
        if condition.is_none() {
            return Ok(Comparison { term1, negate1, condition: None, term2: None, negate2: false });
        }
        *k += 2;
        let (term2, negate2) = self.operand(elements, k, line)?;
        Ok(Comparison { term1, negate1, condition, term2: Some(term2), negate2 })
    }
}

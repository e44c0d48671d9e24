//! Reader for the block-structured text format shared by the route files.
//!
//! ```text
//! SIMISA@@@@@@@@@@JINX0s1t______
//! SignalTypes ( 2
//!     SignalType ( "Home"
//!         SignalFnType ( NORMAL )
//!     )
//! )
//! ```
//!
//! Items are separated by whitespace, `(` and `)` open and close blocks and
//! quoted items may contain whitespace. An item starting with `#` or `_`, or
//! the words `comment` and `skip`, hides the following item or block.

use super::parser_utils::*;
use crate::diagnostics::Diagnostics;
use crate::AppResult;
use regex::Regex;

#[derive(Clone, Debug, PartialEq)]
pub enum StfToken {
    Open,
    Close,
    Item(String),
    Quoted(String),
    EOF,
}

pub fn lexer(x: &mut dyn Iterator<Item = char>) -> Result<Vec<Located<StfToken>>, LexerError> {
    let mut tokens = Vec::new();
    let mut input = x.peekable();
    let mut line = 1;
    while let Some(&ch) = input.peek() {
        match ch {
            '(' => {
                input.next();
                tokens.push(Located { token: StfToken::Open, line });
            }
            ')' => {
                input.next();
                tokens.push(Located { token: StfToken::Close, line });
            }
            '\n' => {
                input.next();
                line += 1;
            }
            c if c.is_whitespace() => {
                input.next();
            }
            '"' => {
                let start = line;
                let mut s = String::new();
                loop {
                    input.next(); // opening quote
                    loop {
                        match input.next() {
                            None => return Err(LexerError::UnexpectedEOF { i: start, what: "quoted item" }),
                            Some('"') => break,
                            Some('\\') => match input.next() {
                                Some('n') => s.push('\n'),
                                Some('t') => s.push('\t'),
                                Some(c) => s.push(c),
                                None => return Err(LexerError::UnexpectedEOF { i: start, what: "quoted item" }),
                            },
                            Some(c) => {
                                if c == '\n' { line += 1; }
                                s.push(c);
                            }
                        }
                    }
                    // "a" + "b" concatenation
                    let ws = consume_while(&mut input, |c| c.is_whitespace());
                    line += ws.iter().filter(|c| **c == '\n').count();
                    if input.peek() != Some(&'+') {
                        break;
                    }
                    input.next();
                    let ws = consume_while(&mut input, |c| c.is_whitespace());
                    line += ws.iter().filter(|c| **c == '\n').count();
                    if input.peek() != Some(&'"') {
                        return Err(LexerError::UnexpectedChar {
                            i: line,
                            c: input.peek().map(|c| c.to_string()).unwrap_or_default(),
                        });
                    }
                }
                tokens.push(Located { token: StfToken::Quoted(s), line: start });
            }
            _ => {
                let mut s = String::new();
                while let Some(&c) = input.peek() {
                    if c == '(' || c == ')' || c.is_whitespace() {
                        break;
                    }
                    input.next();
                    match c {
                        // a stray closing quote ends the item
                        '"' => break,
                        '\\' => match input.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(c) => s.push(c),
                            None => break,
                        },
                        c => s.push(c),
                    }
                }
                tokens.push(Located { token: StfToken::Item(s), line });
            }
        }
    }
    tokens.push(Located { token: StfToken::EOF, line });
    Ok(tokens)
}

/// Unit families accepted by `read_float_units`. Values are converted to
/// metres, metres per second and seconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Units {
    None,
    Distance,
    Speed,
    Time,
}

fn unit_scale(units: Units, suffix: &str) -> Option<f64> {
    let s = match (units, suffix) {
        (_, "") => 1.0,
        (Units::Distance, "m") => 1.0,
        (Units::Distance, "km") => 1000.0,
        (Units::Distance, "cm") => 0.01,
        (Units::Distance, "mm") => 0.001,
        (Units::Distance, "mi") | (Units::Distance, "mile") | (Units::Distance, "miles") => 1609.344,
        (Units::Distance, "yd") => 0.9144,
        (Units::Distance, "ft") => 0.3048,
        (Units::Distance, "in") => 0.0254,
        (Units::Speed, "mps") | (Units::Speed, "m/s") => 1.0,
        (Units::Speed, "kph") | (Units::Speed, "kmh") | (Units::Speed, "km/h") => 1.0 / 3.6,
        (Units::Speed, "mph") => 0.44704,
        (Units::Time, "s") => 1.0,
        (Units::Time, "min") => 60.0,
        (Units::Time, "h") => 3600.0,
        _ => return None,
    };
    Some(s)
}

pub struct StfReader<'a> {
    tokens: Vec<Located<StfToken>>,
    pos: usize,
    file: String,
    diag: &'a mut Diagnostics,
    number_re: Regex,
}

impl<'a> StfReader<'a> {
    pub fn new(source: &str, file: &str, diag: &'a mut Diagnostics) -> AppResult<StfReader<'a>> {
        let raw = lexer(&mut source.chars())?;
        let number_re = Regex::new(r"^([-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?)\s*([A-Za-z/]*)(?:#.*)?$")?;
        let mut reader = StfReader { tokens: Vec::new(), pos: 0, file: file.to_string(), diag, number_re };
        reader.tokens = reader.strip_hidden(raw);
        Ok(reader)
    }

    /// Removes the file signature and everything hidden by comment markers.
    fn strip_hidden(&mut self, raw: Vec<Located<StfToken>>) -> Vec<Located<StfToken>> {
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        if let Some(Located { token: StfToken::Item(s), .. }) = raw.first() {
            if s.starts_with("SIMISA@") {
                i = 1;
            }
        }
        while i < raw.len() {
            let hides = match raw[i].token {
                StfToken::Item(ref s) => {
                    let lower = s.to_lowercase();
                    if lower == "include" {
                        self.diag.warn(&self.file, raw[i].line, "Include directives are not supported, skipped");
                    }
                    s.starts_with('#') || s.starts_with('_') || lower == "comment" || lower == "skip" || lower == "include"
                }
                _ => false,
            };
            if !hides {
                out.push(raw[i].clone());
                i += 1;
                continue;
            }
            i += 1;
            match raw.get(i).map(|t| &t.token) {
                Some(StfToken::Open) => {
                    let mut depth = 0;
                    while i < raw.len() {
                        match raw[i].token {
                            StfToken::Open => depth += 1,
                            StfToken::Close => depth -= 1,
                            StfToken::EOF => break,
                            _ => {}
                        }
                        i += 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
                Some(StfToken::Close) | Some(StfToken::EOF) | None => {}
                Some(_) => i += 1,
            }
        }
        if out.last().map(|t| t.token != StfToken::EOF).unwrap_or(true) {
            let line = raw.last().map(|t| t.line).unwrap_or(1);
            out.push(Located { token: StfToken::EOF, line });
        }
        out
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> usize {
        let i = if self.pos > 0 { self.pos - 1 } else { 0 };
        self.tokens.get(i).map(|t| t.line).unwrap_or(0)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let line = self.line();
        self.diag.warn(&self.file, line, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let line = self.line();
        self.diag.info(&self.file, line, message);
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut *self.diag
    }

    pub fn eof(&self) -> bool {
        self.peek() == &StfToken::EOF
    }

    pub fn peek(&self) -> &StfToken {
        match self.tokens.get(self.pos) {
            Some(t) => &t.token,
            None => &StfToken::EOF,
        }
    }

    fn next_token(&mut self) -> StfToken {
        let t = self.peek().clone();
        if t != StfToken::EOF {
            self.pos += 1;
        }
        t
    }

    pub fn step_back(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        unexpected(self.pos, &self.tokens, expected)
    }

    /// Consumes `target`, which is `(`, `)` or a case-insensitive item.
    pub fn must_match(&mut self, target: &str) -> Result<(), ParseError> {
        let ok = match (self.peek(), target) {
            (StfToken::Open, "(") => true,
            (StfToken::Close, ")") => true,
            (StfToken::Item(s), t) | (StfToken::Quoted(s), t) => s.eq_ignore_ascii_case(t),
            _ => false,
        };
        if ok {
            self.pos += 1;
            Ok(())
        } else if self.eof() {
            Err(ParseError::UnexpectedEOF(format!("\"{}\"", target)))
        } else {
            Err(self.error(&format!("\"{}\"", target)))
        }
    }

    /// Next item as text. A block delimiter is not an item: it is left in
    /// place and an empty string is returned with a warning.
    pub fn read_item(&mut self) -> Result<String, ParseError> {
        match self.next_token() {
            StfToken::Item(s) | StfToken::Quoted(s) => Ok(s),
            StfToken::EOF => Err(ParseError::UnexpectedEOF("an item".to_string())),
            t => {
                self.step_back();
                self.warn(format!("Expected an item, found {:?}", t));
                Ok(String::new())
            }
        }
    }

    pub fn read_string(&mut self) -> Result<String, ParseError> {
        self.read_item()
    }

    fn parse_number(&mut self, item: &str, units: Units) -> Option<f64> {
        let (number, suffix) = match self.number_re.captures(item) {
            Some(c) => (c[1].to_string(), c[2].to_lowercase()),
            None => return None,
        };
        let value = number.parse::<f64>().ok()?;
        if units == Units::None && !suffix.is_empty() {
            return None;
        }
        match unit_scale(units, &suffix) {
            Some(scale) => Some(value * scale),
            None => {
                self.warn(format!("Unknown unit suffix \"{}\" for {:?} in {}", suffix, units, item));
                Some(value)
            }
        }
    }

    fn read_number(&mut self, units: Units, what: &str) -> Result<f64, ParseError> {
        let item = self.read_item()?;
        if item.is_empty() {
            return Ok(0.0);
        }
        match self.parse_number(&item, units) {
            Some(x) => Ok(x),
            None => {
                self.warn(format!("Cannot parse the constant {} {}", what, item));
                Ok(0.0)
            }
        }
    }

    pub fn read_int(&mut self) -> Result<i32, ParseError> {
        Ok(self.read_number(Units::None, "integer")? as i32)
    }

    pub fn read_uint(&mut self) -> Result<u32, ParseError> {
        let x = self.read_number(Units::None, "unsigned integer")?;
        if x < 0.0 {
            self.warn(format!("Negative value {} where an unsigned integer was expected", x));
            return Ok(0);
        }
        Ok(x as u32)
    }

    pub fn read_hex(&mut self) -> Result<u32, ParseError> {
        let item = self.read_item()?;
        match u32::from_str_radix(&item, 16) {
            Ok(x) => Ok(x),
            Err(_) => {
                self.warn(format!("Cannot parse the constant hex string {}", item));
                Ok(0)
            }
        }
    }

    pub fn read_float(&mut self) -> Result<f32, ParseError> {
        Ok(self.read_number(Units::None, "number")? as f32)
    }

    pub fn read_double(&mut self) -> Result<f64, ParseError> {
        self.read_number(Units::None, "number")
    }

    pub fn read_float_units(&mut self, units: Units) -> Result<f32, ParseError> {
        Ok(self.read_number(units, "number")? as f32)
    }

    fn read_block<T, F>(&mut self, default: T, f: F) -> Result<T, ParseError>
        where F: FnOnce(&mut Self) -> Result<T, ParseError>
    {
        self.must_match("(")?;
        if self.end_of_block() {
            return Ok(default);
        }
        let x = f(self)?;
        self.skip_rest_of_block()?;
        Ok(x)
    }

    pub fn read_string_block(&mut self, default: &str) -> Result<String, ParseError> {
        self.read_block(default.to_string(), |s| s.read_string())
    }

    pub fn read_int_block(&mut self, default: i32) -> Result<i32, ParseError> {
        self.read_block(default, |s| s.read_int())
    }

    pub fn read_uint_block(&mut self, default: u32) -> Result<u32, ParseError> {
        self.read_block(default, |s| s.read_uint())
    }

    pub fn read_float_block(&mut self, default: f32) -> Result<f32, ParseError> {
        self.read_block(default, |s| s.read_float())
    }

    pub fn read_float_units_block(&mut self, units: Units, default: f32) -> Result<f32, ParseError> {
        self.read_block(default, |s| s.read_float_units(units))
    }

    pub fn read_bool_block(&mut self, default: bool) -> Result<bool, ParseError> {
        self.read_block(default, |s| {
            let item = s.read_item()?;
            match item.to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => {
                    s.warn(format!("Cannot parse the constant boolean {}", item));
                    Ok(default)
                }
            }
        })
    }

    /// Consumes the closing `)` if it is next. The end of the file also ends
    /// any block.
    pub fn end_of_block(&mut self) -> bool {
        match self.peek() {
            StfToken::Close => {
                self.pos += 1;
                true
            }
            StfToken::EOF => true,
            _ => false,
        }
    }

    pub fn skip_rest_of_block(&mut self) -> Result<(), ParseError> {
        let mut depth = 0;
        loop {
            match self.next_token() {
                StfToken::Open => depth += 1,
                StfToken::Close if depth == 0 => return Ok(()),
                StfToken::Close => depth -= 1,
                StfToken::EOF => return Err(ParseError::UnexpectedEOF("\")\"".to_string())),
                _ => {}
            }
        }
    }

    pub fn skip_block(&mut self) -> Result<(), ParseError> {
        if self.peek() == &StfToken::Open {
            self.pos += 1;
            self.skip_rest_of_block()
        } else {
            self.read_item().map(|_| ())
        }
    }

    /// Reads `name ( ... )` entries until the end of the current block,
    /// calling `f` with the lowercase name. `f` returns false for names it
    /// does not handle; those are skipped.
    pub fn parse_block<F>(&mut self, mut f: F) -> Result<(), ParseError>
        where F: FnMut(&mut Self, &str) -> Result<bool, ParseError>
    {
        while !self.end_of_block() {
            self.parse_entry(&mut f)?;
        }
        Ok(())
    }

    /// Like `parse_block`, for the top level of a file.
    pub fn parse_file<F>(&mut self, mut f: F) -> Result<(), ParseError>
        where F: FnMut(&mut Self, &str) -> Result<bool, ParseError>
    {
        while !self.eof() {
            if self.peek() == &StfToken::Close {
                self.pos += 1;
                self.warn("Unexpected \")\" at top level");
                continue;
            }
            self.parse_entry(&mut f)?;
        }
        Ok(())
    }

    fn parse_entry<F>(&mut self, f: &mut F) -> Result<(), ParseError>
        where F: FnMut(&mut Self, &str) -> Result<bool, ParseError>
    {
        match self.next_token() {
            StfToken::Item(name) | StfToken::Quoted(name) => {
                if !f(self, &name.to_lowercase())? {
                    self.info(format!("Skipped unknown token {}", name));
                    if self.peek() == &StfToken::Open {
                        self.skip_block()?;
                    }
                }
            }
            StfToken::Open => {
                self.warn("Found a block without a name, skipped");
                self.skip_rest_of_block()?;
            }
            StfToken::Close | StfToken::EOF => {}
        }
        Ok(())
    }

    /// Reads the declared count of a counted list block, `name ( count ...`.
    pub fn read_count(&mut self) -> Result<usize, ParseError> {
        self.must_match("(")?;
        let n = self.read_int()?;
        Ok(if n < 0 { 0 } else { n as usize })
    }

    /// Reports entries promised by a counted list but not found.
    pub fn report_missing(&mut self, expected: usize, found: usize, what: &str) {
        if found < expected {
            self.warn(format!("{} missing {}(s)", expected - found, what));
        }
    }
}

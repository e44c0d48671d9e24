//! Signal script files: several `SCRIPT name` sections per file, each
//! compiled to a `SignalScript` and attached to the signal types using it.

pub mod ast;
pub mod builder;
pub mod lexer;
pub mod tree;

#[cfg(test)]
mod tests;

use self::ast::SignalScript;
use self::builder::ScriptBuilder;
use crate::diagnostics::Diagnostics;
use crate::input::parser_utils::{LexerError, ParseError};
use crate::signals::SignalConfig;
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

#[derive(Debug, Fail)]
pub enum ScriptError {
    #[fail(display = "line {}: nested function call in parameters of {}", line, function)]
    NestedFunctionCall { line: usize, function: String },
    #[fail(display = "{}", _0)]
    Lexer(#[cause] LexerError),
    #[fail(display = "script {}: {}", _0, _1)]
    Parse(String, #[cause] ParseError),
}

impl From<LexerError> for ScriptError {
    fn from(e: LexerError) -> ScriptError {
        ScriptError::Lexer(e)
    }
}

/// Compiled scripts and the signal types they are attached to.
#[derive(Debug, Default)]
pub struct SignalScripts {
    pub scripts: Vec<Arc<SignalScript>>,
    /// Lowercase signal type name to its script.
    pub by_type: HashMap<String, Arc<SignalScript>>,
}

impl SignalScripts {
    pub fn new() -> SignalScripts {
        SignalScripts { scripts: Vec::new(), by_type: HashMap::new() }
    }

    pub fn script_for(&self, signal_type: &str) -> Option<&Arc<SignalScript>> {
        self.by_type.get(&signal_type.to_lowercase())
    }

    /// Compiles every script in `source` and attaches it. A failure aborts
    /// the rest of the file; scripts attached before it are kept.
    pub fn load_file(&mut self,
                     source: &str,
                     file: &str,
                     config: &SignalConfig,
                     diag: &mut Diagnostics)
                     -> Result<(), ScriptError> {
        let tokens = lexer::lexer(&mut source.chars())?;
        for section in tree::script_sections(tokens) {
            let body = tree::parse_body(&section.tokens).map_err(|e| ScriptError::Parse(section.name.clone(), e))?;
            let script = ScriptBuilder::new(config, diag, file).build(&section.name, &body)?;
            let script = Arc::new(script);
            if !self.allocate(script.clone(), config, diag, file, section.line) {
                info!("Script {} in {} is not used by any signal type", section.name, file);
            }
            self.scripts.push(script);
        }
        debug!("{} scripts loaded, {} signal types with scripts", self.scripts.len(), self.by_type.len());
        Ok(())
    }

    /// Attaches `script` to the type named like it and to every type whose
    /// script reference names it. Types that already have a script keep it.
    pub fn allocate(&mut self,
                    script: Arc<SignalScript>,
                    config: &SignalConfig,
                    diag: &mut Diagnostics,
                    file: &str,
                    line: usize)
                    -> bool {
        let name = script.name.to_lowercase();
        let mut targets: Vec<&str> = Vec::new();
        if config.signal_types.contains_key(name.trim()) {
            targets.push(name.trim());
        }
        let mut by_reference: Vec<&str> = config.signal_types.values()
            .filter(|t| !t.script.is_empty() && t.script.eq_ignore_ascii_case(&script.name))
            .map(|t| t.name.as_str())
            .collect();
        by_reference.sort();
        targets.extend(by_reference);

        let mut used = false;
        for type_name in targets {
            match self.by_type.get(type_name) {
                Some(existing) if Arc::ptr_eq(existing, &script) => {}
                Some(_) => {
                    diag.warn(file, line, format!("Ignored duplicate SignalType script {} for {}", script.name, type_name));
                }
                None => {
                    self.by_type.insert(type_name.to_string(), script.clone());
                    used = true;
                }
            }
        }
        used
    }
}

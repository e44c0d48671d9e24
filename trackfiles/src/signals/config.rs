use super::shapes::SignalShape;
use super::types::SignalType;
use super::FunctionKind;
use crate::diagnostics::Diagnostics;
use crate::input::parser_utils::ParseError;
use crate::input::stf::{StfReader, StfToken};
use std::collections::HashMap;

use log::debug;

/// Which dialect of the configuration file to accept. `Extended` also reads
/// custom function types and normal subtypes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigMode {
    Legacy,
    Extended,
}

/// A signal function: a name on top of one of the fixed kinds. Built-in
/// functions carry the kind's own name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignalFunction {
    pub name: String,
    pub kind: FunctionKind,
}

impl SignalFunction {
    pub fn builtin(kind: FunctionKind) -> SignalFunction {
        SignalFunction { name: kind.name().to_string(), kind }
    }

    pub fn is_builtin(&self) -> bool {
        self.name == self.kind.name()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightTexture {
    pub name: String,
    pub file: String,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightTableEntry {
    pub name: String,
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Clone, Debug)]
pub struct SignalConfig {
    pub file: String,
    /// Built-in functions in fixed order, then custom ones in file order.
    pub functions: Vec<SignalFunction>,
    pub normal_subtypes: Vec<String>,
    pub light_textures: HashMap<String, LightTexture>,
    pub lights_table: HashMap<String, LightTableEntry>,
    /// Keyed by lowercase type name.
    pub signal_types: HashMap<String, SignalType>,
    /// Keyed by uppercase shape file name.
    pub signal_shapes: HashMap<String, SignalShape>,
    pub script_files: Vec<String>,
}

impl SignalConfig {
    pub fn load(stf: &mut StfReader, mode: ConfigMode) -> Result<SignalConfig, ParseError> {
        let mut functions: Vec<SignalFunction> = FunctionKind::all().map(SignalFunction::builtin).collect();
        let mut normal_subtypes = Vec::new();
        let mut light_textures = None;
        let mut lights_table = None;
        let mut signal_types = None;
        let mut signal_shapes = None;
        let mut script_files = None;

        stf.parse_file(|stf, name| {
            match (name, mode) {
                ("lighttextures", _) => light_textures = Some(read_light_textures(stf)?),
                ("lightstab", _) => lights_table = Some(read_lights_table(stf)?),
                ("ortssignalfunctions", ConfigMode::Extended) => read_custom_functions(stf, &mut functions)?,
                ("ortsnormalsubtypes", ConfigMode::Extended) => read_normal_subtypes(stf, &mut normal_subtypes)?,
                ("signaltypes", _) => signal_types = Some(read_signal_types(stf, mode, &functions, &normal_subtypes)?),
                ("signalshapes", _) => signal_shapes = Some(read_signal_shapes(stf)?),
                ("scriptfiles", _) => script_files = Some(read_script_files(stf)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        let file = stf.file().to_string();
        let mut missing = |present: bool, table: &str| {
            if !present {
                stf.diagnostics().warn(&file, 0, format!("Ignored missing {} in {}", table, file));
            }
        };
        missing(light_textures.is_some(), "LightTextures");
        missing(lights_table.is_some(), "LightsTab");
        missing(signal_types.is_some(), "SignalTypes");
        missing(signal_shapes.is_some(), "SignalShapes");
        missing(script_files.is_some(), "ScriptFiles");

        let config = SignalConfig {
            file,
            functions,
            normal_subtypes,
            light_textures: light_textures.unwrap_or_default(),
            lights_table: lights_table.unwrap_or_default(),
            signal_types: signal_types.unwrap_or_default(),
            signal_shapes: signal_shapes.unwrap_or_default(),
            script_files: script_files.unwrap_or_default(),
        };
        debug!("Loaded {} signal types, {} shapes and {} functions from {}",
               config.signal_types.len(), config.signal_shapes.len(), config.functions.len(), config.file);
        Ok(config)
    }

    /// Case-insensitive function lookup, built-ins first. Unknown names give
    /// INFO and a diagnostic.
    pub fn resolve_function(&self, name: &str, diag: &mut Diagnostics) -> SignalFunction {
        match self.function_index(name) {
            Some(i) => self.functions[i].clone(),
            None => {
                diag.info(&self.file, 0, format!("Unknown signal function {}, using INFO", name));
                SignalFunction::builtin(FunctionKind::Info)
            }
        }
    }

    /// Position of `name` in the ordered function list.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn normal_subtype_index(&self, name: &str) -> Option<usize> {
        self.normal_subtypes.iter().position(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn signal_type(&self, name: &str) -> Option<&SignalType> {
        self.signal_types.get(&name.to_lowercase())
    }
}

fn read_custom_functions(stf: &mut StfReader, functions: &mut Vec<SignalFunction>) -> Result<(), ParseError> {
    let count = stf.read_count()?;
    let mut read: Vec<SignalFunction> = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "ortssignalfunctiontype" {
            return Ok(false);
        }
        stf.must_match("(")?;
        if read.len() >= count {
            stf.warn("Skipped extra ORTSFunctionType");
            return stf.skip_rest_of_block().map(|_| true);
        }
        let name = stf.read_string()?.to_uppercase();
        let mut valid = true;
        if FunctionKind::from_name(&name).is_some() {
            stf.warn(format!("Invalid definition of ORTSFunctionType, type is equal to MSTS defined type : {}", name));
            valid = false;
        } else if (name.len() > 3 && name.starts_with("OR_")) || (name.len() > 4 && name.starts_with("ORTS")) {
            stf.warn(format!("Invalid definition of ORTSFunctionType, using reserved type name : {}", name));
            valid = false;
        }
        let kind = if stf.peek() == &StfToken::Close {
            FunctionKind::Info
        } else {
            let underlying = stf.read_string()?;
            match FunctionKind::from_name(&underlying) {
                Some(FunctionKind::Normal) => {
                    stf.warn(format!("Invalid definition of ORTSFunctionType, underlying type value NORMAL is forbidden for custom function types : {}", name));
                    valid = false;
                    FunctionKind::Normal
                }
                Some(k) => k,
                None => {
                    stf.warn(format!("Invalid definition of ORTSFunctionType, underlying type is not equal to a MSTS function type : {}", name));
                    valid = false;
                    FunctionKind::Unknown
                }
            }
        };
        if valid {
            if read.iter().any(|f| f.name == name) {
                stf.warn(format!("Skipped duplicate ORTSSignalFunction definition : {}", name));
            } else {
                read.push(SignalFunction { name, kind });
            }
        }
        stf.skip_rest_of_block()?;
        Ok(true)
    })?;
    for f in read {
        if functions.iter().any(|g| g.name == f.name) {
            stf.warn(format!("Skipped duplicate ORTSSignalFunction definition : {}", f.name));
        } else {
            functions.push(f);
        }
    }
    Ok(())
}

fn read_normal_subtypes(stf: &mut StfReader, subtypes: &mut Vec<String>) -> Result<(), ParseError> {
    let count = stf.read_count()?;
    let mut read: Vec<String> = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "ortsnormalsubtype" {
            return Ok(false);
        }
        stf.must_match("(")?;
        if read.len() >= count {
            stf.warn("Skipped extra ORTSNormalSubtype");
        } else {
            read.push(stf.read_string()?.to_uppercase());
        }
        stf.skip_rest_of_block()?;
        Ok(true)
    })?;
    for s in read {
        if subtypes.contains(&s) {
            stf.warn(format!("Skipped duplicate ORTSNormalSubtype definition : {}", s));
        } else {
            subtypes.push(s);
        }
    }
    Ok(())
}

/// Reads `Name ( count Entry ( ... ) ... )` into a map keyed by `key`,
/// dropping extras and duplicates and reporting missing entries.
fn read_counted_map<T, P, K>(stf: &mut StfReader,
                             entry: &str,
                             what: &str,
                             mut parse: P,
                             key: K)
                             -> Result<HashMap<String, T>, ParseError>
    where P: FnMut(&mut StfReader) -> Result<T, ParseError>,
          K: Fn(&T) -> String
{
    let count = stf.read_count()?;
    let mut map = HashMap::new();
    stf.parse_block(|stf, name| {
        if name != entry {
            return Ok(false);
        }
        if map.len() >= count {
            stf.warn(format!("Skipped extra {}", what));
            stf.skip_block()?;
            return Ok(true);
        }
        let x = parse(stf)?;
        let k = key(&x);
        if map.contains_key(&k) {
            stf.warn(format!("Skipped duplicate {} {}", what, k));
        } else {
            map.insert(k, x);
        }
        Ok(true)
    })?;
    stf.report_missing(count, map.len(), what);
    Ok(map)
}

fn read_light_textures(stf: &mut StfReader) -> Result<HashMap<String, LightTexture>, ParseError> {
    read_counted_map(stf, "lighttex", "LightTex", |stf| {
        stf.must_match("(")?;
        let tex = LightTexture {
            name: stf.read_string()?.to_lowercase(),
            file: stf.read_string()?,
            u0: stf.read_float()?,
            v0: stf.read_float()?,
            u1: stf.read_float()?,
            v1: stf.read_float()?,
        };
        stf.skip_rest_of_block()?;
        Ok(tex)
    }, |t| t.name.clone())
}

fn read_lights_table(stf: &mut StfReader) -> Result<HashMap<String, LightTableEntry>, ParseError> {
    read_counted_map(stf, "lightstabentry", "LightsTabEntry", |stf| {
        stf.must_match("(")?;
        let mut entry = LightTableEntry { name: stf.read_string()?.to_lowercase(), a: 0, r: 0, g: 0, b: 0 };
        stf.parse_block(|stf, name| {
            if name != "colour" {
                return Ok(false);
            }
            stf.must_match("(")?;
            entry.a = stf.read_uint()? as u8;
            entry.r = stf.read_uint()? as u8;
            entry.g = stf.read_uint()? as u8;
            entry.b = stf.read_uint()? as u8;
            stf.skip_rest_of_block()?;
            Ok(true)
        })?;
        Ok(entry)
    }, |e| e.name.clone())
}

fn read_signal_types(stf: &mut StfReader,
                     mode: ConfigMode,
                     functions: &[SignalFunction],
                     subtypes: &[String])
                     -> Result<HashMap<String, SignalType>, ParseError> {
    read_counted_map(stf, "signaltype", "SignalType",
                     |stf| SignalType::parse(stf, mode, functions, subtypes),
                     |t| t.name.clone())
}

fn read_signal_shapes(stf: &mut StfReader) -> Result<HashMap<String, SignalShape>, ParseError> {
    read_counted_map(stf, "signalshape", "SignalShape", SignalShape::parse, |s| s.file_name.clone())
}

fn read_script_files(stf: &mut StfReader) -> Result<Vec<String>, ParseError> {
    stf.must_match("(")?;
    let mut files = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "scriptfile" {
            return Ok(false);
        }
        files.push(stf.read_string_block("")?);
        Ok(true)
    })?;
    Ok(files)
}

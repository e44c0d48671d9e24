use super::sub_type_index;
use super::types::read_flags;
use crate::input::parser_utils::ParseError;
use crate::input::stf::StfReader;

#[derive(Clone, Debug, PartialEq)]
pub struct SignalSubObj {
    pub index: i32,
    pub matrix_name: String,
    pub description: String,
    /// Index into `SIGNAL_SUB_TYPES`, -1 when not given or unknown.
    pub sub_type: i32,
    pub signal_type: Option<String>,
    pub optional: bool,
    pub default: bool,
    pub back_facing: bool,
    pub jn_link: bool,
}

impl SignalSubObj {
    fn parse(stf: &mut StfReader) -> Result<SignalSubObj, ParseError> {
        stf.must_match("(")?;
        let mut obj = SignalSubObj {
            index: stf.read_int()?,
            matrix_name: stf.read_string()?.to_uppercase(),
            description: stf.read_string()?,
            sub_type: -1,
            signal_type: None,
            optional: false,
            default: false,
            back_facing: false,
            jn_link: false,
        };
        stf.parse_block(|stf, name| {
            match name {
                "sigsubtype" => {
                    let t = stf.read_string_block("")?;
                    obj.sub_type = sub_type_index(&t).map(|i| i as i32).unwrap_or(-1);
                }
                "sigsubstype" => obj.signal_type = Some(stf.read_string_block("")?.to_lowercase()),
                "signalflags" => read_flags(stf, "SignalSubObj", |flag| {
                    match flag {
                        "optional" => obj.optional = true,
                        "default" => obj.default = true,
                        "back_facing" => obj.back_facing = true,
                        "jn_link" => obj.jn_link = true,
                        _ => return false,
                    }
                    true
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(obj)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalShape {
    /// Uppercase file name without directories.
    pub file_name: String,
    pub description: String,
    pub sub_objs: Vec<SignalSubObj>,
}

impl SignalShape {
    pub(crate) fn parse(stf: &mut StfReader) -> Result<SignalShape, ParseError> {
        stf.must_match("(")?;
        let path = stf.read_string()?;
        let file_name = path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("").to_uppercase();
        let mut shape = SignalShape { file_name, description: stf.read_string()?, sub_objs: Vec::new() };
        stf.parse_block(|stf, name| {
            if name != "signalsubobjs" {
                return Ok(false);
            }
            let count = stf.read_count()?;
            let mut objs: Vec<SignalSubObj> = Vec::new();
            stf.parse_block(|stf, name| {
                if name != "signalsubobj" {
                    return Ok(false);
                }
                if objs.len() >= count {
                    stf.warn("Skipped extra SignalSubObj");
                    stf.skip_block()?;
                    return Ok(true);
                }
                let obj = SignalSubObj::parse(stf)?;
                if obj.index != objs.len() as i32 {
                    stf.warn(format!("Invalid SignalSubObj index; expected {}, got {}", objs.len(), obj.index));
                }
                objs.push(obj);
                Ok(true)
            })?;
            stf.report_missing(count, objs.len(), "SignalSubObj");
            shape.sub_objs = objs;
            Ok(true)
        })?;
        Ok(shape)
    }

    pub fn sub_obj(&self, matrix_name: &str) -> Option<&SignalSubObj> {
        self.sub_objs.iter().find(|o| o.matrix_name.eq_ignore_ascii_case(matrix_name))
    }
}

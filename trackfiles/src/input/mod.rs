pub mod parser_utils;
pub mod stf;

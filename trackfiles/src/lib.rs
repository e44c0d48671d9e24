#[macro_use]
extern crate failure_derive;

pub mod cache;
pub mod diagnostics;
pub mod input;
pub mod output;
pub mod script;
pub mod signals;
pub mod trackdb;

use cache::FileCache;
use diagnostics::Diagnostics;
use input::stf::StfReader;
use script::SignalScripts;
use signals::{ConfigMode, SignalConfig};
use std::path::Path;
use std::sync::Arc;
use trackdb::TrackDB;

use log::{error, info};

pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f: &Path) -> AppResult<String> {
    use std::fs::File;
    use std::io::prelude::*;
    use std::io::BufReader;

    let file = File::open(f)?;
    let mut file = BufReader::new(&file);
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

fn file_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn load_signal_config(path: &Path, mode: ConfigMode, diag: &mut Diagnostics) -> AppResult<SignalConfig> {
    let contents = read_file(path)?;
    get_signal_config_string(&contents, &file_name(path), mode, diag)
}

pub fn get_signal_config_string(source: &str,
                                file: &str,
                                mode: ConfigMode,
                                diag: &mut Diagnostics)
                                -> AppResult<SignalConfig> {
    let mut stf = StfReader::new(source, file, diag)?;
    let config = SignalConfig::load(&mut stf, mode)?;
    Ok(config)
}

/// Loads a signal configuration once per path.
pub fn cached_signal_config(cache: &FileCache<SignalConfig>,
                            path: &Path,
                            mode: ConfigMode,
                            diag: &mut Diagnostics)
                            -> AppResult<Arc<SignalConfig>> {
    cache.get_or_load(path, |p| load_signal_config(p, mode, diag))
}

/// Compiles the script files listed in `config`, looked up in `dir`. A file
/// that cannot be read or compiled is reported and skipped.
pub fn load_scripts(dir: &Path, config: &SignalConfig, diag: &mut Diagnostics) -> SignalScripts {
    let mut scripts = SignalScripts::new();
    for name in &config.script_files {
        let path = dir.join(name);
        let file = file_name(&path);
        let result = read_file(&path).and_then(|source| {
            scripts.load_file(&source, &file, config, diag).map_err(failure::Error::from)
        });
        match result {
            Ok(()) => info!("Loaded signal scripts from {}", file),
            Err(e) => {
                error!("Signal script file {} could not be loaded: {}", file, e);
                diag.warn(&file, 0, format!("Skipped script file: {}", e));
            }
        }
    }
    scripts
}

pub fn get_scripts_string(source: &str,
                          file: &str,
                          config: &SignalConfig,
                          diag: &mut Diagnostics)
                          -> AppResult<SignalScripts> {
    let mut scripts = SignalScripts::new();
    scripts.load_file(source, file, config, diag)?;
    Ok(scripts)
}

pub fn load_track_db(path: &Path, diag: &mut Diagnostics) -> AppResult<TrackDB> {
    let contents = read_file(path)?;
    get_track_db_string(&contents, &file_name(path), diag)
}

pub fn get_track_db_string(source: &str, file: &str, diag: &mut Diagnostics) -> AppResult<TrackDB> {
    let mut stf = StfReader::new(source, file, diag)?;
    let db = TrackDB::parse(&mut stf)?;
    Ok(db)
}

use std::path::PathBuf;
use structopt::StructOpt;
use trackfiles::diagnostics::Diagnostics;
use trackfiles::signals::ConfigMode;
use trackfiles::*;

/// Trackfiles -- route file decoders for signalling and track topology
#[derive(StructOpt, Debug)]
#[structopt(name = "trackfiles")]
struct Opt {
    /// Verbose mode (-v, -vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Load a signal configuration file
    #[structopt(name = "sigcfg")]
    SigCfg {
        #[structopt(parse(from_os_str))]
        file: PathBuf,

        /// Accept the extended configuration dialect
        #[structopt(long = "orts")]
        orts: bool,

        /// Also compile the script files listed in the configuration
        #[structopt(long = "scripts")]
        scripts: bool,
    },

    /// Load a track database file
    #[structopt(name = "tdb")]
    Tdb {
        #[structopt(parse(from_os_str))]
        file: PathBuf,

        /// Write the database back to this file
        #[structopt(short = "w", long = "write", parse(from_os_str))]
        write: Option<PathBuf>,

        /// Find the junction placed at world tile x, z by world object id
        #[structopt(long = "junction", number_of_values = 3, allow_hyphen_values = true)]
        junction: Vec<i32>,
    },

    /// Compile a single signal script file
    #[structopt(name = "script")]
    Script {
        #[structopt(parse(from_os_str))]
        file: PathBuf,

        /// Signal configuration the script refers to
        #[structopt(long = "sigcfg", parse(from_os_str))]
        sigcfg: PathBuf,

        /// Accept the extended configuration dialect
        #[structopt(long = "orts")]
        orts: bool,
    },
}

fn mode(orts: bool) -> ConfigMode {
    if orts { ConfigMode::Extended } else { ConfigMode::Legacy }
}

fn run(opt: &Opt) -> AppResult<()> {
    let mut diag = Diagnostics::new();
    match opt.cmd {
        Command::SigCfg { ref file, orts, scripts } => {
            let config = load_signal_config(file, mode(orts), &mut diag)?;
            println!("Signal configuration {}:", file.display());
            println!("  {} functions, {} normal subtypes", config.functions.len(), config.normal_subtypes.len());
            println!("  {} signal types, {} signal shapes", config.signal_types.len(), config.signal_shapes.len());
            println!("  {} light textures, {} lights", config.light_textures.len(), config.lights_table.len());
            if opt.verbose >= 2 {
                let mut names: Vec<_> = config.signal_types.keys().collect();
                names.sort();
                for x in names {
                    println!("    * {:?}", config.signal_types[x]);
                }
            }
            if scripts {
                let dir = file.parent().map(|p| p.to_path_buf()).unwrap_or_default();
                let scripts = load_scripts(&dir, &config, &mut diag);
                println!("  {} scripts, attached to {} signal types", scripts.scripts.len(), scripts.by_type.len());
                if opt.verbose >= 1 {
                    let mut types: Vec<_> = scripts.by_type.iter().collect();
                    types.sort_by(|a, b| a.0.cmp(b.0));
                    for (t, s) in types {
                        println!("    {} -> {}", t, s.name);
                    }
                }
            }
        }
        Command::Tdb { ref file, ref write, ref junction } => {
            let db = load_track_db(file, &mut diag)?;
            println!("Track database {}:", file.display());
            println!("  {} track nodes, {} track items", db.node_count(), db.items.len());
            if opt.verbose >= 2 {
                for x in db.nodes.iter().flatten() {
                    println!("    * {:?}", x);
                }
            }
            if let &[tile_x, tile_z, world_id] = &junction[..] {
                match db.junction_node_at(tile_x, tile_z, world_id, &mut diag) {
                    Some(node) => println!("  Junction at {} {} {}: track node {}", tile_x, tile_z, world_id, node.index),
                    None => println!("  No junction at {} {} {}", tile_x, tile_z, world_id),
                }
            }
            if let Some(ref out) = *write {
                use std::fs::File;
                use std::io::BufWriter;
                let file = File::create(out)?;
                let mut writer = BufWriter::new(&file);
                output::tdb::write_tdb(&db, &mut writer)?;
            }
        }
        Command::Script { ref file, ref sigcfg, orts } => {
            let config = load_signal_config(sigcfg, mode(orts), &mut diag)?;
            let source = read_file(file)?;
            let scripts = get_scripts_string(&source, &file.to_string_lossy(), &config, &mut diag)?;
            for s in &scripts.scripts {
                println!("Script {}: {} statements, {} local floats", s.name, s.statements.len(), s.local_floats.len());
                if opt.verbose >= 2 {
                    for x in &s.statements {
                        println!("  > {:?}", x);
                    }
                }
            }
        }
    }

    let warnings = diag.warnings().count();
    println!("{} warnings, {} messages", warnings, diag.len() - warnings);
    if opt.verbose >= 1 {
        for d in &diag.records {
            println!("  {}", d);
        }
    }
    Ok(())
}

pub fn main() {
    let opt = Opt::from_args();
    let level = match opt.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    match run(&opt) {
        Ok(()) => {}
        Err(e) => {
            println!("Error:\n{}", e.as_fail());
            std::process::exit(1);
        }
    }
}

mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use policy::ProfileConfig;
use runtime::Engine;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "aether.toml";
const LOG_ENV: &str = "AETHER_LOG";

#[derive(Parser)]
#[command(name = "aether")]
#[command(about = "Run Aether scripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Deny every capability, whatever the config grants
    #[arg(long, global = true)]
    restricted: bool,

    /// Config file (defaults to ./aether.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Capability profile file; replaces the config's grants
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run {
        /// Path to the script
        file: PathBuf,
    },
    /// Evaluate source text given on the command line
    Eval {
        /// Source text
        code: String,
    },
    /// Start an interactive session
    Repl,
    /// Show the capabilities scripts would be granted
    Caps {
        /// Print as a profile file usable with --profile
        #[arg(long)]
        toml: bool,
    },
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let profile = config.resolve_profile(cli.restricted, cli.profile.as_deref())?;
    let mut engine = config.engine(profile);

    match cli.command {
        Some(Commands::Run { file }) => cmd_run(&mut engine, &file),
        Some(Commands::Eval { code }) => cmd_eval(&mut engine, &code),
        Some(Commands::Repl) | None => cmd_repl(&mut engine),
        Some(Commands::Caps { toml }) => cmd_caps(&engine, toml),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn cmd_run(engine: &mut Engine, file: &Path) -> Result<()> {
    let source = std::fs::read(file).map_err(|source| Error::Script {
        path: file.to_path_buf(),
        source,
    })?;
    tracing::debug!(file = %file.display(), "running script");
    let value = engine.eval_bytes(&source)?;
    flush_trace(engine);
    println!("{value}");
    Ok(())
}

fn cmd_eval(engine: &mut Engine, code: &str) -> Result<()> {
    let value = engine.eval(code)?;
    flush_trace(engine);
    println!("{value}");
    Ok(())
}

fn cmd_repl(engine: &mut Engine) -> Result<()> {
    println!("aether v{}", runtime::version());
    print_caps(engine);
    println!("Type 'quit' or Ctrl+D to exit, ':reset' to clear bindings.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "quit" | "exit" => break,
            ":reset" => {
                engine.reset();
                println!("bindings cleared");
                continue;
            }
            _ => {}
        }

        match engine.eval(input) {
            Ok(value) => {
                flush_trace(engine);
                println!("{value}");
            }
            Err(e) => {
                flush_trace(engine);
                eprintln!("{}", e.render());
            }
        }
    }

    println!();
    Ok(())
}

fn cmd_caps(engine: &Engine, as_toml: bool) -> Result<()> {
    if as_toml {
        print!("{}", toml::to_string(&ProfileConfig::from(engine.profile()))?);
        return Ok(());
    }
    let caps: Vec<_> = engine.profile().iter().collect();
    if caps.is_empty() {
        println!("No capabilities granted.");
    }
    for cap in caps {
        println!("{cap}");
    }
    Ok(())
}

fn print_caps(engine: &Engine) {
    let profile = engine.profile();
    if profile.is_restricted() {
        println!("Capabilities: none (restricted)");
    } else {
        let names: Vec<String> = profile.iter().map(|c| c.to_string()).collect();
        println!("Capabilities: {}", names.join(", "));
    }
}

fn flush_trace(engine: &mut Engine) {
    for line in engine.take_trace() {
        eprintln!("trace: {line}");
    }
}

//! Viewsmith CLI
//!
//! Usage:
//!   viewsmith [OPTIONS] <MANIFEST> [METHOD]
//!
//! Options:
//!   -a, --arg <NAME=VALUE>  Named argument (repeatable)
//!   -s, --scope <FILE>      TOML file with scope values
//!       --no-cache          Recompile templates on every call
//!   -l, --list              List the declared methods and their signatures
//!   -v, --verbose           Increase log verbosity (repeatable)
//!   -h, --help              Print help

use std::path::{Path, PathBuf};

use clap::Parser;

use viewsmith::{Args, Configurator, Error, Manifest, Method, Value};

#[derive(Parser)]
#[command(name = "viewsmith")]
#[command(about = "Render template-backed methods declared in a TOML manifest")]
struct Cli {
    /// Manifest declaring the methods (TOML format)
    manifest: PathBuf,

    /// Method to render
    method: Option<String>,

    /// Named argument as NAME=VALUE
    #[arg(short, long = "arg", value_name = "NAME=VALUE", value_parser = parse_arg)]
    args: Vec<(String, Value)>,

    /// Scope values available to templates (TOML format)
    #[arg(short, long)]
    scope: Option<PathBuf>,

    /// Recompile templates on every call
    #[arg(long)]
    no_cache: bool,

    /// List the declared methods and their signatures
    #[arg(short, long)]
    list: bool,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut manifest = match Manifest::from_file(&cli.manifest) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error loading manifest '{}': {}", cli.manifest.display(), e);
            std::process::exit(1);
        }
    };
    if cli.no_cache {
        manifest.cache = Some(false);
    }

    let scope: Args = match &cli.scope {
        Some(path) => match load_scope(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading scope '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Args::new(),
    };

    let mut views: Configurator<Args> = Configurator::new();
    if let Err(e) = manifest.apply(&mut views) {
        report(&e);
        std::process::exit(1);
    }

    if cli.list {
        print_methods(&views);
        return;
    }

    let Some(method) = cli.method else {
        eprintln!("Error: no method given (use --list to see the declared methods)");
        std::process::exit(2);
    };

    let args: Args = cli.args.into_iter().collect();
    match views.call(&scope, &method, args) {
        Ok(html) => {
            println!("{}", html);
        }
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}

/// Parse `NAME=VALUE`; the value is read as a TOML value when possible, as a
/// bare string otherwise
fn parse_arg(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let value = toml::from_str::<Args>(&format!("value = {}", value))
        .ok()
        .and_then(|mut parsed| parsed.remove("value"))
        .unwrap_or_else(|| Value::from(value));
    Ok((name.trim().to_string(), value))
}

fn load_scope(path: &Path) -> Result<Args, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str(&content).map_err(|e| e.to_string())
}

fn print_methods(views: &Configurator<Args>) {
    for name in views.method_names() {
        match views.method(name) {
            Some(Method::Generated(method)) => {
                let layout = method
                    .layout()
                    .map(|l| format!(" [layout: {}]", l))
                    .unwrap_or_default();
                println!(
                    "{}{}  <- {}{}",
                    name,
                    method.contract().describe(),
                    method.source(),
                    layout
                );
            }
            Some(Method::Native(_)) => println!("{} (native)", name),
            None => {}
        }
    }
}

/// Print an error; compile errors from files get source context
fn report(error: &Error) {
    if let Error::Compile(compile) = error {
        if let Ok(source) = std::fs::read_to_string(&compile.origin) {
            eprint!("{}", compile.format(&source));
            return;
        }
    }
    eprintln!("Error: {}", error);
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use hyperlambda::{
    Engine, EngineConfig, HyperlambdaError, Repl,
    config::DEFAULT_MAX_DEPTH,
    generator,
};

#[derive(Parser)]
#[command(author, version, about = "Hyperlambda interpreter")]
struct Args {
    /// Maximum nesting of `eval` before a run is aborted
    #[arg(long, global = true, env = "HYPERLAMBDA_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run Hyperlambda files, or every *.hl file below a folder
    Run {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Evaluate a snippet of Hyperlambda and print the resulting tree
    Eval { source: String },
    /// Start an interactive REPL session
    Repl,
    /// List the native slots and the arguments they document
    Slots,
}

fn main() -> Result<(), HyperlambdaError> {
    init_logging();
    let args = Args::parse();
    let config = EngineConfig::default().with_max_depth(args.max_depth);
    let engine = Engine::new().with_config(config);
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { paths } => run_paths(&engine, &paths),
        Command::Eval { source } => {
            let root = engine.eval_source(&source)?;
            print!("{}", generator::children_to_hyperlambda(&root));
            Ok(())
        }
        Command::Repl => Repl::new(&engine).run(),
        Command::Slots => {
            list_slots(&engine);
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_paths(engine: &Engine, paths: &[PathBuf]) -> Result<(), HyperlambdaError> {
    let mut scripts = Vec::new();
    for path in paths {
        if path.is_dir() {
            scripts.extend(collect_hl_files(path)?);
        } else {
            scripts.push(path.clone());
        }
    }
    let many = scripts.len() > 1;
    for script in &scripts {
        let output = run_script(engine, script).map_err(|err| {
            eprintln!("{} failed: {err}", script.display());
            err
        })?;
        if many {
            println!("// {}", script.display());
        }
        print!("{output}");
    }
    if many {
        info!(count = scripts.len(), "scripts executed");
    }
    Ok(())
}

fn run_script(engine: &Engine, script: &Path) -> Result<String, HyperlambdaError> {
    let source = fs::read_to_string(script).map_err(|err| io_error(script, err))?;
    let config = engine.config().clone().with_label(script.display().to_string());
    let root = engine.clone().with_config(config).eval_source(&source)?;
    Ok(generator::children_to_hyperlambda(&root))
}

fn collect_hl_files(root: &Path) -> Result<Vec<PathBuf>, HyperlambdaError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| io_error(root, err))? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(collect_hl_files(&path)?);
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("hl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn list_slots(engine: &Engine) {
    let registry = engine.registry();
    for name in registry.names() {
        match registry.arguments(name) {
            Some(arguments) => {
                let text = generator::children_to_hyperlambda(&arguments);
                println!("{name}");
                for line in text.lines() {
                    println!("   {line}");
                }
            }
            None => println!("{name}"),
        }
    }
}

fn io_error(path: &Path, err: std::io::Error) -> HyperlambdaError {
    HyperlambdaError::Io(std::io::Error::new(
        err.kind(),
        format!("cannot read `{}`: {err}", path.display()),
    ))
}

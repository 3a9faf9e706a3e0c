use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{config::Config as EditorConfig, Editor, Helper};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

use sprig::lang::ast::Identifier;
use sprig::lang::environment::Environment;
use sprig::lang::eval::Value;
use sprig::lang::functions::{FunctionDef, Primitive};
use sprig::lang::runtime::Runtime;

mod repl;

use repl::{fixup_input, ReplHelper};

const HISTORY_FILE: &str = ".sprig_history";
const PROMPT: &str = "(sprig) ";

#[derive(Parser)]
#[command(version, about)]
struct Opt {
    /// Show debug output
    #[arg(short, long)]
    debug: bool,
    /// Treat CONTENTS as a path to a source file
    #[arg(short, long)]
    file: bool,
    /// Start without the builtin functions (eq, lt, gt, not, iszero)
    #[arg(long)]
    no_prelude: bool,
    /// Program to run. Starts a REPL if omitted
    contents: Option<String>,
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };

    match SimpleLogger::init(filter, LogConfig::default()) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to init logger: {}", e),
    }
}

fn print(args: &[Primitive]) -> Result<Primitive> {
    println!("{}", args[0]);
    Ok(Primitive::None)
}

fn init_environment(prelude: bool) -> Environment {
    let env = if prelude {
        Environment::with_prelude()
    } else {
        Environment::new()
    };

    env.with_function(Identifier::from("print"), FunctionDef::embedded(1, print))
}

fn init_editor() -> Result<Editor<ReplHelper, DefaultHistory>> {
    let config = EditorConfig::builder().auto_add_history(true).build();
    let mut editor =
        Editor::with_config(config).map_err(|e| anyhow!("Failed to init editor: {}", e))?;
    let validator = ReplHelper::new();
    editor.set_helper(Some(validator));

    Ok(editor)
}

fn init_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>) {
    let _ = editor.load_history(HISTORY_FILE);
}

fn save_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>) -> Result<()> {
    match editor.save_history(HISTORY_FILE) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to save history: {}", e),
    }
}

fn welcome() {
    println!(r#"sprig v{}"#, env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl-D to quit");
    println!();
}

fn run_script(rt: &mut Runtime, contents: &str, is_file: bool) -> Result<()> {
    let source = if is_file {
        let path = PathBuf::from(contents);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        contents.to_string()
    };

    match rt.eval(&source)? {
        Value::Null => (),
        val => println!("{}", val),
    }

    Ok(())
}

fn run_repl(rt: &mut Runtime) -> Result<()> {
    let mut editor = init_editor()?;
    init_history(&mut editor);
    welcome();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                info!("read: {}", &line);

                match rt.eval(&fixup_input(&line)) {
                    Ok(Value::Null) => (),
                    Ok(val) => println!("{}", val),
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Press Ctrl-D to quit");
            }
            Err(ReadlineError::Eof) => {
                println!("quit");
                break;
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                println!("quit");
                break;
            }
        }
    }

    save_history(&mut editor)?;

    Ok(())
}

fn main() -> Result<()> {
    let opts = Opt::parse();
    init_logging(opts.debug)?;

    let mut rt = Runtime::new(init_environment(!opts.no_prelude));
    match &opts.contents {
        Some(contents) => run_script(&mut rt, contents, opts.file),
        None => run_repl(&mut rt),
    }
}

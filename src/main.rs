use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use cynch::chunk::*;
use cynch::compiler;
use cynch::diagnostic::{Diagnostic, ansi::AnsiRenderer, json};
use cynch::disasm::disassemble_chunk;
use cynch::value::Value;
use cynch::vm::{Vm, VmOptions};

// sysexits.h
const EXIT_USAGE: u8 = 64;
const EXIT_COMPILE: u8 = 65;
const EXIT_RUNTIME: u8 = 70;

#[derive(Parser, Debug)]
#[command(name = "cynch", version, about = "Compile and run arithmetic expressions on a bytecode VM")]
struct Config {
    /// Source file to compile and run. Without FILE or --expr the built-in demo chunk runs.
    file: Option<PathBuf>,

    /// Inline source instead of a file
    #[arg(short, long, conflicts_with = "file")]
    expr: Option<String>,

    /// What to do with the compiled chunk
    #[arg(long, value_enum, default_value_t = Emit::Run)]
    emit: Emit,

    /// Disassemble the chunk before running it
    #[arg(long)]
    print_code: bool,

    /// Log the stack and each instruction as it executes
    #[arg(long)]
    trace: bool,

    /// Colored diagnostics
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Diagnostics as JSON lines on stderr
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Run,
    Disasm,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl Config {
    fn use_color(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }

    fn report(&self, diagnostic: &Diagnostic) {
        if self.json {
            eprintln!("{}", json::render(diagnostic));
        } else if self.use_color() {
            eprint!("{}", AnsiRenderer { use_color: true }.render(diagnostic));
        } else {
            eprintln!("{}", diagnostic.render_plain());
        }
    }
}

fn init_logging(trace: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // CYNCH_LOG wins; --trace raises our own crate to trace level
    let default = if trace { "cynch=trace" } else { "warn" };
    let filter = EnvFilter::try_from_env("CYNCH_LOG")
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The hand-assembled program: -((1.2 + 3.4) / 5.6), all on line 123.
fn demo_chunk() -> Result<Chunk, ChunkError> {
    let mut chunk = Chunk::new();
    chunk.write_constant(Value::Number(1.2), 123)?;
    chunk.write_constant(Value::Number(3.4), 123)?;
    chunk.write(OP_ADD, 123);
    chunk.write_constant(Value::Number(5.6), 123)?;
    chunk.write(OP_DIVIDE, 123);
    chunk.write(OP_NEGATE, 123);
    chunk.write(OP_RETURN, 123);
    Ok(chunk)
}

fn load_source(config: &Config) -> Result<Option<String>, String> {
    if let Some(expr) = &config.expr {
        return Ok(Some(expr.clone()));
    }
    let Some(path) = &config.file else {
        return Ok(None);
    };
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|e| format!("Error reading {}: {}", path.display(), e))
}

fn run(config: &Config, chunk: &Chunk, source: Option<&str>) -> ExitCode {
    let mut vm = Vm::with_options(VmOptions { trace_execution: config.trace });
    match vm.interpret(chunk) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut diagnostic = Diagnostic::from(&e);
            if let Some(source) = source {
                diagnostic = diagnostic.with_source(source);
            }
            config.report(&diagnostic);
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.trace);

    let source = match load_source(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let Some(source) = source else {
        let chunk = match demo_chunk() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(EXIT_COMPILE);
            }
        };
        print!("{}", disassemble_chunk(&chunk, "test chunk"));
        return run(&config, &chunk, None);
    };

    let chunk = match compiler::compile(&source) {
        Ok(c) => c,
        Err(errors) => {
            for e in &errors.errors {
                config.report(&Diagnostic::from(e).with_source(source.as_str()));
            }
            return ExitCode::from(EXIT_COMPILE);
        }
    };

    match config.emit {
        Emit::Disasm => {
            print!("{}", disassemble_chunk(&chunk, "code"));
            ExitCode::SUCCESS
        }
        Emit::Json => match serde_json::to_string_pretty(&chunk) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                ExitCode::from(EXIT_USAGE)
            }
        },
        Emit::Run => {
            if config.print_code {
                print!("{}", disassemble_chunk(&chunk, "code"));
            }
            run(&config, &chunk, Some(&source))
        }
    }
}

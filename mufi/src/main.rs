use anyhow::{bail, Context, Result};
use clap::Parser;
use mufi_vm::debug::disassemble_chunk;
use mufi_vm::{InterpretResult, Vm, VmConfig};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// sysexits.h
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "mufi")]
#[command(about = "Run a mufi script, or start a REPL when no script is given.")]
struct Args {
    /// Script to run.
    path: Option<PathBuf>,

    /// TOML file with VM settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trace every executed instruction (needs `trace` logging).
    #[arg(long)]
    trace: bool,

    /// Print the compiled chunk to stderr before running it.
    #[arg(long)]
    disassemble: bool,

    /// Log filter, e.g. `debug` or `mufi_vm=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EX_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logger(args.log_level.as_deref());

    let config = match load_config(args.config.as_deref(), args.trace) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{:?}", e);
            return ExitCode::from(EX_USAGE);
        }
    };
    log::debug!("vm config: {:?}", config);

    let mut vm = Vm::new(config);
    match &args.path {
        Some(path) => run_file(&mut vm, path, args.disassemble),
        None => match repl(&mut vm, args.disassemble) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{:?}", e);
                ExitCode::from(EX_IOERR)
            }
        },
    }
}

fn init_logger(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder.init();
}

fn load_config(path: Option<&Path>, trace: bool) -> Result<VmConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config: {}", path.display()))?;
            toml::from_str::<VmConfig>(&text)
                .with_context(|| format!("parsing config: {}", path.display()))?
        }
        None => VmConfig::default(),
    };

    if config.stack_max == 0 {
        bail!("stack_max must be at least 1");
    }
    if trace {
        config.trace_execution = true;
    }
    Ok(config)
}

fn run_file(vm: &mut Vm, path: &Path, disassemble: bool) -> ExitCode {
    let source = match std::fs::read_to_string(path)
        .with_context(|| format!("reading script: {}", path.display()))
    {
        Ok(source) => source,
        Err(e) => {
            log::error!("{:?}", e);
            return ExitCode::from(EX_IOERR);
        }
    };

    let name = path.display().to_string();
    match execute(vm, &source, &name, disassemble) {
        InterpretResult::Ok => ExitCode::SUCCESS,
        InterpretResult::CompileError => ExitCode::from(EX_DATAERR),
        InterpretResult::RuntimeError => ExitCode::from(EX_SOFTWARE),
    }
}

fn repl(vm: &mut Vm, disassemble: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("flushing prompt")?;

        line.clear();
        let n = input.read_line(&mut line).context("reading stdin")?;
        if n == 0 {
            println!();
            return Ok(());
        }

        // Errors were already reported; the session carries on.
        execute(vm, &line, "repl", disassemble);
    }
}

fn execute(vm: &mut Vm, source: &str, name: &str, disassemble: bool) -> InterpretResult {
    if !disassemble {
        return vm.interpret(source);
    }

    match mufi_vm::compile(source, vm.heap_mut()) {
        Ok(chunk) => {
            eprint!("{}", disassemble_chunk(&chunk, vm.heap(), name));
            vm.interpret_chunk(chunk)
        }
        Err(failure) => {
            for diag in &failure.diagnostics {
                eprintln!("{}", diag);
            }
            InterpretResult::CompileError
        }
    }
}

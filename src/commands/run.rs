use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use clap::Args;
use tracing::{debug, warn};

use crate::cli_util::{load_source, print_compile_error, print_supervised_error};
use crate::{
    Cell, CellWidth, EngineConfig, Executor, Op, OpKind, Program, StepControl, SupervisedError,
    compile, run_controlled,
};

#[derive(Args, Debug, Default)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a step-by-step table of operations instead of program output
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Number of tape cells (fallback BF_CAPACITY; default 30_000)
    #[arg(long = "capacity", value_name = "N")]
    pub capacity: Option<usize>,

    /// Cell width (fallback BF_CELL_WIDTH; default u8)
    #[arg(long = "cell-width", value_name = "WIDTH", value_enum)]
    pub cell_width: Option<CellWidth>,

    /// Wall-clock timeout in milliseconds (fallback BF_TIMEOUT_MS; default 2_000)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let code_str = match load_source(program, args.file.as_deref(), &args.code) {
        Ok(s) => s,
        Err(2) => usage_and_exit(program, 2),
        Err(code) => return code,
    };

    let compiled = match compile(&code_str) {
        Ok(p) => Arc::new(p),
        Err(err) => {
            print_compile_error(Some(program), &code_str, &err);
            return 1;
        }
    };

    // Resolve limits: flags -> env -> config file -> defaults
    let mut cfg = EngineConfig::load();
    if let Some(capacity) = args.capacity {
        cfg.capacity = capacity;
    }
    if let Some(width) = args.cell_width {
        cfg.cell_width = width;
    }
    if let Some(ms) = args.timeout_ms {
        cfg.timeout_ms = ms;
    }
    if args.max_steps.is_some() {
        cfg.max_steps = args.max_steps;
    }
    debug!(?cfg, ops = compiled.len(), "starting run");

    // Execute on a worker thread with cooperative cancellation
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_on_sigint = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || cancel_on_sigint.store(true, Ordering::Relaxed)) {
        warn!(error = %e, "failed to set ctrl+c handler");
    }

    let (tx, rx) = mpsc::channel::<Result<(), SupervisedError>>();
    let ctrl = StepControl::new(cfg.max_steps, Arc::clone(&cancel));
    match cfg.cell_width {
        CellWidth::U8 => spawn_worker::<u8>(Arc::clone(&compiled), cfg.capacity, ctrl, args.debug, tx),
        CellWidth::U16 => spawn_worker::<u16>(Arc::clone(&compiled), cfg.capacity, ctrl, args.debug, tx),
        CellWidth::U32 => spawn_worker::<u32>(Arc::clone(&compiled), cfg.capacity, ctrl, args.debug, tx),
        CellWidth::U64 => spawn_worker::<u64>(Arc::clone(&compiled), cfg.capacity, ctrl, args.debug, tx),
    }

    let timeout = Duration::from_millis(cfg.timeout_ms);
    let exit_code = match rx.recv_timeout(timeout) {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            // Program output written so far goes out before the diagnostic.
            let _ = io::stdout().flush();
            print_supervised_error(Some(program), &code_str, &compiled, &err);
            1
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            let _ = io::stdout().flush();
            eprintln!("Execution aborted: wall-clock timeout exceeded ({} ms)", cfg.timeout_ms);
            let _ = io::stderr().flush();
            1
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => 1,
    };

    // For readability on a terminal, ensure output ends with a newline
    if io::stdout().is_terminal() {
        println!();
    }
    let _ = io::stdout().flush();
    exit_code
}

fn spawn_worker<C: Cell>(
    compiled: Arc<Program>,
    capacity: usize,
    ctrl: StepControl,
    debug: bool,
    tx: mpsc::Sender<Result<(), SupervisedError>>,
) {
    thread::spawn(move || {
        let res = execute_supervised::<C>(&compiled, capacity, &ctrl, debug);
        let _ = tx.send(res);
    });
}

fn execute_supervised<C: Cell>(
    compiled: &Program,
    capacity: usize,
    ctrl: &StepControl,
    debug: bool,
) -> Result<(), SupervisedError> {
    let mut exec = Executor::<C>::new(compiled, capacity)?;
    if debug {
        // '.' is logged in the table instead of printed
        exec.set_output_sink(|_| {});
        return run_debug_table(&mut exec, ctrl);
    }

    run_streaming(&mut exec, ctrl, io::stdout())
}

/// Run with every output byte written to `out` as it is produced. The first
/// failed write cancels the run and is reported instead of the cancellation.
fn run_streaming<C, W>(exec: &mut Executor<'_, C>, ctrl: &StepControl, out: W) -> Result<(), SupervisedError>
where
    C: Cell,
    W: Write + Send + 'static,
{
    let failure = Arc::new(Mutex::new(None));
    exec.set_output_sink(forward_output(out, Arc::clone(&ctrl.cancel_flag), Arc::clone(&failure)));
    let result = run_controlled(exec, ctrl);

    let write_error = failure.lock().ok().and_then(|mut slot| slot.take());
    match write_error {
        Some(err) => Err(SupervisedError::OutputFailed(err)),
        None => result,
    }
}

fn forward_output<W>(
    mut out: W,
    cancel: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<io::Error>>>,
) -> impl FnMut(&[u8]) + Send + 'static
where
    W: Write + Send + 'static,
{
    let mut failed = false;
    move |bytes| {
        if failed {
            return;
        }
        if let Err(e) = out.write_all(bytes) {
            failed = true;
            debug!(error = %e, "output write failed; cancelling run");
            if let Ok(mut slot) = failure.lock() {
                *slot = Some(e);
            }
            cancel.store(true, Ordering::Relaxed);
        }
    }
}

/// Step through the program printing one table row per executed operation.
fn run_debug_table<C: Cell>(exec: &mut Executor<'_, C>, ctrl: &StepControl) -> Result<(), SupervisedError> {
    println!("STEP | IP  | PTR | CELL | INSTR | ACTION");
    println!("-----+-----+-----+------+-------+------------------------------------------------");

    while !exec.is_halted() {
        ctrl.check(exec.steps())?;

        let step = exec.steps();
        let ip = exec.pc();
        let op = exec.program()[ip];
        let (ptr_before, cell_before) = (exec.tape().pointer(), exec.tape().current());

        let result = exec.step();

        let action = match &result {
            Err(err) => format!("Fault: {err}"),
            Ok(_) => describe_step(exec, op, ptr_before, cell_before),
        };

        println!(
            "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
            step,
            ip,
            ptr_before,
            cell_before,
            op.kind.symbol(),
            action
        );
        result?;
    }

    Ok(())
}

fn describe_step<C: Cell>(exec: &Executor<'_, C>, op: Op, ptr_before: usize, cell_before: C) -> String {
    match op.kind {
        OpKind::ShiftLeft | OpKind::ShiftRight => {
            format!("Moved pointer head to index {}", exec.tape().pointer())
        }
        OpKind::Increment => {
            format!("Increment cell[{}] from {} to {}", ptr_before, cell_before, exec.tape().current())
        }
        OpKind::Decrement => {
            format!("Decrement cell[{}] from {} to {}", ptr_before, cell_before, exec.tape().current())
        }
        OpKind::Output => {
            format!("Output byte {} (suppressed in debug)", cell_before.low_byte())
        }
        OpKind::Input => "Input".to_string(),
        OpKind::JumpIfZero if cell_before.is_zero() => {
            format!("Cell is 0; jump forward past matching ']' at IP {}", op.operand)
        }
        OpKind::JumpIfZero => "Enter loop (cell != 0)".to_string(),
        OpKind::JumpIfNonzero if !cell_before.is_zero() => {
            format!("Cell != 0; jump back to matching '[' at IP {}", op.operand)
        }
        OpKind::JumpIfNonzero => "Exit loop (cell is 0)".to_string(),
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>
  {0} run [OPTIONS] < program.bf

Options:
  --file,  -f <PATH>    Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d           Print a step-by-step table of operations instead of program output
  --capacity <N>        Number of tape cells (default 30000)
  --cell-width <WIDTH>  u8, u16, u32 or u64 (default u8)
  --timeout <MS>        Wall-clock timeout in milliseconds (default 2000)
  --max-steps <N>       Abort after N executed operations (default unlimited)
  --help,  -h           Show this help

Notes:
- Input (`,`) is not supported; reaching it is a runtime error.
- Characters outside of Brainfuck's ><+-.,[] are ignored as comments.
- Settings fall back to BF_CAPACITY, BF_CELL_WIDTH, BF_TIMEOUT_MS, BF_MAX_STEPS,
  then to the [engine] table of bf.toml in your config directory (or BF_CONFIG).
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_stops_an_endless_output_loop() {
        let program = compile("+[.]").unwrap();
        let mut exec = Executor::<u8>::new(&program, 1).unwrap();
        let ctrl = StepControl::default();

        let err = run_streaming(&mut exec, &ctrl, ClosedPipe).unwrap_err();
        assert!(matches!(
            err,
            SupervisedError::OutputFailed(ref e) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert!(ctrl.cancel_flag.load(Ordering::Relaxed));
        // '+', '[' and the failing '.'; nothing runs after the failure.
        assert_eq!(exec.steps(), 3);
    }

    #[test]
    fn failed_write_on_last_op_is_still_reported() {
        let program = compile("+.").unwrap();
        let mut exec = Executor::<u8>::new(&program, 1).unwrap();
        let err = run_streaming(&mut exec, &StepControl::default(), ClosedPipe).unwrap_err();
        assert!(matches!(err, SupervisedError::OutputFailed(_)));
    }

    #[test]
    fn streaming_without_failures_finishes() {
        let program = compile("+.+.").unwrap();
        let mut exec = Executor::<u8>::new(&program, 1).unwrap();
        run_streaming(&mut exec, &StepControl::default(), io::sink()).unwrap();
        assert!(exec.is_halted());
    }
}

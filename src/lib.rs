//! A small Brainfuck engine built as a two-stage pipeline.
//!
//! 1. [`compile`] turns source text into a [`Program`]: one [`Op`] per
//!    recognized symbol, with every bracket pair's jump target resolved up
//!    front. Unbalanced brackets in either direction are a [`CompileError`].
//! 2. An [`Executor`] runs the program against a fixed-capacity [`Tape`]
//!    (30,000 cells by default) and collects the output bytes.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0; cells wrap at their width (8-bit by default).
//! - Strict pointer bounds: moving left from cell 0 or right past the end
//!   is a [`RuntimeError`], never a wrap or clamp.
//! - Output `.` emits the low byte of the current cell.
//! - Input `,` is not supported and fails when reached.
//! - Characters outside `><+-.,[]` are comments.
//!
//! Quick start:
//!
//! ```
//! let output = bf_engine::run("++++++++[>++++++++<-]>.", 30_000).unwrap();
//! assert_eq!(output, vec![64]);
//! ```

pub mod cli_util;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod control;
pub mod executor;
pub mod logging;
pub mod op;
pub mod tape;

pub use compiler::{CompileError, UnmatchedBracketKind, compile};
pub use config::EngineConfig;
pub use control::{StepControl, SupervisedError, run_controlled};
pub use executor::{Executor, RuntimeError, Step, execute, execute_with};
pub use op::{Op, OpKind, Program};
pub use tape::{Cell, CellWidth, Tape};

/// Either stage of the pipeline failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Execution faulted; `output` holds the bytes written before the fault.
    #[error("{source}")]
    Runtime {
        #[source]
        source: RuntimeError,
        output: Vec<u8>,
    },
}

impl Error {
    /// Output produced before the failure. Always empty for compile errors.
    pub fn partial_output(&self) -> &[u8] {
        match self {
            Error::Compile(_) => &[],
            Error::Runtime { output, .. } => output,
        }
    }
}

/// Compile and execute `source` on a tape of `capacity` 8-bit cells.
///
/// On a runtime fault the output produced so far travels in the error.
pub fn run(source: &str, capacity: usize) -> Result<Vec<u8>, Error> {
    let program = compile(source)?;
    let mut executor = Executor::<u8>::new(&program, capacity)
        .map_err(|source| Error::Runtime { source, output: Vec::new() })?;
    match executor.run() {
        Ok(()) => Ok(executor.into_output()),
        Err(source) => Err(Error::Runtime { source, output: executor.into_output() }),
    }
}

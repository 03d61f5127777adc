//! Runs a compiled [`Program`] against a bounded [`Tape`].

use tracing::{debug, trace};

use crate::op::{OpKind, Program};
use crate::tape::{Cell, Tape, TapeFault};

/// Errors that stop execution. `ip` is the index of the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// `<` with the data pointer already at cell 0.
    #[error("Tape underflow at instruction {ip} (ptr={pointer})")]
    TapeUnderflow { ip: usize, pointer: usize },

    /// `>` with the data pointer already at the last cell.
    #[error("Tape overflow at instruction {ip} (ptr={pointer})")]
    TapeOverflow { ip: usize, pointer: usize },

    /// `,` was reached; this engine has no input source.
    #[error("Input is not supported (instruction {ip})")]
    InputUnsupported { ip: usize },

    /// A jump operand points outside the program.
    #[error("Invalid jump target {target} at instruction {ip}")]
    InvalidJumpTarget { ip: usize, target: usize },

    /// The tape was configured with no cells.
    #[error("Tape capacity must be at least 1")]
    ZeroCapacity,
}

/// Result of a single [`Executor::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One operation was executed.
    Continue,
    /// The program counter is past the end; nothing was executed.
    Halted,
}

type OutputSink = Box<dyn FnMut(&[u8]) + Send>;

/// Execution state for one run of a program: tape, data pointer, program
/// counter and the output produced so far.
pub struct Executor<'p, C: Cell = u8> {
    program: &'p Program,
    tape: Tape<C>,
    pc: usize,
    steps: u64,
    output: Vec<u8>,
    output_sink: Option<OutputSink>,
}

impl<'p, C: Cell> Executor<'p, C> {
    /// Prepare to run `program` on a fresh tape of `capacity` cells.
    pub fn new(program: &'p Program, capacity: usize) -> Result<Self, RuntimeError> {
        let tape = Tape::new(capacity).ok_or(RuntimeError::ZeroCapacity)?;
        Ok(Self {
            program,
            tape,
            pc: 0,
            steps: 0,
            output: Vec::new(),
            output_sink: None,
        })
    }

    /// Send output bytes to `sink` as they are produced instead of buffering
    /// them. The sink receives a single-byte slice per `.`.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn tape(&self) -> &Tape<C> {
        &self.tape
    }

    /// Index of the next operation to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Number of operations executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    /// Buffered output. Empty when an output sink is installed.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Execute the operation at the program counter.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let ip = self.pc;
        let Some(&op) = self.program.get(ip) else {
            return Ok(Step::Halted);
        };

        match op.kind {
            OpKind::Increment => self.tape.increment(op.operand),
            OpKind::Decrement => self.tape.decrement(op.operand),
            OpKind::ShiftLeft => {
                self.tape.shift_left(op.operand).map_err(|fault| self.fault(ip, fault))?;
            }
            OpKind::ShiftRight => {
                self.tape.shift_right(op.operand).map_err(|fault| self.fault(ip, fault))?;
            }
            OpKind::Output => {
                let byte = [self.tape.current().low_byte()];
                match self.output_sink.as_mut() {
                    Some(sink) => sink(&byte),
                    None => self.output.extend_from_slice(&byte),
                }
            }
            OpKind::Input => return Err(RuntimeError::InputUnsupported { ip }),
            OpKind::JumpIfZero => {
                if self.tape.current().is_zero() {
                    self.pc = self.jump_target(ip, op.operand)?;
                    trace!(from = ip, to = self.pc, "cell is 0; skip loop");
                }
            }
            OpKind::JumpIfNonzero => {
                if !self.tape.current().is_zero() {
                    self.pc = self.jump_target(ip, op.operand)?;
                    trace!(from = ip, to = self.pc, "cell != 0; repeat loop");
                }
            }
        }

        // Jumps land on the partner bracket, so the normal advance moves past it.
        self.pc += 1;
        self.steps += 1;
        Ok(Step::Continue)
    }

    /// Run until the program counter passes the end or a fault occurs.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.step()? == Step::Continue {}
        debug!(steps = self.steps, output_len = self.output.len(), "execution finished");
        Ok(())
    }

    fn jump_target(&self, ip: usize, target: usize) -> Result<usize, RuntimeError> {
        if target < self.program.len() {
            Ok(target)
        } else {
            Err(RuntimeError::InvalidJumpTarget { ip, target })
        }
    }

    fn fault(&self, ip: usize, fault: TapeFault) -> RuntimeError {
        let pointer = self.tape.pointer();
        match fault {
            TapeFault::Underflow => RuntimeError::TapeUnderflow { ip, pointer },
            TapeFault::Overflow => RuntimeError::TapeOverflow { ip, pointer },
        }
    }
}

/// Run `program` on a tape of `capacity` 8-bit cells and return its output.
///
/// Output produced before a fault is discarded here; [`crate::run`] and a
/// directly driven [`Executor`] both keep it.
pub fn execute(program: &Program, capacity: usize) -> Result<Vec<u8>, RuntimeError> {
    execute_with::<u8>(program, capacity)
}

/// Like [`execute`], with the cell type chosen by the caller.
pub fn execute_with<C: Cell>(program: &Program, capacity: usize) -> Result<Vec<u8>, RuntimeError> {
    let mut executor = Executor::<C>::new(program, capacity)?;
    executor.run()?;
    Ok(executor.into_output())
}

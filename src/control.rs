//! Step limits and cooperative cancellation layered on top of
//! [`Executor::step`]. The executor itself always runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::executor::{Executor, RuntimeError, Step};
use crate::tape::Cell;

/// Why a supervised run stopped early.
#[derive(Debug, thiserror::Error)]
pub enum SupervisedError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: u64 },

    /// Execution aborted due to cooperative cancellation (e.g., timeout).
    #[error("Execution aborted: cancelled")]
    Canceled,

    /// The output sink could not be written (e.g., a closed pipe).
    #[error("Execution aborted: failed writing output: {0}")]
    OutputFailed(#[source] std::io::Error),
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<u64>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<u64>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }

    /// Check the cancel flag and the step budget before executing step
    /// number `steps + 1`.
    pub fn check(&self, steps: u64) -> Result<(), SupervisedError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(SupervisedError::Canceled);
        }
        if let Some(limit) = self.max_steps {
            if steps >= limit {
                return Err(SupervisedError::StepLimitExceeded { limit });
            }
        }
        Ok(())
    }
}

/// Drive `executor` to completion, stopping early when `control` says so.
pub fn run_controlled<C: Cell>(
    executor: &mut Executor<'_, C>,
    control: &StepControl,
) -> Result<(), SupervisedError> {
    while !executor.is_halted() {
        control.check(executor.steps())?;
        if executor.step()? == Step::Halted {
            break;
        }
    }
    Ok(())
}

/// GPU synchronization primitives and queue submission batches

use crate::error::Result;
use crate::graphics_device::{CommandList, PipelineStages};

/// GPU-GPU signal between queue submissions (and acquire / present)
pub trait Semaphore: Send + Sync {
    fn name(&self) -> &str;
}

/// GPU-CPU signal
pub trait Fence: Send + Sync {
    fn name(&self) -> &str;

    /// Block until signalled or `timeout_ns` elapses; returns false on timeout
    fn wait(&self, timeout_ns: u64) -> Result<bool>;

    /// Return to the unsignalled state
    fn reset(&self) -> Result<()>;

    fn is_signaled(&self) -> Result<bool>;
}

/// One batch of a queue submission
///
/// Each wait semaphore blocks the listed stages of the batch's command lists.
pub struct SubmitBatch<'a> {
    pub waits: Vec<(&'a dyn Semaphore, PipelineStages)>,
    pub command_lists: Vec<&'a dyn CommandList>,
    pub signals: Vec<&'a dyn Semaphore>,
}

impl<'a> SubmitBatch<'a> {
    /// Batch with no semaphores
    pub fn commands(command_lists: Vec<&'a dyn CommandList>) -> Self {
        Self {
            waits: Vec::new(),
            command_lists,
            signals: Vec::new(),
        }
    }
}

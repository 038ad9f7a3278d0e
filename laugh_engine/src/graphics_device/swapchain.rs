/// Swapchain trait - for window presentation

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Semaphore, Texture, TextureFormat};

/// Result of a successful acquire call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image ready; `suboptimal` means the surface no longer matches exactly
    Acquired { image_index: u32, suboptimal: bool },
    /// The surface changed; nothing was acquired and the semaphore is untouched
    OutOfDate,
}

/// Result of a successful present call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Presented (or dropped) but the swapchain is out of date or suboptimal
    Stale,
}

/// Swapchain for presenting rendered images to a window
///
/// Out-of-date and suboptimal states are ordinary outcomes. Only device
/// loss and similar failures are reported as `Err`.
pub trait Swapchain: Send + Sync {
    /// Acquire the next image, signalling `signal` when it is ready
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, timeout_ns: u64) -> Result<AcquireOutcome>;

    /// Queue `image_index` for presentation once every `waits` semaphore is signalled
    fn present(&mut self, image_index: u32, waits: &[&dyn Semaphore]) -> Result<PresentOutcome>;

    /// Recreate the swapchain (e.g., after window resize)
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Presentable images, usable as color attachments
    fn images(&self) -> Vec<Arc<dyn Texture>>;

    fn image_count(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}

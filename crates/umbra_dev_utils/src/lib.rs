//! Umbra Developer Utilities
//!
//! In-memory stand-ins for the GPU used by tests and benches:
//!
//! - [`RecordingDevice`]: a [`RenderDevice`](umbra_rhi::RenderDevice) that
//!   stores buffers, textures, pipelines and submitted command lists, with
//!   per-label pipeline failure injection.
//! - [`HeadlessSwapchain`]: an off-screen swapchain.
//! - [`fixtures`]: small scenes and meshes.

mod device;
pub mod fixtures;
mod swapchain;

pub use device::{DeviceCounters, RecordingDevice};
pub use swapchain::{HEADLESS_COLOR_FORMAT, HEADLESS_DEPTH_FORMAT, HeadlessSwapchain};

/// Installs a test logger once; later calls are no-ops.
pub fn init_test_logger() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

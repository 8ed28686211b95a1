//! Error Types
//!
//! Error types shared by every Umbra crate.
//!
//! # Overview
//!
//! - [`DeviceError`] is what the device abstraction returns from every
//!   fallible call (resource creation, uploads, presentation).
//! - [`UmbraError`] is the frame-level error. Everything it describes is
//!   fatal for the current frame: capacity misconfiguration, graph
//!   structural bugs and device failures.
//!
//! Capability fallbacks (a missing hardware feature or a pipeline variant
//! that fails to build) are not errors. The technique selector recovers
//! from those locally and only logs.

use thiserror::Error;

/// Failure reported by the graphics device abstraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device ran out of memory for the requested allocation.
    #[error("Out of device memory while creating '{0}'")]
    OutOfMemory(String),

    /// A descriptor was rejected by the backend.
    #[error("Invalid descriptor for '{label}': {reason}")]
    InvalidDescriptor { label: String, reason: String },

    /// Shader compilation or pipeline state creation failed.
    #[error("Pipeline '{name}' could not be created: {reason}")]
    PipelineCompilation { name: String, reason: String },

    /// A handle did not refer to a live device object.
    #[error("Stale or destroyed device handle: {0}")]
    InvalidHandle(String),

    /// A buffer write went past the end of the buffer.
    #[error("Buffer write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    WriteOutOfBounds { offset: u64, len: u64, size: u64 },

    /// The bindless descriptor heap is exhausted.
    #[error("Descriptor heap exhausted")]
    DescriptorsExhausted,

    /// The device was lost (driver reset, removal).
    #[error("Device lost: {0}")]
    Lost(String),

    /// Swapchain presentation or resize failed.
    #[error("Swapchain error: {0}")]
    Swapchain(String),
}

/// The main error type for a frame.
#[derive(Error, Debug)]
pub enum UmbraError {
    // ========================================================================
    // Device Errors
    // ========================================================================
    /// A device call failed.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// A pipeline the renderer cannot run without failed to build.
    #[error("Required pipeline '{name}' failed: {source}")]
    PipelineCreation {
        name: String,
        #[source]
        source: DeviceError,
    },

    // ========================================================================
    // Capacity Errors
    // ========================================================================
    /// The frame's combined instance data does not fit the instance buffer.
    #[error("Instance buffer overflow: {required} bytes required, capacity is {capacity} bytes")]
    InstanceBufferOverflow { required: u64, capacity: u64 },

    // ========================================================================
    // Render Graph Errors
    // ========================================================================
    /// A pass referenced a handle the graph cannot resolve.
    #[error("Pass '{pass}' references unresolved resource #{resource}")]
    UnresolvedResource { pass: String, resource: u32 },

    /// An imported texture was destroyed before the graph ran.
    #[error("Pass '{pass}' uses imported texture '{label}' which was already destroyed")]
    ImportedResourceDestroyed { pass: String, label: String },

    /// Attachment addressing is not valid for the target resource.
    #[error("Pass '{pass}' has an invalid attachment: {reason}")]
    InvalidAttachment { pass: String, reason: String },
}

/// Alias for `Result<T, UmbraError>`.
pub type Result<T> = std::result::Result<T, UmbraError>;

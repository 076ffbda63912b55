#![forbid(unsafe_code)]

//! Core types for sblog.
//!
//! - [`Handle`] - generation-checked capability naming a registry slot
//! - [`SlotTable`] - arena of slots with LIFO reuse and handle validation
//! - [`GenerationCounter`] - monotonic id source that never yields 0
//! - [`Config`] - limits and toggles consumed by the registries
//! - [`LogLevel`] - log line severity

pub mod config;
pub mod handle;
pub mod level;
pub mod registry;

pub use config::Config;
pub use handle::{
    Handle, HandleError, HandleKind, SinkHandle, SinkKind, StatusbarHandle, StatusbarKind,
};
pub use level::{LogLevel, ParseLevelError};
pub use registry::{GenerationCounter, RegistryFull, SlotTable};

// Library surface for the terminal binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod matcher;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod ui;

pub use error::{HostError, PracticeError};
pub use host::{EditorHost, MemoryHost};
pub use matcher::{compute_partition, CharRange, Partition};
pub use session::{PracticeController, StopReason};

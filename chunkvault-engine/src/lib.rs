//! Orchestration around `chunkvault`'s codec and selection primitives:
//! the backup engine, the single-flight operation coordinator, the host
//! adapter seam, configuration, and the bounded worker pool.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod host;
pub mod worker;

pub use config::Config;
pub use coordinator::OperationCoordinator;
pub use engine::BackupEngine;
pub use error::EngineError;
pub use host::HostAdapter;

pub mod client;
pub mod engine;

pub use client::{ClientError, Connection, ConnectionState, SyncEvent};
pub use engine::{
    ComposeError, ComposeMode, ComposeRequest, EngineConfig, EngineError, SyncEngine, ViewNotice,
};

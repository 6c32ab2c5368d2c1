pub mod attempt_log;
pub mod config;
pub mod decision;
pub mod engine;
pub mod export;
pub mod frustration;
pub mod persistence;
pub mod rounds;
pub mod service;
pub mod types;

pub use config::EngineConfig;
pub use engine::SessionEngine;
pub use service::SessionService;
#[allow(unused_imports)]
pub use types::*;

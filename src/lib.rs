//! Caruso - Video Transcoding Service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (videos, profiles, manifests, events)
//! - ports/: Trait definitions (media pipeline, video store)
//! - adapters/: Concrete implementations (ffmpeg, in-memory store, HTTP/WS, event hub)
//! - application/: Services (transcode orchestration, video library)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for convenience
pub use adapters::events::EventHub;
pub use application::library::VideoLibrary;
pub use application::orchestrator::TranscodeService;
pub use config::Config;
pub use error::{MediaError, ServiceError};

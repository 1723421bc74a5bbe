//! `GeoMeta` editor: session state, document sources, save and logging setup.

pub mod config;
pub mod error;
pub mod session;
pub mod source;
pub mod telemetry;

pub use config::{EditorConfig, LogConfig, LogFormat};
pub use error::EditorError;
pub use session::{EditorSession, LoadSummary};
pub use source::{DocumentSource, FileSource, HttpSource, StaticSource};
pub use telemetry::init_tracing;

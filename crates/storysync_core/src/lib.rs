//! Two-way synchronization between a timeline document and a novel project.
//! This crate owns the matching and merge rules; front ends only supply
//! paths, configuration, and prompts.

pub mod backup;
pub mod config;
pub mod convert;
pub mod logging;
pub mod model;
pub mod moon;
pub mod novel;
pub mod sync;
pub mod timeline;
pub mod uid;

pub use config::{SyncConfig, SyncOptions, SyncSettings};
pub use convert::{is_error_message, plan, Conversion, ConvertError, Converter, Ui, ERROR_MARKER};
pub use logging::{default_log_dir, default_log_level, init_logging, logging_status};
pub use model::graph::{Graph, GraphError};
pub use model::scene::{Chapter, ChapterKind, EntityKind, NodeId, Scene, SceneKind, WorldEntity};
pub use novel::{NovelDocument, NovelError};
pub use sync::{synchronize, Direction, SyncReport};
pub use timeline::{TimelineDocument, TimelineError};
pub use uid::derive_id;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

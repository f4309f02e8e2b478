use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for rig import, baking and document output
#[derive(Error, Debug)]
pub enum BakeError {
    /// The scene provider could not open or parse the source file
    #[error("failed to import scene {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    /// A skin cluster links a node whose name is not in the skeleton
    #[error("skin cluster references joint '{0}' which is not part of the skeleton")]
    JointNotFound(String),

    /// A joint was bound by more than one skin cluster
    #[error("joint '{0}' is bound to more than one skin cluster")]
    DuplicateBinding(String),

    /// No animation stack or take info to derive a frame range from
    #[error("no animation clip: {0}")]
    NoAnimationClip(String),

    #[error("animation clip '{clip}' ends before it starts ({start}..={stop})")]
    InvalidTimeSpan { clip: String, start: i64, stop: i64 },

    /// Source node graph is not a forest
    #[error("invalid node hierarchy: {0}")]
    InvalidHierarchy(String),

    /// The scene has no mesh node to export
    #[error("scene contains no mesh")]
    NoMesh,

    /// Accessor data in the source file is malformed or of an unsupported type
    #[error("accessor {index}: {reason}")]
    Accessor { index: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BakeError>;

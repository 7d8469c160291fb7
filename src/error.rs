//! Error types for the conversion pipeline.

use thiserror::Error;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause attached to load failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while turning vector artwork into a document.
///
/// Every variant is terminal for the conversion that raised it.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed path data or command sequence.
    #[error("path {path_index}: invalid command at index {command_index}: {message}")]
    SvgParse {
        /// Index of the path in source order.
        path_index: usize,
        /// Index of the offending command within the path.
        command_index: usize,
        /// What was wrong with it.
        message: String,
    },

    /// A contour encloses no area or has too few points.
    #[error("path {path_index}, shape {shape_index}: degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// Index of the path the shape came from.
        path_index: usize,
        /// Index of the contour set within the whole batch.
        shape_index: usize,
        /// Why the shape was rejected.
        reason: String,
    },

    /// The composed scene has no planar extent to normalize against.
    #[error("scene bounds are degenerate ({width} x {height})")]
    DegenerateBounds {
        /// Bounding width in the x axis.
        width: f64,
        /// Bounding height in the y axis.
        height: f64,
    },

    /// A mesh failed the consistency checks performed during export.
    #[error("mesh {mesh_index}: {reason}")]
    Export {
        /// Index of the mesh in export order.
        mesh_index: usize,
        /// Which consistency check failed.
        reason: String,
    },

    /// The vector source could not be retrieved or parsed as a document.
    #[error("failed to load {source_name}: {source}")]
    SourceLoad {
        /// Human readable description of the source (file path, URL, ...).
        source_name: String,
        /// Underlying I/O, transport or document error.
        #[source]
        source: BoxError,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending option.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl Error {
    pub(crate) fn source_load(
        source_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::SourceLoad {
            source_name: source_name.into(),
            source: source.into(),
        }
    }

    /// Attach the batch position to a geometry error.
    pub(crate) fn at_shape(self, index: usize) -> Self {
        match self {
            Error::DegenerateGeometry {
                path_index, reason, ..
            } => Error::DegenerateGeometry {
                path_index,
                shape_index: index,
                reason,
            },
            other => other,
        }
    }
}

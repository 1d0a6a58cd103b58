//! Non-fatal data-quality findings.
//!
//! Every finding is logged when it is raised and also kept, so callers can
//! report or count them after an export.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A mesh reached again through another object
    DuplicateMesh { mesh: String, object: String },
    SkippedCollection { collection: String },
    SkippedMesh { mesh: String },
    /// Format wants colors, mesh has no color layer
    MissingColors { mesh: String },
    /// Format wants texcoords, mesh has no UV layer
    MissingUvs { mesh: String },
    MultipleColorLayers { mesh: String, exported: String },
    MultipleUvLayers { mesh: String, exported: String },
}

impl Diagnostic {
    /// Log the finding through `tracing`.
    pub fn emit(&self) {
        match self {
            Self::SkippedCollection { .. } | Self::SkippedMesh { .. } => {
                tracing::info!("{self}")
            }
            _ => tracing::warn!("{self}"),
        }
    }

    pub fn mesh(&self) -> Option<&str> {
        match self {
            Self::SkippedCollection { .. } => None,
            Self::DuplicateMesh { mesh, .. }
            | Self::SkippedMesh { mesh }
            | Self::MissingColors { mesh }
            | Self::MissingUvs { mesh }
            | Self::MultipleColorLayers { mesh, .. }
            | Self::MultipleUvLayers { mesh, .. } => Some(mesh),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMesh { mesh, object } => write!(
                f,
                "Multiple objects reference mesh {mesh:?}; skipping the reference via {object:?}"
            ),
            Self::SkippedCollection { collection } => write!(
                f,
                "Skipping collection {collection:?} because of its name prefix"
            ),
            Self::SkippedMesh { mesh } => {
                write!(f, "Skipping mesh {mesh:?} because of its name prefix")
            }
            Self::MissingColors { mesh } => write!(
                f,
                "Mesh {mesh:?} has no color layer; writing opaque white"
            ),
            Self::MissingUvs { mesh } => write!(
                f,
                "Mesh {mesh:?} has no UV layer; writing (0.0, 0.0)"
            ),
            Self::MultipleColorLayers { mesh, exported } => write!(
                f,
                "Mesh {mesh:?} has multiple color layers; only exporting {exported:?}"
            ),
            Self::MultipleUvLayers { mesh, exported } => write!(
                f,
                "Mesh {mesh:?} has multiple UV layers; only exporting {exported:?}"
            ),
        }
    }
}

/// Collected findings of one run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diag: Diagnostic) {
        diag.emit();
        self.items.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        // Already emitted when first pushed.
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

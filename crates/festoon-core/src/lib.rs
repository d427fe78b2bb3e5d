pub mod align;
pub mod color;
pub mod document;
pub mod geometry;
pub mod id;
pub mod materials;
pub mod model;
pub mod snap;
pub mod stack_grid;
pub mod symbols;
pub mod zorder;

pub use align::{AlignMode, DistributeAxis};
pub use document::{DesignDocument, ImportError, export_document, import_document, import_str};
pub use geometry::Bounds;
pub use id::{GroupId, NodeId, SymbolId};
pub use materials::{Catalog, MaterialFilter, MaterialSummary, MaterialsExport, compute_materials};
pub use model::*;
pub use snap::{GuideSet, SnapOptions, SnapResult, snap_box};
pub use stack_grid::{
    StackCell, StackCursor, StackDirection, StackGrid, StackGridConfig, StackPattern,
};

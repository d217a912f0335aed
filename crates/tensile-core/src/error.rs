use crate::dtype::DType;
use crate::shape::Shape;

/// All errors that can occur within tensile.
///
/// Shape and category problems are reported while an expression is being
/// built, before any node exists. Sharing violations are reported by every
/// write path instead of being left to debug assertions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operand shapes disagree (e.g. subtracting a [2, 3] from a [3, 2]).
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Matrix product with mismatched inner dimensions.
    #[error("dot shape mismatch: [{m}x{k1}] . [{k2}x{n}], inner dims must match")]
    DotShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// Two batched operands carry a different number of elements.
    #[error("batch count mismatch: expected {expected}, got {got}")]
    BatchCountMismatch { expected: usize, got: usize },

    /// The operation is not defined for this combination of categories.
    #[error("{op} does not accept operands of category {got}")]
    UnsupportedCategory { op: &'static str, got: String },

    /// A sub-view range does not fit inside its parent.
    #[error("sub-view out of bounds: {axis} range {start}..{end} exceeds extent {extent}")]
    SubViewOutOfBounds {
        axis: &'static str,
        start: usize,
        end: usize,
        extent: usize,
    },

    /// Element index outside of the entity's extents.
    #[error("index {index:?} out of bounds for shape {shape}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Shape },

    /// A write was attempted while other handles share the allocation.
    #[error("write refused: storage is shared by {holders} handles")]
    SharedWrite { holders: usize },

    /// The device allocator could not provide the requested block.
    #[error("allocation of {elems} {dtype} elements failed")]
    Alloc { elems: usize, dtype: DType },

    /// Element count mismatch when creating from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// A parameter with this name is already stored.
    #[error("duplicate parameter: {0}")]
    DuplicateParam(String),

    /// No parameter with this name is stored.
    #[error("parameter not found: {0}")]
    ParamNotFound(String),

    /// A constructor argument is outside of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The element count of a shape does not fit in a `usize`.
    #[error("shape {shape} has more elements than can be addressed")]
    ShapeTooLarge { shape: Shape },
}

impl Error {
    pub(crate) fn unsupported(op: &'static str, categories: &[crate::Category]) -> Self {
        let got = categories
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" x ");
        Error::UnsupportedCategory { op, got }
    }
}

/// Convenience Result type used throughout tensile.
pub type Result<T> = std::result::Result<T, Error>;

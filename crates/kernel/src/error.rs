use tilesim_common::{BoundsError, EntityId};

/// Movement axis, as reported by collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub(crate) fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Errors from world operations and simulation ticks.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error("tile id space exhausted: {0} distinct tile types already mapped")]
    TileIdsExhausted(usize),
    #[error("tile type `{0}` does not belong to this world's registry")]
    ForeignTileType(String),
    #[error("collision resolution for entity {entity:?} on axis {axis:?} gave up after {steps} steps")]
    StepLimitExceeded {
        entity: Option<EntityId>,
        axis: Axis,
        steps: u32,
    },
}

use serde::{Deserialize, Serialize};

/// Ground classification of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Land,
    Water,
}

/// The closed set of harvestable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Iron,
    Copper,
    Coal,
    Wood,
    Stone,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Iron,
        ResourceKind::Copper,
        ResourceKind::Coal,
        ResourceKind::Wood,
        ResourceKind::Stone,
    ];

    /// Icon color used by the texture synthesizer, as `#rrggbb`.
    pub fn color_hex(self) -> &'static str {
        match self {
            ResourceKind::Iron => "#9aa7b8",
            ResourceKind::Copper => "#c9763d",
            ResourceKind::Coal => "#2e2e2e",
            ResourceKind::Wood => "#6b4a2b",
            ResourceKind::Stone => "#8d8d8d",
        }
    }
}

/// A resource occurrence on a land tile. Kind and remaining amount are
/// always present together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub kind: ResourceKind,
    pub amount: u32,
}

/// One world tile. Elevation is a band index, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub elevation: u8,
    pub resource: Option<ResourceDeposit>,
}

impl Tile {
    pub fn is_land(&self) -> bool {
        self.kind == TileKind::Land
    }
}

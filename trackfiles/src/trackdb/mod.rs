//! Track topology database: the node graph of a route, its vector
//! sections, the global track item table and the track circuit cross
//! references attached to vector nodes.

pub mod items;
pub mod parser;
pub mod xref;

#[cfg(test)]
mod tests;

pub use self::items::{PData, RData, SData, TrItem, TrItemKind};
pub use self::xref::{Direction, TrackCircuitSectionXref, TrackCircuitXRefList};

use crate::diagnostics::Diagnostics;
use smallvec::SmallVec;
use std::ops::Range;

/// Placement of a node in the world, with the world file tile and object id
/// that created it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UiD {
    pub world_tile_x: i32,
    pub world_tile_z: i32,
    pub world_id: i32,
    pub reserved: i32,
    pub tile_x: i32,
    pub tile_z: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TrPin {
    pub link: i32,
    pub direction: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrVectorSection {
    pub section_index: u32,
    pub shape_index: u32,
    pub world_tile_x: i32,
    pub world_tile_z: i32,
    pub world_uid: u32,
    pub flag1: i32,
    pub flag2: i32,
    pub flag3: String,
    pub tile_x: i32,
    pub tile_z: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrVectorNode {
    pub sections: Vec<TrVectorSection>,
    /// Ids in the track item table, in order along the node.
    pub item_refs: SmallVec<[usize; 4]>,
}

impl TrVectorNode {
    pub fn add_item_ref(&mut self, item: usize) {
        self.item_refs.push(item);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrJunctionNode {
    pub flag: String,
    pub shape_index: u32,
    pub tail: Option<String>,
    /// Current route through the switch, set at run time.
    pub selected_route: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Junction(TrJunctionNode),
    Vector(TrVectorNode),
    End(String),
    Unclassified,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackNode {
    pub index: usize,
    pub uid: Option<UiD>,
    pub kind: NodeKind,
    pub pins: SmallVec<[TrPin; 3]>,
    pub in_pins: u32,
    pub out_pins: u32,
    pub cross_references: Option<TrackCircuitXRefList>,
}

impl TrackNode {
    pub fn new(index: usize, kind: NodeKind) -> TrackNode {
        TrackNode {
            index,
            uid: None,
            kind,
            pins: SmallVec::new(),
            in_pins: 0,
            out_pins: 0,
            cross_references: None,
        }
    }

    /// Pin counts as `[total, in, out]`.
    pub fn expected_pins(&self) -> [u32; 3] {
        match self.kind {
            NodeKind::Junction(_) => [3, 1, 2],
            NodeKind::Vector(_) => [2, 1, 1],
            NodeKind::End(_) => [1, 1, 0],
            NodeKind::Unclassified => [0, 0, 0],
        }
    }

    pub fn junction(&self) -> Option<&TrJunctionNode> {
        match self.kind {
            NodeKind::Junction(ref j) => Some(j),
            _ => None,
        }
    }

    pub fn vector(&self) -> Option<&TrVectorNode> {
        match self.kind {
            NodeKind::Vector(ref v) => Some(v),
            _ => None,
        }
    }

    pub fn vector_mut(&mut self) -> Option<&mut TrVectorNode> {
        match self.kind {
            NodeKind::Vector(ref mut v) => Some(v),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        match self.kind {
            NodeKind::End(_) => true,
            _ => false,
        }
    }
}

/// Slot 0 of `nodes` is never used, so a node's index is its position.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackDB {
    pub file: String,
    pub serial: Option<u32>,
    pub nodes: Vec<Option<TrackNode>>,
    pub items: Vec<TrItem>,
}

impl TrackDB {
    pub fn new(file: &str) -> TrackDB {
        TrackDB { file: file.to_string(), serial: None, nodes: vec![None], items: Vec::new() }
    }

    /// Number of node slots, not counting slot 0.
    pub fn node_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn node(&self, index: usize) -> Option<&TrackNode> {
        self.nodes.get(index).and_then(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut TrackNode> {
        self.nodes.get_mut(index).and_then(|n| n.as_mut())
    }

    /// The node that pin `pin` of node `index` leads to.
    pub fn linked_node(&self, index: usize, pin: usize) -> Option<&TrackNode> {
        let link = self.node(index)?.pins.get(pin)?.link;
        if link <= 0 {
            return None;
        }
        self.node(link as usize)
    }

    pub fn item(&self, id: usize) -> Option<&TrItem> {
        self.items.get(id)
    }

    /// The junction placed by world object `world_id` in world tile
    /// `(tile_x, tile_z)`.
    pub fn junction_node_at(&self,
                            tile_x: i32,
                            tile_z: i32,
                            world_id: i32,
                            diag: &mut Diagnostics)
                            -> Option<&TrackNode> {
        let found = self.nodes.iter().flatten().find(|n| {
            n.junction().is_some() &&
            n.uid.map(|u| u.world_tile_x == tile_x && u.world_tile_z == tile_z && u.world_id == world_id)
                .unwrap_or(false)
        });
        if found.is_none() {
            diag.warn(&self.file, 0,
                      format!("{{TileX:{} TileZ:{}}} track node {} could not be found in TDB", tile_x, tile_z, world_id));
        }
        found
    }

    /// Appends items to the item table, numbering them after the existing
    /// ones. Returns the ids given.
    pub fn append_tr_items(&mut self, items: Vec<TrItem>) -> Range<usize> {
        let start = self.items.len();
        for (i, mut item) in items.into_iter().enumerate() {
            item.id = start + i;
            self.items.push(item);
        }
        start..self.items.len()
    }

    /// Attaches circuit cross references to a vector node. False if `index`
    /// is not a vector node.
    pub fn attach_cross_references(&mut self, index: usize, xrefs: TrackCircuitXRefList) -> bool {
        match self.node_mut(index) {
            Some(node) if node.vector().is_some() => {
                node.cross_references = Some(xrefs);
                true
            }
            _ => false,
        }
    }
}

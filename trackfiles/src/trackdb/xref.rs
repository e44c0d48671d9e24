/// Traversal direction along a vector node, relative to the node's own
/// section order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn slot(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// One track circuit section covering part of a vector node. `offsets[0]`
/// is measured from the start of the node, `offsets[1]` from its end.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackCircuitSectionXref {
    pub section_index: usize,
    pub length: f32,
    pub offsets: [f32; 2],
}

impl TrackCircuitSectionXref {
    pub fn new(section_index: usize, length: f32, forward: f32, backward: f32) -> TrackCircuitSectionXref {
        TrackCircuitSectionXref { section_index, length, offsets: [forward, backward] }
    }

    pub fn offset(&self, direction: Direction) -> f32 {
        self.offsets[direction.slot()]
    }
}

/// Circuit sections along a vector node, in forward order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackCircuitXRefList {
    entries: Vec<TrackCircuitSectionXref>,
}

impl TrackCircuitXRefList {
    pub fn new() -> TrackCircuitXRefList {
        TrackCircuitXRefList { entries: Vec::new() }
    }

    pub fn push(&mut self, xref: TrackCircuitSectionXref) {
        self.entries.push(xref);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&TrackCircuitSectionXref> {
        self.entries.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackCircuitSectionXref> {
        self.entries.iter()
    }

    /// Position of the entry covering `offset`, measured from the end of the
    /// node that `direction` starts at. An offset outside every entry gives
    /// the entry at the far boundary if it still reaches the offset, and
    /// the near boundary otherwise. `None` only for an empty list.
    pub fn xref_index(&self, offset: f32, direction: Direction) -> Option<usize> {
        let last = self.entries.len().checked_sub(1)?;
        let d = direction.slot();
        match direction {
            Direction::Forward => {
                if let Some(i) = (1..self.entries.len()).find(|&i| self.entries[i].offsets[d] > offset) {
                    return Some(i - 1);
                }
                let x = &self.entries[last];
                Some(if offset <= x.offsets[d] + x.length { last } else { 0 })
            }
            Direction::Backward => {
                if let Some(i) = (0..last).rev().find(|&i| self.entries[i].offsets[d] > offset) {
                    return Some(i + 1);
                }
                let x = &self.entries[0];
                Some(if offset <= x.offsets[d] + x.length { 0 } else { last })
            }
        }
    }

    /// The circuit section index at `offset`, see `xref_index`.
    pub fn section_index_at(&self, offset: f32, direction: Direction) -> Option<usize> {
        self.xref_index(offset, direction).map(|i| self.entries[i].section_index)
    }
}

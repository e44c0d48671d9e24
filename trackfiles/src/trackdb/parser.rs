use super::items::{TrItem, TrItemKind};
use super::*;
use crate::input::parser_utils::ParseError;
use crate::input::stf::{StfReader, StfToken};
use smallvec::SmallVec;

use log::debug;

impl TrackDB {
    /// Reads a track database file, `TrackDB ( Serial(n) TrackNodes(...)
    /// TrItemTable(...) )`.
    pub fn parse(stf: &mut StfReader) -> Result<TrackDB, ParseError> {
        let mut db = TrackDB::new(stf.file());
        let mut found = false;
        stf.parse_file(|stf, name| {
            if name != "trackdb" {
                return Ok(false);
            }
            found = true;
            stf.must_match("(")?;
            stf.parse_block(|stf, name| {
                match name {
                    "serial" => db.serial = Some(stf.read_uint_block(0)?),
                    "tracknodes" => db.nodes = read_track_nodes(stf)?,
                    "tritemtable" => db.items = read_item_table(stf)?,
                    _ => return Ok(false),
                }
                Ok(true)
            })?;
            Ok(true)
        })?;
        if !found {
            stf.warn(format!("Missing TrackDB in {}", db.file));
        }
        debug!("Loaded {} track nodes and {} track items from {}", db.node_count(), db.items.len(), db.file);
        Ok(db)
    }
}

fn read_track_nodes(stf: &mut StfReader) -> Result<Vec<Option<TrackNode>>, ParseError> {
    let count = stf.read_count()?;
    let mut nodes = vec![None];
    stf.parse_block(|stf, name| {
        if name != "tracknode" {
            return Ok(false);
        }
        let next = nodes.len();
        if next > count {
            stf.warn("Skipped extra TrackNode");
            stf.skip_block()?;
            return Ok(true);
        }
        nodes.push(Some(read_track_node(stf, next, count)?));
        Ok(true)
    })?;
    stf.report_missing(count, nodes.len() - 1, "TrackNode");
    Ok(nodes)
}

fn read_track_node(stf: &mut StfReader, idx: usize, count: usize) -> Result<TrackNode, ParseError> {
    stf.must_match("(")?;
    let index = stf.read_uint()? as usize;
    if index != idx {
        stf.warn(format!("Track node {} is numbered {}", idx, index));
    }
    let mut node = TrackNode::new(idx, NodeKind::Unclassified);
    stf.parse_block(|stf, name| {
        match name {
            "uid" => node.uid = Some(read_uid(stf)?),
            "trjunctionnode" => node.kind = NodeKind::Junction(read_junction(stf)?),
            "trvectornode" => node.kind = NodeKind::Vector(read_vector_node(stf)?),
            "trendnode" => node.kind = NodeKind::End(stf.read_string_block("")?),
            "trpins" => read_pins(stf, &mut node, count)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    check_pins(stf, &node);
    Ok(node)
}

fn read_uid(stf: &mut StfReader) -> Result<UiD, ParseError> {
    stf.must_match("(")?;
    let uid = UiD {
        world_tile_x: stf.read_int()?,
        world_tile_z: stf.read_int()?,
        world_id: stf.read_int()?,
        reserved: stf.read_int()?,
        tile_x: stf.read_int()?,
        tile_z: stf.read_int()?,
        x: stf.read_float()?,
        y: stf.read_float()?,
        z: stf.read_float()?,
        ax: stf.read_float()?,
        ay: stf.read_float()?,
        az: stf.read_float()?,
    };
    stf.skip_rest_of_block()?;
    Ok(uid)
}

fn read_junction(stf: &mut StfReader) -> Result<TrJunctionNode, ParseError> {
    stf.must_match("(")?;
    let flag = stf.read_string()?;
    let shape_index = stf.read_uint()?;
    let tail = if stf.end_of_block() {
        None
    } else {
        let t = stf.read_string()?;
        stf.skip_rest_of_block()?;
        Some(t)
    };
    Ok(TrJunctionNode { flag, shape_index, tail, selected_route: 0 })
}

fn read_vector_node(stf: &mut StfReader) -> Result<TrVectorNode, ParseError> {
    stf.must_match("(")?;
    let mut node = TrVectorNode::default();
    stf.parse_block(|stf, name| {
        match name {
            "trvectorsections" => node.sections = read_vector_sections(stf)?,
            "tritemrefs" => {
                let count = stf.read_count()?;
                let mut refs: SmallVec<[usize; 4]> = SmallVec::new();
                stf.parse_block(|stf, name| {
                    if name != "tritemref" {
                        return Ok(false);
                    }
                    if refs.len() >= count {
                        stf.warn("Skipped extra TrItemRef");
                        stf.skip_block()?;
                        return Ok(true);
                    }
                    let r = stf.read_int_block(-1)?;
                    if r < 0 {
                        stf.warn(format!("Skipped invalid TrItemRef {}", r));
                    } else {
                        refs.push(r as usize);
                    }
                    Ok(true)
                })?;
                stf.report_missing(count, refs.len(), "TrItemRef");
                node.item_refs = refs;
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(node)
}

fn read_vector_sections(stf: &mut StfReader) -> Result<Vec<TrVectorSection>, ParseError> {
    let count = stf.read_count()?;
    let mut sections = Vec::new();
    while sections.len() < count && stf.peek() != &StfToken::Close && !stf.eof() {
        sections.push(TrVectorSection {
            section_index: stf.read_uint()?,
            shape_index: stf.read_uint()?,
            world_tile_x: stf.read_int()?,
            world_tile_z: stf.read_int()?,
            world_uid: stf.read_uint()?,
            flag1: stf.read_int()?,
            flag2: stf.read_int()?,
            flag3: stf.read_string()?,
            tile_x: stf.read_int()?,
            tile_z: stf.read_int()?,
            x: stf.read_float()?,
            y: stf.read_float()?,
            z: stf.read_float()?,
            ax: stf.read_float()?,
            ay: stf.read_float()?,
            az: stf.read_float()?,
        });
    }
    stf.report_missing(count, sections.len(), "TrVectorSection");
    if !stf.end_of_block() {
        stf.warn("Skipped extra TrVectorSections data");
        stf.skip_rest_of_block()?;
    }
    Ok(sections)
}

/// `TrPins ( in out TrPin ( link direction ) ... )`. Links outside the
/// node table are kept and warned.
fn read_pins(stf: &mut StfReader, node: &mut TrackNode, count: usize) -> Result<(), ParseError> {
    stf.must_match("(")?;
    node.in_pins = stf.read_uint()?;
    node.out_pins = stf.read_uint()?;
    node.pins.clear();
    for i in 0..node.in_pins.saturating_add(node.out_pins) {
        stf.must_match("TrPin")?;
        stf.must_match("(")?;
        let pin = TrPin { link: stf.read_int()?, direction: stf.read_int()? };
        stf.skip_rest_of_block()?;
        if pin.link <= 0 || pin.link as usize > count {
            stf.warn(format!("Track node {} pin {} has invalid link to track node {}", node.index, i, pin.link));
        }
        node.pins.push(pin);
    }
    stf.skip_rest_of_block()
}

fn check_pins(stf: &mut StfReader, node: &TrackNode) {
    let [total, inputs, outputs] = node.expected_pins();
    if node.pins.len() != total as usize {
        stf.warn(format!("Track node {} has unexpected number of pins; expected {}, got {}",
                         node.index, total, node.pins.len()));
    }
    if node.in_pins != inputs {
        stf.warn(format!("Track node {} has unexpected number of input pins; expected {}, got {}",
                         node.index, inputs, node.in_pins));
    }
    if node.out_pins != outputs {
        stf.warn(format!("Track node {} has unexpected number of output pins; expected {}, got {}",
                         node.index, outputs, node.out_pins));
    }
}

/// Items are numbered by position. A block of unknown kind keeps its slot
/// as an empty item.
fn read_item_table(stf: &mut StfReader) -> Result<Vec<TrItem>, ParseError> {
    let count = stf.read_count()?;
    let mut items: Vec<TrItem> = Vec::new();
    stf.parse_block(|stf, name| {
        if items.len() >= count {
            stf.warn(format!("Skipped extra track item {}", name));
            stf.skip_block()?;
            return Ok(true);
        }
        let index = items.len();
        match TrItem::parse(stf, name, index)? {
            Some(item) => items.push(item),
            None => {
                stf.warn(format!("Unknown track item {}, kept as an empty item", name));
                stf.skip_block()?;
                let mut item = TrItem::new(TrItemKind::Empty);
                item.id = index;
                items.push(item);
            }
        }
        Ok(true)
    })?;
    stf.report_missing(count, items.len(), "TrItem");
    Ok(items)
}

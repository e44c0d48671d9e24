use failure::Error;
use std::io;

use crate::trackdb::items::{TrItem, TrItemKind};
use crate::trackdb::{NodeKind, TrackDB, TrackNode, TrVectorSection, UiD};

/// File signature written before the database.
pub const TDB_HEADER: &str = "SIMISA@@@@@@@@@@JINX0T0t______";

/// Renders an item, quoting it when it would not survive as a bare word.
fn item(s: &str) -> String {
    let bare = !s.is_empty() &&
               !s.chars().any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == '\\');
    if bare {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Writes the database in the same text format `TrackDB::parse` reads.
pub fn write_tdb<W: io::Write>(db: &TrackDB, f: &mut W) -> Result<(), Error> {
    write!(f, "{}\n\n", TDB_HEADER)?;
    write!(f, "TrackDB (\n")?;
    if let Some(serial) = db.serial {
        write!(f, "\tSerial ( {} )\n", serial)?;
    }
    write!(f, "\tTrackNodes ( {}\n", db.node_count())?;
    for (index, slot) in db.nodes.iter().enumerate().skip(1) {
        match slot {
            Some(node) => write_node(index, node, f)?,
            // Placeholder keeps the nodes after it at their index.
            None => write!(f, "\t\tTrackNode ( {} )\n", index)?,
        }
    }
    write!(f, "\t)\n")?;
    write!(f, "\tTrItemTable ( {}\n", db.items.len())?;
    for tr_item in &db.items {
        write_item(tr_item, f)?;
    }
    write!(f, "\t)\n")?;
    write!(f, ")\n")?;
    Ok(())
}

fn write_node<W: io::Write>(index: usize, node: &TrackNode, f: &mut W) -> Result<(), Error> {
    write!(f, "\t\tTrackNode ( {}\n", index)?;
    match node.kind {
        NodeKind::Junction(ref j) => {
            write!(f, "\t\t\tTrJunctionNode ( {} {}", item(&j.flag), j.shape_index)?;
            if let Some(ref tail) = j.tail {
                write!(f, " {}", item(tail))?;
            }
            write!(f, " )\n")?;
        }
        NodeKind::Vector(ref v) => {
            write!(f, "\t\t\tTrVectorNode (\n")?;
            write!(f, "\t\t\t\tTrVectorSections ( {}", v.sections.len())?;
            for s in &v.sections {
                write_section(s, f)?;
            }
            write!(f, " )\n")?;
            if !v.item_refs.is_empty() {
                write!(f, "\t\t\t\tTrItemRefs ( {}\n", v.item_refs.len())?;
                for r in &v.item_refs {
                    write!(f, "\t\t\t\t\tTrItemRef ( {} )\n", r)?;
                }
                write!(f, "\t\t\t\t)\n")?;
            }
            write!(f, "\t\t\t)\n")?;
        }
        NodeKind::End(ref e) => write!(f, "\t\t\tTrEndNode ( {} )\n", item(e))?,
        NodeKind::Unclassified => {}
    }
    if let Some(ref uid) = node.uid {
        write_uid(uid, f)?;
    }
    write!(f, "\t\t\tTrPins ( {} {}\n", node.in_pins, node.out_pins)?;
    for pin in &node.pins {
        write!(f, "\t\t\t\tTrPin ( {} {} )\n", pin.link, pin.direction)?;
    }
    write!(f, "\t\t\t)\n")?;
    write!(f, "\t\t)\n")?;
    Ok(())
}

fn write_uid<W: io::Write>(u: &UiD, f: &mut W) -> Result<(), Error> {
    write!(f, "\t\t\tUiD ( {} {} {} {} {} {} {} {} {} {} {} {} )\n",
           u.world_tile_x, u.world_tile_z, u.world_id, u.reserved, u.tile_x, u.tile_z,
           u.x, u.y, u.z, u.ax, u.ay, u.az)?;
    Ok(())
}

fn write_section<W: io::Write>(s: &TrVectorSection, f: &mut W) -> Result<(), Error> {
    write!(f, " {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
           s.section_index, s.shape_index, s.world_tile_x, s.world_tile_z, s.world_uid,
           s.flag1, s.flag2, item(&s.flag3), s.tile_x, s.tile_z,
           s.x, s.y, s.z, s.ax, s.ay, s.az)?;
    Ok(())
}

fn write_item<W: io::Write>(tr_item: &TrItem, f: &mut W) -> Result<(), Error> {
    write!(f, "\t\t{} (\n", tr_item.kind.tag())?;
    write!(f, "\t\t\tTrItemId ( {} )\n", tr_item.id)?;
    if let Some(ref s) = tr_item.sdata {
        write!(f, "\t\t\tTrItemSData ( {} {} )\n", s.distance, item(&s.flags))?;
    }
    if let Some(ref r) = tr_item.rdata {
        write!(f, "\t\t\tTrItemRData ( {} {} {} {} {} )\n", r.x, r.y, r.z, r.tile_x, r.tile_z)?;
    }
    if let Some(ref p) = tr_item.pdata {
        write!(f, "\t\t\tTrItemPData ( {} {} {} {} )\n", p.x, p.z, p.tile_x, p.tile_z)?;
    }
    let name = tr_item.name.as_ref().map(|n| item(n));
    match tr_item.kind {
        TrItemKind::Crossover { node, shape } => {
            write!(f, "\t\t\tCrossoverTrItemData ( {} {} )\n", node, shape)?;
        }
        TrItemKind::Signal(ref s) => {
            write!(f, "\t\t\tTrSignalType ( {} {} {} {} )\n",
                   item(&s.flags), s.direction, s.data, item(&s.signal_type))?;
            if !s.dirs.is_empty() {
                write!(f, "\t\t\tTrSignalDirs ( {}\n", s.dirs.len())?;
                for d in &s.dirs {
                    write!(f, "\t\t\t\tTrSignalDir ( {} {} {} {} )\n", d.node, d.sd1, d.link_lr_path, d.sd3)?;
                }
                write!(f, "\t\t\t)\n")?;
            }
        }
        TrItemKind::SpeedPost(ref p) => {
            write!(f, "\t\t\tSpeedpostTrItemData ( {}", p.flags)?;
            if p.reads_value() {
                write!(f, " {}", p.value)?;
            }
            if p.show_number {
                write!(f, " {}", p.display_number)?;
            }
            write!(f, " {} )\n", p.angle)?;
        }
        TrItemKind::Platform(ref p) => {
            if let Some(ref n) = name {
                write!(f, "\t\t\tPlatformName ( {} )\n", n)?;
            }
            write!(f, "\t\t\tStation ( {} )\n", item(&p.station))?;
            write!(f, "\t\t\tPlatformMinWaitingTime ( {} )\n", p.min_waiting_time)?;
            write!(f, "\t\t\tPlatformNumPassengersWaiting ( {} )\n", p.passengers_waiting)?;
            write!(f, "\t\t\tPlatformTrItemData ( {} {} )\n", item(&p.flags), p.linked_id)?;
        }
        TrItemKind::Siding(ref s) => {
            if let Some(ref n) = name {
                write!(f, "\t\t\tSidingName ( {} )\n", n)?;
            }
            write!(f, "\t\t\tSidingTrItemData ( {} {} )\n", item(&s.flags), s.linked_id)?;
        }
        TrItemKind::SoundRegion(ref r) => {
            write!(f, "\t\t\tTrItemSRData ( {} {} {} )\n", r.data1, r.data2, r.data3)?;
        }
        TrItemKind::Empty | TrItemKind::LevelCrossing | TrItemKind::Hazard | TrItemKind::Pickup => {}
    }
    write!(f, "\t\t)\n")?;
    Ok(())
}

use crate::input::parser_utils::ParseError;
use crate::input::stf::StfReader;
use std::f32::consts::PI;

/// Location on the track, `TrItemRData(x y z tile_x tile_z)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub tile_x: i32,
    pub tile_z: i32,
}

/// Plan position, `TrItemPData(x z tile_x tile_z)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PData {
    pub x: f32,
    pub z: f32,
    pub tile_x: i32,
    pub tile_z: i32,
}

/// Distance along the track node and its flags, `TrItemSData(d flags)`.
#[derive(Clone, Debug, PartialEq)]
pub struct SData {
    pub distance: f32,
    pub flags: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalDir {
    pub node: u32,
    pub sd1: u32,
    pub link_lr_path: u32,
    pub sd3: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalItem {
    pub flags: String,
    pub direction: u32,
    pub data: f32,
    /// Lowercase signal type name.
    pub signal_type: String,
    /// Declared number of junction link records.
    pub dir_count: usize,
    pub dirs: Vec<SignalDir>,
}

impl SignalItem {
    pub fn reverse_direction(&self) -> u32 {
        if self.direction == 0 { 1 } else { 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpeedPostItem {
    pub flags: u32,
    pub is_milepost: bool,
    pub is_warning: bool,
    pub is_limit: bool,
    pub is_resume: bool,
    pub is_passenger: bool,
    pub is_freight: bool,
    pub is_mph: bool,
    pub show_number: bool,
    pub show_dot: bool,
    /// Speed limit, or the milepost distance.
    pub value: f32,
    pub display_number: i32,
    /// Radians in (-pi, pi].
    pub angle: f32,
}

impl SpeedPostItem {
    /// Decodes the flag word. Warning and limit together mean a resume
    /// post; neither means a milepost, which ignores the other flags.
    pub fn from_flags(flags: u32) -> SpeedPostItem {
        let bit = |n: u32| flags & (1 << n) != 0;
        let mut post = SpeedPostItem { flags, ..Default::default() };
        post.is_warning = bit(0);
        post.is_limit = bit(1);
        if !post.is_warning && !post.is_limit {
            post.is_milepost = true;
            return post;
        }
        if post.is_warning && post.is_limit {
            post.is_warning = false;
            post.is_resume = true;
        }
        post.is_passenger = bit(5) || bit(7);
        post.is_freight = bit(6) || bit(7);
        post.is_mph = bit(8);
        if bit(4) {
            post.show_number = true;
            post.show_dot = bit(9);
        }
        post
    }

    /// Integer milepost values are truncated.
    fn truncates_value(&self) -> bool {
        self.is_milepost && self.flags & (1 << 9) == 0
    }

    pub fn reads_value(&self) -> bool {
        !self.is_resume
    }
}

pub fn wrap_angle(a: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let x = a % two_pi;
    if x <= -PI {
        x + two_pi
    } else if x > PI {
        x - two_pi
    } else {
        x
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlatformItem {
    pub station: String,
    pub flags: String,
    pub min_waiting_time: u32,
    pub passengers_waiting: u32,
    /// Id of the item at the other end of the platform.
    pub linked_id: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SidingItem {
    pub flags: String,
    pub linked_id: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SoundRegionItem {
    pub data1: u32,
    pub data2: u32,
    pub data3: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrItemKind {
    Crossover { node: u32, shape: u32 },
    Signal(SignalItem),
    SpeedPost(SpeedPostItem),
    Platform(PlatformItem),
    SoundRegion(SoundRegionItem),
    Empty,
    LevelCrossing,
    Siding(SidingItem),
    Hazard,
    Pickup,
}

impl TrItemKind {
    /// Empty item of the kind named by a lowercase block tag.
    pub fn from_tag(tag: &str) -> Option<TrItemKind> {
        use self::TrItemKind::*;
        Some(match tag {
            "crossoveritem" => Crossover { node: 0, shape: 0 },
            "signalitem" => Signal(SignalItem::default()),
            "speedpostitem" => SpeedPost(SpeedPostItem::default()),
            "platformitem" => Platform(PlatformItem::default()),
            "soundregionitem" => SoundRegion(SoundRegionItem::default()),
            "emptyitem" => Empty,
            "levelcritem" => LevelCrossing,
            "sidingitem" => Siding(SidingItem::default()),
            "hazzarditem" => Hazard,
            "pickupitem" => Pickup,
            _ => return None,
        })
    }

    pub fn tag(&self) -> &'static str {
        use self::TrItemKind::*;
        match *self {
            Crossover { .. } => "CrossoverItem",
            Signal(_) => "SignalItem",
            SpeedPost(_) => "SpeedPostItem",
            Platform(_) => "PlatformItem",
            SoundRegion(_) => "SoundRegionItem",
            Empty => "EmptyItem",
            LevelCrossing => "LevelCrItem",
            Siding(_) => "SidingItem",
            Hazard => "HazzardItem",
            Pickup => "PickupItem",
        }
    }

    /// Reads a kind specific block. Returns false for tags the kind does
    /// not have.
    fn parse_data(&mut self, stf: &mut StfReader, tag: &str, name: &mut Option<String>) -> Result<bool, ParseError> {
        match (self, tag) {
            (TrItemKind::Crossover { node, shape }, "crossovertritemdata") => {
                stf.must_match("(")?;
                *node = stf.read_uint()?;
                *shape = stf.read_uint()?;
                stf.skip_rest_of_block()?;
            }
            (TrItemKind::Signal(s), "trsignaltype") => {
                stf.must_match("(")?;
                s.flags = stf.read_string()?;
                s.direction = stf.read_uint()?;
                s.data = stf.read_float()?;
                s.signal_type = stf.read_string()?.to_lowercase();
                stf.skip_rest_of_block()?;
            }
            (TrItemKind::Signal(s), "trsignaldirs") => read_signal_dirs(stf, s)?,
            (TrItemKind::SpeedPost(p), "speedposttritemdata") => *p = read_speed_post(stf)?,
            (TrItemKind::Platform(_), "platformname") | (TrItemKind::Siding(_), "sidingname") => {
                *name = Some(stf.read_string_block("")?);
            }
            (TrItemKind::Platform(p), "station") => p.station = stf.read_string_block("")?,
            (TrItemKind::Platform(p), "platformminwaitingtime") => p.min_waiting_time = stf.read_uint_block(0)?,
            (TrItemKind::Platform(p), "platformnumpassengerswaiting") => p.passengers_waiting = stf.read_uint_block(0)?,
            (TrItemKind::Platform(p), "platformtritemdata") => {
                stf.must_match("(")?;
                p.flags = stf.read_string()?;
                p.linked_id = stf.read_uint()?;
                stf.skip_rest_of_block()?;
            }
            (TrItemKind::Siding(s), "sidingtritemdata") => {
                stf.must_match("(")?;
                s.flags = stf.read_string()?;
                s.linked_id = stf.read_uint()?;
                stf.skip_rest_of_block()?;
            }
            (TrItemKind::SoundRegion(r), "tritemsrdata") => {
                stf.must_match("(")?;
                r.data1 = stf.read_uint()?;
                r.data2 = stf.read_uint()?;
                r.data3 = stf.read_float()?;
                stf.skip_rest_of_block()?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn read_signal_dirs(stf: &mut StfReader, signal: &mut SignalItem) -> Result<(), ParseError> {
    let count = stf.read_count()?;
    let mut dirs = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "trsignaldir" {
            return Ok(false);
        }
        if dirs.len() >= count {
            stf.warn("Skipped extra TrSignalDirs");
            stf.skip_block()?;
            return Ok(true);
        }
        stf.must_match("(")?;
        dirs.push(SignalDir {
            node: stf.read_uint()?,
            sd1: stf.read_uint()?,
            link_lr_path: stf.read_uint()?,
            sd3: stf.read_uint()?,
        });
        stf.skip_rest_of_block()?;
        Ok(true)
    })?;
    stf.report_missing(count, dirs.len(), "TrSignalDirs");
    signal.dir_count = count;
    signal.dirs = dirs;
    Ok(())
}

fn read_speed_post(stf: &mut StfReader) -> Result<SpeedPostItem, ParseError> {
    stf.must_match("(")?;
    let mut post = SpeedPostItem::from_flags(stf.read_uint()?);
    if post.reads_value() {
        post.value = if post.truncates_value() {
            stf.read_double()?.trunc() as f32
        } else {
            stf.read_float()?
        };
    }
    if post.show_number {
        post.display_number = stf.read_int()?;
    }
    post.angle = wrap_angle(stf.read_float()?);
    stf.skip_rest_of_block()?;
    Ok(post)
}

/// An entry of the track item table. `id` is the item's position in the
/// table.
#[derive(Clone, Debug, PartialEq)]
pub struct TrItem {
    pub id: usize,
    pub name: Option<String>,
    pub rdata: Option<RData>,
    pub pdata: Option<PData>,
    pub sdata: Option<SData>,
    pub kind: TrItemKind,
}

impl TrItem {
    pub fn new(kind: TrItemKind) -> TrItem {
        TrItem { id: 0, name: None, rdata: None, pdata: None, sdata: None, kind }
    }

    /// Reads the block after an item tag. `None` if the tag is not an item
    /// kind; nothing is consumed then.
    pub(crate) fn parse(stf: &mut StfReader, tag: &str, index: usize) -> Result<Option<TrItem>, ParseError> {
        let kind = match TrItemKind::from_tag(tag) {
            Some(k) => k,
            None => return Ok(None),
        };
        let mut item = TrItem::new(kind);
        item.id = index;
        stf.must_match("(")?;
        stf.parse_block(|stf, name| {
            match name {
                "tritemid" => {
                    let id = stf.read_uint_block(index as u32)?;
                    if id as usize != index {
                        stf.warn(format!("Track item {} has mismatched TrItemID {}", index, id));
                    }
                }
                "tritemrdata" => {
                    stf.must_match("(")?;
                    item.rdata = Some(RData {
                        x: stf.read_float()?,
                        y: stf.read_float()?,
                        z: stf.read_float()?,
                        tile_x: stf.read_int()?,
                        tile_z: stf.read_int()?,
                    });
                    stf.skip_rest_of_block()?;
                }
                "tritempdata" => {
                    stf.must_match("(")?;
                    item.pdata = Some(PData {
                        x: stf.read_float()?,
                        z: stf.read_float()?,
                        tile_x: stf.read_int()?,
                        tile_z: stf.read_int()?,
                    });
                    stf.skip_rest_of_block()?;
                }
                "tritemsdata" => {
                    stf.must_match("(")?;
                    item.sdata = Some(SData { distance: stf.read_float()?, flags: stf.read_string()? });
                    stf.skip_rest_of_block()?;
                }
                _ => return item.kind.parse_data(stf, name, &mut item.name),
            }
            Ok(true)
        })?;
        Ok(Some(item))
    }
}

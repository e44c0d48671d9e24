use super::config::{ConfigMode, SignalFunction};
use super::{Aspect, FunctionKind};
use crate::input::parser_utils::ParseError;
use crate::input::stf::{StfReader, StfToken, Units};
use std::collections::HashMap;

use smallvec::SmallVec;

const MPH: f32 = 0.44704;
const KPH: f32 = 1.0 / 3.6;
const MILE: f32 = 1609.344;
const YARD: f32 = 0.9144;

/// Reads a `SignalFlags ( a b c )` block. `f` returns false for flags it
/// does not know; those are reported and ignored.
pub(crate) fn read_flags<F>(stf: &mut StfReader, what: &str, mut f: F) -> Result<(), ParseError>
    where F: FnMut(&str) -> bool
{
    stf.must_match("(")?;
    while !stf.end_of_block() {
        if stf.peek() == &StfToken::Open {
            stf.warn(format!("Unexpected block in {} flags, skipped", what));
            stf.skip_block()?;
            continue;
        }
        let flag = stf.read_item()?;
        if !f(&flag.to_lowercase()) {
            stf.info(format!("Skipped unknown {} flag {}", what, flag));
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalLight {
    pub index: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub radius: f32,
    pub semaphore_change: bool,
}

impl SignalLight {
    fn parse(stf: &mut StfReader) -> Result<SignalLight, ParseError> {
        stf.must_match("(")?;
        let mut light = SignalLight {
            index: stf.read_uint()?,
            name: stf.read_string()?.to_lowercase(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            radius: 0.0,
            semaphore_change: false,
        };
        stf.parse_block(|stf, name| {
            match name {
                "radius" => light.radius = stf.read_float_block(0.0)?,
                "position" => {
                    stf.must_match("(")?;
                    light.x = stf.read_float()?;
                    light.y = stf.read_float()?;
                    light.z = stf.read_float()?;
                    stf.skip_rest_of_block()?;
                }
                "signalflags" => read_flags(stf, "SignalLight", |flag| match flag {
                    "semaphore_change" => { light.semaphore_change = true; true }
                    _ => false,
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(light)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalDrawLight {
    pub light_index: u32,
    pub flashing: bool,
}

impl SignalDrawLight {
    fn parse(stf: &mut StfReader) -> Result<SignalDrawLight, ParseError> {
        stf.must_match("(")?;
        let mut light = SignalDrawLight { light_index: stf.read_uint()?, flashing: false };
        stf.parse_block(|stf, name| {
            match name {
                "signalflags" => read_flags(stf, "DrawLight", |flag| match flag {
                    "flashing" => { light.flashing = true; true }
                    _ => false,
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(light)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalDrawState {
    pub index: i32,
    pub name: String,
    pub draw_lights: Option<SmallVec<[SignalDrawLight; 4]>>,
    pub semaphore_pos: f32,
}

impl SignalDrawState {
    fn parse(stf: &mut StfReader) -> Result<SignalDrawState, ParseError> {
        stf.must_match("(")?;
        let mut state = SignalDrawState {
            index: stf.read_int()?,
            name: stf.read_string()?.to_lowercase(),
            draw_lights: None,
            semaphore_pos: 0.0,
        };
        stf.parse_block(|stf, name| {
            match name {
                "drawlights" => {
                    let count = stf.read_count()?;
                    let mut lights: SmallVec<[SignalDrawLight; 4]> = SmallVec::new();
                    stf.parse_block(|stf, name| {
                        if name != "drawlight" {
                            return Ok(false);
                        }
                        if lights.len() >= count {
                            stf.warn("Skipped extra DrawLight");
                            stf.skip_block()?;
                        } else {
                            lights.push(SignalDrawLight::parse(stf)?);
                        }
                        Ok(true)
                    })?;
                    state.draw_lights = Some(lights);
                }
                "semaphorepos" => state.semaphore_pos = stf.read_float_block(0.0)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(state)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalAspect {
    pub aspect: Aspect,
    pub draw_state: String,
    /// Speed limit in m/s, -1 when not set.
    pub speed: f32,
    pub asap: bool,
    pub speed_reset: bool,
    pub no_speed_reduction: bool,
}

impl SignalAspect {
    fn parse(stf: &mut StfReader) -> Result<SignalAspect, ParseError> {
        stf.must_match("(")?;
        let aspect_name = stf.read_string()?;
        let aspect = match Aspect::from_name(&aspect_name) {
            Some(a) => a,
            None => {
                stf.info(format!("Skipped unknown signal aspect {}", aspect_name));
                Aspect::Unknown
            }
        };
        let mut aspect = SignalAspect {
            aspect,
            draw_state: stf.read_string()?.to_lowercase(),
            speed: -1.0,
            asap: false,
            speed_reset: false,
            no_speed_reduction: false,
        };
        stf.parse_block(|stf, name| {
            match name {
                "speedmph" => aspect.speed = stf.read_float_block(0.0)? * MPH,
                "speedkph" => aspect.speed = stf.read_float_block(0.0)? * KPH,
                "signalflags" => read_flags(stf, "SignalAspect", |flag| {
                    match flag {
                        "asap" => aspect.asap = true,
                        "or_speedreset" => aspect.speed_reset = true,
                        "or_nospeedreduction" => aspect.no_speed_reduction = true,
                        _ => return false,
                    }
                    true
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(aspect)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApproachControlLimits {
    /// Metres.
    pub position: Option<f32>,
    /// Metres per second.
    pub speed: Option<f32>,
}

impl ApproachControlLimits {
    fn parse(stf: &mut StfReader) -> Result<ApproachControlLimits, ParseError> {
        stf.must_match("(")?;
        let mut limits = ApproachControlLimits::default();
        stf.parse_block(|stf, name| {
            match name {
                "positionmiles" => limits.position = Some(stf.read_float_block(0.0)? * MILE),
                "positionkm" => limits.position = Some(stf.read_float_block(0.0)? * 1000.0),
                "positionm" => limits.position = Some(stf.read_float_block(0.0)?),
                "positionyd" => limits.position = Some(stf.read_float_block(0.0)? * YARD),
                "speedmph" => limits.speed = Some(stf.read_float_block(0.0)? * MPH),
                "speedkph" => limits.speed = Some(stf.read_float_block(0.0)? * KPH),
                "speedmps" => limits.speed = Some(stf.read_float_block(0.0)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(limits)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalType {
    pub name: String,
    pub script: String,
    pub function: SignalFunction,
    pub normal_subtype: Option<String>,
    /// Index into the configured normal subtypes, -1 when unset.
    pub subtype_index: i32,
    pub abs: bool,
    pub no_gantry: bool,
    pub semaphore: bool,
    pub flash_time_on: f32,
    pub flash_time_off: f32,
    pub on_off_time: f32,
    pub light_texture: String,
    pub lights: Vec<SignalLight>,
    pub draw_states: HashMap<String, SignalDrawState>,
    pub aspects: Vec<SignalAspect>,
    pub num_clear_ahead_msts: i32,
    pub num_clear_ahead_orts: i32,
    pub semaphore_info: f32,
    pub approach_control: Option<ApproachControlLimits>,
    pub req_stop_vis_distance: Option<f32>,
    pub req_stop_ann_distance: Option<f32>,
    pub day_glow: Option<f32>,
    pub night_glow: Option<f32>,
    pub day_light: bool,
}

impl SignalType {
    pub(crate) fn parse(stf: &mut StfReader,
                        mode: ConfigMode,
                        functions: &[SignalFunction],
                        subtypes: &[String])
                        -> Result<SignalType, ParseError> {
        stf.must_match("(")?;
        let mut t = SignalType {
            name: stf.read_string()?.to_lowercase(),
            script: String::new(),
            function: SignalFunction::builtin(FunctionKind::Info),
            normal_subtype: None,
            subtype_index: -1,
            abs: false,
            no_gantry: false,
            semaphore: false,
            flash_time_on: 1.0,
            flash_time_off: 1.0,
            on_off_time: 0.2,
            light_texture: String::new(),
            lights: Vec::new(),
            draw_states: HashMap::new(),
            aspects: Vec::new(),
            num_clear_ahead_msts: -2,
            num_clear_ahead_orts: -2,
            semaphore_info: 1.0,
            approach_control: None,
            req_stop_vis_distance: None,
            req_stop_ann_distance: None,
            day_glow: None,
            night_glow: None,
            day_light: true,
        };
        let mut num_clear_ahead = -2;
        let mut numdefs = 0;

        stf.parse_block(|stf, name| {
            match name {
                "ortsscript" => t.script = stf.read_string_block("")?.to_lowercase(),
                "signalfntype" => t.function = read_function(stf, mode, functions)?,
                "signallighttex" => t.light_texture = stf.read_string_block("")?.to_lowercase(),
                "signallights" => t.lights = read_lights(stf)?,
                "signaldrawstates" => t.draw_states = read_draw_states(stf)?,
                "signalaspects" => t.aspects = read_aspects(stf)?,
                "approachcontrolsettings" => t.approach_control = Some(ApproachControlLimits::parse(stf)?),
                "ortsreqstopvisdistance" => {
                    t.req_stop_vis_distance = Some(stf.read_float_units_block(Units::Distance, 0.0)?)
                }
                "ortsreqstopanndistance" => {
                    t.req_stop_ann_distance = Some(stf.read_float_units_block(Units::Distance, 0.0)?)
                }
                "signalnumclearahead" => {
                    // only the first declaration carries the value
                    if num_clear_ahead >= -1 {
                        stf.skip_block()?;
                    } else {
                        num_clear_ahead = stf.read_int_block(-2)?;
                    }
                    numdefs += 1;
                }
                "semaphoreinfo" => t.semaphore_info = stf.read_float_units_block(Units::Time, 1.0)?,
                "ortsdayglow" => t.day_glow = Some(stf.read_float_block(0.0)?),
                "ortsnightglow" => t.night_glow = Some(stf.read_float_block(0.0)?),
                "ortsdaylight" => t.day_light = stf.read_bool_block(true)?,
                "ortsnormalsubtype" => {
                    let subtype = stf.read_string_block("")?.to_uppercase();
                    if subtypes.contains(&subtype) {
                        t.normal_subtype = Some(subtype);
                    } else {
                        stf.info(format!("Skipped unknown ORTSNormalSubtype {}", subtype));
                    }
                }
                "ortsonofftimes" => t.on_off_time = stf.read_float_units_block(Units::Time, 0.2)?,
                "sigflashduration" => {
                    stf.must_match("(")?;
                    t.flash_time_on = stf.read_float_units(Units::Time)?;
                    t.flash_time_off = stf.read_float_units(Units::Time)?;
                    stf.skip_rest_of_block()?;
                }
                "signalflags" => read_flags(stf, "SignalType", |flag| {
                    match flag {
                        "abs" => t.abs = true,
                        "no_gantry" => t.no_gantry = true,
                        "semaphore" => t.semaphore = true,
                        _ => return false,
                    }
                    true
                })?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        match mode {
            ConfigMode::Extended => {
                t.subtype_index = t.normal_subtype.as_ref()
                    .and_then(|s| subtypes.iter().position(|x| x == s))
                    .map(|i| i as i32)
                    .unwrap_or(-1);
                t.num_clear_ahead_msts = -2;
                t.num_clear_ahead_orts = num_clear_ahead;
            }
            ConfigMode::Legacy => {
                t.num_clear_ahead_msts = if numdefs == 1 { num_clear_ahead } else { -2 };
                t.num_clear_ahead_orts = if numdefs == 2 { num_clear_ahead } else { -2 };
            }
        }

        for aspect in &t.aspects {
            if !t.draw_states.contains_key(&aspect.draw_state) {
                stf.warn(format!("Unknown SignalDrawState {} for aspect {} in SignalType {}",
                                 aspect.draw_state, aspect.aspect.name(), t.name));
            }
        }
        Ok(t)
    }

    /// Draw-state index shown for `aspect`, or -1.
    pub fn default_draw_state(&self, aspect: Aspect) -> i32 {
        self.aspects.iter()
            .find(|a| a.aspect == aspect)
            .and_then(|a| self.draw_states.get(&a.draw_state))
            .map(|d| d.index)
            .unwrap_or(-1)
    }

    /// The least permissive aspect of this type that is more permissive than
    /// `aspect`, or the least restrictive aspect if there is none.
    pub fn next_least_restrictive(&self, aspect: Aspect) -> Aspect {
        let mut target = Aspect::Unknown;
        let mut least = Aspect::Stop;
        for a in self.aspects.iter().map(|a| a.aspect) {
            if a > least {
                least = a;
            }
            if a > aspect && a < target {
                target = a;
            }
        }
        if target == Aspect::Unknown { least } else { target }
    }

    pub fn most_restrictive(&self) -> Aspect {
        let target = self.aspects.iter().map(|a| a.aspect).min().unwrap_or(Aspect::Unknown);
        if target == Aspect::Unknown { Aspect::Stop } else { target }
    }

    pub fn least_restrictive(&self) -> Aspect {
        let target = self.aspects.iter().map(|a| a.aspect).max().unwrap_or(Aspect::Stop);
        if target > Aspect::Clear2 { Aspect::Clear2 } else { target }
    }

    /// Speed limit in m/s for `aspect`, -1 when none is set.
    pub fn speed_limit(&self, aspect: Aspect) -> f32 {
        self.aspects.iter().find(|a| a.aspect == aspect).map(|a| a.speed).unwrap_or(-1.0)
    }
}

fn read_function(stf: &mut StfReader, mode: ConfigMode, functions: &[SignalFunction]) -> Result<SignalFunction, ParseError> {
    let name = stf.read_string_block("")?.to_uppercase();
    if mode == ConfigMode::Legacy && FunctionKind::from_name(&name).is_none() {
        stf.info(format!("Skipped unknown SignalFnType {}", name));
        return Ok(SignalFunction::builtin(FunctionKind::Info));
    }
    match functions.iter().find(|f| f.name == name) {
        Some(f) => Ok(f.clone()),
        None => {
            stf.info(format!("Skipped unknown ORTSSignalFnType {}", name));
            Ok(SignalFunction::builtin(FunctionKind::Info))
        }
    }
}

fn read_lights(stf: &mut StfReader) -> Result<Vec<SignalLight>, ParseError> {
    let count = stf.read_count()?;
    let mut lights: Vec<SignalLight> = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "signallight" {
            return Ok(false);
        }
        if lights.len() >= count {
            stf.warn("Skipped extra SignalLight");
            stf.skip_block()?;
        } else {
            lights.push(SignalLight::parse(stf)?);
        }
        Ok(true)
    })?;
    lights.sort_by_key(|l| l.index);
    for (i, light) in lights.iter().enumerate() {
        if light.index as usize != i {
            stf.warn(format!("Invalid SignalLight index; expected {}, got {}", i, light.index));
        }
    }
    Ok(lights)
}

fn read_draw_states(stf: &mut StfReader) -> Result<HashMap<String, SignalDrawState>, ParseError> {
    let count = stf.read_count()?;
    let mut states: HashMap<String, SignalDrawState> = HashMap::new();
    stf.parse_block(|stf, name| {
        if name != "signaldrawstate" {
            return Ok(false);
        }
        if states.len() >= count {
            stf.warn("Skipped extra SignalDrawState");
            stf.skip_block()?;
            return Ok(true);
        }
        let state = SignalDrawState::parse(stf)?;
        if states.contains_key(&state.name) {
            let key = format!("DST{}", states.len());
            stf.info(format!("Duplicate SignalDrawState name '{}', using name '{}' instead", state.name, key));
            states.insert(key, state);
        } else {
            states.insert(state.name.clone(), state);
        }
        Ok(true)
    })?;
    stf.report_missing(count, states.len(), "SignalDrawState");
    Ok(states)
}

fn read_aspects(stf: &mut StfReader) -> Result<Vec<SignalAspect>, ParseError> {
    let count = stf.read_count()?;
    let mut aspects: Vec<SignalAspect> = Vec::new();
    stf.parse_block(|stf, name| {
        if name != "signalaspect" {
            return Ok(false);
        }
        if aspects.len() >= count {
            stf.warn("Skipped extra SignalAspect");
            stf.skip_block()?;
            return Ok(true);
        }
        let aspect = SignalAspect::parse(stf)?;
        if aspects.iter().any(|a| a.aspect == aspect.aspect) {
            stf.warn(format!("Skipped duplicate SignalAspect {}", aspect.aspect.name()));
        } else {
            aspects.push(aspect);
        }
        Ok(true)
    })?;
    Ok(aspects)
}

//! Streaming width-rule rewrite of a legacy board file.
//!
//! One forward pass over the input, re-emitting every line. Only four
//! section kinds are actively rewritten (TRACK, EQUIPOT, NCLASS,
//! CZONE_OUTLINE), so the section state is flat case-dispatch on the
//! lower-cased markers rather than a context stack. Because the pass never
//! buffers or backtracks, netclass sections must appear before the track
//! section: a track's rule set depends on its net's class at the moment
//! the track is re-emitted.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use log::debug;

use crate::error::BrdError;
use crate::parser::records::{self, quoted_name};
use crate::types::{Net, Track, TrackShape};
use crate::units::mil_to_native;

/// Width and clearance rules applied during the rewrite. Thresholds and
/// forced widths are in native units.
#[derive(Debug, Clone)]
pub struct WidthRules {
    /// Netclass whose segments are re-widthed regardless of current width.
    pub target_class: String,
    pub outer_layers: Vec<u32>,
    pub inner_layers: Vec<u32>,
    /// Outer-layer segments narrower than this are re-widthed.
    pub outer_threshold: i64,
    /// Width forced onto matching outer-layer segments.
    pub outer_width: i64,
    pub inner_threshold: i64,
    pub inner_width: i64,
    /// Minimum zone clearance / minimum zone fill thickness.
    pub zone_floor: i64,
}

impl Default for WidthRules {
    fn default() -> Self {
        Self {
            target_class: "50 Ohm".to_string(),
            outer_layers: vec![0, 15],
            inner_layers: vec![2, 5],
            outer_threshold: mil_to_native(7.5),
            outer_width: mil_to_native(7.0),
            inner_threshold: mil_to_native(7.0),
            inner_width: mil_to_native(6.5),
            zone_floor: mil_to_native(7.0),
        }
    }
}

/// Diagnostic output: the widths present on outer/inner layers after the
/// rewrite, modified or not.
#[derive(Debug, Default)]
pub struct RewriteStats {
    pub outside_widths: BTreeSet<i64>,
    pub inside_widths: BTreeSet<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Track,
    Equipot,
    NetClass,
    ZoneOutline,
}

#[derive(Debug, Clone)]
struct NetClass {
    name: String,
    nets: BTreeSet<String>,
}

/// Per-run context for the streaming pass.
struct Rewriter<'a, W: Write> {
    rules: &'a WidthRules,
    out: &'a mut W,
    section: Section,
    nets: Vec<Net>,
    net_by_number: HashMap<u32, usize>,
    net_by_name: HashMap<String, usize>,
    classes: HashMap<String, NetClass>,
    current_net: Option<Net>,
    current_class: Option<NetClass>,
    pending: Option<records::TrackPosition>,
    stats: RewriteStats,
}

impl<'a, W: Write> Rewriter<'a, W> {
    fn new(rules: &'a WidthRules, out: &'a mut W) -> Self {
        Self {
            rules,
            out,
            section: Section::None,
            nets: Vec::new(),
            net_by_number: HashMap::new(),
            net_by_name: HashMap::new(),
            classes: HashMap::new(),
            current_net: None,
            current_class: None,
            pending: None,
            stats: RewriteStats::default(),
        }
    }

    fn emit(&mut self, line: &str) -> Result<(), BrdError> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn feed(&mut self, line: &str) -> Result<(), BrdError> {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "$track" => self.section = Section::Track,
            "$endtrack" => {
                if self.pending.is_some() {
                    return Err(BrdError::Structural(
                        "TRACK section ended with a Po record awaiting its De".to_string(),
                    ));
                }
                self.section = Section::None;
            }
            "$equipot" => self.section = Section::Equipot,
            "$endequipot" => {
                self.close_equipot()?;
                self.section = Section::None;
            }
            "$nclass" => self.section = Section::NetClass,
            "$endnclass" => {
                self.close_netclass()?;
                self.section = Section::None;
            }
            "$czone_outline" => self.section = Section::ZoneOutline,
            "$endczone_outline" => self.section = Section::None,
            _ => return self.record(line),
        }
        self.emit(line)
    }

    fn record(&mut self, line: &str) -> Result<(), BrdError> {
        match self.section {
            Section::Track => self.track_record(line),
            Section::Equipot => self.equipot_record(line),
            Section::NetClass => self.netclass_record(line),
            Section::ZoneOutline => self.zone_record(line),
            Section::None => self.emit(line),
        }
    }

    // ─── EQUIPOT ─────────────────────────────────────────────────────

    fn equipot_record(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first().copied() == Some("Na") {
            let number = records::uint_field(records::field(&fields, 1, line)?, "net number", line)?;
            let name = quoted_name(line)?;
            self.current_net = Some(Net::new(number, name.to_string()));
        }
        // St and anything else pass through untouched
        self.emit(line)
    }

    fn close_equipot(&mut self) -> Result<(), BrdError> {
        let net = self.current_net.take().ok_or_else(|| {
            BrdError::Structural("EQUIPOT section ended without an Na record".to_string())
        })?;
        if self.net_by_name.contains_key(&net.name) {
            return Err(BrdError::Structural(format!(
                "multiple nets named \"{}\"",
                net.name
            )));
        }
        if self.net_by_number.contains_key(&net.number) {
            return Err(BrdError::Structural(format!(
                "multiple nets numbered {}",
                net.number
            )));
        }
        let index = self.nets.len();
        self.net_by_name.insert(net.name.clone(), index);
        self.net_by_number.insert(net.number, index);
        self.nets.push(net);
        Ok(())
    }

    // ─── NCLASS ──────────────────────────────────────────────────────

    fn netclass_record(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first().copied() {
            Some("Name") => {
                self.current_class = Some(NetClass {
                    name: quoted_name(line)?.to_string(),
                    nets: BTreeSet::new(),
                });
            }
            Some("AddNet") => {
                let net_name = quoted_name(line)?;
                let class_name = {
                    let class = self.current_class.as_mut().ok_or_else(|| {
                        BrdError::Structural(format!("AddNet before Name in NCLASS: \"{line}\""))
                    })?;
                    class.nets.insert(net_name.to_string());
                    class.name.clone()
                };
                let index = *self.net_by_name.get(net_name).ok_or_else(|| {
                    BrdError::Structural(format!("NCLASS references unknown net \"{net_name}\""))
                })?;
                self.nets[index].class = Some(class_name);
            }
            _ => {}
        }
        self.emit(line)
    }

    fn close_netclass(&mut self) -> Result<(), BrdError> {
        let class = self.current_class.take().ok_or_else(|| {
            BrdError::Structural("NCLASS section ended without a Name record".to_string())
        })?;
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    // ─── TRACK ───────────────────────────────────────────────────────

    fn track_record(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first().copied() {
            Some("Po") => {
                if self.pending.is_some() {
                    return Err(BrdError::Structural(format!(
                        "Po arrived while another Po was pending: \"{line}\""
                    )));
                }
                self.pending = Some(records::parse_position(&fields, line)?);
                // suppressed until the De record completes the track
                Ok(())
            }
            Some("De") => {
                let position = self.pending.take().ok_or_else(|| {
                    BrdError::Structural(format!("De with no pending Po: \"{line}\""))
                })?;
                let mut track = records::complete_track(position, &fields, line)?;
                self.apply_width_rules(&mut track)?;
                let [po, de] = track.to_lines();
                self.emit(&po)?;
                self.emit(&de)
            }
            _ => self.emit(line),
        }
    }

    fn apply_width_rules(&mut self, track: &mut Track) -> Result<(), BrdError> {
        let index = *self.net_by_number.get(&track.net_number).ok_or_else(|| {
            BrdError::Structural(format!(
                "track references unknown net number {}",
                track.net_number
            ))
        })?;
        let net = &self.nets[index];
        let class_name = net.class.as_deref().ok_or_else(|| {
            BrdError::Structural(format!(
                "net \"{}\" has no netclass at track rewrite time",
                net.name
            ))
        })?;
        let is_target = class_name == self.rules.target_class;

        if self.rules.outer_layers.contains(&track.layer) {
            if track.shape == TrackShape::Segment
                && (is_target || track.width < self.rules.outer_threshold)
            {
                track.width = self.rules.outer_width;
            }
            self.stats.outside_widths.insert(track.width);
        } else if self.rules.inner_layers.contains(&track.layer) {
            if track.shape == TrackShape::Segment
                && (is_target || track.width < self.rules.inner_threshold)
            {
                track.width = self.rules.inner_width;
            }
            self.stats.inside_widths.insert(track.width);
        }
        Ok(())
    }

    // ─── CZONE_OUTLINE ───────────────────────────────────────────────

    fn zone_record(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first().copied() {
            Some("ZClearance") | Some("ZMinThickness") => {
                let value = records::int_field(records::field(&fields, 1, line)?, "zone value", line)?;
                let value = value.max(self.rules.zone_floor);
                let mut tokens: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
                tokens[1] = value.to_string();
                self.emit(&tokens.join(" "))
            }
            _ => self.emit(line),
        }
    }

    fn finish(self) -> Result<RewriteStats, BrdError> {
        if self.pending.is_some() {
            return Err(BrdError::Structural(
                "file ended inside a track record".to_string(),
            ));
        }
        for class in self.classes.values() {
            debug!("netclass \"{}\": {} nets", class.name, class.nets.len());
        }
        Ok(self.stats)
    }
}

/// Stream `input` through the width rules, writing every (possibly
/// rewritten) line to `out`. Returns the width diagnostic sets.
pub fn rewrite<W: Write>(
    input: &str,
    rules: &WidthRules,
    out: &mut W,
) -> Result<RewriteStats, BrdError> {
    let mut rewriter = Rewriter::new(rules, out);
    for line in input.lines() {
        rewriter.feed(line)?;
    }
    let stats = rewriter.finish()?;
    debug!("outer widths after rewrite: {:?}", stats.outside_widths);
    debug!("inner widths after rewrite: {:?}", stats.inside_widths);
    Ok(stats)
}

use std::collections::HashMap;

use crate::error::BrdError;

// ─── Net ─────────────────────────────────────────────────────────────

/// An equipotential: a named electrical connection grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    pub number: u32,
    pub name: String,
    /// Netclass name, stamped during NCLASS parsing (rewrite pass only).
    pub class: Option<String>,
}

impl Net {
    pub fn new(number: u32, name: String) -> Self {
        Self {
            number,
            name,
            class: None,
        }
    }

    /// The last path component of a hierarchical net name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

// ─── Track ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackShape {
    Segment,
    Rectangle,
    Arc,
    Circle,
    Polygon,
    Curve,
}

impl TrackShape {
    /// The integer code used by the file format.
    pub fn code(self) -> i64 {
        match self {
            TrackShape::Segment => 0,
            TrackShape::Rectangle => 1,
            TrackShape::Arc => 2,
            TrackShape::Circle => 3,
            TrackShape::Polygon => 4,
            TrackShape::Curve => 5,
        }
    }
}

impl TryFrom<i64> for TrackShape {
    type Error = BrdError;

    fn try_from(code: i64) -> Result<Self, BrdError> {
        match code {
            0 => Ok(TrackShape::Segment),
            1 => Ok(TrackShape::Rectangle),
            2 => Ok(TrackShape::Arc),
            3 => Ok(TrackShape::Circle),
            4 => Ok(TrackShape::Polygon),
            5 => Ok(TrackShape::Curve),
            other => Err(BrdError::MalformedRecord(format!(
                "unknown track shape code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Copper,
    Via,
}

impl TrackKind {
    pub fn code(self) -> i64 {
        match self {
            TrackKind::Copper => 0,
            TrackKind::Via => 1,
        }
    }
}

impl TryFrom<i64> for TrackKind {
    type Error = BrdError;

    fn try_from(code: i64) -> Result<Self, BrdError> {
        match code {
            0 => Ok(TrackKind::Copper),
            1 => Ok(TrackKind::Via),
            other => Err(BrdError::MalformedRecord(format!(
                "unknown track type code {other}"
            ))),
        }
    }
}

/// A copper trace segment or via. Coordinates and widths are in native
/// units (0.1 mil).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub shape: TrackShape,
    pub kind: TrackKind,
    pub start_x: i64,
    pub start_y: i64,
    pub end_x: i64,
    pub end_y: i64,
    pub width: i64,
    /// −1 in the file means "use the board default drill".
    pub drill: i64,
    /// Electrical layer ordinal.
    pub layer: u32,
    pub net_number: u32,
    /// Opaque, round-tripped verbatim.
    pub timestamp: u64,
    /// Opaque, round-tripped verbatim.
    pub status: u64,
}

impl Track {
    /// Reconstruct the two record lines, field for field. Timestamp and
    /// status are emitted as uppercase hex, as the format writes them.
    pub fn to_lines(&self) -> [String; 2] {
        [
            format!(
                "Po {} {} {} {} {} {} {}",
                self.shape.code(),
                self.start_x,
                self.start_y,
                self.end_x,
                self.end_y,
                self.width,
                self.drill
            ),
            format!(
                "De {} {} {} {:X} {:X}",
                self.layer,
                self.kind.code(),
                self.net_number,
                self.timestamp,
                self.status
            ),
        ]
    }
}

// ─── Tracks collection ───────────────────────────────────────────────

/// All tracks of a `$TRACK` section, indexed by owning net number.
#[derive(Debug, Default)]
pub struct Tracks {
    tracks: Vec<Track>,
    by_net: HashMap<u32, Vec<usize>>,
}

impl Tracks {
    pub fn push(&mut self, track: Track) {
        self.by_net
            .entry(track.net_number)
            .or_default()
            .push(self.tracks.len());
        self.tracks.push(track);
    }

    /// Tracks owned by a net. A net with no routed copper yields an empty
    /// iterator rather than an error.
    pub fn by_net(&self, net_number: u32) -> impl Iterator<Item = &Track> + '_ {
        self.by_net
            .get(&net_number)
            .into_iter()
            .flatten()
            .map(|&i| &self.tracks[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> + '_ {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

// ─── Board index ─────────────────────────────────────────────────────

/// Aggregates parsed nets and tracks. Nets are indexed both by name and by
/// number; either colliding is a structural error.
#[derive(Debug, Default)]
pub struct Board {
    nets: Vec<Net>,
    nets_by_name: HashMap<String, usize>,
    nets_by_number: HashMap<u32, usize>,
    tracks: Tracks,
    tracks_attached: bool,
    stackup: Stackup,
}

impl Board {
    pub fn add_net(&mut self, net: Net) -> Result<(), BrdError> {
        if self.nets_by_name.contains_key(&net.name) {
            return Err(BrdError::Structural(format!(
                "multiple nets named \"{}\"",
                net.name
            )));
        }
        if self.nets_by_number.contains_key(&net.number) {
            return Err(BrdError::Structural(format!(
                "multiple nets numbered {}",
                net.number
            )));
        }
        let index = self.nets.len();
        self.nets_by_name.insert(net.name.clone(), index);
        self.nets_by_number.insert(net.number, index);
        self.nets.push(net);
        Ok(())
    }

    pub fn attach_tracks(&mut self, tracks: Tracks) -> Result<(), BrdError> {
        if self.tracks_attached {
            return Err(BrdError::Structural(
                "multiple TRACK sections in BOARD".to_string(),
            ));
        }
        self.tracks = tracks;
        self.tracks_attached = true;
        Ok(())
    }

    /// Merge a nested board section's contents, under the same uniqueness
    /// rules.
    pub fn absorb(&mut self, other: Board) -> Result<(), BrdError> {
        for net in other.nets {
            self.add_net(net)?;
        }
        if other.tracks_attached {
            self.attach_tracks(other.tracks)?;
        }
        Ok(())
    }

    /// All nets, in insertion order.
    pub fn nets(&self) -> impl Iterator<Item = &Net> + '_ {
        self.nets.iter()
    }

    pub fn net_by_name(&self, name: &str) -> Result<&Net, BrdError> {
        self.nets_by_name
            .get(name)
            .map(|&i| &self.nets[i])
            .ok_or_else(|| BrdError::Structural(format!("no net named \"{name}\"")))
    }

    pub fn net_by_number(&self, number: u32) -> Result<&Net, BrdError> {
        self.nets_by_number
            .get(&number)
            .map(|&i| &self.nets[i])
            .ok_or_else(|| BrdError::Structural(format!("no net numbered {number}")))
    }

    pub fn tracks(&self) -> &Tracks {
        &self.tracks
    }

    pub fn stackup(&self) -> &Stackup {
        &self.stackup
    }
}

// ─── Stack-up ────────────────────────────────────────────────────────

/// One physical layer of the board stack-up.
#[derive(Debug, Clone)]
pub struct StackupLayer {
    /// Copper layers carry a name; dielectrics do not.
    pub name: Option<&'static str>,
    /// Electrical layer ordinal used by track records (copper only).
    pub ordinal: Option<u32>,
    pub material: &'static str,
    /// Relative permittivity (nominal, tolerance), dielectrics only.
    pub permittivity: Option<(f64, f64)>,
    /// Thickness in mil (nominal, tolerance).
    pub thickness: (f64, f64),
}

fn copper(name: &'static str, ordinal: u32, thickness: (f64, f64)) -> StackupLayer {
    StackupLayer {
        name: Some(name),
        ordinal: Some(ordinal),
        material: "copper",
        permittivity: None,
        thickness,
    }
}

fn dielectric(material: &'static str, permittivity: (f64, f64), thickness: (f64, f64)) -> StackupLayer {
    StackupLayer {
        name: None,
        ordinal: None,
        material,
        permittivity: Some(permittivity),
        thickness,
    }
}

/// The physical layer sequence of the board, outermost first. Ordering in
/// the list is physical stack order; ordinals are unique among copper
/// layers.
#[derive(Debug, Clone)]
pub struct Stackup {
    layers: Vec<StackupLayer>,
}

impl Default for Stackup {
    fn default() -> Self {
        Self {
            layers: vec![
                copper("1_top", 15, (1.7, 0.4)),
                dielectric("2 x 1080", (4.5, 0.1), (4.4, 0.7)),
                copper("2_gnd", 6, (1.4, 0.4)),
                dielectric("core", (4.5, 0.1), (8.0, 2.0)),
                copper("3_inner", 5, (1.4, 0.4)),
                dielectric("2 x 2116", (4.5, 0.1), (8.4, 2.0)),
                copper("4_gnd", 4, (1.4, 0.4)),
                dielectric("core", (4.5, 0.1), (8.0, 0.8)),
                copper("5_pwr", 3, (1.4, 0.4)),
                dielectric("2 x 2116", (4.5, 0.1), (8.4, 2.0)),
                copper("6_inner", 2, (1.4, 0.4)),
                dielectric("core", (4.5, 0.1), (8.0, 2.0)),
                copper("7_gnd", 1, (1.4, 0.4)),
                dielectric("2 x 1080", (4.5, 0.1), (4.4, 0.7)),
                copper("8_bot", 0, (1.7, 0.4)),
            ],
        }
    }
}

impl Stackup {
    pub fn layers(&self) -> &[StackupLayer] {
        &self.layers
    }

    fn index_by_ordinal(&self, ordinal: u32) -> Result<usize, BrdError> {
        self.layers
            .iter()
            .position(|layer| layer.ordinal == Some(ordinal))
            .ok_or_else(|| {
                BrdError::Structural(format!("no copper layer with ordinal {ordinal}"))
            })
    }

    /// Cumulative nominal thickness in mil between two copper layers,
    /// inclusive of both.
    pub fn layer_distance(&self, ordinal_a: u32, ordinal_b: u32) -> Result<f64, BrdError> {
        let mut a = self.index_by_ordinal(ordinal_a)?;
        let mut b = self.index_by_ordinal(ordinal_b)?;
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        Ok(self.layers[a..=b].iter().map(|layer| layer.thickness.0).sum())
    }
}

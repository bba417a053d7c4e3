//! Per-net length, propagation delay and via-count derivations for bus
//! skew matching.

use crate::error::BrdError;
use crate::types::{Board, Net, Track, TrackKind};
use crate::units;

/// Propagation delay on designated outer copper layers, seconds per inch.
pub const OUTER_DELAY_PER_INCH: f64 = 150e-12;
/// Propagation delay on designated inner copper layers, seconds per inch.
pub const INNER_DELAY_PER_INCH: f64 = 180e-12;

/// Which copper ordinals count as outer vs inner for delay purposes.
/// These depend on the board's stack-up, so the caller supplies them.
#[derive(Debug, Clone)]
pub struct LayerClasses {
    pub outer: Vec<u32>,
    pub inner: Vec<u32>,
}

/// Trace length of one track in native units. Vias contribute no length.
pub fn track_length(track: &Track) -> f64 {
    match track.kind {
        TrackKind::Copper => {
            let dx = (track.end_x - track.start_x) as f64;
            let dy = (track.end_y - track.start_y) as f64;
            dx.hypot(dy)
        }
        TrackKind::Via => 0.0,
    }
}

/// Propagation delay of one track in seconds. A copper track on an ordinal
/// in neither layer class has no defined delay.
pub fn track_delay(track: &Track, classes: &LayerClasses) -> Result<f64, BrdError> {
    match track.kind {
        TrackKind::Copper => {
            let length_inch = units::to_inch(track_length(track));
            if classes.outer.contains(&track.layer) {
                Ok(length_inch * OUTER_DELAY_PER_INCH)
            } else if classes.inner.contains(&track.layer) {
                Ok(length_inch * INNER_DELAY_PER_INCH)
            } else {
                Err(BrdError::UnknownLayerDelay(track.layer))
            }
        }
        TrackKind::Via => Ok(0.0),
    }
}

pub fn net_length(board: &Board, net: &Net) -> f64 {
    board.tracks().by_net(net.number).map(track_length).sum()
}

pub fn net_delay(board: &Board, net: &Net, classes: &LayerClasses) -> Result<f64, BrdError> {
    let mut total = 0.0;
    for track in board.tracks().by_net(net.number) {
        total += track_delay(track, classes)?;
    }
    Ok(total)
}

pub fn net_via_count(board: &Board, net: &Net) -> usize {
    board
        .tracks()
        .by_net(net.number)
        .filter(|track| track.kind == TrackKind::Via)
        .count()
}

// ─── Bus selection ───────────────────────────────────────────────────

/// Net-name matching for one bus group. The prefix/suffix conventions are
/// configuration supplied by the caller, not library logic.
#[derive(Debug, Clone, Default)]
pub struct BusPattern {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

impl BusPattern {
    pub fn matches(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

pub fn select_nets<'a>(board: &'a Board, pattern: &BusPattern) -> Vec<&'a Net> {
    board.nets().filter(|net| pattern.matches(&net.name)).collect()
}

// ─── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSort {
    Delay,
    Length,
}

#[derive(Debug, Clone)]
pub struct BusRow {
    pub name: String,
    pub short_name: String,
    /// Total routed length in native units.
    pub length: f64,
    /// Total propagation delay in seconds.
    pub delay: f64,
    pub via_count: usize,
}

#[derive(Debug, Clone)]
pub struct BusReport {
    /// Rows sorted ascending by the requested key.
    pub rows: Vec<BusRow>,
    pub min_length: f64,
    pub max_length: f64,
    pub min_delay: f64,
    pub max_delay: f64,
}

/// Per-net length/delay/via summary for a matched bus group.
pub fn bus_report(
    board: &Board,
    nets: &[&Net],
    classes: &LayerClasses,
    sort: BusSort,
) -> Result<BusReport, BrdError> {
    let mut rows = Vec::with_capacity(nets.len());
    for &net in nets {
        rows.push(BusRow {
            name: net.name.clone(),
            short_name: net.short_name().to_string(),
            length: net_length(board, net),
            delay: net_delay(board, net, classes)?,
            via_count: net_via_count(board, net),
        });
    }
    match sort {
        BusSort::Delay => rows.sort_by(|a, b| a.delay.total_cmp(&b.delay)),
        BusSort::Length => rows.sort_by(|a, b| a.length.total_cmp(&b.length)),
    }
    let min_length = rows.iter().map(|r| r.length).fold(f64::INFINITY, f64::min);
    let max_length = rows.iter().map(|r| r.length).fold(f64::NEG_INFINITY, f64::max);
    let min_delay = rows.iter().map(|r| r.delay).fold(f64::INFINITY, f64::min);
    let max_delay = rows.iter().map(|r| r.delay).fold(f64::NEG_INFINITY, f64::max);
    Ok(BusReport {
        rows,
        min_length,
        max_length,
        min_delay,
        max_delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_board;
    use crate::types::TrackShape;
    use approx::assert_relative_eq;

    fn classes() -> LayerClasses {
        LayerClasses {
            outer: vec![15, 0],
            inner: vec![5, 2],
        }
    }

    fn copper(start: (i64, i64), end: (i64, i64), layer: u32, net: u32) -> Track {
        Track {
            shape: TrackShape::Segment,
            kind: TrackKind::Copper,
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            width: 60,
            drill: -1,
            layer,
            net_number: net,
            timestamp: 0,
            status: 0,
        }
    }

    fn via(net: u32) -> Track {
        Track {
            shape: TrackShape::Circle,
            kind: TrackKind::Via,
            start_x: 0,
            start_y: 0,
            end_x: 0,
            end_y: 0,
            width: 350,
            drill: 200,
            layer: 15,
            net_number: net,
            timestamp: 0,
            status: 0,
        }
    }

    #[test]
    fn test_zero_length_track() {
        let track = copper((500, 500), (500, 500), 15, 1);
        assert_relative_eq!(track_length(&track), 0.0);
    }

    #[test]
    fn test_length_scale() {
        // 10000 native units = 1.00 inch = 25.4 mm
        let track = copper((0, 0), (10_000, 0), 15, 1);
        let length = track_length(&track);
        assert_relative_eq!(length, 10_000.0);
        assert_relative_eq!(units::to_inch(length), 1.0);
        assert_relative_eq!(units::to_mm(length), 25.4);
    }

    #[test]
    fn test_diagonal_length() {
        let track = copper((0, 0), (3_000, 4_000), 15, 1);
        assert_relative_eq!(track_length(&track), 5_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_via_has_no_length_or_delay() {
        let track = via(1);
        assert_relative_eq!(track_length(&track), 0.0);
        assert_relative_eq!(track_delay(&track, &classes()).unwrap(), 0.0);
    }

    #[test]
    fn test_outer_layer_delay() {
        let track = copper((0, 0), (10_000, 0), 15, 1);
        assert_relative_eq!(track_delay(&track, &classes()).unwrap(), 150e-12);
    }

    #[test]
    fn test_inner_layer_delay() {
        let track = copper((0, 0), (10_000, 0), 5, 1);
        assert_relative_eq!(track_delay(&track, &classes()).unwrap(), 180e-12);
    }

    #[test]
    fn test_unknown_layer_delay_is_error() {
        let track = copper((0, 0), (10_000, 0), 6, 1);
        assert!(matches!(
            track_delay(&track, &classes()).unwrap_err(),
            BrdError::UnknownLayerDelay(6)
        ));
    }

    const SAMPLE: &str = "\
$EQUIPOT
Na 1 \"/bus/D0\"
$EndEQUIPOT
$EQUIPOT
Na 2 \"/bus/D1\"
$EndEQUIPOT
$EQUIPOT
Na 3 \"/other/LED\"
$EndEQUIPOT
$TRACK
Po 0 0 0 10000 0 60 -1
De 15 0 1 0 0
Po 0 0 0 10000 0 60 -1
De 15 0 2 0 0
Po 0 10000 0 20000 0 60 -1
De 5 0 2 0 0
Po 3 10000 0 10000 0 350 200
De 15 1 2 0 0
$EndTRACK
";

    #[test]
    fn test_net_sums() {
        let board = parse_board(SAMPLE).unwrap();
        let d1 = board.net_by_name("/bus/D1").unwrap();
        assert_relative_eq!(net_length(&board, d1), 20_000.0, max_relative = 1e-9);
        // one inch outer + one inch inner
        assert_relative_eq!(
            net_delay(&board, d1, &classes()).unwrap(),
            330e-12,
            max_relative = 1e-9
        );
        assert_eq!(net_via_count(&board, d1), 1);
    }

    #[test]
    fn test_bus_pattern_selection() {
        let board = parse_board(SAMPLE).unwrap();
        let pattern = BusPattern {
            prefixes: vec!["/bus/D".to_string()],
            suffixes: vec![],
        };
        let nets = select_nets(&board, &pattern);
        assert_eq!(nets.len(), 2);

        let by_suffix = BusPattern {
            prefixes: vec![],
            suffixes: vec!["/LED".to_string()],
        };
        assert_eq!(select_nets(&board, &by_suffix).len(), 1);
    }

    #[test]
    fn test_bus_report_sorted_with_deltas() {
        let board = parse_board(SAMPLE).unwrap();
        let pattern = BusPattern {
            prefixes: vec!["/bus/D".to_string()],
            suffixes: vec![],
        };
        let nets = select_nets(&board, &pattern);
        let report = bus_report(&board, &nets, &classes(), BusSort::Delay).unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].short_name, "D0");
        assert_eq!(report.rows[1].short_name, "D1");
        assert_relative_eq!(report.min_delay, 150e-12);
        assert_relative_eq!(report.max_delay, 330e-12, max_relative = 1e-9);
        assert_relative_eq!(report.min_length, 10_000.0);
        assert_relative_eq!(report.max_length, 20_000.0);
        for row in &report.rows {
            assert!(row.delay >= report.min_delay);
            assert!(row.delay <= report.max_delay);
        }
    }
}

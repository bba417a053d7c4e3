//! Per-record parsers for the line tags inside EQUIPOT and TRACK sections.

use crate::error::BrdError;
use crate::types::{Net, Track, TrackKind, TrackShape, Tracks};

pub(crate) fn field<'a>(fields: &[&'a str], index: usize, line: &str) -> Result<&'a str, BrdError> {
    fields.get(index).copied().ok_or_else(|| {
        BrdError::MalformedRecord(format!("missing field {index} in line \"{line}\""))
    })
}

pub(crate) fn int_field(token: &str, what: &str, line: &str) -> Result<i64, BrdError> {
    token.parse().map_err(|_| {
        BrdError::MalformedRecord(format!("bad {what} \"{token}\" in line \"{line}\""))
    })
}

pub(crate) fn uint_field(token: &str, what: &str, line: &str) -> Result<u32, BrdError> {
    token.parse().map_err(|_| {
        BrdError::MalformedRecord(format!("bad {what} \"{token}\" in line \"{line}\""))
    })
}

fn hex_field(token: &str, what: &str, line: &str) -> Result<u64, BrdError> {
    u64::from_str_radix(token, 16).map_err(|_| {
        BrdError::MalformedRecord(format!("bad {what} \"{token}\" in line \"{line}\""))
    })
}

/// The middle field of a double-quote split. Exactly two quote characters
/// are required.
pub(crate) fn quoted_name(line: &str) -> Result<&str, BrdError> {
    let parts: Vec<&str> = line.split('"').collect();
    if parts.len() != 3 {
        return Err(BrdError::MalformedRecord(format!(
            "unexpected number of quotes in line \"{line}\""
        )));
    }
    Ok(parts[1])
}

// ─── Net (EQUIPOT) ───────────────────────────────────────────────────

/// Builds one `Net` from the records of an EQUIPOT section.
#[derive(Debug, Default)]
pub struct NetParser {
    number: Option<u32>,
    name: Option<String>,
}

impl NetParser {
    pub fn consume(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first().copied() {
            Some("Na") => {
                self.number = Some(uint_field(field(&fields, 1, line)?, "net number", line)?);
                self.name = Some(quoted_name(line)?.to_string());
                Ok(())
            }
            Some("St") => Ok(()),
            _ => Err(BrdError::MalformedRecord(format!(
                "unhandled net property in line \"{line}\""
            ))),
        }
    }

    pub fn finalize(self) -> Result<Net, BrdError> {
        match (self.number, self.name) {
            (Some(number), Some(name)) => Ok(Net::new(number, name)),
            _ => Err(BrdError::Structural(
                "EQUIPOT section ended without an Na record".to_string(),
            )),
        }
    }
}

// ─── Track (TRACK) ───────────────────────────────────────────────────

/// Geometry fields of a `Po` record, awaiting its `De` descriptor.
#[derive(Debug, Clone)]
pub struct TrackPosition {
    pub shape: TrackShape,
    pub start_x: i64,
    pub start_y: i64,
    pub end_x: i64,
    pub end_y: i64,
    pub width: i64,
    pub drill: i64,
}

pub(crate) fn parse_position(fields: &[&str], line: &str) -> Result<TrackPosition, BrdError> {
    Ok(TrackPosition {
        shape: TrackShape::try_from(int_field(field(fields, 1, line)?, "shape", line)?)?,
        start_x: int_field(field(fields, 2, line)?, "start_x", line)?,
        start_y: int_field(field(fields, 3, line)?, "start_y", line)?,
        end_x: int_field(field(fields, 4, line)?, "end_x", line)?,
        end_y: int_field(field(fields, 5, line)?, "end_y", line)?,
        width: int_field(field(fields, 6, line)?, "width", line)?,
        drill: int_field(field(fields, 7, line)?, "drill", line)?,
    })
}

pub(crate) fn complete_track(
    position: TrackPosition,
    fields: &[&str],
    line: &str,
) -> Result<Track, BrdError> {
    Ok(Track {
        shape: position.shape,
        kind: TrackKind::try_from(int_field(field(fields, 2, line)?, "type", line)?)?,
        start_x: position.start_x,
        start_y: position.start_y,
        end_x: position.end_x,
        end_y: position.end_y,
        width: position.width,
        drill: position.drill,
        layer: uint_field(field(fields, 1, line)?, "layer", line)?,
        net_number: uint_field(field(fields, 3, line)?, "net number", line)?,
        timestamp: hex_field(field(fields, 4, line)?, "timestamp", line)?,
        status: hex_field(field(fields, 5, line)?, "status", line)?,
    })
}

/// Record state machine for a TRACK section: each `Po` must be completed
/// by a `De` before the next `Po` arrives.
#[derive(Debug, Default)]
pub struct TracksParser {
    pending: Option<TrackPosition>,
    tracks: Tracks,
}

impl TracksParser {
    pub fn consume(&mut self, line: &str) -> Result<(), BrdError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first().copied() {
            Some("Po") => {
                if self.pending.is_some() {
                    return Err(BrdError::Structural(format!(
                        "Po arrived while another Po was pending: \"{line}\""
                    )));
                }
                self.pending = Some(parse_position(&fields, line)?);
                Ok(())
            }
            Some("De") => {
                let position = self.pending.take().ok_or_else(|| {
                    BrdError::Structural(format!("De with no pending Po: \"{line}\""))
                })?;
                self.tracks.push(complete_track(position, &fields, line)?);
                Ok(())
            }
            _ => Err(BrdError::MalformedRecord(format!(
                "unhandled track property in line \"{line}\""
            ))),
        }
    }

    pub fn finalize(self) -> Result<Tracks, BrdError> {
        if self.pending.is_some() {
            return Err(BrdError::Structural(
                "TRACK section ended with a Po record awaiting its De".to_string(),
            ));
        }
        Ok(self.tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_na_roundtrip() {
        let mut parser = NetParser::default();
        parser.consume("Na 42 \"/ddr2/DQ17\"").unwrap();
        parser.consume("St ~").unwrap();
        let net = parser.finalize().unwrap();
        assert_eq!(net.number, 42);
        assert_eq!(net.name, "/ddr2/DQ17");
    }

    #[test]
    fn test_net_wrong_quote_count() {
        let mut parser = NetParser::default();
        assert!(matches!(
            parser.consume("Na 1 /ddr2/DQ0").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
        assert!(matches!(
            parser.consume("Na 1 \"a\" \"b\"").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_net_unknown_tag() {
        let mut parser = NetParser::default();
        assert!(matches!(
            parser.consume("Xx 1 2").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_net_without_na_is_incomplete() {
        let mut parser = NetParser::default();
        parser.consume("St ~").unwrap();
        assert!(matches!(
            parser.finalize().unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_track_po_de_complete() {
        let mut parser = TracksParser::default();
        parser.consume("Po 0 31300 -22600 33000 -22600 60 -1").unwrap();
        parser.consume("De 15 0 7 8000AF42 400").unwrap();
        let tracks = parser.finalize().unwrap();
        assert_eq!(tracks.len(), 1);
        let track = tracks.iter().next().unwrap();
        assert_eq!(track.shape, TrackShape::Segment);
        assert_eq!(track.kind, TrackKind::Copper);
        assert_eq!(track.start_y, -22600);
        assert_eq!(track.width, 60);
        assert_eq!(track.drill, -1);
        assert_eq!(track.layer, 15);
        assert_eq!(track.net_number, 7);
        assert_eq!(track.timestamp, 0x8000af42);
        assert_eq!(track.status, 0x400);
    }

    #[test]
    fn test_track_shape_out_of_range() {
        let mut parser = TracksParser::default();
        assert!(matches!(
            parser.consume("Po 6 0 0 0 0 60 -1").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_track_type_out_of_range() {
        let mut parser = TracksParser::default();
        parser.consume("Po 0 0 0 0 0 60 -1").unwrap();
        assert!(matches!(
            parser.consume("De 15 2 7 0 0").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_orphaned_po() {
        let mut parser = TracksParser::default();
        parser.consume("Po 0 0 0 0 0 60 -1").unwrap();
        assert!(matches!(
            parser.consume("Po 0 1 1 2 2 60 -1").unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_orphaned_de() {
        let mut parser = TracksParser::default();
        assert!(matches!(
            parser.consume("De 15 0 7 0 0").unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_truncated_track_at_section_end() {
        let mut parser = TracksParser::default();
        parser.consume("Po 0 0 0 0 0 60 -1").unwrap();
        assert!(matches!(
            parser.finalize().unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_track_unknown_tag() {
        let mut parser = TracksParser::default();
        assert!(matches!(
            parser.consume("Zz 1 2 3").unwrap_err(),
            BrdError::MalformedRecord(_)
        ));
    }
}

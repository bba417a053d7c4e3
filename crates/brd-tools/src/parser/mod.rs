//! Section-structured parser for the legacy line-oriented board format.
//!
//! `$SECTION` markers open nested contexts on a push-down stack; each
//! non-marker line routes to the parser on top of the stack. `$END...`
//! pops the top frame and delivers the completed record to its parent.

pub mod records;

use log::debug;

use crate::error::BrdError;
use crate::types::{Board, Net, Tracks};
use records::{NetParser, TracksParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Board,
    Net,
    Tracks,
    /// Recognized section with no semantic handler; its lines are dropped.
    Opaque,
}

/// The section keyword registry. Anything not listed here is fatal.
fn section_kind(keyword: &str) -> Result<SectionKind, BrdError> {
    match keyword {
        "BOARD" => Ok(SectionKind::Board),
        "EQUIPOT" => Ok(SectionKind::Net),
        "TRACK" => Ok(SectionKind::Tracks),
        "GENERAL" | "SHEETDESCR" | "SETUP" | "NCLASS" | "TEXTPCB" | "MODULE" | "PAD"
        | "SHAPE3D" | "DRAWSEGMENT" | "ZONE" | "CZONE_OUTLINE" | "POLYSCORNERS" => {
            Ok(SectionKind::Opaque)
        }
        other => Err(BrdError::UnknownSection(other.to_string())),
    }
}

/// One frame of the section context stack.
#[derive(Debug)]
enum Frame {
    Board(Board),
    Net(NetParser),
    Tracks(TracksParser),
    Opaque(String),
}

/// A completed section delivered to its parent frame.
enum Child {
    Board(Board),
    Net(Net),
    Tracks(Tracks),
}

pub struct ContextStack {
    stack: Vec<Frame>,
    /// Set once the root board frame has been closed by a bare `$EndBOARD`.
    completed: Option<Board>,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    pub fn new() -> Self {
        Self {
            stack: vec![Frame::Board(Board::default())],
            completed: None,
        }
    }

    pub fn feed(&mut self, line: &str) -> Result<(), BrdError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        if self.completed.is_some() {
            return Err(BrdError::Structural(format!(
                "content after the board closed: \"{line}\""
            )));
        }
        if let Some(marker) = line.strip_prefix('$') {
            let keyword = marker
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_ascii_uppercase();
            if keyword.starts_with("END") {
                self.close_section()
            } else {
                self.open_section(&keyword)
            }
        } else {
            self.consume(line)
        }
    }

    fn open_section(&mut self, keyword: &str) -> Result<(), BrdError> {
        let frame = match section_kind(keyword)? {
            SectionKind::Board => Frame::Board(Board::default()),
            SectionKind::Net => Frame::Net(NetParser::default()),
            SectionKind::Tracks => Frame::Tracks(TracksParser::default()),
            SectionKind::Opaque => Frame::Opaque(keyword.to_string()),
        };
        self.stack.push(frame);
        Ok(())
    }

    fn close_section(&mut self) -> Result<(), BrdError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| BrdError::Structural("unbalanced $END marker".to_string()))?;
        let child = match frame {
            Frame::Board(board) => Some(Child::Board(board)),
            Frame::Net(parser) => Some(Child::Net(parser.finalize()?)),
            Frame::Tracks(parser) => Some(Child::Tracks(parser.finalize()?)),
            Frame::Opaque(_) => None,
        };
        match (self.stack.last_mut(), child) {
            // the bottom frame is always a board; closing it ends the file
            (None, Some(Child::Board(board))) => {
                self.completed = Some(board);
                Ok(())
            }
            (None, _) => Err(BrdError::Structural("unbalanced $END marker".to_string())),
            (Some(Frame::Board(parent)), Some(child)) => match child {
                Child::Board(board) => parent.absorb(board),
                Child::Net(net) => parent.add_net(net),
                Child::Tracks(tracks) => parent.attach_tracks(tracks),
            },
            // an unhandled section swallows any children it contains
            (Some(Frame::Opaque(_)), _) => Ok(()),
            (Some(_), Some(_)) => Err(BrdError::Structural(
                "section closed inside a record section".to_string(),
            )),
            (Some(_), None) => Ok(()),
        }
    }

    fn consume(&mut self, line: &str) -> Result<(), BrdError> {
        match self.stack.last_mut() {
            Some(Frame::Net(parser)) => parser.consume(line),
            Some(Frame::Tracks(parser)) => parser.consume(line),
            // the board frame absorbs header lines like "PCBNEW-BOARD Version 1";
            // opaque frames drop their lines
            Some(Frame::Board(_)) | Some(Frame::Opaque(_)) | None => Ok(()),
        }
    }

    pub fn finish(mut self) -> Result<Board, BrdError> {
        if let Some(board) = self.completed.take() {
            return Ok(board);
        }
        if self.stack.len() != 1 {
            return Err(BrdError::Structural(format!(
                "{} sections left open at end of file",
                self.stack.len() - 1
            )));
        }
        match self.stack.pop() {
            Some(Frame::Board(board)) => Ok(board),
            _ => Err(BrdError::Structural("unbalanced $END marker".to_string())),
        }
    }
}

/// Parse a full board file.
pub fn parse_board(input: &str) -> Result<Board, BrdError> {
    let mut stack = ContextStack::new();
    for line in input.lines() {
        stack.feed(line)?;
    }
    let board = stack.finish()?;
    debug!(
        "parsed {} nets, {} tracks",
        board.nets().count(),
        board.tracks().len()
    );
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
PCBNEW-BOARD Version 1 date 2012
$GENERAL
Units deci-mils
$EndGENERAL
$EQUIPOT
Na 7 \"/bus/D0\"
St ~
$EndEQUIPOT
$EQUIPOT
Na 8 \"/bus/D1\"
St ~
$EndEQUIPOT
$TRACK
Po 0 0 0 10000 0 60 -1
De 15 0 7 0 0
Po 3 10000 0 10000 0 350 200
De 15 1 7 0 0
$EndTRACK
$EndBOARD
";

    #[test]
    fn test_parses_sample_board() {
        let board = parse_board(SAMPLE).unwrap();
        assert_eq!(board.nets().count(), 2);
        assert_eq!(board.tracks().len(), 2);
        let net = board.net_by_name("/bus/D0").unwrap();
        assert_eq!(net.number, 7);
        assert_eq!(board.tracks().by_net(7).count(), 2);
        assert_eq!(board.tracks().by_net(8).count(), 0);
    }

    #[test]
    fn test_nested_board_section() {
        let input = "\
$BOARD
$EQUIPOT
Na 1 \"/clk\"
$EndEQUIPOT
$TRACK
Po 0 0 0 100 0 60 -1
De 15 0 1 0 0
$EndTRACK
$EndBOARD
";
        let board = parse_board(input).unwrap();
        let net = board.net_by_number(1).unwrap();
        assert_eq!(net.name, "/clk");
        assert_eq!(board.tracks().by_net(net.number).count(), 1);
    }

    #[test]
    fn test_unknown_section_is_fatal() {
        let err = parse_board("$BOGUS\n$EndBOGUS\n").unwrap_err();
        assert!(matches!(err, BrdError::UnknownSection(ref kw) if kw == "BOGUS"));
    }

    #[test]
    fn test_duplicate_net_number_aborts() {
        let input = "\
$EQUIPOT
Na 1 \"/a\"
$EndEQUIPOT
$EQUIPOT
Na 1 \"/b\"
$EndEQUIPOT
";
        assert!(matches!(
            parse_board(input).unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_second_track_section_aborts() {
        let input = "\
$TRACK
$EndTRACK
$TRACK
$EndTRACK
";
        assert!(matches!(
            parse_board(input).unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_opaque_section_lines_dropped() {
        let input = "\
$SETUP
Layers 8
TrackWidth 60
$EndSETUP
";
        let board = parse_board(input).unwrap();
        assert_eq!(board.nets().count(), 0);
    }

    #[test]
    fn test_unclosed_section_is_fatal() {
        let input = "$EQUIPOT\nNa 1 \"/a\"\n";
        assert!(matches!(
            parse_board(input).unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_content_after_board_close_is_fatal() {
        let input = "$EndBOARD\nNa 1 \"/a\"\n";
        assert!(matches!(
            parse_board(input).unwrap_err(),
            BrdError::Structural(_)
        ));
    }

    #[test]
    fn test_file_without_endboard_is_accepted() {
        let input = "\
$EQUIPOT
Na 1 \"/a\"
$EndEQUIPOT
";
        let board = parse_board(input).unwrap();
        assert_eq!(board.nets().count(), 1);
    }
}

pub mod error;
pub mod parser;
pub mod rewrite;
pub mod skew;
pub mod types;
pub mod units;

use std::path::Path;

pub use error::BrdError;
pub use parser::parse_board;
pub use types::Board;

/// Read and parse a legacy board file.
pub fn load_board(path: &Path) -> Result<Board, BrdError> {
    let text = std::fs::read_to_string(path)?;
    parse_board(&text)
}

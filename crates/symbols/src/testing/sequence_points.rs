//! Sequence point blob encoding

use super::encode::{compressed_i32, compressed_u32};

/// IL bytes between consecutive encoded points
const IL_STRIDE: u32 = 2;
/// Column span given to every visible point
const COLUMN_SPAN: u32 = 4;

/// A sequence point to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Point {
    /// A single-line point starting at `line`/`column`
    Line {
        /// Start line
        line: u32,
        /// Start column
        column: u32,
    },
    /// A hidden point
    Hidden,
}

impl Point {
    /// A visible point
    pub fn line(line: u32, column: u32) -> Self {
        Point::Line { line, column }
    }
}

/// Encode points into a `MethodDebugInformation.SequencePoints` blob
///
/// The row's `Document` column is expected to be set, so no initial
/// document is written. Points get increasing IL offsets starting at 0.
pub fn encode_sequence_points(points: &[Point]) -> Vec<u8> {
    let mut out = Vec::new();
    compressed_u32(&mut out, 0); // LocalSignature
    let mut previous: Option<(u32, u32)> = None;
    for (i, point) in points.iter().enumerate() {
        compressed_u32(&mut out, if i == 0 { 0 } else { IL_STRIDE });
        match *point {
            Point::Hidden => {
                compressed_u32(&mut out, 0);
                compressed_u32(&mut out, 0);
            }
            Point::Line { line, column } => {
                compressed_u32(&mut out, 0);
                compressed_u32(&mut out, COLUMN_SPAN);
                match previous {
                    None => {
                        compressed_u32(&mut out, line);
                        compressed_u32(&mut out, column);
                    }
                    Some((prev_line, prev_column)) => {
                        compressed_i32(&mut out, line as i32 - prev_line as i32);
                        compressed_i32(&mut out, column as i32 - prev_column as i32);
                    }
                }
                previous = Some((line, column));
            }
        }
    }
    out
}

//! Error types for the bilz library.

use std::fmt;

/// Result type alias for bilz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during compression or decompression.
#[derive(Debug)]
pub enum Error {
    /// Malformed user input (bad bound unit, empty file, unknown name).
    InvalidInput(String),
    /// The target file has no weight model section for the encoder.
    ModelNotFound {
        /// Target name as given on the command line.
        target: String,
        /// Encoder whose section is missing.
        encoder: String,
    },
    /// The requested bound is below the weight-optimal solution's weight.
    InfeasibleBound {
        /// Requested bound.
        bound: f64,
        /// Weight of the weight-optimal solution.
        min_weight: f64,
    },
    /// The selected generator cannot serve the cost model's distance ladder.
    GeneratorMismatch {
        /// Kind the generator supports.
        expected: &'static str,
        /// Kind the distance ladder actually has.
        actual: &'static str,
        /// A generator name that would work.
        suggested: &'static str,
    },
    /// An encoded phrase would read or write outside its buffer.
    BoundaryViolation {
        /// Output position at which the violation was detected.
        position: usize,
    },
    /// The solution integrator found a copy edge with no matching mesh edge.
    IntegrationMiss {
        /// Text position of the unmatched edge.
        position: usize,
        /// Length that had no counterpart in the mesh.
        ell: u32,
    },
    /// A parsing failed the correctness check against the source text.
    CorrectnessCheck {
        /// First mismatching text position.
        position: usize,
        /// Distance of the offending edge.
        d: u32,
        /// Length of the offending edge.
        ell: u32,
    },
    /// Compressed data is corrupted or truncated.
    CorruptedData(String),
    /// I/O failure while reading or writing a file.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::ModelNotFound { target, encoder } => {
                write!(
                    f,
                    "No time model for (target, encoder) = ({}, {})",
                    target, encoder
                )
            }
            Error::InfeasibleBound { bound, min_weight } => {
                write!(
                    f,
                    "Bound {} below weight-optimal weight {}, problem is infeasible",
                    bound, min_weight
                )
            }
            Error::GeneratorMismatch {
                expected,
                actual,
                suggested,
            } => {
                write!(
                    f,
                    "Generator expects {} distance ladder, got {} (try \"{}\")",
                    expected, actual, suggested
                )
            }
            Error::BoundaryViolation { position } => {
                write!(f, "Phrase exceeds buffer at output position {}", position)
            }
            Error::IntegrationMiss { position, ell } => {
                write!(
                    f,
                    "A fixable edge found no match: position {}, length {}",
                    position, ell
                )
            }
            Error::CorrectnessCheck { position, d, ell } => {
                write!(
                    f,
                    "Incorrect parsing: position {}, distance {}, length {}",
                    position, d, ell
                )
            }
            Error::CorruptedData(msg) => write!(f, "Corrupted data: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

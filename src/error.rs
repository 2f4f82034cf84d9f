#![warn(missing_docs)]
//! Poptics specific error structures
use std::{error::Error, fmt::Display};

/// Poptics application specific Result type
pub type PopResult<T> = std::result::Result<T, PopError>;

/// Errors that can be returned by the propagation engine and its surrounding layers.
///
/// Construction errors are raised at the point of invalid input. [`PopError::Consistency`] signals
/// a broken internal invariant of the wavefront state and terminates the current execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopError {
    /// a numerical parameter is out of its valid range (zero refractive index, negative magnification, ...)
    InvalidParameter(String),
    /// the requested Zernike ordering scheme is not known
    UnsupportedOrdering(String),
    /// the requested aperture shape is not known
    UnsupportedShape(String),
    /// the requested coordinate break order is not implemented
    UnsupportedOrder(String),
    /// an aperture was requested without the dimensions its shape requires
    MissingDimension(String),
    /// a radial / azimuthal Zernike index pair is invalid
    InvalidRadialAzimuthal(String),
    /// the sagittal and tangential pilot beams disagree or a propagator precondition is violated
    Consistency(String),
    /// errors while reading or validating a simulation document
    Config(String),
    /// errors console io
    Console(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for PopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameter(m) => {
                write!(f, "InvalidParameter:{m}")
            }
            Self::UnsupportedOrdering(m) => {
                write!(f, "UnsupportedOrdering:{m}")
            }
            Self::UnsupportedShape(m) => {
                write!(f, "UnsupportedShape:{m}")
            }
            Self::UnsupportedOrder(m) => {
                write!(f, "UnsupportedOrder:{m}")
            }
            Self::MissingDimension(m) => {
                write!(f, "MissingDimension:{m}")
            }
            Self::InvalidRadialAzimuthal(m) => {
                write!(f, "InvalidRadialAzimuthal:{m}")
            }
            Self::Consistency(m) => {
                write!(f, "Consistency:{m}")
            }
            Self::Config(m) => {
                write!(f, "Config:{m}")
            }
            Self::Console(m) => {
                write!(f, "Console:{m}")
            }
            Self::Other(m) => write!(f, "Poptics Error:Other:{m}"),
        }
    }
}
impl Error for PopError {}

impl std::convert::From<String> for PopError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

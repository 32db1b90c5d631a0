use thiserror::Error;

/// Broad classification of an [`Error`].
///
/// Consumers that only care whether a call failed because of bad inputs or
/// because there was nothing to work on can match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad shapes, lengths, radii or slot requests.
    Configuration,
    /// Nothing to project or nothing selected.
    EmptyInput,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Projection radius must be strictly positive, got {0}")]
    NonPositiveRadius(f32),

    #[error("radius_min ({min}) must be lower than radius_max ({max})")]
    RadiusRange { min: f32, max: f32 },

    #[error("Opacity must lie within [0, 1], got {0}")]
    Opacity(f32),

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Index {index} out of bounds for {what} of length {len}")]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Color rows must have 3 (RGB) or 4 (RGBA) channels, row {row} has {width}")]
    ColorShape { row: usize, width: usize },

    #[error("Unknown color '{0}'")]
    UnknownColor(String),

    #[error("Unknown colormap '{0}'")]
    UnknownColormap(String),

    #[error("Overlay slot {requested} is out of sequence ({allocated} slots allocated)")]
    SlotOutOfSequence { requested: usize, allocated: usize },

    #[error("Overlay slot {requested} exceeds the capacity of {capacity} slots")]
    SlotCapacity { requested: usize, capacity: usize },

    #[error("Overlay capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),

    #[error("Overlay slot {0} has never been written")]
    UnknownSlot(usize),

    #[error("No source to project")]
    NoActiveSources,

    #[error("Empty vertex selection")]
    EmptySelection,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoActiveSources | Error::EmptySelection => ErrorKind::EmptyInput,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_empty_input(&self) -> bool {
        self.kind() == ErrorKind::EmptyInput
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check that a parallel sequence has the expected length.
pub fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

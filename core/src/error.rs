use alloc::string::String;
use core::fmt::{Display, Formatter};

/// Failures coming out of the surface pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// Every slot of the bounded pool is in use.
    PoolExhausted { capacity: usize },
    /// Width or height of zero.
    InvalidSize { width: u32, height: u32 },
    /// The backend refused to hand out pixel storage.
    Allocation { width: u32, height: u32 },
}

impl Display for SurfaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            SurfaceError::PoolExhausted { capacity } => {
                write!(f, "surface pool exhausted ({} buffers live)", capacity)
            }
            SurfaceError::InvalidSize { width, height } => {
                write!(f, "invalid surface size {}x{}", width, height)
            }
            SurfaceError::Allocation { width, height } => {
                write!(f, "couldn't allocate a {}x{} surface", width, height)
            }
        }
    }
}

impl core::error::Error for SurfaceError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayError {
    /// The backend could not bring up its window, renderer or device.
    BackendInit(String),
    /// The backend's best texture format is not one we can draw into.
    UnsupportedDepth { bits: u8, bytes: u8 },
    Surface(SurfaceError),
    Blit(String),
    Present(String),
}

impl Display for DisplayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            DisplayError::BackendInit(reason) => write!(f, "display backend init failed: {}", reason),
            DisplayError::UnsupportedDepth { bits, bytes } => write!(
                f,
                "unsupported pixel depth: {} bits ({} bytes per pixel), 8 bits per pixel minimum",
                bits, bytes
            ),
            DisplayError::Surface(e) => write!(f, "{}", e),
            DisplayError::Blit(reason) => write!(f, "blit failed: {}", reason),
            DisplayError::Present(reason) => write!(f, "present failed: {}", reason),
        }
    }
}

impl core::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            DisplayError::Surface(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfaceError> for DisplayError {
    fn from(e: SurfaceError) -> Self {
        DisplayError::Surface(e)
    }
}

//! Core traits and types for still-capture driver abstraction.

use std::time::Duration;

/// Pixel format of a still capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Interleaved 24-bit RGB triples, row-major, no header.
    RawRgb,
    /// Planar YUV 4:2:0: the full Y plane, then U, then V, no header.
    PlanarYuv420,
}

/// One colour-component plane of a planar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// Luma plane.
    Y,
    /// Blue-difference chroma plane.
    U,
    /// Red-difference chroma plane.
    V,
}

impl std::fmt::Display for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Y => write!(f, "Y"),
            Self::U => write!(f, "U"),
            Self::V => write!(f, "V"),
        }
    }
}

/// Byte layout of the three planes of one YUV 4:2:0 frame or slice.
///
/// The same shape describes a whole frame (computed from the frame
/// height) and one delivered slice (computed from the slice height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuvGeometry {
    /// Byte offset of the Y plane.
    pub offset_y: usize,
    /// Byte length of the Y plane.
    pub length_y: usize,
    /// Byte offset of the U plane.
    pub offset_u: usize,
    /// Byte length of the U plane.
    pub length_u: usize,
    /// Byte offset of the V plane.
    pub offset_v: usize,
    /// Byte length of the V plane.
    pub length_v: usize,
}

impl YuvGeometry {
    /// Exact packed planar layout for the given dimensions.
    ///
    /// No alignment is applied; callers needing macroblock alignment
    /// round the dimensions before calling (see
    /// [`StillDriver::yuv_planes`]).
    #[must_use]
    pub const fn planar(width: u32, height: u32) -> Self {
        let length_y = width as usize * height as usize;
        let chroma = (width / 2) as usize * (height / 2) as usize;
        Self {
            offset_y: 0,
            length_y,
            offset_u: length_y,
            length_u: chroma,
            offset_v: length_y + chroma,
            length_v: chroma,
        }
    }

    /// Total length in bytes, the end of the V plane.
    #[must_use]
    pub const fn total_length(&self) -> usize {
        self.offset_v + self.length_v
    }
}

/// Settings for one still capture.
///
/// Width, height and format shape the stored file; the remaining fields
/// are passed through to the driver untouched.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Pixel format to capture and store.
    pub format: CaptureFormat,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Height in rows of one delivered slice. Defaults to the frame
    /// height, meaning the driver delivers the frame in one piece.
    pub slice_height: u32,
    /// Fixed shutter speed, or `None` for automatic exposure.
    pub shutter_speed: Option<Duration>,
}

impl CaptureSettings {
    /// Create settings for the given format and dimensions.
    #[must_use]
    pub const fn new(format: CaptureFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            slice_height: height,
            shutter_speed: None,
        }
    }

    /// Set the slice height used by slice-delivering drivers.
    #[must_use]
    pub const fn with_slice_height(mut self, slice_height: u32) -> Self {
        self.slice_height = slice_height;
        self
    }

    /// Set a fixed shutter speed instead of automatic exposure.
    #[must_use]
    pub const fn with_shutter_speed(mut self, shutter_speed: Duration) -> Self {
        self.shutter_speed = Some(shutter_speed);
        self
    }
}

/// Capability flags of an opened capture device.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Error type for still-capture operations.
#[derive(Debug)]
pub enum CaptureError {
    /// Failed to create or truncate the destination.
    StorageOpenFailed(std::io::Error),
    /// A write to the destination failed.
    StorageWriteFailed(std::io::Error),
    /// Flushing or closing the destination failed.
    StorageCloseFailed(std::io::Error),
    /// The driver could not be opened or started.
    DriverStartFailed(String),
    /// The driver rejected a stop request.
    DriverStopFailed(String),
    /// The driver delivered more bytes than the frame geometry admits.
    GeometryOverflow {
        /// Plane whose capacity would be exceeded.
        plane: Plane,
        /// Bytes the slice claims for that plane.
        requested: usize,
        /// Bytes of capacity remaining in that plane.
        remaining: usize,
    },
    /// A delivered buffer was shorter than its slice geometry claims.
    TruncatedSlice {
        /// Bytes the slice geometry requires.
        expected: usize,
        /// Bytes actually delivered.
        actual: usize,
    },
    /// The driver signalled completion before a plane was fully
    /// delivered.
    IncompleteFrame {
        /// First plane found incomplete.
        plane: Plane,
        /// Bytes received for that plane.
        written: usize,
        /// Bytes the frame geometry expects.
        expected: usize,
    },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageOpenFailed(err) => write!(f, "Failed to open destination: {err}"),
            Self::StorageWriteFailed(err) => write!(f, "Failed to write destination: {err}"),
            Self::StorageCloseFailed(err) => write!(f, "Failed to close destination: {err}"),
            Self::DriverStartFailed(msg) => write!(f, "Driver start failed: {msg}"),
            Self::DriverStopFailed(msg) => write!(f, "Driver stop failed: {msg}"),
            Self::GeometryOverflow {
                plane,
                requested,
                remaining,
            } => write!(
                f,
                "Geometry overflow on plane {plane}: slice claims {requested} bytes, \
                 {remaining} remaining"
            ),
            Self::TruncatedSlice { expected, actual } => write!(
                f,
                "Truncated slice: geometry claims {expected} bytes, buffer has {actual}"
            ),
            Self::IncompleteFrame {
                plane,
                written,
                expected,
            } => write!(
                f,
                "Incomplete frame: plane {plane} received {written} of {expected} bytes"
            ),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Result type for still-capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Capability interface handed to the driver for buffer delivery.
///
/// Implemented by the two delivery strategies: the reassembling
/// [`crate::FrameAssembler`] for planar captures and the passthrough
/// [`crate::DirectWriter`] for interleaved ones.
pub trait DeliverySink {
    /// Consume one delivered buffer.
    ///
    /// An error return tells the driver to cease delivery and return
    /// from [`StillDriver::start`], propagating the error.
    fn deliver(&mut self, buffer: &[u8]) -> Result<()>;
}

/// Abstraction over a still-capture camera driver.
pub trait StillDriver {
    /// Plane layout the driver produces for the given dimensions.
    ///
    /// Pure and deterministic; called once per capture for the frame
    /// layout and once for the slice layout. The default rounds the
    /// width up to a multiple of 32 and the height up to a multiple of
    /// 16, the macroblock alignment camera firmware applies to raw
    /// output. Drivers with a different layout override this.
    fn yuv_planes(&self, width: u32, height: u32) -> YuvGeometry {
        YuvGeometry::planar(width.next_multiple_of(32), height.next_multiple_of(16))
    }

    /// Run one blocking capture.
    ///
    /// Invokes `sink.deliver` zero or more times before returning. When
    /// a delivery returns an error the driver must stop invoking the
    /// sink and return that error. Buffers already in flight when a
    /// stop is requested may still arrive; sinks drop or bound-check
    /// them.
    fn start(&mut self, settings: &CaptureSettings, sink: &mut dyn DeliverySink) -> Result<()>;

    /// Request early termination of a capture. Idempotent; callable
    /// again after the driver has already stopped.
    fn stop(&mut self) -> Result<()>;
}

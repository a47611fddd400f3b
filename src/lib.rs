//! Still-image capture with slice-to-frame reassembly.
//!
//! Captures single stills from a camera driver and persists them as raw
//! interleaved RGB or planar YUV 4:2:0 files. Slice-based drivers
//! deliver planar frames as packed strips; the assembler rebuilds them
//! into contiguous planes before storage, while RGB buffers stream
//! straight to disk. Trait-based driver abstraction enables production
//! use with V4L2 hardware and testing with a mock driver.

pub mod assembler;
pub mod device;
pub mod mock;
pub mod session;
pub mod traits;
pub mod validation;
pub mod writer;

pub use assembler::FrameAssembler;
pub use session::{CaptureSession, SessionPhase};
pub use traits::{
    CaptureError, CaptureFormat, CaptureSettings, DeliverySink, DeviceCapabilities, Plane, Result,
    StillDriver, YuvGeometry,
};
pub use writer::DirectWriter;

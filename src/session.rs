//! Single still-capture orchestration.
//!
//! A [`CaptureSession`] owns its driver and walks one capture through
//! the phases `Idle -> Opening -> Capturing -> Finalizing -> {Closed,
//! Failed}`. All state is private to the session: the frame buffer and
//! its cursors are created for one capture and dropped when it ends, so
//! nothing leaks between captures.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::assembler::FrameAssembler;
use crate::traits::{
    CaptureError, CaptureFormat, CaptureSettings, Result, StillDriver,
};
use crate::writer::DirectWriter;

/// Phase of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No capture has run yet.
    Idle,
    /// The destination and delivery strategy are being set up.
    Opening,
    /// The driver is delivering buffers.
    Capturing,
    /// The driver completed; assembled data is being persisted.
    Finalizing,
    /// The capture finished and the destination was flushed.
    Closed,
    /// The capture was aborted; a partial file may remain on disk.
    Failed,
}

/// Orchestrates single still captures over a [`StillDriver`].
///
/// The capture call blocks until the driver finishes or is stopped. One
/// session runs at most one capture at a time; run captures back to
/// back on the same session to reuse the driver.
pub struct CaptureSession<D> {
    driver: D,
    phase: SessionPhase,
}

impl<D: StillDriver> CaptureSession<D> {
    /// Create a session around a driver.
    #[must_use]
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            phase: SessionPhase::Idle,
        }
    }

    /// Phase the last capture ended in.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Borrow the underlying driver.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Consume the session and return the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Capture one still image to a file.
    ///
    /// The file is created or truncated. On failure a partial file is
    /// left in place; callers needing atomicity write to a temporary
    /// path and rename afterwards.
    pub fn capture(&mut self, settings: &CaptureSettings, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "opening destination");
        let mut file = match File::create(path) {
            Ok(file) => file,
            Err(err) => {
                self.phase = SessionPhase::Failed;
                return Err(CaptureError::StorageOpenFailed(err));
            }
        };

        self.capture_to(settings, &mut file)?;

        if let Err(err) = file.sync_all() {
            self.phase = SessionPhase::Failed;
            return Err(CaptureError::StorageCloseFailed(err));
        }
        Ok(())
    }

    /// Capture one still image to an already open destination.
    pub fn capture_to<W: Write>(&mut self, settings: &CaptureSettings, sink: &mut W) -> Result<()> {
        self.phase = SessionPhase::Opening;
        info!(
            format = ?settings.format,
            width = settings.width,
            height = settings.height,
            "starting still capture"
        );

        let result = match settings.format {
            CaptureFormat::RawRgb => self.capture_rgb(settings, sink),
            CaptureFormat::PlanarYuv420 => self.capture_yuv(settings, sink),
        };

        match result {
            Ok(()) => match sink.flush() {
                Ok(()) => {
                    self.phase = SessionPhase::Closed;
                    info!("capture complete");
                    Ok(())
                }
                Err(err) => {
                    self.phase = SessionPhase::Failed;
                    Err(CaptureError::StorageCloseFailed(err))
                }
            },
            Err(err) => {
                self.phase = SessionPhase::Failed;
                Err(err)
            }
        }
    }

    /// Raw RGB path: buffers go straight to the destination.
    fn capture_rgb<W: Write>(&mut self, settings: &CaptureSettings, sink: &mut W) -> Result<()> {
        let mut writer = DirectWriter::new(&mut *sink);

        self.phase = SessionPhase::Capturing;
        debug!("driver start, direct delivery");
        if let Err(err) = self.driver.start(settings, &mut writer) {
            self.stop_after_failure(&err);
            return Err(err);
        }

        self.phase = SessionPhase::Finalizing;
        debug!(bytes = writer.bytes_written(), "raw capture persisted incrementally");
        Ok(())
    }

    /// Planar YUV path: slices are reassembled, then stored in one
    /// contiguous write.
    fn capture_yuv<W: Write>(&mut self, settings: &CaptureSettings, sink: &mut W) -> Result<()> {
        let frame = self.driver.yuv_planes(settings.width, settings.height);
        let slice = self.driver.yuv_planes(settings.width, settings.slice_height);
        debug!(
            frame_bytes = frame.total_length(),
            slice_bytes = slice.total_length(),
            "allocated frame buffer"
        );
        let mut assembler = FrameAssembler::new(frame, slice);

        self.phase = SessionPhase::Capturing;
        debug!("driver start, reassembling delivery");
        if let Err(err) = self.driver.start(settings, &mut assembler) {
            self.stop_after_failure(&err);
            return Err(err);
        }

        self.phase = SessionPhase::Finalizing;
        let frame_bytes = assembler.finish()?;
        sink.write_all(&frame_bytes)
            .map_err(CaptureError::StorageWriteFailed)?;
        debug!(bytes = frame_bytes.len(), "assembled frame persisted");
        Ok(())
    }

    /// Best-effort stop request after a delivery or storage failure.
    ///
    /// A failed stop is logged and never escalated over the original
    /// error. No stop is issued when the driver itself failed to start.
    fn stop_after_failure(&mut self, cause: &CaptureError) {
        if matches!(cause, CaptureError::DriverStartFailed(_)) {
            return;
        }
        warn!(error = %cause, "delivery failed, requesting driver stop");
        if let Err(err) = self.driver.stop() {
            warn!(error = %err, "driver stop request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailingWriter, MockDriver, TestPattern};
    use crate::traits::Plane;

    fn yuv_settings() -> CaptureSettings {
        CaptureSettings::new(CaptureFormat::PlanarYuv420, 64, 32).with_slice_height(16)
    }

    #[test]
    fn test_yuv_capture_assembles_planes() {
        let driver = MockDriver::new().with_pattern(TestPattern::Solid(60, 110, 160));
        let mut session = CaptureSession::new(driver);

        let mut stored = Vec::new();
        session
            .capture_to(&yuv_settings(), &mut stored)
            .expect("capture");

        assert_eq!(session.phase(), SessionPhase::Closed);
        assert_eq!(stored.len(), 3072);
        assert!(stored[..2048].iter().all(|&b| b == 60));
        assert!(stored[2048..2560].iter().all(|&b| b == 110));
        assert!(stored[2560..].iter().all(|&b| b == 160));
    }

    #[test]
    fn test_rgb_capture_streams_buffers() {
        let driver = MockDriver::new()
            .with_pattern(TestPattern::GradientY)
            .with_rgb_chunk(100);
        let expected = driver.rgb_frame(64, 32);
        let mut session = CaptureSession::new(driver);

        let mut stored = Vec::new();
        let settings = CaptureSettings::new(CaptureFormat::RawRgb, 64, 32);
        session.capture_to(&settings, &mut stored).expect("capture");

        assert_eq!(session.phase(), SessionPhase::Closed);
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_write_failure_stops_driver() {
        let driver = MockDriver::new().with_rgb_chunk(100);
        let mut session = CaptureSession::new(driver);

        let mut failing = FailingWriter::new(0);
        let settings = CaptureSettings::new(CaptureFormat::RawRgb, 64, 32);
        let err = session
            .capture_to(&settings, &mut failing)
            .expect_err("write failure");

        assert!(matches!(err, CaptureError::StorageWriteFailed(_)));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert_eq!(session.driver().stop_requests(), 1);
        // The failed first write was the only attempt.
        assert_eq!(failing.write_attempts(), 1);
    }

    #[test]
    fn test_driver_start_failure_issues_no_stop() {
        let driver = MockDriver::new().failing_start();
        let mut session = CaptureSession::new(driver);

        let mut stored = Vec::new();
        let err = session
            .capture_to(&yuv_settings(), &mut stored)
            .expect_err("start failure");

        assert!(matches!(err, CaptureError::DriverStartFailed(_)));
        assert_eq!(session.driver().stop_requests(), 0);
        assert!(stored.is_empty());
    }

    #[test]
    fn test_extra_slice_aborts_with_overflow() {
        let driver = MockDriver::new().with_extra_slice();
        let mut session = CaptureSession::new(driver);

        let mut stored = Vec::new();
        let err = session
            .capture_to(&yuv_settings(), &mut stored)
            .expect_err("overflow");

        assert!(matches!(err, CaptureError::GeometryOverflow { .. }));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert_eq!(session.driver().stop_requests(), 1);
        assert!(stored.is_empty());
    }

    #[test]
    fn test_yuv_finalize_write_failure() {
        let driver = MockDriver::new();
        let mut session = CaptureSession::new(driver);

        // Every write fails; the single finalizing write reports it.
        let mut failing = FailingWriter::new(0);
        let err = session
            .capture_to(&yuv_settings(), &mut failing)
            .expect_err("finalize failure");

        assert!(matches!(err, CaptureError::StorageWriteFailed(_)));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert_eq!(failing.write_attempts(), 1);
    }

    #[test]
    fn test_failed_stop_does_not_mask_original_error() {
        let driver = MockDriver::new().with_extra_slice().failing_stop();
        let mut session = CaptureSession::new(driver);

        let mut stored = Vec::new();
        let err = session
            .capture_to(&yuv_settings(), &mut stored)
            .expect_err("overflow");

        // The stop failure is logged only; the overflow wins.
        assert!(matches!(
            err,
            CaptureError::GeometryOverflow {
                plane: Plane::Y,
                ..
            }
        ));
        assert_eq!(session.driver().stop_requests(), 1);
    }

    #[test]
    fn test_sessions_are_reusable() {
        let driver = MockDriver::new().with_pattern(TestPattern::Solid(1, 2, 3));
        let mut session = CaptureSession::new(driver);

        let mut first = Vec::new();
        session.capture_to(&yuv_settings(), &mut first).expect("first");
        let mut second = Vec::new();
        session
            .capture_to(&yuv_settings(), &mut second)
            .expect("second");

        assert_eq!(first, second);
        assert_eq!(session.phase(), SessionPhase::Closed);
    }
}

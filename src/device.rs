//! V4L2-backed still driver using the v4l crate.
//!
//! V4L2 capture devices hand over whole frames, not packed strips, so
//! this driver delivers each capture as a single slice covering the
//! full frame. `YU12` frames are already laid out as contiguous planes
//! with no macroblock padding; [`StillDriver::yuv_planes`] is
//! overridden accordingly.

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    CaptureError, CaptureFormat, CaptureSettings, DeliverySink, DeviceCapabilities, Result,
    StillDriver, YuvGeometry,
};
use tracing::debug;

fn fourcc(format: CaptureFormat) -> v4l::FourCC {
    match format {
        CaptureFormat::RawRgb => v4l::FourCC::new(b"RGB3"),
        CaptureFormat::PlanarYuv420 => v4l::FourCC::new(b"YU12"),
    }
}

/// Still-capture driver over a V4L2 device.
pub struct V4l2StillDriver {
    device: Device,
    capabilities: DeviceCapabilities,
    stopped: bool,
}

impl V4l2StillDriver {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    ///
    /// Open and capability-query failures surface as
    /// `DriverStartFailed`.
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize)
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;

        let caps = device
            .query_caps()
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        Ok(Self {
            device,
            capabilities,
            stopped: false,
        })
    }

    /// Capabilities reported by the device.
    pub const fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }
}

impl StillDriver for V4l2StillDriver {
    /// Exact packed planar layout: V4L2 `YU12` has no macroblock
    /// padding for the sizes this driver accepts.
    fn yuv_planes(&self, width: u32, height: u32) -> YuvGeometry {
        YuvGeometry::planar(width, height)
    }

    fn start(&mut self, settings: &CaptureSettings, sink: &mut dyn DeliverySink) -> Result<()> {
        self.stopped = false;

        if settings.shutter_speed.is_some() {
            // Exposure control is left to the device defaults here.
            debug!("fixed shutter speed not mapped to V4L2 controls, ignored");
        }

        let mut fmt = self
            .device
            .format()
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;
        fmt.width = settings.width;
        fmt.height = settings.height;
        fmt.fourcc = fourcc(settings.format);

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;

        // A silently adjusted format would make the stored file
        // unreadable at the requested dimensions.
        if fmt.width != settings.width
            || fmt.height != settings.height
            || fmt.fourcc != fourcc(settings.format)
        {
            return Err(CaptureError::DriverStartFailed(format!(
                "device adjusted format to {}x{} {}",
                fmt.width, fmt.height, fmt.fourcc
            )));
        }

        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, 2)
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;

        let (buf, meta) = stream
            .next()
            .map_err(|err| CaptureError::DriverStartFailed(err.to_string()))?;

        let used = if meta.bytesused == 0 {
            buf.len()
        } else {
            (meta.bytesused as usize).min(buf.len())
        };
        debug!(sequence = meta.sequence, bytes = used, "frame dequeued");

        if !self.stopped {
            sink.deliver(buf.get(..used).unwrap_or(buf))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stopped = true;
        Ok(())
    }
}

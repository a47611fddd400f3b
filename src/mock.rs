//! Mock still-capture driver for testing without camera hardware.
//!
//! The mock renders a test pattern into a planar frame and delivers it
//! the way slice-based camera firmware does: packed strips of Y, U and
//! V rows, top to bottom. Failure injection covers the paths a real
//! driver can take: refusing to start, rejecting a stop request, and
//! misbehaving by delivering more data than the frame admits.

use crate::traits::{
    CaptureError, CaptureFormat, CaptureSettings, DeliverySink, Result, StillDriver, YuvGeometry,
};

/// Test pattern types for generated frames.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// Eight vertical colour bars.
    ColorBars,
    /// Horizontal luma ramp from dark to light, neutral chroma.
    GradientY,
    /// Solid colour with the given Y, U, V values.
    Solid(u8, u8, u8),
}

/// Colour bar palette as YUV triples, one per bar.
///
/// Colors in order: White, Yellow, Cyan, Green, Magenta, Red, Blue,
/// Black.
const COLOR_BARS: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (210, 16, 146),
    (170, 166, 16),
    (145, 54, 34),
    (106, 202, 222),
    (81, 90, 240),
    (41, 240, 110),
    (16, 128, 128),
];

/// Mock driver for testing without hardware.
pub struct MockDriver {
    pattern: TestPattern,
    rgb_chunk: usize,
    fail_start: bool,
    fail_stop: bool,
    deliver_extra: bool,
    stop_requests: u32,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a mock driver rendering a solid mid-grey frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pattern: TestPattern::Solid(128, 128, 128),
            rgb_chunk: 0,
            fail_start: false,
            fail_stop: false,
            deliver_extra: false,
            stop_requests: 0,
        }
    }

    /// Set the rendered test pattern.
    #[must_use]
    pub const fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Deliver RGB captures in buffers of at most `bytes` each instead
    /// of one whole-frame buffer.
    #[must_use]
    pub const fn with_rgb_chunk(mut self, bytes: usize) -> Self {
        self.rgb_chunk = bytes;
        self
    }

    /// Make `start` fail before delivering anything.
    #[must_use]
    pub const fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make `stop` return an error while still counting the request.
    #[must_use]
    pub const fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Misbehave by repeating the first strip after the frame is
    /// complete.
    #[must_use]
    pub const fn with_extra_slice(mut self) -> Self {
        self.deliver_extra = true;
        self
    }

    /// Number of stop requests received so far.
    #[must_use]
    pub const fn stop_requests(&self) -> u32 {
        self.stop_requests
    }

    /// Render the full planar frame for the given geometry.
    ///
    /// `width` is the aligned row length in bytes of the Y plane.
    #[must_use]
    pub fn planar_frame(&self, geometry: &YuvGeometry, width: usize) -> Vec<u8> {
        let mut frame = vec![0u8; geometry.total_length()];
        match self.pattern {
            TestPattern::ColorBars => fill_color_bars(&mut frame, geometry, width),
            TestPattern::GradientY => fill_gradient(&mut frame, geometry, width),
            TestPattern::Solid(y, u, v) => {
                frame[geometry.offset_y..geometry.offset_y + geometry.length_y].fill(y);
                frame[geometry.offset_u..geometry.offset_u + geometry.length_u].fill(u);
                frame[geometry.offset_v..geometry.offset_v + geometry.length_v].fill(v);
            }
        }
        frame
    }

    /// Render the interleaved RGB frame for the given dimensions.
    ///
    /// The pattern palette is converted with the same BT.601 formula a
    /// camera ISP applies, so RGB and YUV captures of one pattern show
    /// the same image.
    #[must_use]
    pub fn rgb_frame(&self, width: u32, height: u32) -> Vec<u8> {
        let (w, h) = (width as usize, height as usize);
        let mut data = Vec::with_capacity(w * h * 3);
        for _row in 0..h {
            for x in 0..w {
                let (y, u, v) = self.yuv_at(x, w);
                let (r, g, b) = yuv_to_rgb(y, u, v);
                data.extend_from_slice(&[r, g, b]);
            }
        }
        data
    }

    /// Pattern colour at column `x` of a `width`-pixel row.
    fn yuv_at(&self, x: usize, width: usize) -> (u8, u8, u8) {
        match self.pattern {
            TestPattern::ColorBars => {
                let bar_width = (width / 8).max(1);
                COLOR_BARS[(x / bar_width).min(7)]
            }
            TestPattern::GradientY => {
                #[allow(clippy::cast_possible_truncation)]
                let y = ((x * 255) / width.max(1)) as u8;
                (y, 128, 128)
            }
            TestPattern::Solid(y, u, v) => (y, u, v),
        }
    }
}

impl StillDriver for MockDriver {
    fn start(&mut self, settings: &CaptureSettings, sink: &mut dyn DeliverySink) -> Result<()> {
        if self.fail_start {
            return Err(CaptureError::DriverStartFailed(
                "mock start failure".to_owned(),
            ));
        }

        match settings.format {
            CaptureFormat::RawRgb => {
                let frame = self.rgb_frame(settings.width, settings.height);
                let chunk = if self.rgb_chunk == 0 {
                    frame.len().max(1)
                } else {
                    self.rgb_chunk
                };
                for part in frame.chunks(chunk) {
                    sink.deliver(part)?;
                }
            }
            CaptureFormat::PlanarYuv420 => {
                let width = settings.width.next_multiple_of(32) as usize;
                let geometry = self.yuv_planes(settings.width, settings.height);
                let frame = self.planar_frame(&geometry, width);
                let slice_rows = settings.slice_height.next_multiple_of(16).max(16) as usize;

                deliver_packed(&frame, &geometry, width, slice_rows, sink)?;

                if self.deliver_extra {
                    let height = geometry.length_y / width.max(1);
                    let strip =
                        packed_strip(&frame, &geometry, width, 0, slice_rows.min(height));
                    sink.deliver(&strip)?;
                }
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_requests += 1;
        if self.fail_stop {
            return Err(CaptureError::DriverStopFailed("mock stop failure".to_owned()));
        }
        Ok(())
    }
}

/// Deliver a planar frame as packed strips of `slice_rows` rows each.
fn deliver_packed(
    frame: &[u8],
    geometry: &YuvGeometry,
    width: usize,
    slice_rows: usize,
    sink: &mut dyn DeliverySink,
) -> Result<()> {
    let height = if width == 0 {
        0
    } else {
        geometry.length_y / width
    };
    let mut row = 0;
    while row < height {
        let rows = slice_rows.min(height - row);
        let strip = packed_strip(frame, geometry, width, row, rows);
        sink.deliver(&strip)?;
        row += rows;
    }
    Ok(())
}

/// Pack `rows` rows starting at `row` into one Y+U+V strip.
fn packed_strip(
    frame: &[u8],
    geometry: &YuvGeometry,
    width: usize,
    row: usize,
    rows: usize,
) -> Vec<u8> {
    let chroma_width = width / 2;
    let chroma_row = row / 2;
    let chroma_rows = rows / 2;

    let mut strip = Vec::with_capacity(rows * width + 2 * chroma_rows * chroma_width);
    strip.extend_from_slice(&frame[row * width..(row + rows) * width]);
    strip.extend_from_slice(
        &frame[geometry.offset_u + chroma_row * chroma_width
            ..geometry.offset_u + (chroma_row + chroma_rows) * chroma_width],
    );
    strip.extend_from_slice(
        &frame[geometry.offset_v + chroma_row * chroma_width
            ..geometry.offset_v + (chroma_row + chroma_rows) * chroma_width],
    );
    strip
}

/// Fill the colour bar pattern into a planar frame.
fn fill_color_bars(frame: &mut [u8], geometry: &YuvGeometry, width: usize) {
    let height = if width == 0 {
        0
    } else {
        geometry.length_y / width
    };
    let bar_width = (width / 8).max(1);

    for row in 0..height {
        for x in 0..width {
            let (y, _, _) = COLOR_BARS[(x / bar_width).min(7)];
            frame[geometry.offset_y + row * width + x] = y;
        }
    }

    let chroma_width = width / 2;
    let chroma_height = height / 2;
    for row in 0..chroma_height {
        for x in 0..chroma_width {
            let (_, u, v) = COLOR_BARS[((x * 2) / bar_width).min(7)];
            frame[geometry.offset_u + row * chroma_width + x] = u;
            frame[geometry.offset_v + row * chroma_width + x] = v;
        }
    }
}

/// Fill a horizontal luma ramp with neutral chroma.
fn fill_gradient(frame: &mut [u8], geometry: &YuvGeometry, width: usize) {
    let height = if width == 0 {
        0
    } else {
        geometry.length_y / width
    };
    for row in 0..height {
        for x in 0..width {
            #[allow(clippy::cast_possible_truncation)]
            let y = ((x * 255) / width.max(1)) as u8;
            frame[geometry.offset_y + row * width + x] = y;
        }
    }
    frame[geometry.offset_u..geometry.offset_u + geometry.length_u].fill(128);
    frame[geometry.offset_v..geometry.offset_v + geometry.length_v].fill(128);
}

/// Convert YUV values to RGB with the ITU-R BT.601 formula, clamped to
/// the 0-255 range.
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    let clamp = |val: f32| -> u8 {
        if val < 0.0 {
            0
        } else if val > 255.0 {
            255
        } else {
            #[allow(clippy::cast_possible_truncation)]
            #[allow(clippy::cast_sign_loss)]
            {
                val as u8
            }
        }
    };

    (clamp(r), clamp(g), clamp(b))
}

/// Write sink that fails after a configured number of successful
/// writes. Lets tests exercise the storage failure paths.
pub struct FailingWriter {
    successes_left: usize,
    attempts: usize,
}

impl FailingWriter {
    /// Fail every write after `successes` have gone through.
    #[must_use]
    pub const fn new(successes: usize) -> Self {
        Self {
            successes_left: successes,
            attempts: 0,
        }
    }

    /// Number of write calls received, including the failed ones.
    #[must_use]
    pub const fn write_attempts(&self) -> usize {
        self.attempts
    }
}

impl std::io::Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.attempts += 1;
        if self.successes_left == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            ));
        }
        self.successes_left -= 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingSink {
        buffers: Vec<Vec<u8>>,
    }

    impl CollectingSink {
        const fn new() -> Self {
            Self { buffers: Vec::new() }
        }
    }

    impl DeliverySink for CollectingSink {
        fn deliver(&mut self, buffer: &[u8]) -> Result<()> {
            self.buffers.push(buffer.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_solid_planar_frame() {
        let driver = MockDriver::new().with_pattern(TestPattern::Solid(50, 100, 150));
        let geometry = YuvGeometry::planar(64, 32);
        let frame = driver.planar_frame(&geometry, 64);

        assert_eq!(frame.len(), 3072);
        assert!(frame[..2048].iter().all(|&b| b == 50));
        assert!(frame[2048..2560].iter().all(|&b| b == 100));
        assert!(frame[2560..].iter().all(|&b| b == 150));
    }

    #[test]
    fn test_color_bars_planar_frame() {
        let driver = MockDriver::new().with_pattern(TestPattern::ColorBars);
        let geometry = YuvGeometry::planar(64, 32);
        let frame = driver.planar_frame(&geometry, 64);

        // First bar is white, last bar is black.
        assert_eq!(frame[0], 235);
        assert_eq!(frame[63], 16);
        // First chroma samples come from the white bar.
        assert_eq!(frame[geometry.offset_u], 128);
        assert_eq!(frame[geometry.offset_v], 128);
    }

    #[test]
    fn test_gradient_planar_frame() {
        let driver = MockDriver::new().with_pattern(TestPattern::GradientY);
        let geometry = YuvGeometry::planar(64, 32);
        let frame = driver.planar_frame(&geometry, 64);

        assert!(frame[0] < 10);
        assert!(frame[63] > 200);
        assert!(frame[geometry.offset_u..].iter().all(|&b| b == 128));
    }

    #[test]
    fn test_packed_delivery_covers_frame_exactly() {
        let mut driver = MockDriver::new();
        let mut sink = CollectingSink::new();
        let settings = CaptureSettings::new(CaptureFormat::PlanarYuv420, 64, 32)
            .with_slice_height(16);

        driver.start(&settings, &mut sink).expect("start");

        assert_eq!(sink.buffers.len(), 2);
        assert!(sink.buffers.iter().all(|b| b.len() == 1536));
    }

    #[test]
    fn test_packed_strip_layout() {
        let driver = MockDriver::new().with_pattern(TestPattern::Solid(10, 20, 30));
        let geometry = YuvGeometry::planar(64, 32);
        let frame = driver.planar_frame(&geometry, 64);

        let strip = packed_strip(&frame, &geometry, 64, 16, 16);
        assert_eq!(strip.len(), 1536);
        assert!(strip[..1024].iter().all(|&b| b == 10));
        assert!(strip[1024..1280].iter().all(|&b| b == 20));
        assert!(strip[1280..].iter().all(|&b| b == 30));
    }

    #[test]
    fn test_rgb_frame_dimensions() {
        let driver = MockDriver::new().with_pattern(TestPattern::GradientY);
        let frame = driver.rgb_frame(64, 32);

        assert_eq!(frame.len(), 64 * 32 * 3);
        // Grayscale ramp: left edge dark, right edge bright.
        assert!(frame[0] < 10);
        assert!(frame[63 * 3] > 200);
    }

    #[test]
    fn test_stop_requests_are_counted() {
        let mut driver = MockDriver::new();
        assert_eq!(driver.stop_requests(), 0);

        driver.stop().expect("stop");
        driver.stop().expect("stop again");
        assert_eq!(driver.stop_requests(), 2);
    }

    #[test]
    fn test_failing_stop_still_counts() {
        let mut driver = MockDriver::new().failing_stop();
        let err = driver.stop().expect_err("injected stop failure");
        assert!(matches!(err, CaptureError::DriverStopFailed(_)));
        assert_eq!(driver.stop_requests(), 1);
    }

    #[test]
    fn test_failing_writer_counts_attempts() {
        use std::io::Write;

        let mut writer = FailingWriter::new(1);
        writer.write_all(&[0u8; 8]).expect("first write");
        writer.write_all(&[0u8; 8]).expect_err("second write");
        assert_eq!(writer.write_attempts(), 2);
    }
}

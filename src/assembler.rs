//! Slice-to-frame reassembly for packed-planar YUV 4:2:0 captures.
//!
//! Raw planar captures arrive as packed slices: each delivered buffer
//! holds a horizontal strip of the frame as a small Y chunk followed by
//! the matching U and V chunks. A planar file needs each plane stored as
//! one contiguous run, so storing the buffers as they come would produce
//! an unusable interleaving:
//!
//! ```text
//! delivered:  (y+u+v) (y+u+v) (y+u+v) ...
//! stored:     (y+y+y+...) (u+u+u+...) (v+v+v+...)
//! ```
//!
//! The assembler owns one frame-sized buffer and a write cursor per
//! plane, and copies every slice's three chunks to the cursors as the
//! slices arrive.

use crate::traits::{CaptureError, DeliverySink, Plane, Result, YuvGeometry};

/// Cause of a rejected delivery, kept so later deliveries can be
/// refused with the same error.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    Overflow {
        plane: Plane,
        requested: usize,
        remaining: usize,
    },
    Truncated {
        expected: usize,
        actual: usize,
    },
}

impl Rejection {
    const fn to_error(self) -> CaptureError {
        match self {
            Self::Overflow {
                plane,
                requested,
                remaining,
            } => CaptureError::GeometryOverflow {
                plane,
                requested,
                remaining,
            },
            Self::Truncated { expected, actual } => {
                CaptureError::TruncatedSlice { expected, actual }
            }
        }
    }
}

/// Reassembles packed-planar slices into one contiguous planar frame.
///
/// Owns a zero-initialised buffer of the frame's total length and three
/// monotonically advancing plane cursors. Slices must arrive in driver
/// order, top of the frame first; ordering is not verified beyond the
/// per-plane bounds checks.
pub struct FrameAssembler {
    buffer: Vec<u8>,
    frame: YuvGeometry,
    slice: YuvGeometry,
    cursor_y: usize,
    cursor_u: usize,
    cursor_v: usize,
    rejection: Option<Rejection>,
}

impl FrameAssembler {
    /// Create an assembler for a frame with the given plane layouts.
    ///
    /// `frame` describes the full frame, `slice` one full-height slice;
    /// both come from the driver's geometry function.
    #[must_use]
    pub fn new(frame: YuvGeometry, slice: YuvGeometry) -> Self {
        Self {
            buffer: vec![0u8; frame.total_length()],
            frame,
            slice,
            cursor_y: frame.offset_y,
            cursor_u: frame.offset_u,
            cursor_v: frame.offset_v,
            rejection: None,
        }
    }

    fn remaining(&self, plane: Plane) -> usize {
        match plane {
            Plane::Y => self.frame.offset_y + self.frame.length_y - self.cursor_y,
            Plane::U => self.frame.offset_u + self.frame.length_u - self.cursor_u,
            Plane::V => self.frame.offset_v + self.frame.length_v - self.cursor_v,
        }
    }

    /// Layout of the next expected slice.
    ///
    /// Equal to the configured slice layout for every strip except the
    /// last one of a frame whose height is not a multiple of the slice
    /// height; there each chunk shrinks to the plane's remaining
    /// capacity, with the three chunks still packed back to back.
    #[must_use]
    pub fn expected_slice(&self) -> YuvGeometry {
        let length_y = self.slice.length_y.min(self.remaining(Plane::Y));
        let length_u = self.slice.length_u.min(self.remaining(Plane::U));
        let length_v = self.slice.length_v.min(self.remaining(Plane::V));
        YuvGeometry {
            offset_y: 0,
            length_y,
            offset_u: length_y,
            length_u,
            offset_v: length_y + length_u,
            length_v,
        }
    }

    /// Copy one slice into the frame buffer using an explicit layout.
    ///
    /// All three chunks are validated against the slice buffer and the
    /// remaining plane capacities before any byte is copied; a failed
    /// validation poisons the assembler and every later call fails with
    /// the same error without copying.
    pub fn copy_slice(&mut self, buffer: &[u8], layout: &YuvGeometry) -> Result<()> {
        if let Some(rejection) = self.rejection {
            return Err(rejection.to_error());
        }

        let chunks = [
            (Plane::Y, layout.offset_y, layout.length_y),
            (Plane::U, layout.offset_u, layout.length_u),
            (Plane::V, layout.offset_v, layout.length_v),
        ];

        for (plane, offset, length) in chunks {
            let remaining = self.remaining(plane);
            if length > remaining {
                return Err(self.reject(Rejection::Overflow {
                    plane,
                    requested: length,
                    remaining,
                }));
            }
            let end = offset + length;
            if end > buffer.len() {
                return Err(self.reject(Rejection::Truncated {
                    expected: end,
                    actual: buffer.len(),
                }));
            }
        }

        self.buffer[self.cursor_y..self.cursor_y + layout.length_y]
            .copy_from_slice(&buffer[layout.offset_y..layout.offset_y + layout.length_y]);
        self.cursor_y += layout.length_y;

        self.buffer[self.cursor_u..self.cursor_u + layout.length_u]
            .copy_from_slice(&buffer[layout.offset_u..layout.offset_u + layout.length_u]);
        self.cursor_u += layout.length_u;

        self.buffer[self.cursor_v..self.cursor_v + layout.length_v]
            .copy_from_slice(&buffer[layout.offset_v..layout.offset_v + layout.length_v]);
        self.cursor_v += layout.length_v;

        Ok(())
    }

    fn reject(&mut self, rejection: Rejection) -> CaptureError {
        self.rejection = Some(rejection);
        rejection.to_error()
    }

    /// Current write cursors for the Y, U and V planes.
    #[must_use]
    pub const fn plane_cursors(&self) -> (usize, usize, usize) {
        (self.cursor_y, self.cursor_u, self.cursor_v)
    }

    /// Whether every plane has been fully delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining(Plane::Y) == 0
            && self.remaining(Plane::U) == 0
            && self.remaining(Plane::V) == 0
    }

    /// Consume the assembler and return the assembled frame bytes.
    ///
    /// Fails with `IncompleteFrame` when any plane is short of its
    /// expected length.
    pub fn finish(self) -> Result<Vec<u8>> {
        let planes = [
            (Plane::Y, self.cursor_y, self.frame.offset_y, self.frame.length_y),
            (Plane::U, self.cursor_u, self.frame.offset_u, self.frame.length_u),
            (Plane::V, self.cursor_v, self.frame.offset_v, self.frame.length_v),
        ];
        for (plane, cursor, offset, length) in planes {
            if cursor != offset + length {
                return Err(CaptureError::IncompleteFrame {
                    plane,
                    written: cursor - offset,
                    expected: length,
                });
            }
        }
        Ok(self.buffer)
    }
}

impl DeliverySink for FrameAssembler {
    fn deliver(&mut self, buffer: &[u8]) -> Result<()> {
        if let Some(rejection) = self.rejection {
            return Err(rejection.to_error());
        }

        let layout = self.expected_slice();
        if layout.total_length() == 0 {
            // Every plane is already complete; the driver kept going.
            return Err(self.reject(Rejection::Overflow {
                plane: Plane::Y,
                requested: buffer.len(),
                remaining: 0,
            }));
        }
        self.copy_slice(buffer, &layout)
    }
}

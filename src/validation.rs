//! Stored-still validation utilities for test assertions.
//!
//! These functions check that a persisted raw still actually holds what
//! the capture pipeline was asked to store: the planar layout of a YUV
//! file and the content of known test patterns. Used by the mock-driver
//! and virtual-camera integration tests.

use anyhow::{bail, Result};

use crate::traits::YuvGeometry;

/// Check that a stored planar still has exactly the geometry's length.
pub fn validate_planar_length(data: &[u8], geometry: &YuvGeometry) -> Result<()> {
    if data.len() != geometry.total_length() {
        bail!(
            "planar still is {} bytes, geometry expects {}",
            data.len(),
            geometry.total_length()
        );
    }
    Ok(())
}

/// Check every byte of each plane of a solid-colour still.
///
/// Catches both wrong values and plane boundaries in the wrong place:
/// a misplaced boundary puts chroma bytes into the luma run.
pub fn validate_solid_planes(
    data: &[u8],
    geometry: &YuvGeometry,
    (y, u, v): (u8, u8, u8),
) -> Result<()> {
    validate_planar_length(data, geometry)?;

    let planes = [
        ("Y", geometry.offset_y, geometry.length_y, y),
        ("U", geometry.offset_u, geometry.length_u, u),
        ("V", geometry.offset_v, geometry.length_v, v),
    ];
    for (name, offset, length, expected) in planes {
        let plane = &data[offset..offset + length];
        if let Some(pos) = plane.iter().position(|&b| b != expected) {
            bail!(
                "plane {name} byte {pos}: expected {expected}, got {}",
                plane[pos]
            );
        }
    }
    Ok(())
}

/// Check that the Y plane brightens monotonically from left to right.
///
/// Samples the centre row every 10 pixels, allowing single-step
/// rounding dips, and requires a significant overall rise so a solid
/// frame does not pass.
pub fn validate_luma_gradient(data: &[u8], geometry: &YuvGeometry, width: usize) -> Result<()> {
    validate_planar_length(data, geometry)?;
    if width == 0 || geometry.length_y % width != 0 {
        bail!("width {width} does not divide the Y plane evenly");
    }

    let height = geometry.length_y / width;
    let row_start = geometry.offset_y + (height / 2) * width;
    let row = &data[row_start..row_start + width];

    let mut first: Option<u8> = None;
    let mut prev: Option<u8> = None;
    let mut last: Option<u8> = None;

    for x in (0..width).step_by(10) {
        let luma = row[x];
        if first.is_none() {
            first = Some(luma);
        }
        if let Some(prev) = prev {
            if i32::from(luma) < i32::from(prev) - 1 {
                bail!("gradient not monotonic at x={x}: luma {luma} < previous {prev}");
            }
        }
        prev = Some(luma);
        last = Some(luma);
    }

    if let (Some(first), Some(last)) = (first, last) {
        let rise = i32::from(last) - i32::from(first);
        if rise < 50 {
            bail!("insufficient luma rise for a gradient: {rise} (expected at least 50)");
        }
    }
    Ok(())
}

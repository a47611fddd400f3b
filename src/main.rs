//! Still-capture binary: grabs raw RGB and YUV stills from /dev/video0.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pi_still_capture::device::V4l2StillDriver;
use pi_still_capture::{CaptureFormat, CaptureSession, CaptureSettings};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        let chain = format!("{err:#}");
        tracing::error!(error = %chain, "capture failed");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let driver = V4l2StillDriver::open(0).context("open /dev/video0")?;
    let caps = driver.capabilities();
    info!(
        card = %caps.card,
        driver = %caps.driver,
        bus = %caps.bus_info,
        "opened capture device"
    );

    let mut session = CaptureSession::new(driver);

    let rgb = CaptureSettings::new(CaptureFormat::RawRgb, 640, 480)
        .with_shutter_speed(Duration::from_millis(125));
    session
        .capture(&rgb, Path::new("still.rgb"))
        .context("raw RGB capture")?;
    info!("wrote still.rgb (640x480, interleaved RGB)");

    let yuv = CaptureSettings::new(CaptureFormat::PlanarYuv420, 640, 480);
    session
        .capture(&yuv, Path::new("still.yuv"))
        .context("planar YUV capture")?;
    info!("wrote still.yuv (640x480, planar YUV 4:2:0)");

    Ok(())
}

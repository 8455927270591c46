//! V4L2 capture devices.
//!
//! `V4l2Opener` opens a local device node, requests RGB24 at the configured
//! size and frame rate, and maps a capture stream. The request is repeated on
//! every open, so a camera that was unplugged and replugged comes back with
//! the same settings.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::camera::{CameraConfig, CaptureDevice, DeviceOpener};
use crate::frame::Frame;

/// Opens V4L2 devices for `CameraSource`.
pub struct V4l2Opener;

impl DeviceOpener for V4l2Opener {
    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(V4l2Device::open(config)?))
    }
}

#[self_referencing]
struct V4l2Stream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

struct V4l2Device {
    stream: V4l2Stream,
    width: u32,
    height: u32,
    /// Bytes per row as negotiated with the driver, padding included.
    stride: usize,
    fps: Option<f64>,
}

impl V4l2Device {
    fn open(config: &CameraConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open v4l2 device {}", config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Opener: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        if format.fourcc != v4l::FourCC::new(b"RGB3") {
            return Err(anyhow!(
                "{} does not deliver RGB24 frames (got {})",
                config.device,
                format.fourcc
            ));
        }

        let mut fps = None;
        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            match device.set_params(&params) {
                Ok(applied) => {
                    let interval = applied.interval;
                    if interval.numerator > 0 {
                        fps = Some(f64::from(interval.denominator) / f64::from(interval.numerator));
                    }
                }
                Err(err) => {
                    log::warn!("V4l2Opener: failed to set fps on {}: {}", config.device, err);
                }
            }
        }

        let stream = V4l2StreamBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        let row_bytes = format.width as usize * 3;
        let stride = (format.stride as usize).max(row_bytes);
        Ok(Self {
            stream,
            width: format.width,
            height: format.height,
            stride,
            fps,
        })
    }
}

impl CaptureDevice for V4l2Device {
    fn read(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (width, height, stride) = (self.width, self.height, self.stride);
        self.stream
            .with_mut(|fields| {
                let (buf, _meta) = fields.stream.next().context("capture v4l2 frame")?;
                Frame::from_strided(buf, width, height, stride)
            })
            .context("unpack v4l2 frame")
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fps(&self) -> Option<f64> {
        self.fps
    }
}

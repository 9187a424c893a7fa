// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::Duration;

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameId, Rotation},
  input::{FrameSource, InputError, LensFacing, interval_from_fps},
};

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Invalid query parameter {0}={1}")]
  InvalidParameter(String, String),
}

struct Opened {
  device: Device,
  width: u32,
  height: u32,
  fourcc: FourCC,
}

fn open(path: &str) -> Result<Opened, V4lInputError> {
  let device = Device::with_path(path)?;
  let format = device.format()?;
  info!(
    "打开摄像头 {}: {}x{} {}",
    path, format.width, format.height, format.fourcc
  );
  Ok(Opened {
    device,
    width: format.width,
    height: format.height,
    fourcc: format.fourcc,
  })
}

/// `v4l:///dev/video0?front=/dev/video1&fps=15`
pub struct V4lInput {
  back_path: String,
  front_path: Option<String>,
  opened: Opened,
  lens: LensFacing,
  interval: Duration,
  next_id: FrameId,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let back_path = if url.path().is_empty() {
      "/dev/video0".to_string()
    } else {
      url.path().to_string()
    };

    let mut front_path = None;
    let mut fps = 15.0;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "front" => front_path = Some(v.into_owned()),
        "fps" => {
          fps = v
            .parse()
            .map_err(|_| V4lInputError::InvalidParameter(k.to_string(), v.to_string()))?
        }
        other => warn!("忽略未知参数: {}", other),
      }
    }

    Ok(V4lInput {
      opened: open(&back_path)?,
      back_path,
      front_path,
      lens: LensFacing::Back,
      interval: interval_from_fps(fps),
      next_id: 0,
    })
  }
}

impl V4lInput {
  fn capture_frame(&mut self) -> Result<Option<RgbImage>, V4lInputError> {
    let Opened {
      device,
      width,
      height,
      fourcc,
    } = &self.opened;
    let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, 4)?;
    let (buf, _meta) = stream.next()?;

    let image = if *fourcc == FourCC::new(b"MJPG") {
      image::load_from_memory_with_format(buf, ImageFormat::Jpeg)
        .map(|image| image.to_rgb8())
        .map_err(|e| warn!("MJPG 解码失败: {}", e))
        .ok()
    } else if *fourcc == FourCC::new(b"RGB3") {
      let size = (*width as usize) * (*height as usize) * 3;
      buf
        .get(..size)
        .and_then(|data| RgbImage::from_raw(*width, *height, data.to_vec()))
    } else if *fourcc == FourCC::new(b"YUYV") {
      yuyv_to_rgb(buf, *width, *height)
    } else {
      warn!("不支持的像素格式: {}", fourcc);
      None
    };
    Ok(image)
  }
}

fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Option<RgbImage> {
  let pixels = (width as usize) * (height as usize);
  let data = data.get(..pixels * 2)?;
  let mut rgb = Vec::with_capacity(pixels * 3);
  for chunk in data.chunks_exact(4) {
    let (y0, u, y1, v) = (chunk[0] as f32, chunk[1] as f32 - 128.0, chunk[2] as f32, chunk[3] as f32 - 128.0);
    for y in [y0, y1] {
      rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
      rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
      rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
    }
  }
  RgbImage::from_raw(width, height, rgb)
}

impl Iterator for V4lInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.next_id += 1;
    match self.capture_frame() {
      Ok(Some(image)) => Some(Frame::new(self.next_id, image, Rotation::Deg0)),
      Ok(None) => Some(Frame::empty(self.next_id, Rotation::Deg0)),
      Err(e) => {
        error!("Failed to capture frame: {}", e);
        None
      }
    }
  }
}

impl FrameSource for V4lInput {
  fn switch_lens(&mut self, lens: LensFacing) -> Result<(), InputError> {
    if lens == self.lens {
      return Ok(());
    }
    let path = match lens {
      LensFacing::Back => self.back_path.clone(),
      LensFacing::Front => self
        .front_path
        .clone()
        .ok_or(InputError::LensUnsupported(lens))?,
    };
    self.opened = open(&path).map_err(InputError::from)?;
    self.lens = lens;
    Ok(())
  }

  fn frame_interval(&self) -> Duration {
    self.interval
  }
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/input/image_file.rs - 图像文件输入
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

use std::path::Path;
use std::time::Duration;

use image::{ImageReader, RgbImage, imageops};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameId, Rotation},
  input::{FrameSource, InputError, LensFacing, interval_from_fps},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid query parameter {0}={1}")]
  InvalidParameter(String, String),
}

/// 读取并解码一张静态图片（相册导入或刚拍下的照片）
pub fn read_still(path: impl AsRef<Path>) -> Result<RgbImage, ImageFileInputError> {
  let path = path.as_ref();
  info!("读取图片: {}", path.display());
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(image.to_rgb8())
}

/// 把一张图片当作摄像头，按固定帧率重复输出
///
/// `image:///path/to/dog.jpg?fps=2&count=10`
pub struct ImageFileInput {
  image: RgbImage,
  interval: Duration,
  remaining: Option<usize>,
  lens: LensFacing,
  next_id: FrameId,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let mut fps = 2.0;
    let mut remaining = None;
    for (k, v) in url.query_pairs() {
      let invalid = || ImageFileInputError::InvalidParameter(k.to_string(), v.to_string());
      match k.as_ref() {
        "fps" => fps = v.parse().map_err(|_| invalid())?,
        "count" => remaining = Some(v.parse().map_err(|_| invalid())?),
        _ => {}
      }
    }

    Ok(ImageFileInput {
      image: read_still(url.path())?,
      interval: interval_from_fps(fps),
      remaining,
      lens: LensFacing::Back,
      next_id: 0,
    })
  }
}

impl ImageFileInput {
  pub fn new(image: RgbImage, fps: f64) -> Self {
    Self {
      image,
      interval: interval_from_fps(fps),
      remaining: None,
      lens: LensFacing::Back,
      next_id: 0,
    }
  }

  pub fn with_count(mut self, count: usize) -> Self {
    self.remaining = Some(count);
    self
  }
}

impl Iterator for ImageFileInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if let Some(remaining) = self.remaining.as_mut() {
      if *remaining == 0 {
        return None;
      }
      *remaining -= 1;
    }

    let image = match self.lens {
      LensFacing::Back => self.image.clone(),
      LensFacing::Front => imageops::flip_horizontal(&self.image),
    };
    self.next_id += 1;
    Some(Frame::new(self.next_id, image, Rotation::Deg0))
  }
}

impl FrameSource for ImageFileInput {
  fn switch_lens(&mut self, lens: LensFacing) -> Result<(), InputError> {
    self.lens = lens;
    Ok(())
  }

  fn frame_interval(&self) -> Duration {
    self.interval
  }
}

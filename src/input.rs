// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/input.rs - 相机帧输入
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

use serde::Serialize;
use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

mod image_file;
mod image_folder;
#[cfg(feature = "v4l_input")]
mod v4l_input;

pub use self::image_file::{ImageFileInput, ImageFileInputError, read_still};
pub use self::image_folder::{ImageFolderInput, ImageFolderInputError};
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError};

/// 摄像头朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LensFacing {
  #[default]
  Back,
  Front,
}

impl LensFacing {
  pub fn toggled(self) -> Self {
    match self {
      LensFacing::Back => LensFacing::Front,
      LensFacing::Front => LensFacing::Back,
    }
  }
}

/// 按传感器节奏产生帧的输入源
pub trait FrameSource: Iterator<Item = Frame> + Send {
  fn switch_lens(&mut self, lens: LensFacing) -> Result<(), InputError>;

  /// 相邻两帧之间的间隔
  fn frame_interval(&self) -> Duration;
}

pub(crate) fn interval_from_fps(fps: f64) -> Duration {
  if fps > 0.0 {
    Duration::from_secs_f64(1.0 / fps)
  } else {
    Duration::ZERO
  }
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Image folder input error: {0}")]
  ImageFolderInputError(#[from] ImageFolderInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L input error: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[error("该输入源不支持切换到 {0:?} 摄像头")]
  LensUnsupported(LensFacing),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  ImageFile(ImageFileInput),
  ImageFolder(ImageFolderInput),
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?)),
      ImageFolderInput::SCHEME => Ok(InputWrapper::ImageFolder(ImageFolderInput::from_url(url)?)),
      #[cfg(feature = "v4l_input")]
      V4lInput::SCHEME => Ok(InputWrapper::V4l(V4lInput::from_url(url)?)),
      _ => Err(InputError::SchemeMismatch),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ImageFile(input) => input.next(),
      InputWrapper::ImageFolder(input) => input.next(),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.next(),
    }
  }
}

impl FrameSource for InputWrapper {
  fn switch_lens(&mut self, lens: LensFacing) -> Result<(), InputError> {
    match self {
      InputWrapper::ImageFile(input) => input.switch_lens(lens),
      InputWrapper::ImageFolder(input) => input.switch_lens(lens),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.switch_lens(lens),
    }
  }

  fn frame_interval(&self) -> Duration {
    match self {
      InputWrapper::ImageFile(input) => input.frame_interval(),
      InputWrapper::ImageFolder(input) => input.frame_interval(),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.frame_interval(),
    }
  }
}

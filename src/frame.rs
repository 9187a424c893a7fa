// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/frame.rs - 相机帧定义
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

use image::{RgbImage, imageops};
use thiserror::Error;

pub type FrameId = u64;

type ReleaseHook = Box<dyn FnOnce(FrameId) + Send>;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("不支持的旋转角度: {0}")]
  InvalidRotation(u32),
}

/// 帧相对于传感器的旋转角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  pub fn degrees(self) -> u32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }
}

impl TryFrom<u32> for Rotation {
  type Error = FrameError;

  fn try_from(degrees: u32) -> Result<Self, Self::Error> {
    match degrees % 360 {
      0 => Ok(Rotation::Deg0),
      90 => Ok(Rotation::Deg90),
      180 => Ok(Rotation::Deg180),
      270 => Ok(Rotation::Deg270),
      _ => Err(FrameError::InvalidRotation(degrees)),
    }
  }
}

/// 相机送来的一帧图像
///
/// 帧的所有权交给准入组件后，无论结果如何都只会被释放一次：
/// 释放钩子在 `Drop` 中调用。
pub struct Frame {
  id: FrameId,
  rotation: Rotation,
  timestamp_ms: u64,
  image: Option<RgbImage>,
  on_release: Option<ReleaseHook>,
}

impl Frame {
  pub fn new(id: FrameId, image: RgbImage, rotation: Rotation) -> Self {
    Self {
      id,
      rotation,
      timestamp_ms: now_ms(),
      image: Some(image),
      on_release: None,
    }
  }

  /// 没有可用图像数据的帧（例如解码失败）
  pub fn empty(id: FrameId, rotation: Rotation) -> Self {
    Self {
      id,
      rotation,
      timestamp_ms: now_ms(),
      image: None,
      on_release: None,
    }
  }

  pub fn with_release_hook(mut self, hook: impl FnOnce(FrameId) + Send + 'static) -> Self {
    self.on_release = Some(Box::new(hook));
    self
  }

  pub fn id(&self) -> FrameId {
    self.id
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  pub fn timestamp_ms(&self) -> u64 {
    self.timestamp_ms
  }

  /// 取出图像数据；空图像视为不可用
  pub fn payload(&self) -> Option<Payload<'_>> {
    self
      .image
      .as_ref()
      .filter(|image| image.width() > 0 && image.height() > 0)
      .map(|image| Payload {
        image,
        rotation: self.rotation,
      })
  }

  /// 显式释放帧
  pub fn close(self) {}
}

impl Drop for Frame {
  fn drop(&mut self) {
    if let Some(hook) = self.on_release.take() {
      hook(self.id);
    }
  }
}

impl std::fmt::Debug for Frame {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Frame")
      .field("id", &self.id)
      .field("rotation", &self.rotation)
      .field("timestamp_ms", &self.timestamp_ms)
      .field("has_payload", &self.payload().is_some())
      .finish()
  }
}

/// 借用自帧的图像数据
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
  pub image: &'a RgbImage,
  pub rotation: Rotation,
}

impl Payload<'_> {
  /// 按旋转角度摆正后的图像副本
  pub fn upright(&self) -> RgbImage {
    match self.rotation {
      Rotation::Deg0 => self.image.clone(),
      Rotation::Deg90 => imageops::rotate90(self.image),
      Rotation::Deg180 => imageops::rotate180(self.image),
      Rotation::Deg270 => imageops::rotate270(self.image),
    }
  }
}

fn now_ms() -> u64 {
  chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn release_hook_runs_once_on_close() {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    let frame = Frame::new(7, RgbImage::new(2, 2), Rotation::Deg0).with_release_hook(move |id| {
      assert_eq!(id, 7);
      counter.fetch_add(1, Ordering::SeqCst);
    });
    frame.close();
    assert_eq!(released.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn zero_sized_image_has_no_payload() {
    let frame = Frame::new(1, RgbImage::new(0, 0), Rotation::Deg0);
    assert!(frame.payload().is_none());
    assert!(Frame::empty(2, Rotation::Deg90).payload().is_none());
    assert!(format!("{:?}", frame).contains("has_payload: false"));
  }

  #[test]
  fn upright_applies_rotation() {
    let frame = Frame::new(1, RgbImage::new(4, 2), Rotation::try_from(90).unwrap());
    let upright = frame.payload().unwrap().upright();
    assert_eq!(upright.dimensions(), (2, 4));
    assert!(Rotation::try_from(45).is_err());
  }
}

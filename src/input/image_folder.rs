// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/input/image_folder.rs - 图片目录回放输入
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

//! 把一个目录中的图片按文件名顺序当作摄像头帧回放。
//!
//! `folder:///home/kid/fotos?fps=5&loop&rotation=90`
//!
//! 无法解码的文件产生不带图像数据的帧，由准入组件直接释放。

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{ImageReader, imageops};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError, FrameId, Rotation},
  input::{FrameSource, InputError, LensFacing, interval_from_fps},
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFolderInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录中没有图片: {0}")]
  EmptyFolder(PathBuf),
  #[error("参数无效 {0}={1}")]
  InvalidParameter(String, String),
  #[error("帧参数错误: {0}")]
  FrameError(#[from] FrameError),
}

pub struct ImageFolderInput {
  files: Vec<PathBuf>,
  position: usize,
  looping: bool,
  rotation: Rotation,
  interval: Duration,
  lens: LensFacing,
  next_id: FrameId,
}

impl FromUrlWithScheme for ImageFolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageFolderInput {
  type Error = ImageFolderInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ImageFolderInputError::SchemeMismatch);
    }

    let mut input = Self::open(url.path())?;
    for (k, v) in url.query_pairs() {
      let invalid = || ImageFolderInputError::InvalidParameter(k.to_string(), v.to_string());
      match k.as_ref() {
        "fps" => input.interval = interval_from_fps(v.parse().map_err(|_| invalid())?),
        "loop" => input.looping = true,
        "rotation" => {
          let degrees: u32 = v.parse().map_err(|_| invalid())?;
          input.rotation = Rotation::try_from(degrees)?;
        }
        other => warn!("忽略未知参数: {}", other),
      }
    }
    Ok(input)
  }
}

impl ImageFolderInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, ImageFolderInputError> {
    let directory = directory.as_ref();
    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|path| is_image(path))
      .collect();
    files.sort();

    if files.is_empty() {
      return Err(ImageFolderInputError::EmptyFolder(directory.to_path_buf()));
    }
    info!("回放目录 {}: {} 张图片", directory.display(), files.len());

    Ok(Self {
      files,
      position: 0,
      looping: false,
      rotation: Rotation::Deg0,
      interval: interval_from_fps(5.0),
      lens: LensFacing::Back,
      next_id: 0,
    })
  }

  fn load(&mut self, path: &Path) -> Frame {
    self.next_id += 1;
    let decoded = ImageReader::open(path)
      .map_err(image::ImageError::IoError)
      .and_then(|reader| reader.decode());
    match decoded {
      Ok(image) => {
        let image = image.to_rgb8();
        let image = match self.lens {
          LensFacing::Back => image,
          LensFacing::Front => imageops::flip_horizontal(&image),
        };
        Frame::new(self.next_id, image, self.rotation)
      }
      Err(e) => {
        warn!("无法解码 {}: {}", path.display(), e);
        Frame::empty(self.next_id, self.rotation)
      }
    }
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

impl Iterator for ImageFolderInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.position >= self.files.len() {
      if !self.looping {
        return None;
      }
      self.position = 0;
    }
    let path = self.files[self.position].clone();
    self.position += 1;
    Some(self.load(&path))
  }
}

impl FrameSource for ImageFolderInput {
  fn switch_lens(&mut self, lens: LensFacing) -> Result<(), InputError> {
    self.lens = lens;
    Ok(())
  }

  fn frame_interval(&self) -> Duration {
    self.interval
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("explorador-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn replays_images_and_marks_broken_files() {
    let dir = scratch_dir("folder");
    RgbImage::new(4, 4).save(dir.join("a.png")).unwrap();
    std::fs::write(dir.join("b.jpg"), b"not a jpeg").unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let url = Url::from_directory_path(&dir).unwrap();
    let url = Url::parse(&format!("folder://{}?fps=0&rotation=90", url.path())).unwrap();
    let mut input = ImageFolderInput::from_url(&url).unwrap();

    let first = input.next().unwrap();
    assert!(first.payload().is_some());
    assert_eq!(first.rotation(), Rotation::Deg90);
    let second = input.next().unwrap();
    assert!(second.payload().is_none());
    assert!(input.next().is_none());

    std::fs::remove_dir_all(dir).ok();
  }

  #[test]
  fn empty_folder_is_rejected() {
    let dir = scratch_dir("empty");
    assert!(matches!(
      ImageFolderInput::open(&dir),
      Err(ImageFolderInputError::EmptyFolder(_))
    ));
    std::fs::remove_dir_all(dir).ok();
  }
}

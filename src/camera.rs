// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/camera.rs - 相机管线与相册
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

//! # 相机管线
//!
//! 生产者线程从 [`FrameSource`] 取帧，按输入源的帧间隔节流。
//! 绑定了分析阶段时帧交给 [`Analyzer`]，否则直接释放。
//!
//! 主线程通过控制通道切换镜头、开关分析或抓取一张照片，发送后立即返回；
//! 处理结果以 [`Event::CameraBound`] 与 [`Event::Captured`] 回送到事件通道。
//! 帧间隔期间生产者在控制通道上等待，控制请求不必等到下一帧。

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  admission::{Admission, Analyzer},
  input::{FrameSource, LensFacing},
  presenter::Event,
};

#[derive(Error, Debug)]
pub enum CameraError {
  #[error("相机线程已停止")]
  Stopped,
  #[error("无法启动相机线程: {0}")]
  SpawnError(std::io::Error),
  #[error("保存照片失败: {0}")]
  SaveError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 当前绑定的用例组合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Binding {
  pub lens: LensFacing,
  pub analysis: bool,
}

enum Control {
  Bind(Binding),
  Capture,
  Stop,
}

pub struct Camera {
  requested: Binding,
  controls: Sender<Control>,
  producer: Option<JoinHandle<()>>,
}

impl Camera {
  /// 启动生产者线程；输入源耗尽或达到 `frame_limit` 时发送 [`Event::InputEnded`]
  pub fn start<S>(
    source: S,
    analyzer: Analyzer,
    events: Sender<Event>,
    frame_limit: Option<usize>,
  ) -> Result<Self, CameraError>
  where
    S: FrameSource + 'static,
  {
    let (controls, rx) = mpsc::channel();
    let producer = std::thread::Builder::new()
      .name("camera".to_string())
      .spawn(move || {
        Producer {
          source,
          analyzer,
          events,
          binding: Binding::default(),
          captures: 0,
        }
        .run(rx, frame_limit)
      })
      .map_err(CameraError::SpawnError)?;

    Ok(Self {
      requested: Binding::default(),
      controls,
      producer: Some(producer),
    })
  }

  /// 最近一次请求的绑定
  pub fn binding(&self) -> Binding {
    self.requested
  }

  pub fn bind(&mut self, binding: Binding) -> Result<(), CameraError> {
    self
      .controls
      .send(Control::Bind(binding))
      .map_err(|_| CameraError::Stopped)?;
    self.requested = binding;
    Ok(())
  }

  /// 请求切换前后镜头，分析阶段保持原状；返回请求的镜头
  pub fn switch_lens(&mut self) -> Result<LensFacing, CameraError> {
    let binding = Binding {
      lens: self.requested.lens.toggled(),
      ..self.requested
    };
    self.bind(binding)?;
    Ok(binding.lens)
  }

  pub fn set_analysis(&mut self, analysis: bool) -> Result<(), CameraError> {
    self.bind(Binding {
      analysis,
      ..self.requested
    })
  }

  /// 相机线程回报的实际绑定；请求失败时以实际绑定为准
  pub fn on_bound(&mut self, binding: Binding, failed: bool) {
    if failed {
      self.requested = binding;
    }
  }

  /// 请求抓取下一帧的图像，结果以 [`Event::Captured`] 送达
  pub fn request_capture(&self) -> Result<(), CameraError> {
    self
      .controls
      .send(Control::Capture)
      .map_err(|_| CameraError::Stopped)
  }

  /// 停止生产者线程；分析线程随之结束，已接纳帧的结果全部送出后才返回
  pub fn stop(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    let _ = self.controls.send(Control::Stop);
    if let Some(producer) = self.producer.take() {
      if producer.join().is_err() {
        warn!("相机线程异常退出");
      }
    }
  }
}

impl Drop for Camera {
  fn drop(&mut self) {
    self.shutdown();
  }
}

struct Producer<S> {
  source: S,
  analyzer: Analyzer,
  events: Sender<Event>,
  binding: Binding,
  captures: usize,
}

impl<S: FrameSource> Producer<S> {
  fn run(mut self, controls: Receiver<Control>, frame_limit: Option<usize>) {
    info!("相机线程启动");
    let interval = self.source.frame_interval();
    let mut produced = 0usize;

    'frames: loop {
      loop {
        match controls.try_recv() {
          Ok(control) => {
            if !self.apply(control) {
              break 'frames;
            }
          }
          Err(TryRecvError::Empty) => break,
          Err(TryRecvError::Disconnected) => break 'frames,
        }
      }

      if frame_limit.is_some_and(|limit| produced >= limit) {
        info!("达到指定帧数 {}", produced);
        let _ = self.events.send(Event::InputEnded);
        break;
      }
      let Some(frame) = self.source.next() else {
        info!("输入源结束");
        let _ = self.events.send(Event::InputEnded);
        break;
      };
      produced += 1;
      let deadline = Instant::now() + interval;

      if self.captures > 0 {
        let image = frame.payload().map(|payload| payload.upright());
        for _ in 0..std::mem::take(&mut self.captures) {
          let _ = self.events.send(Event::Captured(image.clone()));
        }
      }

      if self.binding.analysis {
        match self.analyzer.submit_frame(frame) {
          Admission::Forwarded(id) => debug!("帧 {} 已送入分析", id),
          Admission::Dropped(_) | Admission::NoPayload(_) => {}
        }
      } else {
        frame.close();
      }

      // 帧间隔内继续响应控制请求
      loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
          break;
        }
        match controls.recv_timeout(remaining) {
          Ok(control) => {
            if !self.apply(control) {
              break 'frames;
            }
          }
          Err(RecvTimeoutError::Timeout) => break,
          Err(RecvTimeoutError::Disconnected) => break 'frames,
        }
      }
    }

    info!("相机线程结束");
  }

  /// 处理一条控制请求，返回 `false` 表示停止
  fn apply(&mut self, control: Control) -> bool {
    match control {
      Control::Bind(next) => {
        let error = if next.lens != self.binding.lens {
          self.source.switch_lens(next.lens).err()
        } else {
          None
        };
        match &error {
          None => {
            info!("相机绑定: {:?}", next);
            self.binding = next;
          }
          Some(e) => warn!("相机绑定 {:?} 失败: {}", next, e),
        }
        let _ = self.events.send(Event::CameraBound {
          binding: self.binding,
          error,
        });
        true
      }
      Control::Capture => {
        self.captures += 1;
        true
      }
      Control::Stop => false,
    }
  }
}

/// 照片保存目录
#[derive(Debug, Clone)]
pub struct PhotoAlbum {
  directory: PathBuf,
}

impl PhotoAlbum {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 按拍摄时间命名并保存为 JPEG，返回文件路径
  pub fn save(&self, image: &RgbImage) -> Result<PathBuf, CameraError> {
    std::fs::create_dir_all(&self.directory)?;
    let path = self.directory.join(photo_file_name(chrono::Local::now()));
    image.save_with_format(&path, image::ImageFormat::Jpeg)?;
    info!("照片已保存: {}", path.display());
    Ok(path)
  }
}

fn photo_file_name<Tz>(at: chrono::DateTime<Tz>) -> String
where
  Tz: chrono::TimeZone,
  Tz::Offset: std::fmt::Display,
{
  at.format("%Y-%m-%d-%H-%M-%S-%3f.jpg").to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn photo_names_carry_milliseconds() {
    let at = chrono::Utc
      .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
      .unwrap()
      + chrono::Duration::milliseconds(42);
    assert_eq!(photo_file_name(at), "2024-03-09-14-05-07-042.jpg");
  }

  #[test]
  fn album_saves_jpeg() {
    let dir = std::env::temp_dir().join(format!("explorador-album-{}", std::process::id()));
    let album = PhotoAlbum::new(&dir);
    let path = album.save(&RgbImage::new(8, 8)).unwrap();
    assert!(path.starts_with(&dir));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    assert!(image::open(&path).is_ok());
    std::fs::remove_dir_all(dir).ok();
  }
}

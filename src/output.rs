// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/output.rs - 结果显示
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

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::LensFacing};

mod console;
mod record;

pub use self::console::ConsoleOutput;
pub use self::record::{JsonRecordOutput, JsonRecordOutputError};

/// 界面所处的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AppState {
  #[default]
  LiveCamera,
  ImageDisplay,
}

/// 显示面的完整快照，每次变化后整体渲染
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct View {
  pub state: AppState,
  pub analysis_running: bool,
  pub lens: LensFacing,
  pub results: String,
  pub fact: Option<String>,
}

pub trait Render {
  type Error;
  fn render(&mut self, view: &View) -> Result<(), Self::Error>;
}

impl<R: Render + ?Sized> Render for Box<R> {
  type Error = R::Error;

  fn render(&mut self, view: &View) -> Result<(), Self::Error> {
    (**self).render(view)
  }
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("控制台输出错误: {0}")]
  ConsoleError(#[from] std::io::Error),
  #[error("记录输出错误: {0}")]
  JsonRecordOutputError(#[from] JsonRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Console(ConsoleOutput),
  JsonRecord(JsonRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ConsoleOutput::SCHEME => Ok(OutputWrapper::Console(ConsoleOutput::default())),
      JsonRecordOutput::SCHEME => {
        let output = JsonRecordOutput::from_url(url)?;
        Ok(OutputWrapper::JsonRecord(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render(&mut self, view: &View) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Console(output) => output.render(view).map_err(OutputError::from),
      OutputWrapper::JsonRecord(output) => output.render(view).map_err(OutputError::from),
    }
  }
}

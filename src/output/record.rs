// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/output/record.rs - JSON Lines 记录输出
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

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, View},
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  at: String,
  #[serde(flatten)]
  view: &'a View,
}

/// 每次渲染追加一行 JSON，便于回放与测试
///
/// `record:///var/log/explorador/views.jsonl`
pub struct JsonRecordOutput {
  path: PathBuf,
  writer: BufWriter<File>,
}

impl JsonRecordOutput {
  pub fn create(path: impl AsRef<Path>) -> Result<Self, JsonRecordOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("界面记录写入: {}", path.display());
    Ok(Self {
      path,
      writer: BufWriter::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }
    Self::create(url.path())
  }
}

impl Render for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render(&mut self, view: &View) -> Result<(), Self::Error> {
    let record = Record {
      at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
      view,
    };
    serde_json::to_writer(&mut self.writer, &record)?;
    self.writer.write_all(b"\n")?;
    self.writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::AppState;

  #[test]
  fn appends_one_json_line_per_render() {
    let path = std::env::temp_dir().join(format!(
      "explorador-record-{}-{}.jsonl",
      std::process::id(),
      Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let mut output = JsonRecordOutput::create(&path).unwrap();
    let mut view = View {
      results: "Elige una opción abajo".to_string(),
      ..View::default()
    };
    output.render(&view).unwrap();
    view.state = AppState::ImageDisplay;
    view.fact = Some("¿Sabías...?".to_string());
    output.render(&view).unwrap();

    let content = std::fs::read_to_string(output.path()).unwrap();
    let lines: Vec<serde_json::Value> = content
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["state"], "LiveCamera");
    assert_eq!(lines[1]["state"], "ImageDisplay");
    assert_eq!(lines[1]["fact"], "¿Sabías...?");
    assert!(lines[1]["at"].is_string());
    std::fs::remove_file(path).ok();
  }
}

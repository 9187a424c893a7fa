// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/model/exec.rs - 外部分类程序
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

//! 通过子进程调用设备上的分类模型。
//!
//! 协议：PNG 图像写入子进程标准输入，子进程在标准输出打印 JSON 数组
//! `[{"text": "Dog", "confidence": 0.91}, ...]`，按置信度降序排列。
//!
//! `exec:///usr/local/bin/labeler?arg=--top&arg=5`

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::ImageFormat;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Payload,
  label::Label,
  model::{Classifier, ClassifyError},
};

#[derive(Error, Debug)]
pub enum ExecClassifierError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("缺少程序路径")]
  MissingProgram,
}

#[derive(Debug, Clone)]
pub struct ExecClassifier {
  program: String,
  args: Vec<String>,
}

impl ExecClassifier {
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  fn encode(payload: &Payload<'_>) -> Result<Vec<u8>, ClassifyError> {
    let mut png = Vec::new();
    payload
      .upright()
      .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
      .map_err(|e| ClassifyError::Backend(format!("PNG 编码失败: {}", e)))?;
    Ok(png)
  }
}

impl FromUrlWithScheme for ExecClassifier {
  const SCHEME: &'static str = "exec";
}

impl FromUrl for ExecClassifier {
  type Error = ExecClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ExecClassifierError::SchemeMismatch);
    }

    let program = url.path();
    if program.is_empty() {
      return Err(ExecClassifierError::MissingProgram);
    }

    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();

    Ok(Self::new(program, args))
  }
}

impl Classifier for ExecClassifier {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    let png = Self::encode(payload)?;
    debug!("调用外部分类程序 {} ({} 字节)", self.program, png.len());

    let mut child = Command::new(&self.program)
      .args(&self.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| ClassifyError::Unavailable(format!("{}: {}", self.program, e)))?;

    // 子进程可能边读边写，单独线程写入避免管道互相阻塞
    let stdin = child.stdin.take();
    let writer = std::thread::spawn(move || -> std::io::Result<()> {
      if let Some(mut stdin) = stdin {
        stdin.write_all(&png)?;
      }
      Ok(())
    });

    let output = child
      .wait_with_output()
      .map_err(|e| ClassifyError::Backend(e.to_string()))?;

    match writer.join() {
      Ok(Err(e)) => warn!("写入外部分类程序失败: {}", e),
      Err(_) => warn!("写入线程异常退出"),
      Ok(Ok(())) => {}
    }

    if !output.status.success() {
      return Err(ClassifyError::Backend(format!(
        "{} 退出状态 {}: {}",
        self.program,
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
      )));
    }

    let labels: Vec<Label> = serde_json::from_slice(&output.stdout)
      .map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    Ok(labels)
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::frame::{Frame, Rotation};
  use image::RgbImage;

  fn sh(script: &str) -> ExecClassifier {
    ExecClassifier::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
  }

  #[test]
  fn reads_labels_from_stdout() {
    let classifier =
      sh(r#"cat > /dev/null; echo '[{"text":"Dog","confidence":0.91},{"text":"Animal","confidence":0.8}]'"#);
    let frame = Frame::new(1, RgbImage::new(8, 8), Rotation::Deg0);
    let labels = classifier.classify(&frame.payload().unwrap()).unwrap();
    assert_eq!(labels, vec![Label::new("Dog", 0.91), Label::new("Animal", 0.8)]);
  }

  #[test]
  fn failures_are_typed() {
    let frame = Frame::new(1, RgbImage::new(8, 8), Rotation::Deg0);
    let payload = frame.payload().unwrap();
    assert!(matches!(
      sh("cat > /dev/null; exit 3").classify(&payload),
      Err(ClassifyError::Backend(_))
    ));
    assert!(matches!(
      sh("cat > /dev/null; echo nope").classify(&payload),
      Err(ClassifyError::Malformed(_))
    ));
    assert!(matches!(
      ExecClassifier::new("/nonexistent/labeler", Vec::new()).classify(&payload),
      Err(ClassifyError::Unavailable(_))
    ));
  }

  #[test]
  fn program_and_args_come_from_url() {
    let url = Url::parse("exec:///usr/local/bin/labeler?arg=--top&arg=5&other=x").unwrap();
    let classifier = ExecClassifier::from_url(&url).unwrap();
    assert_eq!(classifier.program, "/usr/local/bin/labeler");
    assert_eq!(classifier.args, ["--top", "5"]);
  }
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use explorador::{
  config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_LIVE_LABEL_CAP, Settings},
  presenter::{Command, ResultOrder},
  speech::SpeechPolicy,
};

/// Explorador 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// 支持格式:
  /// - 图片目录: folder:///path/to/dir?fps=5&loop
  /// - 单张图片: image:///path/to/dog.jpg?fps=2
  /// - V4L2: v4l:///dev/video0?front=/dev/video1
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 分类器
  /// - fixed:?Dog=0.91&Animal=0.80
  /// - exec:///usr/bin/labeller?arg=--top&arg=5
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 语音输出: espeak:?voice=es-419 或 log:
  #[arg(long, value_name = "SPEECH", default_value = "log:")]
  pub speech: Url,

  /// 界面输出: console: 或 record:///tmp/explorador.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  /// 词表与趣味知识 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub catalog: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 实时模式每批最多显示的新标签数（0 表示不限）
  #[arg(long, default_value_t = DEFAULT_LIVE_LABEL_CAP, value_name = "COUNT")]
  pub live_cap: usize,

  /// 静态图片最多显示的标签数（0 表示不限）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub still_cap: usize,

  #[arg(long, value_enum, default_value_t = ResultOrder::Confidence)]
  pub order: ResultOrder,

  #[arg(long, value_enum, default_value_t = SpeechPolicy::Interrupt)]
  pub speech_policy: SpeechPolicy,

  /// 词表中没有的标签显示英文原文
  #[arg(long)]
  pub passthrough: bool,

  /// 拍照保存目录
  #[arg(long, value_name = "DIR", default_value = "Pictures/VisualExplorer")]
  pub photo_dir: PathBuf,

  /// 启动后立即开始实时分析
  #[arg(long)]
  pub analyze: bool,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, value_name = "FRAME_NUMBER", default_value_t = 0)]
  pub frame_number: usize,
}

fn cap(count: usize) -> Option<usize> {
  (count > 0).then_some(count)
}

impl Args {
  pub fn settings(&self) -> Settings {
    Settings {
      confidence_threshold: self.confidence,
      live_label_cap: cap(self.live_cap),
      still_label_cap: cap(self.still_cap),
      result_order: self.order,
      speech_policy: self.speech_policy,
      passthrough_translation: self.passthrough,
      photo_dir: self.photo_dir.clone(),
    }
  }

  pub fn frame_number(&self) -> Option<usize> {
    cap(self.frame_number)
  }
}

/// 解析一行标准输入指令
///
/// `a` 开关分析，`c` 切换镜头，`f` 拍照，`g <路径>` 打开图片，
/// `x` 关闭图片，`q` 退出。
pub fn parse_command(line: &str) -> Option<Command> {
  let line = line.trim();
  let (word, rest) = line
    .split_once(char::is_whitespace)
    .map(|(word, rest)| (word, rest.trim()))
    .unwrap_or((line, ""));

  match word.to_lowercase().as_str() {
    "a" | "analizar" => Some(Command::ToggleAnalysis),
    "c" | "camara" | "cámara" => Some(Command::SwitchLens),
    "f" | "foto" => Some(Command::TakePhoto),
    "g" | "galeria" | "galería" if !rest.is_empty() => Some(Command::OpenImage(PathBuf::from(rest))),
    "x" | "cerrar" => Some(Command::CloseImage),
    "q" | "salir" => Some(Command::Quit),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_console_commands() {
    assert_eq!(parse_command(" a "), Some(Command::ToggleAnalysis));
    assert_eq!(parse_command("Cámara"), Some(Command::SwitchLens));
    assert_eq!(
      parse_command("g  /tmp/mi perro.jpg"),
      Some(Command::OpenImage(PathBuf::from("/tmp/mi perro.jpg")))
    );
    assert_eq!(parse_command("g"), None);
    assert_eq!(parse_command("salir"), Some(Command::Quit));
    assert_eq!(parse_command("???"), None);
  }

  #[test]
  fn zero_caps_mean_unlimited() {
    let args = Args::parse_from([
      "explorador",
      "--input",
      "image:///tmp/dog.jpg",
      "--model",
      "fixed:?Dog=0.91",
      "--live-cap",
      "0",
    ]);
    let settings = args.settings();
    assert_eq!(settings.live_label_cap, None);
    assert_eq!(settings.still_label_cap, None);
    assert_eq!(args.frame_number(), None);
  }
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/config.rs - 运行参数
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

use tracing_subscriber::EnvFilter;

use crate::{presenter::ResultOrder, speech::SpeechPolicy};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.85;
pub const DEFAULT_LIVE_LABEL_CAP: usize = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 两个程序共用的日志过滤器：读取 `RUST_LOG`，未设置或无法解析时为 info
pub fn log_filter() -> EnvFilter {
  filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
  directives
    .and_then(|directives| EnvFilter::try_new(directives).ok())
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

#[derive(Debug, Clone)]
pub struct Settings {
  /// 低于该置信度的标签不显示
  pub confidence_threshold: f32,
  /// 实时模式每批最多显示的新标签数，`None` 表示不限
  pub live_label_cap: Option<usize>,
  /// 静态图片每批最多显示的标签数
  pub still_label_cap: Option<usize>,
  pub result_order: ResultOrder,
  pub speech_policy: SpeechPolicy,
  /// 词表中没有的标签原样显示英文
  pub passthrough_translation: bool,
  /// 拍照保存目录
  pub photo_dir: PathBuf,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      live_label_cap: Some(DEFAULT_LIVE_LABEL_CAP),
      still_label_cap: None,
      result_order: ResultOrder::default(),
      speech_policy: SpeechPolicy::default(),
      passthrough_translation: false,
      photo_dir: PathBuf::from("Pictures/VisualExplorer"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_subscriber::filter::LevelFilter;

  #[test]
  fn log_filter_defaults_to_info() {
    assert_eq!(filter_from(None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(
      filter_from(Some("debug")).max_level_hint(),
      Some(LevelFilter::DEBUG)
    );
    assert_eq!(
      filter_from(Some("[[no es un filtro")).max_level_hint(),
      Some(LevelFilter::INFO)
    );
  }
}

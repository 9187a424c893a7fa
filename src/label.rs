// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/label.rs - 分类标签
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

use serde::{Deserialize, Serialize};

/// 分类器输出的一个标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
  pub text: String,
  pub confidence: f32,
}

impl Label {
  pub fn new(text: impl Into<String>, confidence: f32) -> Self {
    Self {
      text: text.into(),
      confidence: confidence.clamp(0.0, 1.0),
    }
  }

  /// 四舍五入后的置信度百分比
  pub fn percent(&self) -> u32 {
    (self.confidence * 100.0).round() as u32
  }

  /// 结果文本中的一行，例如 `Perro (91%)`
  pub fn result_line(&self, translated: &str) -> String {
    format!("{} ({}%)", translated, self.percent())
  }
}

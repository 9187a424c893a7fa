// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/model/threshold.rs - 置信度阈值过滤
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

use crate::{
  frame::Payload,
  label::Label,
  model::{Classifier, ClassifyError},
};

/// 丢弃低于阈值的标签，保持原有顺序
pub struct ThresholdClassifier<C> {
  inner: C,
  min_confidence: f32,
}

impl<C: Classifier> ThresholdClassifier<C> {
  pub fn new(inner: C, min_confidence: f32) -> Self {
    Self {
      inner,
      min_confidence: min_confidence.clamp(0.0, 1.0),
    }
  }

  pub fn min_confidence(&self) -> f32 {
    self.min_confidence
  }
}

impl<C: Classifier> Classifier for ThresholdClassifier<C> {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    let mut labels = self.inner.classify(payload)?;
    labels.retain(|label| label.confidence >= self.min_confidence);
    Ok(labels)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{Frame, Rotation};
  use crate::model::FixedClassifier;
  use image::RgbImage;

  #[test]
  fn filters_below_threshold() {
    let inner = FixedClassifier::new(vec![
      Label::new("Dog", 0.91),
      Label::new("Animal", 0.80),
      Label::new("Cat", 0.86),
    ]);
    let classifier = ThresholdClassifier::new(inner, 0.85);
    let frame = Frame::new(1, RgbImage::new(1, 1), Rotation::Deg0);
    let labels = classifier.classify(&frame.payload().unwrap()).unwrap();
    let texts: Vec<_> = labels.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, ["Dog", "Cat"]);
  }
}

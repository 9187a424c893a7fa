// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/model/fixed.rs - 固定标签分类器
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Payload,
  label::Label,
  model::{Classifier, ClassifyError},
};

#[derive(Error, Debug)]
pub enum FixedClassifierError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("标签 {0} 的置信度无效: {1}")]
  InvalidConfidence(String, String),
}

/// 对任何图像都返回同一组标签，用于演示与调试
///
/// `fixed:?Dog=0.91&Animal=0.80`
#[derive(Debug, Clone)]
pub struct FixedClassifier {
  labels: Vec<Label>,
}

impl FixedClassifier {
  pub fn new(mut labels: Vec<Label>) -> Self {
    labels.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Self { labels }
  }
}

impl FromUrlWithScheme for FixedClassifier {
  const SCHEME: &'static str = "fixed";
}

impl FromUrl for FixedClassifier {
  type Error = FixedClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(FixedClassifierError::SchemeMismatch);
    }

    let labels = url
      .query_pairs()
      .map(|(text, confidence)| {
        confidence
          .parse::<f32>()
          .ok()
          .filter(|c| (0.0..=1.0).contains(c))
          .map(|c| Label::new(text.as_ref(), c))
          .ok_or_else(|| {
            FixedClassifierError::InvalidConfidence(text.to_string(), confidence.to_string())
          })
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self::new(labels))
  }
}

impl Classifier for FixedClassifier {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    debug!(
      "固定标签分类: {}x{}, {} 个标签",
      payload.image.width(),
      payload.image.height(),
      self.labels.len()
    );
    Ok(self.labels.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_labels_sorted_by_confidence() {
    let url = Url::parse("fixed:?Animal=0.80&Dog=0.91&Pet%20dog=0.5").unwrap();
    let classifier = FixedClassifier::from_url(&url).unwrap();
    let texts: Vec<_> = classifier.labels.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, ["Dog", "Animal", "Pet dog"]);
  }

  #[test]
  fn rejects_bad_confidence() {
    let url = Url::parse("fixed:?Dog=alto").unwrap();
    assert!(matches!(
      FixedClassifier::from_url(&url),
      Err(FixedClassifierError::InvalidConfidence(..))
    ));
    let url = Url::parse("fixed:?Dog=1.5").unwrap();
    assert!(FixedClassifier::from_url(&url).is_err());
  }
}

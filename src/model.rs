// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/model.rs - 图像分类器
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Payload, label::Label};

mod exec;
mod fixed;
mod threshold;

pub use self::exec::{ExecClassifier, ExecClassifierError};
pub use self::fixed::{FixedClassifier, FixedClassifierError};
pub use self::threshold::ThresholdClassifier;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
  #[error("分类器不可用: {0}")]
  Unavailable(String),
  #[error("分类器后端错误: {0}")]
  Backend(String),
  #[error("分类器输出无法解析: {0}")]
  Malformed(String),
}

/// 图像分类器
///
/// 返回按分类器自身置信度排序的标签。
pub trait Classifier: Send + Sync {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError>;
}

impl<C: Classifier + ?Sized> Classifier for std::sync::Arc<C> {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    (**self).classify(payload)
  }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    (**self).classify(payload)
  }
}

/// 一次成功的分类
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
  Labels(Vec<Label>),
  NothingRecognized,
}

impl From<Vec<Label>> for Recognition {
  fn from(labels: Vec<Label>) -> Self {
    if labels.is_empty() {
      Recognition::NothingRecognized
    } else {
      Recognition::Labels(labels)
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
  #[error("分类失败: {0}")]
  ClassificationFailed(#[from] ClassifyError),
  #[error("帧中没有可用的图像数据")]
  ResourceUnavailable,
}

pub type AnalysisOutcome = Result<Recognition, AnalysisError>;

/// 对一帧数据运行分类器，区分三种结果
pub fn analyze<C: Classifier + ?Sized>(
  classifier: &C,
  payload: Option<Payload<'_>>,
) -> AnalysisOutcome {
  let payload = payload.ok_or(AnalysisError::ResourceUnavailable)?;
  let labels = classifier.classify(&payload)?;
  Ok(Recognition::from(labels))
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("固定标签分类器错误: {0}")]
  FixedClassifierError(#[from] FixedClassifierError),
  #[error("外部分类程序错误: {0}")]
  ExecClassifierError(#[from] ExecClassifierError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum ClassifierWrapper {
  Fixed(FixedClassifier),
  Exec(ExecClassifier),
}

impl FromUrl for ClassifierWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      FixedClassifier::SCHEME => Ok(ClassifierWrapper::Fixed(FixedClassifier::from_url(url)?)),
      ExecClassifier::SCHEME => Ok(ClassifierWrapper::Exec(ExecClassifier::from_url(url)?)),
      _ => Err(ModelError::SchemeMismatch),
    }
  }
}

impl Classifier for ClassifierWrapper {
  fn classify(&self, payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    match self {
      ClassifierWrapper::Fixed(classifier) => classifier.classify(payload),
      ClassifierWrapper::Exec(classifier) => classifier.classify(payload),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{Frame, Rotation};
  use image::RgbImage;

  struct Failing;

  impl Classifier for Failing {
    fn classify(&self, _payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
      Err(ClassifyError::Backend("boom".to_string()))
    }
  }

  #[test]
  fn analyze_distinguishes_outcomes() {
    let frame = Frame::new(1, RgbImage::new(2, 2), Rotation::Deg0);
    let empty = Frame::empty(2, Rotation::Deg0);

    let nothing = FixedClassifier::new(Vec::new());
    assert_eq!(
      analyze(&nothing, frame.payload()),
      Ok(Recognition::NothingRecognized)
    );
    assert_eq!(
      analyze(&nothing, empty.payload()),
      Err(AnalysisError::ResourceUnavailable)
    );
    assert!(matches!(
      analyze(&Failing, frame.payload()),
      Err(AnalysisError::ClassificationFailed(_))
    ));
  }

  #[test]
  fn wrapper_dispatches_on_scheme() {
    let url = Url::parse("fixed:?Dog=0.91").unwrap();
    assert!(matches!(
      ClassifierWrapper::from_url(&url),
      Ok(ClassifierWrapper::Fixed(_))
    ));
    let url = Url::parse("tflite:///model.tflite").unwrap();
    assert!(matches!(
      ClassifierWrapper::from_url(&url),
      Err(ModelError::SchemeMismatch)
    ));
  }
}

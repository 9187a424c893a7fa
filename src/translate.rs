// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/translate.rs - 标签翻译
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

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::Catalog;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
  #[error("没有 '{0}' 的翻译")]
  Missing(String),
  #[error("翻译服务错误: {0}")]
  Backend(String),
}

/// 英语标签到目标语言的翻译
pub trait Translator: Send + Sync {
  fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
  fn translate(&self, text: &str) -> Result<String, TranslateError> {
    (**self).translate(text)
  }
}

/// 基于词表的本地翻译
///
/// 词表中没有的标签默认翻译失败（该行不显示）；
/// 开启 `passthrough` 后原样返回英文。
#[derive(Debug, Clone)]
pub struct TableTranslator {
  catalog: Arc<Catalog>,
  passthrough: bool,
}

impl TableTranslator {
  pub fn new(catalog: Arc<Catalog>) -> Self {
    Self {
      catalog,
      passthrough: false,
    }
  }

  pub fn with_passthrough(mut self, passthrough: bool) -> Self {
    self.passthrough = passthrough;
    self
  }
}

impl Translator for TableTranslator {
  fn translate(&self, text: &str) -> Result<String, TranslateError> {
    match self.catalog.translation(text) {
      Some(translated) => Ok(translated.to_string()),
      None if self.passthrough => Ok(text.to_string()),
      None => Err(TranslateError::Missing(text.to_string())),
    }
  }
}

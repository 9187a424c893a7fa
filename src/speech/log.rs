// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/speech/log.rs - 仅记录日志的语音输出
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

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  speech::{Speaker, SpeechError},
};

/// 没有语音合成器时使用：播报内容只写入日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeaker;

impl FromUrlWithScheme for LogSpeaker {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogSpeaker {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SpeechError::SchemeMismatch);
    }
    Ok(LogSpeaker)
  }
}

impl Speaker for LogSpeaker {
  fn is_speaking(&mut self) -> bool {
    false
  }

  fn stop(&mut self) -> Result<(), SpeechError> {
    Ok(())
  }

  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError> {
    info!("朗读: {}", utterance);
    Ok(())
  }
}

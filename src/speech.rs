// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/speech.rs - 语音播报
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
use tracing::debug;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod espeak;
mod log;

pub use self::espeak::{EspeakSpeaker, EspeakSpeakerError};
pub use self::log::LogSpeaker;

#[derive(Error, Debug)]
pub enum SpeechError {
  #[error("语音合成器启动失败: {0}")]
  SpawnError(std::io::Error),
  #[error("停止播报失败: {0}")]
  StopError(std::io::Error),
  #[error("语音合成器错误: {0}")]
  EspeakSpeakerError(#[from] EspeakSpeakerError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 语音合成器，一次只播报一句
pub trait Speaker: Send {
  fn is_speaking(&mut self) -> bool;
  fn stop(&mut self) -> Result<(), SpeechError>;
  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError>;
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
  fn is_speaking(&mut self) -> bool {
    (**self).is_speaking()
  }

  fn stop(&mut self) -> Result<(), SpeechError> {
    (**self).stop()
  }

  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError> {
    (**self).speak(utterance)
  }
}

/// 正在播报时收到新请求的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SpeechPolicy {
  /// 打断当前播报，改播新的一句
  #[default]
  Interrupt,
  /// 正在播报时丢弃新请求
  DropWhileSpeaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utterance {
  Spoken,
  Interrupted,
  Dropped,
  Blank,
}

pub struct Narrator {
  speaker: Box<dyn Speaker>,
  policy: SpeechPolicy,
}

impl Narrator {
  pub fn new(speaker: impl Speaker + 'static, policy: SpeechPolicy) -> Self {
    Self {
      speaker: Box::new(speaker),
      policy,
    }
  }

  pub fn say(&mut self, text: &str) -> Result<Utterance, SpeechError> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(Utterance::Blank);
    }

    let utterance = if self.speaker.is_speaking() {
      match self.policy {
        SpeechPolicy::DropWhileSpeaking => {
          debug!("正在播报，丢弃: {}", text);
          return Ok(Utterance::Dropped);
        }
        SpeechPolicy::Interrupt => {
          self.speaker.stop()?;
          Utterance::Interrupted
        }
      }
    } else {
      Utterance::Spoken
    };

    self.speaker.speak(text)?;
    Ok(utterance)
  }

  pub fn silence(&mut self) -> Result<(), SpeechError> {
    if self.speaker.is_speaking() {
      self.speaker.stop()?;
    }
    Ok(())
  }
}

pub enum SpeakerWrapper {
  Espeak(EspeakSpeaker),
  Log(LogSpeaker),
}

impl FromUrl for SpeakerWrapper {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      EspeakSpeaker::SCHEME => Ok(SpeakerWrapper::Espeak(EspeakSpeaker::from_url(url)?)),
      LogSpeaker::SCHEME => Ok(SpeakerWrapper::Log(LogSpeaker)),
      _ => Err(SpeechError::SchemeMismatch),
    }
  }
}

impl Speaker for SpeakerWrapper {
  fn is_speaking(&mut self) -> bool {
    match self {
      SpeakerWrapper::Espeak(speaker) => speaker.is_speaking(),
      SpeakerWrapper::Log(speaker) => speaker.is_speaking(),
    }
  }

  fn stop(&mut self) -> Result<(), SpeechError> {
    match self {
      SpeakerWrapper::Espeak(speaker) => speaker.stop(),
      SpeakerWrapper::Log(speaker) => speaker.stop(),
    }
  }

  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError> {
    match self {
      SpeakerWrapper::Espeak(speaker) => speaker.speak(utterance),
      SpeakerWrapper::Log(speaker) => speaker.speak(utterance),
    }
  }
}

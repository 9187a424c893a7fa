// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/speech/espeak.rs - eSpeak NG 语音输出
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

//! `espeak:?voice=es-419&rate=150` 使用 PATH 中的 `espeak-ng`；
//! `espeak:///usr/bin/espeak?voice=es` 指定程序路径。

use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  speech::{Speaker, SpeechError},
};

const DEFAULT_PROGRAM: &str = "espeak-ng";
const DEFAULT_VOICE: &str = "es-419";

#[derive(Error, Debug)]
pub enum EspeakSpeakerError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("语速无效: {0}")]
  InvalidRate(String),
}

pub struct EspeakSpeaker {
  program: String,
  voice: String,
  rate: Option<u32>,
  child: Option<Child>,
}

impl EspeakSpeaker {
  pub fn new(voice: impl Into<String>) -> Self {
    Self {
      program: DEFAULT_PROGRAM.to_string(),
      voice: voice.into(),
      rate: None,
      child: None,
    }
  }
}

impl FromUrlWithScheme for EspeakSpeaker {
  const SCHEME: &'static str = "espeak";
}

impl FromUrl for EspeakSpeaker {
  type Error = EspeakSpeakerError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EspeakSpeakerError::SchemeMismatch);
    }

    let mut speaker = EspeakSpeaker::new(DEFAULT_VOICE);
    if !url.path().is_empty() {
      speaker.program = url.path().to_string();
    }
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "voice" => speaker.voice = v.into_owned(),
        "rate" => {
          let rate = v
            .parse()
            .map_err(|_| EspeakSpeakerError::InvalidRate(v.to_string()))?;
          speaker.rate = Some(rate);
        }
        other => warn!("忽略未知参数: {}", other),
      }
    }
    Ok(speaker)
  }
}

impl Speaker for EspeakSpeaker {
  fn is_speaking(&mut self) -> bool {
    match self.child.as_mut().map(Child::try_wait) {
      Some(Ok(None)) => true,
      Some(Ok(Some(_))) | Some(Err(_)) => {
        self.child = None;
        false
      }
      None => false,
    }
  }

  fn stop(&mut self) -> Result<(), SpeechError> {
    if let Some(mut child) = self.child.take() {
      debug!("停止当前播报");
      child.kill().map_err(SpeechError::StopError)?;
      child.wait().map_err(SpeechError::StopError)?;
    }
    Ok(())
  }

  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError> {
    let mut command = Command::new(&self.program);
    command.arg("-v").arg(&self.voice);
    if let Some(rate) = self.rate {
      command.arg("-s").arg(rate.to_string());
    }
    let child = command
      .arg(utterance)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()
      .map_err(SpeechError::SpawnError)?;
    self.child = Some(child);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_voice_rate_and_program() {
    let url = Url::parse("espeak:///usr/bin/espeak?voice=es&rate=140").unwrap();
    let speaker = EspeakSpeaker::from_url(&url).unwrap();
    assert_eq!(speaker.program, "/usr/bin/espeak");
    assert_eq!(speaker.voice, "es");
    assert_eq!(speaker.rate, Some(140));

    let url = Url::parse("espeak:?rate=rapido").unwrap();
    assert!(matches!(
      EspeakSpeaker::from_url(&url),
      Err(EspeakSpeakerError::InvalidRate(_))
    ));
  }

  #[test]
  fn defaults_to_latin_american_spanish() {
    let speaker = EspeakSpeaker::from_url(&Url::parse("espeak:").unwrap()).unwrap();
    assert_eq!(speaker.program, DEFAULT_PROGRAM);
    assert_eq!(speaker.voice, DEFAULT_VOICE);
  }
}

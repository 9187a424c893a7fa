// 该文件是 Explorador （视觉探险家） 项目的一部分。
// tests/common/mod.rs - 测试公共部件
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

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use explorador::{
  catalog::Catalog,
  config::Settings,
  label::Label,
  output::{Render, View},
  presenter::{Event, Presenter, Translated, TranslationDispatcher},
  session::SessionClock,
  speech::{Narrator, Speaker, SpeechError},
  translate::TableTranslator,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// 记录每次渲染的界面
#[derive(Clone, Default)]
pub struct Screen {
  pub views: Arc<Mutex<Vec<View>>>,
}

impl Screen {
  pub fn last(&self) -> Option<View> {
    self.views.lock().unwrap().last().cloned()
  }
}

impl Render for Screen {
  type Error = Infallible;

  fn render(&mut self, view: &View) -> Result<(), Self::Error> {
    self.views.lock().unwrap().push(view.clone());
    Ok(())
  }
}

/// 记录每句播报，从不处于播报中
#[derive(Clone, Default)]
pub struct Voice {
  pub spoken: Arc<Mutex<Vec<String>>>,
}

impl Voice {
  pub fn spoken(&self) -> Vec<String> {
    self.spoken.lock().unwrap().clone()
  }
}

impl Speaker for Voice {
  fn is_speaking(&mut self) -> bool {
    false
  }

  fn stop(&mut self) -> Result<(), SpeechError> {
    Ok(())
  }

  fn speak(&mut self, utterance: &str) -> Result<(), SpeechError> {
    self.spoken.lock().unwrap().push(utterance.to_string());
    Ok(())
  }
}

pub struct Harness {
  pub presenter: Presenter<Screen>,
  pub events: Receiver<Event>,
  pub screen: Screen,
  pub voice: Voice,
  pub clock: SessionClock,
  pub catalog: Arc<Catalog>,
}

impl Harness {
  pub fn new(settings: Settings) -> Self {
    let catalog = Arc::new(Catalog::default());
    let translator =
      TableTranslator::new(catalog.clone()).with_passthrough(settings.passthrough_translation);
    let (tx, events) = mpsc::channel();
    let screen = Screen::default();
    let voice = Voice::default();
    let clock = SessionClock::new();
    let presenter = Presenter::new(
      &settings,
      catalog.clone(),
      screen.clone(),
      Narrator::new(voice.clone(), settings.speech_policy),
      TranslationDispatcher::new(Arc::new(translator), tx),
      clock.clone(),
    );
    Self {
      presenter,
      events,
      screen,
      voice,
      clock,
      catalog,
    }
  }

  pub fn results(&self) -> String {
    self.presenter.view().results.clone()
  }

  /// 处理事件直到没有等待中的翻译
  pub fn settle(&mut self) {
    while !self.presenter.is_settled() {
      let event = self.events.recv_timeout(TIMEOUT).expect("translation event");
      self.presenter.handle(event).unwrap();
    }
  }

  /// 收集 `count` 个翻译结果而不交给展示器
  pub fn collect_translations(&self, count: usize) -> Vec<Translated> {
    let mut translated: Vec<Translated> = (0..count)
      .map(|_| match self.events.recv_timeout(TIMEOUT).expect("translation event") {
        Event::Translated(translated) => translated,
        other => panic!("unexpected event {:?}", other),
      })
      .collect();
    translated.sort_by_key(|t| t.index);
    translated
  }
}

pub fn labels(entries: &[(&str, f32)]) -> Vec<Label> {
  entries
    .iter()
    .map(|(text, confidence)| Label::new(*text, *confidence))
    .collect()
}

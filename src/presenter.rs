// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/presenter.rs - 标签展示与界面状态
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

//! # 标签展示
//!
//! 展示器只在主线程上运行，持有界面快照、已显示标签集合与语音输出。
//! 分类结果与逐个标签的翻译结果都以 [`Event`] 的形式异步送达；
//! 带着过期会话号的结果直接丢弃。
//!
//! 每批标签中第一个被显示的标签触发一次趣味知识查询和一次语音播报，
//! 其余标签只更新文字。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  camera::Binding,
  catalog::Catalog,
  config::Settings,
  input::{InputError, LensFacing},
  label::Label,
  model::{AnalysisOutcome, Recognition},
  output::{AppState, Render, View},
  session::{SessionClock, SessionId},
  speech::Narrator,
  translate::{TranslateError, Translator},
};

pub type BatchId = u64;

/// 结果来自实时分析还是静态图片
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Live,
  Still,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
  pub session: SessionId,
  pub origin: Origin,
  pub outcome: AnalysisOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
  pub batch: BatchId,
  pub index: usize,
  pub result: Result<String, TranslateError>,
}

/// 用户操作
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  ToggleAnalysis,
  SwitchLens,
  TakePhoto,
  OpenImage(PathBuf),
  CloseImage,
  Quit,
}

#[derive(Debug)]
pub enum Event {
  Classified(Classified),
  Translated(Translated),
  Command(Command),
  /// 相机线程处理完一次绑定请求，`binding` 是实际生效的绑定
  CameraBound {
    binding: Binding,
    error: Option<InputError>,
  },
  /// 抓拍到的图像，帧中没有图像数据时为 `None`
  Captured(Option<RgbImage>),
  /// 输入源没有更多帧
  InputEnded,
}

/// 一批标签的翻译完成顺序不确定时，结果文字的排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ResultOrder {
  /// 按分类器置信度顺序显示，先到的翻译等待前面的标签
  #[default]
  Confidence,
  /// 按翻译完成的先后顺序显示
  Arrival,
}

#[derive(Error, Debug)]
pub enum PresenterError {
  #[error("界面渲染失败: {0}")]
  RenderError(Box<dyn std::error::Error + Send + Sync>),
}

/// 每个标签的翻译在独立线程中进行，结果回送到事件通道
#[derive(Clone)]
pub struct TranslationDispatcher {
  translator: Arc<dyn Translator>,
  events: Sender<Event>,
}

impl TranslationDispatcher {
  pub fn new(translator: Arc<dyn Translator>, events: Sender<Event>) -> Self {
    Self { translator, events }
  }

  fn dispatch(&self, batch: BatchId, index: usize, text: String) {
    let translator = self.translator.clone();
    let events = self.events.clone();
    std::thread::spawn(move || {
      let result = translator.translate(&text);
      let translated = Translated {
        batch,
        index,
        result,
      };
      if events.send(Event::Translated(translated)).is_err() {
        debug!("事件通道已关闭，丢弃 '{}' 的翻译", text);
      }
    });
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
  Pending,
  Ready(String),
  Dropped,
  Rendered,
}

struct Batch {
  session: SessionId,
  labels: Vec<Label>,
  slots: Vec<Slot>,
  next_in_order: usize,
  announced: bool,
}

impl Batch {
  fn is_finished(&self) -> bool {
    self
      .slots
      .iter()
      .all(|slot| matches!(slot, Slot::Dropped | Slot::Rendered))
  }

  /// 取出可以显示的行，并标出其中需要播报的那一个
  fn release(&mut self, order: ResultOrder, index: usize) -> (Vec<(Label, String)>, Option<usize>) {
    let mut released = Vec::new();
    match order {
      ResultOrder::Confidence => {
        while self.next_in_order < self.slots.len() {
          let slot = &mut self.slots[self.next_in_order];
          match std::mem::replace(slot, Slot::Rendered) {
            Slot::Pending => {
              *slot = Slot::Pending;
              break;
            }
            Slot::Ready(text) => released.push((self.labels[self.next_in_order].clone(), text)),
            Slot::Dropped => *slot = Slot::Dropped,
            Slot::Rendered => {}
          }
          self.next_in_order += 1;
        }
      }
      ResultOrder::Arrival => {
        if let Some(slot) = self.slots.get_mut(index) {
          match std::mem::replace(slot, Slot::Rendered) {
            Slot::Ready(text) => released.push((self.labels[index].clone(), text)),
            other => *slot = other,
          }
        }
      }
    }

    let announce = if !self.announced && !released.is_empty() {
      self.announced = true;
      Some(0)
    } else {
      None
    };
    (released, announce)
  }
}

/// 结果文字：还没有任何行时显示占位文字
#[derive(Debug, Clone, Default)]
struct ResultText {
  placeholder: String,
  lines: Vec<String>,
}

impl ResultText {
  fn reset(&mut self, placeholder: &str) {
    self.placeholder = placeholder.to_string();
    self.lines.clear();
  }

  fn render(&self) -> String {
    if self.lines.is_empty() {
      self.placeholder.clone()
    } else {
      self.lines.join("\n")
    }
  }
}

pub struct Presenter<R> {
  catalog: Arc<Catalog>,
  renderer: R,
  narrator: Narrator,
  translations: TranslationDispatcher,
  clock: SessionClock,
  live_label_cap: Option<usize>,
  still_label_cap: Option<usize>,
  order: ResultOrder,
  view: View,
  text: ResultText,
  shown: HashMap<String, f32>,
  batches: HashMap<BatchId, Batch>,
  next_batch: BatchId,
}

impl<R> Presenter<R>
where
  R: Render,
  R::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(
    settings: &Settings,
    catalog: Arc<Catalog>,
    renderer: R,
    narrator: Narrator,
    translations: TranslationDispatcher,
    clock: SessionClock,
  ) -> Self {
    let mut text = ResultText::default();
    text.reset(&catalog.messages().choose_option);
    let view = View {
      results: text.render(),
      ..View::default()
    };

    Self {
      catalog,
      renderer,
      narrator,
      translations,
      clock,
      live_label_cap: settings.live_label_cap,
      still_label_cap: settings.still_label_cap,
      order: settings.result_order,
      view,
      text,
      shown: HashMap::new(),
      batches: HashMap::new(),
      next_batch: 0,
    }
  }

  pub fn view(&self) -> &View {
    &self.view
  }

  pub fn renderer(&self) -> &R {
    &self.renderer
  }

  pub fn shown_labels(&self) -> &HashMap<String, f32> {
    &self.shown
  }

  pub fn session(&self) -> SessionId {
    self.clock.current()
  }

  pub fn analysis_running(&self) -> bool {
    self.view.analysis_running
  }

  /// 没有等待翻译的批次
  pub fn is_settled(&self) -> bool {
    self.batches.is_empty()
  }

  /// 重新渲染当前界面
  pub fn refresh(&mut self) -> Result<(), PresenterError> {
    self.view.results = self.text.render();
    self
      .renderer
      .render(&self.view)
      .map_err(|e| PresenterError::RenderError(Box::new(e)))
  }

  fn new_session(&mut self) -> SessionId {
    self.batches.clear();
    self.clock.advance()
  }

  /// 开关实时分析，返回切换后的状态
  pub fn toggle_analysis(&mut self) -> Result<bool, PresenterError> {
    let running = !self.view.analysis_running;
    self.view.analysis_running = running;
    let session = self.new_session();

    let messages = self.catalog.messages();
    if running {
      info!("开始实时分析 (会话 {})", session);
      self.shown.clear();
      self.text.reset(&messages.live_analysing);
    } else {
      info!("停止实时分析");
      self.text.reset(&messages.analysis_stopped);
      if let Err(e) = self.narrator.silence() {
        warn!("停止播报失败: {}", e);
      }
    }
    self.refresh()?;
    Ok(running)
  }

  pub fn enter_live_camera(&mut self) -> Result<(), PresenterError> {
    self.view.state = AppState::LiveCamera;
    self.view.fact = None;
    self.new_session();
    self.text.reset(&self.catalog.messages().choose_option);
    self.refresh()
  }

  /// 进入图片显示状态，返回静态分析应使用的会话号
  pub fn show_still(&mut self) -> Result<SessionId, PresenterError> {
    self.view.state = AppState::ImageDisplay;
    self.view.fact = None;
    let session = self.new_session();
    self.text.reset(&self.catalog.messages().analysing_image);
    self.refresh()?;
    Ok(session)
  }

  pub fn set_lens(&mut self, lens: LensFacing) -> Result<(), PresenterError> {
    self.view.lens = lens;
    self.refresh()
  }

  pub fn handle(&mut self, event: Event) -> Result<(), PresenterError> {
    match event {
      Event::Classified(classified) => self.on_classified(classified),
      Event::Translated(translated) => self.on_translated(translated),
      Event::Command(command) => {
        debug!("展示器忽略操作: {:?}", command);
        Ok(())
      }
      Event::CameraBound { .. } | Event::Captured(_) | Event::InputEnded => Ok(()),
    }
  }

  pub fn on_classified(&mut self, classified: Classified) -> Result<(), PresenterError> {
    let Classified {
      session,
      origin,
      outcome,
    } = classified;

    if !self.clock.is_current(session) {
      debug!("丢弃过期的分析结果 (会话 {})", session);
      return Ok(());
    }
    // 停止分析与相机解绑之间仍可能有帧被送入分类器
    if origin == Origin::Live
      && !(self.view.analysis_running && self.view.state == AppState::LiveCamera)
    {
      debug!("实时分析未开启，丢弃结果");
      return Ok(());
    }

    match outcome {
      Ok(Recognition::Labels(labels)) => {
        self.start_batch(session, origin, labels);
        Ok(())
      }
      Ok(Recognition::NothingRecognized) => {
        // 实时模式下已经列出的结果保留
        if origin == Origin::Still || self.text.lines.is_empty() {
          self.text.reset(&self.catalog.messages().nothing_recognized);
          self.view.fact = None;
          self.refresh()?;
        }
        Ok(())
      }
      Err(e) => {
        warn!("分析失败 ({:?}): {}", origin, e);
        if origin == Origin::Still {
          self.text.reset(&self.catalog.messages().analysis_failed);
          self.view.fact = None;
          self.refresh()?;
        }
        Ok(())
      }
    }
  }

  fn start_batch(&mut self, session: SessionId, origin: Origin, labels: Vec<Label>) {
    let (cap, novelty_only) = match origin {
      Origin::Live => (self.live_label_cap, true),
      Origin::Still => (self.still_label_cap, false),
    };

    let mut accepted = Vec::new();
    for label in labels {
      if cap.is_some_and(|cap| accepted.len() >= cap) {
        break;
      }
      if novelty_only {
        if self.shown.contains_key(&label.text) {
          continue;
        }
        self.shown.insert(label.text.clone(), label.confidence);
      }
      accepted.push(label);
    }

    if accepted.is_empty() {
      debug!("本批标签都已显示过");
      return;
    }

    let id = self.next_batch;
    self.next_batch += 1;
    debug!("批次 {}: {} 个标签等待翻译", id, accepted.len());
    for (index, label) in accepted.iter().enumerate() {
      self.translations.dispatch(id, index, label.text.clone());
    }
    self.batches.insert(
      id,
      Batch {
        session,
        slots: vec![Slot::Pending; accepted.len()],
        labels: accepted,
        next_in_order: 0,
        announced: false,
      },
    );
  }

  pub fn on_translated(&mut self, translated: Translated) -> Result<(), PresenterError> {
    let Translated {
      batch: id,
      index,
      result,
    } = translated;

    let order = self.order;
    let Some(batch) = self.batches.get_mut(&id) else {
      debug!("批次 {} 已结束，丢弃翻译", id);
      return Ok(());
    };
    if !self.clock.is_current(batch.session) {
      self.batches.remove(&id);
      return Ok(());
    }
    if batch.slots.get(index) != Some(&Slot::Pending) {
      return Ok(());
    }

    batch.slots[index] = match result {
      Ok(text) => Slot::Ready(text),
      Err(e) => {
        warn!("标签 '{}' 翻译失败: {}", batch.labels[index].text, e);
        Slot::Dropped
      }
    };

    let (released, announce) = batch.release(order, index);
    if batch.is_finished() {
      self.batches.remove(&id);
    }
    if released.is_empty() {
      return Ok(());
    }

    for (position, (label, text)) in released.iter().enumerate() {
      self.text.lines.push(label.result_line(text));
      if announce == Some(position) {
        self.announce(label, text);
      }
    }
    self.refresh()
  }

  fn announce(&mut self, label: &Label, translated: &str) {
    let fact = self.catalog.fact(&label.text).map(str::to_string);
    let mut utterance = self.catalog.messages().announce(translated);
    if let Some(fact) = &fact {
      utterance.push(' ');
      utterance.push_str(fact);
    }
    self.view.fact = fact;

    match self.narrator.say(&utterance) {
      Ok(spoken) => debug!("播报 {:?}: {}", spoken, utterance),
      Err(e) => warn!("语音播报失败: {}", e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn batch(n: usize) -> Batch {
    Batch {
      session: 0,
      labels: (0..n).map(|i| Label::new(format!("L{}", i), 0.9)).collect(),
      slots: vec![Slot::Pending; n],
      next_in_order: 0,
      announced: false,
    }
  }

  #[test]
  fn confidence_order_waits_for_earlier_slots() {
    let mut batch = batch(3);
    batch.slots[2] = Slot::Ready("c".to_string());
    let (released, announce) = batch.release(ResultOrder::Confidence, 2);
    assert!(released.is_empty());
    assert_eq!(announce, None);

    batch.slots[0] = Slot::Dropped;
    batch.slots[1] = Slot::Ready("b".to_string());
    let (released, announce) = batch.release(ResultOrder::Confidence, 1);
    let texts: Vec<_> = released.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(texts, ["b", "c"]);
    assert_eq!(announce, Some(0));
    assert!(batch.is_finished());
  }

  #[test]
  fn arrival_order_releases_immediately() {
    let mut batch = batch(2);
    batch.slots[1] = Slot::Ready("b".to_string());
    let (released, announce) = batch.release(ResultOrder::Arrival, 1);
    assert_eq!(released[0].1, "b");
    assert_eq!(announce, Some(0));

    batch.slots[0] = Slot::Ready("a".to_string());
    let (released, announce) = batch.release(ResultOrder::Arrival, 0);
    assert_eq!(released[0].1, "a");
    assert_eq!(announce, None);
    assert!(batch.is_finished());
  }
}

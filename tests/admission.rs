// 该文件是 Explorador （视觉探险家） 项目的一部分。
// tests/admission.rs - 帧准入测试
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

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use common::{TIMEOUT, labels};
use explorador::{
  admission::{Admission, Analyzer},
  frame::{Frame, Payload, Rotation},
  label::Label,
  model::{AnalysisError, Classifier, ClassifyError, FixedClassifier, Recognition},
  presenter::{Classified, Event, Origin},
  session::SessionClock,
};
use image::RgbImage;

/// 进入分类后阻塞，直到测试放行
struct Blocking {
  calls: Arc<AtomicUsize>,
  entered: Mutex<Sender<()>>,
  proceed: Mutex<Receiver<()>>,
}

impl Classifier for Blocking {
  fn classify(&self, _payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.entered.lock().unwrap().send(()).unwrap();
    self.proceed.lock().unwrap().recv().unwrap();
    Ok(labels(&[("Dog", 0.91), ("Animal", 0.80)]))
  }
}

struct Failing;

impl Classifier for Failing {
  fn classify(&self, _payload: &Payload<'_>) -> Result<Vec<Label>, ClassifyError> {
    Err(ClassifyError::Unavailable("modelo no descargado".to_string()))
  }
}

fn tracked(id: u64, released: &Arc<AtomicUsize>) -> Frame {
  let released = released.clone();
  Frame::new(id, RgbImage::new(4, 4), Rotation::Deg90).with_release_hook(move |_| {
    released.fetch_add(1, Ordering::SeqCst);
  })
}

fn next_classified(events: &Receiver<Event>) -> Classified {
  match events.recv_timeout(TIMEOUT).expect("classified event") {
    Event::Classified(classified) => classified,
    other => panic!("unexpected event {:?}", other),
  }
}

#[test]
fn second_frame_is_dropped_while_first_is_in_flight() {
  let calls = Arc::new(AtomicUsize::new(0));
  let (entered_tx, entered) = mpsc::channel();
  let (proceed, proceed_rx) = mpsc::channel();
  let classifier = Blocking {
    calls: calls.clone(),
    entered: Mutex::new(entered_tx),
    proceed: Mutex::new(proceed_rx),
  };
  let (tx, events) = mpsc::channel();
  let clock = SessionClock::new();
  let analyzer = Analyzer::spawn(classifier, clock.clone(), tx).unwrap();

  let first_released = Arc::new(AtomicUsize::new(0));
  let second_released = Arc::new(AtomicUsize::new(0));

  assert_eq!(
    analyzer.submit_frame(tracked(1, &first_released)),
    Admission::Forwarded(1)
  );
  entered.recv_timeout(TIMEOUT).unwrap();
  assert!(analyzer.gate().is_busy());

  assert_eq!(
    analyzer.submit_frame(tracked(2, &second_released)),
    Admission::Dropped(2)
  );
  assert_eq!(second_released.load(Ordering::SeqCst), 1);
  assert_eq!(first_released.load(Ordering::SeqCst), 0);

  proceed.send(()).unwrap();
  let classified = next_classified(&events);
  assert_eq!(classified.session, clock.current());
  assert_eq!(classified.origin, Origin::Live);
  assert!(matches!(classified.outcome, Ok(Recognition::Labels(ref l)) if l.len() == 2));

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(first_released.load(Ordering::SeqCst), 1);
  assert!(!analyzer.gate().is_busy());
}

#[test]
fn frames_without_payload_never_reach_the_classifier() {
  let (tx, events) = mpsc::channel();
  let analyzer = Analyzer::spawn(Failing, SessionClock::new(), tx).unwrap();
  let released = Arc::new(AtomicUsize::new(0));
  let hook = released.clone();
  let frame = Frame::empty(7, Rotation::Deg0).with_release_hook(move |_| {
    hook.fetch_add(1, Ordering::SeqCst);
  });

  assert_eq!(analyzer.submit_frame(frame), Admission::NoPayload(7));
  assert_eq!(released.load(Ordering::SeqCst), 1);
  assert!(!analyzer.gate().is_busy());
  drop(analyzer);
  assert!(events.try_recv().is_err());
}

#[test]
fn failures_release_the_frame_and_the_flag() {
  let (tx, events) = mpsc::channel();
  let analyzer = Analyzer::spawn(Failing, SessionClock::new(), tx).unwrap();
  let released = Arc::new(AtomicUsize::new(0));

  assert_eq!(
    analyzer.submit_frame(tracked(3, &released)),
    Admission::Forwarded(3)
  );
  let classified = next_classified(&events);
  assert!(matches!(
    classified.outcome,
    Err(AnalysisError::ClassificationFailed(ClassifyError::Unavailable(_)))
  ));
  assert_eq!(released.load(Ordering::SeqCst), 1);
  assert!(!analyzer.gate().is_busy());

  // 标志复位后下一帧可以进入
  assert_eq!(
    analyzer.submit_frame(tracked(4, &released)),
    Admission::Forwarded(4)
  );
  next_classified(&events);
  assert_eq!(released.load(Ordering::SeqCst), 2);
}

#[test]
fn results_carry_the_session_of_submission() {
  let (tx, events) = mpsc::channel();
  let clock = SessionClock::new();
  let analyzer =
    Analyzer::spawn(FixedClassifier::new(Vec::new()), clock.clone(), tx).unwrap();
  let submitted = clock.advance();
  let released = Arc::new(AtomicUsize::new(0));

  analyzer.submit_frame(tracked(5, &released));
  let classified = next_classified(&events);
  assert_eq!(classified.session, submitted);
  assert_eq!(classified.outcome, Ok(Recognition::NothingRecognized));
  assert!(!analyzer.gate().is_busy());
  assert_eq!(released.load(Ordering::SeqCst), 1);

  let next = clock.advance();
  assert_eq!(
    analyzer.submit_frame(tracked(6, &released)),
    Admission::Forwarded(6)
  );
  let classified = next_classified(&events);
  assert_eq!(classified.session, next);
  assert_eq!(released.load(Ordering::SeqCst), 2);
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/task.rs - 任务循环
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
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  admission::Analyzer,
  camera::{Binding, Camera, PhotoAlbum},
  catalog::Catalog,
  config::Settings,
  frame::{Frame, FrameId, Rotation},
  input::{FrameSource, InputError, read_still},
  model::{self, AnalysisError, Classifier},
  output::{AppState, Render},
  presenter::{Classified, Command, Event, Origin, Presenter, TranslationDispatcher},
  session::{SessionClock, SessionId},
  speech::Narrator,
  translate::{TableTranslator, Translator},
};

/// 等待最后一批翻译的时长
const SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 展示器需要的其余部件
pub struct Explorer {
  settings: Settings,
  catalog: Arc<Catalog>,
  narrator: Narrator,
  translator: Arc<dyn Translator>,
}

impl Explorer {
  pub fn new(settings: Settings, catalog: Arc<Catalog>, narrator: Narrator) -> Self {
    let translator = TableTranslator::new(catalog.clone())
      .with_passthrough(settings.passthrough_translation);
    Self {
      settings,
      catalog,
      narrator,
      translator: Arc::new(translator),
    }
  }

  pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
    self.translator = translator;
    self
  }

  fn into_presenter<O>(
    self,
    output: O,
    events: Sender<Event>,
    clock: SessionClock,
  ) -> (Settings, Presenter<O>)
  where
    O: Render,
    O::Error: std::error::Error + Send + Sync + 'static,
  {
    let dispatcher = TranslationDispatcher::new(self.translator, events);
    let presenter = Presenter::new(
      &self.settings,
      self.catalog,
      output,
      self.narrator,
      dispatcher,
      clock,
    );
    (self.settings, presenter)
  }
}

/// 在短生命周期线程中分析一张静态图片，结果回送到事件通道
fn analyze_still<M>(
  classifier: Arc<M>,
  image: RgbImage,
  session: SessionId,
  events: Sender<Event>,
) -> JoinHandle<()>
where
  M: Classifier + ?Sized + 'static,
{
  thread::spawn(move || {
    let frame = Frame::new(FrameId::default(), image, Rotation::Deg0);
    let now = std::time::Instant::now();
    let outcome = model::analyze(classifier.as_ref(), frame.payload());
    info!("图片分析完成，耗时: {:.2?}", now.elapsed());
    let classified = Classified {
      session,
      origin: Origin::Still,
      outcome,
    };
    if events.send(Event::Classified(classified)).is_err() {
      debug!("事件通道已关闭，丢弃图片分析结果");
    }
  })
}

/// 处理已经到达的事件，再等待未完成的翻译
fn drain<O>(presenter: &mut Presenter<O>, events: &Receiver<Event>) -> anyhow::Result<()>
where
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  while let Ok(event) = events.try_recv() {
    presenter.handle(event)?;
  }
  while !presenter.is_settled() {
    match events.recv_timeout(SETTLE_TIMEOUT) {
      Ok(event) => presenter.handle(event)?,
      Err(_) => {
        warn!("等待翻译超时");
        break;
      }
    }
  }
  Ok(())
}

/// 单张图片：取输入的第一帧，分析、翻译、播报后退出
pub struct StillTask {
  explorer: Explorer,
}

impl StillTask {
  pub fn new(explorer: Explorer) -> Self {
    Self { explorer }
  }
}

impl<I, M, O> Task<I, M, O> for StillTask
where
  I: Iterator<Item = Frame>,
  M: Classifier + 'static,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let image = frame
      .payload()
      .map(|payload| payload.upright())
      .ok_or_else(|| anyhow::anyhow!("输入帧没有图像数据"))?;
    frame.close();

    let (tx, rx) = mpsc::channel();
    let (_, mut presenter) = self.explorer.into_presenter(output, tx.clone(), SessionClock::new());
    let session = presenter.show_still()?;
    let worker = analyze_still(Arc::new(model), image, session, tx);

    // 翻译分发器持有发送端，分析线程 panic 时通道不会断开
    let event = loop {
      match rx.recv_timeout(SETTLE_TIMEOUT) {
        Ok(event) => break event,
        Err(_) if worker.is_finished() => {
          // 线程结束与结果送达之间的竞争
          match rx.try_recv() {
            Ok(event) => break event,
            Err(_) => {
              let _ = worker.join();
              anyhow::bail!("分析线程意外退出");
            }
          }
        }
        Err(_) => debug!("等待图片分析结果..."),
      }
    };
    presenter.handle(event)?;
    drain(&mut presenter, &rx)?;
    if worker.join().is_err() {
      warn!("分析线程异常退出");
    }

    info!("任务完成，退出");
    Ok(())
  }
}

/// 实时相机：事件循环处理分析结果、翻译结果与用户操作
pub struct LiveTask {
  explorer: Explorer,
  frame_number: Option<usize>,
  auto_analysis: bool,
  events: Sender<Event>,
  receiver: Receiver<Event>,
}

impl LiveTask {
  pub fn new(explorer: Explorer) -> Self {
    let (events, receiver) = mpsc::channel();
    Self {
      explorer,
      frame_number: None,
      auto_analysis: false,
      events,
      receiver,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 启动后立即开始实时分析
  pub fn with_auto_analysis(mut self, auto_analysis: bool) -> Self {
    self.auto_analysis = auto_analysis;
    self
  }

  /// 用户操作通过该通道送入事件循环
  pub fn events(&self) -> Sender<Event> {
    self.events.clone()
  }
}

struct Controller<'a, O, M> {
  presenter: Presenter<O>,
  camera: Camera,
  classifier: Arc<M>,
  album: PhotoAlbum,
  events: &'a Sender<Event>,
  stills: Vec<JoinHandle<()>>,
  awaiting_photo: bool,
}

impl<O, M> Controller<'_, O, M>
where
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
  M: Classifier + 'static,
{
  /// 先改相机绑定，再开启新会话
  fn toggle_analysis(&mut self) -> anyhow::Result<()> {
    let running = !self.presenter.analysis_running();
    if let Err(e) = self.camera.set_analysis(running) {
      warn!("重新绑定相机失败: {}", e);
    }
    self.presenter.toggle_analysis()?;
    Ok(())
  }

  fn stop_analysis(&mut self) -> anyhow::Result<()> {
    if self.presenter.analysis_running() {
      self.toggle_analysis()?;
    }
    Ok(())
  }

  fn show_still(&mut self, image: RgbImage) -> anyhow::Result<()> {
    let session = self.presenter.show_still()?;
    self.stills.retain(|still| !still.is_finished());
    self.stills.push(analyze_still(
      self.classifier.clone(),
      image,
      session,
      self.events.clone(),
    ));
    Ok(())
  }

  fn on_captured(&mut self, image: Option<RgbImage>) -> anyhow::Result<()> {
    if !std::mem::take(&mut self.awaiting_photo) {
      return Ok(());
    }
    if self.presenter.view().state != AppState::LiveCamera {
      info!("已离开相机画面，放弃照片");
      return Ok(());
    }
    let Some(image) = image else {
      warn!("拍照失败: 帧中没有图像数据");
      return Ok(());
    };

    let album = self.album.clone();
    let photo = image.clone();
    self.stills.push(thread::spawn(move || {
      if let Err(e) = album.save(&photo) {
        warn!("保存照片失败: {}", e);
      }
    }));
    self.show_still(image)
  }

  fn on_bound(&mut self, binding: Binding, error: Option<InputError>) -> anyhow::Result<()> {
    if let Some(e) = &error {
      warn!("相机绑定失败: {}", e);
    }
    self.camera.on_bound(binding, error.is_some());
    if self.presenter.view().lens != binding.lens {
      self.presenter.set_lens(binding.lens)?;
    }
    Ok(())
  }

  fn on_command(&mut self, command: Command) -> anyhow::Result<()> {
    let state = self.presenter.view().state;
    match (command, state) {
      (Command::ToggleAnalysis, AppState::LiveCamera) => self.toggle_analysis()?,
      (Command::SwitchLens, AppState::LiveCamera) => match self.camera.switch_lens() {
        Ok(lens) => debug!("请求切换到 {:?} 镜头", lens),
        Err(e) => warn!("切换镜头失败: {}", e),
      },
      (Command::TakePhoto, AppState::LiveCamera) => {
        self.stop_analysis()?;
        match self.camera.request_capture() {
          Ok(()) => self.awaiting_photo = true,
          Err(e) => warn!("拍照失败: {}", e),
        }
      }
      (Command::OpenImage(path), _) => {
        self.stop_analysis()?;
        match read_still(&path) {
          Ok(image) => self.show_still(image)?,
          Err(e) => {
            warn!("无法打开图片 {}: {}", path.display(), e);
            let session = self.presenter.show_still()?;
            self.presenter.on_classified(Classified {
              session,
              origin: Origin::Still,
              outcome: Err(AnalysisError::ResourceUnavailable),
            })?;
          }
        }
      }
      (Command::CloseImage, AppState::ImageDisplay) => self.presenter.enter_live_camera()?,
      (Command::Quit, _) => {}
      (command, state) => info!("{:?} 状态下忽略操作 {:?}", state, command),
    }
    Ok(())
  }
}

impl<I, M, O> Task<I, M, O> for LiveTask
where
  I: FrameSource + 'static,
  M: Classifier + 'static,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let LiveTask {
      explorer,
      frame_number,
      auto_analysis,
      events,
      receiver,
    } = self;

    let interrupt = events.clone();
    let handler = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = interrupt.send(Event::Command(Command::Quit));
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });
    if let Err(e) = handler {
      warn!("无法设置 Ctrl-C 处理函数: {}", e);
    }

    let clock = SessionClock::new();
    let classifier = Arc::new(model);
    let analyzer = Analyzer::spawn(classifier.clone(), clock.clone(), events.clone())?;
    let camera = Camera::start(input, analyzer, events.clone(), frame_number)?;
    let (settings, mut presenter) = explorer.into_presenter(output, events.clone(), clock);
    presenter.refresh()?;

    let mut controller = Controller {
      presenter,
      camera,
      classifier,
      album: PhotoAlbum::new(settings.photo_dir),
      events: &events,
      stills: Vec::new(),
      awaiting_photo: false,
    };
    if auto_analysis {
      controller.toggle_analysis()?;
    }

    while let Ok(event) = receiver.recv() {
      match event {
        Event::Command(Command::Quit) => {
          warn!("收到退出指令，退出任务循环");
          break;
        }
        Event::InputEnded => {
          info!("输入结束，退出任务循环");
          break;
        }
        Event::Command(command) => controller.on_command(command)?,
        Event::CameraBound { binding, error } => controller.on_bound(binding, error)?,
        Event::Captured(image) => controller.on_captured(image)?,
        event => controller.presenter.handle(event)?,
      }
    }

    let Controller {
      mut presenter,
      camera,
      stills,
      ..
    } = controller;
    camera.stop();
    for still in stills {
      if still.join().is_err() {
        warn!("图片分析线程异常退出");
      }
    }
    drain(&mut presenter, &receiver)?;

    info!("任务完成，退出");
    Ok(())
  }
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::io::BufRead;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use explorador::{
  FromUrl,
  catalog::Catalog,
  config,
  input::InputWrapper,
  model::{ClassifierWrapper, ThresholdClassifier},
  output::OutputWrapper,
  presenter::{Command, Event},
  speech::{Narrator, SpeakerWrapper},
  task::{Explorer, LiveTask, Task},
};

/// 从标准输入读取指令，送入事件循环
fn read_commands(events: Sender<Event>) {
  std::thread::spawn(move || {
    for line in std::io::stdin().lock().lines() {
      let Ok(line) = line else { break };
      match args::parse_command(&line) {
        Some(command) => {
          if events.send(Event::Command(command)).is_err() {
            break;
          }
        }
        None if line.trim().is_empty() => {}
        None => warn!("未知指令: {}", line.trim()),
      }
    }
    // 标准输入关闭视同退出
    let _ = events.send(Event::Command(Command::Quit));
  });
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(config::log_filter())
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("语音输出: {}", args.speech);
  info!("界面输出: {}", args.output);

  let catalog = match &args.catalog {
    Some(path) => Catalog::from_file(path)?,
    None => Catalog::default(),
  };
  let settings = args.settings();

  let input = InputWrapper::from_url(&args.input)?;
  let model = ThresholdClassifier::new(
    ClassifierWrapper::from_url(&args.model)?,
    settings.confidence_threshold,
  );
  let output = OutputWrapper::from_url(&args.output)?;
  let narrator = Narrator::new(SpeakerWrapper::from_url(&args.speech)?, settings.speech_policy);

  let explorer = Explorer::new(settings, Arc::new(catalog), narrator);
  let task = LiveTask::new(explorer)
    .with_frame_number(args.frame_number())
    .with_auto_analysis(args.analyze);
  read_commands(task.events());

  task.run_task(input, model, output)
}

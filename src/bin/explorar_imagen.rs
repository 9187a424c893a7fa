// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/bin/explorar_imagen.rs - 单张图片分析
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

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use explorador::{
  FromUrl,
  catalog::Catalog,
  config::{self, DEFAULT_CONFIDENCE_THRESHOLD, Settings},
  input::InputWrapper,
  model::{ClassifierWrapper, ThresholdClassifier},
  output::OutputWrapper,
  speech::{Narrator, SpeakerWrapper},
  task::{Explorer, StillTask, Task},
};

/// 分析一张图片并朗读结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类器
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图片，例如 image:///home/kid/perro.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 界面输出
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 语音输出
  #[arg(long, value_name = "SPEECH", default_value = "log:")]
  pub speech: Url,
  /// 词表与趣味知识 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub catalog: Option<PathBuf>,
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 词表中没有的标签显示英文原文
  #[arg(long)]
  pub passthrough: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(config::log_filter())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入图片: {}", args.input);

  let catalog = match &args.catalog {
    Some(path) => Catalog::from_file(path)?,
    None => Catalog::default(),
  };
  let settings = Settings {
    confidence_threshold: args.confidence,
    passthrough_translation: args.passthrough,
    ..Settings::default()
  };

  let input = InputWrapper::from_url(&args.input)?;
  let model = ThresholdClassifier::new(
    ClassifierWrapper::from_url(&args.model)?,
    settings.confidence_threshold,
  );
  let output = OutputWrapper::from_url(&args.output)?;
  let narrator = Narrator::new(SpeakerWrapper::from_url(&args.speech)?, settings.speech_policy);

  let explorer = Explorer::new(settings, Arc::new(catalog), narrator);
  StillTask::new(explorer).run_task(input, model, output)
}

// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/output/console.rs - 控制台显示
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

use std::io::Write;

use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::LensFacing,
  output::{AppState, OutputError, Render, View},
};

/// 在标准输出打印界面变化，内容没变时不重复打印
#[derive(Debug, Default)]
pub struct ConsoleOutput {
  last: Option<View>,
}

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(ConsoleOutput::default())
  }
}

pub(crate) fn format_view(view: &View) -> String {
  let state = match view.state {
    AppState::LiveCamera => "Cámara en vivo",
    AppState::ImageDisplay => "Imagen",
  };
  let lens = match view.lens {
    LensFacing::Back => "trasera",
    LensFacing::Front => "frontal",
  };
  let analysis = if view.analysis_running {
    "analizando"
  } else {
    "en pausa"
  };

  let mut text = format!("[{} · {} · {}]\n{}\n", state, lens, analysis, view.results);
  if let Some(fact) = &view.fact {
    text.push_str(&format!("* {}\n", fact));
  }
  text
}

impl Render for ConsoleOutput {
  type Error = std::io::Error;

  fn render(&mut self, view: &View) -> Result<(), Self::Error> {
    if self.last.as_ref() == Some(view) {
      return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", format_view(view))?;
    stdout.flush()?;
    self.last = Some(view.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_state_results_and_fact() {
    let view = View {
      state: AppState::ImageDisplay,
      analysis_running: false,
      lens: LensFacing::Front,
      results: "Perro (91%)".to_string(),
      fact: Some("¿Sabías...?".to_string()),
    };
    assert_eq!(
      format_view(&view),
      "[Imagen · frontal · en pausa]\nPerro (91%)\n* ¿Sabías...?\n"
    );
  }
}

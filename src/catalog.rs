// 该文件是 Explorador （视觉探险家） 项目的一部分。
// src/catalog.rs - 翻译表、趣味知识与界面文字
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

//! 启动时加载一次的只读配置数据。
//!
//! 所有键与查询都经过 [`lookup_key`] 归一化（去除首尾空白并转为小写），
//! 因此 `Dog`、`dog` 与 ` DOG ` 命中同一条目。

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

const BUILTIN_TRANSLATIONS: &[(&str, &str)] = &[
  ("Animal", "Animal"),
  ("Ball", "Pelota"),
  ("Bicycle", "Bicicleta"),
  ("Bird", "Pájaro"),
  ("Book", "Libro"),
  ("Car", "Coche"),
  ("Cat", "Gato"),
  ("Chair", "Silla"),
  ("Cloud", "Nube"),
  ("Cup", "Taza"),
  ("Dog", "Perro"),
  ("Fish", "Pez"),
  ("Flower", "Flor"),
  ("Food", "Comida"),
  ("Fruit", "Fruta"),
  ("Moon", "Luna"),
  ("Person", "Persona"),
  ("Plant", "Planta"),
  ("Shoe", "Zapato"),
  ("Sky", "Cielo"),
  ("Sun", "Sol"),
  ("Table", "Mesa"),
  ("Toy", "Juguete"),
  ("Tree", "Árbol"),
];

const BUILTIN_FACTS: &[(&str, &str)] = &[
  (
    "Dog",
    "¿Sabías que los perros pueden oler cosas que nosotros ni imaginamos?",
  ),
  (
    "Cat",
    "¿Sabías que los gatos duermen casi todo el día para guardar energía?",
  ),
  ("Bird", "¿Sabías que los pájaros son familia de los dinosaurios?"),
  ("Fish", "¿Sabías que los peces respiran usando branquias?"),
  (
    "Car",
    "¿Sabías que el primer coche no corría más rápido que una persona caminando?",
  ),
  (
    "Bicycle",
    "¿Sabías que andar en bici es un súper ejercicio para tus piernas?",
  ),
  (
    "Sun",
    "¿Sabías que el Sol es una estrella gigante que nos da luz y calor?",
  ),
  ("Moon", "¿Sabías que la Luna es como el gran farol de la noche?"),
  (
    "Cloud",
    "¿Sabías que las nubes están hechas de gotitas de agua muy pequeñas?",
  ),
  (
    "Book",
    "¿Sabías que cada libro es una aventura nueva esperando a ser leída?",
  ),
];

/// 查找键归一化
pub fn lookup_key(text: &str) -> String {
  text.trim().to_lowercase()
}

/// 界面文字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
  pub choose_option: String,
  pub live_analysing: String,
  pub analysis_stopped: String,
  pub analysing_image: String,
  pub nothing_recognized: String,
  pub analysis_failed: String,
  /// `{label}` 会被替换为翻译后的标签
  pub announcement: String,
}

impl Default for Messages {
  fn default() -> Self {
    Self {
      choose_option: "Elige una opción abajo".to_string(),
      live_analysing: "Analizando en vivo...".to_string(),
      analysis_stopped: "Análisis detenido".to_string(),
      analysing_image: "Analizando imagen...".to_string(),
      nothing_recognized: "¡Uy! No reconozco nada. Intenta de nuevo.".to_string(),
      analysis_failed: "Error al analizar la imagen.".to_string(),
      announcement: "¡Veo {label}!".to_string(),
    }
  }
}

impl Messages {
  pub fn announce(&self, translated: &str) -> String {
    self.announcement.replace("{label}", translated)
  }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
  translations: Option<HashMap<String, String>>,
  facts: Option<HashMap<String, String>>,
  #[serde(default)]
  messages: Messages,
}

#[derive(Debug, Clone)]
pub struct Catalog {
  translations: HashMap<String, String>,
  facts: HashMap<String, String>,
  messages: Messages,
}

impl Default for Catalog {
  fn default() -> Self {
    Self {
      translations: normalize("translations", builtin(BUILTIN_TRANSLATIONS)),
      facts: normalize("facts", builtin(BUILTIN_FACTS)),
      messages: Messages::default(),
    }
  }
}

impl Catalog {
  pub fn from_json(json: &str) -> Result<Self, CatalogError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let defaults = Catalog::default();
    Ok(Self {
      translations: file
        .translations
        .map(|table| normalize("translations", table))
        .unwrap_or(defaults.translations),
      facts: file
        .facts
        .map(|table| normalize("facts", table))
        .unwrap_or(defaults.facts),
      messages: file.messages,
    })
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    info!("加载词表文件: {}", path.display());
    let json = std::fs::read_to_string(path)?;
    let catalog = Self::from_json(&json)?;
    info!(
      "词表加载完成: {} 条翻译, {} 条趣味知识",
      catalog.translations.len(),
      catalog.facts.len()
    );
    Ok(catalog)
  }

  pub fn translation(&self, english: &str) -> Option<&str> {
    self.translations.get(&lookup_key(english)).map(String::as_str)
  }

  pub fn fact(&self, english: &str) -> Option<&str> {
    self.facts.get(&lookup_key(english)).map(String::as_str)
  }

  pub fn messages(&self) -> &Messages {
    &self.messages
  }
}

fn builtin(entries: &[(&str, &str)]) -> HashMap<String, String> {
  entries
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn normalize(table: &str, entries: HashMap<String, String>) -> HashMap<String, String> {
  let mut normalized = HashMap::with_capacity(entries.len());
  for (key, value) in entries {
    if normalized.insert(lookup_key(&key), value).is_some() {
      warn!("{} 中存在归一化后重复的键: {}", table, key);
    }
  }
  normalized
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookups_ignore_case_and_whitespace() {
    let catalog = Catalog::default();
    assert_eq!(catalog.translation("Dog"), Some("Perro"));
    assert_eq!(catalog.translation(" dog "), Some("Perro"));
    assert!(catalog.fact("DOG").unwrap().starts_with("¿Sabías"));
    assert_eq!(catalog.fact("Keyboard"), None);
  }

  #[test]
  fn json_sections_replace_builtin_ones() {
    let catalog = Catalog::from_json(
      r#"{
        "facts": { "Robot": "¿Sabías que los robots también se equivocan?" },
        "messages": { "announcement": "¡Mira, {label}!" }
      }"#,
    )
    .unwrap();
    assert_eq!(catalog.fact("dog"), None);
    assert!(catalog.fact("robot").is_some());
    assert_eq!(catalog.translation("cat"), Some("Gato"));
    assert_eq!(catalog.messages().announce("Gato"), "¡Mira, Gato!");
    assert_eq!(catalog.messages().live_analysing, "Analizando en vivo...");
  }

  #[test]
  fn malformed_json_is_rejected() {
    assert!(matches!(
      Catalog::from_json("{ nope"),
      Err(CatalogError::JsonError(_))
    ));
  }
}

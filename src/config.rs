// 该文件是 Kanjian （看见） 项目的一部分。
// src/config.rs - 运行配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Kanjian Contributors

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
  model::{InferenceParams, ModelError},
  palette::{Palette, PaletteError},
  resize::{DEFAULT_BYTE_LIMIT_MB, DEFAULT_JPEG_QUALITY, Resizer},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置文件解析错误: {0}")]
  YamlError(#[from] serde_yaml::Error),
  #[error("调色板配置错误: {0}")]
  PaletteError(#[from] PaletteError),
  #[error("推理参数配置错误: {0}")]
  InferenceError(#[from] ModelError),
  #[error("无效的配置项 {field}: {reason}")]
  InvalidValue { field: &'static str, reason: String },
}

/// YAML 配置文件，所有字段均可省略
///
/// ```yaml
/// colors: ["#042aff", "#0bdbeb"]
/// byte_limit_mb: 2.0
/// jpeg_quality: 70
/// inference:
///   confidence: 0.35
///   iou: 0.45
///   size: 640
///   model: yolov8n
/// api_key: ~
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// 为空时使用默认调色板
  pub colors: Option<Vec<String>>,
  pub byte_limit_mb: f64,
  pub jpeg_quality: u8,
  pub inference: InferenceParams,
  pub api_key: Option<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      colors: None,
      byte_limit_mb: DEFAULT_BYTE_LIMIT_MB,
      jpeg_quality: DEFAULT_JPEG_QUALITY,
      inference: InferenceParams::default(),
      api_key: None,
    }
  }
}

impl Settings {
  pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
    let mut settings: Settings = serde_yaml::from_str(text)?;
    settings.inference = settings.inference.clone().with_model(&settings.inference.model);
    settings.validate()?;
    Ok(settings)
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let settings = Self::from_yaml_str(&text)?;
    info!("加载配置文件: {}", path.as_ref().display());
    Ok(settings)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.byte_limit_mb.is_finite() && self.byte_limit_mb > 0.0) {
      return Err(ConfigError::InvalidValue {
        field: "byte_limit_mb",
        reason: format!("{} 不是正数", self.byte_limit_mb),
      });
    }
    if !(1..=100).contains(&self.jpeg_quality) {
      return Err(ConfigError::InvalidValue {
        field: "jpeg_quality",
        reason: format!("{} 不在 1..=100", self.jpeg_quality),
      });
    }
    self.inference.validate()?;
    Ok(())
  }

  pub fn palette(&self) -> Result<Palette, ConfigError> {
    match &self.colors {
      Some(colors) => Ok(Palette::from_hex(colors)?),
      None => Ok(Palette::default()),
    }
  }

  pub fn resizer(&self) -> Resizer {
    Resizer::new(self.byte_limit_mb, self.jpeg_quality)
  }
}

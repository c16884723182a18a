// 该文件是 Kanjian （看见） 项目的一部分。
// src/palette.rs - 标注调色板
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

use image::Rgb;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub type Color = Rgb<u8>;

/// 默认调色板（Ultralytics 配色）
const DEFAULT_COLORS: [&str; 20] = [
  "#042aff", "#0bdbeb", "#f3f3f3", "#00dfb7", "#111f68", "#ff6fdd", "#ff444f", "#cced00",
  "#00f344", "#bd00ff", "#00b4ff", "#dd00ba", "#00ffff", "#26c000", "#01ffb3", "#7d24ff",
  "#7b0068", "#ff1b6c", "#fc6d2f", "#a2ff0b",
];

#[derive(Error, Debug)]
pub enum PaletteError {
  #[error("调色板为空")]
  Empty,
  #[error("无效的颜色值: {0}")]
  InvalidHex(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("调色板文件解析错误: {0}")]
  YamlError(#[from] serde_yaml::Error),
}

#[derive(Deserialize)]
struct ColorsFile {
  colors: Vec<String>,
}

/// 类别颜色表，构造后只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
  colors: Box<[Color]>,
}

impl Palette {
  pub fn new(colors: Vec<Color>) -> Result<Self, PaletteError> {
    if colors.is_empty() {
      return Err(PaletteError::Empty);
    }
    Ok(Self {
      colors: colors.into_boxed_slice(),
    })
  }

  pub fn from_hex<S: AsRef<str>>(values: &[S]) -> Result<Self, PaletteError> {
    let colors = values
      .iter()
      .map(|v| parse_hex(v.as_ref()))
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(colors)
  }

  /// 解析形如 `colors: ["#042aff", ...]` 的 YAML 文档
  pub fn from_yaml_str(text: &str) -> Result<Self, PaletteError> {
    let file: ColorsFile = serde_yaml::from_str(text)?;
    Self::from_hex(&file.colors)
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PaletteError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let palette = Self::from_yaml_str(&text)?;
    debug!(
      "从 {} 加载 {} 种颜色",
      path.as_ref().display(),
      palette.len()
    );
    Ok(palette)
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }

  /// 按类别索引取颜色，超出调色板大小时循环取色
  pub fn color_for(&self, class_index: usize) -> Color {
    let n = self.colors.len();
    let index = if class_index < n {
      class_index
    } else {
      class_index % n
    };
    self.colors[index]
  }
}

impl Default for Palette {
  fn default() -> Self {
    let colors = DEFAULT_COLORS
      .iter()
      .filter_map(|hex| parse_hex(hex).ok())
      .collect::<Vec<_>>();
    Self {
      colors: colors.into_boxed_slice(),
    }
  }
}

/// `#rrggbb` 或 `rrggbb` 转 RGB
pub fn parse_hex(value: &str) -> Result<Color, PaletteError> {
  let hex = value.trim().trim_start_matches('#');
  if hex.len() != 6 || !hex.is_ascii() {
    return Err(PaletteError::InvalidHex(value.to_string()));
  }

  let channel = |i: usize| {
    u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| PaletteError::InvalidHex(value.to_string()))
  };

  Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

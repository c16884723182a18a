// 该文件是 Kanjian （看见） 项目的一部分。
// src/resize.rs - 按体积与尺寸限制缩放图像
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

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  codec::{self, CodecError, EncodeFormat},
  input::SourceImage,
};

pub const DEFAULT_BYTE_LIMIT_MB: f64 = 2.0;
pub const DEFAULT_MAX_DIM: u32 = 640;
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

// 比例保留两位小数
const RATIO_STEPS: f64 = 100.0;
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Error, Debug)]
pub enum ResizeError {
  #[error("图像尺寸为零: {height}x{width}")]
  ZeroDimension { height: u32, width: u32 },
  #[error("无效的限制参数: {0}")]
  InvalidLimit(String),
  #[error("重新编码失败: {0}")]
  Codec(#[from] CodecError),
}

/// 发送前对两个轴统一施加的缩放比例，取值 (0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleDecision {
  ratio: f64,
}

impl ScaleDecision {
  pub const IDENTITY: ScaleDecision = ScaleDecision { ratio: 1.0 };

  pub fn decide(
    byte_size_mb: f64,
    height: u32,
    width: u32,
    byte_limit_mb: f64,
    max_dim: u32,
  ) -> Result<Self, ResizeError> {
    if height == 0 || width == 0 {
      return Err(ResizeError::ZeroDimension { height, width });
    }
    if !(byte_limit_mb.is_finite() && byte_limit_mb > 0.0) {
      return Err(ResizeError::InvalidLimit(format!(
        "byte limit {byte_limit_mb} MB"
      )));
    }
    if max_dim == 0 {
      return Err(ResizeError::InvalidLimit("max dimension 0".to_string()));
    }
    if !(byte_size_mb.is_finite() && byte_size_mb >= 0.0) {
      return Err(ResizeError::InvalidLimit(format!(
        "byte size {byte_size_mb} MB"
      )));
    }

    let size_ratio = byte_limit_mb / byte_size_mb;
    let height_ratio = max_dim as f64 / height as f64;
    let width_ratio = max_dim as f64 / width as f64;
    let ratio = [size_ratio, height_ratio, width_ratio]
      .into_iter()
      .fold(1.0_f64, f64::min);

    let decision = ScaleDecision {
      ratio: fix_precision(ratio),
    };
    debug!(
      "缩放比例: 体积 {:.4}, 高 {:.4}, 宽 {:.4} -> {}",
      size_ratio, height_ratio, width_ratio, decision.ratio
    );
    Ok(decision)
  }

  pub fn ratio(&self) -> f64 {
    self.ratio
  }

  /// 比例为 1.0 时不做任何缩放
  pub fn is_identity(&self) -> bool {
    self.ratio >= 1.0
  }

  pub fn scaled(&self, height: u32, width: u32) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * self.ratio) as u32).max(1);
    (scale(height), scale(width))
  }
}

impl Default for ScaleDecision {
  fn default() -> Self {
    Self::IDENTITY
  }
}

/// 向下截断到两位小数，保证缩放后不超过尺寸上限；截断为零时保留原值
fn fix_precision(ratio: f64) -> f64 {
  // 29.0 / 100.0 * 100.0 == 28.999999999999996
  let steps = (ratio * RATIO_STEPS + RATIO_EPSILON).floor();
  let mut fixed = steps / RATIO_STEPS;
  if fixed > ratio {
    fixed = (steps - 1.0) / RATIO_STEPS;
  }
  if fixed > 0.0 { fixed } else { ratio }
}

/// 缩放并重新编码后的发送图像
#[derive(Debug, Clone)]
pub struct Prepared {
  pub image: SourceImage,
  pub decision: ScaleDecision,
}

#[derive(Debug, Clone, Copy)]
pub struct Resizer {
  byte_limit_mb: f64,
  quality: u8,
}

impl Default for Resizer {
  fn default() -> Self {
    Self {
      byte_limit_mb: DEFAULT_BYTE_LIMIT_MB,
      quality: DEFAULT_JPEG_QUALITY,
    }
  }
}

impl Resizer {
  pub fn new(byte_limit_mb: f64, quality: u8) -> Self {
    Self {
      byte_limit_mb,
      quality,
    }
  }

  pub fn byte_limit_mb(&self) -> f64 {
    self.byte_limit_mb
  }

  pub fn quality(&self) -> u8 {
    self.quality
  }

  pub fn decide(&self, source: &SourceImage, max_dim: u32) -> Result<ScaleDecision, ResizeError> {
    ScaleDecision::decide(
      source.size_mb(),
      source.height(),
      source.width(),
      self.byte_limit_mb,
      max_dim,
    )
  }

  /// 按比例缩放；比例为 1.0 时原样返回字节
  pub fn apply(&self, source: SourceImage, decision: ScaleDecision) -> Result<Prepared, ResizeError> {
    if decision.is_identity() {
      debug!("图像已满足限制，不做缩放");
      return Ok(Prepared {
        image: source,
        decision,
      });
    }

    let (bytes_before, raster, origin) = source.into_parts();
    let (height, width) = decision.scaled(raster.height(), raster.width());
    let resized = imageops::resize(&raster, width, height, FilterType::Triangle);
    let bytes = codec::encode(
      &resized,
      EncodeFormat::Jpeg {
        quality: self.quality,
      },
    )?;

    info!(
      "图像缩放 {}: {}x{} -> {}x{}, {} -> {} 字节",
      decision.ratio,
      raster.width(),
      raster.height(),
      width,
      height,
      bytes_before.len(),
      bytes.len()
    );

    Ok(Prepared {
      image: SourceImage::from_parts(bytes, resized, origin),
      decision,
    })
  }

  pub fn prepare(&self, source: SourceImage, max_dim: u32) -> Result<Prepared, ResizeError> {
    let decision = self.decide(&source, max_dim)?;
    self.apply(source, decision)
  }
}

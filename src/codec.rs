// 该文件是 Kanjian （看见） 项目的一部分。
// src/codec.rs - 图像解码、通道归一化与编码
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

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;
use tracing::debug;

pub const RGB_CHANNELS: u8 = 3;

#[derive(Error, Debug)]
pub enum CodecError {
  #[error("图像解码错误: {0}")]
  Decode(image::ImageError),
  #[error("不支持的通道数: {0}")]
  UnsupportedChannels(u8),
  #[error("图像编码错误: {0}")]
  Encode(image::ImageError),
}

/// 输出编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
  Jpeg { quality: u8 },
  Png,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
  image::load_from_memory(bytes).map_err(CodecError::Decode)
}

/// 统一转换为三通道 RGB：四通道丢弃透明度，单通道灰度扩展
pub fn normalize(image: DynamicImage) -> Result<RgbImage, CodecError> {
  let channels = image.color().channel_count();
  match channels {
    1 | 4 => {
      debug!("通道归一化: {} -> {}", channels, RGB_CHANNELS);
      Ok(image.to_rgb8())
    }
    3 => Ok(image.into_rgb8()),
    other => Err(CodecError::UnsupportedChannels(other)),
  }
}

pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, CodecError> {
  normalize(decode(bytes)?)
}

pub fn encode(image: &RgbImage, format: EncodeFormat) -> Result<Vec<u8>, CodecError> {
  let mut buffer = Cursor::new(Vec::new());
  match format {
    EncodeFormat::Jpeg { quality } => {
      let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
      image
        .write_with_encoder(encoder)
        .map_err(CodecError::Encode)?;
    }
    EncodeFormat::Png => {
      image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(CodecError::Encode)?;
    }
  }
  Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GrayAlphaImage, GrayImage, LumaA, Rgb, RgbaImage};

  fn png_bytes(image: DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
  }

  #[test]
  fn malformed_bytes_fail_to_decode() {
    let result = decode(b"definitely not an image");
    assert!(matches!(result, Err(CodecError::Decode(_))));
  }

  #[test]
  fn rgba_drops_alpha() {
    let rgba = RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 0]));
    let rgb = decode_rgb(&png_bytes(DynamicImage::ImageRgba8(rgba))).unwrap();
    assert_eq!(rgb.dimensions(), (4, 2));
    assert_eq!(*rgb.get_pixel(0, 0), Rgb([10, 20, 30]));
  }

  #[test]
  fn grayscale_expands_to_three_channels() {
    let gray = GrayImage::from_pixel(3, 3, image::Luma([77]));
    let rgb = normalize(DynamicImage::ImageLuma8(gray)).unwrap();
    assert_eq!(*rgb.get_pixel(1, 1), Rgb([77, 77, 77]));
  }

  #[test]
  fn rgb_passes_through() {
    let src = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
    let out = normalize(DynamicImage::ImageRgb8(src.clone())).unwrap();
    assert_eq!(out, src);
  }

  #[test]
  fn luma_alpha_is_unsupported() {
    let la = GrayAlphaImage::from_pixel(2, 2, LumaA([5, 255]));
    let result = normalize(DynamicImage::ImageLumaA8(la));
    assert!(matches!(result, Err(CodecError::UnsupportedChannels(2))));
  }

  #[test]
  fn jpeg_encode_is_repeatable() {
    let src = RgbImage::from_fn(16, 8, |x, y| Rgb([(x * 10) as u8, (y * 20) as u8, 128]));
    let format = EncodeFormat::Jpeg { quality: 70 };
    let a = encode(&src, format).unwrap();
    let b = encode(&src, format).unwrap();
    assert_eq!(a, b);
    assert_eq!(decode_rgb(&a).unwrap().dimensions(), (16, 8));
  }

  #[test]
  fn png_encode_is_lossless() {
    let src = RgbImage::from_fn(5, 7, |x, y| Rgb([x as u8, y as u8, 9]));
    let bytes = encode(&src, EncodeFormat::Png).unwrap();
    assert_eq!(decode_rgb(&bytes).unwrap(), src);
  }
}

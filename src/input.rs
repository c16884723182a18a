// 该文件是 Kanjian （看见） 项目的一部分。
// src/input.rs - 源图像输入
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

use image::RgbImage;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl,
  codec::{self, CodecError, RGB_CHANNELS},
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub trait ImageSource {
  type Error;
  fn fetch(&self) -> Result<SourceImage, Self::Error>;
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "http_input")]
mod http_input;
#[cfg(feature = "http_input")]
pub use self::http_input::{HttpImageInput, HttpImageInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "http_input")]
  #[error("HTTP image input error: {0}")]
  HttpImageInputError(#[from] HttpImageInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 一次请求的源图像：原始字节与归一化后的 RGB 栅格
#[derive(Debug, Clone)]
pub struct SourceImage {
  bytes: Vec<u8>,
  raster: RgbImage,
  origin: Url,
}

impl SourceImage {
  /// 解码并归一化为三通道
  pub fn from_bytes(bytes: Vec<u8>, origin: Url) -> Result<Self, CodecError> {
    let raster = codec::decode_rgb(&bytes)?;
    debug!(
      "源图像 {}: {}x{}, {} 字节",
      origin,
      raster.width(),
      raster.height(),
      bytes.len()
    );
    Ok(Self {
      bytes,
      raster,
      origin,
    })
  }

  pub(crate) fn from_parts(bytes: Vec<u8>, raster: RgbImage, origin: Url) -> Self {
    Self {
      bytes,
      raster,
      origin,
    }
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn raster(&self) -> &RgbImage {
    &self.raster
  }

  pub fn origin(&self) -> &Url {
    &self.origin
  }

  pub fn byte_len(&self) -> usize {
    self.bytes.len()
  }

  pub fn size_mb(&self) -> f64 {
    self.bytes.len() as f64 / BYTES_PER_MB
  }

  pub fn height(&self) -> u32 {
    self.raster.height()
  }

  pub fn width(&self) -> u32 {
    self.raster.width()
  }

  pub fn channels(&self) -> u8 {
    RGB_CHANNELS
  }

  pub fn into_parts(self) -> (Vec<u8>, RgbImage, Url) {
    (self.bytes, self.raster, self.origin)
  }
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "http_input")]
  HttpImage(HttpImageInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "http_input")]
    {
      if HttpImageInput::accepts(url) {
        let input = HttpImageInput::from_url(url)?;
        return Ok(InputWrapper::HttpImage(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl ImageSource for InputWrapper {
  type Error = InputError;

  fn fetch(&self) -> Result<SourceImage, Self::Error> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.fetch().map_err(InputError::from),
      #[cfg(feature = "http_input")]
      InputWrapper::HttpImage(input) => input.fetch().map_err(InputError::from),
    }
  }
}

impl ImageSource for SourceImage {
  type Error = InputError;

  fn fetch(&self) -> Result<SourceImage, Self::Error> {
    Ok(self.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::{EncodeFormat, encode};
  use image::Rgb;

  #[test]
  fn source_image_reports_shape_and_size() {
    let raster = RgbImage::from_pixel(30, 20, Rgb([1, 2, 3]));
    let bytes = encode(&raster, EncodeFormat::Png).unwrap();
    let len = bytes.len();
    let origin = Url::parse("file:///tmp/a.png").unwrap();
    let image = SourceImage::from_bytes(bytes, origin.clone()).unwrap();
    assert_eq!(image.height(), 20);
    assert_eq!(image.width(), 30);
    assert_eq!(image.channels(), 3);
    assert_eq!(image.byte_len(), len);
    assert!((image.size_mb() - len as f64 / BYTES_PER_MB).abs() < 1e-12);
    assert_eq!(image.origin(), &origin);
  }

  #[test]
  fn garbage_bytes_are_a_decode_error() {
    let origin = Url::parse("file:///tmp/a.png").unwrap();
    let result = SourceImage::from_bytes(b"<html></html>".to_vec(), origin);
    assert!(matches!(result, Err(CodecError::Decode(_))));
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("ftp://example.com/cat.jpg").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}

// 该文件是 Kanjian （看见） 项目的一部分。
// src/input/http_input.rs - HTTP 图像下载
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

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl,
  codec::CodecError,
  input::{ImageSource, SourceImage},
};

const HTTP_SCHEMES: [&str; 2] = ["http", "https"];

#[derive(Error, Debug)]
pub enum HttpImageInputError {
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("Request error: {0}")]
  Request(#[from] reqwest::Error),
  #[error("Unexpected HTTP status {0}")]
  Status(u16),
  #[error("Not an image: content type '{0}'")]
  NotAnImage(String),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] CodecError),
}

pub struct HttpImageInput {
  url: Url,
  client: Client,
}

impl HttpImageInput {
  pub fn accepts(url: &Url) -> bool {
    HTTP_SCHEMES.contains(&url.scheme())
  }
}

impl FromUrl for HttpImageInput {
  type Error = HttpImageInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !Self::accepts(url) {
      return Err(HttpImageInputError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(HttpImageInput {
      url: url.clone(),
      client: Client::new(),
    })
  }
}

/// 仅当响应声明了非 image/* 的类型时才拒绝，缺省类型交给解码器判断
fn is_image_content(content_type: Option<&str>) -> bool {
  content_type
    .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    .unwrap_or(true)
}

impl ImageSource for HttpImageInput {
  type Error = HttpImageInputError;

  fn fetch(&self) -> Result<SourceImage, Self::Error> {
    info!("下载图像: {}", self.url);
    let response = self.client.get(self.url.clone()).send()?;

    let status = response.status();
    if !status.is_success() {
      warn!("图像下载失败: {} -> {}", self.url, status);
      return Err(HttpImageInputError::Status(status.as_u16()));
    }

    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    if !is_image_content(content_type.as_deref()) {
      let content_type = content_type.unwrap_or_default();
      warn!("非图像内容: {} ({})", self.url, content_type);
      return Err(HttpImageInputError::NotAnImage(content_type));
    }

    let bytes = response.bytes()?.to_vec();
    debug!("下载完成: {} 字节", bytes.len());

    Ok(SourceImage::from_bytes(bytes, self.url.clone())?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_only_http_schemes() {
    assert!(HttpImageInput::accepts(&Url::parse("https://a.b/c.jpg").unwrap()));
    assert!(HttpImageInput::accepts(&Url::parse("http://a.b/c.jpg").unwrap()));
    assert!(!HttpImageInput::accepts(&Url::parse("file:///c.jpg").unwrap()));
    assert!(matches!(
      HttpImageInput::from_url(&Url::parse("file:///c.jpg").unwrap()),
      Err(HttpImageInputError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn content_type_check() {
    assert!(is_image_content(Some("image/jpeg")));
    assert!(is_image_content(Some("Image/PNG")));
    assert!(is_image_content(None));
    assert!(!is_image_content(Some("text/html; charset=utf-8")));
  }
}

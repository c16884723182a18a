// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/save_reply_file.rs - 保存回复到文件
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, Reply},
};

/// 图片写入 URL 指定路径，文本写入同名 `.txt`
pub struct SaveReplyFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum SaveReplyFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的文件路径: {0}")]
  InvalidPath(String),
}

impl FromUrlWithScheme for SaveReplyFileOutput {
  const SCHEME: &'static str = "file";
}

impl FromUrl for SaveReplyFileOutput {
  type Error = SaveReplyFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveReplyFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = uri
      .to_file_path()
      .map_err(|_| SaveReplyFileError::InvalidPath(uri.to_string()))?;
    Ok(SaveReplyFileOutput { path })
  }
}

impl SaveReplyFileOutput {
  pub fn text_path(&self) -> PathBuf {
    self.path.with_extension("txt")
  }

  fn ensure_parent(&self) -> Result<(), SaveReplyFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    Ok(())
  }
}

impl Render<Reply> for SaveReplyFileOutput {
  type Error = SaveReplyFileError;

  fn render_result(&self, result: &Reply) -> Result<(), Self::Error> {
    self.ensure_parent()?;

    if let Some(attachment) = &result.attachment {
      std::fs::write(&self.path, &attachment.bytes)?;
      warn!("保存标注图像到文件: {}", self.path.display());
    }

    let text_path = self.text_path();
    std::fs::write(&text_path, &result.text)?;
    warn!("保存回复文本到文件: {}", text_path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::{Attachment, OutputMode};

  #[test]
  fn writes_image_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("out.png");
    let output = SaveReplyFileOutput::from_url(&Url::from_file_path(&path).unwrap()).unwrap();

    let reply = Reply {
      mode: OutputMode::Both,
      text: "hello".to_string(),
      attachment: Some(Attachment {
        filename: "detect_res.png".to_string(),
        bytes: vec![1, 2, 3],
      }),
    };
    output.render_result(&reply).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    assert_eq!(std::fs::read_to_string(path.with_extension("txt")).unwrap(), "hello");
  }

  #[test]
  fn error_reply_writes_text_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    let output = SaveReplyFileOutput::from_url(&Url::from_file_path(&path).unwrap()).unwrap();
    output.render_result(&Reply::error("Error: boom")).unwrap();

    assert!(!path.exists());
    assert_eq!(std::fs::read_to_string(output.text_path()).unwrap(), "Error: boom");
  }
}

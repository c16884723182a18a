// 该文件是 Kanjian （看见） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  codec::CodecError,
  input::SourceImage,
  model::Detection,
  resize::ScaleDecision,
};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;
pub mod report;

pub use self::draw::{Annotator, LabeledBox};
pub use self::report::ResultFormatter;

#[cfg(feature = "save_reply_file")]
mod save_reply_file;
#[cfg(feature = "save_reply_file")]
pub use self::save_reply_file::{SaveReplyFileError, SaveReplyFileOutput};

mod console_output;
pub use self::console_output::ConsoleOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("图像编码错误: {0}")]
  Codec(#[from] CodecError),
  #[cfg(feature = "save_reply_file")]
  #[error("保存回复文件错误: {0}")]
  SaveReplyFileError(#[from] SaveReplyFileError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 一次回复需要产出的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
  ImageOnly,
  TextOnly,
  Both,
  ErrorOnly,
}

impl OutputMode {
  /// 既不要图也不要文字时仍然输出标注图
  pub fn from_flags(produce_image: bool, produce_text: bool) -> Self {
    match (produce_image, produce_text) {
      (true, true) => OutputMode::Both,
      (false, true) => OutputMode::TextOnly,
      (_, false) => OutputMode::ImageOnly,
    }
  }

  pub fn wants_image(&self) -> bool {
    matches!(self, OutputMode::ImageOnly | OutputMode::Both)
  }

  pub fn wants_text(&self) -> bool {
    matches!(self, OutputMode::TextOnly | OutputMode::Both)
  }
}

/// 单次渲染所需的全部数据，由一次用户请求独占
#[derive(Debug, Clone)]
pub struct RenderRequest {
  /// 实际送去推理的（缩放后）图像
  pub image: SourceImage,
  pub detections: Vec<Detection>,
  pub message: String,
  pub mode: OutputMode,
  pub decision: ScaleDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
  pub filename: String,
  pub bytes: Vec<u8>,
}

/// 交给聊天层的回复：文本加可选的单个图片附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
  pub mode: OutputMode,
  pub text: String,
  pub attachment: Option<Attachment>,
}

impl Reply {
  pub fn error(text: impl Into<String>) -> Self {
    Reply {
      mode: OutputMode::ErrorOnly,
      text: text.into(),
      attachment: None,
    }
  }

  pub fn is_error(&self) -> bool {
    self.mode == OutputMode::ErrorOnly
  }
}

pub enum OutputWrapper {
  #[cfg(feature = "save_reply_file")]
  SaveReplyFileOutput(SaveReplyFileOutput),
  ConsoleOutput(ConsoleOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_reply_file")]
      SaveReplyFileOutput::SCHEME => {
        let output = SaveReplyFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveReplyFileOutput(output))
      }
      ConsoleOutput::SCHEME => Ok(OutputWrapper::ConsoleOutput(ConsoleOutput::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<Reply> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &Reply) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_reply_file")]
      OutputWrapper::SaveReplyFileOutput(output) => {
        output.render_result(result).map_err(OutputError::from)
      }
      OutputWrapper::ConsoleOutput(output) => {
        output.render_result(result);
        Ok(())
      }
    }
  }
}

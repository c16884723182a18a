// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/console_output.rs - 终端输出
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

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{OutputError, Reply},
};

/// 只打印回复文本，附件仅记录大小
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for ConsoleOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  pub fn render_result(&self, result: &Reply) {
    if let Some(attachment) = &result.attachment {
      info!(
        "附件 {}: {} 字节（终端输出不展示图片）",
        attachment.filename,
        attachment.bytes.len()
      );
    }
    println!("{}", result.text);
  }
}

// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/recorded.rs - 读取已保存的推理响应
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

use std::path::PathBuf;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{InferenceOutcome, InferenceRequest, Model, ModelError, parse_response},
};

/// 离线模型：忽略输入图像，返回文件中记录的响应体（视为 HTTP 200）
pub struct RecordedModel {
  path: PathBuf,
}

impl FromUrlWithScheme for RecordedModel {
  const SCHEME: &'static str = "file";
}

impl FromUrl for RecordedModel {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "记录文件必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = url
      .to_file_path()
      .map_err(|_| ModelError::ModelPathError(url.to_string()))?;
    Ok(RecordedModel { path })
  }
}

impl Model for RecordedModel {
  type Input = InferenceRequest;
  type Output = InferenceOutcome;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    info!(
      "读取记录的推理响应: {} (输入 {} 字节)",
      self.path.display(),
      input.image.len()
    );
    let body = std::fs::read_to_string(&self.path)?;
    parse_response(200, "OK", &body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::InferenceParams;

  #[test]
  fn replays_response_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("response.json");
    std::fs::write(
      &path,
      r#"{"data": [{"name": "dog", "confidence": 0.9, "class": 16,
        "xcenter": 0.5, "ycenter": 0.5, "width": 0.2, "height": 0.2}],
        "message": "ok", "success": true}"#,
    )
    .unwrap();

    let model = RecordedModel::from_url(&Url::from_file_path(&path).unwrap()).unwrap();
    let input = InferenceRequest {
      image: Vec::new(),
      params: InferenceParams::default(),
    };
    let InferenceOutcome::Predictions(response) = model.infer(&input).unwrap() else {
      panic!("expected predictions");
    };
    assert_eq!(response.data[0].name, "dog");
  }

  #[test]
  fn missing_file_is_io_error() {
    let model = RecordedModel::from_url(&Url::parse("file:///no/such/response.json").unwrap()).unwrap();
    let input = InferenceRequest {
      image: Vec::new(),
      params: InferenceParams::default(),
    };
    assert!(matches!(model.infer(&input), Err(ModelError::IoError(_))));
  }
}

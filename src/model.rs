// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 远端推理服务与检测结果
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

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::FromUrl;

pub mod bbox;
pub use self::bbox::{NormBox, PixelBox};

#[cfg(feature = "hub_model")]
mod hub;
#[cfg(feature = "hub_model")]
pub use self::hub::{HubModel, HubModelBuilder};

mod recorded;
pub use self::recorded::RecordedModel;

pub const DEFAULT_CONFIDENCE: f64 = 0.35;
pub const DEFAULT_IOU: f64 = 0.45;
pub const DEFAULT_SIZE: u32 = 640;
pub const DEFAULT_MODEL: &str = "yolov8n";

static MODEL_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)^yolov[58][nsmlx]").expect("模型名称正则无效"));

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[cfg(feature = "hub_model")]
  #[error("请求错误: {0}")]
  Request(#[from] reqwest::Error),
  #[error("响应格式错误 (HTTP {status}): {source}")]
  MalformedResponse {
    status: u16,
    source: serde_json::Error,
  },
  #[error("检测结果无效: {0}")]
  MalformedDetection(String),
  #[error("推理参数无效: {0}")]
  InvalidParams(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDetection")]
pub struct Detection {
  pub name: String,
  pub confidence: f64,
  pub class_index: usize,
  pub bbox: NormBox,
}

// 服务端原始字段，缺少任何一个都视为错误
#[derive(Deserialize)]
struct RawDetection {
  name: String,
  confidence: f64,
  class: usize,
  xcenter: f64,
  ycenter: f64,
  width: f64,
  height: f64,
}

impl TryFrom<RawDetection> for Detection {
  type Error = ModelError;

  fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
    Detection::new(
      raw.name,
      raw.confidence,
      raw.class,
      NormBox::new(raw.xcenter, raw.ycenter, raw.width, raw.height),
    )
  }
}

impl Detection {
  pub fn new(
    name: impl Into<String>,
    confidence: f64,
    class_index: usize,
    bbox: NormBox,
  ) -> Result<Self, ModelError> {
    let name = name.into();
    if !(0.0..=1.0).contains(&confidence) {
      return Err(ModelError::MalformedDetection(format!(
        "{name}: 置信度 {confidence} 超出 [0, 1]"
      )));
    }
    if !bbox.is_valid() {
      return Err(ModelError::MalformedDetection(format!(
        "{name}: 检测框无效 {bbox:?}"
      )));
    }
    Ok(Self {
      name,
      confidence,
      class_index,
      bbox,
    })
  }
}

/// 推理服务响应体
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InferenceResponse {
  pub data: Vec<Detection>,
  pub message: String,
  pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
  Predictions(InferenceResponse),
  Failure { status: u16, reason: String },
}

impl InferenceOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(self, InferenceOutcome::Failure { .. })
  }
}

/// 按状态码与响应体得到推理结果：非 2xx 或 success 为 false 时视为上游失败
pub fn parse_response(status: u16, reason: &str, body: &str) -> Result<InferenceOutcome, ModelError> {
  if !(200..300).contains(&status) {
    warn!("推理服务返回 {} - {}", status, reason);
    return Ok(InferenceOutcome::Failure {
      status,
      reason: reason.to_string(),
    });
  }

  let response: InferenceResponse = serde_json::from_str(body)
    .map_err(|source| ModelError::MalformedResponse { status, source })?;

  if !response.success {
    warn!("推理服务报告失败: {}", response.message);
    return Ok(InferenceOutcome::Failure {
      status,
      reason: response.message,
    });
  }

  debug!("检测到 {} 个物体", response.data.len());
  Ok(InferenceOutcome::Predictions(response))
}

/// 推理请求参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceParams {
  pub confidence: f64,
  pub iou: f64,
  pub size: u32,
  pub model: String,
}

impl Default for InferenceParams {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      iou: DEFAULT_IOU,
      size: DEFAULT_SIZE,
      model: DEFAULT_MODEL.to_string(),
    }
  }
}

impl InferenceParams {
  pub fn validate(&self) -> Result<(), ModelError> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(ModelError::InvalidParams(format!(
        "confidence {}",
        self.confidence
      )));
    }
    if !(0.0..=1.0).contains(&self.iou) {
      return Err(ModelError::InvalidParams(format!("iou {}", self.iou)));
    }
    if self.size == 0 {
      return Err(ModelError::InvalidParams("size 0".to_string()));
    }
    Ok(())
  }

  pub fn with_model(mut self, model: &str) -> Self {
    self.model = normalize_model_name(model);
    self
  }
}

/// 一次推理的输入：已按限制编码好的图像字节与参数
#[derive(Debug, Clone)]
pub struct InferenceRequest {
  pub image: Vec<u8>,
  pub params: InferenceParams,
}

pub fn is_link(text: &str) -> bool {
  let lower = text.to_ascii_lowercase();
  ["http://", "https://", "www."]
    .iter()
    .any(|prefix| lower.starts_with(prefix))
}

/// 规范化模型名称：链接原样返回；否则补全为 yolov{5|8}{n|s|m|l|x}
pub fn normalize_model_name(model: &str) -> String {
  if is_link(model) {
    return model.to_string();
  }

  if let Some(m) = MODEL_PATTERN.find(model) {
    return m.as_str().to_ascii_lowercase();
  }

  let version = match model.chars().find(|c| c.is_ascii_digit()) {
    Some(c @ ('5' | '8')) => c,
    _ => '8',
  };
  let size = model
    .chars()
    .last()
    .map(|c| c.to_ascii_lowercase())
    .filter(|c| "nsmlx".contains(*c))
    .unwrap_or('n');
  format!("yolov{version}{size}")
}

pub enum ModelWrapper {
  #[cfg(feature = "hub_model")]
  Hub(HubModel),
  Recorded(RecordedModel),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    use crate::FromUrlWithScheme;

    if url.scheme() == RecordedModel::SCHEME {
      return Ok(ModelWrapper::Recorded(RecordedModel::from_url(url)?));
    }
    #[cfg(feature = "hub_model")]
    {
      if HubModelBuilder::accepts(url) {
        return Ok(ModelWrapper::Hub(HubModelBuilder::from_url(url)?.build()));
      }
    }
    Err(ModelError::ModelPathError(format!(
      "不支持的模型地址: {url}"
    )))
  }
}

impl ModelWrapper {
  pub fn api_key(self, key: Option<String>) -> Self {
    match self {
      #[cfg(feature = "hub_model")]
      ModelWrapper::Hub(model) => ModelWrapper::Hub(model.with_api_key(key)),
      other => other,
    }
  }
}

impl Model for ModelWrapper {
  type Input = InferenceRequest;
  type Output = InferenceOutcome;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      #[cfg(feature = "hub_model")]
      ModelWrapper::Hub(model) => model.infer(input),
      ModelWrapper::Recorded(model) => model.infer(input),
    }
  }
}

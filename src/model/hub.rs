// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/hub.rs - 远端推理服务客户端
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

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  model::{InferenceOutcome, InferenceRequest, Model, ModelError, parse_response},
};

const HUB_SCHEMES: [&str; 2] = ["http", "https"];

// 服务端要求数值以字符串形式提交
#[derive(Serialize)]
struct HubRequest<'a> {
  confidence: String,
  iou: String,
  size: String,
  model: &'a str,
  key: Option<&'a str>,
  image: String,
}

impl<'a> HubRequest<'a> {
  fn new(input: &'a InferenceRequest, key: Option<&'a str>) -> Self {
    HubRequest {
      confidence: input.params.confidence.to_string(),
      iou: input.params.iou.to_string(),
      size: input.params.size.to_string(),
      model: &input.params.model,
      key,
      image: STANDARD.encode(&input.image),
    }
  }
}

pub struct HubModelBuilder {
  endpoint: Url,
}

impl HubModelBuilder {
  pub fn accepts(url: &Url) -> bool {
    HUB_SCHEMES.contains(&url.scheme())
  }

  pub fn build(self) -> HubModel {
    info!("推理服务地址: {}", self.endpoint);
    HubModel {
      endpoint: self.endpoint,
      api_key: None,
      client: Client::new(),
    }
  }
}

impl FromUrl for HubModelBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !Self::accepts(url) {
      return Err(ModelError::ModelPathError(format!(
        "推理服务地址必须使用 http 或 https 方案: {url}"
      )));
    }

    Ok(HubModelBuilder {
      endpoint: url.clone(),
    })
  }
}

pub struct HubModel {
  endpoint: Url,
  api_key: Option<String>,
  client: Client,
}

impl HubModel {
  pub fn with_api_key(mut self, key: Option<String>) -> Self {
    self.api_key = key;
    self
  }
}

impl Model for HubModel {
  type Input = InferenceRequest;
  type Output = InferenceOutcome;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let request = HubRequest::new(input, self.api_key.as_deref());
    debug!(
      "提交推理请求: 模型 {}, 尺寸 {}, 图像 {} 字节",
      request.model,
      request.size,
      input.image.len()
    );

    let response = self
      .client
      .post(self.endpoint.clone())
      .json(&request)
      .send()?;

    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
    let body = response.text()?;
    debug!("推理服务响应: {} ({} 字节)", status, body.len());

    parse_response(status.as_u16(), &reason, &body)
  }
}

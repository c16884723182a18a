// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 单次检测请求的处理流程
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
use tracing::{error, info};

use crate::{
  codec::CodecError,
  config::{ConfigError, Settings},
  input::{ImageSource, InputError},
  model::{InferenceOutcome, InferenceParams, InferenceRequest, Model, ModelError},
  output::{
    Annotator, OutputError, OutputMode, Render, Reply, ResultFormatter,
    report::{GENERIC_ERROR_MESSAGE, IMAGE_ERROR_MESSAGE, api_error_message},
  },
  palette::PaletteError,
  resize::{ResizeError, Resizer},
};

// 请求未得到响应时的原因，不附带地址等内部信息
#[cfg(feature = "hub_model")]
const NO_RESPONSE_REASON: &str = "no response from inference service";

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("图像编解码错误: {0}")]
  Codec(#[from] CodecError),
  #[error("缩放错误: {0}")]
  Resize(#[from] ResizeError),
  #[error("推理错误: {0}")]
  Model(#[from] ModelError),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
  #[error("调色板错误: {0}")]
  Palette(#[from] PaletteError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

impl PipelineError {
  /// 回复给用户的文本，前置条件错误不透露细节
  pub fn user_message(&self) -> String {
    match self {
      PipelineError::Input(_) | PipelineError::Codec(CodecError::Decode(_)) => {
        IMAGE_ERROR_MESSAGE.to_string()
      }
      PipelineError::Model(ModelError::MalformedResponse { status, .. }) => {
        api_error_message(status, "malformed response body")
      }
      #[cfg(feature = "hub_model")]
      PipelineError::Model(ModelError::Request(e)) => match e.status() {
        Some(status) => api_error_message(
          status.as_u16(),
          status.canonical_reason().unwrap_or(NO_RESPONSE_REASON),
        ),
        None => api_error_message("N/A", NO_RESPONSE_REASON),
      },
      _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
  }
}

/// 取图、缩放、推理、渲染；每个请求独立，无共享可变状态
#[derive(Debug, Clone)]
pub struct PredictTask {
  resizer: Resizer,
  formatter: ResultFormatter,
  params: InferenceParams,
  mode: OutputMode,
}

impl PredictTask {
  pub fn new(
    resizer: Resizer,
    formatter: ResultFormatter,
    params: InferenceParams,
    mode: OutputMode,
  ) -> Self {
    Self {
      resizer,
      formatter,
      params,
      mode,
    }
  }

  pub fn from_settings(settings: &Settings, mode: OutputMode) -> Result<Self, ConfigError> {
    settings.validate()?;
    Ok(Self::new(
      settings.resizer(),
      ResultFormatter::new(Annotator::new(settings.palette()?)),
      settings.inference.clone(),
      mode,
    ))
  }

  pub fn params(&self) -> &InferenceParams {
    &self.params
  }

  pub fn mode(&self) -> OutputMode {
    self.mode
  }

  pub fn try_reply<I, M>(&self, input: &I, model: &M) -> Result<Reply, PipelineError>
  where
    I: ImageSource,
    I::Error: Into<PipelineError>,
    M: Model<Input = InferenceRequest, Output = InferenceOutcome>,
    M::Error: Into<PipelineError>,
  {
    let source = input.fetch().map_err(Into::<PipelineError>::into)?;
    info!(
      "获取图像成功: {} ({}x{}, {} 字节)",
      source.origin(),
      source.width(),
      source.height(),
      source.byte_len()
    );

    let prepared = self.resizer.prepare(source, self.params.size)?;
    let request = InferenceRequest {
      image: prepared.image.bytes().to_vec(),
      params: self.params.clone(),
    };

    let now = std::time::Instant::now();
    let outcome = model.infer(&request).map_err(Into::<PipelineError>::into)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let reply = self
      .formatter
      .respond(prepared.image, self.mode, prepared.decision, outcome)?;
    Ok(reply)
  }

  /// 总是给出回复；出错时回复文本为对应的错误信息
  pub fn reply<I, M>(&self, input: &I, model: &M) -> Reply
  where
    I: ImageSource,
    I::Error: Into<PipelineError>,
    M: Model<Input = InferenceRequest, Output = InferenceOutcome>,
    M::Error: Into<PipelineError>,
  {
    match self.try_reply(input, model) {
      Ok(reply) => reply,
      Err(e) => {
        error!("请求处理失败: {}", e);
        Reply::error(e.user_message())
      }
    }
  }
}

impl<I, M, O> Task<I, M, O> for PredictTask
where
  I: ImageSource,
  I::Error: Into<PipelineError>,
  M: Model<Input = InferenceRequest, Output = InferenceOutcome>,
  M::Error: Into<PipelineError>,
  O: Render<Reply>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let reply = self.reply(&input, &model);
    output.render_result(&reply)?;
    info!("任务完成: {:?}", reply.mode);
    Ok(())
  }
}

// 该文件是 Kanjian （看见） 项目的一部分。
// src/bin/predict.rs - 单张图像检测
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use kanjian::{
  FromUrl,
  config::Settings,
  input::InputWrapper,
  model::ModelWrapper,
  output::{OutputMode, OutputWrapper},
  task::{PredictTask, Task},
};

/// Kanjian 检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 图像来源（http(s):// 或 file://）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 推理服务地址，file:// 时读取记录的响应
  #[arg(long, value_name = "ENDPOINT")]
  pub endpoint: Url,

  /// 输出位置（file:// 或 stdout:）
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,

  /// YAML 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub conf: Option<f64>,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub iou: Option<f64>,

  /// 推理尺寸，同时是缩放的最长边上限
  #[arg(long, value_name = "PIXELS")]
  pub size: Option<u32>,

  /// 模型名称，如 yolov8n、5s 或模型链接
  #[arg(long, value_name = "MODEL")]
  pub model: Option<String>,

  /// 输出标注图像
  #[arg(long)]
  pub show: bool,

  /// 输出检测结果表
  #[arg(long)]
  pub text: bool,
}

impl Args {
  fn settings(&self) -> Result<Settings> {
    let mut settings = match &self.config {
      Some(path) => Settings::from_path(path)?,
      None => Settings::default(),
    };

    let inference = &mut settings.inference;
    if let Some(conf) = self.conf {
      inference.confidence = conf;
    }
    if let Some(iou) = self.iou {
      inference.iou = iou;
    }
    if let Some(size) = self.size {
      inference.size = size;
    }
    if let Some(model) = &self.model {
      *inference = inference.clone().with_model(model);
    }

    settings.validate()?;
    Ok(settings)
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("推理服务: {}", args.endpoint);
  info!("输出位置: {}", args.output);

  let settings = args.settings()?;
  let mode = OutputMode::from_flags(args.show, args.text);
  info!("推理参数: {:?}, 输出模式: {:?}", settings.inference, mode);

  let input = InputWrapper::from_url(&args.input)?;
  let model = ModelWrapper::from_url(&args.endpoint)?.api_key(settings.api_key.clone());
  let output = OutputWrapper::from_url(&args.output)?;

  PredictTask::from_settings(&settings, mode)?.run_task(input, model, output)?;

  Ok(())
}

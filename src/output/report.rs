// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/report.rs - 检测结果文本报告与回复组装
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

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::{
  codec::{self, EncodeFormat},
  input::SourceImage,
  model::{Detection, InferenceOutcome, PixelBox},
  output::{
    Attachment, OutputError, OutputMode, RenderRequest, Reply,
    draw::{Annotator, LabeledBox},
  },
  resize::ScaleDecision,
};

/// 类名列在最长类名之外的留白
pub const CLASS_PADDING: usize = 2;
/// `(1234, 1234, 1234, 1234)`
pub const BOX_FIELD_WIDTH: usize = 24;
pub const ATTACHMENT_NAME: &str = "detect_res.png";

pub const IMAGE_ERROR_MESSAGE: &str =
  "Error occured when fetching image, check URL and try again.";
pub const GENERIC_ERROR_MESSAGE: &str =
  "Error: something went wrong while processing this request, please try again later.";

pub fn api_error_message(status: impl std::fmt::Display, reason: &str) -> String {
  format!("Error: API call failed with {status} - {reason}")
}

pub fn scale_notice(ratio: f64) -> String {
  format!(
    "**__NOTE:__** Results are for image scaled by `{ratio}` from original size, as required for inference.\n"
  )
}

/// 最长类名长度加留白；没有检测结果时只留白
pub fn class_column_width<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
  let distinct: BTreeSet<&str> = names.into_iter().collect();
  distinct
    .iter()
    .map(|name| name.chars().count())
    .max()
    .map_or(CLASS_PADDING, |longest| longest + CLASS_PADDING)
}

pub fn align_box(bbox: &PixelBox) -> String {
  format!(
    "({:>4}, {:>4}, {:>4}, {:>4})",
    bbox.x1, bbox.y1, bbox.x2, bbox.y2
  )
}

pub fn title_line(class_width: usize) -> String {
  format!(
    "{:<class_width$} {:<4}   {:<BOX_FIELD_WIDTH$}\n",
    "class", "conf", "x1y1x2y2"
  )
}

pub fn detection_line(name: &str, class_width: usize, confidence: f64, bbox: &PixelBox) -> String {
  format!(
    "{:<class_width$} {:.3}  {:<BOX_FIELD_WIDTH$}\n",
    name,
    confidence,
    align_box(bbox)
  )
}

/// 生成对齐的检测结果表，`boxes` 与 `detections` 一一对应
pub fn report_table(detections: &[Detection], boxes: &[PixelBox]) -> String {
  let width = class_column_width(detections.iter().map(|d| d.name.as_str()));
  let mut table = String::from("```\n");
  table.push_str(&title_line(width));
  for (detection, bbox) in detections.iter().zip(boxes) {
    table.push_str(&detection_line(
      &detection.name,
      width,
      detection.confidence,
      bbox,
    ));
  }
  table.push_str("```");
  table
}

/// 结果格式化：上游失败时只给出错误信息，否则按输出模式生成图片与文本
#[derive(Debug, Clone, Default)]
pub struct ResultFormatter {
  annotator: Annotator,
}

impl ResultFormatter {
  pub fn new(annotator: Annotator) -> Self {
    Self { annotator }
  }

  pub fn respond(
    &self,
    image: SourceImage,
    mode: OutputMode,
    decision: ScaleDecision,
    outcome: InferenceOutcome,
  ) -> Result<Reply, OutputError> {
    match outcome {
      InferenceOutcome::Failure { status, reason } => {
        warn!("上游失败，不生成图片: {} - {}", status, reason);
        Ok(Reply::error(api_error_message(status, &reason)))
      }
      InferenceOutcome::Predictions(response) => self.render(&RenderRequest {
        image,
        detections: response.data,
        message: response.message,
        mode,
        decision,
      }),
    }
  }

  pub fn render(&self, request: &RenderRequest) -> Result<Reply, OutputError> {
    let raster = request.image.raster();
    let boxes: Vec<PixelBox> = request
      .detections
      .iter()
      .map(|d| d.bbox.to_pixels(raster.height(), raster.width()))
      .collect();

    let text = self.format_text(request, &boxes);

    let attachment = if request.mode.wants_image() {
      let labeled: Vec<LabeledBox> = boxes
        .iter()
        .zip(&request.detections)
        .map(|(bbox, d)| LabeledBox {
          bbox: *bbox,
          class_index: d.class_index,
        })
        .collect();
      let annotated = self.annotator.draw(raster, &labeled);
      Some(Attachment {
        filename: ATTACHMENT_NAME.to_string(),
        bytes: codec::encode(&annotated, EncodeFormat::Png)?,
      })
    } else {
      None
    };

    info!(
      "回复生成完成: {:?}, {} 个检测结果",
      request.mode,
      request.detections.len()
    );

    Ok(Reply {
      mode: request.mode,
      text,
      attachment,
    })
  }

  fn format_text(&self, request: &RenderRequest, boxes: &[PixelBox]) -> String {
    let mut text = format!("{}\n", request.message);
    if !request.mode.wants_text() {
      return text;
    }

    let ratio = request.decision.ratio();
    if ratio != 1.0 {
      text.push_str(&scale_notice(ratio));
    }
    text.push_str(&report_table(&request.detections, boxes));
    text
  }
}

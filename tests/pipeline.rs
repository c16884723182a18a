// 该文件是 Kanjian （看见） 项目的一部分。
// tests/pipeline.rs - 离线端到端测试
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

#![cfg(all(feature = "read_image_file", feature = "save_reply_file"))]

use std::path::Path;

use image::{Rgb, RgbImage};
use url::Url;

use kanjian::{
  FromUrl,
  codec::{self, EncodeFormat},
  config::Settings,
  input::InputWrapper,
  model::ModelWrapper,
  output::{OutputMode, OutputWrapper, report::IMAGE_ERROR_MESSAGE},
  task::{PredictTask, Task},
};

const RESPONSE: &str = r#"{
  "data": [
    {"name": "cat", "confidence": 0.876543, "class": 15,
     "xcenter": 0.5, "ycenter": 0.5, "width": 0.5, "height": 0.5},
    {"name": "elephant", "confidence": 0.5, "class": 20,
     "xcenter": 0.25, "ycenter": 0.25, "width": 0.1, "height": 0.1}
  ],
  "message": "Inference complete.",
  "success": true
}"#;

fn write_image(path: &Path, width: u32, height: u32) {
  let raster = RgbImage::from_pixel(width, height, Rgb([30, 30, 30]));
  std::fs::write(path, codec::encode(&raster, EncodeFormat::Png).unwrap()).unwrap();
}

fn run(image: &Path, response: &Path, out: &Path, mode: OutputMode) {
  let settings = Settings::from_yaml_str("colors: ['#ff0000', '#00ff00']").unwrap();
  let input = InputWrapper::from_url(&Url::from_file_path(image).unwrap()).unwrap();
  let model = ModelWrapper::from_url(&Url::from_file_path(response).unwrap()).unwrap();
  let output = OutputWrapper::from_url(&Url::from_file_path(out).unwrap()).unwrap();
  PredictTask::from_settings(&settings, mode)
    .unwrap()
    .run_task(input, model, output)
    .unwrap();
}

#[test]
fn renders_image_and_table_to_files() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("in.png");
  let response = dir.path().join("response.json");
  let out = dir.path().join("reply").join("detect_res.png");
  write_image(&image, 200, 100);
  std::fs::write(&response, RESPONSE).unwrap();

  run(&image, &response, &out, OutputMode::Both);

  let text = std::fs::read_to_string(out.with_extension("txt")).unwrap();
  assert!(text.starts_with("Inference complete.\n```\n"));
  assert!(text.contains("cat        0.877  (  50,   25,  150,   75)"));
  assert!(text.contains("elephant   0.500"));
  assert!(!text.contains("NOTE"));

  let annotated = codec::decode_rgb(&std::fs::read(&out).unwrap()).unwrap();
  assert_eq!(annotated.dimensions(), (200, 100));
  // class 15 和 20 在两色调色板中分别落在 1 和 0
  assert_eq!(*annotated.get_pixel(50, 50), Rgb([0, 255, 0]));
}

#[test]
fn large_image_is_scaled_and_noted() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("in.png");
  let response = dir.path().join("response.json");
  let out = dir.path().join("detect_res.png");
  write_image(&image, 1280, 960);
  std::fs::write(&response, RESPONSE).unwrap();

  run(&image, &response, &out, OutputMode::TextOnly);

  let text = std::fs::read_to_string(out.with_extension("txt")).unwrap();
  assert!(text.contains("scaled by `0.5`"));
  assert!(text.contains("( 160,  120,  480,  360)"));
  assert!(!out.exists());
}

#[test]
fn unreadable_image_yields_fetch_error_reply() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("in.png");
  let response = dir.path().join("response.json");
  let out = dir.path().join("detect_res.png");
  std::fs::write(&image, b"<html>not an image</html>").unwrap();
  std::fs::write(&response, RESPONSE).unwrap();

  run(&image, &response, &out, OutputMode::Both);

  let text = std::fs::read_to_string(out.with_extension("txt")).unwrap();
  assert_eq!(text, IMAGE_ERROR_MESSAGE);
  assert!(!out.exists());
}

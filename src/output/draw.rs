// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::RgbImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::{
  model::PixelBox,
  palette::{Color, Palette},
};

// 线宽相对于最长边的比例与下限
const LINE_SCALE: f64 = 0.003;
const MIN_LINE_THICKNESS: u32 = 2;
const MAX_LINE_THICKNESS: i32 = 1 << 16;

/// 带类别索引的像素框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledBox {
  pub bbox: PixelBox,
  pub class_index: usize,
}

/// 按最长边计算线宽
pub fn line_thickness(height: u32, width: u32) -> u32 {
  let longest = height.max(width) as f64;
  ((longest * LINE_SCALE).round_ties_even() as u32).max(MIN_LINE_THICKNESS)
}

/// 检测框绘制器
#[derive(Debug, Clone, Default)]
pub struct Annotator {
  palette: Palette,
}

impl Annotator {
  pub fn new(palette: Palette) -> Self {
    Self { palette }
  }

  /// 在副本上按输入顺序绘制全部检测框，原图不变
  pub fn draw(&self, image: &RgbImage, boxes: &[LabeledBox]) -> RgbImage {
    let mut canvas = image.clone();
    let thickness = line_thickness(canvas.height(), canvas.width());
    debug!("绘制 {} 个检测框, 线宽 {}", boxes.len(), thickness);

    for LabeledBox { bbox, class_index } in boxes {
      if bbox.is_empty() {
        debug!("跳过零面积检测框: {:?}", bbox);
        continue;
      }
      let color = self.palette.color_for(*class_index);
      draw_thick_rect(&mut canvas, bbox, color, thickness);
    }

    canvas
  }
}

// 线宽在边框两侧平均展开，超出图像的部分由 imageproc 裁剪。
// 角点先收进图像外一圈线宽的范围，可见像素不变。
fn draw_thick_rect(image: &mut RgbImage, bbox: &PixelBox, color: Color, thickness: u32) {
  let thickness = i32::try_from(thickness).unwrap_or(i32::MAX).min(MAX_LINE_THICKNESS);
  let inner = -((thickness - 1) / 2);
  let outer = thickness / 2;

  let margin = thickness + 1;
  let limit = |dim: u32| i32::try_from(dim).unwrap_or(i32::MAX).saturating_add(margin);
  let (max_x, max_y) = (limit(image.width()), limit(image.height()));
  let x1 = bbox.x1.clamp(-margin, max_x);
  let y1 = bbox.y1.clamp(-margin, max_y);
  let x2 = bbox.x2.clamp(-margin, max_x);
  let y2 = bbox.y2.clamp(-margin, max_y);

  for offset in inner..=outer {
    let left = x1 - offset;
    let top = y1 - offset;
    let right = x2 + offset;
    let bottom = y2 + offset;
    if right < left || bottom < top {
      continue;
    }

    let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
    draw_hollow_rect_mut(image, rect, color);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  fn boxed(x1: i32, y1: i32, x2: i32, y2: i32, class_index: usize) -> LabeledBox {
    LabeledBox {
      bbox: PixelBox { x1, y1, x2, y2 },
      class_index,
    }
  }

  fn annotator() -> Annotator {
    Annotator::new(Palette::from_hex(&["#ff0000", "#00ff00"]).unwrap())
  }

  #[test]
  fn thickness_has_floor_and_scales() {
    assert_eq!(line_thickness(100, 100), 2);
    assert_eq!(line_thickness(10, 10), 2);
    assert_eq!(line_thickness(1000, 2000), 6);
    assert_eq!(line_thickness(5000, 300), 15);
  }

  #[test]
  fn draws_outline_without_touching_input() {
    let image = RgbImage::from_pixel(100, 100, BLACK);
    let out = annotator().draw(&image, &[boxed(10, 10, 50, 50, 0)]);

    assert_eq!(*out.get_pixel(10, 30), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(9, 30), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(50, 30), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(30, 10), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(30, 30), BLACK);
    assert_eq!(*out.get_pixel(12, 30), BLACK);
    assert!(image.pixels().all(|p| *p == BLACK));
  }

  #[test]
  fn colors_cycle_by_class_index() {
    let image = RgbImage::from_pixel(100, 100, BLACK);
    let out = annotator().draw(&image, &[boxed(10, 10, 40, 40, 3)]);
    assert_eq!(*out.get_pixel(10, 20), Rgb([0, 255, 0]));
  }

  #[test]
  fn later_boxes_draw_over_earlier_ones() {
    let image = RgbImage::from_pixel(60, 60, BLACK);
    let out = annotator().draw(&image, &[boxed(10, 10, 40, 40, 0), boxed(10, 10, 40, 40, 1)]);
    assert_eq!(*out.get_pixel(10, 20), Rgb([0, 255, 0]));
  }

  #[test]
  fn degenerate_and_out_of_bounds_boxes_are_safe() {
    let image = RgbImage::from_pixel(20, 20, BLACK);
    let out = annotator().draw(
      &image,
      &[boxed(5, 5, 5, 15, 0), boxed(-10, -10, 50, 50, 1)],
    );
    // 零面积框不绘制
    assert_eq!(*out.get_pixel(5, 10), BLACK);
    assert_eq!(out.dimensions(), (20, 20));
  }

  #[test]
  fn saturated_corners_draw_nothing_visible() {
    let image = RgbImage::from_pixel(30, 30, BLACK);
    let out = annotator().draw(&image, &[boxed(i32::MIN, i32::MIN, i32::MAX, i32::MAX, 0)]);
    assert_eq!(out, image);

    let out = annotator().draw(&image, &[boxed(i32::MIN, 10, 20, i32::MAX, 0)]);
    assert_eq!(*out.get_pixel(20, 15), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(10, 10), Rgb([255, 0, 0]));
    assert_eq!(*out.get_pixel(10, 20), BLACK);
  }
}

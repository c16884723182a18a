// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/bbox.rs - 归一化中心框与像素角点框转换
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

const NORM_TOLERANCE: f64 = 1e-6;

/// 归一化中心框 (cx, cy, w, h)，各分量相对于推理时图像
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormBox {
  pub cx: f64,
  pub cy: f64,
  pub w: f64,
  pub h: f64,
}

impl NormBox {
  pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
    Self { cx, cy, w, h }
  }

  /// 各分量均须落在 [0, 1] 内（允许微小误差）
  pub fn is_valid(&self) -> bool {
    [self.cx, self.cy, self.w, self.h]
      .iter()
      .all(|v| v.is_finite() && (-NORM_TOLERANCE..=1.0 + NORM_TOLERANCE).contains(v))
      && self.w >= 0.0
      && self.h >= 0.0
  }

  /// 归一化角点 [x1, y1, x2, y2]
  pub fn to_corners(&self) -> [f64; 4] {
    let x1 = self.cx - self.w / 2.0;
    let y1 = self.cy - self.h / 2.0;
    [x1, y1, x1 + self.w, y1 + self.h]
  }

  /// 换算为像素角点，x 乘宽、y 乘高后截断取整。
  /// 尺寸必须取自实际送去推理的图像。
  pub fn to_pixels(&self, height: u32, width: u32) -> PixelBox {
    let [x1, y1, x2, y2] = self.to_corners();
    let (w, h) = (width as f64, height as f64);
    PixelBox {
      x1: (x1 * w) as i32,
      y1: (y1 * h) as i32,
      x2: (x2 * w) as i32,
      y2: (y2 * h) as i32,
    }
  }
}

/// 像素角点框，x1 <= x2, y1 <= y2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

impl PixelBox {
  pub fn width(&self) -> i32 {
    self.x2.saturating_sub(self.x1)
  }

  pub fn height(&self) -> i32 {
    self.y2.saturating_sub(self.y1)
  }

  pub fn is_empty(&self) -> bool {
    self.width() == 0 || self.height() == 0
  }

  pub fn as_array(&self) -> [i32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn centered_box_on_wide_image() {
    // 100x200 (高x宽)
    let b = NormBox::new(0.5, 0.5, 0.5, 0.5).to_pixels(100, 200);
    assert_eq!(b.as_array(), [50, 25, 150, 75]);
  }

  #[test]
  fn corners_follow_center_form() {
    let c = NormBox::new(0.4, 0.6, 0.2, 0.4).to_corners();
    let expected = [0.3, 0.4, 0.5, 0.8];
    for (a, e) in c.iter().zip(expected) {
      assert!((a - e).abs() < 1e-12);
    }
  }

  #[test]
  fn coordinates_truncate_not_round() {
    // x1 = 0.0999 * 100 = 9.99 -> 9
    let b = NormBox::new(0.1999, 0.5, 0.2, 0.0).to_pixels(10, 100);
    assert_eq!(b.x1, 9);
    assert_eq!(b.x2, 29);
  }

  #[test]
  fn degenerate_box_has_zero_area() {
    let b = NormBox::new(0.5, 0.5, 0.0, 0.5).to_pixels(100, 100);
    assert_eq!(b.x1, b.x2);
    assert!(b.is_empty());
    assert_eq!(b.height(), 50);
  }

  #[test]
  fn corners_stay_ordered() {
    for i in 0..50 {
      let f = i as f64 / 50.0;
      let nb = NormBox::new(f, 1.0 - f, f * 0.7, (1.0 - f) * 0.3);
      let b = nb.to_pixels(333, 517);
      assert!(b.x1 <= b.x2 && b.y1 <= b.y2, "{nb:?} -> {b:?}");
    }
  }

  #[test]
  fn validity_check() {
    assert!(NormBox::new(0.5, 0.5, 0.0, 0.0).is_valid());
    assert!(!NormBox::new(0.5, 0.5, -0.1, 0.2).is_valid());
    assert!(!NormBox::new(f64::NAN, 0.5, 0.1, 0.2).is_valid());
    assert!(!NormBox::new(0.5, 0.5, 1e10, 0.2).is_valid());
    assert!(!NormBox::new(1.5, 0.5, 0.1, 0.2).is_valid());
    assert!(NormBox::new(1.0, 0.0, 1.0, 1.0).is_valid());
  }

  #[test]
  fn extreme_corners_do_not_overflow() {
    let b = PixelBox {
      x1: i32::MIN,
      y1: i32::MIN,
      x2: i32::MAX,
      y2: i32::MAX,
    };
    assert_eq!(b.width(), i32::MAX);
    assert_eq!(b.height(), i32::MAX);
    assert!(!b.is_empty());
  }
}

// 该文件是 Banmian （版面） 项目的一部分。
// src/output/draw.rs - 版面检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Banmian 项目贡献者

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::{DOC_LAYOUT_CLASSES, DetectResult, DetectionBox};

const BOX_THICKNESS: u32 = 2;

/// 按类别着色的边框绘制器
pub struct Draw {
  colors: Vec<Rgb<u8>>,
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self::with_classes(DOC_LAYOUT_CLASSES.len())
  }
}

impl Draw {
  /// 在色相环上均匀取 `num_classes` 种颜色
  pub fn with_classes(num_classes: usize) -> Self {
    let n = num_classes.max(1);
    let colors = (0..n)
      .map(|i| hsv_to_rgb((i as f32 / n as f32) * 360.0, 0.8, 0.9))
      .collect();

    Self {
      colors,
      thickness: BOX_THICKNESS,
    }
  }

  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn color_of(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  /// 在原图副本上绘制全部检测框
  pub fn draw_detection(&self, image: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut canvas = image.clone();
    for item in result.items.iter() {
      self.draw_box(&mut canvas, item);
    }
    canvas
  }

  fn draw_box(&self, image: &mut RgbImage, item: &DetectionBox) {
    let x_min = item.x1.floor() as i32;
    let y_min = item.y1.floor() as i32;
    let x_max = item.x2.ceil() as i32;
    let y_max = item.y2.ceil() as i32;
    let color = self.color_of(item.class_id);

    for t in 0..self.thickness as i32 {
      let w = x_max - x_min - 2 * t;
      let h = y_max - y_min - 2 * t;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

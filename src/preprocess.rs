// 该文件是 Banmian （版面） 项目的一部分。
// src/preprocess.rs - 图像缩放与比例记录
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameError, ImageSize, NormalizedImage};

/// 缩放比例 `(sx, sy)`：缩放后距离 = 原图距离 * 比例
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
  pub sx: f32,
  pub sy: f32,
}

impl ScaleFactor {
  pub const IDENTITY: ScaleFactor = ScaleFactor { sx: 1.0, sy: 1.0 };

  pub fn new(sx: f32, sy: f32) -> Self {
    Self { sx, sy }
  }

  /// 从原图尺寸缩放到目标尺寸所用的比例
  pub fn between(original: ImageSize, target: ImageSize) -> Self {
    Self {
      sx: target.width as f32 / original.width as f32,
      sy: target.height as f32 / original.height as f32,
    }
  }

  pub fn as_array(&self) -> [f32; 2] {
    [self.sx, self.sy]
  }
}

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("输入图像为空")]
  EmptyImage,
  #[error("缩放结果异常: {0}")]
  Frame(#[from] FrameError),
}

/// 拉伸缩放到 `W x H`（不保持宽高比，不加边），并返回对应的缩放比例
pub fn normalize<const W: u32, const H: u32>(
  image: &RgbImage,
) -> Result<(NormalizedImage<W, H>, ScaleFactor), PreprocessError> {
  let original = ImageSize::of(image);
  if original.is_empty() {
    return Err(PreprocessError::EmptyImage);
  }

  let scale = ScaleFactor::between(original, ImageSize::new(W, H));
  debug!(
    "缩放图像 {}x{} -> {}x{}, 比例: x={:.4}, y={:.4}",
    original.width, original.height, W, H, scale.sx, scale.sy
  );

  let resized = if original == ImageSize::new(W, H) {
    image.clone()
  } else {
    image::imageops::resize(image, W, H, FilterType::Triangle)
  };

  Ok((NormalizedImage::try_from(resized)?, scale))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn records_per_axis_scale() {
    let image = RgbImage::new(1280, 960);
    let (normalized, scale) = normalize::<640, 640>(&image).unwrap();

    assert_eq!(normalized.as_image().dimensions(), (640, 640));
    assert_eq!(scale.sx, 0.5);
    assert!((scale.sy - 640.0 / 960.0).abs() < 1e-6);
  }

  #[test]
  fn stretches_small_images_up() {
    let image = RgbImage::new(320, 160);
    let (normalized, scale) = normalize::<640, 640>(&image).unwrap();

    assert_eq!(normalized.as_image().dimensions(), (640, 640));
    assert_eq!(scale, ScaleFactor::new(2.0, 4.0));
  }

  #[test]
  fn target_sized_image_keeps_identity_scale() {
    let image = RgbImage::new(64, 32);
    let (_, scale) = normalize::<64, 32>(&image).unwrap();
    assert_eq!(scale, ScaleFactor::IDENTITY);
  }

  #[test]
  fn empty_image_is_rejected() {
    let image = RgbImage::new(0, 0);
    assert!(matches!(
      normalize::<640, 640>(&image),
      Err(PreprocessError::EmptyImage)
    ));
  }
}

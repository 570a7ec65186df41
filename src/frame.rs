// 该文件是 Banmian （版面） 项目的一部分。
// src/frame.rs - 模型输入帧与 NCHW 张量
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

use image::RgbImage;
use ndarray::{Array4, ArrayView4};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 图像尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageSize {
  pub width: u32,
  pub height: u32,
}

impl ImageSize {
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn of(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self { width, height }
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("帧尺寸不匹配: 期望 {expected_w}x{expected_h}, 实际 {actual_w}x{actual_h}")]
  ShapeMismatch {
    expected_w: u32,
    expected_h: u32,
    actual_w: u32,
    actual_h: u32,
  },
}

/// 已缩放到模型输入尺寸 `W x H` 的 RGB 图像
#[derive(Debug, Clone)]
pub struct NormalizedImage<const W: u32, const H: u32> {
  image: RgbImage,
}

impl<const W: u32, const H: u32> TryFrom<RgbImage> for NormalizedImage<W, H> {
  type Error = FrameError;

  fn try_from(image: RgbImage) -> Result<Self, Self::Error> {
    let (actual_w, actual_h) = image.dimensions();
    if actual_w != W || actual_h != H {
      return Err(FrameError::ShapeMismatch {
        expected_w: W,
        expected_h: H,
        actual_w,
        actual_h,
      });
    }
    Ok(Self { image })
  }
}

impl<const W: u32, const H: u32> NormalizedImage<W, H> {
  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn as_image(&self) -> &RgbImage {
    &self.image
  }
}

/// 像素归一化参数：`(pixel * scale - mean[c]) / std[c]`
///
/// 这组常数是模型训练时确定的，属于模型契约的一部分。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
  pub scale: f32,
  pub mean: [f32; RGB_CHANNELS],
  pub std: [f32; RGB_CHANNELS],
}

/// PP-DocLayout 系列模型的预处理常数（RGB，缩放到 [0, 1]）
pub const PP_DOCLAYOUT_NORMALIZATION: Normalization = Normalization {
  scale: 1.0 / 255.0,
  mean: [0.0, 0.0, 0.0],
  std: [1.0, 1.0, 1.0],
};

impl Normalization {
  #[inline]
  fn apply(&self, channel: usize, value: u8) -> f32 {
    (f32::from(value) * self.scale - self.mean[channel]) / self.std[channel]
  }
}

/// 形状为 `[1, 3, H, W]` 的平面浮点张量
#[derive(Debug, Clone)]
pub struct RgbNchwTensor<const W: u32, const H: u32> {
  data: Array4<f32>,
}

impl<const W: u32, const H: u32> RgbNchwTensor<W, H> {
  /// 将交错排列的 8 位像素转换为按通道平面排列的浮点数据
  pub fn pack(image: &NormalizedImage<W, H>, normalization: &Normalization) -> Self {
    let mut data = Array4::<f32>::zeros((1, RGB_CHANNELS, H as usize, W as usize));

    for (x, y, pixel) in image.as_image().enumerate_pixels() {
      let (x, y) = (x as usize, y as usize);
      for c in 0..RGB_CHANNELS {
        data[[0, c, y, x]] = normalization.apply(c, pixel[c]);
      }
    }

    Self { data }
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn view(&self) -> ArrayView4<'_, f32> {
    self.data.view()
  }

  pub fn into_array(self) -> Array4<f32> {
    self.data
  }
}

impl<const W: u32, const H: u32> From<&NormalizedImage<W, H>> for RgbNchwTensor<W, H> {
  fn from(image: &NormalizedImage<W, H>) -> Self {
    Self::pack(image, &PP_DOCLAYOUT_NORMALIZATION)
  }
}

// 该文件是 Banmian （版面） 项目的一部分。
// src/input/raw_pixels.rs - 宿主传入的原始像素缓冲
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

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::input::InputError;

/// 交错排列的 8 位像素缓冲（相机预览帧等）
///
/// 支持 1 通道灰度、3 通道 BGR（与 OpenCV 的 `Mat` 布局一致）与 4 通道 RGBA（丢弃 alpha）。
#[derive(Debug, Clone, Copy)]
pub struct RawPixels<'a> {
  pub data: &'a [u8],
  pub width: i64,
  pub height: i64,
  pub channels: i64,
}

impl RawPixels<'_> {
  /// 缓冲应有的字节数，尺寸为负或溢出时返回 `None`
  pub fn expected_len(width: i64, height: i64, channels: i64) -> Option<usize> {
    let width = usize::try_from(width).ok()?;
    let height = usize::try_from(height).ok()?;
    let channels = usize::try_from(channels).ok()?;
    width.checked_mul(height)?.checked_mul(channels)
  }

  pub fn to_rgb_image(&self) -> Result<RgbImage, InputError> {
    if !matches!(self.channels, 1 | 3 | 4) {
      return Err(InputError::UnsupportedChannels(self.channels));
    }
    let invalid = || InputError::InvalidDimensions {
      width: self.width,
      height: self.height,
    };
    let width = u32::try_from(self.width).map_err(|_| invalid())?;
    let height = u32::try_from(self.height).map_err(|_| invalid())?;
    let expected =
      Self::expected_len(self.width, self.height, self.channels).ok_or_else(invalid)?;

    if self.data.len() < expected {
      return Err(InputError::BufferTooShort {
        expected,
        actual: self.data.len(),
      });
    }
    let mut pixels = self.data[..expected].to_vec();

    let image = match self.channels {
      1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
      3 => {
        // BGR -> RGB
        pixels.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
        RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
      }
      _ => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
    };

    image.map(|image| image.to_rgb8()).ok_or_else(invalid)
  }
}

pub fn image_from_raw(
  data: &[u8],
  width: i64,
  height: i64,
  channels: i64,
) -> Result<RgbImage, InputError> {
  RawPixels {
    data,
    width,
    height,
    channels,
  }
  .to_rgb_image()
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn converts_each_supported_channel_layout() {
    let gray = image_from_raw(&[7, 9], 2, 1, 1).unwrap();
    assert_eq!(gray.get_pixel(1, 0), &Rgb([9, 9, 9]));

    let bgr = image_from_raw(&[1, 2, 3, 4, 5, 6], 1, 2, 3).unwrap();
    assert_eq!(bgr.get_pixel(0, 0), &Rgb([3, 2, 1]));
    assert_eq!(bgr.get_pixel(0, 1), &Rgb([6, 5, 4]));

    let rgba = image_from_raw(&[10, 20, 30, 0, 40, 50, 60, 255], 2, 1, 4).unwrap();
    assert_eq!(rgba.get_pixel(0, 0), &Rgb([10, 20, 30]));
    assert_eq!(rgba.get_pixel(1, 0), &Rgb([40, 50, 60]));
  }

  #[test]
  fn extra_trailing_bytes_are_ignored() {
    let image = image_from_raw(&[1, 2, 3, 99, 99], 1, 1, 3).unwrap();
    assert_eq!(image.get_pixel(0, 0), &Rgb([3, 2, 1]));
  }

  #[test]
  fn three_channel_buffers_are_read_as_bgr() {
    let image = image_from_raw(&[10, 20, 30], 1, 1, 3).unwrap();
    let Rgb([r, g, b]) = *image.get_pixel(0, 0);
    assert_eq!((r, g, b), (30, 20, 10));
  }

  #[test]
  fn zero_sized_frames_become_empty_images() {
    let image = image_from_raw(&[], 0, 0, 3).unwrap();
    assert_eq!(image.dimensions(), (0, 0));
  }

  #[test]
  fn invalid_layouts_are_rejected() {
    assert!(matches!(
      image_from_raw(&[0; 4], 2, 2, 2),
      Err(InputError::UnsupportedChannels(2))
    ));
    assert!(matches!(
      image_from_raw(&[0; 4], -2, 2, 1),
      Err(InputError::InvalidDimensions { width: -2, .. })
    ));
    assert!(matches!(
      image_from_raw(&[0; 5], 2, 2, 3),
      Err(InputError::BufferTooShort {
        expected: 12,
        actual: 5
      })
    ));
  }
}

// 该文件是 Banmian （版面） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

mod raw_pixels;
mod read_image_file;

pub use self::raw_pixels::{RawPixels, image_from_raw};
pub use self::read_image_file::{ImageFileInput, load_image};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidDimensions { width: i64, height: i64 },
  #[error("不支持的通道数: {0}")]
  UnsupportedChannels(i64),
  #[error("像素数据长度不足: 期望 {expected}, 实际 {actual}")]
  BufferTooShort { expected: usize, actual: usize },
}

impl InputError {
  /// 图像源本身无法读取（区别于调用参数错误）
  pub fn is_load_failure(&self) -> bool {
    matches!(
      self,
      InputError::IoError(_) | InputError::ImageLoadError(_)
    )
  }
}

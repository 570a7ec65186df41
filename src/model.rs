// 该文件是 Banmian （版面） 项目的一部分。
// src/model.rs - 模型
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

use std::time::Duration;

use serde::Deserialize;

use crate::frame::ImageSize;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<T: Model + ?Sized> Model for &T {
  type Input = T::Input;
  type Output = T::Output;
  type Error = T::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

/// 单个版面区域，坐标位于原图像素空间
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
  pub score: f32,
  pub class_id: u32,
  pub class_name: String,
}

impl DetectionBox {
  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn bbox(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

#[derive(Debug, Clone)]
pub struct DetectResult {
  pub items: Box<[DetectionBox]>,
  pub image_size: ImageSize,
  pub elapsed: Duration,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// PP-DocLayout 类别表，顺序必须与模型训练时一致
pub const DOC_LAYOUT_CLASSES: [&str; 23] = [
  "paragraph_title",
  "image",
  "text",
  "number",
  "abstract",
  "content",
  "figure_title",
  "formula",
  "table",
  "table_title",
  "reference",
  "doc_title",
  "footnote",
  "header",
  "algorithm",
  "footer",
  "seal",
  "chart_title",
  "chart",
  "formula_number",
  "header_image",
  "footer_image",
  "aside_text",
];

/// 类别索引到名称的映射表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Taxonomy {
  labels: &'static [&'static str],
}

impl Default for Taxonomy {
  fn default() -> Self {
    Self::new(&DOC_LAYOUT_CLASSES)
  }
}

impl Taxonomy {
  pub const fn new(labels: &'static [&'static str]) -> Self {
    Self { labels }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// 越界或负数索引返回 `None`
  pub fn label(&self, class_id: i64) -> Option<&'static str> {
    usize::try_from(class_id)
      .ok()
      .and_then(|idx| self.labels.get(idx).copied())
  }
}

pub mod decode;
pub mod engine;
pub mod schema;

pub use self::decode::{DecodeContext, DecodeError, decode};
pub use self::engine::{EngineError, InferenceSession, OrtSession, OrtSessionBuilder, RawTensor};
pub use self::schema::{CoordinateSpace, ModelSchema, SchemaError, SchemaInputs};

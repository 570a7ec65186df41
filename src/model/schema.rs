// 该文件是 Banmian （版面） 项目的一部分。
// src/model/schema.rs - 模型输入结构适配
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

//! PP-DocLayout 导出的 ONNX 模型有两种输入结构：
//!
//! - 两输入（M 版）：`image`、`scale_factor`，输出位于缩放后的坐标空间；
//! - 三输入（L 版）：`im_shape`、`image`、`scale_factor`，模型内部根据
//!   `im_shape` 还原坐标，输出已经位于原图坐标空间。
//!
//! 张量名称属于模型 ABI，必须逐字匹配。

use ndarray::{Array2, Array4, ArrayView2, ArrayView4, arr2};
use thiserror::Error;

use crate::{frame::ImageSize, preprocess::ScaleFactor};

pub const IM_SHAPE: &str = "im_shape";
pub const IMAGE: &str = "image";
pub const SCALE_FACTOR: &str = "scale_factor";

const TWO_INPUT_NAMES: [&str; 2] = [IMAGE, SCALE_FACTOR];
const THREE_INPUT_NAMES: [&str; 3] = [IM_SHAPE, IMAGE, SCALE_FACTOR];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
  #[error("不支持的模型输入数量: {0}（仅支持 2 或 3 个输入）")]
  UnsupportedInputCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSchema {
  TwoInput,
  ThreeInput,
}

/// 模型原始输出所在的坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSpace {
  /// 缩放后（模型输入尺寸）的坐标，需要除以缩放比例
  Normalized,
  /// 原图坐标，直接使用
  Original,
}

impl ModelSchema {
  pub fn classify(input_count: usize) -> Result<Self, SchemaError> {
    match input_count {
      2 => Ok(ModelSchema::TwoInput),
      3 => Ok(ModelSchema::ThreeInput),
      n => Err(SchemaError::UnsupportedInputCount(n)),
    }
  }

  /// 逆缩放策略只由输入结构决定，与送入的 `scale_factor` 数值无关
  pub fn coordinate_space(self) -> CoordinateSpace {
    match self {
      ModelSchema::TwoInput => CoordinateSpace::Normalized,
      ModelSchema::ThreeInput => CoordinateSpace::Original,
    }
  }

  pub fn input_names(self) -> &'static [&'static str] {
    match self {
      ModelSchema::TwoInput => &TWO_INPUT_NAMES,
      ModelSchema::ThreeInput => &THREE_INPUT_NAMES,
    }
  }

  pub fn build_inputs(
    self,
    image: Array4<f32>,
    original: ImageSize,
    scale: ScaleFactor,
  ) -> SchemaInputs {
    match self {
      ModelSchema::TwoInput => SchemaInputs::TwoInput {
        image,
        scale_factor: arr2(&[scale.as_array()]),
      },
      ModelSchema::ThreeInput => SchemaInputs::ThreeInput {
        im_shape: arr2(&[[original.height as f32, original.width as f32]]),
        image,
        // 三输入模型自行使用 im_shape 还原坐标，这里必须是单位比例
        scale_factor: arr2(&[ScaleFactor::IDENTITY.as_array()]),
      },
    }
  }
}

/// 按输入结构组织好的一组命名张量
#[derive(Debug, Clone)]
pub enum SchemaInputs {
  TwoInput {
    image: Array4<f32>,
    scale_factor: Array2<f32>,
  },
  ThreeInput {
    im_shape: Array2<f32>,
    image: Array4<f32>,
    scale_factor: Array2<f32>,
  },
}

impl SchemaInputs {
  pub fn schema(&self) -> ModelSchema {
    match self {
      SchemaInputs::TwoInput { .. } => ModelSchema::TwoInput,
      SchemaInputs::ThreeInput { .. } => ModelSchema::ThreeInput,
    }
  }

  /// 提交顺序下的张量名称
  pub fn names(&self) -> &'static [&'static str] {
    self.schema().input_names()
  }

  pub fn image(&self) -> ArrayView4<'_, f32> {
    match self {
      SchemaInputs::TwoInput { image, .. } | SchemaInputs::ThreeInput { image, .. } => image.view(),
    }
  }

  pub fn scale_factor(&self) -> ArrayView2<'_, f32> {
    match self {
      SchemaInputs::TwoInput { scale_factor, .. }
      | SchemaInputs::ThreeInput { scale_factor, .. } => scale_factor.view(),
    }
  }

  pub fn im_shape(&self) -> Option<ArrayView2<'_, f32>> {
    match self {
      SchemaInputs::TwoInput { .. } => None,
      SchemaInputs::ThreeInput { im_shape, .. } => Some(im_shape.view()),
    }
  }
}

// 该文件是 Banmian （版面） 项目的一部分。
// src/detector.rs - 版面检测流水线
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
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::{ImageSize, RgbNchwTensor},
  model::{
    DecodeContext, DecodeError, DetectResult, DetectionBox, EngineError, InferenceSession, Model,
    ModelSchema, SchemaError, Taxonomy, decode,
  },
  preprocess::{self, PreprocessError},
};

pub const MODEL_INPUT_WIDTH: u32 = 640;
pub const MODEL_INPUT_HEIGHT: u32 = 640;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("模型结构错误: {0}")]
  Schema(#[from] SchemaError),
  #[error("推理引擎错误: {0}")]
  Engine(#[from] EngineError),
  #[error("输出解码错误: {0}")]
  Decode(#[from] DecodeError),
}

impl DetectError {
  /// 宿主侧错误码
  pub fn code(&self) -> &'static str {
    match self {
      DetectError::Preprocess(_) => "INVALID_INPUT",
      DetectError::Schema(_) => "UNSUPPORTED_SCHEMA",
      DetectError::Engine(e) if e.is_load_failure() => "MODEL_LOAD_FAILED",
      DetectError::Engine(_) | DetectError::Decode(_) => "INFERENCE_FAILED",
    }
  }
}

/// 输入尺寸为 `W x H` 的版面检测器
///
/// 输入结构在构造时根据会话声明的输入数量确定一次；之后每次调用只读，
/// 可以通过 `Arc` 在多个线程间共享。
pub struct LayoutDetector<S, const W: u32, const H: u32> {
  session: S,
  schema: ModelSchema,
  taxonomy: Taxonomy,
  confidence_threshold: f32,
}

pub type DocLayoutDetector<S> = LayoutDetector<S, MODEL_INPUT_WIDTH, MODEL_INPUT_HEIGHT>;

impl<S: InferenceSession, const W: u32, const H: u32> LayoutDetector<S, W, H> {
  pub fn new(session: S) -> Result<Self, SchemaError> {
    let input_count = session.input_count();
    let schema = ModelSchema::classify(input_count).inspect_err(|e| {
      error!("模型输入 {:?}: {}", session.input_names(), e);
    })?;
    info!(
      "模型输入数量 {}, 使用 {:?} 输入结构",
      input_count, schema
    );

    Ok(Self {
      session,
      schema,
      taxonomy: Taxonomy::default(),
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    })
  }

  pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
    self.taxonomy = taxonomy;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn schema(&self) -> ModelSchema {
    self.schema
  }

  pub fn session(&self) -> &S {
    &self.session
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  /// 检测一张图像，空图像返回空列表
  pub fn detect(
    &self,
    image: &RgbImage,
    conf_threshold: f32,
  ) -> Result<Vec<DetectionBox>, DetectError> {
    let original = ImageSize::of(image);
    debug!(
      "开始检测, 图像尺寸: {}x{}, 阈值: {:.2}",
      original.width, original.height, conf_threshold
    );
    if original.is_empty() {
      debug!("输入图像为空");
      return Ok(Vec::new());
    }

    let (normalized, scale) = preprocess::normalize::<W, H>(image)?;
    let tensor = RgbNchwTensor::from(&normalized).into_array();
    let inputs = self.schema.build_inputs(tensor, original, scale);

    let raw = self.session.execute(&inputs)?;

    let ctx = DecodeContext {
      image_size: original,
      scale,
      space: self.schema.coordinate_space(),
      taxonomy: self.taxonomy,
    };
    Ok(decode(&raw, &ctx, conf_threshold)?)
  }

  /// 检测并附带耗时与原图尺寸
  pub fn detect_result(
    &self,
    image: &RgbImage,
    conf_threshold: f32,
  ) -> Result<DetectResult, DetectError> {
    let now = std::time::Instant::now();
    let items = self.detect(image, conf_threshold)?;
    let elapsed = now.elapsed();
    debug!("检测到 {} 个区域, 耗时: {:.2?}", items.len(), elapsed);

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      image_size: ImageSize::of(image),
      elapsed,
    })
  }

  /// 失败时记录错误并返回空列表
  pub fn detect_or_empty(&self, image: &RgbImage, conf_threshold: f32) -> Vec<DetectionBox> {
    self.detect(image, conf_threshold).unwrap_or_else(|e| {
      error!(code = e.code(), "检测失败, 返回空结果: {}", e);
      Vec::new()
    })
  }
}

impl<S: InferenceSession, const W: u32, const H: u32> Model for LayoutDetector<S, W, H> {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = DetectError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect_result(input, self.confidence_threshold)
  }
}

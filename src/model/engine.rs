// 该文件是 Banmian （版面） 项目的一部分。
// src/model/engine.rs - ONNX Runtime 推理会话
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

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::{session::Session, value::TensorRef};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::schema::{IM_SHAPE, IMAGE, SCALE_FACTOR, SchemaInputs},
};

/// 从推理结果中拷贝出的主输出张量
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
  pub shape: Vec<i64>,
  pub data: Vec<f32>,
}

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(PathBuf),
  #[error("模型加载错误: {path}, 错误: {source}")]
  ModelLoad {
    path: PathBuf,
    #[source]
    source: ort::Error,
  },
  #[error("模型路径错误: {0}")]
  ModelPath(String),
  #[error("推理执行错误: {0}")]
  Inference(#[source] ort::Error),
  #[error("模型没有声明输出张量")]
  MissingOutput,
  #[error("推理会话锁已失效")]
  SessionPoisoned,
}

impl EngineError {
  /// 是否属于模型加载阶段的错误
  pub fn is_load_failure(&self) -> bool {
    matches!(
      self,
      EngineError::ModelNotFound(_) | EngineError::ModelLoad { .. } | EngineError::ModelPath(_)
    )
  }
}

/// 推理会话：一次前向计算，输入互不相关的调用可以并发执行
pub trait InferenceSession: Send + Sync {
  fn input_names(&self) -> &[String];

  fn input_count(&self) -> usize {
    self.input_names().len()
  }

  fn execute(&self, inputs: &SchemaInputs) -> Result<RawTensor, EngineError>;
}

pub struct OrtSessionBuilder {
  model_path: PathBuf,
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for OrtSessionBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OrtSessionBuilder {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineError::ModelPath(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let query_pairs: HashMap<_, _> = url.query_pairs().collect();
    let intra_threads = match query_pairs.get("intra_threads") {
      Some(value) => Some(value.parse::<usize>().map_err(|_| {
        EngineError::ModelPath(format!("intra_threads 参数无效: {}", value))
      })?),
      None => None,
    };

    Ok(OrtSessionBuilder {
      model_path: PathBuf::from(url.path()),
      intra_threads,
    })
  }
}

impl OrtSessionBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: None,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn build(self) -> Result<OrtSession, EngineError> {
    info!("加载模型文件: {}", self.model_path.display());
    if !self.model_path.is_file() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(EngineError::ModelNotFound(self.model_path));
    }

    let load_error = |source| EngineError::ModelLoad {
      path: self.model_path.clone(),
      source,
    };

    let mut builder = Session::builder().map_err(load_error)?;
    if let Some(threads) = self.intra_threads {
      debug!("推理线程数: {}", threads);
      builder = builder.with_intra_threads(threads).map_err(load_error)?;
    }

    info!("创建 ONNX Runtime 推理会话");
    let session = builder
      .commit_from_file(&self.model_path)
      .map_err(load_error)?;

    let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
    let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
    debug!("模型输入: {:?}", input_names);
    debug!("模型输出: {:?}", output_names);

    if output_names.is_empty() {
      error!("模型没有输出: {}", self.model_path.display());
      return Err(EngineError::MissingOutput);
    }
    info!("模型加载完成");

    Ok(OrtSession {
      session: Mutex::new(session),
      model_path: self.model_path,
      input_names,
      output_names,
    })
  }
}

/// 绑定到单个模型文件的 ONNX Runtime 会话
///
/// 输入输出元数据在创建时读取，之后不再变化。`ort` 的 `run` 需要可变借用，
/// 因此只在执行推理的那一段持有互斥锁。
pub struct OrtSession {
  session: Mutex<Session>,
  model_path: PathBuf,
  input_names: Vec<String>,
  output_names: Vec<String>,
}

impl OrtSession {
  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn output_names(&self) -> &[String] {
    &self.output_names
  }
}

impl InferenceSession for OrtSession {
  fn input_names(&self) -> &[String] {
    &self.input_names
  }

  fn execute(&self, inputs: &SchemaInputs) -> Result<RawTensor, EngineError> {
    let output_name = self
      .output_names
      .first()
      .ok_or(EngineError::MissingOutput)?;

    debug!("执行模型推理, 输入: {:?}", inputs.names());
    let mut session = self
      .session
      .lock()
      .map_err(|_| EngineError::SessionPoisoned)?;

    let outputs = match inputs {
      SchemaInputs::TwoInput {
        image,
        scale_factor,
      } => {
        let image = TensorRef::from_array_view(image.view()).map_err(EngineError::Inference)?;
        let scale_factor =
          TensorRef::from_array_view(scale_factor.view()).map_err(EngineError::Inference)?;
        session.run(ort::inputs![
          IMAGE => image,
          SCALE_FACTOR => scale_factor
        ])
      }
      SchemaInputs::ThreeInput {
        im_shape,
        image,
        scale_factor,
      } => {
        let im_shape = TensorRef::from_array_view(im_shape.view()).map_err(EngineError::Inference)?;
        let image = TensorRef::from_array_view(image.view()).map_err(EngineError::Inference)?;
        let scale_factor =
          TensorRef::from_array_view(scale_factor.view()).map_err(EngineError::Inference)?;
        session.run(ort::inputs![
          IM_SHAPE => im_shape,
          IMAGE => image,
          SCALE_FACTOR => scale_factor
        ])
      }
    }
    .map_err(|e| {
      error!("推理失败: {}", e);
      EngineError::Inference(e)
    })?;

    let (shape, data) = outputs[output_name.as_str()]
      .try_extract_tensor::<f32>()
      .map_err(EngineError::Inference)?;

    let raw = RawTensor {
      shape: shape.iter().copied().collect(),
      data: data.to_vec(),
    };
    debug!("输出 {} 形状: {:?}", output_name, raw.shape);

    Ok(raw)
  }
}

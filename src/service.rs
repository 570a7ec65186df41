// 该文件是 Banmian （版面） 项目的一部分。
// src/service.rs - 宿主调用层
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

//! 面向宿主程序的服务层。
//!
//! 服务持有模型路径与已构建的检测器。`init_model` 立即加载模型；加载失败时保留路径，
//! 下一次检测调用会重新尝试，失败结果不会被缓存。检测器通过 `Arc` 共享，
//! 多个调用可以在不同线程上同时进行。

use std::{
  path::{Path, PathBuf},
  sync::{Arc, PoisonError, RwLock},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  detector::{DetectError, DocLayoutDetector},
  input::{self, InputError},
  model::{DetectResult, EngineError, InferenceSession, OrtSession, OrtSessionBuilder},
  output::json,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const IMAGE_LOAD_FAILED_MESSAGE: &str = "Could not load image";

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("模型尚未初始化")]
  NotInitialized,
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("检测错误: {0}")]
  Detect(#[from] DetectError),
}

impl ServiceError {
  /// 宿主侧错误码
  pub fn code(&self) -> &'static str {
    match self {
      ServiceError::NotInitialized => "MODEL_NOT_INITIALIZED",
      ServiceError::Input(e) if e.is_load_failure() => "IMAGE_LOAD_FAILED",
      ServiceError::Input(_) => "INVALID_INPUT",
      ServiceError::Detect(e) => e.code(),
    }
  }

  pub fn to_json(&self) -> String {
    let message = match self {
      ServiceError::Input(e) if e.is_load_failure() => IMAGE_LOAD_FAILED_MESSAGE.to_string(),
      other => other.to_string(),
    };
    json::error_to_json(self.code(), &message)
  }
}

/// 按路径创建推理会话
pub trait SessionLoader: Send + Sync {
  type Session: InferenceSession;

  fn load(&self, model_path: &Path) -> Result<Self::Session, EngineError>;
}

#[derive(Debug, Default, Clone)]
pub struct OrtLoader {
  intra_threads: Option<usize>,
}

impl OrtLoader {
  pub fn with_intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }
}

impl SessionLoader for OrtLoader {
  type Session = OrtSession;

  fn load(&self, model_path: &Path) -> Result<Self::Session, EngineError> {
    let mut builder = OrtSessionBuilder::new(model_path);
    if let Some(threads) = self.intra_threads {
      builder = builder.intra_threads(threads);
    }
    builder.build()
  }
}

struct ServiceState<S> {
  model_path: Option<PathBuf>,
  detector: Option<Arc<DocLayoutDetector<S>>>,
}

pub struct LayoutService<L: SessionLoader = OrtLoader> {
  loader: L,
  state: RwLock<ServiceState<L::Session>>,
}

impl Default for LayoutService<OrtLoader> {
  fn default() -> Self {
    Self::new(OrtLoader::default())
  }
}

impl<L: SessionLoader> LayoutService<L> {
  pub fn new(loader: L) -> Self {
    Self {
      loader,
      state: RwLock::new(ServiceState {
        model_path: None,
        detector: None,
      }),
    }
  }

  pub fn loader(&self) -> &L {
    &self.loader
  }

  pub fn version(&self) -> &'static str {
    VERSION
  }

  pub fn model_path(&self) -> Option<PathBuf> {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    state.model_path.clone()
  }

  pub fn is_loaded(&self) -> bool {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    state.detector.is_some()
  }

  fn build_detector(&self, path: &Path) -> Result<Arc<DocLayoutDetector<L::Session>>, DetectError> {
    let session = self.loader.load(path)?;
    let detector = DocLayoutDetector::new(session)?;
    Ok(Arc::new(detector))
  }

  /// 设置模型路径并立即加载，替换之前的检测器
  pub fn init_model(&self, model_path: impl Into<PathBuf>) -> Result<(), ServiceError> {
    let model_path = model_path.into();
    info!("初始化模型: {}", model_path.display());

    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    state.detector = None;
    state.model_path = Some(model_path.clone());

    match self.build_detector(&model_path) {
      Ok(detector) => {
        state.detector = Some(detector);
        info!("模型初始化完成");
        Ok(())
      }
      Err(e) => {
        error!(code = e.code(), "模型初始化失败, 下次检测时重试: {}", e);
        Err(e.into())
      }
    }
  }

  /// 取得当前检测器，尚未加载成功时按已配置的路径重试
  pub fn detector(&self) -> Result<Arc<DocLayoutDetector<L::Session>>, ServiceError> {
    {
      let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
      if let Some(detector) = &state.detector {
        return Ok(Arc::clone(detector));
      }
      if state.model_path.is_none() {
        return Err(ServiceError::NotInitialized);
      }
    }

    let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(detector) = &state.detector {
      return Ok(Arc::clone(detector));
    }
    let model_path = state.model_path.clone().ok_or(ServiceError::NotInitialized)?;

    warn!("重新加载模型: {}", model_path.display());
    let detector = self.build_detector(&model_path).inspect_err(|e| {
      error!(code = e.code(), "模型加载失败: {}", e);
    })?;
    state.detector = Some(Arc::clone(&detector));

    Ok(detector)
  }

  /// 检测图像文件；图像无法读取时在加载模型之前就返回错误
  pub fn detect_path(
    &self,
    image_path: impl AsRef<Path>,
    conf_threshold: f32,
  ) -> Result<DetectResult, ServiceError> {
    let image_path = image_path.as_ref();
    let image = input::load_image(image_path).inspect_err(|e| {
      error!("无法读取图像 {}: {}", image_path.display(), e);
    })?;
    let detector = self.detector()?;
    Ok(detector.detect_result(&image, conf_threshold)?)
  }

  /// 检测宿主传入的像素缓冲（1/3/4 通道，3 通道按 BGR 解释）
  pub fn detect_bytes(
    &self,
    data: &[u8],
    width: i64,
    height: i64,
    channels: i64,
    conf_threshold: f32,
  ) -> Result<DetectResult, ServiceError> {
    debug!("像素缓冲: {}x{}x{}, {} 字节", width, height, channels, data.len());
    let image = input::image_from_raw(data, width, height, channels)?;
    let detector = self.detector()?;
    Ok(detector.detect_result(&image, conf_threshold)?)
  }

  pub fn detect_path_json(&self, image_path: impl AsRef<Path>, conf_threshold: f32) -> String {
    render(self.detect_path(image_path, conf_threshold))
  }

  pub fn detect_bytes_json(
    &self,
    data: &[u8],
    width: i64,
    height: i64,
    channels: i64,
    conf_threshold: f32,
  ) -> String {
    render(self.detect_bytes(data, width, height, channels, conf_threshold))
  }
}

fn render(result: Result<DetectResult, ServiceError>) -> String {
  match result {
    Ok(result) => json::result_to_json(&result),
    Err(e) => {
      warn!(code = e.code(), "返回错误结果: {}", e);
      e.to_json()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_codes_and_messages() {
    assert_eq!(ServiceError::NotInitialized.code(), "MODEL_NOT_INITIALIZED");

    let load = ServiceError::from(InputError::IoError(std::io::Error::from(
      std::io::ErrorKind::NotFound,
    )));
    assert_eq!(load.code(), "IMAGE_LOAD_FAILED");
    assert_eq!(
      load.to_json(),
      r#"{"error":"Could not load image","code":"IMAGE_LOAD_FAILED"}"#
    );

    let invalid = ServiceError::from(InputError::UnsupportedChannels(2));
    assert_eq!(invalid.code(), "INVALID_INPUT");
  }

  #[test]
  fn detect_before_init_reports_not_initialized() {
    let service = LayoutService::<OrtLoader>::default();
    assert!(matches!(
      service.detector(),
      Err(ServiceError::NotInitialized)
    ));
    assert!(!service.is_loaded());
    assert_eq!(service.version(), VERSION);
  }

  #[test]
  fn failed_init_keeps_path_for_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.onnx");
    let service = LayoutService::<OrtLoader>::default();

    let err = service.init_model(&path).unwrap_err();
    assert_eq!(err.code(), "MODEL_LOAD_FAILED");
    assert_eq!(service.model_path(), Some(path));
    assert!(!service.is_loaded());

    let err = service.detector().err().unwrap();
    assert_eq!(err.code(), "MODEL_LOAD_FAILED");
  }
}

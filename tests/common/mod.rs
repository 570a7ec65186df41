// 该文件是 Banmian （版面） 项目的一部分。
// tests/common/mod.rs - 测试用推理会话
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

#![allow(dead_code)]

use std::{
  path::Path,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use banmian::{
  model::{EngineError, InferenceSession, RawTensor, SchemaInputs},
  service::SessionLoader,
};

/// 一次 `execute` 调用收到的输入
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
  pub names: Vec<&'static str>,
  pub image_shape: Vec<usize>,
  /// 左上角像素的 R/G/B 平面值
  pub first_pixel: [f32; 3],
  pub scale_factor: [f32; 2],
  pub im_shape: Option<[f32; 2]>,
}

/// 声明固定输入名称、返回固定检测行的会话
pub struct StubSession {
  names: Vec<String>,
  rows: Vec<[f32; 6]>,
  submitted: Mutex<Vec<Submitted>>,
}

impl StubSession {
  pub fn with_inputs(names: &[&str], rows: &[[f32; 6]]) -> Self {
    Self {
      names: names.iter().map(|n| n.to_string()).collect(),
      rows: rows.to_vec(),
      submitted: Mutex::new(Vec::new()),
    }
  }

  pub fn two_input(rows: &[[f32; 6]]) -> Self {
    Self::with_inputs(&["image", "scale_factor"], rows)
  }

  pub fn three_input(rows: &[[f32; 6]]) -> Self {
    Self::with_inputs(&["im_shape", "image", "scale_factor"], rows)
  }

  pub fn submitted(&self) -> Vec<Submitted> {
    self.submitted.lock().unwrap().clone()
  }
}

impl InferenceSession for StubSession {
  fn input_names(&self) -> &[String] {
    &self.names
  }

  fn execute(&self, inputs: &SchemaInputs) -> Result<RawTensor, EngineError> {
    let scale = inputs.scale_factor();
    let image = inputs.image();
    self.submitted.lock().unwrap().push(Submitted {
      names: inputs.names().to_vec(),
      image_shape: image.shape().to_vec(),
      first_pixel: [image[[0, 0, 0, 0]], image[[0, 1, 0, 0]], image[[0, 2, 0, 0]]],
      scale_factor: [scale[[0, 0]], scale[[0, 1]]],
      im_shape: inputs.im_shape().map(|s| [s[[0, 0]], s[[0, 1]]]),
    });

    Ok(RawTensor {
      shape: vec![self.rows.len() as i64, 6],
      data: self.rows.iter().flatten().copied().collect(),
    })
  }
}

/// 前 `failures` 次加载失败，之后返回两输入会话
pub struct StubLoader {
  rows: Vec<[f32; 6]>,
  failures: AtomicUsize,
  loads: AtomicUsize,
}

impl StubLoader {
  pub fn new(rows: &[[f32; 6]]) -> Self {
    Self::failing(rows, 0)
  }

  pub fn failing(rows: &[[f32; 6]], failures: usize) -> Self {
    Self {
      rows: rows.to_vec(),
      failures: AtomicUsize::new(failures),
      loads: AtomicUsize::new(0),
    }
  }

  pub fn loads(&self) -> usize {
    self.loads.load(Ordering::SeqCst)
  }
}

impl SessionLoader for StubLoader {
  type Session = StubSession;

  fn load(&self, model_path: &Path) -> Result<Self::Session, EngineError> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    let should_fail = self
      .failures
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if should_fail {
      return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
    }
    Ok(StubSession::two_input(&self.rows))
  }
}

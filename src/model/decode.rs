// 该文件是 Banmian （版面） 项目的一部分。
// src/model/decode.rs - 检测输出解码
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
use tracing::debug;

use crate::{
  frame::ImageSize,
  model::{DetectionBox, Taxonomy, engine::RawTensor, schema::CoordinateSpace},
  preprocess::ScaleFactor,
};

/// 每条检测记录: [class_id, score, x1, y1, x2, y2]
pub const DETECTION_ROW_WIDTH: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
  #[error("输出张量形状异常: {0:?}, 期望 [N, 6]")]
  MalformedShape(Vec<i64>),
  #[error("输出张量数据不足: 期望至少 {expected} 个值, 实际 {actual} 个")]
  Truncated { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
  pub image_size: ImageSize,
  pub scale: ScaleFactor,
  pub space: CoordinateSpace,
  pub taxonomy: Taxonomy,
}

/// 把 `v` 限制在 `[0, max]`，NaN 与负零都归为 0
#[inline]
fn clamp_to(v: f32, max: f32) -> f32 {
  if v > 0.0 { v.min(max) } else { 0.0 }
}

/// 裁剪一条轴上的两个端点并保证 `lo <= hi`
#[inline]
fn clamp_span(a: f32, b: f32, max: f32) -> (f32, f32) {
  let (a, b) = (clamp_to(a, max), clamp_to(b, max));
  if a <= b { (a, b) } else { (b, a) }
}

/// 返回行数与应有的数据长度
fn row_layout(shape: &[i64]) -> Result<(usize, usize), DecodeError> {
  let malformed = || DecodeError::MalformedShape(shape.to_vec());
  match shape {
    [n, width] if *width == DETECTION_ROW_WIDTH as i64 => {
      let rows = usize::try_from(*n).map_err(|_| malformed())?;
      let len = rows.checked_mul(DETECTION_ROW_WIDTH).ok_or_else(malformed)?;
      Ok((rows, len))
    }
    _ => Err(malformed()),
  }
}

/// 解码模型主输出，过滤、逆缩放并裁剪到原图范围内
///
/// 输出保持模型给出的行顺序，不做排序。
pub fn decode(
  raw: &RawTensor,
  ctx: &DecodeContext,
  conf_threshold: f32,
) -> Result<Vec<DetectionBox>, DecodeError> {
  let (num_rows, expected) = row_layout(&raw.shape)?;
  if raw.data.len() < expected {
    return Err(DecodeError::Truncated {
      expected,
      actual: raw.data.len(),
    });
  }

  let (inv_x, inv_y) = match ctx.space {
    CoordinateSpace::Normalized => (1.0 / ctx.scale.sx, 1.0 / ctx.scale.sy),
    CoordinateSpace::Original => (1.0, 1.0),
  };
  let max_x = ctx.image_size.width as f32;
  let max_y = ctx.image_size.height as f32;
  debug!(
    "原始检测数: {}, 逆缩放: x={:.4}, y={:.4} ({:?})",
    num_rows, inv_x, inv_y, ctx.space
  );

  let mut boxes = Vec::new();
  for row in raw.data[..expected].chunks_exact(DETECTION_ROW_WIDTH) {
    let &[raw_class, score, x1, y1, x2, y2] = row else {
      continue;
    };

    // NaN 阈值不放行任何一行
    let passes = raw_class.is_finite() && score.is_finite() && score >= conf_threshold;
    if !passes {
      continue;
    }
    let class_id = raw_class as i64;
    let Some(class_name) = ctx.taxonomy.label(class_id) else {
      continue;
    };

    let (x1, x2) = clamp_span(x1 * inv_x, x2 * inv_x, max_x);
    let (y1, y2) = clamp_span(y1 * inv_y, y2 * inv_y, max_y);
    boxes.push(DetectionBox {
      x1,
      y1,
      x2,
      y2,
      score,
      class_id: class_id as u32,
      class_name: class_name.to_string(),
    });
  }

  debug!(
    "通过阈值 {:.2} 的检测数: {} / {}",
    conf_threshold,
    boxes.len(),
    num_rows
  );

  Ok(boxes)
}

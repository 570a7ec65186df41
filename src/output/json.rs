// 该文件是 Banmian （版面） 项目的一部分。
// src/output/json.rs - 检测结果 JSON 序列化
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

//! 输出格式固定为
//!
//! ```text
//! {"detections":[{"x1":..,"y1":..,"x2":..,"y2":..,"score":..,"class_id":..,"class_name":".."}],"count":N}
//! ```
//!
//! 字段顺序是宿主侧约定的一部分，因此这里按顺序手工拼接，而不是经由 `serde_json::Map`。
//! 所有调用点统一使用同一精度：坐标 2 位小数，置信度 4 位小数。

use serde::{Deserialize, de::Error as _};

use crate::model::{DetectResult, DetectionBox};

pub const COORDINATE_PRECISION: usize = 2;
pub const SCORE_PRECISION: usize = 4;

fn quote(s: &str) -> String {
  serde_json::Value::String(s.to_owned()).to_string()
}

fn push_detection(out: &mut String, item: &DetectionBox) {
  out.push_str(&format!(
    "{{\"x1\":{:.p$},\"y1\":{:.p$},\"x2\":{:.p$},\"y2\":{:.p$},\"score\":{:.s$},\"class_id\":{},\"class_name\":{}}}",
    item.x1,
    item.y1,
    item.x2,
    item.y2,
    item.score,
    item.class_id,
    quote(&item.class_name),
    p = COORDINATE_PRECISION,
    s = SCORE_PRECISION,
  ));
}

/// 写出 `{"detections":[...],"count":N`，不含结尾的 `}`
fn push_body(out: &mut String, items: &[DetectionBox]) {
  out.push_str("{\"detections\":[");
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    push_detection(out, item);
  }
  out.push_str(&format!("],\"count\":{}", items.len()));
}

pub fn detections_to_json(items: &[DetectionBox]) -> String {
  let mut out = String::with_capacity(32 + items.len() * 128);
  push_body(&mut out, items);
  out.push('}');
  out
}

/// 在 `count` 之后追加推理耗时与原图尺寸
pub fn result_to_json(result: &DetectResult) -> String {
  let mut out = String::with_capacity(96 + result.len() * 128);
  push_body(&mut out, &result.items);
  out.push_str(&format!(
    ",\"inference_time_ms\":{:.p$},\"image_width\":{},\"image_height\":{}}}",
    result.elapsed.as_secs_f64() * 1000.0,
    result.image_size.width,
    result.image_size.height,
    p = COORDINATE_PRECISION,
  ));
  out
}

pub fn error_to_json(code: &str, message: &str) -> String {
  format!("{{\"error\":{},\"code\":{}}}", quote(message), quote(code))
}

#[derive(Deserialize)]
struct DetectionsPayload {
  detections: Vec<DetectionBox>,
  count: usize,
}

/// 解析 [`detections_to_json`] 或 [`result_to_json`] 的输出
///
/// `count` 与列表长度不一致时视为格式错误。
pub fn parse_detections(text: &str) -> Result<Vec<DetectionBox>, serde_json::Error> {
  let payload: DetectionsPayload = serde_json::from_str(text)?;
  if payload.count != payload.detections.len() {
    return Err(serde_json::Error::custom(format!(
      "count 为 {}, 实际检测数为 {}",
      payload.count,
      payload.detections.len()
    )));
  }
  Ok(payload.detections)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::frame::ImageSize;

  fn sample() -> Vec<DetectionBox> {
    vec![
      DetectionBox {
        x1: 200.0,
        y1: 100.0,
        x2: 600.0,
        y2: 400.0,
        score: 0.87,
        class_id: 2,
        class_name: "text".to_string(),
      },
      DetectionBox {
        x1: 12.345,
        y1: 0.0,
        x2: 33.333,
        y2: 47.5,
        score: 0.51234,
        class_id: 8,
        class_name: "table".to_string(),
      },
    ]
  }

  #[test]
  fn field_order_and_precision_are_fixed() {
    let json = detections_to_json(&sample()[..1]);
    assert_eq!(
      json,
      r#"{"detections":[{"x1":200.00,"y1":100.00,"x2":600.00,"y2":400.00,"score":0.8700,"class_id":2,"class_name":"text"}],"count":1}"#
    );
  }

  #[test]
  fn empty_list_serializes_with_zero_count() {
    assert_eq!(detections_to_json(&[]), r#"{"detections":[],"count":0}"#);
  }

  #[test]
  fn result_appends_summary_after_count() {
    let result = DetectResult {
      items: sample().into_boxed_slice(),
      image_size: ImageSize::new(1280, 960),
      elapsed: Duration::from_micros(12_346),
    };
    let json = result_to_json(&result);
    assert!(json.ends_with(
      r#""count":2,"inference_time_ms":12.35,"image_width":1280,"image_height":960}"#
    ));

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["detections"][1]["class_name"], "table");
  }

  #[test]
  fn round_trip_preserves_values_up_to_precision() {
    let items = sample();
    let parsed = parse_detections(&detections_to_json(&items)).unwrap();

    assert_eq!(parsed.len(), items.len());
    for (a, b) in items.iter().zip(&parsed) {
      assert_eq!(a.class_id, b.class_id);
      assert_eq!(a.class_name, b.class_name);
      for (x, y) in a.bbox().iter().zip(b.bbox()) {
        assert!((x - y).abs() <= 0.006);
      }
      assert!((a.score - b.score).abs() <= 0.0001);
    }
  }

  #[test]
  fn count_mismatch_is_rejected() {
    let text = r#"{"detections":[],"count":3}"#;
    assert!(parse_detections(text).is_err());
  }

  #[test]
  fn error_payload_escapes_message() {
    assert_eq!(
      error_to_json("IMAGE_LOAD_FAILED", "Could not load image"),
      r#"{"error":"Could not load image","code":"IMAGE_LOAD_FAILED"}"#
    );
    let value: serde_json::Value =
      serde_json::from_str(&error_to_json("INVALID_INPUT", "bad \"quote\"\n")).unwrap();
    assert_eq!(value["error"], "bad \"quote\"\n");
  }
}

// 该文件是 Banmian （版面） 项目的一部分。
// tests/service.rs - 宿主调用层测试
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

mod common;

use banmian::service::{LayoutService, ServiceError};
use image::{Rgb, RgbImage};
use serde_json::Value;

use common::StubLoader;

const TABLE_ROW: [f32; 6] = [8.0, 0.92, 64.0, 32.0, 320.0, 160.0];

fn parse(text: &str) -> Value {
  serde_json::from_str(text).unwrap()
}

#[test]
fn detection_before_init_is_reported() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  let pixels = vec![255u8; 4 * 4 * 3];

  let value = parse(&service.detect_bytes_json(&pixels, 4, 4, 3, 0.5));
  assert_eq!(value["code"], "MODEL_NOT_INITIALIZED");
  assert_eq!(service.loader().loads(), 0);
}

#[test]
fn failed_init_is_retried_on_next_detection() {
  let service = LayoutService::new(StubLoader::failing(&[TABLE_ROW], 1));

  let err = service.init_model("/models/pp-doclayout-m.onnx").unwrap_err();
  assert_eq!(err.code(), "MODEL_LOAD_FAILED");
  assert!(!service.is_loaded());

  let pixels = vec![255u8; 1280 * 1280 * 3];
  let value = parse(&service.detect_bytes_json(&pixels, 1280, 1280, 3, 0.5));
  assert_eq!(value["count"], 1);
  assert!(service.is_loaded());
  assert_eq!(service.loader().loads(), 2);

  service.detect_bytes(&pixels, 1280, 1280, 3, 0.5).unwrap();
  assert_eq!(service.loader().loads(), 2);
}

#[test]
fn byte_detection_renders_boundary_json() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  service.init_model("/models/pp-doclayout-m.onnx").unwrap();

  let pixels = vec![128u8; 1280 * 1280 * 4];
  let value = parse(&service.detect_bytes_json(&pixels, 1280, 1280, 4, 0.5));

  assert_eq!(value["count"], 1);
  assert_eq!(value["image_width"], 1280);
  assert_eq!(value["image_height"], 1280);
  assert!(value["inference_time_ms"].is_number());
  let detection = &value["detections"][0];
  assert_eq!(detection["class_id"], 8);
  assert_eq!(detection["class_name"], "table");
  assert_eq!(detection["x1"], 128.0);
  assert_eq!(detection["y2"], 320.0);
}

#[test]
fn three_channel_bytes_reach_the_model_as_rgb() {
  let service = LayoutService::new(StubLoader::new(&[]));
  service.init_model("/models/pp-doclayout-m.onnx").unwrap();

  // 纯红色，BGR 排列
  let pixels = [0u8, 0, 255].repeat(64 * 64);
  service.detect_bytes(&pixels, 64, 64, 3, 0.5).unwrap();

  let detector = service.detector().unwrap();
  let submitted = detector.session().submitted();
  let [r, g, b] = submitted[0].first_pixel;
  assert!((r - 1.0).abs() < 1e-3, "r = {r}");
  assert!(g.abs() < 1e-3 && b.abs() < 1e-3, "g = {g}, b = {b}");
}

#[test]
fn invalid_pixel_layouts_are_rejected_before_inference() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  service.init_model("/models/pp-doclayout-m.onnx").unwrap();

  let value = parse(&service.detect_bytes_json(&[0; 8], 2, 2, 2, 0.5));
  assert_eq!(value["code"], "INVALID_INPUT");
  let value = parse(&service.detect_bytes_json(&[0; 8], 4, 4, 3, 0.5));
  assert_eq!(value["code"], "INVALID_INPUT");
}

#[test]
fn unreadable_image_is_reported_even_without_model() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  let dir = tempfile::tempdir().unwrap();

  let value = parse(&service.detect_path_json(dir.path().join("missing.png"), 0.5));
  assert_eq!(
    value,
    parse(r#"{"error":"Could not load image","code":"IMAGE_LOAD_FAILED"}"#)
  );
}

#[test]
fn image_file_detection_uses_original_size() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  service.init_model("/models/pp-doclayout-m.onnx").unwrap();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("page.png");
  RgbImage::from_pixel(1280, 640, Rgb([250, 250, 250]))
    .save(&path)
    .unwrap();

  let result = service.detect_path(&path, 0.5).unwrap();
  assert_eq!(result.image_size.width, 1280);
  assert_eq!(result.image_size.height, 640);
  assert_eq!(result.items[0].bbox(), [128.0, 32.0, 640.0, 160.0]);
}

#[test]
fn empty_frames_yield_empty_results() {
  let service = LayoutService::new(StubLoader::new(&[TABLE_ROW]));
  service.init_model("/models/pp-doclayout-m.onnx").unwrap();

  let result = service.detect_bytes(&[], 0, 0, 3, 0.5).unwrap();
  assert!(result.is_empty());
  assert!(matches!(
    service.detect_bytes(&[], -1, 0, 3, 0.5),
    Err(ServiceError::Input(_))
  ));
}

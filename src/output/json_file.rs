// 该文件是 Banmian （版面） 项目的一部分。
// src/output/json_file.rs - 保存 JSON 结果文件
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{Render, json},
};

pub struct JsonFileOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum JsonFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(Self::new(uri.path()))
  }
}

impl JsonFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<RgbImage, DetectResult> for JsonFileOutput {
  type Error = JsonFileError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&self.path, json::result_to_json(result))?;
    info!("保存 {} 个检测结果到: {}", result.len(), self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{frame::ImageSize, model::DetectionBox};

  #[test]
  fn writes_result_into_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/nested/page.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonFileOutput::from_url(&url).unwrap();

    let result = DetectResult {
      items: vec![DetectionBox {
        x1: 1.0,
        y1: 2.0,
        x2: 3.0,
        y2: 4.0,
        score: 0.9,
        class_id: 8,
        class_name: "table".to_string(),
      }]
      .into_boxed_slice(),
      image_size: ImageSize::new(10, 10),
      elapsed: Duration::from_millis(3),
    };
    output
      .render_result(&RgbImage::new(10, 10), &result)
      .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let parsed = json::parse_detections(&text).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].class_name, "table");
  }

  #[test]
  fn other_schemes_are_rejected() {
    let url = Url::parse("image:///tmp/out.png").unwrap();
    assert!(matches!(
      JsonFileOutput::from_url(&url),
      Err(JsonFileError::SchemeMismatch(_))
    ));
  }
}

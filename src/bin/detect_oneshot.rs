// 该文件是 Banmian （版面） 项目的一部分。
// src/bin/detect_oneshot.rs - 单张图像版面检测
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use banmian::{
  FromUrl,
  detector::{DEFAULT_CONFIDENCE_THRESHOLD, DocLayoutDetector},
  input::ImageFileInput,
  model::OrtSessionBuilder,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Banmian 单张图像检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///models/pp-doclayout-l.onnx?intra_threads=4
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，例如 image:///data/page.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出位置: stdout:、json:///out/page.json 或 image:///out/page.png
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence);

  let input_image = ImageFileInput::from_url(&args.input)?;
  let session = OrtSessionBuilder::from_url(&args.model)?.build()?;
  let model = DocLayoutDetector::new(session)?.with_confidence_threshold(args.confidence);
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input_image, model, output)?;

  Ok(())
}

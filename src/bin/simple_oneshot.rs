// 该文件是 Qianli （千里眼） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像推理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Qianli Contributors

use anyhow::Result;
use clap::Parser;
use url::Url;

use qianli::{
  FromUrl,
  input::ImageFileInput,
  model::DetectorBuilder,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 对单张图像执行一次检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像 (image://)
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出目标
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出目标: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = DetectorBuilder::from_url(&args.model)?.build()?;
  let output = OutputWrapper::from_url(&args.output)?;

  let result = OneShotTask.run_task(input, model, output)?;
  for item in result.iter() {
    println!(
      "{}\t{:.4}\t{:.1}\t{:.1}\t{:.1}\t{:.1}",
      item.label(),
      item.confidence,
      item.bounding_box.left,
      item.bounding_box.top,
      item.bounding_box.width,
      item.bounding_box.height
    );
  }

  Ok(())
}

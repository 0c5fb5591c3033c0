// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::convert::Infallible;

use tracing::info;

use crate::{
  FromUrlWithScheme,
  input::ImageFrame,
  model::DetectResult,
  output::Render,
};

/// 将检测结果写入 tracing 日志
#[derive(Debug, Default)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl crate::FromUrl for LogOutput {
  type Error = Infallible;

  fn from_url(_url: &url::Url) -> Result<Self, Self::Error> {
    Ok(LogOutput)
  }
}

impl Render<ImageFrame, DetectResult> for LogOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    info!(
      "第 {} 帧 {}: {} 个目标 (NMS 前 {} 个, 预处理 {:.2}ms, 推理 {:.2}ms, 后处理 {:.2}ms)",
      frame.index,
      frame.source.display(),
      result.len(),
      result.stats.candidates_before_nms,
      result.stats.preprocess_ms,
      result.stats.inference_ms,
      result.stats.postprocess_ms,
    );
    for item in result.iter() {
      let bbox = &item.bounding_box;
      info!(
        "  {} ({}) {:.4} [{:.1}, {:.1}, {:.1}, {:.1}]",
        item.label(),
        item.class_id,
        item.confidence,
        bbox.left,
        bbox.top,
        bbox.width,
        bbox.height
      );
    }
    Ok(())
  }
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use qianli::model::{
  ConfigError, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, Thresholds, Vocabulary,
  VocabularyError,
};

/// Qianli 目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  /// 支持格式:
  /// - onnx:///path/model.onnx?side=640&classes=80&layout=nchw&threads=2
  /// - tensor:///path/output.bin?classes=80
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - image:///path/a.jpg
  /// - folder:///path/images
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出目标
  /// - log://
  /// - record:///path/result.json
  /// - folder:///path/out?format=json|txt&record=id|name&always
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 每帧最多输出的检测数
  #[arg(long, value_name = "COUNT")]
  pub max_detections: Option<usize>,

  /// 类别标签文件（JSON 数组或每行一个标签），默认使用 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 最大处理帧数
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,
}

impl Args {
  pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
    Thresholds::new(self.confidence, self.iou_threshold)
  }

  pub fn vocabulary(&self) -> Result<Vocabulary, VocabularyError> {
    match &self.labels {
      Some(path) => Vocabulary::from_file(path),
      None => Ok(Vocabulary::coco()),
    }
  }
}

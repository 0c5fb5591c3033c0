// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/label.rs - 类别标签
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
  "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
  "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
  "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
  "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
  "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
  "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
  "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
  "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
  "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum VocabularyError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("标签文件为空: {0}")]
  Empty(String),
}

/// 有序的类别词表，下标即类别 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
  names: Vec<String>,
}

impl Default for Vocabulary {
  fn default() -> Self {
    Self::coco()
  }
}

impl Vocabulary {
  pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
    Self {
      names: names.into_iter().map(Into::into).collect(),
    }
  }

  pub fn coco() -> Self {
    Self::new(COCO_CLASSES)
  }

  /// 读取标签文件：`.json` 为字符串数组，其余格式每行一个标签（忽略空行）
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;

    let is_json = path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let names: Vec<String> = if is_json {
      serde_json::from_str(&content)?
    } else {
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
    };

    if names.is_empty() {
      return Err(VocabularyError::Empty(path.display().to_string()));
    }
    debug!("标签数量: {}", names.len());
    Ok(Self { names })
  }

  /// 类别 ID 对应的名称，超出范围时返回 None
  pub fn resolve(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

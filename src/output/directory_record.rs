// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU32, Ordering},
};

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImageFrame,
  model::DetectResult,
  output::{FrameRecord, Render},
  url_file_path, url_query,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的记录格式: {0}")]
  UnknownFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
  #[default]
  Json,
  /// 每行一个目标: `类别, 置信度, left, top, width, height`
  Text { label_with_name: bool },
}

impl RecordFormat {
  fn extension(&self) -> &'static str {
    match self {
      RecordFormat::Json => "json",
      RecordFormat::Text { .. } => "txt",
    }
  }

  fn write(
    &self,
    path: &Path,
    frame: &ImageFrame,
    result: &DetectResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      RecordFormat::Json => {
        let record = FrameRecord::new(frame, result);
        std::fs::write(path, serde_json::to_vec_pretty(&record)?)?;
      }
      RecordFormat::Text { label_with_name } => {
        let records = result
          .iter()
          .map(|item| {
            let name = if *label_with_name {
              item.label().to_string()
            } else {
              item.class_id.to_string()
            };
            let bbox = &item.bounding_box;
            format!(
              "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
              name, item.confidence, bbox.left, bbox.top, bbox.width, bbox.height
            )
          })
          .collect::<Vec<_>>();
        std::fs::write(path, records.join("\n"))?;
      }
    }
    Ok(())
  }
}

/// 按 年/月/日 分目录保存每帧的检测记录
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  format: RecordFormat,
  frame_counter: AtomicU32,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        uri.scheme()
      );
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let format = match url_query(uri, "format").as_deref() {
      None | Some("json") => RecordFormat::Json,
      Some("txt") => RecordFormat::Text {
        label_with_name: url_query(uri, "record").as_deref() != Some("id"),
      },
      Some(other) => return Err(DirectoryRecordOutputError::UnknownFormat(other.to_string())),
    };
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(Self::new(url_file_path(uri), format, always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, format: RecordFormat, always: bool) -> Self {
    Self {
      directory: directory.into(),
      format,
      frame_counter: AtomicU32::new(0),
      always,
    }
  }

  fn frame_id(&self) -> u32 {
    self
      .frame_counter
      .fetch_add(1, Ordering::Relaxed)
      .wrapping_add(1)
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.frame_id(),
      self.format.extension()
    )))
  }
}

impl Render<ImageFrame, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }
    let path = self.frame_path()?;
    self.format.write(&path, frame, result)?;
    debug!("检测记录已保存: {}", path.display());
    Ok(())
  }
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/record_file.rs - JSON 记录文件输出
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
  sync::Mutex,
};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImageFrame,
  model::DetectResult,
  output::{FrameRecord, Render},
  url_file_path,
};

#[derive(Error, Debug)]
pub enum RecordFileOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录锁已损坏")]
  Poisoned,
}

/// 所有帧的结果累积为一个 JSON 数组，每帧之后整体重写文件
pub struct RecordFileOutput {
  path: PathBuf,
  records: Mutex<Vec<serde_json::Value>>,
}

impl FromUrlWithScheme for RecordFileOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordFileOutput {
  type Error = RecordFileOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RecordFileOutputError::SchemeMismatch);
    }
    Self::create(url_file_path(url))
  }
}

impl RecordFileOutput {
  pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordFileOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, "[]")?;
    Ok(Self {
      path,
      records: Mutex::new(Vec::new()),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<ImageFrame, DetectResult> for RecordFileOutput {
  type Error = RecordFileOutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    let record = serde_json::to_value(FrameRecord::new(frame, result))?;
    let mut records = self
      .records
      .lock()
      .map_err(|_| RecordFileOutputError::Poisoned)?;
    records.push(record);
    std::fs::write(&self.path, serde_json::to_vec_pretty(&*records)?)?;
    debug!("已写入 {} 帧记录到 {}", records.len(), self.path.display());
    Ok(())
  }
}

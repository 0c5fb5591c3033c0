// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output.rs - 输出定义
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

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImageFrame,
  model::{DetectResult, DetectStats, Detection},
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod log_output;
mod record_file;

pub use self::log_output::LogOutput;
pub use self::record_file::{RecordFileOutput, RecordFileOutputError};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError, RecordFormat};

/// 单帧检测记录，record:// 与 folder:// 输出的 JSON 结构
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
  pub source: &'a PathBuf,
  pub index: usize,
  pub width: u32,
  pub height: u32,
  pub detections: &'a [Detection],
  pub stats: &'a DetectStats,
}

impl<'a> FrameRecord<'a> {
  pub fn new(frame: &'a ImageFrame, result: &'a DetectResult) -> Self {
    let size = frame.size();
    Self {
      source: &frame.source,
      index: frame.index,
      width: size.width,
      height: size.height,
      detections: &result.items,
      stats: &result.stats,
    }
  }
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("记录文件输出错误: {0}")]
  RecordFileOutputError(#[from] RecordFileOutputError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Log(LogOutput),
  RecordFile(RecordFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecord(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => {
        let Ok(output) = LogOutput::from_url(url);
        Ok(OutputWrapper::Log(output))
      }
      RecordFileOutput::SCHEME => {
        let output = RecordFileOutput::from_url(url)?;
        Ok(OutputWrapper::RecordFile(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecord(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<ImageFrame, DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => {
        let Ok(()) = output.render_result(frame, result);
        Ok(())
      }
      OutputWrapper::RecordFile(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecord(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;
  use image::DynamicImage;

  pub(crate) fn sample() -> (ImageFrame, DetectResult) {
    let frame = ImageFrame::new(DynamicImage::new_rgb8(64, 48), "/data/a.png", 3);
    let result = DetectResult {
      items: vec![Detection {
        bounding_box: BoundingBox::new(1.0, 2.0, 30.0, 40.0),
        confidence: 0.875,
        class_id: 0,
        class_name: Some("person".to_string()),
      }]
      .into_boxed_slice(),
      stats: DetectStats::default(),
    };
    (frame, result)
  }

  #[test]
  fn frame_record_json() {
    let (frame, result) = sample();
    let json = serde_json::to_value(FrameRecord::new(&frame, &result)).unwrap();
    assert_eq!(json["index"], 3);
    assert_eq!(json["width"], 64);
    assert_eq!(json["height"], 48);
    assert_eq!(json["detections"][0]["className"], "person");
  }

  #[test]
  fn dispatch_by_scheme() {
    assert!(matches!(
      OutputWrapper::from_url(&Url::parse("log://").unwrap()),
      Ok(OutputWrapper::Log(_))
    ));
    assert!(matches!(
      OutputWrapper::from_url(&Url::parse("rtsp://host/stream").unwrap()),
      Err(OutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn log_output_never_fails() {
    let (frame, result) = sample();
    let output = OutputWrapper::from_url(&Url::parse("log://").unwrap()).unwrap();
    assert!(output.render_result(&frame, &result).is_ok());
  }
}

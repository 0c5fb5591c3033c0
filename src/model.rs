// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model.rs - 模型与检测结果
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 原图像素坐标系下的边界框
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
    Self {
      left,
      top,
      width,
      height,
    }
  }

  /// 由归一化的中心点和宽高换算到 image_size 像素坐标，不做边界裁剪
  pub fn from_normalized_center(cx: f32, cy: f32, w: f32, h: f32, image_size: ImageSize) -> Self {
    let (iw, ih) = (image_size.width as f32, image_size.height as f32);
    Self {
      left: (cx - w / 2.0) * iw,
      top: (cy - h / 2.0) * ih,
      width: w * iw,
      height: h * ih,
    }
  }

  pub fn right(&self) -> f32 {
    self.left + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.top + self.height
  }

  /// 面积；宽或高为负时按零计
  pub fn area(&self) -> f32 {
    (self.right() - self.left).max(0.0) * (self.bottom() - self.top).max(0.0)
  }

  pub fn intersection(&self, other: &BoundingBox) -> f32 {
    let x1 = self.left.max(other.left);
    let y1 = self.top.max(other.top);
    let x2 = self.right().min(other.right());
    let y2 = self.bottom().min(other.bottom());
    (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
  }

  /// 四个分量都是有限值
  pub fn is_finite(&self) -> bool {
    self.left.is_finite()
      && self.top.is_finite()
      && self.width.is_finite()
      && self.height.is_finite()
  }

  /// 交并比；并集为零或任一框含非有限值时返回 0
  pub fn iou(&self, other: &BoundingBox) -> f32 {
    if !self.is_finite() || !other.is_finite() {
      return 0.0;
    }
    let intersection = self.intersection(other);
    let union = self.area() + other.area() - intersection;
    if union > 0.0 && intersection.is_finite() {
      intersection / union
    } else {
      0.0
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
  pub width: u32,
  pub height: u32,
}

impl ImageSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

impl From<&image::DynamicImage> for ImageSize {
  fn from(image: &image::DynamicImage) -> Self {
    Self::new(image.width(), image.height())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
  pub bounding_box: BoundingBox,
  pub confidence: f32,
  pub class_id: u32,
  /// 类别 ID 超出词表范围时为 None
  pub class_name: Option<String>,
}

impl Detection {
  pub fn with_class_name(mut self, class_name: Option<String>) -> Self {
    self.class_name = class_name;
    self
  }

  /// 用于展示的标签，未知类别显示为 "unknown"
  pub fn label(&self) -> &str {
    self.class_name.as_deref().unwrap_or("unknown")
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectStats {
  /// 进入 NMS 之前的候选数
  pub candidates_before_nms: usize,
  /// 是否因 max_detections 截断
  pub truncated: bool,
  pub preprocess_ms: f64,
  pub inference_ms: f64,
  pub postprocess_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
  pub stats: DetectStats,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("置信度阈值必须在 [0, 1] 之间, 实际为 {0}")]
  ConfidenceOutOfRange(f32),
  #[error("IoU 阈值必须在 [0, 1] 之间, 实际为 {0}")]
  IouOutOfRange(f32),
  #[error("模型输入边长不能为零")]
  ZeroInputSide,
  #[error("类别数量不能为零")]
  ZeroClasses,
  #[error("参数 {key} 无效: {value}")]
  InvalidParameter { key: String, value: String },
}

/// 置信度与 NMS 阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
  pub confidence: f32,
  pub iou: f32,
}

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE_THRESHOLD,
      iou: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl Thresholds {
  pub fn new(confidence: f32, iou: f32) -> Result<Self, ConfigError> {
    let thresholds = Self { confidence, iou };
    thresholds.validate()?;
    Ok(thresholds)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    // NaN 不满足 contains
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(ConfigError::ConfidenceOutOfRange(self.confidence));
    }
    if !(0.0..=1.0).contains(&self.iou) {
      return Err(ConfigError::IouOutOfRange(self.iou));
    }
    Ok(())
  }
}

pub mod decode;
pub mod detector;
pub mod filter;
pub mod label;
pub mod nms;

pub use self::decode::{Candidate, OutputTensor, ShapeError, decode};
pub use self::detector::{
  DEFAULT_INPUT_SIDE, DEFAULT_NUM_CLASSES, DetectError, Detector, DetectorBuildError,
  DetectorBuilder, DetectorConfig, postprocess,
};
pub use self::filter::filter;
pub use self::label::{COCO_CLASSES, Vocabulary, VocabularyError};
pub use self::nms::suppress;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalized_center_to_pixels() {
    let bbox = BoundingBox::from_normalized_center(0.5, 0.5, 0.2, 0.2, ImageSize::new(640, 640));
    assert!((bbox.left - 256.0).abs() < 1e-3);
    assert!((bbox.top - 256.0).abs() < 1e-3);
    assert!((bbox.width - 128.0).abs() < 1e-3);
    assert!((bbox.height - 128.0).abs() < 1e-3);
  }

  #[test]
  fn boxes_are_not_clamped() {
    let bbox = BoundingBox::from_normalized_center(0.05, 0.95, 0.2, 0.2, ImageSize::new(100, 200));
    assert!(bbox.left < 0.0);
    assert!(bbox.bottom() > 200.0);
  }

  #[test]
  fn iou_of_identical_box_is_one() {
    let a = BoundingBox::new(13.7, 2.1, 40.3, 19.9);
    assert_eq!(a.iou(&a), 1.0);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(20.0, 20.0, 10.0, 10.0);
    assert_eq!(a.iou(&b), 0.0);
    // 仅边相接
    let c = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn iou_of_zero_area_boxes_is_zero() {
    let a = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
    assert_eq!(a.iou(&a), 0.0);
    assert!(!a.iou(&a).is_nan());
  }

  #[test]
  fn iou_with_non_finite_box_is_zero() {
    let real = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let nan_width = BoundingBox::new(5.0, 0.0, f32::NAN, 10.0);
    assert_eq!(nan_width.iou(&real), 0.0);
    assert_eq!(real.iou(&nan_width), 0.0);
    let infinite = BoundingBox::new(0.0, 0.0, f32::INFINITY, 10.0);
    assert_eq!(infinite.iou(&real), 0.0);
    assert!(!nan_width.is_finite());
    assert!(real.is_finite());
  }

  #[test]
  fn iou_half_overlap() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
    // 交 50，并 150
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    assert_eq!(a.iou(&b), b.iou(&a));
  }

  #[test]
  fn thresholds_validate() {
    assert!(Thresholds::new(0.0, 1.0).is_ok());
    assert_eq!(
      Thresholds::new(1.5, 0.5),
      Err(ConfigError::ConfidenceOutOfRange(1.5))
    );
    assert_eq!(
      Thresholds::new(0.5, -0.1),
      Err(ConfigError::IouOutOfRange(-0.1))
    );
    assert!(Thresholds::new(f32::NAN, 0.5).is_err());
    assert_eq!(Thresholds::default(), Thresholds::new(0.5, 0.5).unwrap());
  }

  #[test]
  fn detection_serializes_camel_case() {
    let detection = Detection {
      bounding_box: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
      confidence: 0.75,
      class_id: 16,
      class_name: Some("dog".to_string()),
    };
    let json = serde_json::to_value(&detection).unwrap();
    assert_eq!(json["boundingBox"]["left"], 1.0);
    assert_eq!(json["classId"], 16);
    assert_eq!(json["className"], "dog");
    assert_eq!(detection.label(), "dog");
    assert_eq!(detection.with_class_name(None).label(), "unknown");
  }
}

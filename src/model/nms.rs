// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::model::Detection;

/// 非极大值抑制（与类别无关）
///
/// 按置信度降序稳定排序后逐个检查，与任一已保留框的 IoU 超过阈值即丢弃。
/// 返回的结果仍按置信度降序排列，置信度为 NaN 的排在最后。
pub fn suppress(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  // sort_by 是稳定排序，得分相同的保持解码顺序
  detections.sort_by(|a, b| rank(b.confidence).total_cmp(&rank(a.confidence)));

  let total = detections.len();
  let mut kept: Vec<Detection> = Vec::with_capacity(total.min(100));

  for detection in detections {
    let overlapped = kept
      .iter()
      .any(|k| detection.bounding_box.iou(&k.bounding_box) > iou_threshold);
    if !overlapped {
      kept.push(detection);
    }
  }

  debug!("NMS: {} -> {}", total, kept.len());
  kept
}

fn rank(confidence: f32) -> f32 {
  if confidence.is_nan() {
    f32::NEG_INFINITY
  } else {
    confidence
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn detection(bbox: [f32; 4], confidence: f32, class_id: u32) -> Detection {
    Detection {
      bounding_box: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
      confidence,
      class_id,
      class_name: None,
    }
  }

  #[test]
  fn nms_empty() {
    assert!(suppress(vec![], 0.5).is_empty());
  }

  #[test]
  fn nms_overlapping_keeps_highest() {
    let result = suppress(
      vec![
        detection([12.0, 12.0, 40.0, 40.0], 0.8, 0),
        detection([10.0, 10.0, 40.0, 40.0], 0.9, 0),
      ],
      0.5,
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].confidence, 0.9);
  }

  #[test]
  fn nms_is_class_agnostic() {
    let result = suppress(
      vec![
        detection([0.0, 0.0, 100.0, 100.0], 0.9, 0),
        detection([1.0, 1.0, 100.0, 100.0], 0.7, 5),
      ],
      0.5,
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].class_id, 0);
  }

  #[test]
  fn nms_non_overlapping_sorted_descending() {
    let result = suppress(
      vec![
        detection([0.0, 0.0, 10.0, 10.0], 0.6, 0),
        detection([50.0, 50.0, 10.0, 10.0], 0.9, 1),
        detection([100.0, 0.0, 10.0, 10.0], 0.7, 2),
      ],
      0.5,
    );
    let scores: Vec<_> = result.iter().map(|d| d.confidence).collect();
    assert_eq!(scores, vec![0.9, 0.7, 0.6]);
  }

  #[test]
  fn nms_ties_keep_input_order() {
    let result = suppress(
      vec![
        detection([0.0, 0.0, 10.0, 10.0], 0.8, 7),
        detection([0.0, 0.0, 10.0, 10.0], 0.8, 3),
        detection([30.0, 0.0, 10.0, 10.0], 0.8, 4),
      ],
      0.5,
    );
    let classes: Vec<_> = result.iter().map(|d| d.class_id).collect();
    assert_eq!(classes, vec![7, 4]);
  }

  #[test]
  fn nms_threshold_is_strict() {
    // IoU 恰为 1/3
    let a = detection([0.0, 0.0, 10.0, 10.0], 0.9, 0);
    let b = detection([5.0, 0.0, 10.0, 10.0], 0.8, 0);
    let iou = a.bounding_box.iou(&b.bounding_box);
    assert_eq!(suppress(vec![a.clone(), b.clone()], iou).len(), 2);
    assert_eq!(suppress(vec![a, b], iou - 1e-4).len(), 1);
  }

  #[test]
  fn nms_zero_area_boxes_never_suppress() {
    let result = suppress(
      vec![
        detection([5.0, 5.0, 0.0, 0.0], 0.9, 0),
        detection([5.0, 5.0, 0.0, 0.0], 0.8, 0),
      ],
      0.0,
    );
    assert_eq!(result.len(), 2);
  }

  #[test]
  fn nms_nan_confidence_sorts_last() {
    let result = suppress(
      vec![
        detection([0.0, 0.0, 10.0, 10.0], f32::NAN, 0),
        detection([50.0, 0.0, 10.0, 10.0], 0.9, 1),
        detection([100.0, 0.0, 10.0, 10.0], 0.1, 2),
      ],
      0.5,
    );
    let classes: Vec<_> = result.iter().map(|d| d.class_id).collect();
    assert_eq!(classes, vec![1, 2, 0]);
  }

  #[test]
  fn nms_nan_box_does_not_suppress_real_box() {
    let result = suppress(
      vec![
        detection([5.0, 0.0, f32::NAN, 10.0], 0.99, 0),
        detection([0.0, 0.0, 10.0, 10.0], 0.9, 1),
      ],
      0.5,
    );
    assert_eq!(result.len(), 2);
    assert_eq!(result[1].class_id, 1);
  }
}

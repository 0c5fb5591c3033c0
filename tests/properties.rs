// 该文件是 Qianli （千里眼） 项目的一部分。
// tests/properties.rs - 后处理性质测试
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

use proptest::prelude::*;

use qianli::model::{BoundingBox, Candidate, Detection, ImageSize, decode, filter, suppress};

fn bounding_box() -> impl Strategy<Value = BoundingBox> {
  (0.0f32..1000.0, 0.0f32..1000.0, 0.0f32..500.0, 0.0f32..500.0)
    .prop_map(|(left, top, width, height)| BoundingBox::new(left, top, width, height))
}

fn detection() -> impl Strategy<Value = Detection> {
  (bounding_box(), 0.0f32..=1.0, 0u32..80).prop_map(|(bounding_box, confidence, class_id)| {
    Detection {
      bounding_box,
      confidence,
      class_id,
      class_name: None,
    }
  })
}

fn candidate() -> impl Strategy<Value = Candidate> {
  (0.0f32..1.0, 0.0f32..1.0, 0.0f32..1.0, 0.0f32..1.0, 0.0f32..=1.0).prop_map(
    |(cx, cy, w, h, score)| Candidate {
      index: 0,
      cx,
      cy,
      w,
      h,
      class_id: 0,
      score,
    },
  )
}

proptest! {
  #[test]
  fn decode_yields_one_candidate_per_column(
    num_classes in 1usize..8,
    num_candidates in 0usize..32,
  ) {
    let features = 4 + num_classes;
    let output: Vec<f32> = (0..features * num_candidates).map(|i| (i % 7) as f32 / 7.0).collect();
    let candidates: Vec<_> = decode(&output, num_classes).unwrap().collect();
    prop_assert_eq!(candidates.len(), output.len() / features);
    for (i, candidate) in candidates.iter().enumerate() {
      prop_assert_eq!(candidate.index, i);
      prop_assert!((candidate.class_id as usize) < num_classes);
    }
  }

  #[test]
  fn decode_rejects_ragged_output(num_classes in 1usize..8, extra in 1usize..4) {
    let features = 4 + num_classes;
    let output = vec![0.0f32; features * 3 + extra.min(features - 1)];
    prop_assert!(decode(&output, num_classes).is_err());
  }

  #[test]
  fn filter_keeps_only_scores_above_threshold(
    candidates in prop::collection::vec(candidate(), 0..64),
    threshold in 0.0f32..=1.0,
  ) {
    let expected = candidates.iter().filter(|c| c.score > threshold).count();
    let kept: Vec<_> = filter(candidates, threshold, ImageSize::new(640, 480)).collect();
    prop_assert_eq!(kept.len(), expected);
    prop_assert!(kept.iter().all(|d| d.confidence > threshold));
  }

  #[test]
  fn suppression_is_idempotent(
    detections in prop::collection::vec(detection(), 0..48),
    threshold in 0.0f32..=1.0,
  ) {
    let once = suppress(detections, threshold);
    let twice = suppress(once.clone(), threshold);
    prop_assert_eq!(once, twice);
  }

  #[test]
  fn survivors_do_not_overlap_beyond_threshold(
    detections in prop::collection::vec(detection(), 0..48),
    threshold in 0.0f32..=1.0,
  ) {
    let input_len = detections.len();
    let kept = suppress(detections, threshold);
    prop_assert!(kept.len() <= input_len);
    for (i, a) in kept.iter().enumerate() {
      for b in &kept[i + 1..] {
        prop_assert!(a.bounding_box.iou(&b.bounding_box) <= threshold);
        prop_assert!(a.confidence >= b.confidence);
      }
    }
  }

  #[test]
  fn iou_is_symmetric_and_bounded(a in bounding_box(), b in bounding_box()) {
    let ab = a.iou(&b);
    prop_assert_eq!(ab, b.iou(&a));
    prop_assert!((0.0..=1.0).contains(&ab));
  }

  #[test]
  fn iou_with_itself_is_one(
    left in -500.0f32..500.0,
    top in -500.0f32..500.0,
    width in 1.0f32..500.0,
    height in 1.0f32..500.0,
  ) {
    let a = BoundingBox::new(left, top, width, height);
    prop_assert_eq!(a.iou(&a), 1.0);
  }

  #[test]
  fn disjoint_boxes_have_zero_iou(a in bounding_box(), gap in 0.0f32..100.0) {
    let b = BoundingBox::new(a.right() + gap, a.top, a.width, a.height);
    prop_assert_eq!(a.iou(&b), 0.0);
  }
}

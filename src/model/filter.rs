// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/filter.rs - 置信度过滤与坐标换算
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

use tracing::trace;

use crate::model::{BoundingBox, Detection, ImageSize, decode::Candidate};

/// 丢弃得分不高于阈值的候选，并将剩余候选换算为像素坐标的检测结果
///
/// 几何分量含 NaN 或无穷的候选同样被丢弃。
pub fn filter<I>(
  candidates: I,
  confidence_threshold: f32,
  image_size: ImageSize,
) -> impl Iterator<Item = Detection>
where
  I: IntoIterator<Item = Candidate>,
{
  candidates
    .into_iter()
    // NaN 得分在这里被丢弃
    .filter(move |candidate| candidate.score > confidence_threshold)
    .filter(|candidate| {
      let finite = [candidate.cx, candidate.cy, candidate.w, candidate.h]
        .iter()
        .all(|v| v.is_finite());
      if !finite {
        trace!("丢弃几何无效的候选 {}", candidate.index);
      }
      finite
    })
    .map(move |candidate| {
      trace!(
        "候选 {}: cx={}, cy={}, w={}, h={}, 得分={}, 类别={}",
        candidate.index,
        candidate.cx,
        candidate.cy,
        candidate.w,
        candidate.h,
        candidate.score,
        candidate.class_id
      );
      Detection {
        bounding_box: BoundingBox::from_normalized_center(
          candidate.cx,
          candidate.cy,
          candidate.w,
          candidate.h,
          image_size,
        ),
        confidence: candidate.score,
        class_id: candidate.class_id,
        class_name: None,
      }
    })
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/decode.rs - 输出张量解码
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

use ndarray::ArrayView2;
use thiserror::Error;
use tracing::debug;

/// 框几何特征数: cx, cy, w, h
pub const BOX_FEATURES: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
  #[error("输出张量长度 {len} 不能被特征数 {features} 整除")]
  NotDivisible { len: usize, features: usize },
  #[error("类别数量不能为零")]
  NoClasses,
}

/// 解码得到的候选框，坐标为归一化的中心点与宽高
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  /// 候选在模型输出中的序号
  pub index: usize,
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
  pub class_id: u32,
  pub score: f32,
}

/// 平面优先排布的模型输出视图，形状为 (4 + num_classes, num_candidates)
#[derive(Debug, Clone)]
pub struct OutputTensor<'a> {
  view: ArrayView2<'a, f32>,
  num_classes: usize,
}

impl<'a> OutputTensor<'a> {
  /// 校验长度后建立视图，此后的访问都在边界之内
  pub fn new(data: &'a [f32], num_classes: usize) -> Result<Self, ShapeError> {
    if num_classes == 0 {
      return Err(ShapeError::NoClasses);
    }
    let features = BOX_FEATURES + num_classes;
    if data.len() % features != 0 {
      return Err(ShapeError::NotDivisible {
        len: data.len(),
        features,
      });
    }
    let num_candidates = data.len() / features;
    let view = ArrayView2::from_shape((features, num_candidates), data).map_err(|_| {
      ShapeError::NotDivisible {
        len: data.len(),
        features,
      }
    })?;
    Ok(Self { view, num_classes })
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn num_features(&self) -> usize {
    BOX_FEATURES + self.num_classes
  }

  pub fn num_candidates(&self) -> usize {
    self.view.ncols()
  }

  /// 候选 i 的 (cx, cy, w, h)
  pub fn geometry(&self, i: usize) -> (f32, f32, f32, f32) {
    (
      self.view[[0, i]],
      self.view[[1, i]],
      self.view[[2, i]],
      self.view[[3, i]],
    )
  }

  /// 候选 i 在类别 j 上的得分
  pub fn class_score(&self, i: usize, j: usize) -> f32 {
    self.view[[BOX_FEATURES + j, i]]
  }

  /// 最高得分的类别；得分相同时取先出现者
  pub fn best_class(&self, i: usize) -> (u32, f32) {
    let scores = self.view.column(i);
    let mut best_id = 0usize;
    let mut best_score = f32::NEG_INFINITY;
    for (j, &score) in scores.iter().skip(BOX_FEATURES).enumerate() {
      if score > best_score {
        best_score = score;
        best_id = j;
      }
    }
    (best_id as u32, best_score)
  }

  pub fn candidate(&self, i: usize) -> Candidate {
    let (cx, cy, w, h) = self.geometry(i);
    let (class_id, score) = self.best_class(i);
    Candidate {
      index: i,
      cx,
      cy,
      w,
      h,
      class_id,
      score,
    }
  }

  /// 按候选序号依次惰性产生候选框
  pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
    (0..self.num_candidates()).map(move |i| self.candidate(i))
  }

  pub fn into_candidates(self) -> impl Iterator<Item = Candidate> + 'a {
    (0..self.num_candidates()).map(move |i| self.candidate(i))
  }
}

/// 将模型输出解码为候选框序列
pub fn decode(
  output: &[f32],
  num_classes: usize,
) -> Result<impl Iterator<Item = Candidate> + '_, ShapeError> {
  let tensor = OutputTensor::new(output, num_classes)?;
  debug!(
    "输出张量: 长度 {}, 特征数 {}, 候选数 {}",
    output.len(),
    tensor.num_features(),
    tensor.num_candidates()
  );
  Ok(tensor.into_candidates())
}

#[cfg(test)]
mod tests {
  use super::*;

  /// 按平面优先排布构造输出: rows[f][i]
  fn plane_major(rows: &[&[f32]]) -> Vec<f32> {
    rows.iter().flat_map(|row| row.iter().copied()).collect()
  }

  #[test]
  fn reads_plane_major_layout() {
    let data = plane_major(&[
      &[0.1, 0.2, 0.3],
      &[0.4, 0.5, 0.6],
      &[0.7, 0.8, 0.9],
      &[1.0, 1.1, 1.2],
      &[0.9, 0.1, 0.0],
      &[0.2, 0.8, 0.3],
    ]);
    let candidates: Vec<_> = decode(&data, 2).unwrap().collect();
    assert_eq!(candidates.len(), 3);

    assert_eq!(candidates[1].index, 1);
    assert_eq!(
      (candidates[1].cx, candidates[1].cy, candidates[1].w, candidates[1].h),
      (0.2, 0.5, 0.8, 1.1)
    );
    assert_eq!((candidates[0].class_id, candidates[0].score), (0, 0.9));
    assert_eq!((candidates[1].class_id, candidates[1].score), (1, 0.8));
    assert_eq!((candidates[2].class_id, candidates[2].score), (1, 0.3));
  }

  #[test]
  fn ties_keep_first_class() {
    let data = plane_major(&[&[0.5], &[0.5], &[0.1], &[0.1], &[0.7], &[0.7], &[0.7]]);
    let candidate = decode(&data, 3).unwrap().next().unwrap();
    assert_eq!(candidate.class_id, 0);
    assert_eq!(candidate.score, 0.7);
  }

  #[test]
  fn negative_scores_still_pick_a_class() {
    let data = plane_major(&[&[0.5], &[0.5], &[0.1], &[0.1], &[-3.0], &[-1.0]]);
    let candidate = decode(&data, 2).unwrap().next().unwrap();
    assert_eq!((candidate.class_id, candidate.score), (1, -1.0));
  }

  #[test]
  fn rejects_length_mismatch() {
    let data = vec![0.0; 6 * 3 + 1];
    assert_eq!(
      decode(&data, 2).err(),
      Some(ShapeError::NotDivisible {
        len: 19,
        features: 6
      })
    );
  }

  #[test]
  fn rejects_zero_classes() {
    assert_eq!(decode(&[0.0; 8], 0).err(), Some(ShapeError::NoClasses));
  }

  #[test]
  fn empty_output_has_no_candidates() {
    assert_eq!(decode(&[], 80).unwrap().count(), 0);
  }

  #[test]
  fn view_accessors() {
    let data = plane_major(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0], &[7.0, 8.0], &[0.1, 0.2]]);
    let tensor = OutputTensor::new(&data, 1).unwrap();
    assert_eq!(tensor.num_candidates(), 2);
    assert_eq!(tensor.num_features(), 5);
    assert_eq!(tensor.geometry(1), (2.0, 4.0, 6.0, 8.0));
    assert_eq!(tensor.class_score(1, 0), 0.2);
    assert_eq!(tensor.candidates().count(), 2);
  }
}

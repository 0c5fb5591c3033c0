// 该文件是 Qianli （千里眼） 项目的一部分。
// src/tensor.rs - 模型输入张量定义
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

use std::str::FromStr;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

pub const RGB_CHANNELS: usize = 3;

/// 输入张量的通道排布，必须与推理引擎的约定一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
  /// R 平面、G 平面、B 平面依次存放
  #[default]
  Nchw,
  /// 每个像素的 R、G、B 交错存放
  Nhwc,
}

impl FromStr for TensorLayout {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "nchw" | "planar" => Ok(TensorLayout::Nchw),
      "nhwc" | "interleaved" => Ok(TensorLayout::Nhwc),
      other => Err(format!("未知的张量排布: {}", other)),
    }
  }
}

/// 归一化到 [0, 1] 的 RGB 正方形输入张量
#[derive(Debug, Clone)]
pub struct InputTensor {
  side: usize,
  layout: TensorLayout,
  data: Array3<f32>,
}

impl InputTensor {
  /// 创建全零张量
  pub fn zeros(side: usize, layout: TensorLayout) -> Self {
    let data = match layout {
      TensorLayout::Nchw => Array3::zeros((RGB_CHANNELS, side, side)),
      TensorLayout::Nhwc => Array3::zeros((side, side, RGB_CHANNELS)),
    };
    Self { side, layout, data }
  }

  pub fn side(&self) -> usize {
    self.side
  }

  pub fn layout(&self) -> TensorLayout {
    self.layout
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// 带批次维度的四维形状
  pub fn shape(&self) -> [usize; 4] {
    match self.layout {
      TensorLayout::Nchw => [1, RGB_CHANNELS, self.side, self.side],
      TensorLayout::Nhwc => [1, self.side, self.side, RGB_CHANNELS],
    }
  }

  /// 读取 (通道, 行, 列) 处的值，与排布无关
  pub fn get(&self, channel: usize, y: usize, x: usize) -> Option<f32> {
    match self.layout {
      TensorLayout::Nchw => self.data.get((channel, y, x)).copied(),
      TensorLayout::Nhwc => self.data.get((y, x, channel)).copied(),
    }
  }

  pub(crate) fn set(&mut self, channel: usize, y: usize, x: usize, value: f32) {
    match self.layout {
      TensorLayout::Nchw => self.data[[channel, y, x]] = value,
      TensorLayout::Nhwc => self.data[[y, x, channel]] = value,
    }
  }

  /// 按内存顺序排列的浮点数据
  pub fn as_slice(&self) -> &[f32] {
    // 张量始终由 zeros 以标准布局创建
    self
      .data
      .as_slice()
      .unwrap_or_default()
  }

  /// 按小端字节序打包，供只接受原始字节缓冲区的运行时使用
  pub fn to_le_bytes(&self) -> Vec<u8> {
    self
      .as_slice()
      .iter()
      .flat_map(|v| v.to_le_bytes())
      .collect()
  }
}

impl AsRef<[f32]> for InputTensor {
  fn as_ref(&self) -> &[f32] {
    self.as_slice()
  }
}

/// 将小端字节序的 f32 缓冲区还原为浮点数组；长度不是 4 的倍数时返回 None
pub fn f32_from_le_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
  if bytes.len() % 4 != 0 {
    return None;
  }
  Some(
    bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect(),
  )
}

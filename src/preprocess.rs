// 该文件是 Qianli （千里眼） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use image::{DynamicImage, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::tensor::{InputTensor, TensorLayout};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("图像尺寸为零: {width}x{height}")]
  ZeroSized { width: u32, height: u32 },
  #[error("模型输入边长不能为零")]
  ZeroSide,
}

/// 从文件读取并解码图像
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage, PreprocessError> {
  let path = path.as_ref();
  debug!("读取图像文件: {}", path.display());
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(image)
}

/// 从内存缓冲区解码图像
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PreprocessError> {
  Ok(image::load_from_memory(bytes)?)
}

/// 拉伸缩放到 side x side（不保持宽高比），并提取归一化的 RGB 张量
pub fn preprocess(
  image: &DynamicImage,
  side: u32,
  layout: TensorLayout,
) -> Result<InputTensor, PreprocessError> {
  let (width, height) = (image.width(), image.height());
  if width == 0 || height == 0 {
    return Err(PreprocessError::ZeroSized { width, height });
  }
  if side == 0 {
    return Err(PreprocessError::ZeroSide);
  }

  // to_rgb8 丢弃 alpha 通道
  let rgb = image.to_rgb8();
  let resized = image::imageops::resize(&rgb, side, side, FilterType::Triangle);
  debug!(
    "图像缩放: {}x{} -> {}x{} ({:?})",
    width, height, side, side, layout
  );

  let mut tensor = InputTensor::zeros(side as usize, layout);
  for (x, y, pixel) in resized.enumerate_pixels() {
    for c in 0..tensor.channels() {
      tensor.set(c, y as usize, x as usize, pixel[c] as f32 / 255.0);
    }
  }

  Ok(tensor)
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/input.rs - 图像输入
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

use image::DynamicImage;
use thiserror::Error;

use crate::{FromUrl, model::ImageSize, preprocess::PreprocessError};

/// 一帧待检测图像
#[derive(Debug, Clone)]
pub struct ImageFrame {
  pub image: DynamicImage,
  /// 图像来源（文件路径）
  pub source: PathBuf,
  /// 在输入序列中的序号，从 0 开始
  pub index: usize,
}

impl ImageFrame {
  pub fn new(image: DynamicImage, source: impl Into<PathBuf>, index: usize) -> Self {
    Self {
      image,
      source: source.into(),
      index,
    }
  }

  pub fn size(&self) -> ImageSize {
    ImageSize::from(&self.image)
  }
}

#[cfg(feature = "read_image_file")]
mod folder;
#[cfg(feature = "read_image_file")]
mod read_image_file;

#[cfg(feature = "read_image_file")]
pub use self::folder::FolderInput;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像读取错误 {path}: {source}")]
  Image {
    path: PathBuf,
    #[source]
    source: PreprocessError,
  },
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("输入目录中没有图像: {0}")]
  EmptyFolder(PathBuf),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ImageFile(ImageFileInput),
  #[cfg(feature = "read_image_file")]
  Folder(FolderInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?));
      }
      if url.scheme() == FolderInput::SCHEME {
        return Ok(InputWrapper::Folder(FolderInput::from_url(url)?));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.next(),
      #[cfg(feature = "read_image_file")]
      InputWrapper::Folder(input) => input.next(),
      #[allow(unreachable_patterns)]
      _ => None,
    }
  }
}

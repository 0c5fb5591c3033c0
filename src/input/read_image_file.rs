// 该文件是 Qianli （千里眼） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{ImageFrame, InputError},
  preprocess::load_image,
  url_file_path,
};

/// 单张图像文件，只产生一帧
pub struct ImageFileInput {
  path: PathBuf,
  image: Option<image::DynamicImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    Self::open(url_file_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
    let path = path.as_ref().to_path_buf();
    let image = load_image(&path).map_err(|source| InputError::Image {
      path: path.clone(),
      source,
    })?;
    info!(
      "图像已打开: {} ({}x{})",
      path.display(),
      image.width(),
      image.height()
    );
    Ok(Self {
      path,
      image: Some(image),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self
      .image
      .take()
      .map(|image| Ok(ImageFrame::new(image, self.path.clone(), 0)))
  }
}

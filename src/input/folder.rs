// 该文件是 Qianli （千里眼） 项目的一部分。
// src/input/folder.rs - 图像目录输入
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

use std::{
  path::{Path, PathBuf},
  vec::IntoIter,
};

use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{ImageFrame, InputError},
  preprocess::load_image,
  url_file_path,
};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

/// 目录下的全部图像，按文件名排序后逐张解码
pub struct FolderInput {
  files: IntoIter<PathBuf>,
  index: usize,
}

impl FromUrlWithScheme for FolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for FolderInput {
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

fn is_image_file(path: &Path) -> bool {
  path.is_file()
    && path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| {
        IMAGE_EXTENSIONS
          .iter()
          .any(|known| ext.eq_ignore_ascii_case(known))
      })
      .unwrap_or(false)
}

impl FolderInput {
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, InputError> {
    let dir = dir.as_ref();
    let mut files = std::fs::read_dir(dir)?
      .map(|entry| entry.map(|e| e.path()))
      .collect::<Result<Vec<_>, _>>()?;
    files.retain(|path| is_image_file(path));
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
      return Err(InputError::EmptyFolder(dir.to_path_buf()));
    }
    info!("输入目录 {} 中共有 {} 张图像", dir.display(), files.len());

    Ok(Self {
      files: files.into_iter(),
      index: 0,
    })
  }

  /// 尚未读取的图像数量
  pub fn remaining(&self) -> usize {
    self.files.len()
  }
}

impl Iterator for FolderInput {
  type Item = Result<ImageFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let index = self.index;
    self.index += 1;
    debug!("读取第 {} 张图像: {}", index, path.display());

    Some(
      load_image(&path)
        .map(|image| ImageFrame::new(image, path.clone(), index))
        .map_err(|source| InputError::Image { path, source }),
    )
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.files.size_hint()
  }
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/engine/tensor_dump.rs - 回放导出的输出张量
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

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{EngineLoadError, InferenceEngine, InferenceError},
  tensor::{InputTensor, f32_from_le_bytes},
  url_file_path,
};

/// 每次推理都返回同一份预先导出的输出张量（小端 f32）
///
/// 用于离线调试后处理，不需要推理运行时。
#[derive(Debug, Clone)]
pub struct TensorDumpEngine {
  output: Vec<f32>,
}

impl FromUrlWithScheme for TensorDumpEngine {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorDumpEngine {
  type Error = EngineLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineLoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }
    Self::load(url_file_path(url))
  }
}

impl TensorDumpEngine {
  pub fn new(output: Vec<f32>) -> Self {
    Self { output }
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineLoadError> {
    let path = path.as_ref();
    info!("加载输出张量文件: {}", path.display());
    let bytes = std::fs::read(path)?;
    let output = f32_from_le_bytes(&bytes).ok_or_else(|| {
      EngineLoadError::InvalidModel(format!(
        "文件长度 {} 不是 4 的倍数: {}",
        bytes.len(),
        path.display()
      ))
    })?;
    debug!("输出张量长度: {}", output.len());
    Ok(Self { output })
  }

  pub fn output(&self) -> &[f32] {
    &self.output
  }
}

impl InferenceEngine for TensorDumpEngine {
  fn predict(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
    debug!("回放输出张量, 输入形状 {:?}", input.shape());
    Ok(self.output.clone())
  }
}

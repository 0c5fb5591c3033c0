// 该文件是 Qianli （千里眼） 项目的一部分。
// src/engine/onnx.rs - ONNX Runtime 推理引擎
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

use ort::{session::Session, value::Tensor};
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  engine::{EngineLoadError, InferenceEngine, InferenceError},
  tensor::InputTensor,
  url_file_path, url_query,
};

const ONNX_DEFAULT_THREADS: usize = 2;

pub struct OnnxEngine {
  session: Session,
}

fn runtime_error(err: impl std::fmt::Display) -> EngineLoadError {
  EngineLoadError::Runtime(err.to_string())
}

impl FromUrlWithScheme for OnnxEngine {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxEngine {
  type Error = EngineLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EngineLoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let threads = match url_query(url, "threads") {
      Some(value) => value.parse().map_err(|_| {
        EngineLoadError::ModelPathError(format!("threads 参数无效: {}", value))
      })?,
      None => ONNX_DEFAULT_THREADS,
    };

    Self::load(url_file_path(url), threads)
  }
}

impl OnnxEngine {
  pub fn load(path: impl AsRef<Path>, threads: usize) -> Result<Self, EngineLoadError> {
    let path = path.as_ref();
    info!("加载模型文件: {}", path.display());
    if !path.is_file() {
      return Err(EngineLoadError::ModelPathError(format!(
        "模型文件不存在: {}",
        path.display()
      )));
    }

    info!("创建 ONNX Runtime 推理会话, 线程数 {}", threads);
    let builder = Session::builder().map_err(runtime_error)?;
    let builder = builder.with_intra_threads(threads).map_err(runtime_error)?;
    let session = builder.commit_from_file(path).map_err(runtime_error)?;
    info!("模型加载完成");

    Ok(Self { session })
  }
}

impl InferenceEngine for OnnxEngine {
  fn predict(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
    debug!("设置模型输入 {:?}", input.shape());
    let value = Tensor::from_array((input.shape(), input.as_slice().to_vec()))
      .map_err(|e| InferenceError::new(e.to_string()))?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![value])
      .map_err(|e| InferenceError::new(e.to_string()))?;

    let (shape, data) = outputs[0]
      .try_extract_tensor::<f32>()
      .map_err(|e| InferenceError::new(e.to_string()))?;
    debug!("模型输出形状: {:?}", shape);

    Ok(data.to_vec())
  }
}

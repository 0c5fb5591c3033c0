// 该文件是 Qianli （千里眼） 项目的一部分。
// src/engine.rs - 推理引擎
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, tensor::InputTensor};

/// 推理引擎：输入张量到原始输出张量的黑盒映射
///
/// `predict` 需要可变借用，同一个模型实例上的调用因此总是串行的。
pub trait InferenceEngine {
  fn predict(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
  fn predict(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
    (**self).predict(input)
  }
}

/// 推理引擎返回的错误，原样向上传递
#[derive(Error, Debug)]
#[error(transparent)]
pub struct InferenceError(#[from] Box<dyn std::error::Error + Send + Sync>);

impl InferenceError {
  pub fn new<E>(err: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    InferenceError(err.into())
  }
}

#[derive(Error, Debug)]
pub enum EngineLoadError {
  #[error("模型加载错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  InvalidModel(String),
  #[error("推理运行时错误: {0}")]
  Runtime(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

mod tensor_dump;
pub use self::tensor_dump::TensorDumpEngine;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxEngine;

/// 按模型 URL 方案选择的推理引擎
pub enum EngineWrapper {
  #[cfg(feature = "onnx")]
  Onnx(OnnxEngine),
  TensorDump(TensorDumpEngine),
}

impl FromUrl for EngineWrapper {
  type Error = EngineLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "onnx")]
    {
      if url.scheme() == OnnxEngine::SCHEME {
        return Ok(EngineWrapper::Onnx(OnnxEngine::from_url(url)?));
      }
    }
    if url.scheme() == TensorDumpEngine::SCHEME {
      return Ok(EngineWrapper::TensorDump(TensorDumpEngine::from_url(url)?));
    }
    Err(EngineLoadError::SchemeMismatch(format!(
      "不支持的模型方案 '{}'",
      url.scheme()
    )))
  }
}

impl InferenceEngine for EngineWrapper {
  fn predict(&mut self, input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
    match self {
      #[cfg(feature = "onnx")]
      EngineWrapper::Onnx(engine) => engine.predict(input),
      EngineWrapper::TensorDump(engine) => engine.predict(input),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Failing;

  impl InferenceEngine for Failing {
    fn predict(&mut self, _input: &InputTensor) -> Result<Vec<f32>, InferenceError> {
      Err(InferenceError::new("device lost"))
    }
  }

  #[test]
  fn inference_error_is_transparent() {
    let mut engine: Box<dyn InferenceEngine> = Box::new(Failing);
    let input = InputTensor::zeros(1, Default::default());
    let err = engine.predict(&input).unwrap_err();
    assert_eq!(err.to_string(), "device lost");
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("tflite:///models/yolo.tflite").unwrap();
    assert!(matches!(
      EngineWrapper::from_url(&url),
      Err(EngineLoadError::SchemeMismatch(_))
    ));
  }
}

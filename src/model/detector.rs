// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model/detector.rs - YOLO 目标检测流水线
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

use std::{str::FromStr, time::Instant};

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl,
  engine::{EngineLoadError, EngineWrapper, InferenceEngine, InferenceError},
  input::ImageFrame,
  model::{
    ConfigError, DetectResult, DetectStats, Detection, ImageSize, Model, Thresholds,
    decode::{ShapeError, decode},
    filter::filter,
    label::Vocabulary,
    nms::suppress,
  },
  preprocess::{PreprocessError, preprocess},
  tensor::TensorLayout,
  url_query,
};

pub const DEFAULT_INPUT_SIDE: u32 = 640;
pub const DEFAULT_NUM_CLASSES: usize = 80;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("模型未加载, 请先调用 load")]
  NotLoaded,
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("输出张量形状错误: {0}")]
  Shape(#[from] ShapeError),
  #[error("推理错误: {0}")]
  Inference(#[from] InferenceError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

/// 检测流水线配置，张量相关参数必须与所用模型一致
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  pub input_side: u32,
  pub num_classes: usize,
  pub layout: TensorLayout,
  pub thresholds: Thresholds,
  /// NMS 之后最多保留的检测数，None 表示不限制
  pub max_detections: Option<usize>,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      input_side: DEFAULT_INPUT_SIDE,
      num_classes: DEFAULT_NUM_CLASSES,
      layout: TensorLayout::default(),
      thresholds: Thresholds::default(),
      max_detections: None,
    }
  }
}

impl DetectorConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.input_side == 0 {
      return Err(ConfigError::ZeroInputSide);
    }
    if self.num_classes == 0 {
      return Err(ConfigError::ZeroClasses);
    }
    self.thresholds.validate()
  }
}

/// 解码、过滤、NMS 并解析类别名称，返回结果与进入 NMS 前的候选数
fn postprocess_counted(
  output: &[f32],
  image_size: ImageSize,
  num_classes: usize,
  thresholds: Thresholds,
  vocabulary: &Vocabulary,
) -> Result<(Vec<Detection>, usize), ShapeError> {
  let candidates = decode(output, num_classes)?;
  let filtered: Vec<Detection> = filter(candidates, thresholds.confidence, image_size).collect();
  let before_nms = filtered.len();
  debug!("NMS 前候选数: {}", before_nms);

  let detections = suppress(filtered, thresholds.iou)
    .into_iter()
    .map(|detection| {
      let name = vocabulary.resolve(detection.class_id).map(str::to_string);
      detection.with_class_name(name)
    })
    .collect();

  Ok((detections, before_nms))
}

/// 不依赖推理引擎的后处理：原始输出张量 -> 最终检测结果
pub fn postprocess(
  output: &[f32],
  image_size: ImageSize,
  num_classes: usize,
  thresholds: Thresholds,
  vocabulary: &Vocabulary,
) -> Result<Vec<Detection>, ShapeError> {
  postprocess_counted(output, image_size, num_classes, thresholds, vocabulary)
    .map(|(detections, _)| detections)
}

/// 持有推理引擎的检测器，引擎需显式加载与卸载
pub struct Detector<E> {
  engine: Option<E>,
  config: DetectorConfig,
  vocabulary: Vocabulary,
}

impl<E: InferenceEngine> Detector<E> {
  /// 创建尚未加载引擎的检测器
  pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self {
      engine: None,
      config,
      vocabulary: Vocabulary::coco(),
    })
  }

  pub fn with_engine(config: DetectorConfig, engine: E) -> Result<Self, ConfigError> {
    let mut detector = Self::new(config)?;
    detector.load(engine);
    Ok(detector)
  }

  pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
    if vocabulary.len() != self.config.num_classes {
      warn!(
        "标签数量 {} 与模型类别数 {} 不一致",
        vocabulary.len(),
        self.config.num_classes
      );
    }
    self.vocabulary = vocabulary;
    self
  }

  /// 加载引擎，返回之前加载的引擎（如有）
  pub fn load(&mut self, engine: E) -> Option<E> {
    info!("加载推理引擎");
    self.engine.replace(engine)
  }

  /// 卸载引擎，之后的检测调用返回 NotLoaded
  pub fn unload(&mut self) -> Option<E> {
    info!("卸载推理引擎");
    self.engine.take()
  }

  pub fn is_loaded(&self) -> bool {
    self.engine.is_some()
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  /// 使用配置中的阈值检测
  pub fn detect(&mut self, image: &DynamicImage) -> Result<DetectResult, DetectError> {
    let thresholds = self.config.thresholds;
    self.detect_with(image, thresholds)
  }

  /// 使用本次调用指定的阈值检测
  pub fn detect_with(
    &mut self,
    image: &DynamicImage,
    thresholds: Thresholds,
  ) -> Result<DetectResult, DetectError> {
    thresholds.validate()?;
    let engine = self.engine.as_mut().ok_or(DetectError::NotLoaded)?;

    let start = Instant::now();
    let input = preprocess(image, self.config.input_side, self.config.layout)?;
    let preprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

    debug!("执行模型推理");
    let start = Instant::now();
    let output = engine.predict(&input)?;
    let inference_ms = start.elapsed().as_secs_f64() * 1000.0;

    let start = Instant::now();
    let (mut detections, candidates_before_nms) = postprocess_counted(
      &output,
      ImageSize::from(image),
      self.config.num_classes,
      thresholds,
      &self.vocabulary,
    )?;

    let truncated = match self.config.max_detections {
      Some(limit) if detections.len() > limit => {
        warn!("检测数 {} 超过上限 {}, 已截断", detections.len(), limit);
        detections.truncate(limit);
        true
      }
      _ => false,
    };
    let postprocess_ms = start.elapsed().as_secs_f64() * 1000.0;

    debug!(
      "检测到 {} 个物体, 预处理 {:.2}ms, 推理 {:.2}ms, 后处理 {:.2}ms",
      detections.len(),
      preprocess_ms,
      inference_ms,
      postprocess_ms
    );

    Ok(DetectResult {
      items: detections.into_boxed_slice(),
      stats: DetectStats {
        candidates_before_nms,
        truncated,
        preprocess_ms,
        inference_ms,
        postprocess_ms,
      },
    })
  }
}

impl<E: InferenceEngine> Model for Detector<E> {
  type Input = ImageFrame;
  type Output = DetectResult;
  type Error = DetectError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(&input.image)
  }
}

#[derive(Error, Debug)]
pub enum DetectorBuildError {
  #[error("模型加载错误: {0}")]
  Engine(#[from] EngineLoadError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("标签文件错误: {0}")]
  Vocabulary(#[from] crate::model::VocabularyError),
}

/// 由模型 URL 构建检测器
///
/// 例如 `onnx:///models/yolo11n.onnx?side=640&classes=80&layout=nchw&threads=2`
/// 或 `tensor:///tmp/output.bin?classes=80`。
pub struct DetectorBuilder {
  model_url: Url,
  config: DetectorConfig,
  vocabulary: Option<Vocabulary>,
}

fn parse_query<T: FromStr>(url: &Url, key: &str) -> Result<Option<T>, ConfigError> {
  match url_query(url, key) {
    Some(value) => value
      .parse()
      .map(Some)
      .map_err(|_| ConfigError::InvalidParameter {
        key: key.to_string(),
        value,
      }),
    None => Ok(None),
  }
}

impl FromUrl for DetectorBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let mut config = DetectorConfig::default();
    if let Some(side) = parse_query(url, "side")? {
      config.input_side = side;
    }
    if let Some(classes) = parse_query(url, "classes")? {
      config.num_classes = classes;
    }
    if let Some(layout) = parse_query(url, "layout")? {
      config.layout = layout;
    }
    config.max_detections = parse_query(url, "max")?;

    Ok(DetectorBuilder {
      model_url: url.clone(),
      config,
      vocabulary: None,
    })
  }
}

impl DetectorBuilder {
  pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
    self.config.thresholds = thresholds;
    self
  }

  pub fn vocabulary(mut self, vocabulary: Vocabulary) -> Self {
    self.vocabulary = Some(vocabulary);
    self
  }

  pub fn max_detections(mut self, max_detections: Option<usize>) -> Self {
    self.config.max_detections = max_detections;
    self
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn build(self) -> Result<Detector<EngineWrapper>, DetectorBuildError> {
    self.config.validate()?;
    info!("模型: {}", self.model_url);
    debug!("检测器配置: {:?}", self.config);
    let engine = EngineWrapper::from_url(&self.model_url)?;
    let mut detector = Detector::with_engine(self.config, engine)?;
    if let Some(vocabulary) = self.vocabulary {
      detector = detector.with_vocabulary(vocabulary);
    }
    Ok(detector)
  }
}

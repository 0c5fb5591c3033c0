// 该文件是 Qianli （千里眼） 项目的一部分。
// src/worker.rs - 后台检测线程
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
  sync::mpsc::{self, Receiver, Sender, TryRecvError},
  thread::{self, JoinHandle},
};

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  engine::InferenceEngine,
  model::{DetectError, DetectResult, Detector, Thresholds},
};

#[derive(Error, Debug)]
pub enum WorkerError {
  #[error("检测线程已退出")]
  Closed,
  #[error("检测线程异常退出")]
  Panicked,
  #[error("无法创建检测线程: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("检测错误: {0}")]
  Detect(#[from] DetectError),
}

type Reply = Result<DetectResult, DetectError>;

struct Request {
  image: DynamicImage,
  thresholds: Option<Thresholds>,
  reply: Sender<Reply>,
}

/// 已提交、尚未取回的检测请求
pub struct PendingDetection {
  reply: Receiver<Reply>,
}

impl PendingDetection {
  /// 阻塞直到检测完成
  pub fn wait(self) -> Result<DetectResult, WorkerError> {
    let reply = self.reply.recv().map_err(|_| WorkerError::Closed)?;
    Ok(reply?)
  }

  /// 不阻塞地查询结果，尚未完成时返回 None
  pub fn try_wait(&self) -> Option<Result<DetectResult, WorkerError>> {
    match self.reply.try_recv() {
      Ok(reply) => Some(reply.map_err(WorkerError::from)),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => Some(Err(WorkerError::Closed)),
    }
  }
}

/// 在独立线程上持有检测器，按提交顺序逐个处理请求
pub struct DetectWorker<E: InferenceEngine + Send + 'static> {
  queue: Option<Sender<Request>>,
  handle: Option<JoinHandle<Detector<E>>>,
}

fn serve<E: InferenceEngine>(mut detector: Detector<E>, queue: Receiver<Request>) -> Detector<E> {
  info!("检测线程启动");
  let mut served = 0usize;
  for request in queue {
    let thresholds = request
      .thresholds
      .unwrap_or(detector.config().thresholds);
    let reply = detector.detect_with(&request.image, thresholds);
    served += 1;
    if request.reply.send(reply).is_err() {
      debug!("第 {} 个请求的结果无人接收", served);
    }
  }
  info!("检测线程退出, 共处理 {} 个请求", served);
  detector
}

impl<E: InferenceEngine + Send + 'static> DetectWorker<E> {
  pub fn spawn(detector: Detector<E>) -> Result<Self, WorkerError> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
      .name("qianli-detect".to_string())
      .spawn(move || serve(detector, rx))?;
    Ok(Self {
      queue: Some(tx),
      handle: Some(handle),
    })
  }

  /// 提交一帧图像；thresholds 为 None 时使用检测器配置中的阈值
  pub fn submit(
    &self,
    image: DynamicImage,
    thresholds: Option<Thresholds>,
  ) -> Result<PendingDetection, WorkerError> {
    let queue = self.queue.as_ref().ok_or(WorkerError::Closed)?;
    let (reply, rx) = mpsc::channel();
    queue
      .send(Request {
        image,
        thresholds,
        reply,
      })
      .map_err(|_| WorkerError::Closed)?;
    Ok(PendingDetection { reply: rx })
  }

  /// 关闭请求队列，等待已提交的请求处理完毕并取回检测器
  pub fn shutdown(mut self) -> Result<Detector<E>, WorkerError> {
    self.queue.take();
    let handle = self.handle.take().ok_or(WorkerError::Closed)?;
    handle.join().map_err(|_| WorkerError::Panicked)
  }
}

impl<E: InferenceEngine + Send + 'static> Drop for DetectWorker<E> {
  fn drop(&mut self) {
    self.queue.take();
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        warn!("检测线程异常退出");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{engine::TensorDumpEngine, model::DetectorConfig};

  fn worker(output: Vec<f32>) -> DetectWorker<TensorDumpEngine> {
    let config = DetectorConfig {
      input_side: 8,
      num_classes: 2,
      ..DetectorConfig::default()
    };
    let detector = Detector::with_engine(config, TensorDumpEngine::new(output)).unwrap();
    DetectWorker::spawn(detector).unwrap()
  }

  #[test]
  fn results_follow_submission_order() {
    // 一个候选，类别 0 得分 0.9，类别 1 得分 0.1
    let worker = worker(vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1]);
    let pending: Vec<_> = [(100, 100), (200, 50), (40, 80)]
      .into_iter()
      .map(|(w, h)| {
        worker
          .submit(DynamicImage::new_rgb8(w, h), None)
          .unwrap()
      })
      .collect();

    let sizes = [(100.0, 100.0), (200.0, 50.0), (40.0, 80.0)];
    for (pending, (w, h)) in pending.into_iter().zip(sizes) {
      let result = pending.wait().unwrap();
      assert_eq!(result.len(), 1);
      let bbox = result.items[0].bounding_box;
      assert!((bbox.width - 0.2 * w).abs() < 1e-3);
      assert!((bbox.height - 0.2 * h).abs() < 1e-3);
    }
    let detector = worker.shutdown().unwrap();
    assert!(detector.is_loaded());
  }

  #[test]
  fn per_request_thresholds() {
    let worker = worker(vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1]);
    let strict = worker
      .submit(DynamicImage::new_rgb8(10, 10), Some(Thresholds::new(0.95, 0.5).unwrap()))
      .unwrap();
    assert!(strict.wait().unwrap().is_empty());
  }

  #[test]
  fn detection_errors_are_forwarded() {
    // 长度 5 不能被 4 + 2 整除
    let worker = worker(vec![0.0; 5]);
    let pending = worker.submit(DynamicImage::new_rgb8(4, 4), None).unwrap();
    assert!(matches!(
      pending.wait(),
      Err(WorkerError::Detect(DetectError::Shape(_)))
    ));
    // 出错之后线程仍可继续服务
    let pending = worker.submit(DynamicImage::new_rgb8(4, 4), None).unwrap();
    assert!(pending.wait().is_err());
  }

  #[test]
  fn unloaded_detector_reports_not_loaded() {
    let mut detector = Detector::<TensorDumpEngine>::new(DetectorConfig::default()).unwrap();
    assert!(detector.unload().is_none());
    let worker = DetectWorker::spawn(detector).unwrap();
    let pending = worker.submit(DynamicImage::new_rgb8(4, 4), None).unwrap();
    assert!(matches!(
      pending.wait(),
      Err(WorkerError::Detect(DetectError::NotLoaded))
    ));
  }

  #[test]
  fn try_wait_eventually_ready() {
    let worker = worker(vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1]);
    let pending = worker.submit(DynamicImage::new_rgb8(4, 4), None).unwrap();
    let result = loop {
      if let Some(result) = pending.try_wait() {
        break result;
      }
      thread::yield_now();
    };
    assert_eq!(result.unwrap().len(), 1);
  }
}

// 该文件是 Qianli （千里眼） 项目的一部分。
// src/task.rs - 任务执行器
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
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  type Summary;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Summary, Self::Error>;
}

/// 只处理第一帧
pub struct OneShotTask;

impl<F, D, IE, ME, RE, I, M, O> Task<I, M, O> for OneShotTask
where
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
{
  type Error = anyhow::Error;
  type Summary = D;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<D, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

/// 对同一帧重复推理，统计平均耗时
pub struct RepeatShotTask {
  times: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      times: 1000,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn new(times: usize) -> Self {
    Self {
      times,
      ..Self::default()
    }
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }
}

impl<F, D, IE, ME, RE, I, M, O> Task<I, M, O> for RepeatShotTask
where
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
{
  type Error = anyhow::Error;
  /// 预热之后的平均耗时；次数不足时为 None
  type Summary = Option<Duration>;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<Self::Summary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.times);
    for i in 0..self.times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      times.push(elapsed);
    }

    let measured = &times[self.warmup.min(times.len())..];
    if measured.is_empty() {
      warn!("重复次数 {} 不超过预热次数 {}，不统计平均时间", self.times, self.warmup);
      return Ok(None);
    }
    let average = measured.iter().sum::<Duration>() / measured.len() as u32;
    warn!("平均推理时间: {:.2?}", average);

    Ok(Some(average))
  }
}

/// 逐帧处理整个输入，直到输入结束、达到帧数或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 注册 Ctrl-C 处理；每个进程只能注册一次
  pub fn with_interrupt(mut self) -> Self {
    self.handle_interrupt = true;
    self
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuousSummary {
  pub processed: usize,
  pub skipped: usize,
}

impl<F, D, IE, ME, RE, I, M, O> Task<I, M, O> for ContinuousTask
where
  IE: std::error::Error + Sync + Send + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
{
  type Error = anyhow::Error;
  type Summary = ContinuousSummary;

  fn run_task(self, input: I, mut model: M, output: O) -> Result<Self::Summary, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let mut summary = ContinuousSummary::default();
    let mut now = Instant::now();
    for frame in input {
      let frame = match frame {
        Ok(frame) => frame,
        Err(err) => {
          warn!("跳过无法读取的帧: {}", err);
          summary.skipped += 1;
          continue;
        }
      };
      summary.processed += 1;
      info!("处理第 {} 帧图像", summary.processed);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| summary.processed >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.processed);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 帧，跳过 {} 帧",
      summary.processed, summary.skipped
    );
    Ok(summary)
  }
}

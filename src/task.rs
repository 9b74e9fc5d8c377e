// 该文件是 EcoQuest 项目的一部分。
// src/task.rs - 分类任务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{sync::mpsc::Receiver, time::Duration};
use tracing::{error, info, warn};

use crate::{
  input::RawImage,
  model::{BuildModel, Classifier},
  output::Render,
  pipeline::{ClassificationReport, Pipeline},
};

pub trait Task<I, B: BuildModel, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    pipeline: &Pipeline<B>,
    output: &O,
  ) -> impl std::future::Future<Output = Result<(), Self::Error>>;
}

pub struct OneShotTask;

impl<I, B, O, RE> Task<I, B, O> for OneShotTask
where
  I: Iterator<Item = RawImage>,
  B: BuildModel + Send + Sync + 'static,
  B::Model: Classifier,
  B::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RawImage, ClassificationReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(self, mut input: I, pipeline: &Pipeline<B>, output: &O) -> anyhow::Result<()> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始推理...");
    let now = std::time::Instant::now();
    let result = pipeline.classify(frame.clone()).await?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一张图像重复分类，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  const WARMUP: usize = 2;

  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times.max(Self::WARMUP + 1);
    self
  }
}

impl<I, B, O, RE> Task<I, B, O> for RepeatShotTask
where
  I: Iterator<Item = RawImage>,
  B: BuildModel + Send + Sync + 'static,
  B::Model: Classifier,
  B::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RawImage, ClassificationReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(self, mut input: I, pipeline: &Pipeline<B>, output: &O) -> anyhow::Result<()> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let result = pipeline.classify(frame.clone()).await?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    warn!(
      "平均推理时间: {:.2?}",
      times.iter().skip(Self::WARMUP).sum::<Duration>()
        / (times.len() - Self::WARMUP) as u32
    );

    Ok(())
  }
}

/// 依次处理输入源中的全部图像；单张失败只记录日志
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  stop: Option<Receiver<()>>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 收到信号后处理完当前图像即退出，通常由进程的中断处理函数发送
  pub fn with_stop_signal(mut self, stop: Receiver<()>) -> Self {
    self.stop = Some(stop);
    self
  }

  fn stop_requested(&self) -> bool {
    self.stop.as_ref().is_some_and(|rx| rx.try_recv().is_ok())
  }
}

impl<I, B, O, RE> Task<I, B, O> for ContinuousTask
where
  I: Iterator<Item = RawImage>,
  B: BuildModel + Send + Sync + 'static,
  B::Model: Classifier,
  B::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RawImage, ClassificationReport, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(self, input: I, pipeline: &Pipeline<B>, output: &O) -> anyhow::Result<()> {
    info!("开始任务...");
    let mut frame_index = 0usize;
    let mut failures = 0usize;
    for frame in input {
      frame_index += 1;
      info!("处理第 {} 张图像: {}", frame_index, frame.source());
      let now = std::time::Instant::now();
      match pipeline.classify(frame.clone()).await {
        Ok(result) => {
          output.render_result(&frame, &result)?;
          info!("处理完成，耗时: {:.2?}", now.elapsed());
        }
        Err(e) => {
          failures += 1;
          error!("图像 {} 分类失败: {}", frame.source(), e);
        }
      }
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定数量 {}, 退出任务循环", frame_index);
        break;
      }
      if self.stop_requested() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共 {} 张，失败 {} 张", frame_index, failures);
    Ok(())
  }
}

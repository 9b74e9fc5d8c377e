// 该文件是 EcoQuest 项目的一部分。
// src/session.rs - 分类请求状态机
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

//! 展示层观察 [`ClassifyState`] 渲染界面。
//!
//! 每次选择图像、清除或开始分析都会递增代号；请求只在自己的代号仍是
//! 最新时才写入状态，过期请求的结果被丢弃。

use std::{
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
  input::RawImage,
  model::{BuildModel, Classifier},
  pipeline::{ClassificationReport, ClassifyError, Pipeline},
};

pub const DEFAULT_SLOW_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Model,
  Preprocessing,
  Inferring,
  Interpreting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
  pub stage: Stage,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassifyState {
  #[default]
  Idle,
  ImageSelected,
  Preprocessing,
  /// `slow` 表示推理耗时已超过提示阈值
  Inferring { slow: bool },
  Interpreted(ClassificationReport),
  Failed(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeOutcome {
  Applied(ClassificationReport),
  /// 请求完成前用户已选择了新图像或清除，结果被丢弃
  Stale,
}

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("请先选择图像")]
  NoImageSelected,
  #[error(transparent)]
  Classify(#[from] ClassifyError),
}

enum RunError {
  Stale,
  Failed(Stage, ClassifyError),
}

#[derive(Default)]
struct SessionInner {
  state: ClassifyState,
  image: Option<RawImage>,
  generation: u64,
}

pub struct ClassificationSession<B: BuildModel> {
  pipeline: Arc<Pipeline<B>>,
  inner: Mutex<SessionInner>,
  slow_after: Duration,
}

impl<B> ClassificationSession<B>
where
  B: BuildModel + Send + Sync + 'static,
  B::Model: Classifier,
  B::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(pipeline: Arc<Pipeline<B>>) -> Self {
    Self {
      pipeline,
      inner: Mutex::new(SessionInner::default()),
      slow_after: DEFAULT_SLOW_AFTER,
    }
  }

  pub fn with_slow_after(mut self, slow_after: Duration) -> Self {
    self.slow_after = slow_after;
    self
  }

  pub fn pipeline(&self) -> &Pipeline<B> {
    &self.pipeline
  }

  fn lock(&self) -> MutexGuard<'_, SessionInner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn state(&self) -> ClassifyState {
    self.lock().state.clone()
  }

  pub fn selected_image(&self) -> Option<RawImage> {
    self.lock().image.clone()
  }

  /// 选择新图像：清除之前的结果或失败，并使在途请求失效
  pub fn select_image(&self, raw: RawImage) {
    let mut inner = self.lock();
    info!("选择图像: {}", raw.source());
    inner.generation += 1;
    inner.image = Some(raw);
    inner.state = ClassifyState::ImageSelected;
  }

  pub fn clear(&self) {
    let mut inner = self.lock();
    inner.generation += 1;
    inner.image = None;
    inner.state = ClassifyState::Idle;
  }

  // 仅当请求仍是最新时写入状态
  fn apply(&self, ticket: u64, state: ClassifyState) -> bool {
    let mut inner = self.lock();
    if inner.generation != ticket {
      return false;
    }
    inner.state = state;
    true
  }

  pub async fn analyze(&self) -> Result<AnalyzeOutcome, SessionError> {
    let (ticket, raw) = {
      let mut inner = self.lock();
      let raw = inner.image.clone().ok_or(SessionError::NoImageSelected)?;
      inner.generation += 1;
      inner.state = ClassifyState::Preprocessing;
      (inner.generation, raw)
    };

    match self.run(ticket, raw).await {
      Ok(report) => {
        if self.apply(ticket, ClassifyState::Interpreted(report.clone())) {
          Ok(AnalyzeOutcome::Applied(report))
        } else {
          warn!("请求 {} 已过期，丢弃分类结果", ticket);
          Ok(AnalyzeOutcome::Stale)
        }
      }
      Err(RunError::Stale) => {
        warn!("请求 {} 已过期，停止处理", ticket);
        Ok(AnalyzeOutcome::Stale)
      }
      Err(RunError::Failed(stage, err)) => {
        let failure = Failure {
          stage,
          message: err.to_string(),
        };
        if self.apply(ticket, ClassifyState::Failed(failure)) {
          Err(err.into())
        } else {
          warn!("请求 {} 已过期，丢弃错误: {}", ticket, err);
          Ok(AnalyzeOutcome::Stale)
        }
      }
    }
  }

  async fn run(&self, ticket: u64, raw: RawImage) -> Result<ClassificationReport, RunError> {
    let model = self
      .pipeline
      .handle()
      .map_err(|e| RunError::Failed(Stage::Model, e))?;

    let tensor = self
      .pipeline
      .preprocess(&raw)
      .map_err(|e| RunError::Failed(Stage::Preprocessing, e))?;
    drop(raw);

    if !self.apply(ticket, ClassifyState::Inferring { slow: false }) {
      return Err(RunError::Stale);
    }

    let mut inference = std::pin::pin!(self.pipeline.infer(model, tensor));
    let scores = match tokio::time::timeout(self.slow_after, &mut inference).await {
      Ok(scores) => scores,
      Err(_) => {
        warn!("推理已超过 {:.2?} 仍未完成", self.slow_after);
        self.apply(ticket, ClassifyState::Inferring { slow: true });
        inference.await
      }
    }
    .map_err(|e| RunError::Failed(Stage::Inferring, e))?;

    self
      .pipeline
      .interpret(&scores)
      .map_err(|e| RunError::Failed(Stage::Interpreting, e))
  }
}

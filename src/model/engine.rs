// 该文件是 EcoQuest 项目的一部分。
// src/model/engine.rs - 推理执行
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

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use crate::{
  frame::InputTensor,
  input::AsNchwTensor,
  model::{ClassScores, Classifier, TensorSignature},
};

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("输入形状不匹配: 模型期望 {expected}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: TensorSignature,
    actual: [usize; 4],
  },
  #[error("推理后端错误: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("推理任务异常退出: {0}")]
  Worker(#[from] tokio::task::JoinError),
}

/// 在阻塞线程池上执行一次推理；张量随调用移交，并发调用之间不共享缓冲区
pub struct InferenceEngine;

impl InferenceEngine {
  pub async fn infer<M: Classifier>(
    model: Arc<M>,
    tensor: InputTensor,
  ) -> Result<ClassScores, InferenceError> {
    let expected = model.input_signature();
    let actual = tensor.shape();
    if !expected.accepts(&actual) {
      error!("输入形状不匹配: 模型期望 {}, 实际 {:?}", expected, actual);
      return Err(InferenceError::ShapeMismatch { expected, actual });
    }

    debug!("提交推理任务");
    let now = std::time::Instant::now();
    let scores = tokio::task::spawn_blocking(move || model.infer(&tensor))
      .await?
      .map_err(|e| InferenceError::Backend(Box::new(e)))?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    Ok(scores)
  }
}

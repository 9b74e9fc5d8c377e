// 该文件是 EcoQuest 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::frame::InputTensor;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 模型声明的输入形状
  fn input_signature(&self) -> TensorSignature;
}

/// 一次性构建模型句柄，通常包含模型文件位置
pub trait BuildModel {
  type Model;
  type Error;

  fn build(&self) -> Result<Self::Model, Self::Error>;
}

/// 分类模型：输入为标准化张量，输出为类别得分
pub trait Classifier:
  Model<
      Input = InputTensor,
      Output = ClassScores,
      Error: std::error::Error + Send + Sync + 'static,
    > + Send
  + Sync
  + 'static
{
}

impl<M> Classifier for M
where
  M: Model<Input = InputTensor, Output = ClassScores> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
}

/// 每个维度的期望大小，`None` 表示动态维度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSignature {
  pub dims: Vec<Option<usize>>,
}

impl TensorSignature {
  pub fn fixed(dims: &[usize]) -> Self {
    Self {
      dims: dims.iter().copied().map(Some).collect(),
    }
  }

  pub fn accepts(&self, shape: &[usize]) -> bool {
    self.dims.len() == shape.len()
      && self
        .dims
        .iter()
        .zip(shape)
        .all(|(want, got)| want.is_none_or(|w| w == *got))
  }
}

impl std::fmt::Display for TensorSignature {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let dims: Vec<String> = self
      .dims
      .iter()
      .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
      .collect();
    write!(f, "[{}]", dims.join(", "))
  }
}

/// 单次推理得到的类别得分，顺序与标签列表一致
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
  scores: Box<[f32]>,
}

impl From<Vec<f32>> for ClassScores {
  fn from(scores: Vec<f32>) -> Self {
    Self {
      scores: scores.into_boxed_slice(),
    }
  }
}

impl ClassScores {
  pub fn as_slice(&self) -> &[f32] {
    &self.scores
  }

  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }
}

mod classify;
pub use self::classify::{InterpretError, Interpreter, Prediction, ScoreActivation};

mod engine;
pub use self::engine::{InferenceEngine, InferenceError};

mod loader;
pub use self::loader::{ModelLoadError, ModelLoader, ModelNotReady};

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{DEFAULT_MODEL_URL, OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_accepts_dynamic_dims() {
    let sig = TensorSignature {
      dims: vec![None, Some(3), Some(224), Some(224)],
    };
    assert!(sig.accepts(&[1, 3, 224, 224]));
    assert!(sig.accepts(&[8, 3, 224, 224]));
    assert!(!sig.accepts(&[1, 3, 256, 256]));
    assert!(!sig.accepts(&[3, 224, 224]));
    assert_eq!(sig.to_string(), "[?, 3, 224, 224]");
  }
}

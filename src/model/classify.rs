// 该文件是 EcoQuest 项目的一部分。
// src/model/classify.rs - 分类结果解析
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{material::Material, model::ClassScores};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretError {
  #[error("得分向量长度不匹配: 期望 {expected}, 实际 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("得分向量第 {index} 项不是有限值: {value}")]
  NonFinite { index: usize, value: f32 },
}

/// 模型最后一层的输出形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreActivation {
  /// 模型已输出概率分布（例如内置 softmax），直接使用
  #[default]
  Probabilities,
  /// 模型输出原始 logits，解析前先做 softmax
  Softmax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
  #[serde(skip)]
  pub class_index: usize,
  pub predicted_class: String,
  /// 0 到 100 的整数百分比
  pub predicted_prob: u8,
}

#[derive(Debug, Clone)]
pub struct Interpreter {
  labels: Vec<String>,
  activation: ScoreActivation,
}

impl Default for Interpreter {
  fn default() -> Self {
    Self {
      labels: Material::model_labels(),
      activation: ScoreActivation::default(),
    }
  }
}

impl Interpreter {
  pub fn with_activation(mut self, activation: ScoreActivation) -> Self {
    self.activation = activation;
    self
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn interpret(&self, scores: &ClassScores) -> Result<Prediction, InterpretError> {
    let raw = scores.as_slice();
    if raw.is_empty() || raw.len() != self.labels.len() {
      return Err(InterpretError::LengthMismatch {
        expected: self.labels.len(),
        actual: raw.len(),
      });
    }
    if let Some((index, &value)) = raw.iter().enumerate().find(|(_, v)| !v.is_finite()) {
      return Err(InterpretError::NonFinite { index, value });
    }

    let probs = match self.activation {
      ScoreActivation::Probabilities => raw.to_vec(),
      ScoreActivation::Softmax => softmax(raw),
    };

    // 严格大于：并列时保留靠前的类别
    let (class_index, best) = probs
      .iter()
      .copied()
      .enumerate()
      .fold((0, probs[0]), |(bi, bv), (i, v)| if v > bv { (i, v) } else { (bi, bv) });

    let predicted_prob = (best * 100.0).round().clamp(0.0, 100.0) as u8;
    debug!(
      "解析结果: 类别 {} ({}), 置信度 {}%",
      class_index, self.labels[class_index], predicted_prob
    );

    Ok(Prediction {
      class_index,
      predicted_class: self.labels[class_index].clone(),
      predicted_prob,
    })
  }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scores(v: &[f32]) -> ClassScores {
    ClassScores::from(v.to_vec())
  }

  #[test]
  fn labels_follow_model_output_order() {
    assert_eq!(Interpreter::default().labels(), Material::model_labels());
  }

  #[test]
  fn picks_maximum_score() {
    let p = Interpreter::default()
      .interpret(&scores(&[0.91, 0.02, 0.01, 0.03, 0.02, 0.01]))
      .unwrap();
    assert_eq!(p.class_index, 0);
    assert_eq!(p.predicted_class, "cardboard");
    assert_eq!(p.predicted_prob, 91);

    let p = Interpreter::default()
      .interpret(&scores(&[0.05, 0.1, 0.2, 0.05, 0.56, 0.04]))
      .unwrap();
    assert_eq!(p.predicted_class, "plastic");
    assert_eq!(p.predicted_prob, 56);
  }

  #[test]
  fn ties_go_to_lowest_index() {
    let p = Interpreter::default()
      .interpret(&scores(&[0.5, 0.5, 0.0, 0.0, 0.0, 0.0]))
      .unwrap();
    assert_eq!(p.predicted_class, "cardboard");
    assert_eq!(p.predicted_prob, 50);

    let p = Interpreter::default()
      .interpret(&scores(&[0.1, 0.2, 0.3, 0.3, 0.05, 0.05]))
      .unwrap();
    assert_eq!(p.predicted_class, "metal");
  }

  #[test]
  fn confidence_is_rounded_and_clamped() {
    let p = Interpreter::default()
      .interpret(&scores(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.995]))
      .unwrap();
    assert_eq!(p.predicted_prob, 100);

    let p = Interpreter::default()
      .interpret(&scores(&[0.0, 0.0, 3.2, 0.0, 0.0, 0.0]))
      .unwrap();
    assert_eq!(p.predicted_prob, 100);

    let p = Interpreter::default()
      .interpret(&scores(&[-2.0, -1.0, -3.0, -4.0, -5.0, -6.0]))
      .unwrap();
    assert_eq!(p.predicted_class, "glass");
    assert_eq!(p.predicted_prob, 0);
  }

  #[test]
  fn malformed_vectors_are_rejected() {
    let interpreter = Interpreter::default();
    assert_eq!(
      interpreter.interpret(&scores(&[0.5, 0.5])),
      Err(InterpretError::LengthMismatch {
        expected: 6,
        actual: 2
      })
    );
    assert!(matches!(
      interpreter.interpret(&scores(&[])),
      Err(InterpretError::LengthMismatch { actual: 0, .. })
    ));
    assert!(matches!(
      interpreter.interpret(&scores(&[0.1, f32::NAN, 0.0, 0.0, 0.0, 0.0])),
      Err(InterpretError::NonFinite { index: 1, .. })
    ));
  }

  #[test]
  fn softmax_normalizes_logits() {
    let p = Interpreter::default()
      .with_activation(ScoreActivation::Softmax)
      .interpret(&scores(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
      .unwrap();
    assert_eq!(p.predicted_class, "cardboard");
    assert_eq!(p.predicted_prob, 17);

    let p = Interpreter::default()
      .with_activation(ScoreActivation::Softmax)
      .interpret(&scores(&[1.0, 2.0, 9.0, 1.0, 0.5, 0.0]))
      .unwrap();
    assert_eq!(p.predicted_class, "metal");
    assert_eq!(p.predicted_prob, 100);
  }

  #[test]
  fn serializes_display_contract() {
    let p = Prediction {
      class_index: 0,
      predicted_class: "cardboard".to_string(),
      predicted_prob: 91,
    };
    assert_eq!(
      serde_json::to_value(&p).unwrap(),
      serde_json::json!({ "predictedClass": "cardboard", "predictedProb": 91 })
    );
  }
}

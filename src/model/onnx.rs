// 该文件是 EcoQuest 项目的一部分。
// src/model/onnx.rs - ONNX 材料分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Mutex;

use ndarray::ArrayView4;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  tensor::TensorElementType,
  value::{TensorRef, ValueType},
};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{InputTensor, MODEL_INPUT_SIZE, RGB_CHANNELS},
  input::AsNchwTensor,
  material::Material,
  model::{BuildModel, ClassScores, Model, TensorSignature},
};

/// 默认模型文件位置
pub const DEFAULT_MODEL_URL: &str = "onnx:models/recycling_classifier.onnx";

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_NUM_OUTPUTS: usize = 1;
const ONNX_DEFAULT_THREADS: usize = 1;

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("张量形状错误: {0}")]
  ShapeError(#[from] ndarray::ShapeError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("推理会话锁已失效")]
  SessionPoisoned,
}

pub struct OnnxClassifierBuilder {
  model_path: String,
  intra_threads: usize,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut intra_threads = ONNX_DEFAULT_THREADS;
    for (k, v) in url.query_pairs() {
      if k == "threads" {
        intra_threads = v.parse().map_err(|_| {
          OnnxClassifierError::ModelPathError(format!("无效的线程数: {}", v))
        })?;
      }
    }

    Ok(OnnxClassifierBuilder {
      model_path: url.path().to_string(),
      intra_threads,
    })
  }
}

fn signature_of(value_type: &ValueType) -> Option<(TensorElementType, TensorSignature)> {
  match value_type {
    ValueType::Tensor { ty, shape, .. } => {
      let dims = shape
        .iter()
        .map(|&d| if d < 0 { None } else { Some(d as usize) })
        .collect();
      Some((*ty, TensorSignature { dims }))
    }
    _ => None,
  }
}

impl BuildModel for OnnxClassifierBuilder {
  type Model = OnnxClassifier;
  type Error = OnnxClassifierError;

  fn build(&self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 ONNX Runtime 推理会话");
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.intra_threads)?
      .commit_from_memory(&model_data)?;

    if session.inputs.len() != ONNX_NUM_INPUTS || session.outputs.len() != ONNX_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        ONNX_NUM_INPUTS,
        ONNX_NUM_OUTPUTS,
        session.inputs.len(),
        session.outputs.len()
      );
      error!("{}", msg);
      return Err(OnnxClassifierError::ModelInvalid(msg));
    }

    let input = &session.inputs[0];
    let (input_type, signature) = signature_of(&input.input_type).ok_or_else(|| {
      OnnxClassifierError::ModelInvalid(format!("输入 {} 不是张量", input.name))
    })?;
    let expected = [
      1,
      RGB_CHANNELS,
      MODEL_INPUT_SIZE as usize,
      MODEL_INPUT_SIZE as usize,
    ];
    if input_type != TensorElementType::Float32 || !signature.accepts(&expected) {
      let msg = format!(
        "输入 {} 的类型为 {:?} {}, 期望 Float32 {:?}",
        input.name, input_type, signature, expected
      );
      error!("{}", msg);
      return Err(OnnxClassifierError::ModelInvalid(msg));
    }

    let output = &session.outputs[0];
    if let Some((_, out_sig)) = signature_of(&output.output_type)
      && let Some(Some(classes)) = out_sig.dims.last()
      && *classes != Material::ALL.len()
    {
      let msg = format!(
        "输出 {} 的类别数为 {}, 期望 {}",
        output.name,
        classes,
        Material::ALL.len()
      );
      error!("{}", msg);
      return Err(OnnxClassifierError::ModelInvalid(msg));
    }

    debug!("模型输入: {} {}", input.name, signature);
    debug!("模型输出: {}", output.name);
    let input_name = input.name.clone();
    let output_name = output.name.clone();

    Ok(OnnxClassifier {
      session: Mutex::new(session),
      input_name,
      output_name,
      signature,
    })
  }
}

/// ONNX Runtime 会话执行需要可变借用，这里在内部串行化
pub struct OnnxClassifier {
  session: Mutex<Session>,
  input_name: String,
  output_name: String,
  signature: TensorSignature,
}

impl Model for OnnxClassifier {
  type Input = InputTensor;
  type Output = ClassScores;
  type Error = OnnxClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let [n, c, h, w] = input.shape();
    let view = ArrayView4::from_shape((n, c, h, w), input.as_nchw())?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxClassifierError::SessionPoisoned)?;

    debug!("执行模型推理");
    let outputs = session.run(ort::inputs! {
      self.input_name.as_str() => TensorRef::from_array_view(view)?,
    })?;

    let (_, scores) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
    debug!("模型推理结果：{:?}", scores);

    Ok(ClassScores::from(scores.to_vec()))
  }

  fn input_signature(&self) -> TensorSignature {
    self.signature.clone()
  }
}

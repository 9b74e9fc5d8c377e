// 该文件是 EcoQuest 项目的一部分。
// src/pipeline.rs - 预处理、推理与结果解析流水线
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

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{InputTensor, MODEL_INPUT_SIZE},
  input::{PreprocessError, Preprocessor, RawImage},
  material::{self, MaterialIcon},
  model::{
    BuildModel, ClassScores, Classifier, InferenceEngine, InferenceError, InterpretError,
    Interpreter, ModelLoadError, ModelLoader, ModelNotReady, Prediction, TensorSignature,
  },
};

/// 单次分类请求的错误，均为终止性错误，不会自动重试
#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("模型加载错误: {0}")]
  ModelLoad(#[from] ModelLoadError),
  #[error("{0}")]
  ModelNotReady(#[from] ModelNotReady),
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("输入形状不匹配: 模型期望 {expected}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: TensorSignature,
    actual: [usize; 4],
  },
  #[error("推理错误: {0}")]
  Inference(#[source] InferenceError),
  #[error("结果解析错误: {0}")]
  Interpret(#[from] InterpretError),
}

impl From<InferenceError> for ClassifyError {
  fn from(err: InferenceError) -> Self {
    match err {
      InferenceError::ShapeMismatch { expected, actual } => {
        ClassifyError::ShapeMismatch { expected, actual }
      }
      other => ClassifyError::Inference(other),
    }
  }
}

/// 展示层拿到的完整结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
  #[serde(flatten)]
  pub prediction: Prediction,
  pub recyclable: bool,
  pub instructions: &'static str,
  pub icon: MaterialIcon,
}

impl ClassificationReport {
  pub fn new(prediction: Prediction) -> Self {
    let guidance = material::guide(&prediction.predicted_class);
    Self {
      prediction,
      recyclable: guidance.recyclable,
      instructions: guidance.instructions,
      icon: guidance.icon,
    }
  }

  pub fn recyclable_text(&self) -> &'static str {
    if self.recyclable {
      "Recyclable"
    } else {
      "Not Recyclable"
    }
  }
}

pub struct Pipeline<B: BuildModel> {
  preprocessor: Preprocessor,
  loader: ModelLoader<B>,
  interpreter: Interpreter,
}

impl<B> Pipeline<B>
where
  B: BuildModel + Send + Sync + 'static,
  B::Model: Classifier,
  B::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(builder: B) -> Self {
    Self {
      preprocessor: Preprocessor::default(),
      loader: ModelLoader::new(builder),
      interpreter: Interpreter::default(),
    }
  }

  pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
    self.preprocessor = preprocessor;
    self
  }

  pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
    self.interpreter = interpreter;
    self
  }

  pub async fn load_model(&self) -> Result<(), ClassifyError> {
    self.loader.load().await?;
    Ok(())
  }

  pub fn is_ready(&self) -> bool {
    self.loader.is_ready()
  }

  pub fn handle(&self) -> Result<Arc<B::Model>, ClassifyError> {
    Ok(self.loader.handle()?)
  }

  pub fn preprocess(&self, raw: &RawImage) -> Result<InputTensor, ClassifyError> {
    Ok(
      self
        .preprocessor
        .preprocess::<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>(raw)?,
    )
  }

  pub async fn infer(
    &self,
    model: Arc<B::Model>,
    tensor: InputTensor,
  ) -> Result<ClassScores, ClassifyError> {
    Ok(InferenceEngine::infer(model, tensor).await?)
  }

  pub fn interpret(&self, scores: &ClassScores) -> Result<ClassificationReport, ClassifyError> {
    let prediction = self.interpreter.interpret(scores)?;
    Ok(ClassificationReport::new(prediction))
  }

  /// 完整分类：模型未就绪时立即失败，不做任何预处理
  pub async fn classify(&self, raw: RawImage) -> Result<ClassificationReport, ClassifyError> {
    let model = self.handle()?;

    debug!("预处理图像: {}", raw.source());
    let tensor = self.preprocess(&raw)?;
    drop(raw);

    let scores = self.infer(model, tensor).await?;
    let report = self.interpret(&scores)?;
    info!(
      "分类结果: {} ({}%), {}",
      report.prediction.predicted_class,
      report.prediction.predicted_prob,
      report.recyclable_text()
    );
    Ok(report)
  }

  /// 释放模型句柄；会话共享同一流水线时也可调用，在途请求仍用旧句柄完成
  pub fn shutdown(&self) {
    self.loader.release();
  }
}

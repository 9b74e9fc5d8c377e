// 该文件是 EcoQuest 项目的一部分。
// src/bin/classify_oneshot.rs - 单张图像分类
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use ecoquest::{
  FromUrl,
  model::{DEFAULT_MODEL_URL, Interpreter, OnnxClassifierBuilder, ScoreActivation},
  pipeline::Pipeline,
  task::{OneShotTask, Task},
};
use tracing::info;

/// EcoQuest 材料识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径，例如 onnx:models/recycling_classifier.onnx?threads=4
  #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL_URL)]
  pub model: Url,
  /// 输入来源，例如 image:///tmp/box.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 console: 或 json:///tmp/results.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 模型输出为 logits 时先做 softmax
  #[arg(long)]
  pub softmax: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ecoquest::input::InputWrapper::from_url(&args.input)?;
  let activation = if args.softmax {
    ScoreActivation::Softmax
  } else {
    ScoreActivation::Probabilities
  };
  let pipeline = Pipeline::new(OnnxClassifierBuilder::from_url(&args.model)?)
    .with_interpreter(Interpreter::default().with_activation(activation));
  let output = ecoquest::output::OutputWrapper::from_url(&args.output)?;

  pipeline.load_model().await?;
  OneShotTask.run_task(input, &pipeline, &output).await?;

  Ok(())
}

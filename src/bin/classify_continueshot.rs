// 该文件是 EcoQuest 项目的一部分。
// src/bin/classify_continueshot.rs - 批量分类
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use ecoquest::{
  FromUrl,
  model::{DEFAULT_MODEL_URL, Interpreter, OnnxClassifierBuilder, ScoreActivation},
  pipeline::Pipeline,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// EcoQuest 材料识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL_URL)]
  pub model: Url,
  /// 输入来源，例如 folder:///data/photos
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 folder:///data/sorted?recyclable
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 最大处理数量
  #[arg(long, value_name = "COUNT")]
  pub frame_number: Option<usize>,
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

  let (stop_tx, stop_rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = stop_tx.send(());
  })?;

  pipeline.load_model().await?;
  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_stop_signal(stop_rx)
    .run_task(input, &pipeline, &output)
    .await?;

  Ok(())
}

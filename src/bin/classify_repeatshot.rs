// 该文件是 EcoQuest 项目的一部分。
// src/bin/classify_repeatshot.rs - 重复分类基准测试
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
  model::{DEFAULT_MODEL_URL, OnnxClassifierBuilder},
  pipeline::Pipeline,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// EcoQuest 材料识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL_URL)]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 重复次数
  #[arg(long, default_value = "1000", value_name = "COUNT")]
  pub repeat: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ecoquest::input::InputWrapper::from_url(&args.input)?;
  let pipeline = Pipeline::new(OnnxClassifierBuilder::from_url(&args.model)?);
  let output = ecoquest::output::OutputWrapper::from_url(&args.output)?;

  pipeline.load_model().await?;
  RepeatShotTask::default()
    .with_repeat_times(args.repeat)
    .run_task(input, &pipeline, &output)
    .await?;

  Ok(())
}

// 该文件是 EcoQuest 项目的一部分。
// src/bin/recycling_search.rs - 回收指引文字检索
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
use tracing::debug;

/// 按物品名称检索回收指引
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 物品名称，例如 "glass jar"
  #[arg(value_name = "ITEM")]
  pub query: String,
  /// 以 JSON 输出
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let result = ecoquest::material::search(&args.query);
  debug!("检索结果: {:?}", result);

  if args.json {
    println!("{}", serde_json::to_string_pretty(&result)?);
  } else {
    println!(
      "{}: {}",
      result.query,
      if result.guidance.recyclable {
        "Recyclable"
      } else {
        "Not Recyclable"
      }
    );
    println!("{}", result.guidance.instructions);
  }

  Ok(())
}

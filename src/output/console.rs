// 该文件是 EcoQuest 项目的一部分。
// src/output/console.rs - 控制台输出
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

use std::io::Write;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, input::RawImage, output::Render, pipeline::ClassificationReport,
};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch);
    }
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  pub fn write_report<W: Write>(
    out: &mut W,
    frame: &RawImage,
    result: &ClassificationReport,
  ) -> std::io::Result<()> {
    writeln!(out, "{}: {}", frame.source(), result.recyclable_text())?;
    writeln!(out, "  Material: {}", result.prediction.predicted_class)?;
    writeln!(out, "  Confidence: {}%", result.prediction.predicted_prob)?;
    writeln!(out, "  Recycling Instructions: {}", result.instructions)?;
    Ok(())
  }
}

impl Render<RawImage, ClassificationReport> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(
    &self,
    frame: &RawImage,
    result: &ClassificationReport,
  ) -> Result<(), Self::Error> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    Self::write_report(&mut lock, frame, result)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Prediction;

  #[test]
  fn report_lines() {
    let report = ClassificationReport::new(Prediction {
      class_index: 5,
      predicted_class: "trash".to_string(),
      predicted_prob: 73,
    });
    let mut out = Vec::new();
    ConsoleOutput::write_report(&mut out, &RawImage::from_bytes("chips.jpg", vec![1u8]), &report)
      .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("chips.jpg: Not Recyclable\n"));
    assert!(text.contains("Material: trash"));
    assert!(text.contains("Confidence: 73%"));
  }
}

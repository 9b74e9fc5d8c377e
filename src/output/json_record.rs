// 该文件是 EcoQuest 项目的一部分。
// src/output/json_record.rs - JSON Lines 记录输出
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

use std::{fs::OpenOptions, io::Write, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, input::RawImage, output::Render, pipeline::ClassificationReport,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRecord<'a> {
  pub source: &'a str,
  #[serde(flatten)]
  pub report: &'a ClassificationReport,
  pub classified_at: DateTime<Utc>,
}

/// 每个结果追加一行 JSON
pub struct JsonRecordOutput {
  path: String,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(JsonRecordOutput {
      path: uri.path().to_string(),
    })
  }
}

impl Render<RawImage, ClassificationReport> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(
    &self,
    frame: &RawImage,
    result: &ClassificationReport,
  ) -> Result<(), Self::Error> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let record = JsonRecord {
      source: frame.source(),
      report: result,
      classified_at: Utc::now(),
    };
    let mut line = serde_json::to_string(&record)?;
    line.push('\n');

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?;
    file.write_all(line.as_bytes())?;
    debug!("写入分类记录到 {}", self.path);

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Prediction;

  #[test]
  fn appends_one_line_per_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records").join("results.jsonl");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonRecordOutput::from_url(&url).unwrap();

    let report = ClassificationReport::new(Prediction {
      class_index: 1,
      predicted_class: "glass".to_string(),
      predicted_prob: 88,
    });
    let frame = RawImage::from_bytes("jar.png", vec![0u8]);
    output.render_result(&frame, &report).unwrap();
    output.render_result(&frame, &report).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["source"], "jar.png");
    assert_eq!(value["predictedClass"], "glass");
    assert_eq!(value["predictedProb"], 88);
    assert_eq!(value["recyclable"], true);
    assert_eq!(value["icon"], "wine");
    assert!(value["classifiedAt"].is_string());
  }
}

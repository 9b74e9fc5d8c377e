// 该文件是 EcoQuest 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{DateTime, Datelike, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::RawImage,
  output::{Render, json_record::JsonRecord},
  pipeline::ClassificationReport,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按识别出的材料与日期归档原始照片，并附带 JSON 说明
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  recyclable_only: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let recyclable_only = uri.query_pairs().any(|(k, _)| k == "recyclable");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      recyclable_only,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(
    &self,
    material: &str,
    now: &DateTime<Utc>,
    extension: &str,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(material)
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.frame_id(),
      extension
    )))
  }
}

impl Render<RawImage, ClassificationReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(
    &self,
    frame: &RawImage,
    result: &ClassificationReport,
  ) -> Result<(), Self::Error> {
    if self.recyclable_only && !result.recyclable {
      return Ok(());
    }

    let extension = image::guess_format(frame.bytes())
      .ok()
      .and_then(|f| f.extensions_str().first().copied())
      .unwrap_or("bin");
    let now = Utc::now();
    let path = self.frame_path(&result.prediction.predicted_class, &now, extension)?;
    std::fs::write(&path, frame.bytes())?;

    let record = JsonRecord {
      source: frame.source(),
      report: result,
      classified_at: now,
    };
    std::fs::write(
      path.with_extension("json"),
      serde_json::to_vec_pretty(&record)?,
    )?;
    info!("归档图像到: {}", path.display());

    Ok(())
  }
}

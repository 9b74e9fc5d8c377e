// 该文件是 EcoQuest 项目的一部分。
// src/input/read_folder.rs - 图像目录输入
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

use std::{collections::VecDeque, path::PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::RawImage};

#[derive(Error, Debug)]
pub enum FolderInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按文件名顺序逐个读取目录中的文件；读取失败的文件记录日志后跳过
pub struct FolderInput {
  pending: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for FolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for FolderInput {
  type Error = FolderInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(FolderInputError::SchemeMismatch);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(url.path())? {
      let entry = entry?;
      if entry.file_type()?.is_file() {
        files.push(entry.path());
      }
    }
    files.sort();
    info!("目录 {} 中共有 {} 个文件", url.path(), files.len());

    Ok(FolderInput {
      pending: files.into(),
    })
  }
}

impl Iterator for FolderInput {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.pending.pop_front() {
      match std::fs::read(&path) {
        Ok(bytes) => {
          debug!("读取文件 {}: {} 字节", path.display(), bytes.len());
          return Some(RawImage::from_bytes(path.display().to_string(), bytes));
        }
        Err(e) => error!("读取文件 {} 失败: {}", path.display(), e),
      }
    }
    None
  }
}

// 该文件是 EcoQuest 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::{FromUrl, FromUrlWithScheme, input::RawImage};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 单张图像文件，读取后只产出一次
pub struct ImageFileInput {
  image: Option<RawImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let bytes = std::fs::read(path)?;
    debug!("读取图像文件 {}: {} 字节", path, bytes.len());

    Ok(ImageFileInput {
      image: Some(RawImage::from_bytes(path, bytes)),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

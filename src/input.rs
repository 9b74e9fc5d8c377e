// 该文件是 EcoQuest 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme};

pub trait AsNchwTensor {
  fn as_nchw(&self) -> &[f32];
  fn shape(&self) -> [usize; 4];
}

mod preprocess;
pub use self::preprocess::{
  IMAGENET_MEAN, IMAGENET_STD, Normalization, PreprocessError, Preprocessor,
};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

mod read_folder;
pub use self::read_folder::{FolderInput, FolderInputError};

/// 用户提供的原始图像（拍照或上传），格式与尺寸任意
#[derive(Debug, Clone)]
pub struct RawImage {
  source: String,
  bytes: Arc<[u8]>,
}

impl RawImage {
  pub fn from_bytes(source: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
    Self {
      source: source.into(),
      bytes: bytes.into(),
    }
  }

  /// 来源描述（文件路径或调用方给定的名字）
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }
}

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Folder input error: {0}")]
  FolderInputError(#[from] FolderInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
  ReadFolder(FolderInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ImageFileInput::SCHEME => Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?)),
      FolderInput::SCHEME => Ok(InputWrapper::ReadFolder(FolderInput::from_url(url)?)),
      other => Err(InputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
      InputWrapper::ReadFolder(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("v4l2:///dev/video0").unwrap();
    match InputWrapper::from_url(&url) {
      Err(InputError::SchemeMismatch(scheme)) => assert_eq!(scheme, "v4l2"),
      _ => panic!("expected scheme mismatch"),
    }
  }

  #[test]
  fn raw_image_clones_share_bytes() {
    let raw = RawImage::from_bytes("upload", vec![1u8, 2, 3]);
    let copy = raw.clone();
    assert_eq!(copy.bytes(), &[1, 2, 3]);
    assert_eq!(copy.source(), "upload");
    assert!(!raw.is_empty());
  }
}

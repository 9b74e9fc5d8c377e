// 该文件是 EcoQuest 项目的一部分。
// src/input/preprocess.rs - 图像预处理
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{RGB_CHANNELS, RgbNchwTensor, TensorLengthError},
  input::RawImage,
};

// 训练时使用的 ImageNet 统计量，须与模型文件一同变更
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("图像数据为空: {0}")]
  Empty(String),
  #[error("图像解码失败 ({0}): {1}")]
  Decode(String, image::ImageError),
  #[error("张量构建失败: {0}")]
  Tensor(#[from] TensorLengthError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
  pub mean: [f32; 3],
  pub std: [f32; 3],
}

impl Default for Normalization {
  fn default() -> Self {
    Self {
      mean: IMAGENET_MEAN,
      std: IMAGENET_STD,
    }
  }
}

impl Normalization {
  #[inline]
  pub fn apply(&self, channel: usize, value: u8) -> f32 {
    (value as f32 / 255.0 - self.mean[channel]) / self.std[channel]
  }
}

/// 将任意图像拉伸到模型输入尺寸并按通道标准化
#[derive(Debug, Clone)]
pub struct Preprocessor {
  normalization: Normalization,
  filter: FilterType,
}

impl Default for Preprocessor {
  fn default() -> Self {
    Self {
      normalization: Normalization::default(),
      filter: FilterType::Triangle,
    }
  }
}

impl Preprocessor {
  pub fn with_filter(mut self, filter: FilterType) -> Self {
    self.filter = filter;
    self
  }

  pub fn normalization(&self) -> &Normalization {
    &self.normalization
  }

  pub fn preprocess<const W: u32, const H: u32>(
    &self,
    raw: &RawImage,
  ) -> Result<RgbNchwTensor<W, H>, PreprocessError> {
    if raw.is_empty() {
      return Err(PreprocessError::Empty(raw.source().to_string()));
    }

    let image = image::load_from_memory(raw.bytes())
      .map_err(|e| PreprocessError::Decode(raw.source().to_string(), e))?
      .to_rgb8();
    debug!(
      "解码图像 {}: {}x{}",
      raw.source(),
      image.width(),
      image.height()
    );

    let resized = self.resize::<W, H>(image);
    self.to_tensor(&resized)
  }

  // 直接拉伸，不裁剪也不补边
  fn resize<const W: u32, const H: u32>(&self, image: RgbImage) -> RgbImage {
    if image.dimensions() == (W, H) {
      return image;
    }
    image::imageops::resize(&image, W, H, self.filter)
  }

  fn to_tensor<const W: u32, const H: u32>(
    &self,
    image: &RgbImage,
  ) -> Result<RgbNchwTensor<W, H>, PreprocessError> {
    let plane = (W as usize) * (H as usize);
    let mut data = vec![0f32; RGB_CHANNELS * plane];

    for (index, pixel) in image.pixels().enumerate() {
      for c in 0..RGB_CHANNELS {
        data[c * plane + index] = self.normalization.apply(c, pixel[c]);
      }
    }

    Ok(RgbNchwTensor::try_from(data)?)
  }
}

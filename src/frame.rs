// 该文件是 EcoQuest 项目的一部分。
// src/frame.rs - NCHW 归一化张量定义
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

use thiserror::Error;

use crate::input::AsNchwTensor;

pub const RGB_CHANNELS: usize = 3;

/// 模型输入边长
pub const MODEL_INPUT_SIZE: u32 = 224;

/// 模型约定的输入张量：`[1, 3, 224, 224]`
pub type InputTensor = RgbNchwTensor<MODEL_INPUT_SIZE, MODEL_INPUT_SIZE>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
pub struct TensorLengthError {
  pub expected: usize,
  pub actual: usize,
}

/// 通道优先（R 全部、G 全部、B 全部）的浮点张量，批大小固定为 1
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNchwTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> RgbNchwTensor<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 单个通道的连续切片
  pub fn channel(&self, c: usize) -> &[f32] {
    let plane = W as usize * H as usize;
    &self.data[c * plane..(c + 1) * plane]
  }

  pub fn into_inner(self) -> Box<[f32]> {
    self.data
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for RgbNchwTensor<W, H> {
  type Error = TensorLengthError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(TensorLengthError {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> AsNchwTensor for RgbNchwTensor<W, H> {
  fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_length() {
    let err = RgbNchwTensor::<4, 2>::try_from(vec![0.0; 23]).unwrap_err();
    assert_eq!(err.expected, 24);
    assert_eq!(err.actual, 23);
  }

  #[test]
  fn channel_slices_are_contiguous_planes() {
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let tensor = RgbNchwTensor::<4, 2>::try_from(data).unwrap();
    assert_eq!(tensor.shape(), [1, 3, 2, 4]);
    assert_eq!(tensor.channel(0)[0], 0.0);
    assert_eq!(tensor.channel(1)[0], 8.0);
    assert_eq!(tensor.channel(2), &[16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0]);
  }

  #[test]
  fn model_input_has_expected_size() {
    assert_eq!(InputTensor::LEN, 150_528);
  }
}

// 该文件是 EcoQuest 项目的一部分。
// tests/common/mod.rs - 测试用模型与图像
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

#![allow(dead_code)]

use std::{
  io::Cursor,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
    mpsc,
  },
};

use ecoquest::{
  frame::InputTensor,
  input::{AsNchwTensor, RawImage},
  model::{BuildModel, ClassScores, Model, TensorSignature},
};
use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Error, Debug)]
#[error("scripted backend failure")]
pub struct ScriptedError;

/// 推理在收到放行信号前阻塞，用于构造在途请求
pub struct Gate {
  started: UnboundedSender<()>,
  release: Mutex<mpsc::Receiver<()>>,
}

pub struct ScriptedModel {
  scores: Vec<f32>,
  signature: TensorSignature,
  calls: Arc<AtomicUsize>,
  seen_len: Arc<AtomicUsize>,
  fail_infer: bool,
  gate: Option<Gate>,
}

impl Model for ScriptedModel {
  type Input = InputTensor;
  type Output = ClassScores;
  type Error = ScriptedError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.seen_len.store(input.as_nchw().len(), Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      let _ = gate.started.send(());
      let _ = gate.release.lock().unwrap().recv();
    }
    if self.fail_infer {
      return Err(ScriptedError);
    }
    Ok(ClassScores::from(self.scores.clone()))
  }

  fn input_signature(&self) -> TensorSignature {
    self.signature.clone()
  }
}

pub struct ScriptedBuilder {
  pub scores: Vec<f32>,
  pub signature: TensorSignature,
  pub calls: Arc<AtomicUsize>,
  pub builds: Arc<AtomicUsize>,
  pub seen_len: Arc<AtomicUsize>,
  pub fail_build: bool,
  pub fail_infer: bool,
  gate: Mutex<Option<Gate>>,
}

impl ScriptedBuilder {
  pub fn returning(scores: &[f32]) -> Self {
    Self {
      scores: scores.to_vec(),
      signature: TensorSignature::fixed(&[1, 3, 224, 224]),
      calls: Arc::new(AtomicUsize::new(0)),
      builds: Arc::new(AtomicUsize::new(0)),
      seen_len: Arc::new(AtomicUsize::new(0)),
      fail_build: false,
      fail_infer: false,
      gate: Mutex::new(None),
    }
  }

  /// 返回 (builder, 推理开始通知, 放行发送端)
  pub fn gated(scores: &[f32]) -> (Self, UnboundedReceiver<()>, mpsc::Sender<()>) {
    let (started_tx, started_rx) = unbounded_channel();
    let (release_tx, release_rx) = mpsc::channel();
    let builder = Self::returning(scores);
    *builder.gate.lock().unwrap() = Some(Gate {
      started: started_tx,
      release: Mutex::new(release_rx),
    });
    (builder, started_rx, release_tx)
  }

  pub fn with_signature(mut self, dims: &[usize]) -> Self {
    self.signature = TensorSignature::fixed(dims);
    self
  }

  pub fn failing_build(mut self) -> Self {
    self.fail_build = true;
    self
  }

  pub fn failing_infer(mut self) -> Self {
    self.fail_infer = true;
    self
  }

  pub fn calls(&self) -> Arc<AtomicUsize> {
    self.calls.clone()
  }
}

impl BuildModel for ScriptedBuilder {
  type Model = ScriptedModel;
  type Error = ScriptedError;

  fn build(&self) -> Result<Self::Model, Self::Error> {
    self.builds.fetch_add(1, Ordering::SeqCst);
    if self.fail_build {
      return Err(ScriptedError);
    }
    Ok(ScriptedModel {
      scores: self.scores.clone(),
      signature: self.signature.clone(),
      calls: self.calls.clone(),
      seen_len: self.seen_len.clone(),
      fail_infer: self.fail_infer,
      gate: self.gate.lock().unwrap().take(),
    })
  }
}

pub fn encode(image: &RgbImage, format: ImageFormat, name: &str) -> RawImage {
  let mut bytes = Cursor::new(Vec::new());
  image.write_to(&mut bytes, format).unwrap();
  RawImage::from_bytes(name, bytes.into_inner())
}

/// 1000x500 的纸箱色 JPEG
pub fn cardboard_jpeg() -> RawImage {
  let image = RgbImage::from_fn(1000, 500, |x, y| {
    Rgb([150 + (x % 40) as u8, 110 + (y % 30) as u8, 70])
  });
  encode(&image, ImageFormat::Jpeg, "cardboard_box.jpg")
}

pub fn small_png(name: &str) -> RawImage {
  encode(&RgbImage::from_pixel(32, 48, Rgb([10, 200, 30])), ImageFormat::Png, name)
}

pub fn corrupt_image() -> RawImage {
  RawImage::from_bytes("broken.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A])
}

pub const CARDBOARD_SCORES: [f32; 6] = [0.91, 0.02, 0.01, 0.03, 0.02, 0.01];

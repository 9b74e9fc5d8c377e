// 该文件是 EcoQuest 项目的一部分。
// src/model/loader.rs - 模型加载
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

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::model::BuildModel;

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型构建失败: {0}")]
  Build(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("模型加载任务异常退出: {0}")]
  Worker(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("模型尚未加载完成")]
pub struct ModelNotReady;

/// 持有模型句柄；句柄只构建一次，之后只读共享
pub struct ModelLoader<B: BuildModel> {
  builder: Arc<B>,
  handle: RwLock<Option<Arc<B::Model>>>,
  // 串行化构建，并发的首次加载只构建一次
  loading: Mutex<()>,
}

impl<B> ModelLoader<B>
where
  B: BuildModel + Send + Sync + 'static,
  B::Model: Send + Sync + 'static,
  B::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(builder: B) -> Self {
    Self {
      builder: Arc::new(builder),
      handle: RwLock::new(None),
      loading: Mutex::new(()),
    }
  }

  fn current(&self) -> Option<Arc<B::Model>> {
    self
      .handle
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// 加载模型；已加载时直接返回现有句柄
  pub async fn load(&self) -> Result<Arc<B::Model>, ModelLoadError> {
    if let Some(handle) = self.current() {
      return Ok(handle);
    }

    let _loading = self.loading.lock().await;
    if let Some(handle) = self.current() {
      return Ok(handle);
    }

    info!("开始加载模型");
    let now = std::time::Instant::now();
    let builder = self.builder.clone();
    let model = tokio::task::spawn_blocking(move || builder.build())
      .await?
      .map_err(|e| {
        error!("模型加载失败: {}", e);
        ModelLoadError::Build(Box::new(e))
      })?;
    let model = Arc::new(model);
    *self.handle.write().unwrap_or_else(PoisonError::into_inner) = Some(model.clone());
    info!("模型加载完成，耗时: {:.2?}", now.elapsed());

    Ok(model)
  }

  pub fn handle(&self) -> Result<Arc<B::Model>, ModelNotReady> {
    self.current().ok_or(ModelNotReady)
  }

  pub fn is_ready(&self) -> bool {
    self.current().is_some()
  }

  /// 释放句柄，之后需重新 `load`；在途请求持有的句柄不受影响
  pub fn release(&self) -> Option<Arc<B::Model>> {
    let handle = self
      .handle
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if handle.is_some() {
      info!("释放模型句柄");
    }
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[derive(Error, Debug)]
  #[error("broken artifact")]
  struct Broken;

  struct CountingBuilder {
    builds: Arc<AtomicUsize>,
    fail: bool,
    delay: std::time::Duration,
  }

  impl BuildModel for CountingBuilder {
    type Model = usize;
    type Error = Broken;

    fn build(&self) -> Result<Self::Model, Self::Error> {
      std::thread::sleep(self.delay);
      let n = self.builds.fetch_add(1, Ordering::SeqCst);
      if self.fail { Err(Broken) } else { Ok(n) }
    }
  }

  #[tokio::test]
  async fn load_is_idempotent() {
    let builds = Arc::new(AtomicUsize::new(0));
    let loader = ModelLoader::new(CountingBuilder {
      builds: builds.clone(),
      fail: false,
      delay: Default::default(),
    });
    assert_eq!(loader.handle().unwrap_err(), ModelNotReady);

    let a = loader.load().await.unwrap();
    let b = loader.load().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &loader.handle().unwrap()));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failed_load_leaves_handle_unset() {
    let builds = Arc::new(AtomicUsize::new(0));
    let loader = ModelLoader::new(CountingBuilder {
      builds: builds.clone(),
      fail: true,
      delay: Default::default(),
    });

    assert!(matches!(loader.load().await, Err(ModelLoadError::Build(_))));
    assert!(!loader.is_ready());
    assert!(loader.handle().is_err());

    // 失败后允许重试
    assert!(loader.load().await.is_err());
    assert_eq!(builds.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn release_allows_reload() {
    let builds = Arc::new(AtomicUsize::new(0));
    let loader = ModelLoader::new(CountingBuilder {
      builds: builds.clone(),
      fail: false,
      delay: Default::default(),
    });
    loader.load().await.unwrap();
    assert!(loader.release().is_some());
    assert!(!loader.is_ready());
    loader.load().await.unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn concurrent_first_loads_build_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let loader = ModelLoader::new(CountingBuilder {
      builds: builds.clone(),
      fail: false,
      delay: std::time::Duration::from_millis(50),
    });

    let (a, b) = tokio::join!(loader.load(), loader.load());
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(builds.load(Ordering::SeqCst), 1);
  }
}

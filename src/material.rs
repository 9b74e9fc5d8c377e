// 该文件是 EcoQuest 项目的一部分。
// src/material.rs - 材料类别与回收指引
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

use serde::Serialize;

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> &'static str;
}

/// 模型输出顺序对应的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
  Cardboard,
  Glass,
  Metal,
  Paper,
  Plastic,
  Trash,
}

impl Material {
  pub const ALL: [Material; 6] = [
    Material::Cardboard,
    Material::Glass,
    Material::Metal,
    Material::Paper,
    Material::Plastic,
    Material::Trash,
  ];

  /// 模型输出向量的标签顺序
  pub fn model_labels() -> Vec<String> {
    Self::ALL
      .iter()
      .map(|m| m.to_label_str().to_string())
      .collect()
  }
}

impl WithLabel for Material {
  fn to_label_str(&self) -> &'static str {
    match self {
      Material::Cardboard => "cardboard",
      Material::Glass => "glass",
      Material::Metal => "metal",
      Material::Paper => "paper",
      Material::Plastic => "plastic",
      Material::Trash => "trash",
    }
  }
}

/// 前端展示使用的图标名（lucide 图标集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialIcon {
  Archive,
  Wine,
  Leaf,
  FileText,
  Coffee,
  #[serde(rename = "trash-2")]
  Trash2,
  Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Guidance {
  pub recyclable: bool,
  pub instructions: &'static str,
  pub icon: MaterialIcon,
}

struct MaterialGuide {
  label: &'static str,
  guidance: Guidance,
}

const fn entry(
  label: &'static str,
  recyclable: bool,
  icon: MaterialIcon,
  instructions: &'static str,
) -> MaterialGuide {
  MaterialGuide {
    label,
    guidance: Guidance {
      recyclable,
      instructions,
      icon,
    },
  }
}

const GUIDES: [MaterialGuide; 7] = [
  entry(
    "cardboard",
    true,
    MaterialIcon::Archive,
    "Flatten cardboard boxes and remove any tape or labels before recycling.",
  ),
  entry(
    "glass",
    true,
    MaterialIcon::Wine,
    "Rinse glass containers and separate by color if required by your local recycling program.",
  ),
  entry(
    "metal",
    true,
    MaterialIcon::Archive,
    "Rinse metal containers and remove any food residue. Most metal cans are highly recyclable.",
  ),
  // 模型不会输出 organic，文字检索会用到
  entry(
    "organic",
    false,
    MaterialIcon::Leaf,
    "Compost organic waste or use your local green waste collection service if available.",
  ),
  entry(
    "paper",
    true,
    MaterialIcon::FileText,
    "Keep paper dry and clean. Remove any plastic wrapping or non-paper materials.",
  ),
  entry(
    "plastic",
    true,
    MaterialIcon::Coffee,
    "Check the recycling number on the bottom of plastic items. Not all plastics are recyclable in every area.",
  ),
  entry(
    "trash",
    false,
    MaterialIcon::Trash2,
    "This item should be disposed of in regular waste. Consider if any parts can be reused or recycled separately.",
  ),
];

const UNKNOWN_GUIDANCE: Guidance = Guidance {
  recyclable: false,
  instructions: "Please check your local recycling guidelines for specific instructions.",
  icon: MaterialIcon::Info,
};

const SEARCH_FALLBACK: Guidance = Guidance {
  recyclable: false,
  instructions: "Please use the camera feature for accurate recycling information.",
  icon: MaterialIcon::Info,
};

/// 按标签查找回收指引，未知标签一律视为不可回收
pub fn guide(label: &str) -> Guidance {
  GUIDES
    .iter()
    .find(|g| g.label == label)
    .map(|g| g.guidance)
    .unwrap_or(UNKNOWN_GUIDANCE)
}

pub fn is_recyclable(label: &str) -> bool {
  guide(label).recyclable
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
  pub query: String,
  pub material: Option<&'static str>,
  #[serde(flatten)]
  pub guidance: Guidance,
}

/// 文字检索：查询中提到已知材料时返回其指引，否则提示改用拍照识别
pub fn search(query: &str) -> SearchResult {
  let lowered = query.trim().to_lowercase();
  let found = GUIDES
    .iter()
    .find(|g| !lowered.is_empty() && lowered.contains(g.label));

  SearchResult {
    query: query.to_string(),
    material: found.map(|g| g.label),
    guidance: found.map(|g| g.guidance).unwrap_or(SEARCH_FALLBACK),
  }
}

//! # SVG 图片加载与栅格化缓存 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            显示框架（图片组件 + 图片缓存）                │
//! │                                                          │
//! │   解析 key ──────────────→ 命中则复用位图                │
//! │       │                        │ 未命中                  │
//! └───────┼────────────────────────┼─────────────────────────┘
//!         ↓                        ↓
//! ┌───────┼────────────────────────┼─────────────────────────┐
//! │  svg_image::key          svg_image::coalesce             │
//! │  derive_key（纯函数）     同一键最多一个进行中的加载      │
//! │                                 ↓                        │
//! │                   svg_image::handler  SvgLoader::load    │
//! │                     ├─ loader  资源/文件/网络/原始标记   │
//! │                     └─ raster  resvg 栅格化 + 解码 + 释放 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`svg_image`] | 缓存键推导、SVG 来源读取、栅格化、解码与并发去重 |
//!
//! 本库不做位图保留与淘汰，这部分由宿主的图片缓存负责。

pub mod svg_image;

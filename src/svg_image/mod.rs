//! # SVG 图片模块（svg_image）
//!
//! ## 设计思路
//!
//! 该模块将“请求规范化 → 缓存键推导 → 来源读取 → 栅格化 → 位图解码”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `key`：纯函数键推导，决定哪些输入参与位图身份
//! - `handler`：编排整条加载流水线
//! - `loader`：负责资源/文件/网络/原始标记读取与校验
//! - `raster`：栅格器与场景抽象、着色哨兵、同步/异步解码与场景释放
//! - `coalesce`：宿主记忆化层可直接使用的并发去重
//! - `config/error/source`：配置、错误、请求与中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 显示框架解析图片
//!    ↓
//! key.rs（derive_key / obtain_key，同步、永不失败）
//!    ↓
//! 宿主记忆化层（命中则直接返回；未命中经 coalesce.rs 去重）
//!    ↓
//! handler.rs（SvgLoader::load，统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（自定义获取 / 资源 / 文件 / 网络 / 原始标记）
//!    └─ raster.rs（栅格化 + 解码 + 场景释放）
//!    ↓
//! DecodedBitmap（scale = 1.0）或 SvgError
//! ```
//!
//! ## 分层职责建议
//!
//! - 键的相等性变更优先改 `key.rs`，并同步检查 `coalesce.rs` 的去重语义
//! - 配置与策略变更优先改 `config.rs`
//! - 加载流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/raster`

mod coalesce;
mod config;
mod error;
mod handler;
mod key;
mod loader;
mod raster;
mod source;

pub use coalesce::{InflightLoads, SharedLoad};
pub use config::LoaderConfig;
pub use error::SvgError;
pub use handler::SvgLoader;
pub use key::{SvgCacheKey, derive_key, obtain_key};
pub use loader::{AssetBundle, DirAssetBundle, MemoryAssetBundle};
pub use raster::{Rasterizer, ResvgRasterizer, ResvgScene, VectorScene};
pub use source::{
    CustomFetcher, DecodedBitmap, DisplayConfig, FetchFuture, LogicalSize, SourceKind,
    SvgRequest, TintColor,
};

//! # 缓存键推导模块
//!
//! ## 设计思路
//!
//! 缓存键只记录“会影响位图字节”的输入：来源、物理像素尺寸、缩放比、着色、请求头与自定义获取句柄。
//! 两个请求只要渲染结果相同，就必须推导出相等的键；相等的键必然栅格化出相同位图。
//!
//! ## 实现思路
//!
//! - 缩放比：请求值 → 环境值 → `1.0`，非正数或非有限值视为缺省。
//! - 宽、高各自独立回退：请求值 → 环境值 → `100`，高度绝不借用宽度的来源。
//! - 像素尺寸 = `round(逻辑尺寸 * 缩放比)`，四舍五入远离零，下限为 0。
//! - 着色原样保存 `Option`，全透明哨兵只在栅格化阶段替换。
//! - 纯函数、不做 I/O，任何输入都能得到键。

use std::collections::BTreeMap;
use std::future::{Ready, ready};
use std::hash::{Hash, Hasher};

use super::{CustomFetcher, DisplayConfig, SourceKind, SvgRequest, TintColor};

/// 请求与环境都未给出尺寸时使用的逻辑边长。
const DEFAULT_LOGICAL_EXTENT: f64 = 100.0;
const DEFAULT_SCALE: f64 = 1.0;

/// 不可变缓存键，可直接作为记忆化字典的键。
///
/// 除 `custom_fetcher` 按句柄身份比较外，其余字段按值比较。
#[derive(Debug, Clone)]
pub struct SvgCacheKey {
    locator: String,
    source_kind: SourceKind,
    pixel_width: u32,
    pixel_height: u32,
    scale: f64,
    tint: Option<TintColor>,
    network_headers: Option<BTreeMap<String, String>>,
    custom_fetcher: Option<CustomFetcher>,
}

impl SvgCacheKey {
    /// 由请求与显示环境推导缓存键。
    ///
    /// # 示例
    /// ```rust
    /// use svg_image_cache::svg_image::{DisplayConfig, LogicalSize, SvgCacheKey, SvgRequest};
    ///
    /// let request = SvgRequest::asset("icon.svg").with_size(32.0, 32.0);
    /// let display = DisplayConfig::new(LogicalSize::default(), 2.0);
    /// let key = SvgCacheKey::derive(&request, &display);
    ///
    /// assert_eq!((key.pixel_width(), key.pixel_height()), (64, 64));
    /// assert_eq!(key.scale(), 2.0);
    /// ```
    pub fn derive(request: &SvgRequest, display: &DisplayConfig) -> Self {
        let scale = resolve_scale(request.requested_scale, display.device_pixel_ratio);
        let logical_width = resolve_extent(request.requested_size.width, display.size.width);
        let logical_height = resolve_extent(request.requested_size.height, display.size.height);

        Self {
            locator: request.locator.clone(),
            source_kind: request.source_kind,
            pixel_width: to_physical_pixels(logical_width, scale),
            pixel_height: to_physical_pixels(logical_height, scale),
            scale,
            tint: request.tint,
            network_headers: request.network_headers.clone(),
            custom_fetcher: request.custom_fetcher.clone(),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    /// 物理像素到逻辑像素的换算比，恒为正。
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn tint(&self) -> Option<TintColor> {
        self.tint
    }

    pub fn network_headers(&self) -> Option<&BTreeMap<String, String>> {
        self.network_headers.as_ref()
    }

    pub fn custom_fetcher(&self) -> Option<&CustomFetcher> {
        self.custom_fetcher.as_ref()
    }
}

impl PartialEq for SvgCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.locator == other.locator
            && self.source_kind == other.source_kind
            && self.pixel_width == other.pixel_width
            && self.pixel_height == other.pixel_height
            && self.scale.to_bits() == other.scale.to_bits()
            && self.tint == other.tint
            && self.network_headers == other.network_headers
            && self.custom_fetcher == other.custom_fetcher
    }
}

// scale 恒为有限正数，按位比较与数值比较一致。
impl Eq for SvgCacheKey {}

impl Hash for SvgCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator.hash(state);
        self.source_kind.hash(state);
        self.pixel_width.hash(state);
        self.pixel_height.hash(state);
        self.scale.to_bits().hash(state);
        self.tint.hash(state);
        self.network_headers.hash(state);
        self.custom_fetcher.hash(state);
    }
}

/// 推导缓存键（同步）。
pub fn derive_key(request: &SvgRequest, display: &DisplayConfig) -> SvgCacheKey {
    SvgCacheKey::derive(request, display)
}

/// 推导缓存键并包装为已就绪的 future，兼容异步解析协议。
pub fn obtain_key(request: &SvgRequest, display: &DisplayConfig) -> Ready<SvgCacheKey> {
    ready(SvgCacheKey::derive(request, display))
}

fn usable_scale(value: Option<f64>) -> Option<f64> {
    value.filter(|s| s.is_finite() && *s > 0.0)
}

fn usable_extent(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn resolve_scale(requested: Option<f64>, ambient: Option<f64>) -> f64 {
    usable_scale(requested)
        .or_else(|| usable_scale(ambient))
        .unwrap_or(DEFAULT_SCALE)
}

fn resolve_extent(requested: Option<f64>, ambient: Option<f64>) -> f64 {
    usable_extent(requested)
        .or_else(|| usable_extent(ambient))
        .unwrap_or(DEFAULT_LOGICAL_EXTENT)
}

fn to_physical_pixels(logical: f64, scale: f64) -> u32 {
    // f64::round 为远离零舍入；`as` 对超界值饱和。
    let pixels = (logical * scale).round();
    if pixels > 0.0 { pixels as u32 } else { 0 }
}

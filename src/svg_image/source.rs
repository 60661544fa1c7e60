//! # 请求与中间模型
//!
//! ## 设计思路
//!
//! 将“外部请求语义”和“流水线中间结果”解耦：
//! - `SvgRequest` 表示调用方描述的逻辑图片（来源 + 尺寸 + 缩放 + 着色 + 请求头 + 自定义获取）
//! - `DisplayConfig` 表示显示框架在解析时提供的环境参数
//! - `RawSvgMarkup` 表示已读取但未栅格化的 SVG 文本
//! - `DecodedBitmap` 表示最终交给显示框架的位图

use image::RgbaImage;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;

use super::{SvgCacheKey, SvgError};

/// SVG 来源类型，决定读取策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// 打包资源（由 `AssetBundle` 读取）。
    Asset,
    /// 本地文件路径。
    File,
    /// 网络地址（HTTP GET）。
    Network,
    /// `locator` 本身就是 SVG 标记。
    Raw,
}

impl SourceKind {
    /// 稳定的来源标识，用于日志与诊断。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::File => "file",
            Self::Network => "network",
            Self::Raw => "raw",
        }
    }
}

/// RGBA 着色颜色（非预乘）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TintColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TintColor {
    /// 全透明哨兵色，表示“不着色”。
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// 近透明哨兵色（alpha = 1/255），用于无法表示全透明哨兵的后端。
    pub const NEAR_TRANSPARENT: Self = Self::rgba(0, 0, 0, 1);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

/// 逻辑尺寸，宽高各自可缺省。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogicalSize {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl LogicalSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// 显示框架在解析阶段提供的环境参数。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayConfig {
    /// 布局给出的显示尺寸。
    pub size: LogicalSize,
    /// 设备像素比。
    pub device_pixel_ratio: Option<f64>,
}

impl DisplayConfig {
    pub fn new(size: LogicalSize, device_pixel_ratio: f64) -> Self {
        Self {
            size,
            device_pixel_ratio: Some(device_pixel_ratio),
        }
    }
}

/// 自定义获取函数返回的 future。
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Option<String>, SvgError>> + Send>>;

/// 自定义获取函数句柄。
///
/// 返回 `Some(markup)` 时直接使用该文本，跳过内置来源读取；返回 `None` 则回退内置策略。
/// 相等性按句柄身份比较（同一个 `Arc`），不比较行为。
#[derive(Clone)]
pub struct CustomFetcher(Arc<dyn Fn(&SvgCacheKey) -> FetchFuture + Send + Sync>);

impl CustomFetcher {
    /// # 示例
    /// ```rust
    /// use svg_image_cache::svg_image::CustomFetcher;
    ///
    /// let fetcher = CustomFetcher::new(|_key| async { Ok(Some("<svg/>".to_string())) });
    /// let same = fetcher.clone();
    /// assert_eq!(fetcher, same);
    /// ```
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(&SvgCacheKey) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, SvgError>> + Send + 'static,
    {
        Self(Arc::new(move |key: &SvgCacheKey| -> FetchFuture {
            Box::pin(fetch(key))
        }))
    }

    pub(crate) fn fetch(&self, key: &SvgCacheKey) -> FetchFuture {
        (self.0)(key)
    }

    fn identity(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for CustomFetcher {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for CustomFetcher {}

impl Hash for CustomFetcher {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.identity() as usize).hash(state);
    }
}

impl fmt::Debug for CustomFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomFetcher({:p})", self.identity())
    }
}

/// 调用方提交的逻辑图片请求。
#[derive(Debug, Clone)]
pub struct SvgRequest {
    /// 路径 / URL / 文件路径 / 原始标记，按 `source_kind` 解释。
    pub locator: String,
    pub source_kind: SourceKind,
    pub requested_size: LogicalSize,
    pub requested_scale: Option<f64>,
    /// `None` 表示不着色。
    pub tint: Option<TintColor>,
    /// 仅 `Network` 来源使用。
    pub network_headers: Option<BTreeMap<String, String>>,
    pub custom_fetcher: Option<CustomFetcher>,
}

impl SvgRequest {
    pub fn new(locator: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            locator: locator.into(),
            source_kind,
            requested_size: LogicalSize::default(),
            requested_scale: None,
            tint: None,
            network_headers: None,
            custom_fetcher: None,
        }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self::new(path, SourceKind::Asset)
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, SourceKind::File)
    }

    pub fn network(url: impl Into<String>) -> Self {
        Self::new(url, SourceKind::Network)
    }

    pub fn raw(markup: impl Into<String>) -> Self {
        Self::new(markup, SourceKind::Raw)
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.requested_size = LogicalSize::new(width, height);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.requested_size.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.requested_size.height = Some(height);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.requested_scale = Some(scale);
        self
    }

    pub fn with_tint(mut self, tint: TintColor) -> Self {
        self.tint = Some(tint);
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.network_headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_custom_fetcher(mut self, fetcher: CustomFetcher) -> Self {
        self.custom_fetcher = Some(fetcher);
        self
    }
}

/// 读取阶段输出：SVG 文本与来源标识。
pub(crate) struct RawSvgMarkup {
    /// SVG 标记文本。
    pub(crate) text: String,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 加载输出：RGBA 位图 + 显示缩放比。
///
/// 键里的像素尺寸已包含缩放，因此 `scale` 恒为 `1.0`，显示侧无需再次缩放。
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBitmap {
    /// 非预乘 RGBA 像素。
    pub image: RgbaImage,
    pub scale: f32,
}

impl DecodedBitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

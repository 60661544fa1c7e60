//! # 加载编排模块
//!
//! ## 设计思路
//!
//! `SvgLoader` 只负责流程编排与配置管理，不与任何显示框架绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按缓存键解析 SVG 标记（自定义获取优先）
//! 3. 栅格化得到矢量场景
//! 4. 提取位图，并在作用域结束时释放场景
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<LoaderConfig>>` 支持运行时替换。
//! - 单次加载使用“同一配置快照”，避免处理中途配置漂移。
//! - 所有状态都局限在单次调用内，不同键可安全并发加载。
//! - 记录 `load/raster/decode/total` 阶段耗时，便于性能诊断。
//! - 失败直接向上传播，不重试、不生成占位图。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::raster::{decode_scene, resolve_tint};
use super::{
    AssetBundle, DecodedBitmap, LoaderConfig, Rasterizer, ResvgRasterizer, SvgCacheKey, SvgError,
};

/// SVG 加载编排器。
///
/// 持有注入的资源包、栅格器与配置状态。
pub struct SvgLoader<B, R = ResvgRasterizer> {
    pub(super) config: Arc<RwLock<LoaderConfig>>,
    pub(super) assets: B,
    pub(super) rasterizer: R,
}

impl<B: AssetBundle> SvgLoader<B, ResvgRasterizer> {
    /// 使用默认 `resvg` 栅格器创建加载器。
    ///
    /// # 示例
    /// ```rust
    /// use svg_image_cache::svg_image::{LoaderConfig, MemoryAssetBundle, SvgLoader};
    ///
    /// let loader = SvgLoader::new(MemoryAssetBundle::new(), LoaderConfig::default());
    /// ```
    pub fn new(assets: B, config: LoaderConfig) -> Self {
        Self::with_rasterizer(assets, ResvgRasterizer, config)
    }
}

impl<B: AssetBundle, R: Rasterizer> SvgLoader<B, R> {
    pub fn with_rasterizer(assets: B, rasterizer: R, config: LoaderConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            assets,
            rasterizer,
        }
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次加载链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<LoaderConfig, SvgError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| SvgError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 替换配置，只影响之后开始的加载。
    pub fn update_config(&self, config: LoaderConfig) -> Result<(), SvgError> {
        let mut current = self
            .config
            .write()
            .map_err(|_| SvgError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *current = config;

        log::info!(
            "⚙️ 已更新 SVG 加载配置（max_markup_bytes={}, max_decoded_pixels={}, prefer_sync_decode={}）",
            current.max_markup_bytes,
            current.max_decoded_pixels,
            current.prefer_sync_decode
        );

        Ok(())
    }

    pub fn assets(&self) -> &B {
        &self.assets
    }

    /// 加载主入口：按缓存键读取、栅格化并解码。
    ///
    /// 返回位图的显示缩放比恒为 `1.0`：键的像素尺寸已包含缩放。
    ///
    /// # 示例
    /// ```rust
    /// use svg_image_cache::svg_image::{
    ///     derive_key, DisplayConfig, LoaderConfig, MemoryAssetBundle, SvgLoader, SvgRequest,
    /// };
    ///
    /// # async fn demo() -> Result<(), svg_image_cache::svg_image::SvgError> {
    /// let loader = SvgLoader::new(MemoryAssetBundle::new(), LoaderConfig::default());
    /// let request = SvgRequest::raw(r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#)
    ///     .with_size(8.0, 8.0);
    /// let key = derive_key(&request, &DisplayConfig::default());
    /// let bitmap = loader.load(&key).await?;
    /// assert_eq!((bitmap.width(), bitmap.height()), (8, 8));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load(&self, key: &SvgCacheKey) -> Result<DecodedBitmap, SvgError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        Self::validate_pixel_limits(key, &config)?;

        let load_start = Instant::now();
        let markup = self.resolve_markup(key, &config).await?;
        let load_elapsed = load_start.elapsed();

        let raster_start = Instant::now();
        let tint = resolve_tint(key.tint(), config.transparent_sentinel_workaround);
        let scene = self.rasterizer.parse_and_render(
            &markup.text,
            (key.pixel_width(), key.pixel_height()),
            tint,
        )?;
        let raster_elapsed = raster_start.elapsed();

        let decode_start = Instant::now();
        let image = decode_scene(
            scene,
            key.pixel_width(),
            key.pixel_height(),
            config.prefer_sync_decode,
        )
        .await?;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "✅ SVG 加载完成 - 来源: {} 尺寸: {}x{} load={}ms raster={}ms decode={}ms total={}ms",
            markup.source_hint,
            image.width(),
            image.height(),
            load_elapsed.as_millis(),
            raster_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(DecodedBitmap { image, scale: 1.0 })
    }

    /// 校验目标像素数量是否超过配置上限。
    fn validate_pixel_limits(key: &SvgCacheKey, config: &LoaderConfig) -> Result<(), SvgError> {
        let pixels = u64::from(key.pixel_width()) * u64::from(key.pixel_height());

        if pixels > config.max_decoded_pixels {
            return Err(SvgError::ResourceLimit(format!(
                "目标像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }
}

//! # 栅格化与解码模块
//!
//! ## 设计思路
//!
//! 栅格器被视为黑盒：`parse_and_render(markup, size, tint) -> VectorScene`，
//! 场景再通过 `to_bitmap` 提取像素。场景是需要显式释放的中间对象，
//! 由 `SceneGuard` 在作用域结束时释放，成功、失败、panic 都只释放一次。
//!
//! ## 实现思路
//!
//! 1. 解析着色：缺省时替换为透明哨兵（特定后端用近透明哨兵）
//! 2. 解析标记得到场景
//! 3. 优先同步解码；场景不支持或配置关闭时改走 `spawn_blocking`
//! 4. 默认后端基于 `resvg`：按目标尺寸逐轴缩放，source-atop 着色，输出非预乘 RGBA

use image::RgbaImage;
use once_cell::sync::Lazy;
use resvg::{tiny_skia, usvg};
use std::ops::Deref;
use std::sync::Arc;

use super::{SvgError, TintColor};

/// 系统字体库只加载一次，供所有解析共享。
static FONT_DB: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    log::debug!("🔤 已加载系统字体：{} 个", db.len());
    Arc::new(db)
});

/// 栅格器产出的矢量场景。
pub trait VectorScene: Send + 'static {
    /// 当前平台是否允许同步提取位图。
    fn supports_sync_decode(&self) -> bool {
        true
    }

    /// 按目标像素尺寸提取位图（非预乘 RGBA）。
    fn to_bitmap(&self, pixel_width: u32, pixel_height: u32) -> Result<RgbaImage, SvgError>;

    /// 释放底层资源。由 `SceneGuard` 保证只调用一次。
    fn release(&mut self);
}

/// SVG 栅格器。
pub trait Rasterizer: Send + Sync {
    type Scene: VectorScene;

    /// 解析标记并生成场景；标记非法时返回 `SvgError::MalformedMarkup`。
    fn parse_and_render(
        &self,
        markup: &str,
        target_size: (u32, u32),
        tint: TintColor,
    ) -> Result<Self::Scene, SvgError>;
}

/// 作用域内持有场景，离开作用域时释放。
pub(crate) struct SceneGuard<S: VectorScene> {
    scene: S,
}

impl<S: VectorScene> SceneGuard<S> {
    pub(crate) fn new(scene: S) -> Self {
        Self { scene }
    }
}

impl<S: VectorScene> Deref for SceneGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.scene
    }
}

impl<S: VectorScene> Drop for SceneGuard<S> {
    fn drop(&mut self) {
        self.scene.release();
    }
}

/// 解析着色：缺省时替换为“不着色”哨兵色。
///
/// `near_transparent_sentinel` 为真时使用 alpha = 1/255 的哨兵，绕开部分后端对全透明色的缺陷。
pub(crate) fn resolve_tint(tint: Option<TintColor>, near_transparent_sentinel: bool) -> TintColor {
    match tint {
        Some(color) => color,
        None if near_transparent_sentinel => TintColor::NEAR_TRANSPARENT,
        None => TintColor::TRANSPARENT,
    }
}

/// 从场景提取位图并释放场景。
pub(crate) async fn decode_scene<S: VectorScene>(
    scene: S,
    pixel_width: u32,
    pixel_height: u32,
    prefer_sync: bool,
) -> Result<RgbaImage, SvgError> {
    let guard = SceneGuard::new(scene);

    if prefer_sync && guard.supports_sync_decode() {
        log::debug!("🖼️ 同步解码 {}x{}", pixel_width, pixel_height);
        return guard.to_bitmap(pixel_width, pixel_height);
    }

    log::debug!("🖼️ 异步解码 {}x{}", pixel_width, pixel_height);
    tokio::task::spawn_blocking(move || guard.to_bitmap(pixel_width, pixel_height))
        .await
        .map_err(|e| SvgError::Decode(format!("异步解码任务失败：{}", e)))?
}

/// 基于 `resvg` 的默认栅格器。
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

impl Rasterizer for ResvgRasterizer {
    type Scene = ResvgScene;

    fn parse_and_render(
        &self,
        markup: &str,
        target_size: (u32, u32),
        tint: TintColor,
    ) -> Result<ResvgScene, SvgError> {
        let options = usvg::Options {
            fontdb: Arc::clone(&FONT_DB),
            ..usvg::Options::default()
        };

        let tree = usvg::Tree::from_str(markup, &options)
            .map_err(|e| SvgError::MalformedMarkup(e.to_string()))?;

        let size = tree.size();
        log::debug!(
            "🧩 SVG 解析完成 - 固有尺寸: {}x{} 目标尺寸: {}x{}",
            size.width(),
            size.height(),
            target_size.0,
            target_size.1
        );

        Ok(ResvgScene {
            tree: Some(tree),
            // 全透明着色在 source-atop 下不改变任何像素
            tint: (tint.a > 0).then_some(tint),
        })
    }
}

/// `resvg` 场景：持有解析后的树，释放后不可再解码。
pub struct ResvgScene {
    tree: Option<usvg::Tree>,
    tint: Option<TintColor>,
}

impl VectorScene for ResvgScene {
    fn to_bitmap(&self, pixel_width: u32, pixel_height: u32) -> Result<RgbaImage, SvgError> {
        let tree = self
            .tree
            .as_ref()
            .ok_or_else(|| SvgError::Decode("场景已释放".to_string()))?;

        let mut pixmap = tiny_skia::Pixmap::new(pixel_width, pixel_height).ok_or_else(|| {
            SvgError::Decode(format!("无法创建画布：{}x{}", pixel_width, pixel_height))
        })?;

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            pixel_width as f32 / size.width(),
            pixel_height as f32 / size.height(),
        );
        resvg::render(tree, transform, &mut pixmap.as_mut());

        if let Some(tint) = self.tint {
            apply_tint(&mut pixmap, tint);
        }

        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }

        RgbaImage::from_raw(pixel_width, pixel_height, rgba)
            .ok_or_else(|| SvgError::Decode("解码后像素数据长度异常".to_string()))
    }

    fn release(&mut self) {
        self.tree = None;
    }
}

/// 把着色色按其 alpha 叠加到已绘制像素上，覆盖度保持不变（source-atop）。
fn apply_tint(pixmap: &mut tiny_skia::Pixmap, tint: TintColor) {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color_rgba8(tint.r, tint.g, tint.b, tint.a);
    paint.blend_mode = tiny_skia::BlendMode::SourceAtop;
    paint.anti_alias = false;

    if let Some(rect) =
        tiny_skia::Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32)
    {
        pixmap.fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
    }
}

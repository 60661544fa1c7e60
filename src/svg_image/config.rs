//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `LoaderConfig`，保证运行时行为可观测、可调整、可测试。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - 所有字段带 `#[serde(default)]`，配置文件只需写出要覆盖的项。
//! - `load_from_path` 从 JSON 文件读取；文件不存在时回退默认值。

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::SvgError;

/// SVG 加载配置。
///
/// 字段覆盖了读取、栅格化与解码三个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 单份 SVG 标记允许的最大体积（字节）。
    pub max_markup_bytes: u64,
    /// 网络下载超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 栅格化目标像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 场景支持时优先走同步解码路径。
    pub prefer_sync_decode: bool,
    /// 无着色时使用 alpha = 1/255 的近透明哨兵色，而不是全透明。
    ///
    /// 部分图形后端无法表示全透明哨兵色，仅在这些平台上开启。
    pub transparent_sentinel_workaround: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_markup_bytes: 8 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            max_decoded_pixels: 40_000_000,
            prefer_sync_decode: true,
            transparent_sentinel_workaround: cfg!(target_arch = "wasm32"),
        }
    }
}

impl LoaderConfig {
    /// 从 JSON 文件加载配置。
    ///
    /// 文件不存在时返回默认配置；内容无法解析时返回 `InvalidFormat`。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use svg_image_cache::svg_image::LoaderConfig;
    ///
    /// let config = LoaderConfig::load_from_path("svg_loader.json")?;
    /// # Ok::<(), svg_image_cache::svg_image::SvgError>(())
    /// ```
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SvgError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("⚙️ 配置文件不存在，使用默认配置：{}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SvgError::InvalidFormat(format!("解析配置文件失败：{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{ "max_markup_bytes": 1024, "prefer_sync_decode": false }"#)
                .expect("parse config failed");

        assert_eq!(config.max_markup_bytes, 1024);
        assert!(!config.prefer_sync_decode);
        assert_eq!(config.download_timeout, LoaderConfig::default().download_timeout);
        assert_eq!(config.max_decoded_pixels, LoaderConfig::default().max_decoded_pixels);
    }

    #[test]
    fn missing_file_yields_default_config() {
        let path = std::env::temp_dir().join("svg-image-cache-config-does-not-exist.json");
        let config = LoaderConfig::load_from_path(&path).expect("missing file should not fail");

        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn malformed_file_is_invalid_format() {
        let path = std::env::temp_dir().join(format!(
            "svg-image-cache-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").expect("write temp config failed");

        let result = LoaderConfig::load_from_path(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(SvgError::InvalidFormat(_))));
    }
}

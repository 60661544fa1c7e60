//! # 来源读取模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（自定义获取 / 打包资源 / 本地文件 / 网络 / 原始标记）的 SVG 文本读取，
//! 并在“尽可能早”的阶段执行体积与内容校验，尽快失败。
//!
//! ## 实现思路
//!
//! - 自定义获取：返回 `Some` 即直接采用，不再走内置策略。
//! - 资源：交给注入的 `AssetBundle`，不持有全局单例。
//! - 文件：metadata 体积限制 + 读取 + UTF-8 校验。
//! - 网络：GET + 透传请求头 + 状态码校验 + 流式读取体积限制。
//! - 原始标记：`locator` 即标记，支持 `data:image/svg+xml` Data URL，不做 I/O。
//! - 网络错误统一映射到 `SvgError`，便于上层处理。

use base64::{Engine as _, engine::general_purpose};
use percent_encoding::percent_decode_str;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::source::RawSvgMarkup;
use super::{LoaderConfig, Rasterizer, SourceKind, SvgCacheKey, SvgError, SvgLoader};

const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

/// 打包资源读取器。
///
/// 由调用方在构建 `SvgLoader` 时注入。
pub trait AssetBundle: Send + Sync {
    /// 按资源路径读取文本；资源缺失时返回 `SvgError::NotFound`。
    fn load_text(&self, locator: &str) -> impl Future<Output = Result<String, SvgError>> + Send;
}

impl<T: AssetBundle> AssetBundle for Arc<T> {
    fn load_text(&self, locator: &str) -> impl Future<Output = Result<String, SvgError>> + Send {
        (**self).load_text(locator)
    }
}

/// 以目录为根的资源包。
///
/// 只接受相对路径，拒绝绝对路径与 `..`，避免越出资源根目录。
#[derive(Debug, Clone)]
pub struct DirAssetBundle {
    root: PathBuf,
}

impl DirAssetBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &str) -> Option<PathBuf> {
        let relative = Path::new(locator);
        let is_contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        (is_contained && !locator.is_empty()).then(|| self.root.join(relative))
    }
}

impl AssetBundle for DirAssetBundle {
    async fn load_text(&self, locator: &str) -> Result<String, SvgError> {
        let path = self
            .resolve(locator)
            .ok_or_else(|| SvgError::NotFound(format!("资源路径无效：{}", locator)))?;

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SvgError::NotFound(format!("资源不存在：{}", locator)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// 内存资源包，适合嵌入式资源与测试。
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetBundle {
    entries: HashMap<String, String>,
}

impl MemoryAssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, locator: impl Into<String>, markup: impl Into<String>) {
        self.entries.insert(locator.into(), markup.into());
    }

    pub fn with_asset(mut self, locator: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(locator, markup);
        self
    }
}

impl AssetBundle for MemoryAssetBundle {
    async fn load_text(&self, locator: &str) -> Result<String, SvgError> {
        self.entries
            .get(locator)
            .cloned()
            .ok_or_else(|| SvgError::NotFound(format!("资源不存在：{}", locator)))
    }
}

impl<B: AssetBundle, R: Rasterizer> SvgLoader<B, R> {
    /// 按缓存键解析 SVG 标记文本。
    ///
    /// 自定义获取函数优先；返回 `None` 时按来源类型分派。
    pub(super) async fn resolve_markup(
        &self,
        key: &SvgCacheKey,
        config: &LoaderConfig,
    ) -> Result<RawSvgMarkup, SvgError> {
        if let Some(fetcher) = key.custom_fetcher()
            && let Some(text) = fetcher.fetch(key).await?
        {
            log::debug!(
                "🧩 自定义获取命中，跳过内置来源 - {}",
                key.source_kind().as_str()
            );
            return Self::checked_markup(text, "custom", config);
        }

        match key.source_kind() {
            SourceKind::Asset => self.load_from_asset(key.locator(), config).await,
            SourceKind::File => Self::load_from_file(key.locator(), config).await,
            SourceKind::Network => {
                Self::load_from_network(key.locator(), key.network_headers(), config).await
            }
            SourceKind::Raw => Self::load_from_raw(key.locator(), config),
        }
    }

    async fn load_from_asset(
        &self,
        locator: &str,
        config: &LoaderConfig,
    ) -> Result<RawSvgMarkup, SvgError> {
        log::info!("📦 开始读取资源 SVG - 路径: {}", locator);

        let text = self.assets.load_text(locator).await?;
        Self::checked_markup(text, "asset", config)
    }

    async fn load_from_file(path: &str, config: &LoaderConfig) -> Result<RawSvgMarkup, SvgError> {
        log::info!("📁 开始读取本地 SVG - 路径: {}", path);

        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(SvgError::FileSystem(format!("不是普通文件：{}", path)));
        }
        Self::enforce_markup_limit(metadata.len(), config)?;

        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| SvgError::InvalidFormat(format!("文件不是 UTF-8 文本：{}", e)))?;

        Self::checked_markup(text, "file", config)
    }

    async fn load_from_network(
        url: &str,
        headers: Option<&BTreeMap<String, String>>,
        config: &LoaderConfig,
    ) -> Result<RawSvgMarkup, SvgError> {
        log::info!("🌐 开始下载 SVG - URL: {}", Self::redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| SvgError::InvalidFormat(format!("URL 格式错误：{}", e)))?;
        let client = Self::build_http_client(config)?;
        let header_map = Self::build_header_map(headers)?;

        let mut response = client
            .get(parsed)
            .headers(header_map)
            .send()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url, config))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!(
                "⚠️ HTTP {}（{}）- URL: {}",
                status.as_u16(),
                Self::status_message(status.as_u16()),
                Self::redact_url_for_log(url)
            );
            return Err(SvgError::BadStatus {
                status: status.as_u16(),
                url: Self::redact_url_for_log(url),
            });
        }

        let total_len = response.content_length();
        if let Some(len) = total_len {
            Self::enforce_markup_limit(len, config)?;
        }

        let initial_capacity = total_len
            .map(|len| len.min(config.max_markup_bytes) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_reqwest_error(e, url, config))?
        {
            Self::enforce_markup_limit((buffer.len() + chunk.len()) as u64, config)?;
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());

        let text = String::from_utf8(buffer)
            .map_err(|e| SvgError::InvalidFormat(format!("响应不是 UTF-8 文本：{}", e)))?;
        Self::checked_markup(text, "network", config)
    }

    fn load_from_raw(locator: &str, config: &LoaderConfig) -> Result<RawSvgMarkup, SvgError> {
        let text = Self::decode_raw_locator(locator)?;
        Self::checked_markup(text, "raw", config)
    }

    /// 解析原始标记来源。
    ///
    /// 支持 `data:image/svg+xml;base64,...` 与百分号编码的 `data:image/svg+xml,...`，其余输入原样返回。
    pub(crate) fn decode_raw_locator(locator: &str) -> Result<String, SvgError> {
        let Some(rest) = locator.trim_start().strip_prefix("data:") else {
            return Ok(locator.to_string());
        };

        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| SvgError::InvalidFormat("Data URL 缺少逗号分隔".to_string()))?;
        let meta = meta.trim().to_ascii_lowercase();

        if !meta.starts_with("image/svg+xml") {
            return Err(SvgError::InvalidFormat(format!("Data URL 不是 SVG 类型：{}", meta)));
        }

        if meta.ends_with(";base64") {
            let bytes = general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| SvgError::Decode(format!("Base64 解码失败：{}", e)))?;
            return String::from_utf8(bytes)
                .map_err(|e| SvgError::InvalidFormat(format!("Data URL 内容不是 UTF-8：{}", e)));
        }

        percent_decode_str(payload)
            .decode_utf8()
            .map(|text| text.into_owned())
            .map_err(|e| SvgError::InvalidFormat(format!("Data URL 内容不是 UTF-8：{}", e)))
    }

    fn checked_markup(
        text: String,
        source_hint: &'static str,
        config: &LoaderConfig,
    ) -> Result<RawSvgMarkup, SvgError> {
        Self::enforce_markup_limit(text.len() as u64, config)?;
        Self::validate_svg_markup(&text)?;

        Ok(RawSvgMarkup { text, source_hint })
    }

    fn enforce_markup_limit(len: u64, config: &LoaderConfig) -> Result<(), SvgError> {
        if len > config.max_markup_bytes {
            return Err(SvgError::ResourceLimit(format!(
                "SVG 体积过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                config.max_markup_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    /// 粗略确认文本是 SVG 标记；完整解析交给栅格器。
    fn validate_svg_markup(text: &str) -> Result<(), SvgError> {
        if text.trim().is_empty() {
            return Err(SvgError::InvalidFormat("SVG 内容为空".to_string()));
        }

        if !text.contains("<svg") {
            return Err(SvgError::InvalidFormat("内容不是 SVG 标记".to_string()));
        }

        Ok(())
    }

    fn build_http_client(config: &LoaderConfig) -> Result<reqwest::Client, SvgError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| SvgError::Network(format!("无法创建 HTTP 客户端：{}", e)))
    }

    fn build_header_map(
        headers: Option<&BTreeMap<String, String>>,
    ) -> Result<reqwest::header::HeaderMap, SvgError> {
        let mut map = reqwest::header::HeaderMap::new();
        let Some(headers) = headers else {
            return Ok(map);
        };

        for (name, value) in headers {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SvgError::InvalidFormat(format!("请求头名称无效 {}：{}", name, e)))?;
            let header_value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| SvgError::InvalidFormat(format!("请求头取值无效 {}：{}", name, e)))?;
            map.insert(header_name, header_value);
        }

        Ok(map)
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(e: reqwest::Error, url: &str, config: &LoaderConfig) -> SvgError {
        let err_msg = Self::sanitize_error_message_with_redacted_url(&e.to_string(), url);

        if e.is_timeout() {
            SvgError::Timeout(format!("下载超时（{}秒）", config.download_timeout))
        } else if e.is_connect() {
            SvgError::Network(format!("无法连接：{}", err_msg))
        } else {
            SvgError::Network(format!("请求失败：{}", err_msg))
        }
    }

    pub(crate) fn redact_url_for_log(url: &str) -> String {
        let Ok(parsed) = reqwest::Url::parse(url) else {
            return "<invalid-url>".to_string();
        };

        let host = parsed.host_str().unwrap_or("<unknown-host>");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
        let path = parsed.path();

        format!("{}://{}{}{}", parsed.scheme(), host, port, path)
    }

    fn sanitize_error_message_with_redacted_url(error_msg: &str, url: &str) -> String {
        let redacted = Self::redact_url_for_log(url);
        error_msg.replace(url, &redacted)
    }

    /// 常见 HTTP 状态码本地化文案。
    fn status_message(code: u16) -> &'static str {
        match code {
            404 => "未找到",
            401 | 403 => "访问被拒绝",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg_image::ResvgRasterizer;

    type Loader = SvgLoader<MemoryAssetBundle, ResvgRasterizer>;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"></svg>"#;

    #[test]
    fn raw_locator_without_data_prefix_is_returned_verbatim() {
        let decoded = Loader::decode_raw_locator(SVG).expect("raw locator should decode");

        assert_eq!(decoded, SVG);
    }

    #[test]
    fn raw_base64_data_url_is_decoded() {
        let encoded = general_purpose::STANDARD.encode(SVG);
        let data_url = format!("data:image/svg+xml;base64,{}", encoded);

        let decoded = Loader::decode_raw_locator(&data_url).expect("data url should decode");

        assert_eq!(decoded, SVG);
    }

    #[test]
    fn raw_plain_data_url_keeps_text_after_comma() {
        let data_url = format!("data:image/svg+xml;utf8,{}", SVG);

        let decoded = Loader::decode_raw_locator(&data_url).expect("data url should decode");

        assert_eq!(decoded, SVG);
    }

    #[test]
    fn raw_percent_encoded_data_url_is_decoded() {
        let data_url = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20width%3D%224%22%20height%3D%224%22%3E%3C%2Fsvg%3E";

        let decoded = Loader::decode_raw_locator(data_url).expect("data url should decode");

        assert_eq!(decoded, SVG);
    }

    #[test]
    fn raw_data_url_with_non_svg_type_is_rejected() {
        let result = Loader::decode_raw_locator("data:image/png;base64,iVBORw0KGgo=");

        assert!(matches!(result, Err(SvgError::InvalidFormat(_))));
    }

    #[test]
    fn markup_check_rejects_non_svg_text() {
        let config = LoaderConfig::default();

        assert!(matches!(
            Loader::checked_markup("<html></html>".to_string(), "test", &config),
            Err(SvgError::InvalidFormat(_))
        ));
        assert!(matches!(
            Loader::checked_markup("   ".to_string(), "test", &config),
            Err(SvgError::InvalidFormat(_))
        ));
    }

    #[test]
    fn markup_check_enforces_size_limit() {
        let config = LoaderConfig {
            max_markup_bytes: 16,
            ..LoaderConfig::default()
        };

        let result = Loader::checked_markup(SVG.to_string(), "test", &config);

        assert!(matches!(result, Err(SvgError::ResourceLimit(_))));
    }

    #[test]
    fn dir_bundle_rejects_paths_escaping_root() {
        let bundle = DirAssetBundle::new("/srv/assets");

        assert!(bundle.resolve("../etc/passwd").is_none());
        assert!(bundle.resolve("/etc/passwd").is_none());
        assert!(bundle.resolve("").is_none());
        assert_eq!(
            bundle.resolve("icons/home.svg"),
            Some(PathBuf::from("/srv/assets/icons/home.svg"))
        );
    }

    #[tokio::test]
    async fn memory_bundle_reports_missing_asset_as_not_found() {
        let bundle = MemoryAssetBundle::new().with_asset("a.svg", SVG);

        assert_eq!(bundle.load_text("a.svg").await.expect("asset exists"), SVG);
        assert!(matches!(
            bundle.load_text("b.svg").await,
            Err(SvgError::NotFound(_))
        ));
    }

    #[test]
    fn header_map_rejects_invalid_names() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());

        assert!(matches!(
            Loader::build_header_map(Some(&headers)),
            Err(SvgError::InvalidFormat(_))
        ));
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted =
            Loader::redact_url_for_log("https://example.com:8443/icons/a.svg?token=abc123#hash");

        assert_eq!(redacted, "https://example.com:8443/icons/a.svg");
    }
}

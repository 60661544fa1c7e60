//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载 SVG 加载链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 错误分为两大类：
//! - 来源不可用（资源不存在 / 权限 / 文件 / 网络 / HTTP 状态 / 超时）
//! - 标记不合法（栅格器拒绝解析）
//!
//! 键推导永远不会失败，因此这里没有“配置非法”分支：非法缩放比等直接回退默认值。

use std::io;

/// SVG 加载统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum SvgError {
    #[error("资源不存在：{0}")]
    NotFound(String),

    #[error("无权访问：{0}")]
    PermissionDenied(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("HTTP {status}：{url}")]
    BadStatus { status: u16, url: String },

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("SVG 解析失败：{0}")]
    MalformedMarkup(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl SvgError {
    /// 是否属于“来源不可用”类错误（资源/文件/网络读取失败）。
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::PermissionDenied(_)
                | Self::FileSystem(_)
                | Self::Network(_)
                | Self::BadStatus { .. }
                | Self::Timeout(_)
        )
    }

    /// 是否为栅格器拒绝的非法 SVG 标记。
    pub fn is_malformed_markup(&self) -> bool {
        matches!(self, Self::MalformedMarkup(_))
    }
}

impl From<io::Error> for SvgError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(error.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(error.to_string()),
            _ => Self::FileSystem(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_matching_variants() {
        let not_found: SvgError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(not_found, SvgError::NotFound(_)));

        let denied: SvgError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(denied, SvgError::PermissionDenied(_)));

        let other: SvgError = io::Error::other("disk on fire").into();
        assert!(matches!(other, SvgError::FileSystem(_)));
    }

    #[test]
    fn classification_separates_source_and_markup_failures() {
        let status = SvgError::BadStatus {
            status: 404,
            url: "https://example.com/a.svg".to_string(),
        };
        assert!(status.is_source_unavailable());
        assert!(!status.is_malformed_markup());

        let markup = SvgError::MalformedMarkup("unexpected eof".to_string());
        assert!(markup.is_malformed_markup());
        assert!(!markup.is_source_unavailable());

        assert!(!SvgError::ResourceLimit("too big".to_string()).is_source_unavailable());
    }
}

//! 输入文本
//!
//! 远端转换服务把图像以 base64 文本返回，并附带声明的格式名。本模块负责
//! 把文本还原为字节，以及根据格式名决定图像交给浏览器原生显示还是需要
//! 经过本库解码。

use crate::decode::CanvasResult;
use base64::{engine::general_purpose, Engine as _};

/// 去掉 `data:<mime>;base64,` 前缀
///
/// 没有前缀时原样返回
pub fn strip_data_url(text: &str) -> &str {
    let trimmed = text.trim_start();
    if !trimmed.starts_with("data:") {
        return text;
    }
    match trimmed.find(";base64,") {
        Some(start) => &trimmed[start + ";base64,".len()..],
        None => text,
    }
}

/// 将 base64 文本解码为字节
///
/// 接受带 `data:` 前缀或换行的文本，使用标准字母表并要求补齐。
///
/// # 错误
///
/// 字符非法或长度不合法时返回 `MalformedEncoding`
pub fn decode_base64(text: &str) -> CanvasResult<Vec<u8>> {
    let payload = strip_data_url(text);
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(general_purpose::STANDARD.decode(compact)?)
}

/// 服务端声明的图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// TIFF，浏览器无法直接显示，需要解码到画布
    Tiff,
    /// 以 `tif` 声明的 TIFF，只提供 `image/tiff` 链接，不解码到画布
    Tif,
    /// PNG
    Png,
    /// JPEG
    Jpeg,
}

impl SourceFormat {
    /// 根据格式名识别，不区分大小写；缺失或无法识别时按 JPEG 处理
    ///
    /// 只有 `tiff` 走画布，`tif` 得到相同的 MIME 类型但按普通图片显示。
    pub fn from_declared(format: Option<&str>) -> Self {
        match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("tiff") => Self::Tiff,
            Some("tif") => Self::Tif,
            Some("png") => Self::Png,
            _ => Self::Jpeg,
        }
    }

    /// 对应的 MIME 类型
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Tiff | Self::Tif => "image/tiff",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// 是否需要解码到画布才能显示
    pub const fn needs_canvas(&self) -> bool {
        matches!(self, Self::Tiff)
    }

    /// 生成可直接显示或下载的 `data:` URL
    pub fn data_url(&self, base64: &str) -> String {
        format!("data:{};base64,{}", self.mime_type(), base64)
    }
}

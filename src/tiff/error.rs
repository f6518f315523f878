//! TIFF 容器解析错误
//!
//! 只覆盖容器层面的问题：文件头、IFD 链和标签。像素数据的解压与颜色转换错误
//! 由 [`crate::decode`] 模块定义。

use std::fmt;
use std::io;

use super::TagId;

/// TIFF 容器错误
#[derive(Debug)]
pub enum TiffError {
    /// 字节序标记或版本号无法识别（既不是 TIFF 也不是 BigTIFF）
    UnsupportedContainer,

    /// 文件头、目录项、标签值或 IFD 指针引用了缓冲区之外的字节
    TruncatedData,

    /// IFD 链中出现重复偏移量，包含重复的偏移量
    IfdLoop(u64),

    /// 缺少必需的标签
    MissingTag(TagId),

    /// 标签存在但内容无效
    BadTag(TagId),

    /// 底层 IO 错误（意外的文件结尾已转换为 `TruncatedData`）
    ReadError(io::Error),
}

/// 从 IO 错误转换
///
/// 读取时遇到的意外文件结尾说明目录或指针越过了缓冲区末尾
impl From<io::Error> for TiffError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => TiffError::TruncatedData,
            _ => TiffError::ReadError(e),
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::UnsupportedContainer => write!(f, "无法识别的TIFF文件头"),
            TiffError::TruncatedData => write!(f, "数据被截断: 引用超出缓冲区范围"),
            TiffError::IfdLoop(offset) => write!(f, "IFD链存在循环: 偏移量 {offset}"),
            TiffError::MissingTag(tag) => write!(f, "缺少必需的标签: {:?}", tag),
            TiffError::BadTag(tag) => write!(f, "标签数据错误: {:?}", tag),
            TiffError::ReadError(e) => write!(f, "IO读取错误: {}", e),
        }
    }
}

impl std::error::Error for TiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffError::ReadError(e) => Some(e),
            _ => None,
        }
    }
}

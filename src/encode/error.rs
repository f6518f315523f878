//! 编码过程中的错误

use crate::decode::DecompressError;
use crate::raster::RasterError;
use std::fmt;
use std::io;

/// 编码操作的结果类型
pub type EncodeResult<T> = Result<T, EncodeError>;

/// 编码过程中可能出现的错误类型
#[derive(Debug)]
pub enum EncodeError {
    /// 文件写入错误
    WriteError(io::Error),
    /// 样本缓冲区错误
    RasterizationError(RasterError),
    /// 数据压缩错误
    CompressionError(DecompressError),
    /// 页面参数互相矛盾，或无法用所选的 TIFF 变体表示
    InvalidPage(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::WriteError(e) => write!(f, "写入错误: {e}"),
            EncodeError::RasterizationError(e) => write!(f, "栅格错误: {e}"),
            EncodeError::CompressionError(e) => write!(f, "压缩错误: {e}"),
            EncodeError::InvalidPage(what) => write!(f, "页面参数无效: {what}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::WriteError(e) => Some(e),
            EncodeError::RasterizationError(e) => Some(e),
            EncodeError::CompressionError(e) => Some(e),
            EncodeError::InvalidPage(_) => None,
        }
    }
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::WriteError(e)
    }
}

impl From<RasterError> for EncodeError {
    fn from(e: RasterError) -> Self {
        EncodeError::RasterizationError(e)
    }
}

impl From<DecompressError> for EncodeError {
    fn from(e: DecompressError) -> Self {
        EncodeError::CompressionError(e)
    }
}

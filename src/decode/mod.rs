//! 像素数据解码
//!
//! 在 [`crate::tiff`] 解析出的容器结构之上，把一个 IFD 整理为 [`Page`]，
//! 再把它的数据块解压为 [`SampleBuffer`](crate::raster::SampleBuffer)。
//!
//! # 核心组件
//!
//! - [`Page`] - 一页图像的尺寸、布局、颜色解释和数据块位置
//! - [`Compression`] - 压缩方式，实现了 None、LZW、Deflate 和 PackBits
//! - [`Predictor`] - 水平差分预测器
//! - [`decompress`] - 逐个数据块解压并放置到绝对位置
//! - [`CanvasError`] - 整条管线的错误类型

use crate::tiff::Tiff;
use std::io::{Read, Seek, SeekFrom};

mod compression;
mod decompress;
mod error;
mod page;

pub use compression::{Compression, DecompressError, Predictor};
pub use decompress::{decompress, unpack_row};
pub use error::{CanvasError, CanvasResult};
pub use page::{ChunkLayout, Page, Palette};

/// 打印文件结构和第一页的解码参数，用于排查问题
pub fn disect<R: Read + Seek>(stream: &mut R) -> CanvasResult<()> {
    let tiff = Tiff::open(stream)?;
    println!("{tiff}");

    let stream_len = stream
        .seek(SeekFrom::End(0))
        .map_err(crate::tiff::TiffError::from)?;
    let ifd0 = tiff.ifd0().ok_or(CanvasError::NoPagesFound)?;
    let page = Page::from_ifd(ifd0, tiff.endian, stream_len)?;
    println!("{page}");

    Ok(())
}

//! 把 base64 编码的 TIFF 图像解码并绘制到显示表面的库
//!
//! 浏览器和大多数显示后端能直接显示 JPEG 和 PNG，但不能显示 TIFF。
//! 本库补上这一环，整条管线为:
//!
//! base64 文本 → 字节 → IFD 链 → 第一页解压 → 8 位 RGBA → 显示表面
//!
//! # 主要功能
//! - 标准 TIFF 和 BigTIFF 容器解析，按磁盘顺序遍历 IFD 链
//! - 条带和瓦片、交错和分平面、1 到 16 位样本
//! - None、LZW、Deflate、PackBits 压缩以及水平预测器
//! - WhiteIsZero、BlackIsZero、RGB(A)、调色板、CMYK、YCbCr 转换为 RGBA
//! - 可替换的绘图表面，以及保证单写者的 [`TiffCanvas`]
//! - 用于生成测试数据的基线 TIFF 编码器
//!
//! # 示例
//! ```no_run
//! use tiffcanvas::{render_tiff, MemorySurface, RenderOutcome};
//!
//! let base64 = std::fs::read_to_string("page.b64").unwrap();
//! let mut surface = MemorySurface::new();
//! if let RenderOutcome::Presented { width, height } = render_tiff(&base64, &mut surface).unwrap() {
//!     println!("图像尺寸: {width}x{height}");
//! }
//! ```

// 导出主要模块
pub mod decode; // 页面模型、解压和错误
pub mod encode; // 编码相关功能
pub mod raster; // 样本和 RGBA 缓冲区、颜色转换
pub mod render; // 显示表面和渲染流程
pub mod source; // base64 输入
pub mod tiff; // TIFF格式处理

// 重新导出常用类型
pub use decode::{disect, CanvasError, CanvasResult, Compression, Page};
pub use encode::{EncodeError, Encoder, EncoderPage, SupportedCompression};
pub use raster::{CanonicalRgba, PhotometricInterpretation, SampleBuffer};
pub use render::{
    present, render_tiff, DecodedImage, EmptyPages, MemorySurface, RenderBuilder, RenderOutcome,
    Surface, TiffCanvas, DEFAULT_PIXEL_LIMIT,
};
pub use source::{decode_base64, SourceFormat};

//! TIFF标签ID
//!
//! 只列出解码基线图像时会读取或写入的标签（TIFF 6.0 第一部分和少量扩展）。
//! 其他标签仍会被解析并保留在 IFD 中，只是没有对应的枚举值。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// TIFF标签ID
#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, TryFromPrimitive, Eq, Hash)]
#[repr(u16)]
pub enum TagId {
    /// 子文件类型（缩略图、多页等）
    NewSubfileType = 0x00FE,
    /// 图像宽度(像素)
    ImageWidth = 0x0100,
    /// 图像高度(像素)
    ImageLength = 0x0101,
    /// 每个样本的位数
    BitsPerSample = 0x0102,
    /// 压缩方式
    Compression = 0x0103,
    /// 光度解释
    PhotometricInterpretation = 0x0106,
    /// 字节内的位序
    FillOrder = 0x010A,
    /// 图像描述
    ImageDescription = 0x010E,
    /// 条带数据偏移量
    StripOffsets = 0x0111,
    /// 图像方向
    Orientation = 0x0112,
    /// 每个像素的样本数
    SamplesPerPixel = 0x0115,
    /// 每个条带的行数
    RowsPerStrip = 0x0116,
    /// 条带字节数
    StripByteCounts = 0x0117,
    /// X方向分辨率
    XResolution = 0x011A,
    /// Y方向分辨率
    YResolution = 0x011B,
    /// 样本存储方式（交错或分平面）
    PlanarConfiguration = 0x011C,
    /// 分辨率单位
    ResolutionUnit = 0x0128,
    /// 页码
    PageNumber = 0x0129,
    /// 生成软件
    Software = 0x0131,
    /// 创建时间
    DateTime = 0x0132,
    /// 预测器
    Predictor = 0x013D,
    /// 调色板
    ColorMap = 0x0140,
    /// 瓦片宽度
    TileWidth = 0x0142,
    /// 瓦片高度
    TileLength = 0x0143,
    /// 瓦片数据偏移量
    TileOffsets = 0x0144,
    /// 瓦片字节数
    TileByteCounts = 0x0145,
    /// CMYK 墨水集合
    InkSet = 0x014C,
    /// 额外样本（通常是 alpha）
    ExtraSamples = 0x0152,
    /// 样本格式
    SampleFormat = 0x0153,
    /// YCbCr 系数
    YCbCrCoefficients = 0x0211,
    /// YCbCr 色度子采样
    YCbCrSubSampling = 0x0212,
    /// 参考黑白点
    ReferenceBlackWhite = 0x0214,
}

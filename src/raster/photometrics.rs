//! 光度解释和样本布局相关的枚举定义
//!
//! - PhotometricInterpretation: 样本如何被解释为颜色
//! - SampleFormat: 样本的数值类型
//! - PlanarConfiguration: 多个分量的存储方式
//! - ExtraSamples: 额外样本(如alpha通道)的含义
//! - FillOrder: 字节内的位序

use num_enum::{FromPrimitive, IntoPrimitive};

/// 光度解释方式
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PhotometricInterpretation {
    /// 白色对应数值0
    WhiteIsZero = 0,
    /// 黑色对应数值0
    BlackIsZero = 1,
    /// RGB彩色
    RGB = 2,
    /// 调色板索引
    Palette = 3,
    /// 透明度遮罩
    TransparencyMask = 4,
    /// CMYK彩色
    CMYK = 5,
    /// YCbCr彩色空间
    YCbCr = 6,
    /// CIE L*a*b* 颜色空间
    CIELab = 8,
    /// ICC L*a*b* 颜色空间
    ICCLab = 9,
    /// ITU L*a*b* 颜色空间
    ITULab = 10,
    /// 彩色滤光片阵列(用于原始相机数据)
    ColorFilterArray = 32803,
    /// 线性原始数据
    LinearRaw = 34892,

    /// 未知的光度解释方式
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl PhotometricInterpretation {
    /// 颜色本身需要的样本数，不含额外样本
    ///
    /// 不支持的解释方式返回 `None`
    pub const fn color_samples(&self) -> Option<u16> {
        match self {
            Self::WhiteIsZero | Self::BlackIsZero | Self::Palette => Some(1),
            Self::RGB | Self::YCbCr => Some(3),
            Self::CMYK => Some(4),
            _ => None,
        }
    }
}

/// 样本格式
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum SampleFormat {
    /// 无符号整数
    Unsigned = 1,
    /// 有符号整数
    Signed = 2,
    /// IEEE浮点数
    Float = 3,
    /// 未定义格式
    Undefined = 4,
    /// 复数(整数)
    ComplexInt = 5,
    /// 复数(浮点数)
    ComplexFloat = 6,

    /// 未知格式
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// 平面配置
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum PlanarConfiguration {
    /// 分量交错存储(RGBRGBRGB...)
    Chunky = 1,
    /// 分量分平面存储(RRR...GGG...BBB...)
    Planar = 2,

    /// 未知配置
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// 额外样本类型
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum ExtraSamples {
    /// 未指定用途
    Unspecified = 0,
    /// 预乘alpha
    AssociatedAlpha = 1,
    /// 直接alpha
    UnassociatedAlpha = 2,

    /// 未知类型
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

/// 字节内的位序
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum FillOrder {
    /// 高位在前（默认）
    MsbFirst = 1,
    /// 低位在前，解码前需要逐字节反转位序
    LsbFirst = 2,

    /// 未知位序
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

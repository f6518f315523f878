//! 写入用的标签数据
//!
//! 读取方向只需要原始字节加 [`TagType`]，写入方向则需要带类型的值，
//! 由 [`TagData`] 负责转换为目标字节序的字节。

use super::TagType;
use crate::tiff::Endian;

/// 带类型的标签值
#[derive(Clone, Debug, PartialEq)]
pub enum TagData {
    /// 8位无符号整数数组
    Byte(Vec<u8>),
    /// ASCII字符串（调用方负责结尾的 NUL）
    Ascii(Vec<u8>),
    /// 16位无符号整数数组
    Short(Vec<u16>),
    /// 32位无符号整数数组
    Long(Vec<u32>),
    /// 无符号有理数数组（分子, 分母）
    Rational(Vec<(u32, u32)>),
    /// 未定义类型的字节数组
    Undefined(Vec<u8>),
    /// 64位无符号整数数组（BigTIFF）
    Long8(Vec<u64>),
}

impl TagData {
    /// 从字符串创建以 NUL 结尾的 ASCII 标签数据
    pub fn from_string(s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    pub fn from_short(v: u16) -> Self {
        Self::Short(vec![v])
    }

    pub fn from_long(v: u32) -> Self {
        Self::Long(vec![v])
    }

    /// 元素数量，即目录项中的 count 字段
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) | Self::Ascii(v) | Self::Undefined(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Rational(v) => v.len(),
            Self::Long8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 对应的 TIFF 字段类型
    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Byte(_) => TagType::Byte,
            Self::Ascii(_) => TagType::Ascii,
            Self::Short(_) => TagType::Short,
            Self::Long(_) => TagType::Long,
            Self::Rational(_) => TagType::Rational,
            Self::Undefined(_) => TagType::Undefined,
            Self::Long8(_) => TagType::Long8,
        }
    }

    /// 按指定字节序编码为字节序列
    pub fn bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Self::Byte(v) | Self::Ascii(v) | Self::Undefined(v) => v.clone(),
            Self::Short(v) => endian.encode_all(v),
            Self::Long(v) => endian.encode_all(v),
            Self::Rational(v) => v
                .iter()
                .flat_map(|(num, den)| endian.encode(*num).into_iter().chain(endian.encode(*den)))
                .collect(),
            Self::Long8(v) => endian.encode_all(v),
        }
    }
}

//! TIFF标签
//!
//! 解析得到的标签保留原始字节和字段类型，按需解码为数值。
//! 无法识别的标签同样保留，解码时忽略。

use super::Endian;
use eio::FromBytes;
use num_enum::{FromPrimitive, IntoPrimitive};
use num_traits::{cast::NumCast, ToPrimitive};
use std::fmt::Display;

mod data;
mod id;

pub use data::TagData;
pub use id::TagId;

/// IFD 中的一个目录项
#[derive(Clone, Debug)]
pub struct Tag {
    /// 标签代码
    pub code: u16,
    /// 字段类型
    pub datatype: TagType,
    /// 元素数量
    pub count: usize,
    /// 原始字节（已从偏移位置取回）
    pub data: Vec<u8>,
    /// 字节序
    pub endian: Endian,
}

impl Tag {
    /// 由带类型的值创建标签
    pub fn new(code: u16, endian: Endian, data: TagData) -> Self {
        Self {
            code,
            datatype: data.tag_type(),
            count: data.len(),
            data: data.bytes(endian),
            endian,
        }
    }

    /// 已知标签返回对应的 [`TagId`]
    pub fn id(&self) -> Option<TagId> {
        TagId::try_from(self.code).ok()
    }

    /// 只含一个元素时返回该值
    pub fn value<T: NumCast + Copy>(&self) -> Option<T> {
        match self.values() {
            Some(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// 按字段类型解码所有元素
    ///
    /// 任一元素无法转换为 `T`（例如负数转无符号）时返回 `None`
    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        match self.datatype {
            TagType::Byte | TagType::Ascii | TagType::Undefined | TagType::Unknown => {
                self.decode::<1, u8, T>()
            }
            TagType::SByte => self.decode::<1, i8, T>(),
            TagType::Short => self.decode::<2, u16, T>(),
            TagType::SShort => self.decode::<2, i16, T>(),
            TagType::Long | TagType::Ifd => self.decode::<4, u32, T>(),
            TagType::SLong => self.decode::<4, i32, T>(),
            TagType::Float => self.decode::<4, f32, T>(),
            TagType::Double => self.decode::<8, f64, T>(),
            TagType::Long8 | TagType::Ifd8 => self.decode::<8, u64, T>(),
            TagType::SLong8 => self.decode::<8, i64, T>(),
            TagType::Rational => self.decode_rational::<u32, T>(),
            TagType::SRational => self.decode_rational::<i32, T>(),
        }
    }

    /// 用于展示的字符串，过长的值会被截断
    pub fn as_string_lossy(&self) -> String {
        match self.datatype {
            TagType::Ascii => String::from_utf8_lossy(&self.data)
                .trim_end_matches('\0')
                .to_string(),
            TagType::Float | TagType::Double | TagType::Rational | TagType::SRational => {
                match self.values::<f64>() {
                    Some(v) if v.len() == 1 => format!("{}", v[0]),
                    Some(v) => format!("{:?}", v),
                    None => "Undefined".to_string(),
                }
            }
            _ => match self.values::<i64>() {
                Some(v) if v.len() == 1 => format!("{}", v[0]),
                Some(v) => format!("{:?}", v),
                None => "Undefined".to_string(),
            },
        }
    }

    fn decode<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(&self) -> Option<Vec<T>> {
        self.endian.decode_all_to_primative::<N, A, T>(&self.data)
    }

    fn decode_rational<A: FromBytes<4> + ToPrimitive, T: NumCast>(&self) -> Option<Vec<T>> {
        self.data
            .chunks_exact(8)
            .map(|chunk| {
                let numerator = self.endian.decode::<4, A>(chunk[..4].try_into().ok()?).ok()?;
                let denominator = self.endian.decode::<4, A>(chunk[4..].try_into().ok()?).ok()?;
                T::from(numerator.to_f64()? / denominator.to_f64()?)
            })
            .collect()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut value_string = self.as_string_lossy().replace('\n', "\\n");
        if value_string.chars().count() > 100 {
            value_string = format!("{}...", value_string.chars().take(98).collect::<String>());
        }
        let id_string = match self.id() {
            Some(id) => format!("{id:?}"),
            None => format!("Unknown({})", self.code),
        };
        write!(
            f,
            "{} {:?}[{}]: {}",
            id_string, self.datatype, self.count, value_string
        )
    }
}

/// TIFF 字段类型
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    /// 两个 u32 的比值
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    /// 两个 i32 的比值
    SRational = 10,
    Float = 11,
    Double = 12,
    /// 32位 IFD 偏移量
    Ifd = 13,
    Long8 = 16,
    SLong8 = 17,
    /// 64位 IFD 偏移量
    Ifd8 = 18,

    /// 无法识别的类型，按单字节处理
    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl TagType {
    /// 单个元素的字节数
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            TagType::Byte | TagType::Ascii | TagType::SByte | TagType::Undefined => 1,
            TagType::Short | TagType::SShort => 2,
            TagType::Long | TagType::SLong | TagType::Float | TagType::Ifd => 4,
            TagType::Rational | TagType::SRational | TagType::Double => 8,
            TagType::Long8 | TagType::SLong8 | TagType::Ifd8 => 8,
            TagType::Unknown => 1,
        }
    }
}

//! 字节序处理模块
//!
//! TIFF 文件头的前两个字节（`II` 或 `MM`）决定了整个文件的字节序，
//! 标签值、偏移量以及 16 位样本都按该字节序解释。

use eio::{FromBytes, ReadExt, ToBytes};
use num_traits::{cast::NumCast, ToPrimitive};
use std::io::{Read, Result, Write};
use std::mem;

/// 字节序
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Endian {
    /// 大端字节序（`MM`）
    Big,
    /// 小端字节序（`II`）
    Little,
}

impl Endian {
    /// 根据文件头的字节序标记识别字节序
    ///
    /// 无法识别时返回 `None`
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            b"II" => Some(Endian::Little),
            b"MM" => Some(Endian::Big),
            _ => None,
        }
    }

    /// 返回写入文件头用的字节序标记
    pub const fn marker(&self) -> &'static [u8; 2] {
        match self {
            Endian::Little => b"II",
            Endian::Big => b"MM",
        }
    }

    /// 从流中读取 `N` 个字节并按字节序解码
    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    /// 将字节数组按字节序解码为指定类型
    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> Result<T> {
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }

    /// 将字节切片解码为数值向量
    ///
    /// 切片长度不是类型大小整数倍时，末尾不足的字节被忽略
    pub fn decode_all<const N: usize, T: FromBytes<N>>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        bytes
            .chunks_exact(mem::size_of::<T>())
            .map(|chunk| {
                chunk
                    .try_into()
                    .ok()
                    .and_then(|arr| self.decode::<N, T>(arr).ok())
            })
            .collect()
    }

    /// 将字节切片按类型 `A` 解码后再转换为数值类型 `T`
    ///
    /// 任一元素无法无损转换时返回 `None`
    pub fn decode_all_to_primative<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(
        &self,
        bytes: &[u8],
    ) -> Option<Vec<T>> {
        self.decode_all::<N, A>(bytes)?
            .into_iter()
            .map(|v| T::from(v))
            .collect()
    }

    /// 读取一个 16 位样本
    ///
    /// 样本解包和水平预测器的热路径使用，不经过 `io::Result`
    #[inline]
    pub fn sample_u16(&self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        }
    }

    /// 写出一个 16 位样本
    #[inline]
    pub fn sample_bytes(&self, value: u16) -> [u8; 2] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    /// 将值按字节序编码为字节数组
    pub fn encode<const N: usize, T: ToBytes<N>>(&self, value: T) -> [u8; N] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    /// 将值切片按字节序编码为字节向量
    pub fn encode_all<const N: usize, T: ToBytes<N> + Copy>(&self, values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| self.encode(*v)).collect()
    }

    /// 将值按字节序写入输出流
    pub fn write<const N: usize, T: ToBytes<N>>(
        &self,
        stream: &mut impl Write,
        value: T,
    ) -> Result<()> {
        stream.write_all(&self.encode(value))
    }
}

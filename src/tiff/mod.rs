//! TIFF容器解析
//!
//! 读取文件头、按磁盘上的指针顺序遍历 IFD 链，并解析每个 IFD 的标签。
//! 本模块不解压像素数据，只负责元数据和数据块的位置。
//! 同时保留写入方向（[`Tiff::encode`]），供 [`crate::encode`] 生成文件。

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use tracing::*;

mod endian;
mod error;
mod ifd;
mod tag;

pub use endian::Endian;
pub use error::TiffError;
pub use ifd::Ifd;
pub use tag::{Tag, TagData, TagId, TagType};

/// TIFF变体：标准TIFF或BigTIFF
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TiffVariant {
    /// 标准TIFF，32位偏移量
    Normal,
    /// BigTIFF，64位偏移量
    Big,
}

impl TiffVariant {
    /// 读取一个偏移量
    fn read_offset<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            TiffVariant::Normal => endian.read::<4, u32>(stream).map(|v| v as u64),
            TiffVariant::Big => endian.read(stream),
        }
    }

    /// 写入一个偏移量
    fn write_offset<W: Write>(
        &self,
        endian: Endian,
        stream: &mut W,
        offset: u64,
    ) -> io::Result<()> {
        match self {
            TiffVariant::Normal => endian.write(stream, offset as u32),
            TiffVariant::Big => endian.write(stream, offset),
        }
    }

    /// 偏移量的字节数
    pub const fn offset_bytesize(&self) -> usize {
        match self {
            TiffVariant::Normal => 4,
            TiffVariant::Big => 8,
        }
    }

    /// 单个目录项的字节数
    const fn entry_bytesize(&self) -> u64 {
        match self {
            TiffVariant::Normal => 12,
            TiffVariant::Big => 20,
        }
    }

    /// 文件头中的版本号
    const fn version(&self) -> u16 {
        match self {
            TiffVariant::Normal => 0x002A,
            TiffVariant::Big => 0x002B,
        }
    }
}

/// 标签代码到其值在输出中位置的映射
pub type TiffOffsets = HashMap<u16, u64>;

/// 一个已解析的TIFF文件
#[derive(Clone, Debug)]
pub struct Tiff {
    /// 字节序
    pub endian: Endian,
    /// 标准TIFF或BigTIFF
    pub variant: TiffVariant,
    /// 按链上顺序排列的IFD，可能为空
    pub ifds: Vec<Ifd>,
}

impl Tiff {
    /// 创建只含一个空 IFD 的 TIFF，用于写入
    pub fn new(endian: Endian, variant: TiffVariant) -> Self {
        Self {
            endian,
            variant,
            ifds: vec![Ifd::new()],
        }
    }

    /// 解析内存中的完整 TIFF 文件
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        Self::open(&mut Cursor::new(bytes))
    }

    /// 从流中解析 TIFF 文件
    ///
    /// IFD 链中的每个指针都必须指向流内部；重复的指针报告为
    /// [`TiffError::IfdLoop`]。第一个 IFD 偏移量为 0 时返回空列表。
    pub fn open<R: Read + Seek>(stream: &mut R) -> Result<Self, TiffError> {
        let stream_len = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;

        // 连完整的魔数都没有时视为不是TIFF
        let mut buf = [0; 4];
        if stream_len < 4 {
            return Err(TiffError::UnsupportedContainer);
        }
        stream.read_exact(&mut buf)?;

        let endian = Endian::from_marker(&buf[..2]).ok_or(TiffError::UnsupportedContainer)?;
        let variant = match endian.decode::<2, u16>([buf[2], buf[3]])? {
            0x002A => TiffVariant::Normal,
            0x002B => TiffVariant::Big,
            _ => return Err(TiffError::UnsupportedContainer),
        };

        if variant == TiffVariant::Big {
            let offset_bytesize: u16 = endian.read(stream)?;
            let _reserved: u16 = endian.read(stream)?;
            if offset_bytesize != 8 {
                return Err(TiffError::UnsupportedContainer);
            }
        }

        let mut ifds = vec![];
        let mut visited = HashSet::new();
        let mut ifd_offset = variant.read_offset(endian, stream)?;
        while ifd_offset != 0 {
            if !visited.insert(ifd_offset) {
                return Err(TiffError::IfdLoop(ifd_offset));
            }
            let (ifd, next_offset) = Ifd::parse(stream, ifd_offset, endian, variant, stream_len)?;
            trace!("IFD {} @ {ifd_offset}: {} 个标签", ifds.len(), ifd.0.len());
            ifd_offset = next_offset;
            ifds.push(ifd);
        }
        debug!("解析TIFF: {endian:?} {variant:?}, {} 个IFD", ifds.len());

        Ok(Self {
            endian,
            variant,
            ifds,
        })
    }

    /// 第一页，对应渲染时固定选择的页
    pub fn ifd0(&self) -> Option<&Ifd> {
        self.ifds.first()
    }

    /// 追加一个空 IFD 并返回它
    pub fn add_ifd(&mut self) -> &mut Ifd {
        self.ifds.push(Ifd::new());
        let n = self.ifds.len();
        &mut self.ifds[n - 1]
    }

    /// 写出文件头和整个 IFD 链
    ///
    /// IFD0 紧跟在文件头之后，后续 IFD 依次排列。返回每个 IFD 的标签值位置。
    /// 流必须从位置 0 开始写。
    pub fn encode<W: Write + Seek>(&self, stream: &mut W) -> Result<Vec<TiffOffsets>, io::Error> {
        let endian = self.endian;

        stream.write_all(endian.marker())?;
        endian.write(stream, self.variant.version())?;

        // 没有IFD时第一个指针写0，表示空链
        let has_ifds = !self.ifds.is_empty();
        match self.variant {
            TiffVariant::Normal => endian.write(stream, if has_ifds { 8_u32 } else { 0 })?,
            TiffVariant::Big => {
                endian.write(stream, 0x0008_u16)?;
                endian.write(stream, 0x0000_u16)?;
                endian.write(stream, if has_ifds { 16_u64 } else { 0 })?;
            }
        }

        let mut offsets = vec![];
        for (i, ifd) in self.ifds.iter().enumerate() {
            let ifd_offsets = ifd.encode(stream, endian, self.variant, i == self.ifds.len() - 1)?;
            offsets.push(ifd_offsets);
        }

        Ok(offsets)
    }
}

impl Display for Tiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tiff: {{{:?} Endian, {:?} Variant}}",
            self.endian, self.variant
        )?;
        for (i, ifd) in self.ifds.iter().enumerate() {
            write!(f, "\n  IFD {i}:")?;
            for tag in ifd.0.iter() {
                write!(f, "\n    {}", tag)?;
            }
        }
        Ok(())
    }
}

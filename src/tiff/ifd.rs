//! TIFF图像文件目录(IFD)
//!
//! 每个 IFD 描述一页图像：一组目录项加上指向下一个 IFD 的指针。
//! 解析时所有越界引用都报告为 [`TiffError::TruncatedData`]，不会按标签声明的
//! 数量盲目分配内存。

use num_traits::NumCast;

use super::{Endian, Tag, TagData, TagId, TagType, TiffError, TiffOffsets, TiffVariant};
use std::{
    collections::HashMap,
    io::{self, Read, Seek, SeekFrom, Write},
};

/// 一个图像文件目录
#[derive(Clone, Debug, Default)]
pub struct Ifd(pub Vec<Tag>);

impl Ifd {
    /// 创建空 IFD
    pub fn new() -> Self {
        Self(vec![])
    }

    /// 从输入流解析位于 `offset` 的 IFD
    ///
    /// # 参数
    /// * `stream` - 输入流
    /// * `offset` - IFD在文件中的偏移量
    /// * `endian` - 字节序
    /// * `variant` - TIFF变体
    /// * `stream_len` - 输入的总字节数，用于在分配前检查越界
    ///
    /// # 返回
    /// 解析出的 IFD 和下一个 IFD 的偏移量（0 表示链结束）
    pub fn parse<R: Read + Seek>(
        stream: &mut R,
        offset: u64,
        endian: Endian,
        variant: TiffVariant,
        stream_len: u64,
    ) -> Result<(Ifd, u64), TiffError> {
        if offset >= stream_len {
            return Err(TiffError::TruncatedData);
        }
        stream.seek(SeekFrom::Start(offset))?;

        let tag_count = match variant {
            TiffVariant::Normal => endian.read::<2, u16>(stream)? as u64,
            TiffVariant::Big => endian.read(stream)?,
        };

        // 目录项本身必须完整位于缓冲区内
        let entries_start = stream.stream_position()?;
        let entries_end = tag_count
            .checked_mul(variant.entry_bytesize())
            .and_then(|n| n.checked_add(entries_start))
            .ok_or(TiffError::TruncatedData)?;
        if entries_end > stream_len {
            return Err(TiffError::TruncatedData);
        }

        let offset_size = variant.offset_bytesize();
        let mut tags = Vec::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let code = endian.read(stream)?;
            let datatype: TagType = endian.read::<2, u16>(stream)?.into();
            let count = variant.read_offset(endian, stream)?;

            let data_size = count
                .checked_mul(datatype.size_in_bytes() as u64)
                .ok_or(TiffError::TruncatedData)?;

            let data = if data_size > offset_size as u64 {
                // 值存放在偏移位置
                let data_offset = variant.read_offset(endian, stream)?;
                let data_end = data_offset
                    .checked_add(data_size)
                    .ok_or(TiffError::TruncatedData)?;
                if data_end > stream_len {
                    return Err(TiffError::TruncatedData);
                }
                let pos = stream.stream_position()?;
                let mut data = vec![0; data_size as usize];
                stream.seek(SeekFrom::Start(data_offset))?;
                stream.read_exact(&mut data)?;
                stream.seek(SeekFrom::Start(pos))?;
                data
            } else {
                // 值直接存放在目录项中
                let mut data = vec![0; offset_size];
                stream.read_exact(&mut data)?;
                data.truncate(data_size as usize);
                data
            };

            tags.push(Tag {
                code,
                datatype,
                endian,
                count: count as usize,
                data,
            });
        }

        let next_ifd_offset = variant.read_offset(endian, stream)?;
        Ok((Ifd(tags), next_ifd_offset))
    }

    /// 通过标签代码获取标签，用于私有标签
    pub fn get_tag_by_code(&self, code: u16) -> Option<&Tag> {
        self.0.iter().find(|tag| tag.code == code)
    }

    /// 获取标签，缺失时返回 `MissingTag`
    pub fn get_tag(&self, id: TagId) -> Result<&Tag, TiffError> {
        self.get_tag_by_code(id.into())
            .ok_or(TiffError::MissingTag(id))
    }

    /// 标签是否存在
    pub fn has_tag(&self, id: TagId) -> bool {
        self.get_tag_by_code(id.into()).is_some()
    }

    /// 获取标签的全部值
    pub fn get_tag_values<T: NumCast>(&self, id: TagId) -> Result<Vec<T>, TiffError> {
        self.get_tag(id)?.values().ok_or(TiffError::BadTag(id))
    }

    /// 获取标签的单个值
    pub fn get_tag_value<T: NumCast + Copy>(&self, id: TagId) -> Result<T, TiffError> {
        self.get_tag(id)?.value().ok_or(TiffError::BadTag(id))
    }

    /// 获取可选标签的单个值
    ///
    /// 缺失时返回 `Ok(None)`，存在但无效时仍然报错
    pub fn get_optional_value<T: NumCast + Copy>(&self, id: TagId) -> Result<Option<T>, TiffError> {
        match self.get_tag_by_code(id.into()) {
            Some(tag) => tag.value().map(Some).ok_or(TiffError::BadTag(id)),
            None => Ok(None),
        }
    }

    /// 设置标签，已存在的同代码标签会被替换
    pub fn set_tag<I: Into<u16>>(&mut self, id: I, data: TagData, endian: Endian) {
        let code: u16 = id.into();
        let tag = Tag::new(code, endian, data);
        let tags = &mut self.0;
        if let Some(index) = tags.iter().position(|tag| tag.code == code) {
            tags[index] = tag;
        } else {
            tags.push(tag);
        }
    }

    /// 按标签代码升序排列（TIFF 要求目录项有序）
    pub fn sort(&mut self) {
        self.0.sort_by_key(|tag| tag.code);
    }

    /// 将IFD写入输出流
    ///
    /// 超出目录项容量的值紧跟在下一个 IFD 指针之后写出。
    ///
    /// # 参数
    /// * `stream` - 输出流
    /// * `endian` - 字节序
    /// * `variant` - TIFF变体
    /// * `last_ifd` - 是否为链上最后一个IFD
    ///
    /// # 返回
    /// 每个标签值在输出中的位置，供之后回填偏移量使用
    pub fn encode<W: Write + Seek>(
        &self,
        stream: &mut W,
        endian: Endian,
        variant: TiffVariant,
        last_ifd: bool,
    ) -> Result<TiffOffsets, io::Error> {
        let tag_count = self.0.len();
        match variant {
            TiffVariant::Normal => endian.write(stream, tag_count as u16)?,
            TiffVariant::Big => endian.write(stream, tag_count as u64)?,
        };

        let mut offsets = HashMap::new();
        let mut extra_data = vec![];
        let offset_size = variant.offset_bytesize();
        let extra_data_offset = stream.stream_position()?
            + variant.entry_bytesize() * tag_count as u64
            + offset_size as u64;

        for tag in self.0.iter() {
            endian.write(stream, tag.code)?;
            let datatype: u16 = tag.datatype.into();
            endian.write(stream, datatype)?;
            variant.write_offset(endian, stream, tag.count as u64)?;

            let offset = if tag.data.len() > offset_size {
                let data_offset = extra_data_offset + extra_data.len() as u64;
                variant.write_offset(endian, stream, data_offset)?;
                extra_data.extend_from_slice(&tag.data);
                // 值保持字边界对齐
                if extra_data.len() % 2 == 1 {
                    extra_data.push(0);
                }
                data_offset
            } else {
                let mut bytes = tag.data.clone();
                bytes.resize(offset_size, 0);
                let data_offset = stream.stream_position()?;
                stream.write_all(&bytes)?;
                data_offset
            };

            offsets.insert(tag.code, offset);
        }

        if last_ifd {
            variant.write_offset(endian, stream, 0)?;
        } else {
            let current_pos = stream.stream_position()?;
            variant.write_offset(
                endian,
                stream,
                current_pos + extra_data.len() as u64 + offset_size as u64,
            )?;
        }

        stream.write_all(&extra_data)?;

        Ok(offsets)
    }
}

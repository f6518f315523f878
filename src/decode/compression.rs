//! 压缩方式与预测器
//!
//! 支持基线解码器常见的子集：
//!
//! - 无压缩 (1)
//! - LZW (5)，使用 `salzweg` 的 TIFF 风格编解码器
//! - Deflate (8 和 32946)，zlib 封装，使用 `flate2`
//! - PackBits (32773)
//!
//! 其余方式（CCITT、JPEG 等）只用于识别和报错。
//!
//! 预测器按行处理，只依赖传入的行缓冲区，不保留任何状态。
//!
//! # 参考
//!
//! - [TIFF 6.0 规范](https://en.wikipedia.org/wiki/TIFF#TIFF_Compression_Tag)
//! - [EXIF 压缩标签](https://exiftool.org/TagNames/EXIF.html#Compression)

use crate::tiff::Endian;
use num_enum::{FromPrimitive, IntoPrimitive};
use salzweg::decoder::{DecodingError, TiffStyleDecoder};
use salzweg::encoder::{EncodingError, TiffStyleEncoder};
use std::fmt;
use std::io::{self, Read, Write};

/// 压缩和解压过程中的错误
#[derive(Debug)]
pub enum DecompressError {
    /// LZW 解码错误
    LzwDecodeError(DecodingError),
    /// LZW 编码错误
    LzwEncodeError(EncodingError),
    /// zlib 流错误
    InflateError(io::Error),
    /// PackBits 数据包声明的长度超出输入
    PackBitsOverrun,
    /// 不支持的压缩方式
    CompressionNotSupported(Compression),
    /// 预测器与位深的组合不受支持，包含 (预测器, 位深)
    PredictorNotSupported(Predictor, u16),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompressError::LzwDecodeError(e) => write!(f, "LZW解码错误: {e:?}"),
            DecompressError::LzwEncodeError(e) => write!(f, "LZW编码错误: {e:?}"),
            DecompressError::InflateError(e) => write!(f, "Deflate解码错误: {e}"),
            DecompressError::PackBitsOverrun => write!(f, "PackBits数据包越界"),
            DecompressError::CompressionNotSupported(c) => write!(f, "不支持的压缩方式: {c:?}"),
            DecompressError::PredictorNotSupported(p, bits) => {
                write!(f, "预测器 {p:?} 不支持 {bits} 位样本")
            }
        }
    }
}

impl std::error::Error for DecompressError {}

/// TIFF 压缩方式
///
/// 未列出的代码解析为 `Unknown`
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Compression {
    /// 无压缩
    Uncompressed = 1,
    /// CCITT 1D 压缩
    CCITT1D = 2,
    /// T4 Group 3 传真压缩
    T4Group3Fax = 3,
    /// T6 Group 4 传真压缩
    T6Group4Fax = 4,
    /// LZW 压缩
    Lzw = 5,
    /// 旧版 JPEG 压缩
    JpegOld = 6,
    /// JPEG 压缩
    Jpeg = 7,
    /// Adobe Deflate 压缩
    DeflateAdobe = 8,
    /// JBIG 黑白图像压缩
    JbigBW = 9,
    /// JBIG 彩色图像压缩
    JbigColor = 10,
    /// NeXT 压缩
    Next = 32766,
    /// PackBits 压缩
    PackBits = 32773,
    /// Thunderscan 压缩
    Thunderscan = 32809,
    /// Deflate 压缩（旧代码）
    Deflate = 32946,
    /// JBIG 压缩
    JBIG = 34661,
    /// JPEG 2000 压缩
    JPEG2000 = 34712,
    /// LZMA2 压缩
    LZMA2 = 34925,
    /// Zstd 压缩
    Zstd = 34926,
    /// WebP 压缩
    WebP = 34927,
    /// JPEG XL 压缩
    JPEGXL = 52546,

    /// 未知压缩方式
    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Compression {
    /// 是否已实现解码
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            Self::Uncompressed | Self::Lzw | Self::DeflateAdobe | Self::Deflate | Self::PackBits
        )
    }

    /// 解压一个数据块，输出最多 `limit` 字节
    ///
    /// 到达上限后停止解码，压缩炸弹不会占用超出上限的内存。
    /// 调用方通常传入数据块尺寸加一，以便识别多余的输出。
    ///
    /// # 错误
    ///
    /// * 压缩方式未实现时返回 `CompressionNotSupported`
    /// * 压缩流损坏时返回对应的解码错误
    pub fn decode(&self, bytes: &[u8], limit: usize) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes[..bytes.len().min(limit)].to_vec()),
            Self::Lzw => {
                let mut out = BoundedWriter::new(limit);
                match TiffStyleDecoder::decode(bytes, &mut out) {
                    Ok(()) => {}
                    Err(_) if out.is_full() => {}
                    Err(e) => return Err(DecompressError::LzwDecodeError(e)),
                }
                Ok(out.buf)
            }
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                flate2::read::ZlibDecoder::new(bytes)
                    .take(limit as u64)
                    .read_to_end(&mut buf)
                    .map_err(DecompressError::InflateError)?;
                Ok(buf)
            }
            Self::PackBits => unpack_bits(bytes, limit),
            other => Err(DecompressError::CompressionNotSupported(*other)),
        }
    }

    /// 压缩一个数据块，供编码器使用
    pub fn encode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleEncoder::encode_to_vec(bytes).map_err(DecompressError::LzwEncodeError),
            Self::DeflateAdobe | Self::Deflate => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(bytes)
                    .map_err(DecompressError::InflateError)?;
                encoder.finish().map_err(DecompressError::InflateError)
            }
            Self::PackBits => Ok(pack_bits(bytes)),
            other => Err(DecompressError::CompressionNotSupported(*other)),
        }
    }
}

/// 写满上限后拒绝继续写入的输出缓冲区
struct BoundedWriter {
    buf: Vec<u8>,
    limit: usize,
}

impl BoundedWriter {
    fn new(limit: usize) -> Self {
        Self { buf: vec![], limit }
    }

    fn is_full(&self) -> bool {
        self.buf.len() >= self.limit
    }
}

impl Write for BoundedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.buf.len());
        if room == 0 && !data.is_empty() {
            return Err(io::ErrorKind::WriteZero.into());
        }
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// PackBits 解码，输出达到 `limit` 字节后停止
///
/// 头字节 n：0..=127 复制随后 n+1 个字节；-127..=-1 将下一个字节重复 1-n 次；
/// -128 为空操作。
fn unpack_bits(bytes: &[u8], limit: usize) -> Result<Vec<u8>, DecompressError> {
    let mut out = Vec::with_capacity((bytes.len() * 2).min(limit));
    let mut i = 0;
    while i < bytes.len() && out.len() < limit {
        let header = bytes[i] as i8;
        i += 1;
        match header {
            0..=127 => {
                let count = header as usize + 1;
                let literal = bytes
                    .get(i..i + count)
                    .ok_or(DecompressError::PackBitsOverrun)?;
                out.extend_from_slice(literal);
                i += count;
            }
            -127..=-1 => {
                let count = (1 - header as isize) as usize;
                let value = *bytes.get(i).ok_or(DecompressError::PackBitsOverrun)?;
                out.extend(std::iter::repeat(value).take(count));
                i += 1;
            }
            -128 => {}
        }
    }
    out.truncate(limit);
    Ok(out)
}

/// PackBits 编码：两个以上相同字节编为重复包，其余编为字面包
fn pack_bits(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 128 + 1);
    let mut i = 0;
    while i < bytes.len() {
        let mut run = 1;
        while i + run < bytes.len() && run < 128 && bytes[i + run] == bytes[i] {
            run += 1;
        }
        if run >= 2 {
            out.push((1 - run as i16) as i8 as u8);
            out.push(bytes[i]);
            i += run;
        } else {
            let start = i;
            i += 1;
            while i < bytes.len()
                && i - start < 128
                && !(i + 1 < bytes.len() && bytes[i] == bytes[i + 1])
            {
                i += 1;
            }
            out.push((i - start - 1) as u8);
            out.extend_from_slice(&bytes[start..i]);
        }
    }
    out
}

/// TIFF 预测器
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Predictor {
    /// 不使用预测器
    No = 1,
    /// 水平差分：每个样本存储与同通道前一个像素的差值
    Horizontal = 2,
    /// 浮点预测器（未实现）
    FloatingPoint = 3,

    /// 未知的预测器类型
    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Predictor {
    /// 检查该预测器能否用于给定位深
    pub fn check(&self, bits: u16) -> Result<(), DecompressError> {
        match (self, bits) {
            (Self::No, _) | (Self::Horizontal, 8 | 16) => Ok(()),
            (other, bits) => Err(DecompressError::PredictorNotSupported(*other, bits)),
        }
    }

    /// 对一行解压后的数据撤销预测
    ///
    /// # 参数
    ///
    /// * `row` - 一行的字节，长度为该行的完整字节数
    /// * `samples_per_pixel` - 行内每个像素的样本数
    /// * `bits` - 样本位深（8 或 16）
    /// * `endian` - 16 位样本的字节序
    pub fn unpredict_row(
        &self,
        row: &mut [u8],
        samples_per_pixel: usize,
        bits: u16,
        endian: Endian,
    ) -> Result<(), DecompressError> {
        self.check(bits)?;
        match (self, bits) {
            (Self::Horizontal, 8) => {
                for i in samples_per_pixel..row.len() {
                    row[i] = row[i].wrapping_add(row[i - samples_per_pixel]);
                }
            }
            (Self::Horizontal, 16) => {
                let stride = samples_per_pixel * 2;
                for i in (stride..row.len() - row.len() % 2).step_by(2) {
                    let prev = endian.sample_u16([row[i - stride], row[i - stride + 1]]);
                    let delta = endian.sample_u16([row[i], row[i + 1]]);
                    row[i..i + 2].copy_from_slice(&endian.sample_bytes(delta.wrapping_add(prev)));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// 对一行原始数据应用预测，`unpredict_row` 的逆运算
    pub fn predict_row(
        &self,
        row: &mut [u8],
        samples_per_pixel: usize,
        bits: u16,
        endian: Endian,
    ) -> Result<(), DecompressError> {
        self.check(bits)?;
        match (self, bits) {
            (Self::Horizontal, 8) => {
                for i in (samples_per_pixel..row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - samples_per_pixel]);
                }
            }
            (Self::Horizontal, 16) => {
                let stride = samples_per_pixel * 2;
                for i in (stride..row.len() - row.len() % 2).step_by(2).rev() {
                    let prev = endian.sample_u16([row[i - stride], row[i - stride + 1]]);
                    let value = endian.sample_u16([row[i], row[i + 1]]);
                    row[i..i + 2].copy_from_slice(&endian.sample_bytes(value.wrapping_sub(prev)));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packbits_decodes_literal_and_run_packets() {
        // 来自 TIFF 6.0 规范第 9 节的示例
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7,
            0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        assert_eq!(unpack_bits(&packed, usize::MAX).unwrap(), expected);
    }

    #[test]
    fn packbits_noop_header_is_skipped() {
        assert_eq!(unpack_bits(&[0x80, 0x00, 0x07], usize::MAX).unwrap(), vec![0x07]);
    }

    #[test]
    fn packbits_overrun_is_an_error() {
        assert!(matches!(
            unpack_bits(&[0x05, 0x01], usize::MAX),
            Err(DecompressError::PackBitsOverrun)
        ));
        assert!(matches!(
            unpack_bits(&[0xFF], usize::MAX),
            Err(DecompressError::PackBitsOverrun)
        ));
    }

    #[test]
    fn packbits_encoder_output_decodes_back() {
        let mut data = vec![7u8; 300];
        data.extend(0..200u8);
        data.extend([1, 1, 2, 3, 3, 3]);
        assert_eq!(unpack_bits(&pack_bits(&data), usize::MAX).unwrap(), data);
    }

    #[test]
    fn packbits_stops_at_limit() {
        // 每个包展开为 128 字节，共 128 KiB
        let packed: Vec<u8> = [0x81, 0x00].repeat(1024);
        let out = unpack_bits(&packed, 5).unwrap();
        assert_eq!(out, vec![0; 5]);
        assert_eq!(unpack_bits(&[0x02, 1, 2, 3], 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn deflate_output_is_capped() {
        let zeros = vec![0u8; 16 << 20];
        let packed = Compression::Deflate.encode(&zeros).unwrap();
        assert!(packed.len() < 64 << 10);

        let out = Compression::Deflate.decode(&packed, 9).unwrap();
        assert_eq!(out, vec![0; 9]);
        let out = Compression::DeflateAdobe.decode(&packed, usize::MAX).unwrap();
        assert_eq!(out.len(), zeros.len());
    }

    #[test]
    fn lzw_output_is_capped() {
        let zeros = vec![0u8; 4 << 20];
        let packed = Compression::Lzw.encode(&zeros).unwrap();

        let out = Compression::Lzw.decode(&packed, 3).unwrap();
        assert_eq!(out, vec![0; 3]);
        let out = Compression::Lzw.decode(&packed, usize::MAX).unwrap();
        assert_eq!(out.len(), zeros.len());
    }

    #[test]
    fn corrupt_lzw_is_still_an_error_below_the_limit() {
        assert!(matches!(
            Compression::Lzw.decode(&[0xFF, 0xFF, 0xFF, 0xFF], 1 << 20),
            Err(DecompressError::LzwDecodeError(_))
        ));
    }

    #[test]
    fn uncompressed_copy_is_capped() {
        assert_eq!(Compression::Uncompressed.decode(&[1, 2, 3], 2).unwrap(), vec![1, 2]);
        assert_eq!(Compression::Uncompressed.decode(&[1, 2, 3], 8).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn horizontal_predictor_8bit_accumulates_per_channel() {
        let mut row = [10, 20, 1, 2, 1, 2];
        Predictor::Horizontal
            .unpredict_row(&mut row, 2, 8, Endian::Little)
            .unwrap();
        assert_eq!(row, [10, 20, 11, 22, 12, 24]);
    }

    #[test]
    fn horizontal_predictor_8bit_wraps() {
        let mut row = [250, 10];
        Predictor::Horizontal
            .unpredict_row(&mut row, 1, 8, Endian::Big)
            .unwrap();
        assert_eq!(row, [250, 4]);
    }

    #[test]
    fn horizontal_predictor_16bit_respects_byte_order() {
        // 1000, +24, +1  大端
        let mut row = [0x03, 0xE8, 0x00, 0x18, 0x00, 0x01];
        Predictor::Horizontal
            .unpredict_row(&mut row, 1, 16, Endian::Big)
            .unwrap();
        assert_eq!(row, [0x03, 0xE8, 0x04, 0x00, 0x04, 0x01]);
    }

    #[test]
    fn predict_then_unpredict_restores_row() {
        let original = [9u8, 200, 3, 3, 250, 1, 0, 77];
        let mut row = original;
        Predictor::Horizontal
            .predict_row(&mut row, 2, 16, Endian::Little)
            .unwrap();
        Predictor::Horizontal
            .unpredict_row(&mut row, 2, 16, Endian::Little)
            .unwrap();
        assert_eq!(row, original);
    }

    #[test]
    fn predictor_rejects_sub_byte_samples() {
        let mut row = [0u8; 2];
        assert!(matches!(
            Predictor::Horizontal.unpredict_row(&mut row, 1, 4, Endian::Little),
            Err(DecompressError::PredictorNotSupported(Predictor::Horizontal, 4))
        ));
        assert!(Predictor::No.unpredict_row(&mut row, 1, 4, Endian::Little).is_ok());
    }

    #[test]
    fn unsupported_schemes_report_themselves() {
        assert!(matches!(
            Compression::T6Group4Fax.decode(&[0], 16),
            Err(DecompressError::CompressionNotSupported(Compression::T6Group4Fax))
        ));
        assert_eq!(Compression::from(32773), Compression::PackBits);
        assert_eq!(Compression::from(12345), Compression::Unknown);
    }
}

// 导入必要的库和模块
use std::env;
use std::fs;
use std::io::Cursor;
use std::time::Instant;
use tiffcanvas::{EncoderPage, MemorySurface, RenderBuilder, RenderOutcome};

// 定义常量
const SAMPLE_TIFF: &str = "data/sample.tif"; // 默认输入文件，.tif 或 base64 文本
#[cfg(feature = "image")]
const OUTPUT_FILE: &str = "data/render.png"; // 输出PNG文件路径
const MAX_MEGAPIXELS: f64 = 64.0; // 允许解码的最大尺寸

fn main() {
    println!("Example: tiffcanvas render");

    // 初始化日志记录器
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = env::args().chain(vec![SAMPLE_TIFF.to_string()]).collect();
    let path = &args[1];

    // 读取输入：二进制 TIFF 先转换为 base64，模拟转换服务的响应
    println!("Opening `{path}`");
    let raw = fs::read(path).unwrap();
    let base64 = if raw.starts_with(b"II") || raw.starts_with(b"MM") {
        tiffcanvas::disect(&mut Cursor::new(&raw)).unwrap();
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&raw)
    } else {
        String::from_utf8(raw).unwrap()
    };
    println!("Payload: {} base64 characters", base64.len());

    // 解码并绘制到内存表面
    let t_render = Instant::now();
    let mut surface = MemorySurface::new();
    let outcome = RenderBuilder::new()
        .with_mp_limit(MAX_MEGAPIXELS)
        .render(&base64, &mut surface)
        .unwrap();
    println!(
        "Rendered in {:.3}ms: {outcome:?}",
        t_render.elapsed().as_secs_f32() * 1e3
    );

    let RenderOutcome::Presented { width, height } = outcome else {
        println!("Nothing to show");
        return;
    };

    // 表面内容重新编码为 TIFF，验证往返后大小
    let rgba = tiffcanvas::CanonicalRgba::new((width, height), surface.pixels().to_vec()).unwrap();
    let tiff = tiffcanvas::Encoder::new()
        .with_page(EncoderPage::from_rgba(&rgba))
        .encode_to_vec()
        .unwrap();
    println!("Surface as uncompressed TIFF: {} bytes", tiff.len());

    // 图像输出
    #[cfg(feature = "image")]
    {
        let img = rgba.into_image().unwrap();
        img.save(OUTPUT_FILE).unwrap();
        println!("Image saved to {OUTPUT_FILE}");
    }
}

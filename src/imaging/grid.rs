//! 网格拆分：把一张 2x2 合成图裁成四张独立视图
//!
//! 象限尺寸为 (w/2, h/2) 向下取整，奇数像素的最后一行/列被丢弃；
//! 输出统一重新编码为 PNG。纯函数，无网络。

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::core::{CompleteViews, Quadrant, ViewKey};
use crate::imaging::{ImagingError, ViewImage};

/// 拆分结果：每个视图一张图
pub type GridViews = CompleteViews;

/// 象限在合成图中的裁剪矩形 (x, y, width, height)
pub fn quadrant_rect(width: u32, height: u32, quadrant: Quadrant) -> (u32, u32, u32, u32) {
    let qw = width / 2;
    let qh = height / 2;
    let index = quadrant.index();
    ((index % 2) * qw, (index / 2) * qh, qw, qh)
}

/// 解码合成图并拆成四个视图
pub fn split_grid(composite: &ViewImage) -> Result<GridViews, ImagingError> {
    let img = image::load_from_memory(composite.bytes())
        .map_err(|e| ImagingError::Decode(e.to_string()))?;
    split_decoded(&img)
}

/// 已解码图片的拆分（便于测试直接构造像素）
pub fn split_decoded(img: &DynamicImage) -> Result<GridViews, ImagingError> {
    let (width, height) = img.dimensions();
    if width < 2 || height < 2 {
        return Err(ImagingError::TooSmall { width, height });
    }

    let crop = |key: ViewKey| -> Result<ViewImage, ImagingError> {
        let (x, y, w, h) = quadrant_rect(width, height, key.quadrant());
        encode_png(&img.crop_imm(x, y, w, h))
    };

    Ok(GridViews {
        front: crop(ViewKey::Front)?,
        back: crop(ViewKey::Back)?,
        left: crop(ViewKey::Left)?,
        right: crop(ViewKey::Right)?,
    })
}

/// 编码为 PNG
pub fn encode_png(img: &DynamicImage) -> Result<ViewImage, ImagingError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(ViewImage::png(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// 每个象限填充不同颜色的合成图
    fn colored_grid(width: u32, height: u32) -> DynamicImage {
        let colors = [
            Rgba([255, 0, 0, 255]),
            Rgba([0, 255, 0, 255]),
            Rgba([0, 0, 255, 255]),
            Rgba([255, 255, 0, 255]),
        ];
        let (qw, qh) = (width / 2, height / 2);
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let col = if qw > 0 && x >= qw { 1 } else { 0 };
            let row = if qh > 0 && y >= qh { 1 } else { 0 };
            colors[(row * 2 + col) as usize]
        });
        DynamicImage::ImageRgba8(img)
    }

    fn decode(view: &ViewImage) -> DynamicImage {
        image::load_from_memory(view.bytes()).unwrap()
    }

    #[test]
    fn test_split_maps_quadrants_to_views() {
        let grid = colored_grid(8, 6);
        let views = split_decoded(&grid).unwrap();

        let front = decode(&views.front);
        assert_eq!(front.dimensions(), (4, 3));
        assert_eq!(front.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(decode(&views.back).get_pixel(3, 2), Rgba([0, 255, 0, 255]));
        assert_eq!(decode(&views.left).get_pixel(1, 1), Rgba([0, 0, 255, 255]));
        assert_eq!(decode(&views.right).get_pixel(0, 0), Rgba([255, 255, 0, 255]));
    }

    #[test]
    fn test_quadrants_are_disjoint_and_cover_even_grid() {
        let (w, h) = (10, 6);
        let mut covered = vec![0u8; (w * h) as usize];
        for q in Quadrant::ALL {
            let (x0, y0, qw, qh) = quadrant_rect(w, h, q);
            for y in y0..y0 + qh {
                for x in x0..x0 + qw {
                    covered[(y * w + x) as usize] += 1;
                }
            }
        }
        assert!(covered.iter().all(|c| *c == 1));
    }

    #[test]
    fn test_odd_dimensions_floor() {
        let grid = colored_grid(5, 3);
        let views = split_decoded(&grid).unwrap();
        for key in ViewKey::ALL {
            assert_eq!(decode(views.get(key)).dimensions(), (2, 1));
        }
        assert_eq!(quadrant_rect(5, 3, Quadrant::BottomRight), (2, 1, 2, 1));
    }

    #[test]
    fn test_split_is_deterministic() {
        let encoded = encode_png(&colored_grid(6, 6)).unwrap();
        let a = split_grid(&encoded).unwrap();
        let b = split_grid(&encoded).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_tiny_and_garbage_input() {
        let tiny = DynamicImage::ImageRgba8(RgbaImage::new(1, 4));
        assert!(matches!(
            split_decoded(&tiny),
            Err(ImagingError::TooSmall { width: 1, height: 4 })
        ));
        let garbage = ViewImage::png(b"not an image".to_vec());
        assert!(matches!(split_grid(&garbage), Err(ImagingError::Decode(_))));
    }
}

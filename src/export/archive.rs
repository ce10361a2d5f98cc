//! zip 打包：四视图放在 product_views/ 下，模型文件放在根目录

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::ViewSet;
use crate::export::{ExportError, ModelFile};

pub const VIEWS_DIR: &str = "product_views";

/// 只包含视图的压缩包；空槽位跳过
pub fn views_archive(views: &ViewSet) -> Result<Vec<u8>, ExportError> {
    pack_archive(views, None)
}

/// 视图 + 可选模型文件
pub fn pack_archive(views: &ViewSet, model: Option<&ModelFile>) -> Result<Vec<u8>, ExportError> {
    if views.populated() == 0 && model.is_none() {
        return Err(ExportError::Empty);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (key, image) in views.iter() {
        let name = format!("{}/{}.{}", VIEWS_DIR, key.as_str(), image.extension());
        zip.start_file(name, options)?;
        zip.write_all(image.bytes())?;
    }

    if let Some(model) = model {
        zip.start_file(model.name.as_str(), options)?;
        zip.write_all(&model.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// 按模型地址的真实扩展名命名；未知扩展名一律视为 glb
pub fn model_file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let ext = file
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "fbx" | "obj" | "usdz" => format!("product_model.{ext}"),
        _ => "product_model.glb".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ViewKey;
    use crate::imaging::ViewImage;
    use std::io::Read;
    use zip::ZipArchive;

    fn entries(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_views_archive_skips_empty_slots() {
        let mut views = ViewSet::default();
        views.set(ViewKey::Front, ViewImage::png(vec![1, 2, 3]));
        views.set(ViewKey::Left, ViewImage::new("image/jpeg", vec![4]));
        let names = entries(views_archive(&views).unwrap());
        assert_eq!(names, vec!["product_views/front.png", "product_views/left.jpg"]);
    }

    #[test]
    fn test_pack_archive_contains_model() {
        let mut views = ViewSet::default();
        views.set(ViewKey::Back, ViewImage::png(vec![7]));
        let model = ModelFile {
            name: "product_model.glb".into(),
            bytes: b"glTF".to_vec(),
        };
        let bytes = pack_archive(&views, Some(&model)).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = Vec::new();
        archive
            .by_name("product_model.glb")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"glTF");
        assert!(archive.by_name("product_views/back.png").is_ok());
    }

    #[test]
    fn test_empty_archive_is_rejected() {
        assert!(matches!(views_archive(&ViewSet::default()), Err(ExportError::Empty)));
    }

    #[test]
    fn test_model_file_name_follows_extension() {
        assert_eq!(model_file_name("https://cdn/x/model.fbx"), "product_model.fbx");
        assert_eq!(model_file_name("https://cdn/x/model.OBJ?sig=1"), "product_model.obj");
        assert_eq!(model_file_name("https://cdn/x/model.usdz#v"), "product_model.usdz");
        assert_eq!(model_file_name("https://cdn/x/model.glb"), "product_model.glb");
        assert_eq!(model_file_name("https://cdn/x/download?file=a.fbx"), "product_model.glb");
        assert_eq!(model_file_name("https://cdn/x/blob"), "product_model.glb");
    }
}

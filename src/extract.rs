//! Per-document content extraction: full text plus embedded raster images.
//!
//! Text comes from pdf-extract, concatenated in page order with no injected
//! separators. Images come from walking each page's XObject resources with
//! lopdf, in page order then resource order, and persisting every decodable
//! raster under a per-record directory.
//!
//! A corrupt or unreadable document yields empty content and a diagnostic,
//! never an error: one bad file must not abort a long batch.

use anyhow::{anyhow, Result};
use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};

use crate::models::{DocumentRef, ExtractedContent, SavedImage};

/// Extract text and images for one document.
///
/// Images are written under `<images_root>/<record_id>/`. Every failure below
/// the whole-document level (one undecodable image, one text-less page) is
/// degraded locally and reported on stderr.
pub fn extract_document(
    document: &DocumentRef,
    images_root: &Path,
    record_id: &str,
) -> ExtractedContent {
    let bytes = match std::fs::read(&document.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("warning: cannot read {}: {}", document.source_id(), e);
            return ExtractedContent {
                parse_failed: true,
                ..ExtractedContent::default()
            };
        }
    };

    let (text, parse_failed) = match extract_text(&bytes) {
        Ok(text) => (text, false),
        Err(e) => {
            eprintln!("warning: text extraction failed for {}: {}", document.source_id(), e);
            (String::new(), true)
        }
    };

    let images = match extract_images(&bytes, images_root, record_id) {
        Ok(images) => images,
        Err(e) => {
            eprintln!("warning: image extraction failed for {}: {}", document.source_id(), e);
            Vec::new()
        }
    };

    ExtractedContent {
        text,
        images,
        parse_failed,
    }
}

/// All pages' text concatenated in page order. A page without a text layer
/// contributes an empty string.
fn extract_text(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| anyhow!("PDF text extraction failed: {}", e))?;
    Ok(pages.concat())
}

/// Walk every page's image XObjects in order and persist each one under
/// `<images_root>/<record_id>/page_<p>_img_<i>_<rand>.<ext>`.
///
/// The `(page, index)` pair keeps multiple images on one page distinct; the
/// random suffix keeps filenames from colliding across repeated runs over
/// the same corpus.
fn extract_images(bytes: &[u8], images_root: &Path, record_id: &str) -> Result<Vec<SavedImage>> {
    let doc = Document::load_mem(bytes)?;
    let image_dir = images_root.join(record_id);

    let mut saved = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let xobjects = match page_xobjects(&doc, page_id) {
            Some(xobjects) => xobjects,
            None => continue,
        };

        let mut image_index: u32 = 0;
        for (_name, object) in xobjects.iter() {
            let stream = match resolve(&doc, object).as_stream() {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            if !is_image_stream(&stream.dict) {
                continue;
            }
            image_index += 1;

            std::fs::create_dir_all(&image_dir)?;
            match save_image(stream, &image_dir, page_number, image_index) {
                Ok(path) => saved.push(SavedImage {
                    page: page_number,
                    index: image_index,
                    path,
                }),
                Err(e) => {
                    eprintln!(
                        "warning: skipping image {} on page {} of {}: {}",
                        image_index, page_number, record_id, e
                    );
                }
            }
        }
    }

    Ok(saved)
}

/// The page's XObject resource dictionary, if any.
fn page_xobjects<'a>(doc: &'a Document, page_id: (u32, u16)) -> Option<&'a Dictionary> {
    let page = doc.get_dictionary(page_id).ok()?;
    let resources = resolve(doc, page.get(b"Resources").ok()?).as_dict().ok()?;
    resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()
}

/// Follow a reference to its target object; plain objects pass through.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn is_image_stream(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

/// Names of the stream's filters, in application order.
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| f.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode one image stream and write it to disk, returning the saved path.
///
/// JPEG-compressed streams (`DCTDecode`) are written out as-is. Flate or
/// unfiltered raw bitmaps are re-encoded as PNG, which requires a color
/// space the encoder understands; anything else is skipped.
fn save_image(
    stream: &lopdf::Stream,
    image_dir: &Path,
    page: u32,
    index: u32,
) -> Result<PathBuf> {
    let filters = filter_names(&stream.dict);

    if filters.iter().any(|f| f == b"DCTDecode") {
        let path = image_path(image_dir, page, index, "jpg");
        std::fs::write(&path, &stream.content)?;
        return Ok(path);
    }

    let data = if filters.iter().any(|f| f == b"FlateDecode") {
        stream
            .decompressed_content()
            .map_err(|e| anyhow!("flate decode failed: {}", e))?
    } else if filters.is_empty() {
        stream.content.clone()
    } else {
        let names: Vec<String> = filters
            .iter()
            .map(|f| String::from_utf8_lossy(f).to_string())
            .collect();
        return Err(anyhow!("unsupported image filter(s): {}", names.join("+")));
    };

    let width = dict_u32(&stream.dict, b"Width")?;
    let height = dict_u32(&stream.dict, b"Height")?;
    let bits = dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(anyhow!("unsupported bit depth: {}", bits));
    }

    let color_space = match stream.dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => name.clone(),
        _ => return Err(anyhow!("unsupported color space")),
    };

    let path = image_path(image_dir, page, index, "png");
    match color_space.as_slice() {
        b"DeviceRGB" => {
            let expected = (width * height * 3) as usize;
            if data.len() < expected {
                return Err(anyhow!("truncated RGB image data"));
            }
            let img = image::RgbImage::from_raw(width, height, data[..expected].to_vec())
                .ok_or_else(|| anyhow!("invalid RGB buffer"))?;
            img.save(&path)?;
        }
        b"DeviceGray" => {
            let expected = (width * height) as usize;
            if data.len() < expected {
                return Err(anyhow!("truncated grayscale image data"));
            }
            let img = image::GrayImage::from_raw(width, height, data[..expected].to_vec())
                .ok_or_else(|| anyhow!("invalid grayscale buffer"))?;
            img.save(&path)?;
        }
        other => {
            return Err(anyhow!(
                "unsupported color space: {}",
                String::from_utf8_lossy(other)
            ));
        }
    }

    Ok(path)
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let value = dict
        .get(key)
        .map_err(|_| anyhow!("missing {}", String::from_utf8_lossy(key)))?;
    let n = value
        .as_i64()
        .map_err(|_| anyhow!("non-integer {}", String::from_utf8_lossy(key)))?;
    u32::try_from(n).map_err(|_| anyhow!("out-of-range {}", String::from_utf8_lossy(key)))
}

fn image_path(image_dir: &Path, page: u32, index: u32, ext: &str) -> PathBuf {
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    image_dir.join(format!("page_{}_img_{}_{}.{}", page, index, suffix, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentRef;
    use lopdf::dictionary;
    use lopdf::{Object, Stream};

    /// Build a valid PDF where each entry of `pages` is one page of text,
    /// optionally carrying one embedded 2x2 grayscale image.
    fn make_test_pdf(pages: &[&str], with_image: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            };
            if with_image {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![0u8, 64, 128, 255],
                ));
                resources.set("XObject", dictionary! { "Im1" => image_id });
            }

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn document_at(path: &Path) -> DocumentRef {
        DocumentRef {
            path: path.to_path_buf(),
            file_name: path.file_name().unwrap().to_string_lossy().to_string(),
            classification: None,
        }
    }

    #[test]
    fn two_page_text_concatenates_in_page_order() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("report.pdf");
        std::fs::write(&pdf, make_test_pdf(&["AlphaFirst", "BravoSecond"], false)).unwrap();

        let content = extract_document(&document_at(&pdf), &tmp.path().join("images"), "rec1");
        assert!(!content.parse_failed);
        let alpha = content.text.find("AlphaFirst").unwrap();
        let bravo = content.text.find("BravoSecond").unwrap();
        assert!(alpha < bravo);
    }

    #[test]
    fn images_are_saved_per_page_with_unique_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("report.pdf");
        std::fs::write(&pdf, make_test_pdf(&["One", "Two"], true)).unwrap();
        let images_root = tmp.path().join("images");

        let first = extract_document(&document_at(&pdf), &images_root, "rec1");
        assert_eq!(first.images.len(), 2);
        assert_eq!(first.images[0].page, 1);
        assert_eq!(first.images[1].page, 2);
        assert_eq!(first.images[0].index, 1);
        for image in &first.images {
            assert!(image.path.exists());
            let name = image.path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with(&format!("page_{}_img_1_", image.page)));
            assert!(name.ends_with(".png"));
        }

        // Same bytes, second run: same addressing, different random suffixes.
        let second = extract_document(&document_at(&pdf), &images_root, "rec1");
        assert_eq!(second.images.len(), 2);
        assert_ne!(
            first.images[0].path.file_name(),
            second.images[0].path.file_name()
        );
    }

    #[test]
    fn corrupt_document_degrades_to_empty_content() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("broken.pdf");
        std::fs::write(&pdf, b"definitely not a pdf").unwrap();

        let content = extract_document(&document_at(&pdf), &tmp.path().join("images"), "rec2");
        assert!(content.parse_failed);
        assert!(content.text.is_empty());
        assert!(content.images.is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty_content() {
        let tmp = tempfile::tempdir().unwrap();
        let content = extract_document(
            &document_at(&tmp.path().join("gone.pdf")),
            &tmp.path().join("images"),
            "rec3",
        );
        assert!(content.parse_failed);
        assert!(content.text.is_empty());
    }
}

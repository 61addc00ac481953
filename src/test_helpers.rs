//! Shared test utilities for the docimg test suite.
//!
//! Provides synthetic image payloads, PDF and DOCX fixture builders, and a
//! config rooted in a temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let config = test_config(tmp.path());
//!
//! write_pdf(
//!     &config.paths.input_dir.join("report.pdf"),
//!     vec![vec![PdfXObject::Image(jpeg_xobject(jpeg_bytes(64, 64), 64, 64))]],
//! );
//! ```

use crate::config::ExtractorConfig;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

// =========================================================================
// Config
// =========================================================================

/// Stock config with every directory under `root` and file logging off.
///
/// Input and temp directories are created; output is left for the pipeline
/// to create.
pub fn test_config(root: &Path) -> ExtractorConfig {
    let mut config = ExtractorConfig::default();
    config.paths.input_dir = root.join("input");
    config.paths.output_dir = root.join("output");
    config.paths.temp_dir = root.join("temp");
    config.logging.log_file = String::new();
    std::fs::create_dir_all(&config.paths.input_dir).unwrap();
    std::fs::create_dir_all(&config.paths.temp_dir).unwrap();
    config
}

/// A dedicated per-document staging directory under `root/temp`, so staged
/// files never share a directory with the config's input or temp roots.
pub fn staging_dir(root: &Path) -> PathBuf {
    let dir = root.join("temp/doc");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Sorted file names directly inside `dir`. Empty if `dir` is missing.
pub fn staged_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =========================================================================
// Image payloads
// =========================================================================

/// Deterministic pseudo-random RGB pixels. Noise keeps encoded files from
/// compressing below the default 5 KB floor: a 64×64 PNG is ~12 KB.
pub fn noisy_pixels(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        Rgb([channel(), channel(), channel()])
    })
}

pub fn noisy_png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    encode(&noisy_pixels(width, height, seed), ImageFormat::Png)
}

/// Noisy JPEG at quality 100, so even 64×64 stays above 5 KB.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = noisy_pixels(width, height, width ^ height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100)
        .encode_image(&img)
        .unwrap();
    out
}

/// Solid-color RGB pixel buffer, as a PDF stores uncompressed image data.
pub fn flat_rgb_pixels(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    color
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect()
}

fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

// =========================================================================
// PDF fixtures
// =========================================================================

/// Entry in a page's `/XObject` resource dictionary.
pub enum PdfXObject {
    Image(Stream),
    /// Form XObject whose own resources hold these images.
    Form(Vec<Stream>),
}

/// JPEG image XObject (`/DCTDecode`).
pub fn jpeg_xobject(bytes: Vec<u8>, width: u32, height: u32) -> Stream {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => name("XObject"),
            "Subtype" => name("Image"),
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => name("DeviceRGB"),
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => name("DCTDecode"),
        },
        bytes,
    );
    stream.allows_compression = false;
    stream
}

/// Image XObject holding raw 8-bit pixels, Flate-compressed when that
/// makes the stream smaller.
pub fn raw_xobject(pixels: Vec<u8>, width: u32, height: u32, color_space: &str) -> Stream {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => name("XObject"),
            "Subtype" => name("Image"),
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => name(color_space),
            "BitsPerComponent" => Object::Integer(8),
        },
        pixels,
    );
    stream.compress().unwrap();
    stream
}

/// Image XObject with an arbitrary single filter and opaque content.
pub fn filtered_xobject(filter: &str, content: Vec<u8>) -> Stream {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => name("XObject"),
            "Subtype" => name("Image"),
            "Width" => Object::Integer(10),
            "Height" => Object::Integer(10),
            "ColorSpace" => name("DeviceGray"),
            "BitsPerComponent" => Object::Integer(1),
            "Filter" => name(filter),
        },
        content,
    );
    stream.allows_compression = false;
    stream
}

pub fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Write a PDF with one page per entry in `pages`, each page referencing
/// its XObjects from its own `/Resources`.
pub fn write_pdf(path: &Path, pages: Vec<Vec<PdfXObject>>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for xobjects in pages {
        let mut resources = Dictionary::new();
        for (i, xobject) in xobjects.into_iter().enumerate() {
            let id = match xobject {
                PdfXObject::Image(stream) => doc.add_object(stream),
                PdfXObject::Form(images) => {
                    let inner = xobject_dict(&mut doc, images);
                    doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => name("XObject"),
                            "Subtype" => name("Form"),
                            "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                            "Resources" => dictionary! { "XObject" => inner },
                        },
                        Vec::new(),
                    ))
                }
            };
            resources.set(format!("Im{i}"), Object::Reference(id));
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => name("Page"),
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "MediaBox" => [0, 0, 595, 842].into_iter().map(Object::Integer).collect::<Vec<_>>(),
            "Resources" => dictionary! { "XObject" => resources },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => name("Pages"),
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => name("Catalog"),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

fn xobject_dict(doc: &mut Document, images: Vec<Stream>) -> Dictionary {
    let mut dict = Dictionary::new();
    for (i, stream) in images.into_iter().enumerate() {
        let id = doc.add_object(stream);
        dict.set(format!("FIm{i}"), Object::Reference(id));
    }
    dict
}

// =========================================================================
// DOCX fixtures
// =========================================================================

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="jpeg" ContentType="image/jpeg"/>
  <Default Extension="gif" ContentType="image/gif"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#;

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_THUMBNAIL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// A `.rels` part with one `<Relationship>` per `(type, target)`, ids in order.
/// Targets starting with `http` are marked external.
pub fn relationships_xml(rels: &[(&str, &str)]) -> Vec<u8> {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
    );
    for (i, (rel_type, target)) in rels.iter().enumerate() {
        let mode = if target.starts_with("http") {
            " TargetMode=\"External\""
        } else {
            ""
        };
        xml.push_str(&format!(
            "  <Relationship Id=\"rId{}\" Type=\"{rel_type}\" Target=\"{target}\"{mode}/>\n",
            i + 1
        ));
    }
    xml.push_str("</Relationships>\n");
    xml.into_bytes()
}

/// Write a DOCX whose media parts are `media`, in order, each referenced by
/// an image relationship from `word/document.xml`.
///
/// `overrides` adds `<Override>` content types for parts whose extension
/// has no `<Default>` (e.g. `("/word/media/image9.emf", "image/x-emf")`).
pub fn write_docx(path: &Path, media: &[(&str, Vec<u8>)], overrides: &[(&str, &str)]) {
    let targets: Vec<String> = media
        .iter()
        .map(|(name, _)| match name.strip_prefix("word/") {
            Some(relative) => relative.to_string(),
            None => format!("/{name}"),
        })
        .collect();
    let document_rels: Vec<(&str, &str)> =
        targets.iter().map(|t| (REL_IMAGE, t.as_str())).collect();

    let mut entries = docx_skeleton(overrides, &document_rels);
    entries.extend(media.iter().map(|(name, bytes)| (*name, bytes.clone())));
    write_zip(path, &entries);
}

/// Content types, package relationships, the main document and its
/// relationships. Callers append the parts themselves.
pub fn docx_skeleton<'a>(
    overrides: &[(&str, &str)],
    document_rels: &[(&str, &str)],
) -> Vec<(&'a str, Vec<u8>)> {
    let mut content_types = CONTENT_TYPES_HEAD.to_string();
    for (part, content_type) in overrides {
        content_types.push_str(&format!(
            "  <Override PartName=\"{part}\" ContentType=\"{content_type}\"/>\n"
        ));
    }
    content_types.push_str("</Types>\n");

    vec![
        ("[Content_Types].xml", content_types.into_bytes()),
        (
            "_rels/.rels",
            relationships_xml(&[(REL_OFFICE_DOCUMENT, "word/document.xml")]),
        ),
        ("word/document.xml", DOCUMENT_XML.as_bytes().to_vec()),
        ("word/_rels/document.xml.rels", relationships_xml(document_rels)),
    ]
}

/// Write a raw zip with the given entries, in order.
pub fn write_zip(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

//! End-to-end batch run over a real input directory.
//!
//! Builds a PDF with `lopdf` and a DOCX with `zip`, drops a stray text file
//! next to them, and checks what lands in the output directory.

use docimg::config::{ExtractorConfig, resolve_config};
use docimg::imaging::RustProbe;
use docimg::pipeline::{DocumentOutcome, list_input_files, run_batch};
use image::{Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

fn noisy_png(seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_add(7);
    let img = RgbImage::from_fn(64, 64, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let v = state.to_be_bytes();
        Rgb([v[0], v[1], v[2]])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// One-page PDF whose images are PNG files stored as opaque streams.
fn write_pdf(path: &Path, images: Vec<Vec<u8>>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut xobjects = Dictionary::new();
    for (i, bytes) in images.into_iter().enumerate() {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => name("XObject"),
                "Subtype" => name("Image"),
                "Width" => Object::Integer(64),
                "Height" => Object::Integer(64),
                "ColorSpace" => name("DeviceRGB"),
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => name("JPXDecode"),
            },
            bytes,
        );
        stream.allows_compression = false;
        let id = doc.add_object(stream);
        xobjects.set(format!("Im{i}"), Object::Reference(id));
    }
    let page_id = doc.add_object(dictionary! {
        "Type" => name("Page"),
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => [0, 0, 595, 842].into_iter().map(Object::Integer).collect::<Vec<_>>(),
        "Resources" => dictionary! { "XObject" => xobjects },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => name("Pages"),
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => name("Catalog"),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn relationships(rels: &[(&str, &str)]) -> String {
    let body: String = rels
        .iter()
        .enumerate()
        .map(|(i, (kind, target))| {
            format!(
                r#"<Relationship Id="rId{}" Type="{OFFICE_RELS}/{kind}" Target="{target}"/>"#,
                i + 1
            )
        })
        .collect();
    format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}">{body}</Relationships>"#)
}

/// A DOCX whose `media` parts are each referenced as an image by the main
/// document. `docProps/thumbnail.png` is always present but only referenced
/// as the package thumbnail, so it is not one of the document's images.
fn write_docx(path: &Path, media: &[(&str, Vec<u8>)]) {
    let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
</Types>"#;
    let package_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{OFFICE_RELS}/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="{RELS_NS}/metadata/thumbnail" Target="docProps/thumbnail.png"/></Relationships>"#
    );
    let targets: Vec<String> = media
        .iter()
        .map(|(part, _)| part.trim_start_matches("word/").to_string())
        .collect();
    let document_rels =
        relationships(&targets.iter().map(|t| ("image", t.as_str())).collect::<Vec<_>>());

    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    let mut put = |name: &str, bytes: &[u8]| {
        zip.start_file(name, options).unwrap();
        zip.write_all(bytes).unwrap();
    };
    put("[Content_Types].xml", content_types.as_bytes());
    put("_rels/.rels", package_rels.as_bytes());
    put("word/document.xml", b"<w:document/>");
    put("word/_rels/document.xml.rels", document_rels.as_bytes());
    put("docProps/thumbnail.png", &noisy_png(99));
    for (part, bytes) in media {
        put(part, bytes);
    }
    zip.finish().unwrap();
}

fn config_for(root: &Path) -> ExtractorConfig {
    let overlay: toml::Value = toml::from_str(&format!(
        r#"
[paths]
input_dir = "{input}"
output_dir = "{output}"
temp_dir = "{temp}"

[logging]
log_file = ""
"#,
        input = root.join("input").display(),
        output = root.join("output").display(),
        temp = root.join("temp").display(),
    ))
    .unwrap();
    resolve_config(Some(overlay)).unwrap()
}

fn archive_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

#[test]
fn batch_over_input_directory() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path());
    let input = &config.paths.input_dir;
    std::fs::create_dir_all(input).unwrap();

    let a = noisy_png(1);
    let b = noisy_png(2);
    write_pdf(
        &input.join("scan.pdf"),
        vec![a.clone(), a.clone(), vec![0; 512], b.clone()],
    );
    write_docx(
        &input.join("memo.docx"),
        &[("word/media/image1.png", b.clone()), ("word/media/image2.png", b.clone())],
    );
    std::fs::write(input.join("readme.txt"), b"ignored").unwrap();

    let listed = list_input_files(input).unwrap();
    assert_eq!(listed.len(), 2, "the .txt file is not an input");

    let mut files = listed;
    files.push(input.join("readme.txt"));
    let summary = run_batch(&files, &config, &RustProbe::new(), None);

    assert_eq!(summary.files, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total.found, 6);
    assert_eq!(summary.total.saved, 3);
    assert_eq!(summary.total.duplicates, 2);
    assert_eq!(summary.total.filtered_small, 1);
    assert!(summary.total.is_consistent());

    // Dedup is per document: `b` is kept by both.
    assert_eq!(
        archive_entries(&config.paths.output_dir.join("scan.zip")),
        vec![
            ("image_001_p001.jpx".to_string(), a),
            ("image_003_p001.jpx".to_string(), b.clone()),
        ]
    );
    assert_eq!(
        archive_entries(&config.paths.output_dir.join("memo.zip")),
        vec![("image_001.png".to_string(), b)]
    );

    assert!(matches!(
        summary.reports[2].outcome,
        DocumentOutcome::Skipped { .. }
    ));
    let leftovers: Vec<_> = std::fs::read_dir(&config.paths.temp_dir)
        .map(|d| d.collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "staging must be cleaned up");
}

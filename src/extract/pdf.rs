//! PDF image extraction via `lopdf`.
//!
//! Walks page dict → `/Resources` → `/XObject` and collects every entry with
//! `/Subtype /Image`, descending into `/Form` XObjects. Resources missing
//! from a page are inherited through the `/Parent` chain.
//!
//! ## Stream payloads
//!
//! | `/Filter` | Staged bytes | Tag |
//! |---|---|---|
//! | `DCTDecode` | raw stream | `jpeg` |
//! | `JPXDecode` | raw stream | `jpx` |
//! | `JBIG2Decode` | raw stream | `jb2` |
//! | `CCITTFaxDecode` | raw stream | `bin` |
//! | none / Flate / LZW, 8-bit gray or RGB | pixels wrapped as PNG | `png` |
//! | none / Flate / LZW, other layouts | decoded stream | `bin` |
//!
//! PNG wrapping is lossless: the pixel samples are stored unchanged.

use super::{ExtractError, ExtractionStats, ImageCandidate, ImageStager, Naming, StageError};
use crate::config::ExtractorConfig;
use crate::imaging::ImageProbe;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Bound on `/Parent` hops when looking for inherited resources.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Raw image payload pulled out of one XObject stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub tag: &'static str,
}

pub fn extract_pdf<P: ImageProbe + ?Sized>(
    path: &Path,
    staging_dir: &Path,
    config: &ExtractorConfig,
    probe: &P,
) -> Result<ExtractionStats, ExtractError> {
    let doc = Document::load(path)?;
    let mut stager = ImageStager::new(staging_dir, config, probe);

    for (page_number, page_id) in doc.get_pages() {
        let images = page_image_ids(&doc, page_id);
        debug!(page = page_number, images = images.len(), "scanning page");
        for image_id in images {
            match read_image(&doc, image_id) {
                Ok(raw) => stager.stage(ImageCandidate {
                    bytes: raw.bytes,
                    format_tag: raw.tag.to_string(),
                    naming: Naming::PageSequence { page: page_number },
                }),
                Err(e) => stager.record_failure(&e),
            };
        }
    }

    Ok(stager.finish())
}

/// Image XObjects reachable from a page, unique per page, in resource order.
///
/// References that cannot be resolved are included so the caller counts
/// them as failures.
pub fn page_image_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut images = Vec::new();
    if let Some(resources) = page_resources(doc, page_id) {
        let mut seen_images = HashSet::new();
        let mut seen_forms = HashSet::new();
        collect_images(doc, resources, &mut seen_images, &mut seen_forms, &mut images);
    }
    images
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).as_dict().ok();
        }
        let parent = match node.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    seen_images: &mut HashSet<ObjectId>,
    seen_forms: &mut HashSet<ObjectId>,
    out: &mut Vec<ObjectId>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return;
    };

    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        match doc.get_object(*id) {
            Ok(Object::Stream(stream)) => match subtype(&stream.dict) {
                Some(b"Image") => {
                    if seen_images.insert(*id) {
                        out.push(*id);
                    }
                }
                Some(b"Form") => {
                    if seen_forms.insert(*id)
                        && let Some(inner) = stream
                            .dict
                            .get(b"Resources")
                            .ok()
                            .and_then(|obj| resolve(doc, obj).as_dict().ok())
                    {
                        collect_images(doc, inner, seen_images, seen_forms, out);
                    }
                }
                _ => {}
            },
            Ok(_) => {}
            Err(_) => {
                if seen_images.insert(*id) {
                    out.push(*id);
                }
            }
        }
    }
}

/// Pull the payload of one image XObject.
pub fn read_image(doc: &Document, id: ObjectId) -> Result<RawImage, StageError> {
    let stream = match doc.get_object(id) {
        Ok(Object::Stream(stream)) => stream,
        Ok(_) => {
            return Err(StageError::Stream(format!(
                "object {} {} R is not a stream",
                id.0, id.1
            )));
        }
        Err(e) => {
            return Err(StageError::Stream(format!(
                "object {} {} R: {e}",
                id.0, id.1
            )));
        }
    };

    let filters = filter_names(doc, &stream.dict);
    let codec = filters.iter().find_map(|f| codec_tag(f));
    match (filters.as_slice(), codec) {
        ([], _) => Ok(wrap_pixels(doc, &stream.dict, stream.content.clone())),
        ([_], Some(tag)) => Ok(RawImage {
            bytes: stream.content.clone(),
            tag,
        }),
        (_, Some(_)) => Err(StageError::Stream(format!(
            "unsupported filter chain on object {} {} R",
            id.0, id.1
        ))),
        (_, None) => {
            let decoded = decode(stream)?;
            Ok(wrap_pixels(doc, &stream.dict, decoded))
        }
    }
}

fn decode(stream: &Stream) -> Result<Vec<u8>, StageError> {
    stream
        .decompressed_content()
        .map_err(|e| StageError::Stream(e.to_string()))
}

/// Filters whose stream content is itself an image file.
fn codec_tag(filter: &[u8]) -> Option<&'static str> {
    match filter {
        b"DCTDecode" => Some("jpeg"),
        b"JPXDecode" => Some("jpx"),
        b"JBIG2Decode" => Some("jb2"),
        b"CCITTFaxDecode" => Some("bin"),
        _ => None,
    }
}

fn filter_names<'a>(doc: &'a Document, dict: &'a Dictionary) -> Vec<&'a [u8]> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Vec::new();
    };
    match resolve(doc, filter) {
        Object::Name(name) => vec![name.as_slice()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Wrap 8-bit gray or RGB samples as PNG. Anything else is staged as-is.
fn wrap_pixels(doc: &Document, dict: &Dictionary, pixels: Vec<u8>) -> RawImage {
    let Some((width, height, color)) = pixel_layout(doc, dict) else {
        return RawImage {
            bytes: pixels,
            tag: "bin",
        };
    };
    let channels: u64 = match color {
        ExtendedColorType::L8 => 1,
        _ => 3,
    };
    let expected = width as u64 * height as u64 * channels;
    if (pixels.len() as u64) < expected {
        return RawImage {
            bytes: pixels,
            tag: "bin",
        };
    }

    let mut png = Vec::new();
    match PngEncoder::new(&mut png).write_image(
        &pixels[..expected as usize],
        width,
        height,
        color,
    ) {
        Ok(()) => RawImage {
            bytes: png,
            tag: "png",
        },
        Err(_) => RawImage {
            bytes: pixels,
            tag: "bin",
        },
    }
}

fn pixel_layout(doc: &Document, dict: &Dictionary) -> Option<(u32, u32, ExtendedColorType)> {
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return None;
    }
    if integer(doc, dict, b"BitsPerComponent")? != 8 {
        return None;
    }
    let width = u32::try_from(integer(doc, dict, b"Width")?).ok()?;
    let height = u32::try_from(integer(doc, dict, b"Height")?).ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    let color = match color_channels(doc, dict.get(b"ColorSpace").ok()?)? {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        _ => return None,
    };
    Some((width, height, color))
}

fn color_channels(doc: &Document, color_space: &Object) -> Option<i64> {
    match resolve(doc, color_space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"CalRGB" => Some(3),
            _ => None,
        },
        Object::Array(items) => match items.as_slice() {
            [Object::Name(kind), profile, ..] if kind == b"ICCBased" => {
                match resolve(doc, profile) {
                    Object::Stream(icc) => integer(doc, &icc.dict, b"N"),
                    _ => None,
                }
            }
            [Object::Name(kind), ..] if kind == b"CalGray" => Some(1),
            [Object::Name(kind), ..] if kind == b"CalRGB" => Some(3),
            _ => None,
        },
        _ => None,
    }
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(value) => Some(*value),
        _ => None,
    }
}

fn subtype(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Subtype") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        _ => None,
    }
}

/// Follow one level of indirection, or return the object as-is.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

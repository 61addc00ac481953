//! DOCX image extraction.
//!
//! A DOCX is an OPC zip package. Image parts are the targets of image
//! relationships, found by walking the relationship graph depth-first from
//! the package's `_rels/.rels`: every part's own `_rels/<name>.rels` is read
//! once, and each image part is kept once, at its first reference. Parts that
//! nothing references (stale media, the `docProps` thumbnail) are not images
//! of the document.
//!
//! Content types from `[Content_Types].xml` (`<Override>` by part name, else
//! `<Default>` by extension) give each part its file extension.
//!
//! Parts are numbered by their position among image parts, so a duplicate
//! leaves a gap: `image_001.png`, `image_003.jpg`.

use super::{ExtractError, ExtractionStats, ImageCandidate, ImageStager, Naming, StageError};
use crate::config::ExtractorConfig;
use crate::imaging::ImageProbe;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const PACKAGE_RELS_PART: &str = "_rels/.rels";
const IMAGE_RELATIONSHIP: &str = "/relationships/image";

/// Upper bound on the bytes read from one part. The size in the zip header
/// is whatever the document claims, so it is never trusted for allocation.
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Content-type table from `[Content_Types].xml`.
///
/// Keys are lower-cased: OPC part names and extensions are case-insensitive.
#[derive(Debug, Default)]
pub struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self, ExtractError> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| ExtractError::Package(format!("Failed to parse {CONTENT_TYPES_PART}: {e}")))?;

        let mut types = Self::default();
        for node in doc.root_element().children().filter(|n| n.is_element()) {
            if node.has_tag_name("Default")
                && let (Some(ext), Some(content_type)) =
                    (node.attribute("Extension"), node.attribute("ContentType"))
            {
                types
                    .defaults
                    .insert(ext.to_ascii_lowercase(), content_type.to_string());
            } else if node.has_tag_name("Override")
                && let (Some(part), Some(content_type)) =
                    (node.attribute("PartName"), node.attribute("ContentType"))
            {
                types
                    .overrides
                    .insert(part.to_ascii_lowercase(), content_type.to_string());
            }
        }
        Ok(types)
    }

    /// Content type for a zip entry name (no leading `/`).
    pub fn resolve(&self, entry_name: &str) -> Option<&str> {
        let part_name = format!("/{}", entry_name.to_ascii_lowercase());
        if let Some(content_type) = self.overrides.get(&part_name) {
            return Some(content_type.as_str());
        }
        let ext = part_extension(entry_name)?.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }
}

/// One image part, by part name (no leading `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub name: String,
    pub content_type: Option<String>,
}

impl ImagePart {
    /// Format tag: content-type subtype, else the part extension, else empty.
    pub fn format_tag(&self) -> String {
        if let Some(content_type) = &self.content_type
            && let Some((_, subtype)) = content_type.split_once('/')
            && !subtype.is_empty()
        {
            return subtype.to_string();
        }
        part_extension(&self.name).unwrap_or_default().to_string()
    }
}

fn part_extension(name: &str) -> Option<&str> {
    let file_name = name.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// An internal relationship, target resolved to a part name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with(IMAGE_RELATIONSHIP)
    }
}

/// Relationships part for `source` (`""` is the package itself).
pub fn rels_part_name(source: &str) -> String {
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if source.is_empty() => PACKAGE_RELS_PART.to_string(),
        None => format!("_rels/{source}.rels"),
    }
}

/// Resolve a relationship target against the part that declares it.
///
/// Absolute targets (`/word/media/a.png`) are package-rooted; relative ones
/// are joined to the source part's directory. `.` and `..` segments are
/// folded, never climbing above the package root.
pub fn resolve_target(source: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let relative = match target.strip_prefix('/') {
        Some(absolute) => absolute,
        None => {
            if let Some((dir, _)) = source.rsplit_once('/') {
                segments.extend(dir.split('/'));
            }
            target
        }
    };
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Internal relationships declared in a `.rels` document, in document order.
pub fn parse_relationships(xml: &str, source: &str) -> Result<Vec<Relationship>, ExtractError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| {
        ExtractError::Package(format!("Failed to parse {}: {e}", rels_part_name(source)))
    })?;

    let mut rels = Vec::new();
    for node in doc.descendants() {
        if node.has_tag_name("Relationship")
            && let (Some(rel_type), Some(target)) = (node.attribute("Type"), node.attribute("Target"))
            && !node
                .attribute("TargetMode")
                .is_some_and(|mode| mode.eq_ignore_ascii_case("External"))
        {
            rels.push(Relationship {
                rel_type: rel_type.to_string(),
                target: resolve_target(source, target),
            });
        }
    }
    Ok(rels)
}

/// Read all of `reader`, failing once more than `limit` bytes arrive.
pub fn read_bounded<R: Read>(reader: R, limit: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("part exceeds {limit} bytes"),
        ));
    }
    Ok(bytes)
}

/// UTF-8 text of a package part, or `None` if the package has no such part.
fn read_xml_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let bytes = read_bounded(entry, MAX_PART_BYTES)?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| ExtractError::Package(format!("{name} is not UTF-8: {e}")))
}

fn relationships_of<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    source: &str,
) -> Result<Vec<Relationship>, ExtractError> {
    match read_xml_part(archive, &rels_part_name(source))? {
        Some(xml) => parse_relationships(&xml, source),
        None => Ok(Vec::new()),
    }
}

/// Image parts of a package, in relationship order.
///
/// Depth-first over the relationship graph: a relationship is visited, then
/// its target part's own relationships, then the next sibling. Each part's
/// relationships are read once, so cycles terminate.
pub fn image_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    content_types: &ContentTypes,
) -> Result<Vec<ImagePart>, ExtractError> {
    if archive.index_for_name(PACKAGE_RELS_PART).is_none() {
        return Err(ExtractError::Package(format!("missing {PACKAGE_RELS_PART}")));
    }

    let mut parts = Vec::new();
    let mut images = HashSet::new();
    let mut visited = HashSet::from([String::new()]);
    let mut stack = vec![relationships_of(archive, "")?.into_iter()];

    while let Some(level) = stack.last_mut() {
        let Some(rel) = level.next() else {
            stack.pop();
            continue;
        };
        if rel.is_image() && images.insert(rel.target.clone()) {
            parts.push(ImagePart {
                content_type: content_types.resolve(&rel.target).map(str::to_string),
                name: rel.target.clone(),
            });
        }
        if visited.insert(rel.target.clone()) {
            stack.push(relationships_of(archive, &rel.target)?.into_iter());
        }
    }
    Ok(parts)
}

fn read_content_types<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<ContentTypes, ExtractError> {
    match read_xml_part(archive, CONTENT_TYPES_PART)? {
        Some(xml) => ContentTypes::parse(&xml),
        None => Err(ExtractError::Package(format!(
            "missing {CONTENT_TYPES_PART}"
        ))),
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, StageError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| StageError::Stream(format!("{name}: {e}")))?;
    Ok(read_bounded(entry, MAX_PART_BYTES)?)
}

pub fn extract_docx<P: ImageProbe + ?Sized>(
    path: &Path,
    staging_dir: &Path,
    config: &ExtractorConfig,
    probe: &P,
) -> Result<ExtractionStats, ExtractError> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let content_types = read_content_types(&mut archive)?;
    let parts = image_parts(&mut archive, &content_types)?;
    debug!(parts = parts.len(), "image parts in package");

    let mut stager = ImageStager::new(staging_dir, config, probe);
    for (position, part) in parts.iter().enumerate() {
        match read_part(&mut archive, &part.name) {
            Ok(bytes) => stager.stage(ImageCandidate {
                bytes,
                format_tag: part.format_tag(),
                naming: Naming::Position {
                    index: position as u32 + 1,
                },
            }),
            Err(e) => stager.record_failure(&e),
        };
    }

    Ok(stager.finish())
}

//! Archives
//!
//! An archive is a [`Version`] record followed by any number of top-level
//! elements. Two encodings share the same logical model: a compact,
//! checksummed binary stream ([`binary`]) and a human-readable XML document
//! ([`xml`]).
//!
//! Reading is tolerant per element: an element of an unknown type, or one
//! whose fields cannot be applied, is reported and skipped while the rest
//! of the archive loads. A structurally broken stream fails as a whole.

pub mod binary;
pub mod xml;

use crate::class::Class;
use crate::error::{ReflectError, Result};
use crate::field::{Field, FieldFlags};
use crate::object::{downcast_object, Object, ObjectPtr, Reflect};
use crate::registry::Registry;
use crate::value::Value;
use crate::version::Version;
use std::path::Path;

/// On-disk encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveType {
    Binary,
    Xml,
}

impl ArchiveType {
    /// `.xml` files are XML, everything else is binary
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => ArchiveType::Xml,
            _ => ArchiveType::Binary,
        }
    }
}

/// Stage of an archive operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveState {
    Starting,
    ElementProcessed,
    PostProcessing,
    Complete,
}

/// Progress report delivered to a [`StatusSink`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusInfo {
    pub state: ArchiveState,
    /// Whole percent, 0 to 100
    pub progress: u32,
}

/// An element that could not be read
#[derive(Debug)]
pub struct ElementFailure {
    /// Position among the top-level elements
    pub index: usize,
    /// Persisted type name, empty if it could not be read
    pub type_name: String,
    pub error: ReflectError,
}

/// Receiver of archive progress and per-element failures
pub trait StatusSink {
    fn status(&mut self, info: &StatusInfo);

    fn exception(&mut self, failure: &ElementFailure) {
        let _ = failure;
    }
}

/// Everything read from an archive
#[derive(Debug)]
pub struct ArchiveContents {
    pub version: Version,
    pub elements: Vec<ObjectPtr>,
    pub failures: Vec<ElementFailure>,
}

impl ArchiveContents {
    pub(crate) fn new(version: Version) -> Self {
        Self {
            version,
            elements: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// First element of type `T`, by reference
    pub fn first<T: Reflect>(&self) -> Option<&T> {
        self.elements.iter().find_map(|e| e.downcast_ref::<T>())
    }

    /// Take the first element of type `T`
    pub fn into_first<T: Reflect>(self) -> Option<T> {
        self.elements
            .into_iter()
            .find_map(|e| downcast_object::<T>(e).ok())
            .map(|boxed| *boxed)
    }
}

/// Throttles progress to whole-percent changes
pub(crate) struct Progress<'s> {
    sink: Option<&'s mut dyn StatusSink>,
    last: Option<u32>,
}

impl<'s> Progress<'s> {
    pub(crate) fn new(sink: Option<&'s mut dyn StatusSink>) -> Self {
        Self { sink, last: None }
    }

    pub(crate) fn state(&mut self, state: ArchiveState, progress: u32) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.status(&StatusInfo { state, progress });
        }
        self.last = Some(progress);
    }

    pub(crate) fn element(&mut self, done: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            ((done.min(total) * 100) / total) as u32
        };
        if self.last != Some(percent) {
            self.state(ArchiveState::ElementProcessed, percent);
        }
    }

    pub(crate) fn exception(&mut self, failure: &ElementFailure) {
        log::warn!(
            "Skipped element {} ('{}'): {}",
            failure.index,
            failure.type_name,
            failure.error
        );
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.exception(failure);
        }
    }
}

/// Fields of `object` that get persisted, with their values
///
/// Discarded fields are never written. Fields equal to their default are
/// skipped unless forced, and empty containers with an empty default are
/// always skipped.
pub(crate) fn persisted_fields<'c>(
    registry: &Registry,
    class: &'c Class,
    object: &dyn Object,
) -> Result<Vec<(&'c Field, Value)>> {
    let mut fields = Vec::with_capacity(class.fields().len());
    for field in class.fields() {
        if field.has_flag(FieldFlags::DISCARD) {
            continue;
        }

        let connected = field.create_serializer(registry, object)?;
        let value = connected.value()?;
        let default = field.default_value();

        if value.is_empty_container() && default.map_or(false, Value::is_empty_container) {
            continue;
        }
        if !field.has_flag(FieldFlags::FORCE) {
            if let Some(default) = default {
                if connected.data().equals(&value, default) {
                    continue;
                }
            }
        }
        fields.push((field, value));
    }
    Ok(fields)
}

/// Extract the leading version record and release the instance read for it
pub(crate) fn take_version(registry: &Registry, record: Option<ObjectPtr>) -> Result<Version> {
    let record = record.ok_or_else(|| ReflectError::format("archive does not start with a version record"))?;
    let version = record.downcast_ref::<Version>().cloned();
    registry.release(record);
    version.ok_or_else(|| ReflectError::format("archive does not start with a version record"))
}

/// Upgrade and post-process freshly read top-level elements
pub(crate) fn finish(contents: &mut ArchiveContents, progress: &mut Progress<'_>) {
    progress.state(ArchiveState::PostProcessing, 100);
    if !contents.version.is_current() {
        log::debug!(
            "Upgrading {} element(s) written by {}",
            contents.elements.len(),
            contents.version
        );
        for element in &mut contents.elements {
            element.upgrade_object(&contents.version);
        }
    }
    for element in &mut contents.elements {
        element.post_deserialize_object();
    }
    progress.state(ArchiveState::Complete, 100);
}

/// Write objects to a file, encoding chosen by extension
pub fn write_file(
    registry: &Registry,
    objects: &[&dyn Object],
    path: impl AsRef<Path>,
    version: &Version,
    sink: Option<&mut dyn StatusSink>,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = match ArchiveType::from_path(path) {
        ArchiveType::Binary => binary::write(registry, objects, version, sink)?,
        ArchiveType::Xml => xml::write(registry, objects, version, sink)?.into_bytes(),
    };
    std::fs::write(path, bytes).map_err(|source| ReflectError::File {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {} element(s) to {}", objects.len(), path.display());
    Ok(())
}

/// Read every element of a file, encoding chosen by extension
pub fn read_file(
    registry: &Registry,
    path: impl AsRef<Path>,
    sink: Option<&mut dyn StatusSink>,
) -> Result<ArchiveContents> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ReflectError::File {
        path: path.to_path_buf(),
        source,
    })?;
    match ArchiveType::from_path(path) {
        ArchiveType::Binary => binary::read(registry, &bytes, sink),
        ArchiveType::Xml => {
            let text = String::from_utf8(bytes).map_err(ReflectError::xml)?;
            xml::read(registry, &text, sink)
        }
    }
}

/// Write a single object to a file
pub fn to_file(registry: &Registry, object: &dyn Object, path: impl AsRef<Path>, version: &Version) -> Result<()> {
    write_file(registry, &[object], path, version, None)
}

/// Read the first element of type `T` from a file
pub fn from_file<T: Reflect>(registry: &Registry, path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    read_file(registry, path, None)?
        .into_first::<T>()
        .ok_or_else(|| ReflectError::MissingElement(path.display().to_string()))
}

/// Encode objects as a binary archive in memory
pub fn to_bytes(registry: &Registry, objects: &[&dyn Object], version: &Version) -> Result<Vec<u8>> {
    binary::write(registry, objects, version, None)
}

/// Decode a binary archive held in memory
pub fn from_bytes(registry: &Registry, bytes: &[u8]) -> Result<ArchiveContents> {
    binary::read(registry, bytes, None)
}

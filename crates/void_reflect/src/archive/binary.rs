//! Binary archive format
//!
//! Little-endian throughout:
//!
//! ```text
//! u16  byte-order mark 0xFEFF
//! u32  format version
//! u32  CRC-32 of the body
//! body:
//!   element  Version record
//!   i32      element count
//!   element* records
//!   i32      terminator (-1)
//! element:
//!   str      type name (u32 length + UTF-8), empty for a null element
//!   u32      body length
//!   i32      field count
//!   field*   { u32 field id, str data kind, u32 payload length, payload }
//!   i32      terminator (-1)
//! ```
//!
//! Field payloads are length-prefixed so readers can skip fields they no
//! longer know, and element bodies are length-prefixed so a reader can skip
//! an element whose type it cannot resolve. The data kind (`Int32`,
//! `Array<String>`, ...) lets a reader convert a scalar whose type changed
//! since it was written. A field that cannot be read keeps its default.

use super::{finish, persisted_fields, take_version, ArchiveContents, ArchiveState, ElementFailure, Progress, StatusSink};
use crate::class::Class;
use crate::error::{ReflectError, Result};
use crate::field::Field;
use crate::object::{Object, ObjectPtr};
use crate::registry::Registry;
use crate::value::{DataKind, Value};
use crate::version::Version;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const BYTE_ORDER_MARK: u16 = 0xFEFF;

/// Format version written by this build
pub const CURRENT_FORMAT: u32 = 1;

const HEADER_LEN: usize = 10;
const TERMINATOR: i32 = -1;

/// Output context handed to serializers while writing
pub struct BinaryWriter<'r> {
    registry: &'r Registry,
    buffer: Vec<u8>,
}

impl<'r> BinaryWriter<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            buffer: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| ReflectError::format("string too long"))?;
        self.write_u32(len);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Append a value with bincode
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        bincode::serialize_into(&mut self.buffer, value)?;
        Ok(())
    }

    /// Write a value with the serializer registered for its kind
    pub fn write_value(&mut self, kind: &DataKind, value: &Value) -> Result<()> {
        let data = self.registry.serializer_for(kind)?;
        data.write_binary(self, kind, value)
    }

    fn reserve_u32(&mut self) -> usize {
        let at = self.buffer.len();
        self.buffer.extend_from_slice(&[0; 4]);
        at
    }

    fn patch_u32(&mut self, at: usize, value: u32) {
        self.buffer[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Patch the length slot at `at` with the number of bytes written after it
    fn patch_length(&mut self, at: usize) -> Result<()> {
        let len = self.buffer.len() - (at + 4);
        let len = u32::try_from(len).map_err(|_| ReflectError::format("element too large"))?;
        self.patch_u32(at, len);
        Ok(())
    }

    /// Write an element record, or a null record for `None`
    pub fn write_element(&mut self, object: Option<&dyn Object>) -> Result<()> {
        let Some(object) = object else {
            return self.write_str("");
        };

        let registry = self.registry;
        let class = registry
            .get_class(object.reflect_type())
            .ok_or_else(|| ReflectError::UnknownType(object.class_name().to_string()))?;

        self.write_str(class.name())?;
        let length_at = self.reserve_u32();
        let count_at = self.reserve_u32();

        let fields = persisted_fields(registry, &class, object)?;
        for (field, value) in &fields {
            log::trace!("Write {}::{} ({})", class.name(), field.name(), field.kind());
            self.write_u32(field.id());
            self.write_str(&field.kind().to_string())?;
            let payload_at = self.reserve_u32();
            self.write_value(field.kind(), value)?;
            self.patch_length(payload_at)?;
        }

        self.write_i32(TERMINATOR);
        self.patch_u32(count_at, fields.len() as u32);
        self.patch_length(length_at)
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Input context handed to serializers while reading
pub struct BinaryReader<'r, 'b> {
    registry: &'r Registry,
    input: &'b [u8],
    pos: usize,
    // reads never pass this offset, narrowed to the payload being read
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'r, 'b> BinaryReader<'r, 'b> {
    pub(crate) fn new(registry: &'r Registry, input: &'b [u8]) -> Self {
        Self {
            registry,
            input,
            pos: 0,
            end: input.len(),
            depth: 0,
            max_depth: registry.config().max_archive_depth,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'b [u8]> {
        if len > self.remaining() {
            return Err(ReflectError::format(format!(
                "unexpected end of stream at offset {} (need {} bytes, have {})",
                self.pos,
                len,
                self.remaining()
            )));
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Read an item count, rejecting counts the remaining input cannot hold
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count > self.remaining() {
            return Err(ReflectError::format(format!(
                "item count {} exceeds the remaining {} bytes",
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ReflectError::format(format!("invalid UTF-8 string: {}", e)))
    }

    /// Read a bincode value
    pub fn decode<T: Serialize + DeserializeOwned>(&mut self) -> Result<T> {
        let value: T = bincode::deserialize(&self.input[self.pos..self.end])?;
        let size = bincode::serialized_size(&value)? as usize;
        self.pos += size;
        Ok(value)
    }

    /// Read a value with the serializer registered for its kind
    pub fn read_value(&mut self, kind: &DataKind) -> Result<Value> {
        let data = self.registry.serializer_for(kind)?;
        data.read_binary(self, kind)
    }

    /// Read an element record, `None` for a null record
    ///
    /// Any non-structural failure leaves the reader positioned after the
    /// element so the caller can carry on with the next one.
    pub fn read_element(&mut self) -> Result<Option<ObjectPtr>> {
        let name = self.read_str()?;
        if name.is_empty() {
            return Ok(None);
        }

        let length = self.read_u32()? as usize;
        if length > self.remaining() {
            return Err(ReflectError::format(format!(
                "element '{}' claims {} bytes, only {} remain",
                name,
                length,
                self.remaining()
            )));
        }
        let body_end = self.pos + length;

        if self.depth >= self.max_depth {
            self.pos = body_end;
            return Err(ReflectError::DepthExceeded(self.max_depth));
        }

        self.depth += 1;
        let result = self.read_element_body(&name, body_end);
        self.depth -= 1;

        match result {
            Ok(object) if self.pos == body_end => Ok(Some(object)),
            Ok(object) => {
                self.registry.release(object);
                Err(ReflectError::format(format!(
                    "element '{}' body length does not match its contents",
                    name
                )))
            }
            Err(e) => {
                if !e.is_structural() {
                    self.pos = body_end;
                }
                Err(e)
            }
        }
    }

    fn read_element_body(&mut self, name: &str, body_end: usize) -> Result<ObjectPtr> {
        let class = self
            .registry
            .resolve_class(name)
            .ok_or_else(|| ReflectError::UnknownType(name.to_string()))?;
        let mut object = self
            .registry
            .create_instance_of(&class)
            .ok_or_else(|| ReflectError::NotCreatable(name.to_string()))?;

        if let Err(e) = self.read_fields(&class, &mut *object, body_end) {
            self.registry.release(object);
            return Err(e);
        }

        // top-level elements are post-processed once the whole archive is read
        if self.depth > 1 {
            object.post_deserialize_object();
        }
        Ok(object)
    }

    fn read_fields(&mut self, class: &Class, object: &mut dyn Object, body_end: usize) -> Result<()> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(ReflectError::format(format!(
                "negative field count {} in '{}'",
                count,
                class.name()
            )));
        }

        for _ in 0..count {
            let id = self.read_u32()?;
            let persisted = self.read_str()?;
            let length = self.read_u32()? as usize;
            let payload_end = self.pos + length;
            if payload_end > body_end {
                return Err(ReflectError::format(format!(
                    "field {:#010x} of '{}' overruns its element",
                    id,
                    class.name()
                )));
            }

            match class.find_field_by_id(id) {
                Some(field) => {
                    log::trace!("Read {}::{} ({})", class.name(), field.name(), persisted);
                    let outer_end = core::mem::replace(&mut self.end, payload_end);
                    let result = self.read_field(field, &persisted, object);
                    self.end = outer_end;
                    self.pos = payload_end;

                    match result {
                        Ok(()) => {}
                        Err(e @ ReflectError::DepthExceeded(_)) => return Err(e),
                        Err(e) => log::warn!(
                            "Keeping the default of {}::{}: {}",
                            class.name(),
                            field.name(),
                            e
                        ),
                    }
                }
                None => {
                    log::warn!("Skipping unknown field {:#010x} of '{}'", id, class.name());
                    self.pos = payload_end;
                }
            }
        }

        if self.read_i32()? != TERMINATOR {
            return Err(ReflectError::format(format!(
                "missing terminator after the fields of '{}'",
                class.name()
            )));
        }
        Ok(())
    }

    /// Read one field payload into `object`, converting scalars whose kind changed
    fn read_field(&mut self, field: &Field, persisted: &str, object: &mut dyn Object) -> Result<()> {
        let kind = field.kind();
        if persisted == kind.to_string() {
            let value = self.read_value(kind)?;
            return field.set(object, value);
        }

        let latent = DataKind::scalar_named(persisted)
            .ok_or_else(|| ReflectError::mismatch(kind.to_string(), persisted))?;
        let value = self
            .read_value(&latent)?
            .cast(kind)
            .ok_or_else(|| ReflectError::mismatch(kind.to_string(), persisted))?;
        log::debug!("Converted {} from {} to {}", field.name(), persisted, kind);
        field.set(object, value)
    }

    /// Type name of the element record starting at `at`, for diagnostics
    fn name_at(&self, at: usize) -> String {
        let mut peek = BinaryReader::new(self.registry, self.input);
        peek.pos = at;
        peek.read_str().unwrap_or_default()
    }
}

/// Encode a complete binary archive
pub fn write(
    registry: &Registry,
    objects: &[&dyn Object],
    version: &Version,
    sink: Option<&mut dyn StatusSink>,
) -> Result<Vec<u8>> {
    let mut progress = Progress::new(sink);
    progress.state(ArchiveState::Starting, 0);

    let count = i32::try_from(objects.len()).map_err(|_| ReflectError::format("too many elements"))?;
    let mut body = BinaryWriter::new(registry);
    body.write_element(Some(version as &dyn Object))?;
    body.write_i32(count);
    for (index, object) in objects.iter().enumerate() {
        body.write_element(Some(*object))?;
        progress.element(index + 1, objects.len());
    }
    body.write_i32(TERMINATOR);

    progress.state(ArchiveState::PostProcessing, 100);
    let body = body.into_inner();
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&BYTE_ORDER_MARK.to_le_bytes());
    out.extend_from_slice(&CURRENT_FORMAT.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    progress.state(ArchiveState::Complete, 100);
    Ok(out)
}

/// Decode a complete binary archive
pub fn read(registry: &Registry, bytes: &[u8], sink: Option<&mut dyn StatusSink>) -> Result<ArchiveContents> {
    if bytes.len() < HEADER_LEN {
        return Err(ReflectError::format("stream is shorter than the archive header"));
    }

    let bom = u16::from_le_bytes([bytes[0], bytes[1]]);
    if bom == BYTE_ORDER_MARK.swap_bytes() {
        return Err(ReflectError::format("big-endian archives are not supported"));
    }
    if bom != BYTE_ORDER_MARK {
        return Err(ReflectError::format(format!("invalid byte order mark {:#06x}", bom)));
    }

    let format = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    if format > CURRENT_FORMAT {
        return Err(ReflectError::UnsupportedVersion {
            found: format,
            current: CURRENT_FORMAT,
        });
    }

    let expected = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let body = &bytes[HEADER_LEN..];
    let found = crc32fast::hash(body);
    if found != expected {
        return Err(ReflectError::Checksum { expected, found });
    }

    let mut progress = Progress::new(sink);
    progress.state(ArchiveState::Starting, 0);

    let mut reader = BinaryReader::new(registry, body);
    let version = take_version(registry, reader.read_element()?)?;

    let count = reader.read_i32()?;
    if count < 0 {
        return Err(ReflectError::format(format!("negative element count {}", count)));
    }
    let total = count as usize;

    let mut contents = ArchiveContents::new(version);
    for index in 0..total {
        let start = reader.position();
        match reader.read_element() {
            Ok(Some(element)) => contents.elements.push(element),
            Ok(None) => log::debug!("Null top-level element {}", index),
            Err(error) if !error.is_structural() => {
                let failure = ElementFailure {
                    index,
                    type_name: reader.name_at(start),
                    error,
                };
                progress.exception(&failure);
                contents.failures.push(failure);
            }
            Err(error) => return Err(error),
        }
        progress.element(index + 1, total);
    }

    if reader.read_i32()? != TERMINATOR {
        return Err(ReflectError::format("missing archive terminator"));
    }

    finish(&mut contents, &mut progress);
    Ok(contents)
}

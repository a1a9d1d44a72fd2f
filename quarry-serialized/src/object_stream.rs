use crate::type_tree::TypeTree;
use crate::{EndianReader, EndianWriter, SerializedError, SerializedResult, MAX_TREE_DEPTH};
use quarry_base::hashing::HashMap;
use std::collections::BTreeMap;

/// Object payloads start at addresses aligned to this boundary; the padding
/// in between is zero-filled and carries no meaning.
pub const OBJECT_ALIGNMENT: usize = 8;

/// Maps a reference id between instance-id and local-file-id space. `None`
/// means the target is not part of the current batch and not an external.
pub type RemapFn<'a> = &'a mut dyn FnMut(i64) -> Option<i64>;

/// What to do with a reference that the remap function cannot resolve.
///
/// The historical behavior is to null such references without a trace, which
/// can mask missing-dependency bugs. `NullAndCount` keeps the lossy-but-safe
/// outcome while making it observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapPolicy {
    NullSilently,
    NullAndCount,
    Fail,
}

impl Default for RemapPolicy {
    fn default() -> Self {
        RemapPolicy::NullAndCount
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RemapStats {
    pub remapped_references: u64,
    pub suppressed_references: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Primitive {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
}

fn primitive_of(type_name: &str) -> Option<Primitive> {
    Some(match type_name {
        "SInt8" | "char" => Primitive::I8,
        "UInt8" => Primitive::U8,
        "SInt16" | "short" => Primitive::I16,
        "UInt16" | "unsigned short" => Primitive::U16,
        "SInt32" | "int" => Primitive::I32,
        "UInt32" | "unsigned int" => Primitive::U32,
        "SInt64" | "long long" => Primitive::I64,
        "UInt64" | "unsigned long long" | "FileSize" => Primitive::U64,
        "float" => Primitive::F32,
        "double" => Primitive::F64,
        "bool" => Primitive::Bool,
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Scalar {
    Int(i128),
    Float(f64),
}

fn read_scalar(
    reader: &mut EndianReader,
    primitive: Primitive,
) -> SerializedResult<Scalar> {
    Ok(match primitive {
        Primitive::I8 => Scalar::Int(reader.read_u8()? as i8 as i128),
        Primitive::U8 => Scalar::Int(reader.read_u8()? as i128),
        Primitive::I16 => Scalar::Int(reader.read_i16()? as i128),
        Primitive::U16 => Scalar::Int(reader.read_u16()? as i128),
        Primitive::I32 => Scalar::Int(reader.read_i32()? as i128),
        Primitive::U32 => Scalar::Int(reader.read_u32()? as i128),
        Primitive::I64 => Scalar::Int(reader.read_i64()? as i128),
        Primitive::U64 => Scalar::Int(reader.read_u64()? as i128),
        Primitive::F32 => Scalar::Float(reader.read_f32()? as f64),
        Primitive::F64 => Scalar::Float(reader.read_f64()?),
        Primitive::Bool => Scalar::Int(reader.read_u8()? as i128),
    })
}

/// Registered conversion rules: any integer width to any other (truncating),
/// int<->float, f32<->f64.
fn write_scalar(
    writer: &mut EndianWriter,
    primitive: Primitive,
    value: Scalar,
) {
    let as_int = match value {
        Scalar::Int(v) => v,
        Scalar::Float(v) => v as i128,
    };
    let as_float = match value {
        Scalar::Int(v) => v as f64,
        Scalar::Float(v) => v,
    };
    match primitive {
        Primitive::I8 => writer.write_u8(as_int as i8 as u8),
        Primitive::U8 => writer.write_u8(as_int as u8),
        Primitive::I16 => writer.write_i16(as_int as i16),
        Primitive::U16 => writer.write_u16(as_int as u16),
        Primitive::I32 => writer.write_i32(as_int as i32),
        Primitive::U32 => writer.write_u32(as_int as u32),
        Primitive::I64 => writer.write_i64(as_int as i64),
        Primitive::U64 => writer.write_u64(as_int as u64),
        Primitive::F32 => writer.write_f32(as_float as f32),
        Primitive::F64 => writer.write_f64(as_float),
        Primitive::Bool => writer.write_u8((as_int != 0) as u8),
    }
}

/// Parsed field data held between the read pass (stored layout) and the
/// write pass (current layout). Safe-path reads go through this; the fast
/// path bypasses it entirely.
#[derive(Debug, Clone)]
pub(crate) enum FieldValue {
    Scalar(Scalar),
    Reference { file_index: i32, object_id: i64 },
    Array(Vec<FieldValue>),
    Record(Vec<(String, FieldValue)>),
    Opaque(Vec<u8>),
}

pub(crate) fn parse_value(
    reader: &mut EndianReader,
    stored: &TypeTree,
    depth: usize,
) -> SerializedResult<FieldValue> {
    if depth > MAX_TREE_DEPTH {
        return Err(SerializedError::Corrupt(format!(
            "type tree deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }

    let value = if stored.is_reference() {
        let file_index = reader.read_i32()?;
        let object_id = reader.read_i64()?;
        FieldValue::Reference {
            file_index,
            object_id,
        }
    } else if stored.is_array() {
        if stored.children.len() != 2 {
            return Err(SerializedError::Corrupt(format!(
                "array field {:?} does not have [size, element] children",
                stored.field_name
            )));
        }
        let count = match parse_value(reader, &stored.children[0], depth + 1)? {
            FieldValue::Scalar(Scalar::Int(v)) => v,
            _ => {
                return Err(SerializedError::Corrupt(format!(
                    "array field {:?} has a non-integer size",
                    stored.field_name
                )))
            }
        };
        if count < 0 || count as usize > reader.remaining() {
            return Err(SerializedError::Corrupt(format!(
                "array field {:?} declares {} elements with {} bytes left",
                stored.field_name,
                count,
                reader.remaining()
            )));
        }
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            elements.push(parse_value(reader, &stored.children[1], depth + 1)?);
        }
        FieldValue::Array(elements)
    } else if !stored.children.is_empty() {
        let mut fields = Vec::with_capacity(stored.children.len());
        for child in &stored.children {
            fields.push((
                child.field_name.clone(),
                parse_value(reader, child, depth + 1)?,
            ));
        }
        FieldValue::Record(fields)
    } else if let Some(primitive) = primitive_of(&stored.type_name) {
        FieldValue::Scalar(read_scalar(reader, primitive)?)
    } else if stored.byte_size >= 0 {
        // Unknown leaf type: carry the raw bytes through
        FieldValue::Opaque(reader.read_bytes(stored.byte_size as usize)?.to_vec())
    } else {
        return Err(SerializedError::Corrupt(format!(
            "field {:?} of type {:?} has no children and no known size",
            stored.field_name, stored.type_name
        )));
    };

    if stored.needs_align() {
        reader.align(4)?;
    }
    Ok(value)
}

struct Emitter<'a> {
    remap: RemapFn<'a>,
    policy: RemapPolicy,
    stats: &'a mut RemapStats,
}

impl<'a> Emitter<'a> {
    /// Writes `value` in the shape `current` describes. A `None` value (or a
    /// shape mismatch) produces zeroed defaults, which is how fields that
    /// did not exist when the data was stored come into being.
    fn emit(
        &mut self,
        writer: &mut EndianWriter,
        current: &TypeTree,
        value: Option<&FieldValue>,
        depth: usize,
    ) -> SerializedResult<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(SerializedError::Corrupt(format!(
                "type tree deeper than {} levels",
                MAX_TREE_DEPTH
            )));
        }

        if current.is_reference() {
            match value {
                Some(&FieldValue::Reference {
                    file_index,
                    object_id,
                }) => self.emit_reference(writer, file_index, object_id)?,
                _ => {
                    writer.write_i32(0);
                    writer.write_i64(0);
                }
            }
        } else if current.is_array() {
            if current.children.len() != 2 {
                return Err(SerializedError::Corrupt(format!(
                    "array field {:?} does not have [size, element] children",
                    current.field_name
                )));
            }
            let size_primitive =
                primitive_of(&current.children[0].type_name).unwrap_or(Primitive::I32);
            match value {
                Some(FieldValue::Array(elements)) => {
                    write_scalar(writer, size_primitive, Scalar::Int(elements.len() as i128));
                    if current.children[0].needs_align() {
                        writer.align(4);
                    }
                    for element in elements {
                        self.emit(writer, &current.children[1], Some(element), depth + 1)?;
                    }
                }
                _ => {
                    write_scalar(writer, size_primitive, Scalar::Int(0));
                    if current.children[0].needs_align() {
                        writer.align(4);
                    }
                }
            }
        } else if !current.children.is_empty() {
            let fields = match value {
                Some(FieldValue::Record(fields)) => Some(fields),
                _ => None,
            };
            for child in &current.children {
                let child_value = fields.and_then(|fields| {
                    fields
                        .iter()
                        .find(|(name, _)| *name == child.field_name)
                        .map(|(_, value)| value)
                });
                self.emit(writer, child, child_value, depth + 1)?;
            }
        } else if let Some(primitive) = primitive_of(&current.type_name) {
            let scalar = match value {
                Some(&FieldValue::Scalar(scalar)) => scalar,
                _ => Scalar::Int(0),
            };
            write_scalar(writer, primitive, scalar);
        } else if current.byte_size >= 0 {
            match value {
                Some(FieldValue::Opaque(bytes)) if bytes.len() == current.byte_size as usize => {
                    writer.write_bytes(bytes);
                }
                _ => {
                    for _ in 0..current.byte_size {
                        writer.write_u8(0);
                    }
                }
            }
        } else {
            return Err(SerializedError::Corrupt(format!(
                "field {:?} of type {:?} has no children and no known size",
                current.field_name, current.type_name
            )));
        }

        if current.needs_align() {
            writer.align(4);
        }
        Ok(())
    }

    fn emit_reference(
        &mut self,
        writer: &mut EndianWriter,
        file_index: i32,
        object_id: i64,
    ) -> SerializedResult<()> {
        // Null stays null; references into another file are externally
        // resolvable and pass through untouched.
        if object_id == 0 || file_index != 0 {
            writer.write_i32(file_index);
            writer.write_i64(object_id);
            return Ok(());
        }

        match (self.remap)(object_id) {
            Some(mapped) => {
                self.stats.remapped_references += 1;
                writer.write_i32(0);
                writer.write_i64(mapped);
            }
            None => match self.policy {
                RemapPolicy::Fail => {
                    return Err(SerializedError::UnresolvedReference(object_id));
                }
                RemapPolicy::NullSilently => {
                    writer.write_i32(0);
                    writer.write_i64(0);
                }
                RemapPolicy::NullAndCount => {
                    self.stats.suppressed_references += 1;
                    log::debug!(
                        "nulling reference to {} (not in write batch, not external)",
                        object_id
                    );
                    writer.write_i32(0);
                    writer.write_i64(0);
                }
            },
        }
        Ok(())
    }
}

/// Materializes one object's payload in the current in-memory layout.
///
/// Fast path: the stored layout matches the current layout byte for byte and
/// no work beyond a copy (plus reference remapping) is needed. Safe path:
/// the stored type tree is walked field by field, converting primitives and
/// remapping references as it goes.
///
/// `remap` converts local-file ids to process-wide instance ids here.
pub fn read_object_payload(
    data: &[u8],
    stored_tree: Option<&TypeTree>,
    current_tree: &TypeTree,
    swap_endian: bool,
    remap: RemapFn,
    policy: RemapPolicy,
    stats: &mut RemapStats,
) -> SerializedResult<Vec<u8>> {
    let stored = stored_tree.unwrap_or(current_tree);

    // Fast path: identical layout, no endian difference, nothing to remap
    if !swap_endian && stored.same_layout(current_tree) && !current_tree.contains_reference() {
        return Ok(data.to_vec());
    }

    let mut reader = EndianReader::new(data, swap_endian);
    let value = parse_value(&mut reader, stored, 0)?;
    if !reader.is_at_end() {
        // A short read means the tree and the data disagree: a missed field,
        // an extra field, or plain corruption
        return Err(SerializedError::Corrupt(format!(
            "object read ended at byte {} of {}",
            reader.position(),
            data.len()
        )));
    }

    let mut writer = EndianWriter::new(false);
    let mut emitter = Emitter {
        remap,
        policy,
        stats,
    };
    emitter.emit(&mut writer, current_tree, Some(&value), 0)?;
    Ok(writer.into_vec())
}

/// Serializes one object's in-memory payload for storage, remapping every
/// embedded reference from instance-id space to local-file-id space.
pub fn write_object_payload(
    payload: &[u8],
    tree: &TypeTree,
    swap_endian: bool,
    remap: RemapFn,
    policy: RemapPolicy,
    stats: &mut RemapStats,
) -> SerializedResult<Vec<u8>> {
    if !swap_endian && !tree.contains_reference() {
        return Ok(payload.to_vec());
    }

    let mut reader = EndianReader::new(payload, false);
    let value = parse_value(&mut reader, tree, 0)?;
    if !reader.is_at_end() {
        return Err(SerializedError::Corrupt(format!(
            "object payload ended at byte {} of {}",
            reader.position(),
            payload.len()
        )));
    }

    let mut writer = EndianWriter::new(swap_endian);
    let mut emitter = Emitter {
        remap,
        policy,
        stats,
    };
    emitter.emit(&mut writer, tree, Some(&value), 0)?;
    Ok(writer.into_vec())
}

/// Type-id assignment for a file being written. The common case is one tree
/// shared by every instance of a class (positive type ids); object kinds
/// whose shape is data-driven (user-authored behaviors) get per-instance
/// trees (negative type ids), shared by structural equality so the type
/// table does not grow without bound when many instances look alike.
pub struct TypeTreeRegistry {
    trees: BTreeMap<i32, TypeTree>,
    shared_by_class: HashMap<i16, i32>,
    next_shared_id: i32,
    next_per_instance_id: i32,
}

impl Default for TypeTreeRegistry {
    fn default() -> Self {
        TypeTreeRegistry {
            trees: BTreeMap::new(),
            shared_by_class: HashMap::default(),
            next_shared_id: 1,
            next_per_instance_id: -1,
        }
    }
}

impl TypeTreeRegistry {
    /// Rebuilds a registry from a decoded type table (reopening a file for
    /// append). Class associations are re-derived structurally.
    pub fn from_type_table(table: &BTreeMap<i32, TypeTree>) -> Self {
        let next_shared_id = table.keys().copied().filter(|id| *id > 0).max().unwrap_or(0) + 1;
        let next_per_instance_id = table.keys().copied().filter(|id| *id < 0).min().unwrap_or(0) - 1;
        TypeTreeRegistry {
            trees: table.clone(),
            shared_by_class: HashMap::default(),
            next_shared_id,
            next_per_instance_id,
        }
    }

    pub fn type_id_for(
        &mut self,
        class_id: i16,
        tree: &TypeTree,
        data_driven_shape: bool,
    ) -> i32 {
        if !data_driven_shape {
            if let Some(&type_id) = self.shared_by_class.get(&class_id) {
                if self.trees[&type_id].same_layout(tree) {
                    return type_id;
                }
                // Shape changed under us; fall through to per-instance
            } else {
                // Try to adopt a structurally identical shared tree first
                for (&type_id, existing) in self.trees.iter().filter(|(id, _)| **id > 0) {
                    if existing.same_layout(tree) {
                        self.shared_by_class.insert(class_id, type_id);
                        return type_id;
                    }
                }
                let type_id = self.next_shared_id;
                self.next_shared_id += 1;
                self.trees.insert(type_id, tree.clone());
                self.shared_by_class.insert(class_id, type_id);
                return type_id;
            }
        }

        for (&type_id, existing) in self.trees.iter().filter(|(id, _)| **id < 0) {
            if existing.same_layout(tree) {
                return type_id;
            }
        }
        let type_id = self.next_per_instance_id;
        self.next_per_instance_id -= 1;
        self.trees.insert(type_id, tree.clone());
        type_id
    }

    pub fn tree(
        &self,
        type_id: i32,
    ) -> Option<&TypeTree> {
        self.trees.get(&type_id)
    }

    pub fn type_table(&self) -> &BTreeMap<i32, TypeTree> {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_remap() -> impl FnMut(i64) -> Option<i64> {
        |id| Some(id)
    }

    fn fixed_tree() -> TypeTree {
        TypeTree::record(
            "Transform",
            "Base",
            vec![
                TypeTree::leaf("SInt32", "m_Index", 4),
                TypeTree::leaf("float", "m_Scale", 4),
            ],
        )
    }

    #[test]
    fn fast_path_same_layout_copies_bytes() {
        let tree = fixed_tree();
        let mut writer = EndianWriter::new(false);
        writer.write_i32(7);
        writer.write_f32(2.5);
        let data = writer.into_vec();

        let mut stats = RemapStats::default();
        let mut remap = no_remap();
        let out = read_object_payload(
            &data,
            Some(&tree),
            &tree,
            false,
            &mut remap,
            RemapPolicy::default(),
            &mut stats,
        )
        .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn safe_path_widens_and_reorders_fields() {
        // Stored: {m_Index: i32, m_Scale: f32}
        let stored = fixed_tree();
        // Current: {m_Scale: f64, m_Index: i64, m_New: i32}
        let current = TypeTree::record(
            "Transform",
            "Base",
            vec![
                TypeTree::leaf("double", "m_Scale", 8),
                TypeTree::leaf("SInt64", "m_Index", 8),
                TypeTree::leaf("SInt32", "m_New", 4),
            ],
        );

        let mut writer = EndianWriter::new(false);
        writer.write_i32(-3);
        writer.write_f32(1.5);
        let data = writer.into_vec();

        let mut stats = RemapStats::default();
        let mut remap = no_remap();
        let out = read_object_payload(
            &data,
            Some(&stored),
            &current,
            false,
            &mut remap,
            RemapPolicy::default(),
            &mut stats,
        )
        .unwrap();

        let mut reader = EndianReader::new(&out, false);
        assert_eq!(reader.read_f64().unwrap(), 1.5);
        assert_eq!(reader.read_i64().unwrap(), -3);
        assert_eq!(reader.read_i32().unwrap(), 0); // new field defaults
        assert!(reader.is_at_end());
    }

    #[test]
    fn safe_path_reads_strings_and_arrays() {
        let tree = TypeTree::record(
            "Named",
            "Base",
            vec![
                TypeTree::string("m_Name"),
                TypeTree::array("m_Values", TypeTree::leaf("SInt32", "data", 4)),
            ],
        );

        let mut writer = EndianWriter::new(false);
        writer.write_i32(3);
        writer.write_bytes(b"foo");
        writer.align(4); // string array is align-flagged
        writer.write_i32(2);
        writer.write_i32(10);
        writer.write_i32(20);
        let data = writer.into_vec();

        let mut stats = RemapStats::default();
        let mut remap = no_remap();
        // Different current layout (f64 values) to force the safe path
        let current = TypeTree::record(
            "Named",
            "Base",
            vec![
                TypeTree::string("m_Name"),
                TypeTree::array("m_Values", TypeTree::leaf("double", "data", 8)),
            ],
        );
        let out = read_object_payload(
            &data,
            Some(&tree),
            &current,
            false,
            &mut remap,
            RemapPolicy::default(),
            &mut stats,
        )
        .unwrap();

        let mut reader = EndianReader::new(&out, false);
        assert_eq!(reader.read_i32().unwrap(), 3);
        assert_eq!(reader.read_bytes(3).unwrap(), b"foo");
        reader.align(4).unwrap();
        assert_eq!(reader.read_i32().unwrap(), 2);
        assert_eq!(reader.read_f64().unwrap(), 10.0);
        assert_eq!(reader.read_f64().unwrap(), 20.0);
    }

    #[test]
    fn cursor_mismatch_is_structural_corruption() {
        let tree = fixed_tree();
        let mut writer = EndianWriter::new(false);
        writer.write_i32(7);
        writer.write_f32(2.5);
        writer.write_u32(0xdead); // trailing garbage the tree does not cover
        let data = writer.into_vec();

        let mut stats = RemapStats::default();
        let mut remap = no_remap();
        // Force the safe path with an endian swap
        let result = read_object_payload(
            &data,
            Some(&tree),
            &tree,
            true,
            &mut remap,
            RemapPolicy::default(),
            &mut stats,
        );
        assert!(matches!(result, Err(SerializedError::Corrupt(_))));
    }

    fn reference_tree() -> TypeTree {
        TypeTree::record(
            "Renderer",
            "Base",
            vec![
                TypeTree::leaf("SInt32", "m_Enabled", 4),
                TypeTree::reference("PPtr<Material>", "m_Material"),
            ],
        )
    }

    fn reference_payload(
        file_index: i32,
        object_id: i64,
    ) -> Vec<u8> {
        let mut writer = EndianWriter::new(false);
        writer.write_i32(1);
        writer.write_i32(file_index);
        writer.write_i64(object_id);
        writer.into_vec()
    }

    #[test]
    fn references_are_remapped_on_write() {
        let tree = reference_tree();
        let payload = reference_payload(0, 42);

        let mut stats = RemapStats::default();
        let mut remap = |id: i64| if id == 42 { Some(7) } else { None };
        let out = write_object_payload(
            &payload,
            &tree,
            false,
            &mut remap,
            RemapPolicy::default(),
            &mut stats,
        )
        .unwrap();

        let mut reader = EndianReader::new(&out, false);
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_i32().unwrap(), 0);
        assert_eq!(reader.read_i64().unwrap(), 7);
        assert_eq!(stats.remapped_references, 1);
    }

    #[test]
    fn unresolved_reference_is_nulled_and_counted() {
        let tree = reference_tree();
        let payload = reference_payload(0, 42);

        let mut stats = RemapStats::default();
        let mut remap = |_: i64| None;
        let out = write_object_payload(
            &payload,
            &tree,
            false,
            &mut remap,
            RemapPolicy::NullAndCount,
            &mut stats,
        )
        .unwrap();

        let mut reader = EndianReader::new(&out, false);
        reader.read_i32().unwrap();
        assert_eq!(reader.read_i32().unwrap(), 0);
        assert_eq!(reader.read_i64().unwrap(), 0);
        assert_eq!(stats.suppressed_references, 1);
    }

    #[test]
    fn unresolved_reference_can_fail_loudly() {
        let tree = reference_tree();
        let payload = reference_payload(0, 42);

        let mut stats = RemapStats::default();
        let mut remap = |_: i64| None;
        let result = write_object_payload(
            &payload,
            &tree,
            false,
            &mut remap,
            RemapPolicy::Fail,
            &mut stats,
        );
        assert!(matches!(
            result,
            Err(SerializedError::UnresolvedReference(42))
        ));
    }

    #[test]
    fn external_references_pass_through_unmapped() {
        let tree = reference_tree();
        let payload = reference_payload(2, 1234);

        let mut stats = RemapStats::default();
        let mut remap = |_: i64| None;
        let out = write_object_payload(
            &payload,
            &tree,
            false,
            &mut remap,
            RemapPolicy::Fail,
            &mut stats,
        )
        .unwrap();

        let mut reader = EndianReader::new(&out, false);
        reader.read_i32().unwrap();
        assert_eq!(reader.read_i32().unwrap(), 2);
        assert_eq!(reader.read_i64().unwrap(), 1234);
    }

    #[test]
    fn registry_shares_one_tree_per_class() {
        let mut registry = TypeTreeRegistry::default();
        let tree = fixed_tree();
        let a = registry.type_id_for(4, &tree, false);
        let b = registry.type_id_for(4, &tree, false);
        assert_eq!(a, b);
        assert!(a > 0);
    }

    #[test]
    fn registry_dedupes_per_instance_trees_structurally() {
        let mut registry = TypeTreeRegistry::default();
        let tree = fixed_tree();
        let a = registry.type_id_for(114, &tree, true);
        let b = registry.type_id_for(114, &tree.clone(), true);
        assert_eq!(a, b);
        assert!(a < 0);

        let different = TypeTree::record(
            "Behaviour",
            "Base",
            vec![TypeTree::leaf("SInt32", "m_Other", 4)],
        );
        let c = registry.type_id_for(114, &different, true);
        assert_ne!(a, c);
    }
}

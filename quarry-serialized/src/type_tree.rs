use crate::{EndianReader, EndianWriter, SerializedError, SerializedResult};

/// Field (or one of its children) is a homogeneous array: the children are
/// [size, element] and the element repeats `size` times in the data.
pub const FLAG_IS_ARRAY: u32 = 1 << 0;
/// Field is a reference to another object: {file index: i32, object id: i64}.
pub const FLAG_IS_REFERENCE: u32 = 1 << 1;
/// Re-align the stream to 4 bytes after this field.
pub const FLAG_ALIGN_BYTES: u32 = 1 << 14;
pub const FLAG_ANY_CHILD_USES_ALIGN_BYTES: u32 = 1 << 15;

/// Type trees are shallow in practice; anything deeper than this is treated
/// as corruption rather than recursed into.
pub const MAX_TREE_DEPTH: usize = 64;

/// Recursive descriptor of an object's field layout. Stored next to the data
/// so files stay readable after the in-memory class layout has changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTree {
    pub type_name: String,
    pub field_name: String,
    /// Byte size of this field, or -1 when it depends on the data (arrays,
    /// strings).
    pub byte_size: i32,
    pub flags: u32,
    pub children: Vec<TypeTree>,
}

impl TypeTree {
    pub fn leaf(
        type_name: &str,
        field_name: &str,
        byte_size: i32,
    ) -> TypeTree {
        TypeTree {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            byte_size,
            flags: 0,
            children: Vec::default(),
        }
    }

    pub fn record(
        type_name: &str,
        field_name: &str,
        children: Vec<TypeTree>,
    ) -> TypeTree {
        TypeTree {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            byte_size: -1,
            flags: 0,
            children,
        }
    }

    /// Array node: children are the size field and the repeated element.
    pub fn array(
        field_name: &str,
        element: TypeTree,
    ) -> TypeTree {
        TypeTree {
            type_name: "Array".to_string(),
            field_name: field_name.to_string(),
            byte_size: -1,
            flags: FLAG_IS_ARRAY | FLAG_ALIGN_BYTES,
            children: vec![TypeTree::leaf("SInt32", "size", 4), element],
        }
    }

    /// String stored as an aligned array of bytes.
    pub fn string(field_name: &str) -> TypeTree {
        let mut tree = TypeTree::array(field_name, TypeTree::leaf("UInt8", "data", 1));
        tree.type_name = "string".to_string();
        tree
    }

    /// Reference to another object: {file index, object id}. The id half is
    /// what gets remapped between instance-id and local-file-id space.
    pub fn reference(
        type_name: &str,
        field_name: &str,
    ) -> TypeTree {
        TypeTree {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            byte_size: 12,
            flags: FLAG_IS_REFERENCE,
            children: vec![
                TypeTree::leaf("SInt32", "fileIndex", 4),
                TypeTree::leaf("SInt64", "objectId", 8),
            ],
        }
    }

    pub fn with_flags(
        mut self,
        flags: u32,
    ) -> TypeTree {
        self.flags |= flags;
        self
    }

    pub fn is_array(&self) -> bool {
        self.flags & FLAG_IS_ARRAY != 0
    }

    pub fn is_reference(&self) -> bool {
        self.flags & FLAG_IS_REFERENCE != 0
    }

    pub fn needs_align(&self) -> bool {
        self.flags & FLAG_ALIGN_BYTES != 0
    }

    /// Full structural equality. Used to share one type tree between many
    /// object instances with identical shapes.
    pub fn same_layout(
        &self,
        other: &TypeTree,
    ) -> bool {
        self == other
    }

    pub fn contains_reference(&self) -> bool {
        if self.is_reference() {
            return true;
        }
        self.children.iter().any(|c| c.contains_reference())
    }

    /// True when the layout has a statically known byte size, which enables
    /// the fast (copy-through) read path.
    pub fn is_fixed_layout(&self) -> bool {
        if self.is_array() {
            return false;
        }
        if self.children.is_empty() {
            return self.byte_size >= 0;
        }
        self.children.iter().all(|c| c.is_fixed_layout())
    }

    /// Iterative depth-first traversal yielding (dotted path, node) pairs,
    /// parents before children. No recursion; depth is bounded.
    pub fn iter_fields(&self) -> FieldIter {
        FieldIter {
            stack: vec![(self, String::new(), 0)],
        }
    }

    pub fn encode(
        &self,
        writer: &mut EndianWriter,
    ) {
        self.encode_at_depth(writer, 0);
    }

    fn encode_at_depth(
        &self,
        writer: &mut EndianWriter,
        depth: usize,
    ) {
        assert!(depth <= MAX_TREE_DEPTH, "type tree too deep to encode");
        writer.write_cstr(&self.type_name);
        writer.write_cstr(&self.field_name);
        writer.write_i32(self.byte_size);
        writer.write_u32(self.flags);
        writer.write_u32(self.children.len() as u32);
        for child in &self.children {
            child.encode_at_depth(writer, depth + 1);
        }
    }

    pub fn decode(reader: &mut EndianReader) -> SerializedResult<TypeTree> {
        Self::decode_at_depth(reader, 0)
    }

    fn decode_at_depth(
        reader: &mut EndianReader,
        depth: usize,
    ) -> SerializedResult<TypeTree> {
        if depth > MAX_TREE_DEPTH {
            return Err(SerializedError::Corrupt(format!(
                "type tree deeper than {} levels",
                MAX_TREE_DEPTH
            )));
        }
        let type_name = reader.read_cstr()?;
        let field_name = reader.read_cstr()?;
        let byte_size = reader.read_i32()?;
        let flags = reader.read_u32()?;
        let child_count = reader.read_u32()? as usize;
        // Each child needs at least the two terminators plus 12 bytes of
        // fixed fields; reject absurd counts before allocating.
        if child_count > reader.remaining() / 14 {
            return Err(SerializedError::Corrupt(format!(
                "type tree declares {} children with only {} bytes left",
                child_count,
                reader.remaining()
            )));
        }
        let mut children = Vec::with_capacity(child_count);
        for _ in 0..child_count {
            children.push(Self::decode_at_depth(reader, depth + 1)?);
        }
        Ok(TypeTree {
            type_name,
            field_name,
            byte_size,
            flags,
            children,
        })
    }
}

pub struct FieldIter<'a> {
    stack: Vec<(&'a TypeTree, String, usize)>,
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = (String, &'a TypeTree);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, parent_path, depth) = self.stack.pop()?;
        assert!(depth <= MAX_TREE_DEPTH, "type tree too deep to iterate");
        let path = if parent_path.is_empty() {
            node.field_name.clone()
        } else {
            format!("{}.{}", parent_path, node.field_name)
        };
        for child in node.children.iter().rev() {
            self.stack.push((child, path.clone(), depth + 1));
        }
        Some((path, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TypeTree {
        TypeTree::record(
            "Material",
            "Base",
            vec![
                TypeTree::string("m_Name"),
                TypeTree::leaf("float", "m_Shininess", 4),
                TypeTree::reference("PPtr<Shader>", "m_Shader"),
                TypeTree::array("m_Colors", TypeTree::leaf("float", "data", 4)),
            ],
        )
    }

    #[test]
    fn encode_decode_round_trip() {
        let tree = sample_tree();
        let mut writer = EndianWriter::new(false);
        tree.encode(&mut writer);
        let data = writer.into_vec();

        let mut reader = EndianReader::new(&data, false);
        let decoded = TypeTree::decode(&mut reader).unwrap();
        assert!(reader.is_at_end());
        assert!(decoded.same_layout(&tree));
    }

    #[test]
    fn iter_fields_yields_dotted_paths() {
        let tree = sample_tree();
        let paths: Vec<String> = tree.iter_fields().map(|(path, _)| path).collect();
        assert_eq!(paths[0], "Base");
        assert!(paths.contains(&"Base.m_Name".to_string()));
        assert!(paths.contains(&"Base.m_Shader.objectId".to_string()));
    }

    #[test]
    fn fixed_layout_detection() {
        assert!(TypeTree::leaf("SInt32", "x", 4).is_fixed_layout());
        assert!(TypeTree::reference("PPtr<Object>", "r").is_fixed_layout());
        assert!(!TypeTree::string("s").is_fixed_layout());
        assert!(!sample_tree().is_fixed_layout());
    }

    #[test]
    fn absurd_child_count_is_rejected() {
        let mut writer = EndianWriter::new(false);
        writer.write_cstr("T");
        writer.write_cstr("f");
        writer.write_i32(4);
        writer.write_u32(0);
        writer.write_u32(u32::MAX); // child count way past the buffer
        let data = writer.into_vec();

        let mut reader = EndianReader::new(&data, false);
        assert!(matches!(
            TypeTree::decode(&mut reader),
            Err(SerializedError::Corrupt(_))
        ));
    }

    #[test]
    fn contains_reference_sees_nested_references() {
        assert!(sample_tree().contains_reference());
        assert!(!TypeTree::string("s").contains_reference());
    }
}

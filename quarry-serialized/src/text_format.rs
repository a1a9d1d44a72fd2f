//! Line-oriented text rendition of a serialized file, used for
//! sidecar-class files that users keep under version control. Binary stays
//! the storage format for everything else; this format exists so diffs and
//! merges stay readable.

use crate::object_stream::{parse_value, FieldValue, Scalar};
use crate::type_tree::TypeTree;
use crate::{EndianReader, SerializedError, SerializedResult};
use quarry_base::LocalFileId;
use std::fmt::Write as _;

pub const TEXT_FORMAT_TAG: &str = "%QUARRY-TEXT 1";

/// One object to render into a text file.
pub struct TextObjectSource<'a> {
    pub local_id: LocalFileId,
    pub class_id: i16,
    pub tree: &'a TypeTree,
    /// Native-endian payload in the layout `tree` describes.
    pub payload: &'a [u8],
}

/// One object marker found by [`scan_text_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextObjectEntry {
    pub local_id: LocalFileId,
    pub class_id: i16,
    /// 1-based line number of the object marker.
    pub line: usize,
}

/// Result of a linear scan over a text file. Merge-conflict markers are
/// recorded rather than treated as fatal so a half-merged file can still be
/// inspected.
#[derive(Debug, Default)]
pub struct TextScanOutcome {
    pub objects: Vec<TextObjectEntry>,
    pub conflict_marker_lines: Vec<usize>,
}

impl TextScanOutcome {
    pub fn has_conflict_markers(&self) -> bool {
        !self.conflict_marker_lines.is_empty()
    }
}

pub fn encode_text_file(objects: &[TextObjectSource]) -> SerializedResult<String> {
    profiling::scope!("encode_text_file");
    let mut out = String::new();
    out.push_str(TEXT_FORMAT_TAG);
    out.push('\n');

    for object in objects {
        let mut reader = EndianReader::new(object.payload, false);
        let value = parse_value(&mut reader, object.tree, 0)?;
        if !reader.is_at_end() {
            return Err(SerializedError::Corrupt(format!(
                "object {:?} payload has {} trailing bytes",
                object.local_id,
                reader.remaining()
            )));
        }

        writeln!(out, "--- !{} &{}", object.class_id, object.local_id.0)
            .map_err(|e| SerializedError::StringError(e.to_string()))?;
        out.push_str(&object.tree.type_name);
        out.push_str(":\n");
        write_value(&mut out, object.tree, &value, 1);
    }
    Ok(out)
}

fn indent(
    out: &mut String,
    depth: usize,
) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn is_string(tree: &TypeTree) -> bool {
    tree.type_name == "string"
}

fn scalar_text(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Int(v) => format!("{}", v),
        Scalar::Float(v) => format!("{}", v),
    }
}

/// True when the field renders on a single `name: value` line.
fn is_inline(
    tree: &TypeTree,
    value: &FieldValue,
) -> bool {
    match value {
        FieldValue::Scalar(_) | FieldValue::Reference { .. } | FieldValue::Opaque(_) => true,
        FieldValue::Array(_) => is_string(tree),
        FieldValue::Record(_) => false,
    }
}

fn inline_text(
    tree: &TypeTree,
    value: &FieldValue,
) -> String {
    match value {
        FieldValue::Scalar(scalar) => scalar_text(scalar),
        FieldValue::Reference {
            file_index,
            object_id,
        } => format!("{{fileIndex: {}, objectId: {}}}", file_index, object_id),
        FieldValue::Opaque(bytes) => {
            let mut text = String::with_capacity(bytes.len() * 2);
            for byte in bytes {
                let _ = write!(text, "{:02x}", byte);
            }
            text
        }
        FieldValue::Array(elements) if is_string(tree) => {
            let mut bytes = Vec::with_capacity(elements.len());
            for element in elements {
                if let FieldValue::Scalar(Scalar::Int(v)) = element {
                    bytes.push(*v as u8);
                }
            }
            let text = String::from_utf8_lossy(&bytes);
            let mut quoted = String::with_capacity(text.len() + 2);
            quoted.push('"');
            for c in text.chars() {
                match c {
                    '"' => quoted.push_str("\\\""),
                    '\\' => quoted.push_str("\\\\"),
                    '\n' => quoted.push_str("\\n"),
                    c => quoted.push(c),
                }
            }
            quoted.push('"');
            quoted
        }
        _ => String::default(),
    }
}

fn write_value(
    out: &mut String,
    tree: &TypeTree,
    value: &FieldValue,
    depth: usize,
) {
    match value {
        FieldValue::Record(fields) => {
            for (index, (name, field_value)) in fields.iter().enumerate() {
                let child = tree.children.get(index);
                let child_tree = child.unwrap_or(tree);
                indent(out, depth);
                out.push_str(name);
                if is_inline(child_tree, field_value) {
                    out.push_str(": ");
                    out.push_str(&inline_text(child_tree, field_value));
                    out.push('\n');
                } else {
                    out.push_str(":\n");
                    write_value(out, child_tree, field_value, depth + 1);
                }
            }
        }
        FieldValue::Array(elements) => {
            let element_tree = tree.children.get(1).unwrap_or(tree);
            if elements.is_empty() {
                indent(out, depth);
                out.push_str("[]\n");
            }
            for element in elements {
                indent(out, depth);
                out.push_str("- ");
                if is_inline(element_tree, element) {
                    out.push_str(&inline_text(element_tree, element));
                    out.push('\n');
                } else {
                    out.push('\n');
                    write_value(out, element_tree, element, depth + 1);
                }
            }
        }
        other => {
            indent(out, depth);
            out.push_str(&inline_text(tree, other));
            out.push('\n');
        }
    }
}

/// Linear scan of a text file: verifies the format tag, indexes the object
/// markers, and records merge-conflict markers as warnings without aborting.
pub fn scan_text_file(text: &str) -> SerializedResult<TextScanOutcome> {
    profiling::scope!("scan_text_file");
    let mut lines = text.lines().enumerate();
    match lines.next() {
        Some((_, first)) if first.trim_end().starts_with("%QUARRY-TEXT") => {}
        _ => {
            return Err(SerializedError::Corrupt(
                "text file does not start with the format tag".to_string(),
            ))
        }
    }

    let mut outcome = TextScanOutcome::default();
    for (index, line) in lines {
        let line_number = index + 1;
        if line.starts_with("<<<<<<<") || line.starts_with("=======") || line.starts_with(">>>>>>>")
        {
            log::warn!(
                "merge conflict marker on line {}; file needs manual resolution",
                line_number
            );
            outcome.conflict_marker_lines.push(line_number);
            continue;
        }

        if let Some(marker) = line.strip_prefix("--- !") {
            let (class_text, id_text) = marker.split_once(" &").ok_or_else(|| {
                SerializedError::Corrupt(format!(
                    "malformed object marker on line {}: {:?}",
                    line_number, line
                ))
            })?;
            let class_id: i16 = class_text.trim().parse().map_err(|_| {
                SerializedError::Corrupt(format!(
                    "malformed class id on line {}: {:?}",
                    line_number, class_text
                ))
            })?;
            let local_id: i64 = id_text.trim().parse().map_err(|_| {
                SerializedError::Corrupt(format!(
                    "malformed local file id on line {}: {:?}",
                    line_number, id_text
                ))
            })?;
            outcome.objects.push(TextObjectEntry {
                local_id: LocalFileId(local_id),
                class_id,
                line: line_number,
            });
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EndianWriter;

    fn behavior_tree() -> TypeTree {
        TypeTree::record(
            "Behavior",
            "Base",
            vec![
                TypeTree::leaf("SInt32", "m_Enabled", 4),
                TypeTree::string("m_Name"),
                TypeTree::reference("Ref<Object>", "m_Target"),
            ],
        )
    }

    fn behavior_payload(
        enabled: i32,
        name: &str,
        target: i64,
    ) -> Vec<u8> {
        let mut writer = EndianWriter::new(false);
        writer.write_i32(enabled);
        writer.write_i32(name.len() as i32);
        for byte in name.bytes() {
            writer.write_u8(byte);
        }
        writer.align(4);
        writer.write_i32(0);
        writer.write_i64(target);
        writer.into_vec()
    }

    #[test]
    fn encode_then_scan_indexes_every_object() {
        let tree = behavior_tree();
        let payload_a = behavior_payload(1, "player", 42);
        let payload_b = behavior_payload(0, "camera", 0);
        let text = encode_text_file(&[
            TextObjectSource {
                local_id: LocalFileId(1),
                class_id: 114,
                tree: &tree,
                payload: &payload_a,
            },
            TextObjectSource {
                local_id: LocalFileId(3),
                class_id: 114,
                tree: &tree,
                payload: &payload_b,
            },
        ])
        .unwrap();

        assert!(text.starts_with(TEXT_FORMAT_TAG));
        assert!(text.contains("--- !114 &1"));
        assert!(text.contains("m_Name: \"player\""));
        assert!(text.contains("m_Target: {fileIndex: 0, objectId: 42}"));

        let outcome = scan_text_file(&text).unwrap();
        assert!(!outcome.has_conflict_markers());
        assert_eq!(outcome.objects.len(), 2);
        assert_eq!(outcome.objects[0].local_id, LocalFileId(1));
        assert_eq!(outcome.objects[1].local_id, LocalFileId(3));
        assert_eq!(outcome.objects[1].class_id, 114);
    }

    #[test]
    fn conflict_markers_are_reported_but_not_fatal() {
        let text = format!(
            "{}\n--- !114 &1\nBehavior:\n<<<<<<< HEAD\n  m_Enabled: 1\n=======\n  m_Enabled: 0\n>>>>>>> theirs\n--- !114 &2\nBehavior:\n  m_Enabled: 1\n",
            TEXT_FORMAT_TAG
        );
        let outcome = scan_text_file(&text).unwrap();
        assert_eq!(outcome.conflict_marker_lines, vec![4, 6, 8]);
        assert_eq!(outcome.objects.len(), 2);
    }

    #[test]
    fn missing_format_tag_is_corrupt() {
        assert!(matches!(
            scan_text_file("--- !114 &1\n"),
            Err(SerializedError::Corrupt(_))
        ));
    }

    #[test]
    fn malformed_marker_is_corrupt() {
        let text = format!("{}\n--- !notanumber &1\n", TEXT_FORMAT_TAG);
        assert!(matches!(
            scan_text_file(&text),
            Err(SerializedError::Corrupt(_))
        ));
    }

    #[test]
    fn array_fields_render_as_item_lines() {
        let tree = TypeTree::record(
            "WeightSet",
            "Base",
            vec![TypeTree::array(
                "m_Weights",
                TypeTree::leaf("float", "data", 4),
            )],
        );
        let mut writer = EndianWriter::new(false);
        writer.write_i32(2);
        writer.write_f32(1.5);
        writer.write_f32(2.5);
        let payload = writer.into_vec();

        let text = encode_text_file(&[TextObjectSource {
            local_id: LocalFileId(1),
            class_id: 7,
            tree: &tree,
            payload: &payload,
        }])
        .unwrap();
        assert!(text.contains("m_Weights:\n    - 1.5\n    - 2.5\n"));
    }
}

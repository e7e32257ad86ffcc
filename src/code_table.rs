//! Block code remapping between editions.
//!
//! A table is written as a flat string map, the way the remap files ship:
//!
//! ```text
//! "35:1"  -> "171:5"   specific: (35, 1) becomes (171, 5)
//! "95:3"  -> "241"     specific, target data defaults to 0
//! "125"   -> "157"     generic: any 125 becomes 157, data is kept
//! ```
//!
//! Specific `id:data` entries always win over a generic `id` entry.

use crate::chunk::{BlockCell, BlockData, BlockId, ChunkData};
use crate::request::RequestError;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CodeTableError {
    #[error("Malformed table key \"{0}\"")]
    Key(String),
    #[error("Malformed value \"{value}\" for key \"{key}\"")]
    Value { key: String, value: String },
    #[error("Invalid table document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A table value as it appears in a config document: either a bare number or text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Number(u64),
    Text(String),
}

impl RawCode {
    fn as_text(&self) -> String {
        match self {
            RawCode::Number(n) => n.to_string(),
            RawCode::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, RawCode>")]
pub struct CodeRemapTable {
    specific: FxHashMap<BlockCell, BlockCell>,
    generic: FxHashMap<BlockId, BlockId>,
}

impl CodeRemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.specific.is_empty() && self.generic.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specific.len() + self.generic.len()
    }

    pub fn insert_specific(&mut self, from: BlockCell, to: BlockCell) {
        self.specific.insert(from, to);
    }

    pub fn insert_generic(&mut self, from: BlockId, to: BlockId) {
        self.generic.insert(from, to);
    }

    /// Parses one `key -> value` pair and adds it to the table.
    pub fn insert_entry(&mut self, key: &str, value: &str) -> Result<(), CodeTableError> {
        let key = key.trim();
        let value = value.trim();
        let bad_value = || CodeTableError::Value {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key.split_once(':') {
            Some((id, data)) => {
                let from = parse_cell(id, data).ok_or_else(|| CodeTableError::Key(key.to_string()))?;
                let to = match value.split_once(':') {
                    Some((id, data)) => parse_cell(id, data),
                    None => value.parse().ok().map(|id| BlockCell::new(id, 0)),
                }
                .ok_or_else(bad_value)?;
                self.insert_specific(from, to);
            }
            None => {
                let from = key
                    .parse()
                    .map_err(|_| CodeTableError::Key(key.to_string()))?;
                let to = value.parse().map_err(|_| bad_value())?;
                self.insert_generic(from, to);
            }
        }
        Ok(())
    }

    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, CodeTableError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::new();
        for (key, value) in entries {
            table.insert_entry(key.as_ref(), value.as_ref())?;
        }
        Ok(table)
    }

    /// Parses a JSON object of `"id[:data]": "id[:data]"` entries. Values may be numbers.
    pub fn from_json(json: &str) -> Result<Self, CodeTableError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Looks up the replacement for one cell, or `None` when the cell is left as is.
    #[inline]
    pub fn translate(&self, cell: BlockCell) -> Option<BlockCell> {
        if let Some(&to) = self.specific.get(&cell) {
            return Some(to);
        }
        self.generic
            .get(&cell.id)
            .map(|&id| BlockCell::new(id, cell.data))
    }

    /// Rewrites every cell of `chunk` in place and returns how many cells matched an entry.
    pub fn remap_chunk(&self, chunk: &mut ChunkData) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut rewritten = 0;
        for (id, data) in chunk.cells_mut() {
            if let Some(to) = self.translate(BlockCell::new(*id, *data)) {
                *id = to.id;
                *data = to.data;
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Builds the reverse table. When several sources map to the same target the
    /// lowest source code wins.
    pub fn inverted(&self) -> Self {
        let mut specific: Vec<_> = self.specific.iter().map(|(&from, &to)| (to, from)).collect();
        specific.sort_by_key(|&(to, from)| (to.id, to.data, from.id, from.data));
        let mut generic: Vec<_> = self.generic.iter().map(|(&from, &to)| (to, from)).collect();
        generic.sort_unstable();

        let mut inverted = Self::new();
        for (to, from) in specific {
            inverted.specific.entry(to).or_insert(from);
        }
        for (to, from) in generic {
            inverted.generic.entry(to).or_insert(from);
        }
        inverted
    }
}

impl TryFrom<BTreeMap<String, RawCode>> for CodeRemapTable {
    type Error = CodeTableError;

    fn try_from(raw: BTreeMap<String, RawCode>) -> Result<Self, Self::Error> {
        Self::from_entries(raw.iter().map(|(k, v)| (k.as_str(), v.as_text())))
    }
}

fn parse_cell(id: &str, data: &str) -> Option<BlockCell> {
    let id: BlockId = id.trim().parse().ok()?;
    let data: BlockData = data.trim().parse().ok()?;
    Some(BlockCell::new(id, data))
}

// ─── Editions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    Java,
    Bedrock,
}

impl Edition {
    /// Accepts the usual spellings, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "je" | "java edition" | "java_edition" | "javaedition" => Some(Edition::Java),
            "be" | "bedrock edition" | "bedrock_edition" | "bedrockedition" | "pe"
            | "pocket edition" | "pocket_edition" | "pocketedition" => Some(Edition::Bedrock),
            _ => None,
        }
    }
}

/// The pair of tables used for cross-edition conversions.
#[derive(Debug, Clone, Default)]
pub struct EditionTables {
    pub java_to_bedrock: Arc<CodeRemapTable>,
    pub bedrock_to_java: Arc<CodeRemapTable>,
}

impl EditionTables {
    pub fn new(java_to_bedrock: CodeRemapTable, bedrock_to_java: CodeRemapTable) -> Self {
        Self {
            java_to_bedrock: Arc::new(java_to_bedrock),
            bedrock_to_java: Arc::new(bedrock_to_java),
        }
    }

    /// Picks the table for a `source -> target` edition pair.
    pub fn select(&self, source: &str, target: &str) -> Result<Arc<CodeRemapTable>, RequestError> {
        match (Edition::parse(source), Edition::parse(target)) {
            (Some(Edition::Java), Some(Edition::Bedrock)) => Ok(self.java_to_bedrock.clone()),
            (Some(Edition::Bedrock), Some(Edition::Java)) => Ok(self.bedrock_to_java.clone()),
            _ => Err(RequestError::EditionPair {
                from: source.to_string(),
                to: target.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkCoord;

    fn sample() -> CodeRemapTable {
        CodeRemapTable::from_entries([("35:1", "171:5"), ("35", "36"), ("95:3", "241")]).unwrap()
    }

    #[test]
    fn test_specific_beats_generic() {
        let table = sample();
        assert_eq!(
            table.translate(BlockCell::new(35, 1)),
            Some(BlockCell::new(171, 5))
        );
    }

    #[test]
    fn test_generic_keeps_data() {
        let table = sample();
        assert_eq!(
            table.translate(BlockCell::new(35, 7)),
            Some(BlockCell::new(36, 7))
        );
    }

    #[test]
    fn test_specific_value_without_data() {
        let table = sample();
        assert_eq!(
            table.translate(BlockCell::new(95, 3)),
            Some(BlockCell::new(241, 0))
        );
        assert_eq!(table.translate(BlockCell::new(95, 4)), None);
    }

    #[test]
    fn test_unmapped_is_none() {
        assert_eq!(sample().translate(BlockCell::new(1, 0)), None);
    }

    #[test]
    fn test_malformed_entries() {
        let mut table = CodeRemapTable::new();
        assert!(matches!(
            table.insert_entry("stone", "1"),
            Err(CodeTableError::Key(_))
        ));
        assert!(matches!(
            table.insert_entry("1:x", "1"),
            Err(CodeTableError::Key(_))
        ));
        assert!(matches!(
            table.insert_entry("1", "2:3"),
            Err(CodeTableError::Value { .. })
        ));
        assert!(matches!(
            table.insert_entry("1:0", "70000"),
            Err(CodeTableError::Value { .. })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_json_accepts_numbers() {
        let table = CodeRemapTable::from_json(r#"{ "1": 2, "3:1": "4:2" }"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.translate(BlockCell::new(1, 9)),
            Some(BlockCell::new(2, 9))
        );
        assert_eq!(
            table.translate(BlockCell::new(3, 1)),
            Some(BlockCell::new(4, 2))
        );
    }

    #[test]
    fn test_bundled_demo_table_loads() {
        let table = CodeRemapTable::from_json(include_str!("../demos/je_to_be.json")).unwrap();
        assert_eq!(table.len(), 11);
        assert_eq!(
            table.translate(BlockCell::new(188, 0)),
            Some(BlockCell::new(85, 1))
        );
        assert_eq!(table.translate(BlockCell::new(188, 1)), None);
        assert_eq!(
            table.translate(BlockCell::new(125, 3)),
            Some(BlockCell::new(157, 3))
        );
    }

    #[test]
    fn test_generic_key_rejects_data_value() {
        assert!(matches!(
            CodeRemapTable::from_json(r#"{ "125": "157", "188": "85:1" }"#),
            Err(CodeTableError::Json(_))
        ));
        let table = CodeRemapTable::from_json(r#"{ "125": "157", "188:0": "85:1" }"#).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remap_chunk_counts_matches() {
        let mut chunk = ChunkData::new(ChunkCoord::new(0, 0), 1);
        chunk.set_block(0, 0, 0, BlockCell::new(35, 1));
        chunk.set_block(1, 0, 0, BlockCell::new(35, 2));
        chunk.set_block(2, 0, 0, BlockCell::new(1, 0));

        let rewritten = sample().remap_chunk(&mut chunk);

        assert_eq!(rewritten, 2);
        assert_eq!(chunk.block(0, 0, 0), BlockCell::new(171, 5));
        assert_eq!(chunk.block(1, 0, 0), BlockCell::new(36, 2));
        assert_eq!(chunk.block(2, 0, 0), BlockCell::new(1, 0));
    }

    #[test]
    fn test_inverted() {
        let inverted = sample().inverted();
        assert_eq!(
            inverted.translate(BlockCell::new(171, 5)),
            Some(BlockCell::new(35, 1))
        );
        assert_eq!(
            inverted.translate(BlockCell::new(36, 4)),
            Some(BlockCell::new(35, 4))
        );
    }

    #[test]
    fn test_edition_aliases() {
        assert_eq!(Edition::parse("JE"), Some(Edition::Java));
        assert_eq!(Edition::parse("Java Edition"), Some(Edition::Java));
        assert_eq!(Edition::parse("pocket_edition"), Some(Edition::Bedrock));
        assert_eq!(Edition::parse("PE"), Some(Edition::Bedrock));
        assert_eq!(Edition::parse("console"), None);
    }

    #[test]
    fn test_edition_select() {
        let tables = EditionTables::new(sample(), CodeRemapTable::new());
        assert_eq!(tables.select("je", "be").unwrap().len(), 3);
        assert!(tables.select("be", "java_edition").unwrap().is_empty());
        assert!(matches!(
            tables.select("je", "je"),
            Err(RequestError::EditionPair { .. })
        ));
    }
}

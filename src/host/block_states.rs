use crate::error::NotecraftError;
use crate::protocol::paletted_container::ceil_log2;
use crate::types::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const NOTE_BLOCK: &str = "note_block";

/// One entry of a `blocks.json` block report
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockReport {
    name: String,
    min_state_id: u32,
    max_state_id: u32,
    default_state: u32,
    #[serde(default)]
    states: Vec<PropertyReport>,
}

#[derive(Debug, Deserialize)]
struct PropertyReport {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    num_values: u32,
    #[serde(default)]
    values: Vec<serde_json::Value>,
}

/// A block state property and its values in state ID order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateProperty {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockType {
    pub name: String,
    pub min_state_id: u32,
    pub max_state_id: u32,
    pub default_state: u32,
    pub properties: Vec<StateProperty>,
}

impl BlockType {
    /// Property values of one of this block's states, None if the ID belongs to another block.
    pub fn properties_of(&self, state_id: u32) -> Option<Vec<(&str, &str)>> {
        if state_id < self.min_state_id || state_id > self.max_state_id {
            return None;
        }
        let mut offset = (state_id - self.min_state_id) as usize;
        let mut result = Vec::with_capacity(self.properties.len());
        for property in self.properties.iter().rev() {
            let count = property.values.len();
            result.push((property.name.as_str(), property.values[offset % count].as_str()));
            offset /= count;
        }
        result.reverse();
        Some(result)
    }

    /// State ID for the given property values. Properties that aren't listed keep their value
    /// from the default state.
    pub fn state_id(&self, properties: &[(&str, &str)]) -> Option<u32> {
        let defaults = self.properties_of(self.default_state)?;
        let mut id = 0usize;
        for (property, (_, default_value)) in self.properties.iter().zip(defaults) {
            let value = properties
                .iter()
                .find(|(name, _)| *name == property.name)
                .map(|(_, value)| *value)
                .unwrap_or(default_value);
            let index = property.values.iter().position(|v| v == value)?;
            id = id * property.values.len() + index;
        }
        Some(self.min_state_id + id as u32)
    }
}

/// Global block state table of the running server. Maps block names and property values to
/// the state IDs used on the wire.
#[derive(Debug, Clone)]
pub struct BlockStateRegistry {
    /// Sorted by `min_state_id`
    blocks: Vec<BlockType>,
    by_name: HashMap<String, usize>,
    total_states: u32,
}

fn property_values(report: &PropertyReport) -> Result<Vec<String>> {
    let values: Vec<String> = match report.kind.as_str() {
        // Booleans enumerate true first
        "bool" => vec!["true".to_owned(), "false".to_owned()],
        _ => report
            .values
            .iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    };

    if values.len() != report.num_values as usize || values.is_empty() {
        return Err(NotecraftError::ConfigError(format!(
            "Property '{}' declares {} values but lists {}",
            report.name,
            report.num_values,
            values.len()
        )));
    }
    Ok(values)
}

impl BlockStateRegistry {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let reports: Vec<BlockReport> = serde_json::from_str(json)?;
        let mut blocks = Vec::with_capacity(reports.len());

        for report in reports {
            let properties = report
                .states
                .iter()
                .map(|property| {
                    Ok(StateProperty {
                        name: property.name.clone(),
                        values: property_values(property)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let expected: u64 = properties.iter().map(|p| p.values.len() as u64).product();
            if report.max_state_id < report.min_state_id
                || (report.max_state_id - report.min_state_id) as u64 + 1 != expected
                || report.default_state < report.min_state_id
                || report.default_state > report.max_state_id
            {
                return Err(NotecraftError::ConfigError(format!(
                    "Block '{}' has an inconsistent state range {}..={}",
                    report.name, report.min_state_id, report.max_state_id
                )));
            }

            blocks.push(BlockType {
                name: report.name,
                min_state_id: report.min_state_id,
                max_state_id: report.max_state_id,
                default_state: report.default_state,
                properties,
            });
        }

        blocks.sort_by_key(|block| block.min_state_id);
        for pair in blocks.windows(2) {
            if pair[1].min_state_id <= pair[0].max_state_id {
                return Err(NotecraftError::ConfigError(format!(
                    "State ranges of '{}' and '{}' overlap",
                    pair[0].name, pair[1].name
                )));
            }
        }

        let by_name = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.name.clone(), index))
            .collect();
        let total_states = blocks.last().map(|b| b.max_state_id + 1).unwrap_or(0);

        Ok(Self {
            blocks,
            by_name,
            total_states,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn block(&self, name: &str) -> Option<&BlockType> {
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        self.by_name.get(name).map(|index| &self.blocks[*index])
    }

    /// The block owning a state ID
    pub fn block_of(&self, state_id: u32) -> Option<&BlockType> {
        let index = self
            .blocks
            .partition_point(|block| block.min_state_id <= state_id)
            .checked_sub(1)?;
        let block = &self.blocks[index];
        (state_id <= block.max_state_id).then_some(block)
    }

    pub fn block_name(&self, state_id: u32) -> Option<&str> {
        self.block_of(state_id).map(|block| block.name.as_str())
    }

    pub fn properties_of(&self, state_id: u32) -> Option<Vec<(&str, &str)>> {
        self.block_of(state_id)?.properties_of(state_id)
    }

    pub fn property(&self, state_id: u32, name: &str) -> Option<&str> {
        self.properties_of(state_id)?
            .into_iter()
            .find(|(property, _)| *property == name)
            .map(|(_, value)| value)
    }

    pub fn state_id(&self, name: &str, properties: &[(&str, &str)]) -> Option<u32> {
        self.block(name)?.state_id(properties)
    }

    pub fn default_state(&self, name: &str) -> Option<u32> {
        self.block(name).map(|block| block.default_state)
    }

    pub fn total_states(&self) -> u32 {
        self.total_states
    }

    /// Bits per entry of a block-state container using the global palette
    pub fn direct_bits(&self) -> u8 {
        ceil_log2(self.total_states as usize)
    }

    pub fn is_air(&self, state_id: u32) -> bool {
        matches!(
            self.block_name(state_id),
            Some("air") | Some("cave_air") | Some("void_air")
        )
    }

    pub fn is_note_block(&self, state_id: u32) -> bool {
        self.block_name(state_id) == Some(NOTE_BLOCK)
    }

    pub fn note_block_state_id(&self, instrument: &str, note: u8, powered: bool) -> Option<u32> {
        let note = note.to_string();
        self.state_id(
            NOTE_BLOCK,
            &[
                ("instrument", instrument),
                ("note", &note),
                ("powered", if powered { "true" } else { "false" }),
            ],
        )
    }

    pub fn default_note_block_id(&self) -> Option<u32> {
        self.default_state(NOTE_BLOCK)
    }
}

#[cfg(test)]
pub(crate) fn fixture() -> BlockStateRegistry {
    let json = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/blocks.json"));
    BlockStateRegistry::from_json_str(json).expect("fixture block report is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_note_block_state_ids() {
        let registry = fixture();
        assert_eq!(registry.default_note_block_id(), Some(539));
        assert_eq!(registry.note_block_state_id("harp", 0, true), Some(538));
        assert_eq!(registry.note_block_state_id("harp", 0, false), Some(539));
        assert_eq!(registry.note_block_state_id("harp", 1, false), Some(541));
        assert_eq!(registry.note_block_state_id("basedrum", 0, true), Some(588));
        assert_eq!(
            registry.note_block_state_id("custom_head", 24, false),
            Some(1687)
        );
        assert_eq!(registry.note_block_state_id("kazoo", 0, false), None);
        assert_eq!(registry.note_block_state_id("harp", 25, false), None);
    }

    #[test]
    fn test_describe_state() {
        let registry = fixture();
        assert_eq!(registry.block_name(541), Some("note_block"));
        assert_eq!(
            registry.properties_of(541).unwrap(),
            vec![("instrument", "harp"), ("note", "1"), ("powered", "false")]
        );
        assert_eq!(registry.property(5772, "layers"), Some("1"));
        assert_eq!(registry.property(5773, "layers"), Some("2"));
        assert!(registry.is_note_block(1687));
        assert!(!registry.is_note_block(1688));
        assert!(registry.is_air(12958));
        assert!(!registry.is_air(1));
    }

    #[test]
    fn test_gaps_resolve_to_nothing() {
        let registry = fixture();
        assert_eq!(registry.block_name(2), None);
        assert_eq!(registry.block_name(1_000_000), None);
        assert_eq!(registry.total_states(), 12959);
        assert_eq!(registry.direct_bits(), 14);
    }

    #[test]
    fn test_partial_properties_use_defaults() {
        let registry = fixture();
        assert_eq!(registry.state_id("minecraft:chest", &[]), Some(2955));
        assert_eq!(
            registry.state_id("chest", &[("facing", "east"), ("waterlogged", "true")]),
            Some(2954 + 3 * 6)
        );
    }

    #[test]
    fn test_inconsistent_report_is_rejected() {
        let json = r#"[{"name": "stone", "minStateId": 1, "maxStateId": 3, "defaultState": 1}]"#;
        assert_matches!(
            BlockStateRegistry::from_json_str(json),
            Err(NotecraftError::ConfigError(_))
        );

        let overlapping = r#"[
            {"name": "a", "minStateId": 0, "maxStateId": 0, "defaultState": 0},
            {"name": "b", "minStateId": 0, "maxStateId": 0, "defaultState": 0}
        ]"#;
        assert_matches!(
            BlockStateRegistry::from_json_str(overlapping),
            Err(NotecraftError::ConfigError(_))
        );
    }
}

use crate::blocks::definition::{CustomBlock, ItemKeys};
use crate::blocks::noteblock::NoteblockState;
use crate::blocks::snapshot::PersistedBlockRecord;
use crate::error::NotecraftError;
use crate::host::item::{ItemRegistry, ItemStack};
use crate::logger::{log, LogSeverity};
use crate::types::Result;
use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn validate_id(id: &str) -> std::result::Result<(), String> {
    if id.trim().is_empty() {
        return Err("Key cannot be empty!".to_owned());
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(
            "Key should only contain alphanumeric characters, underlines, and hyphens!".to_owned(),
        );
    }
    Ok(())
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<String, Arc<dyn CustomBlock>>,
    by_type: HashMap<TypeId, Arc<dyn CustomBlock>>,
    by_state: BTreeMap<NoteblockState, Arc<dyn CustomBlock>>,
    /// Registration order
    ordered: Vec<Arc<dyn CustomBlock>>,
}

/// Collects custom blocks while the plugin enables. Frozen into a [`BlockRegistry`] once
/// every block is in.
pub struct BlockRegistryBuilder {
    keys: ItemKeys,
    indexes: Indexes,
}

impl BlockRegistryBuilder {
    pub fn new(keys: ItemKeys) -> Self {
        Self {
            keys,
            indexes: Indexes::default(),
        }
    }

    /// Registers the block built by `factory`. The block's item is registered in `items`
    /// under the same ID, and removed again if the block is rejected.
    pub fn register<T, F>(&mut self, items: &mut dyn ItemRegistry, factory: F) -> Result<Arc<T>>
    where
        T: CustomBlock,
        F: FnOnce() -> T,
    {
        let block = Arc::new(factory());
        self.register_dyn(items, block.clone())?;
        Ok(block)
    }

    pub fn register_dyn(
        &mut self,
        items: &mut dyn ItemRegistry,
        block: Arc<dyn CustomBlock>,
    ) -> Result<()> {
        let id = block.block_id().to_owned();
        items
            .register_item(&id, block.base_material())
            .map_err(|err| match err {
                err @ NotecraftError::RegistrationError(_) => err,
                other => NotecraftError::RegistrationError(other.to_string()),
            })?;

        if let Err(msg) = self.check(&block) {
            items.deregister_item(&id);
            return Err(NotecraftError::RegistrationError(msg));
        }

        let type_id = block.as_ref().as_any().type_id();
        let state = block.noteblock_state();
        self.indexes.by_id.insert(id.clone(), block.clone());
        self.indexes.by_type.insert(type_id, block.clone());
        self.indexes.by_state.insert(state, block.clone());
        self.indexes.ordered.push(block);

        log(
            format!("Registered custom block '{}' as {}", id, state),
            LogSeverity::Debug,
        );
        Ok(())
    }

    /// Registers blocks in order, stopping at the first rejected one.
    pub fn register_all(
        &mut self,
        items: &mut dyn ItemRegistry,
        blocks: Vec<Arc<dyn CustomBlock>>,
    ) -> Result<()> {
        for block in blocks {
            self.register_dyn(items, block)?;
        }
        Ok(())
    }

    fn check(&self, block: &Arc<dyn CustomBlock>) -> std::result::Result<(), String> {
        let id = block.block_id();
        let state = block.noteblock_state();
        validate_id(id)?;

        if self.indexes.by_id.contains_key(id)
            || self
                .indexes
                .by_type
                .contains_key(&block.as_ref().as_any().type_id())
        {
            return Err(
                "This item has already been registered! Did you accidentally use the same key twice?"
                    .to_owned(),
            );
        }

        if let Some(owner) = self.indexes.by_state.get(&state) {
            return Err(format!(
                "Noteblock state of {} has already been registered by {}.",
                state,
                owner.block_id()
            ));
        }

        if state.is_default() {
            return Err("The default noteblock states (PIANO_0_POWERED and PIANO_0_UNPOWERED) \
                        are reserved, and cannot be registered as custom blocks."
                .to_owned());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.indexes.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.ordered.is_empty()
    }

    pub fn freeze(self) -> Arc<BlockRegistry> {
        Arc::new(BlockRegistry {
            keys: self.keys,
            indexes: self.indexes,
        })
    }
}

/// Every registered custom block. Immutable, shared between the main thread and the network
/// threads.
pub struct BlockRegistry {
    keys: ItemKeys,
    indexes: Indexes,
}

impl BlockRegistry {
    pub fn item_keys(&self) -> &ItemKeys {
        &self.keys
    }

    /// None for an empty ID
    pub fn find_by_id(&self, id: &str) -> Option<Arc<dyn CustomBlock>> {
        if id.is_empty() {
            return None;
        }
        self.indexes.by_id.get(id).cloned()
    }

    pub fn find_by_type<T: CustomBlock>(&self) -> Result<Arc<T>> {
        let block = self.indexes.by_type.get(&TypeId::of::<T>()).ok_or_else(|| {
            NotecraftError::NotRegistered(format!(
                "Class {} isn't registered. Ensure that your block is being registered on enable!",
                type_name::<T>()
            ))
        })?;

        block
            .clone()
            .into_any_arc()
            .downcast::<T>()
            .map_err(|instance: Arc<dyn Any + Send + Sync>| {
                NotecraftError::WrongInstance(format!(
                    "Instance of {:?} couldn't be cast to {}. Are you sure that you've registered \
                     your block correctly?",
                    instance.as_ref().type_id(),
                    type_name::<T>()
                ))
            })
    }

    /// The block `item` places, if any
    pub fn find_by_held_item(&self, item: &ItemStack) -> Option<Arc<dyn CustomBlock>> {
        if item.is_empty() {
            return None;
        }
        self.indexes
            .ordered
            .iter()
            .find(|block| block.is_block_item(item, &self.keys))
            .cloned()
    }

    pub fn find_by_snapshot_record(
        &self,
        record: &PersistedBlockRecord,
    ) -> Option<Arc<dyn CustomBlock>> {
        self.find_by_id(record.block_type())
    }

    pub fn find_by_state(&self, state: &NoteblockState) -> Option<Arc<dyn CustomBlock>> {
        self.indexes.by_state.get(state).cloned()
    }

    /// Registered blocks in registration order
    pub fn registered(&self) -> Vec<Arc<dyn CustomBlock>> {
        self.indexes.ordered.clone()
    }

    pub fn has_id(&self, id: &str) -> bool {
        !id.is_empty() && self.indexes.by_id.contains_key(id)
    }

    pub fn has_type<T: CustomBlock>(&self) -> bool {
        self.indexes.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn has_state(&self, state: &NoteblockState) -> bool {
        self.indexes.by_state.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.indexes.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.ordered.is_empty()
    }
}

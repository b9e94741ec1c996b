use crate::error::NotecraftError;
use crate::host::container::PersistentDataContainer;
use crate::types::Result;
use std::collections::HashMap;

/// An item stack as seen by the plugin: its material, amount and tag data
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub material: String,
    pub amount: u8,
    pub custom_model_data: Option<i32>,
    pub display_name: Option<String>,
    pub tags: PersistentDataContainer,
}

impl ItemStack {
    pub fn new(material: &str, amount: u8) -> Self {
        Self {
            material: material.to_owned(),
            amount,
            custom_model_data: None,
            display_name: None,
            tags: PersistentDataContainer::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new("air", 0)
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0 || matches!(self.material.as_str(), "air" | "cave_air" | "void_air")
    }
}

/// The general item registry custom blocks are also registered in
pub trait ItemRegistry {
    /// Registers an item ID. Fails if the ID is taken.
    fn register_item(&mut self, id: &str, material: &str) -> Result<()>;

    /// Removes an item ID. Returns whether it was registered.
    fn deregister_item(&mut self, id: &str) -> bool;

    fn is_item_registered(&self, id: &str) -> bool;
}

/// In-memory [`ItemRegistry`]
#[derive(Debug, Default)]
pub struct ItemIndex {
    items: HashMap<String, String>,
}

impl ItemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn material_of(&self, id: &str) -> Option<&str> {
        self.items.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemRegistry for ItemIndex {
    fn register_item(&mut self, id: &str, material: &str) -> Result<()> {
        if self.items.contains_key(id) {
            return Err(NotecraftError::RegistrationError(format!(
                "Item '{}' has already been registered",
                id
            )));
        }
        self.items.insert(id.to_owned(), material.to_owned());
        Ok(())
    }

    fn deregister_item(&mut self, id: &str) -> bool {
        self.items.remove(id).is_some()
    }

    fn is_item_registered(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }
}

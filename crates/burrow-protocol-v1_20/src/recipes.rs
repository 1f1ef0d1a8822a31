use crate::items::ItemRewriter;
use burrow_protocol_core::types::{Bool, FlatItem, FlatItemArray, Float, Str, VarInt};
use burrow_protocol_core::{
    element_count, resize_collection, Direction, PacketWrapper, Retain, TransformError,
    TransformResult,
};
use burrow_types::strip_minecraft_namespace;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What to do with a recipe type that has no handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownRecipePolicy {
    /// Fail the packet.
    #[default]
    Reject,
    /// Forward the type and ID and assume nothing follows them.
    AssumeNoPayload,
}

/// Reads the body of one recipe, after its type and ID.
pub type RecipeHandler = fn(&RecipeRewriter, &mut PacketWrapper) -> TransformResult<()>;

/// Recipe types whose body is only a crafting category.
const CATEGORY_ONLY: &[&str] = &[
    "crafting_special_armordye",
    "crafting_special_bookcloning",
    "crafting_special_mapcloning",
    "crafting_special_mapextending",
    "crafting_special_firework_rocket",
    "crafting_special_firework_star",
    "crafting_special_firework_star_fade",
    "crafting_special_tippedarrow",
    "crafting_special_bannerduplicate",
    "crafting_special_shielddecoration",
    "crafting_special_shulkerboxcoloring",
    "crafting_special_suspiciousstew",
    "crafting_special_repairitem",
    "crafting_decorated_pot",
];

const COOKING: &[&str] = &["smelting", "blasting", "smoking", "campfire_cooking"];

/// Rewrites the Update Recipes list for 1.20 clients.
pub struct RecipeRewriter {
    items: ItemRewriter,
    handlers: HashMap<&'static str, RecipeHandler>,
    /// Types 1.20 no longer has. Their handler consumes the body without emitting it.
    removed: HashMap<&'static str, RecipeHandler>,
    unknown: UnknownRecipePolicy,
}

impl RecipeRewriter {
    pub fn new(items: ItemRewriter, unknown: UnknownRecipePolicy) -> Self {
        let mut handlers: HashMap<&'static str, RecipeHandler> = HashMap::new();
        handlers.insert("crafting_shapeless", Self::crafting_shapeless);
        handlers.insert("crafting_shaped", Self::crafting_shaped);
        handlers.insert("stonecutting", Self::stonecutting);
        handlers.insert("smithing_transform", Self::smithing_transform);
        handlers.insert("smithing_trim", Self::smithing_trim);
        for cooking in COOKING {
            handlers.insert(*cooking, Self::cooking);
        }
        for special in CATEGORY_ONLY {
            handlers.insert(*special, Self::category_only);
        }

        let mut removed: HashMap<&'static str, RecipeHandler> = HashMap::new();
        removed.insert("smithing", Self::skip_legacy_smithing);

        Self {
            items,
            handlers,
            removed,
            unknown,
        }
    }

    pub fn handles(&self, recipe_type: &str) -> bool {
        let key = strip_minecraft_namespace(recipe_type);
        self.handlers.contains_key(key) || self.removed.contains_key(key)
    }

    /// The Update Recipes body: a counted list of `(type, id, body)`.
    pub fn handle_declare_recipes(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        let kept = resize_collection(wrapper, |wrapper| self.handle_recipe(wrapper))?;
        debug!("Forwarding {} recipes", kept);
        Ok(())
    }

    fn handle_recipe(&self, wrapper: &mut PacketWrapper) -> TransformResult<Retain> {
        let type_key = wrapper.read(Str)?;
        let recipe_type = strip_minecraft_namespace(&type_key);

        if let Some(skip) = self.removed.get(recipe_type).copied() {
            skip(self, wrapper)?;
            return Ok(Retain::Drop);
        }

        let handler = match self.handlers.get(recipe_type).copied() {
            Some(handler) => Some(handler),
            None if self.unknown == UnknownRecipePolicy::AssumeNoPayload => {
                warn!("Unknown recipe type {}, forwarding without a body", type_key);
                None
            }
            None => {
                return Err(TransformError::UnmappedDiscriminant {
                    kind: "recipe type",
                    value: type_key.clone(),
                })
            }
        };

        wrapper.write(Str, type_key);
        wrapper.passthrough(Str)?; // Recipe ID
        if let Some(handler) = handler {
            handler(self, wrapper)?;
        }
        Ok(Retain::Keep)
    }

    fn ingredient(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        self.items.passthrough_ingredient(wrapper)
    }

    fn result(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        self.items.passthrough_item(wrapper, Direction::Clientbound)
    }

    fn crafting_shapeless(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        wrapper.passthrough(Str)?; // Group
        wrapper.passthrough(VarInt)?; // Category
        let ingredients = wrapper.passthrough(VarInt)?;
        for _ in 0..element_count(ingredients)? {
            self.ingredient(wrapper)?;
        }
        self.result(wrapper)
    }

    fn crafting_shaped(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        let width = element_count(wrapper.passthrough(VarInt)?)?;
        let height = element_count(wrapper.passthrough(VarInt)?)?;
        wrapper.passthrough(Str)?; // Group
        wrapper.passthrough(VarInt)?; // Category
        for _ in 0..width * height {
            self.ingredient(wrapper)?;
        }
        self.result(wrapper)?;
        wrapper.passthrough(Bool)?; // Show notification
        Ok(())
    }

    fn cooking(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        wrapper.passthrough(Str)?; // Group
        wrapper.passthrough(VarInt)?; // Category
        self.ingredient(wrapper)?;
        self.result(wrapper)?;
        wrapper.passthrough(Float)?; // Experience
        wrapper.passthrough(VarInt)?; // Cooking time
        Ok(())
    }

    fn stonecutting(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        wrapper.passthrough(Str)?; // Group
        self.ingredient(wrapper)?;
        self.result(wrapper)
    }

    fn smithing_transform(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        self.ingredient(wrapper)?; // Template
        self.ingredient(wrapper)?; // Base
        self.ingredient(wrapper)?; // Addition
        self.result(wrapper)
    }

    fn smithing_trim(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        self.ingredient(wrapper)?; // Template
        self.ingredient(wrapper)?; // Base
        self.ingredient(wrapper) // Addition
    }

    fn category_only(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        wrapper.passthrough(VarInt)?;
        Ok(())
    }

    fn skip_legacy_smithing(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        let id = wrapper.read(Str)?;
        wrapper.read(FlatItemArray)?; // Base
        wrapper.read(FlatItemArray)?; // Addition
        wrapper.read(FlatItem)?; // Result
        debug!("Dropped legacy smithing recipe {}", id);
        Ok(())
    }
}

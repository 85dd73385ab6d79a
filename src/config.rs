//! Host-tunable settings for script nodes.

/// Which function catalog a script node exposes beyond the shared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogFlavor {
    /// Nodes are placed with explicit coordinates and sizes.
    #[default]
    Absolute,
    /// Nodes are arranged by row and column containers.
    Layout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub flavor: CatalogFlavor,
    /// Script function run right after a successful compile, if it exists.
    pub entry_point: String,
    pub unit_name: String,
    pub default_font: String,
    /// Sprite frame shown when a script asks for one that does not exist.
    pub fallback_frame: String,
    pub fallback_texture: String,
    pub button_label_scale: f32,
    /// Id given to the root of a hot-reloaded node.
    pub node_id: String,
    pub z_order: i32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            flavor: CatalogFlavor::Absolute,
            entry_point: "main".to_string(),
            unit_name: "TinyNode".to_string(),
            default_font: "bigFont.fnt".to_string(),
            fallback_frame: "exMark_001.png".to_string(),
            fallback_texture: "GJ_square01.png".to_string(),
            button_label_scale: 0.7,
            node_id: "tiny-node".to_string(),
            z_order: 99999,
        }
    }
}

impl NodeConfig {
    pub fn with_flavor(mut self, flavor: CatalogFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn with_unit_name(mut self, name: impl Into<String>) -> Self {
        self.unit_name = name.into();
        self
    }

    pub fn with_default_font(mut self, font: impl Into<String>) -> Self {
        self.default_font = font.into();
        self
    }

    pub fn with_fallback_frame(mut self, frame: impl Into<String>) -> Self {
        self.fallback_frame = frame.into();
        self
    }

    pub fn with_fallback_texture(mut self, texture: impl Into<String>) -> Self {
        self.fallback_texture = texture.into();
        self
    }

    pub fn with_button_label_scale(mut self, scale: f32) -> Self {
        self.button_label_scale = scale;
        self
    }

    pub fn with_node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = id.into();
        self
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }
}

//! The node graph.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::action::{Action, RunningAction};
use crate::error::SceneError;
use crate::handle::SceneHandle;
use crate::node::{
    Axis, Label, Layout, MenuCallback, Node, NodeId, NodeKind, Point, Rgba, Size, TextInput,
};
use crate::resources::Resources;

/// Called once per frame with the frame time.
pub type TickCallback = Rc<dyn Fn(&SceneHandle, f32)>;

struct Scheduled {
    owner: NodeId,
    callback: TickCallback,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Generational arena of nodes plus a root, resources and a scheduler.
///
/// Destroyed slots are reused with a bumped generation, so a stale
/// [`NodeId`] never reaches a new node.
pub struct Scene {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    root: NodeId,
    resources: Resources,
    scheduled: Vec<Scheduled>,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(Size::new(569.0, 320.0), Resources::default())
    }
}

impl Scene {
    /// A scene whose root fills a window of `window` size.
    pub fn new(window: Size, resources: Resources) -> Self {
        let mut scene = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            resources,
            scheduled: Vec::new(),
        };
        let root = scene.create(NodeKind::Node);
        if let Some(node) = scene.get_mut(root) {
            node.content_size = window;
            node.anchor = Point::default();
        }
        scene.root = root;
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn window_size(&self) -> Size {
        self.get(self.root).map_or(Size::ZERO, |n| n.content_size)
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn create_sized(&mut self, kind: NodeKind, size: Size) -> NodeId {
        let id = self.create(kind);
        if let Some(node) = self.get_mut(id) {
            node.content_size = size;
        }
        id
    }

    /// A label sized from the font metrics. Unknown fonts measure as zero.
    pub fn create_label(&mut self, text: &str, font: &str) -> NodeId {
        let size = self.resources.measure(text, font);
        self.create_sized(
            NodeKind::Label(Label {
                text: text.to_string(),
                font: font.to_string(),
            }),
            size,
        )
    }

    pub fn create_sprite(&mut self, frame: &str) -> NodeId {
        let size = self.resources.frame_size(frame).unwrap_or(Size::ZERO);
        self.create_sized(
            NodeKind::Sprite {
                frame: frame.to_string(),
            },
            size,
        )
    }

    pub fn create_panel(&mut self, texture: &str, size: Size) -> NodeId {
        self.create_sized(
            NodeKind::Panel {
                texture: texture.to_string(),
            },
            size,
        )
    }

    pub fn create_menu_item(&mut self, callback: Option<MenuCallback>, size: Size) -> NodeId {
        self.create_sized(NodeKind::MenuItem { callback }, size)
    }

    pub fn create_text_input(&mut self, placeholder: &str, size: Size) -> NodeId {
        self.create_sized(
            NodeKind::TextInput(TextInput {
                text: String::new(),
                placeholder: placeholder.to_string(),
            }),
            size,
        )
    }

    pub fn create_layout(&mut self, axis: Axis, gap: f32) -> NodeId {
        self.create(NodeKind::Layout(Layout {
            axis,
            gap,
            padding: 0.0,
        }))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Like [`Scene::get`] but reports stale ids as an error.
    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.get(id).ok_or(SceneError::StaleNode { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.get_mut(id).ok_or(SceneError::StaleNode { id })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn child_by_tag(&self, parent: NodeId, tag: i32) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.get(child).is_some_and(|n| n.tag == tag))
    }

    pub fn child_by_id(&self, parent: NodeId, id: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.get(child).and_then(Node::id) == Some(id))
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) -> Result<(), SceneError> {
        self.node_mut(node)?.id = Some(id.to_string());
        Ok(())
    }

    // ========================================================================
    // Tree
    // ========================================================================

    /// Attach `child` as the last child of `parent`, detaching it first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node(child)?;
        self.node(parent)?;

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(SceneError::Cycle { parent, child });
            }
            cursor = self.parent(current);
        }

        self.remove_from_parent(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn remove_from_parent(&mut self, child: NodeId) -> Result<(), SceneError> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(());
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        Ok(())
    }

    /// Destroy `id` and its whole subtree. Returns how many nodes went away.
    pub fn destroy(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        // Ignoring the result is fine: `id` was just checked.
        let _ = self.remove_from_parent(id);

        let mut stack = vec![id];
        let mut destroyed = 0;
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(current.index);
                destroyed += 1;
            }
        }
        destroyed
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    fn missing(&self, id: NodeId, capability: &'static str) -> SceneError {
        match self.get(id) {
            Some(node) => SceneError::MissingCapability {
                id,
                kind: node.kind.name(),
                capability,
            },
            None => SceneError::StaleNode { id },
        }
    }

    pub fn rgba_mut(&mut self, id: NodeId) -> Result<&mut Rgba, SceneError> {
        if self.node(id)?.rgba.is_none() {
            return Err(self.missing(id, "color"));
        }
        self.node_mut(id)?
            .rgba
            .as_mut()
            .ok_or(SceneError::StaleNode { id })
    }

    pub fn label_mut(&mut self, id: NodeId) -> Result<&mut Label, SceneError> {
        if self.node(id)?.label().is_none() {
            return Err(self.missing(id, "text"));
        }
        match &mut self.node_mut(id)?.kind {
            NodeKind::Label(label) => Ok(label),
            _ => Err(SceneError::StaleNode { id }),
        }
    }

    /// Replace a label's text and resize it.
    pub fn set_label_text(&mut self, id: NodeId, text: &str) -> Result<(), SceneError> {
        let label = self.label_mut(id)?;
        label.text = text.to_string();
        self.refit_label(id)
    }

    /// Switch a label's font and resize it.
    pub fn set_label_font(&mut self, id: NodeId, font: &str) -> Result<(), SceneError> {
        let label = self.label_mut(id)?;
        label.font = font.to_string();
        self.refit_label(id)
    }

    fn refit_label(&mut self, id: NodeId) -> Result<(), SceneError> {
        let size = match self.node(id)?.label() {
            Some(label) => self.resources.measure(&label.text, &label.font),
            None => return Ok(()),
        };
        self.node_mut(id)?.content_size = size;
        Ok(())
    }

    pub fn text_input_mut(&mut self, id: NodeId) -> Result<&mut TextInput, SceneError> {
        if self.node(id)?.text_input().is_none() {
            return Err(self.missing(id, "text input"));
        }
        match &mut self.node_mut(id)?.kind {
            NodeKind::TextInput(input) => Ok(input),
            _ => Err(SceneError::StaleNode { id }),
        }
    }

    pub fn layout_mut(&mut self, id: NodeId) -> Result<&mut Layout, SceneError> {
        if self.node(id)?.layout().is_none() {
            return Err(self.missing(id, "layout"));
        }
        match &mut self.node_mut(id)?.kind {
            NodeKind::Layout(layout) => Ok(layout),
            _ => Err(SceneError::StaleNode { id }),
        }
    }

    /// Turn a node into a menu item, keeping its tree position and transform.
    pub fn set_menu_callback(&mut self, id: NodeId, callback: MenuCallback) -> Result<(), SceneError> {
        let node = self.node_mut(id)?;
        node.kind = NodeKind::MenuItem {
            callback: Some(callback),
        };
        if node.rgba.is_none() {
            node.rgba = Some(Rgba::default());
        }
        Ok(())
    }

    pub fn menu_callback(&self, id: NodeId) -> Result<Option<MenuCallback>, SceneError> {
        match &self.node(id)?.kind {
            NodeKind::MenuItem { callback } => Ok(callback.clone()),
            _ => Err(self.missing(id, "activation")),
        }
    }

    // ========================================================================
    // Actions and scheduling
    // ========================================================================

    pub fn run_action(&mut self, id: NodeId, action: Action) -> Result<(), SceneError> {
        self.node_mut(id)?.actions.push(RunningAction::new(action));
        Ok(())
    }

    /// Advance every running action by `dt` seconds.
    pub fn advance_actions(&mut self, dt: f32) {
        for slot in &mut self.slots {
            let Some(node) = slot.node.as_mut() else {
                continue;
            };
            if node.actions.is_empty() {
                continue;
            }
            let mut actions = std::mem::take(&mut node.actions);
            actions.retain_mut(|action| !action.step(node, dt));
            node.actions = actions;
        }
    }

    /// Run `callback` every tick for as long as `owner` is alive.
    pub fn schedule(&mut self, owner: NodeId, callback: TickCallback) {
        self.scheduled.push(Scheduled { owner, callback });
    }

    /// Callbacks due this tick. Entries whose owner is gone are dropped.
    pub fn due_callbacks(&mut self) -> Vec<TickCallback> {
        let slots = &self.slots;
        self.scheduled.retain(|entry| {
            slots
                .get(entry.owner.index as usize)
                .is_some_and(|s| s.generation == entry.owner.generation && s.node.is_some())
        });
        self.scheduled
            .iter()
            .map(|entry| Rc::clone(&entry.callback))
            .collect()
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Put `id` at the centre of its parent's content area.
    pub fn center_in_parent(&mut self, id: NodeId) -> Result<(), SceneError> {
        let center = self
            .node(id)?
            .parent
            .and_then(|parent| self.get(parent))
            .map_or(Point::default(), |parent| parent.content_size.center());
        self.node_mut(id)?.position = center;
        Ok(())
    }

    /// Arrange the visible children of a layout node along its axis and
    /// size the node to fit them.
    pub fn relayout(&mut self, id: NodeId) -> Result<(), SceneError> {
        let layout = *self.layout_mut(id)?;

        let sizes: Vec<(NodeId, Size)> = self
            .children(id)
            .iter()
            .filter_map(|&child| {
                let node = self.get(child)?;
                node.visible.then(|| (child, node.scaled_size()))
            })
            .collect();

        let gaps = layout.gap * sizes.len().saturating_sub(1) as f32;
        let (main, cross) = sizes.iter().fold((0.0f32, 0.0f32), |(main, cross), (_, size)| match layout.axis {
            Axis::Row => (main + size.width, cross.max(size.height)),
            Axis::Column => (main + size.height, cross.max(size.width)),
        });
        let pad = layout.padding * 2.0;
        let total = match layout.axis {
            Axis::Row => Size::new(main + gaps + pad, cross + pad),
            Axis::Column => Size::new(cross + pad, main + gaps + pad),
        };
        self.node_mut(id)?.content_size = total;

        // Rows run left to right, columns top to bottom.
        let mut cursor = match layout.axis {
            Axis::Row => layout.padding,
            Axis::Column => total.height - layout.padding,
        };
        for (child, size) in sizes {
            let node = self.node_mut(child)?;
            node.position = match layout.axis {
                Axis::Row => {
                    let x = cursor + size.width * node.anchor.x;
                    cursor += size.width + layout.gap;
                    Point::new(x, total.height / 2.0)
                }
                Axis::Column => {
                    let y = cursor - size.height * (1.0 - node.anchor.y);
                    cursor -= size.height + layout.gap;
                    Point::new(total.width / 2.0, y)
                }
            };
        }
        Ok(())
    }

    // ========================================================================
    // Debugging
    // ========================================================================

    /// Indented outline of the subtree under `id`.
    pub fn describe_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.describe_into(id, 0, &mut out);
        out
    }

    fn describe_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        let _ = write!(
            out,
            "{:indent$}{:?} pos=({}, {}) size=({}, {})",
            "",
            node.kind,
            node.position.x,
            node.position.y,
            node.content_size.width,
            node.content_size.height,
            indent = depth * 2
        );
        if let Some(name) = node.id() {
            let _ = write!(out, " id={name}");
        }
        if node.tag != -1 {
            let _ = write!(out, " tag={}", node.tag);
        }
        if !node.visible {
            out.push_str(" hidden");
        }
        out.push('\n');
        for &child in &node.children {
            self.describe_into(child, depth + 1, out);
        }
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("live_nodes", &self.len())
            .field("free_count", &self.free_list.len())
            .field("scheduled", &self.scheduled.len())
            .finish()
    }
}

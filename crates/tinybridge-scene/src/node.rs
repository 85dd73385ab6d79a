//! Node identity and per-node data.

use std::fmt;
use std::rc::Rc;

use crate::action::RunningAction;
use crate::handle::SceneHandle;

/// Handle to a node in a [`Scene`](crate::Scene).
///
/// Generational: once a node is destroyed its id never resolves again, even
/// if the slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}v{}", self.index, self.generation)
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size::new(0.0, 0.0);

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color3 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color3 {
    pub const WHITE: Color3 = Color3::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Colour and opacity, for nodes that support them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub color: Color3,
    pub opacity: u8,
}

impl Default for Rgba {
    fn default() -> Self {
        Self {
            color: Color3::WHITE,
            opacity: 255,
        }
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// Fired when a menu item is activated.
pub type MenuCallback = Rc<dyn Fn(&SceneHandle)>;

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub font: String,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct TextInput {
    pub text: String,
    pub placeholder: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub axis: Axis,
    pub gap: f32,
    pub padding: f32,
}

#[derive(Clone)]
pub enum NodeKind {
    Node,
    Label(Label),
    Sprite { frame: String },
    /// Nine-slice panel stretched to its content size.
    Panel { texture: String },
    Menu,
    MenuItem { callback: Option<MenuCallback> },
    Dialog,
    TextInput(TextInput),
    Layout(Layout),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Node => "Node",
            NodeKind::Label(_) => "Label",
            NodeKind::Sprite { .. } => "Sprite",
            NodeKind::Panel { .. } => "Panel",
            NodeKind::Menu => "Menu",
            NodeKind::MenuItem { .. } => "MenuItem",
            NodeKind::Dialog => "Dialog",
            NodeKind::TextInput(_) => "TextInput",
            NodeKind::Layout(_) => "Layout",
        }
    }

    /// Whether nodes of this kind carry colour and opacity.
    pub fn has_rgba(&self) -> bool {
        matches!(
            self,
            NodeKind::Label(_)
                | NodeKind::Sprite { .. }
                | NodeKind::Panel { .. }
                | NodeKind::TextInput(_)
                | NodeKind::MenuItem { .. }
        )
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Label(label) => write!(f, "Label({:?}, {})", label.text, label.font),
            NodeKind::Sprite { frame } => write!(f, "Sprite({frame})"),
            NodeKind::Panel { texture } => write!(f, "Panel({texture})"),
            NodeKind::MenuItem { callback } => {
                write!(f, "MenuItem(callback: {})", callback.is_some())
            }
            NodeKind::TextInput(input) => write!(f, "TextInput({:?})", input.text),
            NodeKind::Layout(layout) => write!(f, "Layout({:?}, gap {})", layout.axis, layout.gap),
            other => f.write_str(other.name()),
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// One node's state. Tree links are managed by the scene.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub position: Point,
    pub content_size: Size,
    pub anchor: Point,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub z_order: i32,
    pub tag: i32,
    pub visible: bool,
    pub(crate) id: Option<String>,
    pub(crate) rgba: Option<Rgba>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) actions: Vec<RunningAction>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        let rgba = kind.has_rgba().then(Rgba::default);
        Self {
            kind,
            position: Point::default(),
            content_size: Size::ZERO,
            anchor: Point::new(0.5, 0.5),
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            z_order: 0,
            tag: -1,
            visible: true,
            id: None,
            rgba,
            parent: None,
            children: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn rgba(&self) -> Option<&Rgba> {
        self.rgba.as_ref()
    }

    pub fn label(&self) -> Option<&Label> {
        match &self.kind {
            NodeKind::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn text_input(&self) -> Option<&TextInput> {
        match &self.kind {
            NodeKind::TextInput(input) => Some(input),
            _ => None,
        }
    }

    pub fn layout(&self) -> Option<&Layout> {
        match &self.kind {
            NodeKind::Layout(layout) => Some(layout),
            _ => None,
        }
    }

    /// Uniform scale; the x scale when they differ.
    pub fn scale(&self) -> f32 {
        self.scale_x
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale_x = scale;
        self.scale_y = scale;
    }

    /// Content size after scaling.
    pub fn scaled_size(&self) -> Size {
        Size::new(
            self.content_size.width * self.scale_x.abs(),
            self.content_size.height * self.scale_y.abs(),
        )
    }

    pub fn running_actions(&self) -> usize {
        self.actions.len()
    }
}

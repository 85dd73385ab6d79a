//! Script nodes driving a headless scene through the bound catalog.

use tinybridge::scene::{NodeId, NodeKind, Point, SceneHandle, Size};
use tinybridge::{
    Bridge, BridgeError, CatalogFlavor, FromScript, NodeConfig, NodeHandle, PROMPT_INPUT_TAG,
    ScriptNode, ScriptValue,
};

struct Fixture {
    scene: SceneHandle,
    bridge: Bridge,
}

impl Fixture {
    fn new() -> Self {
        Self {
            scene: SceneHandle::default(),
            bridge: Bridge::new(),
        }
    }

    fn node(&self, source: &str) -> ScriptNode {
        self.node_with(source, NodeConfig::default())
    }

    fn node_with(&self, source: &str, config: NodeConfig) -> ScriptNode {
        ScriptNode::create(&self.scene, &self.bridge, source, &config).unwrap()
    }

    fn tagged(&self, parent: NodeId, tag: i32) -> NodeId {
        self.scene
            .with(|s| s.child_by_tag(parent, tag))
            .unwrap_or_else(|| panic!("no child tagged {tag}"))
    }

    /// Dialogs currently open on the scene root.
    fn dialogs(&self) -> Vec<NodeId> {
        self.scene.with(|s| {
            s.children(s.root())
                .iter()
                .copied()
                .filter(|&id| matches!(s.get(id).map(|n| n.kind()), Some(NodeKind::Dialog)))
                .collect()
        })
    }

    /// The single button of a dialog.
    fn dialog_button(&self, dialog: NodeId) -> NodeId {
        self.scene.with(|s| {
            let menu = s
                .children(dialog)
                .iter()
                .copied()
                .find(|&id| matches!(s.get(id).map(|n| n.kind()), Some(NodeKind::Menu)))
                .unwrap();
            s.children(menu)[0]
        })
    }
}

fn global(node: &ScriptNode, name: &str) -> Option<ScriptValue> {
    node.context().borrow().global(name)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn entry_point_builds_the_subtree() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func main() {
            var l = Label("Hello", "goldFont.fnt")
            pos(scale(l, 2), 10, 20)
            tag(l, 7)
        }
        "#,
    );

    let label = fx.tagged(node.root(), 7);
    fx.scene.with(|s| {
        let n = s.get(label).unwrap();
        assert_eq!(n.position, Point::new(10.0, 20.0));
        assert_eq!(n.scale(), 2.0);
        assert_eq!(n.label().unwrap().font, "goldFont.fnt");
        assert_eq!(n.content_size, Size::new(110.0, 36.0));
    });
    assert!(node.is_alive());
}

#[test]
fn missing_entry_point_is_fine() {
    let fx = Fixture::new();
    let node = fx.node("func other(): int { return 3 }");
    assert_eq!(node.call::<i64, _>("other", ()), 3);
    assert_eq!(fx.scene.with(|s| s.children(node.root()).len()), 1);
}

#[test]
fn compile_failure_leaves_no_trace() {
    let fx = Fixture::new();
    let before = fx.scene.with(|s| s.len());

    let err = ScriptNode::create(&fx.scene, &fx.bridge, "func main( {", &NodeConfig::default())
        .unwrap_err();
    assert!(matches!(err, BridgeError::Compile(_)));
    assert!(!err.to_string().is_empty());

    assert_eq!(fx.scene.with(|s| s.len()), before);
    assert_eq!(fx.bridge.live_contexts(), 0);
}

#[test]
fn getters_read_back_setters() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        var n = null
        func main() {
            n = size(Node(), 30, 40)
            move(pos(n, 1, 2), 4, 4)
            z(rotateBy(rotate(n, 10), 5), 3)
        }
        func summary(): float {
            return getX(n) + getY(n) + getWidth(n) + getHeight(n) + getZ(n)
        }
        "#,
    );
    assert_eq!(node.call::<f32, _>("summary", ()), 5.0 + 6.0 + 30.0 + 40.0 + 3.0);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn missing_capability_is_skipped() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func main() {
            var n = Node()
            color(n, 255, 0, 0)
            text(n, "ignored")
            tag(n, 3)
        }
        "#,
    );
    let plain = fx.tagged(node.root(), 3);
    fx.scene.with(|s| assert!(s.get(plain).unwrap().rgba().is_none()));
}

#[test]
fn unknown_font_falls_back_to_default() {
    let fx = Fixture::new();
    let node = fx.node(r#"func main() { tag(font(Label("x", "nope.fnt"), "alsonope.fnt"), 2) }"#);
    let label = fx.tagged(node.root(), 2);
    fx.scene
        .with(|s| assert_eq!(s.get(label).unwrap().label().unwrap().font, "bigFont.fnt"));
}

#[test]
fn stale_handle_aborts_the_call() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func make(): Node { return Node() }
        func poke(n: Node): int { tag(n, 1); return 5 }
        "#,
    );
    let made = node.context().borrow_mut().try_call_function("make", ()).unwrap();
    let handle = NodeHandle::from_script(&made).unwrap();

    assert_eq!(node.call::<i64, _>("poke", (handle,)), 5);
    fx.scene.with_mut(|s| s.destroy(handle.0));
    assert_eq!(node.call::<i64, _>("poke", (handle,)), 0);

    let err = node
        .context()
        .borrow_mut()
        .try_call_function("poke", (handle,))
        .unwrap_err();
    assert!(err.to_string().contains("no longer refers"));
}

#[test]
fn null_global_lookup_fails_the_call() {
    let fx = Fixture::new();
    let node = fx.node(r#"func hide(name: str): int { visible(getGlobal(name), false); return 1 }"#);
    let hud = fx.scene.with_mut(|s| s.create(NodeKind::Node));
    node.bind_global("hud", hud);

    assert_eq!(node.call::<i64, _>("hide", ("hud",)), 1);
    fx.scene.with(|s| assert!(!s.get(hud).unwrap().visible));
    assert_eq!(node.call::<i64, _>("hide", ("nope",)), 0);
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn actions_run_on_tick() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func main() {
            var n = tag(Node(), 1)
            runAction(n, MoveTo(1, 100, 50))
            var s = tag(Sprite("GJ_button_01.png"), 2)
            runAction(s, Sequence(Delay(0.5), FadeBy(0.5, 0)))
        }
        "#,
    );
    let moving = fx.tagged(node.root(), 1);
    let fading = fx.tagged(node.root(), 2);

    fx.scene.tick(0.5);
    fx.scene.with(|s| {
        assert_eq!(s.get(moving).unwrap().position, Point::new(50.0, 25.0));
        assert_eq!(s.get(fading).unwrap().rgba().unwrap().opacity, 255);
    });

    fx.scene.tick(0.5);
    fx.scene.with(|s| {
        assert_eq!(s.get(moving).unwrap().position, Point::new(100.0, 50.0));
        assert_eq!(s.get(fading).unwrap().rgba().unwrap().opacity, 0);
    });
}

// ============================================================================
// Buttons and dialogs
// ============================================================================

#[test]
fn button_calls_back_into_the_script() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        var pressed = 0
        func onPress() { pressed = pressed + 1 }
        func main() {
            var b = Button(pos(Sprite("GJ_button_01.png"), 30, 40), "onPress")
            tag(b, 5)
        }
        "#,
    );
    let item = fx.tagged(node.menu(), 5);
    fx.scene.with(|s| {
        let n = s.get(item).unwrap();
        assert_eq!(n.position, Point::new(30.0, 40.0));
        assert_eq!(n.content_size, Size::new(40.0, 40.0));
        assert_eq!(s.children(item).len(), 1);
    });

    assert!(fx.scene.activate(item));
    assert!(fx.scene.activate(item));
    assert_eq!(global(&node, "pressed"), Some(ScriptValue::Int(2)));
}

#[test]
fn button_outliving_its_context_is_harmless() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func main() { tag(Button(ButtonSprite("Go", "GJ_button_01.png"), "go"), 1) }
        "#,
    );
    let item = fx.tagged(node.menu(), 1);
    let callback = fx.scene.with(|s| s.menu_callback(item).unwrap().unwrap());

    drop(node);
    assert!(!fx.scene.with(|s| s.contains(item)));
    callback(&fx.scene);
}

#[test]
fn popup_dismisses_itself() {
    let fx = Fixture::new();
    let _node = fx.node(r#"func main() { popup("Title", "Body", "OK") }"#);

    let dialogs = fx.dialogs();
    assert_eq!(dialogs.len(), 1);
    let dialog = dialogs[0];
    fx.scene.with(|s| assert_eq!(s.get(dialog).unwrap().z_order, 100_000));

    assert!(fx.scene.activate(fx.dialog_button(dialog)));
    assert!(fx.dialogs().is_empty());
    assert!(!fx.scene.with(|s| s.contains(dialog)));
}

#[test]
fn prompt_hands_entered_text_to_the_script() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        var answer = ""
        func got(text: str) { answer = text }
        func main() { prompt("Name?", "type here", "got") }
        "#,
    );
    let dialog = fx.dialogs()[0];
    let input = fx.tagged(dialog, PROMPT_INPUT_TAG);
    fx.scene.with_mut(|s| {
        let field = s.text_input_mut(input).unwrap();
        assert_eq!(field.placeholder, "type here");
        field.text = "Robin".to_string();
    });

    assert!(fx.scene.activate(fx.dialog_button(dialog)));
    assert_eq!(global(&node, "answer"), Some(ScriptValue::string("Robin")));
    assert!(fx.dialogs().is_empty());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn terminate_destroys_the_node() {
    let fx = Fixture::new();
    let node = fx.node("func main() { Node(); terminate() }");
    assert!(!node.is_alive());
}

#[test]
fn self_handles_point_at_root_and_menu() {
    let fx = Fixture::new();
    let node = fx.node(r#"func main() { tag(self(), 11); tag(self_menu(), 12) }"#);
    fx.scene.with(|s| {
        assert_eq!(s.get(node.root()).unwrap().tag, 11);
        assert_eq!(s.get(node.menu()).unwrap().tag, 12);
    });
}

#[test]
fn drop_cleans_up_attached_and_detached_nodes() {
    let fx = Fixture::new();
    let before = fx.scene.with(|s| s.len());
    let node = fx.node(
        r#"
        func main() {
            child(Node(), Node())
            ButtonSprite("loose", "GJ_square01.png")
        }
        "#,
    );
    assert!(fx.scene.with(|s| s.len()) > before);
    drop(node);
    assert_eq!(fx.scene.with(|s| s.len()), before);
}

#[test]
fn fetch_finds_tagged_children() {
    let fx = Fixture::new();
    let node = fx.node(
        r#"
        func depth(): int {
            var parent = Node()
            child(parent, tag(Node(), 4))
            return getZ(z(fetch(parent, 4), 3))
        }
        "#,
    );
    assert_eq!(node.call::<i64, _>("depth", ()), 3);
}

// ============================================================================
// Layout flavour
// ============================================================================

#[test]
fn row_arranges_children() {
    let fx = Fixture::new();
    let config = NodeConfig::default().with_flavor(CatalogFlavor::Layout);
    let node = fx.node_with(
        r#"
        func main() {
            var r = tag(Row(10), 9)
            add(r, tag(Label("ab"), 1))
            add(r, tag(Label("abc"), 2))
        }
        "#,
        config,
    );
    let row = fx.tagged(node.root(), 9);
    let (first, second) = (fx.tagged(row, 1), fx.tagged(row, 2));
    fx.scene.with(|s| {
        assert_eq!(s.get(row).unwrap().content_size, Size::new(110.0, 32.0));
        assert_eq!(s.get(first).unwrap().position, Point::new(20.0, 16.0));
        assert_eq!(s.get(second).unwrap().position, Point::new(80.0, 16.0));
    });
}

#[test]
fn padding_and_gap_relayout() {
    let fx = Fixture::new();
    let config = NodeConfig::default().with_flavor(CatalogFlavor::Layout);
    let node = fx.node_with(
        r#"
        func main() {
            var c = tag(Column(0), 9)
            add(c, Label("ab"))
            add(c, Label("ab"))
            padding(gap(c, 6), 5)
        }
        func size(): float { return getWidth(getGlobal("col")) + getHeight(getGlobal("col")) }
        "#,
        config,
    );
    let column = fx.tagged(node.root(), 9);
    node.bind_global("col", column);
    assert_eq!(node.call::<f32, _>("size", ()), 50.0 + 80.0);
}

#[test]
fn layout_catalog_has_no_absolute_positioning() {
    let fx = Fixture::new();
    let config = NodeConfig::default().with_flavor(CatalogFlavor::Layout);
    let err = ScriptNode::create(&fx.scene, &fx.bridge, "func main() { pos(Node(), 1, 2) }", &config)
        .unwrap_err();
    assert!(matches!(err, BridgeError::Compile(_)));
}

#[test]
fn add_to_plain_node_still_attaches() {
    let fx = Fixture::new();
    let config = NodeConfig::default().with_flavor(CatalogFlavor::Layout);
    let node = fx.node_with(
        r#"func main() { add(tag(Node(), 1), tag(Label("x"), 2)) }"#,
        config,
    );
    let parent = fx.tagged(node.root(), 1);
    fx.tagged(parent, 2);
}

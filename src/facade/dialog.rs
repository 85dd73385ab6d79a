//! Modal dialogs built for `popup` and `prompt`.
//!
//! Dialogs are attached to the scene root, above everything else, and
//! destroy themselves when their button is pressed.

use std::rc::Rc;

use tinybridge_scene::{
    Color3, MenuCallback, NodeId, NodeKind, Point, Scene, SceneError, SceneHandle, Size,
};

use super::{NodeEnv, invoke};
use crate::config::NodeConfig;

const DIALOG_SIZE: Size = Size::new(300.0, 150.0);
const TITLE_OFFSET: f32 = 45.0;
const BUTTON_OFFSET: f32 = -45.0;
const INPUT_BACKGROUND: &str = "square02b_small.png";
const INPUT_BACKGROUND_SIZE: Size = Size::new(220.0, 30.0);
const INPUT_SIZE: Size = Size::new(400.0, 50.0);
const BUTTON_TEXTURE: &str = "GJ_button_01.png";
const MESSAGE_FONT: &str = "chatFont.fnt";

/// Tag of the text input inside a prompt dialog.
pub const PROMPT_INPUT_TAG: i32 = 1;

/// A label laid over a 9-slice panel of the same size. The panel is
/// returned detached.
pub(super) fn button_sprite(
    scene: &mut Scene,
    config: &NodeConfig,
    text: &str,
    texture: &str,
) -> Result<NodeId, SceneError> {
    let texture = if scene.resources().has_texture(texture) {
        texture
    } else {
        tracing::error!(texture, "unknown texture, using fallback");
        config.fallback_texture.as_str()
    };

    let label = scene.create_label(text, &config.default_font);
    let size = scene.node(label)?.content_size;
    scene.node_mut(label)?.set_scale(config.button_label_scale);

    let panel = scene.create_panel(texture, size);
    scene.add_child(panel, label)?;
    scene.node_mut(label)?.position = size.center();
    Ok(panel)
}

/// Add `id` to `parent` at the centre of the parent, offset by `offset`.
fn place(scene: &mut Scene, parent: NodeId, id: NodeId, offset: Point) -> Result<(), SceneError> {
    scene.add_child(parent, id)?;
    scene.center_in_parent(id)?;
    let node = scene.node_mut(id)?;
    node.position = node.position + offset;
    Ok(())
}

/// The shared frame of both dialogs: backdrop panel, title and a centred
/// menu. Returns `(dialog, menu)`.
fn frame(scene: &mut Scene, config: &NodeConfig, title: &str) -> Result<(NodeId, NodeId), SceneError> {
    let window = scene.window_size();
    let dialog = scene.create(NodeKind::Dialog);
    {
        let node = scene.node_mut(dialog)?;
        node.content_size = window;
        node.anchor = Point::default();
        node.z_order = config.z_order.saturating_add(1);
    }
    let root = scene.root();
    scene.add_child(root, dialog)?;

    let panel = scene.create_panel(&config.fallback_texture, DIALOG_SIZE);
    place(scene, dialog, panel, Point::default())?;

    let label = scene.create_label(title, &config.default_font);
    scene.node_mut(label)?.set_scale(0.8);
    place(scene, dialog, label, Point::new(0.0, TITLE_OFFSET))?;

    let menu = scene.create(NodeKind::Menu);
    place(scene, dialog, menu, Point::default())?;
    Ok((dialog, menu))
}

fn add_button(
    scene: &mut Scene,
    config: &NodeConfig,
    menu: NodeId,
    text: &str,
    callback: MenuCallback,
) -> Result<NodeId, SceneError> {
    let sprite = button_sprite(scene, config, text, BUTTON_TEXTURE)?;
    let size = scene.node(sprite)?.scaled_size();
    let item = scene.create_menu_item(Some(callback), size);
    scene.add_child(item, sprite)?;
    scene.node_mut(sprite)?.position = size.center();
    scene.add_child(menu, item)?;
    scene.node_mut(item)?.position = Point::new(0.0, BUTTON_OFFSET);
    Ok(item)
}

fn dismiss(dialog: NodeId) -> MenuCallback {
    Rc::new(move |scene: &SceneHandle| {
        scene.with_mut(|s| s.destroy(dialog));
    })
}

/// Show an alert with a title, a message and one dismiss button.
pub(super) fn popup(
    env: &NodeEnv,
    scene: &mut Scene,
    title: &str,
    message: &str,
    button: &str,
) -> Result<NodeId, SceneError> {
    let config = env.config();
    let (dialog, menu) = frame(scene, config, title)?;

    let body = scene.create_label(message, MESSAGE_FONT);
    place(scene, dialog, body, Point::default())?;

    add_button(scene, config, menu, button, dismiss(dialog))?;
    tracing::debug!(%dialog, title, "opened popup");
    Ok(dialog)
}

/// Show a text prompt. Pressing "Ok" calls the script function `callback`
/// with the entered text and closes the dialog.
pub(super) fn prompt(
    env: &NodeEnv,
    scene: &mut Scene,
    title: &str,
    placeholder: &str,
    callback: &str,
) -> Result<NodeId, SceneError> {
    let config = env.config();
    let (dialog, menu) = frame(scene, config, title)?;

    let background = scene.create_panel(INPUT_BACKGROUND, INPUT_BACKGROUND_SIZE);
    if let Ok(rgba) = scene.rgba_mut(background) {
        rgba.color = Color3::new(0, 0, 0);
        rgba.opacity = 100;
    }
    place(scene, dialog, background, Point::default())?;

    let input = scene.create_text_input(placeholder, INPUT_SIZE);
    {
        let node = scene.node_mut(input)?;
        node.anchor = Point::default();
        node.set_scale(0.5);
        node.tag = PROMPT_INPUT_TAG;
    }
    if let Ok(rgba) = scene.rgba_mut(input) {
        rgba.color = Color3::new(200, 200, 200);
    }
    place(scene, dialog, input, Point::default())?;

    let context = env.context.clone();
    let callback = callback.to_string();
    let submit: MenuCallback = Rc::new(move |scene: &SceneHandle| {
        let text = scene.with(|s| {
            s.get(input)
                .and_then(|node| node.text_input())
                .map(|field| field.text.clone())
                .unwrap_or_default()
        });
        invoke(&context, &callback, (text,));
        scene.with_mut(|s| s.destroy(dialog));
    });
    add_button(scene, config, menu, "Ok", submit)?;
    tracing::debug!(%dialog, title, "opened prompt");
    Ok(dialog)
}

//! The functions a script node exposes.
//!
//! Every entry is one closure over the node's environment, bound under the
//! signature string scripts see. `install` binds the shared catalog and then
//! the one for the configured flavour.

use std::rc::Rc;

use tinybridge_core::NativeError;
use tinybridge_scene::{
    Action, Axis, Color3, Layout, MenuCallback, NodeId, NodeKind, Point, Scene, SceneError,
    SceneHandle, Size,
};

use super::dialog;
use super::{ActionHandle, NodeEnv, NodeHandle, invoke};
use crate::binding::IntoNativeClosure;
use crate::config::{CatalogFlavor, NodeConfig};
use crate::context::ScriptContext;
use crate::error::Result;

type NativeResult<T> = std::result::Result<T, NativeError>;

/// Bind one catalog entry. `make` receives its own copy of the environment.
fn bind<M, F>(
    ctx: &mut ScriptContext,
    env: &NodeEnv,
    signature: &str,
    make: impl FnOnce(NodeEnv) -> F,
) -> Result<()>
where
    F: IntoNativeClosure<M>,
{
    ctx.bind_function(signature, make(env.clone()))
}

pub(super) fn install(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    install_properties(ctx, env)?;
    install_actions(ctx)?;
    install_special(ctx, env)?;
    install_constructors(ctx, env)?;
    match env.config().flavor {
        CatalogFlavor::Absolute => install_absolute(ctx, env),
        CatalogFlavor::Layout => install_layout(ctx, env),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn font_or_default<'a>(scene: &Scene, config: &'a NodeConfig, font: &'a str) -> &'a str {
    if scene.resources().has_font(font) {
        font
    } else {
        tracing::error!(font, "Invalid font file");
        &config.default_font
    }
}

/// A sprite from a frame name, then a texture name, then the fallback frame.
fn sprite(scene: &mut Scene, config: &NodeConfig, name: &str) -> NodeId {
    let resources = scene.resources();
    if resources.has_frame(name) || resources.has_texture(name) {
        return scene.create_sprite(name);
    }
    tracing::error!(frame = name, "unknown sprite, using fallback");
    scene.create_sprite(&config.fallback_frame)
}

fn container(env: &NodeEnv, axis: Axis, gap: f32) -> NativeResult<NodeHandle> {
    env.with_scene(|s| {
        let id = s.create_layout(axis, gap);
        env.adopt(s, id)
    })
}

/// Apply a layout change and arrange the children again.
fn relayout_with(
    env: &NodeEnv,
    node: NodeHandle,
    f: impl FnOnce(&mut Layout),
) -> NativeResult<NodeHandle> {
    env.capability(node, |s| {
        f(s.layout_mut(node.0)?);
        s.relayout(node.0)
    })
}

// ============================================================================
// Shared catalog
// ============================================================================

fn install_properties(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "tag(Node, int): Node", |env| {
        move |node: NodeHandle, tag: i32| env.update(node, |n| n.tag = tag)
    })?;
    bind(ctx, env, "fetch(Node, int): Node", |env| {
        move |node: NodeHandle, tag: i32| -> NativeResult<Option<NodeHandle>> {
            env.try_scene(|s| {
                s.node(node.0)?;
                Ok(s.child_by_tag(node.0, tag).map(NodeHandle))
            })
        }
    })?;
    bind(ctx, env, "visible(Node, bool): Node", |env| {
        move |node: NodeHandle, visible: bool| env.update(node, |n| n.visible = visible)
    })?;

    bind(ctx, env, "scale(Node, float): Node", |env| {
        move |node: NodeHandle, scale: f32| env.update(node, |n| n.set_scale(scale))
    })?;
    bind(ctx, env, "scaleX(Node, float): Node", |env| {
        move |node: NodeHandle, scale: f32| env.update(node, |n| n.scale_x = scale)
    })?;
    bind(ctx, env, "scaleY(Node, float): Node", |env| {
        move |node: NodeHandle, scale: f32| env.update(node, |n| n.scale_y = scale)
    })?;
    bind(ctx, env, "scaleBy(Node, float): Node", |env| {
        move |node: NodeHandle, factor: f32| {
            env.update(node, |n| {
                let scale = n.scale() * factor;
                n.set_scale(scale);
            })
        }
    })?;

    bind(ctx, env, "rotate(Node, float): Node", |env| {
        move |node: NodeHandle, angle: f32| env.update(node, |n| n.rotation = angle)
    })?;
    bind(ctx, env, "rotateBy(Node, float): Node", |env| {
        move |node: NodeHandle, angle: f32| env.update(node, |n| n.rotation += angle)
    })?;

    bind(ctx, env, "z(Node, int): Node", |env| {
        move |node: NodeHandle, z: i32| env.update(node, |n| n.z_order = z)
    })?;
    bind(ctx, env, "getZ(Node): int", |env| {
        move |node: NodeHandle| env.read(node, |n| n.z_order)
    })?;

    bind(ctx, env, "child(Node, Node): Node", |env| {
        move |parent: NodeHandle, child: NodeHandle| {
            env.try_scene(|s| s.add_child(parent.0, child.0))?;
            Ok::<_, NativeError>(parent)
        }
    })?;
    bind(ctx, env, "runAction(Node, Action): Node", |env| {
        move |node: NodeHandle, action: ActionHandle| {
            env.try_scene(|s| s.run_action(node.0, action.0))?;
            Ok::<_, NativeError>(node)
        }
    })?;

    bind(ctx, env, "color(Node, int, int, int): Node", |env| {
        move |node: NodeHandle, r: u8, g: u8, b: u8| {
            env.capability(node, |s| {
                s.rgba_mut(node.0)?.color = Color3::new(r, g, b);
                Ok(())
            })
        }
    })?;
    bind(ctx, env, "opacity(Node, int): Node", |env| {
        move |node: NodeHandle, opacity: u8| {
            env.capability(node, |s| {
                s.rgba_mut(node.0)?.opacity = opacity;
                Ok(())
            })
        }
    })?;
    bind(ctx, env, "text(Node, str): Node", |env| {
        move |node: NodeHandle, text: String| {
            env.capability(node, |s| s.set_label_text(node.0, &text))
        }
    })?;
    bind(ctx, env, "font(Node, str): Node", |env| {
        move |node: NodeHandle, font: String| {
            let config = env.config();
            env.capability(node, |s| {
                let font = font_or_default(s, config, &font).to_string();
                s.set_label_font(node.0, &font)
            })
        }
    })?;
    Ok(())
}

fn install_actions(ctx: &mut ScriptContext) -> Result<()> {
    ctx.bind_function(
        "Sequence(Action, Action): Action",
        |first: ActionHandle, second: ActionHandle| {
            ActionHandle(Action::sequence(first.0, second.0))
        },
    )?;
    ctx.bind_function("Delay(float): Action", |duration: f32| {
        ActionHandle(Action::Delay(duration))
    })?;

    ctx.bind_function("MoveTo(float, float, float): Action", |duration: f32, x: f32, y: f32| {
        ActionHandle(Action::MoveTo { duration, to: Point::new(x, y) })
    })?;
    ctx.bind_function("MoveBy(float, float, float): Action", |duration: f32, x: f32, y: f32| {
        ActionHandle(Action::MoveBy { duration, by: Point::new(x, y) })
    })?;

    ctx.bind_function("ScaleTo(float, float): Action", |duration: f32, scale: f32| {
        ActionHandle(Action::ScaleTo { duration, scale })
    })?;
    ctx.bind_function("ScaleBy(float, float): Action", |duration: f32, factor: f32| {
        ActionHandle(Action::ScaleBy { duration, factor })
    })?;

    ctx.bind_function("RotateTo(float, float): Action", |duration: f32, angle: f32| {
        ActionHandle(Action::RotateTo { duration, angle })
    })?;
    ctx.bind_function("RotateBy(float, float): Action", |duration: f32, angle: f32| {
        ActionHandle(Action::RotateBy { duration, angle })
    })?;

    ctx.bind_function("FadeTo(float, float): Action", |duration: f32, opacity: f32| {
        ActionHandle(Action::FadeTo { duration, opacity })
    })?;
    // Scripts written for the node editor expect FadeBy to fade to a target.
    ctx.bind_function("FadeBy(float, float): Action", |duration: f32, opacity: f32| {
        ActionHandle(Action::FadeTo { duration, opacity })
    })?;

    Ok(())
}

fn install_special(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "popup(str, str, str): void", |env| {
        move |title: String, message: String, button: String| -> NativeResult<()> {
            env.try_scene(|s| dialog::popup(&env, s, &title, &message, &button))?;
            Ok(())
        }
    })?;
    bind(ctx, env, "prompt(str, str, str): void", |env| {
        move |title: String, placeholder: String, callback: String| -> NativeResult<()> {
            env.try_scene(|s| dialog::prompt(&env, s, &title, &placeholder, &callback))?;
            Ok(())
        }
    })?;
    bind(ctx, env, "terminate(): void", |env| {
        move || -> NativeResult<()> {
            let root = env.root;
            let count = env.with_scene(|s| s.destroy(root))?;
            tracing::debug!(node = %root, count, "script terminated its node");
            Ok(())
        }
    })?;
    bind(ctx, env, "self_menu(): Node", |env| move || NodeHandle(env.menu))?;
    bind(ctx, env, "self(): Node", |env| move || NodeHandle(env.root))?;
    bind(ctx, env, "getGlobal(str): Node", |env| {
        move |name: String| {
            let node = env.global(&name);
            if node.is_none() {
                tracing::error!(name, "no global node bound under this name");
            }
            node
        }
    })?;
    Ok(())
}

fn install_constructors(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "Node(): Node", |env| {
        move || {
            env.with_scene(|s| {
                let id = s.create(NodeKind::Node);
                env.adopt(s, id)
            })
        }
    })?;

    // Moves the node into a menu item at the same spot. Pressing it calls
    // the script function named `callback`.
    bind(ctx, env, "Button(Node, str): Node", |env| {
        move |node: NodeHandle, callback: String| {
            let context = env.context.clone();
            let on_press: MenuCallback = Rc::new(move |_scene: &SceneHandle| {
                invoke(&context, &callback, ());
            });
            let menu = env.menu;
            let item = env.try_scene(|s| -> std::result::Result<_, SceneError> {
                let sprite = s.node(node.0)?;
                let (position, size) = (sprite.position, sprite.scaled_size());
                s.remove_from_parent(node.0)?;

                let item = s.create_menu_item(Some(on_press), size);
                env.track(item);
                s.add_child(item, node.0)?;
                s.node_mut(node.0)?.position = size.center();
                s.node_mut(item)?.position = position;
                s.add_child(menu, item)?;
                Ok(item)
            })?;
            Ok::<_, NativeError>(NodeHandle(item))
        }
    })?;
    Ok(())
}

// ============================================================================
// Absolute flavour
// ============================================================================

fn install_absolute(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "Label(str, str): Node", |env| {
        move |text: String, font: String| {
            let config = env.config();
            env.with_scene(|s| {
                let font = font_or_default(s, config, &font).to_string();
                let id = s.create_label(&text, &font);
                env.adopt(s, id)
            })
        }
    })?;
    bind(ctx, env, "Sprite(str): Node", |env| {
        move |name: String| {
            env.with_scene(|s| {
                let id = sprite(s, env.config(), &name);
                env.adopt(s, id)
            })
        }
    })?;
    // Left detached, ready to be handed to Button.
    bind(ctx, env, "ButtonSprite(str, str): Node", |env| {
        move |text: String, texture: String| {
            let panel = env.try_scene(|s| dialog::button_sprite(s, env.config(), &text, &texture))?;
            env.track(panel);
            Ok::<_, NativeError>(NodeHandle(panel))
        }
    })?;
    bind(ctx, env, "Scale9Sprite(float, float, str): Node", |env| {
        move |width: f32, height: f32, texture: String| {
            let config = env.config();
            env.with_scene(|s| {
                let texture = if s.resources().has_texture(&texture) {
                    texture.as_str()
                } else {
                    config.fallback_texture.as_str()
                };
                let id = s.create_panel(texture, Size::new(width, height));
                env.adopt(s, id)
            })
        }
    })?;

    bind(ctx, env, "pos(Node, float, float): Node", |env| {
        move |node: NodeHandle, x: f32, y: f32| env.update(node, |n| n.position = Point::new(x, y))
    })?;
    bind(ctx, env, "xpos(Node, float): Node", |env| {
        move |node: NodeHandle, x: f32| env.update(node, |n| n.position.x = x)
    })?;
    bind(ctx, env, "ypos(Node, float): Node", |env| {
        move |node: NodeHandle, y: f32| env.update(node, |n| n.position.y = y)
    })?;
    bind(ctx, env, "getX(Node): float", |env| {
        move |node: NodeHandle| env.read(node, |n| n.position.x)
    })?;
    bind(ctx, env, "getY(Node): float", |env| {
        move |node: NodeHandle| env.read(node, |n| n.position.y)
    })?;
    bind(ctx, env, "move(Node, float, float): Node", |env| {
        move |node: NodeHandle, x: f32, y: f32| {
            env.update(node, |n| n.position = n.position + Point::new(x, y))
        }
    })?;

    bind(ctx, env, "size(Node, float, float): Node", |env| {
        move |node: NodeHandle, width: f32, height: f32| {
            env.update(node, |n| n.content_size = Size::new(width, height))
        }
    })?;
    bind(ctx, env, "width(Node, float): Node", |env| {
        move |node: NodeHandle, width: f32| env.update(node, |n| n.content_size.width = width)
    })?;
    bind(ctx, env, "height(Node, float): Node", |env| {
        move |node: NodeHandle, height: f32| env.update(node, |n| n.content_size.height = height)
    })?;
    install_size_getters(ctx, env)
}

fn install_size_getters(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "getWidth(Node): float", |env| {
        move |node: NodeHandle| env.read(node, |n| n.content_size.width)
    })?;
    bind(ctx, env, "getHeight(Node): float", |env| {
        move |node: NodeHandle| env.read(node, |n| n.content_size.height)
    })?;
    Ok(())
}

// ============================================================================
// Layout flavour
// ============================================================================

fn install_layout(ctx: &mut ScriptContext, env: &NodeEnv) -> Result<()> {
    bind(ctx, env, "Label(str): Node", |env| {
        move |text: String| {
            env.with_scene(|s| {
                let id = s.create_label(&text, &env.config().default_font);
                env.adopt(s, id)
            })
        }
    })?;
    bind(ctx, env, "Sprite(str): Node", |env| {
        move |name: String| {
            env.with_scene(|s| {
                let id = sprite(s, env.config(), &name);
                env.adopt(s, id)
            })
        }
    })?;
    bind(ctx, env, "Row(float): Node", |env| {
        move |gap: f32| container(&env, Axis::Row, gap)
    })?;
    bind(ctx, env, "Column(float): Node", |env| {
        move |gap: f32| container(&env, Axis::Column, gap)
    })?;

    // Appends and re-arranges. Plain parents just get the child.
    bind(ctx, env, "add(Node, Node): Node", |env| {
        move |parent: NodeHandle, child: NodeHandle| {
            env.try_scene(|s| s.add_child(parent.0, child.0))?;
            env.capability(parent, |s| s.relayout(parent.0))
        }
    })?;
    bind(ctx, env, "gap(Node, float): Node", |env| {
        move |node: NodeHandle, gap: f32| relayout_with(&env, node, |layout| layout.gap = gap)
    })?;
    bind(ctx, env, "padding(Node, float): Node", |env| {
        move |node: NodeHandle, padding: f32| {
            relayout_with(&env, node, |layout| layout.padding = padding)
        }
    })?;
    install_size_getters(ctx, env)
}

//! Minimal engine demo: build a small tree, style it, lay it out and
//! print the pulled geometry.
//!
//! Run with `RUST_LOG=strata_style=debug cargo run --example demo` to
//! watch cascade decisions.

use anyhow::{Context, Result};
use strata_engine::UiEngine;
use strata_tree::PseudoFlags;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut engine = UiEngine::new()?;
    let root = engine.root();

    let toolbar = engine.create_node("toolbar")?;
    engine.append_child(root, toolbar)?;
    engine.set_inline_style(toolbar, Some("height: 40px; gap: 8px; padding: 4px"));

    let save = engine.create_node("button")?;
    let cancel = engine.create_node("button")?;
    engine.append_child(toolbar, save)?;
    engine.append_child(toolbar, cancel)?;
    engine.add_class(save, "primary");

    engine.add_stylesheet(
        r#"
        $accent: #3366ff;

        button { width: 96px; height: 32px; background-color: #e0e0e0; }
        button.primary { background-color: $accent; color: white; }
        button:hover { border: 1px #888888; }
        "#,
    );

    engine.set_pseudo(save, PseudoFlags::HOVER, true);
    engine.layout(640.0, 480.0)?;

    for (name, node) in [("toolbar", toolbar), ("save", save), ("cancel", cancel)] {
        let rect = engine.box_of(node).context("node was not laid out")?;
        println!(
            "{name:>8}: {:4}x{:<4} at ({}, {})",
            rect.width, rect.height, rect.x, rect.y
        );
    }
    Ok(())
}

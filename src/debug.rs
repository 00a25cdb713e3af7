//! Inspection helpers: serializable graph snapshots, graphviz dumps of the build stages and PNG
//! export of buffers.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::CompositorContext;
use crate::execution::group::{ChunkState, ExecutionGroup, GroupFlags};
use crate::foundation::error::CompositorResult;
use crate::foundation::ids::{GroupId, OperationId, ProxyId};
use crate::foundation::rect::Rect;
use crate::memory::buffer::{DataType, MemoryBuffer};
use crate::operation::graph::OperationGraph;
use crate::operation::traits::OperationFlags;

/// One operation of a [`GraphSnapshot`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OperationSnapshot {
    /// Handle.
    pub id: OperationId,
    /// Kind name.
    pub name: &'static str,
    /// Determined canvas.
    pub canvas: Rect,
    /// Output datatype, `None` for sinks.
    pub output: Option<DataType>,
    /// Static flags.
    pub flags: OperationFlags,
    /// Producer of each input.
    pub inputs: Vec<Option<OperationId>>,
    /// Bound memory proxy.
    pub proxy: Option<ProxyId>,
}

/// One execution group of a [`GraphSnapshot`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GroupSnapshot {
    /// Handle.
    pub id: GroupId,
    /// Members, output first.
    pub operations: Vec<OperationId>,
    /// Group flags.
    pub flags: GroupFlags,
    /// Rendered area.
    pub border: Rect,
    /// Chunk states in index order.
    pub chunks: Vec<ChunkState>,
}

/// Serializable picture of a compiled graph.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GraphSnapshot {
    /// Operations in id order.
    pub operations: Vec<OperationSnapshot>,
    /// Execution groups in id order.
    pub groups: Vec<GroupSnapshot>,
}

impl GraphSnapshot {
    /// Capture `graph` and `groups`.
    pub fn capture(graph: &OperationGraph, groups: &[ExecutionGroup]) -> Self {
        let operations = graph
            .nodes()
            .map(|n| OperationSnapshot {
                id: n.id(),
                name: n.name(),
                canvas: n.canvas(),
                output: n.output_type(),
                flags: n.flags(),
                inputs: n.inputs().iter().map(|s| s.link).collect(),
                proxy: n.memory_proxy(),
            })
            .collect();
        let groups = groups
            .iter()
            .map(|g| GroupSnapshot {
                id: g.id(),
                operations: g.operations().to_vec(),
                flags: g.flags(),
                border: g.viewer_border(),
                chunks: g.chunk_states(),
            })
            .collect();
        Self { operations, groups }
    }

    /// Render as a graphviz digraph with one cluster per group.
    pub fn to_graphviz(&self) -> String {
        let mut out = String::from("digraph compositor {\n  rankdir=LR;\n  node [shape=record];\n");
        let label = |op: &OperationSnapshot| {
            let c = op.canvas;
            format!(
                "{}|{}|{}x{} @ {},{}",
                op.id,
                op.name,
                c.width(),
                c.height(),
                c.xmin,
                c.ymin
            )
        };
        let slots = self
            .operations
            .iter()
            .map(|o| o.id.index() + 1)
            .max()
            .unwrap_or(0);
        let mut grouped = vec![false; slots];
        for group in &self.groups {
            let _ = writeln!(out, "  subgraph cluster_{} {{", group.id.0);
            let _ = writeln!(out, "    label=\"{}\";", group.id);
            for id in &group.operations {
                let Some(slot) = grouped.get_mut(id.index()) else {
                    continue;
                };
                if std::mem::replace(slot, true) {
                    continue;
                }
                if let Some(op) = self.operations.iter().find(|o| o.id == *id) {
                    let _ = writeln!(out, "    \"{id}\" [label=\"{}\"];", label(op));
                }
            }
            out.push_str("  }\n");
        }
        for op in &self.operations {
            if !grouped.get(op.id.index()).copied().unwrap_or(false) {
                let _ = writeln!(out, "  \"{}\" [label=\"{}\"];", op.id, label(op));
            }
        }
        for op in &self.operations {
            for (input, from) in op.inputs.iter().enumerate() {
                if let Some(from) = from {
                    let _ = writeln!(out, "  \"{from}\" -> \"{}\" [label=\"{input}\"];", op.id);
                }
            }
            if let Some(proxy) = op.proxy
                && op.flags.is_write_buffer
            {
                let _ = writeln!(out, "  \"{}\" -> \"{proxy}\" [style=dashed];", op.id);
            }
            if let Some(proxy) = op.proxy
                && op.flags.is_read_buffer
            {
                let _ = writeln!(out, "  \"{proxy}\" -> \"{}\" [style=dashed];", op.id);
            }
        }
        out.push_str("}\n");
        out
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> CompositorResult<String> {
        let json = serde_json::to_string_pretty(self)
            .context("serialize graph snapshot")?;
        Ok(json)
    }

    /// Write [`to_graphviz`](Self::to_graphviz) to `path`.
    pub fn write_graphviz(&self, path: &Path) -> CompositorResult<()> {
        std::fs::write(path, self.to_graphviz())
            .with_context(|| format!("write graphviz '{}'", path.display()))?;
        Ok(())
    }
}

/// Dump `graph` as `<graphviz_dir>/compositor_<stage>.dot` when a dump directory is configured.
/// IO failures are logged and otherwise ignored.
pub(crate) fn dump_stage(
    context: &CompositorContext,
    stage: &str,
    graph: &OperationGraph,
    groups: &[ExecutionGroup],
) {
    let Some(dir) = &context.settings().graphviz_dir else {
        return;
    };
    let path = dir.join(format!("compositor_{stage}.dot"));
    match GraphSnapshot::capture(graph, groups).write_graphviz(&path) {
        Ok(()) => debug!(path = %path.display(), "wrote graphviz dump"),
        Err(e) => warn!(error = %e, stage, "failed to write graphviz dump"),
    }
}

/// Save `buffer` as an 8-bit RGBA PNG. Values are clamped to `[0, 1]`; value buffers become grey
/// and vector buffers map xyz to rgb.
pub fn write_buffer_png(buffer: &MemoryBuffer, path: &Path) -> CompositorResult<()> {
    let rect = buffer.rect();
    let (width, height) = (rect.width().max(0) as u32, rect.height().max(0) as u32);
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    let mut px = [0.0f32; 4];
    let n = buffer.num_channels();
    for y in rect.ymin..rect.ymax {
        for x in rect.xmin..rect.xmax {
            buffer.read_elem_checked(x, y, &mut px[..n]);
            let rgba = match buffer.data_type() {
                DataType::Value => [px[0], px[0], px[0], 1.0],
                DataType::Vector => [px[0], px[1], px[2], 1.0],
                DataType::Color => px,
            };
            data.extend(rgba.map(to_u8));
        }
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &data,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/debug.rs"]
mod tests;

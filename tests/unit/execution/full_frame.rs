use super::*;

use crate::builder::NodeOperationBuilder;
use crate::config::{CompositorContext, CompositorSettings, ExecutionModel, FractionalBorder};
use crate::memory::buffer::DataType;
use crate::node::graph::NodeGraph;
use crate::node::nodes::{BlurNode, RgbNode, ViewerNode};
use crate::ops::output::OutputImage;

fn compile(nodes: &NodeGraph, settings: CompositorSettings) -> Arc<SystemState> {
    let context = CompositorContext::new(CompositorSettings {
        execution_model: ExecutionModel::FullFrame,
        ..settings
    });
    let built = NodeOperationBuilder::new(&context).build(nodes).unwrap();
    assert!(built.groups.is_empty());
    Arc::new(SystemState {
        context,
        graph: built.graph,
        groups: built.groups,
    })
}

fn started(state: &SystemState) -> WorkScheduler {
    let mut scheduler = WorkScheduler::new(state.context.settings());
    scheduler.start().unwrap();
    scheduler
}

fn blur_chain(image: &OutputImage, rgba: [f32; 4]) -> NodeGraph {
    let mut nodes = NodeGraph::new();
    let color = nodes.add_node(RgbNode { rgba });
    let blur = nodes.add_node(BlurNode { radius: 2 });
    let viewer = nodes.add_node(ViewerNode::new(image.clone(), 16, 16));
    nodes.add_link(color.output(0), blur.input(0));
    nodes.add_link(blur.output(0), viewer.input(0));
    nodes
}

fn find(state: &SystemState, name: &str) -> OperationId {
    state
        .graph
        .nodes()
        .find(|n| n.name() == name)
        .map(|n| n.id())
        .unwrap()
}

#[test]
fn rows_spread_the_remainder_over_the_first_bands() {
    let heights: Vec<i32> = split_rows(Rect::new(0, 5, 0, 10), 4)
        .iter()
        .map(Rect::height)
        .collect();
    assert_eq!(heights, vec![3, 3, 2, 2]);

    let bands = split_rows(Rect::new(2, 7, -3, 7), 4);
    assert_eq!(bands.first().map(|r| r.ymin), Some(-3));
    assert_eq!(bands.last().map(|r| r.ymax), Some(7));
    for pair in bands.windows(2) {
        assert_eq!(pair[0].ymax, pair[1].ymin);
    }
    assert!(bands.iter().all(|r| r.xmin == 2 && r.xmax == 7));

    assert_eq!(split_rows(Rect::new(0, 5, 0, 2), 8).len(), 2);
    assert!(split_rows(Rect::NONE, 4).is_empty());
}

#[test]
fn areas_of_interest_propagate_to_inputs() {
    let image = OutputImage::new();
    let state = compile(
        &blur_chain(&image, [1.0; 4]),
        CompositorSettings {
            viewer_border: Some(FractionalBorder {
                xmin: 0.25,
                xmax: 0.75,
                ymin: 0.25,
                ymax: 0.75,
            }),
            ..CompositorSettings::default()
        },
    );
    let mut scheduler = started(&state);
    let viewer = find(&state, "Viewer");
    let blur = find(&state, "BoxBlur");
    let color = find(&state, "SetColor");

    let mut execution = FullFrameExecution::new(&state, &scheduler);
    let border = Rect::new(4, 12, 4, 12);
    execution.determine_areas_to_render(viewer, border);
    execution.determine_areas_to_render(viewer, Rect::new(5, 10, 5, 10));
    assert_eq!(execution.registered_areas(viewer), &[border]);
    assert_eq!(execution.registered_areas(blur), &[border]);
    let color_area = Rect::new(2, 14, 2, 14);
    assert_eq!(execution.registered_areas(color), &[color_area]);

    execution.determine_areas_to_render(viewer, Rect::new(0, 16, 14, 16));
    assert_eq!(
        execution.registered_areas(color),
        &[Rect::new(2, 14, 2, 14), Rect::new(0, 16, 12, 16)]
    );
    drop(execution);
    scheduler.stop();
}

#[test]
fn bands_are_rendered_once_each() {
    let image = OutputImage::new();
    let state = compile(
        &blur_chain(&image, [1.0; 4]),
        CompositorSettings {
            num_threads: Some(4),
            ..CompositorSettings::default()
        },
    );
    let mut scheduler = started(&state);
    let execution = FullFrameExecution::new(&state, &scheduler);
    let mut results = execution.execute_work(Rect::new(0, 3, 0, 10), |band| {
        let mut out = MemoryBuffer::new(DataType::Value, band);
        out.fill(band, &[band.ymin as f32]);
        Some(out)
    });
    results.sort_by_key(|(band, _)| band.ymin);
    let starts: Vec<i32> = results.iter().map(|(band, _)| band.ymin).collect();
    assert_eq!(starts, vec![0, 3, 6, 8]);
    for (band, out) in &results {
        assert_eq!(out.rect(), *band);
        assert_eq!(out.elem(0, band.ymin), Some(&[band.ymin as f32][..]));
    }
    drop(execution);
    scheduler.stop();
}

#[test]
fn viewer_border_limits_the_rendered_pixels() {
    let image = OutputImage::new();
    let rgba = [0.5, 0.25, 1.0, 1.0];
    let state = compile(
        &blur_chain(&image, rgba),
        CompositorSettings {
            viewer_border: Some(FractionalBorder {
                xmin: 0.0,
                xmax: 0.5,
                ymin: 0.0,
                ymax: 1.0,
            }),
            ..CompositorSettings::default()
        },
    );
    let mut scheduler = started(&state);
    for node in state.graph.nodes() {
        node.operation().init_execution(node.canvas());
    }
    let (rendered, cancelled) = FullFrameExecution::new(&state, &scheduler).execute();
    scheduler.stop();

    assert!(!cancelled);
    assert_eq!(rendered, 3);
    assert_eq!(image.pixel(0, 0), Some(rgba));
    assert_eq!(image.pixel(7, 15), Some(rgba));
    assert_eq!(image.pixel(8, 0), Some([0.0; 4]));
    assert_eq!(image.pixel(15, 15), Some([0.0; 4]));
}

#[test]
fn buffers_are_released_after_their_last_read() {
    let image = OutputImage::new();
    let state = compile(&blur_chain(&image, [1.0; 4]), CompositorSettings::default());
    let mut scheduler = started(&state);
    for node in state.graph.nodes() {
        node.operation().init_execution(node.canvas());
    }
    let viewer = find(&state, "Viewer");
    let blur = find(&state, "BoxBlur");
    let color = find(&state, "SetColor");

    let mut execution = FullFrameExecution::new(&state, &scheduler);
    execution.determine_areas_to_render(viewer, Rect::from_size(16, 16));
    execution.determine_reads(viewer);
    assert_eq!(execution.registered_reads.get(&blur), Some(&1));
    assert_eq!(execution.registered_reads.get(&color), Some(&1));

    execution.render_output_dependencies(viewer);
    assert!(execution.buffers.contains_key(&blur));
    assert!(!execution.buffers.contains_key(&color));
    execution.render_operation(viewer);
    assert!(execution.buffers.is_empty());
    assert_eq!(execution.rendered.len(), 3);
    drop(execution);
    scheduler.stop();
}

use super::*;

use crate::foundation::rect::Rect;
use crate::memory::buffer::DataType;
use crate::ops::blur::BoxBlurOperation;
use crate::ops::constant::SetColorOperation;
use crate::ops::output::{OutputImage, ViewerOperation};

struct Chain {
    graph: OperationGraph,
    color: OperationId,
    blur: OperationId,
    viewer: OperationId,
}

fn chain() -> Chain {
    let mut graph = OperationGraph::new();
    let color = graph.add_operation(Box::new(SetColorOperation::new([1.0; 4])));
    let blur = graph.add_operation(Box::new(BoxBlurOperation::new(1)));
    let viewer = graph.add_operation(Box::new(ViewerOperation::new(OutputImage::new(), 8, 8)));
    graph.add_link(color, blur, 0);
    graph.add_link(blur, viewer, 0);
    for id in [color, blur, viewer] {
        let node = graph.node_mut(id).unwrap();
        node.set_canvas(Rect::from_size(8, 8));
    }
    Chain {
        graph,
        color,
        blur,
        viewer,
    }
}

#[test]
fn complex_operations_are_isolated_on_both_sides() {
    let Chain {
        mut graph,
        color,
        blur,
        viewer,
    } = chain();
    assert_eq!(add_complex_operation_buffers(&mut graph), 2);

    let read_in = graph.node(blur).unwrap().input_link(0).unwrap();
    let read_out = graph.node(viewer).unwrap().input_link(0).unwrap();
    for read in [read_in, read_out] {
        let node = graph.node(read).unwrap();
        assert!(node.flags().is_read_buffer);
        assert_eq!(node.canvas(), Rect::from_size(8, 8));
    }

    let proxy_in = graph.node(read_in).unwrap().memory_proxy().unwrap();
    let proxy_in = graph.proxy(proxy_in).unwrap();
    let write_in = graph.node(proxy_in.write_operation()).unwrap();
    assert!(write_in.flags().is_write_buffer);
    assert_eq!(write_in.input_link(0), Some(color));
    assert_eq!(proxy_in.data_type(), DataType::Color);

    let proxy_out = graph.node(read_out).unwrap().memory_proxy().unwrap();
    let proxy_out = graph.proxy(proxy_out).unwrap();
    let write_out = graph.node(proxy_out.write_operation()).unwrap();
    assert_eq!(write_out.input_link(0), Some(blur));
    assert_eq!(graph.proxies().count(), 2);
}

#[test]
fn second_run_adds_nothing() {
    let mut c = chain();
    add_complex_operation_buffers(&mut c.graph);
    let len = c.graph.len();
    assert_eq!(add_complex_operation_buffers(&mut c.graph), 0);
    assert_eq!(c.graph.len(), len);
}

#[test]
fn consumers_share_one_write_operation() {
    let Chain {
        mut graph,
        blur,
        viewer,
        ..
    } = chain();
    let second = graph.add_operation(Box::new(ViewerOperation::new(OutputImage::new(), 8, 8)));
    graph.add_link(blur, second, 0);

    assert_eq!(add_complex_operation_buffers(&mut graph), 3);
    let writes = graph.nodes().filter(|n| n.flags().is_write_buffer).count();
    assert_eq!(writes, 2);
    let proxy_of = |id: OperationId| {
        let read = graph.node(id).unwrap().input_link(0).unwrap();
        graph.node(read).unwrap().memory_proxy()
    };
    assert_eq!(proxy_of(viewer), proxy_of(second));
}

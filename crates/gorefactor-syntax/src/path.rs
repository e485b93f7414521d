// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Finding the nodes that enclose a source interval.

use gorefactor_core::text::trim_span;
use gorefactor_core::Span;

use crate::ast::{Ast, NodeId};

/// Path from `root` down to the innermost node that encloses `span`.
///
/// Leading and trailing whitespace in the interval is ignored. The result
/// starts with `root` and ends with the innermost enclosing node; it is
/// empty if `root` itself does not contain the interval.
///
/// An empty interval (a cursor) prefers a node that contains the offset
/// strictly, and falls back to one that ends exactly there, so a cursor just
/// after an identifier still selects it.
pub fn path_enclosing_interval(ast: &Ast, root: NodeId, source: &str, span: Span) -> Vec<NodeId> {
    let span = trim_span(source, span);
    if !ast.span(root).contains(&span) {
        return Vec::new();
    }

    let mut path = vec![root];
    let mut current = root;
    while let Some(child) = enclosing_child(ast, current, span) {
        path.push(child);
        current = child;
    }
    path
}

fn enclosing_child(ast: &Ast, parent: NodeId, span: Span) -> Option<NodeId> {
    let children = ast.children(parent);
    if !span.is_empty() {
        return children
            .into_iter()
            .find(|&c| ast.span(c).contains(&span));
    }
    let offset = span.start;
    let strict = children.iter().copied().find(|&c| {
        let s = ast.span(c);
        s.start <= offset && offset < s.end
    });
    strict.or_else(|| {
        children.into_iter().find(|&c| {
            let s = ast.span(c);
            !s.is_empty() && s.end == offset
        })
    })
}

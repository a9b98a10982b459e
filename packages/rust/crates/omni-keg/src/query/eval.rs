use std::collections::BTreeSet;

use super::TagExpr;
use crate::node_id::NodeId;

/// Evaluate `expr` over `universe`; `resolve` maps a tag name to its nodes.
///
/// Literals are clipped to the universe, so `not` never yields ids outside it.
pub fn evaluate<F>(expr: &TagExpr, universe: &BTreeSet<NodeId>, resolve: F) -> BTreeSet<NodeId>
where
    F: Fn(&str) -> BTreeSet<NodeId>,
{
    eval_inner(expr, universe, &resolve)
}

fn eval_inner<F>(expr: &TagExpr, universe: &BTreeSet<NodeId>, resolve: &F) -> BTreeSet<NodeId>
where
    F: Fn(&str) -> BTreeSet<NodeId>,
{
    match expr {
        TagExpr::Tag(tag) => resolve(tag).intersection(universe).cloned().collect(),
        TagExpr::Not(inner) => {
            let operand = eval_inner(inner, universe, resolve);
            universe.difference(&operand).cloned().collect()
        }
        TagExpr::And(left, right) => {
            let left = eval_inner(left, universe, resolve);
            let right = eval_inner(right, universe, resolve);
            left.intersection(&right).cloned().collect()
        }
        TagExpr::Or(left, right) => {
            let mut left = eval_inner(left, universe, resolve);
            left.extend(eval_inner(right, universe, resolve));
            left
        }
    }
}

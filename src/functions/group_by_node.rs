//! `groupByNode(seriesList, nodeNum, callback)` and
//! `groupByNodes(seriesList, callback, *nodes)`
//!
//! Series are grouped by selected segments of their dotted names. Each group
//! is then fed through `callback` by synthesizing `callback(<key>)` and
//! evaluating it against a one-entry index that maps the key to the group's
//! members. The evaluator is re-entered for every group.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregation::Reducer;
use crate::error::{ArgType, ArgumentError, ArgumentProblem, Error, Result};
use crate::functions::aggregate::AGG_FUNCS;
use crate::metrics;
use crate::query::ast::{CallExpr, Expr};
use crate::query::evaluator::EvalContext;
use crate::query::metadata::{FunctionDescriptor, FunctionParam, ParamType};
use crate::query::parser::target::is_metric_char;
use crate::query::registry::{Function, FunctionRegistry};
use crate::types::{FetchedSeriesIndex, SeriesRef};

/// Leaf name the callback template is parsed with; replaced by each group key
const GROUP_PLACEHOLDER: &str = "__group__";

/// Node-based grouping
pub struct GroupByNode;

impl GroupByNode {
    /// Node indices plus the argument position/name they came from
    fn node_args(call: &CallExpr) -> Result<(String, Vec<i64>, usize, &'static str)> {
        if call.name == "groupByNode" {
            let node = call.int_arg(1, "nodeNum")?;
            let callback = call.string_named_or_pos_arg("callback", 2, "average")?;
            Ok((callback, vec![node], 1, "nodeNum"))
        } else {
            let callback = call.string_arg(1, "callback")?;
            let nodes = call.int_args_from(2, "nodes")?;
            Ok((callback, nodes, 2, "nodes"))
        }
    }

    /// Text of the expression every group is evaluated through
    fn callback_template(ctx: &EvalContext<'_>, call: &CallExpr, callback: &str) -> Result<Expr> {
        let text = if ctx.registry().contains(callback) {
            format!("{}({})", callback, GROUP_PLACEHOLDER)
        } else if Reducer::from_name(callback).is_ok() {
            format!("aggregate({},'{}')", GROUP_PLACEHOLDER, callback)
        } else {
            return Err(Error::UnknownFunction {
                name: callback.to_string(),
                position: call.position,
            });
        };
        ctx.parse(&text)
    }
}

impl Function for GroupByNode {
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>> {
        let series = ctx.series_arg(call, 0, "seriesList")?;
        let (callback, nodes, first_node_arg, node_arg_name) = Self::node_args(call)?;
        let template = Self::callback_template(ctx, call, &callback)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<SeriesRef>> = HashMap::new();
        for s in series {
            let key = group_key(&s.name, &nodes).map_err(|(offset, message)| {
                Error::Argument(ArgumentError {
                    function: call.name.clone(),
                    index: first_node_arg + offset,
                    name: node_arg_name.to_string(),
                    expected: ArgType::Int,
                    problem: ArgumentProblem::Invalid(message),
                })
            })?;
            match groups.get_mut(&key) {
                Some(members) => members.push(s),
                None => {
                    order.push(key.clone());
                    groups.insert(key, vec![s]);
                },
            }
        }

        debug!(function = %call.name, callback = %callback, groups = order.len(), "Grouped series");

        let lenient = ctx.config().lenient_group_by;
        let mut results = Vec::new();
        for key in order {
            let members = groups.remove(&key).unwrap_or_default();
            let expr = template.substitute_metric(GROUP_PLACEHOLDER, &key);
            let index = FetchedSeriesIndex::single(key.as_str(), ctx.window(), members);

            match ctx.evaluate_with_index(&expr, &index) {
                Ok(mut evaluated) => {
                    if let Some(first) = evaluated.first_mut() {
                        *first = Arc::new(first.renamed(key.as_str()));
                    }
                    results.extend(evaluated);
                },
                Err(e) if lenient => {
                    warn!(function = %call.name, group = %key, error = %e, "Dropping group");
                    if ctx.config().metrics_enabled {
                        metrics::record_dropped_group(&call.name);
                    }
                },
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    fn describe(&self) -> Vec<FunctionDescriptor> {
        vec![
            FunctionDescriptor::new(
                "groupByNode",
                "groupByNode(seriesList, nodeNum, callback='average')",
                "Combine",
                "Takes a serieslist and maps a callback to subgroups within as defined by a \
                 common node. Negative node numbers count from the end of the name.",
                vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("nodeNum", ParamType::NodeOrTag),
                    FunctionParam::optional("callback", ParamType::AggFunc, "average").with_options(AGG_FUNCS),
                ],
            ),
            FunctionDescriptor::new(
                "groupByNodes",
                "groupByNodes(seriesList, callback, *nodes)",
                "Combine",
                "Takes a serieslist and maps a callback to subgroups within as defined by \
                 multiple nodes joined with '.'.",
                vec![
                    FunctionParam::required("seriesList", ParamType::SeriesList),
                    FunctionParam::required("callback", ParamType::AggFunc).with_options(AGG_FUNCS),
                    FunctionParam::required("nodes", ParamType::NodeOrTag).multiple(),
                ],
            ),
        ]
    }
}

/// Metric path inside a possibly function-wrapped series name
///
/// `sumSeries(a.b.c,x.y)` yields `a.b.c`; a plain name is returned whole.
pub fn extract_metric(name: &str) -> &str {
    let mut start = 0;
    let mut braces = 0usize;
    let mut end = name.len();

    for (i, c) in name.char_indices() {
        if is_metric_char(c) {
            continue;
        }
        match c {
            '{' => braces += 1,
            '}' if braces > 0 => braces -= 1,
            ',' if braces > 0 => {},
            '(' => start = i + 1,
            '}' | ',' | ')' => {
                end = i;
                break;
            },
            _ => start = i + c.len_utf8(),
        }
    }

    &name[start.min(end)..end]
}

/// Join the selected name segments into a group key
///
/// On failure returns the offending node's offset and a description.
fn group_key(name: &str, nodes: &[i64]) -> std::result::Result<String, (usize, String)> {
    let segments: Vec<&str> = extract_metric(name).split('.').collect();
    let count = segments.len() as i64;

    let mut picked = Vec::with_capacity(nodes.len());
    for (offset, &node) in nodes.iter().enumerate() {
        let resolved = if node < 0 { count + node } else { node };
        if resolved < 0 || resolved >= count {
            return Err((
                offset,
                format!("node {} is out of range for '{}' ({} nodes)", node, name, count),
            ));
        }
        picked.push(segments[resolved as usize]);
    }
    Ok(picked.join("."))
}

/// Register `groupByNode` and `groupByNodes`
pub fn register(registry: &mut FunctionRegistry) -> Result<()> {
    registry.register_all(&["groupByNode", "groupByNodes"], Arc::new(GroupByNode))
}

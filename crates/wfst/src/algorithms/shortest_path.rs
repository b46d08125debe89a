// Single-source shortest distance and n-best paths.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::fst::{ExpandedFst, MutableFst};
use crate::vector::VectorFst;
use crate::{Arc, KDELTA, NaturalOrder, Result, Semiring, StateId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortestPathConfig {
    /// Number of paths to extract.
    pub nbest: usize,
    /// Convergence tolerance of the distance computation.
    pub delta: f32,
}

impl Default for ShortestPathConfig {
    fn default() -> Self {
        Self {
            nbest: 1,
            delta: KDELTA,
        }
    }
}

/// Shortest distance from the start state to every state (forward), or from
/// every state to the final states including final weights (`reverse`).
///
/// Unreachable states get `W::zero()`. Relaxation stops once updates are
/// within `delta`.
pub fn shortest_distance<W, F>(fst: &F, reverse: bool, delta: f32) -> Result<Vec<W>>
where
    W: Semiring,
    F: ExpandedFst<W> + ?Sized,
{
    let n = fst.num_states();
    // adjacency in the direction of relaxation
    let mut adj: Vec<Vec<(StateId, W)>> = vec![Vec::new(); n];
    for s in fst.states() {
        for arc in fst.arcs(s)? {
            if reverse {
                adj[arc.nextstate].push((s, arc.weight));
            } else {
                adj[s].push((arc.nextstate, arc.weight));
            }
        }
    }

    let mut dist = vec![W::zero(); n];
    let mut residual = vec![W::zero(); n];
    let mut queued = vec![false; n];
    let mut queue = VecDeque::new();
    if reverse {
        for s in fst.states() {
            if let Some(w) = fst.final_weight(s)? {
                dist[s] = w;
                residual[s] = w;
                queued[s] = true;
                queue.push_back(s);
            }
        }
    } else if let Some(start) = fst.start() {
        dist[start] = W::one();
        residual[start] = W::one();
        queued[start] = true;
        queue.push_back(start);
    }

    while let Some(q) = queue.pop_front() {
        queued[q] = false;
        let r = residual[q];
        residual[q] = W::zero();
        for &(next, w) in &adj[q] {
            let add = r.times(&w);
            let updated = dist[next].plus(&add);
            if !dist[next].approx_eq(&updated, delta) {
                dist[next] = updated;
                residual[next] = residual[next].plus(&add);
                if !queued[next] {
                    queued[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    Ok(dist)
}

/// The `nbest` best accepting paths of `fst`.
///
/// Each path becomes its own chain from a shared start state, in order of
/// increasing weight. `nbest == 0` or an automaton without accepting paths
/// yields an automaton with no states.
pub fn shortest_path<W, F>(fst: &F, nbest: usize) -> Result<VectorFst<W>>
where
    W: NaturalOrder,
    F: ExpandedFst<W> + ?Sized,
{
    shortest_path_with_config(
        fst,
        &ShortestPathConfig {
            nbest,
            ..ShortestPathConfig::default()
        },
    )
}

/// A partial path: where it ends, what it weighs, and how it got there.
struct PathNode<W> {
    /// `None` for the super-final node that closes a complete path.
    state: Option<StateId>,
    weight: W,
    parent: Option<usize>,
    arc: Option<Arc<W>>,
}

struct HeapEntry<W> {
    priority: W,
    node: usize,
}

impl<W: NaturalOrder> Ord for HeapEntry<W> {
    // reversed so BinaryHeap pops the best priority; ties go to the oldest node
    fn cmp(&self, other: &Self) -> Ordering {
        if self.priority.natural_less(&other.priority) {
            Ordering::Greater
        } else if other.priority.natural_less(&self.priority) {
            Ordering::Less
        } else {
            other.node.cmp(&self.node)
        }
    }
}

impl<W: NaturalOrder> PartialOrd for HeapEntry<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W: NaturalOrder> PartialEq for HeapEntry<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W: NaturalOrder> Eq for HeapEntry<W> {}

/// [`shortest_path`] with explicit options.
pub fn shortest_path_with_config<W, F>(fst: &F, config: &ShortestPathConfig) -> Result<VectorFst<W>>
where
    W: NaturalOrder,
    F: ExpandedFst<W> + ?Sized,
{
    let mut result = VectorFst::new();
    result.set_input_symbols(fst.input_symbols().cloned());
    result.set_output_symbols(fst.output_symbols().cloned());
    let Some(start) = fst.start() else {
        return Ok(result);
    };
    if config.nbest == 0 {
        return Ok(result);
    }
    let rev = shortest_distance(fst, true, config.delta)?;
    if rev[start].is_zero() {
        return Ok(result);
    }

    let mut nodes = vec![PathNode {
        state: Some(start),
        weight: W::one(),
        parent: None,
        arc: None,
    }];
    let mut heap = BinaryHeap::new();
    heap.push(HeapEntry {
        priority: rev[start],
        node: 0,
    });
    let mut pops = vec![0usize; fst.num_states()];
    let mut complete = Vec::new();

    while let Some(HeapEntry { node, .. }) = heap.pop() {
        let (state, weight) = (nodes[node].state, nodes[node].weight);
        let Some(state) = state else {
            complete.push(node);
            if complete.len() == config.nbest {
                break;
            }
            continue;
        };
        if pops[state] >= config.nbest {
            continue;
        }
        pops[state] += 1;

        if let Some(f) = fst.final_weight(state)? {
            let total = weight.times(&f);
            nodes.push(PathNode {
                state: None,
                weight: total,
                parent: Some(node),
                arc: None,
            });
            heap.push(HeapEntry {
                priority: total,
                node: nodes.len() - 1,
            });
        }
        for arc in fst.arcs(state)? {
            if rev[arc.nextstate].is_zero() {
                continue;
            }
            let next_weight = weight.times(&arc.weight);
            nodes.push(PathNode {
                state: Some(arc.nextstate),
                weight: next_weight,
                parent: Some(node),
                arc: Some(*arc),
            });
            heap.push(HeapEntry {
                priority: next_weight.times(&rev[arc.nextstate]),
                node: nodes.len() - 1,
            });
        }
    }

    let new_start = result.add_state();
    result.set_start(new_start)?;
    for &last in &complete {
        // the super-final node hangs off the node of the final state
        let end = nodes[last].parent.and_then(|p| nodes[p].state).unwrap_or(start);
        let final_weight = fst.final_weight(end)?.unwrap_or_else(W::zero);
        let mut arcs = Vec::new();
        let mut cursor = nodes[last].parent;
        while let Some(i) = cursor {
            arcs.extend(nodes[i].arc);
            cursor = nodes[i].parent;
        }
        arcs.reverse();

        let mut prev = new_start;
        for arc in arcs {
            let next = result.add_state();
            result.add_arc(prev, Arc::new(arc.ilabel, arc.olabel, arc.weight, next))?;
            prev = next;
        }
        result.set_final(prev, final_weight)?;
    }
    log::debug!(
        "shortest_path: {} of {} requested paths, {} search nodes",
        complete.len(),
        config.nbest,
        nodes.len()
    );
    Ok(result)
}

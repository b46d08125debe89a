// Epsilon removal.
//
// The epsilon graph (arcs labelled 0:0) is condensed into strongly connected
// components. Inside a component every arc must weigh one, so all of its
// states share one closure; closures are then propagated over the acyclic
// condensation in topological order.

use serde::{Deserialize, Serialize};

use crate::algorithms::connect::connect;
use crate::fst::MutableFst;
use crate::{Arc, FstError, KDELTA, Result, Semiring, StateId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmEpsilonConfig {
    /// Trim useless states afterwards.
    pub connect: bool,
    /// Tolerance used to decide whether a cycle weight is one.
    pub delta: f32,
}

impl Default for RmEpsilonConfig {
    fn default() -> Self {
        Self {
            connect: true,
            delta: KDELTA,
        }
    }
}

/// Remove every `0:0` arc, preserving weighted paths.
pub fn rm_epsilon<W, F>(fst: &mut F) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    rm_epsilon_with_config(fst, &RmEpsilonConfig::default())
}

/// [`rm_epsilon`] with explicit options.
///
/// Epsilon cycles whose arcs all weigh one collapse to a single closure.
/// An epsilon arc with any other weight inside an epsilon cycle has no
/// finite closure in general and fails with [`FstError::EpsilonCycle`];
/// the automaton is left unchanged in that case.
pub fn rm_epsilon_with_config<W, F>(fst: &mut F, config: &RmEpsilonConfig) -> Result<()>
where
    W: Semiring,
    F: MutableFst<W> + ?Sized,
{
    let n = fst.num_states();
    let mut eps: Vec<Vec<(StateId, W)>> = vec![Vec::new(); n];
    let mut other: Vec<Vec<Arc<W>>> = vec![Vec::new(); n];
    let mut finals: Vec<Option<W>> = Vec::with_capacity(n);
    let mut num_eps = 0;
    for s in fst.states() {
        for arc in fst.arcs(s)? {
            if arc.is_epsilon() {
                eps[s].push((arc.nextstate, arc.weight));
                num_eps += 1;
            } else {
                other[s].push(*arc);
            }
        }
        finals.push(fst.final_weight(s)?);
    }
    if num_eps == 0 {
        return Ok(());
    }

    let (scc, num_scc) = strong_components(&eps);
    let one = W::one();
    for (s, arcs) in eps.iter().enumerate() {
        for &(t, w) in arcs {
            if scc[s] == scc[t] && !w.approx_eq(&one, config.delta) {
                return Err(FstError::EpsilonCycle { state: s });
            }
        }
    }

    let mut members: Vec<Vec<StateId>> = vec![Vec::new(); num_scc];
    for (s, &c) in scc.iter().enumerate() {
        members[c].push(s);
    }
    // condensation: component -> (component, weight), crossing arcs only
    let mut condensed: Vec<Vec<(usize, W)>> = vec![Vec::new(); num_scc];
    for (s, arcs) in eps.iter().enumerate() {
        for &(t, w) in arcs {
            if scc[s] != scc[t] {
                condensed[scc[s]].push((scc[t], w));
            }
        }
    }

    let mut new_arcs: Vec<Vec<Arc<W>>> = vec![Vec::new(); num_scc];
    let mut new_finals: Vec<Option<W>> = vec![None; num_scc];
    let mut dist: Vec<Option<W>> = vec![None; num_scc];
    let mut seen = vec![false; num_scc];
    for root in 0..num_scc {
        // components reachable from root over epsilon arcs
        let mut reachable = vec![root];
        seen[root] = true;
        let mut i = 0;
        while i < reachable.len() {
            for &(c, _) in &condensed[reachable[i]] {
                if !seen[c] {
                    seen[c] = true;
                    reachable.push(c);
                }
            }
            i += 1;
        }
        // crossing arcs always lead to lower component ids
        reachable.sort_unstable_by(|a, b| b.cmp(a));

        dist[root] = Some(one);
        for &c in &reachable {
            let Some(d) = dist[c] else { continue };
            for &(next, w) in &condensed[c] {
                let add = d.times(&w);
                dist[next] = Some(match dist[next] {
                    Some(old) => old.plus(&add),
                    None => add,
                });
            }
        }

        let mut final_weight: Option<W> = None;
        for &c in &reachable {
            let Some(d) = dist[c] else { continue };
            for &t in &members[c] {
                for arc in &other[t] {
                    let weight = d.times(&arc.weight);
                    if !weight.is_zero() {
                        new_arcs[root].push(Arc::new(arc.ilabel, arc.olabel, weight, arc.nextstate));
                    }
                }
                if let Some(f) = finals[t] {
                    let add = d.times(&f);
                    final_weight = Some(match final_weight {
                        Some(old) => old.plus(&add),
                        None => add,
                    });
                }
            }
        }
        new_finals[root] = final_weight;

        for &c in &reachable {
            dist[c] = None;
            seen[c] = false;
        }
    }

    for s in 0..n {
        let c = scc[s];
        fst.set_arcs(s, new_arcs[c].clone())?;
        fst.set_final(s, new_finals[c].unwrap_or_else(W::zero))?;
    }
    log::debug!(
        "rm_epsilon: removed {num_eps} epsilon arcs over {n} states ({num_scc} components)"
    );

    if config.connect {
        connect(fst)?;
    }
    Ok(())
}

/// Tarjan's algorithm, iteratively. Returns the component of every state and
/// the number of components. Components are numbered in completion order, so
/// an arc between two components always points to the lower id.
fn strong_components<W>(adj: &[Vec<(StateId, W)>]) -> (Vec<usize>, usize) {
    const UNVISITED: usize = usize::MAX;
    let n = adj.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut scc = vec![0; n];
    let mut counter = 0;
    let mut num_scc = 0;

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = counter;
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;
        let mut call: Vec<(StateId, usize)> = vec![(root, 0)];

        while let Some(top) = call.last_mut() {
            let v = top.0;
            if let Some(&(w, _)) = adj[v].get(top.1) {
                top.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = counter;
                    low[w] = counter;
                    counter += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    low[v] = low[v].min(index[w]);
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if low[v] == index[v] {
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    scc[w] = num_scc;
                    if w == v {
                        break;
                    }
                }
                num_scc += 1;
            }
        }
    }
    (scc, num_scc)
}

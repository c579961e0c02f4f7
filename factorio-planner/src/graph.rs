// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
use std::collections::BTreeSet;

const WORD_BITS: usize = u64::BITS as usize;

/// Unweighted directed graph over `0..len` vertices, stored as a bit-packed
/// square adjacency matrix. `edge(i, j)` means i points at j.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedGraph {
    len: usize,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl DirectedGraph {
    /// Edge-free graph with `len` vertices.
    pub fn new(len: usize) -> Self {
        let words_per_row = len.div_ceil(WORD_BITS);
        DirectedGraph {
            len,
            words_per_row,
            bits: vec![0; len * words_per_row],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn add_edge(&mut self, from: usize, to: usize) {
        assert!(from < self.len && to < self.len, "vertex out of bounds");
        self.bits[from * self.words_per_row + to / WORD_BITS] |= 1 << (to % WORD_BITS);
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        assert!(from < self.len && to < self.len, "vertex out of bounds");
        self.bits[from * self.words_per_row + to / WORD_BITS] & (1 << (to % WORD_BITS)) != 0
    }

    /// Iterate the successors of a vertex in ascending order.
    pub fn successors(&self, from: usize) -> impl Iterator<Item = usize> + '_ {
        assert!(from < self.len, "vertex out of bounds");
        let row = &self.bits[from * self.words_per_row..(from + 1) * self.words_per_row];
        row.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(word_idx * WORD_BITS + bit)
            })
        })
    }

    /// Find every vertex group participating in at least one directed cycle.
    ///
    /// Raw cycles are collected by a stack DFS carrying the current visit
    /// path; any two cycles sharing a vertex are then unioned, so the result
    /// is a list of pairwise-disjoint sorted vertex groups at the granularity
    /// of mutually reachable vertices, not minimal simple cycles. Self-loops
    /// count as cycles of size one.
    pub fn cyclic_vertex_groups(&self) -> Vec<Vec<usize>> {
        let mut cycles: Vec<BTreeSet<usize>> = Vec::new();
        let mut unexplored = vec![true; self.len];
        while unexplored.iter().any(|&pending| pending) {
            // Restrict to the not-yet-explored submatrix; local ids index
            // into `live`.
            let live: Vec<usize> = (0..self.len).filter(|&v| unexplored[v]).collect();
            let mut local = vec![usize::MAX; self.len];
            for (li, &v) in live.iter().enumerate() {
                local[v] = li;
            }
            let local_successors = |li: usize| -> Vec<usize> {
                self.successors(live[li])
                    .filter(|&v| local[v] != usize::MAX)
                    .map(|v| local[v])
                    .collect()
            };

            let mut touched: Vec<usize> = vec![0];
            let mut path: Vec<usize> = vec![0];
            let mut frontier: Vec<Vec<usize>> = vec![local_successors(0)];
            while !path.is_empty() {
                let mut descended = false;
                while let Some(vertex) = frontier.last_mut().and_then(|top| top.pop()) {
                    if let Some(at) = path.iter().position(|&p| p == vertex) {
                        // Stepped back onto the current path: the suffix from
                        // the first occurrence is a cycle.
                        cycles.push(path[at..].iter().map(|&li| live[li]).collect());
                    } else {
                        touched.push(vertex);
                        let downstream = local_successors(vertex);
                        // A vertex without outgoing edges cannot close a
                        // cycle; consume it without descending.
                        if !downstream.is_empty() {
                            path.push(vertex);
                            frontier.push(downstream);
                            descended = true;
                            break;
                        }
                    }
                }
                if !descended {
                    frontier.pop();
                    path.pop();
                }
            }
            for li in touched {
                unexplored[live[li]] = false;
            }
        }
        union_non_disjoint(&mut cycles);
        cycles
            .into_iter()
            .map(|group| group.into_iter().collect())
            .collect()
    }
}

/// Union sets in place until all remaining sets are pairwise disjoint.
fn union_non_disjoint(sets: &mut Vec<BTreeSet<usize>>) {
    loop {
        let mut merged = None;
        'scan: for i in 0..sets.len() {
            for j in (i + 1)..sets.len() {
                if !sets[i].is_disjoint(&sets[j]) {
                    merged = Some((i, j));
                    break 'scan;
                }
            }
        }
        match merged {
            Some((i, j)) => {
                let absorbed = sets.remove(j);
                sets[i].extend(absorbed);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(len: usize, edges: &[(usize, usize)]) -> DirectedGraph {
        let mut g = DirectedGraph::new(len);
        for &(from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    #[test]
    fn successors_iterate_set_bits() {
        let g = graph(70, &[(0, 1), (0, 69), (0, 3)]);
        assert_eq!(g.successors(0).collect::<Vec<_>>(), vec![1, 3, 69]);
        assert_eq!(g.successors(1).count(), 0);
    }

    #[test]
    fn acyclic_graph_has_no_groups() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (0, 3)]);
        assert!(g.cyclic_vertex_groups().is_empty());
    }

    #[test]
    fn simple_cycle_is_one_group() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 0), (3, 0)]);
        assert_eq!(g.cyclic_vertex_groups(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn self_loop_counts_as_cycle_of_one() {
        let g = graph(3, &[(1, 1), (0, 1)]);
        assert_eq!(g.cyclic_vertex_groups(), vec![vec![1]]);
    }

    #[test]
    fn disjoint_cycles_stay_separate() {
        let g = graph(5, &[(0, 1), (1, 0), (2, 3), (3, 2), (4, 2)]);
        let groups = g.cyclic_vertex_groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.contains(&vec![0, 1]));
        assert!(groups.contains(&vec![2, 3]));
    }

    #[test]
    fn overlapping_cycles_union() {
        // two triangles sharing vertex 2
        let g = graph(
            5,
            &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 2)],
        );
        assert_eq!(g.cyclic_vertex_groups(), vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn cycle_found_past_explored_pass() {
        // vertex 0 is a dead end; the cycle sits behind it and must still be
        // discovered by a later pass.
        let g = graph(4, &[(1, 2), (2, 3), (3, 1)]);
        assert_eq!(g.cyclic_vertex_groups(), vec![vec![1, 2, 3]]);
    }
}

//! Path swapping: combine a feasible and an infeasible parsing into
//! one parsing meeting the weight bound at minimal cost.
//!
//! Both parsings are scanned in text order with two phrase cursors. At
//! every step the combined solution "prefix of one side + bridge edge +
//! suffix of the other" is evaluated; the best feasible combination
//! wins. The bridge reuses the other side's incoming copy distance with
//! the truncated length, so LZ77 semantics are preserved.

use crate::encoders::EncoderInfo;
use crate::error::{Error, Result};
use crate::model::{CostModel, Edge};
use crate::parsing::PhraseReader;

/// Swaps two encoded parsings of the same text.
pub struct PathSwapper<'a> {
    enc: EncoderInfo,
    parsings: [&'a [u8]; 2],
    orig_len: usize,
    costs: [f64; 2],
    weights: [f64; 2],
    cost_cm: &'a CostModel,
    weight_cm: &'a CostModel,
}

impl<'a> PathSwapper<'a> {
    /// Set up over two encoded bodies with their total (cost, weight).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enc: EncoderInfo,
        p_1: &'a [u8],
        cost_1: f64,
        weight_1: f64,
        p_2: &'a [u8],
        cost_2: f64,
        weight_2: f64,
        orig_len: usize,
        cost_cm: &'a CostModel,
        weight_cm: &'a CostModel,
    ) -> Self {
        PathSwapper {
            enc,
            parsings: [p_1, p_2],
            orig_len,
            costs: [cost_1, cost_2],
            weights: [weight_1, weight_2],
            cost_cm,
            weight_cm,
        }
    }

    /// (cost, weight) of one edge; zero-length bridges are free.
    fn edge_costweight(&self, d: u32, ell: u32) -> (f64, f64) {
        if ell == 0 {
            return (0.0, 0.0);
        }
        let edge = self.cost_cm.get_edge(d, ell);
        (self.cost_cm.edge_cost(&edge), self.weight_cm.edge_cost(&edge))
    }

    /// Locate the best swap: which side's prefix to keep and up to
    /// which position.
    fn swap_points(&self, w_bound: f64) -> Result<(usize, usize, f64)> {
        let mut readers = [
            PhraseReader::new(&self.enc, self.parsings[0], self.orig_len),
            PhraseReader::new(&self.enc, self.parsings[1], self.orig_len),
        ];
        let mut heads = [0u32; 2];
        let mut head_costs = [0.0f64; 2];
        let mut head_weights = [0.0f64; 2];
        let mut tail_costs = self.costs;
        let mut tail_weights = self.weights;
        let mut incoming = [Edge::literal(0); 2];

        let mut best_cost = f64::INFINITY;
        let mut swap_sol = usize::MAX;
        let mut swap_point = 0usize;

        while !readers[0].end() && !readers[1].end() {
            let mut to_process: [usize; 2] = [0; 2];
            let mut swaps = 0usize;
            if heads[0] <= heads[1] {
                to_process[swaps] = 0;
                swaps += 1;
            }
            if heads[1] <= heads[0] {
                to_process[swaps] = 1;
                swaps += 1;
            }

            // Evaluate both candidate swaps before advancing.
            for &s in &to_process[..swaps] {
                let o = 1 - s;
                let d_bridge = incoming[o].d;
                let ell_bridge = heads[o] - heads[s];
                let (bridge_cost, bridge_weight) = self.edge_costweight(d_bridge, ell_bridge);
                let s_w = head_weights[s] + bridge_weight + tail_weights[o];
                let s_c = head_costs[s] + bridge_cost + tail_costs[o];
                if s_w <= w_bound && s_c < best_cost {
                    best_cost = s_c;
                    swap_point = heads[s] as usize;
                    swap_sol = s;
                }
            }

            // Advance the chosen sides; after a copy on the other side,
            // keep going until the head passes it (only swap points
            // following a copy are valid there).
            let old_heads = heads;
            for &s in &to_process[..swaps] {
                let o = 1 - s;
                let other_was_copy = !incoming[o].is_literal();
                loop {
                    let (d, ell) = readers[s].next();
                    heads[s] += ell;
                    let (ec, ew) = self.edge_costweight(d, ell);
                    head_costs[s] += ec;
                    tail_costs[s] -= ec;
                    head_weights[s] += ew;
                    tail_weights[s] -= ew;
                    incoming[s] = self.cost_cm.get_edge(d, ell);
                    if !(heads[s] <= old_heads[o] && other_was_copy) {
                        break;
                    }
                }
            }
        }

        if swap_sol == usize::MAX {
            return Err(Error::CorruptedData(
                "no swap point found between basis parsings".into(),
            ));
        }
        Ok((swap_sol, swap_point, best_cost))
    }

    /// Materialize the swapped edge sequence.
    fn generate(&self, first_idx: usize, swap_point: usize) -> Vec<Edge> {
        let l = self.orig_len;
        let mut out = vec![Edge::INVALID; l + 1];
        let mut readers = [
            PhraseReader::new(&self.enc, self.parsings[0], self.orig_len),
            PhraseReader::new(&self.enc, self.parsings[1], self.orig_len),
        ];

        // Prefix of the kept side.
        let mut pos = 0usize;
        let mut cur = first_idx;
        while pos < swap_point {
            let (d, len) = readers[cur].next();
            debug_assert!(len > 0);
            out[pos] = self.cost_cm.get_edge(d, len);
            pos += len as usize;
        }
        debug_assert_eq!(pos, swap_point);

        // Skip the other side past the same prefix; the phrase
        // straddling the boundary becomes the (truncated) bridge.
        pos = 0;
        cur = 1 - cur;
        let (mut d, mut len) = (0u32, 0u32);
        while pos < swap_point {
            let (nd, nl) = readers[cur].next();
            d = nd;
            len = nl;
            pos += len as usize;
        }
        out[swap_point] = self.cost_cm.get_edge(d, (pos - swap_point) as u32);

        // Suffix of the other side.
        while pos < l {
            let (nd, nl) = readers[cur].next();
            d = nd;
            len = nl;
            debug_assert!(len > 0);
            out[pos] = self.cost_cm.get_edge(d, len);
            pos += len as usize;
        }
        out[l] = self.cost_cm.get_edge(d, len);
        out
    }

    /// Find the optimal swap under `w_bound` and build the parsing.
    /// Also returns the combined cost found during the scan.
    pub fn swap(&self, w_bound: f64) -> Result<(Vec<Edge>, f64)> {
        let (first_idx, swap_point, best_cost) = self.swap_points(w_bound)?;
        Ok((self.generate(first_idx, swap_point), best_cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::lookup;
    use crate::meter::Silent;
    use crate::model::fuse;
    use crate::parsing::{check_correctness, parsing_length, write_parsing};
    use crate::text::Text;
    use std::rc::Rc;

    /// Build two different parsings of one text: the bit-optimal one
    /// and a literal-heavy one.
    fn two_parsings(data: &[u8]) -> (Text, Vec<Edge>, Vec<Edge>) {
        let text = Text::new(data.to_vec());
        let enc = lookup("soda09_8").unwrap();
        let cm = enc.cost_model();
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = crate::fsg::gen_fast_fsg(&text, sa, &cm).unwrap();
        let (optimal, _) = crate::parser::parse(&mut fsg, 255, &cm, &mut Silent);

        // All-literal alternative, chunked to the literal window.
        let mut lits = vec![Edge::INVALID; data.len() + 1];
        let mut pos = 0usize;
        while pos < data.len() {
            let ell = (data.len() - pos).min(255) as u32;
            lits[pos] = Edge::literal(ell);
            pos += ell as usize;
        }
        (text, optimal, lits)
    }

    #[test]
    fn test_swap_meets_bound_and_is_correct() {
        let data: Vec<u8> = (0..600usize)
            .map(|i| ((i * 3 + i / 11) % 7) as u8 + b'a')
            .collect();
        let (text, optimal, literal) = two_parsings(&data);
        let enc = lookup("soda09_8").unwrap();
        let cost_cm = enc.cost_model();
        // Weight model punishing copies, making the literal parsing
        // the weight-optimal one.
        let weight_cm = {
            let mut dcosts = vec![1000.0; cost_cm.dst().len()];
            dcosts[0] = 800.0;
            fuse(
                &crate::model::CostModel::from_classes(
                    crate::model::ClassInfo::new(cost_cm.dst().to_vec(), dcosts),
                    crate::model::ClassInfo::new(
                        cost_cm.len().to_vec(),
                        vec![10.0; cost_cm.len().len()],
                    ),
                    5.0,
                    1.0,
                    0.0,
                ),
                &cost_cm,
                0.0,
            )
        };
        let cost_cm = fuse(&cost_cm, &weight_cm, 0.0);

        let comp_a = write_parsing(&optimal, &text, &enc);
        let comp_b = write_parsing(&literal, &text, &enc);
        let (ca, wa) = (
            parsing_length(&optimal, &cost_cm),
            parsing_length(&optimal, &weight_cm),
        );
        let (cb, wb) = (
            parsing_length(&literal, &cost_cm),
            parsing_length(&literal, &weight_cm),
        );
        assert!(wb < wa, "literal parsing must be lighter");

        // Bound between the two weights.
        let w_bound = (wa + wb) / 2.0;
        let swapper = PathSwapper::new(
            enc,
            comp_b.body().unwrap(),
            cb,
            wb,
            comp_a.body().unwrap(),
            ca,
            wa,
            data.len(),
            &cost_cm,
            &weight_cm,
        );
        let max_w = {
            let e = cost_cm.get_edge(*cost_cm.dst().last().unwrap(), *cost_cm.len().last().unwrap());
            weight_cm.edge_cost(&e)
        };
        let (swapped, _) = swapper.swap(w_bound + 2.0 * max_w).unwrap();

        check_correctness(&swapped, &data).unwrap();
        let sw = parsing_length(&swapped, &weight_cm);
        assert!(
            sw <= w_bound + 2.0 * max_w + 1e-6,
            "swapped weight {} above bound {}",
            sw,
            w_bound
        );
        // Never worse than the feasible endpoint.
        let sc = parsing_length(&swapped, &cost_cm);
        assert!(sc <= cb + 1e-6);
    }
}

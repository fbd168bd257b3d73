//! Optimal sub-ladder selection for the generalized generator.
//!
//! Serving every distance class of a rich cost model needs one sliding
//! block chain per class. Most classes can instead borrow the chain of
//! a coarser class: this module picks, by dynamic programming, the
//! subsequence of distance thresholds minimizing total block storage,
//! subject to each kept step dividing the next (so equal splitters keep
//! working).

use std::collections::BTreeMap;

/// Storage cost of jumping from threshold `i` to threshold `j`.
fn edge_cost(dsts: &[u32], i: usize, j: usize) -> u64 {
    let span = (dsts[j] - dsts[i]) as u64;
    let rsa_cost = if i == 0 { 0 } else { span };
    rsa_cost + (j - i) as u64 * span
}

/// Select the storage-minimal subsequence of `dsts` (ascending
/// thresholds). The result always ends with the last threshold.
pub fn get_seq(dsts: &[u32]) -> Vec<u32> {
    let mut d: Vec<u32> = Vec::with_capacity(dsts.len() + 1);
    d.push(0);
    d.extend_from_slice(dsts);

    // opt[i]: class size -> (best cost, pred index, pred's pred index)
    let mut opt: Vec<BTreeMap<u32, (u64, usize, usize)>> = vec![BTreeMap::new(); d.len()];
    opt[0].insert(1, (0, 0, 0));

    for i in 1..d.len() {
        for j in 0..i {
            let cost_class = d[i] - d[j];
            let jump_cost = edge_cost(&d, j, i);
            let mut best = u64::MAX;
            let mut pred = 0usize;
            for (&p_class, &(p_cost, p_pred, _)) in &opt[j] {
                let cost = jump_cost + p_cost;
                let is_last = i == d.len() - 1;
                let is_double = d[i] == d[j] * 2 && p_pred == 0;
                let is_multiple = cost_class % p_class == 0 && cost_class / p_class > 1;
                if (is_last || is_double || is_multiple) && cost < best {
                    best = cost;
                    pred = p_pred;
                }
            }
            if best != u64::MAX {
                opt[i].insert(cost_class, (best, j, pred));
            }
        }
    }

    // Best entry at the last threshold, then walk predecessors back.
    let mut opt_cost = u64::MAX;
    let (mut pred, mut p_pred) = (0usize, 0usize);
    for &(cost, t_pred, t_p_pred) in opt[d.len() - 1].values() {
        if cost < opt_cost {
            opt_cost = cost;
            pred = t_pred;
            p_pred = t_p_pred;
        }
    }

    let mut sol = Vec::new();
    let mut pos = d.len() - 1;
    while pos > 0 {
        sol.push(pos);
        pos = pred;
        pred = p_pred;
        for &(_, t_pred, t_p_pred) in opt[pos].values() {
            if t_pred == pred {
                p_pred = t_p_pred;
                break;
            }
        }
    }
    sol.reverse();
    sol.into_iter().map(|i| d[i]).collect()
}

/// For each original threshold, the index of the kept threshold
/// covering it (its "father" in the reduced ladder).
fn get_father(dst: &[u32], sol: &[u32]) -> Vec<usize> {
    dst.iter()
        .map(|&i| {
            let covering = sol[sol.partition_point(|&s| s < i)];
            dst.iter().position(|&x| x == covering).expect("kept threshold")
        })
        .collect()
}

/// Map each original level to its position in the reduced ladder.
pub fn get_opt_father(dst: &[u32], sol: &[u32]) -> Vec<usize> {
    let father = get_father(dst, sol);
    let mut out = Vec::with_capacity(dst.len());
    let mut selected = 0usize;
    for (i, &f) in father.iter().enumerate() {
        out.push(selected);
        if i == f {
            selected += 1;
        }
    }
    out
}

/// Per original level, the start-of-generation threshold of its father.
pub fn get_thresholds(dst: &[u32], sol: &[u32], opt_father: &[usize]) -> Vec<u32> {
    let mut padded = Vec::with_capacity(sol.len() + 1);
    padded.push(0);
    padded.extend_from_slice(sol);
    (0..dst.len()).map(|i| padded[opt_father[i]]).collect()
}

/// Per original level, the block size of its father.
pub fn get_costs(dst: &[u32], sol: &[u32], opt_father: &[usize]) -> Vec<u32> {
    let mut sizes = sol.to_vec();
    for i in (1..sizes.len()).rev() {
        sizes[i] -= sizes[i - 1];
    }
    (0..dst.len()).map(|i| sizes[opt_father[i]]).collect()
}

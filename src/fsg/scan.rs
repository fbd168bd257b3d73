//! Predecessor/successor scans over an RSA block.
//!
//! A reduced suffix array lists window and block positions in SA order.
//! One forward pass resolves, for every block position, the nearest
//! following SA neighbor within the distance window (its successor); the
//! reverse pass resolves predecessors. Both passes run a monotone deque:
//! pending block positions sit in the queue in increasing position
//! order, and are popped either by a window candidate close enough or by
//! a smaller block position.

use std::collections::VecDeque;

/// Sentinel meaning "no neighbor inside the window".
pub const NO_MATCH: u32 = u32::MAX;

/// Which tuple slot a pass fills.
#[derive(Clone, Copy)]
enum Slot {
    Pred,
    Succ,
}

#[inline]
fn store(out: &mut [(u32, u32)], base: u32, position: u32, value: u32, slot: Slot) {
    let entry = &mut out[(position - base) as usize];
    match slot {
        Slot::Pred => entry.0 = value,
        Slot::Succ => entry.1 = value,
    }
}

/// One monotone-deque step. Positions below `first_b` are window
/// candidates; the rest are block queries.
#[inline]
fn update(
    p: u32,
    first_b: u32,
    max_dst: u32,
    queue: &mut VecDeque<u32>,
    out: &mut [(u32, u32)],
    out_base: u32,
    slot: Slot,
) {
    if p < first_b {
        while let Some(&front) = queue.front() {
            if p + max_dst >= front {
                store(out, out_base, front, p, slot);
                queue.pop_front();
            } else {
                break;
            }
        }
    } else {
        while let Some(&back) = queue.back() {
            if back > p {
                store(out, out_base, back, p, slot);
                queue.pop_back();
            } else {
                break;
            }
        }
        queue.push_back(p);
    }
}

fn finish(queue: &mut VecDeque<u32>, out: &mut [(u32, u32)], out_base: u32, slot: Slot) {
    for &q in queue.iter() {
        store(out, out_base, q, NO_MATCH, slot);
    }
    queue.clear();
}

/// Fill `out[i]` with the (pred, succ) pair of block position
/// `first_b + i`, restricted to distance `max_dst`. Requires the block
/// to be no larger than `max_dst` (see [`split_find`] otherwise).
pub fn smart_find(rsa: &[u32], first_b: u32, max_dst: u32, out: &mut [(u32, u32)]) {
    let mut queue = VecDeque::with_capacity(out.len());
    for &p in rsa {
        update(p, first_b, max_dst, &mut queue, out, first_b, Slot::Succ);
    }
    finish(&mut queue, out, first_b, Slot::Succ);
    for &p in rsa.iter().rev() {
        update(p, first_b, max_dst, &mut queue, out, first_b, Slot::Pred);
    }
    finish(&mut queue, out, first_b, Slot::Pred);
}

/// Like [`smart_find`], but for blocks spanning several distance
/// windows: the block is cut into `max_dst`-sized zones, each query
/// resolved by its own queue, each element also feeding the next zone.
pub fn split_find(rsa: &[u32], first_b: u32, max_dst: u32, out: &mut [(u32, u32)]) {
    if out.len() <= max_dst as usize {
        smart_find(rsa, first_b, max_dst, out);
        return;
    }
    let zones = out.len().div_ceil(max_dst as usize);

    let mut pass = |forward: bool, slot: Slot| {
        let mut queues: Vec<VecDeque<u32>> = (0..zones)
            .map(|i| {
                let size = (out.len() - max_dst as usize * i).min(max_dst as usize);
                VecDeque::with_capacity(size)
            })
            .collect();
        let first = first_b.saturating_sub(max_dst);
        let mut step = |p: u32| {
            if p < first {
                return;
            }
            let zone = if p < first_b {
                0
            } else {
                1 + (p - first_b) as usize / max_dst as usize
            };
            if zone > 0 {
                let class_base = first_b + (zone as u32 - 1) * max_dst;
                update(p, class_base, max_dst, &mut queues[zone - 1], out, first_b, slot);
            }
            if zone < zones {
                let class_base = first_b + zone as u32 * max_dst;
                update(p, class_base, max_dst, &mut queues[zone], out, first_b, slot);
            }
        };
        if forward {
            for &p in rsa {
                step(p);
            }
        } else {
            for &p in rsa.iter().rev() {
                step(p);
            }
        }
        for queue in &mut queues {
            finish(queue, out, first_b, slot);
        }
    };

    pass(true, Slot::Succ);
    pass(false, Slot::Pred);
}

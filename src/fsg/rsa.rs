//! Sliding reduced suffix arrays.
//!
//! A reduced suffix array (RSA) lists a contiguous range of text
//! positions in suffix-array order. The engine keeps, per distance cost
//! class, a ring of fixed-size blocks over pre-allocated storage:
//! B-blocks aligned to the class grid serve the positions being parsed,
//! W-blocks aligned to the text grid serve the lagging windows. Blocks
//! are refilled top-down by splitting the parent class's block as the
//! parse advances; only the coarsest level is ever built straight from
//! the suffix array.

use std::collections::HashMap;
use std::rc::Rc;

/// Entries are (text position, suffix-array rank); blocks keep them in
/// rank order so windows can be merged back into SA order.
type Entry = (u32, u32);

#[derive(Debug, Clone, Copy)]
struct Block {
    start: u32,
    len: u32,
    storage_off: usize,
}

#[derive(Debug)]
struct Level {
    blocks: Vec<Block>,
    head: usize,
    filled: usize,
    next_start: u32,
    block_size: u32,
}

impl Level {
    fn capacity(&self) -> usize {
        self.blocks.len()
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.blocks.len()
    }
}

/// One family of sliding blocks (either the B or the W grid).
#[derive(Debug)]
pub struct RsaGetter {
    storage: Vec<Entry>,
    sa: Rc<Vec<i32>>,
    levels: Vec<Level>,
    size_to_level: HashMap<u32, usize>,
    t_len: usize,
    scratch: Vec<Entry>,
}

/// Class sizes of a distance ladder, with the last capped at `t_len`.
pub fn cost_classes(dst: &[u32], t_len: usize) -> Vec<u32> {
    debug_assert!(!dst.is_empty());
    let mut out = dst.to_vec();
    let last = out.len() - 1;
    out[last] = out[last].min(t_len as u32);
    for i in (1..out.len()).rev() {
        out[i] -= out[i - 1];
    }
    out
}

/// Truncate a distance ladder at the text length.
pub fn normalize_dst(dst: &[u32], t_len: usize) -> Vec<u32> {
    let mut out = Vec::new();
    for &d in dst {
        out.push(d);
        if d as usize >= t_len {
            *out.last_mut().expect("non-empty") = t_len as u32;
            break;
        }
    }
    out
}

impl RsaGetter {
    /// Getter producing B-blocks, aligned to the class thresholds.
    pub fn new_b(d_cost_class: &[u32], sa: Rc<Vec<i32>>) -> Self {
        Self::build(d_cost_class, sa, true)
    }

    /// Getter producing W-blocks, aligned to the text grid.
    pub fn new_w(d_cost_class: &[u32], sa: Rc<Vec<i32>>) -> Self {
        Self::build(d_cost_class, sa, false)
    }

    fn build(d_cost_class: &[u32], sa: Rc<Vec<i32>>, is_b: bool) -> Self {
        let t_len = sa.len();
        let mut d = d_cost_class.to_vec();
        debug_assert!(!d.is_empty() && t_len > 0);
        // Treat bounded windows as unbounded; the appended class is
        // erased below anyway.
        if (*d.last().expect("non-empty") as usize) < t_len {
            d.push(t_len as u32);
        }

        if d.len() == 1 {
            // One class covering the whole text: requests are served
            // straight from the suffix array.
            return RsaGetter {
                storage: Vec::new(),
                sa,
                levels: Vec::new(),
                size_to_level: HashMap::new(),
                t_len,
                scratch: Vec::new(),
            };
        }

        let original_d = d.clone();
        let mut cost_length = cost_classes(&d, t_len);
        d.pop();
        cost_length.pop();

        // Adjacent classes of equal size share a level.
        if cost_length.len() >= 2 && cost_length[0] == cost_length[1] {
            cost_length.remove(0);
            d.remove(0);
        }

        let mut descriptor: Vec<(u32, u32)> = Vec::new();
        let n = cost_length.len();
        if is_b {
            for i in 0..n - 1 {
                let count = cost_length[i + 1] / cost_length[i];
                debug_assert!(count >= 2);
                descriptor.push((cost_length[i], count));
            }
            let back = cost_length[n - 1];
            let base = if d.len() == 1 && *d.last().expect("non-empty") > back {
                2
            } else {
                1
            };
            let count = base + (t_len as u32 - d[d.len() - 1]).div_ceil(back);
            descriptor.push((back, count));
        } else {
            for i in 0..n - 1 {
                let mut count = cost_length[i + 1] / cost_length[i];
                debug_assert!(count >= 2);
                count += d[i] / cost_length[i];
                descriptor.push((cost_length[i], count));
            }
            let back = cost_length[n - 1];
            descriptor.push((back, (t_len as u32).div_ceil(back)));
        }

        let mut getter = Self::from_descriptor(&descriptor, sa, t_len);
        if is_b {
            getter.b_compute(&original_d);
        } else {
            getter.w_compute();
        }
        getter
    }

    fn from_descriptor(descriptor: &[(u32, u32)], sa: Rc<Vec<i32>>, t_len: usize) -> Self {
        let mut storage_needed = 0usize;
        for &(size, count) in descriptor {
            storage_needed += size as usize * count as usize;
        }
        let mut levels = Vec::new();
        let mut size_to_level = HashMap::new();
        let mut offset = 0usize;
        for (level, &(size, count)) in descriptor.iter().enumerate() {
            let blocks = (0..count)
                .map(|j| Block {
                    start: 0,
                    len: 0,
                    storage_off: offset + j as usize * size as usize,
                })
                .collect();
            offset += size as usize * count as usize;
            levels.push(Level {
                blocks,
                head: 0,
                filled: 0,
                next_start: 0,
                block_size: size,
            });
            size_to_level.insert(size, level);
        }
        RsaGetter {
            storage: vec![(0, 0); storage_needed],
            sa,
            levels,
            size_to_level,
            t_len,
            scratch: Vec::new(),
        }
    }

    /// Number of levels in this getter.
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Level serving blocks of `size`, if any.
    pub fn level_by_size(&self, size: u32) -> Option<usize> {
        self.size_to_level.get(&size).copied()
    }

    /// (block size, next start to generate, ring capacity) of a level.
    fn level_info(&self, level: usize) -> (u32, u32, usize) {
        let l = &self.levels[level];
        (l.block_size, l.next_start, l.capacity())
    }

    fn find_block(&self, level: usize, start: u32) -> Option<usize> {
        let l = &self.levels[level];
        if l.filled == 0 {
            return None;
        }
        let first = l.blocks[l.physical(0)].start;
        let size = l.blocks[l.physical(0)].len.max(1);
        if first > start || start >= l.next_start || (start - first) % size != 0 {
            return None;
        }
        let forward = ((start - first) / size) as usize;
        if forward >= l.filled {
            return None;
        }
        Some(forward)
    }

    /// Entries of the block of `level` starting at `start`, in rank
    /// order. Panics if the block was never generated: the descriptors
    /// are sized so that a monotone parse always finds its blocks.
    pub fn get(&self, level: usize, start: u32) -> &[Entry] {
        let logical = self
            .find_block(level, start)
            .expect("RSA block must be materialized");
        let l = &self.levels[level];
        let block = l.blocks[l.physical(logical)];
        &self.storage[block.storage_off..block.storage_off + block.len as usize]
    }

    /// Whether the block of `level` starting at `start` is available.
    pub fn present(&self, level: usize, start: u32) -> bool {
        self.find_block(level, start).is_some()
    }

    /// The whole suffix array as (position, rank) pairs is implicit;
    /// callers needing it read `sa()` directly.
    pub fn sa(&self) -> &Rc<Vec<i32>> {
        &self.sa
    }

    /// Rotate in `k` fresh blocks at `level` and assign their ranges.
    /// Returns the logical indices of the new blocks.
    fn set(&mut self, level: usize, k: usize) -> Vec<usize> {
        let t_len = self.t_len;
        let l = &mut self.levels[level];
        debug_assert!(k > 0 && k <= l.capacity());
        let rotate = (l.filled + k).saturating_sub(l.capacity());
        if rotate != l.capacity() {
            l.head = (l.head + rotate) % l.capacity();
        }
        l.filled = (l.filled + k).min(l.capacity());
        let first_new = l.filled - k;
        let mut out = Vec::with_capacity(k);
        for logical in first_new..l.filled {
            let size = l.block_size;
            let phys = l.physical(logical);
            let block = &mut l.blocks[phys];
            block.start = l.next_start;
            block.len = (size as usize).min(t_len.saturating_sub(l.next_start as usize)) as u32;
            l.next_start = block.start + block.len;
            out.push(logical);
        }
        out
    }

    /// Shift a level's grid by `quantity` positions.
    fn slide(&mut self, level: usize, quantity: u32) {
        let l = &mut self.levels[level];
        for b in &mut l.blocks {
            b.start += quantity;
        }
        l.next_start += quantity;
    }

    /// Distribute the whole suffix array into `targets`, classifying
    /// each position with `classify` (an index into `targets`).
    fn fill_from_sa(&mut self, targets: &[(usize, usize)], mut classify: impl FnMut(u32) -> usize) {
        let mut slots: Vec<(usize, usize)> = Vec::with_capacity(targets.len());
        for &(level, logical) in targets {
            let l = &self.levels[level];
            let block = l.blocks[l.physical(logical)];
            slots.push((block.storage_off, 0));
        }
        let sa = self.sa.clone();
        for (rank, &pos) in sa.iter().enumerate() {
            let idx = classify(pos as u32);
            let slot = &mut slots[idx];
            self.storage[slot.0 + slot.1] = (pos as u32, rank as u32);
            slot.1 += 1;
        }
    }

    /// Distribute previously copied parent entries into `targets`.
    fn fill_from_scratch(&mut self, targets: &[(usize, usize)], offset: u32, step: u32) {
        let mut slots: Vec<(usize, usize)> = Vec::with_capacity(targets.len());
        for &(level, logical) in targets {
            let l = &self.levels[level];
            let block = l.blocks[l.physical(logical)];
            slots.push((block.storage_off, 0));
        }
        for i in 0..self.scratch.len() {
            let entry = self.scratch[i];
            let idx = ((entry.0 - offset) / step) as usize;
            let slot = &mut slots[idx];
            self.storage[slot.0 + slot.1] = entry;
            slot.1 += 1;
        }
    }

    /// Initial fill for B grids: one block per threshold class, the
    /// coarsest level covering the remainder of the text.
    fn b_compute(&mut self, original_d: &[u32]) {
        let mut thresholds: Vec<u32> = Vec::with_capacity(original_d.len() + 1);
        thresholds.push(0);
        thresholds.extend_from_slice(original_d);
        let n = thresholds.len();
        let last_block_size = thresholds[n - 2] - thresholds[n - 3];
        thresholds[n - 1] = self.t_len as u32;

        let mut targets: Vec<(usize, usize)> = Vec::new();
        let mut c_level: isize = -1;
        let mut i = 0usize;
        loop {
            let c_size = thresholds[i + 1] - thresholds[i];
            let level = self
                .level_by_size(c_size)
                .expect("class size has a level");
            if level as isize != c_level {
                debug_assert_eq!(level as isize, c_level + 1);
                c_level += 1;
                self.slide(c_level as usize, thresholds[i]);
            }
            let last_level = level == self.levels() - 1;
            let blocks = if last_level {
                self.level_info(level).2
            } else {
                1
            };
            let idxs = self.set(c_level as usize, blocks);
            targets.extend(idxs.into_iter().map(|j| (c_level as usize, j)));
            i += 1;
            if last_level {
                break;
            }
        }

        let classes = thresholds.len() - 2;
        let max_distance = thresholds[thresholds.len() - 2];
        let th = thresholds;
        self.fill_from_sa(&targets, move |pos| {
            let mut idx = th.partition_point(|&t| t <= pos) - 1;
            if idx == classes {
                idx += ((pos - max_distance) / last_block_size) as usize;
            }
            idx
        });
    }

    /// Initial fill for W grids: the coarsest level is built in full by
    /// an even partition of the suffix array.
    fn w_compute(&mut self) {
        let level = self.levels() - 1;
        let (size, start, blocks) = self.level_info(level);
        debug_assert_eq!(start, 0);
        let idxs = self.set(level, blocks);
        let targets: Vec<(usize, usize)> = idxs.into_iter().map(|j| (level, j)).collect();
        self.fill_from_sa(&targets, move |pos| (pos / size) as usize);
    }

    /// Make every block containing `offset` available, refilling
    /// exhausted levels from their parent.
    pub fn notify(&mut self, offset: u32) {
        if self.levels.is_empty() {
            return;
        }
        let mut level = 0usize;
        while level < self.levels() - 1 {
            if self.level_info(level).1 != offset {
                break;
            }
            level += 1;
        }
        for l in (0..level).rev() {
            // Copy the parent block out, then split it into children.
            let (off, len) = {
                let logical = self
                    .find_block(l + 1, offset)
                    .expect("parent RSA block must be materialized");
                let lv = &self.levels[l + 1];
                let block = lv.blocks[lv.physical(logical)];
                (block.storage_off, block.len as usize)
            };
            self.scratch.clear();
            let (scratch, storage) = (&mut self.scratch, &self.storage);
            scratch.extend_from_slice(&storage[off..off + len]);
            let parent_len = self.scratch.len();

            let positions = (self.t_len - offset as usize).min(parent_len);
            let child_size = self.levels[l].block_size;
            let children = positions.div_ceil(child_size as usize);
            let idxs = self.set(l, children);
            let targets: Vec<(usize, usize)> = idxs.into_iter().map(|j| (l, j)).collect();
            self.fill_from_scratch(&targets, offset, child_size);
        }
    }
}

/// Serves merged RSA windows for ladders with multiple class sizes.
#[derive(Debug)]
pub struct GenericRsa {
    text_len: usize,
    dst: Vec<u32>,
    cst: Vec<u32>,
    b: RsaGetter,
    w: RsaGetter,
    out: Vec<u32>,
    memo: Option<(usize, u32)>,
}

impl GenericRsa {
    /// Build over a normalized distance ladder.
    pub fn new(dst: Vec<u32>, sa: Rc<Vec<i32>>) -> Self {
        let text_len = sa.len();
        let cst = cost_classes(&dst, text_len);
        GenericRsa {
            text_len,
            b: RsaGetter::new_b(&dst, sa.clone()),
            w: RsaGetter::new_w(&dst, sa),
            dst,
            cst,
            out: Vec::with_capacity(text_len),
            memo: None,
        }
    }

    /// RSA of the B-block of `level` starting at `pos`, merged with the
    /// W-blocks covering the level's distance window, in SA order.
    pub fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32] {
        if self.memo == Some((level, pos)) {
            return &self.out;
        }
        self.out.clear();

        if self.dst[level] as usize >= self.text_len {
            // The window spans the whole prefix: the suffix array
            // itself is the answer.
            let sa = self.b.sa();
            self.out.extend(sa.iter().map(|&p| p as u32));
        } else {
            let size = self.cst[level];
            let b_level = self.b.level_by_size(size).expect("B level");
            let w_level = self.w.level_by_size(size).expect("W level");
            let b = self.b.get(b_level, pos);
            let empty: &[Entry] = &[];
            let w1 = if pos >= self.dst[level] {
                self.w.get(w_level, pos - self.dst[level])
            } else {
                empty
            };
            let w2 = if level > 0 && pos >= self.dst[level - 1] {
                self.w.get(w_level, pos - self.dst[level - 1])
            } else {
                empty
            };
            // The near window may overlap the block: drop its entries
            // at or past the block start.
            merge3(w1, w2, b, Some(pos), &mut self.out);
        }
        self.memo = Some((level, pos));
        &self.out
    }

    /// Advance both grids to `pos`.
    pub fn notify(&mut self, pos: u32) {
        self.b.notify(pos);
        self.w.notify(pos);
        self.memo = None;
    }
}

/// Merge three rank-sorted entry runs, emitting text positions.
/// Entries of `b_run` at or past `b_limit` are dropped.
fn merge3(
    a_run: &[Entry],
    b_run: &[Entry],
    c_run: &[Entry],
    b_limit: Option<u32>,
    out: &mut Vec<u32>,
) {
    let mut a = a_run.iter().peekable();
    let mut b = b_run
        .iter()
        .filter(|e| b_limit.map_or(true, |lim| e.0 < lim))
        .peekable();
    let mut c = c_run.iter().peekable();
    loop {
        let ra = a.peek().map(|e| e.1);
        let rb = b.peek().map(|e| e.1);
        let rc = c.peek().map(|e| e.1);
        let min = match [ra, rb, rc].iter().flatten().min() {
            Some(&m) => m,
            None => break,
        };
        if ra == Some(min) {
            out.push(a.next().expect("peeked").0);
        } else if rb == Some(min) {
            out.push(b.next().expect("peeked").0);
        } else {
            out.push(c.next().expect("peeked").0);
        }
    }
}

/// Serves RSA windows when every distance class has the same size.
#[derive(Debug)]
pub struct SameRsa {
    block_size: u32,
    getter: RsaGetter,
    out: Vec<u32>,
}

impl SameRsa {
    /// Build for uniform classes of `block_size`.
    pub fn new(block_size: u32, sa: Rc<Vec<i32>>) -> Self {
        let t_len = sa.len() as u32;
        SameRsa {
            block_size,
            getter: RsaGetter::new_w(&[block_size, t_len], sa),
            out: Vec::with_capacity(3 * block_size as usize),
        }
    }

    /// RSA of the block at `pos` merged with the two W-blocks covering
    /// level `level`'s window.
    pub fn get_rsa(&mut self, level: usize, pos: u32) -> &[u32] {
        debug_assert_eq!(pos % self.block_size, 0);
        self.out.clear();
        let w2_start = pos as i64 - level as i64 * self.block_size as i64;
        let w1_start = w2_start - self.block_size as i64;
        let b = self.getter.get(0, pos);
        let empty: &[Entry] = &[];
        let w1 = if w1_start >= 0 {
            self.getter.get(0, w1_start as u32)
        } else {
            empty
        };
        let w2 = if w2_start != pos as i64 {
            self.getter.get(0, w2_start as u32)
        } else {
            empty
        };
        merge3(w1, w2, b, None, &mut self.out);
        &self.out
    }

    /// Uniform grids are fully materialized up front.
    pub fn notify(&mut self, _pos: u32) {}
}

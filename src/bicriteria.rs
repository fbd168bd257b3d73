//! The bicriteria driver: minimize compressed size subject to a bound
//! on estimated decompression time (or the symmetric problem).
//!
//! The constrained problem is relaxed to its Lagrangian dual on λ. A
//! basis of one feasible and one infeasible solution defines two lines
//! `cost + λ (weight − W)`; their intersection lower-bounds the
//! optimum. Each iteration parses optimally under the fused model
//! `cost + λ* weight` and tightens the basis until the dual gap closes,
//! then a feasible primal is recovered by path-swapping the basis.

use crate::encoders::EncoderInfo;
use crate::suffix::SaSource;
use crate::error::{Error, Result};
use crate::fsg::cache::{cached_fsg, caching_fsg, CachedGraph};
use crate::integrator::SolutionIntegrator;
use crate::meter::{Progress, Silent, StderrMeter};
use crate::model::{fuse, CmFactory, CostModel, Edge};
use crate::parser;
use crate::parsing::{
    check_correctness, parsing_length, write_parsing_sized, CompressedFile,
};
use crate::suffix::SaCache;
use crate::swapper::PathSwapper;
use crate::text::Text;
use std::collections::HashMap;
use std::rc::Rc;

/// Relative dual-gap threshold ending the λ iteration.
const EPSILON: f64 = 1e-6;

/// Default capacity of the encoded-parsing cache.
pub const DEFAULT_CACHE_SIZE: usize = 3;

/// Axis a bound constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundAxis {
    /// Bound on decompression time (nanoseconds).
    Time,
    /// Bound on compressed size (bits).
    Space,
}

/// A user-specified bound: absolute, or relative to the reachable
/// range.
#[derive(Debug, Clone, Copy)]
pub enum Bound {
    /// An absolute bound in the axis unit.
    Fixed {
        /// Constrained axis.
        axis: BoundAxis,
        /// Bound value (nanoseconds or bits).
        value: f64,
    },
    /// `min + level * (max - min)` along the axis, `level` in [0, 1].
    Relative {
        /// Constrained axis.
        axis: BoundAxis,
        /// Interpolation level.
        level: f64,
    },
}

impl Bound {
    /// The constrained axis.
    pub fn axis(&self) -> BoundAxis {
        match *self {
            Bound::Fixed { axis, .. } | Bound::Relative { axis, .. } => axis,
        }
    }

    /// Resolve against the reachable [min, max] weight range.
    pub fn fix(&self, max: f64, min: f64) -> f64 {
        match *self {
            Bound::Fixed { value, .. } => value,
            Bound::Relative { level, .. } => min + level * (max - min),
        }
    }

    /// Label used in output file names.
    pub fn label(&self, max: f64, min: f64) -> String {
        match *self {
            Bound::Fixed { axis, value } => match axis {
                BoundAxis::Space => space_label(value),
                BoundAxis::Time => time_label(self.fix(max, min)),
            },
            Bound::Relative { axis, level } => match axis {
                BoundAxis::Space => format!("{}S", level),
                BoundAxis::Time => format!("{}T", level),
            },
        }
    }
}

fn space_label(bits: f64) -> String {
    const KILO: f64 = 1024.0;
    const MEGA: f64 = 1024.0 * 1024.0;
    if bits < KILO {
        format!("{}B", bits as u64)
    } else if bits < MEGA {
        format!("{:.2}KB", bits / (8.0 * KILO))
    } else {
        format!("{:.2}MB", bits / (8.0 * MEGA))
    }
}

fn time_label(nanos: f64) -> String {
    if nanos < 1e9 {
        format!("{}msec", (nanos / 1e6) as u64)
    } else {
        format!("{:.2}sec", nanos / 1e9)
    }
}

/// Orients (space, time) pairs into (cost, weight) per the bound axis.
#[derive(Debug, Clone, Copy)]
pub struct CwFactory {
    space_is_cost: bool,
}

/// A (cost, weight) pair.
#[derive(Debug, Clone, Copy)]
pub struct CostWeight {
    /// Minimized criterion.
    pub cost: f64,
    /// Bounded criterion.
    pub weight: f64,
}

impl CwFactory {
    fn new(space_is_cost: bool) -> Self {
        CwFactory { space_is_cost }
    }

    fn get(&self, space: f64, time: f64) -> CostWeight {
        if self.space_is_cost {
            CostWeight {
                cost: space,
                weight: time,
            }
        } else {
            CostWeight {
                cost: time,
                weight: space,
            }
        }
    }

    fn of(&self, si: &SolutionInfo) -> CostWeight {
        self.get(si.space, si.time)
    }
}

/// Key identifying how a solution was generated: the ids of its one or
/// two cost models.
pub type GenInfo = (String, String);

/// A computed solution's (space, time) plus its generating models.
#[derive(Debug, Clone)]
pub struct SolutionInfo {
    space: f64,
    time: f64,
    dual: bool,
    cm_1: CostModel,
    cm_2: CostModel,
}

impl SolutionInfo {
    fn single(space: f64, time: f64, cm: CostModel) -> Self {
        SolutionInfo {
            space,
            time,
            dual: false,
            cm_1: cm,
            cm_2: CostModel::default(),
        }
    }

    fn double(space: f64, time: f64, cm_1: CostModel, cm_2: CostModel) -> Self {
        SolutionInfo {
            space,
            time,
            dual: true,
            cm_1,
            cm_2,
        }
    }

    /// Compressed size, in bits.
    pub fn space(&self) -> f64 {
        self.space
    }

    /// Estimated decompression time, in nanoseconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    fn gen_info(&self) -> GenInfo {
        (self.cm_1.id(), self.cm_2.id())
    }

    fn generate(&self, getter: &mut SolutionGetter) -> Result<Vec<Edge>> {
        if self.dual {
            Ok(getter.fast_bi(&self.cm_1, &self.cm_2)?.0)
        } else {
            Ok(getter.fast(&self.cm_1)?.0)
        }
    }
}

/// Cache of encoded parsings keyed by generating cost-model ids.
///
/// When full, the evicted entry is the oldest one on the same
/// feasibility side (w.r.t. W) as the incoming solution, falling back
/// to the overall oldest.
struct CompressedCache {
    entries: Vec<(SolutionInfo, Rc<CompressedFile>)>,
    capacity: usize,
}

impl CompressedCache {
    fn new(capacity: usize) -> Self {
        CompressedCache {
            entries: Vec::new(),
            capacity,
        }
    }

    fn remove_same_class(&mut self, cwf: CwFactory, w_bound: f64, feasible: bool) -> bool {
        let idx = self
            .entries
            .iter()
            .position(|(si, _)| (cwf.of(si).weight <= w_bound) == feasible);
        match idx {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    fn add(&mut self, si: SolutionInfo, file: Rc<CompressedFile>, cwf: CwFactory, w_bound: f64) {
        if self.entries.len() >= self.capacity {
            let feasible = cwf.of(&si).weight <= w_bound;
            if !self.remove_same_class(cwf, w_bound, feasible) {
                self.entries.remove(0);
            }
        }
        debug_assert!(self.entries.len() < self.capacity);
        self.entries.push((si, file));
    }

    fn get(&self, gen_info: &GenInfo) -> Option<Rc<CompressedFile>> {
        self.entries
            .iter()
            .find(|(si, _)| si.gen_info() == *gen_info)
            .map(|(_, f)| f.clone())
    }
}

/// One solution as a dual line `cost + λ (weight − W)`.
#[derive(Debug, Clone, Copy)]
struct SolutionDual {
    cost: f64,
    weight: f64,
}

impl SolutionDual {
    fn new(si: &SolutionInfo, cwf: CwFactory, w_bound: f64) -> Self {
        let cw = cwf.of(si);
        SolutionDual {
            cost: cw.cost,
            weight: cw.weight - w_bound,
        }
    }

    fn value(&self, lambda: f64) -> f64 {
        self.cost + lambda * self.weight
    }

    fn does_intersect(&self, other: &SolutionDual) -> bool {
        self.weight != other.weight
    }

    fn intersect(&self, other: &SolutionDual) -> (f64, f64) {
        debug_assert!(self.does_intersect(other));
        let lambda = ((self.cost - other.cost) / (other.weight - self.weight)).max(0.0);
        (lambda, self.value(lambda))
    }

    fn feasible(&self) -> bool {
        self.weight <= 0.0
    }
}

/// The two-solution basis on the dual envelope.
struct DualBasis {
    cwf: CwFactory,
    w_bound: f64,
    left: (SolutionInfo, SolutionDual),
    right: (SolutionInfo, SolutionDual),
}

impl DualBasis {
    /// Start from the cost-optimal (feasible) and weight-optimal
    /// (infeasible) endpoints.
    fn new(cwf: CwFactory, cost_opt: SolutionInfo, weight_opt: SolutionInfo, w_bound: f64) -> Self {
        let left_dual = SolutionDual::new(&cost_opt, cwf, w_bound);
        let right_dual = SolutionDual::new(&weight_opt, cwf, w_bound);
        DualBasis {
            cwf,
            w_bound,
            left: (cost_opt, left_dual),
            right: (weight_opt, right_dual),
        }
    }

    /// The basis intersection (λ*, φ).
    fn current(&self) -> (f64, f64) {
        self.left.1.intersect(&self.right.1)
    }

    /// Envelope value at λ.
    fn lower_envelope(&self, lambda: f64) -> f64 {
        self.left.1.value(lambda).min(self.right.1.value(lambda))
    }

    fn replace_if_better(
        &mut self,
        new_left: (SolutionInfo, SolutionDual),
        new_right: (SolutionInfo, SolutionDual),
    ) {
        if !new_left.1.does_intersect(&new_right.1) {
            // Parallel lines cannot tighten the basis; keep the old one.
            eprintln!("warning: parallel dual lines, basis kept");
            return;
        }
        let (_, new_cost) = new_left.1.intersect(&new_right.1);
        let (_, cost) = self.current();
        if new_cost <= cost {
            self.left = new_left;
            self.right = new_right;
        }
    }

    /// Fold a solution into the basis; returns the new intersection.
    /// The left line stays on the infeasible side, the right on the
    /// feasible one.
    fn update(&mut self, si: SolutionInfo) -> (f64, f64) {
        let dual = SolutionDual::new(&si, self.cwf, self.w_bound);
        let candidate = (si, dual);
        if dual.feasible() {
            let left = self.left.clone();
            self.replace_if_better(left, candidate);
        } else {
            let right = self.right.clone();
            self.replace_if_better(candidate, right);
        }
        self.current()
    }

    fn basis(&self) -> (&SolutionInfo, &SolutionInfo) {
        (&self.left.0, &self.right.0)
    }
}

/// Produces parsings for a (text, literal window), replaying the cached
/// forward star graph when warm.
pub struct SolutionGetter {
    text: Text,
    graph: CachedGraph,
    sa: SaCache,
    literal_window: usize,
    use_meter: bool,
}

impl SolutionGetter {
    /// A getter over `text` with the encoder's literal window.
    pub fn new(text: Text, literal_window: usize, use_meter: bool) -> Self {
        SolutionGetter {
            text,
            graph: CachedGraph::new(),
            sa: SaCache::new(),
            literal_window,
            use_meter,
        }
    }

    /// Whether the graph cache holds a recorded parse.
    pub fn warm(&self) -> bool {
        !self.graph.is_empty()
    }

    fn progress(&self) -> Box<dyn Progress> {
        if self.use_meter {
            Box::new(StderrMeter::new(self.text.len()))
        } else {
            Box::new(Silent)
        }
    }

    /// Parse optimally under `cm`, replaying the cache when warm.
    pub fn fast(&mut self, cm: &CostModel) -> Result<(Vec<Edge>, f64)> {
        if self.graph.is_empty() {
            return self.full(cm);
        }
        let mut progress = self.progress();
        let mut fsg = cached_fsg(&self.text, cm, &self.graph)?;
        Ok(parser::parse(
            &mut fsg,
            self.literal_window,
            cm,
            progress.as_mut(),
        ))
    }

    /// Bi-criteria variant of [`SolutionGetter::fast`].
    pub fn fast_bi(&mut self, cm: &CostModel, w_cm: &CostModel) -> Result<(Vec<Edge>, f64)> {
        if self.graph.is_empty() {
            return self.full_bi(cm, w_cm);
        }
        let mut progress = self.progress();
        let mut fsg = cached_fsg(&self.text, cm, &self.graph)?;
        Ok(parser::bi_optimal_parse(
            &mut fsg,
            self.literal_window,
            cm,
            w_cm,
            progress.as_mut(),
        ))
    }

    /// Parse with a real generator, recording the graph when cold.
    pub fn full(&mut self, cm: &CostModel) -> Result<(Vec<Edge>, f64)> {
        let mut progress = self.progress();
        let sa = self.sa.get(self.text.as_slice());
        if self.graph.is_empty() {
            let mut fsg = caching_fsg(&self.text, sa, cm, &mut self.graph)?;
            Ok(parser::parse(
                &mut fsg,
                self.literal_window,
                cm,
                progress.as_mut(),
            ))
        } else {
            let mut fsg = crate::fsg::gen_fast_fsg(&self.text, sa, cm)?;
            Ok(parser::parse(
                &mut fsg,
                self.literal_window,
                cm,
                progress.as_mut(),
            ))
        }
    }

    /// Bi-criteria variant of [`SolutionGetter::full`].
    pub fn full_bi(&mut self, cm: &CostModel, w_cm: &CostModel) -> Result<(Vec<Edge>, f64)> {
        let mut progress = self.progress();
        let sa = self.sa.get(self.text.as_slice());
        if self.graph.is_empty() {
            let mut fsg = caching_fsg(&self.text, sa, cm, &mut self.graph)?;
            Ok(parser::bi_optimal_parse(
                &mut fsg,
                self.literal_window,
                cm,
                w_cm,
                progress.as_mut(),
            ))
        } else {
            let mut fsg = crate::fsg::gen_fast_fsg(&self.text, sa, cm)?;
            Ok(parser::bi_optimal_parse(
                &mut fsg,
                self.literal_window,
                cm,
                w_cm,
                progress.as_mut(),
            ))
        }
    }
}

/// The bicriteria compression driver.
pub struct BicriteriaCompressor {
    text: Text,
    enc: EncoderInfo,
    getter: SolutionGetter,
    space_cm: CostModel,
    time_cm: CostModel,
    sol_cache: HashMap<GenInfo, SolutionInfo>,
    comp_cache: CompressedCache,
    verbose: bool,
}

/// Everything returned by one bicriteria run.
pub struct BicriteriaOutput {
    /// The encoded result.
    pub file: CompressedFile,
    /// Compressed size, in bits.
    pub space: f64,
    /// Estimated decompression time, in nanoseconds.
    pub time: f64,
    /// Label of the resolved bound, for file naming.
    pub bound_label: String,
}

impl BicriteriaCompressor {
    /// Set up for `enc` with its space model and the target's time
    /// model. Both models are fused onto the union ladder up front.
    pub fn new(
        text: Text,
        enc: EncoderInfo,
        space_cm: &CostModel,
        time_cm: &CostModel,
        use_meter: bool,
    ) -> Self {
        let literal_window = enc.literal_window().min(1 << 24) as usize;
        BicriteriaCompressor {
            getter: SolutionGetter::new(text.clone(), literal_window, use_meter),
            text,
            enc,
            space_cm: fuse(space_cm, time_cm, 0.0),
            time_cm: fuse(time_cm, space_cm, 0.0),
            sol_cache: HashMap::new(),
            comp_cache: CompressedCache::new(DEFAULT_CACHE_SIZE),
            verbose: false,
        }
    }

    /// Print per-iteration diagnostics to stderr.
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    fn compress_solution(&self, sol: &[Edge]) -> (Rc<CompressedFile>, f64, f64) {
        let space = parsing_length(sol, &self.space_cm);
        let time = parsing_length(sol, &self.time_cm);
        let file = write_parsing_sized(sol, &self.text, &self.enc, space.ceil() as usize);
        (Rc::new(file), space, time)
    }

    /// Bi-criteria optimal solution, memoized and cached.
    fn optimal_bi(
        &mut self,
        cm_1: &CostModel,
        cm_2: &CostModel,
        feasible: bool,
    ) -> Result<SolutionInfo> {
        let gen_info = (cm_1.id(), cm_2.id());
        if !self.sol_cache.contains_key(&gen_info) {
            let (sol, _) = self.getter.fast_bi(cm_1, cm_2)?;
            let (file, space, time) = self.compress_solution(&sol);
            let si = SolutionInfo::double(space, time, cm_1.clone(), cm_2.clone());
            debug_assert_eq!(si.gen_info(), gen_info);
            let fake_w = if feasible { f64::INFINITY } else { 0.0 };
            self.comp_cache.add(si.clone(), file, CwFactory::new(false), fake_w);
            self.sol_cache.insert(gen_info.clone(), si);
        }
        Ok(self.sol_cache[&gen_info].clone())
    }

    /// λ-optimal solution, memoized and cached.
    fn optimal_single(
        &mut self,
        cm: &CostModel,
        cwf: CwFactory,
        w_bound: f64,
    ) -> Result<SolutionInfo> {
        let gen_info = (cm.id(), String::new());
        if !self.sol_cache.contains_key(&gen_info) {
            let (sol, _) = self.getter.fast(cm)?;
            let (file, space, time) = self.compress_solution(&sol);
            let si = SolutionInfo::single(space, time, cm.clone());
            self.comp_cache.add(si.clone(), file, cwf, w_bound);
            self.sol_cache.insert(gen_info.clone(), si);
        }
        Ok(self.sol_cache[&gen_info].clone())
    }

    /// Full (real-generator) solution for the early-exit paths.
    fn writable_solution(&mut self, cm: &CostModel) -> Result<(CompressedFile, f64, f64)> {
        let (sol, _) = self.getter.full(cm)?;
        let space = parsing_length(&sol, &self.space_cm);
        let time = parsing_length(&sol, &self.time_cm);
        let file = write_parsing_sized(&sol, &self.text, &self.enc, space.ceil() as usize);
        Ok((file, space, time))
    }

    fn cached_file(&mut self, si: &SolutionInfo) -> Result<Rc<CompressedFile>> {
        if let Some(file) = self.comp_cache.get(&si.gen_info()) {
            return Ok(file);
        }
        // Fell out of the cache: regenerate and re-encode.
        let sol = si.generate(&mut self.getter)?;
        let (file, _, _) = self.compress_solution(&sol);
        Ok(file)
    }

    /// Integrate the two basis parsings against the native model.
    fn writable_parsings(
        &mut self,
        left: &SolutionInfo,
        right: &SolutionInfo,
    ) -> Result<Vec<Vec<u8>>> {
        let files = [self.cached_file(left)?, self.cached_file(right)?];
        let bodies: Vec<&[u8]> = files
            .iter()
            .map(|f| f.body())
            .collect::<Result<_>>()?;
        let mut outputs: Vec<Vec<u8>> = files
            .iter()
            .map(|f| vec![0u8; f.data.len()])
            .collect();
        let integrator = SolutionIntegrator::new(self.text.clone(), self.space_cm.clone());
        integrator.integrate(&self.enc, &mut self.getter.sa, &bodies, &mut outputs)?;
        Ok(outputs)
    }

    /// Heaviest single edge under the current orientation.
    fn max_cost_weight(&self, cwf: CwFactory) -> CostWeight {
        let max_dst = *self.space_cm.dst().last().expect("non-empty ladder");
        let max_len = *self.space_cm.len().last().expect("non-empty ladder");
        let heaviest = self.space_cm.get_edge(max_dst, max_len);
        let max_space = self.space_cm.edge_cost(&heaviest);
        let max_time = self.time_cm.edge_cost(&heaviest);
        cwf.get(max_space, max_time)
    }

    /// Run one bicriteria compression for `bound`.
    pub fn run(&mut self, bound: &Bound, check: bool) -> Result<BicriteriaOutput> {
        let cwf = CwFactory::new(bound.axis() == BoundAxis::Time);
        let cmf = if bound.axis() == BoundAxis::Time {
            CmFactory::new(&self.space_cm, &self.time_cm)
        } else {
            CmFactory::new(&self.time_cm, &self.space_cm)
        };

        if self.verbose {
            eprintln!("computing cost-optimal solution");
        }
        let sol_cost = self.optimal_bi(cmf.cost(), cmf.weight(), false)?;
        if self.verbose {
            eprintln!(
                "cost-optimal: S = {:.0} bits, T = {:.0} ns",
                sol_cost.space, sol_cost.time
            );
            eprintln!("computing weight-optimal solution");
        }
        let sol_weight = self.optimal_bi(cmf.weight(), cmf.cost(), true)?;
        if self.verbose {
            eprintln!(
                "weight-optimal: S = {:.0} bits, T = {:.0} ns",
                sol_weight.space, sol_weight.time
            );
        }

        let min_weight = cwf.of(&sol_weight).weight;
        let max_weight = cwf.of(&sol_cost).weight;
        let w_bound = bound.fix(max_weight, min_weight);
        let bound_label = bound.label(max_weight, min_weight);
        if self.verbose {
            eprintln!("W = {:.2} ({})", w_bound, bound_label);
        }

        // Degenerate bounds collapse to a single-criterion parse.
        if w_bound >= max_weight {
            let (file, space, time) = self.writable_solution(cmf.cost())?;
            return Ok(BicriteriaOutput {
                file,
                space,
                time,
                bound_label,
            });
        } else if w_bound == min_weight {
            let (file, space, time) = self.writable_solution(cmf.weight())?;
            return Ok(BicriteriaOutput {
                file,
                space,
                time,
                bound_label,
            });
        } else if w_bound < min_weight {
            return Err(Error::InfeasibleBound {
                bound: w_bound,
                min_weight,
            });
        }

        // Dual basis, folding in every solution already computed (in a
        // stable order, so reruns build the same basis).
        let mut basis = DualBasis::new(cwf, sol_cost, sol_weight, w_bound);
        let mut cached: Vec<(GenInfo, SolutionInfo)> = self
            .sol_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        cached.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, si) in cached {
            basis.update(si);
        }

        loop {
            let (lambda, phi) = basis.current();
            let si = self.optimal_single(&cmf.lambda(lambda), cwf, w_bound)?;
            basis.update(si);
            let phi_prime = basis.lower_envelope(lambda);
            let delta = (phi - phi_prime).abs() / phi_prime;
            if self.verbose {
                eprintln!(
                    "lambda = {:.6}, phi = {:.4}, phi' = {:.4}, delta = {:.9}",
                    lambda, phi, phi_prime, delta
                );
            }
            if delta <= EPSILON {
                break;
            }
        }

        // Primal recovery: integrate the basis, then path-swap it.
        if self.verbose {
            eprintln!("integrating basis");
        }
        let (left, right) = {
            let (l, r) = basis.basis();
            (l.clone(), r.clone())
        };
        let base_parsings = self.writable_parsings(&left, &right)?;

        if self.verbose {
            eprintln!("swapping basis");
        }
        let max_w = self.max_cost_weight(cwf).weight;
        let slack_bound = w_bound + 2.0 * max_w;
        let (cw_l, cw_r) = (cwf.of(&left), cwf.of(&right));
        let swapper = PathSwapper::new(
            self.enc,
            &base_parsings[0],
            cw_l.cost,
            cw_l.weight,
            &base_parsings[1],
            cw_r.cost,
            cw_r.weight,
            self.text.len(),
            cmf.cost(),
            cmf.weight(),
        );
        let (swapped, _) = swapper.swap(slack_bound)?;

        if check {
            check_correctness(&swapped, self.text.as_slice())?;
        }

        let space = parsing_length(&swapped, &self.space_cm);
        let time = parsing_length(&swapped, &self.time_cm);
        let file = write_parsing_sized(&swapped, &self.text, &self.enc, space.ceil() as usize);
        Ok(BicriteriaOutput {
            file,
            space,
            time,
            bound_label,
        })
    }
}

/// Parse a comma-separated bound list (`10m,2s,64K,1M`).
pub fn parse_bounds(spec: &str) -> Result<Vec<Bound>> {
    let mut out = Vec::new();
    for item in spec.split(',').filter(|s| !s.is_empty()) {
        if !item.is_ascii() {
            return Err(Error::InvalidInput(format!("bad bound \"{}\"", item)));
        }
        let (value, unit) = item.split_at(item.len() - 1);
        let value: f64 = value
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad bound value \"{}\"", item)))?;
        let bound = match unit {
            "m" => Bound::Fixed {
                axis: BoundAxis::Time,
                value: value * 1e6,
            },
            "s" => Bound::Fixed {
                axis: BoundAxis::Time,
                value: value * 1e9,
            },
            "K" => Bound::Fixed {
                axis: BoundAxis::Space,
                value: 8.0 * value * 1024.0,
            },
            "M" => Bound::Fixed {
                axis: BoundAxis::Space,
                value: 8.0 * value * 1024.0 * 1024.0,
            },
            _ => {
                return Err(Error::InvalidInput(format!(
                    "no unit specifier in bound \"{}\"",
                    item
                )))
            }
        };
        out.push(bound);
    }
    Ok(out)
}

/// Parse a comma-separated level list (`0.5s,0.25t`).
pub fn parse_levels(spec: &str) -> Result<Vec<Bound>> {
    let mut out = Vec::new();
    for item in spec.split(',').filter(|s| !s.is_empty()) {
        if !item.is_ascii() {
            return Err(Error::InvalidInput(format!("bad level \"{}\"", item)));
        }
        let (value, unit) = item.split_at(item.len() - 1);
        let level: f64 = value
            .parse()
            .map_err(|_| Error::InvalidInput(format!("bad level value \"{}\"", item)))?;
        let axis = match unit.to_ascii_lowercase().as_str() {
            "s" => BoundAxis::Space,
            "t" => BoundAxis::Time,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "no kind specifier in level \"{}\"",
                    item
                )))
            }
        };
        out.push(Bound::Relative { axis, level });
    }
    Ok(out)
}

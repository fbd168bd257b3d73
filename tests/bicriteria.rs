//! Bicriteria pipeline tests: endpoints, interior bounds, graph-cache
//! parity and parsing repair.

use bilz::bicriteria::{Bound, BoundAxis, SolutionGetter};
use bilz::encoders::lookup;
use bilz::model::{fuse, wm_serialize, wm_unserialize, ClassInfo, CostModel};
use bilz::parsing::{parsing_length, PhraseReader};
use bilz::text::Text;

/// A synthetic decode-time model over the encoder's own ladder:
/// far copies cost disproportionally more time than near ones.
fn synthetic_time_model(enc_name: &str) -> CostModel {
    let cm = lookup(enc_name).unwrap().cost_model();
    let dst_costs: Vec<f64> = (0..cm.dst().len())
        .map(|i| 40.0 * (1 << i) as f64)
        .collect();
    let len_costs: Vec<f64> = (0..cm.len().len()).map(|i| 5.0 + i as f64).collect();
    CostModel::from_classes(
        ClassInfo::new(cm.dst().to_vec(), dst_costs),
        ClassInfo::new(cm.len().to_vec(), len_costs),
        60.0,
        2.0,
        1.5,
    )
}

fn sample_text() -> Vec<u8> {
    // Repetitions at several distances, so time and space optima
    // genuinely disagree.
    let mut data = Vec::new();
    let phrase = b"it was the best of times, it was the worst of times; ";
    for i in 0..220usize {
        data.extend_from_slice(phrase);
        data.extend_from_slice(format!("chapter {} ", i % 13).as_bytes());
        if i % 7 == 0 {
            data.extend_from_slice(b"unique-");
            data.extend_from_slice(format!("{:04}", i * 31).as_bytes());
        }
    }
    data
}

#[test]
fn test_endpoint_bounds_match_single_criterion() {
    // S4: the degenerate upper bound yields the cost-optimal parsing.
    let data = sample_text();
    let enc = "soda09_8";
    let time_cm = synthetic_time_model(enc);

    let upper = Bound::Relative {
        axis: BoundAxis::Time,
        level: 1.0,
    };
    let out = bilz::api::bicriteria_compress(enc, &data, &time_cm, &upper, true, false).unwrap();
    assert_eq!(bilz::decompress(&out.file.data[..out.file.total_size]).unwrap(), data);

    // The plain bit-optimal size under the fused model matches.
    let info = lookup(enc).unwrap();
    let space_cm = fuse(&info.cost_model(), &time_cm, 0.0);
    let text = Text::new(data.clone());
    let mut getter = SolutionGetter::new(text, 255, false);
    let (sol, cost) = getter.full(&space_cm).unwrap();
    assert!((out.space - parsing_length(&sol, &space_cm)).abs() < 1e-6);
    assert!((cost - out.space).abs() < 1e-6);

    // The degenerate lower bound yields the weight-optimal parsing.
    let lower = Bound::Relative {
        axis: BoundAxis::Time,
        level: 0.0,
    };
    let out_low =
        bilz::api::bicriteria_compress(enc, &data, &time_cm, &lower, true, false).unwrap();
    assert_eq!(
        bilz::decompress(&out_low.file.data[..out_low.file.total_size]).unwrap(),
        data
    );
    assert!(out_low.time <= out.time + 1e-6);
    assert!(out_low.space >= out.space - 1e-6);
}

#[test]
fn test_interior_bound_is_feasible_and_between_endpoints() {
    // S5: an interior bound produces a feasible parsing no costlier
    // than the weight-optimal endpoint.
    let data = sample_text();
    let enc = "soda09_8";
    let time_cm = synthetic_time_model(enc);

    let hi = bilz::api::bicriteria_compress(
        enc,
        &data,
        &time_cm,
        &Bound::Relative {
            axis: BoundAxis::Time,
            level: 1.0,
        },
        false,
        false,
    )
    .unwrap();
    let lo = bilz::api::bicriteria_compress(
        enc,
        &data,
        &time_cm,
        &Bound::Relative {
            axis: BoundAxis::Time,
            level: 0.0,
        },
        false,
        false,
    )
    .unwrap();
    assert!(lo.time < hi.time, "endpoints must disagree on time");

    let mid_w = lo.time + 0.5 * (hi.time - lo.time);
    let mid = bilz::api::bicriteria_compress(
        enc,
        &data,
        &time_cm,
        &Bound::Fixed {
            axis: BoundAxis::Time,
            value: mid_w,
        },
        true,
        false,
    )
    .unwrap();
    assert_eq!(
        bilz::decompress(&mid.file.data[..mid.file.total_size]).unwrap(),
        data
    );

    // Feasible up to the swapper's documented slack.
    let info = lookup(enc).unwrap();
    let space_cm = fuse(&info.cost_model(), &time_cm, 0.0);
    let fused_time = fuse(&time_cm, &info.cost_model(), 0.0);
    let heaviest = space_cm.get_edge(
        *space_cm.dst().last().unwrap(),
        *space_cm.len().last().unwrap(),
    );
    let slack = 2.0 * fused_time.edge_cost(&heaviest);
    assert!(
        mid.time <= mid_w + slack + 1e-6,
        "time {} above bound {} (+ slack {})",
        mid.time,
        mid_w,
        slack
    );

    // Never costlier than the weight-optimal endpoint, never better
    // than the cost-optimal one.
    assert!(mid.space <= lo.space + 1e-6);
    assert!(mid.space >= hi.space - 1e-6);
}

#[test]
fn test_infeasible_bound_is_fatal() {
    let data = sample_text();
    let enc = "soda09_8";
    let time_cm = synthetic_time_model(enc);
    let result = bilz::api::bicriteria_compress(
        enc,
        &data,
        &time_cm,
        &Bound::Fixed {
            axis: BoundAxis::Time,
            value: 1.0, // one nanosecond
        },
        false,
        false,
    );
    assert!(matches!(
        result,
        Err(bilz::Error::InfeasibleBound { .. })
    ));
}

#[test]
fn test_cached_graph_parity() {
    // A replayed parse agrees with the recording parse on lengths,
    // cost classes and total cost.
    let data = sample_text();
    let enc = lookup("soda09_8").unwrap();
    let time_cm = synthetic_time_model("soda09_8");
    let cm = fuse(&enc.cost_model(), &time_cm, 0.0);

    let text = Text::new(data.clone());
    let mut getter = SolutionGetter::new(text, 255, false);
    assert!(!getter.warm());
    let (fresh, fresh_cost) = getter.full(&cm).unwrap();
    assert!(getter.warm());
    let (replayed, replay_cost) = getter.fast(&cm).unwrap();

    assert!((fresh_cost - replay_cost).abs() < 1e-6);
    let mut pos = 0usize;
    while pos < data.len() {
        let (a, b) = (fresh[pos], replayed[pos]);
        assert_eq!(a.ell, b.ell, "length mismatch at {}", pos);
        assert_eq!(a.is_literal(), b.is_literal(), "kind mismatch at {}", pos);
        if !a.is_literal() {
            assert_eq!(a.cost_id, b.cost_id, "class mismatch at {}", pos);
        }
        pos += a.ell as usize;
    }
}

#[test]
fn test_weight_model_file_round_trip() {
    let wm = synthetic_time_model("hybrid");
    let text = wm_serialize(&wm);
    let back = wm_unserialize(&text).unwrap();
    assert_eq!(back.dst(), wm.dst());
    assert!((back.lit_cost(7) - wm.lit_cost(7)).abs() < 1e-9);
    assert!((back.cost_per_char() - wm.cost_per_char()).abs() < 1e-9);
}

#[test]
fn test_fix_parsing_repairs_glued_bodies() {
    // S6: correct nextliteral values restore a decodable parsing;
    // wrong ones are detected by the round trip.
    let data = b"small round stones; small round stones; small stones".to_vec();
    let enc_name = "soda09_8";
    let enc = lookup(enc_name).unwrap();
    let body = bilz::compress_buffer(enc_name, &data).unwrap();

    // Harvest the true counters.
    let mut lits = Vec::new();
    let mut reader = PhraseReader::new(&enc, &body, data.len());
    while !reader.end() {
        let (d, _) = reader.next();
        if d == 0 {
            lits.push(reader.next_literal());
        }
    }
    assert!(!lits.is_empty());

    let mut fixed = vec![0u8; body.len()];
    bilz::api::fix_parsing(enc_name, &body, data.len(), &mut fixed, lits.iter().copied())
        .unwrap();
    assert_eq!(&fixed[..], &body[..], "correct counters reproduce the body");
    assert_eq!(
        bilz::decompress_buffer(enc_name, &fixed, data.len()).unwrap(),
        data
    );

    // Too few counters is an error, not silent corruption.
    let mut short = vec![0u8; body.len()];
    let result = bilz::api::fix_parsing(
        enc_name,
        &body,
        data.len(),
        &mut short,
        std::iter::empty(),
    );
    assert!(result.is_err());
}

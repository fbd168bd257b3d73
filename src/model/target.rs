//! Serialization of weight (decode-time) cost models and target files.
//!
//! A target file `<name>.tgt` holds one serialized weight model per
//! encoder, in sections opened by a line `== <encoder>`. The literal
//! line of the serialization stores `lit_var + copy_time`, so the
//! variable cost is recovered by subtracting the trailing per-byte copy
//! time on load.

use super::{parse_err, CostMatrix, CostModel};
use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn write_row<T: std::fmt::Display>(out: &mut String, row: &[T]) {
    for v in row {
        let _ = write!(out, "{}\t", v);
    }
    out.push('\n');
}

fn read_row<T: std::str::FromStr>(line: &str) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|tok| tok.parse::<T>().map_err(|_| parse_err("bad number in model")))
        .collect()
}

/// Serialize a weight model to its textual form.
pub fn wm_serialize(wm: &CostModel) -> String {
    let mut out = String::new();
    write_row(&mut out, wm.dst());
    write_row(&mut out, wm.len());
    let matrix = wm.matrix();
    for dst_idx in 0..matrix.dsts() {
        let row: Vec<f64> = (0..matrix.lens()).map(|l| matrix.get(dst_idx, l)).collect();
        write_row(&mut out, &row);
    }
    let _ = writeln!(out, "{}", wm.lit_cost(0));
    let _ = writeln!(out, "{}", wm.cost_per_char() + wm.lit_cost(1) - wm.lit_cost(0));
    let _ = writeln!(out, "{}", wm.cost_per_char());
    out
}

/// Parse a weight model from its textual form.
pub fn wm_unserialize(serialized: &str) -> Result<CostModel> {
    let mut lines = serialized.lines();
    let mut next = || lines.next().ok_or_else(|| parse_err("truncated model"));

    let dsts: Vec<u32> = read_row(next()?)?;
    let lens: Vec<u32> = read_row(next()?)?;
    if dsts.is_empty() || lens.is_empty() {
        return Err(parse_err("empty ladder in model"));
    }

    let mut matrix = CostMatrix::new(dsts.len(), lens.len());
    for dst_idx in 0..dsts.len() {
        let row: Vec<f64> = read_row(next()?)?;
        if row.len() != lens.len() {
            return Err(parse_err("cost row width mismatch"));
        }
        for (len_idx, &v) in row.iter().enumerate() {
            matrix.set(dst_idx, len_idx, v);
        }
    }

    let lit_fixed: f64 = read_row(next()?)?
        .first()
        .copied()
        .ok_or_else(|| parse_err("missing literal fixed cost"))?;
    let mut lit_var: f64 = read_row(next()?)?
        .first()
        .copied()
        .ok_or_else(|| parse_err("missing literal variable cost"))?;
    let copy_time: f64 = read_row(next()?)?
        .first()
        .copied()
        .ok_or_else(|| parse_err("missing copy time"))?;

    // The line stores lit_var + copy_time.
    lit_var -= copy_time;

    Ok(CostModel::new(
        dsts, lens, &matrix, lit_fixed, lit_var, copy_time,
    ))
}

/// Extract the body of section `== <field>` from a target file's text.
fn read_field(contents: &str, field: &str) -> Option<String> {
    let header = format!("== {}", field);
    let mut body = String::new();
    let mut found = false;
    for line in contents.lines() {
        if !found {
            if line.trim_end() == header {
                found = true;
            }
        } else {
            if line.starts_with("== ") {
                break;
            }
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
        }
    }
    if found && !body.trim().is_empty() {
        Some(body)
    } else {
        None
    }
}

/// Load the weight model of `encoder` from target `<target>.tgt`.
pub fn get_weight_model(target: &str, encoder: &str) -> Result<CostModel> {
    let path = format!("{}.tgt", target);
    let not_found = || Error::ModelNotFound {
        target: target.to_string(),
        encoder: encoder.to_string(),
    };
    let contents = fs::read_to_string(Path::new(&path)).map_err(|_| not_found())?;
    let body = read_field(&contents, encoder).ok_or_else(not_found)?;
    wm_unserialize(&body)
}

/// Read a standalone cost model file.
///
/// Format: three blank-line-separated groups. The first two list one
/// `(threshold, cost)` pair per line for distances and lengths; the
/// third holds the literal window, fixed cost and variable cost.
pub fn read_model(path: &Path) -> Result<(CostModel, u32)> {
    let contents = fs::read_to_string(path)?;
    let mut groups: Vec<Vec<&str>> = vec![Vec::new()];
    for line in contents.lines() {
        if line.trim().is_empty() {
            if !groups.last().expect("non-empty").is_empty() {
                groups.push(Vec::new());
            }
        } else {
            groups.last_mut().expect("non-empty").push(line);
        }
    }
    groups.retain(|g| !g.is_empty());
    if groups.len() != 3 {
        return Err(parse_err("model file needs three groups"));
    }

    let parse_classes = |lines: &[&str]| -> Result<(Vec<u32>, Vec<f64>)> {
        let mut wins = Vec::new();
        let mut costs = Vec::new();
        for line in lines {
            let row: Vec<f64> = read_row(line)?;
            if row.len() != 2 {
                return Err(parse_err("class line needs (threshold, cost)"));
            }
            wins.push(row[0] as u32);
            costs.push(row[1]);
        }
        Ok((wins, costs))
    };

    let (dst_win, dst_cost) = parse_classes(&groups[0])?;
    let (len_win, len_cost) = parse_classes(&groups[1])?;
    let tail: Vec<f64> = groups[2]
        .iter()
        .flat_map(|l| l.split_whitespace())
        .map(|tok| tok.parse::<f64>().map_err(|_| parse_err("bad number in model")))
        .collect::<Result<_>>()?;
    if tail.len() != 3 {
        return Err(parse_err(
            "model file tail needs literal window, fixed and variable cost",
        ));
    }

    let cm = CostModel::from_classes(
        super::ClassInfo::new(dst_win, dst_cost),
        super::ClassInfo::new(len_win, len_cost),
        tail[1],
        tail[2],
        0.0,
    );
    Ok((cm, tail[0] as u32))
}

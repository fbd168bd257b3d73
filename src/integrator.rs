//! Solution integration: re-label the edges of parsings produced under
//! a fused cost model so they conform to a single encoder's
//! quantization of (d, ell).
//!
//! A fresh FSG replays the text; whenever an integrated parsing has a
//! copy edge starting at the current position, the mesh is searched for
//! an edge of the exact same length, whose distance and class replace
//! the original. Literal runs pass through verbatim.

use crate::encoders::EncoderInfo;
use crate::error::{Error, Result};
use crate::fsg::Fsg;
use crate::model::{CostModel, Edge};
use crate::parsing::PhraseReader;
use crate::suffix::SaSource;
use crate::text::Text;

/// Re-encodes sets of parsings against a native cost model.
pub struct SolutionIntegrator {
    text: Text,
    cm: CostModel,
}

impl SolutionIntegrator {
    /// Integrate against `cm` over `text`.
    pub fn new(text: Text, cm: CostModel) -> Self {
        SolutionIntegrator { text, cm }
    }

    /// Process one phrase of solution `j`: literals pass through, copy
    /// edges are re-labeled from the mesh. Returns the phrase length.
    fn fix(
        reader: &mut PhraseReader<'_>,
        out: &mut crate::encoders::Encoder<'_>,
        edges: &[Edge],
        position: usize,
    ) -> Result<usize> {
        let (d, ell) = reader.next();
        if d == 0 {
            out.encode_literal_run(&reader.buffer()[..ell as usize], reader.next_literal());
            Ok(ell as usize)
        } else {
            for e in edges {
                if e.ell == ell {
                    out.encode_copy(e.d, ell);
                    return Ok(ell as usize);
                }
            }
            Err(Error::IntegrationMiss { position, ell })
        }
    }

    /// Integrate the parsings in `inputs` (encoded with `enc`), writing
    /// the re-labeled bodies into `outputs` (zeroed, same sizes).
    pub fn integrate(
        &self,
        enc: &EncoderInfo,
        sa: &mut dyn SaSource,
        inputs: &[&[u8]],
        outputs: &mut [Vec<u8>],
    ) -> Result<()> {
        if inputs.len() != outputs.len() {
            return Err(Error::InvalidInput(
                "integrated solutions and outputs differ in cardinality".into(),
            ));
        }
        let t_len = self.text.len();
        let suffixes = sa.get(self.text.as_slice());
        let mut fsg = crate::fsg::gen_fast_fsg(&self.text, suffixes, &self.cm)?;

        let mut readers: Vec<PhraseReader<'_>> = inputs
            .iter()
            .map(|body| PhraseReader::new(enc, body, t_len))
            .collect();
        let mut writers: Vec<crate::encoders::Encoder<'_>> = outputs
            .iter_mut()
            .map(|out| enc.encoder(out))
            .collect();

        let mut next = vec![0usize; readers.len()];
        let mut i = 0usize;
        let mut lowest = 0usize;
        while lowest < t_len {
            // Skip positions nobody needs.
            for _ in i..lowest {
                fsg.gen_next();
            }
            i = lowest;
            let edges = fsg
                .gen_next()
                .expect("integration position within the text");

            let mut round_min = usize::MAX;
            for (j, reader) in readers.iter_mut().enumerate() {
                if next[j] == i {
                    let len = Self::fix(reader, &mut writers[j], edges, i)?;
                    next[j] += len;
                }
                round_min = round_min.min(next[j]);
            }
            lowest = round_min;
            i += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::lookup;
    use crate::meter::Silent;
    use crate::model::fuse;
    use crate::parsing::write_parsing;
    use crate::suffix::SaCache;
    use std::rc::Rc;

    #[test]
    fn test_integrate_is_identity_on_native_parsing() {
        // Integrating a parsing already aligned to the native model
        // yields a decodable, equivalent body.
        let data = b"abracadabra_abracadabra_abracadabra".to_vec();
        let text = Text::new(data.clone());
        let enc = lookup("soda09_8").unwrap();
        let cm = enc.cost_model();
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = crate::fsg::gen_fast_fsg(&text, sa, &cm).unwrap();
        let (sol, _) = crate::parser::parse(&mut fsg, 255, &cm, &mut Silent);
        let comp = write_parsing(&sol, &text, &enc);
        let body = comp.body().unwrap();

        let integrator = SolutionIntegrator::new(text.clone(), cm);
        let mut outputs = vec![vec![0u8; body.len()]];
        let mut cache = SaCache::new();
        integrator
            .integrate(&enc, &mut cache, &[body], &mut outputs)
            .unwrap();

        // The integrated body decodes to the same text.
        let out = crate::decompress::decompress_body(&enc, &outputs[0], data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_integrate_fixes_representative_distances() {
        // A parsing whose copy distances are only class representatives
        // (as produced by the cached FSG) must come out decodable.
        let data = b"xyzwxyzwxyzwxyzwxyzwxyzwxyzw".to_vec();
        let text = Text::new(data.clone());
        let enc = lookup("soda09_8").unwrap();
        let cm = fuse(&enc.cost_model(), &enc.cost_model(), 0.0);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let mut fsg = crate::fsg::gen_fast_fsg(&text, sa, &cm).unwrap();
        let (mut sol, _) = crate::parser::parse(&mut fsg, 255, &cm, &mut Silent);

        // Scramble distances within reason: keep lengths, bump d to a
        // wrong-but-encodable value.
        let mut pos = 0usize;
        while pos < data.len() {
            let e = sol[pos];
            let step = e.ell as usize;
            if !e.is_literal() && e.d > 1 {
                sol[pos].d = 1;
            }
            pos += step;
        }
        let comp = write_parsing(&sol, &text, &enc);
        let body = comp.body().unwrap();

        let integrator = SolutionIntegrator::new(text.clone(), cm);
        let mut outputs = vec![vec![0u8; body.len() + 16]];
        let mut cache = SaCache::new();
        integrator
            .integrate(&enc, &mut cache, &[body], &mut outputs)
            .unwrap();
        let out = crate::decompress::decompress_body(&enc, &outputs[0], data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_integrate_reports_miss() {
        // An edge length no mesh edge can match is a fatal logic error.
        let data = b"qqqqqqqqqqqqqqqqplm".to_vec();
        let text = Text::new(data.clone());
        let enc = lookup("soda09_8").unwrap();
        let cm = enc.cost_model();

        // Hand-build a parsing with a copy longer than any real match.
        let mut sol = vec![Edge::INVALID; data.len() + 1];
        sol[0] = Edge::literal(16);
        sol[16] = cm.get_edge(16, 3); // "plm" never matches "qqq"
        let comp = write_parsing(&sol, &text, &enc);
        let body = comp.body().unwrap();

        let integrator = SolutionIntegrator::new(text.clone(), cm);
        let mut outputs = vec![vec![0u8; body.len() + 16]];
        let mut cache = SaCache::new();
        match integrator.integrate(&enc, &mut cache, &[body], &mut outputs) {
            Err(Error::IntegrationMiss { position, ell }) => {
                assert_eq!(position, 16);
                assert_eq!(ell, 3);
            }
            other => panic!("expected integration miss, got {:?}", other.is_ok()),
        }
    }
}

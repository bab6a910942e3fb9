use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fastq::FastqRecord;
use crate::filter::{Outcome, Transform, TransformKind};

/// How adapter strings from the catalog are turned into matchers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Adapter strings are regular expressions.
    #[default]
    Regex,
    /// Adapter strings are matched as plain text.
    Literal,
}

/// Removes every occurrence of each adapter from the sequence line.
///
/// Patterns run in catalog order, each one over the output of the previous,
/// so overlapping adapters are resolved by list order. The quality line is
/// left untouched, so a stripped record's quality can be longer than its
/// sequence.
pub struct AdapterStrip {
    patterns: Vec<Regex>,
}

impl AdapterStrip {
    pub fn new<S: AsRef<str>>(adapters: &[S], mode: PatternMode) -> Result<Self, ValidationError> {
        let mut patterns = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let adapter = adapter.as_ref();
            if adapter.is_empty() {
                continue;
            }
            let source = match mode {
                PatternMode::Regex => adapter.to_string(),
                PatternMode::Literal => regex::escape(adapter),
            };
            let re = Regex::new(&source).map_err(|source| ValidationError::InvalidPattern {
                pattern: adapter.to_string(),
                source,
            })?;
            patterns.push(re);
        }
        Ok(Self { patterns })
    }

    pub fn strip(&self, seq: &str) -> String {
        let mut out = seq.to_string();
        for re in &self.patterns {
            if re.is_match(&out) {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        out
    }
}

impl Transform for AdapterStrip {
    fn kind(&self) -> TransformKind {
        TransformKind::AdapterStrip
    }

    fn apply(&self, mut rec: FastqRecord) -> Outcome {
        let stripped = self.strip(&rec.seq);
        let modified = stripped != rec.seq;
        rec.seq = stripped;
        Outcome::keep(rec, modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(seq: &str) -> FastqRecord {
        FastqRecord::new("@r1".into(), seq.into(), "+".into(), "I".repeat(seq.len()))
    }

    #[test]
    fn strips_adapter_and_leaves_quality_alone() {
        let t = AdapterStrip::new(&["ACGT"], PatternMode::Regex).unwrap();
        let out = t.apply(rec("XXACGTYY"));
        assert!(out.modified);
        let r = out.record.unwrap();
        assert_eq!(r.seq, "XXYY");
        // quality keeps its full length
        assert_eq!(r.qual.len(), 8);
    }

    #[test]
    fn removes_all_non_overlapping_matches() {
        let t = AdapterStrip::new(&["AA"], PatternMode::Literal).unwrap();
        assert_eq!(t.strip("AAAAA"), "A");
        assert_eq!(t.strip("CAAGAAT"), "CGT");
    }

    #[test]
    fn later_patterns_see_earlier_results() {
        // removing "GG" first joins "AC" and "TT" into "ACTT"
        let t = AdapterStrip::new(&["GG", "ACTT"], PatternMode::Literal).unwrap();
        assert_eq!(t.strip("CACGGTTC"), "CC");

        let reversed = AdapterStrip::new(&["ACTT", "GG"], PatternMode::Literal).unwrap();
        assert_eq!(reversed.strip("CACGGTTC"), "CACTTC");
    }

    #[test]
    fn unmatched_record_is_kept_unmodified() {
        let t = AdapterStrip::new(&["GGGG"], PatternMode::Regex).unwrap();
        let out = t.apply(rec("ACGT"));
        assert!(!out.modified);
        assert_eq!(out.record.unwrap().seq, "ACGT");
    }

    #[test]
    fn regex_mode_honours_metacharacters() {
        let regex = AdapterStrip::new(&["A.G"], PatternMode::Regex).unwrap();
        assert_eq!(regex.strip("TACGT"), "TT");

        let literal = AdapterStrip::new(&["A.G"], PatternMode::Literal).unwrap();
        assert_eq!(literal.strip("TACGT"), "TACGT");
        assert_eq!(literal.strip("TA.GT"), "TT");
    }

    #[test]
    fn invalid_regex_is_a_validation_error() {
        match AdapterStrip::new(&["AC(GT"], PatternMode::Regex) {
            Err(ValidationError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "AC(GT"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("pattern should not compile"),
        }
        assert!(AdapterStrip::new(&["AC(GT"], PatternMode::Literal).is_ok());
    }

    #[test]
    fn empty_adapters_are_skipped() {
        let t = AdapterStrip::new(&["", "AC"], PatternMode::Regex).unwrap();
        assert_eq!(t.patterns.len(), 1);
        assert_eq!(t.strip("GACT"), "GT");
    }
}

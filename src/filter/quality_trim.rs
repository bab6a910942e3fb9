use crate::fastq::FastqRecord;
use crate::filter::{Outcome, Transform, TransformKind};

/// 3' quality trimming: cuts everything after the last base whose Phred
/// score reaches the threshold.
pub struct QualityTrim {
    threshold: i32,
}

impl QualityTrim {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    /// Length of the prefix to keep, 0 when no base reaches the threshold.
    pub fn keep_len(&self, rec: &FastqRecord) -> usize {
        let scores: Vec<i32> = rec.scores().collect();
        scores
            .iter()
            .rposition(|&q| q >= self.threshold)
            .map_or(0, |i| i + 1)
    }
}

impl Transform for QualityTrim {
    fn kind(&self) -> TransformKind {
        TransformKind::QualityTrim
    }

    fn apply(&self, mut rec: FastqRecord) -> Outcome {
        let l = rec.base_count();
        let keep = self.keep_len(&rec);
        let modified = keep < l;
        if keep == 0 {
            return Outcome::discard(modified);
        }
        if modified {
            rec.truncate(keep);
        }
        Outcome::keep(rec, modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(qual: &str) -> FastqRecord {
        let seq: String = "ACGT".chars().cycle().take(qual.len()).collect();
        FastqRecord::new("@r".into(), seq, "+".into(), qual.into())
    }

    #[test]
    fn trailing_high_quality_keeps_everything() {
        let t = QualityTrim::new(20);
        let out = t.apply(rec("!!!5555"));
        assert!(!out.modified);
        assert_eq!(out.record.unwrap().qual, "!!!5555");
    }

    #[test]
    fn trims_low_quality_tail() {
        let t = QualityTrim::new(20);
        let out = t.apply(rec("5550000"));
        assert!(out.modified);
        let r = out.record.unwrap();
        assert_eq!(r.seq, "ACG");
        assert_eq!(r.qual, "555");
    }

    #[test]
    fn all_below_threshold_is_dropped() {
        let t = QualityTrim::new(30);
        let out = t.apply(rec("5555"));
        assert!(out.modified);
        assert!(out.record.is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        // '5' is Q20
        let t = QualityTrim::new(20);
        assert_eq!(t.keep_len(&rec("I5!")), 2);
        assert_eq!(t.keep_len(&rec("!!5")), 3);
    }

    #[test]
    fn trimming_is_idempotent() {
        let t = QualityTrim::new(25);
        for q in ["I#I##", "IIII", "#I#I#I##", "5:;<=!"] {
            let once = t.apply(rec(q));
            if let Some(r) = once.record {
                let twice = t.apply(r.clone());
                assert!(!twice.modified);
                assert_eq!(twice.record.unwrap(), r);
            }
        }
    }

    #[test]
    fn trims_multibyte_bases_by_character() {
        let t = QualityTrim::new(20);
        let r = FastqRecord::new("@r".into(), "\u{c5}CG".into(), "+".into(), "I!!".into());
        let out = t.apply(r);
        assert!(out.modified);
        let r = out.record.unwrap();
        assert_eq!(r.seq, "\u{c5}");
        assert_eq!(r.qual, "I");
    }

    #[test]
    fn kept_records_stay_aligned() {
        let t = QualityTrim::new(15);
        let r = t.apply(rec("II00##0#")).record.unwrap();
        assert_eq!(r.seq.len(), r.qual.len());
    }
}

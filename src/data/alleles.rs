//! Allele-pair classification.

use serde::{Deserialize, Serialize};

/// Type of a reference/alternate allele pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlleleType {
    Snp,
    Mnp,
    Insertion,
    Deletion,
    Complex,
    /// Spanning deletion (`*`).
    Star,
    /// Symbolic or breakend alternate allele.
    Symbolic,
    Unknown,
}

impl AlleleType {
    /// Classify a bi-allelic pair.
    pub fn classify(reference: &str, alternate: &str) -> Self {
        if alternate == "*" {
            return Self::Star;
        }
        if reference.is_empty() || alternate.is_empty() {
            return Self::Unknown;
        }
        if is_symbolic(alternate) {
            return Self::Symbolic;
        }

        let (r, a) = (reference.as_bytes(), alternate.as_bytes());
        if r.len() == a.len() {
            let mismatches = r
                .iter()
                .zip(a)
                .filter(|(x, y)| !x.eq_ignore_ascii_case(y))
                .count();
            return match mismatches {
                0 => Self::Unknown,
                1 => Self::Snp,
                _ => Self::Mnp,
            };
        }

        // Shared first base, and the longer allele ends with the rest of the shorter.
        let (short, long) = if r.len() < a.len() { (r, a) } else { (a, r) };
        let anchored = r[0] == a[0] && long.ends_with(&short[1..]);
        match (anchored, r.len() < a.len()) {
            (true, true) => Self::Insertion,
            (true, false) => Self::Deletion,
            (false, _) => Self::Complex,
        }
    }

    pub fn is_indel(&self) -> bool {
        matches!(self, Self::Insertion | Self::Deletion)
    }

    pub fn is_snp(&self) -> bool {
        matches!(self, Self::Snp)
    }
}

fn is_symbolic(allele: &str) -> bool {
    (allele.starts_with('<') && allele.ends_with('>'))
        || allele.contains('[')
        || allele.contains(']')
        || allele.starts_with('.')
        || allele.ends_with('.')
}

/// Classify the first two alleles of a record; `None` when fewer than two.
///
/// Only `alleles[0]` and `alleles[1]` are read, so multi-allelic records
/// must be split beforehand.
pub fn allele_type(alleles: &[String]) -> Option<AlleleType> {
    match alleles {
        [reference, alternate, ..] => Some(AlleleType::classify(reference, alternate)),
        _ => None,
    }
}

pub fn is_indel(alleles: &[String]) -> bool {
    allele_type(alleles).is_some_and(|t| t.is_indel())
}

pub fn is_snp(alleles: &[String]) -> bool {
    allele_type(alleles).is_some_and(|t| t.is_snp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snp_and_mnp() {
        assert_eq!(AlleleType::classify("A", "T"), AlleleType::Snp);
        assert_eq!(AlleleType::classify("AC", "AT"), AlleleType::Snp);
        assert_eq!(AlleleType::classify("AC", "GT"), AlleleType::Mnp);
        assert_eq!(AlleleType::classify("A", "A"), AlleleType::Unknown);
    }

    #[test]
    fn test_indels() {
        assert_eq!(AlleleType::classify("A", "AT"), AlleleType::Insertion);
        assert_eq!(AlleleType::classify("ATT", "A"), AlleleType::Deletion);
        assert_eq!(AlleleType::classify("AGT", "AT"), AlleleType::Deletion);
        assert_eq!(AlleleType::classify("AC", "GTT"), AlleleType::Complex);
        assert!(AlleleType::Insertion.is_indel());
        assert!(!AlleleType::Complex.is_indel());
    }

    #[test]
    fn test_unanchored_length_change_is_complex() {
        assert_eq!(AlleleType::classify("TA", "A"), AlleleType::Complex);
        assert_eq!(AlleleType::classify("AC", "C"), AlleleType::Complex);
        assert_eq!(AlleleType::classify("A", "TA"), AlleleType::Complex);
        assert_eq!(AlleleType::classify("AT", "AGT"), AlleleType::Insertion);
        assert!(is_indel(&["AGT".to_string(), "AT".to_string()]));
        assert!(!is_indel(&["AC".to_string(), "C".to_string()]));
        assert!(!is_indel(&["A".to_string(), "TA".to_string()]));
    }

    #[test]
    fn test_special_alleles() {
        assert_eq!(AlleleType::classify("A", "*"), AlleleType::Star);
        assert_eq!(AlleleType::classify("A", "<DEL>"), AlleleType::Symbolic);
        assert_eq!(AlleleType::classify("A", "A[chr2:100["), AlleleType::Symbolic);
    }

    #[test]
    fn test_only_first_pair_is_read() {
        let alleles = vec!["A".to_string(), "G".to_string(), "AT".to_string()];
        assert!(is_snp(&alleles));
        assert!(!is_indel(&alleles));
        assert_eq!(allele_type(&["A".to_string()]), None);
    }
}

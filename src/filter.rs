//! Output script filter
//!
//! A transaction is indexed when any of its outputs carries a script that
//! starts with the filter bytes. The default filter selects Sidetree anchor
//! outputs: `OP_RETURN <41> "sidetree:" <32-byte hash>`.

use bitcoin::Transaction;

/// `OP_RETURN` opcode.
pub const OP_RETURN: u8 = 0x6a;

/// Tag carried by Sidetree anchor outputs.
pub const SIDETREE_TAG: &[u8; 9] = b"sidetree:";

/// Length of the anchored hash following the tag.
pub const ANCHOR_HASH_LEN: usize = 32;

/// OP_RETURN, push length (9 + 32), then the ascii tag.
pub const SIDETREE_FILTER: [u8; 11] = [
    OP_RETURN,
    (SIDETREE_TAG.len() + ANCHOR_HASH_LEN) as u8,
    b's',
    b'i',
    b'd',
    b'e',
    b't',
    b'r',
    b'e',
    b'e',
    b':',
];

/// Exact, case-sensitive prefix match over raw output scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    prefix: Vec<u8>,
}

impl Filter {
    /// Build a filter from an arbitrary script prefix.
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The Sidetree anchor filter.
    pub fn sidetree() -> Self {
        Self::new(SIDETREE_FILTER)
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// True iff the script starts with the filter bytes.
    ///
    /// Scripts shorter than the filter never match.
    pub fn matches_script(&self, script: &[u8]) -> bool {
        script.starts_with(&self.prefix)
    }

    /// True iff any output of `tx` matches.
    pub fn matches_tx(&self, tx: &Transaction) -> bool {
        tx.output
            .iter()
            .any(|output| self.matches_script(output.script_pubkey.as_bytes()))
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::sidetree()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{anchor_script, TxBuilder};
    use proptest::prelude::*;

    #[test]
    fn test_sidetree_filter_bytes() {
        assert_eq!(SIDETREE_FILTER[0], 0x6a);
        assert_eq!(SIDETREE_FILTER[1], 41);
        assert_eq!(&SIDETREE_FILTER[2..], b"sidetree:");
    }

    #[test]
    fn test_matches_anchor_script() {
        let filter = Filter::sidetree();
        assert!(filter.matches_script(&anchor_script([0u8; 32])));
    }

    #[test]
    fn test_prefix_only_is_enough() {
        // Matching looks at the first 11 bytes only
        let filter = Filter::sidetree();
        assert!(filter.matches_script(&SIDETREE_FILTER));
    }

    #[test]
    fn test_rejects_near_misses() {
        let filter = Filter::sidetree();
        assert!(!filter.matches_script(&SIDETREE_FILTER[..10]));
        assert!(!filter.matches_script(b""));

        let mut upper = anchor_script([0u8; 32]);
        upper[2..11].copy_from_slice(b"SIDETREE:");
        assert!(!filter.matches_script(&upper));

        let mut wrong_len = anchor_script([0u8; 32]);
        wrong_len[1] = 40;
        assert!(!filter.matches_script(&wrong_len));

        let mut omni = vec![OP_RETURN, 4];
        omni.extend_from_slice(b"OMNI");
        assert!(!filter.matches_script(&omni));
    }

    #[test]
    fn test_any_output_qualifies() {
        let filter = Filter::sidetree();
        let tx = TxBuilder::new(1)
            .output(5000, vec![0x76, 0xa9, 0x14])
            .output(0, anchor_script([7u8; 32]))
            .output(0, anchor_script([8u8; 32]))
            .build();
        assert!(filter.matches_tx(&tx));

        let plain = TxBuilder::new(2).output(5000, vec![0x51]).build();
        assert!(!filter.matches_tx(&plain));
    }

    #[test]
    fn test_alternate_filter() {
        let filter = Filter::new(vec![OP_RETURN, 4, b'O', b'M', b'N', b'I']);
        let mut omni = vec![OP_RETURN, 4];
        omni.extend_from_slice(b"OMNI");
        assert!(filter.matches_script(&omni));
        assert!(!filter.matches_script(&anchor_script([0u8; 32])));
    }

    proptest! {
        #[test]
        fn prop_matches_iff_prefixed(script in proptest::collection::vec(any::<u8>(), 0..64)) {
            let filter = Filter::sidetree();
            prop_assert_eq!(filter.matches_script(&script), script.starts_with(&SIDETREE_FILTER));
        }

        #[test]
        fn prop_any_suffix_matches(suffix in proptest::collection::vec(any::<u8>(), 0..80)) {
            let mut script = SIDETREE_FILTER.to_vec();
            script.extend_from_slice(&suffix);
            prop_assert!(Filter::sidetree().matches_script(&script));
        }

        #[test]
        fn prop_altered_filter_byte_never_matches(
            pos in 0..SIDETREE_FILTER.len(),
            delta in 1..=255u8,
            suffix in proptest::collection::vec(any::<u8>(), 0..40),
        ) {
            let mut script = SIDETREE_FILTER.to_vec();
            script[pos] = script[pos].wrapping_add(delta);
            script.extend_from_slice(&suffix);
            prop_assert!(!Filter::sidetree().matches_script(&script));
        }

        #[test]
        fn prop_truncated_filter_never_matches(len in 0..SIDETREE_FILTER.len()) {
            prop_assert!(!Filter::sidetree().matches_script(&SIDETREE_FILTER[..len]));
        }
    }
}

//! Store key escaping. The hosted store rejects `.` in child keys, so
//! dotted tickers (BRK.B, BF.B) are escaped on the way in and restored on
//! the way out. `_DOT_` cannot occur in a legal identifier (alphanumerics,
//! dot, dash), which makes the mapping reversible without collisions.

const DOT_ESCAPE: &str = "_DOT_";

pub fn encode(id: &str) -> String {
    id.replace('.', DOT_ESCAPE)
}

pub fn decode(safe_id: &str) -> String {
    safe_id.replace(DOT_ESCAPE, ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_tickers_round_trip() {
        for id in ["BRK.B", "BF.B", "X.Y.Z", ".LEADING", "TRAILING."] {
            let encoded = encode(id);
            assert!(!encoded.contains('.'));
            assert_eq!(decode(&encoded), id);
        }
    }

    #[test]
    fn dotless_identifiers_are_untouched() {
        assert_eq!(encode("AAPL"), "AAPL");
        assert_eq!(decode("AAPL"), "AAPL");
        assert_eq!(encode("ABC-1"), "ABC-1");
    }

    #[test]
    fn distinct_identifiers_never_collide() {
        let ids = ["BRK.B", "BRKB", "BRK-B", "B.RKB", "BRK.B.", "A", "A.A"];
        let encoded: Vec<String> = ids.iter().map(|id| encode(id)).collect();
        for (i, a) in encoded.iter().enumerate() {
            for b in &encoded[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

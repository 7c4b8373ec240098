use proptest::prelude::*;
use wiki_fs::{hash_text, normalize};

proptest! {
    #[test]
    fn test_normalize_is_idempotent(s in "\\PC*") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn test_hash_stable_under_renormalization(s in "[a-z \\t\\r\\n]{0,64}") {
        prop_assert_eq!(hash_text(&normalize(&s)), hash_text(&normalize(&normalize(&s))));
    }

    #[test]
    fn test_crlf_and_lf_hash_equal(lines in proptest::collection::vec("[a-z]{0,8}", 0..8)) {
        let lf = lines.join("\n");
        let crlf = lines.join("\r\n");
        prop_assert_eq!(hash_text(&lf), hash_text(&crlf));
    }
}

//! Name normalization for the suggest index.
//!
//! A searchable key is a primary-strength collation of the text: Unicode
//! decomposition, everything but letters and digits stripped, lowercased.
//! Case, accents, punctuation and whitespace therefore never affect prefix
//! matching, which is what makes `Ääne` find `Äänekoski` and `hAm` find
//! `Hamina`.

use std::collections::BTreeSet;

use deunicode::deunicode;
use encoding_rs::Encoding;
use unicode_normalization::UnicodeNormalization;

use crate::location::GeoId;

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    remove_underscores: bool,
    ascii_variants: bool,
    fallback_encodings: Vec<&'static Encoding>,
}

impl Normalizer {
    pub fn new(
        remove_underscores: bool,
        ascii_variants: bool,
        fallback_encoding_labels: &[String],
    ) -> Self {
        let fallback_encodings = fallback_encoding_labels
            .iter()
            .filter_map(|label| Encoding::for_label(label.as_bytes()))
            .collect();
        Self {
            remove_underscores,
            ascii_variants,
            fallback_encodings,
        }
    }

    /// Collation key: NFD, keep alphanumerics only, lowercase.
    ///
    /// Decomposition detaches combining marks from their base letters and the
    /// alphanumeric filter drops them along with punctuation and whitespace,
    /// so the result is a case-, accent- and punctuation-insensitive key.
    pub fn collation_key(&self, text: &str) -> String {
        text.nfd()
            .filter(|ch| ch.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Key for a bare name, as used for exact-match comparisons.
    pub fn treeword(&self, name: &str) -> String {
        self.collation_key(name)
    }

    /// Key for a `name, area` pair, as stored in the tries.
    pub fn treeword_with_area(&self, name: &str, area: &str) -> String {
        if area.is_empty() {
            return self.collation_key(name);
        }
        let mut key = self.collation_key(name);
        key.push_str(&self.collation_key(area));
        key
    }

    /// Underscore cleanup for station names whose words were joined with `_`.
    pub fn preprocess(&self, name: &str) -> String {
        if self.remove_underscores {
            name.replace('_', " ")
        } else {
            name.to_string()
        }
    }

    /// All tail slices of `name` starting at a word boundary, longest first:
    /// `Ho Chi Minh City` yields itself, `Chi Minh City`, `Minh City`, `City`.
    pub fn word_suffixes<'a>(&self, name: &'a str) -> Vec<&'a str> {
        let mut suffixes = Vec::new();
        let mut prev_alphanumeric = false;
        for (idx, ch) in name.char_indices() {
            let alphanumeric = ch.is_alphanumeric();
            if alphanumeric && !prev_alphanumeric {
                suffixes.push(&name[idx..]);
            }
            prev_alphanumeric = alphanumeric;
        }
        suffixes
    }

    /// The full set of trie keys for one location name.
    ///
    /// Every word-start suffix of the (preprocessed) name is keyed together
    /// with the `area,geoid` specifier, mirroring how a user may search for
    /// `name,area`. With ASCII autocomplete enabled, a transliterated variant
    /// of the name contributes its own suffixes when it differs.
    pub fn tree_keys(&self, name: &str, area: &str, geoid: GeoId) -> BTreeSet<String> {
        let specifier = format!("{area},{geoid}");
        let name = self.preprocess(name);

        let mut keys = BTreeSet::new();
        for suffix in self.word_suffixes(&name) {
            keys.insert(self.treeword_with_area(suffix, &specifier));
        }

        if self.ascii_variants {
            let ascii = deunicode(&name);
            if ascii != name {
                for suffix in self.word_suffixes(&ascii) {
                    keys.insert(self.treeword_with_area(suffix, &specifier));
                }
            }
        }

        keys
    }

    /// Decode a pattern that is not valid UTF-8, one fallback encoding at a
    /// time. The caller retries the search with each decoding until one
    /// yields matches.
    pub fn fallback_decodings(&self, bytes: &[u8]) -> Vec<String> {
        self.fallback_encodings
            .iter()
            .map(|encoding| {
                let (text, _, _) = encoding.decode(bytes);
                text.into_owned()
            })
            .collect()
    }

    pub fn has_fallback_encodings(&self) -> bool {
        !self.fallback_encodings.is_empty()
    }
}

/// Language identifiers are compared case-insensitively everywhere.
pub fn normalize_language(lang: &str) -> String {
    lang.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(false, false, &[])
    }

    #[test]
    fn collation_folds_case_accents_and_punctuation() {
        let n = normalizer();
        assert_eq!(n.collation_key("Äänekoski"), "aanekoski");
        assert_eq!(n.collation_key("Åbo"), "abo");
        assert_eq!(n.collation_key("hAm"), "ham");
        assert_eq!(n.collation_key("New York"), "newyork");
        assert_eq!(n.collation_key("Kumpula, Helsinki"), "kumpulahelsinki");
        assert_eq!(n.collation_key("Orléans"), "orleans");
    }

    #[test]
    fn accented_prefix_matches_accented_name() {
        let n = normalizer();
        let key = n.collation_key("Äänekoski");
        assert!(key.starts_with(&n.collation_key("Ääne")));
        assert!(key.starts_with(&n.collation_key("aane")));
    }

    #[test]
    fn word_suffixes_start_at_every_word() {
        let n = normalizer();
        assert_eq!(
            n.word_suffixes("Ho Chi Minh City"),
            vec!["Ho Chi Minh City", "Chi Minh City", "Minh City", "City"]
        );
        assert_eq!(n.word_suffixes("Ii"), vec!["Ii"]);
        assert_eq!(n.word_suffixes(""), Vec::<&str>::new());
    }

    #[test]
    fn underscores_split_words_when_enabled() {
        let n = Normalizer::new(true, false, &[]);
        let keys = n.tree_keys("Kilpisjärvi_saana", "Enontekiö", 123);
        // The underscore became a word boundary, so "saana..." is a key too.
        assert!(keys.iter().any(|k| k.starts_with("saana")));
    }

    #[test]
    fn tree_keys_carry_area_and_geoid() {
        let n = normalizer();
        let keys = n.tree_keys("Kumpula", "Helsinki", 843_429);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.iter().next().unwrap(), "kumpulahelsinki843429");
    }

    #[test]
    fn ascii_variant_adds_keys_for_non_latin_names() {
        let n = Normalizer::new(false, true, &[]);
        let keys = n.tree_keys("Москва", "RU", 524_901);
        // Original Cyrillic form plus the transliteration.
        assert!(keys.iter().any(|k| k.starts_with("москва")));
        assert!(keys.iter().any(|k| k.starts_with("moskva")));
    }

    #[test]
    fn fallback_decoding_recovers_latin1_bytes() {
        let n = Normalizer::new(false, false, &["ISO-8859-1".to_string()]);
        // "ää" in latin-1
        let decoded = n.fallback_decodings(&[0xE4, 0xE4]);
        assert_eq!(decoded, vec!["ää".to_string()]);
    }

    #[test]
    fn unknown_encoding_labels_are_skipped() {
        let n = Normalizer::new(false, false, &["no-such-encoding".to_string()]);
        assert!(!n.has_fallback_encodings());
    }
}

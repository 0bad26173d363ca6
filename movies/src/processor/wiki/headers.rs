use crate::schema::{ALT_TITLES, ALT_TITLE_HEADERS, HEADER_SYNONYMS};
use serde_json::{Map, Value};

/// One scraped wiki infobox: free-form header to value.
pub type WikiRecord = Map<String, Value>;

/// Move every alternate-title header into a single nested `alt_titles`
/// mapping. Records without any keep no `alt_titles` field.
pub fn fold_alt_titles(record: &mut WikiRecord) {
    let mut alt_titles = Map::new();
    for header in ALT_TITLE_HEADERS {
        if let Some(value) = record.shift_remove(header) {
            alt_titles.insert(header.to_string(), value);
        }
    }
    if !alt_titles.is_empty() {
        record.insert(ALT_TITLES.to_string(), Value::Object(alt_titles));
    }
}

/// Apply the synonym table once, in order. Each rule moves its source value
/// onto the target header, overwriting whatever an earlier rule put there.
pub fn canonicalize_headers(record: &mut WikiRecord) {
    for (from, to) in HEADER_SYNONYMS {
        if let Some(value) = record.shift_remove(from) {
            record.insert(to.to_string(), value);
        }
    }
}

/// Non-destructive clean of one record.
pub fn clean_record(record: &WikiRecord) -> WikiRecord {
    let mut movie = record.clone();
    fold_alt_titles(&mut movie);
    canonicalize_headers(&mut movie);
    movie
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> WikiRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_alt_titles_folded_into_one_field() {
        let raw = record(json!({
            "title": "Crouching Tiger, Hidden Dragon",
            "Traditional": "臥虎藏龍",
            "Mandarin": "Wò Hǔ Cáng Lóng",
            "Director": "Ang Lee",
        }));

        let cleaned = clean_record(&raw);

        assert_eq!(
            cleaned.get(ALT_TITLES),
            Some(&json!({"Mandarin": "Wò Hǔ Cáng Lóng", "Traditional": "臥虎藏龍"}))
        );
        assert!(!cleaned.contains_key("Traditional"));
        assert!(!cleaned.contains_key("Mandarin"));
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn test_no_alt_titles_means_no_field() {
        let cleaned = clean_record(&record(json!({"title": "Heat", "Director": "Michael Mann"})));
        assert!(!cleaned.contains_key(ALT_TITLES));
    }

    #[test]
    fn test_synonyms_renamed() {
        let cleaned = clean_record(&record(json!({
            "Directed by": "Ridley Scott",
            "Music by": "Vangelis",
            "Country of origin": "United States",
        })));
        assert_eq!(cleaned.get("Director"), Some(&json!("Ridley Scott")));
        assert_eq!(cleaned.get("Composer(s)"), Some(&json!("Vangelis")));
        assert_eq!(cleaned.get("Country"), Some(&json!("United States")));
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn test_collisions_last_rule_wins() {
        let cleaned = clean_record(&record(json!({
            "Written by": "Writer A",
            "Screenplay by": "Writer B",
            "Story by": "Writer C",
        })));
        // Rule order: Screenplay by, Story by, Written by.
        assert_eq!(cleaned.get("Writer(s)"), Some(&json!("Writer A")));
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_released_chains_to_release_date() {
        let cleaned = clean_record(&record(json!({"Released": "1999"})));
        assert_eq!(cleaned.get("Release date"), Some(&json!("1999")));
        assert!(!cleaned.contains_key("Release Date"));
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let once = clean_record(&record(json!({
            "Directed by": "Sofia Coppola",
            "Produced by": "Ross Katz",
            "Length": "102 min",
            "Original release": "2003",
            "Hangul": "x",
        })));
        let twice = clean_record(&once);
        assert_eq!(once, twice);
    }
}

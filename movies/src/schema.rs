use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Join key shared by both catalogs.
pub const IMDB_ID: &str = "imdb_id";
pub const IMDB_LINK: &str = "imdb_link";
pub const ALT_TITLES: &str = "alt_titles";

pub const WIKI_SUFFIX: &str = "_wiki";
pub const KAGGLE_SUFFIX: &str = "_kaggle";

// Wiki record filter
pub const DIRECTOR_HEADERS: [&str; 2] = ["Director", "Directed by"];
pub const EPISODE_COUNT_HEADER: &str = "No. of episodes";

/// Language and transliteration headers folded into `alt_titles`.
pub const ALT_TITLE_HEADERS: [&str; 20] = [
    "Also known as",
    "Arabic",
    "Cantonese",
    "Chinese",
    "French",
    "Hangul",
    "Hebrew",
    "Hepburn",
    "Japanese",
    "Literally",
    "Mandarin",
    "McCune-Reischauer",
    "Original title",
    "Polish",
    "Revised Romanization",
    "Romanized",
    "Russian",
    "Simplified",
    "Traditional",
    "Yiddish",
];

/// Ordered `(from, to)` header synonyms, applied in sequence. A later rule
/// targeting an existing header overwrites it, and a rule may feed a later
/// one (`Released` -> `Release Date` -> `Release date`).
pub const HEADER_SYNONYMS: [(&str, &str); 19] = [
    ("Adaptation by", "Writer(s)"),
    ("Country of origin", "Country"),
    ("Directed by", "Director"),
    ("Distributed by", "Distributor"),
    ("Edited by", "Editor(s)"),
    ("Length", "Running time"),
    ("Original release", "Release date"),
    ("Music by", "Composer(s)"),
    ("Produced by", "Producer(s)"),
    ("Producer", "Producer(s)"),
    ("Productioncompanies ", "Production company(s)"),
    ("Productioncompany ", "Production company(s)"),
    ("Released", "Release Date"),
    ("Release Date", "Release date"),
    ("Screen story by", "Writer(s)"),
    ("Screenplay by", "Writer(s)"),
    ("Story by", "Writer(s)"),
    ("Theme music composer", "Composer(s)"),
    ("Written by", "Writer(s)"),
];

/// Free-text wiki columns replaced by a parsed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiParse {
    Currency,
    Budget,
    ReleaseDate,
    RunningTime,
}

pub const WIKI_PARSED_COLUMNS: [(&str, &str, WikiParse); 4] = [
    ("Box office", "box_office", WikiParse::Currency),
    ("Budget", "budget", WikiParse::Budget),
    ("Release date", "release_date", WikiParse::ReleaseDate),
    ("Running time", "running_time", WikiParse::RunningTime),
];

pub fn is_parsed_source(header: &str) -> bool {
    WIKI_PARSED_COLUMNS.iter().any(|(source, _, _)| *source == header)
}

// Metadata CSV
pub const ADULT: &str = "adult";
pub const VIDEO: &str = "video";

/// Strict typing applied to the metadata CSV after the adult filter.
pub const METADATA_TYPES: [(&str, DataType); 8] = [
    ("budget", DataType::Int64),
    ("id", DataType::Int64),
    ("popularity", DataType::Float64),
    ("release_date", DataType::Date32),
    ("revenue", DataType::Float64),
    ("runtime", DataType::Float64),
    ("vote_average", DataType::Float64),
    ("vote_count", DataType::Float64),
];

/// Reconciled columns with the wiki donor that fills in a sentinel value.
pub const FALLBACK_PAIRS: [(&str, &str); 3] = [
    ("runtime", "running_time"),
    ("budget_kaggle", "budget_wiki"),
    ("revenue", "box_office"),
];

/// Wiki columns dropped outright after the join; the metadata side wins.
pub const WIKI_DROPPED_AFTER_JOIN: [&str; 4] = [
    "title_wiki",
    "release_date_wiki",
    "Language",
    "Production company(s)",
];

/// Output projection of the movie table: `(source column, output name)`.
pub const MOVIE_COLUMNS: [(&str, &str); 31] = [
    ("imdb_id", "imdb_id"),
    ("id", "kaggle_id"),
    ("title_kaggle", "title"),
    ("original_title", "original_title"),
    ("tagline", "tagline"),
    ("belongs_to_collection", "belongs_to_collection"),
    ("url", "wikipedia_url"),
    ("imdb_link", "imdb_link"),
    ("runtime", "runtime"),
    ("budget_kaggle", "budget"),
    ("revenue", "revenue"),
    ("release_date_kaggle", "release_date"),
    ("popularity", "popularity"),
    ("vote_average", "vote_average"),
    ("vote_count", "vote_count"),
    ("genres", "genres"),
    ("original_language", "original_language"),
    ("overview", "overview"),
    ("spoken_languages", "spoken_languages"),
    ("Country", "country"),
    ("production_companies", "production_companies"),
    ("production_countries", "production_countries"),
    ("Distributor", "distributor"),
    ("Producer(s)", "producers"),
    ("Director", "director"),
    ("Starring", "starring"),
    ("Cinematography", "cinematography"),
    ("Editor(s)", "editors"),
    ("Writer(s)", "writers"),
    ("Composer(s)", "composers"),
    ("Based on", "based_on"),
];

pub const MOVIE_ID: &str = "kaggle_id";

// Ratings CSV
pub const RATING_MOVIE_ID: &str = "movieId";
pub const RATING_USER_ID: &str = "userId";
pub const RATING: &str = "rating";
pub const RATING_TIMESTAMP: &str = "timestamp";
pub const RATING_PREFIX: &str = "rating_";

pub fn ratings_schema() -> Schema {
    Schema::new(vec![
        Field::new(RATING_USER_ID, DataType::Int64, false),
        Field::new(RATING_MOVIE_ID, DataType::Int64, false),
        Field::new(RATING, DataType::Float64, false),
        Field::new(RATING_TIMESTAMP, DataType::Int64, false),
    ])
}

pub static RATINGS_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| Arc::new(ratings_schema()));

/// Every header as nullable text, used for the untyped first read of a CSV.
pub fn text_schema(headers: &Schema) -> Schema {
    Schema::new(
        headers
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synonym_targets_are_canonical() {
        // Only the chained `Release Date` may appear on both sides.
        let sources: HashSet<&str> = HEADER_SYNONYMS.iter().map(|(from, _)| *from).collect();
        let last_targets: Vec<&str> = HEADER_SYNONYMS
            .iter()
            .map(|(_, to)| *to)
            .filter(|to| sources.contains(to))
            .collect();
        assert_eq!(last_targets, vec!["Release Date"]);
    }

    #[test]
    fn test_output_names_unique() {
        let names: HashSet<&str> = MOVIE_COLUMNS.iter().map(|(_, out)| *out).collect();
        assert_eq!(names.len(), MOVIE_COLUMNS.len());
    }
}

pub mod input;
pub mod processor;
pub mod schema;
pub mod sources;
pub mod storage;
pub mod utils;

use arrow::datatypes::Schema;
use common::Result;
use common::config::Settings;
use processor::{ExportReport, MoviesProcessor, export_ratings};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{TableSink, WriteMode};
use tracing::info;

/// The three input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub wiki: PathBuf,
    pub metadata: PathBuf,
    pub ratings: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub movies_written: u64,
    pub ratings: ExportReport,
}

/// Runs the complete movies pipeline: builds the movie table, replaces the
/// movies table with it, then exports the ratings log in chunks.
pub async fn run_movies_pipeline(
    settings: &Settings,
    paths: &SourcePaths,
    sink: &dyn TableSink,
) -> Result<PipelineReport> {
    let processor = MoviesProcessor::new(settings)?;

    let movies = processor
        .build_movie_table(&paths.wiki, &paths.metadata, &paths.ratings)
        .await?;
    let schema = Arc::new(Schema::from(movies.schema()));
    let batches = movies.collect().await?;

    let movies_written = sink
        .write_table(&settings.tables.movies, schema, &batches, WriteMode::Replace)
        .await?;
    info!(table = %settings.tables.movies, rows = movies_written, "Movies table written");

    let ratings = export_ratings(
        &paths.ratings,
        sink,
        &settings.tables.ratings,
        &settings.ratings,
    )
    .await?;

    Ok(PipelineReport {
        movies_written,
        ratings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_pipeline_into_memory() {
        let dir = TempDir::new().unwrap();
        let wiki = write(
            &dir,
            "wiki.json",
            r#"[
              {"title": "No Director", "imdb_link": "https://www.imdb.com/title/tt0000001/"},
              {"title": "A Series", "Director": "X", "No. of episodes": "10",
               "imdb_link": "https://www.imdb.com/title/tt0000002/"},
              {"title": "Good Movie", "Director": "Jane", "url": "https://en.wikipedia.org/wiki/Good_Movie",
               "imdb_link": "https://www.imdb.com/title/tt0000003/",
               "Box office": "$200 million", "Budget": "$5 million",
               "Release date": ["January 1, 2010", "2010-01-01"], "Running time": "1 hour 40 min"}
            ]"#,
        );
        let metadata = write(
            &dir,
            "metadata.csv",
            "adult,belongs_to_collection,budget,genres,id,imdb_id,popularity,release_date,revenue,runtime,title,video,vote_average,vote_count\n\
             False,,0,[],30,tt0000003,1.5,2010-01-02,0,95,Good Movie,False,7.1,12\n\
             False,,10,[],40,tt0000099,2.0,2011-01-01,5,80,Other,False,6.0,3\n",
        );
        let ratings = write(
            &dir,
            "ratings.csv",
            "userId,movieId,rating,timestamp\n1,30,5.0,1425941529\n2,30,5.0,1425941530\n3,30,4.0,1425941531\n4,40,1.0,1425941532\n",
        );

        let mut settings = Settings::default();
        settings.wiki.min_column_coverage = 0.0;
        let sink = MemorySink::new();
        let paths = SourcePaths {
            wiki,
            metadata,
            ratings,
        };

        let report = run_movies_pipeline(&settings, &paths, &sink).await.unwrap();

        assert_eq!(report.movies_written, 1);
        assert_eq!(report.ratings.rows_written, 4);
        assert_eq!(sink.row_count("movies"), 1);
        assert_eq!(sink.row_count("ratings"), 4);

        let schema = sink.schema("movies").unwrap();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert!(names.contains(&"kaggle_id"));
        assert!(names.contains(&"rating_5.0"));
        assert!(names.contains(&"rating_1.0"));
        assert!(!names.contains(&"movieId"));
    }
}

//! Source Loader: the wiki JSON dump and the two CSV inputs.

use crate::processor::wiki::WikiRecord;
use crate::schema::{RATINGS_SCHEMA, text_schema};
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{Reader, ReaderBuilder};
use arrow::record_batch::RecordBatch;
use common::Result;
use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const CSV_BATCH_SIZE: usize = 65_536;

/// The JSON array of infobox records.
pub fn read_wiki_records(path: &Path) -> Result<Vec<WikiRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<WikiRecord> = serde_json::from_reader(reader)?;
    info!(path = %path.display(), records = records.len(), "Loaded wiki records");
    Ok(records)
}

/// Whole CSV as one batch of nullable text columns; typing happens later.
/// Rows with missing trailing fields are padded with nulls.
pub fn read_text_csv(path: &Path) -> Result<RecordBatch> {
    let mut file = File::open(path)?;
    let (headers, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1))?;
    file.rewind()?;

    let schema = Arc::new(text_schema(&headers));
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_truncated_rows(true)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    info!(path = %path.display(), rows = batch.num_rows(), columns = batch.num_columns(), "Loaded CSV");
    Ok(batch)
}

/// Ratings CSV with its fixed schema, in one pass.
pub fn read_ratings(path: &Path) -> Result<Vec<RecordBatch>> {
    let batches = ratings_chunks(path, CSV_BATCH_SIZE)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    info!(path = %path.display(), rows, "Loaded ratings");
    Ok(batches)
}

/// Sequential reader yielding `chunk_size` ratings per batch (the last one
/// may be shorter).
pub fn ratings_chunks(path: &Path, chunk_size: usize) -> Result<Reader<File>> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new(RATINGS_SCHEMA.clone())
        .with_header(true)
        .with_batch_size(chunk_size)
        .build(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_wiki_records() {
        let file = temp_file(r#"[{"title": "A", "Director": "X"}, {"title": "B", "Starring": ["P", "Q"]}]"#);
        let records = read_wiki_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["Starring"][1], "Q");
    }

    #[test]
    fn test_read_text_csv_keeps_everything_as_text() {
        let file = temp_file("id,budget,overview\n1,0,\"Two lines,\nwith comma\"\n2,,plain\n");
        let batch = read_text_csv(file.path()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).as_string::<i32>().value(0), "1");
        assert_eq!(batch.column(2).as_string::<i32>().value(0), "Two lines,\nwith comma");
        let budget = batch.column(1).as_string::<i32>();
        assert!(budget.is_null(1) || budget.value(1).is_empty());
    }

    #[test]
    fn test_read_text_csv_pads_short_rows() {
        let file = temp_file(
            "adult,budget,id,imdb_id,title\n\
             False,0,1,tt0000001,One\n\
             \x20- Written by X,/a.jpg,0\n\
             False,0,2,tt0000002,Two\n",
        );
        let batch = read_text_csv(file.path()).unwrap();

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.column(0).as_string::<i32>().value(1), " - Written by X");
        assert!(batch.column(3).is_null(1));
        assert!(batch.column(4).is_null(1));
        assert_eq!(batch.column(4).as_string::<i32>().value(2), "Two");
    }

    #[test]
    fn test_ratings_chunks_are_sized() {
        let mut csv = String::from("userId,movieId,rating,timestamp\n");
        for i in 0..7 {
            csv.push_str(&format!("{},{},4.5,1425941529\n", i, 10 + i));
        }
        let file = temp_file(&csv);
        let sizes: Vec<usize> = ratings_chunks(file.path(), 3)
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_wiki_records(Path::new("/nonexistent/wiki.json")).is_err());
    }
}

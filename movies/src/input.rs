//! Interactive prompt for the three input paths.

use crate::SourcePaths;
use common::{Error, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub const DEFAULT_WIKI_PATH: &str = "Data/wikipedia.movies.json";
pub const DEFAULT_METADATA_PATH: &str = "Data/movies_metadata.csv";
pub const DEFAULT_RATINGS_PATH: &str = "Data/ratings.csv";

/// Paths from the command line: all three are confirmed before use (a `no`
/// falls back to prompting), none means prompt, anything else is an error.
pub fn resolve_paths<R: BufRead, W: Write>(
    given: [Option<String>; 3],
    input: &mut R,
    output: &mut W,
) -> Result<SourcePaths> {
    match given {
        [Some(wiki), Some(metadata), Some(ratings)] => {
            let paths = SourcePaths {
                wiki: PathBuf::from(wiki),
                metadata: PathBuf::from(metadata),
                ratings: PathBuf::from(ratings),
            };
            if confirm(input, output, &paths)? {
                Ok(paths)
            } else {
                prompt_for_paths(input, output)
            }
        }
        [None, None, None] => prompt_for_paths(input, output),
        _ => Err(Error::InvalidInput(
            "give all three input files or none of them".into(),
        )),
    }
}

/// Asks for each path (an empty answer takes the default), echoes the
/// choice and asks for confirmation; anything but `yes` starts over.
pub fn prompt_for_paths<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<SourcePaths> {
    loop {
        let paths = SourcePaths {
            wiki: ask(input, output, "Wikipedia movies JSON", DEFAULT_WIKI_PATH)?,
            metadata: ask(input, output, "Kaggle metadata CSV", DEFAULT_METADATA_PATH)?,
            ratings: ask(input, output, "MovieLens ratings CSV", DEFAULT_RATINGS_PATH)?,
        };
        if confirm(input, output, &paths)? {
            return Ok(paths);
        }
    }
}

fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, paths: &SourcePaths) -> Result<bool> {
    writeln!(output, "wiki:     {}", paths.wiki.display())?;
    writeln!(output, "metadata: {}", paths.metadata.display())?;
    writeln!(output, "ratings:  {}", paths.ratings.display())?;
    write!(output, "all filenames are right? (yes/no) ")?;
    output.flush()?;
    Ok(read_answer(input)?.eq_ignore_ascii_case("yes"))
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: &str,
) -> Result<PathBuf> {
    write!(output, "{} [{}]: ", label, default)?;
    output.flush()?;
    let answer = read_answer(input)?;
    Ok(PathBuf::from(if answer.is_empty() { default } else { answer.as_str() }))
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::InvalidInput("input closed before paths were confirmed".into()));
    }
    Ok(line.trim().to_string())
}

//! Persisted word lists: one word per line, 4 lowercase hex digits,
//! block-major then offset-minor, one file per region.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::{debug, warn};

use crate::memctl::{
    error::{MemctlError, Result},
    types::Word,
};

/// Words recovered from a persisted list, padded to the region size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    /// Exactly as many words as were requested.
    pub words: Vec<Word>,
    /// Words missing from the file and filled with `0000`.
    pub defaulted: usize,
    /// Lines past the end of the region that were ignored.
    pub ignored: usize,
}

/// Parses a word list, padding or truncating it to `capacity` words.
///
/// Trailing blank lines are ignored; any other line that is not a word is
/// an error naming `path` and the 1-based line number.
pub fn read_word_list<R: BufRead>(reader: R, capacity: usize, path: &Path) -> Result<WordList> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line.map_err(|source| MemctlError::Persist {
            path: path.to_path_buf(),
            source,
        })?);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let mut words = Vec::with_capacity(capacity);
    for (idx, line) in lines.iter().take(capacity).enumerate() {
        let word = line
            .trim()
            .parse::<Word>()
            .map_err(|reason| MemctlError::Shadow {
                path: path.to_path_buf(),
                line: idx + 1,
                reason,
            })?;
        words.push(word);
    }

    let defaulted = capacity - words.len();
    let ignored = lines.len().saturating_sub(capacity);
    words.resize(capacity, Word::ZERO);

    Ok(WordList {
        words,
        defaulted,
        ignored,
    })
}

/// Writes one word per line.
pub fn write_word_list<W: Write>(mut writer: W, words: &[Word]) -> io::Result<()> {
    for word in words {
        writeln!(writer, "{word}")?;
    }
    writer.flush()
}

/// Loads a region's word list from `path`.
///
/// The file is advisory: a missing file or a short one leaves the rest of
/// the region at `0000` and is reported as a warning, not an error.
pub fn load_file(path: &Path, capacity: usize) -> Result<WordList> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "shadow file not found, defaulting to 0000");
            return Ok(WordList {
                words: vec![Word::ZERO; capacity],
                defaulted: capacity,
                ignored: 0,
            });
        }
        Err(source) => {
            return Err(MemctlError::Persist {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let list = read_word_list(BufReader::new(file), capacity, path)?;
    if list.defaulted > 0 {
        warn!(
            path = %path.display(),
            defaulted = list.defaulted,
            "shadow file shorter than region, defaulting remaining words to 0000"
        );
    }
    if list.ignored > 0 {
        debug!(path = %path.display(), ignored = list.ignored, "ignoring extra shadow lines");
    }
    Ok(list)
}

/// Saves `words` to `path`, replacing any existing file.
pub fn save_file(path: &Path, words: &[Word]) -> Result<()> {
    let to_err = |source| MemctlError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_err)?;
    write_word_list(BufWriter::new(file), words).map_err(to_err)
}

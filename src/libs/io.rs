use crate::libs::error::{Error, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for buffered reading. `stdin` reads standard input, paths
/// ending in `.gz` are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let reader = hitgff::reader("tests/blast/exons.tsv").unwrap();
/// assert_eq!(reader.lines().count(), 7);
///
/// let missing = hitgff::reader("tests/blast/not_there.tsv");
/// assert!(missing.is_err());
/// ```
pub fn reader(input: &str) -> Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = match std::fs::File::open(path) {
            Err(why) if why.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    path: path.display().to_string(),
                })
            }
            Err(why) => return Err(Error::Io(why)),
            Ok(file) => file,
        };

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        Box::new(BufWriter::new(std::fs::File::create(output)?))
    };

    Ok(writer)
}

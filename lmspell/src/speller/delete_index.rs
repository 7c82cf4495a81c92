//! Pair of bloom filters over deletion variants of the vocabulary.
//!
//! `deletes1` holds every vocabulary word and each of its one-character
//! deletions. `deletes2` additionally holds the two-character deletions.
//! Both are cheap pre-filters for candidate generation; anything they accept
//! is still checked against the vocabulary before it is suggested.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::candidates::for_each_deletion;
use super::error::SpellerError;
use crate::binary::{to_bytes, BinaryFormat};
use crate::bloom::BloomFilter;
use crate::constants::{
    CACHE_EXTENSION, CACHE_HEADER_SIZE, CACHE_MAGIC, CACHE_VERSION,
    DELETES1_FALSE_POSITIVE_RATE, DELETES2_FALSE_POSITIVE_RATE,
};
use crate::model::LangModel;

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteIndex {
    deletes1: BloomFilter,
    deletes2: BloomFilter,
    model_checksum: u32,
}

/// `<model path>.spell`
pub fn cache_path<P: AsRef<Path>>(model_path: P) -> PathBuf {
    let mut path = OsString::from(model_path.as_ref().as_os_str());
    path.push(".");
    path.push(CACHE_EXTENSION);
    PathBuf::from(path)
}

fn decode_error(err: io::Error) -> SpellerError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
            SpellerError::InvalidCache(err.to_string())
        }
        _ => SpellerError::Io(err),
    }
}

impl DeleteIndex {
    pub fn build(model: &LangModel) -> DeleteIndex {
        let vocabulary = model.vocabulary();

        let (mut expected1, mut expected2) = (0usize, 0usize);
        for (_, word) in vocabulary.iter() {
            let n = word.chars().count();
            expected1 += 1 + n;
            expected2 += 1 + n + n * n.saturating_sub(1) / 2;
        }

        let mut deletes1 = BloomFilter::new(expected1, DELETES1_FALSE_POSITIVE_RATE);
        let mut deletes2 = BloomFilter::new(expected2, DELETES2_FALSE_POSITIVE_RATE);

        for (_, word) in vocabulary.iter() {
            deletes1.insert(word.as_bytes());
            deletes2.insert(word.as_bytes());
            for_each_deletion(word, |once| {
                deletes1.insert(once.as_bytes());
                deletes2.insert(once.as_bytes());
                for_each_deletion(once, |twice| deletes2.insert(twice.as_bytes()));
            });
        }

        log::debug!(
            "built delete index: {} bits / {} hashes for deletes1, {} bits / {} hashes for deletes2",
            deletes1.num_bits(),
            deletes1.num_hashes(),
            deletes2.num_bits(),
            deletes2.num_hashes()
        );

        DeleteIndex {
            deletes1,
            deletes2,
            model_checksum: model.checksum(),
        }
    }

    /// Whether `s` may be a vocabulary word or one of its 1-deletions.
    #[inline(always)]
    pub fn contains1(&self, s: &str) -> bool {
        self.deletes1.contains(s.as_bytes())
    }

    /// Whether `s` may be a vocabulary word or one of its 1- or 2-deletions.
    #[inline(always)]
    pub fn contains2(&self, s: &str) -> bool {
        self.deletes2.contains(s.as_bytes())
    }

    #[inline(always)]
    pub fn model_checksum(&self) -> u32 {
        self.model_checksum
    }

    /// Writes the index to `path`, replacing any existing file atomically.
    ///
    /// The file is the cache header, the encoded index and a crc32 of the
    /// encoded index.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SpellerError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let payload = to_bytes(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            out.write_u64::<LittleEndian>(CACHE_MAGIC)?;
            out.write_u32::<LittleEndian>(CACHE_VERSION)?;
            out.write_all(&payload)?;
            out.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
            out.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        log::debug!("saved delete index to {}", path.display());
        Ok(())
    }

    /// Reads an index saved by [`DeleteIndex::save`], rejecting it unless it
    /// is intact and was built for the model with `expected_checksum`.
    pub fn load<P: AsRef<Path>>(
        path: P,
        expected_checksum: u32,
    ) -> Result<DeleteIndex, SpellerError> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.len() < CACHE_HEADER_SIZE + 4 {
            return Err(SpellerError::InvalidCache(format!(
                "{} bytes is too short for a cache file",
                bytes.len()
            )));
        }

        let mut header = Cursor::new(&bytes[..CACHE_HEADER_SIZE]);
        let magic = header.read_u64::<LittleEndian>().map_err(decode_error)?;
        if magic != CACHE_MAGIC {
            return Err(SpellerError::InvalidCache(format!("bad magic {:#018x}", magic)));
        }
        let version = header.read_u32::<LittleEndian>().map_err(decode_error)?;
        if version != CACHE_VERSION {
            return Err(SpellerError::InvalidCache(format!(
                "unsupported version {}",
                version
            )));
        }

        let (payload, stored) = bytes.split_at(bytes.len() - 4);
        let payload = &payload[CACHE_HEADER_SIZE..];
        let stored = Cursor::new(stored)
            .read_u32::<LittleEndian>()
            .map_err(decode_error)?;
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(SpellerError::InvalidCache(format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            )));
        }

        let mut input = Cursor::new(payload);
        let index = DeleteIndex::read_from(&mut input).map_err(decode_error)?;
        if input.position() as usize != payload.len() {
            return Err(SpellerError::InvalidCache("trailing bytes".into()));
        }
        if index.model_checksum != expected_checksum {
            return Err(SpellerError::StaleCache {
                expected: expected_checksum,
                found: index.model_checksum,
            });
        }

        Ok(index)
    }

    /// Loads the cache at `path` if it matches `model`, otherwise rebuilds
    /// the index and tries to save it back.
    pub fn load_or_build<P: AsRef<Path>>(path: P, model: &LangModel) -> DeleteIndex {
        let path = path.as_ref();
        match DeleteIndex::load(path, model.checksum()) {
            Ok(index) => {
                log::info!("using delete index cache {}", path.display());
                return index;
            }
            Err(SpellerError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no delete index cache at {}, building", path.display());
            }
            Err(e) => {
                log::warn!("ignoring delete index cache {}: {}", path.display(), e);
            }
        }

        let index = DeleteIndex::build(model);
        if let Err(e) = index.save(path) {
            log::warn!("could not save delete index cache {}: {}", path.display(), e);
        }
        index
    }
}

impl BinaryFormat for DeleteIndex {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.model_checksum.write_to(out)?;
        self.deletes1.write_to(out)?;
        self.deletes2.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let model_checksum = u32::read_from(input)?;
        let deletes1 = BloomFilter::read_from(input)?;
        let deletes2 = BloomFilter::read_from(input)?;
        Ok(DeleteIndex {
            deletes1,
            deletes2,
            model_checksum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn model() -> LangModel {
        let mut model = LangModel::default();
        model
            .train_text(
                "the quick brown fox jumps over the lazy dog. spelling matters.",
                "abcdefghijklmnopqrstuvwxyz",
            )
            .unwrap();
        model
    }

    #[test]
    fn every_true_deletion_is_present() {
        let model = model();
        let index = DeleteIndex::build(&model);

        for (_, word) in model.vocabulary().iter() {
            assert!(index.contains1(word));
            assert!(index.contains2(word));
            for_each_deletion(word, |once| {
                assert!(index.contains1(once), "{:?} missing from deletes1", once);
                assert!(index.contains2(once), "{:?} missing from deletes2", once);
                for_each_deletion(once, |twice| {
                    assert!(index.contains2(twice), "{:?} missing from deletes2", twice);
                });
            });
        }
    }

    #[test]
    fn cache_path_appends_extension() {
        assert_eq!(
            cache_path("models/en.bin"),
            PathBuf::from("models/en.bin.spell")
        );
    }

    #[test]
    fn saved_index_loads_back() {
        let model = model();
        let index = DeleteIndex::build(&model);
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.bin.spell");

        index.save(&path).unwrap();
        let loaded = DeleteIndex::load(&path, model.checksum()).unwrap();

        assert_eq!(loaded, index);
    }

    #[test]
    fn cache_for_other_model_is_stale() {
        let model = model();
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.bin.spell");
        DeleteIndex::build(&model).save(&path).unwrap();

        let err = DeleteIndex::load(&path, model.checksum() ^ 1).unwrap_err();
        assert!(matches!(err, SpellerError::StaleCache { .. }));
    }

    #[test]
    fn garbage_cache_is_rebuilt() {
        let model = model();
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.bin.spell");
        std::fs::write(&path, b"not a cache").unwrap();

        assert!(matches!(
            DeleteIndex::load(&path, model.checksum()),
            Err(SpellerError::InvalidCache(_))
        ));

        let index = DeleteIndex::load_or_build(&path, &model);
        assert_eq!(index, DeleteIndex::build(&model));
        assert!(DeleteIndex::load(&path, model.checksum()).is_ok());
    }

    #[test]
    fn damaged_filter_bits_are_rejected() {
        let model = model();
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.bin.spell");
        let index = DeleteIndex::build(&model);
        index.save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            DeleteIndex::load(&path, model.checksum()),
            Err(SpellerError::InvalidCache(_))
        ));
        assert_eq!(DeleteIndex::load_or_build(&path, &model), index);
        assert_eq!(DeleteIndex::load(&path, model.checksum()).unwrap(), index);
    }

    #[test]
    fn oversized_bit_count_is_rejected() {
        let model = model();
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.bin.spell");
        DeleteIndex::build(&model).save(&path).unwrap();

        // Header, then the model checksum, then deletes1's bit count.
        let mut bytes = std::fs::read(&path).unwrap();
        let at = CACHE_HEADER_SIZE + 4;
        bytes[at..at + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        let end = bytes.len() - 4;
        let crc = crc32fast::hash(&bytes[CACHE_HEADER_SIZE..end]);
        bytes[end..].copy_from_slice(&crc.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            DeleteIndex::load(&path, model.checksum()),
            Err(SpellerError::InvalidCache(_))
        ));
        assert_eq!(DeleteIndex::load_or_build(&path, &model), DeleteIndex::build(&model));
    }
}

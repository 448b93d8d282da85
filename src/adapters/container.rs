//! File-backed document container using the PDF `ByteRange` convention.
//!
//! The placeholder is a hex string `<00…00>` inserted at a chosen offset.
//! Everything outside the angle brackets is signed; the final CMS structure is
//! hex-encoded into the brackets and the rest of the space stays `0`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::collaborators::DocumentContainer;
use crate::domain::pkcs7::FinalizedSignature;
use crate::infra::error::{SigningError, SigningResult};

/// Location of a reserved placeholder inside the prepared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderHandle {
    /// Offset of the opening `<`.
    pub offset: usize,
    /// Reserved signature size in bytes (the hex text is twice as long).
    pub size: usize,
    /// Total length of the prepared document.
    pub document_len: usize,
}

impl PlaceholderHandle {
    /// Offset just past the closing `>`.
    ///
    /// Handles come back from state files, so the arithmetic is checked.
    pub fn end(&self) -> SigningResult<usize> {
        self.size
            .checked_mul(2)
            .and_then(|hex_len| hex_len.checked_add(2))
            .and_then(|len| self.offset.checked_add(len))
            .ok_or_else(|| SigningError::ContainerError(format!("placeholder {self:?} overflows")))
    }

    /// `[start1, len1, start2, len2]` as written into a PDF `/ByteRange`.
    pub fn byte_range(&self) -> SigningResult<[usize; 4]> {
        let end = self.end()?;
        let tail = self.document_len.checked_sub(end).ok_or_else(|| {
            SigningError::ContainerError(format!(
                "placeholder {self:?} ends past the document"
            ))
        })?;
        Ok([0, self.offset, end, tail])
    }
}

/// Document held in memory, written out atomically on completion.
pub struct ByteRangeContainer {
    data: Vec<u8>,
    insert_at: usize,
    output: PathBuf,
    reserved: Option<PlaceholderHandle>,
}

impl ByteRangeContainer {
    /// Load `input`; the placeholder will be inserted at `insert_at`.
    pub fn open(input: &Path, insert_at: usize, output: &Path) -> SigningResult<Self> {
        let data = std::fs::read(input).map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", input.display()))
        })?;
        Self::from_bytes(data, insert_at, output)
    }

    pub fn from_bytes(data: Vec<u8>, insert_at: usize, output: &Path) -> SigningResult<Self> {
        if insert_at > data.len() {
            return Err(SigningError::InvalidInput(format!(
                "placeholder offset {insert_at} is past the end of the document ({} bytes)",
                data.len()
            )));
        }
        Ok(Self {
            data,
            insert_at,
            output: output.to_path_buf(),
            reserved: None,
        })
    }

    /// Reopen a document prepared by an earlier process.
    pub fn resume(prepared: &Path, handle: PlaceholderHandle, output: &Path) -> SigningResult<Self> {
        let data = std::fs::read(prepared).map_err(|e| {
            SigningError::IoError(format!("Failed to read {}: {e}", prepared.display()))
        })?;
        Self::check_handle(&data, &handle)?;
        Ok(Self {
            data,
            insert_at: handle.offset,
            output: output.to_path_buf(),
            reserved: Some(handle),
        })
    }

    /// Sibling of `input` used when no output is given: `contract.pdf`
    /// becomes `contract.signed.pdf`, so the source is never overwritten.
    #[must_use]
    pub fn default_output_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "document".into(), |s| s.to_string_lossy().into_owned());
        let name = match input.extension() {
            Some(ext) => format!("{stem}.signed.{}", ext.to_string_lossy()),
            None => format!("{stem}.signed"),
        };
        input.with_file_name(name)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Persist the document with its empty placeholder.
    pub fn write_prepared(&self, path: &Path) -> SigningResult<()> {
        if self.reserved.is_none() {
            return Err(SigningError::ContainerError(
                "no placeholder has been reserved".into(),
            ));
        }
        write_atomic(path, &self.data)
    }

    /// Validate `handle` against `data` and return the placeholder's end.
    fn check_handle(data: &[u8], handle: &PlaceholderHandle) -> SigningResult<usize> {
        let end = handle.end()?;
        if handle.size == 0 || data.len() != handle.document_len || end > data.len() {
            return Err(SigningError::ContainerError(format!(
                "document length {} does not match placeholder {handle:?}",
                data.len()
            )));
        }
        let placeholder = &data[handle.offset..end];
        let well_formed = placeholder.first() == Some(&b'<')
            && placeholder.last() == Some(&b'>')
            && placeholder[1..placeholder.len() - 1]
                .iter()
                .all(u8::is_ascii_hexdigit);
        if !well_formed {
            return Err(SigningError::ContainerError(format!(
                "no placeholder at offset {}",
                handle.offset
            )));
        }
        Ok(end)
    }
}

impl DocumentContainer for ByteRangeContainer {
    type Handle = PlaceholderHandle;

    fn reserve_signature_placeholder(&mut self, size: usize) -> SigningResult<PlaceholderHandle> {
        if self.reserved.is_some() {
            return Err(SigningError::ContainerError(
                "placeholder already reserved".into(),
            ));
        }
        if size == 0 {
            return Err(SigningError::InvalidInput("placeholder size must be positive".into()));
        }
        let mut placeholder = Vec::with_capacity(2 * size + 2);
        placeholder.push(b'<');
        placeholder.resize(2 * size + 1, b'0');
        placeholder.push(b'>');
        let tail = self.data.split_off(self.insert_at);
        self.data.extend_from_slice(&placeholder);
        self.data.extend_from_slice(&tail);

        let handle = PlaceholderHandle {
            offset: self.insert_at,
            size,
            document_len: self.data.len(),
        };
        log::debug!("placeholder reserved: ByteRange {:?}", handle.byte_range()?);
        self.reserved = Some(handle);
        Ok(handle)
    }

    fn read_signable_bytes(&self, handle: &PlaceholderHandle) -> SigningResult<Box<dyn Read + '_>> {
        let end = Self::check_handle(&self.data, handle)?;
        let head = &self.data[..handle.offset];
        let tail = &self.data[end..];
        Ok(Box::new(head.chain(tail)))
    }

    fn write_final_signature(
        &mut self,
        handle: PlaceholderHandle,
        signature: &FinalizedSignature,
    ) -> SigningResult<()> {
        let end = Self::check_handle(&self.data, &handle)?;
        if signature.len() > handle.size {
            return Err(SigningError::CapacityExceeded {
                required: signature.len(),
                reserved: handle.size,
            });
        }
        let encoded = hex::encode_upper(signature.as_der());
        let start = handle.offset + 1;
        let mut document = self.data.clone();
        document[start..start + encoded.len()].copy_from_slice(encoded.as_bytes());
        document[start + encoded.len()..end - 1].fill(b'0');

        write_atomic(&self.output, &document)?;
        self.data = document;
        log::info!(
            "signature written to {} ({} of {} bytes used)",
            self.output.display(),
            signature.len(),
            handle.size
        );
        Ok(())
    }
}

/// Write through a temp file in the target directory, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> SigningResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| {
        SigningError::IoError(format!("Failed to write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(dir: &Path) -> ByteRangeContainer {
        ByteRangeContainer::from_bytes(b"HEADER|TRAILER".to_vec(), 7, &dir.join("out.bin")).unwrap()
    }

    #[test]
    fn test_reserve_and_signable_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(dir.path());
        let handle = c.reserve_signature_placeholder(4).unwrap();

        assert_eq!(c.as_bytes(), b"HEADER|<00000000>TRAILER");
        assert_eq!(handle.byte_range().unwrap(), [0, 7, 17, 7]);

        let mut signable = Vec::new();
        c.read_signable_bytes(&handle).unwrap().read_to_end(&mut signable).unwrap();
        assert_eq!(signable, b"HEADER|TRAILER");

        assert!(c.reserve_signature_placeholder(4).is_err());
    }

    #[test]
    fn test_write_pads_and_keeps_length() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(dir.path());
        let handle = c.reserve_signature_placeholder(4).unwrap();
        c.write_final_signature(handle, &FinalizedSignature::from_der(vec![0xab, 0x01]))
            .unwrap();

        let written = std::fs::read(dir.path().join("out.bin")).unwrap();
        assert_eq!(written, b"HEADER|<AB010000>TRAILER");
        assert_eq!(written.len(), handle.document_len);
    }

    #[test]
    fn test_oversized_signature_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(dir.path());
        let handle = c.reserve_signature_placeholder(2).unwrap();
        let err = c
            .write_final_signature(handle, &FinalizedSignature::from_der(vec![1, 2, 3]))
            .unwrap_err();

        assert!(matches!(
            err,
            SigningError::CapacityExceeded { required: 3, reserved: 2 }
        ));
        assert!(!dir.path().join("out.bin").exists());
    }

    #[test]
    fn test_resume_checks_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = dir.path().join("prepared.bin");
        let mut c = container(dir.path());
        let handle = c.reserve_signature_placeholder(3).unwrap();
        c.write_prepared(&prepared).unwrap();

        let resumed = ByteRangeContainer::resume(&prepared, handle, &dir.path().join("o")).unwrap();
        assert_eq!(resumed.as_bytes(), c.as_bytes());

        let shifted = PlaceholderHandle { offset: 2, ..handle };
        assert!(ByteRangeContainer::resume(&prepared, shifted, &dir.path().join("o")).is_err());
    }

    #[test]
    fn test_offset_past_end_rejected() {
        assert!(ByteRangeContainer::from_bytes(vec![0; 3], 4, Path::new("x")).is_err());
    }

    #[test]
    fn test_crafted_handle_is_rejected_without_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = dir.path().join("prepared.bin");
        let mut c = container(dir.path());
        let handle = c.reserve_signature_placeholder(3).unwrap();
        c.write_prepared(&prepared).unwrap();

        let huge = PlaceholderHandle {
            size: usize::MAX / 2 + 1,
            ..handle
        };
        assert!(matches!(huge.end(), Err(SigningError::ContainerError(_))));
        assert!(huge.byte_range().is_err());
        assert!(ByteRangeContainer::resume(&prepared, huge, &dir.path().join("o")).is_err());

        let far = PlaceholderHandle {
            offset: usize::MAX - 1,
            ..handle
        };
        assert!(far.end().is_err());

        let short = PlaceholderHandle {
            document_len: 3,
            ..handle
        };
        assert!(short.byte_range().is_err());
        assert!(c.read_signable_bytes(&short).is_err());
    }

    #[test]
    fn test_default_output_is_a_sibling() {
        assert_eq!(
            ByteRangeContainer::default_output_path(Path::new("/docs/contract.pdf")),
            PathBuf::from("/docs/contract.signed.pdf")
        );
        assert_eq!(
            ByteRangeContainer::default_output_path(Path::new("notes")),
            PathBuf::from("notes.signed")
        );
    }
}

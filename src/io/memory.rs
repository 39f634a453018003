//! A [`DecodingEngine`] serving files that live entirely in memory.
//!
//! Useful for exercising a reading session without the native decoding
//! library, and for injecting engine failures at a chosen step.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use super::engine::{DecodingEngine, EngineOperation, ErrorCode, FileHandle};
use crate::meta::{
    Attributes, Binaries, Experiment, FileMetadata, LocalMetadata, MetadataDesc, TextInfo,
};
use crate::picture::PictureLayout;

/// The contents of one in-memory file
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    pub metadata: FileMetadata,
    /// Raw frame bytes and their per-sequence readout, by sequence index
    pub frames: Vec<(Vec<u8>, LocalMetadata)>,
    /// Fail this operation with this code instead of serving it
    pub failure: Option<(EngineOperation, ErrorCode)>,
}

impl MemoryFile {
    pub fn new(metadata: FileMetadata) -> Self {
        Self {
            metadata,
            frames: Vec::new(),
            failure: None,
        }
    }

    pub fn with_frame(mut self, data: Vec<u8>, local: LocalMetadata) -> Self {
        self.frames.push((data, local));
        self
    }

    pub fn failing(mut self, operation: EngineOperation, code: ErrorCode) -> Self {
        self.failure = Some((operation, code));
        self
    }

    fn check(&self, operation: EngineOperation) -> Result<(), ErrorCode> {
        match self.failure {
            Some((op, code)) if op == operation => Err(code),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    files: HashMap<PathBuf, MemoryFile>,
    handles: HashMap<FileHandle, PathBuf>,
    next_handle: i32,
    picture: Option<PictureLayout>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `file` available for opening at `path`
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, file: MemoryFile) {
        self.files.insert(path.into(), file);
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, path: P, file: MemoryFile) -> Self {
        self.insert(path, file);
        self
    }

    /// The number of handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Whether a picture buffer is initialized and not yet destroyed
    pub fn has_picture(&self) -> bool {
        self.picture.is_some()
    }

    fn file(&self, handle: FileHandle) -> Result<&MemoryFile, ErrorCode> {
        self.handles
            .get(&handle)
            .and_then(|path| self.files.get(path))
            .ok_or(ErrorCode::Handle)
    }

    fn fetch<T>(
        &self,
        handle: FileHandle,
        operation: EngineOperation,
        f: impl FnOnce(&FileMetadata) -> T,
    ) -> Result<T, ErrorCode> {
        let file = self.file(handle)?;
        file.check(operation)?;
        Ok(f(&file.metadata))
    }
}

impl DecodingEngine for MemoryEngine {
    fn open_file(&mut self, path: &Path) -> Option<FileHandle> {
        let file = self.files.get(path)?;
        if file.check(EngineOperation::OpenFile).is_err() {
            // The native engine reports a null handle rather than an error code
            return Some(FileHandle(0));
        }
        self.next_handle += 1;
        let handle = FileHandle(self.next_handle);
        debug!("Opened in-memory file {} as {handle}", path.display());
        self.handles.insert(handle, path.to_path_buf());
        Some(handle)
    }

    /// The handle is released even when a failure is injected
    fn close_file(&mut self, handle: FileHandle) -> Result<(), ErrorCode> {
        let failure = self.file(handle)?.check(EngineOperation::CloseFile);
        self.handles.remove(&handle);
        failure
    }

    fn attributes(&mut self, handle: FileHandle) -> Result<Attributes, ErrorCode> {
        self.fetch(handle, EngineOperation::GetAttributes, |m| m.attributes)
    }

    fn text_info(&mut self, handle: FileHandle) -> Result<TextInfo, ErrorCode> {
        self.fetch(handle, EngineOperation::GetTextInfo, |m| {
            m.text_info.clone()
        })
    }

    fn metadata_desc(&mut self, handle: FileHandle) -> Result<MetadataDesc, ErrorCode> {
        self.fetch(handle, EngineOperation::GetMetadata, |m| {
            m.description.clone()
        })
    }

    fn experiment(&mut self, handle: FileHandle) -> Result<Experiment, ErrorCode> {
        self.fetch(handle, EngineOperation::GetExperiment, |m| {
            m.experiment.clone()
        })
    }

    fn binary_descriptors(&mut self, handle: FileHandle) -> Result<Binaries, ErrorCode> {
        self.fetch(handle, EngineOperation::GetBinaryDescriptors, |m| {
            m.binaries.clone()
        })
    }

    fn init_picture(
        &mut self,
        width: u32,
        height: u32,
        bits_per_component: u32,
        components: u32,
    ) -> Result<PictureLayout, ErrorCode> {
        let failed = self
            .handles
            .values()
            .filter_map(|path| self.files.get(path))
            .find_map(|file| file.check(EngineOperation::InitPicture).err());
        if let Some(code) = failed {
            return Err(code);
        }
        let layout = PictureLayout::new(width, height, bits_per_component, components);
        self.picture = Some(layout);
        Ok(layout)
    }

    fn destroy_picture(&mut self) {
        self.picture = None;
    }

    fn image_data(
        &mut self,
        handle: FileHandle,
        seq_index: u32,
        buffer: &mut [u8],
    ) -> Result<LocalMetadata, ErrorCode> {
        if self.picture.is_none() {
            return Err(ErrorCode::NotInitialized);
        }
        let file = self.file(handle)?;
        file.check(EngineOperation::GetImageData)?;
        let (data, local) = file
            .frames
            .get(seq_index as usize)
            .ok_or(ErrorCode::OutOfRange)?;
        let n = data.len().min(buffer.len());
        buffer[..n].copy_from_slice(&data[..n]);
        Ok(*local)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn test_handles_and_failures() {
        let mut engine = MemoryEngine::new()
            .with_file("a.nd2", MemoryFile::default())
            .with_file(
                "b.nd2",
                MemoryFile::default().failing(EngineOperation::GetExperiment, ErrorCode::Fail),
            );
        assert!(engine.open_file(Path::new("missing.nd2")).is_none());

        let a = engine.open_file(Path::new("a.nd2")).unwrap();
        let b = engine.open_file(Path::new("b.nd2")).unwrap();
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert_eq!(engine.open_handles(), 2);

        assert!(engine.experiment(a).is_ok());
        assert_eq!(engine.experiment(b), Err(ErrorCode::Fail));

        engine.close_file(a).unwrap();
        assert_eq!(engine.close_file(a), Err(ErrorCode::Handle));
        assert_eq!(engine.open_handles(), 1);
    }

    #[test_log::test]
    fn test_injected_open_and_close_failures() {
        let mut engine = MemoryEngine::new()
            .with_file(
                "null.nd2",
                MemoryFile::default().failing(EngineOperation::OpenFile, ErrorCode::Fail),
            )
            .with_file(
                "stuck.nd2",
                MemoryFile::default().failing(EngineOperation::CloseFile, ErrorCode::AccessDenied),
            );
        let null = engine.open_file(Path::new("null.nd2")).unwrap();
        assert!(!null.is_valid());
        assert_eq!(engine.open_handles(), 0);

        let stuck = engine.open_file(Path::new("stuck.nd2")).unwrap();
        assert_eq!(engine.close_file(stuck), Err(ErrorCode::AccessDenied));
        assert_eq!(engine.open_handles(), 0);
        assert_eq!(engine.close_file(stuck), Err(ErrorCode::Handle));
    }

    #[test_log::test]
    fn test_image_data_requires_picture() {
        let file = MemoryFile::default().with_frame(vec![1, 2, 3, 4], LocalMetadata::default());
        let mut engine = MemoryEngine::new().with_file("a.nd2", file);
        let handle = engine.open_file(Path::new("a.nd2")).unwrap();
        let mut buffer = vec![0u8; 4];
        assert_eq!(
            engine.image_data(handle, 0, &mut buffer),
            Err(ErrorCode::NotInitialized)
        );
        engine.init_picture(1, 1, 8, 4).unwrap();
        engine.image_data(handle, 0, &mut buffer).unwrap();
        assert_eq!(buffer, [1, 2, 3, 4]);
        assert_eq!(
            engine.image_data(handle, 1, &mut buffer),
            Err(ErrorCode::OutOfRange)
        );
    }
}

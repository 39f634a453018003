use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use super::engine::{DecodingEngine, EngineOperation, ErrorCode, FileHandle};
use crate::coordinate::{CoordinateMapper, ExperimentCoordinates, OutOfRangeError};
use crate::meta::{flatten_metadata, Dimensions, FileMetadata, LocalMetadata};
use crate::params::MetadataMap;
use crate::picture::{Picture, PictureError, PictureLayout, PictureView};

/// Errors that may occur while opening or reading a file
#[derive(Debug, Error)]
pub enum Nd2Error {
    #[error("Cannot open {}", path.display())]
    FileOpen { path: PathBuf },
    #[error("The decoding engine failed to {operation}: {code}")]
    Engine {
        operation: EngineOperation,
        #[source]
        code: ErrorCode,
    },
    #[error("A file has not been opened yet")]
    NotInitialized,
    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
    #[error("The decoding library is unavailable: {0}")]
    LibraryUnavailable(String),
    #[error(transparent)]
    Picture(#[from] PictureError),
}

impl Nd2Error {
    fn engine(operation: EngineOperation) -> impl FnOnce(ErrorCode) -> Self {
        move |code| Self::Engine { operation, code }
    }
}

impl From<Nd2Error> for io::Error {
    fn from(value: Nd2Error) -> Self {
        let kind = match &value {
            Nd2Error::FileOpen { .. } => io::ErrorKind::NotFound,
            Nd2Error::Engine { .. } => io::ErrorKind::Other,
            Nd2Error::NotInitialized => io::ErrorKind::NotConnected,
            Nd2Error::OutOfRange(_) => io::ErrorKind::InvalidInput,
            Nd2Error::LibraryUnavailable(_) => io::ErrorKind::Unsupported,
            Nd2Error::Picture(_) => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, value)
    }
}

/// One decoded frame, borrowed from the reader's reusable buffer.
///
/// The buffer is overwritten by the next read, which the borrow enforces.
#[derive(Debug, Clone, Copy)]
pub struct SequenceFrame<'a> {
    pub index: usize,
    pub picture: PictureView<'a>,
    pub local: LocalMetadata,
}

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    handle: FileHandle,
    metadata: FileMetadata,
    dimensions: Dimensions,
    picture: Picture,
    local: Option<LocalMetadata>,
    mapper: CoordinateMapper,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Closed,
    Open(Box<OpenFile>),
}

/**
Reads one file at a time through a [`DecodingEngine`].

All structures are fetched when the file is opened. Frames are decoded on
demand into a single buffer that is reused for every read.

A reader is not meant to be shared between threads. Independent readers over
different files share nothing and may be used concurrently.
*/
#[derive(Debug)]
pub struct Nd2Reader<E: DecodingEngine> {
    engine: E,
    state: SessionState,
}

impl<E: DecodingEngine> Nd2Reader<E> {
    /// Create a reader with no file open
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: SessionState::Closed,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Open `path`, closing whatever file was open before.
    ///
    /// If any structure cannot be fetched the new handle is released and the
    /// reader stays closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Nd2Error> {
        let path = path.as_ref();
        self.close()?;
        let handle = self
            .engine
            .open_file(path)
            .filter(FileHandle::is_valid)
            .ok_or_else(|| Nd2Error::FileOpen {
                path: path.to_path_buf(),
            })?;

        match self.initialize(path, handle) {
            Ok(file) => {
                debug!(
                    "Opened {} with {} sequences of {}x{}x{}",
                    path.display(),
                    file.metadata.attributes.sequence_count,
                    file.dimensions.width,
                    file.dimensions.height,
                    file.dimensions.channels
                );
                self.state = SessionState::Open(Box::new(file));
                Ok(())
            }
            Err(e) => {
                if let Err(code) = self.engine.close_file(handle) {
                    warn!(
                        "Failed to release {handle} for {} after {e}: {code}",
                        path.display()
                    );
                }
                Err(e)
            }
        }
    }

    fn initialize(&mut self, path: &Path, handle: FileHandle) -> Result<OpenFile, Nd2Error> {
        let engine = &mut self.engine;
        let attributes = engine
            .attributes(handle)
            .map_err(Nd2Error::engine(EngineOperation::GetAttributes))?;
        let text_info = engine
            .text_info(handle)
            .map_err(Nd2Error::engine(EngineOperation::GetTextInfo))?;
        let description = engine
            .metadata_desc(handle)
            .map_err(Nd2Error::engine(EngineOperation::GetMetadata))?;
        let experiment = engine
            .experiment(handle)
            .map_err(Nd2Error::engine(EngineOperation::GetExperiment))?;
        let binaries = engine
            .binary_descriptors(handle)
            .map_err(Nd2Error::engine(EngineOperation::GetBinaryDescriptors))?;

        if !attributes.has_valid_stride() {
            warn!(
                "{} reports a row stride of {} bytes, which cannot hold {} pixels",
                path.display(),
                attributes.width_bytes,
                attributes.width
            );
        }
        if !description.has_valid_planes() {
            warn!(
                "{} describes {} planes for {} components",
                path.display(),
                description.plane_count(),
                description.component_count
            );
        }

        let metadata = FileMetadata::new(attributes, text_info, description, experiment, binaries);
        let layout = PictureLayout::from_attributes(&metadata.attributes);
        let reported = engine
            .init_picture(
                layout.width,
                layout.height,
                layout.bits_per_component,
                layout.components,
            )
            .map_err(Nd2Error::engine(EngineOperation::InitPicture))?;
        if reported.size != layout.size {
            warn!(
                "The decoding engine sized the picture at {} bytes, expected {}",
                reported.size, layout.size
            );
        }

        Ok(OpenFile {
            path: path.to_path_buf(),
            handle,
            dimensions: metadata.dimensions(),
            mapper: CoordinateMapper::new(&metadata.experiment),
            picture: Picture::with_capacity(layout, reported.size),
            local: None,
            metadata,
        })
    }

    /// Release the picture buffer and the file handle. Closing a closed reader does nothing.
    ///
    /// The reader is closed afterwards even if the engine reports an error.
    pub fn close(&mut self) -> Result<(), Nd2Error> {
        if let SessionState::Open(file) = mem::take(&mut self.state) {
            debug!("Closing {}", file.path.display());
            self.engine.destroy_picture();
            self.engine
                .close_file(file.handle)
                .map_err(Nd2Error::engine(EngineOperation::CloseFile))?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    fn current(&self) -> Result<&OpenFile, Nd2Error> {
        match &self.state {
            SessionState::Open(file) => Ok(file),
            SessionState::Closed => Err(Nd2Error::NotInitialized),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.current().ok().map(|f| f.path.as_path())
    }

    /// The number of sequences in the open file, zero when closed
    pub fn len(&self) -> usize {
        self.current()
            .map(|f| f.metadata.attributes.sequence_count as usize)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn file_metadata(&self) -> Option<&FileMetadata> {
        self.current().ok().map(|f| &f.metadata)
    }

    pub fn dimensions(&self) -> Option<&Dimensions> {
        self.current().ok().map(|f| &f.dimensions)
    }

    /// The readout of the most recently read sequence
    pub fn local_metadata(&self) -> Option<&LocalMetadata> {
        self.current().ok().and_then(|f| f.local.as_ref())
    }

    pub fn mapper(&self) -> Option<&CoordinateMapper> {
        self.current().ok().map(|f| &f.mapper)
    }

    pub fn picture_layout(&self) -> Option<&PictureLayout> {
        self.current().ok().map(|f| f.picture.layout())
    }

    /// Every structure of the open file flattened into one sorted map,
    /// including the settings mined from its free text
    pub fn metadata(&self) -> Result<MetadataMap, Nd2Error> {
        Ok(flatten_metadata(&self.current()?.metadata))
    }

    pub fn seq_index_from_coords(&self, coords: &ExperimentCoordinates) -> Result<usize, Nd2Error> {
        Ok(self.current()?.mapper.seq_index_from_coords(coords)?)
    }

    pub fn coords_from_seq_index(&self, index: usize) -> Result<ExperimentCoordinates, Nd2Error> {
        Ok(self.current()?.mapper.coords_from_seq_index(index)?)
    }

    /// Decode sequence `index` into the reusable buffer.
    ///
    /// The returned frame stays valid until the next read.
    pub fn read_sequence(&mut self, index: usize) -> Result<SequenceFrame<'_>, Nd2Error> {
        let file = match &mut self.state {
            SessionState::Open(file) => file,
            SessionState::Closed => return Err(Nd2Error::NotInitialized),
        };
        let count = file.metadata.attributes.sequence_count as usize;
        if index >= count {
            return Err(OutOfRangeError::SequenceIndex { index, count }.into());
        }
        let local = self
            .engine
            .image_data(file.handle, index as u32, file.picture.as_mut_slice())
            .map_err(Nd2Error::engine(EngineOperation::GetImageData))?;
        file.local = Some(local);
        Ok(SequenceFrame {
            index,
            picture: file.picture.view(),
            local,
        })
    }

    /// Decode the sequence at `coords`
    pub fn read_sequence_at(
        &mut self,
        coords: &ExperimentCoordinates,
    ) -> Result<SequenceFrame<'_>, Nd2Error> {
        let index = self.seq_index_from_coords(coords)?;
        self.read_sequence(index)
    }
}

impl<E: DecodingEngine> Drop for Nd2Reader<E> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close reader: {e}");
        }
    }
}

#[cfg(feature = "nd2sdk")]
mod sdk {
    use super::*;
    use crate::io::nd2sdk::SdkEngine;

    /// A reader backed by Nikon's native decoding library
    pub type ND2Reader = Nd2Reader<SdkEngine>;

    impl Nd2Reader<SdkEngine> {
        /// Load the native library and open `path` with it
        pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Nd2Error> {
            let mut reader = Self::new(SdkEngine::load()?);
            reader.open(path)?;
            Ok(reader)
        }
    }
}

#[cfg(feature = "nd2sdk")]
pub use sdk::ND2Reader;

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::memory::{MemoryEngine, MemoryFile};
    use crate::meta::flatten::test::two_plane_fixture;
    use crate::params::Value;

    const PATH: &str = "fixtures/two_plane.nd2";

    fn frame_bytes(seq: usize, layout: &PictureLayout) -> Vec<u8> {
        let mut data = vec![0u8; layout.size];
        for y in 0..layout.height {
            for x in 0..layout.width {
                for c in 0..layout.components {
                    let value = (seq as u32 * 100 + y * 10 + x + c * 1000) as u16;
                    let offset = layout.offset_of(x, y, c).unwrap();
                    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
        data
    }

    fn fixture_file() -> MemoryFile {
        let metadata = two_plane_fixture();
        let layout = PictureLayout::from_attributes(&metadata.attributes);
        let mut file = MemoryFile::new(metadata);
        for seq in 0..12 {
            let local = LocalMetadata::new(seq as f64 * 100.0, 10.0, -5.0, 1.5 + seq as f64);
            file = file.with_frame(frame_bytes(seq, &layout), local);
        }
        file
    }

    fn reader() -> Nd2Reader<MemoryEngine> {
        Nd2Reader::new(MemoryEngine::new().with_file(PATH, fixture_file()))
    }

    #[test_log::test]
    fn test_session_lifecycle() -> Result<(), Nd2Error> {
        let mut reader = reader();
        assert!(!reader.is_open());
        assert!(matches!(reader.metadata(), Err(Nd2Error::NotInitialized)));
        assert!(matches!(
            reader.read_sequence(0),
            Err(Nd2Error::NotInitialized)
        ));
        assert_eq!(reader.len(), 0);

        reader.open(PATH)?;
        assert!(reader.is_open());
        assert_eq!(reader.path(), Some(Path::new(PATH)));
        assert_eq!(reader.len(), 12);
        assert_eq!(reader.engine().open_handles(), 1);
        assert!(reader.engine().has_picture());

        let dims = *reader.dimensions().unwrap();
        assert_eq!((dims.width, dims.height, dims.channels), (5, 4, 3));
        assert_eq!((dims.frames, dims.slices), (3, 4));
        assert_eq!(reader.picture_layout().unwrap().width_bytes, 32);
        assert!(reader.local_metadata().is_none());

        let map = reader.metadata()?;
        assert_eq!(map["uiSequenceCount"], Value::Int(12));
        assert_eq!(map["Camera Name"], Value::String("Andor Zyla".into()));

        reader.close()?;
        assert!(!reader.is_open());
        assert_eq!(reader.engine().open_handles(), 0);
        assert!(!reader.engine().has_picture());
        reader.close()?;
        assert!(matches!(reader.metadata(), Err(Nd2Error::NotInitialized)));
        Ok(())
    }

    #[test_log::test]
    fn test_read_sequence() -> Result<(), Nd2Error> {
        let mut reader = reader();
        reader.open(PATH)?;

        let frame = reader.read_sequence(7)?;
        assert_eq!(frame.index, 7);
        assert_eq!(frame.local.time_msec, 700.0);
        assert_eq!(frame.picture.bytes().len(), 128);
        assert_eq!(frame.picture.sample(2, 1, 0), Some(712));
        assert_eq!(frame.picture.sample(2, 1, 2), Some(2712));

        let frame = reader.read_sequence(0)?;
        assert_eq!(frame.picture.sample(2, 1, 0), Some(12));
        assert_eq!(reader.local_metadata().map(|l| l.z_pos), Some(1.5));

        let frame = reader.read_sequence_at(&ExperimentCoordinates::new(1, 0, 2, 0))?;
        assert_eq!(frame.index, 6);
        assert_eq!(frame.local.time_msec, 600.0);

        assert_eq!(
            reader.coords_from_seq_index(11)?,
            ExperimentCoordinates::new(2, 0, 3, 0)
        );
        Ok(())
    }

    #[test_log::test]
    fn test_out_of_range() -> Result<(), Nd2Error> {
        let mut reader = reader();
        reader.open(PATH)?;
        let err = reader.read_sequence(12).unwrap_err();
        assert!(matches!(
            err,
            Nd2Error::OutOfRange(OutOfRangeError::SequenceIndex {
                index: 12,
                count: 12
            })
        ));
        assert!(matches!(
            reader.read_sequence_at(&ExperimentCoordinates::new(0, 0, 4, 0)),
            Err(Nd2Error::OutOfRange(OutOfRangeError::Coordinate { .. }))
        ));
        // Errors leave the session open
        assert!(reader.is_open());
        let err: io::Error = reader.read_sequence(usize::MAX).unwrap_err().into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        Ok(())
    }

    #[test_log::test]
    fn test_open_failures() {
        let mut reader = reader();
        let err = reader.open("missing.nd2").unwrap_err();
        assert!(matches!(err, Nd2Error::FileOpen { .. }));
        assert!(!reader.is_open());

        for operation in [
            EngineOperation::GetAttributes,
            EngineOperation::GetTextInfo,
            EngineOperation::GetMetadata,
            EngineOperation::GetExperiment,
            EngineOperation::GetBinaryDescriptors,
            EngineOperation::InitPicture,
        ] {
            let file = fixture_file().failing(operation, ErrorCode::Fail);
            let mut reader = Nd2Reader::new(MemoryEngine::new().with_file(PATH, file));
            match reader.open(PATH) {
                Err(Nd2Error::Engine { operation: op, code }) => {
                    assert_eq!(op, operation);
                    assert_eq!(code, ErrorCode::Fail);
                }
                other => panic!("Expected an engine error, got {other:?}"),
            }
            assert!(!reader.is_open());
            assert_eq!(reader.engine().open_handles(), 0);
        }
    }

    #[test_log::test]
    fn test_null_handle_is_file_open_error() {
        let file = fixture_file().failing(EngineOperation::OpenFile, ErrorCode::Fail);
        let mut reader = Nd2Reader::new(MemoryEngine::new().with_file(PATH, file));
        match reader.open(PATH) {
            Err(Nd2Error::FileOpen { path }) => assert_eq!(path, Path::new(PATH)),
            other => panic!("Expected a file open error, got {other:?}"),
        }
        assert!(!reader.is_open());
        assert!(!reader.engine().has_picture());
        assert_eq!(reader.engine().open_handles(), 0);
    }

    #[test_log::test]
    fn test_close_failure_still_closes() -> Result<(), Nd2Error> {
        let file = fixture_file().failing(EngineOperation::CloseFile, ErrorCode::AccessDenied);
        let mut reader = Nd2Reader::new(MemoryEngine::new().with_file(PATH, file));
        reader.open(PATH)?;
        match reader.close() {
            Err(Nd2Error::Engine { operation, code }) => {
                assert_eq!(operation, EngineOperation::CloseFile);
                assert_eq!(code, ErrorCode::AccessDenied);
            }
            other => panic!("Expected an engine error, got {other:?}"),
        }
        assert!(!reader.is_open());
        assert!(!reader.engine().has_picture());
        assert_eq!(reader.engine().open_handles(), 0);
        reader.close()?;
        assert!(matches!(reader.metadata(), Err(Nd2Error::NotInitialized)));
        Ok(())
    }

    #[test_log::test]
    fn test_image_failure_keeps_session() {
        let file = fixture_file().failing(EngineOperation::GetImageData, ErrorCode::OutOfMemory);
        let mut reader = Nd2Reader::new(MemoryEngine::new().with_file(PATH, file));
        reader.open(PATH).unwrap();
        let err = reader.read_sequence(0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The decoding engine failed to get image data: out of memory"
        );
        assert!(reader.is_open());
        assert!(reader.local_metadata().is_none());
    }

    #[test_log::test]
    fn test_reopen_closes_previous() -> Result<(), Nd2Error> {
        let engine = MemoryEngine::new()
            .with_file(PATH, fixture_file())
            .with_file("other.nd2", fixture_file());
        let mut reader = Nd2Reader::new(engine);
        reader.open(PATH)?;
        reader.open("other.nd2")?;
        assert_eq!(reader.engine().open_handles(), 1);
        assert_eq!(reader.path(), Some(Path::new("other.nd2")));

        // A failed open leaves the reader closed, not on the previous file
        assert!(reader.open("missing.nd2").is_err());
        assert!(!reader.is_open());
        assert_eq!(reader.engine().open_handles(), 0);
        Ok(())
    }
}

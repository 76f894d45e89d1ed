//! Uploaded images: decoding, fitting and on-disk storage.
//!
//! Stored files live directly under the configured media directory and are
//! named after the upload time, `<unix seconds>.<microseconds><ext>`, keeping
//! the extension of the uploaded file name.

use std::io::{Cursor, ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::OpenOptions, fs_utf8::Dir};
pub use image::ImageFormat;
use image::{DynamicImage, ImageReader, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, warn};

/// Longest side, in pixels, of a stored hero image.
pub const HERO_IMAGE_MAX_SIDE: u32 = 300;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image format is not recognised")]
    UnknownFormat,
    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid media file name {0:?}")]
    InvalidName(String),
}

/// An uploaded file as received from the request layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Dimensions and container format of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Decodes and resizes encoded images.
pub trait ImageCodec: Send + Sync {
    /// Read the dimensions and format of `bytes`.
    ///
    /// # Errors
    /// Returns [`MediaError`] when the bytes are not a supported image.
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, MediaError>;

    /// Scale `bytes` to exactly `width` x `height`, re-encoding in the
    /// original format.
    ///
    /// # Errors
    /// Returns [`MediaError`] when decoding or encoding fails.
    fn resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MediaError>;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl RasterCodec {
    fn reader(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, ImageFormat), MediaError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format().ok_or(MediaError::UnknownFormat)?;
        Ok((reader, format))
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageInfo, MediaError> {
        let (reader, format) = Self::reader(bytes)?;
        let (width, height) = reader.into_dimensions()?;
        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    fn resize(&self, bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MediaError> {
        let (reader, format) = Self::reader(bytes)?;
        let resized = reader.decode()?.resize_exact(width, height, FilterType::CatmullRom);
        // JPEG has no alpha channel.
        let resized = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        } else {
            resized
        };
        let mut out = Vec::new();
        resized.write_to(&mut Cursor::new(&mut out), format)?;
        Ok(out)
    }
}

/// Scale `(width, height)` so the longer side equals `max_side`, keeping the
/// aspect ratio. Each side is rounded half-up and never drops below 1.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = u64::from(width.max(height).max(1));
    let scale = |side: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max_side) * 2 + longest) / (2 * longest);
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    };
    (scale(width), scale(height))
}

/// Fit an uploaded hero image within [`HERO_IMAGE_MAX_SIDE`] pixels.
///
/// # Errors
/// Returns [`MediaError`] when the codec cannot decode or resize the bytes.
pub fn prepare_hero_image(codec: &dyn ImageCodec, bytes: &[u8]) -> Result<Vec<u8>, MediaError> {
    let info = codec.decode(bytes)?;
    let (width, height) = fit_within(info.width, info.height, HERO_IMAGE_MAX_SIDE);
    if (width, height) == (info.width, info.height) {
        return Ok(bytes.to_vec());
    }
    debug!(
        from_width = info.width,
        from_height = info.height,
        width,
        height,
        "resizing hero image"
    );
    codec.resize(bytes, width, height)
}

/// File name for an upload stored at `secs.micros`.
fn stored_name(original: &str, secs: i64, micros: u32, attempt: u32) -> String {
    let ext = Utf8Path::new(original)
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    if attempt == 0 {
        format!("{secs}.{micros:06}{ext}")
    } else {
        format!("{secs}.{micros:06}_{attempt}{ext}")
    }
}

/// Flat directory holding every stored image.
#[derive(Debug)]
pub struct MediaStore {
    root: Utf8PathBuf,
    dir: Dir,
}

impl MediaStore {
    /// Open `root`, creating it when missing.
    ///
    /// # Errors
    /// Returns [`MediaError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(root: impl AsRef<Utf8Path>) -> Result<Self, MediaError> {
        let root = root.as_ref().to_owned();
        std::fs::create_dir_all(&root)?;
        let dir = Dir::open_ambient_dir(&root, ambient_authority())?;
        Ok(Self { root, dir })
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path { &self.root }

    /// Write `bytes` under a fresh time-based name derived from
    /// `original_name` and return the stored name.
    ///
    /// # Errors
    /// Returns [`MediaError::Io`] when the file cannot be written.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let now = chrono::Utc::now();
        let (secs, micros) = (now.timestamp(), now.timestamp_subsec_micros());
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        let mut attempt = 0;
        loop {
            let name = stored_name(original_name, secs, micros, attempt);
            match self.dir.open_with(&name, &options) {
                Ok(file) => {
                    self.fill(&name, file, bytes)?;
                    debug!(file = %name, size = bytes.len(), "media file stored");
                    return Ok(name);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Write `bytes` into the just-created file `name`. A failed write
    /// removes the file so no truncated image stays behind.
    fn fill(&self, name: &str, mut file: impl Write, bytes: &[u8]) -> Result<(), MediaError> {
        let Err(err) = file.write_all(bytes).and_then(|()| file.flush()) else {
            return Ok(());
        };
        drop(file);
        if let Err(cleanup) = self.dir.remove_file(name) {
            warn!(file = %name, error = %cleanup, "partial media file left behind");
        }
        Err(err.into())
    }

    /// Read a stored file.
    ///
    /// # Errors
    /// Returns [`MediaError`] when the name is not a plain file name or the
    /// file cannot be read.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        Ok(self.dir.read(checked(name)?)?)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        checked(name).is_ok_and(|name| self.dir.exists(name))
    }

    /// Delete a stored file.
    ///
    /// # Errors
    /// Returns [`MediaError`] when the name is not a plain file name or the
    /// file cannot be removed.
    pub fn remove(&self, name: &str) -> Result<(), MediaError> {
        Ok(self.dir.remove_file(checked(name)?)?)
    }
}

fn checked(name: &str) -> Result<&str, MediaError> {
    let path = Utf8Path::new(name);
    if name.is_empty() || path.file_name() != Some(name) {
        return Err(MediaError::InvalidName(name.to_owned()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    #[case(4000, 2000, (300, 150))]
    #[case(2000, 4000, (150, 300))]
    #[case(300, 300, (300, 300))]
    #[case(150, 100, (300, 200))]
    #[case(1000, 333, (300, 100))]
    #[case(1000, 335, (300, 101))]
    #[case(5000, 1, (300, 1))]
    fn fits_longer_side(#[case] width: u32, #[case] height: u32, #[case] expected: (u32, u32)) {
        assert_eq!(fit_within(width, height, HERO_IMAGE_MAX_SIDE), expected);
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([200u8, 30u8, 30u8]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[rstest]
    fn raster_codec_resizes_png() {
        let original = png(40, 20);
        let info = RasterCodec.decode(&original).expect("decode");
        assert_eq!(
            info,
            ImageInfo {
                width: 40,
                height: 20,
                format: ImageFormat::Png
            }
        );
        let fitted = prepare_hero_image(&RasterCodec, &original).expect("fit");
        let info = RasterCodec.decode(&fitted).expect("decode resized");
        assert_eq!((info.width, info.height, info.format), (300, 150, ImageFormat::Png));
    }

    #[rstest]
    fn raster_codec_rejects_garbage() {
        assert!(RasterCodec.decode(b"definitely not an image").is_err());
    }

    #[fixture]
    fn store() -> (TempDir, MediaStore) {
        let tmp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().join("media")).expect("utf8 path");
        let store = MediaStore::open(&root).expect("open store");
        (tmp, store)
    }

    #[rstest]
    fn stored_names_keep_extension_and_do_not_collide(store: (TempDir, MediaStore)) {
        let (_tmp, store) = store;
        let first = store.save("photo.JPG", b"one").expect("save");
        let second = store.save("photo.JPG", b"two").expect("save");
        assert_ne!(first, second);
        for name in [&first, &second] {
            assert!(name.ends_with(".JPG"), "{name}");
            let (secs, _) = name.split_once('.').expect("dot");
            assert!(secs.parse::<i64>().is_ok(), "{name}");
        }
        assert_eq!(store.read(&first).expect("read"), b"one");
        assert_eq!(store.read(&second).expect("read"), b"two");
    }

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    #[rstest]
    fn failed_write_leaves_no_file(store: (TempDir, MediaStore)) {
        let (_tmp, store) = store;
        let name = store.save("a.png", b"").expect("save");
        assert!(store.exists(&name));
        let err = store.fill(&name, BrokenDisk, b"pixels").expect_err("write fails");
        assert!(matches!(err, MediaError::Io(_)));
        assert!(!store.exists(&name));
    }

    #[rstest]
    fn remove_deletes_file(store: (TempDir, MediaStore)) {
        let (_tmp, store) = store;
        let name = store.save("a.png", b"x").expect("save");
        assert!(store.exists(&name));
        store.remove(&name).expect("remove");
        assert!(!store.exists(&name));
    }

    #[rstest]
    #[case("../escape.png")]
    #[case("nested/file.png")]
    #[case("")]
    fn rejects_non_plain_names(store: (TempDir, MediaStore), #[case] name: &str) {
        let (_tmp, store) = store;
        assert!(matches!(store.read(name), Err(MediaError::InvalidName(_))));
    }

    #[rstest]
    #[case("a.png", 12, 7, 0, "12.000007.png")]
    #[case("noext", 12, 7, 0, "12.000007")]
    #[case("a.tar.gz", 1, 123_456, 2, "1.123456_2.gz")]
    fn builds_stored_names(
        #[case] original: &str,
        #[case] secs: i64,
        #[case] micros: u32,
        #[case] attempt: u32,
        #[case] expected: &str,
    ) {
        assert_eq!(stored_name(original, secs, micros, attempt), expected);
    }
}

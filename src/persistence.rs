// Saving and loading fitted emulators

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::emulator::PcaEmulator;
use crate::error::{EmulatorError, Result};
use crate::interpolate::Interpolator;

/// Leading bytes of every serialized emulator.
pub const MAGIC: [u8; 4] = *b"PCAE";

/// Version of the serialized layout written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Serializes `emulator`, fitted interpolators included, to `writer`.
///
/// The stream holds [`MAGIC`], the format version and the bincode-encoded
/// emulator. The writer is flushed before returning.
pub fn write_pca_emulator<I, W>(writer: &mut W, emulator: &PcaEmulator<I>) -> Result<()>
where
    I: Interpolator,
    PcaEmulator<I>: Serialize,
    W: Write,
{
    let config = bincode::config::standard();
    writer.write_all(&MAGIC)?;
    bincode::serde::encode_into_std_write(FORMAT_VERSION, writer, config)?;
    let written = bincode::serde::encode_into_std_write(emulator, writer, config)?;
    writer.flush()?;
    debug!(
        "Serialized emulator with {} components ({} bytes).",
        emulator.num_components(),
        written
    );
    Ok(())
}

/// Reads an emulator written by [`write_pca_emulator`], ready to evaluate without refitting.
///
/// # Errors
/// `CorruptModel` for a foreign stream or an internally inconsistent emulator,
/// `UnsupportedFormatVersion` for another layout version, `Decode` or `Io` for
/// truncated or malformed input.
pub fn read_pca_emulator<I, R>(reader: &mut R) -> Result<PcaEmulator<I>>
where
    I: Interpolator,
    PcaEmulator<I>: DeserializeOwned,
    R: Read,
{
    let config = bincode::config::standard();
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(EmulatorError::CorruptModel(
            "stream does not start with the emulator header".to_string(),
        ));
    }
    let version: u32 = bincode::serde::decode_from_std_read(reader, config)?;
    if version != FORMAT_VERSION {
        return Err(EmulatorError::UnsupportedFormatVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let emulator: PcaEmulator<I> = bincode::serde::decode_from_std_read(reader, config)?;
    emulator.validate()?;
    Ok(emulator)
}

/// Saves `emulator` to the file at `path`, replacing any existing file.
pub fn save_pca_emulator<I, P>(path: P, emulator: &PcaEmulator<I>) -> Result<()>
where
    I: Interpolator,
    PcaEmulator<I>: Serialize,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_pca_emulator(&mut writer, emulator)?;
    debug!("Saved emulator to {:?}.", path.as_ref());
    Ok(())
}

/// Loads an emulator saved with [`save_pca_emulator`].
///
/// The interpolator type must match the one the emulator was saved with;
/// use [`crate::AnyInterpolator`] to store the strategy choice in the file.
pub fn load_pca_emulator<I, P>(path: P) -> Result<PcaEmulator<I>>
where
    I: Interpolator,
    PcaEmulator<I>: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let emulator = read_pca_emulator(&mut reader)?;
    debug!("Loaded emulator from {:?}.", path.as_ref());
    Ok(emulator)
}

impl<I> PcaEmulator<I>
where
    I: Interpolator,
{
    /// Saves this emulator to `path`; see [`save_pca_emulator`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        Self: Serialize,
    {
        save_pca_emulator(path, self)
    }

    /// Loads an emulator from `path`; see [`load_pca_emulator`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: DeserializeOwned,
    {
        load_pca_emulator(path)
    }
}

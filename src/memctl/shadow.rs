use std::path::{Path, PathBuf};

use tracing::info;

use crate::memctl::{
    error::{Result, ValidationError},
    helpers::{check_block, word_span},
    persist,
    table::ShadowTable,
    types::{Device, Region, Word},
};

/// Where each region's word list lives on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowPaths {
    pub bram: Option<PathBuf>,
    pub spram: Option<PathBuf>,
}

impl ShadowPaths {
    pub fn new(bram: impl Into<PathBuf>) -> Self {
        Self {
            bram: Some(bram.into()),
            spram: None,
        }
    }

    pub fn with_spram(mut self, spram: impl Into<PathBuf>) -> Self {
        self.spram = Some(spram.into());
        self
    }

    pub fn get(&self, region: Region) -> Option<&Path> {
        match region {
            Region::Bram => self.bram.as_deref(),
            Region::Spram => self.spram.as_deref(),
        }
    }
}

/// Host-side mirror of the device's memory.
///
/// This is the client's expectation of what the device holds, used as the
/// oracle for verification. The device stays authoritative: nothing here is
/// ever confirmed except by a successful verify.
pub struct ShadowMemory {
    device: Device,
    bram: ShadowTable,
    spram: Option<ShadowTable>,
    paths: ShadowPaths,
}

impl core::fmt::Debug for ShadowMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShadowMemory")
            .field("device", &self.device)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl ShadowMemory {
    /// Creates a shadow with every word `0000` and no backing files.
    pub fn new(device: Device) -> Self {
        let table = |region: Region| {
            ShadowTable::new(
                device.block_count(region) as usize,
                region.words_per_block(),
            )
        };
        Self {
            device,
            bram: table(Region::Bram),
            spram: device.has_region(Region::Spram).then(|| table(Region::Spram)),
            paths: ShadowPaths::default(),
        }
    }

    /// Creates a shadow backed by `paths` and loads it from disk.
    pub fn open(device: Device, paths: ShadowPaths) -> Result<Self> {
        let mut shadow = Self::new(device);
        shadow.paths = paths;
        shadow.reload()?;
        Ok(shadow)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn paths(&self) -> &ShadowPaths {
        &self.paths
    }

    fn table(&self, region: Region) -> Result<&ShadowTable> {
        match region {
            Region::Bram => Ok(&self.bram),
            Region::Spram => self
                .spram
                .as_ref()
                .ok_or(ValidationError::RegionUnavailable(region).into()),
        }
    }

    fn table_mut(&mut self, region: Region) -> Result<&mut ShadowTable> {
        match region {
            Region::Bram => Ok(&mut self.bram),
            Region::Spram => self
                .spram
                .as_mut()
                .ok_or(ValidationError::RegionUnavailable(region).into()),
        }
    }

    /// Returns the expected words at a span.
    pub fn words(&self, region: Region, block: u8, address: u16, size: usize) -> Result<&[Word]> {
        let (start, end) = word_span(self.device, region, block, address, size)?;
        Ok(self.table(region)?.words(start, end))
    }

    /// Returns a whole region, block-major.
    pub fn region(&self, region: Region) -> Result<&[Word]> {
        Ok(self.table(region)?.as_words())
    }

    /// Records words the device is expected to hold and marks their blocks
    /// as unsaved.
    pub(crate) fn store(
        &mut self,
        region: Region,
        block: u8,
        address: u16,
        data: &[Word],
    ) -> Result<()> {
        let (start, _) = word_span(self.device, region, block, address, data.len())?;
        self.table_mut(region)?.store(start, data);
        Ok(())
    }

    /// Seeds the shadow with known contents without marking anything unsaved.
    ///
    /// Use this when the device is known to already hold `data`, e.g. the
    /// initial BRAM image baked into the bitstream.
    pub fn load_words(
        &mut self,
        region: Region,
        block: u8,
        address: u16,
        data: &[Word],
    ) -> Result<()> {
        let (start, _) = word_span(self.device, region, block, address, data.len())?;
        self.table_mut(region)?.load(start, data);
        Ok(())
    }

    /// Returns true if any region changed since the last load or save.
    pub fn has_unsaved_changes(&self) -> bool {
        self.bram.any_dirty() || self.spram.as_ref().is_some_and(ShadowTable::any_dirty)
    }

    /// Blocks of `region` that changed since the last load or save.
    pub fn dirty_blocks(&self, region: Region) -> Result<Vec<u8>> {
        Ok(self.table(region)?.dirty_blocks().collect())
    }

    /// Returns true if `block` of `region` changed since the last load or save.
    pub fn is_block_dirty(&self, region: Region, block: u8) -> Result<bool> {
        check_block(self.device, region, block)?;
        Ok(self.table(region)?.is_dirty(block as usize))
    }

    /// Re-reads every region that has a backing file. Unsaved changes are
    /// discarded.
    pub fn reload(&mut self) -> Result<()> {
        for region in Region::ALL {
            let Some(path) = self.paths.get(region).map(Path::to_path_buf) else {
                continue;
            };
            let Ok(table) = self.table_mut(region) else {
                continue;
            };
            let list = persist::load_file(&path, table.len())?;
            table.load(0, &list.words);
            table.clear_all_dirty();
            info!(
                %region,
                path = %path.display(),
                defaulted = list.defaulted,
                "loaded shadow"
            );
        }
        Ok(())
    }

    /// Writes every region that has a backing file and clears dirty tracking.
    pub fn save(&mut self) -> Result<()> {
        for region in Region::ALL {
            let Some(path) = self.paths.get(region).map(Path::to_path_buf) else {
                continue;
            };
            let Ok(table) = self.table_mut(region) else {
                continue;
            };
            let dirty = table.dirty_blocks().count();
            persist::save_file(&path, table.as_words())?;
            table.clear_all_dirty();
            info!(%region, path = %path.display(), dirty, "saved shadow");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memctl::error::MemctlError;

    #[test]
    fn new_shadow_matches_device_geometry() {
        let shadow = ShadowMemory::new(Device::Hx1k);
        assert_eq!(shadow.region(Region::Bram).unwrap().len(), 16 * 256);
        assert!(matches!(
            shadow.region(Region::Spram),
            Err(MemctlError::Validation(ValidationError::RegionUnavailable(
                Region::Spram
            )))
        ));

        let shadow = ShadowMemory::new(Device::Up5k);
        assert_eq!(shadow.region(Region::Spram).unwrap().len(), 4 * 16384);
    }

    #[test]
    fn store_marks_dirty_and_load_words_does_not() {
        let mut shadow = ShadowMemory::new(Device::Up5k);
        let data = [Word::new(1), Word::new(2), Word::new(3)];

        shadow.load_words(Region::Bram, 0, 10, &data).unwrap();
        assert_eq!(shadow.words(Region::Bram, 0, 10, 3).unwrap(), data);
        assert!(!shadow.has_unsaved_changes());

        shadow.store(Region::Spram, 2, 100, &data).unwrap();
        assert!(shadow.has_unsaved_changes());
        assert_eq!(shadow.dirty_blocks(Region::Spram).unwrap(), [2]);
        assert!(shadow.is_block_dirty(Region::Spram, 2).unwrap());
        assert!(!shadow.is_block_dirty(Region::Spram, 1).unwrap());
        assert!(shadow.dirty_blocks(Region::Bram).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_span_is_rejected() {
        let mut shadow = ShadowMemory::new(Device::Hx1k);
        let err = shadow
            .store(Region::Bram, 0, 255, &[Word::ZERO, Word::ZERO])
            .unwrap_err();
        assert!(err.is_validation());
        assert!(shadow.words(Region::Bram, 16, 0, 1).is_err());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ShadowPaths::new(dir.path().join("data.hex"))
            .with_spram(dir.path().join("spram_data.hex"));

        let mut shadow = ShadowMemory::open(Device::Up5k, paths.clone()).unwrap();
        shadow
            .store(Region::Bram, 29, 255, &[Word::new(0xbeef)])
            .unwrap();
        shadow
            .store(Region::Spram, 3, 16383, &[Word::new(0xcafe)])
            .unwrap();
        shadow.save().unwrap();
        assert!(!shadow.has_unsaved_changes());

        let bram_text = std::fs::read_to_string(paths.bram.as_ref().unwrap()).unwrap();
        assert_eq!(bram_text.lines().count(), 30 * 256);
        assert_eq!(bram_text.lines().last(), Some("beef"));

        let reopened = ShadowMemory::open(Device::Up5k, paths).unwrap();
        assert_eq!(
            reopened.words(Region::Bram, 29, 255, 1).unwrap(),
            [Word::new(0xbeef)]
        );
        assert_eq!(
            reopened.words(Region::Spram, 3, 16383, 1).unwrap(),
            [Word::new(0xcafe)]
        );
    }

    #[test]
    fn reload_discards_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.hex");
        std::fs::write(&path, "0001\n0002\n").unwrap();

        let mut shadow = ShadowMemory::open(Device::Hx1k, ShadowPaths::new(&path)).unwrap();
        assert_eq!(
            shadow.words(Region::Bram, 0, 0, 3).unwrap(),
            [Word::new(1), Word::new(2), Word::ZERO]
        );

        shadow.store(Region::Bram, 0, 0, &[Word::new(9)]).unwrap();
        shadow.reload().unwrap();
        assert_eq!(shadow.words(Region::Bram, 0, 0, 1).unwrap(), [Word::new(1)]);
        assert!(!shadow.has_unsaved_changes());
    }
}

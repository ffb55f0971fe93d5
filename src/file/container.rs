use memmap2::{Mmap, MmapAsRawDesc};

use crate::Result;

use super::{DexFile, DexLocation, VerifyPreset};

/// A dex file mapped into memory. The mapping only has to live for the
/// duration of [`DexFileContainer::open`]; the decoded file owns its data.
pub struct DexFileContainer {
    mmap: Mmap,
    location: String,
    pub verify: bool,
    pub verify_checksum: bool,
}

impl DexFileContainer {
    pub fn new<T>(file: T) -> Result<Self>
    where
        T: MmapAsRawDesc,
    {
        // SAFETY: the mapping is read-only and never outlives the container
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self {
            mmap,
            verify: false,
            verify_checksum: false,
            location: "[anonymous]".to_string(),
        })
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn verify_checksum(mut self, verify_checksum: bool) -> Self {
        self.verify_checksum = verify_checksum;
        self
    }

    #[inline]
    pub fn preset(&self) -> VerifyPreset {
        VerifyPreset::from_flags(self.verify, self.verify_checksum)
    }

    pub fn open(&self) -> Result<DexFile> {
        let location = DexLocation::Path(self.location.clone());
        DexFile::open(self.data(), location, self.preset())
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn data(&self) -> &[u8] {
        &self.mmap
    }
}

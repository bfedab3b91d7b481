//! Minimal ELF64 parser for host and AMDGPU device objects.
//!
//! Parses ELF64 headers, `PT_LOAD` segments, sections, the symbol table, and
//! `.note` entries from raw byte slices using safe field extraction
//! (`from_le_bytes`). No unsafe code, no allocations.
//!
//! # Usage
//!
//! ```
//! use zhc_elf::ElfFile;
//!
//! fn load_elf(data: &[u8]) {
//!     let elf = ElfFile::parse(data).expect("valid ELF");
//!     let entry = elf.entry_point();
//!     for seg in elf.load_segments() {
//!         // Map seg.data at seg.vaddr, zero-fill to seg.memsz
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

pub mod header;
pub mod note;
pub mod section;
pub mod segment;

pub use header::{Elf64Header, ElfError};
pub use note::{Note, NoteIter};
pub use section::{
    Elf64SectionHeader, Elf64Symbol, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHN_UNDEF, SHT_DYNSYM,
    SHT_NOTE, SHT_RELA, SHT_STRTAB, SHT_SYMTAB, STB_GLOBAL, STB_WEAK, STT_FUNC, StringTable,
};
pub use segment::{ElfFile, LoadSegment};

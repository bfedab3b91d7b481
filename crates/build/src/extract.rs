//! Overload extraction: walks a host object's symbol table for launch-site
//! symbols and collects them into an [`OverloadSet`].

use crate::error::BuildError;
use zhc_abi::OverloadSet;
use zhc_elf::ElfFile;
use zhc_mangle::{parse_launch_site_symbol, LAUNCH_SITE_PREFIX};

/// Walks every symbol in `elf`'s `.symtab` (falling back to `.dynsym`),
/// demangling every symbol whose name begins with [`LAUNCH_SITE_PREFIX`]
/// into a `KernelConfig`, and collects the result into an [`OverloadSet`].
///
/// Duplicate launch-site symbols collapse: the set only records the
/// distinct `(kernel, overload)` pairs actually present, each in its
/// first-seen position.
///
/// # Errors
///
/// Returns [`BuildError::InvalidMangledName`] if a symbol carries the
/// launch-site prefix but its suffix fails to demangle. No partial result is
/// returned on failure.
pub fn extract_overloads(elf: &ElfFile<'_>) -> Result<OverloadSet, BuildError> {
    let symtab = elf
        .find_section_by_type(zhc_elf::SHT_SYMTAB)
        .or_else(|| elf.find_section_by_type(zhc_elf::SHT_DYNSYM))
        .ok_or_else(|| BuildError::InvalidElf("no symbol table section".to_string()))?;

    let strtab = elf
        .linked_strtab(&symtab)
        .ok_or_else(|| BuildError::InvalidElf("symbol table has no linked string table".to_string()))?;
    let symbols = elf
        .symbols(&symtab)
        .ok_or_else(|| BuildError::InvalidElf("symbol table data out of bounds".to_string()))?;

    let mut set = OverloadSet::new();
    for sym in symbols {
        let Some(name) = strtab.get(sym.st_name) else {
            continue;
        };
        if !name.starts_with(LAUNCH_SITE_PREFIX) {
            continue;
        }
        match parse_launch_site_symbol(name) {
            Some(Ok(config)) => set.insert(config),
            Some(Err(source)) => {
                return Err(BuildError::InvalidMangledName {
                    symbol: name.to_string(),
                    source,
                })
            }
            None => unreachable!("name was checked to start with LAUNCH_SITE_PREFIX"),
        }
    }
    Ok(set)
}

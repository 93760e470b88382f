#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

pub const SECTION: &str = ".rodata.constcheck";

/// Relocatable ARM ELF object with `.text` plus one extra section per `(name, kind)`.
pub fn elf_object(sections: &[(&str, SectionKind)]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::Arm, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).append_data(&[0x70, 0x47], 2);
    for (name, kind) in sections {
        let id = obj.add_section(Vec::new(), name.as_bytes().to_vec(), *kind);
        obj.section_mut(id).append_data(&[1, 2, 3, 4], 4);
    }
    obj.write().unwrap()
}

/// Minimal GNU-style `ar` archive (short names only).
pub fn ar_archive(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut out = b"!<arch>\n".to_vec();
    for (name, data) in members {
        let header = format!(
            "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
            format!("{name}/"),
            0,
            0,
            0,
            644,
            data.len()
        );
        assert_eq!(header.len(), 60, "member name too long for a short header: {name}");
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    out
}

pub fn write_archive(path: &Path, members: &[(&str, Vec<u8>)]) -> PathBuf {
    fs::write(path, ar_archive(members)).unwrap();
    path.to_path_buf()
}

/// Lay out `<root>/IntelRDFPMathLib20U2/LIBRARY/src` and return the library dir.
pub fn upstream_tree(root: &Path) -> PathBuf {
    let lib = root.join("IntelRDFPMathLib20U2").join("LIBRARY");
    fs::create_dir_all(lib.join("src")).unwrap();
    lib
}

pub fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

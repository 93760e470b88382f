#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

pub const SECTION: &str = ".rodata.constcheck";
pub const TAG: &str = "__attribute__((section(\".rodata.constcheck\")))";

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

/// Minimal GNU-style `ar` archive (short member names only).
pub fn write_archive(path: &Path, members: &[(&str, Vec<u8>)]) {
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
        assert_eq!(header.len(), 60);
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, out).unwrap();
}

/// Lay out the default upstream tree under `root` and return the library dir.
pub fn upstream_tree(root: &Path) -> PathBuf {
    let lib = root.join("IntelRDFPMathLib20U2").join("LIBRARY");
    fs::create_dir_all(lib.join("src")).unwrap();
    lib
}

/// Upstream tree with one allow-listed table source.
pub fn upstream_with_table(root: &Path) -> PathBuf {
    let lib = upstream_tree(root);
    fs::write(
        lib.join("src").join("bid_dpd.c"),
        "#include \"bid_internal.h\"\n\nstatic int freq_table[256];\nint counter;\n",
    )
    .unwrap();
    lib
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
